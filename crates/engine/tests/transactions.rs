mod common;

use engine::{
    EngineError, NewTransaction, PageRequest, SortOrder, TransactionFilter, TransactionKind,
    TransactionPatch, TransactionSortField, TransactionStatus,
};

use common::{FOOD, SALARY, account, date, engine_with_db, record, transfer};

fn page() -> PageRequest {
    PageRequest::new(None, None, 20).unwrap()
}

#[tokio::test]
async fn currency_defaults_to_the_source_account() {
    let t = engine_with_db().await;
    let usd = t
        .engine
        .create_account(
            &t.user_id,
            engine::NewAccount::new("Dollars", engine::AccountKind::Savings).currency("USD"),
        )
        .await
        .unwrap();
    let tx = record(&t.engine, &t.user_id, TransactionKind::Income, 100, date(2026, 3, 1), &usd).await;
    assert_eq!(tx.currency.code(), "USD");
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn references_must_be_the_callers_active_accounts() {
    let t = engine_with_db().await;
    let bob = common::register(&t.engine, "bob").await;
    let bobs = account(&t.engine, &bob, "Bob checking", 0).await;
    let mine = account(&t.engine, &t.user_id, "Checking", 0).await;

    let err = t
        .engine
        .create_transaction(
            &t.user_id,
            NewTransaction::new(
                TransactionKind::Expense,
                100,
                "Coffee",
                date(2026, 3, 1),
                bobs.id.to_string(),
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidInput("Invalid account".to_string()));

    let err = t
        .engine
        .create_transaction(
            &t.user_id,
            NewTransaction::new(
                TransactionKind::Transfer,
                100,
                "To bob",
                date(2026, 3, 1),
                mine.id.to_string(),
            )
            .to_account(bobs.id.to_string()),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidInput("Invalid account".to_string()));

    let private = t
        .engine
        .create_category(
            &bob,
            engine::NewCategory::new("Bob only", TransactionKind::Expense),
        )
        .await
        .unwrap();
    let err = t
        .engine
        .create_transaction(
            &t.user_id,
            NewTransaction::new(
                TransactionKind::Expense,
                100,
                "Coffee",
                date(2026, 3, 1),
                mine.id.to_string(),
            )
            .category(private.id.to_string()),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidInput("Invalid category".to_string()));
}

#[tokio::test]
async fn field_rules_are_enforced_on_create_and_update() {
    let t = engine_with_db().await;
    let a = account(&t.engine, &t.user_id, "Checking", 0).await;
    let b = account(&t.engine, &t.user_id, "Savings", 0).await;
    let new = |kind, amount, on| {
        NewTransaction::new(kind, amount, "Something", on, a.id.to_string())
    };

    let err = t
        .engine
        .create_transaction(&t.user_id, new(TransactionKind::Expense, 0, date(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = t
        .engine
        .create_transaction(&t.user_id, new(TransactionKind::Expense, 100, date(2027, 3, 16)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = t
        .engine
        .create_transaction(&t.user_id, new(TransactionKind::Transfer, 100, date(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = t
        .engine
        .create_transaction(
            &t.user_id,
            new(TransactionKind::Income, 100, date(2026, 3, 1)).to_account(b.id.to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let mut short = new(TransactionKind::Income, 100, date(2026, 3, 1));
    short.description = " x".to_string();
    let err = t.engine.create_transaction(&t.user_id, short).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let moved = transfer(&t.engine, &t.user_id, 100, date(2026, 3, 1), &a, &b).await;
    let err = t
        .engine
        .update_transaction(
            &moved.id.to_string(),
            &t.user_id,
            TransactionPatch {
                to_account_id: Some(Some(a.id.to_string())),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let turned = t
        .engine
        .update_transaction(
            &moved.id.to_string(),
            &t.user_id,
            TransactionPatch {
                kind: Some(TransactionKind::Expense),
                to_account_id: Some(None),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(turned.kind, TransactionKind::Expense);
    assert_eq!(turned.to_account_id, None);
}

#[tokio::test]
async fn list_filters_and_sorts() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let a = account(engine, user, "Checking", 0).await;
    let b = account(engine, user, "Savings", 0).await;

    let mut lunch = NewTransaction::new(
        TransactionKind::Expense,
        2_500,
        "Lunch at Bistro",
        date(2026, 3, 2),
        a.id.to_string(),
    )
    .category(FOOD);
    lunch.tags = vec!["food".to_string(), "work".to_string()];
    engine.create_transaction(user, lunch).await.unwrap();

    let mut dinner = NewTransaction::new(
        TransactionKind::Expense,
        9_000,
        "Dinner",
        date(2026, 3, 4),
        a.id.to_string(),
    )
    .category(FOOD);
    dinner.tags = vec!["food".to_string()];
    engine.create_transaction(user, dinner).await.unwrap();

    engine
        .create_transaction(
            user,
            NewTransaction::new(
                TransactionKind::Income,
                300_000,
                "Salary",
                date(2026, 3, 5),
                a.id.to_string(),
            )
            .category(SALARY),
        )
        .await
        .unwrap();
    transfer(engine, user, 1_000, date(2026, 3, 6), &a, &b).await;

    let list = move |filter: TransactionFilter| engine.list_transactions(user, filter, page());

    let all = list(TransactionFilter::default()).await.unwrap();
    assert_eq!(all.total, 4);
    assert_eq!(all.items[0].date, date(2026, 3, 6));

    let search = list(TransactionFilter {
        search: Some("BISTRO".to_string()),
        ..TransactionFilter::default()
    })
    .await
    .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].description, "Lunch at Bistro");

    let tagged = list(TransactionFilter {
        tags: vec!["work".to_string(), "travel".to_string()],
        ..TransactionFilter::default()
    })
    .await
    .unwrap();
    assert_eq!(tagged.total, 1);

    let food = list(TransactionFilter {
        category_id: Some(FOOD.to_string()),
        sort_by: TransactionSortField::Amount,
        sort_order: SortOrder::Asc,
        ..TransactionFilter::default()
    })
    .await
    .unwrap();
    let amounts: Vec<i64> = food.items.iter().map(|tx| tx.amount_minor).collect();
    assert_eq!(amounts, vec![2_500, 9_000]);

    let range = list(TransactionFilter {
        min_amount: Some(2_000),
        max_amount: Some(10_000),
        start_date: Some(date(2026, 3, 3)),
        ..TransactionFilter::default()
    })
    .await
    .unwrap();
    assert_eq!(range.total, 1);
    assert_eq!(range.items[0].description, "Dinner");

    let touching_b = list(TransactionFilter {
        account_id: Some(b.id.to_string()),
        ..TransactionFilter::default()
    })
    .await
    .unwrap();
    assert_eq!(touching_b.total, 1);
    assert_eq!(touching_b.items[0].kind, TransactionKind::Transfer);

    let err = list(TransactionFilter {
        min_amount: Some(10),
        max_amount: Some(1),
        ..TransactionFilter::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn search_and_tag_wildcards_match_literally() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let a = account(engine, user, "Checking", 0).await;

    for (description, tags) in [
        ("50% off sale", vec!["a%", "50_off"]),
        ("Coffee", vec!["abc", "50xoff"]),
        ("Quote \"run\"", vec!["say \"hi\""]),
    ] {
        let mut new = NewTransaction::new(
            TransactionKind::Expense,
            1_000,
            description,
            date(2026, 3, 2),
            a.id.to_string(),
        );
        new.tags = tags.into_iter().map(str::to_string).collect();
        engine.create_transaction(user, new).await.unwrap();
    }

    let list = move |filter: TransactionFilter| engine.list_transactions(user, filter, page());
    let descriptions = |filter: TransactionFilter| async move {
        let mut found: Vec<String> = list(filter)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|tx| tx.description)
            .collect();
        found.sort();
        found
    };

    for search in ["%", "0%", "_"] {
        let found = descriptions(TransactionFilter {
            search: Some(search.to_string()),
            ..TransactionFilter::default()
        })
        .await;
        let expected: Vec<String> = if search == "_" {
            Vec::new()
        } else {
            vec!["50% off sale".to_string()]
        };
        assert_eq!(found, expected, "search {search:?}");
    }

    for tag in ["a%", "50_off"] {
        let found = descriptions(TransactionFilter {
            tags: vec![tag.to_string()],
            ..TransactionFilter::default()
        })
        .await;
        assert_eq!(found, vec!["50% off sale".to_string()], "tag {tag:?}");
    }

    let partial = descriptions(TransactionFilter {
        tags: vec!["a".to_string(), "%".to_string()],
        ..TransactionFilter::default()
    })
    .await;
    assert!(partial.is_empty());

    let quoted = descriptions(TransactionFilter {
        tags: vec!["say \"hi\"".to_string()],
        ..TransactionFilter::default()
    })
    .await;
    assert_eq!(quoted, vec!["Quote \"run\"".to_string()]);
}

#[tokio::test]
async fn summary_counts_all_and_totals_completed() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let a = account(engine, user, "Checking", 0).await;
    let b = account(engine, user, "Savings", 0).await;
    record(engine, user, TransactionKind::Income, 10_000, date(2026, 3, 1), &a).await;
    record(engine, user, TransactionKind::Expense, 3_000, date(2026, 3, 2), &a).await;
    transfer(engine, user, 2_000, date(2026, 3, 3), &a, &b).await;
    engine
        .create_transaction(
            user,
            NewTransaction::new(
                TransactionKind::Expense,
                700,
                "Later",
                date(2026, 3, 20),
                a.id.to_string(),
            )
            .status(TransactionStatus::Pending),
        )
        .await
        .unwrap();

    let summary = engine.transaction_summary(user).await.unwrap();
    assert_eq!(summary.total_transactions, 4);
    assert_eq!(summary.by_type["expense"], 2);
    assert_eq!(summary.by_status["pending"], 1);
    assert_eq!(summary.by_status["cancelled"], 0);
    assert_eq!(summary.total_income, 10_000);
    assert_eq!(summary.total_expense, 3_000);
    assert_eq!(summary.total_transfer, 2_000);
    assert_eq!(summary.net, 7_000);
}

#[tokio::test]
async fn other_users_transactions_are_forbidden() {
    let t = engine_with_db().await;
    let a = account(&t.engine, &t.user_id, "Checking", 0).await;
    let tx = record(&t.engine, &t.user_id, TransactionKind::Income, 100, date(2026, 3, 1), &a).await;
    let bob = common::register(&t.engine, "bob").await;

    let err = t
        .engine
        .delete_transaction(&tx.id.to_string(), &bob)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("You don't have access to this transaction".to_string())
    );
    let listed = t
        .engine
        .list_transactions(&bob, TransactionFilter::default(), page())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}
