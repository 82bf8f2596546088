mod common;

use engine::{
    BudgetPeriod, CategoryFilter, CategoryPatch, EngineError, GoalKind, NewBudget, NewCategory,
    NewGoal, NewTransaction, PageRequest, ParentFilter, TransactionKind,
};

use common::{FOOD, HOUSING, account, date, engine_with_db};

fn page() -> PageRequest {
    PageRequest::new(None, Some(100), 50).unwrap()
}

#[tokio::test]
async fn system_categories_are_visible_and_read_only() {
    let t = engine_with_db().await;
    let listed = t
        .engine
        .list_categories(
            &t.user_id,
            CategoryFilter {
                is_system: Some(true),
                ..CategoryFilter::default()
            },
            page(),
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 9);
    assert!(listed.items.iter().all(|c| c.is_system && c.user_id.is_none()));

    let err = t
        .engine
        .update_category(
            FOOD,
            &t.user_id,
            CategoryPatch {
                name: Some("Meals".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("System categories cannot be modified".to_string())
    );
    let err = t.engine.delete_category(FOOD, &t.user_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("System categories cannot be deleted".to_string())
    );
}

#[tokio::test]
async fn listing_orders_by_sort_order_then_name_and_filters_by_parent() {
    let t = engine_with_db().await;
    let groceries = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Groceries", TransactionKind::Expense).parent(FOOD),
        )
        .await
        .unwrap();
    let bakery = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Bakery", TransactionKind::Expense).parent(FOOD),
        )
        .await
        .unwrap();

    let children = t
        .engine
        .list_categories(
            &t.user_id,
            CategoryFilter {
                parent: Some(ParentFilter::Id(FOOD.to_string())),
                ..CategoryFilter::default()
            },
            page(),
        )
        .await
        .unwrap();
    let ids: Vec<_> = children.items.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![bakery.id, groceries.id]);

    let income_roots = t
        .engine
        .list_categories(
            &t.user_id,
            CategoryFilter {
                kind: Some(TransactionKind::Income),
                parent: Some(ParentFilter::Root),
                ..CategoryFilter::default()
            },
            page(),
        )
        .await
        .unwrap();
    let names: Vec<&str> = income_roots.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Salary", "Investments", "Other income"]);
}

#[tokio::test]
async fn transaction_counts_are_included_on_request() {
    let t = engine_with_db().await;
    let a = account(&t.engine, &t.user_id, "Checking", 0).await;
    for _ in 0..2 {
        t.engine
            .create_transaction(
                &t.user_id,
                NewTransaction::new(
                    TransactionKind::Expense,
                    100,
                    "Lunch",
                    date(2026, 3, 1),
                    a.id.to_string(),
                )
                .category(FOOD),
            )
            .await
            .unwrap();
    }

    let listed = t
        .engine
        .list_categories(
            &t.user_id,
            CategoryFilter {
                include_counts: true,
                kind: Some(TransactionKind::Expense),
                ..CategoryFilter::default()
            },
            page(),
        )
        .await
        .unwrap();
    let food = listed.items.iter().find(|c| c.name == "Food").unwrap();
    assert_eq!(food.transaction_count, Some(2));
    let housing = listed.items.iter().find(|c| c.name == "Housing").unwrap();
    assert_eq!(housing.transaction_count, Some(0));
}

#[tokio::test]
async fn hierarchy_nests_user_categories_under_system_roots() {
    let t = engine_with_db().await;
    let groceries = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Groceries", TransactionKind::Expense).parent(FOOD),
        )
        .await
        .unwrap();
    t.engine
        .create_category(
            &t.user_id,
            NewCategory::new("Fruit", TransactionKind::Expense).parent(groceries.id.to_string()),
        )
        .await
        .unwrap();

    let forest = t.engine.category_hierarchy(&t.user_id).await.unwrap();
    assert_eq!(forest.len(), 9);
    let food = forest.iter().find(|n| n.category.name == "Food").unwrap();
    assert_eq!(food.children.len(), 1);
    assert_eq!(food.children[0].category.name, "Groceries");
    assert_eq!(food.children[0].children[0].category.name, "Fruit");
}

#[tokio::test]
async fn parents_must_exist_and_be_accessible() {
    let t = engine_with_db().await;
    let err = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Orphan", TransactionKind::Expense)
                .parent("00000000-0000-4000-8000-000000000000"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidInput("Parent category not found".to_string())
    );

    let bob = common::register(&t.engine, "bob").await;
    let private = t
        .engine
        .create_category(&bob, NewCategory::new("Private", TransactionKind::Expense))
        .await
        .unwrap();
    let err = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Sneaky", TransactionKind::Expense).parent(private.id.to_string()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("Access denied to parent category".to_string())
    );

    let err = t
        .engine
        .category(&private.id.to_string(), &t.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn reparenting_rejects_self_and_cycles() {
    let t = engine_with_db().await;
    let parent = t
        .engine
        .create_category(&t.user_id, NewCategory::new("Parent", TransactionKind::Expense))
        .await
        .unwrap();
    let child = t
        .engine
        .create_category(
            &t.user_id,
            NewCategory::new("Child", TransactionKind::Expense).parent(parent.id.to_string()),
        )
        .await
        .unwrap();

    let to_parent = |id: String| CategoryPatch {
        parent_id: Some(Some(id)),
        ..CategoryPatch::default()
    };

    let err = t
        .engine
        .update_category(&parent.id.to_string(), &t.user_id, to_parent(parent.id.to_string()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidInput("Category cannot be its own parent".to_string())
    );

    let err = t
        .engine
        .update_category(&parent.id.to_string(), &t.user_id, to_parent(child.id.to_string()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidInput("Circular reference detected".to_string())
    );

    let moved = t
        .engine
        .update_category(&child.id.to_string(), &t.user_id, to_parent(HOUSING.to_string()))
        .await
        .unwrap();
    assert_eq!(moved.parent_id.map(|id| id.to_string()).as_deref(), Some(HOUSING));
}

#[tokio::test]
async fn delete_detaches_children_transactions_and_goals_and_drops_budgets() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let parent = engine
        .create_category(user, NewCategory::new("Hobbies", TransactionKind::Expense))
        .await
        .unwrap();
    let parent_id = parent.id.to_string();
    let child = engine
        .create_category(
            user,
            NewCategory::new("Climbing", TransactionKind::Expense).parent(parent_id.clone()),
        )
        .await
        .unwrap();
    let a = account(engine, user, "Checking", 0).await;
    let tx = engine
        .create_transaction(
            user,
            NewTransaction::new(
                TransactionKind::Expense,
                100,
                "Chalk",
                date(2026, 3, 1),
                a.id.to_string(),
            )
            .category(parent_id.clone()),
        )
        .await
        .unwrap();
    let budget = engine
        .create_budget(
            user,
            NewBudget {
                name: "Hobby cap".to_string(),
                description: None,
                amount_minor: 10_000,
                currency: None,
                period: BudgetPeriod::Monthly,
                start_date: date(2026, 3, 1),
                end_date: None,
                color: None,
                auto_reset: None,
                alert_enabled: None,
                alert_threshold: None,
                include_subcategories: None,
                category_id: parent_id.clone(),
            },
        )
        .await
        .unwrap();
    let goal = engine
        .create_goal(
            user,
            NewGoal {
                name: "Gear".to_string(),
                description: None,
                kind: GoalKind::Savings,
                target_amount: 50_000,
                current_amount: None,
                currency: None,
                start_date: date(2026, 1, 1),
                target_date: date(2026, 12, 31),
                period: None,
                color: None,
                icon: None,
                auto_calculate: false,
                milestones: Vec::new(),
                category_id: Some(parent_id.clone()),
            },
        )
        .await
        .unwrap();

    engine.delete_category(&parent_id, user).await.unwrap();

    let child = engine.category(&child.id.to_string(), user).await.unwrap();
    assert_eq!(child.parent_id, None);
    let tx = engine.transaction(&tx.id.to_string(), user).await.unwrap();
    assert_eq!(tx.category_id, None);
    let goal = engine.goal(&goal.id.to_string(), user).await.unwrap();
    assert_eq!(goal.category_id, None);
    let err = engine
        .budget(&budget.id.to_string(), user)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.category(&parent_id, user).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
