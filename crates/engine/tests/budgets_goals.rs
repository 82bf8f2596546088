mod common;

use engine::{
    BudgetPatch, BudgetPeriod, BudgetStatus, EngineError, GoalKind, GoalStatus, Milestone,
    NewBudget, NewCategory, NewGoal, NewTransaction, PageRequest, TransactionKind,
    TransactionStatus,
};

use common::{FOOD, SALARY, account, date, engine_with_db};

fn new_budget(category_id: &str, amount: i64, start: chrono::NaiveDate) -> NewBudget {
    NewBudget {
        name: "Groceries cap".to_string(),
        description: None,
        amount_minor: amount,
        currency: None,
        period: BudgetPeriod::Monthly,
        start_date: start,
        end_date: None,
        color: None,
        auto_reset: None,
        alert_enabled: None,
        alert_threshold: None,
        include_subcategories: None,
        category_id: category_id.to_string(),
    }
}

fn new_goal(kind: GoalKind, target: i64) -> NewGoal {
    NewGoal {
        name: "Emergency fund".to_string(),
        description: None,
        kind,
        target_amount: target,
        current_amount: None,
        currency: None,
        start_date: date(2026, 1, 1),
        target_date: date(2026, 12, 31),
        period: None,
        color: None,
        icon: None,
        auto_calculate: false,
        milestones: Vec::new(),
        category_id: None,
    }
}

fn spend(amount: i64, on: chrono::NaiveDate, account_id: &str, category_id: &str) -> NewTransaction {
    NewTransaction::new(TransactionKind::Expense, amount, "Market", on, account_id)
        .category(category_id)
}

#[tokio::test]
async fn budget_rolls_forward_and_tracks_spending() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let a = account(engine, user, "Checking", 0).await;
    let a_id = a.id.to_string();
    let groceries = engine
        .create_category(
            user,
            NewCategory::new("Groceries", TransactionKind::Expense).parent(FOOD),
        )
        .await
        .unwrap();
    let groceries_id = groceries.id.to_string();

    for cmd in [
        spend(5_000, date(2026, 2, 10), &a_id, FOOD),
        spend(30_000, date(2026, 3, 3), &a_id, FOOD),
        spend(15_000, date(2026, 3, 10), &a_id, &groceries_id),
        spend(99_999, date(2026, 3, 11), &a_id, FOOD).status(TransactionStatus::Pending),
    ] {
        engine.create_transaction(user, cmd).await.unwrap();
    }

    let budget = engine
        .create_budget(user, new_budget(FOOD, 40_000, date(2026, 1, 1)))
        .await
        .unwrap();
    assert_eq!(budget.start_date, date(2026, 3, 1));
    assert_eq!(budget.end_date, date(2026, 3, 31));
    assert_eq!(budget.spent, 30_000);
    assert_eq!(budget.remaining, 10_000);
    assert_eq!(budget.progress, 75.0);
    assert!(!budget.alert);
    assert_eq!(budget.status, BudgetStatus::Active);
    assert_eq!(budget.color, "#ff9800");
    assert_eq!(budget.alert_threshold, 80);

    let budget = engine
        .update_budget(
            &budget.id.to_string(),
            user,
            BudgetPatch {
                include_subcategories: Some(true),
                ..BudgetPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(budget.spent, 45_000);
    assert_eq!(budget.remaining, -5_000);
    assert_eq!(budget.progress, 100.0);
    assert!(budget.alert);
    assert_eq!(budget.status, BudgetStatus::Exceeded);

    let exceeded = engine
        .list_budgets(
            user,
            Some(BudgetStatus::Exceeded),
            PageRequest::new(None, None, 10).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(exceeded.total, 1);
}

#[tokio::test]
async fn budget_without_auto_reset_keeps_its_window() {
    let t = engine_with_db().await;
    let a = account(&t.engine, &t.user_id, "Checking", 0).await;
    t.engine
        .create_transaction(&t.user_id, spend(5_000, date(2026, 2, 10), &a.id.to_string(), FOOD))
        .await
        .unwrap();

    let mut cmd = new_budget(FOOD, 10_000, date(2026, 2, 1));
    cmd.auto_reset = Some(false);
    let budget = t.engine.create_budget(&t.user_id, cmd).await.unwrap();
    assert_eq!(budget.end_date, date(2026, 2, 28));
    assert_eq!(budget.spent, 5_000);

    let fetched = t
        .engine
        .budget(&budget.id.to_string(), &t.user_id)
        .await
        .unwrap();
    assert_eq!(fetched.start_date, date(2026, 2, 1));
}

#[tokio::test]
async fn budget_input_is_validated() {
    let t = engine_with_db().await;

    let err = t
        .engine
        .create_budget(&t.user_id, new_budget(FOOD, 0, date(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let mut cmd = new_budget(FOOD, 100, date(2026, 3, 1));
    cmd.alert_threshold = Some(120);
    let err = t.engine.create_budget(&t.user_id, cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let mut cmd = new_budget(FOOD, 100, date(2026, 3, 1));
    cmd.end_date = Some(date(2026, 2, 1));
    let err = t.engine.create_budget(&t.user_id, cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = t
        .engine
        .create_budget(
            &t.user_id,
            new_budget("00000000-0000-4000-8000-000000000000", 100, date(2026, 3, 1)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidInput("Invalid category".to_string()));
}

#[tokio::test]
async fn auto_calculated_goal_follows_category_income() {
    let t = engine_with_db().await;
    let (engine, user) = (&t.engine, t.user_id.as_str());
    let a = account(engine, user, "Checking", 0).await;
    let income = |amount: i64, on| {
        NewTransaction::new(TransactionKind::Income, amount, "Pay", on, a.id.to_string())
            .category(SALARY)
    };
    engine
        .create_transaction(user, income(60_000, date(2026, 2, 1)))
        .await
        .unwrap();
    engine
        .create_transaction(user, income(1_000, date(2025, 12, 31)))
        .await
        .unwrap();

    let mut cmd = new_goal(GoalKind::Savings, 100_000);
    cmd.auto_calculate = true;
    cmd.category_id = Some(SALARY.to_string());
    cmd.milestones = vec![
        Milestone {
            name: "Half way".to_string(),
            amount: 50_000,
            reached_at: None,
        },
        Milestone {
            name: "Almost".to_string(),
            amount: 90_000,
            reached_at: None,
        },
    ];
    let goal = engine.create_goal(user, cmd).await.unwrap();
    assert_eq!(goal.current_amount, 60_000);
    assert_eq!(goal.progress, 60.0);
    assert_eq!(goal.milestones[0].reached_at, Some(date(2026, 3, 15)));
    assert_eq!(goal.milestones[1].reached_at, None);
    assert_eq!(goal.status, GoalStatus::Active);

    let err = engine
        .contribute_to_goal(&goal.id.to_string(), user, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    engine
        .create_transaction(user, income(40_000, date(2026, 3, 14)))
        .await
        .unwrap();
    let goal = engine.goal(&goal.id.to_string(), user).await.unwrap();
    assert_eq!(goal.current_amount, 100_000);
    assert_eq!(goal.progress, 100.0);
    assert_eq!(goal.status, GoalStatus::Completed);
    assert_eq!(goal.completed_at, Some(date(2026, 3, 15)));
}

#[tokio::test]
async fn contributions_complete_manual_goals() {
    let t = engine_with_db().await;
    let goal = t
        .engine
        .create_goal(&t.user_id, new_goal(GoalKind::Savings, 1_000))
        .await
        .unwrap();
    assert_eq!(goal.color, "#4caf50");
    assert_eq!(goal.currency.code(), "BRL");

    let goal_id = goal.id.to_string();
    let goal = t
        .engine
        .contribute_to_goal(&goal_id, &t.user_id, 400)
        .await
        .unwrap();
    assert_eq!(goal.current_amount, 400);
    assert_eq!(goal.progress, 40.0);

    let goal = t
        .engine
        .contribute_to_goal(&goal_id, &t.user_id, 600)
        .await
        .unwrap();
    assert_eq!(goal.status, GoalStatus::Completed);

    let err = t
        .engine
        .contribute_to_goal(&goal_id, &t.user_id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn spending_limits_never_complete() {
    let t = engine_with_db().await;
    let mut cmd = new_goal(GoalKind::SpendingLimit, 1_000);
    cmd.current_amount = Some(1_500);
    let goal = t.engine.create_goal(&t.user_id, cmd).await.unwrap();
    assert_eq!(goal.progress, 100.0);
    assert_eq!(goal.status, GoalStatus::Active);
    assert_eq!(goal.completed_at, None);
}

#[tokio::test]
async fn goal_dates_and_amounts_are_validated() {
    let t = engine_with_db().await;

    let mut cmd = new_goal(GoalKind::Investment, 1_000);
    cmd.target_date = date(2025, 12, 31);
    let err = t.engine.create_goal(&t.user_id, cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = t
        .engine
        .create_goal(&t.user_id, new_goal(GoalKind::Investment, -5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let bob = common::register(&t.engine, "bob").await;
    let goal = t
        .engine
        .create_goal(&t.user_id, new_goal(GoalKind::Savings, 1_000))
        .await
        .unwrap();
    let err = t
        .engine
        .goal(&goal.id.to_string(), &bob)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("You don't have access to this goal".to_string())
    );
}
