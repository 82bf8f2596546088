use chrono::NaiveDate;
use sea_orm::{
    Condition, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait, Value, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPatch, BudgetStatus, Currency, EngineError, NewBudget, Page, PageRequest,
    ResultEngine, budgets, categories,
    util::{
        ensure_color, ensure_date_order, ensure_positive_amount, normalize_optional_text,
        normalize_required_name, parse_uuid, sum_overflow,
    },
};

use super::{Engine, categories::with_descendants, with_tx};

fn ensure_alert_threshold(threshold: i32) -> ResultEngine<()> {
    if !(0..=100).contains(&threshold) {
        return Err(EngineError::InvalidInput(
            "alert threshold must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

fn validate(budget: &Budget) -> ResultEngine<()> {
    ensure_positive_amount(budget.amount, "budget amount")?;
    ensure_alert_threshold(budget.alert_threshold)?;
    ensure_date_order(budget.start_date, budget.end_date, "start date", "end date")
}

/// Completed expenses of `user_id` in the given categories dated in `[start, end]`.
async fn spent_in<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_ids: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> ResultEngine<i64> {
    if category_ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; category_ids.len()].join(", ");
    let sql = format!(
        "SELECT COALESCE(SUM(amount_minor), 0) AS spent FROM transactions \
         WHERE user_id = ? AND kind = 'expense' AND status = 'completed' \
         AND date >= ? AND date <= ? AND category_id IN ({placeholders})"
    );
    let mut values: Vec<Value> = vec![user_id.into(), start.into(), end.into()];
    values.extend(category_ids.iter().map(|id| Value::from(id.as_str())));

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await
        .map_err(sum_overflow)?;
    match row {
        Some(row) => Ok(row.try_get("", "spent")?),
        None => Ok(0),
    }
}

impl Engine {
    pub async fn create_budget(&self, user_id: &str, cmd: NewBudget) -> ResultEngine<Budget> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let category = self
                .require_category_for_reference(&db_tx, &cmd.category_id, user_id)
                .await?;
            let end_date = match cmd.end_date {
                Some(end) => end,
                None => cmd.period.window_end(cmd.start_date).ok_or_else(|| {
                    EngineError::InvalidDate("budget window out of range".to_string())
                })?,
            };
            let alert_threshold = cmd
                .alert_threshold
                .unwrap_or(budgets::DEFAULT_ALERT_THRESHOLD);

            let budget = Budget {
                id: Uuid::new_v4(),
                user_id: parse_uuid(user_id, "user")?,
                category_id: parse_uuid(&category.id, "category")?,
                name: normalize_required_name(&cmd.name, "Budget name")?,
                description: normalize_optional_text(cmd.description.as_deref()),
                amount: cmd.amount_minor,
                spent: 0,
                remaining: cmd.amount_minor,
                currency: match cmd.currency.as_deref() {
                    Some(code) => Currency::try_from(code)?,
                    None => Currency::try_from(user.default_currency.as_str())?,
                },
                period: cmd.period,
                start_date: cmd.start_date,
                end_date,
                status: BudgetStatus::Active,
                color: match cmd.color.as_deref() {
                    Some(color) => ensure_color(color)?,
                    None => budgets::DEFAULT_BUDGET_COLOR.to_string(),
                },
                auto_reset: cmd.auto_reset.unwrap_or(true),
                alert_enabled: cmd.alert_enabled.unwrap_or(true),
                alert_threshold,
                progress: 0.0,
                alert: false,
                include_subcategories: cmd.include_subcategories.unwrap_or(false),
                created_at: now,
                updated_at: now,
            };
            validate(&budget)?;

            let model = budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            tracing::info!(budget_id = %budget.id, user_id, "budget created");
            self.refresh_budget(&db_tx, model).await
        })
    }

    /// Budgets of the user, refreshed, newest first.
    pub async fn list_budgets(
        &self,
        user_id: &str,
        status: Option<BudgetStatus>,
        page: PageRequest,
    ) -> ResultEngine<Page<Budget>> {
        with_tx!(self, |db_tx| {
            let owned = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;
            for model in owned {
                self.refresh_budget(&db_tx, model).await?;
            }

            let mut query = budgets::Entity::find().filter(budgets::Column::UserId.eq(user_id));
            if let Some(status) = status {
                query = query.filter(budgets::Column::Status.eq(status.as_str()));
            }
            let total = query.clone().count(&db_tx).await?;
            let items = query
                .order_by_desc(budgets::Column::CreatedAt)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Budget::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    pub async fn budget(&self, budget_id: &str, user_id: &str) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id, user_id).await?;
            self.refresh_budget(&db_tx, model).await
        })
    }

    pub async fn update_budget(
        &self,
        budget_id: &str,
        user_id: &str,
        patch: BudgetPatch,
    ) -> ResultEngine<Budget> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id, user_id).await?;
            let mut budget = Budget::try_from(model)?;

            if let Some(name) = patch.name.as_deref() {
                budget.name = normalize_required_name(name, "Budget name")?;
            }
            if let Some(description) = patch.description {
                budget.description = normalize_optional_text(description.as_deref());
            }
            if let Some(amount) = patch.amount_minor {
                budget.amount = amount;
            }
            if let Some(code) = patch.currency.as_deref() {
                budget.currency = Currency::try_from(code)?;
            }
            if let Some(period) = patch.period {
                budget.period = period;
            }
            if let Some(start) = patch.start_date {
                budget.start_date = start;
            }
            if let Some(end) = patch.end_date {
                budget.end_date = end;
            }
            if let Some(status) = patch.status {
                budget.status = status;
            }
            if let Some(color) = patch.color.as_deref() {
                budget.color = ensure_color(color)?;
            }
            if let Some(auto_reset) = patch.auto_reset {
                budget.auto_reset = auto_reset;
            }
            if let Some(alert_enabled) = patch.alert_enabled {
                budget.alert_enabled = alert_enabled;
            }
            if let Some(threshold) = patch.alert_threshold {
                budget.alert_threshold = threshold;
            }
            if let Some(include) = patch.include_subcategories {
                budget.include_subcategories = include;
            }
            if let Some(category) = patch.category_id.as_deref() {
                let category = self
                    .require_category_for_reference(&db_tx, category, user_id)
                    .await?;
                budget.category_id = parse_uuid(&category.id, "category")?;
            }
            budget.updated_at = now;
            validate(&budget)?;

            let model = budgets::ActiveModel::from(&budget).update(&db_tx).await?;
            self.refresh_budget(&db_tx, model).await
        })
    }

    pub async fn delete_budget(&self, budget_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id, user_id).await?;
            budgets::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(budget_id = %model.id, user_id, "budget deleted");
            Ok::<_, EngineError>(())
        })
    }

    /// Roll the window when due, recompute spending and persist changes.
    async fn refresh_budget(
        &self,
        db: &DatabaseTransaction,
        model: budgets::Model,
    ) -> ResultEngine<Budget> {
        let mut budget = Budget::try_from(model)?;
        let original = budget.clone();

        if budget.auto_reset
            && let Some((start, end)) =
                budget
                    .period
                    .roll_window(budget.start_date, budget.end_date, self.today())
        {
            tracing::debug!(budget_id = %budget.id, %start, %end, "budget window rolled");
            budget.start_date = start;
            budget.end_date = end;
        }

        let user_id = budget.user_id.to_string();
        let category_id = budget.category_id.to_string();
        let category_ids = if budget.include_subcategories {
            let visible = categories::Entity::find()
                .filter(
                    Condition::any()
                        .add(categories::Column::IsSystem.eq(true))
                        .add(categories::Column::UserId.eq(user_id.clone())),
                )
                .all(db)
                .await?;
            with_descendants(&category_id, &visible)
        } else {
            vec![category_id]
        };
        let spent = spent_in(db, &user_id, &category_ids, budget.start_date, budget.end_date).await?;
        budget.record_spent(spent)?;

        if budget != original {
            budget.updated_at = self.now();
            budgets::ActiveModel::from(&budget).update(db).await?;
        }
        Ok(budget)
    }
}
