use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait, Value, prelude::*,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Goal, GoalPatch, GoalStatus, Milestone, NewGoal, Page, PageRequest,
    ResultEngine, TransactionKind, goals,
    util::{
        amount_overflow, ensure_amount_in_range, ensure_color, ensure_date_order,
        ensure_positive_amount, normalize_optional_text, normalize_required_name, parse_uuid,
        sum_overflow,
    },
};

use super::{Engine, with_tx};

fn normalize_milestones(milestones: Vec<Milestone>) -> ResultEngine<Vec<Milestone>> {
    let mut milestones = milestones
        .into_iter()
        .map(|milestone| {
            ensure_positive_amount(milestone.amount, "milestone amount")?;
            Ok(Milestone {
                name: normalize_required_name(&milestone.name, "Milestone name")?,
                ..milestone
            })
        })
        .collect::<ResultEngine<Vec<_>>>()?;
    milestones.sort_by_key(|milestone| milestone.amount);
    Ok(milestones)
}

fn validate(goal: &Goal) -> ResultEngine<()> {
    ensure_positive_amount(goal.target_amount, "target amount")?;
    if goal.current_amount < 0 {
        return Err(EngineError::InvalidAmount(
            "current amount must not be negative".to_string(),
        ));
    }
    ensure_amount_in_range(goal.current_amount, "current amount")?;
    ensure_date_order(goal.start_date, goal.target_date, "start date", "target date")
}

/// Completed transactions of `kind` in the category dated in `[start, end]`.
async fn tracked_total<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_id: &str,
    kind: TransactionKind,
    start: NaiveDate,
    end: NaiveDate,
) -> ResultEngine<i64> {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS total FROM transactions \
             WHERE user_id = ? AND category_id = ? AND kind = ? AND status = 'completed' \
             AND date >= ? AND date <= ?",
            [
                Value::from(user_id),
                Value::from(category_id),
                Value::from(kind.as_str()),
                start.into(),
                end.into(),
            ],
        ))
        .await
        .map_err(sum_overflow)?;
    match row {
        Some(row) => Ok(row.try_get("", "total")?),
        None => Ok(0),
    }
}

impl Engine {
    pub async fn create_goal(&self, user_id: &str, cmd: NewGoal) -> ResultEngine<Goal> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let category_id = match cmd.category_id.as_deref() {
                Some(category) => {
                    let model = self
                        .require_category_for_reference(&db_tx, category, user_id)
                        .await?;
                    Some(parse_uuid(&model.id, "category")?)
                }
                None => None,
            };

            let goal = Goal {
                id: Uuid::new_v4(),
                user_id: parse_uuid(user_id, "user")?,
                category_id,
                name: normalize_required_name(&cmd.name, "Goal name")?,
                description: normalize_optional_text(cmd.description.as_deref()),
                kind: cmd.kind,
                target_amount: cmd.target_amount,
                current_amount: cmd.current_amount.unwrap_or(0),
                currency: match cmd.currency.as_deref() {
                    Some(code) => Currency::try_from(code)?,
                    None => Currency::try_from(user.default_currency.as_str())?,
                },
                start_date: cmd.start_date,
                target_date: cmd.target_date,
                period: cmd.period.unwrap_or_default(),
                status: GoalStatus::Active,
                color: match cmd.color.as_deref() {
                    Some(color) => ensure_color(color)?,
                    None => goals::DEFAULT_GOAL_COLOR.to_string(),
                },
                icon: normalize_optional_text(cmd.icon.as_deref()),
                progress: 0.0,
                auto_calculate: cmd.auto_calculate,
                milestones: normalize_milestones(cmd.milestones)?,
                completed_at: None,
                created_at: now,
                updated_at: now,
            };
            validate(&goal)?;

            let model = goals::ActiveModel::from(&goal).insert(&db_tx).await?;
            tracing::info!(goal_id = %goal.id, user_id, "goal created");
            self.refresh_goal(&db_tx, model).await
        })
    }

    /// Goals of the user, refreshed, newest first.
    pub async fn list_goals(
        &self,
        user_id: &str,
        status: Option<GoalStatus>,
        page: PageRequest,
    ) -> ResultEngine<Page<Goal>> {
        with_tx!(self, |db_tx| {
            let owned = goals::Entity::find()
                .filter(goals::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;
            for model in owned {
                self.refresh_goal(&db_tx, model).await?;
            }

            let mut query = goals::Entity::find().filter(goals::Column::UserId.eq(user_id));
            if let Some(status) = status {
                query = query.filter(goals::Column::Status.eq(status.as_str()));
            }
            let total = query.clone().count(&db_tx).await?;
            let items = query
                .order_by_desc(goals::Column::CreatedAt)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Goal::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    pub async fn goal(&self, goal_id: &str, user_id: &str) -> ResultEngine<Goal> {
        with_tx!(self, |db_tx| {
            let model = self.require_goal(&db_tx, goal_id, user_id).await?;
            self.refresh_goal(&db_tx, model).await
        })
    }

    pub async fn update_goal(
        &self,
        goal_id: &str,
        user_id: &str,
        patch: GoalPatch,
    ) -> ResultEngine<Goal> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_goal(&db_tx, goal_id, user_id).await?;
            let mut goal = Goal::try_from(model)?;

            if let Some(name) = patch.name.as_deref() {
                goal.name = normalize_required_name(name, "Goal name")?;
            }
            if let Some(description) = patch.description {
                goal.description = normalize_optional_text(description.as_deref());
            }
            if let Some(kind) = patch.kind {
                goal.kind = kind;
            }
            if let Some(target) = patch.target_amount {
                goal.target_amount = target;
            }
            if let Some(current) = patch.current_amount {
                goal.current_amount = current;
            }
            if let Some(code) = patch.currency.as_deref() {
                goal.currency = Currency::try_from(code)?;
            }
            if let Some(start) = patch.start_date {
                goal.start_date = start;
            }
            if let Some(target_date) = patch.target_date {
                goal.target_date = target_date;
            }
            if let Some(period) = patch.period {
                goal.period = period;
            }
            if let Some(status) = patch.status {
                goal.status = status;
                goal.completed_at = match status {
                    GoalStatus::Completed => goal.completed_at.or(Some(self.today())),
                    _ => None,
                };
            }
            if let Some(color) = patch.color.as_deref() {
                goal.color = ensure_color(color)?;
            }
            if let Some(icon) = patch.icon {
                goal.icon = normalize_optional_text(icon.as_deref());
            }
            if let Some(auto_calculate) = patch.auto_calculate {
                goal.auto_calculate = auto_calculate;
            }
            if let Some(milestones) = patch.milestones {
                goal.milestones = normalize_milestones(milestones)?;
            }
            if let Some(category) = patch.category_id {
                goal.category_id = match category.as_deref() {
                    Some(category) => {
                        let model = self
                            .require_category_for_reference(&db_tx, category, user_id)
                            .await?;
                        Some(parse_uuid(&model.id, "category")?)
                    }
                    None => None,
                };
            }
            goal.updated_at = now;
            validate(&goal)?;

            let model = goals::ActiveModel::from(&goal).update(&db_tx).await?;
            self.refresh_goal(&db_tx, model).await
        })
    }

    pub async fn delete_goal(&self, goal_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_goal(&db_tx, goal_id, user_id).await?;
            goals::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(goal_id = %model.id, user_id, "goal deleted");
            Ok::<_, EngineError>(())
        })
    }

    /// Add `amount_minor` to a manually tracked goal.
    pub async fn contribute_to_goal(
        &self,
        goal_id: &str,
        user_id: &str,
        amount_minor: i64,
    ) -> ResultEngine<Goal> {
        ensure_positive_amount(amount_minor, "contribution amount")?;
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_goal(&db_tx, goal_id, user_id).await?;
            let mut goal = Goal::try_from(model)?;
            if goal.auto_calculate && goal.category_id.is_some() {
                return Err(EngineError::InvalidInput(
                    "Goal progress is calculated from transactions".to_string(),
                ));
            }
            if goal.status == GoalStatus::Cancelled {
                return Err(EngineError::InvalidInput(
                    "Cannot contribute to a cancelled goal".to_string(),
                ));
            }

            goal.current_amount = goal
                .current_amount
                .checked_add(amount_minor)
                .ok_or_else(|| amount_overflow("current amount"))?;
            goal.updated_at = now;
            let model = goals::ActiveModel::from(&goal).update(&db_tx).await?;
            tracing::info!(goal_id = %goal.id, amount_minor, "goal contribution");
            self.refresh_goal(&db_tx, model).await
        })
    }

    /// Derive the current amount when tracked by category, recompute
    /// progress and milestones, and persist changes.
    async fn refresh_goal(
        &self,
        db: &DatabaseTransaction,
        model: goals::Model,
    ) -> ResultEngine<Goal> {
        let mut goal = Goal::try_from(model)?;
        let original = goal.clone();

        if goal.auto_calculate
            && let Some(category_id) = goal.category_id
        {
            goal.current_amount = tracked_total(
                db,
                &goal.user_id.to_string(),
                &category_id.to_string(),
                goal.kind.tracked_kind(),
                goal.start_date,
                goal.target_date,
            )
            .await?;
        }
        goal.refresh_progress(self.today());

        if goal != original {
            goal.updated_at = self.now();
            goals::ActiveModel::from(&goal).update(db).await?;
        }
        Ok(goal)
    }
}
