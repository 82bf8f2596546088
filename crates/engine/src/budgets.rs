//! Budgets cap the spending on a category over a date window.
//!
//! `spent`, `progress` and `status` are derived from the ledger and refreshed
//! whenever a budget is read.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    util::{amount_overflow, parse_uuid},
};

pub const DEFAULT_BUDGET_COLOR: &str = "#ff9800";
pub const DEFAULT_ALERT_THRESHOLD: i32 = 80;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Shift `date` forward by one period.
    pub fn advance(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }

    /// Last day of the window that starts on `start`.
    pub fn window_end(self, start: NaiveDate) -> Option<NaiveDate> {
        self.advance(start)?.pred_opt()
    }

    /// Move `[start, end]` forward by whole periods until it contains `today`.
    ///
    /// Returns `None` when the window already contains or follows `today`.
    pub fn roll_window(
        self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Option<(NaiveDate, NaiveDate)> {
        if today <= end {
            return None;
        }
        let (mut start, mut end) = (start, end);
        while today > end {
            start = end.succ_opt()?;
            end = self.window_end(start)?;
        }
        Some((start, end))
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidInput(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Active,
    Inactive,
    Exceeded,
}

impl BudgetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Exceeded => "exceeded",
        }
    }

    /// Status after `spent` has been recomputed. `Inactive` is sticky.
    pub fn after_spending(self, spent: i64, amount: i64) -> Self {
        match self {
            Self::Inactive => Self::Inactive,
            _ if spent > amount => Self::Exceeded,
            _ => Self::Active,
        }
    }
}

impl TryFrom<&str> for BudgetStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "exceeded" => Ok(Self::Exceeded),
            other => Err(EngineError::InvalidInput(format!(
                "invalid budget status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount: i64,
    pub spent: i64,
    pub remaining: i64,
    pub currency: Currency,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BudgetStatus,
    pub color: String,
    pub auto_reset: bool,
    pub alert_enabled: bool,
    pub alert_threshold: i32,
    pub progress: f64,
    /// `alert_enabled` and `progress >= alert_threshold`.
    pub alert: bool,
    pub include_subcategories: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Apply a freshly computed `spent` to every derived figure.
    pub fn record_spent(&mut self, spent: i64) -> ResultEngine<()> {
        self.remaining = self
            .amount
            .checked_sub(spent)
            .ok_or_else(|| amount_overflow("budget spending"))?;
        self.spent = spent;
        self.progress = crate::util::capped_percent(spent, self.amount);
        self.status = self.status.after_spending(spent, self.amount);
        self.alert = self.alert_enabled && self.progress >= f64::from(self.alert_threshold);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub spent_minor: i64,
    pub currency: String,
    pub period: String,
    pub start_date: Date,
    pub end_date: Date,
    pub status: String,
    pub color: String,
    pub auto_reset: bool,
    pub alert_enabled: bool,
    pub alert_threshold: i32,
    pub progress: f64,
    pub include_subcategories: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(value: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.to_string()),
            category_id: ActiveValue::Set(value.category_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            amount_minor: ActiveValue::Set(value.amount),
            spent_minor: ActiveValue::Set(value.spent),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            period: ActiveValue::Set(value.period.as_str().to_string()),
            start_date: ActiveValue::Set(value.start_date),
            end_date: ActiveValue::Set(value.end_date),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            color: ActiveValue::Set(value.color.clone()),
            auto_reset: ActiveValue::Set(value.auto_reset),
            alert_enabled: ActiveValue::Set(value.alert_enabled),
            alert_threshold: ActiveValue::Set(value.alert_threshold),
            progress: ActiveValue::Set(value.progress),
            include_subcategories: ActiveValue::Set(value.include_subcategories),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let progress = model.progress;
        let alert = model.alert_enabled && progress >= f64::from(model.alert_threshold);
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            category_id: parse_uuid(&model.category_id, "category")?,
            name: model.name,
            description: model.description,
            amount: model.amount_minor,
            spent: model.spent_minor,
            remaining: model
                .amount_minor
                .checked_sub(model.spent_minor)
                .ok_or_else(|| amount_overflow("budget spending"))?,
            currency: Currency::try_from(model.currency.as_str())?,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            status: BudgetStatus::try_from(model.status.as_str())?,
            color: model.color,
            auto_reset: model.auto_reset,
            alert_enabled: model.alert_enabled,
            alert_threshold: model.alert_threshold,
            progress,
            alert,
            include_subcategories: model.include_subcategories,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_window_ends_the_day_before_next_start() {
        assert_eq!(
            BudgetPeriod::Monthly.window_end(date(2026, 1, 1)),
            Some(date(2026, 1, 31))
        );
        assert_eq!(
            BudgetPeriod::Weekly.window_end(date(2026, 3, 2)),
            Some(date(2026, 3, 8))
        );
    }

    #[test]
    fn roll_window_skips_whole_periods_until_today() {
        let rolled = BudgetPeriod::Monthly.roll_window(
            date(2026, 1, 1),
            date(2026, 1, 31),
            date(2026, 4, 10),
        );
        assert_eq!(rolled, Some((date(2026, 4, 1), date(2026, 4, 30))));
    }

    #[test]
    fn roll_window_keeps_current_window() {
        assert_eq!(
            BudgetPeriod::Yearly.roll_window(date(2026, 1, 1), date(2026, 12, 31), date(2026, 6, 1)),
            None
        );
    }

    #[test]
    fn recorded_spending_updates_derived_figures() {
        let ts = chrono::TimeZone::timestamp_opt(&Utc, 0, 0).unwrap();
        let mut budget = Budget {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Food".to_string(),
            description: None,
            amount: 50_000,
            spent: 0,
            remaining: 50_000,
            currency: Currency::default(),
            period: BudgetPeriod::Monthly,
            start_date: date(2026, 1, 1),
            end_date: date(2026, 1, 31),
            status: BudgetStatus::Active,
            color: DEFAULT_BUDGET_COLOR.to_string(),
            auto_reset: true,
            alert_enabled: true,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            progress: 0.0,
            alert: false,
            include_subcategories: false,
            created_at: ts,
            updated_at: ts,
        };

        budget.record_spent(42_000).unwrap();
        assert_eq!(budget.remaining, 8_000);
        assert_eq!(budget.progress, 84.0);
        assert!(budget.alert);
        assert_eq!(budget.status, BudgetStatus::Active);

        budget.record_spent(60_000).unwrap();
        assert_eq!(budget.remaining, -10_000);
        assert_eq!(budget.progress, 100.0);
        assert_eq!(budget.status, BudgetStatus::Exceeded);

        assert!(matches!(
            budget.record_spent(i64::MIN),
            Err(EngineError::InvalidAmount(_))
        ));
        assert_eq!(budget.spent, 60_000);
    }

    #[test]
    fn inactive_status_survives_overspending() {
        assert_eq!(BudgetStatus::Inactive.after_spending(200, 100), BudgetStatus::Inactive);
        assert_eq!(BudgetStatus::Active.after_spending(200, 100), BudgetStatus::Exceeded);
        assert_eq!(BudgetStatus::Exceeded.after_spending(50, 100), BudgetStatus::Active);
    }
}
