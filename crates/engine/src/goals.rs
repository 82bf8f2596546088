//! Financial goals: savings targets, debt payoff, spending limits and
//! investments.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, TransactionKind, util::parse_uuid};

pub const DEFAULT_GOAL_COLOR: &str = "#4caf50";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Savings,
    DebtPayment,
    SpendingLimit,
    Investment,
}

impl GoalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::DebtPayment => "debt_payment",
            Self::SpendingLimit => "spending_limit",
            Self::Investment => "investment",
        }
    }

    /// Kind of category transactions that count towards the goal.
    pub fn tracked_kind(self) -> TransactionKind {
        match self {
            Self::Savings | Self::Investment => TransactionKind::Income,
            Self::DebtPayment | Self::SpendingLimit => TransactionKind::Expense,
        }
    }
}

impl TryFrom<&str> for GoalKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "savings" => Ok(Self::Savings),
            "debt_payment" => Ok(Self::DebtPayment),
            "spending_limit" => Ok(Self::SpendingLimit),
            "investment" => Ok(Self::Investment),
            other => Err(EngineError::InvalidInput(format!(
                "invalid goal type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    Custom,
}

impl GoalPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for GoalPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidInput(format!(
                "invalid goal period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for GoalStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid goal status: {other}"
            ))),
        }
    }
}

/// Intermediate checkpoint of a goal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub amount: i64,
    #[serde(default)]
    pub reached_at: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub target_amount: i64,
    pub current_amount: i64,
    pub currency: Currency,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub period: GoalPeriod,
    pub status: GoalStatus,
    pub color: String,
    pub icon: Option<String>,
    pub progress: f64,
    pub auto_calculate: bool,
    pub milestones: Vec<Milestone>,
    pub completed_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Recompute `progress`, stamp reached milestones and complete the goal
    /// when an active, non spending-limit goal hits its target.
    pub fn refresh_progress(&mut self, today: NaiveDate) {
        self.progress = crate::util::capped_percent(self.current_amount, self.target_amount);
        for milestone in &mut self.milestones {
            if milestone.reached_at.is_none() && self.current_amount >= milestone.amount {
                milestone.reached_at = Some(today);
            }
        }
        if self.status == GoalStatus::Active
            && self.kind != GoalKind::SpendingLimit
            && self.current_amount >= self.target_amount
        {
            self.status = GoalStatus::Completed;
            self.completed_at = Some(today);
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub target_amount: i64,
    pub current_amount: i64,
    pub currency: String,
    pub start_date: Date,
    pub target_date: Date,
    pub period: String,
    pub status: String,
    pub color: String,
    pub icon: Option<String>,
    pub progress: f64,
    pub auto_calculate: bool,
    pub milestones: Option<Json>,
    pub completed_at: Option<Date>,
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
        on_delete = "SetNull"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(value: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.to_string()),
            category_id: ActiveValue::Set(value.category_id.map(|id| id.to_string())),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            target_amount: ActiveValue::Set(value.target_amount),
            current_amount: ActiveValue::Set(value.current_amount),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            start_date: ActiveValue::Set(value.start_date),
            target_date: ActiveValue::Set(value.target_date),
            period: ActiveValue::Set(value.period.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            color: ActiveValue::Set(value.color.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            progress: ActiveValue::Set(value.progress),
            auto_calculate: ActiveValue::Set(value.auto_calculate),
            milestones: ActiveValue::Set(if value.milestones.is_empty() {
                None
            } else {
                Some(serde_json::json!(value.milestones))
            }),
            completed_at: ActiveValue::Set(value.completed_at),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let milestones = match model.milestones {
            Some(value) => serde_json::from_value::<Vec<Milestone>>(value)
                .map_err(|_| EngineError::InvalidInput("invalid stored milestones".to_string()))?,
            None => Vec::new(),
        };
        Ok(Self {
            id: parse_uuid(&model.id, "goal")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            name: model.name,
            description: model.description,
            kind: GoalKind::try_from(model.kind.as_str())?,
            target_amount: model.target_amount,
            current_amount: model.current_amount,
            currency: Currency::try_from(model.currency.as_str())?,
            start_date: model.start_date,
            target_date: model.target_date,
            period: GoalPeriod::try_from(model.period.as_str())?,
            status: GoalStatus::try_from(model.status.as_str())?,
            color: model.color,
            icon: model.icon,
            progress: model.progress,
            auto_calculate: model.auto_calculate,
            milestones,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
