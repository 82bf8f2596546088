//! Transaction primitives.
//!
//! A `Transaction` moves `amount_minor` out of or into `from_account_id`;
//! transfers also credit `to_account_id`. Only `completed` transactions count
//! towards balances.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [Self::Income, Self::Expense, Self::Transfer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 3] = [Self::Pending, Self::Completed, Self::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Stored only; no occurrences are generated from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for RecurringPattern {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidInput(format!(
                "invalid recurring pattern: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub currency: Currency,
    pub reference: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub from_account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Accounts whose balance depends on this transaction.
    pub fn touched_accounts(&self) -> Vec<Uuid> {
        let mut ids = vec![self.from_account_id];
        if let Some(to) = self.to_account_id
            && to != self.from_account_id
        {
            ids.push(to);
        }
        ids
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub notes: Option<String>,
    pub date: Date,
    pub status: String,
    pub currency: String,
    pub reference: Option<String>,
    pub tags: Option<Json>,
    pub location: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
    pub recurring_end_date: Option<Date>,
    pub category_id: Option<String>,
    pub from_account_id: String,
    pub to_account_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::FromAccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    FromAccount,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::ToAccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    ToAccount,
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

impl From<&Transaction> for ActiveModel {
    fn from(value: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.to_string()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            description: ActiveValue::Set(value.description.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            date: ActiveValue::Set(value.date),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            reference: ActiveValue::Set(value.reference.clone()),
            tags: ActiveValue::Set(if value.tags.is_empty() {
                None
            } else {
                Some(serde_json::json!(value.tags))
            }),
            location: ActiveValue::Set(value.location.clone()),
            is_recurring: ActiveValue::Set(value.is_recurring),
            recurring_pattern: ActiveValue::Set(
                value.recurring_pattern.map(|p| p.as_str().to_string()),
            ),
            recurring_end_date: ActiveValue::Set(value.recurring_end_date),
            category_id: ActiveValue::Set(value.category_id.map(|id| id.to_string())),
            from_account_id: ActiveValue::Set(value.from_account_id.to_string()),
            to_account_id: ActiveValue::Set(value.to_account_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let tags = match model.tags {
            Some(value) => serde_json::from_value::<Vec<String>>(value)
                .map_err(|_| EngineError::InvalidInput("invalid stored tags".to_string()))?,
            None => Vec::new(),
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            description: model.description,
            notes: model.notes,
            date: model.date,
            status: TransactionStatus::try_from(model.status.as_str())?,
            currency: Currency::try_from(model.currency.as_str())?,
            reference: model.reference,
            tags,
            location: model.location,
            is_recurring: model.is_recurring,
            recurring_pattern: model
                .recurring_pattern
                .as_deref()
                .map(RecurringPattern::try_from)
                .transpose()?,
            recurring_end_date: model.recurring_end_date,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            from_account_id: parse_uuid(&model.from_account_id, "account")?,
            to_account_id: model
                .to_account_id
                .as_deref()
                .map(|id| parse_uuid(id, "account"))
                .transpose()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
