//! The module contains the `Account` struct and its table.
//!
//! An account is a user-owned container of money (a bank account, a credit
//! card, cash, ...). Its `balance` is denormalized: the ledger of completed
//! transactions is the source of truth and the stored value is re-synced
//! after every write (see [`crate::balances`]).

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

pub const DEFAULT_ACCOUNT_COLOR: &str = "#1976d2";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
    Investment,
    Cash,
    Other,
}

impl AccountKind {
    pub const ALL: [AccountKind; 6] = [
        Self::Checking,
        Self::Savings,
        Self::CreditCard,
        Self::Investment,
        Self::Cash,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::CreditCard => "credit_card",
            Self::Investment => "investment",
            Self::Cash => "cash",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit_card" => Ok(Self::CreditCard),
            "investment" => Ok(Self::Investment),
            "cash" => Ok(Self::Cash),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidInput(format!(
                "invalid account type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub bank: Option<String>,
    pub account_number: Option<String>,
    /// Stored balance in minor units.
    pub balance: i64,
    pub initial_balance: i64,
    pub currency: Currency,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub include_in_totals: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub bank: Option<String>,
    pub account_number: Option<String>,
    pub balance: i64,
    pub initial_balance: i64,
    pub currency: String,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub include_in_totals: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            bank: ActiveValue::Set(value.bank.clone()),
            account_number: ActiveValue::Set(value.account_number.clone()),
            balance: ActiveValue::Set(value.balance),
            initial_balance: ActiveValue::Set(value.initial_balance),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            color: ActiveValue::Set(value.color.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            description: ActiveValue::Set(value.description.clone()),
            is_active: ActiveValue::Set(value.is_active),
            include_in_totals: ActiveValue::Set(value.include_in_totals),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            bank: model.bank,
            account_number: model.account_number,
            balance: model.balance,
            initial_balance: model.initial_balance,
            currency: Currency::try_from(model.currency.as_str())?,
            color: model.color,
            icon: model.icon,
            description: model.description,
            is_active: model.is_active,
            include_in_totals: model.include_in_totals,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
