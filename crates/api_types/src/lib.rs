//! JSON bodies exchanged over `/api/v1`.
//!
//! Money values are integers in minor units. Enum-like fields (`type`,
//! `status`, `period`) travel as lower-case strings and are validated by the
//! server.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a field that distinguishes "absent" from `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a
/// missing field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod envelope {
    use super::*;

    /// Successful response wrapper.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ApiResponse<T> {
        pub success: bool,
        pub data: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub meta: Option<ApiMeta>,
    }

    impl<T> ApiResponse<T> {
        pub fn ok(data: T) -> Self {
            Self {
                success: true,
                data,
                meta: None,
            }
        }

        pub fn paged(data: T, meta: ApiMeta) -> Self {
            Self {
                success: true,
                data,
                meta: Some(meta),
            }
        }
    }

    /// Pagination details of a list response.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ApiMeta {
        pub page: u64,
        pub limit: u64,
        pub total: u64,
        pub total_pages: u64,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub success: bool,
        pub error: String,
        pub status_code: u16,
        pub timestamp: DateTime<Utc>,
        pub path: String,
    }

    /// Body of operations that only report what happened.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageView {
        pub message: String,
    }

    #[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
    pub struct PageQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub email: String,
        pub password: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub locale: Option<String>,
        pub timezone: Option<String>,
        pub default_currency: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ResendVerification {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifyEmailQuery {
        pub token: String,
    }
}

pub mod user {
    use super::*;

    pub type UserNew = super::auth::Register;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub email: Option<String>,
        pub password: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub first_name: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub last_name: Option<Option<String>>,
        pub locale: Option<String>,
        pub timezone: Option<String>,
        pub default_currency: Option<String>,
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub bank: Option<String>,
        pub account_number: Option<String>,
        pub balance: Option<i64>,
        pub initial_balance: Option<i64>,
        pub currency: Option<String>,
        pub color: Option<String>,
        pub icon: Option<String>,
        pub description: Option<String>,
        pub include_in_totals: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub bank: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub account_number: Option<Option<String>>,
        pub currency: Option<String>,
        pub color: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub icon: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub description: Option<Option<String>>,
        pub is_active: Option<bool>,
        pub include_in_totals: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceUpdate {
        pub balance: i64,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub color: Option<String>,
        pub icon: Option<String>,
        pub description: Option<String>,
        pub sort_order: Option<i32>,
        pub parent_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub color: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub icon: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub description: Option<Option<String>>,
        pub is_active: Option<bool>,
        pub sort_order: Option<i32>,
        #[serde(default, deserialize_with = "double_option")]
        pub parent_id: Option<Option<String>>,
    }

    /// `parent_id` accepts a category id or `root`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub is_system: Option<bool>,
        pub is_active: Option<bool>,
        pub parent_id: Option<String>,
        pub include_counts: Option<bool>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        #[serde(rename = "type")]
        pub kind: String,
        pub amount_minor: i64,
        pub description: String,
        pub notes: Option<String>,
        pub date: NaiveDate,
        pub status: Option<String>,
        pub currency: Option<String>,
        pub reference: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        pub location: Option<String>,
        #[serde(default)]
        pub is_recurring: bool,
        pub recurring_pattern: Option<String>,
        pub recurring_end_date: Option<NaiveDate>,
        pub category_id: Option<String>,
        pub from_account_id: String,
        pub to_account_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub amount_minor: Option<i64>,
        pub description: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub notes: Option<Option<String>>,
        pub date: Option<NaiveDate>,
        pub status: Option<String>,
        pub currency: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub reference: Option<Option<String>>,
        pub tags: Option<Vec<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub location: Option<Option<String>>,
        pub is_recurring: Option<bool>,
        #[serde(default, deserialize_with = "double_option")]
        pub recurring_pattern: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub recurring_end_date: Option<Option<NaiveDate>>,
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<String>>,
        pub from_account_id: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub to_account_id: Option<Option<String>>,
    }

    /// List filters. `tags` is a comma separated list, any of which matches.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub status: Option<String>,
        pub category_id: Option<String>,
        pub from_account_id: Option<String>,
        pub to_account_id: Option<String>,
        pub account_id: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub min_amount: Option<i64>,
        pub max_amount: Option<i64>,
        pub search: Option<String>,
        pub is_recurring: Option<bool>,
        pub tags: Option<String>,
        pub sort_by: Option<String>,
        pub sort_order: Option<String>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HistoryQuery {
        pub period: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EvolutionQuery {
        pub days: Option<u64>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub name: String,
        pub description: Option<String>,
        pub amount: i64,
        pub currency: Option<String>,
        pub period: Option<String>,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub color: Option<String>,
        pub auto_reset: Option<bool>,
        pub alert_enabled: Option<bool>,
        pub alert_threshold: Option<i32>,
        pub include_subcategories: Option<bool>,
        pub category_id: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub name: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub description: Option<Option<String>>,
        pub amount: Option<i64>,
        pub currency: Option<String>,
        pub period: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub status: Option<String>,
        pub color: Option<String>,
        pub auto_reset: Option<bool>,
        pub alert_enabled: Option<bool>,
        pub alert_threshold: Option<i32>,
        pub include_subcategories: Option<bool>,
        pub category_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
        pub status: Option<String>,
    }
}

pub mod goal {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct MilestoneBody {
        pub name: String,
        pub amount: i64,
        pub reached_at: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: String,
        pub description: Option<String>,
        #[serde(rename = "type")]
        pub kind: String,
        pub target_amount: i64,
        pub current_amount: Option<i64>,
        pub currency: Option<String>,
        pub start_date: NaiveDate,
        pub target_date: NaiveDate,
        pub period: Option<String>,
        pub color: Option<String>,
        pub icon: Option<String>,
        #[serde(default)]
        pub auto_calculate: bool,
        #[serde(default)]
        pub milestones: Vec<MilestoneBody>,
        pub category_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub name: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub description: Option<Option<String>>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub target_amount: Option<i64>,
        pub current_amount: Option<i64>,
        pub currency: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub target_date: Option<NaiveDate>,
        pub period: Option<String>,
        pub status: Option<String>,
        pub color: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub icon: Option<Option<String>>,
        pub auto_calculate: Option<bool>,
        pub milestones: Option<Vec<MilestoneBody>>,
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<String>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Contribution {
        pub amount: i64,
    }
}
