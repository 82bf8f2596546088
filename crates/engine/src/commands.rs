//! Command structs for engine operations.
//!
//! These types group parameters for write operations and list queries,
//! keeping call sites readable and avoiding long argument lists. Patch
//! structs leave a field untouched when it is `None`; nested options
//! (`Option<Option<_>>`) distinguish "unchanged" from "cleared".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    AccountKind, BudgetPeriod, BudgetStatus, EngineError, GoalKind, GoalPeriod, GoalStatus,
    Milestone, RecurringPattern, ResultEngine, TransactionKind, TransactionStatus,
};

pub const MAX_PAGE_LIMIT: u64 = 100;

/// 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> ResultEngine<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page == 0 {
            return Err(EngineError::InvalidInput("page must be >= 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(EngineError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| EngineError::InvalidInput("page is out of range".to_string()))?;
        Ok(Self { page, limit })
    }

    /// Rows to skip. `new` guarantees this fits in an `i64`.
    pub(crate) fn offset(self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total.div_ceil(request.limit),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub default_currency: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub default_currency: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
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

impl NewAccount {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bank: None,
            account_number: None,
            balance: None,
            initial_balance: None,
            currency: None,
            color: None,
            icon: None,
            description: None,
            include_in_totals: None,
        }
    }

    #[must_use]
    pub fn initial_balance(mut self, amount_minor: i64) -> Self {
        self.initial_balance = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = Some(code.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    pub bank: Option<Option<String>>,
    pub account_number: Option<Option<String>>,
    pub currency: Option<String>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub include_in_totals: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub kind: TransactionKind,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub parent_id: Option<String>,
}

impl NewCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            color: None,
            icon: None,
            description: None,
            sort_order: None,
            parent_id: None,
        }
    }

    #[must_use]
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
    pub parent_id: Option<Option<String>>,
}

/// Parent filter for category listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParentFilter {
    Root,
    Id(String),
}

#[derive(Clone, Debug)]
pub struct CategoryFilter {
    pub kind: Option<TransactionKind>,
    pub is_system: Option<bool>,
    pub is_active: Option<bool>,
    pub parent: Option<ParentFilter>,
    pub include_counts: bool,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self {
            kind: None,
            is_system: None,
            is_active: Some(true),
            parent: None,
            include_counts: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub status: Option<TransactionStatus>,
    pub currency: Option<String>,
    pub reference: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<NaiveDate>,
    pub category_id: Option<String>,
    pub from_account_id: String,
    pub to_account_id: Option<String>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        amount_minor: i64,
        description: impl Into<String>,
        date: NaiveDate,
        from_account_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount_minor,
            description: description.into(),
            notes: None,
            date,
            status: None,
            currency: None,
            reference: None,
            tags: Vec::new(),
            location: None,
            is_recurring: false,
            recurring_pattern: None,
            recurring_end_date: None,
            category_id: None,
            from_account_id: from_account_id.into(),
            to_account_id: None,
        }
    }

    #[must_use]
    pub fn to_account(mut self, account_id: impl Into<String>) -> Self {
        self.to_account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub description: Option<String>,
    pub notes: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    pub currency: Option<String>,
    pub reference: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<Option<String>>,
    pub is_recurring: Option<bool>,
    pub recurring_pattern: Option<Option<RecurringPattern>>,
    pub recurring_end_date: Option<Option<NaiveDate>>,
    pub category_id: Option<Option<String>>,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<Option<String>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSortField {
    #[default]
    Date,
    Amount,
    Description,
    CreatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for listing transactions. Every set field narrows the result.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub category_id: Option<String>,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<String>,
    /// Matches either side of the transaction.
    pub account_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    pub is_recurring: Option<bool>,
    /// Any of these tags.
    pub tags: Vec<String>,
    pub sort_by: TransactionSortField,
    pub sort_order: SortOrder,
}

#[derive(Clone, Debug)]
pub struct NewBudget {
    pub name: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub currency: Option<String>,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    /// Defaults to the end of the first period.
    pub end_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub auto_reset: Option<bool>,
    pub alert_enabled: Option<bool>,
    pub alert_threshold: Option<i32>,
    pub include_subcategories: Option<bool>,
    pub category_id: String,
}

#[derive(Clone, Debug, Default)]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<BudgetStatus>,
    pub color: Option<String>,
    pub auto_reset: Option<bool>,
    pub alert_enabled: Option<bool>,
    pub alert_threshold: Option<i32>,
    pub include_subcategories: Option<bool>,
    pub category_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewGoal {
    pub name: String,
    pub description: Option<String>,
    pub kind: GoalKind,
    pub target_amount: i64,
    pub current_amount: Option<i64>,
    pub currency: Option<String>,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub period: Option<GoalPeriod>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub auto_calculate: bool,
    pub milestones: Vec<Milestone>,
    pub category_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub kind: Option<GoalKind>,
    pub target_amount: Option<i64>,
    pub current_amount: Option<i64>,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub period: Option<GoalPeriod>,
    pub status: Option<GoalStatus>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
    pub auto_calculate: Option<bool>,
    pub milestones: Option<Vec<Milestone>>,
    pub category_id: Option<Option<String>>,
}
