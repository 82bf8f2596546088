//! MoneyMap engine: entities, services and the balance calculation.
//!
//! Every public operation lives on [`Engine`] and runs inside a database
//! transaction. Callers identify themselves with the user id carried by the
//! access token; ownership is checked row by row.

pub use accounts::{Account, AccountKind};
pub use auth::{AuthSettings, Claims, TokenPair};
pub use balances::{
    AccountBalance, BalanceCalculation, BalanceEvolutionPoint, BalanceHistory,
    BalanceHistoryPoint, BalanceSummary, CurrentBalance, HistoryPeriod, MAX_HISTORY_DAYS,
};
pub use budgets::{Budget, BudgetPeriod, BudgetStatus};
pub use categories::{Category, CategoryNode};
pub use commands::{
    AccountPatch, BudgetPatch, CategoryFilter, CategoryPatch, GoalPatch, NewAccount, NewBudget,
    NewCategory, NewGoal, NewTransaction, NewUser, Page, PageRequest, ParentFilter, SortOrder,
    TransactionFilter, TransactionPatch, TransactionSortField, UserPatch,
};
pub use currency::Currency;
pub use error::EngineError;
pub use goals::{Goal, GoalKind, GoalPeriod, GoalStatus, Milestone};
pub use mailer::{LogMailer, Mail, Mailer};
pub use ops::{
    AccountDeletion, AccountSummary, Engine, EngineBuilder, Registration, TransactionSummary,
};
pub use transactions::{RecurringPattern, Transaction, TransactionKind, TransactionStatus};
pub use users::User;
pub use util::MAX_AMOUNT_MINOR;

mod accounts;
mod auth;
mod balances;
mod budgets;
mod categories;
mod commands;
mod currency;
mod error;
mod goals;
mod mailer;
mod ops;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
