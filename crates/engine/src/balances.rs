//! Balance calculation.
//!
//! Balances are a projection of the ledger. For an account `A` only
//! `completed` transactions count:
//!
//! - inflow: `income` with `from = A`, `transfer` with `to = A`
//! - outflow: `expense` with `from = A`, `transfer` with `from = A`
//!
//! and `balance = initial_balance + inflows - outflows`.
//!
//! This module holds the pure part (period resolution, daily folding and
//! evolution). Queries live in `ops::balances`.

use std::collections::HashMap;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AccountKind, Currency, EngineError, ResultEngine,
    util::{amount_overflow, round2},
};

/// Longest range a history or evolution request may span.
pub const MAX_HISTORY_DAYS: u64 = 3660;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "week")]
    Week,
    #[default]
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "custom")]
    Custom,
}

impl HistoryPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::Year => "year",
            Self::Custom => "custom",
        }
    }

    /// Resolve the period into an inclusive `[start, end]` range ending today.
    ///
    /// `custom` uses the given bounds, each defaulting to `today`.
    pub fn resolve(
        self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ResultEngine<(NaiveDate, NaiveDate)> {
        let out_of_range = || EngineError::InvalidDate("date out of range".to_string());
        let (start, end) = match self {
            Self::Week => (
                today.checked_sub_days(Days::new(7)).ok_or_else(out_of_range)?,
                today,
            ),
            Self::Month => (
                today.checked_sub_months(Months::new(1)).ok_or_else(out_of_range)?,
                today,
            ),
            Self::ThreeMonths => (
                today.checked_sub_months(Months::new(3)).ok_or_else(out_of_range)?,
                today,
            ),
            Self::SixMonths => (
                today.checked_sub_months(Months::new(6)).ok_or_else(out_of_range)?,
                today,
            ),
            Self::Year => (
                today.checked_sub_months(Months::new(12)).ok_or_else(out_of_range)?,
                today,
            ),
            Self::Custom => (start.unwrap_or(today), end.unwrap_or(today)),
        };
        ensure_history_range(start, end)?;
        Ok((start, end))
    }
}

impl TryFrom<&str> for HistoryPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "3months" => Ok(Self::ThreeMonths),
            "6months" => Ok(Self::SixMonths),
            "year" => Ok(Self::Year),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidInput(format!(
                "invalid period: {other}"
            ))),
        }
    }
}

pub(crate) fn ensure_history_range(start: NaiveDate, end: NaiveDate) -> ResultEngine<()> {
    if start > end {
        return Err(EngineError::InvalidDate(
            "start date must not be after end date".to_string(),
        ));
    }
    let span = (end - start).num_days() as u64;
    if span > MAX_HISTORY_DAYS {
        return Err(EngineError::InvalidDate(format!(
            "range too long: at most {MAX_HISTORY_DAYS} days"
        )));
    }
    Ok(())
}

/// Inflow/outflow totals of completed transactions for one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub income: i64,
    pub expense: i64,
    pub count: u64,
}

impl LedgerTotals {
    /// `initial + income - expense`.
    pub fn apply_to(self, initial_balance: i64) -> ResultEngine<i64> {
        initial_balance
            .checked_add(self.income)
            .and_then(|balance| balance.checked_sub(self.expense))
            .ok_or_else(|| amount_overflow("balance"))
    }

    /// The initial balance that makes the ledger end at `balance`.
    pub fn initial_for(self, balance: i64) -> ResultEngine<i64> {
        balance
            .checked_sub(self.income)
            .and_then(|initial| initial.checked_add(self.expense))
            .ok_or_else(|| amount_overflow("initial balance"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCalculation {
    pub account_id: Uuid,
    pub initial_balance: i64,
    pub total_income: i64,
    pub total_expense: i64,
    pub final_balance: i64,
    pub transaction_count: u64,
}

impl BalanceCalculation {
    pub fn new(account_id: Uuid, initial_balance: i64, totals: LedgerTotals) -> ResultEngine<Self> {
        Ok(Self {
            account_id,
            initial_balance,
            total_income: totals.income,
            total_expense: totals.expense,
            final_balance: totals.apply_to(initial_balance)?,
            transaction_count: totals.count,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBalance {
    pub account_id: Uuid,
    pub balance: i64,
    pub last_calculated_at: DateTime<Utc>,
    pub transaction_count: u64,
}

/// Ledger activity of one account on one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub income: i64,
    pub expense: i64,
    pub transaction_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceHistoryPoint {
    pub date: NaiveDate,
    pub balance: i64,
    pub daily_income: i64,
    pub daily_expense: i64,
    pub daily_change: i64,
    pub transaction_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceHistory {
    pub account_id: Uuid,
    pub period: HistoryPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balance: i64,
    pub points: Vec<BalanceHistoryPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvolutionPoint {
    pub date: NaiveDate,
    pub balance: i64,
    pub change: i64,
    pub change_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub currency: Currency,
    pub balance: i64,
    pub include_in_totals: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_balance: i64,
    pub account_count: u64,
    pub accounts: Vec<AccountBalance>,
}

impl BalanceSummary {
    pub fn new(accounts: Vec<AccountBalance>) -> ResultEngine<Self> {
        let total_balance = accounts
            .iter()
            .filter(|a| a.include_in_totals)
            .try_fold(0i64, |total, a| total.checked_add(a.balance))
            .ok_or_else(|| amount_overflow("total balance"))?;
        Ok(Self {
            total_balance,
            account_count: accounts.len() as u64,
            accounts,
        })
    }
}

/// One point per day in `[start, end]`, running from `opening`.
///
/// Days without activity repeat the previous balance. Activity outside the
/// range is ignored.
pub fn fold_history(
    opening: i64,
    start: NaiveDate,
    end: NaiveDate,
    activity: &[DailyActivity],
) -> Vec<BalanceHistoryPoint> {
    let by_day: HashMap<NaiveDate, &DailyActivity> =
        activity.iter().map(|day| (day.date, day)).collect();

    let mut running = opening;
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| {
            let (income, expense, count) = by_day
                .get(&date)
                .map_or((0, 0, 0), |d| (d.income, d.expense, d.transaction_count));
            let change = income.saturating_sub(expense);
            running = running.saturating_add(change);
            BalanceHistoryPoint {
                date,
                balance: running,
                daily_income: income,
                daily_expense: expense,
                daily_change: change,
                transaction_count: count,
            }
        })
        .collect()
}

/// Day-over-day change of a history series.
///
/// The first point compares against the balance before its own change.
/// `change_percent` is `change / |previous| * 100` rounded to 2 decimals, 0
/// when the previous balance is 0.
pub fn evolution(points: &[BalanceHistoryPoint]) -> Vec<BalanceEvolutionPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let previous = if i > 0 {
                points[i - 1].balance
            } else {
                point.balance.saturating_sub(point.daily_change)
            };
            let change = point.balance.saturating_sub(previous);
            let change_percent = if previous == 0 {
                0.0
            } else {
                round2(change as f64 / previous.unsigned_abs() as f64 * 100.0)
            };
            BalanceEvolutionPoint {
                date: point.date,
                balance: point.balance,
                change,
                change_percent,
            }
        })
        .collect()
}
