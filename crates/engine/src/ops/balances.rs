use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait, Value,
    prelude::*,
};

use crate::{
    Account, AccountBalance, BalanceCalculation, BalanceEvolutionPoint, BalanceHistory,
    BalanceSummary, CurrentBalance, EngineError, HistoryPeriod, MAX_HISTORY_DAYS, ResultEngine,
    accounts,
    balances::{self, DailyActivity, LedgerTotals},
    util::sum_overflow,
};

use super::{Engine, with_tx};

pub(super) const DEFAULT_EVOLUTION_DAYS: u64 = 30;

/// Per-row inflow/outflow expressions for account `?`, see [`crate::balances`].
const INFLOW_CASE: &str = "CASE WHEN (kind = 'income' AND from_account_id = ?) \
     OR (kind = 'transfer' AND to_account_id = ?) THEN amount_minor ELSE 0 END";
const OUTFLOW_CASE: &str = "CASE WHEN kind IN ('expense', 'transfer') AND from_account_id = ? \
     THEN amount_minor ELSE 0 END";
const LEDGER_SCOPE: &str =
    "(from_account_id = ? OR to_account_id = ?) AND status = 'completed'";

fn ledger_values(account_id: &str) -> Vec<Value> {
    // INFLOW_CASE (2), OUTFLOW_CASE (1), LEDGER_SCOPE (2)
    std::iter::repeat_n(account_id, 5).map(Value::from).collect()
}

/// Totals of completed transactions for an account, optionally only those
/// dated strictly before `before`.
pub(super) async fn ledger_totals<C: ConnectionTrait>(
    db: &C,
    account_id: &str,
    before: Option<NaiveDate>,
) -> ResultEngine<LedgerTotals> {
    let mut sql = format!(
        "SELECT COALESCE(SUM({INFLOW_CASE}), 0) AS income, \
         COALESCE(SUM({OUTFLOW_CASE}), 0) AS expense, \
         COUNT(*) AS count \
         FROM transactions WHERE {LEDGER_SCOPE}"
    );
    let mut values = ledger_values(account_id);
    if let Some(before) = before {
        sql.push_str(" AND date < ?");
        values.push(before.into());
    }

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await
        .map_err(sum_overflow)?;
    let Some(row) = row else {
        return Ok(LedgerTotals::default());
    };
    let count: i64 = row.try_get("", "count")?;
    Ok(LedgerTotals {
        income: row.try_get("", "income")?,
        expense: row.try_get("", "expense")?,
        count: count.max(0) as u64,
    })
}

/// Per-day totals of completed transactions dated in `[start, end]`.
pub(super) async fn daily_activity<C: ConnectionTrait>(
    db: &C,
    account_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> ResultEngine<Vec<DailyActivity>> {
    let sql = format!(
        "SELECT date AS day, \
         COALESCE(SUM({INFLOW_CASE}), 0) AS income, \
         COALESCE(SUM({OUTFLOW_CASE}), 0) AS expense, \
         COUNT(*) AS count \
         FROM transactions WHERE {LEDGER_SCOPE} AND date >= ? AND date <= ? \
         GROUP BY date ORDER BY date"
    );
    let mut values = ledger_values(account_id);
    values.push(start.into());
    values.push(end.into());

    let backend = db.get_database_backend();
    let rows = db
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await
        .map_err(sum_overflow)?;
    rows.into_iter()
        .map(|row| {
            let count: i64 = row.try_get("", "count")?;
            Ok(DailyActivity {
                date: row.try_get("", "day")?,
                income: row.try_get("", "income")?,
                expense: row.try_get("", "expense")?,
                transaction_count: count.max(0) as u64,
            })
        })
        .collect()
}

/// Recompute the stored balance of an account from the ledger.
pub(super) async fn sync_account<C: ConnectionTrait>(
    db: &C,
    model: accounts::Model,
    now: DateTimeUtc,
) -> ResultEngine<(accounts::Model, BalanceCalculation)> {
    let totals = ledger_totals(db, &model.id, None).await?;
    let account_id = crate::util::parse_uuid(&model.id, "account")?;
    let calculation = BalanceCalculation::new(account_id, model.initial_balance, totals)?;
    if model.balance == calculation.final_balance {
        return Ok((model, calculation));
    }

    tracing::debug!(
        account_id = %model.id,
        stored = model.balance,
        calculated = calculation.final_balance,
        "syncing account balance"
    );
    let updated = accounts::ActiveModel {
        id: ActiveValue::Set(model.id.clone()),
        balance: ActiveValue::Set(calculation.final_balance),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok((updated, calculation))
}

/// Sync every listed account. Unknown ids are skipped.
pub(super) async fn sync_accounts<C: ConnectionTrait>(
    db: &C,
    account_ids: BTreeSet<String>,
    now: DateTimeUtc,
) -> ResultEngine<()> {
    for account_id in account_ids {
        if let Some(model) = accounts::Entity::find_by_id(account_id).one(db).await? {
            sync_account(db, model, now).await?;
        }
    }
    Ok(())
}

impl Engine {
    /// `initial + inflows - outflows` for the account, from the ledger.
    pub async fn calculate_balance(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<BalanceCalculation> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let totals = ledger_totals(&db_tx, &model.id, None).await?;
            let id = crate::util::parse_uuid(&model.id, "account")?;
            BalanceCalculation::new(id, model.initial_balance, totals)
        })
    }

    pub async fn current_balance(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<CurrentBalance> {
        let calculation = self.calculate_balance(account_id, user_id).await?;
        Ok(CurrentBalance {
            account_id: calculation.account_id,
            balance: calculation.final_balance,
            last_calculated_at: self.now(),
            transaction_count: calculation.transaction_count,
        })
    }

    /// Store the calculated balance on the account.
    pub async fn sync_balance(&self, account_id: &str, user_id: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let (model, _) = sync_account(&db_tx, model, self.now()).await?;
            Account::try_from(model)
        })
    }

    /// Sync the stored balance and return it.
    pub async fn recalculate_balance(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<CurrentBalance> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let (_, calculation) = sync_account(&db_tx, model, now).await?;
            Ok::<_, EngineError>(CurrentBalance {
                account_id: calculation.account_id,
                balance: calculation.final_balance,
                last_calculated_at: now,
                transaction_count: calculation.transaction_count,
            })
        })
    }

    /// Sync every active account of the user.
    pub async fn recalculate_all_balances(
        &self,
        user_id: &str,
    ) -> ResultEngine<Vec<CurrentBalance>> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .filter(accounts::Column::IsActive.eq(true))
                .order_by_asc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let mut balances = Vec::with_capacity(models.len());
            for model in models {
                let (_, calculation) = sync_account(&db_tx, model, now).await?;
                balances.push(CurrentBalance {
                    account_id: calculation.account_id,
                    balance: calculation.final_balance,
                    last_calculated_at: now,
                    transaction_count: calculation.transaction_count,
                });
            }
            tracing::info!(user_id, accounts = balances.len(), "recalculated balances");
            Ok::<_, EngineError>(balances)
        })
    }

    /// Daily balance series over the period.
    pub async fn balance_history(
        &self,
        account_id: &str,
        user_id: &str,
        period: HistoryPeriod,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ResultEngine<BalanceHistory> {
        let (start, end) = period.resolve(start, end, self.today())?;
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let history = self.history_for(&db_tx, &model, period, start, end).await?;
            Ok::<_, EngineError>(history)
        })
    }

    /// Day-over-day evolution over the last `days` days (default 30).
    pub async fn balance_evolution(
        &self,
        account_id: &str,
        user_id: &str,
        days: Option<u64>,
    ) -> ResultEngine<Vec<BalanceEvolutionPoint>> {
        let days = days.unwrap_or(DEFAULT_EVOLUTION_DAYS);
        if days > MAX_HISTORY_DAYS {
            return Err(EngineError::InvalidDate(format!(
                "days must be at most {MAX_HISTORY_DAYS}"
            )));
        }
        let end = self.today();
        let start = end
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| EngineError::InvalidDate("date out of range".to_string()))?;
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let history = self
                .history_for(&db_tx, &model, HistoryPeriod::Custom, start, end)
                .await?;
            Ok::<_, EngineError>(balances::evolution(&history.points))
        })
    }

    /// Stored balances of the user's active accounts.
    pub async fn balance_summary(&self, user_id: &str) -> ResultEngine<BalanceSummary> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .filter(accounts::Column::IsActive.eq(true))
                .order_by_asc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let accounts = models
                .into_iter()
                .map(|model| {
                    let account = Account::try_from(model)?;
                    Ok(AccountBalance {
                        account_id: account.id,
                        name: account.name,
                        kind: account.kind,
                        currency: account.currency,
                        balance: account.balance,
                        include_in_totals: account.include_in_totals,
                    })
                })
                .collect::<ResultEngine<Vec<_>>>()?;
            BalanceSummary::new(accounts)
        })
    }

    async fn history_for<C: ConnectionTrait>(
        &self,
        db: &C,
        model: &accounts::Model,
        period: HistoryPeriod,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ResultEngine<BalanceHistory> {
        let before = ledger_totals(db, &model.id, Some(start)).await?;
        let opening = before.apply_to(model.initial_balance)?;
        let activity = daily_activity(db, &model.id, start, end).await?;
        Ok(BalanceHistory {
            account_id: crate::util::parse_uuid(&model.id, "account")?,
            period,
            start_date: start,
            end_date: end,
            opening_balance: opening,
            points: balances::fold_history(opening, start, end, &activity),
        })
    }
}
