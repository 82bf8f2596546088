use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use sea_orm::{
    Condition, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait, Value,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr, Order},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, NewTransaction, Page, PageRequest, ResultEngine, SortOrder,
    Transaction, TransactionFilter, TransactionKind, TransactionPatch, TransactionSortField,
    TransactionStatus, transactions,
    util::{
        ensure_date_order, ensure_positive_amount, normalize_optional_text,
        normalize_required_name, parse_uuid, sum_overflow,
    },
};

use super::{Engine, balances::sync_accounts, with_tx};

/// Counts and completed totals over all of a user's transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_transactions: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_status: BTreeMap<String, u64>,
    pub total_income: i64,
    pub total_expense: i64,
    pub total_transfer: i64,
    /// `total_income - total_expense`.
    pub net: i64,
}

impl TransactionSummary {
    fn empty() -> Self {
        Self {
            total_transactions: 0,
            by_type: TransactionKind::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), 0))
                .collect(),
            by_status: TransactionStatus::ALL
                .iter()
                .map(|status| (status.as_str().to_string(), 0))
                .collect(),
            total_income: 0,
            total_expense: 0,
            total_transfer: 0,
            net: 0,
        }
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Field rules every stored transaction satisfies.
fn validate(tx: &Transaction, today: NaiveDate) -> ResultEngine<()> {
    ensure_positive_amount(tx.amount_minor, "amount")?;
    let latest = today
        .checked_add_months(Months::new(12))
        .ok_or_else(|| EngineError::InvalidDate("date out of range".to_string()))?;
    if tx.date > latest {
        return Err(EngineError::InvalidDate(
            "date cannot be more than one year in the future".to_string(),
        ));
    }
    if let Some(end) = tx.recurring_end_date
        && end <= tx.date
    {
        return Err(EngineError::InvalidDate(
            "recurring end date must be after the transaction date".to_string(),
        ));
    }
    match (tx.kind, tx.to_account_id) {
        (TransactionKind::Transfer, None) => Err(EngineError::InvalidInput(
            "transfer requires a destination account".to_string(),
        )),
        (TransactionKind::Transfer, Some(to)) if to == tx.from_account_id => {
            Err(EngineError::InvalidInput(
                "transfer source and destination must differ".to_string(),
            ))
        }
        (TransactionKind::Income | TransactionKind::Expense, Some(_)) => {
            Err(EngineError::InvalidInput(format!(
                "{} must not have a destination account",
                tx.kind.as_str()
            )))
        }
        _ => Ok(()),
    }
}

fn account_ids(tx: &Transaction) -> impl Iterator<Item = String> {
    tx.touched_accounts().into_iter().map(|id| id.to_string())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> ResultEngine<Self>;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> ResultEngine<Self> {
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status {
            self = self.filter(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category_id.as_deref() {
            let id = parse_uuid(category, "category")?;
            self = self.filter(transactions::Column::CategoryId.eq(id.to_string()));
        }
        if let Some(account) = filter.from_account_id.as_deref() {
            let id = parse_uuid(account, "account")?;
            self = self.filter(transactions::Column::FromAccountId.eq(id.to_string()));
        }
        if let Some(account) = filter.to_account_id.as_deref() {
            let id = parse_uuid(account, "account")?.to_string();
            self = self.filter(transactions::Column::ToAccountId.eq(id));
        }
        if let Some(account) = filter.account_id.as_deref() {
            let id = parse_uuid(account, "account")?.to_string();
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::FromAccountId.eq(id.clone()))
                    .add(transactions::Column::ToAccountId.eq(id)),
            );
        }
        if let Some(start) = filter.start_date {
            self = self.filter(transactions::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            self = self.filter(transactions::Column::Date.lte(end));
        }
        if let Some(min) = filter.min_amount {
            self = self.filter(transactions::Column::AmountMinor.gte(min));
        }
        if let Some(max) = filter.max_amount {
            self = self.filter(transactions::Column::AmountMinor.lte(max));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            let pattern = contains_pattern(&search.to_lowercase());
            self = self.filter(
                Expr::expr(Func::lower(Expr::col(transactions::Column::Description)))
                    .like(pattern),
            );
        }
        if let Some(is_recurring) = filter.is_recurring {
            self = self.filter(transactions::Column::IsRecurring.eq(is_recurring));
        }
        let tags = normalize_tags(filter.tags.clone());
        if !tags.is_empty() {
            let any_tag = tags.iter().fold(Condition::any(), |condition, tag| {
                let quoted = serde_json::Value::from(tag.as_str()).to_string();
                condition.add(transactions::Column::Tags.like(contains_pattern(&quoted)))
            });
            self = self.filter(any_tag);
        }
        Ok(self)
    }
}

/// `%needle%` with `\\`, `%` and `_` taken literally.
fn contains_pattern(needle: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\')
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_filter(filter: &TransactionFilter) -> ResultEngine<()> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        ensure_date_order(start, end, "start date", "end date")?;
    }
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount)
        && min > max
    {
        return Err(EngineError::InvalidAmount(
            "min amount must not exceed max amount".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    pub async fn create_transaction(
        &self,
        user_id: &str,
        cmd: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let now = self.now();
        let today = self.today();
        with_tx!(self, |db_tx| {
            let from = self
                .require_account_for_reference(&db_tx, &cmd.from_account_id, user_id)
                .await?;
            let to_account_id = match cmd.to_account_id.as_deref() {
                Some(to) => Some(self.reference_account(&db_tx, to, user_id).await?),
                None => None,
            };
            let category_id = match cmd.category_id.as_deref() {
                Some(category) => Some(self.reference_category(&db_tx, category, user_id).await?),
                None => None,
            };
            let currency = match cmd.currency.as_deref() {
                Some(code) => Currency::try_from(code)?,
                None => Currency::try_from(from.currency.as_str())?,
            };

            let tx = Transaction {
                id: Uuid::new_v4(),
                user_id: parse_uuid(user_id, "user")?,
                kind: cmd.kind,
                amount_minor: cmd.amount_minor,
                description: normalize_required_name(&cmd.description, "Description")?,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                date: cmd.date,
                status: cmd.status.unwrap_or_default(),
                currency,
                reference: normalize_optional_text(cmd.reference.as_deref()),
                tags: normalize_tags(cmd.tags),
                location: normalize_optional_text(cmd.location.as_deref()),
                is_recurring: cmd.is_recurring,
                recurring_pattern: cmd.recurring_pattern,
                recurring_end_date: cmd.recurring_end_date,
                category_id,
                from_account_id: parse_uuid(&from.id, "account")?,
                to_account_id,
                created_at: now,
                updated_at: now,
            };
            validate(&tx, today)?;

            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            sync_accounts(&db_tx, account_ids(&tx).collect(), now).await?;
            tracing::info!(
                transaction_id = %tx.id,
                kind = tx.kind.as_str(),
                amount_minor = tx.amount_minor,
                "transaction created"
            );
            Ok::<_, EngineError>(tx)
        })
    }

    pub async fn transaction(
        &self,
        transaction_id: &str,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, user_id)
                .await?;
            Transaction::try_from(model)
        })
    }

    /// Merge `patch` into the stored transaction and re-validate the result.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        user_id: &str,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let now = self.now();
        let today = self.today();
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, user_id)
                .await?;
            let mut tx = Transaction::try_from(model)?;
            let mut touched: BTreeSet<String> = account_ids(&tx).collect();

            if let Some(kind) = patch.kind {
                tx.kind = kind;
            }
            if let Some(amount) = patch.amount_minor {
                tx.amount_minor = amount;
            }
            if let Some(description) = patch.description.as_deref() {
                tx.description = normalize_required_name(description, "Description")?;
            }
            if let Some(notes) = patch.notes {
                tx.notes = normalize_optional_text(notes.as_deref());
            }
            if let Some(date) = patch.date {
                tx.date = date;
            }
            if let Some(status) = patch.status {
                tx.status = status;
            }
            if let Some(code) = patch.currency.as_deref() {
                tx.currency = Currency::try_from(code)?;
            }
            if let Some(reference) = patch.reference {
                tx.reference = normalize_optional_text(reference.as_deref());
            }
            if let Some(tags) = patch.tags {
                tx.tags = normalize_tags(tags);
            }
            if let Some(location) = patch.location {
                tx.location = normalize_optional_text(location.as_deref());
            }
            if let Some(is_recurring) = patch.is_recurring {
                tx.is_recurring = is_recurring;
            }
            if let Some(pattern) = patch.recurring_pattern {
                tx.recurring_pattern = pattern;
            }
            if let Some(end) = patch.recurring_end_date {
                tx.recurring_end_date = end;
            }
            if let Some(category) = patch.category_id {
                tx.category_id = match category.as_deref() {
                    Some(category) => {
                        Some(self.reference_category(&db_tx, category, user_id).await?)
                    }
                    None => None,
                };
            }
            if let Some(from) = patch.from_account_id.as_deref() {
                tx.from_account_id = self.reference_account(&db_tx, from, user_id).await?;
            }
            if let Some(to) = patch.to_account_id {
                tx.to_account_id = match to.as_deref() {
                    Some(to) => Some(self.reference_account(&db_tx, to, user_id).await?),
                    None => None,
                };
            }
            tx.updated_at = now;
            validate(&tx, today)?;

            transactions::ActiveModel::from(&tx).update(&db_tx).await?;
            touched.extend(account_ids(&tx));
            sync_accounts(&db_tx, touched, now).await?;
            tracing::info!(transaction_id = %tx.id, "transaction updated");
            Ok::<_, EngineError>(tx)
        })
    }

    pub async fn delete_transaction(&self, transaction_id: &str, user_id: &str) -> ResultEngine<()> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, user_id)
                .await?;
            let tx = Transaction::try_from(model)?;
            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;
            sync_accounts(&db_tx, account_ids(&tx).collect(), now).await?;
            tracing::info!(transaction_id = %tx.id, "transaction deleted");
            Ok::<_, EngineError>(())
        })
    }

    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Transaction>> {
        validate_filter(&filter)?;
        with_tx!(self, |db_tx| {
            let query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .apply_tx_filters(&filter)?;
            let total = query.clone().count(&db_tx).await?;

            let column = match filter.sort_by {
                TransactionSortField::Date => transactions::Column::Date,
                TransactionSortField::Amount => transactions::Column::AmountMinor,
                TransactionSortField::Description => transactions::Column::Description,
                TransactionSortField::CreatedAt => transactions::Column::CreatedAt,
            };
            let order = match filter.sort_order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            let items = query
                .order_by(column, order.clone())
                .order_by(transactions::Column::CreatedAt, order)
                .order_by_asc(transactions::Column::Id)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    pub async fn transaction_summary(&self, user_id: &str) -> ResultEngine<TransactionSummary> {
        with_tx!(self, |db_tx| {
            let backend = db_tx.get_database_backend();
            let rows = db_tx
                .query_all(Statement::from_sql_and_values(
                    backend,
                    "SELECT kind, status, COUNT(*) AS count, \
                     COALESCE(SUM(amount_minor), 0) AS total \
                     FROM transactions WHERE user_id = ? GROUP BY kind, status",
                    [Value::from(user_id)],
                ))
                .await
                .map_err(sum_overflow)?;

            let mut summary = TransactionSummary::empty();
            for row in rows {
                let kind: String = row.try_get("", "kind")?;
                let status: String = row.try_get("", "status")?;
                let count: i64 = row.try_get("", "count")?;
                let total: i64 = row.try_get("", "total")?;
                let count = count.max(0) as u64;

                summary.total_transactions += count;
                *summary.by_type.entry(kind.clone()).or_default() += count;
                *summary.by_status.entry(status.clone()).or_default() += count;
                if status != TransactionStatus::Completed.as_str() {
                    continue;
                }
                match TransactionKind::try_from(kind.as_str())? {
                    TransactionKind::Income => summary.total_income += total,
                    TransactionKind::Expense => summary.total_expense += total,
                    TransactionKind::Transfer => summary.total_transfer += total,
                }
            }
            summary.net = summary.total_income - summary.total_expense;
            Ok::<_, EngineError>(summary)
        })
    }

    async fn reference_account(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let model = self
            .require_account_for_reference(db, account_id, user_id)
            .await?;
        parse_uuid(&model.id, "account")
    }

    async fn reference_category(
        &self,
        db: &DatabaseTransaction,
        category_id: &str,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let model = self
            .require_category_for_reference(db, category_id, user_id)
            .await?;
        parse_uuid(&model.id, "category")
    }
}
