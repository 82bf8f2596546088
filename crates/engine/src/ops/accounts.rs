use std::collections::BTreeMap;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Account, AccountKind, AccountPatch, Currency, EngineError, NewAccount, Page, PageRequest,
    ResultEngine, accounts, transactions,
    util::{
        amount_overflow, ensure_amount_in_range, ensure_color, name_key, normalize_optional_text,
        normalize_required_name,
    },
};

use super::{Engine, balances::ledger_totals, with_tx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeletion {
    pub account_id: Uuid,
    /// `true` when the account was only deactivated because transactions
    /// still reference it.
    pub soft_deleted: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub total_accounts: u64,
    pub active_accounts: u64,
    /// Sum of active accounts flagged `include_in_totals`.
    pub total_balance: i64,
    pub accounts_by_type: BTreeMap<String, u64>,
}

impl Engine {
    /// Active accounts of the user, newest first.
    pub async fn list_accounts(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> ResultEngine<Page<Account>> {
        with_tx!(self, |db_tx| {
            let query = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .filter(accounts::Column::IsActive.eq(true));
            let total = query.clone().count(&db_tx).await?;
            let items = query
                .order_by_desc(accounts::Column::CreatedAt)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Account::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    pub async fn account(&self, account_id: &str, user_id: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            Account::try_from(model)
        })
    }

    /// Create an account. `initial_balance` and `balance` default to each
    /// other; the stored balance is the ledger balance of the new account.
    pub async fn create_account(&self, user_id: &str, cmd: NewAccount) -> ResultEngine<Account> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let name = normalize_required_name(&cmd.name, "Account name")?;
            self.ensure_unique_account_name(&db_tx, user_id, &name, None)
                .await?;

            let currency = match cmd.currency.as_deref() {
                Some(code) => Currency::try_from(code)?,
                None => Currency::try_from(user.default_currency.as_str())?,
            };
            let color = match cmd.color.as_deref() {
                Some(color) => ensure_color(color)?,
                None => accounts::DEFAULT_ACCOUNT_COLOR.to_string(),
            };
            let initial_balance = cmd.initial_balance.or(cmd.balance).unwrap_or(0);
            ensure_amount_in_range(initial_balance, "initial balance")?;

            let account = Account {
                id: Uuid::new_v4(),
                user_id: crate::util::parse_uuid(user_id, "user")?,
                name,
                kind: cmd.kind,
                bank: normalize_optional_text(cmd.bank.as_deref()),
                account_number: normalize_optional_text(cmd.account_number.as_deref()),
                balance: initial_balance,
                initial_balance,
                currency,
                color,
                icon: normalize_optional_text(cmd.icon.as_deref()),
                description: normalize_optional_text(cmd.description.as_deref()),
                is_active: true,
                include_in_totals: cmd.include_in_totals.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            tracing::info!(account_id = %account.id, user_id, "account created");
            Ok::<_, EngineError>(account)
        })
    }

    pub async fn update_account(
        &self,
        account_id: &str,
        user_id: &str,
        patch: AccountPatch,
    ) -> ResultEngine<Account> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let mut account = Account::try_from(model)?;

            if let Some(name) = patch.name.as_deref() {
                account.name = normalize_required_name(name, "Account name")?;
            }
            if let Some(is_active) = patch.is_active {
                account.is_active = is_active;
            }
            if account.is_active && (patch.name.is_some() || patch.is_active == Some(true)) {
                let own_id = account.id.to_string();
                self.ensure_unique_account_name(&db_tx, user_id, &account.name, Some(&own_id))
                    .await?;
            }
            if let Some(kind) = patch.kind {
                account.kind = kind;
            }
            if let Some(bank) = patch.bank {
                account.bank = normalize_optional_text(bank.as_deref());
            }
            if let Some(number) = patch.account_number {
                account.account_number = normalize_optional_text(number.as_deref());
            }
            if let Some(code) = patch.currency.as_deref() {
                account.currency = Currency::try_from(code)?;
            }
            if let Some(color) = patch.color.as_deref() {
                account.color = ensure_color(color)?;
            }
            if let Some(icon) = patch.icon {
                account.icon = normalize_optional_text(icon.as_deref());
            }
            if let Some(description) = patch.description {
                account.description = normalize_optional_text(description.as_deref());
            }
            if let Some(include) = patch.include_in_totals {
                account.include_in_totals = include;
            }
            account.updated_at = now;

            accounts::ActiveModel::from(&account).update(&db_tx).await?;
            Ok::<_, EngineError>(account)
        })
    }

    /// Reconcile the stored balance to `balance` by moving `initial_balance`,
    /// so that `initial + inflows - outflows` still equals the stored value.
    pub async fn set_account_balance(
        &self,
        account_id: &str,
        user_id: &str,
        balance: i64,
    ) -> ResultEngine<Account> {
        ensure_amount_in_range(balance, "balance")?;
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let totals = ledger_totals(&db_tx, &model.id, None).await?;
            let initial_balance = totals.initial_for(balance)?;
            let updated = accounts::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                balance: ActiveValue::Set(balance),
                initial_balance: ActiveValue::Set(initial_balance),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            tracing::info!(account_id = %model.id, balance, initial_balance, "account balance set");
            Account::try_from(updated)
        })
    }

    /// Hard delete, or deactivate when transactions reference the account.
    pub async fn delete_account(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<AccountDeletion> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let id = crate::util::parse_uuid(&model.id, "account")?;
            let referenced = transactions::Entity::find()
                .filter(
                    Condition::any()
                        .add(transactions::Column::FromAccountId.eq(model.id.clone()))
                        .add(transactions::Column::ToAccountId.eq(model.id.clone())),
                )
                .count(&db_tx)
                .await?;

            let deletion = if referenced > 0 {
                accounts::ActiveModel {
                    id: ActiveValue::Set(model.id.clone()),
                    is_active: ActiveValue::Set(false),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
                AccountDeletion {
                    account_id: id,
                    soft_deleted: true,
                    message: "Account deactivated because it has transactions".to_string(),
                }
            } else {
                accounts::Entity::delete_by_id(model.id.clone())
                    .exec(&db_tx)
                    .await?;
                AccountDeletion {
                    account_id: id,
                    soft_deleted: false,
                    message: "Account deleted successfully".to_string(),
                }
            };
            tracing::info!(account_id = %id, soft = deletion.soft_deleted, "account removed");
            Ok::<_, EngineError>(deletion)
        })
    }

    pub async fn account_summary(&self, user_id: &str) -> ResultEngine<AccountSummary> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;

            let mut accounts_by_type: BTreeMap<String, u64> = AccountKind::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), 0))
                .collect();
            let mut summary = AccountSummary {
                total_accounts: models.len() as u64,
                active_accounts: 0,
                total_balance: 0,
                accounts_by_type: BTreeMap::new(),
            };
            for model in models.iter().filter(|m| m.is_active) {
                summary.active_accounts += 1;
                if model.include_in_totals {
                    summary.total_balance = summary
                        .total_balance
                        .checked_add(model.balance)
                        .ok_or_else(|| amount_overflow("total balance"))?;
                }
                *accounts_by_type.entry(model.kind.clone()).or_default() += 1;
            }
            summary.accounts_by_type = accounts_by_type;
            Ok::<_, EngineError>(summary)
        })
    }

    async fn ensure_unique_account_name(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> ResultEngine<()> {
        let key = name_key(name);
        let taken = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::IsActive.eq(true))
            .all(db)
            .await?
            .into_iter()
            .filter(|other| exclude_id.is_none_or(|id| other.id != id))
            .any(|other| name_key(&other.name) == key);
        if taken {
            return Err(EngineError::ExistingKey(
                "Account name already exists".to_string(),
            ));
        }
        Ok(())
    }
}
