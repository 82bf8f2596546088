//! Accounts API endpoints.

use api_types::{
    account::{AccountNew, AccountUpdate, BalanceUpdate},
    envelope::PageQuery,
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{Account, AccountDeletion, AccountPatch, AccountSummary, NewAccount, PageRequest};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, created, ok, paged, parse, parse_opt,
    server::{AuthUser, ServerState},
};

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Account>> {
    let page = PageRequest::new(query.page, query.limit, 10)?;
    paged(state.engine.list_accounts(&user.id, page).await?)
}

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<AccountSummary> {
    ok(state.engine.account_summary(&user.id).await?)
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Account> {
    ok(state.engine.account(&id, &user.id).await?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<AccountNew>,
) -> Created<Account> {
    let cmd = NewAccount {
        name: payload.name,
        kind: parse(&payload.kind)?,
        bank: payload.bank,
        account_number: payload.account_number,
        balance: payload.balance,
        initial_balance: payload.initial_balance,
        currency: payload.currency,
        color: payload.color,
        icon: payload.icon,
        description: payload.description,
        include_in_totals: payload.include_in_totals,
    };
    created(state.engine.create_account(&user.id, cmd).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<AccountUpdate>,
) -> ApiResult<Account> {
    let patch = AccountPatch {
        name: payload.name,
        kind: parse_opt(payload.kind.as_deref())?,
        bank: payload.bank,
        account_number: payload.account_number,
        currency: payload.currency,
        color: payload.color,
        icon: payload.icon,
        description: payload.description,
        is_active: payload.is_active,
        include_in_totals: payload.include_in_totals,
    };
    ok(state.engine.update_account(&id, &user.id, patch).await?)
}

pub async fn set_balance(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<BalanceUpdate>,
) -> ApiResult<Account> {
    ok(state
        .engine
        .set_account_balance(&id, &user.id, payload.balance)
        .await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<AccountDeletion> {
    ok(state.engine.delete_account(&id, &user.id).await?)
}
