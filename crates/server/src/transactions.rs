//! Transactions API endpoints.

use api_types::{
    envelope::MessageView,
    transaction::{TransactionNew, TransactionQuery, TransactionUpdate},
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{
    NewTransaction, PageRequest, SortOrder, Transaction, TransactionFilter, TransactionPatch,
    TransactionSortField, TransactionSummary,
};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, ServerError, created, ok, paged, parse, parse_opt,
    server::{AuthUser, ServerState},
};

fn sort_field(value: &str) -> Result<TransactionSortField, ServerError> {
    match value.trim() {
        "date" => Ok(TransactionSortField::Date),
        "amount" => Ok(TransactionSortField::Amount),
        "description" => Ok(TransactionSortField::Description),
        "created_at" | "createdAt" => Ok(TransactionSortField::CreatedAt),
        other => Err(ServerError::Generic(format!("invalid sort field: {other}"))),
    }
}

fn sort_order(value: &str) -> Result<SortOrder, ServerError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ASC" => Ok(SortOrder::Asc),
        "DESC" => Ok(SortOrder::Desc),
        other => Err(ServerError::Generic(format!("invalid sort order: {other}"))),
    }
}

fn filter(query: TransactionQuery) -> Result<TransactionFilter, ServerError> {
    Ok(TransactionFilter {
        kind: parse_opt(query.kind.as_deref())?,
        status: parse_opt(query.status.as_deref())?,
        category_id: query.category_id,
        from_account_id: query.from_account_id,
        to_account_id: query.to_account_id,
        account_id: query.account_id,
        start_date: query.start_date,
        end_date: query.end_date,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        search: query.search,
        is_recurring: query.is_recurring,
        tags: query
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        sort_by: query
            .sort_by
            .as_deref()
            .map(sort_field)
            .transpose()?
            .unwrap_or_default(),
        sort_order: query
            .sort_order
            .as_deref()
            .map(sort_order)
            .transpose()?
            .unwrap_or_default(),
    })
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Vec<Transaction>> {
    let page = PageRequest::new(query.page, query.limit, 20)?;
    let filter = filter(query)?;
    paged(state.engine.list_transactions(&user.id, filter, page).await?)
}

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<TransactionSummary> {
    ok(state.engine.transaction_summary(&user.id).await?)
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Transaction> {
    ok(state.engine.transaction(&id, &user.id).await?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<TransactionNew>,
) -> Created<Transaction> {
    let cmd = NewTransaction {
        kind: parse(&payload.kind)?,
        amount_minor: payload.amount_minor,
        description: payload.description,
        notes: payload.notes,
        date: payload.date,
        status: parse_opt(payload.status.as_deref())?,
        currency: payload.currency,
        reference: payload.reference,
        tags: payload.tags,
        location: payload.location,
        is_recurring: payload.is_recurring,
        recurring_pattern: parse_opt(payload.recurring_pattern.as_deref())?,
        recurring_end_date: payload.recurring_end_date,
        category_id: payload.category_id,
        from_account_id: payload.from_account_id,
        to_account_id: payload.to_account_id,
    };
    created(state.engine.create_transaction(&user.id, cmd).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TransactionUpdate>,
) -> ApiResult<Transaction> {
    let recurring_pattern = match payload.recurring_pattern {
        Some(pattern) => Some(parse_opt(pattern.as_deref())?),
        None => None,
    };
    let patch = TransactionPatch {
        kind: parse_opt(payload.kind.as_deref())?,
        amount_minor: payload.amount_minor,
        description: payload.description,
        notes: payload.notes,
        date: payload.date,
        status: parse_opt(payload.status.as_deref())?,
        currency: payload.currency,
        reference: payload.reference,
        tags: payload.tags,
        location: payload.location,
        is_recurring: payload.is_recurring,
        recurring_pattern,
        recurring_end_date: payload.recurring_end_date,
        category_id: payload.category_id,
        from_account_id: payload.from_account_id,
        to_account_id: payload.to_account_id,
    };
    ok(state.engine.update_transaction(&id, &user.id, patch).await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<MessageView> {
    state.engine.delete_transaction(&id, &user.id).await?;
    ok(MessageView {
        message: "Transaction deleted successfully".to_string(),
    })
}
