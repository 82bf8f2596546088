use api_types::{
    budget::{BudgetNew, BudgetQuery, BudgetUpdate},
    envelope::MessageView,
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{Budget, BudgetPatch, NewBudget, PageRequest};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, created, ok, paged, parse_opt,
    server::{AuthUser, ServerState},
};

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<BudgetQuery>,
) -> ApiResult<Vec<Budget>> {
    let page = PageRequest::new(query.page, query.limit, 10)?;
    let status = parse_opt(query.status.as_deref())?;
    paged(state.engine.list_budgets(&user.id, status, page).await?)
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Budget> {
    ok(state.engine.budget(&id, &user.id).await?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<BudgetNew>,
) -> Created<Budget> {
    let cmd = NewBudget {
        name: payload.name,
        description: payload.description,
        amount_minor: payload.amount,
        currency: payload.currency,
        period: parse_opt(payload.period.as_deref())?.unwrap_or_default(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        color: payload.color,
        auto_reset: payload.auto_reset,
        alert_enabled: payload.alert_enabled,
        alert_threshold: payload.alert_threshold,
        include_subcategories: payload.include_subcategories,
        category_id: payload.category_id,
    };
    created(state.engine.create_budget(&user.id, cmd).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<BudgetUpdate>,
) -> ApiResult<Budget> {
    let patch = BudgetPatch {
        name: payload.name,
        description: payload.description,
        amount_minor: payload.amount,
        currency: payload.currency,
        period: parse_opt(payload.period.as_deref())?,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: parse_opt(payload.status.as_deref())?,
        color: payload.color,
        auto_reset: payload.auto_reset,
        alert_enabled: payload.alert_enabled,
        alert_threshold: payload.alert_threshold,
        include_subcategories: payload.include_subcategories,
        category_id: payload.category_id,
    };
    ok(state.engine.update_budget(&id, &user.id, patch).await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<MessageView> {
    state.engine.delete_budget(&id, &user.id).await?;
    ok(MessageView {
        message: "Budget deleted successfully".to_string(),
    })
}
