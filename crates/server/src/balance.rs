//! Balance calculation endpoints.

use api_types::balance::{EvolutionQuery, HistoryQuery};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{BalanceEvolutionPoint, BalanceHistory, BalanceSummary, CurrentBalance, HistoryPeriod};

use crate::{
    ApiQuery, ApiResult, ok, parse_opt,
    server::{AuthUser, ServerState},
};

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<BalanceSummary> {
    ok(state.engine.balance_summary(&user.id).await?)
}

pub async fn recalculate_all(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<Vec<CurrentBalance>> {
    ok(state.engine.recalculate_all_balances(&user.id).await?)
}

pub async fn current(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<CurrentBalance> {
    ok(state.engine.current_balance(&id, &user.id).await?)
}

pub async fn history(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<BalanceHistory> {
    let period: HistoryPeriod = parse_opt(query.period.as_deref())?.unwrap_or_default();
    ok(state
        .engine
        .balance_history(&id, &user.id, period, query.start_date, query.end_date)
        .await?)
}

pub async fn evolution(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<EvolutionQuery>,
) -> ApiResult<Vec<BalanceEvolutionPoint>> {
    ok(state
        .engine
        .balance_evolution(&id, &user.id, query.days)
        .await?)
}

pub async fn recalculate(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<CurrentBalance> {
    ok(state.engine.recalculate_balance(&id, &user.id).await?)
}
