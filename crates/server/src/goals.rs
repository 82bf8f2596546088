use api_types::{
    envelope::MessageView,
    goal::{Contribution, GoalNew, GoalQuery, GoalUpdate, MilestoneBody},
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{Goal, GoalPatch, Milestone, NewGoal, PageRequest};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, created, ok, paged, parse, parse_opt,
    server::{AuthUser, ServerState},
};

fn milestones(bodies: Vec<MilestoneBody>) -> Vec<Milestone> {
    bodies
        .into_iter()
        .map(|body| Milestone {
            name: body.name,
            amount: body.amount,
            reached_at: body.reached_at,
        })
        .collect()
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<GoalQuery>,
) -> ApiResult<Vec<Goal>> {
    let page = PageRequest::new(query.page, query.limit, 10)?;
    let status = parse_opt(query.status.as_deref())?;
    paged(state.engine.list_goals(&user.id, status, page).await?)
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Goal> {
    ok(state.engine.goal(&id, &user.id).await?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<GoalNew>,
) -> Created<Goal> {
    let cmd = NewGoal {
        name: payload.name,
        description: payload.description,
        kind: parse(&payload.kind)?,
        target_amount: payload.target_amount,
        current_amount: payload.current_amount,
        currency: payload.currency,
        start_date: payload.start_date,
        target_date: payload.target_date,
        period: parse_opt(payload.period.as_deref())?,
        color: payload.color,
        icon: payload.icon,
        auto_calculate: payload.auto_calculate,
        milestones: milestones(payload.milestones),
        category_id: payload.category_id,
    };
    created(state.engine.create_goal(&user.id, cmd).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<GoalUpdate>,
) -> ApiResult<Goal> {
    let patch = GoalPatch {
        name: payload.name,
        description: payload.description,
        kind: parse_opt(payload.kind.as_deref())?,
        target_amount: payload.target_amount,
        current_amount: payload.current_amount,
        currency: payload.currency,
        start_date: payload.start_date,
        target_date: payload.target_date,
        period: parse_opt(payload.period.as_deref())?,
        status: parse_opt(payload.status.as_deref())?,
        color: payload.color,
        icon: payload.icon,
        auto_calculate: payload.auto_calculate,
        milestones: payload.milestones.map(milestones),
        category_id: payload.category_id,
    };
    ok(state.engine.update_goal(&id, &user.id, patch).await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<MessageView> {
    state.engine.delete_goal(&id, &user.id).await?;
    ok(MessageView {
        message: "Goal deleted successfully".to_string(),
    })
}

pub async fn contribute(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Contribution>,
) -> ApiResult<Goal> {
    ok(state
        .engine
        .contribute_to_goal(&id, &user.id, payload.amount)
        .await?)
}
