use api_types::{
    envelope::{MessageView, PageQuery},
    user::{UserNew, UserUpdate},
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{PageRequest, User, UserPatch};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, auth::new_user, created, ok, paged,
    server::{AuthUser, ServerState},
};

pub async fn list(
    Extension(_): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<User>> {
    let page = PageRequest::new(query.page, query.limit, 10)?;
    paged(state.engine.list_users(page).await?)
}

pub async fn me(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<User> {
    ok(state.engine.me(&user.id).await?)
}

pub async fn get(
    Extension(_): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> ApiResult<User> {
    ok(state.engine.user_by_username(&username).await?)
}

/// Public: creating a user does not mail a verification link.
pub async fn create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<UserNew>,
) -> Created<User> {
    created(state.engine.create_user(new_user(payload)).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> ApiResult<User> {
    let patch = UserPatch {
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        locale: payload.locale,
        timezone: payload.timezone,
        default_currency: payload.default_currency,
    };
    ok(state.engine.update_user(&username, &user.id, patch).await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> ApiResult<MessageView> {
    state.engine.delete_user(&username, &user.id).await?;
    ok(MessageView {
        message: "User deleted successfully".to_string(),
    })
}
