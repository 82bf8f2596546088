//! Sign-up, login and token endpoints. None of them require an access token.

use api_types::{
    auth::{Login, Register, ResendVerification, VerifyEmailQuery},
    envelope::MessageView,
};
use axum::extract::State;
use engine::{NewUser, Registration, TokenPair, User};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, created, ok,
    server::{BearerHeader, ServerState, bearer_token},
};

pub(crate) fn new_user(payload: Register) -> NewUser {
    NewUser {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        locale: payload.locale,
        timezone: payload.timezone,
        default_currency: payload.default_currency,
    }
}

pub async fn register(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<Register>,
) -> Created<Registration> {
    created(state.engine.register(new_user(payload)).await?)
}

pub async fn login(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<Login>,
) -> ApiResult<TokenPair> {
    ok(state.engine.login(&payload.email, &payload.password).await?)
}

/// Expects the refresh token as bearer credentials.
pub async fn refresh(State(state): State<ServerState>, header: BearerHeader) -> ApiResult<TokenPair> {
    let token = bearer_token(header)?;
    ok(state.engine.refresh(&token).await?)
}

pub async fn verify_email(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<VerifyEmailQuery>,
) -> ApiResult<User> {
    ok(state.engine.verify_email(&query.token).await?)
}

pub async fn resend_verification(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<ResendVerification>,
) -> ApiResult<MessageView> {
    state.engine.resend_verification(&payload.email).await?;
    ok(MessageView {
        message: "Verification email sent".to_string(),
    })
}
