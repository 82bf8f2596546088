use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tower_http::trace::TraceLayer;

use std::{net::SocketAddr, sync::Arc};

use crate::{
    ServerError, accounts, attach_error_path, auth, balance, budgets, categories, goals,
    transactions, users,
};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Caller identity taken from a verified access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

pub(crate) type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

pub(crate) fn bearer_token(header: BearerHeader) -> Result<String, ServerError> {
    match header {
        Ok(TypedHeader(Authorization(bearer))) => Ok(bearer.token().to_string()),
        Err(rejection) if rejection.is_missing() => {
            Err(EngineError::Unauthorized("Missing bearer token".to_string()).into())
        }
        Err(_) => Err(EngineError::Unauthorized("Malformed authorization header".to_string()).into()),
    }
}

async fn require_access(
    State(state): State<ServerState>,
    header: BearerHeader,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = bearer_token(header)?;
    let claims = state.engine.verify_access_token(&token)?;

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        username: claims.usr,
    });
    Ok(next.run(request).await)
}

async fn not_found() -> ServerError {
    EngineError::KeyNotFound("Route not found".to_string()).into()
}

pub fn router(state: ServerState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/verify-email", get(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/users", post(users::create));

    let protected = Router::new()
        .route("/users", get(users::list))
        .route("/users/me", get(users::me))
        .route(
            "/users/{username}",
            get(users::get).patch(users::update).delete(users::delete),
        )
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route("/accounts/summary", get(accounts::summary))
        .route(
            "/accounts/{id}",
            get(accounts::get)
                .patch(accounts::update)
                .delete(accounts::delete),
        )
        .route("/accounts/{id}/balance", patch(accounts::set_balance))
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/hierarchy", get(categories::hierarchy))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/summary", get(transactions::summary))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/balance/summary", get(balance::summary))
        .route("/balance/recalculate", post(balance::recalculate_all))
        .route("/balance/accounts/{id}/current", get(balance::current))
        .route("/balance/accounts/{id}/history", get(balance::history))
        .route("/balance/accounts/{id}/evolution", get(balance::evolution))
        .route(
            "/balance/accounts/{id}/recalculate",
            post(balance::recalculate),
        )
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route(
            "/budgets/{id}",
            get(budgets::get).put(budgets::update).delete(budgets::delete),
        )
        .route("/goals", get(goals::list).post(goals::create))
        .route(
            "/goals/{id}",
            get(goals::get).put(goals::update).delete(goals::delete),
        )
        .route("/goals/{id}/contribute", post(goals::contribute))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .fallback(not_found)
        .layer(middleware::from_fn(attach_error_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|err| {
        tracing::error!("failed to bind server listener on {addr}: {err}");
    })?;
    run_with_listener(engine, listener)
        .await
        .inspect_err(|err| tracing::error!("server failed: {err}"))
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}
