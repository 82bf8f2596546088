use api_types::envelope::{ApiMeta, ApiResponse, ErrorBody};
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use engine::{EngineError, Page};

pub use server::{AuthUser, ServerState, router, run, run_with_listener};

mod accounts;
mod auth;
mod balance;
mod budgets;
mod categories;
mod goals;
mod server;
mod transactions;
mod users;

pub mod types {
    pub use api_types::{account, auth, balance, budget, category, envelope, goal, transaction, user};
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ServerError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServerError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

fn paged<T>(page: Page<T>) -> ApiResult<Vec<T>> {
    let meta = ApiMeta {
        page: page.page,
        limit: page.limit,
        total: page.total,
        total_pages: page.total_pages,
    };
    Ok(Json(ApiResponse::paged(page.items, meta)))
}

/// JSON body extractor answering malformed input with the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor answering malformed input with the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
pub struct ApiQuery<T>(pub T);

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InvalidInput(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidCredentials | EngineError::Unauthorized(_) | EngineError::Token(_) => {
            StatusCode::UNAUTHORIZED
        }
        EngineError::Password(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Password(err) => {
            tracing::error!("password hashing error: {err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        let body = ErrorBody {
            success: false,
            error,
            status_code: status.as_u16(),
            timestamp: Utc::now(),
            path: String::new(),
        };
        let mut response = (status, Json(body.clone())).into_response();
        // Picked up by `attach_error_path`, which knows the request uri.
        response.extensions_mut().insert(body);
        response
    }
}

/// Fill in the `path` of error bodies produced by [`ServerError`]. Status,
/// headers and extensions of the original response are kept.
pub(crate) async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    let (mut parts, _) = response.into_parts();
    let (json_parts, json_body) = Json(ErrorBody { path, ..body }).into_response().into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.extend(json_parts.headers);
    Response::from_parts(parts, json_body)
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

/// Parse an enum-like wire value with the engine's own vocabulary.
fn parse<T>(value: &str) -> Result<T, ServerError>
where
    T: for<'a> TryFrom<&'a str, Error = EngineError>,
{
    Ok(T::try_from(value.trim())?)
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>, ServerError>
where
    T: for<'a> TryFrom<&'a str, Error = EngineError>,
{
    value.map(parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body(res: Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_400() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidDate("x".to_string()),
            EngineError::InvalidId("x".to_string()),
            EngineError::InvalidInput("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn credential_problems_map_to_401() {
        for err in [
            EngineError::InvalidCredentials,
            EngineError::Unauthorized("x".to_string()),
            EngineError::Token("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_their_message() {
        let res = ServerError::from(EngineError::Password("bcrypt exploded".to_string()))
            .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body(res).await;
        assert_eq!(json["error"], "internal server error");
        assert_eq!(json["success"], false);
        assert_eq!(json["status_code"], 500);
    }

    #[tokio::test]
    async fn error_path_keeps_the_original_headers() {
        use axum::{Router, body::Body, middleware, routing::get};
        use tower::ServiceExt;

        async fn failing() -> impl IntoResponse {
            (
                [("x-request-id", "req-42")],
                ServerError::from(EngineError::KeyNotFound("Account not found".to_string())),
            )
        }

        let app = Router::new()
            .route("/accounts/{id}", get(failing))
            .layer(middleware::from_fn(attach_error_path));
        let request = axum::http::Request::builder()
            .uri("/accounts/42")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(request).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()["x-request-id"], "req-42");
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let json = body(res).await;
        assert_eq!(json["path"], "/accounts/42");
        assert_eq!(json["error"], "Account not found");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
