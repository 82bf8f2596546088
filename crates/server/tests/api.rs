use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{AuthSettings, Engine, Mail, Mailer};
use migration::MigratorTrait;
use server::{ServerState, router};

const FOOD: &str = "5f1c6a3e-0004-4000-8000-000000000004";

#[derive(Debug, Default)]
struct Outbox(Mutex<Vec<Mail>>);

impl Mailer for Outbox {
    fn send(&self, mail: Mail) {
        self.0.lock().unwrap().push(mail);
    }
}

impl Outbox {
    fn last_token(&self) -> String {
        let sent = self.0.lock().unwrap();
        let body = &sent.last().unwrap().body;
        let (_, token) = body.split_once("token=").unwrap();
        token.split_whitespace().next().unwrap().to_string()
    }
}

struct TestApp {
    router: Router,
    outbox: Arc<Outbox>,
}

/// Engine on a migrated in-memory DB with the clock pinned to 2026-03-15.
async fn test_engine(outbox: Arc<Outbox>) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .auth(AuthSettings {
            secret: "server-test-secret".to_string(),
            bcrypt_cost: 4,
            ..AuthSettings::default()
        })
        .mailer(outbox)
        .clock(|| Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
        .build()
        .await
        .unwrap()
}

impl TestApp {
    async fn new() -> Self {
        let outbox = Arc::new(Outbox::default());
        let engine = test_engine(outbox.clone()).await;

        Self {
            router: router(ServerState {
                engine: Arc::new(engine),
            }),
            outbox,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register `username` and return an access token.
    async fn sign_up(&self, username: &str) -> String {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "s3cret-pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": format!("{username}@example.com"), "password": "s3cret-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn create_account(&self, token: &str, name: &str, initial: i64) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/accounts",
                Some(token),
                Some(json!({ "name": name, "type": "checking", "initial_balance": initial })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn registration_verification_and_login() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "s3cret-pass",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = app.outbox.last_token();
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/auth/verify-email?token={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_verified"], true);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let access = app.sign_up("bob").await;
    let (status, body) = app
        .call(Method::GET, "/api/v1/users/me", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "bob");
}

#[tokio::test]
async fn refresh_takes_the_refresh_token_as_bearer() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;
    let (_, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "s3cret-pass" })),
        )
        .await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::POST, "/api/v1/auth/refresh", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());

    let (status, _) = app
        .call(Method::POST, "/api/v1/auth/refresh", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/v1/accounts", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_answer_401_with_the_error_envelope() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/v1/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 401);
    assert_eq!(body["path"], "/api/v1/accounts");
    assert!(body["timestamp"].is_string());

    let (status, _) = app
        .call(Method::GET, "/api/v1/accounts", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/v1/nowhere");
}

#[tokio::test]
async fn public_user_creation_and_self_only_updates() {
    let app = TestApp::new().await;
    let alice = app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "s3cret-pass",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email and username already in use");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "s3cret-pass",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(
            Method::PATCH,
            "/api/v1/users/carol",
            Some(&alice),
            Some(json!({ "first_name": "Mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call(
            Method::PATCH,
            "/api/v1/users/alice",
            Some(&alice),
            Some(json!({ "first_name": "Alice", "timezone": "Europe/Lisbon" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Alice");

    let (status, body) = app
        .call(Method::GET, "/api/v1/users?limit=1", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["total_pages"], 2);
}

#[tokio::test]
async fn transactions_drive_balances_end_to_end() {
    let app = TestApp::new().await;
    let token = app.sign_up("alice").await;
    let checking = app.create_account(&token, "Checking", 10_000).await;
    let savings = app.create_account(&token, "Savings", 0).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/transactions",
            Some(&token),
            Some(json!({
                "type": "expense",
                "amount_minor": 2_500,
                "description": "Groceries",
                "date": "2026-03-10",
                "category_id": FOOD,
                "from_account_id": checking,
                "tags": ["food"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "expense");
    assert_eq!(body["data"]["currency"], "BRL");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/transactions",
            Some(&token),
            Some(json!({
                "type": "transfer",
                "amount_minor": 1_000,
                "description": "Put aside",
                "date": "2026-03-11",
                "from_account_id": checking,
                "to_account_id": savings,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let transfer_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/balance/accounts/{checking}/current"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 6_500);
    assert_eq!(body["data"]["transaction_count"], 2);

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/transactions?type=expense&tags=food,travel&sort_by=amount&sort_order=asc",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["description"], "Groceries");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/transactions/{transfer_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::GET, "/api/v1/balance/summary", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_balance"], 7_500);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/balance/accounts/{checking}/history?period=custom&start_date=2026-03-09&end_date=2026-03-11"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["opening_balance"], 10_000);
    assert_eq!(body["data"]["points"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["points"][2]["balance"], 7_500);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/balance/accounts/{checking}/evolution?days=5"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn invalid_input_is_a_400_envelope() {
    let app = TestApp::new().await;
    let token = app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/accounts",
            Some(&token),
            Some(json!({ "name": "Wallet", "type": "piggy_bank" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["path"], "/api/v1/accounts");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/accounts",
            Some(&token),
            Some(json!({ "type": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let (status, _) = app
        .call(Method::GET, "/api/v1/accounts?page=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/transactions?sort_order=sideways",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ownership_is_enforced_across_users() {
    let app = TestApp::new().await;
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    let account = app.create_account(&alice, "Checking", 0).await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/accounts/{account}"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You don't have access to this account");

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/accounts/00000000-0000-4000-8000-000000000000",
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/v1/categories/{FOOD}"),
            Some(&bob),
            Some(json!({ "name": "Meals" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn budgets_and_goals_over_http() {
    let app = TestApp::new().await;
    let token = app.sign_up("alice").await;
    let checking = app.create_account(&token, "Checking", 0).await;
    app.call(
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({
            "type": "expense",
            "amount_minor": 9_000,
            "description": "Market",
            "date": "2026-03-02",
            "category_id": FOOD,
            "from_account_id": checking,
        })),
    )
    .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/budgets",
            Some(&token),
            Some(json!({
                "name": "Food",
                "amount": 10_000,
                "period": "monthly",
                "start_date": "2026-03-01",
                "category_id": FOOD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["spent"], 9_000);
    assert_eq!(body["data"]["alert"], true);

    let (status, body) = app
        .call(Method::GET, "/api/v1/budgets?status=active", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/goals",
            Some(&token),
            Some(json!({
                "name": "Trip",
                "type": "savings",
                "target_amount": 2_000,
                "start_date": "2026-01-01",
                "target_date": "2026-12-31",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let goal = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/goals/{goal}/contribute"),
            Some(&token),
            Some(json!({ "amount": 2_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["completed_at"], "2026-03-15");
}

#[tokio::test]
async fn out_of_range_pages_and_amounts_are_400() {
    let app = TestApp::new().await;
    let token = app.sign_up("alice").await;
    let checking = app.create_account(&token, "Checking", 0).await;

    for uri in [
        "/api/v1/accounts?page=18446744073709551615",
        "/api/v1/transactions?page=1844674407370955161&limit=10",
        "/api/v1/users?page=18446744073709551615&limit=100",
    ] {
        let (status, body) = app.call(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["status_code"], 400);
        assert_eq!(body["error"], "page is out of range");
    }

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/transactions",
            Some(&token),
            Some(json!({
                "type": "income",
                "amount_minor": i64::MAX,
                "description": "Jackpot",
                "date": "2026-03-10",
                "from_account_id": checking,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/accounts/{checking}/balance"),
            Some(&token),
            Some(json!({ "balance": i64::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_reports_a_port_already_in_use() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let engine = test_engine(Arc::new(Outbox::default())).await;
    let err = server::run(engine, addr).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
}
