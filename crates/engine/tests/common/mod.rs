#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Account, AccountKind, AuthSettings, Engine, Mail, Mailer, NewAccount, NewTransaction,
    NewUser, Transaction, TransactionKind,
};
use migration::MigratorTrait;

pub const SALARY: &str = "5f1c6a3e-0001-4000-8000-000000000001";
pub const FOOD: &str = "5f1c6a3e-0004-4000-8000-000000000004";
pub const HOUSING: &str = "5f1c6a3e-0005-4000-8000-000000000005";
pub const PASSWORD: &str = "s3cret-pass";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Settable wall clock shared with the engine.
#[derive(Clone, Debug)]
pub struct TestClock(Arc<AtomicI64>);

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Arc::new(AtomicI64::new(now.timestamp())))
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.0.load(Ordering::SeqCst), 0).unwrap()
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.0.store(now.timestamp(), Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Mail>>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<Mail> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Token from the last verification link.
    pub fn last_token(&self) -> String {
        let mail = self.last().expect("no mail sent");
        let (_, token) = mail.body.split_once("token=").expect("no token in mail");
        token.split_whitespace().next().unwrap().to_string()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: Mail) {
        self.sent.lock().unwrap().push(mail);
    }
}

pub struct TestEngine {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub clock: TestClock,
    pub mailer: Arc<RecordingMailer>,
    /// Id of the registered user `alice`.
    pub user_id: String,
}

pub fn settings() -> AuthSettings {
    AuthSettings {
        secret: "test-secret".to_string(),
        bcrypt_cost: 4,
        public_url: "http://moneymap.test".to_string(),
        ..AuthSettings::default()
    }
}

/// Migrated in-memory DB, clock pinned to 2026-03-15 12:00 UTC and `alice`
/// registered.
pub async fn engine_with_db() -> TestEngine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let clock = TestClock::at(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap());
    let mailer = Arc::new(RecordingMailer::default());
    let engine_clock = clock.clone();
    let engine = Engine::builder()
        .database(db.clone())
        .auth(settings())
        .mailer(mailer.clone())
        .clock(move || engine_clock.now())
        .build()
        .await
        .unwrap();

    let user_id = register(&engine, "alice").await;
    TestEngine {
        engine,
        db,
        clock,
        mailer,
        user_id,
    }
}

pub fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: PASSWORD.to_string(),
        first_name: None,
        last_name: None,
        locale: None,
        timezone: None,
        default_currency: None,
    }
}

pub async fn register(engine: &Engine, username: &str) -> String {
    let registration = engine.register(new_user(username)).await.unwrap();
    registration.user.id.to_string()
}

pub async fn account(engine: &Engine, user_id: &str, name: &str, initial: i64) -> Account {
    engine
        .create_account(
            user_id,
            NewAccount::new(name, AccountKind::Checking).initial_balance(initial),
        )
        .await
        .unwrap()
}

pub async fn record(
    engine: &Engine,
    user_id: &str,
    kind: TransactionKind,
    amount: i64,
    on: NaiveDate,
    from: &Account,
) -> Transaction {
    engine
        .create_transaction(
            user_id,
            NewTransaction::new(kind, amount, format!("{} entry", kind.as_str()), on, from.id.to_string()),
        )
        .await
        .unwrap()
}

pub async fn transfer(
    engine: &Engine,
    user_id: &str,
    amount: i64,
    on: NaiveDate,
    from: &Account,
    to: &Account,
) -> Transaction {
    engine
        .create_transaction(
            user_id,
            NewTransaction::new(TransactionKind::Transfer, amount, "Move money", on, from.id.to_string())
                .to_account(to.id.to_string()),
        )
        .await
        .unwrap()
}

pub async fn stored_balance(engine: &Engine, user_id: &str, account: &Account) -> i64 {
    engine
        .account(&account.id.to_string(), user_id)
        .await
        .unwrap()
        .balance
}
