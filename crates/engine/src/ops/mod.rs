use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;

use crate::{
    AuthSettings, EngineError, LogMailer, Mailer, ResultEngine, auth::TokenService,
};

mod access;
mod accounts;
mod auth;
mod balances;
mod budgets;
mod categories;
mod goals;
mod transactions;
mod users;

pub use accounts::{AccountDeletion, AccountSummary};
pub use auth::Registration;
pub use transactions::TransactionSummary;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Engine {
    database: DatabaseConnection,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    bcrypt_cost: u32,
    public_url: String,
    clock: Clock,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("tokens", &self.tokens)
            .field("mailer", &self.mailer)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    auth: AuthSettings,
    mailer: Arc<dyn Mailer>,
    clock: Clock,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            auth: AuthSettings::default(),
            mailer: Arc::new(LogMailer),
            clock: Arc::new(Utc::now),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Token signing and password hashing settings. The secret is required.
    pub fn auth(mut self, settings: AuthSettings) -> EngineBuilder {
        self.auth = settings;
        self
    }

    /// Where verification and welcome mails go. Defaults to [`LogMailer`].
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> EngineBuilder {
        self.mailer = mailer;
        self
    }

    /// Override the wall clock, e.g. to pin "today" in tests.
    pub fn clock<F>(mut self, clock: F) -> EngineBuilder
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(EngineError::InvalidInput(
                "bcrypt cost must be between 4 and 31".to_string(),
            ));
        }
        Ok(Engine {
            tokens: TokenService::new(&self.auth)?,
            database: self.database,
            mailer: self.mailer,
            bcrypt_cost: self.auth.bcrypt_cost,
            public_url: self.auth.public_url.trim_end_matches('/').to_string(),
            clock: self.clock,
        })
    }
}
