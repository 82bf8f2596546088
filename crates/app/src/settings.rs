//! Settings for the `moneymap` binary.
//!
//! Read from `settings.toml` (or the file given with `--config`), then
//! overridden by `MONEYMAP__SECTION__KEY` environment variables.

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Parser)]
#[command(name = "moneymap", version, about = "Personal finance API server")]
struct Args {
    /// Settings file (TOML). The extension may be omitted.
    #[arg(long, env = "MONEYMAP_CONFIG")]
    config: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            database: Database::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
    pub issuer: Option<String>,
    pub access_ttl_secs: Option<i64>,
    pub refresh_ttl_secs: Option<i64>,
    pub bcrypt_cost: Option<u32>,
    pub public_url: Option<String>,
}

impl From<Auth> for engine::AuthSettings {
    fn from(auth: Auth) -> Self {
        let defaults = engine::AuthSettings::default();
        Self {
            secret: auth.secret,
            issuer: auth.issuer.unwrap_or(defaults.issuer),
            access_ttl_secs: auth.access_ttl_secs.unwrap_or(defaults.access_ttl_secs),
            refresh_ttl_secs: auth.refresh_ttl_secs.unwrap_or(defaults.refresh_ttl_secs),
            bcrypt_cost: auth.bcrypt_cost.unwrap_or(defaults.bcrypt_cost),
            public_url: auth.public_url.unwrap_or(defaults.public_url),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub auth: Auth,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        Self::load(args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH))
    }

    fn load(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MONEYMAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
