//! Password hashing and signed bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs sharing the same secret and
//! issuer. Refresh tokens carry `"type": "refresh"`; access tokens carry no
//! `type` claim, so one can never stand in for the other.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, users};

pub const REFRESH_TOKEN_TYPE: &str = "refresh";
pub const DEFAULT_ISSUER: &str = "moneymap-api";
pub const MIN_PASSWORD_LEN: usize = 8;

/// Settings for token signing and password hashing.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Base URL used in verification links.
    pub public_url: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 86_400,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub usr: String,
    pub currency: String,
    pub iss: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry, milliseconds since the Unix epoch.
    pub expiration: i64,
}

pub(crate) struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub(crate) fn new(settings: &AuthSettings) -> ResultEngine<Self> {
        if settings.secret.is_empty() {
            return Err(EngineError::InvalidInput(
                "auth secret must not be empty".to_string(),
            ));
        }
        if settings.access_ttl_secs <= 0 || settings.refresh_ttl_secs <= 0 {
            return Err(EngineError::InvalidInput(
                "token lifetimes must be positive".to_string(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer.clone(),
            access_ttl_secs: settings.access_ttl_secs,
            refresh_ttl_secs: settings.refresh_ttl_secs,
        })
    }

    pub(crate) fn issue(&self, user: &users::Model, now: DateTime<Utc>) -> ResultEngine<TokenPair> {
        let iat = now.timestamp();
        let access_exp = iat + self.access_ttl_secs;
        let access = self.claims(user, iat, access_exp, None);
        let refresh = self.claims(
            user,
            iat,
            iat + self.refresh_ttl_secs,
            Some(REFRESH_TOKEN_TYPE.to_string()),
        );
        Ok(TokenPair {
            username: user.username.clone(),
            access_token: self.encode(&access)?,
            refresh_token: self.encode(&refresh)?,
            expiration: access_exp * 1000,
        })
    }

    pub(crate) fn verify_access(&self, token: &str, now: DateTime<Utc>) -> ResultEngine<Claims> {
        let claims = self.decode(token, now)?;
        if claims.is_refresh() {
            return Err(EngineError::Token("refresh token not accepted".to_string()));
        }
        Ok(claims)
    }

    pub(crate) fn verify_refresh(&self, token: &str, now: DateTime<Utc>) -> ResultEngine<Claims> {
        let claims = self.decode(token, now)?;
        if !claims.is_refresh() {
            return Err(EngineError::Token("invalid refresh token".to_string()));
        }
        Ok(claims)
    }

    fn claims(
        &self,
        user: &users::Model,
        iat: i64,
        exp: i64,
        token_type: Option<String>,
    ) -> Claims {
        Claims {
            sub: user.id.clone(),
            usr: user.username.clone(),
            currency: user.default_currency.clone(),
            iss: self.issuer.clone(),
            token_type,
            iat,
            exp,
        }
    }

    fn encode(&self, claims: &Claims) -> ResultEngine<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| EngineError::Token(format!("failed to sign token: {err}")))
    }

    /// Check signature and issuer, then expiry against the engine clock.
    fn decode(&self, token: &str, now: DateTime<Utc>) -> ResultEngine<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidIssuer => EngineError::Token("invalid token issuer".to_string()),
                _ => EngineError::Token("invalid token".to_string()),
            })?;
        if claims.exp <= now.timestamp() {
            return Err(EngineError::Token("token expired".to_string()));
        }
        Ok(claims)
    }
}

pub(crate) fn ensure_password(password: &str) -> ResultEngine<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn hash_password(password: &str, cost: u32) -> ResultEngine<String> {
    Ok(bcrypt::hash(password, cost)?)
}

pub(crate) fn verify_password(password: &str, hash: &str) -> ResultEngine<bool> {
    Ok(bcrypt::verify(password, hash)?)
}
