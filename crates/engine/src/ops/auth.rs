use chrono::Duration;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Claims, EngineError, NewUser, ResultEngine, TokenPair, User,
    auth::verify_password,
    mailer::{verification_mail, welcome_mail},
    users,
    util::normalize_email,
};

use super::{Engine, with_tx};

const VERIFICATION_TTL_HOURS: i64 = 24;

/// Outcome of a sign-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub user: User,
    pub message: String,
}

impl Engine {
    /// Create a user and mail them a verification link.
    pub async fn register(&self, cmd: NewUser) -> ResultEngine<Registration> {
        let (model, token) = with_tx!(self, |db_tx| {
            let model = self.insert_user(&db_tx, cmd).await?;
            let (model, token) = self.renew_verification(&db_tx, model).await?;
            Ok::<_, EngineError>((model, token))
        })?;

        self.mailer.send(verification_mail(
            &model.email,
            &model.username,
            &self.verification_link(&token),
        ));
        Ok(Registration {
            user: User::try_from(model)?,
            message: "User registered successfully. Check your email to verify your account."
                .to_string(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> ResultEngine<TokenPair> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let email = email.trim().to_lowercase();
            let model = users::Entity::find()
                .filter(users::Column::Email.eq(email))
                .filter(users::Column::IsActive.eq(true))
                .one(&db_tx)
                .await?
                .ok_or(EngineError::InvalidCredentials)?;
            if !verify_password(password, &model.password_hash)? {
                tracing::warn!(user_id = %model.id, "login with wrong password");
                return Err(EngineError::InvalidCredentials);
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                last_login_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            tracing::info!(user_id = %model.id, "user logged in");
            self.tokens.issue(&model, now)
        })
    }

    /// Trade a refresh token for a fresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> ResultEngine<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token, self.now())?;
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(claims.sub.clone())
                .filter(users::Column::IsActive.eq(true))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::Unauthorized("User no longer exists".to_string()))?;
            self.tokens.issue(&model, self.now())
        })
    }

    pub fn verify_access_token(&self, token: &str) -> ResultEngine<Claims> {
        self.tokens.verify_access(token, self.now())
    }

    pub async fn verify_email(&self, token: &str) -> ResultEngine<User> {
        let now = self.now();
        let model = with_tx!(self, |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::VerificationToken.eq(token.trim()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("Invalid verification token".to_string())
                })?;
            if model.verification_expires_at.is_none_or(|expires| expires < now) {
                return Err(EngineError::Unauthorized(
                    "Verification token expired".to_string(),
                ));
            }
            let model = users::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                is_verified: ActiveValue::Set(true),
                verification_token: ActiveValue::Set(None),
                verification_expires_at: ActiveValue::Set(None),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok::<_, EngineError>(model)
        })?;

        tracing::info!(user_id = %model.id, "email verified");
        self.mailer.send(welcome_mail(&model.email, &model.username));
        User::try_from(model)
    }

    pub async fn resend_verification(&self, email: &str) -> ResultEngine<()> {
        let email = normalize_email(email)?;
        let (model, token) = with_tx!(self, |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::Email.eq(email))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("User not found".to_string()))?;
            if model.is_verified {
                return Err(EngineError::InvalidInput(
                    "Email already verified".to_string(),
                ));
            }
            let (model, token) = self.renew_verification(&db_tx, model).await?;
            Ok::<_, EngineError>((model, token))
        })?;

        self.mailer.send(verification_mail(
            &model.email,
            &model.username,
            &self.verification_link(&token),
        ));
        Ok(())
    }

    async fn renew_verification(
        &self,
        db: &sea_orm::DatabaseTransaction,
        model: users::Model,
    ) -> ResultEngine<(users::Model, String)> {
        let now = self.now();
        let token = Uuid::new_v4().simple().to_string();
        let model = users::ActiveModel {
            id: ActiveValue::Set(model.id),
            verification_token: ActiveValue::Set(Some(token.clone())),
            verification_expires_at: ActiveValue::Set(Some(
                now + Duration::hours(VERIFICATION_TTL_HOURS),
            )),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok((model, token))
    }

    fn verification_link(&self, token: &str) -> String {
        format!("{}/api/v1/auth/verify-email?token={token}", self.public_url)
    }
}
