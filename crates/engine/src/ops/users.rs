use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, NewUser, Page, PageRequest, ResultEngine, User, UserPatch,
    auth::{ensure_password, hash_password},
    users,
    util::{ensure_timezone, normalize_email, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

fn normalize_username(value: &str) -> ResultEngine<String> {
    let username = normalize_required_name(value, "Username")?;
    if username.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidInput(
            "Username must not contain spaces".to_string(),
        ));
    }
    Ok(username)
}

impl Engine {
    pub async fn list_users(&self, page: PageRequest) -> ResultEngine<Page<User>> {
        with_tx!(self, |db_tx| {
            let query = users::Entity::find();
            let total = query.clone().count(&db_tx).await?;
            let items = query
                .order_by_asc(users::Column::Username)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(User::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = find_by_username(&db_tx, username).await?;
            User::try_from(model)
        })
    }

    /// The user behind an access token.
    pub async fn me(&self, user_id: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            User::try_from(model)
        })
    }

    pub async fn create_user(&self, cmd: NewUser) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.insert_user(&db_tx, cmd).await?;
            User::try_from(model)
        })
    }

    /// Update the caller's own profile.
    pub async fn update_user(
        &self,
        username: &str,
        caller_id: &str,
        patch: UserPatch,
    ) -> ResultEngine<User> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = find_by_username(&db_tx, username).await?;
            ensure_self(&model, caller_id, "update")?;

            let mut active: users::ActiveModel = model.clone().into();
            if let Some(email) = patch.email.as_deref() {
                let email = normalize_email(email)?;
                if email != model.email {
                    ensure_unique(&db_tx, None, Some(&email), Some(&model.id)).await?;
                }
                active.email = ActiveValue::Set(email);
            }
            if let Some(password) = patch.password.as_deref() {
                ensure_password(password)?;
                active.password_hash = ActiveValue::Set(hash_password(password, self.bcrypt_cost)?);
            }
            if let Some(first_name) = patch.first_name {
                active.first_name = ActiveValue::Set(normalize_optional_text(first_name.as_deref()));
            }
            if let Some(last_name) = patch.last_name {
                active.last_name = ActiveValue::Set(normalize_optional_text(last_name.as_deref()));
            }
            if let Some(locale) = patch.locale.as_deref() {
                active.locale = ActiveValue::Set(normalize_required_name(locale, "Locale")?);
            }
            if let Some(timezone) = patch.timezone.as_deref() {
                active.timezone = ActiveValue::Set(ensure_timezone(timezone)?);
            }
            if let Some(code) = patch.default_currency.as_deref() {
                active.default_currency = ActiveValue::Set(Currency::try_from(code)?.into());
            }
            active.updated_at = ActiveValue::Set(now);

            let updated = active.update(&db_tx).await?;
            tracing::info!(user_id = %updated.id, "user updated");
            User::try_from(updated)
        })
    }

    /// Delete the caller's own user together with everything they own.
    pub async fn delete_user(&self, username: &str, caller_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = find_by_username(&db_tx, username).await?;
            ensure_self(&model, caller_id, "delete")?;
            users::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(user_id = %model.id, "user deleted");
            Ok::<_, EngineError>(())
        })
    }

    /// Validate and insert a new user row. Shared by sign-up and user creation.
    pub(super) async fn insert_user(
        &self,
        db: &DatabaseTransaction,
        cmd: NewUser,
    ) -> ResultEngine<users::Model> {
        let username = normalize_username(&cmd.username)?;
        let email = normalize_email(&cmd.email)?;
        ensure_password(&cmd.password)?;
        let timezone = match cmd.timezone.as_deref() {
            Some(timezone) => ensure_timezone(timezone)?,
            None => users::DEFAULT_TIMEZONE.to_string(),
        };
        let currency = match cmd.default_currency.as_deref() {
            Some(code) => Currency::try_from(code)?,
            None => Currency::default(),
        };
        let locale = match cmd.locale.as_deref() {
            Some(locale) => normalize_required_name(locale, "Locale")?,
            None => users::DEFAULT_LOCALE.to_string(),
        };
        ensure_unique(db, Some(&username), Some(&email), None).await?;

        let now = self.now();
        let model = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            username: ActiveValue::Set(username),
            email: ActiveValue::Set(email),
            password_hash: ActiveValue::Set(hash_password(&cmd.password, self.bcrypt_cost)?),
            first_name: ActiveValue::Set(normalize_optional_text(cmd.first_name.as_deref())),
            last_name: ActiveValue::Set(normalize_optional_text(cmd.last_name.as_deref())),
            locale: ActiveValue::Set(locale),
            timezone: ActiveValue::Set(timezone),
            default_currency: ActiveValue::Set(currency.into()),
            is_verified: ActiveValue::Set(false),
            verification_token: ActiveValue::Set(None),
            verification_expires_at: ActiveValue::Set(None),
            is_active: ActiveValue::Set(true),
            last_login_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
        .insert(db)
        .await?;
        tracing::info!(user_id = %model.id, username = %model.username, "user created");
        Ok(model)
    }
}

pub(super) async fn find_by_username(
    db: &DatabaseTransaction,
    username: &str,
) -> ResultEngine<users::Model> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username.trim()))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("User not found".to_string()))
}

fn ensure_self(model: &users::Model, caller_id: &str, action: &str) -> ResultEngine<()> {
    if model.id != caller_id {
        return Err(EngineError::Forbidden(format!(
            "You can only {action} your own user"
        )));
    }
    Ok(())
}

/// Reject a username or email already taken, naming every clashing field.
async fn ensure_unique(
    db: &DatabaseTransaction,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<&str>,
) -> ResultEngine<()> {
    let mut condition = Condition::any();
    if let Some(username) = username {
        condition = condition.add(users::Column::Username.eq(username));
    }
    if let Some(email) = email {
        condition = condition.add(users::Column::Email.eq(email));
    }
    let clashes = users::Entity::find()
        .filter(condition)
        .all(db)
        .await?
        .into_iter()
        .filter(|other| exclude_id.is_none_or(|id| other.id != id))
        .collect::<Vec<_>>();

    let email_taken = email.is_some_and(|email| clashes.iter().any(|u| u.email == email));
    let username_taken =
        username.is_some_and(|username| clashes.iter().any(|u| u.username == username));
    let fields = match (email_taken, username_taken) {
        (true, true) => "email and username",
        (true, false) => "email",
        (false, true) => "username",
        (false, false) => return Ok(()),
    };
    Err(EngineError::ExistingKey(format!("{fields} already in use")))
}
