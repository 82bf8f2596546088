//! Resource ownership guards.
//!
//! Lookups by id answer `KeyNotFound` when the row does not exist and
//! `Forbidden` when it belongs to someone else. Transaction references use
//! the `*_for_reference` variants, which collapse both cases into a
//! validation error.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{
    EngineError, ResultEngine, accounts, budgets, categories, goals, transactions, users,
    util::parse_uuid,
};

use super::Engine;

/// Generates a `require_*` method for a table with a `user_id` owner column.
macro_rules! impl_require_owned {
    ($require_fn:ident, $entity:path, $model:path, $label:literal, $name:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: &str,
            user_id: &str,
        ) -> ResultEngine<$model> {
            let id = parse_uuid(id, $label)?;
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($name, " not found").to_string()))?;
            if model.user_id != user_id {
                return Err(EngineError::Forbidden(
                    concat!("You don't have access to this ", $label).to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_account,
        accounts::Entity,
        accounts::Model,
        "account",
        "Account"
    );

    impl_require_owned!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        "transaction",
        "Transaction"
    );

    impl_require_owned!(
        require_budget,
        budgets::Entity,
        budgets::Model,
        "budget",
        "Budget"
    );

    impl_require_owned!(require_goal, goals::Entity, goals::Model, "goal", "Goal");

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("User not found".to_string()))
    }

    /// System categories or the caller's own.
    pub(super) async fn require_category(
        &self,
        db: &DatabaseTransaction,
        category_id: &str,
        user_id: &str,
    ) -> ResultEngine<categories::Model> {
        let id = parse_uuid(category_id, "category")?;
        let model = categories::Entity::find_by_id(id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("Category not found".to_string()))?;
        if !model.is_system && model.user_id.as_deref() != Some(user_id) {
            return Err(EngineError::Forbidden(
                "Access denied to this category".to_string(),
            ));
        }
        Ok(model)
    }

    /// The caller's own, non-system category.
    pub(super) async fn require_category_writable(
        &self,
        db: &DatabaseTransaction,
        category_id: &str,
        user_id: &str,
        action: &str,
    ) -> ResultEngine<categories::Model> {
        let model = self.require_category(db, category_id, user_id).await?;
        if model.is_system {
            return Err(EngineError::Forbidden(format!(
                "System categories cannot be {action}"
            )));
        }
        Ok(model)
    }

    pub(super) async fn require_account_for_reference(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        user_id: &str,
    ) -> ResultEngine<accounts::Model> {
        let invalid = || EngineError::InvalidInput("Invalid account".to_string());
        let id = parse_uuid(account_id, "account").map_err(|_| invalid())?;
        accounts::Entity::find_by_id(id.to_string())
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(invalid)
    }

    pub(super) async fn require_category_for_reference(
        &self,
        db: &DatabaseTransaction,
        category_id: &str,
        user_id: &str,
    ) -> ResultEngine<categories::Model> {
        match self.require_category(db, category_id, user_id).await {
            Ok(model) => Ok(model),
            Err(EngineError::Database(err)) => Err(EngineError::Database(err)),
            Err(_) => Err(EngineError::InvalidInput("Invalid category".to_string())),
        }
    }
}
