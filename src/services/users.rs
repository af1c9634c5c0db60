use crate::{
    db::DbPool,
    entities::{
        app_user::{self, Entity as AppUser, UserRole},
        batch_adjustment::{self, Entity as BatchAdjustment},
        purchase::{self, Entity as Purchase},
    },
    errors::ServiceError,
};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fields for a new registering user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub role: UserRole,
}

/// Partial user update; only supplied fields change.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

/// Directory of the users purchases and adjustments attribute their work
/// to. No credentials; authentication lives outside this service.
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_user(&self, input: NewUser) -> Result<app_user::Model, ServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "User name must not be empty".to_string(),
            ));
        }

        let duplicate = AppUser::find()
            .filter(app_user::Column::Name.eq(name))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::Validation(format!(
                "A user named '{}' already exists",
                name
            )));
        }

        app_user::ActiveModel {
            name: Set(name.to_string()),
            role: Set(input.role.to_string()),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<app_user::Model, ServiceError> {
        AppUser::find_by_id(user_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn list_users(&self) -> Result<Vec<app_user::Model>, ServiceError> {
        AppUser::find()
            .order_by_asc(app_user::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        user_id: i64,
        update: UserUpdate,
    ) -> Result<app_user::Model, ServiceError> {
        let existing = self.get_user(user_id).await?;

        let mut active: app_user::ActiveModel = existing.into();
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::Validation(
                    "User name must not be empty".to_string(),
                ));
            }

            let duplicate = AppUser::find()
                .filter(app_user::Column::Name.eq(name.clone()))
                .filter(app_user::Column::Id.ne(user_id))
                .one(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
            if duplicate.is_some() {
                return Err(ServiceError::Validation(format!(
                    "A user named '{}' already exists",
                    name
                )));
            }

            active.name = Set(name);
        }
        if let Some(role) = update.role {
            active.role = Set(role.to_string());
        }

        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deletes a user. Purchases and adjustments they registered survive;
    /// their user references null out.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_user(user_id).await?;

        // References null out before the delete, independent of the
        // backend's foreign-key action handling.
        Purchase::update_many()
            .col_expr(purchase::Column::RegisteredBy, Expr::value(Option::<i64>::None))
            .filter(purchase::Column::RegisteredBy.eq(user_id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        BatchAdjustment::update_many()
            .col_expr(
                batch_adjustment::Column::UserId,
                Expr::value(Option::<i64>::None),
            )
            .filter(batch_adjustment::Column::UserId.eq(user_id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        AppUser::delete_by_id(user_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(user_id, "User deleted");
        Ok(())
    }
}
