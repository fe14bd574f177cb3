use crate::{
    entities::user::{self, Capability, Entity as UserEntity, Model as UserModel, Role},
    errors::ServiceError,
    events::{Event, EventSender},
    services::authorize,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Single failure message for every authentication outcome, so callers
/// cannot tell a wrong password from a disabled account.
const AUTH_FAILED: &str = "Invalid credentials or account disabled";

/// Digest used to compare stored credentials. Hashing policy proper lives
/// with the external auth layer; swapping in a KDF is a change to this one
/// function.
pub fn digest_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Input for creating a directory account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: String,

    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub role: Role,

    pub monthly_salary: Decimal,

    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Directory listing entry without credential material
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub monthly_salary: Decimal,
    pub is_enabled: bool,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            username: model.username,
            name: model.name,
            role: model.role,
            monthly_salary: model.monthly_salary,
            is_enabled: model.is_enabled,
        }
    }
}

/// Account directory service: account lifecycle, listing and authentication.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a directory account. Requires the manage-users capability.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username, username = %input.username))]
    pub async fn create_user(
        &self,
        actor: &UserModel,
        input: CreateUserInput,
    ) -> Result<UserModel, ServiceError> {
        authorize(actor, Capability::ManageUsers)?;
        input.validate()?;

        if input.monthly_salary < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Monthly salary cannot be negative".to_string(),
            ));
        }

        let existing = UserEntity::find()
            .filter(user::Column::Username.eq(input.username.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let user_id = Uuid::new_v4();
        let account = user::ActiveModel {
            id: Set(user_id),
            username: Set(input.username),
            name: Set(input.name),
            password_hash: Set(digest_password(&input.password)),
            role: Set(input.role),
            monthly_salary: Set(input.monthly_salary),
            is_enabled: Set(input.is_enabled),
            ..Default::default()
        };

        let created = account.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::UserCreated(user_id)).await;

        info!(user_id = %user_id, "User created");
        Ok(created)
    }

    /// Lists accounts visible to the actor: Developer accounts only appear
    /// to Developer actors.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn list_users(&self, actor: &UserModel) -> Result<Vec<UserResponse>, ServiceError> {
        authorize(actor, Capability::ManageUsers)?;

        let mut query = UserEntity::find().order_by_asc(user::Column::Username);
        if actor.role != Role::Developer {
            query = query.filter(user::Column::Role.ne(Role::Developer));
        }

        let users = query.all(&*self.db).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Fetches one account by id.
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// Flips the enabled flag on another account. Self-disable is rejected
    /// before any lookup.
    #[instrument(skip(self, actor), fields(actor = %actor.username, user_id = %user_id))]
    pub async fn toggle_status(
        &self,
        actor: &UserModel,
        user_id: Uuid,
    ) -> Result<UserModel, ServiceError> {
        authorize(actor, Capability::ManageUsers)?;

        if actor.id == user_id {
            return Err(ServiceError::ValidationError(
                "Cannot disable your own account".to_string(),
            ));
        }

        let target = self.get_user(user_id).await?;
        let now_enabled = !target.is_enabled;

        let mut active: user::ActiveModel = target.into();
        active.is_enabled = Set(now_enabled);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserStatusToggled {
                user_id,
                is_enabled: now_enabled,
            })
            .await;

        info!(user_id = %user_id, is_enabled = now_enabled, "User status toggled");
        Ok(updated)
    }

    /// Verifies credentials and the enabled flag. Every failure path
    /// reports the same error so account state never leaks.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let account = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;

        match account {
            Some(account)
                if account.password_hash == digest_password(password) && account.is_enabled =>
            {
                info!(user_id = %account.id, "Authentication succeeded");
                Ok(account)
            }
            _ => {
                warn!(username = %username, "Authentication failed");
                Err(ServiceError::AuthError(AUTH_FAILED.to_string()))
            }
        }
    }
}
