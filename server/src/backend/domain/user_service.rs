use anyhow::Result;
use shared::validation::{validate_create_user, validate_update_user};
use shared::{CreateUserRequest, Role, UpdateUserRequest, User, UserListResponse};
use tracing::info;

use crate::backend::domain::credentials::new_credentials;
use crate::backend::domain::errors::validated;
use crate::backend::domain::{ensure_parent, find_member, now_timestamp, DomainError};
use crate::backend::storage::{DbConnection, SessionRepository, UserRepository};

/// Service for household members
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    sessions: SessionRepository,
}

impl UserService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            sessions: SessionRepository::new(db),
        }
    }

    /// Members of the caller's household, by name
    pub async fn list_members(&self, actor: &User) -> Result<UserListResponse> {
        let users = self.users.list_household_users(&actor.household_id).await?;
        info!("Found {} members in {}", users.len(), actor.household_id);
        Ok(UserListResponse { users })
    }

    pub async fn get_member(&self, actor: &User, user_id: &str) -> Result<User> {
        find_member(&self.users, &actor.household_id, user_id).await
    }

    pub async fn create_member(&self, actor: &User, request: CreateUserRequest) -> Result<User> {
        ensure_parent(actor, "add family members")?;
        validated(validate_create_user(&request))?;

        let email = request.email.trim().to_lowercase();
        if self.users.email_exists(&email).await? {
            return Err(DomainError::Conflict("An account with this email already exists".to_string()).into());
        }

        let now = now_timestamp();
        let user = User {
            id: User::generate_id(),
            household_id: actor.household_id.clone(),
            name: request.name.trim().to_string(),
            email,
            role: request.role,
            points_balance: 0,
            money_balance: 0.0,
            created_at: now.clone(),
            updated_at: now,
        };
        self.users.store_user(&user, &new_credentials(&request.password)).await?;

        info!("Created {} member {} in {}", user.role.as_str(), user.id, user.household_id);
        Ok(user)
    }

    /// Members may rename themselves and change their own password;
    /// everything else needs a parent.
    pub async fn update_member(&self, actor: &User, user_id: &str, request: UpdateUserRequest) -> Result<User> {
        let mut user = find_member(&self.users, &actor.household_id, user_id).await?;
        let is_self = actor.id == user.id;

        if !is_self {
            ensure_parent(actor, "edit other family members")?;
        }
        if request.role.is_some_and(|role| role != user.role) {
            ensure_parent(actor, "change roles")?;
        }
        validated(validate_update_user(&request))?;

        if let Some(role) = request.role {
            if user.role == Role::Parent
                && role != Role::Parent
                && self.users.count_parents(&user.household_id).await? <= 1
            {
                return Err(DomainError::Conflict("A household needs at least one parent".to_string()).into());
            }
            user.role = role;
        }
        if let Some(name) = &request.name {
            user.name = name.trim().to_string();
        }
        user.updated_at = now_timestamp();
        self.users.update_profile(&user).await?;

        if let Some(password) = &request.password {
            self.users
                .update_credentials(&user.id, &new_credentials(password), &user.updated_at)
                .await?;
            if !is_self {
                // A reset by a parent signs the member out everywhere
                let revoked = self.sessions.delete_user_sessions(&user.id).await?;
                info!("Revoked {} sessions of {}", revoked, user.id);
            }
        }

        info!("Updated member {}", user.id);
        Ok(user)
    }

    pub async fn delete_member(&self, actor: &User, user_id: &str) -> Result<()> {
        ensure_parent(actor, "remove family members")?;
        if actor.id == user_id {
            return Err(DomainError::Conflict("You cannot remove your own account".to_string()).into());
        }

        let user = find_member(&self.users, &actor.household_id, user_id).await?;
        self.users.delete_user(&user.id).await?;

        info!("Removed member {} from {}", user.id, user.household_id);
        Ok(())
    }
}
