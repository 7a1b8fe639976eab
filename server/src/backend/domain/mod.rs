//! # Domain Module
//!
//! Contains all business logic of the home economy server.
//!
//! Services sit between the REST layer and the repositories. Each one takes
//! the authenticated caller as its first argument and enforces the household
//! rules before touching storage.
//!
//! ## Module Organization
//!
//! - **auth_service**: Registration, login, token refresh and bearer authentication
//! - **user_service**: Household members and their roles
//! - **chore_service**: The chore lifecycle (open, completed, approved)
//! - **reward_service**: Reward catalogue and redemptions
//! - **event_service**: Household calendar
//! - **transaction_service**: The points/money ledger
//! - **learning_service**: Learning tasks and the Sudoku mini-game
//!
//! ## Business Rules
//!
//! - Only parents create, edit or delete chores, rewards, events and learning tasks
//! - Records of another household behave exactly like missing records
//! - Balances only ever move through ledger entries and never drop below zero

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use shared::User;

pub mod auth_service;
pub mod chore_service;
pub mod credentials;
pub mod errors;
pub mod event_service;
pub mod learning_service;
pub mod reward_service;
pub mod transaction_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use chore_service::ChoreService;
pub use errors::DomainError;
pub use event_service::EventService;
pub use learning_service::LearningService;
pub use reward_service::RewardService;
pub use transaction_service::TransactionService;
pub use user_service::UserService;

use crate::backend::storage::UserRepository;

/// Fixed-width RFC 3339 so stored timestamps sort as strings
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

pub fn ensure_parent(actor: &User, action: &str) -> Result<(), DomainError> {
    if actor.is_parent() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!("Only parents can {}", action)))
    }
}

/// Load a member of `household_id`; anyone else is reported as missing
pub async fn find_member(users: &UserRepository, household_id: &str, user_id: &str) -> Result<User> {
    match users.get_user(user_id).await? {
        Some(user) if user.household_id == household_id => Ok(user),
        _ => Err(DomainError::not_found("User").into()),
    }
}

/// Check that an assignee belongs to the household
pub async fn ensure_assignee(users: &UserRepository, household_id: &str, assignee_id: Option<&str>) -> Result<()> {
    if let Some(assignee_id) = assignee_id {
        let is_member = matches!(
            users.get_user(assignee_id).await?,
            Some(user) if user.household_id == household_id
        );
        if !is_member {
            return Err(DomainError::Validation("assignee_id must be a member of your household".to_string()).into());
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 5, 0).unwrap();
        assert_eq!(timestamp(at), "2025-06-01T09:05:00.000Z");
    }

    #[tokio::test]
    async fn test_find_member_hides_other_households() {
        let family = test_support::family().await;
        let users = UserRepository::new(family.db.clone());

        let kid = find_member(&users, &family.parent.household_id, &family.kid.id).await.unwrap();
        assert_eq!(kid.id, family.kid.id);

        let err = test_support::domain_error(
            find_member(&users, &family.parent.household_id, &family.stranger.id).await,
        );
        assert_eq!(err, DomainError::not_found("User"));
    }

    #[test]
    fn test_ensure_parent() {
        let now = now_timestamp();
        let mut user = User {
            id: "user::a".to_string(),
            household_id: "household::h".to_string(),
            name: "A".to_string(),
            email: "a@example.com".to_string(),
            role: shared::Role::Parent,
            points_balance: 0,
            money_balance: 0.0,
            created_at: now.clone(),
            updated_at: now,
        };
        assert!(ensure_parent(&user, "approve chores").is_ok());
        user.role = shared::Role::Child;
        assert_eq!(
            ensure_parent(&user, "approve chores"),
            Err(DomainError::Forbidden("Only parents can approve chores".to_string()))
        );
    }
}
