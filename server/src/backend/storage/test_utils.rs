//! Fixtures shared by storage and domain tests.

use chrono::Utc;
use shared::{Household, Role, User};

use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::repositories::{Credentials, HouseholdRepository, UserRepository};

pub async fn seed_household(db: &DbConnection) -> Household {
    let household = Household {
        id: Household::generate_id(),
        name: "Test Household".to_string(),
        created_at: Utc::now().to_rfc3339(),
    };
    HouseholdRepository::new(db.clone())
        .store_household(&household)
        .await
        .expect("Failed to seed household");
    household
}

pub async fn seed_user(db: &DbConnection, household_id: &str, name: &str, role: Role) -> User {
    let now = Utc::now().to_rfc3339();
    let id = User::generate_id();
    let user = User {
        email: format!("{}.{}@example.com", name.to_lowercase(), &id[id.len() - 6..]),
        id,
        household_id: household_id.to_string(),
        name: name.to_string(),
        role,
        points_balance: 0,
        money_balance: 0.0,
        created_at: now.clone(),
        updated_at: now,
    };
    let credentials = Credentials {
        password_hash: "not-a-real-hash".to_string(),
        password_salt: "salt".to_string(),
    };
    UserRepository::new(db.clone())
        .store_user(&user, &credentials)
        .await
        .expect("Failed to seed user");
    user
}
