//! Password hashing and bearer token helpers.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::backend::storage::Credentials;

pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hex SHA-256 of `salt || password`
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn new_credentials(password: &str) -> Credentials {
    let password_salt = generate_salt();
    Credentials {
        password_hash: hash_password(&password_salt, password),
        password_salt,
    }
}

pub fn verify_password(password: &str, credentials: &Credentials) -> bool {
    let candidate = hash_password(&credentials.password_salt, password);
    constant_time_eq(candidate.as_bytes(), credentials.password_hash.as_bytes())
}

/// Opaque bearer token with 244 random bits
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Tokens are only ever stored in this form
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
