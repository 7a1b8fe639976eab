use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use shared::validation::{validate_login, validate_register};
use shared::{AuthResponse, AuthTokens, Household, LoginRequest, RefreshRequest, RegisterRequest, Role, User};
use tracing::{debug, info, warn};

use crate::backend::domain::credentials::{generate_token, hash_token, new_credentials, verify_password};
use crate::backend::domain::errors::validated;
use crate::backend::domain::{timestamp, DomainError};
use crate::backend::storage::{DbConnection, HouseholdRepository, Session, SessionRepository, UserRepository};

const INVALID_LOGIN: &str = "Invalid email or password";
const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Service for accounts and bearer sessions
#[derive(Clone)]
pub struct AuthService {
    households: HouseholdRepository,
    users: UserRepository,
    sessions: SessionRepository,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(db: DbConnection, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            households: HouseholdRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            sessions: SessionRepository::new(db),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Create a household with its first parent and sign them in
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        validated(validate_register(&request))?;
        let email = request.email.trim().to_lowercase();
        info!("Registering household '{}'", request.household_name.trim());

        if self.users.email_exists(&email).await? {
            return Err(DomainError::Conflict("An account with this email already exists".to_string()).into());
        }

        let now = timestamp(Utc::now());
        let household = Household {
            id: Household::generate_id(),
            name: request.household_name.trim().to_string(),
            created_at: now.clone(),
        };
        self.households.store_household(&household).await?;

        let user = User {
            id: User::generate_id(),
            household_id: household.id.clone(),
            name: request.name.trim().to_string(),
            email,
            role: Role::Parent,
            points_balance: 0,
            money_balance: 0.0,
            created_at: now.clone(),
            updated_at: now,
        };
        if let Err(e) = self.users.store_user(&user, &new_credentials(&request.password)).await {
            // Lost a race on the unique email
            self.households.delete_household(&household.id).await?;
            if self.users.email_exists(&user.email).await? {
                return Err(DomainError::Conflict("An account with this email already exists".to_string()).into());
            }
            return Err(e);
        }

        let tokens = self.issue_tokens(&user.id).await?;
        info!("Registered {} as first parent of {}", user.id, household.id);
        Ok(AuthResponse { user, tokens })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        validated(validate_login(&request))?;

        let Some((user, credentials)) = self.users.get_user_by_email(&request.email).await? else {
            warn!("Login attempt for unknown email");
            return Err(DomainError::Unauthorized(INVALID_LOGIN.to_string()).into());
        };
        if !verify_password(&request.password, &credentials) {
            warn!("Wrong password for {}", user.id);
            return Err(DomainError::Unauthorized(INVALID_LOGIN.to_string()).into());
        }

        let tokens = self.issue_tokens(&user.id).await?;
        info!("User {} logged in", user.id);
        Ok(AuthResponse { user, tokens })
    }

    /// Exchange a refresh token for a new token pair. The old session is
    /// consumed, so each refresh token works once.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<AuthResponse> {
        let token_hash = hash_token(request.refresh_token.trim());
        let Some(session) = self.sessions.find_by_refresh_hash(&token_hash).await? else {
            return Err(DomainError::Unauthorized(SESSION_EXPIRED.to_string()).into());
        };

        // Deleting first means a concurrent refresh with the same token loses
        if !self.sessions.delete_session(&session.id).await? {
            return Err(DomainError::Unauthorized(SESSION_EXPIRED.to_string()).into());
        }
        if has_expired(&session.refresh_expires_at, Utc::now()) {
            debug!("Refresh token of session {} expired", session.id);
            return Err(DomainError::Unauthorized(SESSION_EXPIRED.to_string()).into());
        }

        let Some(user) = self.users.get_user(&session.user_id).await? else {
            return Err(DomainError::Unauthorized(SESSION_EXPIRED.to_string()).into());
        };

        let tokens = self.issue_tokens(&user.id).await?;
        debug!("Rotated session for {}", user.id);
        Ok(AuthResponse { user, tokens })
    }

    /// End the session behind `access_token`; unknown tokens are ignored
    pub async fn logout(&self, access_token: &str) -> Result<()> {
        if let Some(session) = self.sessions.find_by_access_hash(&hash_token(access_token)).await? {
            self.sessions.delete_session(&session.id).await?;
            info!("User {} logged out", session.user_id);
        }
        Ok(())
    }

    /// Resolve a bearer access token to its user
    pub async fn authenticate(&self, access_token: &str) -> Result<User> {
        let Some(session) = self.sessions.find_by_access_hash(&hash_token(access_token)).await? else {
            return Err(DomainError::Unauthorized("Invalid access token".to_string()).into());
        };
        if has_expired(&session.access_expires_at, Utc::now()) {
            return Err(DomainError::Unauthorized("Access token expired".to_string()).into());
        }

        self.users
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Invalid access token".to_string()).into())
    }

    async fn issue_tokens(&self, user_id: &str) -> Result<AuthTokens> {
        let now = Utc::now();
        let access_token = generate_token();
        let refresh_token = generate_token();

        let session = Session {
            id: shared::generate_id("session"),
            user_id: user_id.to_string(),
            access_token_hash: hash_token(&access_token),
            access_expires_at: timestamp(now + self.access_ttl),
            refresh_token_hash: hash_token(&refresh_token),
            refresh_expires_at: timestamp(now + self.refresh_ttl),
            created_at: timestamp(now),
        };
        self.sessions.store_session(&session).await?;

        let purged = self.sessions.delete_expired(&timestamp(now)).await?;
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_expires_at: session.access_expires_at,
            refresh_expires_at: session.refresh_expires_at,
        })
    }
}

/// Unparseable expiry times count as expired
fn has_expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(expires_at).map_or(true, |at| at.with_timezone(&Utc) <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::test_support::domain_error;

    fn service(db: DbConnection) -> AuthService {
        AuthService::new(db, Duration::minutes(15), Duration::days(30))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            household_name: "The Smiths".to_string(),
            name: "Robin".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_parent_and_session() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = service(db);

        let response = auth.register(register_request(" Robin@Example.com ")).await.unwrap();
        assert_eq!(response.user.role, Role::Parent);
        assert_eq!(response.user.email, "robin@example.com");
        assert_ne!(response.tokens.access_token, response.tokens.refresh_token);

        let me = auth.authenticate(&response.tokens.access_token).await.unwrap();
        assert_eq!(me.id, response.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email_and_bad_input() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = service(db);
        auth.register(register_request("robin@example.com")).await.unwrap();

        let err = domain_error(auth.register(register_request("ROBIN@example.com")).await);
        assert!(matches!(err, DomainError::Conflict(_)));

        let mut bad = register_request("not-an-email");
        bad.password = "short".to_string();
        let err = domain_error(auth.register(bad).await);
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = service(db);
        auth.register(register_request("robin@example.com")).await.unwrap();

        let ok = auth
            .login(LoginRequest { email: "robin@example.com".to_string(), password: "correct horse".to_string() })
            .await
            .unwrap();
        assert_eq!(ok.user.name, "Robin");

        let err = domain_error(
            auth.login(LoginRequest { email: "robin@example.com".to_string(), password: "wrong horse".to_string() })
                .await,
        );
        assert_eq!(err, DomainError::Unauthorized(INVALID_LOGIN.to_string()));

        let err = domain_error(
            auth.login(LoginRequest { email: "nobody@example.com".to_string(), password: "correct horse".to_string() })
                .await,
        );
        assert_eq!(err, DomainError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens_once() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = service(db);
        let first = auth.register(register_request("robin@example.com")).await.unwrap();

        let second = auth
            .refresh(RefreshRequest { refresh_token: first.tokens.refresh_token.clone() })
            .await
            .unwrap();
        assert_ne!(second.tokens.access_token, first.tokens.access_token);

        // The old pair is gone
        assert!(auth.authenticate(&first.tokens.access_token).await.is_err());
        let err = domain_error(auth.refresh(RefreshRequest { refresh_token: first.tokens.refresh_token }).await);
        assert!(matches!(err, DomainError::Unauthorized(_)));

        assert!(auth.authenticate(&second.tokens.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_access_token_is_rejected() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = AuthService::new(db, Duration::zero(), Duration::days(1));
        let response = auth.register(register_request("robin@example.com")).await.unwrap();

        let err = domain_error(auth.authenticate(&response.tokens.access_token).await);
        assert_eq!(err, DomainError::Unauthorized("Access token expired".to_string()));

        // The refresh token still works
        let refreshed = auth
            .refresh(RefreshRequest { refresh_token: response.tokens.refresh_token })
            .await
            .unwrap();
        assert_eq!(refreshed.user.id, response.user.id);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let auth = service(db);
        let response = auth.register(register_request("robin@example.com")).await.unwrap();

        auth.logout(&response.tokens.access_token).await.unwrap();
        auth.logout(&response.tokens.access_token).await.unwrap();
        assert!(auth.authenticate(&response.tokens.access_token).await.is_err());
    }

    #[test]
    fn test_has_expired() {
        let now = Utc::now();
        assert!(has_expired(&timestamp(now - Duration::seconds(1)), now));
        assert!(has_expired(&timestamp(now), now));
        assert!(!has_expired(&timestamp(now + Duration::minutes(1)), now));
        assert!(has_expired("garbage", now));
    }
}
