//! # Authentication
//!
//! Registration and login. Both return the same `{ token, user }` shape so
//! clients can treat them uniformly.

use crate::error::{ShopError, ShopResult};
use crate::store::UserStore;
use crate::token::TokenIssuer;
use crate::user::{normalize_email, NewUser, PublicUser, Role};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 31;
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Registration input. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Successful register/login result
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

/// Registration and login on top of the credential store
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenIssuer>,
        bcrypt_cost: u32,
    ) -> ShopResult<Self> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ShopError::Configuration(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST, bcrypt_cost
            )));
        }
        Ok(Self {
            users,
            tokens,
            bcrypt_cost,
        })
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create an account and issue its first token
    #[instrument(skip_all, fields(username = %input.username))]
    pub async fn register(&self, input: Registration) -> ShopResult<AuthSession> {
        let username = input.username.trim().to_string();
        let email = normalize_email(&input.email);

        if username.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(ShopError::validation(
                "Username, email, and password are required",
            ));
        }
        if !email.contains('@') {
            return Err(ShopError::validation("Invalid email address"));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ShopError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let role = match input.role.as_deref() {
            Some(r) if !r.trim().is_empty() => Role::parse(r)?,
            _ => Role::default(),
        };

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(ShopError::DuplicateEmail);
        }
        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(ShopError::DuplicateUsername);
        }

        let password_hash = hash_password(input.password, self.bcrypt_cost).await?;

        let user = self
            .users
            .insert_user(NewUser {
                username,
                email,
                password_hash,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        self.session(PublicUser::from(&user))
    }

    /// Exchange email and password for a token
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> ShopResult<AuthSession> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(ShopError::validation("Email and password are required"));
        }

        let Some(user) = self.users.find_user_by_email(&email).await? else {
            warn!("Login rejected");
            return Err(ShopError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "Login rejected");
            return Err(ShopError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.session(PublicUser::from(&user))
    }

    fn session(&self, user: PublicUser) -> ShopResult<AuthSession> {
        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { token, user })
    }
}

async fn hash_password(password: String, cost: u32) -> ShopResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ShopError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| ShopError::Internal(format!("Password hashing failed: {}", e)))
}

async fn verify_password(password: String, hash: String) -> ShopResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ShopError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(|e| ShopError::Internal(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service() -> (Arc<MemoryStore>, AuthService) {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(b"auth-test-secret", 7).unwrap());
        let service = AuthService::new(store.clone(), tokens, MIN_BCRYPT_COST).unwrap();
        (store, service)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_issues_matching_token() {
        let (store, service) = service();
        let session = service
            .register(Registration {
                role: Some("seller".into()),
                ..registration("erin", "Erin@Example.com")
            })
            .await
            .unwrap();

        let stored = store
            .find_user_by_email("erin@example.com")
            .await
            .unwrap()
            .unwrap();
        let claims = service.tokens().verify(&session.token).unwrap();

        assert_eq!(claims.user_id(), stored.id);
        assert_eq!(claims.email, stored.email);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(session.user.id, stored.id);
        assert_eq!(session.user.email, "erin@example.com");
        assert_ne!(stored.password_hash, "hunter22");
        assert!(!serde_json::to_string(&session)
            .unwrap()
            .contains(&stored.password_hash));
    }

    #[tokio::test]
    async fn test_register_defaults_to_buyer() {
        let (_, service) = service();
        let session = service
            .register(registration("frank", "frank@example.com"))
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Buyer);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_, service) = service();

        let missing = service
            .register(registration("", "x@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(missing, ShopError::Validation(_)));

        let short = service
            .register(Registration {
                password: "12345".into(),
                ..registration("gina", "gina@example.com")
            })
            .await
            .unwrap_err();
        assert!(matches!(short, ShopError::Validation(_)));

        let bad_role = service
            .register(Registration {
                role: Some("admin".into()),
                ..registration("gina", "gina@example.com")
            })
            .await
            .unwrap_err();
        assert!(matches!(bad_role, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicates_are_distinguished() {
        let (_, service) = service();
        service
            .register(registration("hank", "hank@example.com"))
            .await
            .unwrap();

        let email = service
            .register(registration("hank2", "HANK@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(email, ShopError::DuplicateEmail));

        let username = service
            .register(registration("hank", "hank2@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(username, ShopError::DuplicateUsername));
    }

    #[tokio::test]
    async fn test_login() {
        let (_, service) = service();
        let registered = service
            .register(registration("ivy", "ivy@example.com"))
            .await
            .unwrap();

        let session = service.login("IVY@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user, registered.user);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (_, service) = service();
        service
            .register(registration("jack", "jack@example.com"))
            .await
            .unwrap();

        let wrong_password = service
            .login("jack@example.com", "wrong-pass")
            .await
            .unwrap_err();
        let unknown_email = service
            .login("nobody@example.com", "hunter22")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ShopError::InvalidCredentials));
        assert!(matches!(unknown_email, ShopError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
    }

    #[test]
    fn test_cost_bounds() {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(b"s", 1).unwrap());
        assert!(AuthService::new(store.clone(), tokens.clone(), 4).is_err());
        assert!(AuthService::new(store, tokens, 10).is_ok());
    }
}
