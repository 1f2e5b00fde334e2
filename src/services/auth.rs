//! Authentication service for user management and JWT handling
//!
//! Provides:
//! - User registration and login
//! - Password hashing with bcrypt
//! - JWT access/refresh token generation and validation
//! - Refresh token rotation and revocation

use anyhow::anyhow;
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use super::validation;
use crate::config::Config;
use crate::db::{CreateUser, Database, UserRecord};
use crate::error::{AppError, AppResult};

pub use crate::db::{ROLE_ADMIN, ROLE_MEMBER};

const ACCESS_TOKEN_TYPE: &str = "access";
const REFRESH_TOKEN_TYPE: &str = "refresh";

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims structure for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,
    pub username: String,
    /// User role (admin, member)
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims structure for refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// User ID (subject)
    pub sub: String,
    pub token_type: String,
    /// Unique token ID, keeps every issued token distinct
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

// ============================================================================
// Auth Types
// ============================================================================

/// Token pair returned after successful authentication
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Always "Bearer"
    pub token_type: String,
}

/// Caller identity decoded from a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Account data safe to show the account owner
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

// ============================================================================
// Configuration
// ============================================================================

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_lifetime: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            access_token_lifetime: config.access_token_lifetime,
            refresh_token_lifetime: config.refresh_token_lifetime,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

// ============================================================================
// Auth Service
// ============================================================================

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    // ========================================================================
    // Registration & Login
    // ========================================================================

    /// Register a new user. The first account becomes the admin.
    pub async fn register(&self, input: RegisterInput) -> AppResult<LoginResult> {
        let username = validation::username(&input.username)?;
        let email = validation::email(&input.email)?;
        validation::password(&input.password)?;

        let users = self.db.users();
        if users.get_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if users.get_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&input.password).await?;
        let user = users
            .create(CreateUser {
                username,
                email: Some(email),
                password_hash,
            })
            .await
            .map_err(|e| {
                let unique_violation = matches!(
                    e.downcast_ref::<sqlx::Error>(),
                    Some(sqlx::Error::Database(db)) if db.is_unique_violation()
                );
                if unique_violation {
                    AppError::Conflict("Username or email already registered".to_string())
                } else {
                    AppError::Internal(e)
                }
            })?;

        if user.role == ROLE_ADMIN {
            info!(username = %user.username, "Created first admin user");
        }

        let tokens = self.issue_tokens(&user).await?;
        users.update_last_login(user.id).await?;
        info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(LoginResult {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Login with username or email
    pub async fn login(&self, username_or_email: &str, password: &str) -> AppResult<LoginResult> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let users = self.db.users();
        let identifier = username_or_email.trim();
        let user = match users.get_by_username(identifier).await? {
            Some(user) => Some(user),
            None => users.get_by_email(identifier).await?,
        };
        let Some(user) = user else {
            return Err(invalid());
        };

        if !user.is_active || user.anonymized_at.is_some() {
            warn!(user_id = %user.id, "Login attempt for disabled account");
            return Err(invalid());
        }
        if !self.verify_password(password, &user.password_hash).await? {
            return Err(invalid());
        }

        let tokens = self.issue_tokens(&user).await?;
        users.update_last_login(user.id).await?;

        Ok(LoginResult {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Exchange a refresh token for a new pair. The old token is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let invalid = || AppError::Unauthorized("Invalid refresh token".to_string());

        let claims = self.decode_refresh_token(refresh_token)?;
        let users = self.db.users();

        let stored = users
            .get_refresh_token_by_hash(&hash_token(refresh_token))
            .await?
            .ok_or_else(invalid)?;
        if stored.user_id.to_string() != claims.sub {
            return Err(invalid());
        }

        let user = users.get_by_id(stored.user_id).await?.ok_or_else(invalid)?;
        if !user.is_active || user.anonymized_at.is_some() {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        if !users.delete_refresh_token(stored.id).await? {
            warn!(user_id = %user.id, "Refresh token already consumed");
            return Err(invalid());
        }
        self.issue_tokens(&user).await
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let users = self.db.users();
        if let Some(stored) = users
            .get_refresh_token_by_hash(&hash_token(refresh_token))
            .await?
        {
            users.delete_refresh_token(stored.id).await?;
        }
        Ok(())
    }

    /// Validate an access token and return the caller
    pub fn validate_access_token(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let claims = self.decode_access_token(token)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))?;

        Ok(AuthenticatedUser {
            id,
            username: claims.username,
            role: claims.role,
        })
    }

    /// Current profile of an active user
    pub async fn me(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let user = self.active_user(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    /// Load a user that may still act on their account
    pub async fn active_user(&self, user_id: Uuid) -> AppResult<UserRecord> {
        match self.db.users().get_by_id(user_id).await? {
            Some(user) if user.is_active && user.anonymized_at.is_none() => Ok(user),
            _ => Err(AppError::Unauthorized("Account is disabled".to_string())),
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.config.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| anyhow!("Password hashing task failed: {}", e))?
            .map_err(|e| AppError::Internal(anyhow!("Failed to hash password: {}", e)))
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> AppResult<bool> {
        // Anonymized accounts carry an empty hash
        if password_hash.is_empty() {
            return Ok(false);
        }
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || verify(password, &password_hash))
            .await
            .map_err(|e| anyhow!("Password verification task failed: {}", e))?
            .map_err(|e| AppError::Internal(anyhow!("Failed to verify password: {}", e)))
    }

    /// Sign a new token pair and store the refresh token hash
    async fn issue_tokens(&self, user: &UserRecord) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.config.access_token_lifetime);
        let refresh_exp = now + Duration::seconds(self.config.refresh_token_lifetime);
        let key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());

        let access_claims = AccessTokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.clone(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &access_claims, &key)
            .map_err(|e| anyhow!("Failed to create access token: {}", e))?;

        let refresh_claims = RefreshTokenClaims {
            sub: user.id.to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: refresh_exp.timestamp(),
            iat: now.timestamp(),
        };
        let refresh_token = encode(&Header::new(Algorithm::HS256), &refresh_claims, &key)
            .map_err(|e| anyhow!("Failed to create refresh token: {}", e))?;

        let users = self.db.users();
        users.purge_expired_refresh_tokens(user.id).await?;
        users
            .create_refresh_token(user.id, &hash_token(&refresh_token), refresh_exp)
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_lifetime,
            token_type: "Bearer".to_string(),
        })
    }

    fn decode_access_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let claims: AccessTokenClaims = self
            .decode_claims(token)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }
        Ok(claims)
    }

    fn decode_refresh_token(&self, token: &str) -> AppResult<RefreshTokenClaims> {
        let claims: RefreshTokenClaims = self
            .decode_claims(token)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;
        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }
        Ok(claims)
    }

    fn decode_claims<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
    ) -> jsonwebtoken::errors::Result<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<T>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }
}

/// Hash a token for storage (SHA-256, hex)
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_lifetime: 900,
            refresh_token_lifetime: 3600,
            bcrypt_cost: 4,
        }
    }

    async fn service() -> (Database, AuthService) {
        let db = Database::connect_in_memory().await.unwrap();
        (db.clone(), AuthService::new(db, test_config()))
    }

    fn register_input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let (_, auth) = service().await;
        let first = auth.register(register_input("walter", "w@example.com")).await.unwrap();
        let second = auth.register(register_input("jesse", "j@example.com")).await.unwrap();

        assert_eq!(first.user.role, ROLE_ADMIN);
        assert_eq!(second.user.role, ROLE_MEMBER);

        let caller = auth.validate_access_token(&first.tokens.access_token).unwrap();
        assert_eq!(caller.id, first.user.id);
        assert!(caller.is_admin());
    }

    #[tokio::test]
    async fn test_admin_role_is_not_regranted() {
        let (db, auth) = service().await;
        let admin = auth.register(register_input("walter", "w@example.com")).await.unwrap();
        auth.register(register_input("jesse", "j@example.com")).await.unwrap();
        db.users().anonymize(admin.user.id).await.unwrap();

        let stranger = auth.register(register_input("stranger", "s@example.com")).await.unwrap();
        assert_eq!(stranger.user.role, ROLE_MEMBER);
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_yield_one_admin() {
        let (_, auth) = service().await;
        let (a, b) = tokio::join!(
            auth.register(register_input("walter", "w@example.com")),
            auth.register(register_input("jesse", "j@example.com")),
        );
        let roles = [a.unwrap().user.role, b.unwrap().user.role];
        assert_eq!(roles.iter().filter(|r| *r == ROLE_ADMIN).count(), 1);
    }

    #[tokio::test]
    async fn test_deleted_prefix_is_reserved() {
        let (_, auth) = service().await;
        assert_matches!(
            auth.register(register_input("deleted-1234abcd", "d@example.com")).await,
            Err(AppError::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let (_, auth) = service().await;
        auth.register(register_input("walter", "w@example.com")).await.unwrap();

        assert_matches!(
            auth.register(register_input("WALTER", "other@example.com")).await,
            Err(AppError::Conflict(_))
        );
        assert_matches!(
            auth.register(register_input("heisenberg", "W@example.com")).await,
            Err(AppError::Conflict(_))
        );
        assert_matches!(
            auth.register(RegisterInput {
                password: "short".to_string(),
                ..register_input("skinny", "pete@example.com")
            })
            .await,
            Err(AppError::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (_, auth) = service().await;
        auth.register(register_input("walter", "w@example.com")).await.unwrap();

        assert!(auth.login("walter", "correct horse").await.is_ok());
        assert!(auth.login("W@EXAMPLE.COM", "correct horse").await.is_ok());
        assert_matches!(
            auth.login("walter", "wrong password").await,
            Err(AppError::Unauthorized(_))
        );
        assert_matches!(
            auth.login("nobody", "correct horse").await,
            Err(AppError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let (_, auth) = service().await;
        let login = auth.register(register_input("walter", "w@example.com")).await.unwrap();
        let old = login.tokens.refresh_token;

        let rotated = auth.refresh(&old).await.unwrap();
        assert_ne!(rotated.refresh_token, old);
        assert_matches!(auth.refresh(&old).await, Err(AppError::Unauthorized(_)));

        auth.logout(&rotated.refresh_token).await.unwrap();
        assert_matches!(
            auth.refresh(&rotated.refresh_token).await,
            Err(AppError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_succeeds_once() {
        let (_, auth) = service().await;
        let login = auth.register(register_input("walter", "w@example.com")).await.unwrap();
        let token = login.tokens.refresh_token;

        let (a, b) = tokio::join!(auth.refresh(&token), auth.refresh(&token));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_matches!(
            if a.is_ok() { b } else { a },
            Err(AppError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn test_token_types_are_not_interchangeable() {
        let (_, auth) = service().await;
        let login = auth.register(register_input("walter", "w@example.com")).await.unwrap();

        assert_matches!(
            auth.validate_access_token(&login.tokens.refresh_token),
            Err(AppError::Unauthorized(_))
        );
        assert_matches!(
            auth.refresh(&login.tokens.access_token).await,
            Err(AppError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn test_anonymized_user_cannot_log_in() {
        let (db, auth) = service().await;
        let login = auth.register(register_input("walter", "w@example.com")).await.unwrap();
        db.users().anonymize(login.user.id).await.unwrap();

        assert_matches!(
            auth.login("w@example.com", "correct horse").await,
            Err(AppError::Unauthorized(_))
        );
        assert_matches!(auth.me(login.user.id).await, Err(AppError::Unauthorized(_)));
    }
}
