//! User service
//!
//! Accounts and sessions:
//! - Registration, where the first account ever created becomes an admin
//! - Login / logout with server-side sessions
//! - Profile and password changes
//! - Admin user management (role changes, deletion)

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials; the message never says which part was wrong
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// The acting admin tried to demote or delete themself
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_DAYS)
    }

    /// Create a user service whose sessions last `ttl_days`
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl: Duration::days(ttl_days),
        }
    }

    /// Register a new account and open a session for it.
    ///
    /// The first account becomes `Admin`, every later one `Member`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a blank name, malformed email or short password
    /// - `UserExists` if the email is already registered
    pub async fn register(&self, input: RegisterInput) -> Result<(User, Session), UserServiceError> {
        validate_register_input(&input)?;
        let email = normalize_email(&input.email);

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Member
        };

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.name.trim().to_string(), email, password_hash, role);

        // A concurrent registration can win between the check above and this insert
        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(format!(
                    "Email '{}' is already registered",
                    user.email
                )));
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = created.id, role = %created.role, "User registered");

        let session = self.create_session(created.id).await?;
        Ok((created, session))
    }

    /// Verify credentials and open a session.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&normalize_email(&input.email))
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Delete the session. Unknown tokens are not an error.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted on sight and treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    /// Update the display name of a user
    pub async fn update_profile(&self, user_id: i64, name: &str) -> Result<User, UserServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserServiceError::ValidationError("Name cannot be empty".to_string()));
        }

        let mut user = self.user_repo.get_by_id(user_id).await?.ok_or(UserServiceError::NotFound)?;
        user.name = name.to_string();

        Ok(self.user_repo.update(&user).await?)
    }

    /// Replace the password after checking the current one
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let mut user = self.user_repo.get_by_id(user_id).await?.ok_or(UserServiceError::NotFound)?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        if !is_acceptable_password(new_password) {
            return Err(password_too_short());
        }

        user.password_hash = hash_password(new_password)?;
        self.user_repo.update(&user).await?;
        Ok(())
    }

    /// List users for the admin back-office
    pub async fn list_users(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64), UserServiceError> {
        Ok(self.user_repo.list(page, per_page).await?)
    }

    /// Change the role of `target_id`. An admin cannot change their own role.
    pub async fn set_role(
        &self,
        actor_id: i64,
        target_id: i64,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        if actor_id == target_id {
            return Err(UserServiceError::Forbidden(
                "You cannot change your own role".to_string(),
            ));
        }

        let mut user = self.user_repo.get_by_id(target_id).await?.ok_or(UserServiceError::NotFound)?;
        user.role = role;
        Ok(self.user_repo.update(&user).await?)
    }

    /// Delete `target_id` along with its sessions. An admin cannot delete themself.
    pub async fn delete_user(&self, actor_id: i64, target_id: i64) -> Result<(), UserServiceError> {
        if actor_id == target_id {
            return Err(UserServiceError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }
        if self.user_repo.get_by_id(target_id).await?.is_none() {
            return Err(UserServiceError::NotFound);
        }

        self.session_repo.delete_by_user(target_id).await?;
        self.user_repo.delete(target_id).await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await?)
    }

    pub async fn count_admins(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count_by_role(UserRole::Admin).await?)
    }

    /// `true` if no users exist yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_ttl);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

/// Whether a repository error came from a UNIQUE constraint
fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}

fn password_too_short() -> UserServiceError {
    UserServiceError::ValidationError(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LENGTH
    ))
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    if input.name.trim().is_empty() {
        return Err(UserServiceError::ValidationError("Name cannot be empty".to_string()));
    }
    if !is_valid_email(&input.email) {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    if !is_acceptable_password(&input.password) {
        return Err(password_too_short());
    }
    Ok(())
}

/// Input for user registration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        (pool, UserService::new(user_repo, session_repo))
    }

    #[tokio::test]
    async fn test_first_user_is_admin_later_users_are_members() {
        let (_pool, service) = setup_test_service().await;

        let (first, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();
        let (second, _) = service
            .register(RegisterInput::new("Blair", "blair@example.com", "password123"))
            .await
            .unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_any_case() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let result = service
            .register(RegisterInput::new("Alex 2", "ALEX@example.com", "password123"))
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    /// Delegates to sqlx but never sees existing emails, like a request
    /// that lost the race against a concurrent registration
    struct StaleEmailLookup(Arc<dyn UserRepository>);

    #[async_trait::async_trait]
    impl UserRepository for StaleEmailLookup {
        async fn create(&self, user: &User) -> anyhow::Result<User> {
            self.0.create(user).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }
        async fn get_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn update(&self, user: &User) -> anyhow::Result<User> {
            self.0.update(user).await
        }
        async fn delete(&self, id: i64) -> anyhow::Result<()> {
            self.0.delete(id).await
        }
        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
        async fn count_by_role(&self, role: UserRole) -> anyhow::Result<i64> {
            self.0.count_by_role(role).await
        }
        async fn list(&self, page: i64, per_page: i64) -> anyhow::Result<(Vec<User>, i64)> {
            self.0.list(page, per_page).await
        }
    }

    #[tokio::test]
    async fn test_register_race_on_email_is_a_conflict() {
        let (pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let racing = UserService::new(
            Arc::new(StaleEmailLookup(SqlxUserRepository::boxed(pool.clone()))),
            SqlxSessionRepository::boxed(pool),
        );
        let result = racing
            .register(RegisterInput::new("Alex again", "Alex@Example.com", "password123"))
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_count_admins() {
        let (_pool, service) = setup_test_service().await;
        assert_eq!(service.count_admins().await.unwrap(), 0);

        service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();
        service
            .register(RegisterInput::new("Blair", "blair@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(service.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_pool, service) = setup_test_service().await;

        for input in [
            RegisterInput::new(" ", "a@example.com", "password123"),
            RegisterInput::new("A", "not-an-email", "password123"),
            RegisterInput::new("A", "a@example.com", "short"),
        ] {
            let result = service.register(input).await;
            assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
        }
        assert!(service.is_first_user().await.unwrap());
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let (_pool, service) = setup_test_service().await;
        let (user, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let (_, session) = service
            .login(LoginInput::new("Alex@Example.com", "password123"))
            .await
            .unwrap();
        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_share_a_message() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let wrong_pw = service.login(LoginInput::new("alex@example.com", "nope-nope")).await;
        let no_user = service.login(LoginInput::new("who@example.com", "password123")).await;

        match (wrong_pw, no_user) {
            (
                Err(UserServiceError::AuthenticationError(a)),
                Err(UserServiceError::AuthenticationError(b)),
            ) => assert_eq!(a, b),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (_pool, service) = setup_test_service().await;
        let (_, session) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        // Second logout is harmless
        service.logout(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_purged() {
        let (pool, service) = setup_test_service().await;
        let (user, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let sessions = SqlxSessionRepository::boxed(pool);
        let stale = Session::start(user.id, Duration::minutes(-1));
        sessions.create(&stale).await.unwrap();

        assert!(service.validate_session(&stale.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (_pool, service) = setup_test_service().await;
        let (user, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let wrong = service.change_password(user.id, "bad-current", "newpassword1").await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        let short = service.change_password(user.id, "password123", "tiny").await;
        assert!(matches!(short, Err(UserServiceError::ValidationError(_))));

        service.change_password(user.id, "password123", "newpassword1").await.unwrap();
        assert!(service.login(LoginInput::new("alex@example.com", "newpassword1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_or_delete_self() {
        let (_pool, service) = setup_test_service().await;
        let (admin, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();
        let (member, _) = service
            .register(RegisterInput::new("Blair", "blair@example.com", "password123"))
            .await
            .unwrap();

        assert!(matches!(
            service.set_role(admin.id, admin.id, UserRole::Member).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete_user(admin.id, admin.id).await,
            Err(UserServiceError::Forbidden(_))
        ));

        let promoted = service.set_role(admin.id, member.id, UserRole::Admin).await.unwrap();
        assert_eq!(promoted.role, UserRole::Admin);

        service.delete_user(admin.id, member.id).await.unwrap();
        assert!(matches!(
            service.delete_user(admin.id, member.id).await,
            Err(UserServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_pool, service) = setup_test_service().await;
        let (user, _) = service
            .register(RegisterInput::new("Alex", "alex@example.com", "password123"))
            .await
            .unwrap();

        let updated = service.update_profile(user.id, "  Alex Q  ").await.unwrap();
        assert_eq!(updated.name, "Alex Q");
        assert!(service.update_profile(user.id, "").await.is_err());
    }
}
