//! Auth service
//!
//! Email/password identity with 30-day sessions. Passwords are hashed with
//! Argon2id; sign-in/sign-out state changes are broadcast so the host UI can
//! react asynchronously. Signing out clears local state first and treats the
//! remote session delete as best-effort.

use crate::config::{MIN_PASSWORD_LENGTH, SESSION_TTL_DAYS};
use crate::database::{Repository, User};
use crate::error::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// An authenticated session
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Auth state changes, delivered asynchronously to subscribers
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
}

/// Service handling sign-up, sign-in and session state
#[derive(Clone)]
pub struct AuthService {
    repo: Repository,
    current: Arc<Mutex<Option<AuthSession>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(repo: Repository) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            repo,
            current: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Subscribe to sign-in/sign-out events
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Register a new account and open a session for it
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Generic(format!("Failed to hash password: {}", e)))?
            .to_string();

        let user = self.repo.create_user(email, &password_hash).await?;

        tracing::info!("User registered: {}", user.id);

        self.open_session(user).await
    }

    /// Sign in with an existing account.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let credentials = self
            .repo
            .get_user_credentials(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&credentials.password_hash)
            .map_err(|e| AppError::Generic(format!("Stored password hash is invalid: {}", e)))?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(AppError::InvalidCredentials);
        }

        let user = self
            .repo
            .get_user(&credentials.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        tracing::info!("User signed in: {}", user.id);

        self.open_session(user).await
    }

    /// Sign out.
    ///
    /// Local state clears immediately; the stored session row is deleted on
    /// a best-effort basis and a failure there is ignored — the user is
    /// already signed out locally.
    pub async fn sign_out(&self) {
        let previous = self.current.lock().await.take();

        if let Some(session) = previous {
            if let Err(e) = self.repo.delete_auth_session(&session.token).await {
                tracing::debug!("Ignoring failed session delete on sign-out: {}", e);
            }
            tracing::info!("User signed out: {}", session.user.id);
        }

        let _ = self.events.send(AuthEvent::SignedOut);
    }

    /// The current session, or `None` when signed out or expired
    pub async fn get_session(&self) -> Option<AuthSession> {
        let mut current = self.current.lock().await;
        let expired = current
            .as_ref()
            .map(|session| session.expires_at <= Utc::now())
            .unwrap_or(false);
        if expired {
            *current = None;
        }
        current.clone()
    }

    /// Convenience accessor for the signed-in user
    pub async fn current_user(&self) -> Option<User> {
        self.get_session().await.map(|s| s.user)
    }

    /// Restore a persisted session token from a previous run.
    ///
    /// Returns `Ok(None)` for unknown or expired tokens.
    pub async fn restore(&self, token: &str) -> Result<Option<AuthSession>> {
        let Some(record) = self.repo.get_auth_session(token).await? else {
            return Ok(None);
        };
        if record.expires_at <= Utc::now() {
            return Ok(None);
        }
        let Some(user) = self.repo.get_user(&record.user_id).await? else {
            return Ok(None);
        };

        let session = AuthSession {
            token: record.token,
            user,
            expires_at: record.expires_at,
        };

        *self.current.lock().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));

        Ok(Some(session))
    }

    async fn open_session(&self, user: User) -> Result<AuthSession> {
        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            user,
            expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
        };

        self.repo
            .create_auth_session(&session.token, &session.user.id, session.expires_at)
            .await?;

        *self.current.lock().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> (AuthService, Repository) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        (AuthService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_sign_up_opens_session_and_hashes_password() {
        let (service, repo) = create_test_service().await;

        let session = service
            .sign_up("writer@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(session.user.email, "writer@example.com");
        assert!(service.get_session().await.is_some());

        let stored = repo
            .get_user_credentials("writer@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "hunter22");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let (service, _repo) = create_test_service().await;

        let bad_email = service.sign_up("not-an-email", "hunter22").await;
        assert!(matches!(bad_email, Err(AppError::Validation(_))));

        let short_password = service.sign_up("writer@example.com", "abc").await;
        assert!(matches!(short_password, Err(AppError::Validation(_))));

        let first = service.sign_up("writer@example.com", "hunter22").await;
        assert!(first.is_ok());

        let duplicate = service.sign_up("writer@example.com", "hunter23").await;
        assert!(matches!(duplicate, Err(AppError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_sign_in_verifies_password() {
        let (service, _repo) = create_test_service().await;

        service
            .sign_up("writer@example.com", "hunter22")
            .await
            .unwrap();
        service.sign_out().await;

        let wrong = service
            .sign_in_with_password("writer@example.com", "wrong-pass")
            .await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

        let unknown = service
            .sign_in_with_password("nobody@example.com", "hunter22")
            .await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));

        let session = service
            .sign_in_with_password("writer@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.user.email, "writer@example.com");
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_without_row() {
        let (service, repo) = create_test_service().await;

        let session = service
            .sign_up("writer@example.com", "hunter22")
            .await
            .unwrap();

        // The remote row is already gone; sign-out still succeeds locally.
        repo.delete_auth_session(&session.token).await.unwrap();
        service.sign_out().await;

        assert!(service.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_observes_event_sequence() {
        let (service, _repo) = create_test_service().await;
        let mut events = service.subscribe();

        service
            .sign_up("writer@example.com", "hunter22")
            .await
            .unwrap();
        service.sign_out().await;

        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_restore_session_token() {
        let (service, repo) = create_test_service().await;

        let session = service
            .sign_up("writer@example.com", "hunter22")
            .await
            .unwrap();
        let token = session.token.clone();

        // A fresh service instance, as after an app restart.
        let fresh = AuthService::new(repo.clone());
        assert!(fresh.get_session().await.is_none());

        let restored = fresh.restore(&token).await.unwrap().unwrap();
        assert_eq!(restored.user.email, "writer@example.com");
        assert!(fresh.get_session().await.is_some());

        assert!(fresh.restore("unknown-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_rejects_expired_session() {
        let (service, repo) = create_test_service().await;

        let user = repo
            .create_user("writer@example.com", "not-a-real-hash")
            .await
            .unwrap();
        let expired_at = Utc::now() - Duration::hours(1);
        repo.create_auth_session("stale-token", &user.id, expired_at)
            .await
            .unwrap();

        assert!(service.restore("stale-token").await.unwrap().is_none());
    }
}
