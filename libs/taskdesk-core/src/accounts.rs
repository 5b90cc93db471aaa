//! Account flows: registration, sign-in, profile and password management

use crate::auth::{hash_password, verify_password, IssuedToken, TokenSigner};
use crate::database::mappers::to_micros;
use crate::database::TaskDatabase;
use crate::error::{Result, TaskdeskError};
use crate::models::{CreateUserRequest, User};
use crate::validation::{check_email, check_new_password, validate_registration, FieldErrors};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Delivers password reset tokens to users
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, user: &User, token: &str) -> Result<()>;
}

/// Writes reset links to the log instead of sending mail
#[derive(Debug, Clone)]
pub struct LogResetNotifier {
    link_base: String,
}

impl LogResetNotifier {
    /// `link_base` is prefixed to the token, e.g. `https://tasks.example.com/reset?token=`
    #[must_use]
    pub fn new(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
        }
    }
}

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, user: &User, token: &str) -> Result<()> {
        info!(
            user = %user.id,
            email = %user.email,
            "Password reset requested: {}{}",
            self.link_base,
            token
        );
        Ok(())
    }
}

/// Successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: User,
}

impl Session {
    fn new(issued: IssuedToken, user: User) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
            user,
        }
    }
}

/// Account operations over the user table
#[derive(Clone)]
pub struct AccountService {
    db: TaskDatabase,
    tokens: TokenSigner,
    notifier: Arc<dyn ResetNotifier>,
}

impl AccountService {
    #[must_use]
    pub fn new(db: TaskDatabase, tokens: TokenSigner, notifier: Arc<dyn ResetNotifier>) -> Self {
        Self {
            db,
            tokens,
            notifier,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Create an account
    ///
    /// # Errors
    /// Returns `InvalidInput` for invalid fields, `DuplicateUser` for a taken username
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: CreateUserRequest) -> Result<User> {
        validate_registration(&request)?;
        let hash = hash_password(&request.password)?;
        self.db
            .create_user(&request.username, request.email.trim(), &hash)
            .await
    }

    /// Check a username and password
    ///
    /// Unknown users and wrong passwords fail identically.
    ///
    /// # Errors
    /// Returns `InvalidCredentials` if the pair does not match an account
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        match self.db.find_user_by_username(username).await? {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => {
                warn!("Failed sign-in for {}", username);
                Err(TaskdeskError::InvalidCredentials)
            }
        }
    }

    /// Authenticate and issue a session token
    ///
    /// # Errors
    /// Returns `InvalidCredentials` if the pair does not match an account
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let user = self.authenticate(username, password).await?;
        let issued = self.tokens.issue_session(user.id)?;
        info!("User {} signed in", user.id);
        Ok(Session::new(issued, user))
    }

    /// Resolve a session token to its user
    ///
    /// # Errors
    /// Returns `InvalidToken` if the token is invalid or its user no longer exists
    pub async fn user_from_session(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.verify_session(token)?;
        match self.db.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(TaskdeskError::UserNotFound { .. }) => {
                Err(TaskdeskError::invalid_token("account no longer exists"))
            }
            Err(e) => Err(e),
        }
    }

    /// Change the email address of `user_id`
    ///
    /// # Errors
    /// Returns `InvalidInput` for an invalid address
    #[instrument(skip(self))]
    pub async fn update_email(&self, user_id: Uuid, email: &str) -> Result<User> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", email);
        errors.into_result(())?;
        self.db.update_user_email(user_id, email.trim()).await
    }

    /// Change a password, given the current one
    ///
    /// # Errors
    /// Returns `InvalidInput` if the current password is wrong or the new one is invalid
    #[instrument(skip(self, old_password, new_password, confirmation))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<User> {
        let user = self.db.get_user(user_id).await?;

        let mut errors = FieldErrors::new();
        if !verify_password(old_password, &user.password_hash) {
            errors.add(
                "old_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
        }
        check_new_password(
            &mut errors,
            "new_password",
            "new_password_confirmation",
            new_password,
            confirmation,
        );
        errors.into_result(())?;

        let hash = hash_password(new_password)?;
        let user = self.db.update_user_password(user_id, &hash).await?;
        info!("Password changed for user {}", user_id);
        Ok(user)
    }

    /// Send a reset token to every account registered with `email`
    ///
    /// Returns how many accounts were notified. Callers should not reveal this
    /// number to the requester.
    ///
    /// # Errors
    /// Returns an error if the lookup, signing or notification fails
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<usize> {
        let users = self.db.find_users_by_email(email).await?;
        for user in &users {
            let token = self.tokens.issue_password_reset(user)?;
            self.notifier.send_reset(user, &token).await?;
        }
        info!("Password reset issued for {} account(s)", users.len());
        Ok(users.len())
    }

    /// Set a new password using a reset token
    ///
    /// The token stops working once the account changes, so it can be used once.
    ///
    /// # Errors
    /// Returns `InvalidToken` for an invalid, expired or used token and
    /// `InvalidInput` for an invalid new password
    #[instrument(skip_all)]
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<User> {
        let (user_id, stamp) = self.tokens.verify_password_reset(token)?;
        let user = match self.db.get_user(user_id).await {
            Ok(user) => user,
            Err(TaskdeskError::UserNotFound { .. }) => {
                return Err(TaskdeskError::invalid_token("account no longer exists"))
            }
            Err(e) => return Err(e),
        };
        if to_micros(&user.updated_at) != stamp {
            return Err(TaskdeskError::invalid_token("reset link has already been used"));
        }

        let mut errors = FieldErrors::new();
        check_new_password(
            &mut errors,
            "new_password",
            "new_password_confirmation",
            new_password,
            confirmation,
        );
        errors.into_result(())?;

        let hash = hash_password(new_password)?;
        let user = self.db.update_user_password(user_id, &hash).await?;
        info!("Password reset completed for user {}", user_id);
        Ok(user)
    }

    /// Remove an account and all of its tasks
    ///
    /// # Errors
    /// Returns `UserNotFound` if there is no such user
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        self.db.delete_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingNotifier;

    async fn service() -> (AccountService, Arc<RecordingNotifier>) {
        let db = TaskDatabase::in_memory().await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let tokens = TokenSigner::new(b"test-secret-test-secret-test-sec", 3600, 600);
        (AccountService::new(db, tokens, notifier.clone()), notifier)
    }

    fn registration(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "correct-horse".to_string(),
            password_confirmation: "correct-horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (accounts, _) = service().await;
        let user = accounts.register(registration("alice")).await.unwrap();
        assert_ne!(user.password_hash, "correct-horse");

        let session = accounts.login("alice", "correct-horse").await.unwrap();
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.user.id, user.id);

        let resolved = accounts.user_from_session(&session.token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (accounts, _) = service().await;
        accounts.register(registration("alice")).await.unwrap();

        let wrong_password = accounts.login("alice", "nope-nope").await.unwrap_err();
        let unknown_user = accounts.login("mallory", "correct-horse").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(unknown_user, TaskdeskError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_change_password_requires_old_password() {
        let (accounts, _) = service().await;
        let user = accounts.register(registration("bob")).await.unwrap();

        let result = accounts
            .change_password(user.id, "wrong-old", "new-password-1", "new-password-1")
            .await;
        match result {
            Err(TaskdeskError::InvalidInput(errors)) => assert!(errors.contains("old_password")),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }

        accounts
            .change_password(user.id, "correct-horse", "new-password-1", "new-password-1")
            .await
            .unwrap();
        assert!(accounts.login("bob", "new-password-1").await.is_ok());
        assert!(accounts.login("bob", "correct-horse").await.is_err());
    }

    #[tokio::test]
    async fn test_update_email_validates() {
        let (accounts, _) = service().await;
        let user = accounts.register(registration("carol")).await.unwrap();

        assert!(accounts.update_email(user.id, "broken").await.is_err());
        let updated = accounts
            .update_email(user.id, " carol@new.example.org ")
            .await
            .unwrap();
        assert_eq!(updated.email, "carol@new.example.org");
    }

    #[tokio::test]
    async fn test_password_reset_is_single_use() {
        let (accounts, notifier) = service().await;
        let user = accounts.register(registration("dave")).await.unwrap();

        let sent = accounts
            .request_password_reset("DAVE@example.com")
            .await
            .unwrap();
        assert_eq!(sent, 1);
        let token = notifier.last_token().await.unwrap();

        accounts
            .confirm_password_reset(&token, "brand-new-pass", "brand-new-pass")
            .await
            .unwrap();
        assert!(accounts.login("dave", "brand-new-pass").await.is_ok());

        let reused = accounts
            .confirm_password_reset(&token, "another-pass-1", "another-pass-1")
            .await;
        assert!(matches!(reused, Err(TaskdeskError::InvalidToken { .. })));
        assert_eq!(
            accounts.login("dave", "brand-new-pass").await.unwrap().user.id,
            user.id
        );
    }

    #[tokio::test]
    async fn test_password_reset_unknown_email_sends_nothing() {
        let (accounts, notifier) = service().await;
        assert_eq!(
            accounts
                .request_password_reset("nobody@example.com")
                .await
                .unwrap(),
            0
        );
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_account_session_rejected() {
        let (accounts, _) = service().await;
        let user = accounts.register(registration("erin")).await.unwrap();
        let session = accounts.login("erin", "correct-horse").await.unwrap();

        accounts.delete_account(user.id).await.unwrap();
        assert!(matches!(
            accounts.user_from_session(&session.token).await,
            Err(TaskdeskError::InvalidToken { .. })
        ));
    }
}
