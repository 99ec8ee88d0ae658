//! Username + password strategy.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    normalize_username, spawn_hash_password, spawn_verify_password, valid_username, AuthError,
    Strategy,
};
use crate::store::{NewUser, StoreError, User, UserStore};

/// Submitted local credentials.
#[derive(Clone)]
pub struct LocalCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LocalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct LocalStrategy {
    users: Arc<dyn UserStore>,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create a local account.
    ///
    /// # Errors
    /// [`AuthError::InvalidInput`] for a blank password or malformed username,
    /// [`AuthError::UsernameTaken`] when a local account already uses the name.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: LocalCredentials) -> Result<User, AuthError> {
        let username = normalize_username(&credentials.username);
        if !valid_username(&username) {
            return Err(AuthError::InvalidInput("username"));
        }
        if credentials.password.is_empty() {
            return Err(AuthError::InvalidInput("password"));
        }

        let password_hash = spawn_hash_password(credentials.password).await?;

        match self
            .users
            .create(NewUser::local(&username, password_hash))
            .await
        {
            Ok(user) => {
                debug!(user_id = %user.id, "local user registered");
                Ok(user)
            }
            Err(StoreError::Conflict) => Err(AuthError::UsernameTaken),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Strategy for LocalStrategy {
    type Credentials = LocalCredentials;

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn authenticate(&self, credentials: LocalCredentials) -> Result<User, AuthError> {
        let username = normalize_username(&credentials.username);
        if username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.users.find_local(&username).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::InvalidCredentials);
        };

        if spawn_verify_password(credentials.password, hash).await? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Instant;

    fn credentials(username: &str, password: &str) -> LocalCredentials {
        LocalCredentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn strategy() -> LocalStrategy {
        LocalStrategy::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let local = strategy();
        let registered = local
            .register(credentials(" alice@example.com ", "s3cret"))
            .await
            .unwrap();
        assert_eq!(registered.username.as_deref(), Some("alice@example.com"));

        let user = local
            .authenticate(credentials("alice@example.com", "s3cret"))
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let local = strategy();
        local.register(credentials("alice", "one")).await.unwrap();
        let err = local.register(credentials("alice", "two")).await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let local = strategy();
        assert!(matches!(
            local.register(credentials("  ", "pw")).await,
            Err(AuthError::InvalidInput("username"))
        ));
        assert!(matches!(
            local.register(credentials("alice", "")).await,
            Err(AuthError::InvalidInput("password"))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let local = strategy();
        local.register(credentials("alice", "right")).await.unwrap();

        let wrong = local.authenticate(credentials("alice", "wrong")).await;
        let unknown = local.authenticate(credentials("mallory", "right")).await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn password_hashing_does_not_block_the_runtime() {
        let local = strategy();

        let ((registered, finished_at), polled_at) = tokio::join!(
            async {
                let registered = local.register(credentials("alice", "pw")).await;
                (registered, Instant::now())
            },
            async { Instant::now() },
        );
        registered.unwrap();
        assert!(polled_at < finished_at);

        let ((user, finished_at), polled_at) = tokio::join!(
            async {
                let user = local.authenticate(credentials("alice", "pw")).await;
                (user, Instant::now())
            },
            async { Instant::now() },
        );
        user.unwrap();
        assert!(polled_at < finished_at);
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", credentials("alice", "hunter2"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
