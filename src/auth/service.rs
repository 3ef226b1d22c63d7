use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::password::PasswordHasher;
use crate::auth::session::{CookieDirective, SessionIssuer};
use crate::config::Settings;
use crate::db::models::{Account, NewAccount};
use crate::db::store::CredentialStore;
use crate::error::{AuthError, DatabaseError, HashError};

/// Register, login and logout on top of a [`CredentialStore`].
///
/// Every failure is reported as an [`AuthError`]; storage and hashing errors
/// are logged here and collapsed into [`AuthError::StorageUnavailable`].
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    issuer: SessionIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, issuer: SessionIssuer) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            issuer,
        }
    }

    pub fn from_settings(store: Arc<dyn CredentialStore>, settings: &Settings) -> Result<Self, HashError> {
        Ok(Self::new(
            store,
            PasswordHasher::new(&settings.auth)?,
            SessionIssuer::new(&settings.session),
        ))
    }

    pub fn session_cookie_name(&self) -> &str {
        self.issuer.cookie_name()
    }

    /// Creates an account with an empty role set. No session is issued.
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        validate_username(username)?;

        if self.store.find_by_username(username).await.map_err(storage_failure)?.is_some() {
            warn!("Registration rejected, username already taken: {}", username);
            return Err(AuthError::UsernameTaken);
        }

        let plaintext = password.to_owned();
        let password_hash = self
            .run_blocking(move |hasher| hasher.hash(&plaintext))
            .await?
            .map_err(hash_failure)?;

        match self.store.save(NewAccount::new(username.to_owned(), password_hash)).await {
            Ok(account) => {
                info!(user_id = %account.id, "Account created for username: {}", username);
                Ok(account)
            }
            // Lost a race with a concurrent registration between lookup and insert.
            Err(DatabaseError::Duplicate) => {
                warn!("Registration rejected by uniqueness constraint for username: {}", username);
                Err(AuthError::UsernameTaken)
            }
            Err(e) => Err(storage_failure(e)),
        }
    }

    /// Checks the credentials and, on success, returns the directive that
    /// sets a freshly issued session cookie.
    ///
    /// An unknown username and a wrong password produce the same error, and
    /// both run one password verification.
    pub async fn login(&self, username: &str, password: &str) -> Result<CookieDirective, AuthError> {
        let account = self.store.find_by_username(username).await.map_err(storage_failure)?;

        let plaintext = password.to_owned();
        let verified = match account {
            Some(account) => {
                let record = account.password_hash;
                self.run_blocking(move |hasher| hasher.verify(&plaintext, &record)).await?
            }
            None => {
                self.run_blocking(move |hasher| {
                    hasher.verify_dummy(&plaintext);
                    false
                })
                .await?
            }
        };

        if !verified {
            warn!("Login failed for username: {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Login successful for username: {}", username);
        Ok(self.issuer.issue())
    }

    /// Always succeeds with a cookie-clearing directive, whether or not the
    /// caller presented a session.
    pub fn logout(&self, token: Option<&str>) -> CookieDirective {
        self.issuer.expire(token)
    }

    async fn run_blocking<T, F>(&self, task: F) -> Result<T, AuthError>
    where
        F: FnOnce(&PasswordHasher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || task(&hasher))
            .await
            .map_err(|e| hash_failure(HashError::TaskAborted(e.to_string())))
    }
}

// Passwords are not checked: any string, including an empty one, is hashed.
fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::InvalidInput("username must not be empty".into()));
    }
    Ok(())
}

fn storage_failure(err: DatabaseError) -> AuthError {
    error!("Credential store failure: {}", err);
    AuthError::StorageUnavailable
}

fn hash_failure(err: HashError) -> AuthError {
    error!("Password hashing failure: {}", err);
    AuthError::StorageUnavailable
}
