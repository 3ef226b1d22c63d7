use async_trait::async_trait;

use crate::db::models::{Account, NewAccount};
use crate::error::DatabaseError;

/// Durable username-keyed account storage.
///
/// Implementations must enforce username uniqueness atomically: when two
/// `save` calls race for the same username, exactly one succeeds and the
/// other returns [`DatabaseError::Duplicate`]. Callers never rely on a prior
/// `find_by_username` to guarantee this.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError>;

    async fn save(&self, account: NewAccount) -> Result<Account, DatabaseError>;
}
