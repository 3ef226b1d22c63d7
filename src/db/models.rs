use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// A persisted account. `username` is unique across all accounts and
/// compared case-sensitively.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

// The hash stays out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// An account that has not been saved yet; the store assigns `id` and
/// `created_at`.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

impl NewAccount {
    /// New accounts start with an empty role set.
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_account(self, id: Uuid, created_at: DateTime<Utc>) -> Account {
        Account {
            id,
            username: self.username,
            password_hash: self.password_hash,
            roles: self.roles,
            created_at,
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Row shape of `users` joined with its aggregated `user_roles`.
#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            roles: row.roles.into_iter().collect(),
            created_at: row.created_at,
        }
    }
}
