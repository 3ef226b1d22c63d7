//! Credential storage.
//!
//! [`CredentialStore`] is the contract the auth service depends on;
//! [`PgCredentialStore`] backs it with PostgreSQL and
//! [`MemoryCredentialStore`] keeps everything in process.

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::MemoryCredentialStore;
pub use models::{Account, NewAccount};
pub use operations::PgCredentialStore;
pub use store::CredentialStore;
