//! Authentication module
//!
//! Password hashing, session cookie issuance, the register/login/logout
//! service, its HTTP handlers and the path-based access policy.

pub mod handlers;
pub mod password;
pub mod policy;
pub mod routes;
pub mod service;
pub mod session;

pub use password::{HashScheme, PasswordHasher};
pub use policy::{AccessGuard, AccessPolicy, AccessRequirement, PathPattern};
pub use service::AuthService;
pub use session::{CookieDirective, SessionIssuer};
