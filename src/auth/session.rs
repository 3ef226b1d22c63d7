use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::config::SessionConfig;

const TOKEN_BYTES: usize = 32;

/// Instruction for the HTTP layer to set or clear the session cookie on the
/// outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
}

impl CookieDirective {
    pub fn is_removal(&self) -> bool {
        self.max_age_secs == 0 && self.value.is_empty()
    }
}

/// Mints opaque session tokens and the matching cookie directives.
///
/// Tokens are not recorded anywhere: nothing on the server can later tell a
/// real token from any other non-empty string.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    cookie_name: String,
    max_age_secs: i64,
    secure: bool,
}

impl SessionIssuer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            max_age_secs: config.max_age_secs,
            secure: config.secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// 32 bytes from the OS RNG, URL-safe base64 without padding.
    pub fn generate_token() -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issues a fresh token wrapped in a set-cookie directive.
    pub fn issue(&self) -> CookieDirective {
        CookieDirective {
            name: self.cookie_name.clone(),
            value: Self::generate_token(),
            path: "/".to_string(),
            max_age_secs: self.max_age_secs,
            http_only: true,
            secure: self.secure,
        }
    }

    /// Directive deleting the client-held cookie. `token` is whatever the
    /// caller presented, if anything; there is no registry to remove it from.
    pub fn expire(&self, token: Option<&str>) -> CookieDirective {
        debug!(had_session = token.is_some_and(|t| !t.is_empty()), "expiring session cookie");

        CookieDirective {
            name: self.cookie_name.clone(),
            value: String::new(),
            path: "/".to_string(),
            max_age_secs: 0,
            http_only: true,
            secure: self.secure,
        }
    }
}
