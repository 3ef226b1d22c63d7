use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::AuthConfig;
use crate::error::HashError;

const DUMMY_PASSWORD: &str = "no-such-account-placeholder";

/// Format of a stored hash record, recognised from its PHC/modular-crypt
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    /// `$2a$`/`$2b$`/`$2y$` records carried over from the previous system.
    Bcrypt,
    Unknown,
}

impl HashScheme {
    pub fn detect(record: &str) -> Self {
        if record.starts_with("$argon2") {
            HashScheme::Argon2
        } else if ["$2a$", "$2b$", "$2y$"].iter().any(|p| record.starts_with(p)) {
            HashScheme::Bcrypt
        } else {
            HashScheme::Unknown
        }
    }
}

/// Salted, deliberately slow one-way password hashing.
///
/// New records are Argon2id PHC strings. Verification takes the algorithm and
/// cost parameters from the record itself, so changing [`AuthConfig`] later
/// does not invalidate existing records.
pub struct PasswordHasher {
    params: Params,
    dummy_record: String,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))?;

        let mut hasher = Self {
            params,
            dummy_record: String::new(),
        };
        hasher.dummy_record = hasher.hash(DUMMY_PASSWORD)?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `plaintext` with a fresh random salt. Two calls with the same
    /// input produce different records.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::HashingFailed(e.to_string()))
    }

    /// Returns whether `plaintext` matches `record`. Malformed or unknown
    /// records simply do not match; the reason is never reported.
    pub fn verify(&self, plaintext: &str, record: &str) -> bool {
        match HashScheme::detect(record) {
            HashScheme::Argon2 => PasswordHash::new(record)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(plaintext.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false),
            HashScheme::Bcrypt => bcrypt::verify(plaintext, record).unwrap_or(false),
            HashScheme::Unknown => false,
        }
    }

    /// Performs a verification against a throwaway record so a lookup miss
    /// costs about as much as a wrong password.
    ///
    /// The throwaway record is hashed with the current [`AuthConfig`] costs.
    /// Accounts whose records were hashed under older costs, or legacy bcrypt
    /// records, verify at their own cost, so a miss only matches the timing of
    /// accounts hashed under the current settings.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_record);
    }
}
