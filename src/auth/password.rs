use argon2::Argon2;

use super::token::{argon2, hash_secret, verify_secret};
use crate::error::Result;

/// Hashes and checks account passwords.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { argon2: argon2() }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        hash_secret(&self.argon2, password)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        verify_secret(&self.argon2, password, hash)
    }
}
