use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{CryptoError, CryptoResult};

/// Shortest password accepted by [`hash_password`], in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Argon2id cost parameters used for new password hashes.
///
/// Verification always uses the parameters recorded in the stored hash,
/// so these can be raised without invalidating existing users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        // OWASP recommendation for Argon2id.
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordParams {
    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password into a self-describing PHC string.
pub fn hash_password(password: &str, params: &PasswordParams) -> CryptoResult<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CryptoError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// A malformed or empty stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
