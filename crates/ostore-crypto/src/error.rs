use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The password does not meet the minimum length.
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    /// Argon2 rejected the parameters or failed to hash.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
