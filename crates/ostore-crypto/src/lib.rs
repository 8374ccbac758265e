//! Cryptographic primitives for ostore.
//!
//! Provides Argon2id password hashing, domain-separated BLAKE3 hashing for
//! session tokens, and UUIDv7 identifier generation.
//!
//! All crypto operations wrap established libraries; nothing here is custom
//! cryptography.

pub mod error;
pub mod hasher;
pub mod password;

pub use error::{CryptoError, CryptoResult};
pub use hasher::{generate_session_token, DomainHasher, TokenHash};
pub use password::{hash_password, verify_password, PasswordParams, MIN_PASSWORD_LENGTH};

/// Generate a fresh, time-ordered unique identifier.
pub fn new_uid() -> String {
    uuid::Uuid::now_v7().to_string()
}
