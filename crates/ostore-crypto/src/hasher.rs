use rand::RngCore;

/// Domain-separated BLAKE3 hasher.
///
/// The domain tag is prepended to every computation, so the same bytes
/// hashed for two purposes never collide.
pub struct DomainHasher {
    domain: &'static str,
}

impl DomainHasher {
    /// Derives plaintext session tokens from random material.
    pub const SESSION_TOKEN: Self = Self {
        domain: "ostore-session-token-v1",
    };
    /// Hashes plaintext tokens for storage.
    pub const SESSION_STORE: Self = Self {
        domain: "ostore-session-store-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash a sequence of byte slices, each length-prefixed.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> TokenHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        TokenHash(hasher.finalize())
    }

    /// Hash a plaintext token for storage.
    pub fn hash_token(&self, token: &str) -> TokenHash {
        self.hash_parts(&[token.as_bytes()])
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// A stored token hash.
///
/// Equality is constant-time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenHash(blake3::Hash);

impl TokenHash {
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

/// Generate a plaintext session token bound to a user identity.
///
/// 32 random bytes are hashed together with the user's uid and username.
pub fn generate_session_token(user_uid: &str, username: &str) -> String {
    let mut random = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut random);
    let hash = DomainHasher::SESSION_TOKEN.hash_parts(&[
        &random[..],
        user_uid.as_bytes(),
        username.as_bytes(),
    ]);
    hex::encode(hash.0.as_bytes())
}
