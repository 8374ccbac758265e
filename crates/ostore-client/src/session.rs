//! In-memory login sessions.
//!
//! Sessions live only in process memory and are lost on restart. Only a
//! hash of each plaintext key is kept; the plaintext is handed to the caller
//! once by [`SessionManager::new_session`].

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ostore_crypto::{generate_session_token, DomainHasher, TokenHash};
use ostore_types::User;

use crate::error::{ClientError, ClientResult};

/// Lifetime of a session unless configured otherwise.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

/// A live session bound to one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSession {
    pub user_uid: String,
    key_hash: TokenHash,
    pub ip: String,
    pub created: DateTime<Utc>,
}

/// The list of live sessions.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<Vec<UserSession>>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a session for `user` and return it with its plaintext key.
    ///
    /// Expired sessions are purged first.
    pub fn new_session(&self, user: &User, ip: &str) -> ClientResult<(UserSession, String)> {
        self.expire()?;
        let token = generate_session_token(&user.uid, &user.username);
        let session = UserSession {
            user_uid: user.uid.clone(),
            key_hash: DomainHasher::SESSION_STORE.hash_token(&token),
            ip: ip.to_string(),
            created: Utc::now(),
        };
        self.lock()?.push(session.clone());
        tracing::debug!(user = %user.username, ip, "session opened");
        Ok((session, token))
    }

    /// Find the live session for a plaintext key.
    pub fn resolve(&self, token: &str) -> ClientResult<Option<UserSession>> {
        let hash = DomainHasher::SESSION_STORE.hash_token(token);
        let now = Utc::now();
        let sessions = self.lock()?;
        Ok(sessions
            .iter()
            .find(|s| s.key_hash == hash && !self.is_expired(s, now))
            .cloned())
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn expire(&self) -> ClientResult<usize> {
        let now = Utc::now();
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|s| !self.is_expired(s, now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "expired sessions");
        }
        Ok(removed)
    }

    /// End the session for a plaintext key. Returns `false` if none matched.
    pub fn revoke(&self, token: &str) -> ClientResult<bool> {
        let hash = DomainHasher::SESSION_STORE.hash_token(token);
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|s| s.key_hash != hash);
        Ok(sessions.len() != before)
    }

    /// End every session belonging to `user_uid`.
    pub fn revoke_user(&self, user_uid: &str) -> ClientResult<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|s| s.user_uid != user_uid);
        Ok(before - sessions.len())
    }

    /// When `session` stops resolving.
    pub fn expires_at(&self, session: &UserSession) -> DateTime<Utc> {
        chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|d| session.created.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Number of stored sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, session: &UserSession, now: DateTime<Utc>) -> bool {
        (now - session.created)
            .to_std()
            .map(|age| age >= self.timeout)
            .unwrap_or(false)
    }

    fn lock(&self) -> ClientResult<MutexGuard<'_, Vec<UserSession>>> {
        self.sessions
            .lock()
            .map_err(|e| ClientError::Internal(format!("session lock poisoned: {e}")))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> User {
        let mut u = User::new(format!("name{uid}"));
        u.uid = uid.into();
        u
    }

    fn age_all(manager: &SessionManager, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap();
        for s in manager.sessions.lock().unwrap().iter_mut() {
            s.created = s.created - by;
        }
    }

    #[test]
    fn new_session_resolves_to_same_user() {
        let m = SessionManager::default();
        let (session, key) = m.new_session(&user("u1"), "10.0.0.1").unwrap();
        let found = m.resolve(&key).unwrap().unwrap();
        assert_eq!(found, session);
        assert_eq!(found.user_uid, "u1");
        assert_eq!(found.ip, "10.0.0.1");
    }

    #[test]
    fn plaintext_key_is_not_stored() {
        let m = SessionManager::default();
        let (session, key) = m.new_session(&user("u1"), "ip").unwrap();
        assert!(!format!("{session:?}").contains(&key));
    }

    #[test]
    fn unknown_key_does_not_resolve() {
        let m = SessionManager::default();
        m.new_session(&user("u1"), "ip").unwrap();
        assert!(m.resolve("deadbeef").unwrap().is_none());
    }

    #[test]
    fn sessions_are_distinct_per_login() {
        let m = SessionManager::default();
        let (_, k1) = m.new_session(&user("u1"), "ip").unwrap();
        let (_, k2) = m.new_session(&user("u2"), "ip").unwrap();
        assert_ne!(k1, k2);
        assert_eq!(m.resolve(&k1).unwrap().unwrap().user_uid, "u1");
        assert_eq!(m.resolve(&k2).unwrap().unwrap().user_uid, "u2");
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn expired_session_is_purged() {
        let m = SessionManager::default();
        let (_, key) = m.new_session(&user("u1"), "ip").unwrap();
        age_all(&m, DEFAULT_SESSION_TIMEOUT + Duration::from_secs(1));
        assert!(m.resolve(&key).unwrap().is_none());
        assert_eq!(m.expire().unwrap(), 1);
        assert!(m.is_empty());
    }

    #[test]
    fn new_session_purges_expired_first() {
        let m = SessionManager::new(Duration::from_secs(10));
        m.new_session(&user("u1"), "ip").unwrap();
        age_all(&m, Duration::from_secs(11));
        let (_, key) = m.new_session(&user("u2"), "ip").unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.resolve(&key).unwrap().unwrap().user_uid, "u2");
    }

    #[test]
    fn revoke_removes_session() {
        let m = SessionManager::default();
        let (_, key) = m.new_session(&user("u1"), "ip").unwrap();
        assert!(m.revoke(&key).unwrap());
        assert!(!m.revoke(&key).unwrap());
        assert!(m.resolve(&key).unwrap().is_none());
    }

    #[test]
    fn revoke_user_removes_all_of_theirs() {
        let m = SessionManager::default();
        m.new_session(&user("u1"), "a").unwrap();
        m.new_session(&user("u1"), "b").unwrap();
        let (_, other) = m.new_session(&user("u2"), "c").unwrap();
        assert_eq!(m.revoke_user("u1").unwrap(), 2);
        assert!(m.resolve(&other).unwrap().is_some());
    }

    #[test]
    fn expiry_time_is_created_plus_timeout() {
        let m = SessionManager::new(Duration::from_secs(60));
        let (session, _) = m.new_session(&user("u1"), "ip").unwrap();
        assert_eq!(
            m.expires_at(&session) - session.created,
            chrono::Duration::seconds(60)
        );
    }
}
