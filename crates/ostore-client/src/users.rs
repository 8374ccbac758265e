//! User records, passwords and login.
//!
//! User operations carry no permission check; callers are trusted to have
//! authorized them already.

use chrono::Utc;
use ostore_backend::BackendExt;
use ostore_crypto::{hash_password, new_uid, verify_password};
use ostore_types::{sanitize_username, SessionKey, User};

use crate::client::{lock, Client, USERNAME_PREFIX, USER_PREFIX};
use crate::error::{ClientError, ClientResult};
use crate::session::UserSession;

fn user_key(uid: &str) -> String {
    format!("{USER_PREFIX}{uid}")
}

fn username_key(username: &str) -> String {
    format!("{USERNAME_PREFIX}{username}")
}

impl Client {
    pub fn get_user(&self, uid: &str) -> ClientResult<User> {
        if uid.is_empty() {
            return Err(ClientError::MissingUid);
        }
        self.backend
            .get_json(&user_key(uid))?
            .ok_or_else(|| ClientError::NotFound(uid.to_string()))
    }

    /// Look a user up by username. The name is sanitized first.
    pub fn get_user_by_username(&self, username: &str) -> ClientResult<User> {
        let username = sanitize_username(username);
        if username.is_empty() {
            return Err(ClientError::MissingUsername);
        }
        let uid: String = self
            .backend
            .get_json(&username_key(&username))?
            .ok_or_else(|| ClientError::NotFound(username.clone()))?;
        self.get_user(&uid)
    }

    /// Create or update a user.
    ///
    /// The username is sanitized and must not be empty or belong to another
    /// user. On first save the user gets a uid (unless one was supplied),
    /// `created` and `active = true`. Renaming drops the old username key.
    pub fn set_user(&self, user: &mut User) -> ClientResult<()> {
        let username = sanitize_username(&user.username);
        if username.is_empty() {
            return Err(ClientError::MissingUsername);
        }
        let _guard = lock(&self.write_lock, "write")?;
        let now = Utc::now();

        let previous: Option<User> = if user.uid.is_empty() {
            None
        } else {
            self.backend.get_json(&user_key(&user.uid))?
        };

        let mut candidate = user.clone();
        candidate.username = username;
        match &previous {
            Some(previous) => candidate.created = previous.created,
            None => {
                if candidate.uid.is_empty() {
                    candidate.uid = new_uid();
                }
                candidate.created = now;
                candidate.active = true;
            }
        }
        candidate.modified = now;

        let owner: Option<String> = self.backend.get_json(&username_key(&candidate.username))?;
        if owner.is_some_and(|owner| owner != candidate.uid) {
            return Err(ClientError::UsernameTaken(candidate.username));
        }

        self.backend.set_json(&user_key(&candidate.uid), &candidate)?;
        self.backend
            .set_json(&username_key(&candidate.username), &candidate.uid)?;
        if let Some(previous) = previous.filter(|p| p.username != candidate.username) {
            self.backend.delete(&username_key(&previous.username))?;
        }
        tracing::info!(uid = %candidate.uid, username = %candidate.username, "user saved");

        *user = candidate;
        Ok(())
    }

    /// Delete a user and every session they hold.
    pub fn delete_user(&self, user: &User) -> ClientResult<()> {
        if user.uid.is_empty() {
            return Err(ClientError::MissingUid);
        }
        let _guard = lock(&self.write_lock, "write")?;
        let stored: User = self
            .backend
            .get_json(&user_key(&user.uid))?
            .ok_or_else(|| ClientError::NotFound(user.uid.clone()))?;
        self.backend.delete(&user_key(&stored.uid))?;
        self.backend.delete(&username_key(&stored.username))?;
        self.sessions.revoke_user(&stored.uid)?;
        tracing::info!(uid = %stored.uid, username = %stored.username, "user deleted");
        Ok(())
    }

    /// Replace the user's password hash. Call [`Self::set_user`] to persist.
    pub fn set_password(&self, user: &mut User, password: &str) -> ClientResult<()> {
        user.password_hash = hash_password(password, &self.password)?;
        Ok(())
    }

    /// Check credentials and open a session.
    ///
    /// Unknown users, inactive users and wrong passwords are all reported
    /// as [`ClientError::InvalidCredentials`].
    pub fn login(
        &self,
        username: &str,
        password: &str,
        ip: &str,
    ) -> ClientResult<(UserSession, SessionKey)> {
        let user = match self.get_user_by_username(username) {
            Ok(user) => user,
            Err(ClientError::NotFound(_) | ClientError::MissingUsername) => {
                tracing::warn!(username, ip, "login for unknown user");
                return Err(ClientError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };
        if !user.active || !verify_password(password, &user.password_hash) {
            tracing::warn!(username = %user.username, ip, "login rejected");
            return Err(ClientError::InvalidCredentials);
        }

        let (session, key) = self.sessions.new_session(&user, ip)?;
        let expires = self.sessions.expires_at(&session);
        tracing::info!(username = %user.username, ip, "login");
        Ok((session, SessionKey { key, expires }))
    }

    /// End the session for `key`.
    pub fn logout(&self, key: &str) -> ClientResult<()> {
        if self.sessions.revoke(key)? {
            Ok(())
        } else {
            Err(ClientError::InvalidSession)
        }
    }

    /// The active user behind a session key.
    pub fn resolve_session(&self, key: &str) -> ClientResult<User> {
        let session = self
            .sessions
            .resolve(key)?
            .ok_or(ClientError::InvalidSession)?;
        match self.get_user(&session.user_uid) {
            Ok(user) if user.active => Ok(user),
            Ok(_) | Err(ClientError::NotFound(_)) => Err(ClientError::InvalidSession),
            Err(e) => Err(e),
        }
    }
}
