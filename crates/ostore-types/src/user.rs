use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity record.
///
/// `password_hash` is a PHC-format string and is never part of the API
/// wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub username: String,
    pub password_hash: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub active: bool,
    pub groups: Vec<String>,
}

impl User {
    /// A new, unsaved user with the given username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            uid: String::new(),
            username: username.into(),
            password_hash: String::new(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            active: false,
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Normalise a username: ASCII lowercase, alphanumerics only.
pub fn sanitize_username(username: &str) -> String {
    username
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
