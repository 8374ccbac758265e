use std::fmt;

use serde::{Deserialize, Serialize};

/// An operation subject to authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Set,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Get, Action::Set, Action::Update, Action::Delete];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A group's rule for one action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// Unconditionally allow (`true`) or deny (`false`).
    Flag(bool),
    /// Allow when the object's projection matches this query.
    Predicate(String),
}

/// Per-action rules for a named group. A missing rule denies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Rule>,
}

impl UserGroup {
    /// A group allowed to do everything.
    pub fn allow_all() -> Self {
        Self {
            get: Some(Rule::Flag(true)),
            set: Some(Rule::Flag(true)),
            update: Some(Rule::Flag(true)),
            delete: Some(Rule::Flag(true)),
        }
    }

    pub fn rule(&self, action: Action) -> Option<&Rule> {
        match action {
            Action::Get => self.get.as_ref(),
            Action::Set => self.set.as_ref(),
            Action::Update => self.update.as_ref(),
            Action::Delete => self.delete.as_ref(),
        }
    }

    /// Builder-style helper for setting one action's rule.
    pub fn with_rule(mut self, action: Action, rule: Rule) -> Self {
        let slot = match action {
            Action::Get => &mut self.get,
            Action::Set => &mut self.set,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        };
        *slot = Some(rule);
        self
    }
}
