use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use ostore_query::Query;
use ostore_types::{IndexObject, User};

use crate::error::{GateError, GateResult};
use crate::group::{Action, Rule, UserGroup};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The outcome of a permission check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    /// Returns `true` if the decision is `Allow`.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

// ---------------------------------------------------------------------------
// PermissionEngine
// ---------------------------------------------------------------------------

type CacheKey = (String, Action);

/// Evaluates user-group rules against object projections.
///
/// Predicates are compiled on first use and cached per (group, action);
/// [`Self::reload`] swaps the configuration and drops the cache.
pub struct PermissionEngine {
    groups: RwLock<BTreeMap<String, UserGroup>>,
    compiled: RwLock<HashMap<CacheKey, Arc<Query>>>,
}

impl PermissionEngine {
    pub fn new(groups: BTreeMap<String, UserGroup>) -> Self {
        Self {
            groups: RwLock::new(groups),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the group configuration.
    pub fn reload(&self, groups: BTreeMap<String, UserGroup>) -> GateResult<()> {
        let mut current = self.groups.write().map_err(poisoned)?;
        let mut compiled = self.compiled.write().map_err(poisoned)?;
        *current = groups;
        compiled.clear();
        tracing::info!(groups = current.len(), "permission groups reloaded");
        Ok(())
    }

    /// Compile every predicate now, so configuration errors surface at load
    /// time rather than on the first request.
    pub fn validate(&self) -> GateResult<()> {
        let groups = self.groups.read().map_err(poisoned)?.clone();
        for (name, group) in &groups {
            for action in Action::ALL {
                if let Some(Rule::Predicate(source)) = group.rule(action) {
                    self.predicate(name, action, source)?;
                }
            }
        }
        Ok(())
    }

    /// Names of the configured groups.
    pub fn group_names(&self) -> GateResult<Vec<String>> {
        Ok(self.groups.read().map_err(poisoned)?.keys().cloned().collect())
    }

    /// Decide whether `user` may perform `action` on `object`.
    ///
    /// No user means an internal, trusted caller and is always allowed.
    pub fn check(
        &self,
        action: Action,
        user: Option<&User>,
        object: &IndexObject,
    ) -> GateResult<Decision> {
        let Some(user) = user else {
            return Ok(Decision::Allow);
        };
        let decision = self.decide(action, user, object)?;
        tracing::debug!(
            %action,
            user = %user.username,
            uid = %object.uid,
            allowed = decision.is_allowed(),
            "permission check"
        );
        Ok(decision)
    }

    fn decide(&self, action: Action, user: &User, object: &IndexObject) -> GateResult<Decision> {
        let is_author = !user.uid.is_empty() && object.author == user.uid;
        if action == Action::Get && is_author {
            return Ok(Decision::Allow);
        }

        let rules: Vec<(String, Rule)> = {
            let groups = self.groups.read().map_err(poisoned)?;
            user.groups
                .iter()
                .filter_map(|name| {
                    let rule = groups.get(name)?.rule(action)?;
                    Some((name.clone(), rule.clone()))
                })
                .collect()
        };

        for (group, rule) in rules {
            match rule {
                Rule::Flag(true) => return Ok(Decision::Allow),
                Rule::Flag(false) => {}
                Rule::Predicate(source) => {
                    let query = self.predicate(&group, action, &source)?;
                    if query.matches(object).map_err(GateError::Evaluation)? {
                        return Ok(Decision::Allow);
                    }
                }
            }
        }

        if action == Action::Update && is_author {
            return self.decide(Action::Set, user, object);
        }

        Ok(Decision::Deny {
            reason: format!(
                "user '{}' may not {action} object '{}'",
                user.username, object.uid
            ),
        })
    }

    fn predicate(&self, group: &str, action: Action, source: &str) -> GateResult<Arc<Query>> {
        let key = (group.to_string(), action);
        if let Some(query) = self.compiled.read().map_err(poisoned)?.get(&key) {
            return Ok(Arc::clone(query));
        }
        let query = Query::parse(source).map_err(|source| GateError::InvalidRule {
            group: group.to_string(),
            action,
            source,
        })?;
        let query = Arc::new(query);
        self.compiled
            .write()
            .map_err(poisoned)?
            .insert(key, Arc::clone(&query));
        Ok(query)
    }

    #[cfg(test)]
    fn compiled_count(&self) -> usize {
        self.compiled.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl std::fmt::Debug for PermissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups = self.groups.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("PermissionEngine")
            .field("groups", &groups)
            .finish()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> GateError {
    GateError::Unavailable(format!("lock poisoned: {e}"))
}
