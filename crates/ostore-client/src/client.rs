use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use ostore_backend::{open_backend, BackendExt, InMemoryBackend, KvBackend};
use ostore_crypto::{new_uid, PasswordParams};
use ostore_gate::{Action, Decision, PermissionEngine, UserGroup};
use ostore_index::{MergeOutcome, SecondaryIndex};
use ostore_query::Query;
use ostore_types::{IndexObject, Object, User, Value};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{SessionManager, DEFAULT_SESSION_TIMEOUT};

/// Backend key prefix for objects.
pub const OBJECT_PREFIX: &str = "obj_";
/// Backend key prefix for users, keyed by uid.
pub const USER_PREFIX: &str = "user_";
/// Backend key prefix mapping a sanitized username to a user uid.
pub const USERNAME_PREFIX: &str = "username_";
/// Backend key holding the serialized secondary index.
pub const INDEX_KEY: &str = "index";

pub(crate) fn object_key(uid: &str) -> String {
    format!("{OBJECT_PREFIX}{uid}")
}

/// The object store facade.
///
/// Object writes and deletes are serialized by a single write lock held for
/// the whole call, including the permission read of the stored object. The
/// index has its own lock so queries never wait on backend I/O.
pub struct Client {
    pub(crate) backend: Arc<dyn KvBackend>,
    gate: PermissionEngine,
    index: Mutex<SecondaryIndex>,
    pub(crate) write_lock: Mutex<()>,
    pub(crate) sessions: SessionManager,
    pub(crate) password: PasswordParams,
}

impl Client {
    /// Open the configured backend and validate the group rules.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let backend = open_backend(&config.storage)?;
        let client = Self::with_backend(backend, config.user_groups.clone())
            .with_session_timeout(config.session_timeout())
            .with_password_params(config.password);
        client.gate.validate()?;
        Ok(client)
    }

    /// A client over an existing backend.
    pub fn with_backend(backend: Arc<dyn KvBackend>, groups: BTreeMap<String, UserGroup>) -> Self {
        Self {
            backend,
            gate: PermissionEngine::new(groups),
            index: Mutex::new(SecondaryIndex::new()),
            write_lock: Mutex::new(()),
            sessions: SessionManager::new(DEFAULT_SESSION_TIMEOUT),
            password: PasswordParams::default(),
        }
    }

    /// A client over a fresh in-memory backend with no groups.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()), BTreeMap::new())
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.sessions = SessionManager::new(timeout);
        self
    }

    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password = params;
        self
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    pub fn permissions(&self) -> &PermissionEngine {
        &self.gate
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ---- Object operations ----

    /// Load an object, checking `get` permission against its projection.
    pub fn get(&self, uid: &str, user: Option<&User>) -> ClientResult<Object> {
        if uid.is_empty() {
            return Err(ClientError::MissingUid);
        }
        let object = self
            .load_object(uid)?
            .ok_or_else(|| ClientError::NotFound(uid.to_string()))?;
        self.authorize(Action::Get, user, &object.index())?;
        Ok(object)
    }

    /// Create or update an object.
    ///
    /// An empty uid creates. A uid with no stored object creates under that
    /// uid. Otherwise the acting user needs `update` permission on both the
    /// stored and the incoming projection, and `author`/`created` are taken
    /// from the stored record whatever the caller passed. On success
    /// `object` is replaced by what was persisted.
    pub fn set(&self, object: &mut Object, user: Option<&User>) -> ClientResult<()> {
        if let Some((key, _)) = object
            .data
            .iter()
            .find(|(_, v)| matches!(v, Value::Float(f) if !f.is_finite()))
        {
            return Err(ClientError::InvalidArg(format!(
                "field `{key}` is not a finite number"
            )));
        }
        let _guard = lock(&self.write_lock, "write")?;
        let now = Utc::now();
        let acting = user.map(|u| u.uid.clone()).unwrap_or_default();

        let existing = if object.uid.is_empty() {
            None
        } else {
            self.load_object(&object.uid)?
        };

        let mut candidate = object.clone();
        match existing {
            Some(existing) => {
                self.authorize(Action::Update, user, &existing.index())?;
                candidate.author = existing.author.clone();
                candidate.created = existing.created;
                self.authorize(Action::Update, user, &candidate.index())?;
                candidate.modified = now.max(existing.modified);
            }
            None => {
                if candidate.uid.is_empty() {
                    candidate.uid = new_uid();
                }
                candidate.author = acting.clone();
                candidate.created = now;
                candidate.modified = now;
                self.authorize(Action::Set, user, &candidate.index())?;
            }
        }
        candidate.modifier = acting;

        self.backend
            .set_json(&object_key(&candidate.uid), &candidate)?;
        lock(&self.index, "index")?.upsert(candidate.index());
        tracing::debug!(uid = %candidate.uid, modifier = %candidate.modifier, "object stored");

        *object = candidate;
        Ok(())
    }

    /// Delete a stored object. Clears `object.uid` on success.
    pub fn delete(&self, object: &mut Object, user: Option<&User>) -> ClientResult<()> {
        if object.uid.is_empty() {
            return Err(ClientError::MissingUid);
        }
        let _guard = lock(&self.write_lock, "write")?;
        let existing = self
            .load_object(&object.uid)?
            .ok_or_else(|| ClientError::NotFound(object.uid.clone()))?;
        self.authorize(Action::Delete, user, &existing.index())?;

        self.backend.delete(&object_key(&existing.uid))?;
        lock(&self.index, "index")?.remove(&existing.uid);
        self.prune_stored_index(&existing.uid)?;
        tracing::debug!(uid = %existing.uid, "object deleted");

        object.uid.clear();
        Ok(())
    }

    /// Scan the index for projections matching `expr`.
    ///
    /// Matches the acting user may not `get` are left out silently.
    pub fn query(&self, expr: &str, user: Option<&User>) -> ClientResult<Vec<IndexObject>> {
        let query = Query::parse(expr)?;
        let candidates = {
            let index = lock(&self.index, "index")?;
            let mut matched = Vec::new();
            for entry in index.iter() {
                if query.matches(entry)? {
                    matched.push(entry.clone());
                }
            }
            matched
        };

        let mut visible = Vec::with_capacity(candidates.len());
        for entry in candidates {
            if self.gate.check(Action::Get, user, &entry)?.is_allowed() {
                visible.push(entry);
            }
        }
        tracing::debug!(query = query.source(), results = visible.len(), "query");
        Ok(visible)
    }

    /// Reconcile the local index with the copy stored in the backend.
    ///
    /// The backend is read and written without holding the index lock, so
    /// queries keep running. The write lock is held throughout so a local
    /// `set` or `delete` cannot land between reading the remote copy and
    /// merging it.
    pub fn sync(&self) -> ClientResult<MergeOutcome> {
        let _guard = lock(&self.write_lock, "write")?;
        let remote: Vec<IndexObject> = self.backend.get_json(INDEX_KEY)?.unwrap_or_default();
        let (outcome, snapshot) = {
            let mut index = lock(&self.index, "index")?;
            let outcome = index.merge_remote(remote);
            let snapshot = outcome.needs_push.then(|| index.snapshot());
            (outcome, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.backend.set_json(INDEX_KEY, &snapshot)?;
        }
        tracing::debug!(
            adopted = outcome.adopted,
            pushed = outcome.needs_push,
            "index synced"
        );
        Ok(outcome)
    }

    /// A copy of every indexed projection in uid order.
    pub fn index_snapshot(&self) -> ClientResult<Vec<IndexObject>> {
        Ok(lock(&self.index, "index")?.snapshot())
    }

    /// Drop `uid` from the backend copy of the index so a later sync does
    /// not adopt it again. Other entries are left as they are.
    fn prune_stored_index(&self, uid: &str) -> ClientResult<()> {
        let Some(mut stored) = self.backend.get_json::<Vec<IndexObject>>(INDEX_KEY)? else {
            return Ok(());
        };
        let before = stored.len();
        stored.retain(|entry| entry.uid != uid);
        if stored.len() != before {
            self.backend.set_json(INDEX_KEY, &stored)?;
        }
        Ok(())
    }

    fn load_object(&self, uid: &str) -> ClientResult<Option<Object>> {
        Ok(self.backend.get_json(&object_key(uid))?)
    }

    fn authorize(&self, action: Action, user: Option<&User>, object: &IndexObject) -> ClientResult<()> {
        match self.gate.check(action, user, object)? {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => {
                tracing::debug!(%reason, "permission denied");
                Err(ClientError::Permission {
                    action,
                    uid: object.uid.clone(),
                })
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.backend.name())
            .field("gate", &self.gate)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> ClientResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| ClientError::Internal(format!("{name} lock poisoned: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostore_gate::Rule;
    use std::thread;

    fn user(uid: &str, groups: &[&str]) -> User {
        let mut u = User::new(uid).with_groups(groups.iter().copied());
        u.uid = uid.into();
        u
    }

    fn client_with(groups: &[(&str, UserGroup)]) -> Client {
        Client::with_backend(
            Arc::new(InMemoryBackend::new()),
            groups.iter().map(|(n, g)| (n.to_string(), g.clone())).collect(),
        )
    }

    fn writers() -> Client {
        client_with(&[
            (
                "writers",
                UserGroup::default()
                    .with_rule(Action::Set, Rule::Flag(true))
                    .with_rule(Action::Get, Rule::Flag(true)),
            ),
            ("admins", UserGroup::allow_all()),
        ])
    }

    // -----------------------------------------------------------------------
    // Set
    // -----------------------------------------------------------------------

    #[test]
    fn create_assigns_identity() {
        let c = writers();
        let u = user("u1", &["writers"]);
        let mut o = Object::default().field("title", "x");
        c.set(&mut o, Some(&u)).unwrap();
        assert!(!o.uid.is_empty());
        assert_eq!(o.author, "u1");
        assert_eq!(o.modifier, "u1");
        assert_eq!(o.created, o.modified);
    }

    #[test]
    fn anonymous_create_has_empty_author() {
        let c = Client::in_memory();
        let mut o = Object::default().field("title", "x");
        c.set(&mut o, None).unwrap();
        assert!(o.is_persisted());
        assert_eq!(o.author, "");
        assert_eq!(o.created, o.modified);
    }

    #[test]
    fn update_keeps_author_and_created() {
        let c = writers();
        let author = user("u1", &["writers"]);
        let admin = user("u2", &["admins"]);
        let mut o = Object::default().field("title", "x");
        c.set(&mut o, Some(&author)).unwrap();
        let (created, first_modified) = (o.created, o.modified);

        let mut forged = o.clone();
        forged.author = "mallory".into();
        forged.created = Utc::now() + chrono::Duration::days(1);
        forged.data.insert("title".into(), Value::from("y"));
        c.set(&mut forged, Some(&admin)).unwrap();

        assert_eq!(forged.author, "u1");
        assert_eq!(forged.created, created);
        assert_eq!(forged.modifier, "u2");
        assert!(forged.modified >= first_modified);

        let stored = c.get(&o.uid, None).unwrap();
        assert_eq!(stored, forged);
    }

    #[test]
    fn unknown_uid_creates_under_that_uid() {
        let c = Client::in_memory();
        let mut o = Object::with_uid("chosen-uid").field("a", 1i64);
        o.author = "someone".into();
        c.set(&mut o, None).unwrap();
        assert_eq!(o.uid, "chosen-uid");
        assert_eq!(o.author, "");
        assert!(c.get("chosen-uid", None).is_ok());
    }

    #[test]
    fn create_without_permission_is_denied_and_leaves_object_untouched() {
        let c = Client::in_memory();
        let u = user("u1", &[]);
        let mut o = Object::default().field("title", "x");
        let err = c.set(&mut o, Some(&u)).unwrap_err();
        assert!(matches!(err, ClientError::Permission { action: Action::Set, .. }));
        assert!(o.uid.is_empty());
        assert!(c.index_snapshot().unwrap().is_empty());
    }

    #[test]
    fn update_requires_permission_on_both_sides() {
        let c = client_with(&[(
            "editors",
            UserGroup::default()
                .with_rule(Action::Update, Rule::Predicate("status = 'draft'".into())),
        )]);
        let editor = user("e1", &["editors"]);
        let mut o = Object::default().field("status", "draft");
        c.set(&mut o, None).unwrap();

        let mut publish = o.clone();
        publish.data.insert("status".into(), Value::from("published"));
        let err = c.set(&mut publish, Some(&editor)).unwrap_err();
        assert!(matches!(err, ClientError::Permission { action: Action::Update, .. }));

        let mut edit = o.clone();
        edit.data.insert("body".into(), Value::from("text"));
        c.set(&mut edit, Some(&editor)).unwrap();
        assert_eq!(c.get(&o.uid, None).unwrap().data["body"], Value::from("text"));
    }

    #[test]
    fn author_may_update_with_create_permission() {
        let c = client_with(&[(
            "creators",
            UserGroup::default().with_rule(Action::Set, Rule::Flag(true)),
        )]);
        let author = user("u1", &["creators"]);
        let other = user("u2", &["creators"]);
        let mut o = Object::default().field("n", 1i64);
        c.set(&mut o, Some(&author)).unwrap();

        let mut mine = o.clone();
        c.set(&mut mine, Some(&author)).unwrap();

        let mut theirs = o.clone();
        let err = c.set(&mut theirs, Some(&other)).unwrap_err();
        assert!(matches!(err, ClientError::Permission { .. }));
    }

    #[test]
    fn modified_never_goes_backwards() {
        let c = Client::in_memory();
        let mut o = Object::default();
        c.set(&mut o, None).unwrap();
        let mut previous = o.modified;
        for _ in 0..5 {
            c.set(&mut o, None).unwrap();
            assert!(o.modified >= previous);
            previous = o.modified;
        }
    }

    // -----------------------------------------------------------------------
    // Get
    // -----------------------------------------------------------------------

    #[test]
    fn get_round_trips_data() {
        let c = Client::in_memory();
        let long = "z".repeat(500);
        let mut o = Object::default()
            .field("title", "x")
            .field("n", 3i64)
            .field("body", long.clone());
        c.set(&mut o, None).unwrap();
        let back = c.get(&o.uid, None).unwrap();
        assert_eq!(back, o);
        assert_eq!(back.data["body"], Value::String(long));
        assert_eq!(back.data["n"], Value::Int(3));
    }

    #[test]
    fn get_missing_is_not_found() {
        let c = Client::in_memory();
        assert!(matches!(c.get("nope", None), Err(ClientError::NotFound(_))));
        assert!(matches!(c.get("", None), Err(ClientError::MissingUid)));
    }

    #[test]
    fn author_reads_own_object_but_not_anonymous_ones() {
        let c = writers();
        let mut u = user("u1", &["writers"]);
        let mut mine = Object::default().field("t", "mine");
        c.set(&mut mine, Some(&u)).unwrap();
        let mut anon = Object::default().field("t", "anon");
        c.set(&mut anon, None).unwrap();

        u.groups.clear();
        assert!(c.get(&mine.uid, Some(&u)).is_ok());
        let err = c.get(&anon.uid, Some(&u)).unwrap_err();
        assert!(matches!(err, ClientError::Permission { action: Action::Get, .. }));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_removes_and_clears_uid() {
        let c = Client::in_memory();
        let mut o = Object::default().field("t", "x");
        c.set(&mut o, None).unwrap();
        let uid = o.uid.clone();
        c.delete(&mut o, None).unwrap();
        assert!(o.uid.is_empty());
        assert!(matches!(c.get(&uid, None), Err(ClientError::NotFound(_))));
        assert!(c.query("t = 'x'", None).unwrap().is_empty());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let c = Client::in_memory();
        let mut o = Object::with_uid("ghost");
        assert!(matches!(c.delete(&mut o, None), Err(ClientError::NotFound(_))));
        assert_eq!(o.uid, "ghost");
        let mut empty = Object::default();
        assert!(matches!(c.delete(&mut empty, None), Err(ClientError::MissingUid)));
    }

    #[test]
    fn delete_checks_stored_projection() {
        let c = client_with(&[(
            "janitors",
            UserGroup::default().with_rule(Action::Delete, Rule::Predicate("status = 'trash'".into())),
        )]);
        let j = user("j1", &["janitors"]);
        let mut keep = Object::default().field("status", "keep");
        c.set(&mut keep, None).unwrap();

        let mut forged = keep.clone();
        forged.data.insert("status".into(), Value::from("trash"));
        let err = c.delete(&mut forged, Some(&j)).unwrap_err();
        assert!(matches!(err, ClientError::Permission { action: Action::Delete, .. }));

        let mut trash = Object::default().field("status", "trash");
        c.set(&mut trash, None).unwrap();
        c.delete(&mut trash, Some(&j)).unwrap();
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    #[test]
    fn range_query_over_index() {
        let c = Client::in_memory();
        let mut low = Object::default().field("test_int", 50i64);
        let mut high = Object::default().field("test_int", 150i64);
        c.set(&mut low, None).unwrap();
        c.set(&mut high, None).unwrap();
        let found = c.query("test_int > 64 and test_int < 128", None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid, low.uid);
    }

    #[test]
    fn query_filters_unreadable_objects() {
        let c = client_with(&[(
            "public",
            UserGroup::default().with_rule(Action::Get, Rule::Predicate("public = true".into())),
        )]);
        let reader = user("r1", &["public"]);
        let mut open = Object::default().field("kind", "doc").field("public", true);
        let mut closed = Object::default().field("kind", "doc").field("public", false);
        c.set(&mut open, None).unwrap();
        c.set(&mut closed, None).unwrap();

        let found = c.query("kind = 'doc'", Some(&reader)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid, open.uid);
        assert_eq!(c.query("kind = 'doc'", None).unwrap().len(), 2);
    }

    #[test]
    fn query_sees_truncated_projection() {
        let c = Client::in_memory();
        let mut o = Object::default().field("body", "a".repeat(300));
        c.set(&mut o, None).unwrap();
        let q = format!("body = '{}'", "a".repeat(128));
        assert_eq!(c.query(&q, None).unwrap().len(), 1);
    }

    #[test]
    fn malformed_query_is_invalid_query() {
        let c = Client::in_memory();
        assert!(matches!(c.query("a = ", None), Err(ClientError::InvalidQuery(_))));
    }

    #[test]
    fn evaluation_error_aborts_query() {
        let c = Client::in_memory();
        let mut o = Object::default().field("flag", true);
        c.set(&mut o, None).unwrap();
        assert!(matches!(c.query("flag > 1", None), Err(ClientError::InvalidQuery(_))));
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    #[test]
    fn backend_index_lags_until_sync() {
        let c = Client::in_memory();
        let mut o = Object::default().field("title", "before");
        c.set(&mut o, None).unwrap();
        c.sync().unwrap();

        o.data.insert("title".into(), Value::from("after"));
        c.set(&mut o, None).unwrap();

        let remote: Vec<IndexObject> = c.backend().get_json(INDEX_KEY).unwrap().unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].data["title"], Value::from("before"));

        c.sync().unwrap();
        let remote: Vec<IndexObject> = c.backend().get_json(INDEX_KEY).unwrap().unwrap();
        assert_eq!(remote[0].data["title"], Value::from("after"));
    }

    #[test]
    fn sync_shares_index_between_clients() {
        let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
        let a = Client::with_backend(Arc::clone(&backend), BTreeMap::new());
        let b = Client::with_backend(Arc::clone(&backend), BTreeMap::new());

        let mut o = Object::default().field("owner", "a");
        a.set(&mut o, None).unwrap();
        assert!(a.sync().unwrap().needs_push);

        assert!(b.query("owner = 'a'", None).unwrap().is_empty());
        let outcome = b.sync().unwrap();
        assert_eq!(outcome.adopted, 1);
        assert_eq!(b.query("owner = 'a'", None).unwrap().len(), 1);
    }

    #[test]
    fn deleted_object_stays_deleted_after_sync() {
        let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
        let a = Client::with_backend(Arc::clone(&backend), BTreeMap::new());
        let mut gone = Object::default().field("t", "gone");
        let mut kept = Object::default().field("t", "kept");
        a.set(&mut gone, None).unwrap();
        a.set(&mut kept, None).unwrap();
        a.sync().unwrap();

        a.delete(&mut gone, None).unwrap();
        a.sync().unwrap();
        assert!(a.query("t = 'gone'", None).unwrap().is_empty());

        let b = Client::with_backend(backend, BTreeMap::new());
        b.sync().unwrap();
        assert!(b.query("t = 'gone'", None).unwrap().is_empty());
        assert_eq!(b.query("t = 'kept'", None).unwrap().len(), 1);
    }

    #[test]
    fn sync_on_empty_store_writes_nothing() {
        let c = Client::in_memory();
        let outcome = c.sync().unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert!(c.backend().get(INDEX_KEY).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn new_rejects_invalid_rules() {
        let mut config = ClientConfig::default();
        config.user_groups.insert(
            "broken".into(),
            UserGroup::default().with_rule(Action::Get, Rule::Predicate("(".into())),
        );
        assert!(matches!(Client::new(config), Err(ClientError::Gate(_))));
    }

    #[test]
    fn new_opens_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage: ostore_backend::BackendConfig::File {
                path: dir.path().to_path_buf(),
            },
            ..ClientConfig::default()
        };
        let c = Client::new(config.clone()).unwrap();
        let mut o = Object::default().field("k", "v");
        c.set(&mut o, None).unwrap();
        c.sync().unwrap();

        let reopened = Client::new(config).unwrap();
        assert_eq!(reopened.get(&o.uid, None).unwrap(), o);
        reopened.sync().unwrap();
        assert_eq!(reopened.query("k = 'v'", None).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_sets_all_land() {
        let c = Arc::new(Client::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    let mut o = Object::default().field("i", i as i64);
                    c.set(&mut o, None).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.index_snapshot().unwrap().len(), 8);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let c = Client::in_memory();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut o = Object::default().field("ok", 1.5).field("x", bad);
            let err = c.set(&mut o, None).unwrap_err();
            assert!(matches!(err, ClientError::InvalidArg(msg) if msg.contains("`x`")));
            assert!(o.uid.is_empty());
        }
        assert!(c.index_snapshot().unwrap().is_empty());
        c.sync().unwrap();
    }

    fn stored_uids(c: &Client) -> Vec<String> {
        c.index_snapshot()
            .unwrap()
            .into_iter()
            .map(|e| e.uid)
            .filter(|uid| c.backend().get(&object_key(uid)).unwrap().is_some())
            .collect()
    }

    #[test]
    fn concurrent_set_and_delete_on_one_uid_agree() {
        let c = Arc::new(Client::in_memory());
        let uid = "contested".to_string();
        let writer = {
            let (c, uid) = (Arc::clone(&c), uid.clone());
            thread::spawn(move || {
                for i in 0..200i64 {
                    let mut o = Object::with_uid(uid.clone()).field("i", i);
                    c.set(&mut o, None).unwrap();
                }
            })
        };
        let deleter = {
            let (c, uid) = (Arc::clone(&c), uid.clone());
            thread::spawn(move || {
                for _ in 0..200 {
                    match c.delete(&mut Object::with_uid(uid.clone()), None) {
                        Ok(()) | Err(ClientError::NotFound(_)) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        };
        writer.join().unwrap();
        deleter.join().unwrap();

        let in_backend = c.backend().get(&object_key(&uid)).unwrap().is_some();
        let in_index = c.index_snapshot().unwrap().iter().any(|e| e.uid == uid);
        assert_eq!(in_backend, in_index);
        if in_backend {
            assert_eq!(c.query("i = 199", None).unwrap().len(), 1);
        }
    }

    #[test]
    fn sync_during_deletes_leaves_no_ghosts() {
        let c = Arc::new(Client::in_memory());
        let writer = {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for i in 0..100i64 {
                    let mut o = Object::default().field("i", i);
                    c.set(&mut o, None).unwrap();
                    if i % 2 == 0 {
                        c.delete(&mut o, None).unwrap();
                    }
                }
            })
        };
        let syncer = {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for _ in 0..100 {
                    c.sync().unwrap();
                }
            })
        };
        writer.join().unwrap();
        syncer.join().unwrap();
        c.sync().unwrap();

        let index = c.index_snapshot().unwrap();
        assert_eq!(index.len(), 50);
        assert_eq!(stored_uids(&c).len(), 50);
        let remote: Vec<IndexObject> = c.backend().get_json(INDEX_KEY).unwrap().unwrap();
        assert_eq!(remote.len(), 50);
    }

    #[test]
    fn client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }
}
