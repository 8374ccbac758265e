use std::time::Duration;

use ostore_types::{ApiObject, ApiRequest, ApiResponse, SessionKey};
use reqwest::Client;
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to an ostore HTTP server with the same envelopes the server uses.
///
/// Without a session key every call acts as the server's anonymous user.
/// `login` stores the returned key and later calls send it in the body.
#[derive(Clone, Debug)]
pub struct RemoteClient {
    http: Client,
    base: String,
    key: Option<String>,
}

impl RemoteClient {
    /// A client for the server at `base_url`, e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(http, base_url))
    }

    /// Reuse an existing `reqwest` client.
    pub fn with_http(http: Client, base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base,
            key: None,
        }
    }

    /// Resume a session obtained elsewhere.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    pub async fn login(&mut self, username: &str, password: &str) -> RemoteResult<SessionKey> {
        let request = ApiRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..ApiRequest::default()
        };
        let (status, response) = self.call("login", request).await?;
        match (response.key, response.expires) {
            (Some(key), Some(expires)) => {
                self.key = Some(key.clone());
                Ok(SessionKey { key, expires })
            }
            _ => Err(RemoteError::Decode {
                status,
                reason: "login response carried no session key".into(),
            }),
        }
    }

    /// End the current session. The client acts anonymously afterwards.
    pub async fn logout(&mut self) -> RemoteResult<()> {
        if self.key.is_none() {
            return Err(RemoteError::NotLoggedIn);
        }
        self.call("logout", self.request()).await?;
        self.key = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Fetch full objects by uid, in request order.
    pub async fn get(&self, uids: &[&str]) -> RemoteResult<Vec<ApiObject>> {
        let request = ApiRequest {
            objects: Some(uid_objects(uids)?),
            ..self.request()
        };
        let (_, response) = self.call("get", request).await?;
        Ok(response.objects.unwrap_or_default())
    }

    /// Create or update objects. Returns them as stored, uids included.
    pub async fn set(&self, objects: Vec<ApiObject>) -> RemoteResult<Vec<ApiObject>> {
        if objects.is_empty() {
            return Err(RemoteError::InvalidArg("no objects to set".into()));
        }
        let request = ApiRequest {
            objects: Some(objects),
            ..self.request()
        };
        let (_, response) = self.call("set", request).await?;
        Ok(response.objects.unwrap_or_default())
    }

    pub async fn delete(&self, uids: &[&str]) -> RemoteResult<()> {
        let request = ApiRequest {
            objects: Some(uid_objects(uids)?),
            ..self.request()
        };
        self.call("delete", request).await?;
        Ok(())
    }

    /// Run a query; results are index projections.
    pub async fn query(&self, expr: &str) -> RemoteResult<Vec<ApiObject>> {
        let request = ApiRequest {
            query: Some(expr.to_string()),
            ..self.request()
        };
        let (_, response) = self.call("query", request).await?;
        Ok(response.objects.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn request(&self) -> ApiRequest {
        ApiRequest {
            key: self.key.clone(),
            ..ApiRequest::default()
        }
    }

    async fn call(&self, resource: &str, request: ApiRequest) -> RemoteResult<(u16, ApiResponse)> {
        let url = format!("{}/{resource}", self.base);
        debug!(%url, "ostore request");
        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: ApiResponse = serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode {
            status: status.as_u16(),
            reason: e.to_string(),
        })?;
        if !body.success {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: body.message.unwrap_or_else(|| status.to_string()),
            });
        }
        Ok((status.as_u16(), body))
    }
}

fn uid_objects(uids: &[&str]) -> RemoteResult<Vec<ApiObject>> {
    if uids.is_empty() {
        return Err(RemoteError::InvalidArg("no uids given".into()));
    }
    Ok(uids
        .iter()
        .map(|uid| {
            let mut map = Map::new();
            map.insert("_uid".into(), Json::String(uid.to_string()));
            ApiObject(map)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use ostore_backend::InMemoryBackend;
    use ostore_client::Client as Store;
    use ostore_crypto::PasswordParams;
    use ostore_gate::{Action, Rule, UserGroup};
    use ostore_server::{build_router, AppState, ServerConfig};
    use ostore_types::User;
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn spawn_server() -> String {
        let mut groups = BTreeMap::new();
        groups.insert(
            "anonymous".to_string(),
            UserGroup::default()
                .with_rule(Action::Get, Rule::Predicate("public = true".into()))
                .with_rule(Action::Set, Rule::Flag(true)),
        );
        groups.insert("staff".to_string(), UserGroup::allow_all());
        let store = Store::with_backend(Arc::new(InMemoryBackend::new()), groups)
            .with_password_params(PasswordParams {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            });
        let mut alice = User::new("alice").with_groups(["staff"]);
        store.set_password(&mut alice, "password1").unwrap();
        store.set_user(&mut alice).unwrap();

        let state = AppState::new(Arc::new(store), ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        format!("http://{addr}/")
    }

    fn object(value: Json) -> ApiObject {
        serde_json::from_value(value).unwrap()
    }

    async fn logged_in(base: &str) -> RemoteClient {
        let mut remote = RemoteClient::new(base).unwrap();
        remote.login("alice", "password1").await.unwrap();
        remote
    }

    #[tokio::test]
    async fn object_lifecycle_over_http() {
        let base = spawn_server().await;
        let remote = logged_in(&base).await;

        let saved = remote
            .set(vec![
                object(json!({"kind": "note", "title": "first"})),
                object(json!({"kind": "task", "title": "second"})),
            ])
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
        let note = saved[0].uid().unwrap().to_string();
        assert_eq!(saved[0].get("_author"), saved[1].get("_author"));

        let fetched = remote.get(&[&note]).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].get("title"), Some(&json!("first")));

        let found = remote.query("kind = 'note'").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid(), Some(note.as_str()));

        remote.delete(&[&note]).await.unwrap();
        let err = remote.get(&[&note]).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(remote.query("kind = 'note'").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_uid() {
        let base = spawn_server().await;
        let remote = logged_in(&base).await;
        let saved = remote.set(vec![object(json!({"n": 1}))]).await.unwrap();
        let uid = saved[0].uid().unwrap().to_string();

        let updated = remote
            .set(vec![object(json!({"_uid": uid, "n": 2}))])
            .await
            .unwrap();
        assert_eq!(updated[0].uid(), Some(uid.as_str()));
        let fetched = remote.get(&[&uid]).await.unwrap();
        assert_eq!(fetched[0].get("n"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn wrong_password_reports_unauthorized() {
        let base = spawn_server().await;
        let mut remote = RemoteClient::new(&base).unwrap();
        let err = remote.login("alice", "not-the-one").await.unwrap_err();
        assert!(matches!(err, RemoteError::Api { status: 401, .. }), "{err}");
        assert!(remote.key().is_none());
    }

    #[tokio::test]
    async fn anonymous_calls_follow_anonymous_group() {
        let base = spawn_server().await;
        let remote = RemoteClient::new(&base).unwrap();

        let saved = remote
            .set(vec![
                object(json!({"public": true, "t": "open"})),
                object(json!({"public": false, "t": "closed"})),
            ])
            .await
            .unwrap();
        let open = saved[0].uid().unwrap().to_string();
        let closed = saved[1].uid().unwrap().to_string();

        assert_eq!(remote.get(&[&open]).await.unwrap().len(), 1);
        let err = remote.get(&[&closed]).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let base = spawn_server().await;
        let mut remote = logged_in(&base).await;
        let key = remote.key().unwrap().to_string();

        remote.logout().await.unwrap();
        assert!(remote.key().is_none());
        assert!(matches!(remote.logout().await, Err(RemoteError::NotLoggedIn)));

        let stale = RemoteClient::new(&base).unwrap().with_key(key);
        let err = stale.query("kind = 'note'").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn invalid_query_is_a_client_error() {
        let base = spawn_server().await;
        let remote = logged_in(&base).await;
        let err = remote.query("kind = ").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn empty_arguments_are_rejected_locally() {
        let remote = RemoteClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(remote.get(&[]).await, Err(RemoteError::InvalidArg(_))));
        assert!(matches!(remote.set(vec![]).await, Err(RemoteError::InvalidArg(_))));
        assert!(matches!(remote.delete(&[]).await, Err(RemoteError::InvalidArg(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let remote = RemoteClient::new(format!("http://{addr}")).unwrap();
        let err = remote.query("a = 1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)), "{err}");
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let remote = RemoteClient::new("http://localhost:8081/").unwrap();
        assert_eq!(remote.base_url(), "http://localhost:8081");
    }
}
