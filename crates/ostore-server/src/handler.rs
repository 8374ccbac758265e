//! Request handlers.
//!
//! Every resource accepts an [`ApiRequest`] body (or query parameters for
//! `GET`) and answers with an [`ApiResponse`]. The client facade is
//! synchronous, so calls into it run on the blocking pool.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use ostore_client::ClientError;
use ostore_types::{ApiObject, ApiRequest, ApiResponse, Object};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{authenticate, Credentials};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

type ApiResult = ServerResult<Json<ApiResponse>>;

/// Query string accepted by `GET /get`.
#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
    /// Comma-separated uids.
    pub uid: Option<String>,
    pub key: Option<String>,
}

/// Query string accepted by `GET /query`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
    pub key: Option<String>,
}

/// Run `f` on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("worker task failed: {e}")))?
}

pub async fn login(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    let username = req
        .username
        .filter(|u| !u.is_empty())
        .ok_or(ClientError::MissingUsername)?;
    let password = req.password.unwrap_or_default();
    let ip = connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());

    tracing::info!("@{username} - LOGIN from {ip}");
    let client = state.client.clone();
    let (_, key) = blocking(move || Ok(client.login(&username, &password, &ip)?)).await?;
    Ok(Json(ApiResponse::ok().with_session(key)))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    let Credentials::Session(key) = Credentials::from_request(req.key, &headers) else {
        return Err(ClientError::InvalidSession.into());
    };
    let client = state.client.clone();
    blocking(move || Ok(client.logout(&key)?)).await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn get_by_params(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GetParams>,
) -> ApiResult {
    let uids = split_uids(params.uid.as_deref().unwrap_or_default());
    if uids.is_empty() {
        return Err(ClientError::MissingUid.into());
    }
    fetch(state, Credentials::from_request(params.key, &headers), uids).await
}

pub async fn get_by_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    let uids = request_uids(req.objects)?;
    fetch(state, Credentials::from_request(req.key, &headers), uids).await
}

async fn fetch(state: AppState, credentials: Credentials, uids: Vec<String>) -> ApiResult {
    let user = authenticate(&state, credentials).await?;
    tracing::info!("@{} - GET {}", user.username, uids.join(","));

    let client = state.client.clone();
    let objects = blocking(move || {
        uids.iter()
            .map(|uid| Ok(ApiObject::from_object(&client.get(uid, Some(&user))?)))
            .collect::<ServerResult<Vec<_>>>()
    })
    .await?;
    Ok(Json(ApiResponse::ok().with_objects(objects)))
}

/// Create or update objects. Returns them as persisted.
pub async fn set(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    let objects = req
        .objects
        .filter(|o| !o.is_empty())
        .ok_or(ClientError::MissingObject)?;
    let user = authenticate(&state, Credentials::from_request(req.key, &headers)).await?;
    let mut decoded = objects
        .into_iter()
        .map(ApiObject::into_object)
        .collect::<Result<Vec<Object>, _>>()?;

    let targets: Vec<&str> = decoded
        .iter()
        .map(|o| if o.uid.is_empty() { "new" } else { o.uid.as_str() })
        .collect();
    tracing::info!("@{} - SET {}", user.username, targets.join(","));

    let client = state.client.clone();
    let sync = state.config.sync_on_write;
    let saved = blocking(move || {
        let mut saved = Vec::with_capacity(decoded.len());
        for object in &mut decoded {
            client.set(object, Some(&user))?;
            saved.push(ApiObject::from_object(object));
        }
        if sync {
            client.sync()?;
        }
        Ok(saved)
    })
    .await?;
    Ok(Json(ApiResponse::ok().with_objects(saved)))
}

pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    let uids = request_uids(req.objects)?;
    let user = authenticate(&state, Credentials::from_request(req.key, &headers)).await?;
    tracing::info!("@{} - DELETE {}", user.username, uids.join(","));

    let client = state.client.clone();
    let sync = state.config.sync_on_write;
    blocking(move || {
        for uid in uids {
            client.delete(&mut Object::with_uid(uid), Some(&user))?;
        }
        if sync {
            client.sync()?;
        }
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn query_by_params(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> ApiResult {
    run_query(state, Credentials::from_request(params.key, &headers), params.q).await
}

pub async fn query_by_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApiRequest>,
) -> ApiResult {
    run_query(state, Credentials::from_request(req.key, &headers), req.query).await
}

async fn run_query(state: AppState, credentials: Credentials, expr: Option<String>) -> ApiResult {
    let expr = expr
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ClientError::InvalidArg("empty query".into()))?;
    let user = authenticate(&state, credentials).await?;
    tracing::info!("@{} - QUERY {expr}", user.username);

    let client = state.client.clone();
    let objects = blocking(move || {
        Ok(client
            .query(&expr, Some(&user))?
            .iter()
            .map(ApiObject::from_index)
            .collect())
    })
    .await?;
    Ok(Json(ApiResponse::ok().with_objects(objects)))
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "ostore-server",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.client.backend().name(),
        "sessions": state.client.sessions().len(),
    }))
}

/// Split `a,b, c` into uids, dropping blanks and repeats.
fn split_uids(raw: &str) -> Vec<String> {
    let mut uids: Vec<String> = Vec::new();
    for uid in raw.split(',').map(str::trim).filter(|u| !u.is_empty()) {
        if !uids.iter().any(|u| u == uid) {
            uids.push(uid.to_string());
        }
    }
    uids
}

/// The `_uid` of every object in a request body.
fn request_uids(objects: Option<Vec<ApiObject>>) -> ServerResult<Vec<String>> {
    let objects = objects
        .filter(|o| !o.is_empty())
        .ok_or(ClientError::MissingObject)?;
    objects
        .iter()
        .map(|o| {
            o.uid()
                .map(str::to_string)
                .ok_or(ServerError::from(ClientError::MissingUid))
        })
        .collect()
}
