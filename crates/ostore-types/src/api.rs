use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::TypeError;
use crate::object::{IndexObject, Object};
use crate::user::User;
use crate::value::Value;

const UID: &str = "_uid";
const AUTHOR: &str = "_author";
const MODIFIER: &str = "_modifier";
const CREATED: &str = "_created";
const MODIFIED: &str = "_modified";
const USERNAME: &str = "_username";
const ACTIVE: &str = "_active";
const GROUPS: &str = "_groups";

/// The flat JSON shape objects and users take on the wire.
///
/// Reserved `_`-prefixed keys carry metadata, timestamps as RFC3339
/// strings. Every other key is user data. A missing or empty `_uid` means
/// the object has not been persisted yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiObject(pub Map<String, Json>);

impl ApiObject {
    /// Encode a full object.
    pub fn from_object(object: &Object) -> Self {
        let mut map = Map::new();
        for (key, value) in &object.data {
            map.insert(key.clone(), value.to_json());
        }
        insert_meta(
            &mut map,
            &object.uid,
            &object.author,
            &object.modifier,
            object.created,
            object.modified,
        );
        Self(map)
    }

    /// Encode an index projection, as returned by queries.
    pub fn from_index(object: &IndexObject) -> Self {
        let mut map = Map::new();
        for (key, value) in &object.data {
            map.insert(key.clone(), value.to_json());
        }
        insert_meta(
            &mut map,
            &object.uid,
            &object.author,
            &object.modifier,
            object.created,
            object.modified,
        );
        Self(map)
    }

    /// Encode a user. The password hash is never included.
    pub fn from_user(user: &User) -> Self {
        let mut map = Map::new();
        map.insert(UID.into(), Json::String(user.uid.clone()));
        map.insert(USERNAME.into(), Json::String(user.username.clone()));
        map.insert(ACTIVE.into(), Json::Bool(user.active));
        map.insert(
            GROUPS.into(),
            Json::Array(user.groups.iter().cloned().map(Json::String).collect()),
        );
        map.insert(CREATED.into(), Json::String(rfc3339(user.created)));
        map.insert(MODIFIED.into(), Json::String(rfc3339(user.modified)));
        Self(map)
    }

    /// Decode into an [`Object`].
    ///
    /// Absent metadata decodes to empty strings and the unix epoch; the
    /// client facade overwrites whatever it owns anyway.
    pub fn into_object(self) -> Result<Object, TypeError> {
        let mut object = Object::default();
        let mut data = BTreeMap::new();
        for (key, value) in self.0 {
            match key.as_str() {
                UID => object.uid = meta_string(&key, &value)?,
                AUTHOR => object.author = meta_string(&key, &value)?,
                MODIFIER => object.modifier = meta_string(&key, &value)?,
                CREATED => object.created = meta_time(&key, &value)?,
                MODIFIED => object.modified = meta_time(&key, &value)?,
                _ => {
                    let v = Value::from_json(&key, &value)?;
                    data.insert(key, v);
                }
            }
        }
        object.data = data;
        Ok(object)
    }

    /// The `_uid` carried by this object, if any.
    pub fn uid(&self) -> Option<&str> {
        self.0.get(UID).and_then(Json::as_str).filter(|s| !s.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.0.get(key)
    }
}

fn insert_meta(
    map: &mut Map<String, Json>,
    uid: &str,
    author: &str,
    modifier: &str,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
) {
    map.insert(UID.into(), Json::String(uid.to_string()));
    map.insert(AUTHOR.into(), Json::String(author.to_string()));
    map.insert(MODIFIER.into(), Json::String(modifier.to_string()));
    map.insert(CREATED.into(), Json::String(rfc3339(created)));
    map.insert(MODIFIED.into(), Json::String(rfc3339(modified)));
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn meta_string(field: &str, value: &Json) -> Result<String, TypeError> {
    match value {
        Json::String(s) => Ok(s.clone()),
        Json::Null => Ok(String::new()),
        other => Err(TypeError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected string, got {other}"),
        }),
    }
}

fn meta_time(field: &str, value: &Json) -> Result<DateTime<Utc>, TypeError> {
    match value {
        Json::String(s) if s.is_empty() => Ok(DateTime::<Utc>::UNIX_EPOCH),
        Json::Null => Ok(DateTime::<Utc>::UNIX_EPOCH),
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| TypeError::InvalidTimestamp {
                field: field.to_string(),
                value: s.clone(),
            }),
        other => Err(TypeError::InvalidTimestamp {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// A request body accepted by every HTTP resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ApiObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// The response envelope returned by the HTTP facade and the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ApiObject>>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_objects(mut self, objects: Vec<ApiObject>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn with_session(mut self, session: SessionKey) -> Self {
        self.key = Some(session.key);
        self.expires = Some(session.expires);
        self
    }
}

/// A plaintext session key handed out once at login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
    pub key: String,
    pub expires: DateTime<Utc>,
}
