//! Records exchanged with the model service.

use crate::acl::AccessControl;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A named set of users that permissions can be granted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Service-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// A model entry as listed by the service, with its ACL resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier, also the key for updates.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Object kind reported by the service (usually `model`).
    pub object: String,
    /// Creation time as a unix timestamp.
    pub created: i64,
    /// Owner reported by the service (e.g. `openai`, `ollama`).
    pub owned_by: String,
    /// Whether the model is enabled.
    pub is_active: bool,
    /// Current permissions.
    pub access_control: AccessControl,
    /// Pipe definition for function-backed models, passed through untouched.
    ///
    /// `Some(Value::Null)` records an explicit `null` in the listing, which is
    /// sent back as such; `None` means the key was absent.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub pipe: Option<Value>,
}

/// Envelope of the models listing.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    pub(crate) data: Vec<ModelRecord>,
}

/// A model exactly as the listing returns it.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelRecord {
    id: String,
    name: String,
    object: String,
    created: i64,
    owned_by: String,
    #[serde(default)]
    info: Option<ModelInfo>,
    #[serde(default, deserialize_with = "non_empty_acl")]
    access_control: Option<AccessControl>,
    #[serde(default, deserialize_with = "present")]
    pipe: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default = "active_by_default")]
    is_active: Value,
    #[serde(default, deserialize_with = "non_empty_acl")]
    access_control: Option<AccessControl>,
}

const fn active_by_default() -> Value {
    Value::Bool(true)
}

// Keeps an explicit `null` apart from a missing key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

// `null` and `{}` both mean "not set here".
fn non_empty_acl<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<AccessControl>, D::Error> {
    Option::<Map<String, Value>>::deserialize(deserializer)?
        .filter(|fields| !fields.is_empty())
        .map(|fields| AccessControl::deserialize(Value::Object(fields)).map_err(de::Error::custom))
        .transpose()
}

// Flags are taken loosely: `null`, `0`, `""` and empty containers are off.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

impl ModelRecord {
    /// Resolve the `info` fallbacks: active unless `info` says otherwise, and
    /// the model-level ACL before the nested one.
    pub(crate) fn into_model(self) -> Model {
        let (is_active, info_acl) = match self.info {
            Some(info) => (is_truthy(&info.is_active), info.access_control),
            None => (true, None),
        };
        let access_control = self.access_control.or(info_acl).unwrap_or_default();

        Model {
            id: self.id,
            name: self.name,
            object: self.object,
            created: self.created,
            owned_by: self.owned_by,
            is_active,
            access_control,
            pipe: self.pipe,
        }
    }
}

/// Model capabilities advertised in the regenerated metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Image input support.
    pub vision: bool,
    /// Citation rendering support.
    pub citations: bool,
}

/// Descriptive metadata written by every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelMeta {
    /// Avatar shown next to the model.
    pub profile_image_url: String,
    /// Description shown in the model picker.
    pub description: String,
    /// Starter prompts; always `null`.
    pub suggestion_prompts: Option<Vec<String>>,
    /// Tags; always empty.
    pub tags: Vec<String>,
    /// Advertised capabilities.
    pub capabilities: Capabilities,
    /// Tools enabled for the model.
    #[serde(rename = "toolIds")]
    pub tool_ids: Vec<String>,
}

impl Default for ModelMeta {
    fn default() -> Self {
        Self {
            profile_image_url: "/static/favicon.png".to_string(),
            description: String::new(),
            suggestion_prompts: None,
            tags: Vec::new(),
            capabilities: Capabilities {
                vision: true,
                citations: true,
            },
            tool_ids: vec!["web_search".to_string()],
        }
    }
}

/// Body of a model update request.
///
/// The service replaces the whole record, so the payload is rebuilt from the
/// listed model with default metadata, `is_active` forced to `true`, and only
/// read groups in the ACL. Updating a disabled model therefore enables it and
/// any custom description, tags or write access are lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePayload {
    /// Model identifier.
    pub id: String,
    /// Base model; always `null`.
    pub base_model_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Regenerated metadata.
    pub meta: ModelMeta,
    /// Model parameters; always empty.
    pub params: Map<String, Value>,
    /// Object kind.
    pub object: String,
    /// Original creation time.
    pub created: i64,
    /// Owner.
    pub owned_by: String,
    /// Always `true`.
    pub is_active: bool,
    /// Pipe definition, when the model has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipe: Option<Value>,
    /// New permissions.
    pub access_control: AccessControl,
    /// Time of the update call.
    pub updated_at: i64,
    /// Same as `updated_at`.
    pub created_at: i64,
}

impl UpdatePayload {
    /// Build the update for `model` granting read access to `read_group_ids`.
    #[must_use]
    pub fn new(model: &Model, read_group_ids: BTreeSet<String>, now: i64) -> Self {
        Self {
            id: model.id.clone(),
            base_model_id: None,
            name: model.name.clone(),
            meta: ModelMeta::default(),
            params: Map::new(),
            object: model.object.clone(),
            created: model.created,
            owned_by: model.owned_by.clone(),
            is_active: true,
            pipe: model.pipe.clone(),
            access_control: AccessControl::read_groups_only(read_group_ids),
            updated_at: now,
            created_at: now,
        }
    }
}

/// Raw result of an update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, kept for diagnostics only.
    pub body: String,
}

impl UpdateResponse {
    /// Whether the service accepted the update (status 200).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 200
    }
}
