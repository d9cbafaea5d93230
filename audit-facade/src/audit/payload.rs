//! Audit payload assembly
//!
//! Turns a captured body plus request metadata into the JSON envelope that is
//! published on the audit topic. Body parsing never fails: anything that is
//! not a JSON object is wrapped under `_payload`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::metadata::{current_timestamp, AuditMetadata};

/// Key holding a body that is not a JSON object
pub const PAYLOAD_KEY: &str = "_payload";

/// Key holding the content-level metadata
pub const METADATA_KEY: &str = "_metadata";

/// Shape of a captured body, resolved once per body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    /// A JSON object
    Object(Map<String, Value>),
    /// A JSON array
    Array(Vec<Value>),
    /// A JSON string, number, boolean or null
    Scalar,
    /// Empty, or not JSON at all
    Invalid,
}

impl BodyShape {
    /// Classify a raw body
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => BodyShape::Object(map),
            Ok(Value::Array(items)) => BodyShape::Array(items),
            Ok(_) => BodyShape::Scalar,
            Err(e) => {
                tracing::trace!("Audited body is not JSON: {}", e);
                BodyShape::Invalid
            }
        }
    }

    /// Whether parameters may be merged into this body
    pub fn is_object(&self) -> bool {
        matches!(self, BodyShape::Object(_))
    }
}

/// The envelope published for each audited request or response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEnvelope {
    /// Merged body, always an object with a `_metadata` key
    pub content: Map<String, Value>,
    pub timestamp: String,
    /// Context path without its leading slash
    pub origin: String,
    /// `origin` suffixed with `-api`
    pub component: String,
    #[serde(rename = "_metadata")]
    pub metadata: AuditMetadata,
}

impl AuditEnvelope {
    /// Event name used as the transport attribute
    pub fn event_name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }
}

/// Builds audit envelopes for one service
#[derive(Debug, Clone)]
pub struct PayloadAssembler {
    origin: String,
    component: String,
    event_name: Option<String>,
}

impl PayloadAssembler {
    /// Create an assembler for a service mounted at `context_path`
    ///
    /// `event_name` is stamped on the envelope metadata; the content metadata
    /// always takes its name from the request headers.
    pub fn new(context_path: &str, event_name: Option<String>) -> Self {
        let origin = context_path
            .strip_prefix('/')
            .unwrap_or(context_path)
            .to_string();
        let component = format!("{}-api", origin);

        Self {
            origin,
            component,
            event_name,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Assemble the envelope for one captured body
    pub fn assemble(
        &self,
        raw_body: &str,
        headers: &BTreeMap<String, String>,
        query_params: &BTreeMap<String, String>,
        path_params: &BTreeMap<String, String>,
    ) -> AuditEnvelope {
        AuditEnvelope {
            content: merge_content(raw_body, headers, query_params, path_params),
            timestamp: current_timestamp(),
            origin: self.origin.clone(),
            component: self.component.clone(),
            metadata: AuditMetadata::generate(headers, self.event_name.as_deref()),
        }
    }
}

/// Merge a raw body with request parameters and header-derived metadata
///
/// Parameters are only merged into object bodies: query parameters first,
/// then path parameters, so a path parameter replaces a query parameter or
/// body field of the same name. `_metadata` is written last.
pub fn merge_content(
    raw_body: &str,
    headers: &BTreeMap<String, String>,
    query_params: &BTreeMap<String, String>,
    path_params: &BTreeMap<String, String>,
) -> Map<String, Value> {
    let mut content = match BodyShape::parse(raw_body) {
        BodyShape::Object(mut map) => {
            for (key, value) in query_params.iter().chain(path_params) {
                map.insert(key.clone(), Value::String(value.clone()));
            }
            map
        }
        BodyShape::Array(items) => {
            let mut map = Map::new();
            map.insert(PAYLOAD_KEY.to_string(), Value::Array(items));
            map
        }
        BodyShape::Scalar | BodyShape::Invalid => {
            let mut map = Map::new();
            map.insert(PAYLOAD_KEY.to_string(), Value::String(raw_body.to_string()));
            map
        }
    };

    let metadata = AuditMetadata::generate(headers, None);
    match serde_json::to_value(&metadata) {
        Ok(value) => {
            content.insert(METADATA_KEY.to_string(), value);
        }
        Err(e) => {
            tracing::error!("Failed to convert audit metadata: {}", e);
            content.insert(METADATA_KEY.to_string(), Value::Object(Map::new()));
        }
    }

    content
}
