//! Audit configuration
//!
//! Loaded from the `[audit]` section of config.toml or `AUDIT_AUDIT__*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Topic audit envelopes are published to
pub const DEFAULT_AUDIT_TOPIC: &str = "jms.topic.auditing.event";

/// Event name stamped on every outer envelope
pub const DEFAULT_AUDIT_EVENT_NAME: &str = "audit.events.audit-recorded";

/// Transport attribute carrying the event name
pub const DEFAULT_EVENT_NAME_ATTRIBUTE: &str = "CPPNAME";

/// Audit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable auditing (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File name pattern of the OpenAPI specification (e.g. "openapi.yaml")
    #[serde(default = "default_openapi_rest_spec")]
    pub openapi_rest_spec: String,

    /// Directories searched for the specification (default: ["."])
    #[serde(default = "default_spec_search_roots")]
    pub spec_search_roots: Vec<PathBuf>,

    /// Topic envelopes are published to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Fixed event name for outer envelopes
    #[serde(default = "default_event_name")]
    pub event_name: String,

    /// Name of the transport attribute carrying the event name
    #[serde(default = "default_event_name_attribute")]
    pub event_name_attribute: String,

    /// Requests whose path contains any of these are not audited
    #[serde(default = "default_excluded_routes")]
    pub excluded_routes: Vec<String>,

    /// Maximum number of request body bytes captured for auditing (default: 64 KB)
    #[serde(default = "default_body_capture_limit")]
    pub body_capture_limit: usize,

    /// Capacity of the emission queue; events beyond it are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            openapi_rest_spec: default_openapi_rest_spec(),
            spec_search_roots: default_spec_search_roots(),
            topic: default_topic(),
            event_name: default_event_name(),
            event_name_attribute: default_event_name_attribute(),
            excluded_routes: default_excluded_routes(),
            body_capture_limit: default_body_capture_limit(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl AuditConfig {
    /// Whether a request path is excluded from auditing
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_routes
            .iter()
            .any(|route| !route.is_empty() && path.contains(route.as_str()))
    }
}

fn default_true() -> bool {
    true
}

fn default_openapi_rest_spec() -> String {
    "openapi.yaml".to_string()
}

fn default_spec_search_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_topic() -> String {
    DEFAULT_AUDIT_TOPIC.to_string()
}

fn default_event_name() -> String {
    DEFAULT_AUDIT_EVENT_NAME.to_string()
}

fn default_event_name_attribute() -> String {
    DEFAULT_EVENT_NAME_ATTRIBUTE.to_string()
}

fn default_excluded_routes() -> Vec<String> {
    vec!["/health".to_string(), "/actuator".to_string()]
}

fn default_body_capture_limit() -> usize {
    65_536
}

fn default_channel_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::default();
        assert!(config.enabled);
        assert_eq!(config.topic, "jms.topic.auditing.event");
        assert_eq!(config.event_name, "audit.events.audit-recorded");
        assert_eq!(config.event_name_attribute, "CPPNAME");
        assert_eq!(config.excluded_routes, vec!["/health", "/actuator"]);
        assert_eq!(config.body_capture_limit, 65_536);
    }

    #[test]
    fn test_excluded_routes_match_by_containment() {
        let config = AuditConfig::default();
        assert!(config.is_excluded("/health"));
        assert!(config.is_excluded("/case-api/actuator/info"));
        assert!(!config.is_excluded("/case/1234/details"));
    }

    #[test]
    fn test_audit_config_partial_deserialize() {
        let config: AuditConfig =
            serde_json::from_str(r#"{"enabled": false, "topic": "audit.test"}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.topic, "audit.test");
        assert_eq!(config.openapi_rest_spec, "openapi.yaml");
        assert_eq!(config.channel_capacity, 1024);
    }
}
