//! Audit metadata
//!
//! Identity and correlation metadata attached to every audit envelope, both
//! inside the merged content and on the envelope itself.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Header carrying the authenticated user id
pub const HEADER_USER_ID: &str = "CJSCPPUID";

/// Header carrying the caller's correlation id
pub const HEADER_CLIENT_CORRELATION_ID: &str = "CPPCLIENTCORRELATIONID";

/// Headers searched, in order, for the default event name
const NAME_HEADERS: [&str; 2] = ["Accept", "Content-Type"];

/// Metadata stamped on an audit envelope
///
/// Every field is optional on the wire: absent values are omitted, never
/// serialized as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// UTC, millisecond precision
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Correlation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub client: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub user: String,
}

impl AuditMetadata {
    /// Build metadata from request headers
    ///
    /// With no headers at all the result is empty (no id, name or timestamp).
    /// Otherwise a fresh id and timestamp are always stamped; `explicit_name`
    /// takes precedence over the `Accept`/`Content-Type` header value.
    pub fn generate(headers: &BTreeMap<String, String>, explicit_name: Option<&str>) -> Self {
        if headers.is_empty() {
            return Self::default();
        }

        let name = match explicit_name {
            Some(name) => Some(name.to_string()),
            None => find_header(headers, &NAME_HEADERS).map(str::to_string),
        };

        Self {
            id: Some(Uuid::new_v4()),
            name,
            created_at: Some(current_timestamp()),
            correlation: find_header(headers, &[HEADER_CLIENT_CORRELATION_ID]).map(|client| {
                Correlation {
                    client: client.to_string(),
                }
            }),
            context: find_header(headers, &[HEADER_USER_ID]).map(|user| Context {
                user: user.to_string(),
            }),
        }
    }
}

/// Value of the first header matching any of `keys`, tried in order
///
/// Names are compared case-insensitively after trimming. When several keys
/// differ only in case, the first in iteration order wins.
pub fn find_header<'a>(headers: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .find_map(|key| {
            headers
                .iter()
                .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
                .map(|(_, value)| value.as_str())
        })
}

/// Current UTC time as RFC 3339 with millisecond precision
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
