//! Remote data source configuration.

use serde::Deserialize;

/// One remote JSON endpoint used by a handler family.
///
/// The lookup key is either appended to `url` as a path segment or, when
/// `query_param` is set, sent as that query parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the endpoint.
    pub url: String,
    /// Send the key as this query parameter instead of a path segment.
    pub query_param: Option<String>,
    /// JSON pointer (RFC 6901) to the record's external identifier.
    pub source_id: Option<String>,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}
