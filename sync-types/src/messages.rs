//! Server payloads: the initialization snapshot and push-and-poll results.
//!
//! Only the fields the client reads are modelled; everything else the
//! backend sends is ignored on decode. Fields the client requires are still
//! `Option` here so that a missing field surfaces as a typed error at the
//! session layer instead of an opaque decode failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ListNode, TransactionId, WireError};

/// Name of the global carrying the numeric user id.
pub const USER_ID_GLOBAL: &str = "USER_ID";

/// Response to `get_initialization_data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationData {
    /// The outline and its sync metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_tree_data: Option<ProjectTreeData>,
    /// `[name, value]` pairs of account globals.
    #[serde(default)]
    pub globals: Option<Vec<Vec<Value>>>,
    /// Account settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl InitializationData {
    /// Decode a response body.
    pub fn from_json(body: &str) -> Result<Self, WireError> {
        serde_json::from_str(body).map_err(WireError::Deserialization)
    }

    /// Encode as a response body.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }

    /// Value of the `USER_ID` global, rendered as text.
    ///
    /// Pairs that are not exactly two elements long are skipped. When the
    /// global appears more than once the last occurrence wins.
    pub fn user_id(&self) -> Option<String> {
        let mut found = None;
        for pair in self.globals.iter().flatten() {
            if pair.len() != 2 {
                continue;
            }
            if global_text(&pair[0]).as_deref() == Some(USER_ID_GLOBAL) {
                found = global_text(&pair[1]);
            }
        }
        found
    }
}

fn global_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Outline data within the initialization snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTreeData {
    /// Identifier the backend assigned to this client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// The account's own outline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_project_tree_info: Option<ProjectTreeInfo>,
}

/// The account's outline and its cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTreeInfo {
    /// Starting transaction cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_most_recent_operation_transaction_id: Option<TransactionId>,
    /// Account creation time (Unix seconds); all item times are relative to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined_timestamp_in_seconds: Option<i64>,
    /// Root items in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_project_children: Option<Vec<ListNode>>,
}

/// Account settings within the initialization snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Login name (an email address by convention).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Response to `push_and_poll`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPollResponse {
    /// One result per submitted transaction.
    #[serde(default)]
    pub results: Vec<PushPollResult>,
}

impl PushPollResponse {
    /// Decode a response body.
    pub fn from_json(body: &str) -> Result<Self, WireError> {
        serde_json::from_str(body).map_err(WireError::Deserialization)
    }

    /// Encode as a response body.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }

    /// The cursor returned for the first (and only) transaction.
    pub fn new_transaction_id(&self) -> Option<&TransactionId> {
        self.results
            .first()
            .and_then(|r| r.new_most_recent_operation_transaction_id.as_ref())
    }
}

/// Outcome of one submitted transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPollResult {
    /// Cursor to send with the next batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_most_recent_operation_transaction_id: Option<TransactionId>,
    /// Suggested polling interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_polling_interval_in_ms: Option<i64>,
    /// Whether applying remote operations failed server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_encountered_in_remote_operations: Option<bool>,
}
