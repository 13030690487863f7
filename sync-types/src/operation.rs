//! Mutation descriptors sent in push-and-poll transactions.
//!
//! Field names and ordering follow the backend's JSON exactly. Unset
//! optional fields are omitted from the encoding rather than sent as
//! zero values.

use serde::{Deserialize, Serialize};

use crate::{ListId, TransactionId, WireError};

/// Parent id sent when an item is created at the root level.
pub const ROOT_PARENT_ID: &str = "None";

/// The kind of mutation an [`Operation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert a new item.
    Create,
    /// Change text and/or note.
    Edit,
    /// Mark complete.
    Complete,
    /// Clear completion.
    Uncomplete,
    /// Remove the item and its subtree.
    Delete,
}

/// One mutation, with the prior values needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Mutation kind.
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Account-relative client time in seconds.
    pub client_timestamp: i64,
    /// What to change.
    pub data: OperationData,
    /// Prior values (recorded, never applied by the client).
    pub undo_data: UndoData,
}

/// Target and new values of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationData {
    /// The item being mutated.
    #[serde(rename = "projectid")]
    pub project_id: ListId,
    /// New parent (create only); [`ROOT_PARENT_ID`] for root items.
    #[serde(rename = "parentid", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ListId>,
    /// Insertion position among the parent's children (create only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// New item text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationData {
    /// Data naming only the target item.
    pub fn target(project_id: ListId) -> Self {
        Self {
            project_id,
            parent_id: None,
            priority: None,
            name: None,
            description: None,
        }
    }
}

/// Prior completion state recorded in an undo payload.
///
/// Completing records `false`; uncompleting records the completion time
/// that is being cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviousCompletion {
    /// Was not complete.
    Flag(bool),
    /// Was complete since this account-relative time.
    At(i64),
}

/// Snapshot of prior values accompanying an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoData {
    /// Last-modified time before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_last_modified: Option<i64>,
    /// Who made the previous change (never known locally).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_last_modified_by: Option<String>,
    /// Item text before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
    /// Note before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_description: Option<String>,
    /// Completion state before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_completed: Option<PreviousCompletion>,
    /// Parent before the change.
    #[serde(rename = "parentid", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ListId>,
    /// Position before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// A batch of operations anchored to the cursor current when it was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Cursor the batch applies on top of.
    pub most_recent_operation_transaction_id: Option<TransactionId>,
    /// Operations in application order.
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Encode as the `push_poll_data` form value (a one-element JSON array).
    pub fn to_push_poll_data(&self) -> Result<String, WireError> {
        serde_json::to_string(&[self]).map_err(WireError::Serialization)
    }

    /// Decode a `push_poll_data` form value.
    pub fn list_from_push_poll_data(raw: &str) -> Result<Vec<Transaction>, WireError> {
        serde_json::from_str(raw).map_err(WireError::Deserialization)
    }
}
