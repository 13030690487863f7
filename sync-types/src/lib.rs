//! # sync-types
//!
//! Wire format types for the FlowList sync protocol.
//!
//! This crate provides the foundational types used across all FlowList crates:
//! - [`ListId`], [`TransactionId`] - Identity and ordering types
//! - [`ListNode`] - Shared handle onto one outline item
//! - [`Operation`], [`Transaction`] - Mutation descriptors pushed to the backend
//! - [`InitializationData`], [`PushPollResponse`] - Server payloads
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod list;
mod messages;
mod operation;

pub use error::WireError;
pub use ids::{ListId, TransactionId};
pub use list::{ListData, ListNode};
pub use messages::{
    InitializationData, ProjectTreeData, ProjectTreeInfo, PushPollResponse, PushPollResult,
    Settings, USER_ID_GLOBAL,
};
pub use operation::{
    Operation, OperationData, OperationKind, PreviousCompletion, Transaction, UndoData,
    ROOT_PARENT_ID,
};
