//! # sync-core
//!
//! Pure logic for FlowList sync (no I/O, instant tests).
//!
//! This crate implements the outline algorithms and session bookkeeping
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects beyond the values handed to them. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about optimistic updates
//!
//! The actual I/O (HTTP requests) is performed by `sync-client`, which
//! sends the batches these modules produce and feeds the answers back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cookie;
pub mod ops;
pub mod session;
pub mod tree;
pub mod undo;
pub mod unconfirmed;

pub use cookie::{cookie_value, parse_cookie};
pub use ops::{build_complete, build_create, build_delete, build_edit};
pub use session::{LoadedTree, SessionError, SessionState};
pub use tree::TreeError;
pub use undo::corrective_operation;
pub use unconfirmed::{OperationBatch, UnconfirmedBatches};
