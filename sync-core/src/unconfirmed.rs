//! Queue of operation batches awaiting server confirmation.
//!
//! Batches flow through the queue in this order:
//! 1. `enqueue()` - recorded before the push-and-poll request goes out
//! 2. `confirm()` - removed once the server returns a new cursor
//!
//! A batch whose request fails stays queued and is replayed, in order, on
//! the next load. Enqueueing a batch that is already queued is a no-op, so
//! a replay does not duplicate its entry.
//!
//! Batches hold operations only. The transaction cursor is attached when a
//! batch is sent, so a replay goes out against the cursor of the latest load.

use flowlist_sync_types::Operation;
use serde::{Deserialize, Serialize};

/// Operations submitted together in one push-and-poll exchange.
pub type OperationBatch = Vec<Operation>;

/// Ordered queue of unconfirmed operation batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnconfirmedBatches {
    batches: Vec<OperationBatch>,
}

impl UnconfirmedBatches {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch unless an equal batch is already queued.
    ///
    /// Returns `true` if the batch was appended.
    pub fn enqueue(&mut self, batch: &[Operation]) -> bool {
        if self.contains(batch) {
            return false;
        }
        self.batches.push(batch.to_vec());
        true
    }

    /// Remove a batch the server has applied.
    ///
    /// Returns `true` if the batch was queued.
    pub fn confirm(&mut self, batch: &[Operation]) -> bool {
        match self.batches.iter().position(|b| b == batch) {
            Some(pos) => {
                self.batches.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether an equal batch is queued.
    pub fn contains(&self, batch: &[Operation]) -> bool {
        self.batches.iter().any(|b| b == batch)
    }

    /// Copy of the queued batches, oldest first.
    ///
    /// Replays iterate over this copy so the queue can change underneath.
    pub fn snapshot(&self) -> Vec<OperationBatch> {
        self.batches.clone()
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
