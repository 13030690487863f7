//! Corrective operations derived from undo payloads.
//!
//! The client never undoes anything on its own. This is the hook a
//! collaborator can use to reverse a confirmed mutation: it turns an
//! operation into the operation that reverts it, where the wire payload
//! carries enough to do so.

use flowlist_sync_types::{Operation, OperationKind, PreviousCompletion};

use crate::ops;

/// The operation that reverts `op`, stamped with `time`.
///
/// | applied      | corrective                                   |
/// |--------------|----------------------------------------------|
/// | `create`     | `delete` of the same item                    |
/// | `complete`   | `uncomplete`                                 |
/// | `uncomplete` | `complete`, if a prior completion time was recorded |
/// | `edit`       | none (prior text is not recorded)            |
/// | `delete`     | none (prior position is not recorded)        |
pub fn corrective_operation(op: &Operation, time: i64) -> Option<Operation> {
    let id = &op.data.project_id;
    let last_modified = op.client_timestamp;

    match op.kind {
        OperationKind::Create => Some(ops::build_delete(id, last_modified, time)),
        OperationKind::Complete => Some(ops::build_complete(
            id,
            false,
            Some(op.client_timestamp),
            last_modified,
            time,
        )),
        OperationKind::Uncomplete => match op.undo_data.previous_completed {
            Some(PreviousCompletion::At(_)) => Some(ops::build_complete(
                id,
                true,
                None,
                last_modified,
                time,
            )),
            _ => None,
        },
        OperationKind::Edit | OperationKind::Delete => None,
    }
}
