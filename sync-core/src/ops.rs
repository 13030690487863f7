//! Operation builder.
//!
//! Pure constructors for the mutation descriptors pushed to the backend.
//! Each pairs the new values with an undo payload holding the prior values
//! known locally. The undo payload is recorded and sent but never applied
//! by the client; see [`crate::undo`] for turning it into a corrective
//! operation.

use flowlist_sync_types::{
    ListId, Operation, OperationData, OperationKind, PreviousCompletion, UndoData, ROOT_PARENT_ID,
};

/// Insert `new_id` under `parent_id` (root level when `None`) at `insert_index`.
///
/// The index is sent as given; clamping only applies to the local tree.
pub fn build_create(
    new_id: &ListId,
    parent_id: Option<&ListId>,
    insert_index: i64,
    time: i64,
) -> Operation {
    let parent = parent_id
        .cloned()
        .unwrap_or_else(|| ListId::from(ROOT_PARENT_ID));

    Operation {
        kind: OperationKind::Create,
        client_timestamp: time,
        data: OperationData {
            parent_id: Some(parent),
            priority: Some(insert_index),
            ..OperationData::target(new_id.clone())
        },
        undo_data: UndoData::default(),
    }
}

/// Change the text and/or note of `id`.
///
/// Returns `None` when neither is given. Only the fields being changed
/// appear in the payload.
pub fn build_edit(
    id: &ListId,
    name: Option<&str>,
    description: Option<&str>,
    previous_last_modified: i64,
    time: i64,
) -> Option<Operation> {
    if name.is_none() && description.is_none() {
        return None;
    }

    Some(Operation {
        kind: OperationKind::Edit,
        client_timestamp: time,
        data: OperationData {
            name: name.map(str::to_owned),
            description: description.map(str::to_owned),
            ..OperationData::target(id.clone())
        },
        undo_data: UndoData {
            previous_last_modified: Some(previous_last_modified),
            previous_last_modified_by: None,
            ..UndoData::default()
        },
    })
}

/// Mark `id` complete (`complete == true`) or clear its completion.
///
/// `prior_completion` is the completion time the item had before this
/// change. Completing records `false` as the previous state; uncompleting
/// records that prior time.
pub fn build_complete(
    id: &ListId,
    complete: bool,
    prior_completion: Option<i64>,
    previous_last_modified: i64,
    time: i64,
) -> Operation {
    let (kind, previous_completed) = if complete {
        (OperationKind::Complete, Some(PreviousCompletion::Flag(false)))
    } else {
        (
            OperationKind::Uncomplete,
            prior_completion.map(PreviousCompletion::At),
        )
    };

    Operation {
        kind,
        client_timestamp: time,
        data: OperationData::target(id.clone()),
        undo_data: UndoData {
            previous_last_modified: Some(previous_last_modified),
            previous_last_modified_by: None,
            previous_completed,
            ..UndoData::default()
        },
    }
}

/// Remove `id` and its subtree.
pub fn build_delete(id: &ListId, previous_last_modified: i64, time: i64) -> Operation {
    Operation {
        kind: OperationKind::Delete,
        client_timestamp: time,
        data: OperationData::target(id.clone()),
        undo_data: UndoData {
            previous_last_modified: Some(previous_last_modified),
            previous_last_modified_by: None,
            ..UndoData::default()
        },
    }
}
