//! Session state for one logged-in account.
//!
//! [`SessionState`] holds everything the client knows about a session: the
//! token, the identifiers the backend hands out, the transaction cursor,
//! the outline and the queue of batches not yet confirmed.
//!
//! The methods here apply optimistic mutations to the outline and return
//! the operations to push, without doing any I/O. The caller is
//! responsible for sending them and then calling
//! [`SessionState::confirm_push`] with the server's answer.

use std::fmt;

use flowlist_sync_types::{
    InitializationData, ListId, ListNode, Operation, PushPollResponse, Transaction, TransactionId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ops;
use crate::tree::{self, TreeError};
use crate::unconfirmed::{OperationBatch, UnconfirmedBatches};

/// Errors from session bookkeeping.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The initialization snapshot lacks a required field.
    #[error("initialization data is missing {0}")]
    MissingField(&'static str),

    /// The push-and-poll response carries no new transaction cursor.
    #[error("push-and-poll response has no transaction id")]
    MissingCursor,

    /// The session blob could not be encoded or decoded.
    #[error("invalid session blob: {0}")]
    Blob(#[source] serde_json::Error),
}

/// Fields extracted from an initialization snapshot.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    /// Client id assigned by the backend.
    pub client_id: String,
    /// Account login name.
    pub username: String,
    /// Numeric user id, as text.
    pub user_id: Option<String>,
    /// Starting transaction cursor.
    pub transaction_id: TransactionId,
    /// Account creation time (Unix seconds).
    pub date_joined: i64,
    /// Canonical root items.
    pub roots: Vec<ListNode>,
}

impl LoadedTree {
    /// Extract the fields a session needs, failing on any that are missing.
    pub fn from_initialization(data: InitializationData) -> Result<Self, SessionError> {
        let user_id = data.user_id();

        let username = data
            .settings
            .and_then(|s| s.username)
            .ok_or(SessionError::MissingField("settings.username"))?;
        let tree = data
            .project_tree_data
            .ok_or(SessionError::MissingField("projectTreeData"))?;
        let client_id = tree
            .client_id
            .ok_or(SessionError::MissingField("projectTreeData.clientId"))?;
        let info = tree
            .main_project_tree_info
            .ok_or(SessionError::MissingField("mainProjectTreeInfo"))?;
        let transaction_id = info.initial_most_recent_operation_transaction_id.ok_or(
            SessionError::MissingField("initialMostRecentOperationTransactionId"),
        )?;
        let date_joined = info
            .date_joined_timestamp_in_seconds
            .ok_or(SessionError::MissingField("dateJoinedTimestampInSeconds"))?;
        let roots = info
            .root_project_children
            .ok_or(SessionError::MissingField("rootProjectChildren"))?;

        Ok(Self {
            client_id,
            username,
            user_id,
            transaction_id,
            date_joined,
            roots,
        })
    }
}

/// Mutable record of an authenticated session.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    session_token: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    initial_transaction_id: Option<TransactionId>,
    #[serde(default)]
    current_transaction_id: Option<TransactionId>,
    #[serde(default)]
    date_joined: i64,
    #[serde(default)]
    roots: Vec<ListNode>,
    #[serde(default)]
    unconfirmed: UnconfirmedBatches,
}

impl SessionState {
    /// A fresh session holding only its token. Nothing is loaded yet.
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            ..Self::default()
        }
    }

    /// Decode a blob produced by [`SessionState::to_blob`].
    pub fn from_blob(blob: &str) -> Result<Self, SessionError> {
        serde_json::from_str(blob).map_err(SessionError::Blob)
    }

    /// Encode the whole session, including unconfirmed batches, as text.
    pub fn to_blob(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(SessionError::Blob)
    }

    /// The `sessionid` cookie value.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Client id assigned by the backend.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Account login name.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Numeric user id, as text.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Cursor delivered by the most recent load.
    pub fn initial_transaction_id(&self) -> Option<&TransactionId> {
        self.initial_transaction_id.as_ref()
    }

    /// Cursor the next batch will be anchored to.
    pub fn current_transaction_id(&self) -> Option<&TransactionId> {
        self.current_transaction_id.as_ref()
    }

    /// Account creation time (Unix seconds).
    pub fn date_joined(&self) -> i64 {
        self.date_joined
    }

    /// Root items in display order.
    pub fn roots(&self) -> &[ListNode] {
        &self.roots
    }

    /// Batches pushed but not yet confirmed.
    pub fn unconfirmed(&self) -> &UnconfirmedBatches {
        &self.unconfirmed
    }

    /// Seconds since the account was created.
    pub fn client_time(&self, now_unix_secs: i64) -> i64 {
        now_unix_secs - self.date_joined
    }

    /// Install a freshly loaded snapshot.
    ///
    /// The outline is reconciled so existing handles stay valid, and both
    /// cursors restart from the snapshot's. Unconfirmed batches are kept
    /// for replay. On error nothing is changed.
    pub fn apply_load(&mut self, loaded: LoadedTree) -> Result<(), TreeError> {
        let roots = tree::reconcile(&self.roots, &loaded.roots)?;

        self.roots = roots;
        self.client_id = Some(loaded.client_id);
        self.username = Some(loaded.username);
        if loaded.user_id.is_some() {
            self.user_id = loaded.user_id;
        }
        self.initial_transaction_id = Some(loaded.transaction_id.clone());
        self.current_transaction_id = Some(loaded.transaction_id);
        self.date_joined = loaded.date_joined;
        Ok(())
    }

    /// Record `batch` as unconfirmed (unless it already is) and wrap it in
    /// a transaction anchored to the current cursor.
    pub fn begin_push(&mut self, batch: &[Operation]) -> Transaction {
        self.unconfirmed.enqueue(batch);
        Transaction {
            most_recent_operation_transaction_id: self.current_transaction_id.clone(),
            operations: batch.to_vec(),
        }
    }

    /// Apply the server's answer to a pushed batch.
    ///
    /// The batch leaves the queue once the server has answered. The cursor
    /// advances to the one returned; a response without one is an error.
    pub fn confirm_push(
        &mut self,
        batch: &[Operation],
        response: &PushPollResponse,
    ) -> Result<TransactionId, SessionError> {
        self.unconfirmed.confirm(batch);
        let cursor = response
            .new_transaction_id()
            .cloned()
            .ok_or(SessionError::MissingCursor)?;
        self.current_transaction_id = Some(cursor.clone());
        Ok(cursor)
    }

    /// Insert a proxy item under `parent` (root level when `None`).
    ///
    /// `insert_index` defaults to 0. Indices past the end append and
    /// negative indices insert first; the unclamped index is what gets
    /// sent. Returns the proxy and the batch to push: a create, followed by
    /// an edit when a name or note is given.
    pub fn create_list(
        &mut self,
        parent: Option<&ListNode>,
        insert_index: Option<i64>,
        name: Option<&str>,
        description: Option<&str>,
        time: i64,
    ) -> (ListNode, OperationBatch) {
        let id = ListId::new();
        let index = insert_index.unwrap_or(0);
        let proxy = ListNode::proxy(
            id.clone(),
            name.map(str::to_owned),
            description.map(str::to_owned),
            time,
        );

        match parent {
            Some(parent) => parent.with_children_mut(|children| {
                insert_clamped(children.get_or_insert_with(Vec::new), index, proxy.clone())
            }),
            None => insert_clamped(&mut self.roots, index, proxy.clone()),
        }

        let parent_id = parent.map(ListNode::id);
        let mut batch = vec![ops::build_create(&id, parent_id.as_ref(), index, time)];
        if let Some(edit) = ops::build_edit(&id, name, description, time + 1, time) {
            batch.push(edit);
        }
        (proxy, batch)
    }

    /// Change the text and/or note of `target`.
    ///
    /// An empty note clears it locally, but is sent to the server as-is.
    /// Returns `None`, leaving the item untouched, when neither is given.
    pub fn edit_list(
        &mut self,
        target: &ListNode,
        new_name: Option<&str>,
        new_description: Option<&str>,
        time: i64,
    ) -> Option<OperationBatch> {
        let previous_last_modified = target.last_modified();
        let edit = ops::build_edit(
            &target.id(),
            new_name,
            new_description,
            previous_last_modified,
            time,
        )?;

        if let Some(name) = new_name {
            target.set_name(Some(name.to_owned()));
        }
        if let Some(description) = new_description {
            target.set_description(Some(description.to_owned()).filter(|d| !d.is_empty()));
        }
        target.set_last_modified(time);

        Some(vec![edit])
    }

    /// Mark `target` complete, or clear its completion.
    pub fn complete_list(&mut self, target: &ListNode, complete: bool, time: i64) -> OperationBatch {
        let previous_last_modified = target.last_modified();
        let prior_completion = target.completed_at();

        target.set_completed_at(complete.then_some(time));
        target.set_last_modified(time);

        vec![ops::build_complete(
            &target.id(),
            complete,
            prior_completion,
            previous_last_modified,
            time,
        )]
    }

    /// Detach `target` from its parent (or from the roots).
    ///
    /// A handle that is no longer in the outline is only stamped; the
    /// delete is still sent.
    pub fn delete_list(&mut self, target: &ListNode, time: i64) -> OperationBatch {
        let id = target.id();
        let previous_last_modified = target.last_modified();
        target.set_last_modified(time);

        if tree::is_root(&self.roots, &id) {
            self.roots.retain(|n| !n.has_id(&id));
        } else if let Some(parent) = tree::find_parent(&self.roots, &id) {
            parent.with_children_mut(|children| {
                if let Some(children) = children {
                    children.retain(|n| !n.has_id(&id));
                }
            });
        }

        vec![ops::build_delete(&id, previous_last_modified, time)]
    }
}

fn insert_clamped(list: &mut Vec<ListNode>, index: i64, node: ListNode) {
    match usize::try_from(index) {
        Ok(i) if i < list.len() => list.insert(i, node),
        Ok(_) => list.push(node),
        Err(_) => list.insert(0, node),
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("current_transaction_id", &self.current_transaction_id)
            .field("date_joined", &self.date_joined)
            .field("roots", &self.roots.len())
            .field("unconfirmed", &self.unconfirmed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlist_sync_types::{ListData, OperationKind, PreviousCompletion, PushPollResult};

    const SNAPSHOT: &str = r#"{
        "settings": {"username": "me@example.com"},
        "projectTreeData": {
            "clientId": "client-1",
            "mainProjectTreeInfo": {
                "initialMostRecentOperationTransactionId": "100",
                "dateJoinedTimestampInSeconds": 1000,
                "rootProjectChildren": [
                    {"id": "a", "nm": "todo", "lm": 10, "ch": [
                        {"id": "b", "nm": "milk", "lm": 11},
                        {"id": "c", "nm": "eggs", "cp": 12, "lm": 12}
                    ]},
                    {"id": "d", "nm": "ideas", "lm": 13}
                ]
            }
        },
        "globals": [["USER_ID", 77]]
    }"#;

    fn loaded() -> LoadedTree {
        let data = InitializationData::from_json(SNAPSHOT).unwrap();
        LoadedTree::from_initialization(data).unwrap()
    }

    fn session() -> SessionState {
        let mut state = SessionState::new("token");
        state.apply_load(loaded()).unwrap();
        state
    }

    fn node(state: &SessionState, id: &str) -> ListNode {
        tree::find_by_id(state.roots(), &ListId::from(id)).unwrap()
    }

    fn names(nodes: &[ListNode]) -> Vec<String> {
        nodes.iter().map(|n| n.name().unwrap_or_default()).collect()
    }

    fn response(cursor: Option<&str>) -> PushPollResponse {
        PushPollResponse {
            results: vec![PushPollResult {
                new_most_recent_operation_transaction_id: cursor.map(TransactionId::new),
                ..PushPollResult::default()
            }],
        }
    }

    // ===========================================
    // Loading
    // ===========================================

    #[test]
    fn load_populates_session_fields() {
        let state = session();

        assert_eq!(state.client_id(), Some("client-1"));
        assert_eq!(state.username(), Some("me@example.com"));
        assert_eq!(state.user_id(), Some("77"));
        assert_eq!(state.initial_transaction_id(), Some(&TransactionId::new("100")));
        assert_eq!(state.current_transaction_id(), Some(&TransactionId::new("100")));
        assert_eq!(state.date_joined(), 1000);
        assert_eq!(names(state.roots()), vec!["todo", "ideas"]);
        assert_eq!(state.client_time(1500), 500);
    }

    #[test]
    fn load_rejects_missing_fields() {
        let data = InitializationData::from_json(r#"{"settings":{"username":"x"}}"#).unwrap();
        let err = LoadedTree::from_initialization(data).unwrap_err();
        assert!(matches!(err, SessionError::MissingField("projectTreeData")));

        let data = InitializationData::from_json("{}").unwrap();
        let err = LoadedTree::from_initialization(data).unwrap_err();
        assert!(matches!(err, SessionError::MissingField("settings.username")));
    }

    #[test]
    fn reload_preserves_handles_and_resets_cursor() {
        let mut state = session();
        let milk = node(&state, "b");
        state.confirm_push(&[], &response(Some("105"))).unwrap();

        state.apply_load(loaded()).unwrap();

        assert!(ListNode::ptr_eq(&milk, &node(&state, "b")));
        assert_eq!(state.current_transaction_id(), Some(&TransactionId::new("100")));
    }

    #[test]
    fn rejected_load_changes_nothing() {
        let mut state = session();
        let milk = node(&state, "b");
        state.confirm_push(&[], &response(Some("105"))).unwrap();

        let mut bad = loaded();
        bad.transaction_id = TransactionId::new("200");
        bad.roots = vec![
            ListNode::new(ListData {
                name: Some("first".into()),
                ..ListData::new(ListId::from("b"))
            }),
            ListNode::new(ListData {
                name: Some("second".into()),
                ..ListData::new(ListId::from("b"))
            }),
        ];

        assert_eq!(state.apply_load(bad), Err(TreeError::ReconciliationMismatch));
        assert_eq!(milk.name().as_deref(), Some("milk"));
        assert_eq!(names(state.roots()), vec!["todo", "ideas"]);
        assert_eq!(state.current_transaction_id(), Some(&TransactionId::new("105")));
    }

    // ===========================================
    // Push bookkeeping
    // ===========================================

    #[test]
    fn push_is_anchored_to_current_cursor_and_queued_once() {
        let mut state = session();
        let batch = state.delete_list(&node(&state, "d"), 50);

        let txn = state.begin_push(&batch);
        state.begin_push(&batch);

        assert_eq!(
            txn.most_recent_operation_transaction_id,
            Some(TransactionId::new("100"))
        );
        assert_eq!(txn.operations, batch);
        assert_eq!(state.unconfirmed().len(), 1);
    }

    #[test]
    fn confirm_advances_cursor_and_dequeues() {
        let mut state = session();
        let batch = state.delete_list(&node(&state, "d"), 50);
        state.begin_push(&batch);

        let cursor = state.confirm_push(&batch, &response(Some("101"))).unwrap();

        assert_eq!(cursor, TransactionId::new("101"));
        assert!(state.unconfirmed().is_empty());
    }

    #[test]
    fn confirm_without_cursor_is_an_error() {
        let mut state = session();
        let batch = state.delete_list(&node(&state, "d"), 50);
        state.begin_push(&batch);

        let err = state.confirm_push(&batch, &response(None)).unwrap_err();

        assert!(matches!(err, SessionError::MissingCursor));
        assert_eq!(state.current_transaction_id(), Some(&TransactionId::new("100")));
    }

    // ===========================================
    // Mutations
    // ===========================================

    #[test]
    fn create_at_root_inserts_and_chains_edit() {
        let mut state = session();

        let (proxy, batch) = state.create_list(None, None, Some("new"), None, 200);

        assert!(ListNode::ptr_eq(&state.roots()[0], &proxy));
        assert_eq!(proxy.last_modified(), 200);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].kind, OperationKind::Create);
        assert_eq!(batch[0].data.priority, Some(0));
        assert_eq!(batch[1].kind, OperationKind::Edit);
        assert_eq!(batch[1].data.name.as_deref(), Some("new"));
        assert_eq!(batch[1].undo_data.previous_last_modified, Some(201));
        assert_eq!(batch[1].client_timestamp, 200);
    }

    #[test]
    fn create_without_text_sends_create_only() {
        let mut state = session();
        let (_, batch) = state.create_list(None, Some(1), None, None, 200);
        assert_eq!(batch.len(), 1);
        assert_eq!(names(state.roots()), vec!["todo", "", "ideas"]);
    }

    #[test]
    fn create_clamps_index_locally_only() {
        let mut state = session();
        let parent = node(&state, "a");

        let (last, batch) = state.create_list(Some(&parent), Some(99), Some("last"), None, 1);
        assert!(ListNode::ptr_eq(&parent.child(2).unwrap(), &last));
        assert_eq!(batch[0].data.priority, Some(99));
        assert_eq!(batch[0].data.parent_id, Some(ListId::from("a")));

        let (first, _) = state.create_list(Some(&parent), Some(-3), Some("first"), None, 2);
        assert!(ListNode::ptr_eq(&parent.child(0).unwrap(), &first));
    }

    #[test]
    fn create_under_leaf_allocates_children() {
        let mut state = session();
        let leaf = node(&state, "d");
        assert!(leaf.children().is_none());

        let (child, _) = state.create_list(Some(&leaf), None, Some("x"), None, 1);

        assert_eq!(leaf.child_count(), 1);
        assert_eq!(
            tree::find_parent(state.roots(), &child.id()).map(|p| p.id()),
            Some(ListId::from("d"))
        );
    }

    #[test]
    fn created_ids_are_unique() {
        let mut state = session();
        let (a, _) = state.create_list(None, None, None, None, 1);
        let (b, _) = state.create_list(None, None, None, None, 1);
        assert_ne!(a.id(), b.id());
        assert_eq!(tree::count(state.roots()), 6);
    }

    #[test]
    fn edit_empty_description_clears_locally_but_is_sent() {
        let mut state = session();
        let milk = node(&state, "b");
        milk.set_description(Some("2%".into()));

        let batch = state.edit_list(&milk, None, Some(""), 300).unwrap();

        assert_eq!(milk.description(), None);
        assert_eq!(milk.name().as_deref(), Some("milk"));
        assert_eq!(milk.last_modified(), 300);
        assert_eq!(batch[0].data.description.as_deref(), Some(""));
        assert_eq!(batch[0].undo_data.previous_last_modified, Some(11));
    }

    #[test]
    fn edit_without_changes_leaves_item_alone() {
        let mut state = session();
        let milk = node(&state, "b");
        assert!(state.edit_list(&milk, None, None, 300).is_none());
        assert_eq!(milk.last_modified(), 11);
    }

    #[test]
    fn complete_and_uncomplete_record_prior_state() {
        let mut state = session();
        let milk = node(&state, "b");

        let batch = state.complete_list(&milk, true, 400);
        assert_eq!(milk.completed_at(), Some(400));
        assert_eq!(
            batch[0].undo_data.previous_completed,
            Some(PreviousCompletion::Flag(false))
        );

        let batch = state.complete_list(&milk, false, 410);
        assert!(!milk.is_complete());
        assert_eq!(milk.last_modified(), 410);
        assert_eq!(batch[0].kind, OperationKind::Uncomplete);
        assert_eq!(
            batch[0].undo_data.previous_completed,
            Some(PreviousCompletion::At(400))
        );
    }

    #[test]
    fn delete_detaches_from_parent_or_roots() {
        let mut state = session();

        let eggs = node(&state, "c");
        state.delete_list(&eggs, 500);
        assert_eq!(node(&state, "a").child_count(), 1);
        assert_eq!(eggs.last_modified(), 500);

        let ideas = node(&state, "d");
        let batch = state.delete_list(&ideas, 501);
        assert_eq!(names(state.roots()), vec!["todo"]);
        assert_eq!(batch[0].kind, OperationKind::Delete);
        assert_eq!(batch[0].undo_data.previous_last_modified, Some(13));
    }

    // ===========================================
    // Persistence
    // ===========================================

    #[test]
    fn blob_round_trip_keeps_queue_and_tree() {
        let mut state = session();
        let batch = state.delete_list(&node(&state, "d"), 50);
        state.begin_push(&batch);

        let restored = SessionState::from_blob(&state.to_blob().unwrap()).unwrap();

        assert_eq!(restored.session_token(), "token");
        assert_eq!(restored.unconfirmed().snapshot(), vec![batch]);
        assert_eq!(restored.roots(), state.roots());
        assert_eq!(restored.current_transaction_id(), state.current_transaction_id());
    }

    #[test]
    fn invalid_blob_is_rejected() {
        assert!(matches!(
            SessionState::from_blob("not json"),
            Err(SessionError::Blob(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let state = SessionState::new("super-secret");
        let debug = format!("{:?}", state);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
