//! SyncClient - the main interface for FlowList sync.
//!
//! This module provides [`SyncClient`], the API collaborators use to read
//! the outline and mutate it.
//!
//! # Architecture
//!
//! SyncClient uses pure session logic (from sync-core) to apply optimistic
//! changes and produce operation batches, and performs the actual I/O via
//! the Transport trait.
//!
//! ```text
//! Collaborator → SyncClient → Transport → Network
//!                    ↓
//!          sync-core (SessionState, tree, ops)
//! ```
//!
//! # Locking
//!
//! Two guards are held, always in this order:
//! - the *sequencer*, for the whole of every entry point that talks to the
//!   server, so batches reach the server in the order they were generated;
//! - the *state* guard, only while reading or changing [`SessionState`],
//!   never across a network call.
//!
//! Readers take only the state guard and so never wait on the network.
//!
//! # Example
//!
//! ```ignore
//! use flowlist_sync_client::{ClientConfig, ReqwestTransport, SyncClient};
//!
//! let config = ClientConfig::default();
//! let transport = ReqwestTransport::new(&config)?;
//! let client = SyncClient::new(config, transport);
//!
//! client.login("me@example.com", "hunter2").await?;
//! let todo = client.create_root_list(Some(0), Some("todo"), None).await?;
//! client.create_list(Some(&todo), None, Some("buy milk"), None).await?;
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use flowlist_sync_core::{
    cookie_value, parse_cookie, tree, LoadedTree, SessionError, SessionState, TreeError,
};
use flowlist_sync_types::{
    InitializationData, ListId, ListNode, Operation, PushPollResponse, TransactionId,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Name of the session cookie set by a successful login.
const SESSION_COOKIE: &str = "sessionid";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend rejected the credentials.
    #[error("authentication failed")]
    Authentication,

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An operation that needs a session was called while logged out.
    #[error("not logged in")]
    NotLoggedIn,

    /// The backend answered with something the client cannot use.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local state diverged from the server's in a way that indicates a bug.
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] TreeError),

    /// Session bookkeeping failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// The main sync client.
///
/// Owns at most one session. Every mutation is applied locally first and
/// then confirmed with the server; the call resolves once the server has
/// answered. A failed confirmation leaves the local change in place until
/// the next successful [`SyncClient::refresh`].
pub struct SyncClient<T: Transport> {
    config: ClientConfig,
    transport: T,
    state: Arc<Mutex<Option<SessionState>>>,
    sequencer: Arc<Mutex<()>>,
}

impl<T: Transport> SyncClient<T> {
    /// Create a new, logged-out SyncClient.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: Arc::new(Mutex::new(None)),
            sequencer: Arc::new(Mutex::new(())),
        }
    }

    // ===========================================
    // Session lifecycle
    // ===========================================

    /// Log in and load the outline.
    ///
    /// Any existing session is discarded first. On any failure the client
    /// ends up logged out.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;

        if self.state.lock().await.take().is_some() {
            tracing::info!("Discarding previous session before login");
        }

        let result = self.login_locked(username, password).await;
        if let Err(e) = &result {
            tracing::warn!("Login failed: {}", e);
            *self.state.lock().await = None;
        }
        result
    }

    async fn login_locked(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let token = self.authenticate(username, password).await?;
        *self.state.lock().await = Some(SessionState::new(token));
        tracing::info!("Authenticated, loading outline");
        self.load_locked().await
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let request = self
            .request(HttpRequest::post(&self.config.login_url), None)
            .with_header("Referer", &self.config.login_url)
            .with_form_field("username", username)
            .with_form_field("password", password)
            .with_form_field("next", "");

        let response = self.send(request).await?;

        let cookies: Vec<(String, String)> = response
            .header_values("Set-Cookie")
            .into_iter()
            .flat_map(parse_cookie)
            .collect();
        let location = response.header("Location");
        let token = cookie_value(&cookies, SESSION_COOKIE);

        match token {
            Some(token)
                if response.status == 302
                    && !cookies.is_empty()
                    && location == Some(self.config.base_url.as_str()) =>
            {
                Ok(token.to_string())
            }
            _ => {
                tracing::warn!(
                    "Login rejected (status {}, location {:?})",
                    response.status,
                    location
                );
                Err(ClientError::Authentication)
            }
        }
    }

    /// Whether a session is active.
    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// End the session.
    ///
    /// Waits for any exchange in flight to finish first.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;
        match self.state.lock().await.take() {
            Some(_) => {
                tracing::info!("Logged out");
                Ok(())
            }
            None => Err(ClientError::NotLoggedIn),
        }
    }

    /// Drop the session, if any, without requiring one.
    pub async fn clear_session(&self) {
        let _seq = self.sequencer.lock().await;
        *self.state.lock().await = None;
    }

    /// Encode the session as an opaque blob, or `None` when logged out.
    ///
    /// The blob includes the token, the outline and unconfirmed batches.
    pub async fn save_session(&self) -> Result<Option<String>, ClientError> {
        let state = self.state.lock().await;
        match state.as_ref() {
            Some(session) => Ok(Some(session.to_blob()?)),
            None => Ok(None),
        }
    }

    /// Install a session from a blob produced by [`SyncClient::save_session`].
    ///
    /// No request is made; call [`SyncClient::refresh`] to bring it up to date.
    pub async fn restore_session(&self, blob: &str) -> Result<(), ClientError> {
        let session = SessionState::from_blob(blob)?;
        let _seq = self.sequencer.lock().await;
        tracing::info!(
            "Restored session with {} unconfirmed batches",
            session.unconfirmed().len()
        );
        *self.state.lock().await = Some(session);
        Ok(())
    }

    /// Reload the outline from the server, replaying unconfirmed batches.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;
        self.require_session().await?;
        self.load_locked().await
    }

    // Fetch the snapshot and reconcile, then replay queued batches. After any
    // replay the snapshot is stale, so load again until nothing was queued.
    async fn load_locked(&self) -> Result<(), ClientError> {
        loop {
            let token = self.require_session().await?;
            let request = self.request(
                HttpRequest::get(self.config.initialization_url()),
                Some(&token),
            );
            let response = self.send_expecting_success(request).await?;

            let data = InitializationData::from_json(&response.body)
                .map_err(|e| ClientError::Serialization(e.to_string()))?;
            let loaded = LoadedTree::from_initialization(data)?;

            let pending = {
                let mut guard = self.state.lock().await;
                let state = guard.as_mut().ok_or(ClientError::NotLoggedIn)?;
                state.apply_load(loaded)?;
                tracing::info!(
                    "Loaded outline ({} items, cursor {:?})",
                    tree::count(state.roots()),
                    state.current_transaction_id()
                );
                state.unconfirmed().snapshot()
            };

            if pending.is_empty() {
                return Ok(());
            }

            for batch in &pending {
                if let Err(e) = self.push_poll_locked(batch).await {
                    tracing::warn!("Replay of unconfirmed batch failed: {}", e);
                    return Err(e);
                }
            }
            tracing::info!("Replayed {} unconfirmed batches, reloading", pending.len());
        }
    }

    // ===========================================
    // Push-and-poll
    // ===========================================

    // Caller holds the sequencer.
    async fn push_poll_locked(&self, batch: &[Operation]) -> Result<(), ClientError> {
        let request = {
            let mut guard = self.state.lock().await;
            let state = guard.as_mut().ok_or(ClientError::NotLoggedIn)?;

            let transaction = state.begin_push(batch);
            let data = transaction
                .to_push_poll_data()
                .map_err(|e| ClientError::Serialization(e.to_string()))?;

            self.request(
                HttpRequest::post(self.config.push_poll_url()),
                Some(state.session_token()),
            )
            .with_form_field("client_id", state.client_id().unwrap_or_default())
            .with_form_field("client_version", &self.config.client_version)
            .with_form_field("push_poll_id", &self.config.push_poll_id)
            .with_form_field("push_poll_data", data)
            .with_form_field("crosscheck_user_id", state.user_id().unwrap_or_default())
        };

        let response = self.send_expecting_success(request).await?;
        let parsed = PushPollResponse::from_json(&response.body)
            .map_err(|e| ClientError::Serialization(e.to_string()))?;

        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(ClientError::NotLoggedIn)?;
        match state.confirm_push(batch, &parsed) {
            Ok(cursor) => {
                tracing::debug!("Batch of {} confirmed at {}", batch.len(), cursor);
                Ok(())
            }
            Err(SessionError::MissingCursor) => Err(ClientError::Protocol(
                "push-and-poll response has no transaction id".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    // ===========================================
    // Mutations
    // ===========================================

    /// Create an item under `parent` (root level when `None`).
    ///
    /// `insert_index` defaults to 0; out-of-range indices are clamped
    /// locally. Returns the local proxy item, which is already in the
    /// outline and stays valid across refreshes.
    pub async fn create_list(
        &self,
        parent: Option<&ListNode>,
        insert_index: Option<i64>,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ListNode, ClientError> {
        let _seq = self.sequencer.lock().await;
        let (proxy, batch) = self
            .with_session(|state| {
                let time = state.client_time(now_unix_secs());
                state.create_list(parent, insert_index, name, description, time)
            })
            .await?;

        self.push_poll_locked(&batch).await?;
        Ok(proxy)
    }

    /// Create a root-level item.
    pub async fn create_root_list(
        &self,
        insert_index: Option<i64>,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ListNode, ClientError> {
        self.create_list(None, insert_index, name, description)
            .await
    }

    /// Change the text and/or note of `target`.
    ///
    /// An empty note clears it. Nothing is sent when both are `None`.
    pub async fn edit_list(
        &self,
        target: &ListNode,
        new_name: Option<&str>,
        new_description: Option<&str>,
    ) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;
        let batch = self
            .with_session(|state| {
                let time = state.client_time(now_unix_secs());
                state.edit_list(target, new_name, new_description, time)
            })
            .await?;

        match batch {
            Some(batch) => self.push_poll_locked(&batch).await,
            None => Ok(()),
        }
    }

    /// Mark `target` complete, or clear its completion.
    pub async fn complete_list(&self, target: &ListNode, complete: bool) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;
        let batch = self
            .with_session(|state| {
                let time = state.client_time(now_unix_secs());
                state.complete_list(target, complete, time)
            })
            .await?;

        self.push_poll_locked(&batch).await
    }

    /// Delete `target` and its subtree.
    pub async fn delete_list(&self, target: &ListNode) -> Result<(), ClientError> {
        let _seq = self.sequencer.lock().await;
        let batch = self
            .with_session(|state| {
                let time = state.client_time(now_unix_secs());
                state.delete_list(target, time)
            })
            .await?;

        self.push_poll_locked(&batch).await
    }

    // ===========================================
    // Readers
    // ===========================================

    /// Login name of the session.
    pub async fn username(&self) -> Result<Option<String>, ClientError> {
        self.with_session(|state| state.username().map(str::to_owned))
            .await
    }

    /// Root items in display order.
    pub async fn root_lists(&self) -> Result<Vec<ListNode>, ClientError> {
        self.with_session(|state| state.roots().to_vec()).await
    }

    /// The item with the given id.
    pub async fn get_list_by_id(&self, id: &ListId) -> Result<Option<ListNode>, ClientError> {
        self.with_session(|state| tree::find_by_id(state.roots(), id))
            .await
    }

    /// Direct parent of `child`; `None` for root items and unknown items.
    pub async fn get_parent_list(&self, child: &ListNode) -> Result<Option<ListNode>, ClientError> {
        let id = child.id();
        self.with_session(|state| tree::find_parent(state.roots(), &id))
            .await
    }

    /// Whether `list` is a root-level item.
    pub async fn is_root_list(&self, list: &ListNode) -> Result<bool, ClientError> {
        let id = list.id();
        self.with_session(|state| tree::is_root(state.roots(), &id))
            .await
    }

    /// Whether `list` is anywhere in the outline.
    pub async fn has_list(&self, list: &ListNode) -> Result<bool, ClientError> {
        let id = list.id();
        self.with_session(|state| tree::contains(state.roots(), &id))
            .await
    }

    /// Items from a root down to `list`, both inclusive.
    pub async fn get_ancestry_path(&self, list: &ListNode) -> Result<Vec<ListNode>, ClientError> {
        self.with_session(|state| tree::ancestry_path(state.roots(), list))
            .await
    }

    /// Cursor the next batch will be anchored to.
    pub async fn current_transaction_id(&self) -> Result<Option<TransactionId>, ClientError> {
        self.with_session(|state| state.current_transaction_id().cloned())
            .await
    }

    /// Number of batches pushed but not yet confirmed.
    pub async fn unconfirmed_batch_count(&self) -> Result<usize, ClientError> {
        self.with_session(|state| state.unconfirmed().len()).await
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ===========================================
    // Helpers
    // ===========================================

    async fn with_session<R>(
        &self,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R, ClientError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(ClientError::NotLoggedIn)?;
        Ok(f(state))
    }

    async fn require_session(&self) -> Result<String, ClientError> {
        self.with_session(|state| state.session_token().to_string())
            .await
    }

    fn request(&self, request: HttpRequest, token: Option<&str>) -> HttpRequest {
        let request = request.with_header("User-Agent", &self.config.user_agent);
        match token {
            Some(token) => request.with_header("Cookie", format!("{}={}", SESSION_COOKIE, token)),
            None => request,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        tracing::debug!("{:?} {}", request.method, request.url);
        let response = self.transport.execute(request).await?;
        tracing::debug!("Response status {}", response.status);
        Ok(response)
    }

    async fn send_expecting_success(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = request.url.clone();
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(TransportError::RequestFailed(format!(
                "{} returned status {}",
                url, response.status
            ))
            .into());
        }
        Ok(response)
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
