//! In-memory backend for integration tests.
//!
//! `FakeServer` speaks the same HTTP exchanges as the real backend: a login
//! form that redirects with a session cookie, an initialization snapshot,
//! and push-and-poll that applies operations and issues new cursors. Every
//! snapshot is freshly encoded, so the client never shares node objects
//! with the server.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowlist_sync_client::{
    ClientConfig, HttpRequest, HttpResponse, Method, SyncClient, Transport, TransportError,
};
use flowlist_sync_core::tree;
use flowlist_sync_types::{
    InitializationData, ListData, ListId, ListNode, OperationKind, ProjectTreeData,
    ProjectTreeInfo, PushPollResponse, PushPollResult, Settings, Transaction, TransactionId,
    ROOT_PARENT_ID,
};
use serde_json::Value;

pub const BASE_URL: &str = "https://outline.test/";
pub const LOGIN_URL: &str = "https://outline.test/accounts/login/";
pub const USERNAME: &str = "me@example.com";
pub const PASSWORD: &str = "correct horse";

const SESSION_TOKEN: &str = "session-token-1";
const USER_ID: i64 = 4242;
const DATE_JOINED: i64 = 1_400_000_000;

/// Simulated backend. Clones share the same account.
#[derive(Clone, Default)]
pub struct FakeServer {
    inner: Arc<Mutex<ServerState>>,
}

#[derive(Default)]
struct ServerState {
    roots: Vec<ListNode>,
    cursor: u64,
    pushes: Vec<Transaction>,
    loads: usize,
    fail_pushes: usize,
}

impl FakeServer {
    pub fn new() -> Self {
        let server = Self::default();
        server.inner.lock().unwrap().cursor = 1000;
        server
    }

    /// Make the next `count` push-and-poll requests fail to connect.
    pub fn fail_next_pushes(&self, count: usize) {
        self.inner.lock().unwrap().fail_pushes = count;
    }

    /// Transactions the server has applied, in order.
    pub fn applied(&self) -> Vec<Transaction> {
        self.inner.lock().unwrap().pushes.clone()
    }

    /// Number of initialization snapshots served.
    pub fn loads(&self) -> usize {
        self.inner.lock().unwrap().loads
    }

    /// Deep copy of the server's outline.
    pub fn roots(&self) -> Vec<ListNode> {
        let state = self.inner.lock().unwrap();
        state.roots.iter().map(ListNode::snapshot).collect()
    }

    /// Change an item's name as if another device had edited it.
    pub fn rename_remotely(&self, id: &ListId, name: &str) {
        let state = self.inner.lock().unwrap();
        if let Some(node) = tree::find_by_id(&state.roots, id) {
            node.set_name(Some(name.to_string()));
        }
    }

    fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.inner.lock().unwrap();

        if request.url == LOGIN_URL && request.method == Method::Post {
            return Ok(login(&request));
        }

        let cookie = format!("sessionid={}", SESSION_TOKEN);
        if request.header("Cookie") != Some(cookie.as_str()) {
            return Ok(HttpResponse::new(403));
        }

        if request.url.starts_with(&format!("{}get_initialization_data", BASE_URL)) {
            state.loads += 1;
            return Ok(HttpResponse::new(200).with_body(state.snapshot_json()));
        }

        if request.url == format!("{}push_and_poll", BASE_URL) {
            if state.fail_pushes > 0 {
                state.fail_pushes -= 1;
                return Err(TransportError::ConnectionFailed("simulated outage".into()));
            }
            return Ok(state.push_and_poll(&request));
        }

        Ok(HttpResponse::new(404))
    }
}

fn login(request: &HttpRequest) -> HttpResponse {
    let valid = request.form_field("username") == Some(USERNAME)
        && request.form_field("password") == Some(PASSWORD);
    if !valid {
        return HttpResponse::new(200).with_body("<form>try again</form>");
    }
    HttpResponse::new(302)
        .with_header("Location", BASE_URL)
        .with_header("Set-Cookie", "csrftoken=abc; Path=/")
        .with_header(
            "Set-Cookie",
            format!("sessionid={}; HttpOnly; Path=/", SESSION_TOKEN),
        )
}

impl ServerState {
    fn snapshot_json(&self) -> String {
        let data = InitializationData {
            project_tree_data: Some(ProjectTreeData {
                client_id: Some("2016-05-20 10:00:00.000".into()),
                main_project_tree_info: Some(ProjectTreeInfo {
                    initial_most_recent_operation_transaction_id: Some(TransactionId::new(
                        self.cursor.to_string(),
                    )),
                    date_joined_timestamp_in_seconds: Some(DATE_JOINED),
                    root_project_children: Some(self.roots.clone()),
                }),
            }),
            globals: Some(vec![vec![Value::from("USER_ID"), Value::from(USER_ID)]]),
            settings: Some(Settings {
                username: Some(USERNAME.into()),
            }),
        };
        data.to_json().unwrap()
    }

    fn push_and_poll(&mut self, request: &HttpRequest) -> HttpResponse {
        let raw = request.form_field("push_poll_data").unwrap_or_default();
        let transactions = Transaction::list_from_push_poll_data(raw).unwrap();

        for txn in &transactions {
            for op in &txn.operations {
                self.apply(op);
            }
            self.pushes.push(txn.clone());
        }
        self.cursor += 1;

        let response = PushPollResponse {
            results: vec![PushPollResult {
                new_most_recent_operation_transaction_id: Some(TransactionId::new(
                    self.cursor.to_string(),
                )),
                ..PushPollResult::default()
            }],
        };
        HttpResponse::new(200).with_body(response.to_json().unwrap())
    }

    fn apply(&mut self, op: &flowlist_sync_types::Operation) {
        let id = &op.data.project_id;
        let time = op.client_timestamp;

        match op.kind {
            OperationKind::Create => {
                if tree::contains(&self.roots, id) {
                    return;
                }
                let node = ListNode::new(ListData {
                    last_modified: time,
                    ..ListData::new(id.clone())
                });
                let index = op.data.priority.unwrap_or(0).max(0) as usize;
                let parent = op
                    .data
                    .parent_id
                    .as_ref()
                    .filter(|p| p.as_str() != ROOT_PARENT_ID)
                    .and_then(|p| tree::find_by_id(&self.roots, p));
                match parent {
                    Some(parent) => parent.with_children_mut(|children| {
                        let children = children.get_or_insert_with(Vec::new);
                        children.insert(index.min(children.len()), node);
                    }),
                    None => {
                        let index = index.min(self.roots.len());
                        self.roots.insert(index, node);
                    }
                }
            }
            OperationKind::Edit => {
                if let Some(node) = tree::find_by_id(&self.roots, id) {
                    if let Some(name) = &op.data.name {
                        node.set_name(Some(name.clone()));
                    }
                    if let Some(description) = &op.data.description {
                        node.set_description(
                            Some(description.clone()).filter(|d| !d.is_empty()),
                        );
                    }
                    node.set_last_modified(time);
                }
            }
            OperationKind::Complete | OperationKind::Uncomplete => {
                if let Some(node) = tree::find_by_id(&self.roots, id) {
                    let complete = op.kind == OperationKind::Complete;
                    node.set_completed_at(complete.then_some(time));
                    node.set_last_modified(time);
                }
            }
            OperationKind::Delete => {
                if tree::is_root(&self.roots, id) {
                    self.roots.retain(|n| !n.has_id(id));
                } else if let Some(parent) = tree::find_parent(&self.roots, id) {
                    parent.with_children_mut(|children| {
                        if let Some(children) = children {
                            children.retain(|n| !n.has_id(id));
                        }
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.handle(request)
    }
}

/// Client configuration pointing at the fake server.
pub fn config() -> ClientConfig {
    ClientConfig::new()
        .with_base_url(BASE_URL)
        .with_login_url(LOGIN_URL)
}

/// A client connected to `server`, not yet logged in.
pub fn client(server: &FakeServer) -> SyncClient<FakeServer> {
    SyncClient::new(config(), server.clone())
}

/// A client logged in to `server`.
pub async fn logged_in(server: &FakeServer) -> SyncClient<FakeServer> {
    let client = client(server);
    client.login(USERNAME, PASSWORD).await.unwrap();
    client
}

/// Names of the given items, with unnamed items as "".
pub fn names(nodes: &[ListNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| n.name().unwrap_or_default())
        .collect()
}
