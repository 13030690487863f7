//! # sync-client
//!
//! Client library for the FlowList outline sync protocol.
//!
//! This is the main library that collaborators use to read and edit an
//! outline held by the backend.
//!
//! ## Features
//!
//! - **Optimistic Mutations**: create/edit/complete/delete apply locally first
//! - **Push-and-Poll Confirmation**: batches are confirmed in generation order
//! - **Identity-Preserving Refresh**: item handles survive reloads
//! - **Transport Abstraction**: Pluggable HTTP layer (reqwest, mock)
//! - **Pure Session Logic**: Uses sync-core for side-effect-free bookkeeping
//!
//! ## Example
//!
//! ```ignore
//! use flowlist_sync_client::{ClientConfig, ReqwestTransport, SyncClient};
//!
//! let config = ClientConfig::default();
//! let client = SyncClient::new(config.clone(), ReqwestTransport::new(&config)?);
//!
//! client.login("me@example.com", "hunter2").await?;
//! for root in client.root_lists().await? {
//!     println!("{:?}", root.name());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod transport;

pub use client::{ClientError, SyncClient};
pub use config::ClientConfig;
pub use transport::{
    HttpRequest, HttpResponse, Method, MockTransport, ReqwestTransport, Transport, TransportError,
};
