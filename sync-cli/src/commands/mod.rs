//! CLI command implementations.
//!
//! Every command runs against a client whose session was restored from the
//! data directory; `main` saves the session again once the command returns.

pub mod edit;
pub mod login;
pub mod status;
pub mod tree;

use anyhow::{Context, Result};
use std::path::Path;

use flowlist_sync_client::{SyncClient, Transport};
use flowlist_sync_types::{ListId, ListNode};

use crate::config::SavedSession;

/// Install the saved session, if any, into `client`.
///
/// A saved session that cannot be read is removed and the client is left
/// logged out, so `flowlist login` can start over.
pub async fn restore_saved<T: Transport>(client: &SyncClient<T>, data_dir: &Path) -> Result<()> {
    let restored = match SavedSession::load(data_dir).await {
        Ok(Some(saved)) => {
            tracing::debug!("Restoring session saved at {}", saved.saved_at);
            client
                .restore_session(&saved.blob)
                .await
                .context("Failed to restore saved session")
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    if let Err(e) = restored {
        tracing::warn!("Discarding unreadable saved session: {:#}", e);
        SavedSession::delete(data_dir).await?;
    }
    Ok(())
}

/// Write the client's session to the data directory, or remove the file
/// when the client is logged out.
pub async fn persist<T: Transport>(client: &SyncClient<T>, data_dir: &Path) -> Result<()> {
    match client.save_session().await? {
        Some(blob) => SavedSession::new(blob).save(data_dir).await,
        None => {
            tracing::debug!("No session to save, removing any saved copy");
            SavedSession::delete(data_dir).await
        }
    }
}

/// Fail unless a session is installed.
pub async fn require_login<T: Transport>(client: &SyncClient<T>) -> Result<()> {
    if !client.is_logged_in().await {
        anyhow::bail!("Not logged in. Run 'flowlist login' first.");
    }
    Ok(())
}

/// Look up an item by its id.
pub async fn find_list<T: Transport>(client: &SyncClient<T>, id: &str) -> Result<ListNode> {
    client
        .get_list_by_id(&ListId::from(id))
        .await?
        .with_context(|| format!("No item with id {}", id))
}
