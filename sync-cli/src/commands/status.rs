//! Show session status.

use anyhow::Result;

use flowlist_sync_client::{SyncClient, Transport};
use flowlist_sync_core::tree;

/// Session summary, read from local state only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Account login name.
    pub username: Option<String>,
    /// Cursor the next batch will be anchored to.
    pub cursor: Option<String>,
    /// Batches sent but not yet confirmed.
    pub unconfirmed: usize,
    /// Top-level items.
    pub roots: usize,
    /// Items in the whole outline.
    pub items: usize,
}

/// Collect the status of a logged-in client, or `None` when logged out.
pub async fn collect<T: Transport>(client: &SyncClient<T>) -> Result<Option<Status>> {
    if !client.is_logged_in().await {
        return Ok(None);
    }
    let roots = client.root_lists().await?;
    Ok(Some(Status {
        username: client.username().await?,
        cursor: client
            .current_transaction_id()
            .await?
            .map(|id| id.to_string()),
        unconfirmed: client.unconfirmed_batch_count().await?,
        roots: roots.len(),
        items: tree::count(&roots),
    }))
}

/// Run the status command.
pub async fn run<T: Transport>(client: &SyncClient<T>) -> Result<()> {
    println!("=== flowlist status ===");
    println!();

    let status = match collect(client).await? {
        Some(status) => status,
        None => {
            println!("Session: NOT LOGGED IN");
            println!();
            println!("Run 'flowlist login' to start a session.");
            return Ok(());
        }
    };

    println!("Session:");
    println!(
        "  User:        {}",
        status.username.as_deref().unwrap_or("(unknown)")
    );
    println!(
        "  Cursor:      {}",
        status.cursor.as_deref().unwrap_or("(none)")
    );
    println!("  Unconfirmed: {}", status.unconfirmed);
    println!();
    println!("Outline:");
    println!("  Top level:   {}", status.roots);
    println!("  Items:       {}", status.items);

    if status.unconfirmed > 0 {
        println!();
        println!("Run 'flowlist refresh' to resend unconfirmed changes.");
    }

    Ok(())
}
