//! Log in and out.

use anyhow::{Context, Result};

use flowlist_sync_client::{ClientError, SyncClient, Transport};
use flowlist_sync_core::tree;

use crate::config::Credentials;

/// Run the login command.
///
/// Any previous session, including its unconfirmed batches, is discarded.
pub async fn run<T: Transport>(client: &SyncClient<T>, credentials: &Credentials) -> Result<()> {
    match client
        .login(&credentials.username, &credentials.password)
        .await
    {
        Ok(()) => {}
        Err(ClientError::Authentication) => {
            anyhow::bail!("Login rejected for {}", credentials.username)
        }
        Err(e) => return Err(e).context("Login failed"),
    }

    let roots = client.root_lists().await?;
    println!("Logged in as {}", credentials.username);
    println!(
        "  Items: {} ({} at the top level)",
        tree::count(&roots),
        roots.len()
    );
    Ok(())
}

/// Run the logout command.
pub async fn logout<T: Transport>(client: &SyncClient<T>) -> Result<()> {
    let pending = client.unconfirmed_batch_count().await.unwrap_or(0);
    match client.logout().await {
        Ok(()) => {
            if pending > 0 {
                println!("Discarded {} unconfirmed change(s).", pending);
            }
            println!("Logged out.");
            Ok(())
        }
        Err(ClientError::NotLoggedIn) => {
            println!("Not logged in.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
