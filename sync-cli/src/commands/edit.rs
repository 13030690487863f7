//! Change the outline: add, edit, complete and delete items.
//!
//! Each change is applied locally and pushed at once. If the push fails the
//! change stays in the outline and in the saved session, and is resent by
//! the next `flowlist refresh`.

use anyhow::{Context, Result};

use flowlist_sync_client::{SyncClient, Transport};

use super::find_list;

/// Run the add command. Prints the new item's id.
pub async fn add<T: Transport>(
    client: &SyncClient<T>,
    parent: Option<&str>,
    index: Option<i64>,
    name: &str,
    note: Option<&str>,
) -> Result<()> {
    let parent = match parent {
        Some(id) => Some(find_list(client, id).await?),
        None => None,
    };

    let created = client
        .create_list(parent.as_ref(), index, Some(name), note)
        .await
        .context("Item was added locally but not confirmed; run 'flowlist refresh' to resend")?;

    println!("{}", created.id());
    Ok(())
}

/// Run the edit command. Fields left out keep their current value; an empty
/// note clears it.
pub async fn edit<T: Transport>(
    client: &SyncClient<T>,
    id: &str,
    name: Option<&str>,
    note: Option<&str>,
) -> Result<()> {
    if name.is_none() && note.is_none() {
        anyhow::bail!("Nothing to change: pass --name and/or --note");
    }
    let target = find_list(client, id).await?;
    client
        .edit_list(&target, name, note)
        .await
        .context("Edit was applied locally but not confirmed")?;
    Ok(())
}

/// Run the complete command, or uncomplete with `undo`.
pub async fn complete<T: Transport>(client: &SyncClient<T>, id: &str, undo: bool) -> Result<()> {
    let target = find_list(client, id).await?;
    client
        .complete_list(&target, !undo)
        .await
        .context("Change was applied locally but not confirmed")?;
    Ok(())
}

/// Run the delete command.
pub async fn delete<T: Transport>(client: &SyncClient<T>, id: &str) -> Result<()> {
    let target = find_list(client, id).await?;
    client
        .delete_list(&target)
        .await
        .context("Item was removed locally but the delete was not confirmed")?;
    Ok(())
}
