//! Print the outline and refresh it from the server.

use anyhow::Result;
use std::fmt::Write;

use flowlist_sync_client::{SyncClient, Transport};
use flowlist_sync_core::tree;
use flowlist_sync_types::ListNode;

use super::find_list;

/// Run the tree command: print the whole outline, or the subtree at `root`.
pub async fn run<T: Transport>(client: &SyncClient<T>, root: Option<&str>) -> Result<()> {
    let roots = match root {
        Some(id) => vec![find_list(client, id).await?],
        None => client.root_lists().await?,
    };

    if roots.is_empty() {
        println!("(empty)");
    } else {
        print!("{}", render(&roots));
    }
    Ok(())
}

/// Run the refresh command: reload the outline and resend anything
/// unconfirmed.
pub async fn refresh<T: Transport>(client: &SyncClient<T>) -> Result<()> {
    let pending = client.unconfirmed_batch_count().await?;
    client.refresh().await?;

    let roots = client.root_lists().await?;
    if pending > 0 {
        println!("Resent {} unconfirmed change(s).", pending);
    }
    println!("Refreshed: {} items.", tree::count(&roots));
    Ok(())
}

/// Render items as an indented checklist, one line per item followed by
/// its note.
pub fn render(roots: &[ListNode]) -> String {
    let mut out = String::new();
    for node in roots {
        render_node(&mut out, node, 0);
    }
    out
}

fn render_node(out: &mut String, node: &ListNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let mark = if node.is_complete() { "x" } else { " " };
    let name = node.name().unwrap_or_default();

    let _ = writeln!(out, "{}- [{}] {}  ({})", indent, mark, name, node.id());
    if let Some(note) = node.description() {
        for line in note.lines() {
            let _ = writeln!(out, "{}      {}", indent, line);
        }
    }
    for child in node.children().unwrap_or_default() {
        render_node(out, &child, depth + 1);
    }
}
