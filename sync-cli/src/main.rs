//! # flowlist
//!
//! Command-line client for a FlowList outline.
//!
//! ## Commands
//!
//! - `login`: Start a session and load the outline
//! - `logout`: End the session
//! - `status`: Show session status
//! - `tree`: Print the outline
//! - `add`, `edit`, `complete`, `delete`: Change the outline
//! - `refresh`: Reload the outline and resend unconfirmed changes
//!
//! The session is saved in the data directory after every command, so a
//! change whose push failed is kept and resent by the next `refresh`.
//!
//! ## Example
//!
//! ```bash
//! # Log in (prompts for the password unless FLOWLIST_PASSWORD is set)
//! flowlist login --username me@example.com
//!
//! # Add an item and a child under it
//! flowlist add "groceries"
//! flowlist add --parent <id> "eggs" --note "a dozen"
//!
//! # Show the outline
//! flowlist tree
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{edit, login, status, tree};
use config::Credentials;
use flowlist_sync_client::{ClientConfig, ReqwestTransport, SyncClient};

/// Command-line client for a FlowList outline.
#[derive(Parser, Debug)]
#[command(name = "flowlist")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for storing the saved session
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and load the outline
    Login {
        /// Login name (falls back to FLOWLIST_USERNAME, then a prompt)
        #[arg(long, short)]
        username: Option<String>,
    },

    /// End the session and forget unconfirmed changes
    Logout,

    /// Show session status
    Status,

    /// Print the outline
    Tree {
        /// Only print the subtree under this item
        #[arg(long)]
        root: Option<String>,
    },

    /// Add an item
    Add {
        /// Text of the new item
        name: String,

        /// Parent item id (top level when omitted)
        #[arg(long)]
        parent: Option<String>,

        /// Position among the parent's children (defaults to first)
        #[arg(long)]
        index: Option<i64>,

        /// Note attached to the item
        #[arg(long)]
        note: Option<String>,
    },

    /// Change an item's text or note
    Edit {
        /// Item id
        id: String,

        /// New text
        #[arg(long)]
        name: Option<String>,

        /// New note (an empty string clears it)
        #[arg(long)]
        note: Option<String>,
    },

    /// Mark an item complete
    Complete {
        /// Item id
        id: String,

        /// Mark the item not complete instead
        #[arg(long)]
        undo: bool,
    },

    /// Delete an item and everything under it
    Delete {
        /// Item id
        id: String,
    },

    /// Reload the outline and resend unconfirmed changes
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config::default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let client_config = ClientConfig::default();
    let transport = ReqwestTransport::new(&client_config).context("Failed to set up HTTP client")?;
    let client = SyncClient::new(client_config, transport);

    commands::restore_saved(&client, &data_dir).await?;

    let result = run(cli.command, &client).await;

    // Save even when the command failed, so unconfirmed changes survive.
    let saved = commands::persist(&client, &data_dir).await;
    result?;
    saved
}

async fn run(command: Commands, client: &SyncClient<ReqwestTransport>) -> Result<()> {
    match command {
        Commands::Login { username } => {
            let credentials = Credentials::resolve(username)?;
            login::run(client, &credentials).await?;
        }
        Commands::Logout => {
            login::logout(client).await?;
        }
        Commands::Status => {
            status::run(client).await?;
        }
        Commands::Tree { root } => {
            commands::require_login(client).await?;
            tree::run(client, root.as_deref()).await?;
        }
        Commands::Add {
            name,
            parent,
            index,
            note,
        } => {
            commands::require_login(client).await?;
            edit::add(client, parent.as_deref(), index, &name, note.as_deref()).await?;
        }
        Commands::Edit { id, name, note } => {
            commands::require_login(client).await?;
            edit::edit(client, &id, name.as_deref(), note.as_deref()).await?;
        }
        Commands::Complete { id, undo } => {
            commands::require_login(client).await?;
            edit::complete(client, &id, undo).await?;
        }
        Commands::Delete { id } => {
            commands::require_login(client).await?;
            edit::delete(client, &id).await?;
        }
        Commands::Refresh => {
            commands::require_login(client).await?;
            tree::refresh(client).await?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_options() {
        let cli = Cli::try_parse_from([
            "flowlist", "--data-dir", "/tmp/fl", "add", "eggs", "--parent", "abc", "--index", "2",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/fl")));
        match cli.command {
            Commands::Add {
                name,
                parent,
                index,
                note,
            } => {
                assert_eq!(name, "eggs");
                assert_eq!(parent.as_deref(), Some("abc"));
                assert_eq!(index, Some(2));
                assert!(note.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_complete_undo() {
        let cli = Cli::try_parse_from(["flowlist", "complete", "abc", "--undo"]).unwrap();
        assert!(matches!(cli.command, Commands::Complete { undo: true, .. }));
    }

    #[test]
    fn edit_requires_an_id() {
        assert!(Cli::try_parse_from(["flowlist", "edit"]).is_err());
    }
}
