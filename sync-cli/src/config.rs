//! Local state for the flowlist CLI.
//!
//! The only thing kept between runs is the session blob produced by
//! `SyncClient::save_session`, stored as `session.json` in the data
//! directory with owner-only permissions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

/// Environment variable holding the login name.
pub const USERNAME_ENV: &str = "FLOWLIST_USERNAME";

/// Environment variable holding the password.
pub const PASSWORD_ENV: &str = "FLOWLIST_PASSWORD";

/// On-disk wrapper around the opaque session blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    /// Blob from `SyncClient::save_session`.
    pub blob: String,
    /// When the blob was written (Unix seconds).
    pub saved_at: u64,
}

impl SavedSession {
    /// Wrap a blob, stamping it with the current time.
    pub fn new(blob: String) -> Self {
        let saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { blob, saved_at }
    }

    /// Load the saved session, or `None` if nothing has been saved.
    pub async fn load(data_dir: &Path) -> Result<Option<Self>> {
        if !Self::exists(data_dir) {
            return Ok(None);
        }
        let path = data_dir.join(SESSION_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Failed to read saved session")?;
        let saved = serde_json::from_str(&contents).context("Invalid saved session")?;
        Ok(Some(saved))
    }

    /// Save the session to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SESSION_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save session")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Remove the saved session. Missing files are fine.
    pub async fn delete(data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SESSION_FILE);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove saved session"),
        }
    }

    /// Check if a session has been saved.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(SESSION_FILE).exists()
    }
}

/// Login name and password for `flowlist login`.
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password. Never logged or printed.
    pub password: String,
}

impl Credentials {
    /// Resolve credentials from, in order, the command line, the
    /// environment, and an interactive prompt.
    pub fn resolve(username: Option<String>) -> Result<Self> {
        let username = match username.or_else(|| non_empty_env(USERNAME_ENV)) {
            Some(name) => name,
            None => prompt_line("Username: ")?,
        };
        let password = match non_empty_env(PASSWORD_ENV) {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")
                .context("Failed to read password")?,
        };

        if username.trim().is_empty() {
            anyhow::bail!("Username must not be empty");
        }

        Ok(Self {
            username: username.trim().to_string(),
            password,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn prompt_line(prompt: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read username")?;
    Ok(line.trim_end().to_string())
}

/// Get the default data directory for the CLI.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "flowlist", "flowlist")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
