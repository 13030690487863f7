//! Client configuration.
//!
//! The defaults match the production backend; tests point the URLs at a
//! simulated server instead.

use std::time::Duration;

/// Base URL of the backend API. Every endpoint is relative to it.
pub const DEFAULT_BASE_URL: &str = "https://workflowy.com/";

/// Login form URL.
pub const DEFAULT_LOGIN_URL: &str = "https://workflowy.com/accounts/login/";

/// Desktop browser user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.94 Safari/537.36";

/// Protocol version the client speaks.
pub const DEFAULT_CLIENT_VERSION: &str = "16";

/// Fixed push-and-poll id.
pub const DEFAULT_PUSH_POLL_ID: &str = "WB79Gp0T";

/// Connect timeout. There is no read timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Configuration for SyncClient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the API, with a trailing slash.
    pub base_url: String,
    /// Login form URL.
    pub login_url: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// `client_version` sent to the backend.
    pub client_version: String,
    /// `push_poll_id` sent with every push-and-poll.
    pub push_poll_id: String,
    /// Connect timeout for the HTTP transport.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            push_poll_id: DEFAULT_PUSH_POLL_ID.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the production defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Set the login URL.
    pub fn with_login_url(mut self, url: &str) -> Self {
        self.login_url = url.to_string();
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Set the client version.
    pub fn with_client_version(mut self, version: &str) -> Self {
        self.client_version = version.to_string();
        self
    }

    /// Set the push-and-poll id.
    pub fn with_push_poll_id(mut self, id: &str) -> Self {
        self.push_poll_id = id.to_string();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// URL of the initialization snapshot endpoint.
    pub fn initialization_url(&self) -> String {
        format!(
            "{}get_initialization_data?client_version={}",
            self.base_url, self.client_version
        )
    }

    /// URL of the push-and-poll endpoint.
    pub fn push_poll_url(&self) -> String {
        format!("{}push_and_poll", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_production() {
        let config = ClientConfig::default();
        assert_eq!(
            config.initialization_url(),
            "https://workflowy.com/get_initialization_data?client_version=16"
        );
        assert_eq!(config.push_poll_url(), "https://workflowy.com/push_and_poll");
        assert_eq!(config.login_url, "https://workflowy.com/accounts/login/");
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.push_poll_id, "WB79Gp0T");
    }

    #[test]
    fn config_builder_pattern() {
        let config = ClientConfig::new()
            .with_base_url("http://localhost:8000/")
            .with_login_url("http://localhost:8000/login/")
            .with_client_version("17")
            .with_user_agent("test-agent")
            .with_push_poll_id("abc")
            .with_connect_timeout(Duration::from_secs(1));

        assert_eq!(
            config.initialization_url(),
            "http://localhost:8000/get_initialization_data?client_version=17"
        );
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.push_poll_id, "abc");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }
}
