//! reqwest-backed transport.

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use reqwest::redirect::Policy;

use crate::config::ClientConfig;

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }
}

/// Transport over HTTPS using a shared reqwest client.
///
/// Redirects are never followed and only the connect phase is timed out;
/// once connected, a request waits for as long as the server takes.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport using the connect timeout from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::from_builder(client_builder(config))
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

fn client_builder(config: &ClientConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .connect_timeout(config.connect_timeout)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
