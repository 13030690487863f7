//! Mock transport for testing.
//!
//! Allows queueing responses and capturing sent requests for verification.

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Responses are returned in the order they were queued. Clones share the
/// same queue and request log.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent_requests: Vec<HttpRequest>,
    response_queue: VecDeque<HttpResponse>,
    fail_next_request: Option<String>,
    time_out_next_request: bool,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to be returned by the next `execute()` call.
    pub fn queue_response(&self, response: HttpResponse) {
        let mut inner = self.inner.lock().unwrap();
        inner.response_queue.push_back(response);
    }

    /// Get all requests that were sent.
    pub fn sent_requests(&self) -> Vec<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.sent_requests.clone()
    }

    /// Get the last request that was sent.
    pub fn last_request(&self) -> Option<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.sent_requests.last().cloned()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.response_queue.len()
    }

    /// Cause the next execute() to fail to connect with the given error.
    pub fn fail_next_request(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_request = Some(error.to_string());
    }

    /// Cause the next execute() to time out.
    pub fn time_out_next_request(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.time_out_next_request = true;
    }

    /// Clear all state (requests, queue, forced failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Forced failures happen before anything reaches the "server"
        if let Some(error) = inner.fail_next_request.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        if std::mem::take(&mut inner.time_out_next_request) {
            return Err(TransportError::Timeout);
        }

        inner.sent_requests.push(request);
        inner
            .response_queue
            .pop_front()
            .ok_or_else(|| TransportError::RequestFailed("no response queued".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::new(200));
        transport.queue_response(HttpResponse::new(200));

        transport.execute(HttpRequest::get("https://a/1")).await.unwrap();
        transport.execute(HttpRequest::post("https://a/2")).await.unwrap();

        let sent = transport.sent_requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url, "https://a/1");
        assert_eq!(transport.last_request().unwrap().url, "https://a/2");
    }

    #[tokio::test]
    async fn mock_transport_returns_queued_responses_in_order() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::new(200).with_body("one"));
        transport.queue_response(HttpResponse::new(302).with_body("two"));

        let r1 = transport.execute(HttpRequest::get("https://a/")).await.unwrap();
        let r2 = transport.execute(HttpRequest::get("https://a/")).await.unwrap();

        assert_eq!(r1.body, "one");
        assert_eq!(r2.status, 302);
        assert_eq!(transport.pending_responses(), 0);
    }

    #[tokio::test]
    async fn mock_transport_empty_queue_errors() {
        let transport = MockTransport::new();
        let result = transport.execute(HttpRequest::get("https://a/")).await;
        assert!(matches!(result, Err(TransportError::RequestFailed(_))));
    }

    // ===========================================
    // Failure Injection Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_fail_next_request() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::new(200));
        transport.fail_next_request("connection refused");

        let result = transport.execute(HttpRequest::get("https://a/")).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(transport.sent_requests().is_empty());

        // Second call should succeed with the still-queued response
        assert!(transport.execute(HttpRequest::get("https://a/")).await.is_ok());
    }

    #[tokio::test]
    async fn mock_transport_time_out_next_request() {
        let transport = MockTransport::new();
        transport.time_out_next_request();

        let result = transport.execute(HttpRequest::get("https://a/")).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn mock_transport_clone_shares_state() {
        let transport = MockTransport::new();
        let clone = transport.clone();
        clone.queue_response(HttpResponse::new(204));

        transport.execute(HttpRequest::get("https://a/")).await.unwrap();

        assert_eq!(clone.sent_requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_transport_reset_clears_state() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::new(200));
        transport.execute(HttpRequest::get("https://a/")).await.unwrap();
        transport.queue_response(HttpResponse::new(200));

        transport.reset();

        assert!(transport.sent_requests().is_empty());
        assert_eq!(transport.pending_responses(), 0);
    }
}
