//! In-memory [`Transport`] for tests.
//!
//! Available with the `test-util` feature.
use std::{collections::VecDeque, sync::Mutex, time::Duration};

use bytes::Bytes;
use http::Method;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

struct Canned {
    method: Method,
    path: String,
    responses: VecDeque<ApiResponse>,
}

/// A [`Transport`] serving canned JSON responses and recording every request.
///
/// Requests to paths without a canned response receive a bare 404.
#[derive(Default)]
pub struct FakeTransport {
    canned: Mutex<Vec<Canned>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl FakeTransport {
    /// Create a transport with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`, using tokio's clock.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Always answer `method path` with the given status and JSON body.
    ///
    /// Replaces any responses previously registered for the same method and path.
    #[must_use]
    pub fn respond(
        self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) -> Self {
        self.respond_sequence(method, path, vec![(status, body)])
    }

    /// Answer successive `method path` requests with each response in turn,
    /// repeating the last one once the others are used up.
    #[must_use]
    pub fn respond_sequence(
        self,
        method: Method,
        path: impl Into<String>,
        responses: Vec<(u16, serde_json::Value)>,
    ) -> Self {
        let path = path.into();
        let responses = responses
            .into_iter()
            .map(|(status, body)| ApiResponse {
                status,
                status_text: http::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or_default()
                    .to_string(),
                body: Bytes::from(body.to_string()),
            })
            .collect();
        {
            let mut canned = self.canned.lock().expect("canned responses poisoned");
            canned.retain(|c| !(c.method == method && c.path == path));
            canned.push(Canned {
                method,
                path,
                responses,
            });
        }
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests poisoned").clone()
    }

    /// The requests received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// The number of requests received for `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn next_response(&self, request: &ApiRequest) -> ApiResponse {
        let mut canned = self.canned.lock().expect("canned responses poisoned");
        let entry = canned
            .iter_mut()
            .find(|c| c.method == request.method && c.path == request.path);
        match entry {
            Some(c) if c.responses.len() > 1 => c.responses.pop_front().unwrap_or_else(not_found),
            Some(c) => c.responses.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> ApiResponse {
    ApiResponse {
        status: 404,
        status_text: "Not Found".to_string(),
        body: Bytes::new(),
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests poisoned")
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.next_response(&request))
    }
}
