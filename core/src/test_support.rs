//! Scripted transport shared by the unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Answers every request with a closure and records what it was sent.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    delays: Vec<(String, Duration)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delays: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold responses for paths ending in `suffix` for `delay`.
    pub(crate) fn with_delay(mut self, suffix: &str, delay: Duration) -> Self {
        self.delays.push((suffix.to_string(), delay));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = self
            .delays
            .iter()
            .find(|(suffix, _)| request.path.ends_with(suffix.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.handler)(&request))
    }
}

/// A transport whose every request fails before reaching a server.
pub(crate) struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        Err(ApiError::Network("connection refused".to_string()))
    }
}

pub(crate) fn respond(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}
