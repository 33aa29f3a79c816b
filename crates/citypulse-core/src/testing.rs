//! Test doubles shared by the unit tests of the provider adapters.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

type Outcome = Result<HttpResponse, HttpError>;

/// Answers each request with the outcome of the first route whose pattern is
/// contained in the URL, and records every URL it sees.
#[derive(Default)]
pub(crate) struct RoutedHttpClient {
    routes: Vec<(String, Outcome)>,
    requests: Mutex<Vec<String>>,
}

impl RoutedHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, pattern: &str, outcome: Outcome) -> Self {
        self.routes.push((pattern.to_owned(), outcome));
        self
    }

    pub(crate) fn json(self, pattern: &str, body: &str) -> Self {
        self.route(pattern, Ok(HttpResponse::ok_json(body)))
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .clone()
    }

    pub(crate) fn count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let outcome = self
            .routes
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok(HttpResponse::with_status(404, "no route")));

        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(request.url);

        Box::pin(async move { outcome })
    }
}
