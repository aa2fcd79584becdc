#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use wiremock::{Request, Respond, ResponseTemplate};

use genai_ready::Client;

pub fn build_gemini_client(base_url: &str) -> Client {
    Client::builder()
        .api_key("test-key")
        .base_url(base_url)
        .build()
        .unwrap()
}

pub fn build_gemini_client_with_version(base_url: &str, api_version: &str) -> Client {
    Client::builder()
        .api_key("test-key")
        .base_url(base_url)
        .api_version(api_version)
        .build()
        .unwrap()
}

/// Serves the queued responses in order, repeating the last one.
#[derive(Clone)]
pub struct SequenceResponder {
    calls: Arc<AtomicUsize>,
    responses: Arc<Vec<ResponseTemplate>>,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "at least one response is required");
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            responses: Arc::new(responses),
        }
    }

    pub fn json(bodies: Vec<Value>) -> Self {
        Self::new(
            bodies
                .into_iter()
                .map(|body| ResponseTemplate::new(200).set_body_json(body))
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses[idx.min(self.responses.len() - 1)].clone()
    }
}
