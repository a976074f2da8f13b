//! Blocking reqwest implementation of the engine's HTTP client seam.

use siphon_engine::{HttpClient, HttpResponse};
use std::time::Duration;

/// HTTP client backed by `reqwest::blocking`.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with transfer-friendly timeouts.
    ///
    /// Large chunks can legitimately take a while to apply on the peer, so
    /// the request timeout stays well above the sizer's target band.
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client }
    }

    fn run(&self, request: reqwest::blocking::RequestBuilder) -> Result<HttpResponse, String> {
        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        self.run(self.client.post(url).body(body))
    }

    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.run(self.client.get(url))
    }

    fn delete(&self, url: &str) -> Result<HttpResponse, String> {
        self.run(self.client.delete(url))
    }
}
