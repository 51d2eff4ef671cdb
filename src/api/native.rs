//! reqwest-backed [`HttpClient`] for native tools and the contract tests.

use async_trait::async_trait;
use std::time::Duration;

use super::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::error::{DashboardError, Result};

pub struct ReqwestClient {
    client: reqwest::Client,
    cookie: Option<String>,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DashboardError::network("<client>", e.to_string()))?;
        Ok(Self {
            client,
            cookie: None,
        })
    }

    /// Send `cookie` (e.g. `sessionid=...`) with every request.
    pub fn with_session_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie.filter(|c| !c.trim().is_empty());
        self
    }
}

#[async_trait(?Send)]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DashboardError::network(&request.url, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::network(&request.url, e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
