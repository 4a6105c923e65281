//! Usage: Authenticated HTTP call seam (`HttpTransport`) and its reqwest-backed implementation.
//!
//! Every remote call in the crate goes through this trait so orchestration code can be exercised
//! against scripted fakes. The trait stays object-safe: futures are boxed by hand.

use crate::shared::error::AppResult;
use crate::shared::security::{mask_token, sanitize_body_snippet};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// One REST call: method, absolute URL, header map, optional body.
#[derive(Clone, PartialEq)]
pub struct HttpRequestConfig {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub data: Option<RequestBody>,
}

impl HttpRequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            data: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, access_token: &str) -> Self {
        self.header("Authorization", format!("Bearer {access_token}"))
    }

    pub fn json(mut self, body: Value) -> Self {
        self.data = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.data = Some(RequestBody::Form(fields));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for HttpRequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.clone(), mask_token(value))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();
        f.debug_struct("HttpRequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP call. Transport-level failures (connect, timeout, read) are errors;
/// any HTTP status is returned as a response so callers can interpret it.
pub trait HttpTransport: Send + Sync {
    fn send<'a>(&'a self, config: HttpRequestConfig) -> BoxFuture<'a, AppResult<HttpResponse>>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn send<'a>(&'a self, config: HttpRequestConfig) -> BoxFuture<'a, AppResult<HttpResponse>> {
        (**self).send(config)
    }
}

/// `httpRequest` semantics: non-2xx and undecodable bodies become `NETWORK_ERROR`.
pub async fn request_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    config: HttpRequestConfig,
) -> AppResult<T> {
    let method = config.method;
    let url = config.url.clone();
    let response = transport.send(config).await?;
    if !response.is_success() {
        return Err(format!(
            "NETWORK_ERROR: {} {} returned status={} body={}",
            method.as_str(),
            url,
            response.status,
            sanitize_body_snippet(&response.body)
        )
        .into());
    }
    parse_json_body(&response.body, &url)
}

/// Like [`request_json`] but ignores the response body (e.g. empty `204`).
pub async fn request_no_content(
    transport: &dyn HttpTransport,
    config: HttpRequestConfig,
) -> AppResult<()> {
    let method = config.method;
    let url = config.url.clone();
    let response = transport.send(config).await?;
    if !response.is_success() {
        return Err(format!(
            "NETWORK_ERROR: {} {} returned status={} body={}",
            method.as_str(),
            url,
            response.status,
            sanitize_body_snippet(&response.body)
        )
        .into());
    }
    Ok(())
}

pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &str, url: &str) -> AppResult<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body)
        .map_err(|e| format!("NETWORK_ERROR: malformed response from {url}: {e}").into())
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("template-migrator/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| format!("INTERNAL_ERROR: http client init failed: {e}"))?;
        Ok(Self { client })
    }

    async fn execute(&self, config: HttpRequestConfig) -> AppResult<HttpResponse> {
        let method = match config.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        };
        let mut builder = self.client.request(method, config.url.trim());
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match config.data {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            format!(
                "NETWORK_ERROR: {} {} failed: {e}",
                config.method.as_str(),
                config.url
            )
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("NETWORK_ERROR: response read failed: {e}"))?;
        tracing::debug!(
            method = config.method.as_str(),
            url = %config.url,
            status,
            "http request completed"
        );
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send<'a>(&'a self, config: HttpRequestConfig) -> BoxFuture<'a, AppResult<HttpResponse>> {
        Box::pin(self.execute(config))
    }
}
