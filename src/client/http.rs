use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

use reqwest::Method;
use serde_json::Value;
use url::Url;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
/// One API call as handed to an [`HttpTransport`].
pub struct HttpRequest {
    pub method: Method,
    /// Endpoint URL without the query string.
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON body; `None` for `GET`.
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes HTTP requests for [`TelApiClient`](super::TelApiClient).
///
/// Retries, proxies and TLS settings belong to the implementation. The client
/// only interprets the status code and body.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, BoxError>>;
}

#[derive(Debug, Clone)]
/// Default transport backed by a [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let HttpRequest {
                method,
                mut url,
                query,
                headers,
                body,
            } = request;
            if !query.is_empty() {
                url.query_pairs_mut().extend_pairs(&query);
            }

            let mut builder = self.client.request(method, url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}
