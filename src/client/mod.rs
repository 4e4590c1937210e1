//! Client layer: orchestrates transport calls and maps transport ↔ domain.

mod http;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

pub use http::{BoxError, BoxFuture, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

use crate::domain::{
    ApiErrorDetail, ApiKey, ConversionError, ListParams, Message, MessageId, Model, Page,
    PageRequest, PageSize, PhoneNumberRecord, Resource, SendMessage, ValidationError,
};
use crate::pager::PageStream;
use crate::transport::{
    PageLayout, TransportError, decode_data, decode_error_body, decode_page, encode_page_query,
};

const DEFAULT_BASE_URL: &str = "https://api.telapi.dev/v2/";

/// Environment variable holding the API key read by [`TelApiClientBuilder::from_env`].
pub const API_KEY_ENV: &str = "TELAPI_API_KEY";
/// Optional environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "TELAPI_BASE_URL";

pub type PageFuture<R> = BoxFuture<'static, Result<Page<R>, TelApiError>>;

pub type PageFetcher<R> = Box<dyn FnMut(PageRequest) -> PageFuture<R> + Send>;

/// Lazy stream over every item of a list endpoint.
///
/// The first page is fetched by the call that returns the stream; later pages
/// are fetched while the stream is polled.
pub type ResourceStream<R> = PageStream<R, TelApiError, PageFetcher<R>, PageFuture<R>>;

#[derive(Debug, Clone)]
/// Authentication credentials for API calls.
pub enum Auth {
    /// API key sent as `Authorization: Bearer <key>`.
    ApiKey(ApiKey),
}

impl Auth {
    /// Create [`Auth::ApiKey`] and validate that the value is non-empty after trimming.
    pub fn api_key(value: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self::ApiKey(ApiKey::new(value)?))
    }

    fn push_headers(&self, headers: &mut Vec<(String, String)>) {
        match self {
            Self::ApiKey(key) => {
                headers.push(("Authorization".to_owned(), format!("Bearer {}", key.as_str())));
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`TelApiClient`].
pub enum TelApiError {
    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Non-successful HTTP status without a decodable `errors` body.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// Non-successful HTTP status with the API's `errors` array.
    #[error("API error (HTTP {status}): {}", summarize(.errors))]
    Api {
        status: u16,
        errors: Vec<ApiErrorDetail>,
    },

    /// Response body is not valid JSON.
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Response (or request model) does not match its schema.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn summarize(errors: &[ApiErrorDetail]) -> String {
    match errors {
        [] => "no details".to_owned(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl From<TransportError> for TelApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Json(err) => Self::Parse(err),
            TransportError::Conversion(err) => Self::Conversion(err),
        }
    }
}

#[derive(Clone)]
/// Builder for [`TelApiClient`].
///
/// Use this when you need to customize the base URL, timeout, user-agent,
/// default page size, or the HTTP transport itself.
pub struct TelApiClientBuilder {
    auth: Auth,
    base_url: String,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    default_page_size: PageSize,
    page_layout: PageLayout,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl fmt::Debug for TelApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("default_page_size", &self.default_page_size)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl TelApiClientBuilder {
    /// Create a builder with the default base URL and no timeout/user-agent override.
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            user_agent: None,
            default_page_size: PageSize::DEFAULT,
            page_layout: PageLayout::default(),
            transport: None,
        }
    }

    /// Builder configured from `TELAPI_API_KEY` and, if set, `TELAPI_BASE_URL`.
    pub fn from_env() -> Result<Self, TelApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TelApiError> {
        let key = lookup(API_KEY_ENV).unwrap_or_default();
        let mut builder = Self::new(Auth::api_key(key)?);
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            builder = builder.base_url(base_url);
        }
        Ok(builder)
    }

    /// Override the API base URL; endpoint paths are appended to it.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set an HTTP client timeout applied to the entire request.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Page size for list calls whose [`ListParams`] leave it unset.
    pub fn default_page_size(mut self, page_size: PageSize) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn page_layout(mut self, layout: PageLayout) -> Self {
        self.page_layout = layout;
        self
    }

    /// Execute requests through `transport` instead of the built-in reqwest client.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build a [`TelApiClient`].
    pub fn build(self) -> Result<TelApiClient, TelApiError> {
        let base_url = parse_base_url(&self.base_url)?;

        let http: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(user_agent) = self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                let client = builder
                    .build()
                    .map_err(|err| TelApiError::Transport(Box::new(err)))?;
                Arc::new(ReqwestTransport::new(client))
            }
        };

        Ok(TelApiClient {
            auth: self.auth,
            base_url,
            default_page_size: self.default_page_size,
            page_layout: self.page_layout,
            http,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TelApiError> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Clone)]
/// High-level API client.
///
/// Request bodies are built from validated models and sent as JSON; responses
/// are decoded against the target resource's schema. Single resources are
/// unwrapped from the `data` envelope, list endpoints return a
/// [`ResourceStream`].
pub struct TelApiClient {
    auth: Auth,
    base_url: Url,
    default_page_size: PageSize,
    page_layout: PageLayout,
    http: Arc<dyn HttpTransport>,
}

impl fmt::Debug for TelApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("default_page_size", &self.default_page_size)
            .finish_non_exhaustive()
    }
}

impl TelApiClient {
    /// Create a client using the default base URL and transport.
    ///
    /// For more customization, use [`TelApiClient::builder`].
    pub fn new(auth: Auth) -> Result<Self, TelApiError> {
        TelApiClientBuilder::new(auth).build()
    }

    /// Start building a client with custom settings.
    pub fn builder(auth: Auth) -> TelApiClientBuilder {
        TelApiClientBuilder::new(auth)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a message (`POST /messages`).
    ///
    /// Errors:
    /// - [`TelApiError::Api`] when the API rejects the request with an `errors` body,
    /// - [`TelApiError::HttpStatus`] for other non-2xx responses,
    /// - [`TelApiError::Conversion`] when the response does not match the message schema.
    pub async fn send_message(&self, request: SendMessage) -> Result<Message, TelApiError> {
        let body = request.to_model()?;
        self.create(&["messages"], &body).await
    }

    /// Fetch one message by id (`GET /messages/{id}`).
    pub async fn retrieve_message(&self, id: &MessageId) -> Result<Message, TelApiError> {
        self.retrieve(&["messages", id.as_str()]).await
    }

    /// List numbers owned by the account (`GET /phone_numbers`).
    pub async fn list_phone_numbers(
        &self,
        params: ListParams,
    ) -> Result<ResourceStream<PhoneNumberRecord>, TelApiError> {
        self.list(&["phone_numbers"], params).await
    }

    /// `GET` the endpoint at `path` and return the parsed JSON body.
    pub async fn get_json(
        &self,
        path: &[&str],
        query: Vec<(String, String)>,
    ) -> Result<Value, TelApiError> {
        let url = self.endpoint(path)?;
        let body = self.execute(Method::GET, url, query, None).await?;
        parse_body(&body)
    }

    /// Send `body` as JSON with `method` and return the parsed JSON response.
    pub async fn send_json(
        &self,
        method: Method,
        path: &[&str],
        body: Value,
    ) -> Result<Value, TelApiError> {
        let url = self.endpoint(path)?;
        let response = self.execute(method, url, Vec::new(), Some(body)).await?;
        parse_body(&response)
    }

    /// `GET` a single resource wrapped in the `data` envelope.
    pub async fn retrieve<R: Resource>(&self, path: &[&str]) -> Result<R, TelApiError> {
        let url = self.endpoint(path)?;
        let body = self.execute(Method::GET, url, Vec::new(), None).await?;
        let model = decode_data(&R::schema(), &body)?;
        Ok(R::from_model(&model)?)
    }

    /// `POST` a model and decode the created resource from the `data` envelope.
    pub async fn create<R: Resource>(&self, path: &[&str], body: &Model) -> Result<R, TelApiError> {
        let payload = body.encode()?;
        let url = self.endpoint(path)?;
        let response = self
            .execute(Method::POST, url, Vec::new(), Some(payload))
            .await?;
        let model = decode_data(&R::schema(), &response)?;
        Ok(R::from_model(&model)?)
    }

    /// Walk a paginated collection.
    ///
    /// The page at `params.start` is fetched before this returns, so an
    /// unreachable endpoint fails here rather than on the first poll.
    pub async fn list<R>(
        &self,
        path: &[&str],
        params: ListParams,
    ) -> Result<ResourceStream<R>, TelApiError>
    where
        R: Resource + Send + 'static,
    {
        let page_size = params.page_size.unwrap_or(self.default_page_size);
        let url = self.endpoint(path)?;
        let filters: Arc<[(String, String)]> = params.filters().into();

        let first = self
            .fetch_page::<R>(
                &url,
                &filters,
                page_size,
                PageRequest::Number(params.start.value()),
            )
            .await?;

        let client = self.clone();
        let fetcher: PageFetcher<R> = Box::new(move |request| -> PageFuture<R> {
            let client = client.clone();
            let url = url.clone();
            let filters = Arc::clone(&filters);
            Box::pin(async move {
                client
                    .fetch_page::<R>(&url, &filters, page_size, request)
                    .await
            })
        });

        Ok(PageStream::new(first, fetcher))
    }

    async fn fetch_page<R: Resource>(
        &self,
        url: &Url,
        filters: &[(String, String)],
        page_size: PageSize,
        request: PageRequest,
    ) -> Result<Page<R>, TelApiError> {
        let mut query = encode_page_query(&self.page_layout, &request, page_size);
        query.extend(filters.iter().cloned());

        let body = self.execute(Method::GET, url.clone(), query, None).await?;
        let page = decode_page(&self.page_layout, &R::schema(), &request, page_size, &body)?;
        tracing::debug!(
            page_number = page.page_number,
            items = page.items.len(),
            total = ?page.total,
            "decoded page"
        );
        Ok(page.try_map(|model| R::from_model(&model))?)
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url, TelApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<String, TelApiError> {
        let mut headers = vec![("Accept".to_owned(), "application/json".to_owned())];
        self.auth.push_headers(&mut headers);

        let request = HttpRequest {
            method,
            url,
            query,
            headers,
            body,
        };
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(TelApiError::Transport)?;
        tracing::debug!(status = response.status, "received response");

        if !(200..=299).contains(&response.status) {
            if let Some(errors) = decode_error_body(&response.body) {
                return Err(TelApiError::Api {
                    status: response.status,
                    errors,
                });
            }
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body)
            };
            return Err(TelApiError::HttpStatus {
                status: response.status,
                body,
            });
        }

        Ok(response.body)
    }
}

fn parse_body(body: &str) -> Result<Value, TelApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(TelApiError::Parse)
}
