use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::error::Error;
use crate::retry::RetryOptions;
use crate::util::{
    APPLICATION_FORM_URLENCODED, APPLICATION_JSON, TEXT_PLAIN, parse_header_name,
    parse_header_value,
};

/// Request payload, serialized at the end of the interceptor chain
/// according to the request Content-Type.
#[derive(Clone, Debug, Default)]
pub enum HttpBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(Value),
    Form(Vec<(String, String)>),
}

impl HttpBody {
    pub fn json<T>(payload: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload).map_err(|source| Error::SerializeBody {
            message: source.to_string(),
        })?;
        Ok(Self::Json(value))
    }

    /// The serialized bytes, available once terminal framing has run.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The payload object used to make an HTTP request.
///
/// Mutable during chain traversal: interceptors may rewrite the url,
/// headers, and body before forwarding.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: HttpBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: HttpBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: HttpBody) -> Self {
        self.body = body;
        self
    }

    pub fn json<T>(mut self, payload: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        self.body = HttpBody::json(payload)?;
        Ok(self.header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON)))
    }

    pub fn form<K, V, I>(mut self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.body = HttpBody::Form(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self.header(
            CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_FORM_URLENCODED),
        )
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = HttpBody::Text(text.into());
        self.header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))
    }
}

/// Per-call request attributes.
///
/// Owned exclusively by one `send`; never shared across concurrent calls.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// Adapter-level timeout for one round trip. The default is supplied
    /// by the adapter implementation.
    pub timeout: Option<Duration>,
    /// Per-call override for a wrapping [`RetryHttpClient`](crate::retry::RetryHttpClient).
    pub retry_options: Option<RetryOptions>,
    /// Hint for adapters that can surface request progress.
    pub show_progress: bool,
    attributes: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_options(mut self, retry_options: RetryOptions) -> Self {
        self.retry_options = Some(retry_options);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
