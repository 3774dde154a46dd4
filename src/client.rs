use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use http::header::CONTENT_TYPE;
use tracing::debug;

use crate::Result;
use crate::adapter::HttpAdapter;
use crate::interceptor::{Interceptor, Next};
use crate::request::{HttpBody, HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::util::{APPLICATION_JSON, parse_header_value, supports_request_body};

/// A client that can execute one HTTP request.
///
/// Implemented by [`DefaultHttpClient`] (the interceptor chain engine) and
/// by [`RetryHttpClient`](crate::retry::RetryHttpClient), which wraps any
/// other client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse>;

    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::new(Method::GET, url), &mut RequestContext::new())
            .await
    }

    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::new(Method::HEAD, url), &mut RequestContext::new())
            .await
    }

    async fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.send(
            HttpRequest::new(Method::DELETE, url),
            &mut RequestContext::new(),
        )
        .await
    }

    async fn post(&self, url: &str, body: HttpBody) -> Result<HttpResponse> {
        self.send(
            HttpRequest::new(Method::POST, url).body(body),
            &mut RequestContext::new(),
        )
        .await
    }

    async fn put(&self, url: &str, body: HttpBody) -> Result<HttpResponse> {
        self.send(
            HttpRequest::new(Method::PUT, url).body(body),
            &mut RequestContext::new(),
        )
        .await
    }

    async fn patch(&self, url: &str, body: HttpBody) -> Result<HttpResponse> {
        self.send(
            HttpRequest::new(Method::PATCH, url).body(body),
            &mut RequestContext::new(),
        )
        .await
    }
}

/// The interceptor chain engine.
///
/// Threads every request through the configured interceptors in order,
/// then performs terminal framing and hands the request to the adapter.
/// Responses bubble back through the same interceptors in reverse.
pub struct DefaultHttpClient {
    adapter: Arc<dyn HttpAdapter>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    default_produce: http::HeaderValue,
}

impl DefaultHttpClient {
    pub fn new(adapter: Arc<dyn HttpAdapter>) -> Self {
        Self {
            adapter,
            interceptors: Vec::new(),
            default_produce: http::HeaderValue::from_static(APPLICATION_JSON),
        }
    }

    pub fn builder(adapter: Arc<dyn HttpAdapter>) -> DefaultHttpClientBuilder {
        DefaultHttpClientBuilder {
            adapter,
            interceptors: Vec::new(),
            default_produce: APPLICATION_JSON.to_owned(),
        }
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn send(
        &self,
        mut request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse> {
        if supports_request_body(&request.method) && !request.headers.contains_key(CONTENT_TYPE) {
            request
                .headers
                .insert(CONTENT_TYPE, self.default_produce.clone());
        }
        debug!(
            method = %request.method,
            url = %request.url,
            interceptors = self.interceptors.len(),
            "send http request"
        );
        Next::new(self.adapter.as_ref(), &self.interceptors)
            .run(request, context)
            .await
    }
}

pub struct DefaultHttpClientBuilder {
    adapter: Arc<dyn HttpAdapter>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    default_produce: String,
}

impl DefaultHttpClientBuilder {
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn interceptors<I>(mut self, interceptors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Interceptor>>,
    {
        self.interceptors.extend(interceptors);
        self
    }

    /// Default request body Content-Type, filled in for body-carrying
    /// methods that did not set one.
    pub fn default_produce(mut self, media_type: impl Into<String>) -> Self {
        self.default_produce = media_type.into();
        self
    }

    pub fn try_build(self) -> Result<DefaultHttpClient> {
        let default_produce = parse_header_value("content-type", &self.default_produce)?;
        Ok(DefaultHttpClient {
            adapter: self.adapter,
            interceptors: self.interceptors,
            default_produce,
        })
    }
}
