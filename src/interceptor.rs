use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::adapter::HttpAdapter;
use crate::request::{HttpBody, HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::util::{header_str, serialize_request_body, supports_request_body};

/// Intercepts client-side HTTP requests.
///
/// An interceptor may rewrite the request before forwarding it through
/// `next`, post-process the response on the way back, or short-circuit
/// the chain entirely by not calling `next`. Failing with an error
/// interrupts the request.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse>;
}

/// The remainder of one chain execution.
///
/// Each `send` gets a fresh `Next` whose cursor is private to that call,
/// so one client instance can serve concurrent requests. The continuation
/// is consumed by [`run`](Next::run), which means an interceptor can
/// invoke the rest of the chain at most once.
pub struct Next<'a> {
    adapter: &'a dyn HttpAdapter,
    interceptors: &'a [Arc<dyn Interceptor>],
    pos: usize,
}

impl<'a> Next<'a> {
    pub(crate) fn new(adapter: &'a dyn HttpAdapter, interceptors: &'a [Arc<dyn Interceptor>]) -> Self {
        Self {
            adapter,
            interceptors,
            pos: 0,
        }
    }

    /// Run the remaining interceptors, then terminal framing and the
    /// adapter.
    pub async fn run(
        mut self,
        mut request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse> {
        if self.pos < self.interceptors.len() {
            let interceptor = Arc::clone(&self.interceptors[self.pos]);
            self.pos += 1;
            return interceptor.intercept(request, context, self).await;
        }

        if supports_request_body(&request.method) {
            let content_type = header_str(&request.headers, http::header::CONTENT_TYPE.as_str())
                .map(str::to_owned);
            if let Some(bytes) =
                serialize_request_body(mem::take(&mut request.body), content_type.as_deref())?
            {
                request.body = HttpBody::Bytes(bytes);
            }
        }
        debug!(method = %request.method, url = %request.url, "dispatching request to adapter");
        self.adapter.send(request, context).await
    }
}
