use async_trait::async_trait;

use crate::Result;
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;

/// One request/response round trip, implemented per platform.
///
/// Implementations must fail with [`Error::Adapter`](crate::Error::Adapter)
/// carrying a response shape (`ok: false`, a status when one was received)
/// rather than an arbitrary error type, so retry predicates can inspect
/// the status code.
///
/// By the time an adapter sees a request, terminal framing has already
/// serialized the body: `request.body` is either `Empty` or `Bytes`.
#[async_trait]
pub trait HttpAdapter: Send + Sync {
    async fn send(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse>;
}
