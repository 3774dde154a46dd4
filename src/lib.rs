//! `reqflow` is a pluggable HTTP client pipeline for per-platform adapters:
//! an ordered interceptor chain, bounded retry with hard-timeout racing,
//! single-flight authentication-token refresh, and connectivity-aware
//! request suspension.
//!
//! The crate performs no I/O itself. A platform supplies the
//! [`HttpAdapter`] that executes one round trip; everything else layers on
//! top of it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use reqflow::prelude::*;
//!
//! struct FetchAdapter;
//!
//! #[async_trait]
//! impl HttpAdapter for FetchAdapter {
//!     async fn send(
//!         &self,
//!         request: HttpRequest,
//!         _context: &mut RequestContext,
//!     ) -> reqflow::Result<HttpResponse> {
//!         // perform the platform round trip here
//!         let _ = request;
//!         Ok(HttpResponse::success("{}"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> reqflow::Result<()> {
//!     let client = DefaultHttpClient::builder(Arc::new(FetchAdapter))
//!         .interceptor(Arc::new(RoutingInterceptor::new(Arc::new(
//!             StaticRouteResolver::single("https://api.example.com"),
//!         ))))
//!         .try_build()?;
//!
//!     let retrying = RetryHttpClient::new(
//!         Arc::new(client),
//!         RetryOptions::standard()
//!             .retries(2)
//!             .delay(Duration::from_millis(100))
//!             .max_timeout(Duration::from_millis(500)),
//!     );
//!
//!     let response = retrying.get("lb://default/v1/items").await?;
//!     println!("ok={} status={:?}", response.ok, response.status_code());
//!     Ok(())
//! }
//! ```
//!
//! # Recommended Defaults
//!
//! - Install [`NetworkInterceptor`] ahead of every other interceptor.
//! - Create a fresh [`RetryHttpClient`] per logical send; its counters are
//!   single-use.
//! - Keep one [`RefreshTokenAuthenticator`] per credential so concurrent
//!   requests share its single-flight refresh.

mod adapter;
mod auth;
mod client;
mod error;
mod interceptor;
mod mapped;
mod matcher;
mod network;
mod request;
mod response;
mod retry;
mod routing;
mod util;

pub use crate::adapter::HttpAdapter;
pub use crate::auth::{
    AuthenticationInterceptor, AuthenticationStrategy, AuthenticationToken, Authenticator,
    DEFAULT_AHEAD_OF_TIMES, RefreshTokenAuthenticator,
};
pub use crate::client::{DefaultHttpClient, DefaultHttpClientBuilder, HttpClient};
pub use crate::error::{Error, ErrorCode};
pub use crate::interceptor::{Interceptor, Next};
pub use crate::mapped::{HeaderRule, MappedInterceptor};
pub use crate::matcher::AntPathMatcher;
pub use crate::network::{
    DEFAULT_SPIN_WAIT_MAX, DEFAULT_TRY_WAIT_NETWORK_COUNT, DefaultNoneNetworkFailBack,
    MAX_SPIN_WAIT, MAX_TRY_WAIT_NETWORK_COUNT, NetworkInterceptor, NetworkInterceptorBuilder,
    NetworkStatus, NetworkStatusListener, NetworkType, NoneNetworkFailBack,
    StaticNetworkStatusListener,
};
pub use crate::request::{HttpBody, HttpRequest, RequestContext};
pub use crate::response::HttpResponse;
pub use crate::retry::{
    ResendRetryHandler, RetryHandler, RetryHttpClient, RetryOptions, RetryPredicate,
    ServerErrorRetryPredicate,
};
pub use crate::routing::{
    DEFAULT_SERVICE_NAME, LB_SCHEME, RouteResolver, RoutingInterceptor, StaticRouteResolver,
};
pub use crate::util::{
    APPLICATION_FORM_URLENCODED, APPLICATION_JSON, Clock, SystemClock, TEXT_PLAIN,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        AuthenticationInterceptor, AuthenticationStrategy, AuthenticationToken, Authenticator,
        DefaultHttpClient, Error, ErrorCode, HttpAdapter, HttpBody, HttpClient, HttpRequest,
        HttpResponse, Interceptor, MappedInterceptor, NetworkInterceptor, NetworkStatus,
        NetworkStatusListener, Next, RefreshTokenAuthenticator, RequestContext, RetryHttpClient,
        RetryOptions, RoutingInterceptor, StaticRouteResolver,
    };
}

#[cfg(test)]
mod tests;
