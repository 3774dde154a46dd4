use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::error::Error;
use crate::interceptor::{Interceptor, Next};
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;

pub const LB_SCHEME: &str = "lb://";
pub const DEFAULT_SERVICE_NAME: &str = "default";

/// Resolves a logical request url to a real one.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, url: &str) -> Result<String>;
}

/// Resolver over an explicit service-name-to-base-url map.
///
/// `lb://{service}/path?query` becomes `{base_url}/path?query`; absolute
/// `http(s)://` urls pass through untouched.
pub struct StaticRouteResolver {
    mapping: HashMap<String, String>,
}

impl StaticRouteResolver {
    pub fn new<K, V, I>(mapping: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(service, base_url)| (service.into(), base_url.into()))
                .collect(),
        }
    }

    /// Map every `lb://default/...` url onto one base url.
    pub fn single(base_url: impl Into<String>) -> Self {
        Self::new([(DEFAULT_SERVICE_NAME.to_owned(), base_url.into())])
    }
}

impl RouteResolver for StaticRouteResolver {
    fn resolve(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_owned());
        }
        let Some(rest) = url.strip_prefix(LB_SCHEME) else {
            return Err(Error::UnresolvedRoute { url: url.to_owned() });
        };
        let (service, path_and_query) = match rest.split_once('/') {
            Some((service, tail)) => (service, tail),
            None => (rest, ""),
        };
        let Some(base_url) = self.mapping.get(service) else {
            return Err(Error::UnresolvedRoute { url: url.to_owned() });
        };
        let base = base_url.trim_end_matches('/');
        if path_and_query.is_empty() {
            Ok(base.to_owned())
        } else {
            Ok(format!("{base}/{path_and_query}"))
        }
    }
}

/// Rewrites `lb://` urls through the injected resolver before forwarding.
pub struct RoutingInterceptor {
    resolver: Arc<dyn RouteResolver>,
}

impl RoutingInterceptor {
    pub fn new(resolver: Arc<dyn RouteResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Interceptor for RoutingInterceptor {
    async fn intercept(
        &self,
        mut request: HttpRequest,
        context: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse> {
        request.url = self.resolver.resolve(&request.url)?;
        next.run(request, context).await
    }
}
