use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use crate::Result;
use crate::interceptor::{Interceptor, Next};
use crate::matcher::AntPathMatcher;
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::util::header_str;

/// A header rule: header must be present, and when `value` is set, must
/// carry exactly that value.
#[derive(Clone, Debug)]
pub struct HeaderRule {
    pub name: String,
    pub value: Option<String>,
}

impl HeaderRule {
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        match header_str(&request.headers, &self.name) {
            Some(found) => self.value.as_deref().is_none_or(|expected| found == expected),
            None => false,
        }
    }
}

/// Wraps an interceptor with inclusion/exclusion predicates evaluated once
/// per request. On non-match the wrapped interceptor is skipped and the
/// chain continues.
///
/// Each predicate family (URL patterns, methods, header rules) follows the
/// same rule: any exclude match wins; an empty include list means
/// default-applicable; otherwise at least one include must match. The
/// overall result is the conjunction of all three families.
///
/// URL patterns use Ant-style glob semantics. Patterns prefixed with
/// `http://` or `https://` match against the complete URL; all other
/// patterns match against the query-stripped path only.
pub struct MappedInterceptor {
    delegate: Arc<dyn Interceptor>,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    include_methods: Vec<Method>,
    exclude_methods: Vec<Method>,
    include_headers: Vec<HeaderRule>,
    exclude_headers: Vec<HeaderRule>,
    path_matcher: AntPathMatcher,
}

impl MappedInterceptor {
    pub fn new(delegate: Arc<dyn Interceptor>) -> Self {
        Self {
            delegate,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            include_methods: Vec::new(),
            exclude_methods: Vec::new(),
            include_headers: Vec::new(),
            exclude_headers: Vec::new(),
            path_matcher: AntPathMatcher::new(),
        }
    }

    pub fn include_patterns<S, I>(mut self, patterns: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.include_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn exclude_patterns<S, I>(mut self, patterns: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.exclude_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn include_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.include_methods.extend(methods);
        self
    }

    pub fn exclude_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.exclude_methods.extend(methods);
        self
    }

    pub fn include_header(mut self, rule: HeaderRule) -> Self {
        self.include_headers.push(rule);
        self
    }

    pub fn exclude_header(mut self, rule: HeaderRule) -> Self {
        self.exclude_headers.push(rule);
        self
    }

    /// Whether the wrapped interceptor applies to this request.
    pub fn matches(&self, request: &HttpRequest) -> bool {
        self.matches_url(&request.url)
            && self.matches_method(&request.method)
            && self.matches_headers(request)
    }

    fn matches_url(&self, url: &str) -> bool {
        do_match(url, &self.include_patterns, &self.exclude_patterns, |pattern, url| {
            if pattern.starts_with("http://") || pattern.starts_with("https://") {
                self.path_matcher.matches(pattern, strip_query(url))
            } else {
                self.path_matcher.matches(pattern, lookup_path(url))
            }
        })
    }

    fn matches_method(&self, method: &Method) -> bool {
        do_match(method, &self.include_methods, &self.exclude_methods, |pattern, method| {
            *pattern == *method
        })
    }

    fn matches_headers(&self, request: &HttpRequest) -> bool {
        do_match(request, &self.include_headers, &self.exclude_headers, |rule, request| {
            rule.matches(request)
        })
    }
}

/// Exclude-first evaluation shared by all three predicate families.
fn do_match<P, S: ?Sized>(
    source: &S,
    includes: &[P],
    excludes: &[P],
    predicate: impl Fn(&P, &S) -> bool,
) -> bool {
    if excludes.iter().any(|pattern| predicate(pattern, source)) {
        return false;
    }
    if includes.is_empty() {
        return true;
    }
    includes.iter().any(|pattern| predicate(pattern, source))
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// The path component of a URL, without scheme, authority, or query.
fn lookup_path(url: &str) -> &str {
    let without_query = strip_query(url);
    match without_query.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_query[scheme_end + 3..];
            match after_scheme.find('/') {
                Some(path_start) => &after_scheme[path_start..],
                None => "/",
            }
        }
        None => without_query,
    }
}

#[async_trait]
impl Interceptor for MappedInterceptor {
    async fn intercept(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse> {
        if self.matches(&request) {
            self.delegate.intercept(request, context, next).await
        } else {
            next.run(request, context).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use http::Method;

    use super::{HeaderRule, MappedInterceptor, lookup_path};
    use crate::Result;
    use crate::interceptor::{Interceptor, Next};
    use crate::request::{HttpRequest, RequestContext};
    use crate::response::HttpResponse;

    struct NoopInterceptor;

    #[async_trait]
    impl Interceptor for NoopInterceptor {
        async fn intercept(
            &self,
            request: HttpRequest,
            context: &mut RequestContext,
            next: Next<'_>,
        ) -> Result<HttpResponse> {
            next.run(request, context).await
        }
    }

    fn guard() -> MappedInterceptor {
        MappedInterceptor::new(Arc::new(NoopInterceptor))
    }

    #[test]
    fn exclude_pattern_wins_over_include() {
        let guard = guard()
            .include_patterns(["/api/**"])
            .exclude_patterns(["/api/internal/**"]);
        assert!(guard.matches(&HttpRequest::get("/api/users")));
        assert!(!guard.matches(&HttpRequest::get("/api/internal/users")));
    }

    #[test]
    fn empty_includes_are_default_applicable() {
        assert!(guard().matches(&HttpRequest::get("/anything/at/all")));
    }

    #[test]
    fn url_match_ignores_query_string() {
        let guard = guard().include_patterns(["/api/**"]);
        assert!(guard.matches(&HttpRequest::get("/api/users?page=2")));
    }

    #[test]
    fn relative_pattern_matches_path_of_absolute_url() {
        let guard = guard().include_patterns(["/app/**/user/login"]);
        assert!(guard.matches(&HttpRequest::get("http://xx.xx:52001/app/v1.0/user/login")));
        assert!(!guard.matches(&HttpRequest::get("http://xx.xx:52001/app/v1.0/user/authCode")));
    }

    #[test]
    fn full_url_pattern_matches_complete_url() {
        let guard = guard().include_patterns(["https://api.example.com/**"]);
        assert!(guard.matches(&HttpRequest::get("https://api.example.com/v1/items")));
        assert!(!guard.matches(&HttpRequest::get("https://other.example.com/v1/items")));
    }

    #[test]
    fn method_and_header_results_are_conjoined() {
        let guard = guard()
            .include_methods([Method::POST])
            .include_header(HeaderRule::value("x-channel", "mobile"));

        let matching = HttpRequest::post("/api/users")
            .try_header("x-channel", "mobile")
            .expect("header should parse");
        assert!(guard.matches(&matching));

        let wrong_method = HttpRequest::get("/api/users")
            .try_header("x-channel", "mobile")
            .expect("header should parse");
        assert!(!guard.matches(&wrong_method));

        let wrong_header = HttpRequest::post("/api/users")
            .try_header("x-channel", "desktop")
            .expect("header should parse");
        assert!(!guard.matches(&wrong_header));
    }

    #[test]
    fn header_presence_rule_ignores_value() {
        let guard = guard().exclude_header(HeaderRule::present("x-skip-auth"));
        let skipped = HttpRequest::get("/api/users")
            .try_header("x-skip-auth", "anything")
            .expect("header should parse");
        assert!(!guard.matches(&skipped));
        assert!(guard.matches(&HttpRequest::get("/api/users")));
    }

    #[test]
    fn lookup_path_extracts_path_component() {
        assert_eq!(lookup_path("https://a.b.com/member/1?x=2"), "/member/1");
        assert_eq!(lookup_path("https://a.b.com"), "/");
        assert_eq!(lookup_path("/member/1?x=2"), "/member/1");
    }
}
