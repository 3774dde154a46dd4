use std::mem;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use tokio::sync::oneshot;
use tracing::debug;

use crate::Result;
use crate::error::Error;
use crate::interceptor::{Interceptor, Next};
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::util::{Clock, SystemClock, lock_unpoisoned, parse_header_value};

/// Refresh tokens this far ahead of the access token expiry.
pub const DEFAULT_AHEAD_OF_TIMES: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug)]
pub struct AuthenticationToken {
    pub authorization: String,
    pub expire_time: SystemTime,
    pub refresh_token: Option<String>,
    /// Expiry of the refresh token itself; `None` means it never expires.
    pub refresh_expire_time: Option<SystemTime>,
}

/// Token acquisition and refresh, implemented against a concrete identity
/// provider.
#[async_trait]
pub trait AuthenticationStrategy: Send + Sync {
    async fn get_token(&self, request: &HttpRequest) -> Result<AuthenticationToken>;

    async fn refresh_token(
        &self,
        token: &AuthenticationToken,
        request: &HttpRequest,
    ) -> Result<AuthenticationToken>;

    fn append_authorization_header(
        &self,
        token: &AuthenticationToken,
        request: &mut HttpRequest,
    ) -> Result<()> {
        let value = parse_header_value(AUTHORIZATION.as_str(), &token.authorization)?;
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Attaches an authorization header to a request, refreshing credentials
/// when needed.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: HttpRequest) -> Result<HttpRequest>;
}

type RefreshResult = Result<AuthenticationToken>;

/// Token failures keep their Unauthorized classification; anything else
/// is reclassified so callers can tell credential failures apart from
/// ordinary adapter failures.
fn as_unauthorized(error: Error) -> Error {
    match error {
        unauthorized @ Error::Unauthorized { .. } => unauthorized,
        other => Error::unauthorized(other.to_string()),
    }
}

struct RefreshState {
    refreshing: bool,
    wait_queue: Vec<oneshot::Sender<RefreshResult>>,
}

/// Token authenticator with single-flight refresh.
///
/// Under concurrent callers at most one refresh is in flight: the first
/// caller to observe `refreshing == false` performs the refresh while
/// every other caller parks on the wait queue and is settled with the
/// same outcome. This matters because refresh endpoints typically
/// invalidate the previous refresh token, so duplicate concurrent
/// refreshes would race and strand callers with a dead token.
pub struct RefreshTokenAuthenticator {
    strategy: Arc<dyn AuthenticationStrategy>,
    clock: Arc<dyn Clock>,
    ahead_of_times: Duration,
    synchronous_refresh: bool,
    state: Mutex<RefreshState>,
}

impl RefreshTokenAuthenticator {
    pub fn new(strategy: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            strategy,
            clock: Arc::new(SystemClock),
            ahead_of_times: DEFAULT_AHEAD_OF_TIMES,
            synchronous_refresh: true,
            state: Mutex::new(RefreshState {
                refreshing: false,
                wait_queue: Vec::new(),
            }),
        }
    }

    pub fn ahead_of_times(mut self, ahead_of_times: Duration) -> Self {
        self.ahead_of_times = ahead_of_times;
        self
    }

    /// Whether refreshes are coordinated through the wait queue
    /// (default). When disabled every caller refreshes independently,
    /// which requires the server to tolerate multiple live tokens.
    pub fn synchronous_refresh(mut self, synchronous_refresh: bool) -> Self {
        self.synchronous_refresh = synchronous_refresh;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The refresh token is usable while its own expiry has not passed.
    fn refresh_token_effective(&self, token: &AuthenticationToken) -> bool {
        token
            .refresh_expire_time
            .is_none_or(|expire| expire > self.clock.now_system())
    }

    async fn refresh(
        &self,
        request: &HttpRequest,
        token: &AuthenticationToken,
    ) -> RefreshResult {
        if !self.synchronous_refresh {
            // concurrent refresh: every caller refreshes on its own
            return self.dispatch_refresh(request, token).await;
        }

        let waiter = {
            let mut state = lock_unpoisoned(&self.state);
            if state.refreshing {
                let (sender, receiver) = oneshot::channel();
                state.wait_queue.push(sender);
                Some(receiver)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(receiver) = waiter {
            debug!("token refresh already in flight, joining wait queue");
            return match receiver.await {
                Ok(result) => result,
                Err(_) => Err(Error::unauthorized("token refresh abandoned")),
            };
        }

        let leader = RefreshLeader {
            state: &self.state,
            settled: false,
        };
        let result = self.dispatch_refresh(request, token).await;
        leader.settle(&result);
        result
    }

    async fn dispatch_refresh(
        &self,
        request: &HttpRequest,
        token: &AuthenticationToken,
    ) -> RefreshResult {
        debug!("refreshing authentication token");
        self.strategy
            .refresh_token(token, request)
            .await
            .map_err(as_unauthorized)
    }
}

/// Settles the wait queue exactly once per refresh cycle, including when
/// the refreshing task is cancelled mid-flight.
struct RefreshLeader<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl RefreshLeader<'_> {
    fn settle(mut self, result: &RefreshResult) {
        self.settled = true;
        Self::drain(self.state, result);
    }

    fn drain(state: &Mutex<RefreshState>, result: &RefreshResult) {
        let waiters = {
            let mut state = lock_unpoisoned(state);
            state.refreshing = false;
            mem::take(&mut state.wait_queue)
        };
        debug!(waiters = waiters.len(), "token refresh settled");
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for RefreshLeader<'_> {
    fn drop(&mut self) {
        if !self.settled {
            Self::drain(self.state, &Err(Error::unauthorized("token refresh abandoned")));
        }
    }
}

#[async_trait]
impl Authenticator for RefreshTokenAuthenticator {
    async fn authenticate(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        let token = match self.strategy.get_token(&request).await {
            Ok(token) => token,
            Err(error) => return Err(as_unauthorized(error)),
        };

        let expire_horizon = self.clock.now_system() + self.ahead_of_times;
        let token = if token.expire_time <= expire_horizon && self.refresh_token_effective(&token)
        {
            self.refresh(&request, &token).await?
        } else {
            token
        };

        self.strategy.append_authorization_header(&token, &mut request)?;
        Ok(request)
    }
}

/// Interceptor that authenticates the request before forwarding it.
pub struct AuthenticationInterceptor {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticationInterceptor {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Interceptor for AuthenticationInterceptor {
    async fn intercept(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse> {
        let request = self.authenticator.authenticate(request).await?;
        next.run(request, context).await
    }
}
