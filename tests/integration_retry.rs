use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::StatusCode;
use reqflow::prelude::*;
use reqflow::{ResendRetryHandler, Result, RetryHandler, RetryPredicate};

/// Inner client double that fails a configurable number of times before
/// succeeding (`usize::MAX` = always fail).
struct FlakyClient {
    failures: usize,
    status: StatusCode,
    calls: AtomicUsize,
}

impl FlakyClient {
    fn always_failing(status: StatusCode) -> Self {
        Self {
            failures: usize::MAX,
            status,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_times(failures: usize, status: StatusCode) -> Self {
        Self {
            failures,
            status,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl HttpClient for FlakyClient {
    async fn send(
        &self,
        _request: HttpRequest,
        _context: &mut RequestContext,
    ) -> Result<HttpResponse> {
        let call = self.calls.fetch_add(1, Ordering::AcqRel);
        if call < self.failures {
            Err(Error::Adapter {
                response: HttpResponse::from_status(self.status),
            })
        } else {
            Ok(HttpResponse::success("{}"))
        }
    }
}

#[tokio::test(start_paused = true)]
async fn permanently_failing_client_is_invoked_exactly_retries_plus_one_times() {
    let inner = Arc::new(FlakyClient::always_failing(StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(2)
            .delay(Duration::from_millis(100))
            .max_timeout(Duration::from_millis(500)),
    );

    let error = client
        .get("/v1/items")
        .await
        .expect_err("request should fail");
    assert_eq!(error.code(), ErrorCode::RetryExhausted);
    assert_eq!(inner.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_exhaustion_not_timeout_when_retries_fit_the_budget() {
    // retries=2, delay=100ms, max_timeout=500ms against a permanent 503:
    // two retries at ~100ms each fit comfortably under 500ms
    let inner = Arc::new(FlakyClient::always_failing(StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(2)
            .delay(Duration::from_millis(100))
            .max_timeout(Duration::from_millis(500)),
    );

    let started = Instant::now();
    let error = client
        .get("/v1/items")
        .await
        .expect_err("request should fail");
    assert_eq!(error.code(), ErrorCode::RetryExhausted);
    assert!(matches!(
        error,
        Error::RetryExhausted { retries: 2, .. }
    ));
    assert_eq!(inner.calls(), 3);
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn recovery_before_the_ceiling_resolves_with_the_response() {
    let inner = Arc::new(FlakyClient::failing_times(2, StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(3)
            .delay(Duration::from_millis(50))
            .max_timeout(Duration::from_secs(5)),
    );

    let response = client
        .get("/v1/items")
        .await
        .expect("request should recover");
    assert!(response.ok);
    assert_eq!(inner.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn hard_timeout_wins_the_race_and_stops_further_attempts() {
    // delay=200ms per retry, budget 300ms (+5*10ms slack): the first retry
    // lands around 200-230ms, the second would land past 400ms, so the
    // timer at 350ms fires in between
    let inner = Arc::new(FlakyClient::always_failing(StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(5)
            .delay(Duration::from_millis(200))
            .max_timeout(Duration::from_millis(300)),
    );

    let error = client
        .get("/v1/items")
        .await
        .expect_err("request should time out");
    match error {
        Error::RetryTimeout {
            max_timeout,
            count_retry,
        } => {
            assert_eq!(max_timeout, Duration::from_millis(300));
            assert!(count_retry < 5);
        }
        other => panic!("expected retry timeout, got {other:?}"),
    }

    // no retry side effects after rejection
    let calls_at_rejection = inner.calls();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(inner.calls(), calls_at_rejection);
}

#[tokio::test(start_paused = true)]
async fn when_rejection_gives_up_immediately_with_the_failure() {
    struct ServerErrorsOnly;

    impl RetryPredicate for ServerErrorsOnly {
        fn should_retry(&self, response: &HttpResponse) -> bool {
            response.status_code().is_none_or(|code| code >= 500)
        }
    }

    let inner = Arc::new(FlakyClient::always_failing(StatusCode::BAD_REQUEST));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(5)
            .delay(Duration::from_millis(20))
            .max_timeout(Duration::from_secs(5))
            .when(Arc::new(ServerErrorsOnly)),
    );

    let error = client
        .get("/v1/items")
        .await
        .expect_err("request should fail");
    // the first failure always schedules one retry; its 400 outcome fails
    // the predicate, so the coordinator gives up with that failure rather
    // than exhausting the remaining budget
    assert_eq!(error.code(), ErrorCode::Adapter);
    assert_eq!(
        error.response().and_then(HttpResponse::status_code),
        Some(400)
    );
    assert_eq!(inner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn custom_on_retry_handler_drives_the_attempts() {
    struct CountingHandler {
        invocations: AtomicUsize,
    }

    #[async_trait]
    impl RetryHandler for CountingHandler {
        async fn on_retry(
            &self,
            client: &dyn HttpClient,
            request: HttpRequest,
            context: &mut RequestContext,
            last_response: &HttpResponse,
        ) -> Result<HttpResponse> {
            assert_eq!(last_response.status_code(), Some(503));
            self.invocations.fetch_add(1, Ordering::AcqRel);
            client.send(request, context).await
        }
    }

    let handler = Arc::new(CountingHandler {
        invocations: AtomicUsize::new(0),
    });
    let inner = Arc::new(FlakyClient::failing_times(1, StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard()
            .retries(2)
            .delay(Duration::from_millis(10))
            .max_timeout(Duration::from_secs(5))
            .on_retry(Arc::clone(&handler) as Arc<dyn RetryHandler>),
    );

    client.get("/v1/items").await.expect("request should recover");
    assert_eq!(handler.invocations.load(Ordering::Acquire), 1);
    assert_eq!(inner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn context_retry_options_override_the_constructed_ones() {
    let inner = Arc::new(FlakyClient::always_failing(StatusCode::SERVICE_UNAVAILABLE));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard().retries(5),
    );

    let mut context = RequestContext::new().retry_options(
        RetryOptions::standard()
            .retries(1)
            .delay(Duration::from_millis(10))
            .max_timeout(Duration::from_secs(5))
            .on_retry(Arc::new(ResendRetryHandler)),
    );
    let error = client
        .send(HttpRequest::get("/v1/items"), &mut context)
        .await
        .expect_err("request should fail");
    assert!(matches!(error, Error::RetryExhausted { retries: 1, .. }));
    assert_eq!(inner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn successful_first_attempt_never_consults_the_retry_machinery() {
    let inner = Arc::new(FlakyClient::failing_times(0, StatusCode::OK));
    let client = RetryHttpClient::new(
        Arc::clone(&inner) as Arc<dyn HttpClient>,
        RetryOptions::standard().retries(3),
    );

    let response = client.get("/v1/items").await.expect("request should succeed");
    assert!(response.ok);
    assert_eq!(inner.calls(), 1);
    assert_eq!(client.retry_count(), 0);
}
