use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::Result;
use crate::error::Error;
use crate::interceptor::{Interceptor, Next};
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;
use crate::util::lock_unpoisoned;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkType {
    Wifi,
    Cellular2G,
    Cellular3G,
    Cellular4G,
    Cellular5G,
    Unknown,
    None,
}

/// Last-known connectivity, replaced wholesale on every change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_connected: bool,
    pub network_type: NetworkType,
}

impl NetworkStatus {
    pub const fn connected(network_type: NetworkType) -> Self {
        Self {
            is_connected: true,
            network_type,
        }
    }

    pub const fn offline() -> Self {
        Self {
            is_connected: false,
            network_type: NetworkType::None,
        }
    }
}

/// Connectivity source, implemented per platform.
///
/// `subscribe` returns a watch receiver carrying the latest status;
/// dropping the receiver is the unsubscribe.
#[async_trait]
pub trait NetworkStatusListener: Send + Sync {
    async fn network_status(&self) -> Result<NetworkStatus>;

    fn subscribe(&self) -> watch::Receiver<NetworkStatus>;
}

/// Listener for platforms without connectivity information: reports a
/// fixed status and never notifies.
pub struct StaticNetworkStatusListener {
    status: NetworkStatus,
    sender: watch::Sender<NetworkStatus>,
}

impl StaticNetworkStatusListener {
    pub fn new(status: NetworkStatus) -> Self {
        let (sender, _receiver) = watch::channel(status);
        Self { status, sender }
    }

    pub fn online() -> Self {
        Self::new(NetworkStatus::connected(NetworkType::Unknown))
    }
}

#[async_trait]
impl NetworkStatusListener for StaticNetworkStatusListener {
    async fn network_status(&self) -> Result<NetworkStatus> {
        Ok(self.status)
    }

    fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.sender.subscribe()
    }
}

/// Degrade handling when the network is unavailable.
#[async_trait]
pub trait NoneNetworkFailBack: Send + Sync {
    /// Called after spin-wait exhaustion instead of the network call. May
    /// resolve with a substitute response or fail.
    async fn on_network_close(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Called when connectivity transitions from disconnected to
    /// connected, e.g. to flush anything queued elsewhere.
    async fn on_network_active(&self) {}
}

/// Default fail-back: reject with a synthetic gateway-timeout response.
#[derive(Debug, Default)]
pub struct DefaultNoneNetworkFailBack;

#[async_trait]
impl NoneNetworkFailBack for DefaultNoneNetworkFailBack {
    async fn on_network_close(&self, _request: HttpRequest) -> Result<HttpResponse> {
        Err(Error::NetworkUnavailable {
            response: HttpResponse::network_failure(),
        })
    }
}

pub const DEFAULT_TRY_WAIT_NETWORK_COUNT: usize = 3;
pub const MAX_TRY_WAIT_NETWORK_COUNT: usize = 10;
pub const DEFAULT_SPIN_WAIT_MAX: Duration = Duration::from_millis(500);
pub const MAX_SPIN_WAIT: Duration = Duration::from_millis(1200);

const SPIN_WAIT_MIN: Duration = Duration::from_millis(120);

/// Connectivity-aware request suspension.
///
/// Needs to be configured ahead of the other interceptors. When the
/// last-known status is disconnected the guard spin-waits a bounded number
/// of attempts for recovery, then degrades through the fail-back handler
/// instead of attempting the network call. Requests are not queued beyond
/// the spin-wait window.
pub struct NetworkInterceptor {
    listener: Arc<dyn NetworkStatusListener>,
    fail_back: Arc<dyn NoneNetworkFailBack>,
    try_wait_network_count: usize,
    spin_wait_max: Duration,
    status: Arc<Mutex<NetworkStatus>>,
}

impl NetworkInterceptor {
    pub fn builder(listener: Arc<dyn NetworkStatusListener>) -> NetworkInterceptorBuilder {
        NetworkInterceptorBuilder {
            listener,
            fail_back: None,
            try_wait_network_count: DEFAULT_TRY_WAIT_NETWORK_COUNT,
            spin_wait_max: DEFAULT_SPIN_WAIT_MAX,
        }
    }

    pub async fn new(listener: Arc<dyn NetworkStatusListener>) -> Result<Self> {
        Self::builder(listener).try_build().await
    }

    fn current_status(&self) -> NetworkStatus {
        *lock_unpoisoned(&self.status)
    }

    async fn refresh_status(&self) -> NetworkStatus {
        let refreshed = self
            .listener
            .network_status()
            .await
            .unwrap_or_else(|_| NetworkStatus::offline());
        *lock_unpoisoned(&self.status) = refreshed;
        refreshed
    }

    /// Spin-wait for network recovery. Returns whether the network came
    /// back within the attempt budget.
    async fn try_spin_wait(&self) -> bool {
        let mut remaining = self.try_wait_network_count;
        if remaining == 0 {
            return false;
        }
        while remaining > 0 && !self.current_status().is_connected {
            remaining -= 1;
            let max_ms = self.spin_wait_max.as_millis().max(1) as u64;
            let wait = Duration::from_millis(rand::rng().random_range(0..max_ms))
                .max(SPIN_WAIT_MIN);
            debug!(
                wait_ms = wait.as_millis() as u64,
                remaining, "waiting for network recovery"
            );
            sleep(wait).await;
            self.refresh_status().await;
        }
        self.current_status().is_connected
    }
}

#[async_trait]
impl Interceptor for NetworkInterceptor {
    async fn intercept(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse> {
        if self.current_status().is_connected {
            return next.run(request, context).await;
        }
        if self.try_spin_wait().await {
            next.run(request, context).await
        } else {
            warn!(url = %request.url, "network still unavailable, degrading request");
            self.fail_back.on_network_close(request).await
        }
    }
}

pub struct NetworkInterceptorBuilder {
    listener: Arc<dyn NetworkStatusListener>,
    fail_back: Option<Arc<dyn NoneNetworkFailBack>>,
    try_wait_network_count: usize,
    spin_wait_max: Duration,
}

impl NetworkInterceptorBuilder {
    pub fn fail_back(mut self, fail_back: Arc<dyn NoneNetworkFailBack>) -> Self {
        self.fail_back = Some(fail_back);
        self
    }

    pub fn try_wait_network_count(mut self, try_wait_network_count: usize) -> Self {
        self.try_wait_network_count = try_wait_network_count;
        self
    }

    pub fn spin_wait_max(mut self, spin_wait_max: Duration) -> Self {
        self.spin_wait_max = spin_wait_max;
        self
    }

    /// Queries the initial status (failure counts as disconnected) and
    /// spawns the transition monitor, so this must run inside a tokio
    /// runtime.
    pub async fn try_build(self) -> Result<NetworkInterceptor> {
        if self.try_wait_network_count > MAX_TRY_WAIT_NETWORK_COUNT {
            return Err(Error::InvalidConfig {
                message: format!(
                    "try wait count to max: {}",
                    self.try_wait_network_count
                ),
            });
        }
        if self.spin_wait_max > MAX_SPIN_WAIT {
            return Err(Error::InvalidConfig {
                message: format!("try wait times to max: {}", self.spin_wait_max.as_millis()),
            });
        }

        let fail_back = self
            .fail_back
            .unwrap_or_else(|| Arc::new(DefaultNoneNetworkFailBack));
        let initial = self
            .listener
            .network_status()
            .await
            .unwrap_or_else(|_| NetworkStatus::offline());
        let status = Arc::new(Mutex::new(initial));

        let mut changes = self.listener.subscribe();
        let monitor_status = Arc::clone(&status);
        let monitor_fail_back = Arc::clone(&fail_back);
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let current = *changes.borrow_and_update();
                let previous = {
                    let mut cached = lock_unpoisoned(&monitor_status);
                    let previous = *cached;
                    *cached = current;
                    previous
                };
                if !previous.is_connected && current.is_connected {
                    debug!("network restored");
                    monitor_fail_back.on_network_active().await;
                }
            }
        });

        Ok(NetworkInterceptor {
            listener: self.listener,
            fail_back,
            try_wait_network_count: self.try_wait_network_count,
            spin_wait_max: self.spin_wait_max,
            status,
        })
    }
}
