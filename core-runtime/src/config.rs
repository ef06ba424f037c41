//! # Core Configuration Module
//!
//! Builder-based configuration for the sync service.
//!
//! ## Overview
//!
//! `CoreConfig` holds the endpoints to keep in step, the clock used to project
//! playing positions forward, and the loop's timing knobs ([`SyncTuning`]).
//! The builder validates everything up front so a misconfiguration fails at
//! startup instead of halfway through a resync.
//!
//! ## Endpoints
//!
//! Endpoints are supplied either as ready-made [`EndpointHandle`]s (any
//! [`PlaybackEndpoint`](bridge_traits::PlaybackEndpoint) implementation) or,
//! with the `desktop-shims` feature, as address strings that are turned into
//! Kodi JSON-RPC endpoints over a shared reqwest client.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .endpoint_address("livingroom")
//!     .endpoint_address("kodi:pw@10.0.0.4:9090")
//!     .poll_interval(Duration::from_millis(250))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No endpoints at all
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - no endpoints");
//! ```

use crate::clock::MonotonicClock;
use crate::error::{Error, Result};
use bridge_traits::{Clock, EndpointHandle, HttpClient};
use std::sync::Arc;
use std::time::Duration;

/// Largest drift threshold accepted by [`CoreConfig::validate`].
pub const MAX_THRESHOLD_MS: i64 = 60_000;

/// Timing knobs of the sync loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTuning {
    /// Drift tolerance; a peer further than this from its expected position is unsynced.
    pub threshold_ms: i64,
    /// Sleep between cycles when nothing needed fixing.
    pub poll_interval: Duration,
    /// Sleep between cycles while peers show different content.
    pub mismatch_backoff: Duration,
    /// Wait after a seek before re-reading properties.
    pub seek_settle_delay: Duration,
    /// Per-request transport timeout. The sync logic itself never times out.
    pub request_timeout: Duration,
    /// Event bus buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            threshold_ms: 1000,
            poll_interval: Duration::from_millis(500),
            mismatch_backoff: Duration::from_millis(1000),
            seek_settle_delay: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(10),
            event_capacity: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

/// Core configuration for the sync service.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Endpoints in configuration order. Index 0 is the content-match reference.
    pub endpoints: Vec<EndpointHandle>,

    /// Time source for expected-position projection.
    pub clock: Arc<dyn Clock>,

    pub tuning: SyncTuning,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "endpoints",
                &self
                    .endpoints
                    .iter()
                    .map(|endpoint| endpoint.address.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("clock", &"Clock { ... }")
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - At least one endpoint is configured
    /// - The drift threshold is positive and at most [`MAX_THRESHOLD_MS`]
    /// - The poll interval is non-zero
    /// - The event capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config(
                "At least one endpoint is required. Use .endpoint() or .endpoint_address() to add one."
                    .to_string(),
            ));
        }

        if self.tuning.threshold_ms <= 0 {
            return Err(Error::Config(
                "Drift threshold must be greater than 0 ms".to_string(),
            ));
        }

        if self.tuning.threshold_ms > MAX_THRESHOLD_MS {
            return Err(Error::Config(format!(
                "Drift threshold exceeds maximum of {} ms",
                MAX_THRESHOLD_MS
            )));
        }

        if self.tuning.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.tuning.event_capacity == 0 {
            return Err(Error::Config(
                "Event capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn endpoint_transport_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackEndpoint".to_string(),
        message: "Endpoint addresses need a transport. \
                 Desktop: enable the 'desktop-shims' feature to use the default Kodi JSON-RPC endpoint. \
                 Otherwise: inject EndpointHandle implementations with .endpoint()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(request_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new(Some(request_timeout)).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(feature = "desktop-shims")]
fn provide_address_endpoints(
    addresses: &[String],
    http_client: Option<Arc<dyn HttpClient>>,
    request_timeout: Duration,
) -> Result<Vec<EndpointHandle>> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let http = match http_client {
        Some(client) => client,
        None => provide_default_http_client(request_timeout)?,
    };

    addresses
        .iter()
        .map(|address| {
            bridge_desktop::kodi_endpoint_handle(address, Arc::clone(&http), Some(request_timeout))
                .map_err(|e| Error::Config(e.to_string()))
        })
        .collect()
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_address_endpoints(
    addresses: &[String],
    _http_client: Option<Arc<dyn HttpClient>>,
    _request_timeout: Duration,
) -> Result<Vec<EndpointHandle>> {
    if addresses.is_empty() {
        Ok(Vec::new())
    } else {
        Err(endpoint_transport_missing_error())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Endpoints keep the order they were added in, handles and addresses
/// interleaved as given.
#[derive(Default)]
pub struct CoreConfigBuilder {
    endpoints: Vec<PendingEndpoint>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    tuning: SyncTuning,
}

enum PendingEndpoint {
    Handle(EndpointHandle),
    Address(String),
}

impl CoreConfigBuilder {
    /// Adds an endpoint backed by any `PlaybackEndpoint` implementation.
    pub fn endpoint(mut self, endpoint: EndpointHandle) -> Self {
        self.endpoints.push(PendingEndpoint::Handle(endpoint));
        self
    }

    /// Adds a Kodi endpoint by address (`host`, `host:port`, or a full URL).
    ///
    /// Requires the `desktop-shims` feature; without it `build()` returns
    /// [`Error::CapabilityMissing`].
    pub fn endpoint_address(mut self, address: impl Into<String>) -> Self {
        self.endpoints.push(PendingEndpoint::Address(address.into()));
        self
    }

    /// Adds several endpoint addresses at once.
    pub fn endpoint_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for address in addresses {
            self = self.endpoint_address(address);
        }
        self
    }

    /// HTTP client shared by address-built endpoints (desktop default: reqwest).
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Time source (default: [`MonotonicClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn tuning(mut self, tuning: SyncTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn threshold_ms(mut self, threshold_ms: i64) -> Self {
        self.tuning.threshold_ms = threshold_ms;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.tuning.poll_interval = interval;
        self
    }

    pub fn mismatch_backoff(mut self, backoff: Duration) -> Self {
        self.tuning.mismatch_backoff = backoff;
        self
    }

    pub fn seek_settle_delay(mut self, delay: Duration) -> Self {
        self.tuning.seek_settle_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.tuning.request_timeout = timeout;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.tuning.event_capacity = capacity;
        self
    }

    /// Builds the final `CoreConfig`, validating all settings.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if addresses were given without a transport
    /// - [`Error::Config`] if an address is malformed or [`CoreConfig::validate`] fails
    pub fn build(self) -> Result<CoreConfig> {
        let addresses: Vec<String> = self
            .endpoints
            .iter()
            .filter_map(|pending| match pending {
                PendingEndpoint::Address(address) => Some(address.clone()),
                PendingEndpoint::Handle(_) => None,
            })
            .collect();

        let mut built = provide_address_endpoints(
            &addresses,
            self.http_client,
            self.tuning.request_timeout,
        )?
        .into_iter();

        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for pending in self.endpoints {
            match pending {
                PendingEndpoint::Handle(handle) => endpoints.push(handle),
                PendingEndpoint::Address(address) => {
                    let handle = built.next().ok_or_else(|| {
                        Error::Internal(format!("No endpoint was built for '{}'", address))
                    })?;
                    endpoints.push(handle);
                }
            }
        }

        #[cfg(not(feature = "desktop-shims"))]
        if endpoints.is_empty() {
            return Err(endpoint_transport_missing_error());
        }

        let clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };

        let config = CoreConfig {
            endpoints,
            clock,
            tuning: self.tuning,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{CurrentItem, PlaybackEndpoint, PlaybackProperties, PlayerId, SystemClock};

    struct IdleEndpoint;

    #[async_trait]
    impl PlaybackEndpoint for IdleEndpoint {
        async fn active_player(&self) -> BridgeResult<Option<PlayerId>> {
            Ok(None)
        }

        async fn current_item(&self, _player: PlayerId) -> BridgeResult<CurrentItem> {
            Ok(CurrentItem::default())
        }

        async fn playback_properties(&self, _player: PlayerId) -> BridgeResult<PlaybackProperties> {
            Ok(PlaybackProperties {
                speed: 0,
                position_ms: 0,
                duration_ms: 0,
            })
        }

        async fn set_pause(&self, _player: PlayerId, _paused: bool) -> BridgeResult<i32> {
            Ok(0)
        }

        async fn seek(&self, _player: PlayerId, _percentage: f64) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn handle(address: &str) -> EndpointHandle {
        EndpointHandle::new(address, Arc::new(IdleEndpoint))
    }

    #[test]
    fn test_builder_with_handles_uses_defaults() {
        let config = CoreConfig::builder()
            .endpoint(handle("a"))
            .endpoint(handle("b"))
            .build()
            .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].address, "a");
        assert_eq!(config.tuning, SyncTuning::default());
        assert_eq!(config.tuning.threshold_ms, 1000);
        assert_eq!(config.tuning.poll_interval, Duration::from_millis(500));
        assert_eq!(config.tuning.mismatch_backoff, Duration::from_millis(1000));
        assert_eq!(config.tuning.seek_settle_delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_builder_requires_an_endpoint() {
        let result = CoreConfig::builder().build();
        assert!(matches!(
            result,
            Err(Error::Config(_)) | Err(Error::CapabilityMissing { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let zero = CoreConfig::builder()
            .endpoint(handle("a"))
            .threshold_ms(0)
            .build();
        assert!(matches!(zero, Err(Error::Config(_))));

        let huge = CoreConfig::builder()
            .endpoint(handle("a"))
            .threshold_ms(MAX_THRESHOLD_MS + 1)
            .build();
        assert!(matches!(huge, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval_and_capacity() {
        let poll = CoreConfig::builder()
            .endpoint(handle("a"))
            .poll_interval(Duration::ZERO)
            .build();
        assert!(poll.is_err());

        let capacity = CoreConfig::builder()
            .endpoint(handle("a"))
            .event_capacity(0)
            .build();
        assert!(capacity.is_err());
    }

    #[test]
    fn test_builder_overrides_tuning_and_clock() {
        let config = CoreConfig::builder()
            .endpoint(handle("a"))
            .clock(Arc::new(SystemClock))
            .threshold_ms(250)
            .seek_settle_delay(Duration::from_millis(10))
            .build()
            .unwrap();

        assert_eq!(config.tuning.threshold_ms, 250);
        assert_eq!(config.tuning.seek_settle_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_debug_lists_addresses_only() {
        let config = CoreConfig::builder()
            .endpoint(handle("den"))
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("den"));
        assert!(debug.contains("Clock { ... }"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_addresses_without_shims_report_missing_capability() {
        let result = CoreConfig::builder().endpoint_address("livingroom").build();
        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_addresses_with_shims_keep_order_and_redact() {
        let config = CoreConfig::builder()
            .endpoint_address("livingroom")
            .endpoint(handle("custom"))
            .endpoint_address("kodi:secret@10.0.0.4")
            .build()
            .unwrap();

        let addresses: Vec<_> = config.endpoints.iter().map(|e| e.address.clone()).collect();
        assert_eq!(addresses[0], "livingroom");
        assert_eq!(addresses[1], "custom");
        assert!(!addresses[2].contains("secret"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_malformed_address_is_a_config_error() {
        let result = CoreConfig::builder().endpoint_address("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
