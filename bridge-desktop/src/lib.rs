//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `PlaybackEndpoint` speaking Kodi JSON-RPC 2.0 over that client
//! - Endpoint address parsing with Kodi's defaults and credential redaction
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{kodi_endpoint_handle, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new(None)?);
//! let livingroom = kodi_endpoint_handle("livingroom", http.clone(), None)?;
//! let den = kodi_endpoint_handle("kodi:pw@10.0.0.4:9090", http, None)?;
//! ```

mod address;
mod http;
mod kodi;

pub use address::{parse_endpoint_address, redact_address, EndpointAddress, DEFAULT_PATH, DEFAULT_PORT};
pub use http::ReqwestHttpClient;
pub use kodi::KodiRpcEndpoint;

use bridge_traits::{endpoint::EndpointHandle, error::Result, http::HttpClient};
use std::sync::Arc;
use std::time::Duration;

/// Parse `address` and bind a Kodi JSON-RPC endpoint to it.
///
/// The returned handle carries the redacted display form of the address.
pub fn kodi_endpoint_handle(
    address: &str,
    http: Arc<dyn HttpClient>,
    request_timeout: Option<Duration>,
) -> Result<EndpointHandle> {
    let parsed = parse_endpoint_address(address)?;
    let display = parsed.display.clone();
    let endpoint = KodiRpcEndpoint::new(http, parsed).with_request_timeout(request_timeout);
    Ok(EndpointHandle::new(display, Arc::new(endpoint)))
}
