//! Endpoint address parsing.
//!
//! Users name endpoints loosely (`livingroom`, `10.0.0.4:9090`,
//! `https://kodi:pw@media.example.net/custom`). Parsing fills in what the
//! Kodi web server expects by default:
//!
//! - scheme `http` unless the address starts with `http:` or `https:`
//! - port `8080` unless a non-default port is given
//! - path `/jsonrpc` unless a path other than `/` is given
//!
//! Credentials embedded in the address are split out for basic auth and never
//! appear in the display form.

use bridge_traits::error::{BridgeError, Result};
use percent_encoding::percent_decode_str;
use url::Url;

/// Port the Kodi web server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Path of the Kodi JSON-RPC handler.
pub const DEFAULT_PATH: &str = "/jsonrpc";

/// A parsed, defaulted endpoint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    /// Request URL with credentials removed.
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Address as shown in logs and labels.
    pub display: String,
}

/// Parse and default an endpoint address.
///
/// # Errors
///
/// Returns [`BridgeError::OperationFailed`] when the address is empty or is
/// not a valid URL after defaulting.
pub fn parse_endpoint_address(input: &str) -> Result<EndpointAddress> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::OperationFailed(
            "Endpoint address cannot be empty".to_string(),
        ));
    }

    let candidate = if trimmed.starts_with("http:") || trimmed.starts_with("https:") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| {
        BridgeError::OperationFailed(format!("Invalid endpoint address '{}': {}", trimmed, e))
    })?;

    if url.port().is_none() {
        url.set_port(Some(DEFAULT_PORT)).map_err(|_| {
            BridgeError::OperationFailed(format!(
                "Endpoint address '{}' cannot carry a port",
                trimmed
            ))
        })?;
    }

    if url.path() == "/" {
        url.set_path(DEFAULT_PATH);
    }

    let username = Some(decode(url.username())).filter(|u| !u.is_empty());
    let password = url.password().map(decode);
    let has_password = password.is_some();

    // Both setters only fail for cannot-be-a-base URLs, which http(s) never are.
    let _ = url.set_username("");
    let _ = url.set_password(None);

    let display = if has_password {
        redacted_display(&url, username.as_deref())
    } else {
        trimmed.to_string()
    };

    Ok(EndpointAddress {
        url,
        username,
        password,
        display,
    })
}

/// Display form of an address with any password masked.
///
/// Falls back to the raw input when it cannot be parsed, since an
/// unparseable address carries no recognisable credentials either.
pub fn redact_address(input: &str) -> String {
    parse_endpoint_address(input)
        .map(|address| address.display)
        .unwrap_or_else(|_| input.trim().to_string())
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

fn redacted_display(url: &Url, username: Option<&str>) -> String {
    let mut shown = url.clone();
    let _ = shown.set_username(username.unwrap_or(""));
    let _ = shown.set_password(Some("***"));
    shown.to_string()
}
