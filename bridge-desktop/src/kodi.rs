//! Kodi JSON-RPC endpoint.
//!
//! Implements [`PlaybackEndpoint`] by POSTing JSON-RPC 2.0 requests to a Kodi
//! web server through an injected [`HttpClient`].

use crate::address::EndpointAddress;
use async_trait::async_trait;
use bridge_traits::{
    endpoint::{CurrentItem, Millis, PlaybackEndpoint, PlaybackProperties, PlayerId},
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ActivePlayer {
    playerid: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    item: KodiItem,
}

#[derive(Debug, Default, Deserialize)]
struct KodiItem {
    showtitle: Option<String>,
    season: Option<i32>,
    episode: Option<i32>,
    title: Option<String>,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KodiTime {
    #[serde(default)]
    hours: i64,
    #[serde(default)]
    minutes: i64,
    #[serde(default)]
    seconds: i64,
    #[serde(default)]
    milliseconds: i64,
}

impl KodiTime {
    fn to_millis(&self) -> Millis {
        ((self.hours * 60 + self.minutes) * 60 + self.seconds) * 1000 + self.milliseconds
    }
}

#[derive(Debug, Deserialize)]
struct KodiProperties {
    speed: i32,
    time: KodiTime,
    totaltime: KodiTime,
}

#[derive(Debug, Deserialize)]
struct PlayPauseResult {
    speed: i32,
}

/// One Kodi instance reached over JSON-RPC.
pub struct KodiRpcEndpoint {
    http: Arc<dyn HttpClient>,
    address: EndpointAddress,
    request_timeout: Option<Duration>,
    next_id: AtomicU64,
}

impl KodiRpcEndpoint {
    pub fn new(http: Arc<dyn HttpClient>, address: EndpointAddress) -> Self {
        Self {
            http,
            address,
            request_timeout: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Per-request timeout applied on top of the HTTP client's own settings.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    #[instrument(skip(self, params), fields(endpoint = %self.address.display))]
    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        };

        let mut request = HttpRequest::new(HttpMethod::Post, self.address.url.as_str())
            .header("Accept", "application/json")
            .json(&body)?;
        if let Some(username) = &self.address.username {
            request = request.basic_auth(username.clone(), self.address.password.clone());
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "HTTP {} from {} for {}",
                response.status, self.address.display, method
            )));
        }

        let envelope: RpcResponse<R> = response.json()?;
        if let Some(error) = envelope.error {
            return Err(BridgeError::Remote {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        debug!(method, id, "JSON-RPC call succeeded");
        envelope.result.ok_or_else(|| {
            BridgeError::Protocol(format!("{} response carried neither result nor error", method))
        })
    }
}

#[async_trait]
impl PlaybackEndpoint for KodiRpcEndpoint {
    async fn active_player(&self) -> Result<Option<PlayerId>> {
        let players: Vec<ActivePlayer> = self.call("Player.GetActivePlayers", json!({})).await?;
        Ok(players
            .into_iter()
            .find(|player| player.kind == "video")
            .map(|player| PlayerId(player.playerid)))
    }

    async fn current_item(&self, player: PlayerId) -> Result<CurrentItem> {
        let envelope: ItemEnvelope = self
            .call(
                "Player.GetItem",
                json!({
                    "playerid": player.0,
                    "properties": ["tvshowid", "showtitle", "season", "episode", "title"],
                }),
            )
            .await?;

        let item = envelope.item;
        Ok(CurrentItem {
            show_title: item.showtitle,
            season: item.season,
            episode: item.episode,
            title: item.title,
            label: item.label,
        })
    }

    async fn playback_properties(&self, player: PlayerId) -> Result<PlaybackProperties> {
        let props: KodiProperties = self
            .call(
                "Player.GetProperties",
                json!({
                    "playerid": player.0,
                    "properties": ["speed", "time", "totaltime"],
                }),
            )
            .await?;

        Ok(PlaybackProperties {
            speed: props.speed,
            position_ms: props.time.to_millis(),
            duration_ms: props.totaltime.to_millis(),
        })
    }

    async fn set_pause(&self, player: PlayerId, paused: bool) -> Result<i32> {
        let result: PlayPauseResult = self
            .call(
                "Player.PlayPause",
                json!({ "playerid": player.0, "play": !paused }),
            )
            .await?;
        Ok(result.speed)
    }

    async fn seek(&self, player: PlayerId, percentage: f64) -> Result<()> {
        let _: Value = self
            .call(
                "Player.Seek",
                json!({ "playerid": player.0, "value": { "percentage": percentage } }),
            )
            .await?;
        Ok(())
    }
}
