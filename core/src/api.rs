//! HTTP transport for the lobby API.
//!
//! RULE: only api.rs talks to the server. Everything above it receives
//! typed responses or a `SpectatorError`.
//!
//! Every endpoint answers JSON. A non-2xx answer carries `{"error": "..."}`
//! and becomes `SpectatorError::Protocol`; network failures become
//! `SpectatorError::Transport`. POSTs are form-encoded and carry the
//! anti-forgery header, taken from configuration or from the `csrftoken`
//! cookie the server set earlier.

use crate::{
    config::ServerConfig,
    error::{SpectatorError, SpectatorResult},
    payload::DayPayload,
    snapshot::StateResponse,
    types::{DayNumber, LobbyId, TeamId},
};
use reqwest::{cookie::CookieStore, cookie::Jar, Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_COOKIE: &str = "csrftoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Energy,
    Vision,
}

impl UpgradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeKind::Energy => "energy",
            UpgradeKind::Vision => "vision",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JoinReceipt {
    pub slot: Option<TeamId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PayloadEnvelope {
    payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BuyReceipt {
    detail: Option<String>,
}

/// Turn a status and body into a typed value or a protocol error.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> SpectatorResult<T> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Error")
                    .to_string()
            });
        return Err(SpectatorError::Protocol { status: status.as_u16(), message });
    }
    serde_json::from_str(body)
        .map_err(|e| SpectatorError::Data(format!("unexpected response body: {e}")))
}

/// Parse the configured server root. Endpoint paths are joined relative
/// to it, so a root mounted under a path must end in `/`.
fn base_url(raw: &str) -> SpectatorResult<Url> {
    let mut root = raw.trim().to_string();
    if !root.ends_with('/') {
        root.push('/');
    }
    Url::parse(&root)
        .map_err(|e| SpectatorError::Other(anyhow::anyhow!("Invalid base URL {raw}: {e}")))
}

#[derive(Clone)]
pub struct LobbyClient {
    http:       Client,
    jar:        Arc<Jar>,
    base:       Url,
    lobby_id:   LobbyId,
    csrf_token: Option<String>,
}

impl LobbyClient {
    pub fn new(config: &ServerConfig) -> SpectatorResult<Self> {
        let base = base_url(&config.base_url)?;
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Self {
            http,
            jar,
            base,
            lobby_id: config.lobby_id,
            csrf_token: config.csrf_token.clone(),
        })
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.lobby_id
    }

    fn url(&self, path: &str) -> SpectatorResult<Url> {
        self.base
            .join(path)
            .map_err(|e| SpectatorError::Other(anyhow::anyhow!("Invalid path {path}: {e}")))
    }

    /// Anti-forgery token: configured value first, then the server's cookie.
    fn csrf_token(&self) -> Option<String> {
        if let Some(token) = &self.csrf_token {
            return Some(token.clone());
        }
        let cookies = self.jar.cookies(&self.base)?;
        let cookies = cookies.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == CSRF_COOKIE).then(|| value.to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SpectatorResult<T> {
        let response = self.http.get(self.url(path)?).send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> SpectatorResult<T> {
        let mut request = self.http.post(self.url(path)?).form(form);
        match self.csrf_token() {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => log::warn!("No anti-forgery token available for POST {path}"),
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }

    /// Visit the lobby page once so the server issues session and
    /// anti-forgery cookies.
    pub async fn prime_session(&self) -> SpectatorResult<()> {
        let path = format!("lobby/{}/", self.lobby_id);
        let response = self.http.get(self.url(&path)?).send().await?;
        if !response.status().is_success() {
            return Err(SpectatorError::Protocol {
                status:  response.status().as_u16(),
                message: format!("could not open lobby {}", self.lobby_id),
            });
        }
        log::debug!("Session primed for lobby {}", self.lobby_id);
        Ok(())
    }

    pub async fn fetch_state(&self) -> SpectatorResult<StateResponse> {
        self.get_json(&format!("api/lobby/{}/state/", self.lobby_id)).await
    }

    /// `Ok(None)` when the server has no usable payload for `day`.
    pub async fn fetch_day_payload(&self, day: DayNumber) -> SpectatorResult<Option<DayPayload>> {
        let envelope: PayloadEnvelope = self
            .get_json(&format!("api/lobby/{}/day/{day}/payload/", self.lobby_id))
            .await?;
        Ok(DayPayload::from_value(envelope.payload))
    }

    pub async fn join(&self, name: &str) -> SpectatorResult<JoinReceipt> {
        self.post_form(&format!("api/lobby/{}/join/", self.lobby_id), &[("name", name)])
            .await
    }

    pub async fn start(&self) -> SpectatorResult<()> {
        let _: serde_json::Value = self
            .post_form(&format!("api/lobby/{}/start/", self.lobby_id), &[])
            .await?;
        Ok(())
    }

    /// Returns the server's confirmation text.
    pub async fn buy(&self, kind: UpgradeKind) -> SpectatorResult<String> {
        let receipt: BuyReceipt = self
            .post_form(&format!("api/lobby/{}/buy/", self.lobby_id), &[("kind", kind.as_str())])
            .await?;
        Ok(receipt.detail.unwrap_or_else(|| format!("bought {}", kind.as_str())))
    }
}
