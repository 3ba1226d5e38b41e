//! Consul HTTP client for sessions and KV locks

use crate::config::ConsulConfig;
use crate::error::{ConsulError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tenure_store::{KeyValueStore, KvValue, SessionId, SessionProvider, StoreResult};
use tracing::{debug, info};
use url::Url;

#[derive(Deserialize)]
struct SessionCreated {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Deserialize)]
struct KvEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Option<String>,
    #[serde(rename = "Session")]
    session: Option<String>,
    #[serde(rename = "LockIndex", default)]
    lock_index: u64,
}

impl KvEntry {
    fn into_value(self) -> Result<KvValue> {
        let content = match self.value {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| ConsulError::Decode(format!("{}: {}", self.key, e)))?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| ConsulError::Decode(format!("{}: {}", self.key, e)))?;
                Some(text)
            }
            None => None,
        };

        Ok(KvValue {
            key: self.key,
            content,
            session: self.session.filter(|s| !s.is_empty()).map(SessionId::new),
            lock_index: self.lock_index,
        })
    }
}

/// Consul client implementing [`SessionProvider`] and [`KeyValueStore`].
#[derive(Clone)]
pub struct ConsulClient {
    config: ConsulConfig,
    base_url: Url,
    client: reqwest::Client,
}

impl ConsulClient {
    /// Create a new Consul client
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use tenure_consul::{ConsulClient, ConsulConfig};
    ///
    /// let consul = ConsulClient::new(ConsulConfig::new("http://localhost:8500"))?;
    /// ```
    pub fn new(config: ConsulConfig) -> Result<Self> {
        let base_url = Url::parse(&config.address)?;
        if base_url.cannot_be_a_base() {
            return Err(ConsulError::InvalidUrl(config.address.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Create a client from the standard Consul environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ConsulConfig::from_env().build())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ConsulConfig {
        &self.config
    }

    /// Build `{address}/v1/{segments...}` with each segment percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsulError::InvalidUrl(self.config.address.clone()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);

        if let Some(dc) = &self.config.datacenter {
            url.query_pairs_mut().append_pair("dc", dc);
        }

        Ok(url)
    }

    /// `.` and `..` segments would be collapsed by URL normalization and
    /// alias another key, so they are refused.
    fn kv_endpoint(&self, key: &str) -> Result<Url> {
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(ConsulError::InvalidKey(key.to_string()));
        }
        self.endpoint(std::iter::once("kv").chain(key.split('/')))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.token {
            Some(token) => builder.header("X-Consul-Token", token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ConsulError::Response {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ConsulError::Decode(e.to_string()))
    }

    /// `PUT /v1/session/create`
    pub async fn session_create(&self, name: &str) -> Result<SessionId> {
        let url = self.endpoint(["session", "create"])?;

        let mut payload = serde_json::json!({ "Name": name });
        if let Some(delay) = self.config.lock_delay {
            payload["LockDelay"] = serde_json::json!(format!("{}ms", delay.as_millis()));
        }

        let created: SessionCreated =
            Self::send_json(self.request(Method::PUT, url).json(&payload)).await?;

        info!("Created Consul session {} for {}", created.id, name);
        Ok(SessionId::new(created.id))
    }

    /// `PUT /v1/session/destroy/{id}`
    pub async fn session_destroy(&self, session: &SessionId) -> Result<bool> {
        let url = self.endpoint(["session", "destroy", session.as_str()])?;
        let destroyed: bool = Self::send_json(self.request(Method::PUT, url)).await?;

        debug!("Destroyed Consul session {}: {}", session, destroyed);
        Ok(destroyed)
    }

    /// `GET /v1/kv/{key}`
    pub async fn kv_get(&self, key: &str) -> Result<Option<KvValue>> {
        let url = self.kv_endpoint(key)?;
        let response = self.request(Method::GET, url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Key {} not found", key);
            return Ok(None);
        }

        let body = Self::check(response).await?.bytes().await?;
        let entries: Vec<KvEntry> =
            serde_json::from_slice(&body).map_err(|e| ConsulError::Decode(e.to_string()))?;

        entries.into_iter().next().map(KvEntry::into_value).transpose()
    }

    /// `PUT /v1/kv/{key}?acquire={session}`
    pub async fn kv_acquire(&self, key: &str, content: &str, session: &SessionId) -> Result<bool> {
        let mut url = self.kv_endpoint(key)?;
        url.query_pairs_mut().append_pair("acquire", session.as_str());

        let acquired: bool =
            Self::send_json(self.request(Method::PUT, url).body(content.to_string())).await?;

        debug!("Acquire {} with session {}: {}", key, session, acquired);
        Ok(acquired)
    }

    /// `PUT /v1/kv/{key}?release={session}`
    pub async fn kv_release(&self, key: &str, session: &SessionId) -> Result<bool> {
        let mut url = self.kv_endpoint(key)?;
        url.query_pairs_mut().append_pair("release", session.as_str());

        let released: bool = Self::send_json(self.request(Method::PUT, url)).await?;

        debug!("Release {} with session {}: {}", key, session, released);
        Ok(released)
    }
}

#[async_trait]
impl SessionProvider for ConsulClient {
    async fn create_session(&self, name: &str) -> StoreResult<SessionId> {
        Ok(self.session_create(name).await?)
    }

    async fn destroy_session(&self, session: &SessionId) -> StoreResult<bool> {
        Ok(self.session_destroy(session).await?)
    }
}

#[async_trait]
impl KeyValueStore for ConsulClient {
    async fn get_value(&self, key: &str) -> StoreResult<Option<KvValue>> {
        Ok(self.kv_get(key).await?)
    }

    async fn acquire_lock(
        &self,
        key: &str,
        content: &str,
        session: &SessionId,
    ) -> StoreResult<bool> {
        Ok(self.kv_acquire(key, content, session).await?)
    }

    async fn release_lock(&self, key: &str, session: &SessionId) -> StoreResult<bool> {
        Ok(self.kv_release(key, session).await?)
    }
}
