//! Oracle backed by the what3words v3 HTTP API.

use async_trait::async_trait;
use futures_util::future::join_all;
use landgrab_types::{GeoCell, GeoCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::GeofenceError;
use crate::oracle::{neighbour_points, GeofenceOracle};

pub const DEFAULT_API_URL: &str = "https://api.what3words.com/v3";

/// Connection timeout. Request timeouts are left at the client default.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct What3WordsConfig {
    pub api_url: String,
    pub api_key: String,
    /// Extra attempts after an HTTP 429.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl What3WordsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThreeWordAddress {
    words: String,
}

/// Remote oracle. Cells are authoritative and cached per code for the
/// lifetime of the oracle.
pub struct What3WordsOracle {
    http_client: reqwest::Client,
    config: What3WordsConfig,
    cache: RwLock<HashMap<String, GeoCell>>,
}

impl What3WordsOracle {
    pub fn new(config: What3WordsConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// GET with the API key attached. 429 is retried up to `max_retries`
    /// times with a fixed delay; 402 fails immediately.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GeofenceError> {
        let url = self.endpoint(path);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = self
                .http_client
                .get(&url)
                .query(params)
                .query(&[("key", self.config.api_key.as_str())])
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        GeofenceError::Transport(format!("request timed out: {e}"))
                    } else if e.is_connect() {
                        GeofenceError::Transport(format!("connection failed: {e}"))
                    } else {
                        GeofenceError::Transport(e.to_string())
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                return response.json::<T>().await.map_err(|e| {
                    GeofenceError::InvalidResponse(format!("failed to parse {path} response: {e}"))
                });
            }

            match status.as_u16() {
                429 if attempt <= self.config.max_retries => {
                    warn!(path, attempt, "geocoding rate limited, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                429 => return Err(GeofenceError::RateLimited { attempts: attempt }),
                402 => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GeofenceError::Quota(body));
                }
                code => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GeofenceError::Api { status: code, body });
                }
            }
        }
    }

    async fn fetch_cell(&self, code: &str) -> Result<GeoCell, GeofenceError> {
        if let Some(cell) = self.cache.read().await.get(code) {
            return Ok(cell.clone());
        }
        let cell: GeoCell = self
            .get_json("convert-to-coordinates", &[("words", code.to_string())])
            .await?;
        debug!(code, lat = cell.coordinates.lat, lng = cell.coordinates.lng, "resolved cell");
        self.cache
            .write()
            .await
            .insert(code.to_string(), cell.clone());
        Ok(cell)
    }
}

#[async_trait]
impl GeofenceOracle for What3WordsOracle {
    async fn words_to_cell(&self, code: &str) -> Result<GeoCell, GeofenceError> {
        let code = GeoCode::parse(code).map_err(|e| GeofenceError::InvalidCode(e.to_string()))?;
        self.fetch_cell(code.as_str()).await
    }

    async fn coords_to_words(&self, lat: f64, lng: f64) -> Result<String, GeofenceError> {
        let address: ThreeWordAddress = self
            .get_json("convert-to-3wa", &[("coordinates", format!("{lat},{lng}"))])
            .await?;
        Ok(address.words)
    }

    async fn adjacent_cells(&self, code: &str) -> Result<Vec<String>, GeofenceError> {
        let cell = self.words_to_cell(code).await?;
        let lookups = neighbour_points(cell.centroid())
            .map(|p| self.coords_to_words(p.lat, p.lng));
        join_all(lookups).await.into_iter().collect()
    }
}
