use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::FromRef;

use crate::config::Config;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: ReqwestClient,
    pub proxy_client: ProxyClient,
    pub catalog: tmdb::Client,
    pub streams: torrentio::Client,
    pub games: unioncrax::Client,
    pub videos: invidious::Client,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// # Errors
    /// Fails when the environment holds an invalid setting or the http clients cannot be built.
    pub fn new() -> Result<Self> {
        Self::from_config(Config::from_env()?)
    }

    /// # Errors
    /// Fails when the http clients cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = create_reqwest_client()?;
        let proxy_client = ProxyClient(create_proxy_client()?);
        Ok(Self {
            catalog: tmdb::Client::new(config.catalog_url.clone(), client.clone()),
            streams: torrentio::Client::new(config.catalog_url.clone(), client.clone()),
            games: unioncrax::Client::new(
                config.game_catalog_url.clone(),
                config.game_site_url.clone(),
                client.clone(),
            ),
            videos: invidious::Client::new(config.invidious_url.clone(), client.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window()),
            config: Arc::new(config),
            client,
            proxy_client,
        })
    }
}

pub type ReqwestClient = reqwest::Client;

/// Client for relayed media. Never negotiates compression, so byte ranges and
/// lengths reach the caller untouched.
#[derive(Debug, Clone)]
pub struct ProxyClient(pub reqwest::Client);

impl FromRef<AppState> for ProxyClient {
    fn from_ref(input: &AppState) -> Self {
        input.proxy_client.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(input: &AppState) -> Self {
        input.config.clone()
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn create_reqwest_client() -> reqwest::Result<ReqwestClient> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}

pub(crate) fn create_proxy_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .no_gzip()
        .no_brotli()
        .build()
}
