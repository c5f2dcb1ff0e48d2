use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

const ENV_PREFIX: &str = "VOYAGE_";

/// Service settings, read from `VOYAGE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: SocketAddr,
    /// Mirror serving movie search, external ids and stream lists.
    #[serde(default = "defaults::catalog_url")]
    pub catalog_url: Url,
    #[serde(default = "defaults::image_base_url")]
    pub image_base_url: String,
    #[serde(default = "defaults::game_catalog_url")]
    pub game_catalog_url: Url,
    #[serde(default = "defaults::game_site_url")]
    pub game_site_url: Url,
    #[serde(default = "defaults::invidious_url")]
    pub invidious_url: Url,
    #[serde(default = "defaults::cobalt_url")]
    pub cobalt_url: Url,
    #[serde(default = "defaults::proxy_user_agent")]
    pub proxy_user_agent: String,
    #[serde(default = "defaults::upstream_timeout_secs")]
    pub upstream_timeout_secs: u32,
    #[serde(default = "defaults::proxy_timeout_secs")]
    pub proxy_timeout_secs: u32,
    #[serde(default = "defaults::video_timeout_secs")]
    pub video_timeout_secs: u32,
    #[serde(default = "defaults::rate_limit_max")]
    pub rate_limit_max: usize,
    #[serde(default = "defaults::rate_limit_window_secs")]
    pub rate_limit_window_secs: u32,
}

mod defaults {
    use super::{IpAddr, Ipv6Addr, SocketAddr, Url};

    fn url(value: &str) -> Url {
        Url::parse(value).expect("default urls should be valid")
    }

    pub(super) fn bind_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 8000)
    }

    pub(super) fn catalog_url() -> Url {
        url("https://71502948493498359440385256505013.netlify.app")
    }

    pub(super) fn image_base_url() -> String {
        "https://image.tmdb.org/t/p/w500".to_string()
    }

    pub(super) fn game_catalog_url() -> Url {
        url("https://be-antwerp-po-db.pages.dev/db.json")
    }

    pub(super) fn game_site_url() -> Url {
        url("https://union-crax.xyz/game/")
    }

    pub(super) fn invidious_url() -> Url {
        url("https://invidious.nikkosphere.com")
    }

    pub(super) fn cobalt_url() -> Url {
        url("https://voyage-api-cobalt.slidemovies.org")
    }

    pub(super) fn proxy_user_agent() -> String {
        "Mozilla/5.0 (compatible; VoyageProxy/1.0; +https://example.com)".to_string()
    }

    pub(super) const fn upstream_timeout_secs() -> u32 {
        20
    }

    pub(super) const fn proxy_timeout_secs() -> u32 {
        15
    }

    pub(super) const fn video_timeout_secs() -> u32 {
        10
    }

    pub(super) const fn rate_limit_max() -> usize {
        20
    }

    pub(super) const fn rate_limit_window_secs() -> u32 {
        10 * 60
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            catalog_url: defaults::catalog_url(),
            image_base_url: defaults::image_base_url(),
            game_catalog_url: defaults::game_catalog_url(),
            game_site_url: defaults::game_site_url(),
            invidious_url: defaults::invidious_url(),
            cobalt_url: defaults::cobalt_url(),
            proxy_user_agent: defaults::proxy_user_agent(),
            upstream_timeout_secs: defaults::upstream_timeout_secs(),
            proxy_timeout_secs: defaults::proxy_timeout_secs(),
            video_timeout_secs: defaults::video_timeout_secs(),
            rate_limit_max: defaults::rate_limit_max(),
            rate_limit_window_secs: defaults::rate_limit_window_secs(),
        }
    }
}

impl Config {
    /// # Errors
    /// Fails when a `VOYAGE_*` variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.into())
    }

    #[must_use]
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs.into())
    }

    #[must_use]
    pub fn video_timeout(&self) -> Duration {
        Duration::from_secs(self.video_timeout_secs.into())
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rate_limit_window_secs.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let vars = [
            ("VOYAGE_CATALOG_URL".to_string(), "http://localhost:9000".to_string()),
            ("VOYAGE_RATE_LIMIT_MAX".to_string(), "3".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();
        assert_eq!(config.catalog_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.rate_limit_max, 3);
        assert_eq!(config.proxy_timeout(), Duration::from_secs(15));
        assert_eq!(config.rate_limit_window(), chrono::Duration::minutes(10));
    }

    #[test]
    fn invalid_value_is_rejected() {
        let vars = [("VOYAGE_VIDEO_TIMEOUT_SECS".to_string(), "soon".to_string())];
        let config: Result<Config, _> = envy::prefixed(ENV_PREFIX).from_iter(vars);
        assert!(config.is_err());
    }
}
