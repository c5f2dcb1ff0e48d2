use std::fmt::Debug;

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, trace};
use url::Url;

use crate::parsers::{sources, stream_title};

pub(crate) mod parsers;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("request failed with status code: {0}")]
    Status(StatusCode),
    #[error("{0} cannot be used as a base url")]
    BaseUrl(Url),
    #[error("no {0} found")]
    None(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    reqwest: reqwest::Client,
}

impl Client {
    #[must_use]
    pub fn new(base_url: Url, reqwest: reqwest::Client) -> Self {
        Self { base_url, reqwest }
    }

    fn stream_url(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::BaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("torrents_proxy_scraper")
            .push(&format!("{key}.json"));
        Ok(url)
    }
}

/// A torrent normalized out of one addon stream entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentRecord {
    pub name: String,
    pub peers: String,
    pub size: String,
    pub source: String,
    pub trackers: String,
    pub magnet: String,
}

#[derive(Debug, Deserialize)]
struct StreamList {
    #[serde(default)]
    streams: Value,
}

/// Streams listed for a movie.
///
/// # Errors
/// Returns an error when the request fails, the addon answers with a non-success status or the
/// body is not JSON. Individual malformed entries are skipped instead.
pub async fn movie_streams(client: &Client, imdb_id: &str) -> Result<Vec<TorrentRecord>> {
    let url = client.stream_url(imdb_id)?;
    get_streams(client, url).await
}

/// Streams listed for one episode of a series.
///
/// # Errors
/// Same as [`movie_streams`].
pub async fn episode_streams(
    client: &Client,
    imdb_id: &str,
    season: &str,
    episode: &str,
) -> Result<Vec<TorrentRecord>> {
    let url = client.stream_url(&format!("{imdb_id}:{season}:{episode}"))?;
    get_streams(client, url).await
}

#[instrument(skip(client), fields(url = %url), err)]
async fn get_streams(client: &Client, url: Url) -> Result<Vec<TorrentRecord>> {
    let response = client
        .reqwest
        .get(url)
        .header(ACCEPT, "application/json")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status));
    }
    let body = response.bytes().await?;
    let list: StreamList = serde_json::from_slice(&body)?;
    let streams = list.streams.as_array().map(Vec::as_slice).unwrap_or_default();
    trace!(count = streams.len(), "received streams");
    Ok(map_streams(streams))
}

/// Parses every entry that can be parsed, in order. Malformed entries are dropped.
#[must_use]
pub fn map_streams(streams: &[Value]) -> Vec<TorrentRecord> {
    streams.iter().filter_map(|s| map_item(s).ok()).collect()
}

#[instrument(level = "debug", skip(item), err)]
fn map_item(item: &Value) -> Result<TorrentRecord> {
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .ok_or(Error::None("stream title"))?;
    let parsed = stream_title::parse(title).ok_or(Error::None("stream title lines"))?;
    let trackers = item
        .get("sources")
        .and_then(Value::as_array)
        .map(|s| sources::tracker_params(s))
        .unwrap_or_default();
    let info_hash = info_hash(item.get("infoHash"));
    let magnet = magnet_uri(&info_hash, &trackers);

    Ok(TorrentRecord {
        name: parsed.name.to_string(),
        peers: parsed.peers.to_string(),
        size: parsed.size,
        source: parsed.source.to_string(),
        trackers,
        magnet,
    })
}

fn info_hash(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(hash)) => hash.trim().to_string(),
        Some(Value::Number(hash)) => hash.to_string(),
        _ => String::new(),
    }
}

fn magnet_uri(info_hash: &str, trackers: &str) -> String {
    if info_hash.is_empty() {
        return String::new();
    }
    format!("magnet:?xt=urn:btih:{info_hash}{trackers}")
}
