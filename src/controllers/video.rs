use std::net::SocketAddr;
use std::sync::LazyLock;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::controllers::client_ip;
use crate::errors::{ApiError, Error};
use crate::models::ResolvedVideo;
use crate::state::AppState;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("video id regex is valid"));

const NO_STORE: &str = "no-store";
const DEFAULT_COBALT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Invidious,
    Cobalt,
}

impl Provider {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.eq_ignore_ascii_case("cobalt") => Provider::Cobalt,
            _ => Provider::Invidious,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoParams {
    provider: Option<String>,
    id: Option<String>,
    url: Option<String>,
}

fn is_video_id(value: &str) -> bool {
    VIDEO_ID.is_match(value)
}

/// Accepts a bare id, a `youtube.com` url with a `v` parameter or a `youtu.be` short url.
fn extract_video_id(input: &str) -> Option<String> {
    if is_video_id(input) {
        return Some(input.to_string());
    }
    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    let candidate = if host.contains("youtube.com") {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?
    } else if host == "youtu.be" {
        url.path_segments()?.find(|s| !s.is_empty())?.to_string()
    } else {
        return None;
    };
    is_video_id(&candidate).then_some(candidate)
}

/// Resolves a youtube video into playable streams. Rate limited per client.
#[instrument(skip_all, fields(provider = ?params.provider))]
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<VideoParams>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers, peer.as_ref());
    if !state.rate_limiter.check(&ip).is_allowed() {
        return Err(ApiError::RateLimited);
    }

    let provider = Provider::parse(params.provider.as_deref());
    let input = [params.id.as_deref(), params.url.as_deref()]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .ok_or(ApiError::MissingVideoId)?;
    let id = extract_video_id(input).ok_or(ApiError::InvalidVideoId)?;
    debug!(%id, ?provider, "resolving video");

    match provider {
        Provider::Invidious => invidious(&state, &id).await,
        Provider::Cobalt => cobalt(&state, &id).await,
    }
}

async fn invidious(state: &AppState, id: &str) -> Result<Response, ApiError> {
    let lookup = invidious::videos::single(&state.videos, id);
    let video = match tokio::time::timeout(state.config.video_timeout(), lookup).await {
        Ok(Ok(video)) => video,
        Ok(Err(invidious::Error::Status(status))) => return Err(ApiError::UpstreamStatus(status)),
        Ok(Err(e)) => return Err(ApiError::Video(e.into())),
        Err(elapsed) => return Err(ApiError::Video(elapsed.into())),
    };
    let resolved = ResolvedVideo::from_invidious(id, &video);
    Ok(([(CACHE_CONTROL, NO_STORE)], Json(resolved)).into_response())
}

async fn cobalt(state: &AppState, id: &str) -> Result<Response, ApiError> {
    let request = state
        .client
        .post(state.config.cobalt_url.clone())
        .header(ACCEPT, "application/json")
        .json(&json!({ "url": format!("https://www.youtube.com/watch?v={id}") }));
    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, content_type, body))
    };
    let (status, content_type, body) =
        match tokio::time::timeout(state.config.video_timeout(), exchange).await {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(e)) => return Err(ApiError::Video(Error::from(e))),
            Err(elapsed) => return Err(ApiError::Video(elapsed.into())),
        };
    let content_type =
        content_type.unwrap_or_else(|| HeaderValue::from_static(DEFAULT_COBALT_TYPE));
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    Ok(response)
}
