use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::{
    ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, LAST_MODIFIED, RANGE, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::controllers::client_ip;
use crate::errors::{ApiError, Error};
use crate::state::ProxyClient;

const PASSTHROUGH_HEADERS: [HeaderName; 6] = [
    CONTENT_LENGTH,
    CONTENT_RANGE,
    ACCEPT_RANGES,
    ETAG,
    LAST_MODIFIED,
    CACHE_CONTROL,
];

const MEDIA_TYPES: [(&str, &str); 7] = [
    (".mp4", "video/mp4"),
    (".webm", "video/webm"),
    (".m4v", "video/x-m4v"),
    (".mp3", "audio/mpeg"),
    (".aac", "audio/aac"),
    (".ogg", "audio/ogg"),
    (".oga", "audio/ogg"),
];

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

/// Guesses a media type from the extension the url ends with.
fn infer_content_type(url: &str) -> &'static str {
    let url = url.to_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(extension, _)| url.ends_with(extension))
        .map_or("application/octet-stream", |(_, content_type)| content_type)
}

fn target_url(raw: Option<&str>) -> Result<Url, ApiError> {
    let raw = raw.filter(|url| !url.is_empty()).ok_or(ApiError::MissingUrl)?;
    let url = Url::parse(raw).map_err(|_| ApiError::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ApiError::UnsupportedProtocol),
    }
}

fn response_headers(upstream: &HeaderMap, raw_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let content_type = upstream
        .get(CONTENT_TYPE)
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(infer_content_type(raw_url)));
    headers.insert(CONTENT_TYPE, content_type);
    for name in PASSTHROUGH_HEADERS {
        if let Some(value) = upstream.get(&name).filter(|value| !value.is_empty()) {
            headers.insert(name, value.clone());
        }
    }
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    if !headers.contains_key(ACCEPT_RANGES) {
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    headers
}

/// Relays a remote media resource, streaming its body.
#[instrument(skip_all, fields(url = ?params.url))]
pub async fn get(
    State(client): State<ProxyClient>,
    State(config): State<Arc<Config>>,
    Query(params): Query<ProxyParams>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let raw_url = params.url.as_deref();
    let url = target_url(raw_url)?;
    let request = client.0.get(url);
    let mut request = match headers.get(USER_AGENT).filter(|value| !value.is_empty()) {
        Some(user_agent) => request.header(USER_AGENT, user_agent.clone()),
        None => request.header(USER_AGENT, config.proxy_user_agent.as_str()),
    };
    if let Some(range) = headers.get(RANGE).filter(|value| !value.is_empty()) {
        request = request.header(RANGE, range.clone());
    }

    let upstream = match tokio::time::timeout(config.proxy_timeout(), request.send()).await {
        Ok(Ok(upstream)) => upstream,
        Ok(Err(e)) => return Err(proxy_error(e.into(), &headers, peer.as_ref())),
        Err(elapsed) => return Err(proxy_error(elapsed.into(), &headers, peer.as_ref())),
    };
    debug!(status = %upstream.status(), "upstream answered");

    let status = upstream.status();
    let headers = response_headers(upstream.headers(), raw_url.unwrap_or_default());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn proxy_error(
    source: Error,
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
) -> ApiError {
    ApiError::Proxy {
        source,
        ip: client_ip(headers, peer),
    }
}

/// Same as [`get`], without the body.
pub async fn head(
    client: State<ProxyClient>,
    config: State<Arc<Config>>,
    params: Query<ProxyParams>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let response = get(client, config, params, peer, headers)
        .await
        .into_response();
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}
