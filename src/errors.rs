use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Failures while talking to an upstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Tmdb(#[from] tmdb::Error),
    #[error(transparent)]
    Torrentio(#[from] torrentio::Error),
    #[error(transparent)]
    UnionCrax(#[from] unioncrax::Error),
    #[error(transparent)]
    Invidious(#[from] invidious::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("upstream call timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
    #[error("catalog entry has no {0}")]
    Missing(&'static str),
}

impl Error {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Reqwest(e)
            | Self::Tmdb(tmdb::Error::ReqwestError(e))
            | Self::Torrentio(torrentio::Error::Http(e))
            | Self::UnionCrax(unioncrax::Error::Request(e))
            | Self::Invidious(invidious::Error::ReqwestError(e)) => e.is_timeout(),
            _ => false,
        }
    }

    fn detail(&self) -> &'static str {
        if self.is_timeout() {
            "timeout"
        } else {
            "upstream_failed"
        }
    }
}

/// Errors answered by the http handlers, each with its own status and body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing url parameter")]
    MissingUrl,
    #[error("url parameter is not a url")]
    InvalidUrl,
    #[error("url scheme is not http or https")]
    UnsupportedProtocol,
    #[error("proxying for {ip} failed: {source}")]
    Proxy { source: Error, ip: String },
    #[error("rate limited")]
    RateLimited,
    #[error("missing id or url")]
    MissingVideoId,
    #[error("not a youtube id or url")]
    InvalidVideoId,
    #[error("upstream answered with status code: {0}")]
    UpstreamStatus(StatusCode),
    #[error("video resolve failed: {0}")]
    Video(Error),
}

/// Seconds a rate limited client is asked to wait.
pub const RETRY_AFTER_SECS: u32 = 120;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            error!("request failed with {self}");
        } else {
            warn!("request rejected: {self}");
        }
        let status = self.status();
        let body = match &self {
            Self::MissingUrl => json!({ "error": "missing_url" }),
            Self::InvalidUrl => json!({ "error": "invalid_url" }),
            Self::UnsupportedProtocol => json!({ "error": "unsupported_protocol" }),
            Self::Proxy { source, ip } => {
                let (detail, message) = if source.is_timeout() {
                    ("upstream_timeout", "Upstream timed out. Try again later.")
                } else {
                    ("upstream_fetch_failed", "Failed to fetch upstream content.")
                };
                json!({ "error": "proxy_error", "detail": detail, "message": message, "ip": ip })
            }
            Self::RateLimited => json!({
                "error": "rate_limited",
                "message": "Too many requests. Try again later.",
            }),
            Self::MissingVideoId => json!({ "error": "missing_id_or_url" }),
            Self::InvalidVideoId => json!({ "error": "invalid_youtube_id_or_url" }),
            Self::UpstreamStatus(code) => {
                json!({ "error": "upstream_error", "status": code.as_u16() })
            }
            Self::Video(source) => json!({ "error": "ytdl_error", "detail": source.detail() }),
        };
        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::RateLimited) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, RETRY_AFTER_SECS.into());
        }
        response
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl
            | Self::InvalidUrl
            | Self::UnsupportedProtocol
            | Self::MissingVideoId
            | Self::InvalidVideoId => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Proxy { .. } | Self::UpstreamStatus(_) | Self::Video(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(error: ApiError) -> (StatusCode, Response, Value) {
        let response = error.into_response();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, Response::from_parts(parts, axum::body::Body::empty()), value)
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after() {
        let (status, response, body) = render(ApiError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "120");
        assert_eq!(body["error"], "rate_limited");
    }

    #[tokio::test]
    async fn proxy_timeout_is_reported_as_such() {
        let elapsed = tokio::time::timeout(std::time::Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err();
        let error = ApiError::Proxy {
            source: elapsed.into(),
            ip: "9.9.9.9".into(),
        };
        let (status, _, body) = render(error).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            json!({
                "error": "proxy_error",
                "detail": "upstream_timeout",
                "message": "Upstream timed out. Try again later.",
                "ip": "9.9.9.9",
            })
        );
    }

    #[tokio::test]
    async fn video_timeout_is_reported_as_such() {
        let elapsed = tokio::time::timeout(std::time::Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err();
        let (status, _, body) = render(ApiError::Video(elapsed.into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "ytdl_error", "detail": "timeout" }));
    }

    #[tokio::test]
    async fn video_errors_name_their_cause() {
        let (status, _, body) = render(ApiError::Video(Error::Missing("id"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "ytdl_error", "detail": "upstream_failed" }));

        let (status, _, body) =
            render(ApiError::UpstreamStatus(StatusCode::FORBIDDEN)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "upstream_error", "status": 403 }));
    }
}
