use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

pub mod models;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    reqwest: reqwest::Client,
}

impl Client {
    #[must_use]
    pub fn new(base_url: Url, reqwest: reqwest::Client) -> Self {
        Client { base_url, reqwest }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request failed with status code: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    DeserializationError(#[from] serde_json::Error),
}

async fn handle_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, Error> {
    let status = res.status();
    if !status.is_success() {
        return Err(Error::Status(status));
    }
    let body = res.text().await?;
    match serde_json::from_str(&body) {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::trace!(body = body, "error deserializing response: {}", e);
            Err(Error::DeserializationError(e))
        }
    }
}

/// JavaScript-style truthiness, used where the api mixes empty strings, zeros and nulls.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub mod videos {
    use reqwest::header::{ACCEPT, CACHE_CONTROL};
    use url::Url;

    use crate::models::Video;
    use crate::{Client, Error};

    /// Fetch the metadata and stream formats of one video.
    ///
    /// # Errors
    /// [`Error::Status`]: If the instance answers with a non-success status.
    /// [`Error::DeserializationError`]: If resource does not match the expected format.
    #[tracing::instrument(skip(client), err)]
    pub async fn single(client: &Client, id: &str) -> Result<Video, Error> {
        let base = client.base_url.as_str().trim_end_matches('/');
        let url: Url = format!("{base}/api/v1/videos/{id}").parse()?;
        tracing::debug!("url: {}", url);
        let response = client
            .reqwest
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        crate::handle_response(response).await
    }
}
