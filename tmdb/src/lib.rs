use std::fmt;
use std::marker::PhantomData;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// Characters escaped when a value is placed in a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

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

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        tracing::debug!("url: {}", url);
        let response = self
            .reqwest
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        handle_response(response).await
    }
}

/// Catalog identifiers come back as numbers from some mirrors and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(id) => id.fmt(f),
            Id::Text(id) => f.write_str(id),
        }
    }
}

/// Accepts strings, numbers and booleans. Anything else reads as missing.
fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts a numeric or textual id. Anything else reads as missing.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(n.as_u64().map_or_else(|| Id::Text(n.to_string()), Id::Number)),
        Value::String(s) => Some(Id::Text(s)),
        _ => None,
    })
}

/// A page of results. Entries are decoded one by one when taken out.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default)]
    results: Value,
    #[serde(skip)]
    marker: PhantomData<T>,
}

impl<T: DeserializeOwned> Paging<T> {
    /// The entries that decode as `T`, in order. A `results` value that is not an array is empty.
    #[must_use]
    pub fn into_results(self) -> Vec<T> {
        let Value::Array(items) = self.results else {
            return Vec::new();
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::trace!("skipping malformed result: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The provided authorization token is invalid")]
    Unauthorized,
    #[error("The requested resource could not be found")]
    NotFound,
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
    match res.status() {
        StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized),
        StatusCode::NOT_FOUND => return Err(Error::NotFound),
        status if !status.is_success() => return Err(Error::Status(status)),
        _ => {}
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

pub mod search {
    use percent_encoding::utf8_percent_encode;
    use serde::{Deserialize, Serialize};

    use crate::{lenient_id, string_like, Client, Error, Id, Paging, PATH_SEGMENT};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct SearchResult {
        #[serde(default, deserialize_with = "lenient_id")]
        pub id: Option<Id>,
        #[serde(default, deserialize_with = "string_like")]
        pub title: Option<String>,
        #[serde(default, deserialize_with = "string_like")]
        pub poster_path: Option<String>,
    }

    /// Search the movie catalog for titles matching `query`.
    ///
    /// # Errors
    /// [`Error::NotFound`]: If the catalog does not know the search endpoint.
    /// [`Error::DeserializationError`]: If the response is not a paging document.
    #[tracing::instrument(skip(client), err)]
    pub async fn movie(client: &Client, query: &str) -> Result<Paging<SearchResult>, Error> {
        let query = utf8_percent_encode(query, PATH_SEGMENT);
        let url = client.endpoint(&format!("torrents_proxy_scraper_search/movie/{query}"))?;
        client.get(url).await
    }
}

pub mod external_ids {
    use percent_encoding::utf8_percent_encode;
    use serde::{Deserialize, Serialize};

    use crate::{Client, Error, Id, PATH_SEGMENT};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ExternalIds {
        #[serde(default)]
        pub imdb_id: Option<String>,
    }

    impl ExternalIds {
        /// The imdb id, trimmed. Empty when the catalog has none.
        #[must_use]
        pub fn imdb_id(&self) -> &str {
            self.imdb_id.as_deref().map_or("", str::trim)
        }
    }

    /// Resolve the external ids of a catalog movie.
    ///
    /// # Errors
    /// [`Error::NotFound`]: If the movie does not exist.
    /// [`Error::DeserializationError`]: If resource does not match the expected format.
    #[tracing::instrument(skip(client), err)]
    pub async fn movie(client: &Client, id: &Id) -> Result<ExternalIds, Error> {
        let id = id.to_string();
        let id = utf8_percent_encode(&id, PATH_SEGMENT);
        let url = client.endpoint(&format!("torrents_proxy_scraper_external_id/movie/{id}"))?;
        client.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    fn client(server: &Server) -> Client {
        Client::new(server.url().parse().unwrap(), reqwest::Client::new())
    }

    #[tokio::test]
    async fn search_encodes_query_as_path_segment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/torrents_proxy_scraper_search/movie/the%20matrix%2Freloaded")
            .with_status(200)
            .with_body(r#"{"page":1,"results":[{"id":604,"title":"The Matrix Reloaded","poster_path":"/x.jpg"}]}"#)
            .create_async()
            .await;

        let paging = search::movie(&client(&server), "the matrix/reloaded")
            .await
            .unwrap();

        mock.assert_async().await;
        let results = paging.into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, Some(Id::Number(604)));
        assert_eq!(results[0].title.as_deref(), Some("The Matrix Reloaded"));
    }

    #[tokio::test]
    async fn search_without_results_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/torrents_proxy_scraper_search/movie/nothing")
            .with_status(200)
            .with_body(r#"{"results":null}"#)
            .create_async()
            .await;

        let paging = search::movie(&client(&server), "nothing").await.unwrap();

        assert!(paging.into_results().is_empty());
    }

    #[tokio::test]
    async fn search_keeps_hits_with_odd_fields() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/torrents_proxy_scraper_search/movie/dune")
            .with_status(200)
            .with_body(
                r#"{"page":"1","results":[
                    {"id":1,"title":"Dune","release_date":2021},
                    {"id":2,"title":1984,"poster_path":{"w":500}},
                    {"id":true,"title":"No Id"},
                    "not a hit"
                ]}"#,
            )
            .create_async()
            .await;

        let results = search::movie(&client(&server), "dune")
            .await
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title.as_deref(), Some("Dune"));
        assert_eq!(results[1].id, Some(Id::Number(2)));
        assert_eq!(results[1].title.as_deref(), Some("1984"));
        assert_eq!(results[1].poster_path, None);
        assert_eq!(results[2].id, None);
    }

    #[test]
    fn results_that_are_not_an_array_are_empty() {
        let paging: Paging<search::SearchResult> =
            serde_json::from_str(r#"{"results":{"id":1}}"#).unwrap();
        assert!(paging.into_results().is_empty());
    }

    #[tokio::test]
    async fn external_ids_encodes_text_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/torrents_proxy_scraper_external_id/movie/..%2F603")
            .with_status(200)
            .with_body(r#"{"imdb_id":"tt0133093"}"#)
            .create_async()
            .await;

        let ids = external_ids::movie(&client(&server), &Id::Text("../603".into()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(ids.imdb_id(), "tt0133093");
    }

    #[tokio::test]
    async fn external_ids_trims_imdb_id() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/torrents_proxy_scraper_external_id/movie/603")
            .with_status(200)
            .with_body(r#"{"id":603,"imdb_id":" tt0133093 "}"#)
            .create_async()
            .await;

        let ids = external_ids::movie(&client(&server), &Id::Number(603))
            .await
            .unwrap();

        assert_eq!(ids.imdb_id(), "tt0133093");
    }

    #[tokio::test]
    async fn external_ids_maps_status_codes() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/torrents_proxy_scraper_external_id/movie/1")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/torrents_proxy_scraper_external_id/movie/2")
            .with_status(503)
            .create_async()
            .await;

        let client = client(&server);
        let missing = external_ids::movie(&client, &Id::Number(1)).await;
        let unavailable = external_ids::movie(&client, &Id::Text("2".into())).await;

        assert!(matches!(missing, Err(Error::NotFound)));
        assert!(matches!(
            unavailable,
            Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[test]
    fn id_display_matches_wire_value() {
        let number: Id = serde_json::from_str("603").unwrap();
        let text: Id = serde_json::from_str(r#""603""#).unwrap();
        assert_eq!(number.to_string(), "603");
        assert_eq!(text.to_string(), "603");
    }
}
