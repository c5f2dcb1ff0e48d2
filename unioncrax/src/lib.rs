#[macro_use]
extern crate serde;

pub mod models;

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error as ThisError;
use url::Url;

const JSON_TYPE: &str = "application/json";

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("catalog is not a list")]
    NotAList,
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("request failed with status code: {0}")]
    Status(StatusCode),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Client {
    catalog_url: Url,
    site_url: Url,
    reqwest: reqwest::Client,
}

impl Client {
    #[must_use]
    pub fn new(catalog_url: Url, site_url: Url, reqwest: reqwest::Client) -> Self {
        Self {
            catalog_url,
            site_url,
            reqwest,
        }
    }
}

async fn get_document(client: &Client) -> Result<Value> {
    let response = client
        .reqwest
        .get(client.catalog_url.clone())
        .header(ACCEPT, JSON_TYPE)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status));
    }
    let body = response.bytes().await?;
    let document = serde_json::from_slice(&body)?;
    Ok(document)
}

pub mod games {
    use tracing::{instrument, trace};

    use crate::models::{Game, Listing};
    use crate::{get_document, Client, Error, Result};

    /// Every game in the catalog. Entries that are not game objects are skipped.
    ///
    /// # Errors
    /// Fails when the catalog cannot be fetched, is not JSON or is not a list.
    #[instrument(skip(client), err)]
    pub async fn catalog(client: &Client) -> Result<Vec<Game>> {
        let document = get_document(client).await?;
        let serde_json::Value::Array(entries) = document else {
            return Err(Error::NotAList);
        };
        let total = entries.len();
        let games: Vec<Game> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        trace!(total, parsed = games.len(), "read game catalog");
        Ok(games)
    }

    /// Catalog games whose name contains `query`, ignoring case, as listings.
    ///
    /// # Errors
    /// Same as [`catalog`].
    pub async fn search(client: &Client, query: &str) -> Result<Vec<Listing>> {
        let games = catalog(client).await?;
        Ok(filter(games, query)
            .map(|game| game.into_listing(&client.site_url))
            .collect())
    }

    pub fn filter(games: Vec<Game>, query: &str) -> impl Iterator<Item = Game> {
        let needle = query.to_lowercase();
        games
            .into_iter()
            .filter(move |game| game.name_matches(&needle))
    }
}
