use axum::extract::{Query, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, error};

use crate::aggregate;
use crate::filter::SourceFilter;
use crate::models::{SearchQuery, SearchResults};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    imdb: Option<String>,
    season: Option<String>,
    episode: Option<String>,
    sources: Option<String>,
    mode: Option<String>,
}

impl SearchParams {
    fn query(&self) -> SearchQuery {
        SearchQuery::new(
            self.q.as_deref(),
            self.imdb.as_deref(),
            self.season.as_deref(),
            self.episode.as_deref(),
        )
    }

    fn filter(&self) -> Option<SourceFilter> {
        let sources = self.sources.as_deref()?;
        Some(SourceFilter::from_query(sources, self.mode.as_deref()))
    }
}

pub async fn get(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let query = params.query();
    match aggregate::search(&state, &query).await {
        Ok(results) => {
            let results = match params.filter() {
                Some(filter) => {
                    debug!(%filter, "filtering search results");
                    filter.apply(results)
                }
                None => results,
            };
            ([(CACHE_CONTROL, "no-store")], Json(results)).into_response()
        }
        Err(e) => {
            error!(query = %query.text, "search failed with {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SearchResults::failed(query.text)),
            )
                .into_response()
        }
    }
}
