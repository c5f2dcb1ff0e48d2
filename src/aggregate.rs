use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::{instrument, warn};

use crate::errors::Error;
use crate::models::{Game, Movie, SearchQuery, SearchResults, Torrent, TvEpisode, TvSelector};
use crate::state::AppState;

/// Runs `operation` for every item concurrently. An item whose operation fails
/// is replaced by `fallback(item)`; the other items are unaffected.
pub async fn map_isolated<'a, T, R, E, F, Fut, G>(
    items: &'a [T],
    operation: F,
    fallback: G,
) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    G: Fn(&'a T) -> R,
    E: Display,
{
    let operation = &operation;
    let fallback = &fallback;
    join_all(items.iter().map(|item| async move {
        match operation(item).await {
            Ok(result) => result,
            Err(e) => {
                warn!("using fallback after failure: {e}");
                fallback(item)
            }
        }
    }))
    .await
}

async fn bounded<T, E, Fut>(state: &AppState, call: Fut) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, E>>,
    Error: From<E>,
{
    Ok(tokio::time::timeout(state.config.upstream_timeout(), call).await??)
}

/// Searches movies, games and one tv episode concurrently.
///
/// # Errors
/// Fails when the movie search or the game catalog cannot be read. Lookups for
/// single movies and the tv episode fall back to empty results instead.
#[instrument(skip(state), err)]
pub async fn search(state: &AppState, query: &SearchQuery) -> Result<SearchResults, Error> {
    let (movies, games, tv) = tokio::join!(
        movies(state, &query.text),
        games(state, &query.text),
        tv_episode(state, query.tv.as_ref()),
    );
    Ok(SearchResults {
        query: query.text.clone(),
        movies: movies?,
        games: games?,
        tv,
        error: None,
    })
}

async fn movies(state: &AppState, text: &str) -> Result<Vec<Movie>, Error> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let hits = bounded(state, tmdb::search::movie(&state.catalog, text))
        .await?
        .into_results();
    let image_base_url = state.config.image_base_url.as_str();
    let movies = map_isolated(
        &hits,
        |hit| resolve_movie(state, hit),
        |hit| Movie::from_search(hit, image_base_url),
    )
    .await;
    Ok(movies)
}

async fn resolve_movie(
    state: &AppState,
    hit: &tmdb::search::SearchResult,
) -> Result<Movie, Error> {
    let movie = Movie::from_search(hit, &state.config.image_base_url);
    let id = hit.id.as_ref().ok_or(Error::Missing("id"))?;
    let external_ids = bounded(state, tmdb::external_ids::movie(&state.catalog, id)).await?;
    let imdb_id = external_ids.imdb_id();
    if imdb_id.is_empty() {
        return Ok(movie);
    }
    let torrents = bounded(state, torrentio::movie_streams(&state.streams, imdb_id))
        .await?
        .into_iter()
        .map(Torrent::from)
        .collect();
    Ok(movie.with_torrents(imdb_id.to_string(), torrents))
}

async fn games(state: &AppState, text: &str) -> Result<Vec<Game>, Error> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let listings = bounded(state, unioncrax::games::search(&state.games, text)).await?;
    Ok(listings.into_iter().map(Game::from).collect())
}

async fn tv_episode(state: &AppState, selector: Option<&TvSelector>) -> Option<TvEpisode> {
    let selector = selector?;
    let streams = torrentio::episode_streams(
        &state.streams,
        &selector.imdb_id,
        &selector.season,
        &selector.episode,
    );
    let torrents = match bounded(state, streams).await {
        Ok(records) => records.into_iter().map(Torrent::from).collect(),
        Err(e) => {
            warn!(imdb_id = %selector.imdb_id, "episode streams unavailable: {e}");
            Vec::new()
        }
    };
    Some(selector.clone().into_episode(torrents))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Server;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::Config;

    fn state_for(server: &Server) -> AppState {
        let config = Config {
            catalog_url: server.url().parse().unwrap(),
            upstream_timeout_secs: 1,
            ..Config::default()
        };
        AppState::from_config(config).unwrap()
    }

    async fn mock_single_hit(server: &mut Server) {
        server
            .mock("GET", "/torrents_proxy_scraper_search/movie/dune")
            .with_status(200)
            .with_body(r#"{"results":[{"id":1,"title":"Dune","poster_path":"/d.jpg"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/torrents_proxy_scraper_external_id/movie/1")
            .with_status(200)
            .with_body(r#"{"imdb_id":"tt1160419"}"#)
            .create_async()
            .await;
    }

    fn unresolved_dune() -> Movie {
        Movie {
            title: "Dune".into(),
            poster: "https://image.tmdb.org/t/p/w500/d.jpg".into(),
            imdb_id: String::new(),
            torrents: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_counts_expiry_as_failure() {
        let state = AppState::from_config(Config::default()).unwrap();
        let result = bounded(&state, std::future::pending::<Result<(), tmdb::Error>>()).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn movie_falls_back_when_streams_fail() {
        let mut server = Server::new_async().await;
        mock_single_hit(&mut server).await;
        server
            .mock("GET", "/torrents_proxy_scraper/tt1160419.json")
            .with_status(500)
            .create_async()
            .await;

        let movies = movies(&state_for(&server), "dune").await.unwrap();

        assert_eq!(movies, [unresolved_dune()]);
    }

    #[tokio::test]
    async fn movie_falls_back_when_streams_are_not_json() {
        let mut server = Server::new_async().await;
        mock_single_hit(&mut server).await;
        server
            .mock("GET", "/torrents_proxy_scraper/tt1160419.json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let movies = movies(&state_for(&server), "dune").await.unwrap();

        assert_eq!(movies, [unresolved_dune()]);
    }

    #[tokio::test]
    async fn movie_falls_back_when_streams_time_out() {
        let mut server = Server::new_async().await;
        mock_single_hit(&mut server).await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stalled = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let mut state = state_for(&server);
        state.streams = torrentio::Client::new(stalled.parse().unwrap(), reqwest::Client::new());

        let started = tokio::time::Instant::now();
        let movies = movies(&state, "dune").await.unwrap();

        assert_eq!(movies, [unresolved_dune()]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn map_isolated_replaces_only_failures() {
        let items = [1, 2, 3, 4];
        let results = map_isolated(
            &items,
            |n| async move {
                if n % 2 == 0 {
                    Err(format!("{n} is even"))
                } else {
                    Ok(n * 10)
                }
            },
            |n| -n,
        )
        .await;
        assert_eq!(results, [10, -2, 30, -4]);
    }

    #[tokio::test]
    async fn map_isolated_keeps_input_order() {
        let items = [30_u64, 0, 10];
        let results = map_isolated(
            &items,
            |delay| async move {
                tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
                Ok::<_, String>(*delay)
            },
            |_| u64::MAX,
        )
        .await;
        assert_eq!(results, [30, 0, 10]);
    }
}
