use std::fmt;

use ahash::AHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::models::{SearchResults, Torrent};

/// Source label under which every game result is filtered.
pub const GAME_SOURCE: &str = "unioncrax";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

impl FilterMode {
    /// Anything other than `exclude` reads as [`FilterMode::Include`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("exclude") {
            FilterMode::Exclude
        } else {
            FilterMode::Include
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Include => "include",
            FilterMode::Exclude => "exclude",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(source: &str) -> String {
    source.trim().to_lowercase()
}

/// A set of source labels that results are kept by or dropped by.
///
/// An empty set hides nothing in either mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    sources: AHashSet<String>,
    mode: FilterMode,
}

impl SourceFilter {
    pub fn new<I, S>(sources: I, mode: FilterMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sources = sources
            .into_iter()
            .map(|s| normalize(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        Self { sources, mode }
    }

    /// Reads a comma separated source list and an optional mode.
    #[must_use]
    pub fn from_query(sources: &str, mode: Option<&str>) -> Self {
        Self::new(
            sources.split(','),
            mode.map(FilterMode::parse).unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    #[must_use]
    pub fn is_visible(&self, source: &str) -> bool {
        if self.sources.is_empty() {
            return true;
        }
        let listed = self.sources.contains(&normalize(source));
        match self.mode {
            FilterMode::Include => listed,
            FilterMode::Exclude => !listed,
        }
    }

    fn retain_torrents(&self, torrents: &mut Vec<Torrent>) {
        torrents.retain(|t| self.is_visible(&t.source));
    }

    /// Hides invisible torrents, movies left without torrents, and games when
    /// [`GAME_SOURCE`] is hidden. Applying a filter twice changes nothing.
    #[must_use]
    pub fn apply(&self, mut results: SearchResults) -> SearchResults {
        if self.is_empty() {
            return results;
        }
        for movie in &mut results.movies {
            self.retain_torrents(&mut movie.torrents);
        }
        results.movies.retain(|movie| !movie.torrents.is_empty());
        if !self.is_visible(GAME_SOURCE) {
            results.games.clear();
        }
        if let Some(tv) = results.tv.as_mut() {
            self.retain_torrents(&mut tv.torrents);
        }
        results
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.mode, self.sources.iter().sorted().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, Movie, TvEpisode};

    fn torrent(source: &str) -> Torrent {
        Torrent {
            name: format!("from {source}"),
            peers: "1".into(),
            size: "1 GB".into(),
            source: source.into(),
            trackers: String::new(),
            magnet: String::new(),
        }
    }

    fn movie(title: &str, sources: &[&str]) -> Movie {
        Movie {
            title: title.into(),
            poster: String::new(),
            imdb_id: "tt1".into(),
            torrents: sources.iter().map(|s| torrent(s)).collect(),
        }
    }

    fn results() -> SearchResults {
        SearchResults {
            query: "q".into(),
            movies: vec![
                movie("a", &["YTS", "RARBG"]),
                movie("b", &["1337x"]),
                movie("c", &[]),
            ],
            games: vec![Game {
                name: "g".into(),
                description: String::new(),
                source: "UnionCrax - steamrip".into(),
                version: String::new(),
                link: "#".into(),
                poster: String::new(),
            }],
            tv: Some(TvEpisode {
                imdb_id: "tt2".into(),
                season: "1".into(),
                episode: "1".into(),
                torrents: vec![torrent("yts"), torrent("EZTV")],
            }),
            error: None,
        }
    }

    #[test]
    fn empty_filter_changes_nothing() {
        let filter = SourceFilter::from_query(" , ", Some("exclude"));
        assert!(filter.is_empty());
        assert_eq!(filter.apply(results()), results());
    }

    #[test]
    fn include_keeps_listed_sources() {
        let filter = SourceFilter::from_query(" yts ", None);
        let filtered = filter.apply(results());
        assert_eq!(filtered.movies.len(), 1);
        assert_eq!(filtered.movies[0].title, "a");
        assert_eq!(filtered.movies[0].torrents.len(), 1);
        assert!(filtered.games.is_empty());
        let tv = filtered.tv.unwrap();
        assert_eq!(tv.torrents.len(), 1);
        assert_eq!(tv.torrents[0].source, "yts");
    }

    #[test]
    fn include_can_keep_games() {
        let filter = SourceFilter::new(["UnionCrax"], FilterMode::Include);
        let filtered = filter.apply(results());
        assert!(filtered.movies.is_empty());
        assert_eq!(filtered.games.len(), 1);
        assert!(filtered.tv.unwrap().torrents.is_empty());
    }

    #[test]
    fn exclude_drops_listed_sources() {
        let filter = SourceFilter::from_query("rarbg,unioncrax", Some("EXCLUDE"));
        let filtered = filter.apply(results());
        let titles: Vec<_> = filtered.movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
        assert_eq!(filtered.movies[0].torrents[0].source, "YTS");
        assert!(filtered.games.is_empty());
        assert_eq!(filtered.tv.unwrap().torrents.len(), 2);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        for filter in [
            SourceFilter::from_query("yts,eztv", None),
            SourceFilter::from_query("1337x", Some("exclude")),
        ] {
            let once = filter.apply(results());
            let twice = filter.apply(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn unknown_mode_means_include() {
        assert_eq!(FilterMode::parse("sideways"), FilterMode::Include);
        assert_eq!(FilterMode::parse(" Exclude "), FilterMode::Exclude);
    }

    #[test]
    fn display_lists_sorted_sources() {
        let filter = SourceFilter::from_query("yts, EZTV", Some("exclude"));
        assert_eq!(filter.to_string(), "exclude [eztv, yts]");
    }
}
