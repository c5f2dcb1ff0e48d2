use serde::Serialize;
use serde_json::Value;

const UNTITLED: &str = "Untitled";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Torrent {
    pub name: String,
    pub peers: String,
    pub size: String,
    pub source: String,
    pub trackers: String,
    pub magnet: String,
}

impl From<torrentio::TorrentRecord> for Torrent {
    fn from(value: torrentio::TorrentRecord) -> Self {
        Self {
            name: value.name,
            peers: value.peers,
            size: value.size,
            source: value.source,
            trackers: value.trackers,
            magnet: value.magnet,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub title: String,
    pub poster: String,
    pub imdb_id: String,
    pub torrents: Vec<Torrent>,
}

impl Movie {
    /// A movie as listed by the catalog search, before ids and torrents are known.
    #[must_use]
    pub fn from_search(hit: &tmdb::search::SearchResult, image_base_url: &str) -> Self {
        Self {
            title: hit.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            poster: format!(
                "{image_base_url}{}",
                hit.poster_path.as_deref().unwrap_or_default()
            ),
            imdb_id: String::new(),
            torrents: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_torrents(self, imdb_id: String, torrents: Vec<Torrent>) -> Self {
        Self {
            imdb_id,
            torrents,
            ..self
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub name: String,
    pub description: String,
    pub source: String,
    pub version: String,
    pub link: String,
    pub poster: String,
}

impl From<unioncrax::models::Listing> for Game {
    fn from(value: unioncrax::models::Listing) -> Self {
        Self {
            name: value.name,
            description: value.description,
            source: value.source,
            version: value.version,
            link: value.link,
            poster: value.poster,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TvEpisode {
    pub imdb_id: String,
    pub season: String,
    pub episode: String,
    pub torrents: Vec<Torrent>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub movies: Vec<Movie>,
    pub games: Vec<Game>,
    pub tv: Option<TvEpisode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl SearchResults {
    /// The document answered when a search fails outright.
    #[must_use]
    pub fn failed(query: String) -> Self {
        Self {
            query,
            movies: Vec::new(),
            games: Vec::new(),
            tv: None,
            error: Some("search_failed"),
        }
    }
}

/// Identifies a single tv episode. Only built when all three parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvSelector {
    pub imdb_id: String,
    pub season: String,
    pub episode: String,
}

impl TvSelector {
    #[must_use]
    pub fn new(imdb_id: &str, season: &str, episode: &str) -> Option<Self> {
        let (imdb_id, season, episode) = (imdb_id.trim(), season.trim(), episode.trim());
        if imdb_id.is_empty() || season.is_empty() || episode.is_empty() {
            return None;
        }
        Some(Self {
            imdb_id: imdb_id.to_string(),
            season: season.to_string(),
            episode: episode.to_string(),
        })
    }

    #[must_use]
    pub fn into_episode(self, torrents: Vec<Torrent>) -> TvEpisode {
        TvEpisode {
            imdb_id: self.imdb_id,
            season: self.season,
            episode: self.episode,
            torrents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub tv: Option<TvSelector>,
}

impl SearchQuery {
    #[must_use]
    pub fn new(
        text: Option<&str>,
        imdb_id: Option<&str>,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Self {
        Self {
            text: text.unwrap_or_default().trim().to_string(),
            tv: TvSelector::new(
                imdb_id.unwrap_or_default(),
                season.unwrap_or_default(),
                episode.unwrap_or_default(),
            ),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVideo {
    pub provider: &'static str,
    pub id: String,
    pub title: Value,
    pub author: Value,
    pub length_seconds: Value,
    pub streams: Vec<invidious::models::Stream>,
}

impl ResolvedVideo {
    #[must_use]
    pub fn from_invidious(id: &str, video: &invidious::models::Video) -> Self {
        Self {
            provider: "invidious",
            id: id.to_string(),
            title: video.title(),
            author: video.author(),
            length_seconds: video.length_seconds(),
            streams: video.streams(),
        }
    }
}
