//! Client-side preferences: recent searches, the source filter and the color scheme.
//!
//! Preferences persist as string key/value entries. Unreadable entries fall back
//! to their defaults rather than failing the whole load.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::filter::{FilterMode, SourceFilter};

pub const RECENT_SEARCHES_KEY: &str = "voyage-recent-searches";
pub const ACTIVE_FILTERS_KEY: &str = "voyage-active-filters";
pub const FILTER_MODE_KEY: &str = "voyage-filter-mode";
pub const LIGHT_MODE_KEY: &str = "voyage-light";

const MAX_RECENT_SEARCHES: usize = 5;

/// Most recent first, at most five, unique ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches(Vec<String>);

impl RecentSearches {
    /// Records `query` as the most recent search. Blank queries are ignored.
    pub fn push(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        let lowercase = query.to_lowercase();
        self.0.retain(|s| s.to_lowercase() != lowercase);
        self.0.insert(0, query.to_string());
        self.0.truncate(MAX_RECENT_SEARCHES);
        true
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.0.len() {
            self.0.remove(index);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.0.is_empty();
        self.0.clear();
        changed
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub recent_searches: RecentSearches,
    /// Active source labels in the order they were picked.
    pub filters: Vec<String>,
    pub mode: FilterMode,
    pub light_mode: bool,
}

impl Preferences {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut preferences = Self::default();
        for (key, value) in entries {
            match key {
                RECENT_SEARCHES_KEY => match serde_json::from_str::<Vec<String>>(value) {
                    Ok(searches) => {
                        for search in searches.iter().rev() {
                            preferences.recent_searches.push(search);
                        }
                    }
                    Err(e) => debug!("ignoring stored recent searches: {e}"),
                },
                ACTIVE_FILTERS_KEY => match serde_json::from_str(value) {
                    Ok(filters) => preferences.filters = filters,
                    Err(e) => debug!("ignoring stored filters: {e}"),
                },
                FILTER_MODE_KEY => preferences.mode = FilterMode::parse(value),
                LIGHT_MODE_KEY => preferences.light_mode = value == "1",
                _ => {}
            }
        }
        preferences
    }

    #[must_use]
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (RECENT_SEARCHES_KEY, to_json(&self.recent_searches)),
            (ACTIVE_FILTERS_KEY, to_json(&self.filters)),
            (FILTER_MODE_KEY, self.mode.as_str().to_string()),
            (LIGHT_MODE_KEY, if self.light_mode { "1" } else { "0" }.to_string()),
        ]
    }

    #[must_use]
    pub fn source_filter(&self) -> SourceFilter {
        SourceFilter::new(&self.filters, self.mode)
    }

    /// Adds `source` when absent, removes it otherwise.
    pub fn toggle_filter(&mut self, source: &str) {
        if let Some(index) = self.filters.iter().position(|s| s == source) {
            self.filters.remove(index);
        } else {
            self.filters.push(source.to_string());
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// Shared, observable preferences. Subscribers see every change.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    sender: Arc<watch::Sender<Preferences>>,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl PreferenceStore {
    #[must_use]
    pub fn new(initial: Preferences) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    #[must_use]
    pub fn get(&self) -> Preferences {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.sender.subscribe()
    }

    /// Applies `modify` and notifies subscribers when it reports a change.
    pub fn update<F>(&self, modify: F) -> bool
    where
        F: FnOnce(&mut Preferences) -> bool,
    {
        self.sender.send_if_modified(modify)
    }

    pub fn record_search(&self, query: &str) -> bool {
        self.update(|p| p.recent_searches.push(query))
    }

    pub fn remove_recent(&self, index: usize) -> bool {
        self.update(|p| p.recent_searches.remove(index))
    }

    pub fn clear_recent(&self) -> bool {
        self.update(|p| p.recent_searches.clear())
    }

    pub fn toggle_filter(&self, source: &str) {
        self.update(|p| {
            p.toggle_filter(source);
            true
        });
    }

    pub fn set_mode(&self, mode: FilterMode) -> bool {
        self.update(|p| std::mem::replace(&mut p.mode, mode) != mode)
    }

    pub fn clear_filters(&self) -> bool {
        self.update(|p| {
            let changed = !p.filters.is_empty();
            p.filters.clear();
            changed
        })
    }

    pub fn set_light_mode(&self, light_mode: bool) -> bool {
        self.update(|p| std::mem::replace(&mut p.light_mode, light_mode) != light_mode)
    }
}
