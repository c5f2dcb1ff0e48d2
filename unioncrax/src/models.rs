use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

const PROVIDER: &str = "UnionCrax";
const NO_LINK: &str = "#";

static STORE_APP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/app/(\d+)").expect("store app id regex is valid"));

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

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Game {
    #[serde(default, deserialize_with = "string_like")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub appid: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub splash: Option<String>,
    #[serde(default)]
    pub screenshots: Value,
    #[serde(default, deserialize_with = "string_like")]
    pub store: Option<String>,
}

/// A catalog game normalized for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub description: String,
    pub source: String,
    pub version: String,
    pub link: String,
    pub poster: String,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Header image of a Steam store page, derived from the app id in its url.
#[must_use]
pub fn steam_header(store_url: &str) -> Option<String> {
    let captures = STORE_APP_ID.captures(store_url)?;
    let app_id = captures.get(1)?.as_str();
    Some(format!(
        "https://shared.akamai.steamstatic.com/store_item_assets/steam/apps/{app_id}/header.jpg"
    ))
}

impl Game {
    pub(crate) fn name_matches(&self, lowercase_needle: &str) -> bool {
        self.name
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(lowercase_needle)
    }

    /// First of: image, splash, first screenshot, Steam header from the store url.
    #[must_use]
    pub fn poster(&self) -> String {
        let screenshot = match self.screenshots.as_array().and_then(|s| s.first()) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        non_empty(self.image.as_ref())
            .or_else(|| non_empty(self.splash.as_ref()))
            .map(str::to_string)
            .or(screenshot)
            .or_else(|| self.store.as_deref().and_then(steam_header))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn link(&self, site_url: &Url) -> String {
        match self.appid.as_deref().map(str::trim) {
            Some(app_id) if !app_id.is_empty() => {
                format!("{}/{app_id}", site_url.as_str().trim_end_matches('/'))
            }
            _ => self.link.clone().unwrap_or_else(|| NO_LINK.to_string()),
        }
    }

    #[must_use]
    pub fn into_listing(self, site_url: &Url) -> Listing {
        let poster = self.poster();
        let link = self.link(site_url);
        Listing {
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            description: self.description.unwrap_or_default(),
            source: format!(
                "{PROVIDER} - {}",
                self.source.as_deref().unwrap_or("unknown")
            ),
            version: self.version.unwrap_or_default(),
            link,
            poster,
        }
    }
}
