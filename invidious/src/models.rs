use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::truthy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub author: Value,
    #[serde(default)]
    pub length_seconds: Value,
    #[serde(default)]
    pub format_streams: Vec<Format>,
    #[serde(default)]
    pub adaptive_formats: Vec<Format>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    #[serde(default)]
    pub url: Value,
    pub itag: Option<Value>,
    pub quality_label: Option<Value>,
    pub label: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub mime_type: Option<Value>,
    pub bitrate: Option<Value>,
    pub size: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Muxed,
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(rename = "type")]
    pub kind: StreamKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itag: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
}

fn first_truthy(first: Option<&Value>, second: Option<&Value>) -> Option<Value> {
    first
        .filter(|v| truthy(v))
        .or(second)
        .cloned()
}

impl Format {
    fn mime_type(&self) -> Option<Value> {
        first_truthy(self.kind.as_ref(), self.mime_type.as_ref())
    }

    fn is(&self, prefix: &str) -> bool {
        self.mime_type()
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|mime| mime.starts_with(prefix))
    }

    fn to_stream(&self, kind: StreamKind) -> Stream {
        let url = match &self.url {
            Value::String(url) => url.clone(),
            _ => String::new(),
        };
        let quality_label = match kind {
            StreamKind::Audio => None,
            StreamKind::Muxed | StreamKind::Video => {
                first_truthy(self.quality_label.as_ref(), self.label.as_ref())
            }
        };
        Stream {
            kind,
            url,
            itag: self.itag.clone(),
            quality_label,
            mime_type: self.mime_type(),
            bitrate: self.bitrate.clone(),
            size: self.size.clone(),
        }
    }
}

/// Returns `value` unless it is falsy, in which case `null`.
fn or_null(value: &Value) -> Value {
    if truthy(value) {
        value.clone()
    } else {
        Value::Null
    }
}

impl Video {
    #[must_use]
    pub fn title(&self) -> Value {
        or_null(&self.title)
    }

    #[must_use]
    pub fn author(&self) -> Value {
        or_null(&self.author)
    }

    #[must_use]
    pub fn length_seconds(&self) -> Value {
        or_null(&self.length_seconds)
    }

    /// Muxed streams first, then adaptive video, then adaptive audio.
    #[must_use]
    pub fn streams(&self) -> Vec<Stream> {
        let muxed = self
            .format_streams
            .iter()
            .map(|f| f.to_stream(StreamKind::Muxed));
        let video = self
            .adaptive_formats
            .iter()
            .filter(|f| f.is("video/"))
            .map(|f| f.to_stream(StreamKind::Video));
        let audio = self
            .adaptive_formats
            .iter()
            .filter(|f| f.is("audio/"))
            .map(|f| f.to_stream(StreamKind::Audio));
        muxed.chain(video).chain(audio).collect()
    }
}
