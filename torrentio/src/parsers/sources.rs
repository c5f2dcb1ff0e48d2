use serde_json::Value;
use winnow::combinator::alt;
use winnow::token::rest;
use winnow::{ModalResult, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Tracker,
    Dht,
}

impl SourceKind {
    fn magnet_param(self) -> &'static str {
        match self {
            SourceKind::Tracker => "&tr=",
            SourceKind::Dht => "&dht=",
        }
    }
}

/// A `tracker:<url>` or `dht:<url>` entry of a stream's `sources`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceTag<'source> {
    pub(crate) kind: SourceKind,
    pub(crate) url: &'source str,
}

fn source_kind(input: &mut &str) -> ModalResult<SourceKind> {
    alt((
        "tracker:".value(SourceKind::Tracker),
        "dht:".value(SourceKind::Dht),
    ))
    .parse_next(input)
}

pub(crate) fn parse_source(value: &str) -> Option<SourceTag<'_>> {
    (source_kind, rest)
        .map(|(kind, url)| SourceTag { kind, url })
        .parse(value)
        .ok()
}

/// Joins every tagged source into magnet query parameters, keeping list order and duplicates.
pub(crate) fn tracker_params(sources: &[Value]) -> String {
    sources
        .iter()
        .filter_map(Value::as_str)
        .filter_map(parse_source)
        .fold(String::new(), |mut params, tag| {
            params.push_str(tag.kind.magnet_param());
            params.push_str(tag.url);
            params
        })
}
