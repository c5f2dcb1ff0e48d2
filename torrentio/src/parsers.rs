//! Parsers for the free-text parts of addon stream entries.

pub(crate) mod sources;
pub(crate) mod stream_title;

/// Marks the source label on a stream's meta line.
pub(crate) const GEAR: &str = "\u{2699}\u{fe0f}";
