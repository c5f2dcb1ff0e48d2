use crate::parsers::GEAR;

const SOURCE_SEPARATOR: &str = "\u{2699}\u{fe0f} ";
const NO_PEERS: &str = "0";
const UNKNOWN_SOURCE: &str = "unknown";

/// The fields read from a stream's multi-line title.
#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) struct StreamTitle<'source> {
    pub(crate) name: &'source str,
    pub(crate) peers: &'source str,
    pub(crate) size: String,
    pub(crate) source: &'source str,
}

fn lines(title: &str) -> Vec<&str> {
    title
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Movie titles carry the meta line second, episode titles carry the file name in between.
fn meta_line<'s>(lines: &[&'s str]) -> Option<&'s str> {
    match (lines.get(1), lines.get(2)) {
        (Some(line), _) if line.contains(GEAR) => Some(*line),
        (_, Some(line)) => Some(*line),
        (line, None) => line.copied(),
    }
}

/// Returns `None` when the title has no non-empty line.
pub(crate) fn parse(title: &str) -> Option<StreamTitle<'_>> {
    let lines = lines(title);
    let name = *lines.first()?;
    let meta = meta_line(&lines).unwrap_or_default();
    let tokens: Vec<&str> = meta.split(' ').collect();
    let token = |index: usize| tokens.get(index).copied().unwrap_or_default();

    let peers = match token(1) {
        "" => NO_PEERS,
        peers => peers,
    };
    let size = format!("{}{}", token(3), token(4));
    let source = match meta.split(SOURCE_SEPARATOR).nth(1) {
        Some(source) if !source.is_empty() => source,
        _ => UNKNOWN_SOURCE,
    };

    Some(StreamTitle {
        name,
        peers,
        size,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movie_layout() {
        let input = "Inception.2010.1080p.BluRay\n👤 812 💾 2.4 GB ⚙️ ThePirateBay";
        let expected = StreamTitle {
            name: "Inception.2010.1080p.BluRay",
            peers: "812",
            size: "2.4GB".to_string(),
            source: "ThePirateBay",
        };
        assert_eq!(parse(input), Some(expected));
    }

    #[test]
    fn test_parse_episode_layout() {
        let input = "Show S02E05\nShow.S02E05.720p.WEB.mkv\n👤 14 💾 650 MB ⚙️ EZTV";
        let expected = StreamTitle {
            name: "Show S02E05",
            peers: "14",
            size: "650MB".to_string(),
            source: "EZTV",
        };
        assert_eq!(parse(input), Some(expected));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_trims() {
        let input = "\n   Name  \n\n  👤 1 💾 1 KB ⚙️ X  \n";
        let parsed = parse(input).unwrap();
        assert_eq!(parsed.name, "Name");
        assert_eq!(parsed.peers, "1");
        assert_eq!(parsed.source, "X");
    }

    #[test]
    fn test_parse_line_one_without_marker_and_no_line_two() {
        let input = "Name\n👤 9 💾 3 GB";
        let expected = StreamTitle {
            name: "Name",
            peers: "9",
            size: "3GB".to_string(),
            source: "unknown",
        };
        assert_eq!(parse(input), Some(expected));
    }

    #[test]
    fn test_parse_short_meta_line() {
        let input = "Name\nx 5 ⚙️";
        let expected = StreamTitle {
            name: "Name",
            peers: "5",
            size: String::new(),
            source: "unknown",
        };
        assert_eq!(parse(input), Some(expected));
    }

    #[test]
    fn test_parse_name_only() {
        let expected = StreamTitle {
            name: "Lonely",
            peers: "0",
            size: String::new(),
            source: "unknown",
        };
        assert_eq!(parse("Lonely"), Some(expected));
    }

    #[test]
    fn test_parse_source_stops_at_second_marker() {
        let parsed = parse("Name\n👤 2 💾 1 GB ⚙️ First ⚙️ Second").unwrap();
        assert_eq!(parsed.source, "First ");
    }

    #[test]
    fn test_parse_empty_title() {
        assert_eq!(parse(""), None);
        assert_eq!(parse(" \n\t\n "), None);
    }
}
