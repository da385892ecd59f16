//! Provenance comment appended to text assets.

use chrono::{DateTime, SecondsFormat, Utc};

pub const TOOL: &str = concat!("webmirror ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `<!--! ... -->`
    Markup,
    /// `/*! ... */`
    Block,
}

impl CommentStyle {
    /// Style for a normalized extension such as `".css"`, or `None` for
    /// binary and unknown types.
    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension {
            ".html" | ".htm" | ".xhtml" | ".asp" | ".aspx" | ".php" => Some(Self::Markup),
            ".css" | ".js" | ".xml" => Some(Self::Block),
            _ => None,
        }
    }

    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Markup => ("<!--!", "-->"),
            Self::Block => ("/*!", "*/"),
        }
    }
}

/// Watermark bytes for a file with `extension`, or empty when that type
/// carries none.
pub fn render(extension: Option<&str>, source_url: &str, at: DateTime<Utc>) -> Vec<u8> {
    let Some(style) = extension.and_then(CommentStyle::for_extension) else {
        return Vec::new();
    };
    let (start, end) = style.delimiters();

    // A URL may legally contain either terminator.
    let source = source_url.replace("*/", "*%2F").replace("-->", "--%3E");

    format!(
        "\n{start}\n * Mirrored by {TOOL}\n * Source: {source}\n * Date: {}\n{end}\n",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn stylesheets_get_block_comments() {
        let mark = String::from_utf8(render(Some(".css"), "https://a.test/s.css", at())).unwrap();
        assert!(mark.starts_with("\n/*!"));
        assert!(mark.ends_with("*/\n"));
        assert!(mark.contains("https://a.test/s.css"));
        assert!(mark.contains("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn pages_get_markup_comments() {
        let mark = String::from_utf8(render(Some(".html"), "https://a.test/", at())).unwrap();
        assert!(mark.starts_with("\n<!--!"));
        assert!(mark.ends_with("-->\n"));
    }

    #[test]
    fn binaries_get_nothing() {
        assert!(render(Some(".png"), "https://a.test/i.png", at()).is_empty());
        assert!(render(None, "https://a.test/blob", at()).is_empty());
    }

    #[test]
    fn terminators_in_urls_are_escaped() {
        let mark = String::from_utf8(render(Some(".js"), "https://a.test/a*/b.js", at())).unwrap();
        assert_eq!(mark.matches("*/").count(), 1);
    }
}
