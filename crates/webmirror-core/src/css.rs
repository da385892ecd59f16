//! Stylesheet reference resolution.
//!
//! Two passes over the bytes: `url(...)` first, then string-form `@import`.
//! The second pass runs on the output of the first, so an
//! `@import url("x.css")` is handled once by the `url(...)` pass and never
//! seen again.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use regex::bytes::{Captures, Regex};
use url::Url;
use webmirror_fetch::{HttpClient, PermissionOracle};

use crate::coordinator::Shared;
use crate::pipeline::{self, Reference, is_mirrorable};
use crate::resource::{Resource, ResourceKind};

static URL_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"()\s]*))\s*\)"#).expect("valid url() pattern")
});

static IMPORT_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid @import pattern")
});

/// Kind of a resource referenced from a stylesheet.
pub fn child_kind(url: &str) -> ResourceKind {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    if path.to_ascii_lowercase().ends_with(".css") {
        ResourceKind::Stylesheet
    } else {
        ResourceKind::Generic
    }
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    (1..caps.len())
        .find_map(|i| caps.get(i))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
}

fn scan(pattern: &Regex, content: &[u8], span: impl Fn(&Captures<'_>) -> Range<usize>) -> Vec<Reference> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| {
            let target = first_group(&caps)?;
            if !is_mirrorable(&target) {
                return None;
            }
            Some(Reference {
                span: span(&caps),
                kind: child_kind(&target),
                target,
                default_extension: None,
                css_function: true,
            })
        })
        .collect()
}

/// `url(...)` references; each span covers the whole function.
pub(crate) fn scan_urls(content: &[u8]) -> Vec<Reference> {
    scan(&URL_FUNCTION, content, |caps| caps.get(0).map_or(0..0, |m| m.range()))
}

/// `@import "..."` references; each span covers the quoted string only.
pub(crate) fn scan_imports(content: &[u8]) -> Vec<Reference> {
    scan(&IMPORT_STRING, content, |caps| {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let quote_start = caps.get(1).or_else(|| caps.get(2)).map_or(whole.start, |m| m.start() - 1);
        quote_start..whole.end
    })
}

/// Run both passes over `content` against `base`.
pub(crate) async fn rewrite_all<C, P>(
    shared: &Arc<Shared<C, P>>,
    parent: &Resource,
    base: &Url,
    content: &[u8],
) -> Vec<u8>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    let refs = scan_urls(content);
    let first = pipeline::rewrite(shared, parent, base, content, refs).await;
    let refs = scan_imports(&first);
    pipeline::rewrite(shared, parent, base, &first, refs).await
}

/// Mirror everything a stylesheet references and return the rewritten sheet.
pub(crate) async fn resolve<C, P>(shared: &Arc<Shared<C, P>>, res: &Resource, content: &[u8]) -> Bytes
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    Bytes::from(rewrite_all(shared, res, &res.url, content).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(refs: &[Reference]) -> Vec<&str> {
        refs.iter().map(|r| r.target.as_str()).collect()
    }

    #[test]
    fn finds_all_url_forms() {
        let css = br#"a{background:url("a.png")} b{background:URL( 'b.gif' )} c{src:url(c.woff2)}"#;
        let refs = scan_urls(css);
        assert_eq!(targets(&refs), ["a.png", "b.gif", "c.woff2"]);
        assert_eq!(&css[refs[0].span.clone()], br#"url("a.png")"#);
    }

    #[test]
    fn data_uris_and_fragments_are_ignored() {
        let css = br#"a{background:url(data:image/png;base64,AAAA)} b{filter:url(#blur)} c{x:url()}"#;
        assert!(scan_urls(css).is_empty());
    }

    #[test]
    fn string_imports_cover_only_the_string() {
        let css = br#"@import "base.css" screen; @import 'print.css';"#;
        let refs = scan_imports(css);
        assert_eq!(targets(&refs), ["base.css", "print.css"]);
        assert_eq!(&css[refs[0].span.clone()], br#""base.css""#);
        assert!(refs.iter().all(|r| r.kind == ResourceKind::Stylesheet));
    }

    #[test]
    fn import_url_form_is_left_to_url_pass() {
        let css = br#"@import url("base.css");"#;
        assert!(scan_imports(css).is_empty());
        assert_eq!(targets(&scan_urls(css)), ["base.css"]);
    }

    #[test]
    fn child_kind_ignores_query() {
        assert_eq!(child_kind("theme.CSS?v=3"), ResourceKind::Stylesheet);
        assert_eq!(child_kind("font.woff"), ResourceKind::Generic);
        assert_eq!(child_kind("style.css.map"), ResourceKind::Generic);
    }

    #[test]
    fn malformed_constructs_are_not_matched() {
        let css = br#"a{background:url("unterminated.png}"#;
        assert!(scan_urls(css).is_empty());
    }
}
