//! HTML page scanning.
//!
//! A textual scan, not a parser: tags are matched by pattern and only the
//! `src`, `href` and `poster` attributes of known tags are considered. Inline
//! `<style>` blocks and `style` attributes are covered by running the
//! stylesheet passes over the whole page afterwards.

use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use regex::bytes::{Captures, Regex};
use tracing::debug;
use url::Url;
use webmirror_fetch::{HttpClient, PermissionOracle};

use crate::coordinator::Shared;
use crate::css;
use crate::pipeline::{self, Reference, is_mirrorable};
use crate::resource::{Resource, ResourceKind};

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(img|script|link|a|source|iframe|embed|video|audio|input|track)\b[^>]*>")
        .expect("valid tag pattern")
});

static LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(src|href|poster)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute pattern")
});

static REL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\srel\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("valid rel pattern")
});

static BASE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<base\b[^>]*>").expect("valid base pattern"));

fn value<'h>(caps: &Captures<'h>, from: usize) -> Option<regex::bytes::Match<'h>> {
    (from..caps.len()).find_map(|i| caps.get(i))
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// How a tag's reference is mirrored.
fn dispatch(tag: &str, rel: &str, target: &str) -> (ResourceKind, Option<&'static str>) {
    match tag {
        "a" | "iframe" => (ResourceKind::Anchor, None),
        "img" | "input" => (ResourceKind::Generic, Some(".jpg")),
        "script" => (ResourceKind::Generic, Some(".js")),
        "link" => {
            let rel = rel.to_ascii_lowercase();
            if rel.split_whitespace().any(|r| r == "stylesheet")
                || css::child_kind(target) == ResourceKind::Stylesheet
            {
                (ResourceKind::Stylesheet, Some(".css"))
            } else if ["icon", "preload", "manifest", "apple-touch-icon", "mask-icon"]
                .iter()
                .any(|r| rel.split_whitespace().any(|token| token == *r))
            {
                (ResourceKind::Generic, None)
            } else {
                // canonical, alternate, next and friends point at other documents
                (ResourceKind::Anchor, None)
            }
        }
        _ => (ResourceKind::Generic, None),
    }
}

/// References held by tag attributes, in document order.
pub(crate) fn scan_tags(content: &[u8]) -> Vec<Reference> {
    let mut refs = Vec::new();
    for tag in TAG.captures_iter(content) {
        let (Some(whole), Some(name)) = (tag.get(0), tag.get(1)) else {
            continue;
        };
        let name = String::from_utf8_lossy(name.as_bytes()).to_ascii_lowercase();
        let rel = REL_ATTR
            .captures(whole.as_bytes())
            .and_then(|caps| value(&caps, 1).map(|m| text(m.as_bytes())))
            .unwrap_or_default();

        for attr in LINK_ATTR.captures_iter(whole.as_bytes()) {
            let Some(found) = value(&attr, 2) else {
                continue;
            };
            let target = text(found.as_bytes());
            if !is_mirrorable(&target) {
                continue;
            }
            let (kind, default_extension) = dispatch(&name, &rel, &target);
            refs.push(Reference {
                span: whole.start() + found.start()..whole.start() + found.end(),
                target,
                kind,
                default_extension,
                css_function: false,
            });
        }
    }
    refs
}

/// Remove a `<base href>` tag, returning the page without it and the href.
///
/// Local paths written into the page must not be resolved against the
/// remote site.
pub(crate) fn strip_base(content: &[u8]) -> (Vec<u8>, Option<String>) {
    let Some(tag) = BASE_TAG.find(content) else {
        return (content.to_vec(), None);
    };
    let href = LINK_ATTR
        .captures_iter(tag.as_bytes())
        .find(|caps| caps.get(1).is_some_and(|n| n.as_bytes().eq_ignore_ascii_case(b"href")))
        .and_then(|caps| value(&caps, 2).map(|m| text(m.as_bytes())));

    let mut stripped = Vec::with_capacity(content.len());
    stripped.extend_from_slice(&content[..tag.start()]);
    stripped.extend_from_slice(&content[tag.end()..]);
    (stripped, href)
}

/// Mirror everything a page references and return the rewritten page.
pub(crate) async fn resolve<C, P>(shared: &Arc<Shared<C, P>>, res: &Resource, content: &[u8]) -> Bytes
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    let (content, href) = strip_base(content);
    let base = href
        .and_then(|href| res.url.join(&href).ok())
        .unwrap_or_else(|| res.url.clone());
    if base != res.url {
        debug!(url = %res.url, base = %base, "page declares a base URL");
    }

    let refs = scan_tags(&content);
    let tagged = pipeline::rewrite(shared, res, &base, &content, refs).await;
    Bytes::from(css::rewrite_all(shared, res, &base, &tagged).await)
}
