//! URL to local path mapping.
//!
//! Pure functions, no I/O. A URL always maps to the same path under a given
//! root, which is what lets the coordinator deduplicate by URL.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Error, Result};

const INDEX_FILE: &str = "index.html";
const MAX_SEGMENT_LEN: usize = 150;

/// Characters escaped when a mapped path is written back into a document.
const REFERENCE_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'\\');

/// Resolve `reference` against `base` and drop the fragment.
pub fn resolve(reference: &str, base: &Url) -> Result<Url> {
    let mut url = base.join(reference.trim()).map_err(|e| Error::InvalidUrl {
        url: reference.to_string(),
        reason: e.to_string(),
    })?;
    url.set_fragment(None);
    Ok(url)
}

/// Map a reference found in the document at `base` to its file under `root`.
pub fn map(reference: &str, base: &Url, root: &Path) -> Result<(Url, PathBuf)> {
    let url = resolve(reference, base)?;
    let path = map_url(&url, root)?;
    Ok((url, path))
}

/// Map an absolute URL to `root/<host>/<path...>`.
///
/// The query string, if any, is folded into the last segment as a short hash so
/// that distinct queries land in distinct files. A trailing `/` maps to
/// `index.html`, and so does a last segment without an extension: `/blog` is
/// written to `blog/index.html`, leaving `blog` free to hold `/blog/style.css`.
pub fn map_url(url: &Url, root: &Path) -> Result<PathBuf> {
    let host = url.host_str().ok_or_else(|| Error::InvalidUrl {
        url: url.to_string(),
        reason: "URL has no host".to_string(),
    })?;

    let mut relative = PathBuf::from(match url.port() {
        Some(port) => format!("{}_{port}", sanitize_segment(host)),
        None => sanitize_segment(host),
    });

    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    let (last, dirs) = match segments.split_last() {
        Some((last, dirs)) => (*last, dirs),
        None => ("", &[][..]),
    };

    for dir in dirs.iter().filter(|s| !s.is_empty()) {
        relative.push(sanitize_segment(dir));
    }

    let mut file_name = if last.is_empty() {
        INDEX_FILE.to_string()
    } else if Path::new(last).extension().is_none() {
        relative.push(sanitize_segment(last));
        INDEX_FILE.to_string()
    } else {
        sanitize_segment(last)
    };
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        file_name = with_suffix(&file_name, &short_hash(query));
    }
    if file_name.len() > MAX_SEGMENT_LEN {
        file_name = shorten(&file_name);
    }
    relative.push(file_name);

    Ok(webmirror_fs::join_within(root, &relative)?)
}

/// Path from the directory containing `from` to `to`, `/`-separated and
/// escaped for use inside `url(...)` or an HTML attribute.
///
/// Targets at or below `from`'s directory are prefixed with `./`.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from_dir: Vec<Component> = from
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::with_capacity(from_dir.len() + to_parts.len());
    parts.extend((common..from_dir.len()).map(|_| "..".to_string()));
    parts.extend(to_parts[common..].iter().map(|c| {
        utf8_percent_encode(&c.as_os_str().to_string_lossy(), REFERENCE_SEGMENT).to_string()
    }));

    let joined = parts.join("/");
    if common == from_dir.len() {
        format!("./{joined}")
    } else {
        joined
    }
}

/// Extension of the URL's last path segment, normalized as by [`extension_of`].
pub fn url_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    extension_of(Path::new(last))
}

/// Lower-cased extension with a leading dot, e.g. `".css"`.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..5])
}

/// Insert `_<suffix>` before the extension of `file_name`.
fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{suffix}{}", &file_name[..dot], &file_name[dot..]),
        _ => format!("{file_name}_{suffix}"),
    }
}

fn shorten(file_name: &str) -> String {
    let (stem, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 && file_name.len() - dot <= 10 => file_name.split_at(dot),
        _ => (file_name, ""),
    };
    let mut cut = 100.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}{ext}", &stem[..cut], short_hash(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn root() -> PathBuf {
        if cfg!(windows) { PathBuf::from("C:/mirror") } else { PathBuf::from("/mirror") }
    }

    fn base() -> Url {
        Url::parse("https://example.com/css/site.css").unwrap()
    }

    #[test]
    fn maps_host_and_path() {
        let (url, path) = map("../img/logo.png", &base(), &root()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/logo.png");
        assert_eq!(path, root().join("example.com/img/logo.png"));
    }

    #[test]
    fn directory_urls_map_to_index() {
        let path = map_url(&Url::parse("https://example.com/docs/").unwrap(), &root()).unwrap();
        assert_eq!(path, root().join("example.com/docs/index.html"));
        let path = map_url(&Url::parse("https://example.com").unwrap(), &root()).unwrap();
        assert_eq!(path, root().join("example.com/index.html"));
    }

    #[test]
    fn extensionless_names_become_directories() {
        let page = map_url(&Url::parse("https://example.com/blog").unwrap(), &root()).unwrap();
        let asset = map_url(&Url::parse("https://example.com/blog/s.css").unwrap(), &root()).unwrap();
        let search = map_url(&Url::parse("https://example.com/blog?page=2").unwrap(), &root()).unwrap();

        assert_eq!(page, root().join("example.com/blog/index.html"));
        assert_eq!(asset, root().join("example.com/blog/s.css"));
        assert!(search.starts_with(root().join("example.com/blog")));
        assert_ne!(search, page);
        assert_eq!(extension_of(&search).as_deref(), Some(".html"));
    }

    #[test]
    fn url_extension_ignores_the_mapped_name() {
        let url = Url::parse("https://example.com/img/logo?v=3").unwrap();
        assert_eq!(url_extension(&url), None);
        let url = Url::parse("https://example.com/css/Site.CSS?v=3").unwrap();
        assert_eq!(url_extension(&url).as_deref(), Some(".css"));
    }

    #[test]
    fn distinct_queries_get_distinct_files() {
        let a = map("font.woff?v=1", &base(), &root()).unwrap().1;
        let b = map("font.woff?v=2", &base(), &root()).unwrap().1;
        let plain = map("font.woff", &base(), &root()).unwrap().1;
        assert_ne!(a, b);
        assert_ne!(a, plain);
        assert_eq!(extension_of(&a).as_deref(), Some(".woff"));
    }

    #[test]
    fn fragment_does_not_change_the_file() {
        let a = map("icons.svg#home", &base(), &root()).unwrap();
        let b = map("icons.svg", &base(), &root()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_default_port_is_kept() {
        let path = map_url(&Url::parse("http://example.com:8080/a.js").unwrap(), &root()).unwrap();
        assert_eq!(path, root().join("example.com_8080/a.js"));
    }

    #[test]
    fn dot_segments_cannot_escape_root() {
        let (_, path) = map("/../../../../etc/passwd", &base(), &root()).unwrap();
        assert!(path.starts_with(root().join("example.com")));
    }

    #[test]
    fn hostless_urls_are_rejected() {
        assert!(matches!(
            map_url(&Url::parse("data:text/plain,hi").unwrap(), &root()),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn long_segments_are_shortened() {
        let long = format!("{}.css", "a".repeat(400));
        let path = map(&long, &base(), &root()).unwrap().1;
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.len() <= MAX_SEGMENT_LEN);
        assert!(name.ends_with(".css"));
    }

    #[test]
    fn relative_path_in_same_directory() {
        let from = root().join("example.com/css/style.css");
        let to = root().join("example.com/css/base.css");
        assert_eq!(relative_path(&from, &to), "./base.css");
    }

    #[test]
    fn relative_path_climbs_and_descends() {
        let from = root().join("example.com/css/style.css");
        let to = root().join("cdn.example.net/img/a b.png");
        assert_eq!(relative_path(&from, &to), "../../cdn.example.net/img/a%20b.png");
    }

    #[test]
    fn relative_path_escapes_percent() {
        let from = root().join("example.com/index.html");
        let to = root().join("example.com/my%20file.css");
        assert_eq!(relative_path(&from, &to), "./my%2520file.css");
    }

    proptest! {
        #[test]
        fn mapping_is_deterministic_and_contained(
            segments in proptest::collection::vec("[a-zA-Z0-9._%~-]{0,12}", 0..6),
            query in proptest::option::of("[a-z0-9=&]{0,16}"),
        ) {
            let mut raw = format!("https://example.com/{}", segments.join("/"));
            if let Some(q) = query {
                raw.push('?');
                raw.push_str(&q);
            }
            let url = Url::parse(&raw).unwrap();
            let first = map_url(&url, &root()).unwrap();
            let second = map_url(&url, &root()).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.starts_with(root()));
        }
    }
}
