//! File extension allow-list.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::debug;

/// Extensions accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED: &[&str] = &[
    ".html", ".htm", ".xhtml", ".asp", ".aspx", ".php", ".css", ".js", ".mjs", ".json", ".xml",
    ".txt", ".map", ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".svg", ".webp", ".avif",
    ".woff", ".woff2", ".ttf", ".otf", ".eot", ".mp3", ".mp4", ".ogg", ".wav", ".webm", ".pdf",
];

pub const DEFAULT_MEMO_CAPACITY: usize = 100;

/// Candidate extensions for a media type, most specific first.
pub fn extensions_for_mime(mime: &str) -> &'static [&'static str] {
    match mime {
        "text/html" => &[".html", ".htm"],
        "application/xhtml+xml" => &[".xhtml", ".html"],
        "text/css" => &[".css"],
        "text/javascript" | "application/javascript" | "application/x-javascript" => &[".js", ".mjs"],
        "application/json" => &[".json"],
        "text/xml" | "application/xml" => &[".xml"],
        "text/plain" => &[".txt"],
        "image/png" => &[".png"],
        "image/jpeg" | "image/pjpeg" => &[".jpg", ".jpeg"],
        "image/gif" => &[".gif"],
        "image/bmp" => &[".bmp"],
        "image/x-icon" | "image/vnd.microsoft.icon" => &[".ico"],
        "image/svg+xml" => &[".svg"],
        "image/webp" => &[".webp"],
        "image/avif" => &[".avif"],
        "font/woff" | "application/font-woff" => &[".woff"],
        "font/woff2" => &[".woff2"],
        "font/ttf" | "application/x-font-ttf" => &[".ttf"],
        "font/otf" => &[".otf"],
        "application/vnd.ms-fontobject" => &[".eot"],
        "audio/mpeg" => &[".mp3"],
        "audio/ogg" => &[".ogg"],
        "audio/wav" | "audio/x-wav" => &[".wav"],
        "video/mp4" => &[".mp4"],
        "video/webm" => &[".webm"],
        "application/pdf" => &[".pdf"],
        _ => &[],
    }
}

/// Lower-case `ext` and give it a leading dot. Empty input yields `None`.
pub fn normalize(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_ascii_lowercase()))
    }
}

/// Allow-list with a bounded lookup memo.
///
/// The memo is cleared once it reaches capacity, so arbitrary extensions seen
/// in hostile URLs cannot grow it without bound.
#[derive(Debug)]
pub struct ExtensionPolicy {
    allowed: HashSet<String>,
    memo: Mutex<HashMap<String, bool>>,
    capacity: usize,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED.iter().copied())
    }
}

impl ExtensionPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed.into_iter().filter_map(|e| normalize(e.as_ref())).collect(),
            memo: Mutex::new(HashMap::new()),
            capacity: DEFAULT_MEMO_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn is_allowed(&self, extension: &str) -> bool {
        let Some(ext) = normalize(extension) else {
            return false;
        };

        if let Ok(memo) = self.memo.lock()
            && let Some(&hit) = memo.get(&ext)
        {
            return hit;
        }

        let allowed = self.allowed.contains(&ext);
        if let Ok(mut memo) = self.memo.lock() {
            if memo.len() >= self.capacity {
                memo.clear();
            }
            memo.insert(ext, allowed);
        }
        allowed
    }

    /// Pick the extension under which a fetched body may be stored.
    ///
    /// The URL's own extension wins if allowed. Otherwise the content type's
    /// candidates are tried, then the referencing tag's default.
    pub fn accept(
        &self,
        url_extension: Option<&str>,
        mime: Option<&str>,
        default_extension: Option<&str>,
    ) -> Option<String> {
        if let Some(ext) = url_extension.and_then(normalize)
            && self.is_allowed(&ext)
        {
            return Some(ext);
        }

        let inferred: &[&str] = mime.map(extensions_for_mime).unwrap_or_default();

        for candidate in inferred.iter().copied().chain(default_extension) {
            if self.is_allowed(candidate) {
                debug!(
                    url_extension = url_extension.unwrap_or(""),
                    inferred = candidate,
                    "inferred extension from response"
                );
                return normalize(candidate);
            }
        }
        None
    }

    #[cfg(test)]
    fn memo_len(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}
