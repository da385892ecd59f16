//! Per-resource pipeline: fetch, resolve embedded references, write.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::Url;
use webmirror_fetch::{HttpClient, PermissionOracle};

use crate::coordinator::{Child, Settled, Shared};
use crate::path_map;
use crate::resource::{Resource, ResourceKind, ResourceState};
use crate::writer::WriteOutcome;
use crate::{css, page};

/// Schemes that never point at something we can mirror.
const SKIPPED_PREFIXES: &[&str] = &["data:", "javascript:", "mailto:", "tel:", "about:", "blob:", "#"];

/// A reference found in a document, located by byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reference {
    pub span: Range<usize>,
    pub target: String,
    pub kind: ResourceKind,
    pub default_extension: Option<&'static str>,
    /// Emit `url(<path>)` in place of the span instead of the bare path.
    pub css_function: bool,
}

pub(crate) fn is_mirrorable(target: &str) -> bool {
    let target = target.trim();
    !target.is_empty()
        && !SKIPPED_PREFIXES.iter().any(|prefix| {
            target
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
}

/// Mirror one resource to a terminal state and publish it on `done`.
///
/// Boxed because resolving a resource spawns further runs of this pipeline.
pub(crate) fn run<C, P>(
    shared: Arc<Shared<C, P>>,
    mut res: Resource,
    done: watch::Sender<Option<ResourceState>>,
) -> BoxFuture<'static, ResourceState>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    async move {
        let state = drive(&shared, &mut res).await;
        res.transition(state);
        shared.stats.record(state);
        done.send_replace(Some(state));
        state
    }
    .boxed()
}

async fn drive<C, P>(shared: &Arc<Shared<C, P>>, res: &mut Resource) -> ResourceState
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    if res.file_path.is_dir() {
        error!(url = %res.url, path = %res.file_path.display(), "target path is a directory");
        return ResourceState::Failed;
    }
    if !shared.writer.is_overwrite() && res.file_path.is_file() {
        info!(url = %res.url, path = %res.file_path.display(), "file exists, skipping download");
        return ResourceState::Skipped;
    }

    res.transition(ResourceState::Fetching);
    let fetched = shared.fetcher.fetch(&res.url).await;
    if fetched.is_placeholder() {
        shared.stats.placeholders.fetch_add(1, Ordering::Relaxed);
    }

    let url_extension = path_map::url_extension(&res.url);
    let mime = fetched.mime();
    let Some(extension) =
        shared
            .writer
            .policy()
            .accept(url_extension.as_deref(), mime.as_deref(), res.default_extension)
    else {
        error!(
            url = %res.url,
            extension = url_extension.as_deref().unwrap_or(""),
            content_type = mime.as_deref().unwrap_or(""),
            "file type is not allowed to be downloaded"
        );
        return ResourceState::Failed;
    };

    let mut body = fetched.body.clone();
    if fetched.ok() && res.kind.is_scanned() {
        res.transition(ResourceState::Resolving);
        body = match res.kind {
            ResourceKind::Stylesheet => css::resolve(shared, res, &body).await,
            ResourceKind::Page => page::resolve(shared, res, &body).await,
            ResourceKind::Generic | ResourceKind::Anchor => body,
        };
    }
    res.content = Some(body.clone());

    res.transition(ResourceState::Writing);
    let writer = shared.writer.clone();
    let path = res.file_path.clone();
    let source = res.url.to_string();
    let written = tokio::task::spawn_blocking(move || {
        writer.write(&path, &body, &source, Some(extension.as_str()))
    })
    .await;

    match written {
        Ok(Ok(WriteOutcome::Written(_))) => ResourceState::Written,
        Ok(Ok(WriteOutcome::Skipped(_))) => ResourceState::Skipped,
        Ok(Err(e)) => {
            error!(url = %res.url, path = %res.file_path.display(), error = %e, "failed to write file");
            ResourceState::Failed
        }
        Err(e) => {
            error!(url = %res.url, error = %e, "write task failed");
            ResourceState::Failed
        }
    }
}

/// Mirror every reference in `refs`, then splice their local paths into `content`.
///
/// `refs` must be in document order and non-overlapping. A reference whose
/// child could not be mirrored is rewritten to its absolute URL; one that does
/// not parse is left verbatim.
pub(crate) async fn rewrite<C, P>(
    shared: &Arc<Shared<C, P>>,
    parent: &Resource,
    base: &Url,
    content: &[u8],
    refs: Vec<Reference>,
) -> Vec<u8>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    if refs.is_empty() {
        return content.to_vec();
    }
    shared.stats.child_references.fetch_add(refs.len(), Ordering::Relaxed);

    let mut children = Vec::with_capacity(refs.len());
    for reference in &refs {
        let child = path_map::resolve(&reference.target, base)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| {
                let kind = reference.kind;
                let scheduled = shared.schedule(
                    url.clone(),
                    base.clone(),
                    kind,
                    reference.default_extension,
                    Some(&parent.url),
                );
                (url, scheduled)
            });
        children.push(child);
    }

    let waiter = &parent.url;
    let waits = children.iter_mut().map(|child| async move {
        match child {
            Some((_, Ok(Child::Spawned { task, .. }))) => {
                Some(task.await.unwrap_or(ResourceState::Failed))
            }
            Some((url, Ok(Child::Claimed { settled, .. }))) => {
                settle(shared, waiter, url, settled).await
            }
            _ => None,
        }
    });
    let states = join_all(waits).await;
    shared.waits.release(waiter.as_str());

    let mut out = Vec::with_capacity(content.len());
    let mut cursor = 0;
    for ((reference, child), state) in refs.iter().zip(children).zip(states) {
        let replacement = match child {
            None => None,
            Some((url, Err(e))) => {
                warn!(url = %url, error = %e, "could not map reference");
                Some(url.to_string())
            }
            Some((url, Ok(Child::Link { .. }))) => Some(url.to_string()),
            Some((url, Ok(_))) if state == Some(ResourceState::Failed) => Some(url.to_string()),
            Some((_, Ok(Child::Spawned { path, .. } | Child::Claimed { path, .. }))) => {
                Some(path_map::relative_path(&parent.file_path, &path))
            }
        };

        let Some(replacement) = replacement else {
            continue;
        };
        out.extend_from_slice(&content[cursor..reference.span.start]);
        if reference.css_function {
            out.extend_from_slice(b"url(");
            out.extend_from_slice(replacement.as_bytes());
            out.extend_from_slice(b")");
        } else {
            out.extend_from_slice(replacement.as_bytes());
        }
        cursor = reference.span.end;
    }
    out.extend_from_slice(&content[cursor..]);

    info!(url = %parent.url, references = refs.len(), "resolved embedded references");
    out
}

/// State of a resource claimed elsewhere in the run.
///
/// Waits for it to settle unless that would close a cycle of waits, in which
/// case whatever is known now is returned.
async fn settle<C, P>(
    shared: &Shared<C, P>,
    waiter: &Url,
    url: &Url,
    settled: &mut Settled,
) -> Option<ResourceState>
where
    C: HttpClient,
    P: PermissionOracle,
{
    if !shared.waits.try_wait(waiter.as_str(), url.as_str()) {
        return *settled.borrow();
    }
    match settled.wait_for(Option::is_some).await {
        Ok(state) => *state,
        // the claimant's task ended without publishing a state
        Err(_) => Some(ResourceState::Failed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fetchable_targets_are_skipped() {
        assert!(!is_mirrorable(""));
        assert!(!is_mirrorable("   "));
        assert!(!is_mirrorable("#section"));
        assert!(!is_mirrorable("DATA:image/png;base64,AAAA"));
        assert!(!is_mirrorable("javascript:void(0)"));
        assert!(!is_mirrorable("mailto:a@b.test"));
        assert!(is_mirrorable("img/logo.png"));
        assert!(is_mirrorable("//cdn.test/x.js"));
    }
}
