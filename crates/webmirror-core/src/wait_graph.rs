//! Who is waiting on whom while references are resolved.
//!
//! A resource resolving its references waits on the children it spawned and,
//! when possible, on resources claimed elsewhere in the run. An edge is only
//! added when it cannot close a cycle, so waits never deadlock even when
//! stylesheets import each other.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
    /// waiter -> resources it waits on
    edges: Mutex<HashMap<String, HashSet<String>>>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `waiter` waits on `target`.
    ///
    /// Returns `false` and records nothing when `target` already waits on
    /// `waiter`, directly or through others.
    pub fn try_wait(&self, waiter: &str, target: &str) -> bool {
        let mut edges = self.edges.lock().unwrap_or_else(|e| e.into_inner());
        if reaches(&edges, target, waiter) {
            return false;
        }
        edges.entry(waiter.to_string()).or_default().insert(target.to_string());
        true
    }

    /// Drop every edge leaving `waiter`.
    pub fn release(&self, waiter: &str) {
        let mut edges = self.edges.lock().unwrap_or_else(|e| e.into_inner());
        edges.remove(waiter);
    }
}

fn reaches(edges: &HashMap<String, HashSet<String>>, from: &str, to: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(next) = edges.get(node) {
            stack.extend(next.iter().map(String::as_str));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_wait_is_refused() {
        assert!(!WaitGraph::new().try_wait("a", "a"));
    }

    #[test]
    fn direct_and_transitive_cycles_are_refused() {
        let graph = WaitGraph::new();
        assert!(graph.try_wait("page", "a.css"));
        assert!(graph.try_wait("a.css", "b.css"));
        assert!(!graph.try_wait("b.css", "a.css"));
        assert!(!graph.try_wait("b.css", "page"));
        assert!(graph.try_wait("b.css", "c.css"));
    }

    #[test]
    fn release_allows_later_waits() {
        let graph = WaitGraph::new();
        assert!(graph.try_wait("a.css", "b.css"));
        assert!(!graph.try_wait("b.css", "a.css"));

        graph.release("a.css");

        assert!(graph.try_wait("b.css", "a.css"));
    }
}
