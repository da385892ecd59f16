//! Permission oracle consulted before every request.

use std::sync::Arc;

use url::Url;

/// Yes/no answer to "may this URL be fetched?".
pub trait PermissionOracle: Send + Sync {
    fn is_allowed(&self, url: &Url) -> bool;
}

impl<T: PermissionOracle + ?Sized> PermissionOracle for Arc<T> {
    fn is_allowed(&self, url: &Url) -> bool {
        (**self).is_allowed(url)
    }
}

/// Oracle used when robots rules are bypassed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn is_allowed(&self, _url: &Url) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    prefix: String,
}

/// Rules from one host's `robots.txt`, reduced to the group that applies to us.
///
/// Matching is by path prefix; the longest matching rule wins and `Allow` wins ties.
/// URLs on other hosts are always allowed.
#[derive(Debug, Clone)]
pub struct RobotsRules {
    host: String,
    rules: Vec<Rule>,
}

impl RobotsRules {
    pub fn parse(origin: &Url, body: &str, user_agent: &str) -> Self {
        let agent = user_agent
            .split('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut specific: Vec<Rule> = Vec::new();
        let mut wildcard: Vec<Rule> = Vec::new();
        let mut matched_specific = false;

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    in_rules = true;
                    let allow = key == "allow";
                    // An empty Disallow means "everything allowed".
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        allow,
                        prefix: value.trim_end_matches('*').to_string(),
                    };
                    let is_specific = !agent.is_empty()
                        && group_agents.iter().any(|a| a != "*" && agent.contains(a.as_str()));
                    if is_specific {
                        matched_specific = true;
                        specific.push(rule.clone());
                    }
                    if group_agents.iter().any(|a| a == "*") {
                        wildcard.push(rule);
                    }
                }
                _ => {}
            }
        }

        Self {
            host: origin.host_str().unwrap_or_default().to_string(),
            rules: if matched_specific { specific } else { wildcard },
        }
    }
}

impl PermissionOracle for RobotsRules {
    fn is_allowed(&self, url: &Url) -> bool {
        if url.host_str().unwrap_or_default() != self.host {
            return true;
        }

        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        self.rules
            .iter()
            .filter(|rule| target.starts_with(&rule.prefix))
            .max_by(|a, b| a.prefix.len().cmp(&b.prefix.len()).then(a.allow.cmp(&b.allow)))
            .is_none_or(|rule| rule.allow)
    }
}
