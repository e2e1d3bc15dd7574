//! Expansion of requested trigger names into the list of runs to perform

use std::collections::HashSet;
use std::path::{Component, Path};

use glob::Pattern;
use log::{debug, warn};

/// Marker that turns a requested trigger into a pattern
pub const WILDCARD: char = '*';

/// Split raw requests on commas, trimming whitespace and dropping empty tokens
pub fn tokens<S: AsRef<str>>(requests: &[S]) -> impl Iterator<Item = &str> {
    requests
        .iter()
        .flat_map(|request| request.as_ref().split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[must_use]
pub fn is_wildcard(token: &str) -> bool {
    token.contains(WILDCARD)
}

/// Whether `name` is a single plain path component, usable as a directory directly
/// below the data root. Rejects absolute paths, separators, `.` and `..`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Whether any requested token needs the catalog of known triggers to expand
#[must_use]
pub fn needs_catalog<S: AsRef<str>>(requests: &[S]) -> bool {
    tokens(requests).any(is_wildcard)
}

/// Expand requests into concrete trigger identifiers.
///
/// Literal tokens pass through unchanged; their existence is checked when the job is
/// loaded. Wildcard tokens expand to every matching catalog entry, in catalog order,
/// and contribute nothing when nothing matches. With `dedup`, only the first
/// occurrence of each identifier is kept.
#[must_use]
pub fn resolve<S: AsRef<str>>(requests: &[S], catalog: &[String], dedup: bool) -> Vec<String> {
    let mut resolved = Vec::new();
    for token in tokens(requests) {
        if !is_wildcard(token) {
            resolved.push(token.to_string());
            continue;
        }
        let pattern = match Pattern::new(token) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("Ignoring invalid trigger pattern '{token}': {e}");
                continue;
            }
        };
        let before = resolved.len();
        resolved.extend(
            catalog
                .iter()
                .filter(|name| pattern.matches(name))
                .cloned(),
        );
        match resolved.len() - before {
            0 => warn!("No triggers match '{token}'"),
            n => debug!("Pattern '{token}' matched {n} trigger(s)"),
        }
    }

    if dedup {
        let mut seen = HashSet::new();
        resolved.retain(|trigger| seen.insert(trigger.clone()));
    }
    resolved
}
