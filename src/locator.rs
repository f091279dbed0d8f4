//! Expands explicit paths and search roots into the candidate set of one kind.

use crate::config::SearchSettings;
use crate::kind::{has_database_extension, ResourceKind};
use crate::utils;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Deduplicated, absolute, sorted candidates for `kind`.
///
/// Explicit paths that do not carry the kind marker are dropped silently.
/// Search roots are probed themselves plus their immediate children, except
/// for databases whose roots are walked recursively. Unreadable roots are
/// logged and contribute nothing.
pub fn locate(kind: ResourceKind, settings: &SearchSettings) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    for path in &settings.explicit_paths {
        if kind.matches(path) {
            found.insert(utils::absolute(path));
        } else {
            tracing::debug!(kind = %kind, path = %path.display(), "explicit path is not a match");
        }
    }

    for root in &settings.search_paths {
        if !root.exists() {
            tracing::debug!(kind = %kind, root = %root.display(), "search root does not exist");
            continue;
        }
        let hits = if kind.recursive_search() {
            search_files(root)
        } else {
            search_shallow(kind, root)
        };
        found.extend(hits.iter().map(|p| utils::absolute(p)));
    }

    found.into_iter().collect()
}

fn search_shallow(kind: ResourceKind, root: &Path) -> Vec<PathBuf> {
    let mut hits = Vec::new();
    if kind.matches(root) {
        hits.push(root.to_path_buf());
    }

    match std::fs::read_dir(root) {
        Ok(read_dir) => {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() && kind.matches(&path) {
                    hits.push(path);
                }
            }
        }
        Err(e) => {
            tracing::warn!(kind = %kind, root = %root.display(), error = %e, "cannot read search root");
        }
    }
    hits
}

fn search_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return if has_database_extension(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_database_extension(e.path()))
        .map(|e| e.into_path())
        .collect()
}
