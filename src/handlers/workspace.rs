use crate::config::EdtSettings;
use crate::error::SweepError;
use crate::handler::{ActionLog, ActionTag, OutcomeDetails, ResourceHandler, WorkspaceStats};
use crate::kind::ResourceKind;
use crate::{locator, lock, utils};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Logs,
    History,
    Snapshots,
    Caches,
}

/// Workspace-relative paths that are always safe to delete. `*` matches
/// within one path segment.
const SAFE_TO_DELETE: &[(Category, &[&str])] = &[
    (Category::Logs, &[".metadata/.log", ".metadata/.bak_*.log"]),
    (
        Category::History,
        &[".metadata/.plugins/org.eclipse.core.resources/.history"],
    ),
    (
        Category::Snapshots,
        &[
            ".metadata/.plugins/org.eclipse.core.resources/.snap",
            ".metadata/.plugins/*/snapshots",
        ],
    ),
    (
        Category::Caches,
        &[
            ".metadata/.plugins/org.eclipse.pde.core/.bundle_pool",
            ".metadata/.plugins/org.eclipse.e4.workbench/workbench.xmi.bak",
            ".metadata/.plugins/org.eclipse.core.resources/.safetable",
            ".metadata/.plugins/org.eclipse.jdt.core/*.index",
        ],
    ),
];

const PLUGINS_DIR: &str = ".metadata/.plugins";

/// EDT workspaces: delete logs, local history, snapshots and plugin caches.
pub struct WorkspaceHandler<'a> {
    settings: &'a EdtSettings,
}

impl<'a> WorkspaceHandler<'a> {
    pub fn new(settings: &'a EdtSettings) -> Self {
        Self { settings }
    }
}

impl ResourceHandler for WorkspaceHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Workspace
    }

    fn threshold_bytes(&self) -> u64 {
        self.settings.search.threshold_bytes(ResourceKind::Workspace)
    }

    fn candidates(&self) -> Vec<PathBuf> {
        locator::locate(ResourceKind::Workspace, &self.settings.search)
    }

    fn lock_reason(&self, candidate: &Path) -> Option<String> {
        if candidate.join(".metadata").join(".lock").exists()
            || lock::is_process_running(&self.settings.process_names)
        {
            return Some("Workspace is locked (EDT is running)".to_string());
        }
        if lock::is_locked(&candidate.join(".metadata")) {
            return Some("Workspace is locked (no write access to .metadata)".to_string());
        }
        None
    }

    fn initial_details(&self) -> OutcomeDetails {
        OutcomeDetails::Workspace {
            files_deleted: 0,
            details: WorkspaceStats::default(),
        }
    }

    fn act(&self, candidate: &Path, log: &mut ActionLog) -> Result<(), SweepError> {
        let stats = clean_workspace(candidate);

        for (count, action) in [
            (stats.logs_cleared, ActionTag::ClearLogs),
            (stats.history_cleared, ActionTag::ClearHistory),
            (stats.snapshots_cleared, ActionTag::ClearSnapshots),
            (stats.caches_cleared, ActionTag::ClearCaches),
        ] {
            if count > 0 {
                log.record(action);
            }
        }
        log.details = OutcomeDetails::Workspace {
            files_deleted: stats.total(),
            details: stats,
        };
        Ok(())
    }
}

/// Delete every allow-listed entry under `workspace`, plus any `*.log`
/// below the plugins tree. Per-file failures are skipped silently and only
/// successful deletions are counted.
pub fn clean_workspace(workspace: &Path) -> WorkspaceStats {
    let mut stats = WorkspaceStats::default();

    for (category, patterns) in SAFE_TO_DELETE {
        let mut removed = 0;
        for pattern in *patterns {
            for path in expand(workspace, pattern) {
                removed += remove_entry(&path);
            }
        }
        if *category == Category::Logs {
            removed += remove_plugin_logs(&workspace.join(PLUGINS_DIR));
        }

        match category {
            Category::Logs => stats.logs_cleared += removed,
            Category::History => stats.history_cleared += removed,
            Category::Snapshots => stats.snapshots_cleared += removed,
            Category::Caches => stats.caches_cleared += removed,
        }
    }

    tracing::debug!(workspace = %workspace.display(), ?stats, "workspace cleaned");
    stats
}

/// Existing paths matching a workspace-relative pattern.
fn expand(workspace: &Path, pattern: &str) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&workspace.to_string_lossy());
    let full = format!("{base}/{pattern}");
    match glob::glob(&full) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            tracing::debug!(pattern = %full, error = %e, "invalid glob pattern");
            Vec::new()
        }
    }
}

fn remove_entry(path: &Path) -> usize {
    if path.is_dir() {
        utils::remove_tree(path)
    } else {
        usize::from(utils::remove_file(path))
    }
}

fn remove_plugin_logs(plugins: &Path) -> usize {
    WalkDir::new(plugins)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .filter(|e| utils::remove_file(e.path()))
        .count()
}
