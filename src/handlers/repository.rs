use crate::config::SearchSettings;
use crate::error::{SweepError, ToolError};
use crate::handler::{ActionLog, ActionTag, OutcomeDetails, ResourceHandler};
use crate::kind::ResourceKind;
use crate::tool;
use crate::{locator, lock, utils};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Git repositories: drop orphaned packs, prune remotes, `gc --prune=now`.
pub struct RepositoryHandler<'a> {
    settings: &'a SearchSettings,
    git: PathBuf,
}

impl<'a> RepositoryHandler<'a> {
    pub fn new(settings: &'a SearchSettings) -> Self {
        Self {
            settings,
            git: PathBuf::from("git"),
        }
    }

    fn git(&self, repo: &Path, args: &[&str], timeout: Duration) -> Result<tool::ToolOutput, ToolError> {
        tool::run(&self.git, args, Some(repo), timeout)?.check()
    }

    /// Reclaimable bytes reported by `git count-objects -v`. Unparsable
    /// output counts as no garbage; a failed or timed-out run also counts as
    /// none but is noted on the outcome.
    fn garbage_bytes(&self, repo: &Path, log: &mut ActionLog) -> u64 {
        match self.git(repo, &["count-objects", "-v"], tool::ACCOUNTING_TIMEOUT) {
            Ok(out) => parse_garbage_kib(&out.stdout).saturating_mul(1024),
            Err(e) => {
                tracing::warn!(repo = %repo.display(), error = %e, "count-objects failed");
                log.note(format!("Garbage accounting failed: {e}"));
                0
            }
        }
    }

    fn remotes(&self, repo: &Path) -> Result<Vec<String>, ToolError> {
        let out = self.git(repo, &["remote"], tool::ACCOUNTING_TIMEOUT)?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn prune_remotes(&self, repo: &Path, log: &mut ActionLog) {
        let remotes = match self.remotes(repo) {
            Ok(r) => r,
            Err(e) => {
                log.note(format!("Remote prune failed: {e}"));
                return;
            }
        };

        let mut pruned = false;
        for remote in &remotes {
            match self.git(repo, &["remote", "prune", remote], tool::REMOTE_PRUNE_TIMEOUT) {
                Ok(_) => pruned = true,
                Err(e) => log.note(format!("Remote prune failed ({remote}): {e}")),
            }
        }
        if pruned {
            log.record(ActionTag::RemotePrune);
        }
    }
}

impl ResourceHandler for RepositoryHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Repository
    }

    fn threshold_bytes(&self) -> u64 {
        self.settings.threshold_bytes(ResourceKind::Repository)
    }

    fn prepare(&mut self) -> Result<(), String> {
        match tool::run(&self.git, &["--version"], None, tool::VERSION_CHECK_TIMEOUT).and_then(|o| o.check()) {
            Ok(out) => {
                tracing::debug!(version = %out.stdout.trim(), "git available");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "git is not available");
                Err("Git is not available in the system".to_string())
            }
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        locator::locate(ResourceKind::Repository, self.settings)
    }

    fn lock_reason(&self, candidate: &Path) -> Option<String> {
        let git_dir = candidate.join(".git");
        if git_dir.join("index.lock").exists() {
            return Some("Repository is locked by another git process (index.lock present)".to_string());
        }
        if lock::is_locked(&git_dir) {
            return Some("Repository is locked (no write access to .git)".to_string());
        }
        None
    }

    fn initial_details(&self) -> OutcomeDetails {
        OutcomeDetails::Repository {
            garbage_before: 0,
            garbage_after: 0,
            garbage_packs_removed: 0,
        }
    }

    fn act(&self, candidate: &Path, log: &mut ActionLog) -> Result<(), SweepError> {
        let garbage_before = self.garbage_bytes(candidate, log);

        let pack_dir = candidate.join(".git").join("objects").join("pack");
        let removed = remove_orphaned_packs(&pack_dir);
        if removed > 0 {
            log.record(ActionTag::RemoveGarbagePacks);
        }
        log.details = OutcomeDetails::Repository {
            garbage_before,
            garbage_after: 0,
            garbage_packs_removed: removed,
        };

        self.prune_remotes(candidate, log);

        self.git(candidate, &["gc", "--prune=now"], tool::GC_TIMEOUT)
            .map_err(|e| SweepError::step("Git gc failed", e))?;
        log.record(ActionTag::Gc);

        let garbage_after = self.garbage_bytes(candidate, log);
        log.details = OutcomeDetails::Repository {
            garbage_before,
            garbage_after,
            garbage_packs_removed: removed,
        };
        Ok(())
    }
}

/// Value of the `size-garbage:` line (KiB), 0 when absent or garbled.
pub fn parse_garbage_kib(output: &str) -> u64 {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("size-garbage:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// `.pack` files in `pack_dir` that have no matching `.idx`.
pub fn orphaned_packs(pack_dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = std::fs::read_dir(pack_dir) else {
        return Vec::new();
    };
    let mut packs: Vec<PathBuf> = read_dir
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "pack"))
        .filter(|p| !p.with_extension("idx").exists())
        .collect();
    packs.sort();
    packs
}

/// Delete orphaned packs together with sidecars sharing their base name
/// (`.mtimes`, `.rev`, `.bitmap`, ...). Returns the number of packs removed.
fn remove_orphaned_packs(pack_dir: &Path) -> usize {
    let mut removed = 0;
    for pack in orphaned_packs(pack_dir) {
        let size = utils::entry_size(&pack);
        if !utils::remove_file(&pack) {
            continue;
        }
        removed += 1;
        tracing::info!(pack = %pack.display(), size, "removed orphaned pack");

        let Some(stem) = pack.file_stem().map(|s| s.to_os_string()) else {
            continue;
        };
        if let Ok(read_dir) = std::fs::read_dir(pack_dir) {
            for sidecar in read_dir
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.file_stem() == Some(stem.as_os_str()))
            {
                utils::remove_file(&sidecar);
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_size_garbage_line() {
        let out = "count: 12\nsize: 48\nin-pack: 300\npacks: 1\nsize-pack: 1024\nprune-packable: 0\ngarbage: 2\nsize-garbage: 2048\n";
        assert_eq!(parse_garbage_kib(out), 2048);
    }

    #[test]
    fn missing_or_garbled_garbage_line_is_zero() {
        assert_eq!(parse_garbage_kib("count: 1\nsize: 4\n"), 0);
        assert_eq!(parse_garbage_kib("size-garbage: lots\n"), 0);
        assert_eq!(parse_garbage_kib(""), 0);
    }

    #[test]
    fn orphaned_pack_and_sidecars_are_removed() {
        let tmp = TempDir::new().unwrap();
        let pack_dir = tmp.path();
        for name in [
            "pack-good.pack",
            "pack-good.idx",
            "pack-bad.pack",
            "pack-bad.mtimes",
            "pack-bad.rev",
        ] {
            std::fs::write(pack_dir.join(name), b"x").unwrap();
        }

        assert_eq!(orphaned_packs(pack_dir), vec![pack_dir.join("pack-bad.pack")]);
        assert_eq!(remove_orphaned_packs(pack_dir), 1);

        assert!(pack_dir.join("pack-good.pack").exists());
        assert!(pack_dir.join("pack-good.idx").exists());
        assert!(!pack_dir.join("pack-bad.pack").exists());
        assert!(!pack_dir.join("pack-bad.mtimes").exists());
        assert!(!pack_dir.join("pack-bad.rev").exists());
        assert_eq!(remove_orphaned_packs(pack_dir), 0);
    }

    #[test]
    fn failed_garbage_accounting_is_noted_as_zero() {
        let tmp = TempDir::new().unwrap();
        let settings = SearchSettings::default();
        let handler = RepositoryHandler {
            settings: &settings,
            git: PathBuf::from("/nonexistent/git-5e1b"),
        };
        let mut log = ActionLog {
            actions: Vec::new(),
            errors: Vec::new(),
            details: handler.initial_details(),
        };

        assert_eq!(handler.garbage_bytes(tmp.path(), &mut log), 0);
        assert_eq!(log.errors.len(), 1);
        assert!(
            log.errors[0].starts_with("Garbage accounting failed: "),
            "{:?}",
            log.errors
        );
        assert!(log.actions.is_empty());
    }

    #[test]
    fn index_lock_marks_repository_in_use() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        let settings = SearchSettings::default();
        let handler = RepositoryHandler::new(&settings);

        assert_eq!(handler.lock_reason(tmp.path()), None);
        std::fs::write(tmp.path().join(".git/index.lock"), b"").unwrap();
        assert!(handler
            .lock_reason(tmp.path())
            .unwrap()
            .contains("another git process"));
    }
}
