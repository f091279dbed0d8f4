//! Conservative "is it safe to mutate" probes. Every ambiguous answer
//! resolves to locked.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use sysinfo::{ProcessesToUpdate, System};

const SENTINEL_NAME: &str = ".sweep_test_lock";

/// Whether `path` is unsafe to mutate right now.
///
/// Files are probed with an append-mode open (no truncation). Directories
/// are probed by creating and removing a sentinel file inside them, which
/// also reports read-only mounts and permission lockouts. A path that is
/// neither is treated as locked.
pub fn is_locked(path: &Path) -> bool {
    if path.is_file() {
        file_locked(path)
    } else if path.is_dir() {
        dir_locked(path)
    } else {
        true
    }
}

fn file_locked(path: &Path) -> bool {
    match OpenOptions::new().append(true).open(path) {
        Ok(_) => false,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "file lock probe failed");
            true
        }
    }
}

fn dir_locked(path: &Path) -> bool {
    let sentinel = path.join(SENTINEL_NAME);
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&sentinel)
        .and_then(|mut f| f.write_all(b"test"));
    if let Err(e) = written {
        tracing::debug!(path = %path.display(), error = %e, "directory lock probe failed");
        return true;
    }
    match std::fs::remove_file(&sentinel) {
        Ok(()) => false,
        Err(e) => {
            tracing::debug!(path = %sentinel.display(), error = %e, "sentinel removal failed");
            true
        }
    }
}

/// Whether any live process has a name in `names` (case-insensitive).
///
/// Processes that exit or deny access during enumeration are skipped.
pub fn is_process_running(names: &[String]) -> bool {
    if names.is_empty() {
        return false;
    }
    let wanted: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    sys.processes()
        .values()
        .any(|process| name_matches(&process.name().to_string_lossy(), &wanted))
}

fn name_matches(name: &str, wanted: &HashSet<String>) -> bool {
    !name.is_empty() && wanted.contains(&name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writable_file_is_not_locked() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("base.1CD");
        std::fs::write(&file, b"data").unwrap();

        assert!(!is_locked(&file));
        assert_eq!(std::fs::read(&file).unwrap(), b"data");
    }

    #[test]
    fn writable_directory_is_not_locked_and_sentinel_is_removed() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_locked(tmp.path()));
        assert!(!tmp.path().join(SENTINEL_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_is_locked() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("metadata");
        std::fs::create_dir(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind root.
        if std::fs::write(dir.join("probe"), b"x").is_ok() {
            eprintln!("permissions not enforced (running as root?), skipping");
            return;
        }

        assert!(is_locked(&dir));
        assert!(!dir.join(SENTINEL_NAME).exists());
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn missing_path_is_locked() {
        let tmp = TempDir::new().unwrap();
        assert!(is_locked(&tmp.path().join("vanished")));
    }

    #[test]
    fn process_names_match_case_insensitively() {
        let wanted: HashSet<String> = ["1cedt.exe".to_string()].into_iter().collect();
        assert!(name_matches("1CEDT.EXE", &wanted));
        assert!(!name_matches("eclipse.exe", &wanted));
        assert!(!name_matches("", &wanted));
    }

    #[test]
    fn unknown_process_is_not_running() {
        assert!(!is_process_running(&["no-such-process-9f2c1d".to_string()]));
        assert!(!is_process_running(&[]));
    }
}
