use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const BYTES_PER_GB: u64 = 1_073_741_824;

/// Compute total size of a directory recursively.
///
/// Files that vanish or become unreadable mid-walk count as zero. Symlinks
/// are not followed, so a link cycle cannot loop the walk.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Get size of a file or directory. A missing path is 0 bytes.
pub fn entry_size(path: &Path) -> u64 {
    if path.is_dir() {
        dir_size(path)
    } else {
        path.metadata().map(|m| m.len()).unwrap_or(0)
    }
}

/// Remove a single file. Returns true when the file was deleted by us.
pub fn remove_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not remove file");
            false
        }
    }
}

/// Remove a directory tree file by file and return how many files were
/// actually deleted. Failures on single entries do not stop the walk.
pub fn remove_tree(path: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(path)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            let _ = std::fs::remove_dir(entry.path());
        } else if remove_file(entry.path()) && entry.file_type().is_file() {
            removed += 1;
        }
    }
    removed
}

/// Convert whole gigabytes from configuration into bytes.
pub fn gb_to_bytes(gb: u64) -> u64 {
    gb.saturating_mul(BYTES_PER_GB)
}

/// Signed byte count in GB, rounded to two decimals.
pub fn bytes_to_gb(bytes: i64) -> f64 {
    (bytes as f64 / BYTES_PER_GB as f64 * 100.0).round() / 100.0
}

/// GB value for messages: two decimals at most, at least one ("3.0", "3.25").
pub fn format_gb(bytes: i64) -> String {
    let text = format!("{:.2}", bytes_to_gb(bytes));
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

/// Format byte count as human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes >= BYTES_PER_GB {
        format!("{:.2} GB", bytes as f64 / BYTES_PER_GB as f64)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.2} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Absolute form of `path`, resolving symlinks when the path exists.
pub fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Shorten a path for display by replacing home dir with ~.
pub fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(relative) => format!("~/{}", relative.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}
