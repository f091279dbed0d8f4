use serde::Serialize;
use std::fmt;
use std::path::Path;

/// The three resource kinds the sweeper knows how to reclaim space from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[serde(rename = "git")]
    Repository,
    #[serde(rename = "edt")]
    Workspace,
    Database,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Repository,
        ResourceKind::Workspace,
        ResourceKind::Database,
    ];

    /// Key of this kind's section in the configuration document.
    pub fn config_key(self) -> &'static str {
        match self {
            ResourceKind::Repository => "git",
            ResourceKind::Workspace => "edt",
            ResourceKind::Database => "database",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Repository => "Git repositories",
            ResourceKind::Workspace => "EDT workspaces",
            ResourceKind::Database => "1C databases",
        }
    }

    /// Singular noun used in progress lines.
    pub fn noun(self) -> &'static str {
        match self {
            ResourceKind::Repository => "repository",
            ResourceKind::Workspace => "workspace",
            ResourceKind::Database => "database",
        }
    }

    /// Whether `path` carries this kind's marker: a `.git` directory, a
    /// `.metadata` directory, or a file with the `.1cd` extension.
    pub fn matches(self, path: &Path) -> bool {
        match self {
            ResourceKind::Repository => path.join(".git").is_dir(),
            ResourceKind::Workspace => path.join(".metadata").is_dir(),
            ResourceKind::Database => path.is_file() && has_database_extension(path),
        }
    }

    /// Message recorded when a candidate no longer carries the marker.
    pub fn invalid_message(self) -> &'static str {
        match self {
            ResourceKind::Repository => "Not a Git repository",
            ResourceKind::Workspace => "Not an EDT workspace (no .metadata directory)",
            ResourceKind::Database => "Database file not found",
        }
    }

    /// Database files are leaves and are searched recursively; directory
    /// roots are only searched one level deep.
    pub fn recursive_search(self) -> bool {
        matches!(self, ResourceKind::Database)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Case-insensitive `.1cd` check.
pub fn has_database_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("1cd"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn markers_match_expected_layouts() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let ws = tmp.path().join("ws");
        std::fs::create_dir_all(ws.join(".metadata")).unwrap();
        let db = tmp.path().join("1Cv8.1CD");
        std::fs::write(&db, b"db").unwrap();

        assert!(ResourceKind::Repository.matches(&repo));
        assert!(!ResourceKind::Repository.matches(&ws));
        assert!(ResourceKind::Workspace.matches(&ws));
        assert!(ResourceKind::Database.matches(&db));
        assert!(!ResourceKind::Database.matches(&repo));
    }

    #[test]
    fn database_extension_is_case_insensitive() {
        assert!(has_database_extension(Path::new("a/1Cv8.1CD")));
        assert!(has_database_extension(Path::new("a/base.1cd")));
        assert!(!has_database_extension(Path::new("a/base.1cdx")));
        assert!(!has_database_extension(Path::new("a/1cd")));
    }
}
