//! Configuration document: `{"settings": {"git": .., "edt": .., "database": .., "general": ..}}`.
//!
//! Loaded once per run and passed by reference everywhere; nothing here is
//! mutated after [`Config::load`] returns.

use crate::error::ConfigError;
use crate::kind::ResourceKind;
use crate::platform::VersionMask;
use crate::utils;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "maintenance-config.json";

#[derive(Debug, Clone, Deserialize)]
struct Document {
    settings: Option<Config>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub git: Option<GitSettings>,
    pub edt: Option<EdtSettings>,
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub general: GeneralSettings,
}

/// Fields every kind section shares.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    #[serde(default, alias = "repos", alias = "workspaces", alias = "databases")]
    pub explicit_paths: Vec<PathBuf>,
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default, rename = "sizeThresholdGB")]
    pub size_threshold_gb: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitSettings {
    #[serde(flatten)]
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdtSettings {
    #[serde(flatten)]
    pub search: SearchSettings,
    #[serde(default = "default_process_names")]
    pub process_names: Vec<String>,
}

impl Default for EdtSettings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            process_names: default_process_names(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSettings {
    #[serde(flatten)]
    pub search: SearchSettings,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub platform_roots: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub user: Option<String>,
    /// Base64 of the UTF-8 password. Obfuscation only, not a secret store.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    #[serde(default = "default_reports_path")]
    pub reports_path: PathBuf,
    #[serde(default)]
    pub silent_mode: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            reports_path: default_reports_path(),
            silent_mode: false,
        }
    }
}

fn default_reports_path() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_process_names() -> Vec<String> {
    ["1cedt.exe", "eclipse.exe", "1cedt", "eclipse"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Read, parse and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let document: Document = serde_json::from_str(text)?;
        let config = document.settings.ok_or(ConfigError::MissingSettings)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.git.is_none() && self.edt.is_none() && self.database.is_none() {
            return Err(ConfigError::NoKindSection);
        }
        if let Some(db) = &self.database {
            db.version_mask()?;
        }
        Ok(())
    }

    /// Whether the section for `kind` is present at all.
    pub fn has(&self, kind: ResourceKind) -> bool {
        self.search(kind).is_some()
    }

    pub fn search(&self, kind: ResourceKind) -> Option<&SearchSettings> {
        match kind {
            ResourceKind::Repository => self.git.as_ref().map(|s| &s.search),
            ResourceKind::Workspace => self.edt.as_ref().map(|s| &s.search),
            ResourceKind::Database => self.database.as_ref().map(|s| &s.search),
        }
    }
}

impl SearchSettings {
    /// Gate threshold in bytes, falling back to the kind's default.
    pub fn threshold_bytes(&self, kind: ResourceKind) -> u64 {
        let gb = self.size_threshold_gb.unwrap_or(match kind {
            ResourceKind::Repository => 15,
            ResourceKind::Workspace => 5,
            ResourceKind::Database => 3,
        });
        utils::gb_to_bytes(gb)
    }
}

impl DatabaseSettings {
    /// Parsed platform mask; `None` when no mask (or an empty one) is set.
    pub fn version_mask(&self) -> Result<Option<VersionMask>, ConfigError> {
        match self.platform_version.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(mask) => VersionMask::parse(mask).map(Some),
        }
    }

    /// Username and decoded password. The password is dropped (with a
    /// warning) when it does not decode; without a user neither is used.
    pub fn credentials(&self) -> Option<(String, Option<String>)> {
        let user = self.user.as_deref().filter(|u| !u.is_empty())?;
        let password = match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(encoded) => match decode_password(encoded) {
                Some(p) => Some(p),
                None => {
                    tracing::warn!("database password is not valid base64 UTF-8, ignoring it");
                    None
                }
            },
            None => None,
        };
        Some((user.to_string(), password))
    }
}

/// Reversible base64 obfuscation used for the stored database password.
/// This keeps the password from being read at a glance; it does not keep
/// it secret from anyone who can read the configuration file.
pub fn encode_password(password: &str) -> String {
    STANDARD.encode(password.as_bytes())
}

pub fn decode_password(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}
