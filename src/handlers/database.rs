use crate::config::DatabaseSettings;
use crate::error::SweepError;
use crate::handler::{ActionLog, ActionTag, OutcomeDetails, ResourceHandler};
use crate::kind::ResourceKind;
use crate::platform::{self, Platform};
use crate::{locator, lock, tool};
use std::path::{Path, PathBuf};

/// 1C file databases: run the platform's `/TestAndRepair` routine.
pub struct DatabaseHandler<'a> {
    settings: &'a DatabaseSettings,
    platform: Option<Platform>,
}

impl<'a> DatabaseHandler<'a> {
    pub fn new(settings: &'a DatabaseSettings) -> Self {
        Self {
            settings,
            platform: None,
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.settings
            .platform_roots
            .clone()
            .unwrap_or_else(platform::default_roots)
    }

    /// Arguments for the designer-mode integrity run.
    fn repair_args(&self, database: &Path) -> Vec<String> {
        let mut args = vec![
            "DESIGNER".to_string(),
            "/F".to_string(),
            database.display().to_string(),
            "/TestAndRepair".to_string(),
        ];
        if let Some((user, password)) = self.settings.credentials() {
            args.push("/N".to_string());
            args.push(user);
            if let Some(password) = password {
                args.push("/P".to_string());
                args.push(password);
            }
        }
        args
    }
}

impl ResourceHandler for DatabaseHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Database
    }

    fn threshold_bytes(&self) -> u64 {
        self.settings.search.threshold_bytes(ResourceKind::Database)
    }

    fn prepare(&mut self) -> Result<(), String> {
        let mask = self.settings.version_mask().map_err(|e| e.to_string())?;
        let label = mask.as_ref().map_or("any", |m| m.as_str()).to_string();
        match platform::find_platform(&self.roots(), mask.as_ref()) {
            Some(found) => {
                tracing::info!(version = %found.version, exe = %found.executable.display(), "using 1C platform");
                self.platform = Some(found);
                Ok(())
            }
            None => Err(format!("1C platform not found (version mask: {label})")),
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        locator::locate(ResourceKind::Database, &self.settings.search)
    }

    fn lock_reason(&self, candidate: &Path) -> Option<String> {
        lock::is_locked(candidate).then(|| "Database is locked (in use)".to_string())
    }

    fn initial_details(&self) -> OutcomeDetails {
        OutcomeDetails::Database {
            platform: self
                .platform
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |p| p.version.to_string()),
        }
    }

    fn act(&self, candidate: &Path, log: &mut ActionLog) -> Result<(), SweepError> {
        let Some(platform) = &self.platform else {
            return Err(SweepError::Unexpected("Platform not found".to_string()));
        };

        let args = self.repair_args(candidate);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        tool::run(&platform.executable, &args, None, tool::REPAIR_TIMEOUT)?.check()?;
        log.record(ActionTag::TestAndRepair);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::encode_password;
    use tempfile::TempDir;

    #[test]
    fn repair_args_include_credentials() {
        let settings = DatabaseSettings {
            user: Some("Admin".into()),
            password: Some(encode_password("s3cret")),
            ..Default::default()
        };
        let handler = DatabaseHandler::new(&settings);
        assert_eq!(
            handler.repair_args(Path::new("/b/1Cv8.1CD")),
            vec!["DESIGNER", "/F", "/b/1Cv8.1CD", "/TestAndRepair", "/N", "Admin", "/P", "s3cret"]
        );
    }

    #[test]
    fn repair_args_without_credentials() {
        let settings = DatabaseSettings::default();
        let handler = DatabaseHandler::new(&settings);
        assert_eq!(
            handler.repair_args(Path::new("/b/1Cv8.1CD")),
            vec!["DESIGNER", "/F", "/b/1Cv8.1CD", "/TestAndRepair"]
        );
    }

    #[test]
    fn prepare_fails_without_platform() {
        let tmp = TempDir::new().unwrap();
        let settings = DatabaseSettings {
            platform_version: Some("8.3.27".into()),
            platform_roots: Some(vec![tmp.path().to_path_buf()]),
            ..Default::default()
        };
        let mut handler = DatabaseHandler::new(&settings);
        assert_eq!(
            handler.prepare(),
            Err("1C platform not found (version mask: 8.3.27)".to_string())
        );
        assert!(handler.platform.is_none());
    }

    #[test]
    fn prepare_selects_platform_and_reports_version() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("8.3.27.1234").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("1cv8"), b"").unwrap();

        let settings = DatabaseSettings {
            platform_roots: Some(vec![tmp.path().to_path_buf()]),
            ..Default::default()
        };
        let mut handler = DatabaseHandler::new(&settings);
        handler.prepare().unwrap();
        assert_eq!(
            handler.initial_details(),
            OutcomeDetails::Database {
                platform: "8.3.27.1234".to_string()
            }
        );
    }
}
