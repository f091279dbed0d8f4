//! Run report: merged outcomes, summary counters and persistence.

use crate::handler::{Outcome, Status};
use crate::kind::ResourceKind;
use crate::sweep::SweepSection;
use crate::utils;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const REPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
}

impl KindCounts {
    fn tally(outcomes: &[Outcome]) -> Self {
        KindCounts {
            processed: outcomes.len(),
            success: outcomes.iter().filter(|o| o.status == Status::Success).count(),
            failed: outcomes.iter().filter(|o| o.status == Status::Error).count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Sum of `spaceSaved` over successful outcomes only, in bytes.
    #[serde(serialize_with = "gb")]
    pub total_space_saved: i64,
    pub git_repos_processed: usize,
    pub git_repos_success: usize,
    pub git_repos_failed: usize,
    pub workspaces_processed: usize,
    pub workspaces_success: usize,
    pub workspaces_failed: usize,
    pub databases_processed: usize,
    pub databases_success: usize,
    pub databases_failed: usize,
}

impl Summary {
    pub fn counts(&self, kind: ResourceKind) -> KindCounts {
        match kind {
            ResourceKind::Repository => KindCounts {
                processed: self.git_repos_processed,
                success: self.git_repos_success,
                failed: self.git_repos_failed,
            },
            ResourceKind::Workspace => KindCounts {
                processed: self.workspaces_processed,
                success: self.workspaces_success,
                failed: self.workspaces_failed,
            },
            ResourceKind::Database => KindCounts {
                processed: self.databases_processed,
                success: self.databases_success,
                failed: self.databases_failed,
            },
        }
    }

    fn set_counts(&mut self, kind: ResourceKind, counts: KindCounts) {
        let (processed, success, failed) = match kind {
            ResourceKind::Repository => (
                &mut self.git_repos_processed,
                &mut self.git_repos_success,
                &mut self.git_repos_failed,
            ),
            ResourceKind::Workspace => (
                &mut self.workspaces_processed,
                &mut self.workspaces_success,
                &mut self.workspaces_failed,
            ),
            ResourceKind::Database => (
                &mut self.databases_processed,
                &mut self.databases_success,
                &mut self.databases_failed,
            ),
        };
        *processed = counts.processed;
        *success = counts.success;
        *failed = counts.failed;
    }
}

/// One failed outcome, surfaced at the top of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub errors: Vec<String>,
}

/// A section-level problem that stopped a kind's sweep before it started.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_version: &'static str,
    #[serde(rename = "timestamp", serialize_with = "rfc3339")]
    pub start_time: DateTime<Local>,
    #[serde(serialize_with = "rfc3339")]
    pub end_time: DateTime<Local>,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    pub hostname: String,
    pub summary: Summary,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repositories: Option<Vec<Outcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edt_workspaces: Option<Vec<Outcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<Outcome>>,
}

impl Report {
    /// Merge the swept sections into a report. Kinds without a section were
    /// not configured and stay absent; configured kinds with no candidates
    /// appear with an empty list.
    pub fn build(
        sections: Vec<SweepSection>,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
    ) -> Self {
        let mut report = Report {
            report_version: REPORT_VERSION,
            start_time,
            end_time,
            duration_seconds: (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0,
            hostname: hostname(),
            summary: Summary::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            git_repositories: None,
            edt_workspaces: None,
            databases: None,
        };

        for section in sections {
            let kind = section.kind;
            report.summary.set_counts(kind, KindCounts::tally(&section.outcomes));
            report.summary.total_space_saved += section
                .outcomes
                .iter()
                .map(Outcome::counted_savings)
                .sum::<i64>();

            report.errors.extend(
                section
                    .outcomes
                    .iter()
                    .filter(|o| o.status == Status::Error)
                    .map(|o| ErrorRecord {
                        kind,
                        path: o.path.clone(),
                        errors: o.errors.clone(),
                    }),
            );
            if let Some(message) = section.diagnostic {
                report.warnings.push(Warning { kind, message });
            }

            *report.slot(kind) = Some(section.outcomes);
        }
        report
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut Option<Vec<Outcome>> {
        match kind {
            ResourceKind::Repository => &mut self.git_repositories,
            ResourceKind::Workspace => &mut self.edt_workspaces,
            ResourceKind::Database => &mut self.databases,
        }
    }

    /// Outcomes of `kind`, `None` when that kind was not configured.
    pub fn outcomes(&self, kind: ResourceKind) -> Option<&[Outcome]> {
        match kind {
            ResourceKind::Repository => self.git_repositories.as_deref(),
            ResourceKind::Workspace => self.edt_workspaces.as_deref(),
            ResourceKind::Database => self.databases.as_deref(),
        }
    }

    pub fn warning(&self, kind: ResourceKind) -> Option<&str> {
        self.warnings
            .iter()
            .find(|w| w.kind == kind)
            .map(|w| w.message.as_str())
    }

    pub fn has_errors(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .filter_map(|k| self.outcomes(k))
            .flatten()
            .any(|o| o.status == Status::Error)
    }

    /// Write the report as `report_<timestamp>.json` under `dir`. An existing
    /// file is never overwritten; a `_N` suffix is added instead.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create reports directory {}", dir.display()))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut attempt = 0u32;
        let (path, file) = loop {
            let name = if attempt == 0 {
                format!("report_{stamp}.json")
            } else {
                format!("report_{stamp}_{attempt}.json")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        };

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        tracing::info!(path = %path.display(), "report saved");
        Ok(path)
    }
}

fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}

fn gb<S: Serializer>(bytes: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(utils::bytes_to_gb(*bytes))
}

fn rfc3339<S: Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ActionTag, OutcomeDetails, WorkspaceStats};
    use crate::utils::BYTES_PER_GB;
    use tempfile::TempDir;

    fn outcome(path: &str, status: Status, saved_gb: i64) -> Outcome {
        let before = 10 * BYTES_PER_GB;
        Outcome {
            path: PathBuf::from(path),
            size_before: before,
            size_after: Some((before as i64 - saved_gb * BYTES_PER_GB as i64) as u64),
            space_saved: saved_gb * BYTES_PER_GB as i64,
            duration_seconds: 0.1,
            status,
            actions_performed: match status {
                Status::Success => vec![ActionTag::ClearLogs],
                _ => Vec::new(),
            },
            errors: match status {
                Status::Success => Vec::new(),
                _ => vec!["something".to_string()],
            },
            details: OutcomeDetails::Workspace {
                files_deleted: 0,
                details: WorkspaceStats::default(),
            },
        }
    }

    fn section(kind: ResourceKind, outcomes: Vec<Outcome>) -> SweepSection {
        SweepSection {
            kind,
            outcomes,
            diagnostic: None,
        }
    }

    #[test]
    fn total_counts_only_successful_savings() {
        let now = Local::now();
        let report = Report::build(
            vec![
                section(
                    ResourceKind::Workspace,
                    vec![
                        outcome("/a", Status::Success, 2),
                        outcome("/b", Status::Skipped, 5),
                        outcome("/c", Status::Error, 3),
                    ],
                ),
                section(
                    ResourceKind::Repository,
                    vec![outcome("/r", Status::Success, -1)],
                ),
            ],
            now,
            now,
        );

        assert_eq!(report.summary.total_space_saved, BYTES_PER_GB as i64);
        assert_eq!(
            report.summary.counts(ResourceKind::Workspace),
            KindCounts {
                processed: 3,
                success: 1,
                failed: 1
            }
        );
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, PathBuf::from("/c"));
        assert!(report.has_errors());
    }

    #[test]
    fn absent_and_empty_sections_are_distinct() {
        let now = Local::now();
        let mut empty = section(ResourceKind::Database, Vec::new());
        empty.diagnostic = Some("1C platform not found (version mask: any)".to_string());
        let report = Report::build(vec![empty], now, now);

        assert!(report.outcomes(ResourceKind::Repository).is_none());
        assert_eq!(report.outcomes(ResourceKind::Database), Some(&[][..]));
        assert_eq!(
            report.warning(ResourceKind::Database),
            Some("1C platform not found (version mask: any)")
        );
        assert!(!report.has_errors());

        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("gitRepositories").is_none());
        assert_eq!(value["databases"], serde_json::json!([]));
        assert_eq!(value["reportVersion"], "1.0");
        assert_eq!(value["warnings"][0]["type"], "database");
    }

    #[test]
    fn save_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let now = Local::now();
        let report = Report::build(
            vec![section(ResourceKind::Workspace, vec![outcome("/a", Status::Success, 1)])],
            now,
            now,
        );

        let first = report.save(&tmp.path().join("reports")).unwrap();
        let second = report.save(&tmp.path().join("reports")).unwrap();
        assert_ne!(first, second);

        let text = std::fs::read_to_string(&first).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["totalSpaceSaved"], 1.0);
        assert_eq!(value["summary"]["workspacesProcessed"], 1);
        assert_eq!(value["edtWorkspaces"][0]["status"], "success");
        assert!(value["hostname"].is_string());
    }
}
