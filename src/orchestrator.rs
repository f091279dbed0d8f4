//! One maintenance run: sweep every configured kind in order, merge the
//! sections into a report, persist it and pick the exit code.

use crate::config::Config;
use crate::handlers;
use crate::kind::ResourceKind;
use crate::locator;
use crate::output::Console;
use crate::report::Report;
use crate::sweep::{self, SweepSection};
use chrono::Local;
use std::path::{Path, PathBuf};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// What a finished run leaves behind.
#[derive(Debug)]
pub struct RunSummary {
    pub report: Report,
    /// `None` when the report could not be written.
    pub report_path: Option<PathBuf>,
    pub exit_code: i32,
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    console: Console,
}

impl<'a> Orchestrator<'a> {
    /// Either `silent` or `general.silentMode` suppresses console output.
    pub fn new(config: &'a Config, silent: bool) -> Self {
        Self {
            config,
            console: Console::new(silent || config.general.silent_mode),
        }
    }

    pub fn run(&self) -> RunSummary {
        let start = Local::now();
        self.console.banner();
        tracing::info!("maintenance run started");

        let sections: Vec<SweepSection> = handlers::configured_handlers(self.config)
            .into_iter()
            .map(|mut handler| sweep::run_sweep(handler.as_mut(), &self.console))
            .collect();

        let report = Report::build(sections, start, Local::now());
        let mut exit_code = if report.has_errors() {
            EXIT_FAILURE
        } else {
            EXIT_OK
        };

        let report_path = match report.save(&self.config.general.reports_path) {
            Ok(path) => {
                self.console.report_saved(&path);
                Some(path)
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "failed to save report");
                self.console.error(&format!("Failed to save report: {e:#}"));
                exit_code = EXIT_FAILURE;
                None
            }
        };

        self.console.summary(&report);
        tracing::info!(
            exit_code,
            saved = report.summary.total_space_saved,
            "maintenance run finished"
        );

        RunSummary {
            report,
            report_path,
            exit_code,
        }
    }

    /// Print the candidates each configured kind would sweep, touching
    /// nothing.
    pub fn locate(&self) {
        for kind in ResourceKind::ALL {
            if let Some(search) = self.config.search(kind) {
                self.console.candidates(kind, &locator::locate(kind, search));
            }
        }
    }
}

/// Load the configuration at `path` and run. Configuration problems are
/// reported on stderr and give exit code 1 without a report.
pub fn run_from_path(path: &Path, silent: bool) -> i32 {
    match Config::load(path) {
        Ok(config) => Orchestrator::new(&config, silent).run().exit_code,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "configuration rejected");
            Console::new(silent).error(&format!("Configuration error: {e}"));
            EXIT_FAILURE
        }
    }
}
