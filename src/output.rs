use crate::handler::{Outcome, Status};
use crate::kind::ResourceKind;
use crate::report::Report;
use crate::utils;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Reason printed for a configured kind that produced no candidates.
pub const NO_MATCHES_REASON: &str = "no matches under search paths";

/// Human-facing console output. Everything but errors is suppressed in
/// silent mode; errors always go to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    silent: bool,
}

impl Console {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn silent() -> Self {
        Self { silent: true }
    }

    pub fn banner(&self) {
        if self.silent {
            return;
        }
        println!(
            "{}",
            format!("sweeper v{}", env!("CARGO_PKG_VERSION")).bold().cyan()
        );
        println!();
    }

    pub fn section(&self, kind: ResourceKind) {
        if self.silent {
            return;
        }
        println!("{}", format!("=== {} ===", kind.label()).bold().white());
    }

    pub fn info(&self, msg: &str) {
        if self.silent {
            return;
        }
        println!("{} {}", "Info:".cyan().bold(), msg);
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{} {}", "Error:".red().bold(), msg.red());
    }

    pub fn found(&self, kind: ResourceKind, count: usize) {
        self.info(&format!("Found {count} {}", kind.label()));
    }

    pub fn progress(&self, kind: ResourceKind, index: usize, total: usize, path: &Path) {
        if self.silent {
            return;
        }
        println!(
            "  {} {} {}/{}: {}",
            "Processing".cyan(),
            kind.noun(),
            index,
            total,
            utils::display_path(path).dimmed()
        );
    }

    pub fn outcome(&self, outcome: &Outcome) {
        if self.silent {
            return;
        }
        match outcome.status {
            Status::Success => println!(
                "    {} {} GB saved",
                "Done".green().bold(),
                utils::format_gb(outcome.space_saved).green()
            ),
            Status::Skipped => println!(
                "    {} {}",
                "Skipped".yellow(),
                outcome.errors.first().map(String::as_str).unwrap_or_default().dimmed()
            ),
            Status::Error => println!(
                "    {} {}",
                "Failed".red().bold(),
                outcome.errors.join(", ").red()
            ),
        }
    }

    pub fn report_saved(&self, path: &Path) {
        if self.silent {
            return;
        }
        println!(
            "{} {}",
            "Report saved to:".green().bold(),
            utils::display_path(path)
        );
    }

    pub fn candidates(&self, kind: ResourceKind, paths: &[PathBuf]) {
        println!("{}", format!("=== {} ===", kind.label()).bold().white());
        if paths.is_empty() {
            println!("  {}", "none found".dimmed());
        }
        for path in paths {
            println!("  {}  {}", path.display(), utils::format_size(utils::entry_size(path)).yellow());
        }
        println!();
    }

    /// Final run summary. Only configured kinds are printed.
    pub fn summary(&self, report: &Report) {
        if self.silent {
            return;
        }

        println!();
        println!("{}", "=== Summary ===".bold().white());
        println!("  {:<30} {} s", "Duration:", report.duration_seconds.round());
        println!(
            "  {:<30} {}",
            "Total space saved:".bold(),
            format!("{} GB", utils::format_gb(report.summary.total_space_saved)).green().bold()
        );
        println!("  {}", "─".repeat(45).dimmed());

        for kind in ResourceKind::ALL {
            let Some(outcomes) = report.outcomes(kind) else {
                continue;
            };
            println!("  {}", kind.label().bold());
            if outcomes.is_empty() {
                let reason = report.warning(kind).unwrap_or(NO_MATCHES_REASON);
                println!("    {:<26} 0", "Found:");
                println!("    {:<26} {}", "Reason:", reason.dimmed());
            } else {
                let counts = report.summary.counts(kind);
                println!("    {:<26} {}", "Processed:", counts.processed);
                println!("    {:<26} {}", "Success:", counts.success.to_string().green());
                println!("    {:<26} {}", "Failed:", counts.failed.to_string().red());
            }
        }

        if !report.errors.is_empty() {
            println!();
            println!(
                "{}",
                format!("Errors ({}):", report.errors.len()).red().bold()
            );
            for record in &report.errors {
                println!(
                    "  [{}] {}",
                    record.kind.config_key().to_uppercase(),
                    utils::display_path(&record.path)
                );
                for message in &record.errors {
                    println!("    - {}", message.red());
                }
            }
        }
        println!();
    }
}
