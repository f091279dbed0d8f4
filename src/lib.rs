//! Disk-space reclamation for heavyweight developer artifacts.
//!
//! Three kinds of resources are swept: git repositories, EDT (Eclipse)
//! workspaces and 1C file databases. Every kind runs through the same
//! pipeline (validate, measure, gate, lock check, act, measure) and the
//! per-candidate outcomes are merged into one JSON report per run.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod kind;
pub mod locator;
pub mod lock;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod report;
pub mod sweep;
pub mod tool;
pub mod utils;

pub use config::Config;
pub use handler::{ActionTag, Outcome, OutcomeDetails, ResourceHandler, Status};
pub use kind::ResourceKind;
pub use orchestrator::Orchestrator;
pub use report::Report;
