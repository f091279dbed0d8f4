//! Sequential sweep of one resource kind over all of its candidates.

use crate::handler::{process_candidate, Outcome, ResourceHandler};
use crate::kind::ResourceKind;
use crate::output::Console;

/// Everything one kind's sweep produced.
#[derive(Debug, Clone)]
pub struct SweepSection {
    pub kind: ResourceKind,
    pub outcomes: Vec<Outcome>,
    /// Why the sweep stopped before processing any candidate, if it did.
    pub diagnostic: Option<String>,
}

/// Run `handler` over its candidates one at a time, in locator order.
///
/// A failure on one candidate, a panic included, is confined to that
/// candidate's outcome and the sweep moves on.
pub fn run_sweep(handler: &mut dyn ResourceHandler, console: &Console) -> SweepSection {
    let kind = handler.kind();
    console.section(kind);

    if let Err(diagnostic) = handler.prepare() {
        tracing::warn!(kind = %kind, %diagnostic, "sweep aborted before processing candidates");
        console.error(&diagnostic);
        return SweepSection {
            kind,
            outcomes: Vec::new(),
            diagnostic: Some(diagnostic),
        };
    }

    let candidates = handler.candidates();
    tracing::info!(kind = %kind, count = candidates.len(), "candidates located");
    if candidates.is_empty() {
        console.info(&format!("No {} found", kind.label()));
    } else {
        console.found(kind, candidates.len());
    }

    let handler: &dyn ResourceHandler = handler;
    let mut outcomes = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        console.progress(kind, i + 1, candidates.len(), candidate);

        let outcome = process_candidate(handler, candidate);
        console.outcome(&outcome);
        outcomes.push(outcome);
    }

    SweepSection {
        kind,
        outcomes,
        diagnostic: None,
    }
}
