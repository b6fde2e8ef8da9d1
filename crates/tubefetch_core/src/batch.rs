use std::fmt;
use std::path::PathBuf;

use crate::ResolvedItem;

/// Ordered, immutable list of work items for one start request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobBatch {
    items: Vec<ResolvedItem>,
}

impl JobBatch {
    pub fn new(items: Vec<ResolvedItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ResolvedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded { path: Option<PathBuf> },
    Failed { cause: String },
    /// Aborted mid-transfer by the user.
    Cancelled,
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Succeeded { path: Some(path) } => write!(f, "saved to {}", path.display()),
            ItemOutcome::Succeeded { path: None } => write!(f, "completed"),
            ItemOutcome::Failed { cause } => write!(f, "failed: {cause}"),
            ItemOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal counts for one batch.
///
/// `attempted == succeeded + failed + cancelled` and
/// `attempted + skipped == items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub items: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Items never started because the batch was cancelled.
    pub skipped: usize,
    pub rejected_references: usize,
    pub listing_failures: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.attempted += 1;
        match outcome {
            ItemOutcome::Succeeded { .. } => self.succeeded += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.failed > 0 || self.rejected_references > 0 || self.listing_failures > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} item(s): {} attempted, {} succeeded, {} failed, {} cancelled, {} skipped",
            self.items, self.attempted, self.succeeded, self.failed, self.cancelled, self.skipped
        )?;
        if self.rejected_references > 0 {
            write!(f, ", {} invalid reference(s)", self.rejected_references)?;
        }
        if self.listing_failures > 0 {
            write!(f, ", {} collection(s) not listed", self.listing_failures)?;
        }
        Ok(())
    }
}
