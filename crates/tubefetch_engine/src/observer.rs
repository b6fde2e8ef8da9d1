use std::sync::mpsc;

use tubefetch_core::{BatchId, BatchSummary, ItemOutcome, ProgressRecord};

use crate::EngineEvent;

/// Receives everything a running batch reports.
pub trait BatchObserver: Send + Sync {
    fn on_log(&self, line: String);

    fn on_batch_resolved(&self, item_count: usize);

    fn on_progress(&self, record: ProgressRecord);

    /// Called exactly once per started item; `item_index` is 1-based.
    fn on_item_terminal(&self, item_index: usize, label: &str, outcome: &ItemOutcome);

    fn on_batch_terminal(&self, summary: &BatchSummary);
}

/// Forwards observer calls as [`EngineEvent`]s tagged with the batch id.
pub struct ChannelObserver {
    batch_id: BatchId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelObserver {
    pub fn new(batch_id: BatchId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { batch_id, tx }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl BatchObserver for ChannelObserver {
    fn on_log(&self, line: String) {
        self.emit(EngineEvent::Log {
            batch_id: self.batch_id,
            line,
        });
    }

    fn on_batch_resolved(&self, item_count: usize) {
        self.emit(EngineEvent::BatchResolved {
            batch_id: self.batch_id,
            item_count,
        });
    }

    fn on_progress(&self, record: ProgressRecord) {
        self.emit(EngineEvent::Progress {
            batch_id: self.batch_id,
            record,
        });
    }

    fn on_item_terminal(&self, item_index: usize, label: &str, outcome: &ItemOutcome) {
        self.emit(EngineEvent::ItemTerminal {
            batch_id: self.batch_id,
            item_index,
            label: label.to_string(),
            outcome: outcome.clone(),
        });
    }

    fn on_batch_terminal(&self, summary: &BatchSummary) {
        self.emit(EngineEvent::BatchTerminal {
            batch_id: self.batch_id,
            summary: *summary,
        });
    }
}
