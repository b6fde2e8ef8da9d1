use crate::{BatchId, BatchSummary, DownloadOptions, ItemOutcome, ProgressRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the single reference entry.
    SingleInputChanged(String),
    /// User edited the batch text (one reference per line).
    BatchInputChanged(String),
    /// User changed quality, output folder or asset options.
    OptionsChanged(DownloadOptions),
    /// User pressed start. While a batch is active this requests cancellation.
    StartClicked,
    /// Engine finished expanding the submission into items.
    BatchResolved { batch_id: BatchId, item_count: usize },
    /// Engine log line meant for the user.
    Log { batch_id: BatchId, line: String },
    /// Engine progress for the item currently downloading.
    ItemProgress {
        batch_id: BatchId,
        record: ProgressRecord,
    },
    /// Engine terminal status for one item.
    ItemFinished {
        batch_id: BatchId,
        item_index: usize,
        label: String,
        outcome: ItemOutcome,
    },
    /// Engine terminal status for the whole batch.
    BatchFinished {
        batch_id: BatchId,
        summary: BatchSummary,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
}
