use crate::{BatchId, DownloadOptions, Reference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand a validated submission to the background worker.
    StartBatch {
        batch_id: BatchId,
        references: Vec<Reference>,
        /// Entries that failed validation, carried into the batch summary.
        rejected: usize,
        options: DownloadOptions,
    },
    /// Set the cancellation token of the active batch.
    CancelBatch { batch_id: BatchId },
}
