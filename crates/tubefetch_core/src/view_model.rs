use crate::{BatchId, BatchSummary, ItemOutcome, ProgressRecord, SessionState, StartRejection};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub active_batch: Option<BatchId>,
    /// Known once the active batch has been resolved.
    pub item_count: Option<usize>,
    pub items: Vec<ItemRowView>,
    pub progress: Option<ProgressRecord>,
    /// Sequence number of the first entry in `log_lines`.
    pub log_start: usize,
    /// The most recent log lines, oldest first.
    pub log_lines: Vec<String>,
    pub last_summary: Option<BatchSummary>,
    pub last_rejection: Option<StartRejection>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRowView {
    pub item_index: usize,
    pub label: String,
    pub outcome: ItemOutcome,
}
