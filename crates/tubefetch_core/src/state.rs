use std::collections::VecDeque;

use thiserror::Error;

use crate::view_model::{AppViewModel, ItemRowView};
use crate::{BatchSummary, DownloadOptions, ItemOutcome, ProgressRecord};

pub type BatchId = u64;

/// Most recent log lines kept in the state and handed to the view.
pub const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Submission accepted, collections are being expanded.
    Initializing,
    Running,
    /// Cancel requested; waiting for the worker to wind down.
    Cancelling,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartRejection {
    #[error("no valid references to download")]
    NoValidReferences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemRow {
    pub(crate) item_index: usize,
    pub(crate) label: String,
    pub(crate) outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    session: SessionState,
    single_input: String,
    batch_input: String,
    options: DownloadOptions,
    last_batch_id: BatchId,
    active_batch: Option<BatchId>,
    item_count: Option<usize>,
    items: Vec<ItemRow>,
    progress: Option<ProgressRecord>,
    log: VecDeque<String>,
    /// Lines ever pushed; older ones have been dropped from `log`.
    log_total: usize,
    last_summary: Option<BatchSummary>,
    last_rejection: Option<StartRejection>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DownloadOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session,
            active_batch: self.active_batch,
            item_count: self.item_count,
            items: self
                .items
                .iter()
                .map(|row| ItemRowView {
                    item_index: row.item_index,
                    label: row.label.clone(),
                    outcome: row.outcome.clone(),
                })
                .collect(),
            progress: self.progress.clone(),
            log_start: self.log_total - self.log.len(),
            log_lines: self.log.iter().cloned().collect(),
            last_summary: self.last_summary,
            last_rejection: self.last_rejection,
            dirty: self.dirty,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    pub fn single_input(&self) -> &str {
        &self.single_input
    }

    pub fn batch_input(&self) -> &str {
        &self.batch_input
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_active_batch(&self, batch_id: BatchId) -> bool {
        self.active_batch == Some(batch_id)
    }

    pub(crate) fn active_batch(&self) -> Option<BatchId> {
        self.active_batch
    }

    pub(crate) fn set_single_input(&mut self, text: String) {
        self.single_input = text;
        self.dirty = true;
    }

    pub(crate) fn set_batch_input(&mut self, text: String) {
        self.batch_input = text;
        self.dirty = true;
    }

    pub(crate) fn set_options(&mut self, options: DownloadOptions) {
        self.options = options;
        self.dirty = true;
    }

    pub(crate) fn push_log(&mut self, line: impl Into<String>) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line.into());
        self.log_total += 1;
        self.dirty = true;
    }

    pub(crate) fn reject_start(&mut self, rejection: StartRejection) {
        self.last_rejection = Some(rejection);
        self.dirty = true;
    }

    /// Idle -> Initializing with a fresh batch id.
    pub(crate) fn begin_batch(&mut self) -> BatchId {
        self.last_batch_id += 1;
        let batch_id = self.last_batch_id;
        self.session = SessionState::Initializing;
        self.active_batch = Some(batch_id);
        self.item_count = None;
        self.items.clear();
        self.progress = None;
        self.last_rejection = None;
        self.dirty = true;
        batch_id
    }

    pub(crate) fn begin_cancel(&mut self) {
        self.session = SessionState::Cancelling;
        self.dirty = true;
    }

    pub(crate) fn apply_resolved(&mut self, item_count: usize) {
        self.item_count = Some(item_count);
        if item_count > 0 && self.session == SessionState::Initializing {
            self.session = SessionState::Running;
        }
        self.dirty = true;
    }

    pub(crate) fn apply_progress(&mut self, record: ProgressRecord) {
        self.progress = Some(record);
        self.dirty = true;
    }

    pub(crate) fn apply_item_finished(
        &mut self,
        item_index: usize,
        label: String,
        outcome: ItemOutcome,
    ) {
        self.items.push(ItemRow {
            item_index,
            label,
            outcome,
        });
        self.progress = None;
        self.dirty = true;
    }

    /// Any active state -> Idle.
    pub(crate) fn finish_batch(&mut self, summary: BatchSummary) {
        self.session = SessionState::Idle;
        self.active_batch = None;
        self.progress = None;
        self.last_summary = Some(summary);
        self.dirty = true;
    }
}
