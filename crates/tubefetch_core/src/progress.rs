use crate::CancellationToken;

/// Raw progress event as reported by the fetch capability.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    /// Bytes per second.
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    Known(f64),
    Indeterminate,
}

impl Percent {
    pub fn from_bytes(downloaded: u64, total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => {
                let ratio = downloaded.min(total) as f64 / total as f64;
                Percent::Known(ratio * 100.0)
            }
            _ => Percent::Indeterminate,
        }
    }

    pub fn whole(&self) -> Option<u32> {
        match self {
            Percent::Known(value) => Some(value.floor() as u32),
            Percent::Indeterminate => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.whole() == Some(100)
    }
}

/// Normalized progress for one item of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    /// 1-based index of the item within the batch.
    pub item_index: usize,
    pub item_count: usize,
    pub label: String,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub percent: Percent,
    pub speed: Option<f64>,
    /// Whole seconds remaining.
    pub eta_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressStep {
    Emit(ProgressRecord),
    /// Nothing new worth reporting (same whole percentage or a byte regression).
    Suppressed,
    /// The batch was cancelled; the transfer should be aborted.
    Cancel,
}

/// Turns raw fetch events for one item into [`ProgressRecord`]s.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    item_index: usize,
    item_count: usize,
    label: String,
    token: CancellationToken,
    last_downloaded: Option<u64>,
    last_total: Option<u64>,
    last_whole: Option<u32>,
    terminal_emitted: bool,
}

impl ProgressAggregator {
    pub fn new(
        item_index: usize,
        item_count: usize,
        label: impl Into<String>,
        token: CancellationToken,
    ) -> Self {
        Self {
            item_index,
            item_count,
            label: label.into(),
            token,
            last_downloaded: None,
            last_total: None,
            last_whole: None,
            terminal_emitted: false,
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn on_event(&mut self, event: &RawProgress) -> ProgressStep {
        if self.token.is_cancelled() {
            return ProgressStep::Cancel;
        }
        if self
            .last_downloaded
            .is_some_and(|last| event.downloaded < last)
        {
            return ProgressStep::Suppressed;
        }

        let record = self.record(event.downloaded, event.total, event.speed);
        let whole = record.percent.whole();
        let unchanged = whole.is_some()
            && whole == self.last_whole
            && !(record.percent.is_complete() && !self.terminal_emitted);

        self.last_downloaded = Some(event.downloaded);
        if event.total.is_some() {
            self.last_total = event.total;
        }
        if unchanged {
            return ProgressStep::Suppressed;
        }
        self.last_whole = whole;
        if record.percent.is_complete() {
            self.terminal_emitted = true;
        }
        ProgressStep::Emit(record)
    }

    /// Terminal 100% record for a completed item, unless one was already emitted.
    pub fn finish(&mut self) -> Option<ProgressRecord> {
        if self.terminal_emitted {
            return None;
        }
        self.terminal_emitted = true;
        let downloaded = match (self.last_total, self.last_downloaded) {
            (Some(total), _) if total > 0 => total,
            (_, Some(downloaded)) => downloaded,
            _ => 0,
        };
        let mut record = self.record(downloaded, Some(downloaded), None);
        record.percent = Percent::Known(100.0);
        Some(record)
    }

    fn record(&self, downloaded: u64, total: Option<u64>, speed: Option<f64>) -> ProgressRecord {
        let speed = speed.filter(|speed| speed.is_finite() && *speed > 0.0);
        let eta_secs = match (speed, total) {
            (Some(speed), Some(total)) => {
                Some((total.saturating_sub(downloaded) as f64 / speed).floor() as u64)
            }
            _ => None,
        };
        ProgressRecord {
            item_index: self.item_index,
            item_count: self.item_count,
            label: self.label.clone(),
            downloaded,
            total,
            percent: Percent::from_bytes(downloaded, total),
            speed,
            eta_secs,
        }
    }
}
