use std::fmt;
use std::path::PathBuf;

use tubefetch_core::{BatchId, BatchSummary, DownloadOptions, ItemOutcome, ProgressRecord, Quality};

/// Events sent from the worker to the observer context.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Log {
        batch_id: BatchId,
        line: String,
    },
    BatchResolved {
        batch_id: BatchId,
        item_count: usize,
    },
    Progress {
        batch_id: BatchId,
        record: ProgressRecord,
    },
    ItemTerminal {
        batch_id: BatchId,
        item_index: usize,
        label: String,
        outcome: ItemOutcome,
    },
    BatchTerminal {
        batch_id: BatchId,
        summary: BatchSummary,
    },
}

/// Per-item configuration handed to the fetch capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub quality: Quality,
    pub write_subtitles: bool,
    pub subtitle_language: Option<String>,
}

impl FetchConfig {
    pub fn from_options(options: &DownloadOptions) -> Self {
        let language = options.subtitle_language.trim();
        Self {
            quality: options.quality,
            write_subtitles: options.download_subtitles,
            subtitle_language: if options.download_subtitles && !language.is_empty() {
                Some(language.to_string())
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Output path template understood by the fetch capability.
    pub output_template: PathBuf,
    pub config: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOutput {
    /// Final file on disk, when the fetch capability reported it.
    pub path: Option<PathBuf>,
    pub title: Option<String>,
}

/// Returned by a progress handler to steer the running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSignal {
    Continue,
    Cancel,
}

/// Out-of-band information reported by the fetch capability during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchNotice {
    Metadata {
        title: Option<String>,
        duration_secs: Option<u64>,
    },
    /// The requested resolution was not offered; the best format is used instead.
    QualityFallback { requested: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The fetch program could not be started.
    Spawn,
    ExitStatus(Option<i32>),
    /// Unusable output from the fetch program (e.g. malformed probe JSON).
    InvalidOutput,
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Spawn => write!(f, "could not start downloader"),
            FailureKind::ExitStatus(Some(code)) => write!(f, "downloader exited with status {code}"),
            FailureKind::ExitStatus(None) => write!(f, "downloader terminated by signal"),
            FailureKind::InvalidOutput => write!(f, "invalid downloader output"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
