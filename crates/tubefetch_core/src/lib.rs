//! Tubefetch core: reference validation, collection selection, progress
//! aggregation and the pure session state machine.
mod batch;
mod cancel;
mod collection;
mod effect;
mod msg;
mod options;
mod progress;
mod reference;
mod state;
mod update;
mod view_model;

pub use batch::{BatchSummary, ItemOutcome, JobBatch};
pub use cancel::CancellationToken;
pub use collection::{
    select_items, CollectionInfo, CollectionListing, ListingEntry, ResolvedItem,
    UNBOUNDED_COLLECTION_CAP,
};
pub use effect::Effect;
pub use msg::Msg;
pub use options::{
    DownloadOptions, FormatChoice, ParseQualityError, Quality, QualityPlan, QUALITY_PRESETS,
};
pub use progress::{Percent, ProgressAggregator, ProgressRecord, ProgressStep, RawProgress};
pub use reference::{validate, watch_url, CollectionRef, InvalidReference, Reference, ReferenceKind};
pub use state::{AppState, BatchId, SessionState, StartRejection, LOG_CAPACITY};
pub use update::{collect_submission, update};
pub use view_model::{AppViewModel, ItemRowView};
