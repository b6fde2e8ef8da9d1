//! Tubefetch engine: collection listing, yt-dlp fetching, thumbnails and the
//! background batch worker.
mod engine;
mod fetch;
mod filename;
mod listing;
mod observer;
mod persist;
mod runner;
mod thumbnail;
mod types;
mod ytdlp;

pub use engine::{EngineError, EngineHandle, EngineSettings};
pub use fetch::{Fetcher, ProgressHandler, YtDlpFetcher};
pub use filename::{sanitize_component, thumbnail_filename, OutputPathResolver, TemplatePathResolver};
pub use listing::{
    parse_listing, CollectionLister, CollectionResolver, ListingError, ResolutionFailed,
    YtDlpLister,
};
pub use observer::{BatchObserver, ChannelObserver};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use runner::JobRunner;
pub use thumbnail::{ReqwestThumbnailFetcher, ThumbnailError, ThumbnailFetcher, ThumbnailSettings};
pub use types::{
    EngineEvent, FailureKind, FetchConfig, FetchError, FetchNotice, FetchOutput, FetchRequest,
    FetchSignal,
};
pub use ytdlp::YtDlpCommand;
