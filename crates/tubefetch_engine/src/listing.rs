use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};
use serde::Deserialize;
use thiserror::Error;
use tubefetch_core::{select_items, CollectionListing, ListingEntry, Reference, ResolvedItem};

use crate::ytdlp::{error_summary, YtDlpCommand};

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("could not start lister: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("lister exited with status {code:?}: {message}")]
    ExitStatus { code: Option<i32>, message: String },
    #[error("invalid listing output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ResolutionFailed {
    #[error("could not list {reference}: {source}")]
    Listing {
        reference: String,
        #[source]
        source: ListingError,
    },
    #[error("collection {0} has no items")]
    Empty(String),
}

/// The collection-listing capability.
#[async_trait::async_trait]
pub trait CollectionLister: Send + Sync {
    async fn list_items(&self, reference: &Reference) -> Result<CollectionListing, ListingError>;
}

/// Lister backed by `yt-dlp --flat-playlist`.
#[derive(Debug, Clone, Default)]
pub struct YtDlpLister {
    command: YtDlpCommand,
}

impl YtDlpLister {
    pub fn new(command: YtDlpCommand) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl CollectionLister for YtDlpLister {
    async fn list_items(&self, reference: &Reference) -> Result<CollectionListing, ListingError> {
        engine_debug!("Listing collection {}", reference.url());
        let output = self
            .command
            .command()
            .args([
                "--flat-playlist",
                "--dump-single-json",
                "--yes-playlist",
                "--no-warnings",
                "--",
                reference.url(),
            ])
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ListingError::ExitStatus {
                code: output.status.code(),
                message: error_summary(&stderr),
            });
        }
        parse_listing(&output.stdout)
    }
}

#[derive(Deserialize)]
struct FlatPlaylist {
    title: Option<String>,
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
    playlist_index: Option<u32>,
}

/// Parse `--dump-single-json` output of a flat playlist.
///
/// Unavailable entries (null or without an id) are dropped; they never get a
/// position, so the remaining entries keep their reported ones.
pub fn parse_listing(json: &[u8]) -> Result<CollectionListing, ListingError> {
    let playlist: FlatPlaylist = serde_json::from_slice(json)?;
    let entries = playlist
        .entries
        .into_iter()
        .enumerate()
        .filter_map(|(offset, entry)| {
            let entry = entry?;
            let native_id = entry.id.filter(|id| !id.is_empty())?;
            Some(ListingEntry {
                native_id,
                position: entry
                    .playlist_index
                    .or_else(|| u32::try_from(offset + 1).ok()),
                title: entry.title,
            })
        })
        .collect();
    Ok(CollectionListing {
        title: playlist.title,
        entries,
    })
}

/// Expands collection references into positioned items.
#[derive(Clone)]
pub struct CollectionResolver {
    lister: Arc<dyn CollectionLister>,
}

impl CollectionResolver {
    pub fn new(lister: Arc<dyn CollectionLister>) -> Self {
        Self { lister }
    }

    /// An empty result (start index past the end) is not an error; an empty
    /// or failed listing is.
    pub async fn resolve(&self, reference: &Reference) -> Result<Vec<ResolvedItem>, ResolutionFailed> {
        let listing = self
            .lister
            .list_items(reference)
            .await
            .map_err(|source| ResolutionFailed::Listing {
                reference: reference.raw().to_string(),
                source,
            })?;
        if listing.entries.is_empty() {
            return Err(ResolutionFailed::Empty(reference.raw().to_string()));
        }
        let items = select_items(reference, &listing);
        engine_info!(
            "Resolved {} to {} of {} listed item(s)",
            reference.raw(),
            items.len(),
            listing.entries.len()
        );
        Ok(items)
    }
}
