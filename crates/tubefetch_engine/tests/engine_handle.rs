use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tubefetch_core::{
    validate, BatchSummary, CollectionListing, DownloadOptions, RawProgress, Reference,
};
use tubefetch_engine::{
    CollectionLister, EngineEvent, EngineHandle, FailureKind, FetchError, FetchOutput,
    FetchRequest, FetchSignal, Fetcher, JobRunner, ListingError, ProgressHandler,
    TemplatePathResolver, ThumbnailError, ThumbnailFetcher,
};

/// Reports progress until told to stop, or finishes quickly when `endless` is off.
struct SteadyFetcher {
    endless: bool,
}

#[async_trait::async_trait]
impl Fetcher for SteadyFetcher {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        progress: &dyn ProgressHandler,
    ) -> Result<FetchOutput, FetchError> {
        let mut downloaded = 0;
        loop {
            downloaded += 1;
            let event = RawProgress {
                downloaded,
                total: None,
                speed: None,
            };
            if progress.on_progress(event) == FetchSignal::Cancel {
                return Err(FetchError::new(FailureKind::Cancelled, "stopped"));
            }
            if !self.endless {
                return Ok(FetchOutput::default());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

struct NoLister;

#[async_trait::async_trait]
impl CollectionLister for NoLister {
    async fn list_items(&self, _reference: &Reference) -> Result<CollectionListing, ListingError> {
        Err(ListingError::Other("not available".to_string()))
    }
}

struct NoThumbnails;

#[async_trait::async_trait]
impl ThumbnailFetcher for NoThumbnails {
    async fn fetch_thumbnail(
        &self,
        video_id: &str,
        _title: Option<&str>,
        _dest_dir: &Path,
    ) -> Result<PathBuf, ThumbnailError> {
        Err(ThumbnailError::NotFound(video_id.to_string()))
    }
}

fn engine(endless: bool) -> EngineHandle {
    let runner = JobRunner::new(
        Arc::new(SteadyFetcher { endless }),
        Arc::new(NoLister),
        Arc::new(NoThumbnails),
        Arc::new(TemplatePathResolver),
    );
    EngineHandle::with_runner(runner).expect("engine starts")
}

fn references(raw: &[&str]) -> Vec<Reference> {
    raw.iter().map(|r| validate(r).unwrap()).collect()
}

fn wait_for_summary(engine: &EngineHandle, batch_id: u64) -> (Vec<EngineEvent>, BatchSummary) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(100)) {
            if let EngineEvent::BatchTerminal { batch_id: id, summary } = &event {
                if *id == batch_id {
                    let summary = *summary;
                    seen.push(event);
                    return (seen, summary);
                }
            }
            seen.push(event);
        }
    }
    panic!("batch {batch_id} did not finish; saw {seen:?}");
}

#[test]
fn batch_events_arrive_tagged_and_in_order() {
    let temp = TempDir::new().unwrap();
    let engine = engine(false);
    let options = DownloadOptions {
        output_root: temp.path().to_path_buf(),
        ..DownloadOptions::default()
    };

    engine
        .start_batch(1, references(&["https://youtu.be/a", "https://youtu.be/b"]), 2, options)
        .unwrap();
    let (events, summary) = wait_for_summary(&engine, 1);

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.rejected_references, 2);
    assert!(matches!(
        events.iter().find(|e| !matches!(e, EngineEvent::Log { .. })),
        Some(EngineEvent::BatchResolved {
            batch_id: 1,
            item_count: 2
        })
    ));
    let item_order: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::ItemTerminal { item_index, .. } => Some(*item_index),
            _ => None,
        })
        .collect();
    assert_eq!(item_order, vec![1, 2]);
}

#[test]
fn cancel_stops_a_running_batch() {
    let temp = TempDir::new().unwrap();
    let engine = engine(true);
    let options = DownloadOptions {
        output_root: temp.path().to_path_buf(),
        ..DownloadOptions::default()
    };

    engine
        .start_batch(7, references(&["https://youtu.be/a", "https://youtu.be/b"]), 0, options)
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        assert!(Instant::now() < deadline, "no progress before deadline");
        if let Some(EngineEvent::Progress { batch_id: 7, .. }) =
            engine.recv_timeout(Duration::from_millis(100))
        {
            break;
        }
    }
    engine.cancel(7);
    let (_, summary) = wait_for_summary(&engine, 7);

    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempted, 1);
}

#[test]
fn cancelling_an_unknown_batch_is_ignored() {
    let engine = engine(false);
    engine.cancel(42);
    assert!(engine.try_recv().is_none());
}
