use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, Once};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tubefetch_core::{
    validate, BatchSummary, CancellationToken, CollectionListing, DownloadOptions, ItemOutcome,
    ListingEntry, Percent, Quality, RawProgress, Reference,
};
use tubefetch_engine::{
    ChannelObserver, CollectionLister, EngineEvent, FailureKind, FetchError, FetchNotice,
    FetchOutput, FetchRequest, FetchSignal, Fetcher, JobRunner, ListingError, ProgressHandler,
    TemplatePathResolver, ThumbnailError, ThumbnailFetcher,
};

#[derive(Clone)]
enum Behavior {
    Succeed,
    Fail(&'static str),
    /// Cancels the token halfway through the transfer.
    CancelMidway(CancellationToken),
    /// Cancels the token, then exits by signal without another progress event.
    KilledAfterCancel(CancellationToken),
}

#[derive(Default)]
struct FakeFetcher {
    behaviors: HashMap<String, Behavior>,
    fallback_for: Option<u32>,
    started: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with(mut self, video_id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(video_id.to_string(), behavior);
        self
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

fn video_id(url: &str) -> String {
    url.rsplit('=').next().unwrap_or(url).to_string()
}

fn raw(downloaded: u64) -> RawProgress {
    RawProgress {
        downloaded,
        total: Some(100),
        speed: Some(10.0),
    }
}

fn cancelled() -> FetchError {
    FetchError::new(FailureKind::Cancelled, "cancelled by user")
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressHandler,
    ) -> Result<FetchOutput, FetchError> {
        let id = video_id(&request.url);
        self.started.lock().unwrap().push(id.clone());
        if let Some(requested) = self.fallback_for {
            progress.on_notice(FetchNotice::QualityFallback { requested });
        }
        progress.on_notice(FetchNotice::Metadata {
            title: Some(format!("Title {id}")),
            duration_secs: Some(42),
        });

        let behavior = self.behaviors.get(&id).cloned().unwrap_or(Behavior::Succeed);
        if progress.on_progress(raw(25)) == FetchSignal::Cancel {
            return Err(cancelled());
        }
        match behavior {
            Behavior::Succeed => {
                if progress.on_progress(raw(50)) == FetchSignal::Cancel {
                    return Err(cancelled());
                }
                Ok(FetchOutput {
                    path: Some(PathBuf::from(format!("/out/{id}.mp4"))),
                    title: Some(format!("Title {id}")),
                })
            }
            Behavior::Fail(message) => Err(FetchError::new(FailureKind::ExitStatus(Some(1)), message)),
            Behavior::CancelMidway(token) => {
                token.cancel();
                match progress.on_progress(raw(60)) {
                    FetchSignal::Cancel => Err(cancelled()),
                    FetchSignal::Continue => Ok(FetchOutput::default()),
                }
            }
            Behavior::KilledAfterCancel(token) => {
                token.cancel();
                Err(FetchError::new(FailureKind::ExitStatus(None), "no error output"))
            }
        }
    }
}

#[derive(Default)]
struct FakeLister {
    listings: HashMap<String, CollectionListing>,
}

impl FakeLister {
    fn with(mut self, list_id: &str, ids: &[&str]) -> Self {
        let entries = ids
            .iter()
            .enumerate()
            .map(|(offset, id)| ListingEntry {
                native_id: id.to_string(),
                position: Some(offset as u32 + 1),
                title: None,
            })
            .collect();
        self.listings.insert(
            list_id.to_string(),
            CollectionListing {
                title: Some(format!("List {list_id}")),
                entries,
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl CollectionLister for FakeLister {
    async fn list_items(&self, reference: &Reference) -> Result<CollectionListing, ListingError> {
        let list_id = &reference.collection().unwrap().list_id;
        self.listings
            .get(list_id)
            .cloned()
            .ok_or_else(|| ListingError::Other(format!("playlist {list_id} does not exist")))
    }
}

#[derive(Default)]
struct FakeThumbnails {
    fail: bool,
    requested: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ThumbnailFetcher for FakeThumbnails {
    async fn fetch_thumbnail(
        &self,
        video_id: &str,
        _title: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, ThumbnailError> {
        self.requested.lock().unwrap().push(video_id.to_string());
        if self.fail {
            Err(ThumbnailError::NotFound(video_id.to_string()))
        } else {
            Ok(dest_dir.join(format!("{video_id}.jpg")))
        }
    }
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

struct Harness {
    fetcher: Arc<FakeFetcher>,
    thumbnails: Arc<FakeThumbnails>,
    runner: JobRunner,
    output: TempDir,
}

impl Harness {
    fn new(fetcher: FakeFetcher, lister: FakeLister, thumbnails: FakeThumbnails) -> Self {
        init_logging();
        let fetcher = Arc::new(fetcher);
        let thumbnails = Arc::new(thumbnails);
        let runner = JobRunner::new(
            fetcher.clone(),
            Arc::new(lister),
            thumbnails.clone(),
            Arc::new(TemplatePathResolver),
        );
        Self {
            fetcher,
            thumbnails,
            runner,
            output: TempDir::new().unwrap(),
        }
    }

    fn options(&self) -> DownloadOptions {
        DownloadOptions {
            output_root: self.output.path().to_path_buf(),
            ..DownloadOptions::default()
        }
    }

    async fn run(
        &self,
        raw_refs: &[&str],
        options: &DownloadOptions,
        token: &CancellationToken,
    ) -> (BatchSummary, Vec<EngineEvent>) {
        let references: Vec<Reference> = raw_refs.iter().map(|raw| validate(raw).unwrap()).collect();
        let (tx, rx) = mpsc::channel();
        let observer = ChannelObserver::new(9, tx);
        let summary = self.runner.run(&references, 0, options, token, &observer).await;
        drop(observer);
        (summary, rx.iter().collect())
    }
}

fn terminals(events: &[EngineEvent]) -> Vec<(usize, ItemOutcome)> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::ItemTerminal {
                item_index, outcome, ..
            } => Some((*item_index, outcome.clone())),
            _ => None,
        })
        .collect()
}

fn logs(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Log { line, .. } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn singles_and_playlist_run_in_submission_order() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default().with("XYZ", &["1", "2", "3"]),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (summary, events) = harness
        .run(
            &["https://youtu.be/ABC", "https://www.youtube.com/playlist?list=XYZ"],
            &options,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(harness.fetcher.started(), vec!["ABC", "1", "2", "3"]);
    assert_eq!(summary.items, 4);
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.succeeded, 4);
    assert!(!summary.has_errors());
    assert!(events.contains(&EngineEvent::BatchResolved {
        batch_id: 9,
        item_count: 4
    }));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::BatchTerminal {
            batch_id: 9,
            summary
        })
    );
    assert!(harness.output.path().join("List XYZ").is_dir());
}

#[tokio::test]
async fn cancel_during_third_item_stops_the_batch() {
    let token = CancellationToken::new();
    let ids = ["v1", "v2", "v3", "v4", "v5", "v6", "v7", "v8", "v9", "v10"];
    let harness = Harness::new(
        FakeFetcher::default().with("v3", Behavior::CancelMidway(token.clone())),
        FakeLister::default().with("TEN", &ids),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (summary, events) = harness
        .run(&["https://www.youtube.com/playlist?list=TEN"], &options, &token)
        .await;

    assert_eq!(harness.fetcher.started(), vec!["v1", "v2", "v3"]);
    let outcomes = terminals(&events);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.iter().filter(|(index, _)| *index == 3).count(),
        1,
        "third item reported exactly once"
    );
    assert_eq!(outcomes[2].1, ItemOutcome::Cancelled);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.skipped, 7);
    assert_eq!(outcomes.len() + summary.skipped, summary.items);
    assert!(!summary.has_errors());
}

#[tokio::test]
async fn downloader_exit_after_cancel_is_not_a_failure() {
    let token = CancellationToken::new();
    let harness = Harness::new(
        FakeFetcher::default().with("v2", Behavior::KilledAfterCancel(token.clone())),
        FakeLister::default().with("TRIO", &["v1", "v2", "v3"]),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (summary, events) = harness
        .run(&["https://www.youtube.com/playlist?list=TRIO"], &options, &token)
        .await;

    assert_eq!(harness.fetcher.started(), vec!["v1", "v2"]);
    assert_eq!(terminals(&events)[1], (2, ItemOutcome::Cancelled));
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.has_errors());
    assert!(!logs(&events).iter().any(|line| line.starts_with("Error:")));
}

#[tokio::test]
async fn failed_item_does_not_stop_the_batch() {
    let harness = Harness::new(
        FakeFetcher::default().with("bad", Behavior::Fail("ERROR: Video unavailable")),
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (summary, events) = harness
        .run(
            &["https://youtu.be/ok1", "https://youtu.be/bad", "https://youtu.be/ok2"],
            &options,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(harness.fetcher.started(), vec!["ok1", "bad", "ok2"]);
    assert_eq!((summary.succeeded, summary.failed), (2, 1));
    match &terminals(&events)[1].1 {
        ItemOutcome::Failed { cause } => assert!(cause.contains("Video unavailable")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(logs(&events)
        .iter()
        .any(|line| line.starts_with("Error:") && line.contains("Video unavailable")));
}

#[tokio::test]
async fn thumbnail_failure_keeps_item_successful() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default(),
        FakeThumbnails {
            fail: true,
            ..FakeThumbnails::default()
        },
    );
    let options = DownloadOptions {
        download_thumbnail: true,
        ..harness.options()
    };

    let (summary, events) = harness
        .run(&["https://youtu.be/abc"], &options, &CancellationToken::new())
        .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(*harness.thumbnails.requested.lock().unwrap(), vec!["abc"]);
    assert!(logs(&events).iter().any(|line| line.starts_with("Thumbnail skipped")));
}

#[tokio::test]
async fn thumbnails_are_not_requested_unless_enabled() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    harness
        .run(&["https://youtu.be/abc"], &options, &CancellationToken::new())
        .await;

    assert!(harness.thumbnails.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn listing_failure_only_drops_that_reference() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (summary, events) = harness
        .run(
            &["https://www.youtube.com/playlist?list=MISSING", "https://youtu.be/abc"],
            &options,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(harness.fetcher.started(), vec!["abc"]);
    assert_eq!(summary.items, 1);
    assert_eq!(summary.listing_failures, 1);
    assert!(summary.has_errors());
    assert!(logs(&events).iter().any(|line| line.contains("MISSING")));
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = harness.options();
    let token = CancellationToken::new();
    token.cancel();

    let (summary, events) = harness
        .run(&["https://youtu.be/abc"], &options, &token)
        .await;

    assert!(harness.fetcher.started().is_empty());
    assert_eq!(summary, BatchSummary::default());
    assert!(terminals(&events).is_empty());
}

#[tokio::test]
async fn progress_is_monotone_and_ends_at_100_percent() {
    let harness = Harness::new(
        FakeFetcher::default(),
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = harness.options();

    let (_, events) = harness
        .run(&["https://youtu.be/abc"], &options, &CancellationToken::new())
        .await;

    let records: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress { record, .. } => Some(record.clone()),
            _ => None,
        })
        .collect();
    assert!(records.windows(2).all(|pair| pair[0].downloaded <= pair[1].downloaded));
    let last = records.last().expect("progress records");
    assert_eq!(last.percent, Percent::Known(100.0));
    assert_eq!(last.label, "Title abc");
    assert_eq!(records[0].percent, Percent::Known(25.0));
    assert_eq!(records[0].eta_secs, Some(7));
}

#[tokio::test]
async fn user_log_mirrors_item_lifecycle() {
    let harness = Harness::new(
        FakeFetcher {
            fallback_for: Some(1080),
            ..FakeFetcher::default()
        },
        FakeLister::default(),
        FakeThumbnails::default(),
    );
    let options = DownloadOptions {
        quality: Quality::ExactResolution(1080),
        ..harness.options()
    };

    let (_, events) = harness
        .run(&["https://youtu.be/abc"], &options, &CancellationToken::new())
        .await;

    assert_eq!(
        logs(&events),
        vec![
            "[1/1] Fetching video metadata: https://www.youtube.com/watch?v=abc".to_string(),
            "Selected 1080p resolution".to_string(),
            "Resolution 1080p not available, selecting best match".to_string(),
            "Title: Title abc".to_string(),
            "Duration: 42 seconds".to_string(),
            "Download completed: /out/abc.mp4".to_string(),
        ]
    );
}
