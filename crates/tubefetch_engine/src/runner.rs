use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_info, engine_warn};
use tubefetch_core::{
    BatchSummary, CancellationToken, DownloadOptions, ItemOutcome, JobBatch, ProgressAggregator,
    ProgressRecord, ProgressStep, Quality, RawProgress, Reference, ResolvedItem,
};

use crate::fetch::{Fetcher, ProgressHandler, YtDlpFetcher};
use crate::filename::{OutputPathResolver, TemplatePathResolver};
use crate::listing::{CollectionLister, CollectionResolver, YtDlpLister};
use crate::observer::BatchObserver;
use crate::persist::ensure_output_dir;
use crate::thumbnail::{ReqwestThumbnailFetcher, ThumbnailFetcher};
use crate::{EngineSettings, FetchConfig, FetchNotice, FetchRequest, FetchSignal};

/// Executes one batch: resolves references, then fetches items strictly in order.
#[derive(Clone)]
pub struct JobRunner {
    fetcher: Arc<dyn Fetcher>,
    resolver: CollectionResolver,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    paths: Arc<dyn OutputPathResolver>,
}

impl JobRunner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn CollectionLister>,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        paths: Arc<dyn OutputPathResolver>,
    ) -> Self {
        Self {
            fetcher,
            resolver: CollectionResolver::new(lister),
            thumbnails,
            paths,
        }
    }

    /// Runner wired to yt-dlp, the thumbnail host and the default layout.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            Arc::new(YtDlpFetcher::new(settings.ytdlp.clone())),
            Arc::new(YtDlpLister::new(settings.ytdlp.clone())),
            Arc::new(ReqwestThumbnailFetcher::new(settings.thumbnails.clone())),
            Arc::new(TemplatePathResolver),
        )
    }

    /// Run one batch to its terminal summary, which is also sent to the observer.
    ///
    /// `rejected` is the number of submission entries that failed validation.
    pub async fn run(
        &self,
        references: &[Reference],
        rejected: usize,
        options: &DownloadOptions,
        token: &CancellationToken,
        observer: &dyn BatchObserver,
    ) -> BatchSummary {
        let mut summary = BatchSummary {
            rejected_references: rejected,
            ..BatchSummary::default()
        };

        let batch = self
            .resolve_all(references, token, observer, &mut summary)
            .await;
        summary.items = batch.len();
        observer.on_batch_resolved(batch.len());
        engine_info!("Batch resolved to {} item(s)", batch.len());

        let count = batch.len();
        for (offset, item) in batch.items().iter().enumerate() {
            if token.is_cancelled() {
                summary.skipped = count - offset;
                observer.on_log(format!(
                    "Download cancelled, {} item(s) not started",
                    summary.skipped
                ));
                break;
            }
            let index = offset + 1;
            let (label, outcome) = self
                .run_item(index, count, item, options, token, observer)
                .await;
            summary.record(&outcome);
            observer.on_item_terminal(index, &label, &outcome);
        }

        engine_info!("Batch summary: {}", summary);
        observer.on_batch_terminal(&summary);
        summary
    }

    async fn resolve_all(
        &self,
        references: &[Reference],
        token: &CancellationToken,
        observer: &dyn BatchObserver,
        summary: &mut BatchSummary,
    ) -> JobBatch {
        let mut items = Vec::new();
        for reference in references {
            if token.is_cancelled() {
                engine_debug!("Resolution stopped by cancellation");
                break;
            }
            if let Some(item) = ResolvedItem::standalone(reference) {
                items.push(item);
                continue;
            }
            observer.on_log(format!("Listing collection: {}", reference.raw()));
            match self.resolver.resolve(reference).await {
                Ok(resolved) => {
                    observer.on_log(format!(
                        "Found {} item(s) in {}",
                        resolved.len(),
                        reference.raw()
                    ));
                    items.extend(resolved);
                }
                Err(err) => {
                    engine_warn!("Resolution failed: {}", err);
                    summary.listing_failures += 1;
                    observer.on_log(format!("Error: {err}"));
                }
            }
        }
        JobBatch::new(items)
    }

    /// `index` is 1-based.
    async fn run_item(
        &self,
        index: usize,
        count: usize,
        item: &ResolvedItem,
        options: &DownloadOptions,
        token: &CancellationToken,
        observer: &dyn BatchObserver,
    ) -> (String, ItemOutcome) {
        observer.on_log(format!(
            "[{}/{}] Fetching video metadata: {}",
            index, count, item.url
        ));
        observer.on_log(quality_line(options.quality));

        let dir = self.paths.item_dir(&options.output_root, item);
        if let Err(err) = ensure_output_dir(&dir) {
            observer.on_log(format!("Error: {err}"));
            return (
                item.label(),
                ItemOutcome::Failed {
                    cause: err.to_string(),
                },
            );
        }

        let request = FetchRequest {
            url: item.url.clone(),
            output_template: self.paths.template(&options.output_root, item),
            config: FetchConfig::from_options(options),
        };
        let handler = ItemProgress::new(index, count, item, token.clone(), observer);
        let result = self.fetcher.fetch(&request, &handler).await;
        let label = handler.label();

        let outcome = match result {
            Ok(output) => {
                if let Some(record) = handler.finish() {
                    observer.on_progress(record);
                }
                let shown = output
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| label.clone());
                observer.on_log(format!("Download completed: {shown}"));
                if options.download_thumbnail {
                    let title = output.title.as_deref().or(item.title.as_deref());
                    self.save_thumbnail(item, title, &dir, observer).await;
                }
                ItemOutcome::Succeeded { path: output.path }
            }
            // A child that died after the token was set is reported as cancelled.
            Err(err) if err.is_cancelled() || token.is_cancelled() => {
                engine_debug!("Item {} stopped after cancellation: {}", index, err);
                observer.on_log(format!("Download cancelled: {label}"));
                ItemOutcome::Cancelled
            }
            Err(err) => {
                engine_warn!("Item {} ({}) failed: {}", index, item.url, err);
                observer.on_log(format!("Error: {err}"));
                ItemOutcome::Failed {
                    cause: err.to_string(),
                }
            }
        };
        (label, outcome)
    }

    async fn save_thumbnail(
        &self,
        item: &ResolvedItem,
        title: Option<&str>,
        dir: &Path,
        observer: &dyn BatchObserver,
    ) {
        match self
            .thumbnails
            .fetch_thumbnail(&item.video_id, title, dir)
            .await
        {
            Ok(path) => observer.on_log(format!("Thumbnail saved: {}", path.display())),
            Err(err) => {
                engine_warn!("Thumbnail for {} failed: {}", item.video_id, err);
                observer.on_log(format!("Thumbnail skipped: {err}"));
            }
        }
    }
}

fn quality_line(quality: Quality) -> String {
    match quality {
        Quality::HighestAvailable => "Selected highest resolution".to_string(),
        Quality::ExactResolution(height) => format!("Selected {height}p resolution"),
        Quality::AudioOnly => "Selected audio only (MP3)".to_string(),
    }
}

/// Progress handler for one item: aggregates raw events and relays notices.
struct ItemProgress<'a> {
    item: &'a ResolvedItem,
    aggregator: Mutex<ProgressAggregator>,
    observer: &'a dyn BatchObserver,
}

impl<'a> ItemProgress<'a> {
    fn new(
        index: usize,
        count: usize,
        item: &'a ResolvedItem,
        token: CancellationToken,
        observer: &'a dyn BatchObserver,
    ) -> Self {
        Self {
            item,
            aggregator: Mutex::new(ProgressAggregator::new(index, count, item.label(), token)),
            observer,
        }
    }

    fn aggregator(&self) -> MutexGuard<'_, ProgressAggregator> {
        self.aggregator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> String {
        self.aggregator().label().to_string()
    }

    fn finish(&self) -> Option<ProgressRecord> {
        self.aggregator().finish()
    }
}

impl ProgressHandler for ItemProgress<'_> {
    fn on_progress(&self, event: RawProgress) -> FetchSignal {
        let step = self.aggregator().on_event(&event);
        match step {
            ProgressStep::Emit(record) => {
                self.observer.on_progress(record);
                FetchSignal::Continue
            }
            ProgressStep::Suppressed => FetchSignal::Continue,
            ProgressStep::Cancel => FetchSignal::Cancel,
        }
    }

    fn on_notice(&self, notice: FetchNotice) {
        match notice {
            FetchNotice::Metadata {
                title,
                duration_secs,
            } => {
                if let Some(title) = title {
                    self.observer.on_log(format!("Title: {title}"));
                    let titled = ResolvedItem {
                        title: Some(title),
                        ..self.item.clone()
                    };
                    self.aggregator().set_label(titled.label());
                }
                if let Some(duration) = duration_secs {
                    self.observer.on_log(format!("Duration: {duration} seconds"));
                }
            }
            FetchNotice::QualityFallback { requested } => {
                self.observer.on_log(format!(
                    "Resolution {requested}p not available, selecting best match"
                ));
            }
        }
    }
}
