use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use thiserror::Error;
use tubefetch_core::{BatchId, CancellationToken, DownloadOptions, Reference};

use crate::observer::ChannelObserver;
use crate::runner::JobRunner;
use crate::thumbnail::ThumbnailSettings;
use crate::ytdlp::YtDlpCommand;
use crate::EngineEvent;

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub ytdlp: YtDlpCommand,
    pub thumbnails: ThumbnailSettings,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("engine worker has stopped")]
    Disconnected,
}

enum EngineCommand {
    RunBatch {
        batch_id: BatchId,
        references: Vec<Reference>,
        rejected: usize,
        options: DownloadOptions,
        token: CancellationToken,
    },
}

type TokenRegistry = Arc<Mutex<HashMap<BatchId, CancellationToken>>>;

/// Handle to the background worker. Batches run one at a time, in submission order.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    tokens: TokenRegistry,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        Self::with_runner(JobRunner::from_settings(&settings))
    }

    pub fn with_runner(runner: JobRunner) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let tokens: TokenRegistry = Arc::default();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let worker_tokens = tokens.clone();
        thread::Builder::new()
            .name("tubefetch-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::RunBatch {
                            batch_id,
                            references,
                            rejected,
                            options,
                            token,
                        } => {
                            engine_info!("Worker picked up batch {}", batch_id);
                            let observer = ChannelObserver::new(batch_id, event_tx.clone());
                            runtime.block_on(runner.run(
                                &references,
                                rejected,
                                &options,
                                &token,
                                &observer,
                            ));
                            worker_tokens
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .remove(&batch_id);
                        }
                    }
                }
                engine_debug!("Engine command channel closed; worker exiting");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            tokens,
        })
    }

    /// Queue a batch. Its cancellation token exists from this point on.
    pub fn start_batch(
        &self,
        batch_id: BatchId,
        references: Vec<Reference>,
        rejected: usize,
        options: DownloadOptions,
    ) -> Result<(), EngineError> {
        let token = CancellationToken::new();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(batch_id, token.clone());
        self.cmd_tx
            .send(EngineCommand::RunBatch {
                batch_id,
                references,
                rejected,
                options,
                token,
            })
            .map_err(|_| EngineError::Disconnected)
    }

    /// Set the batch's cancellation token. Unknown or finished batches are ignored.
    pub fn cancel(&self, batch_id: BatchId) {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = tokens.get(&batch_id) {
            engine_info!("Cancelling batch {}", batch_id);
            token.cancel();
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.events().try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.events().recv_timeout(timeout).ok()
    }

    fn events(&self) -> MutexGuard<'_, mpsc::Receiver<EngineEvent>> {
        self.event_rx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
