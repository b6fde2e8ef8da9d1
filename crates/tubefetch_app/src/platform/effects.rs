use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tubefetch_core::{Effect, Msg};
use tubefetch_engine::{EngineError, EngineEvent, EngineHandle, EngineSettings};

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Executes core effects against the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, msg_tx: mpsc::Sender<Msg>) -> Result<Self, EngineError> {
        let engine = EngineHandle::new(settings)?;
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        Ok(runner)
    }

    pub fn enqueue(&self, effects: Vec<Effect>) -> Result<(), EngineError> {
        for effect in effects {
            match effect {
                Effect::StartBatch {
                    batch_id,
                    references,
                    rejected,
                    options,
                } => {
                    engine_info!(
                        "StartBatch batch_id={} references={} rejected={} quality={}",
                        batch_id,
                        references.len(),
                        rejected,
                        options.quality
                    );
                    self.engine
                        .start_batch(batch_id, references, rejected, options)?;
                }
                Effect::CancelBatch { batch_id } => {
                    engine_info!("CancelBatch batch_id={}", batch_id);
                    self.engine.cancel(batch_id);
                }
            }
        }
        Ok(())
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.recv_timeout(EVENT_POLL) {
                if msg_tx.send(to_msg(event)).is_err() {
                    engine_debug!("Message channel closed; stopping engine event loop");
                    break;
                }
            }
        });
    }
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Log { batch_id, line } => Msg::Log { batch_id, line },
        EngineEvent::BatchResolved {
            batch_id,
            item_count,
        } => Msg::BatchResolved {
            batch_id,
            item_count,
        },
        EngineEvent::Progress { batch_id, record } => Msg::ItemProgress { batch_id, record },
        EngineEvent::ItemTerminal {
            batch_id,
            item_index,
            label,
            outcome,
        } => Msg::ItemFinished {
            batch_id,
            item_index,
            label,
            outcome,
        },
        EngineEvent::BatchTerminal { batch_id, summary } => {
            Msg::BatchFinished { batch_id, summary }
        }
    }
}
