use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use tubefetch_core::{update, AppState, AppViewModel, Msg};

use super::cli::Cli;
use super::config::{self, AppConfig};
use super::effects::EffectRunner;
use super::logging;
use super::ui::render::Renderer;

const TICK: Duration = Duration::from_millis(100);

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let app_config = AppConfig::load(cli.config.as_deref())?;
    let settings = config::resolve(app_config, &cli)?;
    logging::initialize(&settings.log);
    engine_info!(
        "tubefetch starting; output root {:?}, quality {}",
        settings.options.output_root,
        settings.options.quality
    );

    let batch_text = cli
        .batch_text()
        .with_context(|| format!("could not read batch file {:?}", cli.batch_file))?;

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let effects = EffectRunner::new(settings.engine, msg_tx.clone())
        .context("could not start the download engine")?;
    let mut session = Session {
        state: AppState::with_options(settings.options),
        effects,
        renderer: Renderer::default(),
    };

    session.dispatch(Msg::SingleInputChanged(cli.url.clone().unwrap_or_default()))?;
    session.dispatch(Msg::BatchInputChanged(batch_text))?;
    session.dispatch(Msg::StartClicked)?;

    if session.state.session().is_active() {
        spawn_interrupt_listener(msg_tx);
        while session.state.session().is_active() {
            let msg = match msg_rx.recv_timeout(TICK) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => Msg::Tick,
                Err(RecvTimeoutError::Disconnected) => bail!("engine stopped unexpectedly"),
            };
            session.dispatch(msg)?;
        }
    }
    session.renderer.finish();

    if batch_succeeded(&session.state.view()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

struct Session {
    state: AppState,
    effects: EffectRunner,
    renderer: Renderer,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        let view = dirty.then(|| state.view());
        self.state = state;

        self.effects.enqueue(effects)?;
        if let Some(view) = view {
            self.renderer.render(&view);
        }
        Ok(())
    }
}

/// First Ctrl-C acts as a second press of start (cancel); the next one exits.
fn spawn_interrupt_listener(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                engine_warn!("Ctrl-C handling unavailable: {}", err);
                return;
            }
        };
        let mut presses = 0u32;
        while runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            presses += 1;
            if presses > 1 {
                eprintln!("Interrupted");
                std::process::exit(130);
            }
            engine_info!("Ctrl-C received; cancelling the batch");
            if msg_tx.send(Msg::StartClicked).is_err() {
                break;
            }
        }
    });
}

fn batch_succeeded(view: &AppViewModel) -> bool {
    match (&view.last_summary, &view.last_rejection) {
        (Some(summary), None) => !summary.has_errors(),
        _ => false,
    }
}
