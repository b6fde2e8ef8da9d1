use engine_logging::{engine_info, engine_warn};

use crate::{validate, AppState, Effect, Msg, SessionState, StartRejection};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SingleInputChanged(text) => {
            state.set_single_input(text);
            Vec::new()
        }
        Msg::BatchInputChanged(text) => {
            state.set_batch_input(text);
            Vec::new()
        }
        Msg::OptionsChanged(options) => {
            state.set_options(options);
            Vec::new()
        }
        Msg::StartClicked => match (state.session(), state.active_batch()) {
            (SessionState::Idle, _) => start_batch(&mut state),
            (SessionState::Initializing | SessionState::Running, Some(batch_id)) => {
                // A second start while a batch is active means "stop".
                engine_info!("Start pressed during batch {}; cancelling", batch_id);
                state.begin_cancel();
                state.push_log("Cancelling download...");
                vec![Effect::CancelBatch { batch_id }]
            }
            _ => Vec::new(),
        },
        Msg::BatchResolved {
            batch_id,
            item_count,
        } => {
            if state.is_active_batch(batch_id) {
                state.apply_resolved(item_count);
                if item_count == 0 {
                    state.reject_start(StartRejection::NoValidReferences);
                }
            }
            Vec::new()
        }
        Msg::Log { batch_id, line } => {
            if state.is_active_batch(batch_id) {
                state.push_log(line);
            }
            Vec::new()
        }
        Msg::ItemProgress { batch_id, record } => {
            if state.is_active_batch(batch_id) {
                state.apply_progress(record);
            }
            Vec::new()
        }
        Msg::ItemFinished {
            batch_id,
            item_index,
            label,
            outcome,
        } => {
            if state.is_active_batch(batch_id) {
                state.apply_item_finished(item_index, label, outcome);
            }
            Vec::new()
        }
        Msg::BatchFinished { batch_id, summary } => {
            if state.is_active_batch(batch_id) {
                state.push_log(format!("Batch finished: {summary}"));
                state.finish_batch(summary);
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

/// Single entry first, then the batch text, one reference per non-blank line.
pub fn collect_submission(single: &str, batch: &str) -> Vec<String> {
    single
        .lines()
        .chain(batch.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn start_batch(state: &mut AppState) -> Vec<Effect> {
    let submission = collect_submission(state.single_input(), state.batch_input());

    let mut references = Vec::with_capacity(submission.len());
    let mut rejected = 0;
    for entry in &submission {
        match validate(entry) {
            Ok(reference) => {
                if reference
                    .collection()
                    .is_some_and(|collection| collection.start_index_defaulted)
                {
                    state.push_log(format!(
                        "Malformed index in {entry}, starting from the first item"
                    ));
                }
                references.push(reference);
            }
            Err(err) => {
                engine_warn!("Rejected reference {:?}: {}", entry, err);
                rejected += 1;
                state.push_log(format!("Invalid reference: {err}"));
            }
        }
    }

    if references.is_empty() {
        let rejection = StartRejection::NoValidReferences;
        state.push_log(format!("Nothing to do: {rejection}"));
        state.reject_start(rejection);
        return Vec::new();
    }

    let batch_id = state.begin_batch();
    engine_info!(
        "Starting batch {} with {} reference(s), {} rejected",
        batch_id,
        references.len(),
        rejected
    );
    vec![Effect::StartBatch {
        batch_id,
        references,
        rejected,
        options: state.options().clone(),
    }]
}
