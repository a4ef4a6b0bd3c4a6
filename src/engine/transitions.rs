use crate::foundation::core::{Intent, RunState};
use crate::foundation::error::{WatermarkError, WatermarkResult};

/// Side effect the engine performs when an intent is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Seed the ledger from the configured sources and start the pool.
    StartFresh,
    /// Start the pool over the existing todo list.
    Resume,
    /// Raise the stop token and let in-flight images drain.
    Stop,
    /// Return done images to todo without processing anything.
    FoldBack,
}

/// An accepted `(state, intent)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: RunState,
    pub to: RunState,
    pub action: Action,
}

/// Look up `intent` in the transition table for `state`.
pub fn plan_transition(state: RunState, intent: Intent) -> WatermarkResult<Transition> {
    let (to, action) = match (state, intent) {
        (RunState::Idle, Intent::Run) => (RunState::Running, Action::StartFresh),
        (RunState::Paused, Intent::Run) => (RunState::Running, Action::Resume),
        (RunState::Running, Intent::Pause) => (RunState::Pausing, Action::Stop),
        (RunState::Running, Intent::Cancel) => (RunState::Canceling, Action::Stop),
        (RunState::Paused, Intent::Cancel) => (RunState::Idle, Action::FoldBack),
        (RunState::Idle, Intent::Pause | Intent::Cancel)
        | (RunState::Running, Intent::Run)
        | (RunState::Paused, Intent::Pause)
        | (RunState::Pausing | RunState::Canceling, _) => {
            return Err(WatermarkError::invalid_transition(intent, state));
        }
    };
    Ok(Transition {
        from: state,
        to,
        action,
    })
}

/// Where the engine lands once a runner pass has drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub state: RunState,
    /// Return done images to todo before settling.
    pub fold_back: bool,
}

/// Resolve the state left behind by a finished runner pass.
///
/// An empty todo list always settles to `Idle`: a batch that completed while a pause or
/// cancel was pending counts as completed.
pub fn resolve_drained(state: RunState, todo_empty: bool) -> Resolution {
    let (state, fold_back) = match (state, todo_empty) {
        (RunState::Running | RunState::Pausing | RunState::Canceling, true) => {
            (RunState::Idle, false)
        }
        // Only reachable when the engine is torn down mid-run.
        (RunState::Running, false) => (RunState::Paused, false),
        (RunState::Pausing, false) => (RunState::Paused, false),
        (RunState::Canceling, false) => (RunState::Idle, true),
        (settled @ (RunState::Idle | RunState::Paused), _) => (settled, false),
    };
    Resolution { state, fold_back }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/transitions.rs"]
mod tests;
