//! Run-state machine and the engine that owns a batch.

pub mod state_machine;
pub mod transitions;

pub use state_machine::{Engine, Progress};
pub use transitions::{Action, Resolution, Transition, plan_transition, resolve_drained};
