//! Batch bookkeeping and the worker pool that drains it.

pub mod ledger;
pub mod runner;

pub use ledger::{Ledger, LedgerSnapshot};
pub use runner::{BatchJob, ImageTask, LedgerHost, PoolRunner, RunReport, StopToken, TaskOutcome};
