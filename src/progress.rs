// src/progress.rs
use crate::data::MatchRecord;
use crate::engine::{PassSummary, State};
use crate::store::UpsertOutcome;

/// Observer for collection events. Workers share one sink across tasks, so
/// every callback takes `&self`; all of them default to doing nothing.
pub trait Progress: Send + Sync {
    fn state_changed(&self, _competition: &str, _from: State, _to: State) {}

    /// A row was inserted or filled.
    fn match_stored(&self, _record: &MatchRecord, _outcome: UpsertOutcome) {}

    fn anchor_advanced(&self, _competition: &str, _minutes: u32) {}

    /// A calibration, lookback or incremental pass ran to its end.
    fn pass_finished(&self, _competition: &str, _state: State, _summary: &PassSummary) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
