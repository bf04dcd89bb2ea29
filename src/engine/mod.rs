// src/engine/mod.rs
//
// Per-competition collection state machine.
//
//   Navigating -> NeedsCalibration -> LookbackBackfill -> Incremental
//        ^                                                   |
//        +---------------- abort / list lost ----------------+
//
// The pure helpers below decide which visible items each state looks at;
// `worker` does the driver and store calls.

pub mod types;
pub mod worker;

pub use types::{CalibrationStrategy, EngineSettings, PassSummary, Slot, State, Timing, Transition};
pub use worker::CompetitionWorker;

use std::ops::Range;

use crate::core::time::lookback_start;
use crate::driver::VisibleItem;

/// Parse the time labels of a list snapshot. Items whose label does not
/// parse are logged and dropped.
pub fn parse_snapshot(items: &[VisibleItem]) -> Vec<Slot> {
    items
        .iter()
        .filter_map(|item| match Slot::from_item(item) {
            Ok(slot) => Some(slot),
            Err(e) => {
                logw!("Skipping item: {e}");
                None
            }
        })
        .collect()
}

fn ascending(mut slots: Vec<Slot>) -> Vec<Slot> {
    slots.sort_by(|a, b| a.minutes.cmp(&b.minutes).then_with(|| a.item.teams.cmp(&b.item.teams)));
    slots
}

/// Newest first.
pub fn calibration_order(slots: &[Slot]) -> Vec<Slot> {
    let mut out = ascending(slots.to_vec());
    out.reverse();
    out
}

/// `[max(0, anchor_hour + 1 - lookback_hours) * 60, anchor)`; empty when
/// `lookback_hours` is 0.
pub fn lookback_window(anchor: u32, lookback_hours: u32) -> Range<u32> {
    lookback_start(anchor, lookback_hours)..anchor
}

/// Items inside the lookback window, oldest first.
pub fn lookback_candidates(slots: &[Slot], anchor: u32, lookback_hours: u32) -> Vec<Slot> {
    let window = lookback_window(anchor, lookback_hours);
    ascending(slots.iter().filter(|s| window.contains(&s.minutes)).cloned().collect())
}

/// Items at or after the anchor, oldest first.
pub fn incremental_candidates(slots: &[Slot], anchor: u32) -> Vec<Slot> {
    ascending(slots.iter().filter(|s| s.minutes >= anchor).cloned().collect())
}
