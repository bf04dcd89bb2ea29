// src/engine/worker.rs
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::types::*;
use super::{calibration_order, incremental_candidates, lookback_candidates, parse_snapshot};
use crate::core::time::{Calendar, format_minutes};
use crate::data::{MatchKey, MatchRecord, Outcome};
use crate::driver::{DriverError, NavTarget, PageDriver};
use crate::progress::{NullProgress, Progress};
use crate::store::{AnchorStore, ResultStore};

/// What came back from opening one item.
struct ItemRead {
    outcome: Result<Option<Outcome>, DriverError>,
    /// False when the list view is gone after the read.
    list_ok: bool,
}

/// Collects one competition through its own page driver.
pub struct CompetitionWorker<D: PageDriver> {
    competition: String,
    driver: D,
    settings: EngineSettings,
    anchors: Arc<AnchorStore>,
    results: Arc<ResultStore>,
    calendar: Arc<dyn Calendar>,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,

    state: State,
    day: NaiveDate,
    anchor: Option<u32>,
    nav_failures: u32,
}

impl<D: PageDriver> CompetitionWorker<D> {
    pub fn new(
        competition: impl Into<String>,
        driver: D,
        settings: EngineSettings,
        anchors: Arc<AnchorStore>,
        results: Arc<ResultStore>,
        calendar: Arc<dyn Calendar>,
    ) -> Self {
        let day = calendar.today();
        Self {
            competition: competition.into(),
            driver,
            settings,
            anchors,
            results,
            calendar,
            progress: Arc::new(NullProgress),
            cancel: CancellationToken::new(),
            state: State::Navigating,
            day,
            anchor: None,
            nav_failures: 0,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn competition(&self) -> &str {
        &self.competition
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// In-memory anchor for the current day.
    pub fn anchor(&self) -> Option<u32> {
        self.anchor
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Step until stopped or cancelled.
    pub async fn run(&mut self) {
        logf!("Worker started");
        while !self.cancel.is_cancelled() {
            let t = self.step().await;
            if t.next == State::Stopped {
                break;
            }
            self.sleep(t.delay).await;
        }
        self.state = State::Stopped;
        logf!("Worker stopped");
    }

    /// Perform one transition.
    pub async fn step(&mut self) -> Transition {
        let from = self.state;
        let t = match from {
            State::Navigating => self.navigate().await,
            State::NeedsCalibration => self.calibrate().await,
            State::LookbackBackfill { anchor } => self.backfill(anchor).await,
            State::Incremental => self.incremental().await,
            State::Stopped => Transition::now(State::Stopped),
        };
        let next = t.next;
        if next != from {
            logd!(from = %from, to = %next, "State change");
            self.progress.state_changed(&self.competition, from, next);
        }
        self.state = next;
        t
    }

    /* ---------------- States ---------------- */

    async fn navigate(&mut self) -> Transition {
        self.roll_day();
        let target = NavTarget::competition(&self.settings.target_url, &self.competition, self.day);

        if let Err(reason) = self.open_list(&target).await {
            self.nav_failures += 1;
            let limit = self.settings.nav_retry_limit;
            logw!(state = %self.state, "Navigation failed ({}/{limit}): {reason}", self.nav_failures);
            if self.nav_failures < limit {
                return Transition::after(State::Navigating, self.settings.timing.nav_backoff);
            }
            let cooldown = self.settings.timing.nav_cooldown;
            loge!("{limit} navigation failures in a row, pausing {cooldown:?}");
            self.nav_failures = 0;
            let root = NavTarget::root(&self.settings.target_url, self.day);
            if let Err(e) = self.driver.navigate_to(&root).await {
                logw!("Could not return to results root: {e}");
            }
            return Transition::after(State::Navigating, cooldown);
        }
        self.nav_failures = 0;

        let stored = match self.anchors.load(self.day, &self.competition).await {
            Ok(v) => v,
            Err(e) => {
                logw!("Could not read anchor: {e}");
                return Transition::after(State::Navigating, self.settings.timing.error_delay);
            }
        };
        // A save that failed earlier today still counts.
        if let Some(anchor) = stored.max(self.anchor) {
            self.anchor = Some(anchor);
            logf!("Resuming from anchor {}", format_minutes(anchor));
            return Transition::now(State::Incremental);
        }

        if self.settings.calibration == CalibrationStrategy::FromTable {
            match self.results.latest_collected(self.day, &self.competition).await {
                Ok(Some(latest)) => {
                    self.advance_anchor(latest).await;
                    logf!("Anchor {} taken from today's table", format_minutes(latest));
                    return Transition::now(State::Incremental);
                }
                Ok(None) => {}
                Err(e) => logw!("Could not scan today's table: {e}"),
            }
        }
        Transition::now(State::NeedsCalibration)
    }

    async fn calibrate(&mut self) -> Transition {
        if self.day_changed() {
            return Transition::now(State::Navigating);
        }
        let Some(slots) = self.snapshot().await else { return self.list_lost() };

        let mut summary = PassSummary::default();
        for slot in calibration_order(&slots) {
            if self.cancel.is_cancelled() {
                return Transition::now(State::Stopped);
            }
            summary.opened += 1;
            let read = self.read_outcome(&slot).await;
            match read.outcome {
                Ok(Some(outcome)) => {
                    if !self.store(&slot, outcome).await {
                        return Transition::after(State::NeedsCalibration, self.settings.timing.error_delay);
                    }
                    summary.stored += 1;
                    self.advance_anchor(slot.minutes).await;
                    let anchor = self.anchor.unwrap_or(slot.minutes);
                    logf!("Calibrated at {}", format_minutes(anchor));
                    self.progress.pass_finished(&self.competition, self.state, &summary);
                    return Transition::now(State::LookbackBackfill { anchor });
                }
                Ok(None) => summary.empty += 1,
                Err(_) => summary.failed += 1,
            }
            if !read.list_ok {
                return self.list_lost();
            }
        }

        logf!("No published result among {} items, retrying", summary.opened);
        self.progress.pass_finished(&self.competition, self.state, &summary);
        Transition::after(State::NeedsCalibration, self.settings.timing.polling_interval)
    }

    async fn backfill(&mut self, anchor: u32) -> Transition {
        if self.day_changed() {
            return Transition::now(State::Navigating);
        }
        let Some(slots) = self.snapshot().await else { return self.list_lost() };
        let collected = self.collected().await;

        let mut summary = PassSummary::default();
        for slot in lookback_candidates(&slots, anchor, self.settings.lookback_hours) {
            if self.cancel.is_cancelled() {
                return Transition::now(State::Stopped);
            }
            if collected.contains(&self.key(&slot)) {
                summary.skipped += 1;
                continue;
            }
            summary.opened += 1;
            let read = self.read_outcome(&slot).await;
            match read.outcome {
                Ok(Some(outcome)) => {
                    if self.store(&slot, outcome).await {
                        summary.stored += 1;
                    }
                }
                Ok(None) => summary.empty += 1,
                Err(_) => summary.failed += 1,
            }
            if !read.list_ok {
                return self.list_lost();
            }
        }

        logf!(
            "Lookback done: {} stored, {} empty, {} already collected",
            summary.stored, summary.empty, summary.skipped
        );
        self.progress.pass_finished(&self.competition, self.state, &summary);
        Transition::now(State::Incremental)
    }

    async fn incremental(&mut self) -> Transition {
        if self.day_changed() {
            return Transition::now(State::Navigating);
        }
        let Some(anchor) = self.anchor else { return Transition::now(State::NeedsCalibration) };
        let Some(slots) = self.snapshot().await else { return self.list_lost() };
        let collected = self.collected().await;

        let mut summary = PassSummary::default();
        let mut frozen = false;
        let mut empties = 0;
        for slot in incremental_candidates(&slots, anchor) {
            if self.cancel.is_cancelled() {
                return Transition::now(State::Stopped);
            }
            if collected.contains(&self.key(&slot)) {
                summary.skipped += 1;
                if !frozen {
                    self.advance_anchor(slot.minutes).await;
                }
                continue;
            }
            if self.settings.max_matches > 0 && summary.opened >= self.settings.max_matches {
                logd!("Reached {} items for this pass", self.settings.max_matches);
                break;
            }

            summary.opened += 1;
            let read = self.read_outcome(&slot).await;
            match read.outcome {
                Ok(Some(outcome)) => {
                    empties = 0;
                    if self.store(&slot, outcome).await {
                        summary.stored += 1;
                        if !frozen {
                            self.advance_anchor(slot.minutes).await;
                        }
                    } else {
                        frozen = true;
                    }
                }
                Ok(None) => {
                    summary.empty += 1;
                    empties += 1;
                    frozen = true;
                    logd!(slot = %format_minutes(slot.minutes), "No result yet");
                    if empties >= self.settings.consecutive_empty_limit {
                        return self.abort_pass(&slot, summary).await;
                    }
                }
                Err(_) => {
                    summary.failed += 1;
                    frozen = true;
                }
            }
            if !read.list_ok {
                return self.list_lost();
            }
        }

        if summary.stored > 0 {
            logf!("Pass stored {} new matches", summary.stored);
        }
        self.progress.pass_finished(&self.competition, self.state, &summary);
        Transition::after(State::Incremental, self.settings.timing.polling_interval)
    }

    async fn abort_pass(&mut self, slot: &Slot, summary: PassSummary) -> Transition {
        let rest = self.settings.timing.rest_interval;
        logf!(
            slot = %format_minutes(slot.minutes),
            "{} pending result(s), resting {:?} before re-navigating",
            summary.empty, rest
        );
        let root = NavTarget::root(&self.settings.target_url, self.day);
        if let Err(e) = self.driver.navigate_to(&root).await {
            logw!("Could not return to results root: {e}");
        }
        self.progress.pass_finished(&self.competition, self.state, &summary);
        Transition::after(State::Navigating, rest)
    }

    /* ---------------- Helpers ---------------- */

    async fn open_list(&mut self, target: &NavTarget) -> Result<(), String> {
        self.driver.navigate_to(target).await.map_err(|e| e.to_string())?;
        match self.driver.is_competition_list_visible().await {
            Ok(true) => Ok(()),
            Ok(false) => Err("competition list not visible".into()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn list_visible(&mut self) -> bool {
        matches!(self.driver.is_competition_list_visible().await, Ok(true))
    }

    async fn snapshot(&mut self) -> Option<Vec<Slot>> {
        if !self.list_visible().await {
            logw!(state = %self.state, "Competition list is gone");
            return None;
        }
        match self.driver.list_visible_items().await {
            Ok(items) => Some(parse_snapshot(&items)),
            Err(e) => {
                logw!(state = %self.state, "Could not list items: {e}");
                None
            }
        }
    }

    fn list_lost(&self) -> Transition {
        Transition::after(State::Navigating, self.settings.timing.error_delay)
    }

    /// Open, read, go back. Jitter follows both the open and the go-back.
    async fn read_outcome(&mut self, slot: &Slot) -> ItemRead {
        let outcome = self.driver.open_item(&slot.item).await;
        self.jitter().await;
        if let Err(e) = &outcome {
            logw!(state = %self.state, slot = %format_minutes(slot.minutes), "Could not read item: {e}");
        }
        let back = self.driver.go_back().await;
        if let Err(e) = &back {
            logw!(state = %self.state, "Going back failed: {e}");
        }
        self.jitter().await;

        let list_ok = if outcome.is_err() || back.is_err() { self.list_visible().await } else { true };
        ItemRead { outcome, list_ok }
    }

    /// Upsert one outcome. True when the slot is collected afterwards.
    async fn store(&self, slot: &Slot, outcome: Outcome) -> bool {
        let record = MatchRecord::new(
            self.day,
            self.competition.as_str(),
            slot.minutes,
            slot.item.teams.clone(),
            Some(outcome),
        );
        match self.results.upsert(self.day, record.clone()).await {
            Ok(res) => {
                logd!(slot = %format_minutes(slot.minutes), ?res, "{outcome}");
                if res.changed() {
                    self.progress.match_stored(&record, res);
                }
                true
            }
            Err(e) => {
                loge!(state = %self.state, slot = %format_minutes(slot.minutes), "Could not store result: {e}");
                false
            }
        }
    }

    /// Move the anchor forward to `minutes` if that is further on.
    async fn advance_anchor(&mut self, minutes: u32) {
        if self.anchor.is_some_and(|a| a >= minutes) {
            return;
        }
        match self.anchors.save(self.day, &self.competition, minutes).await {
            Ok(effective) => self.anchor = Some(effective),
            Err(e) => {
                loge!(slot = %format_minutes(minutes), "Could not save anchor: {e}");
                self.anchor = Some(minutes);
            }
        }
        if let Some(a) = self.anchor {
            self.progress.anchor_advanced(&self.competition, a);
        }
    }

    async fn collected(&self) -> HashSet<MatchKey> {
        match self.results.collected_slots(self.day, &self.competition).await {
            Ok(keys) => keys,
            Err(e) => {
                logw!("Could not read today's table: {e}");
                HashSet::new()
            }
        }
    }

    fn key(&self, slot: &Slot) -> MatchKey {
        slot.key(&self.competition, self.settings.key_shape)
    }

    fn day_changed(&self) -> bool {
        self.calendar.today() != self.day
    }

    fn roll_day(&mut self) {
        let today = self.calendar.today();
        if today != self.day {
            logf!("New day {today}, anchor reset");
            self.day = today;
            self.anchor = None;
        }
    }

    async fn jitter(&self) {
        let (lo, hi) = (self.settings.timing.jitter_min, self.settings.timing.jitter_max);
        if hi.is_zero() {
            return;
        }
        let d = if hi > lo { rand::thread_rng().gen_range(lo..=hi) } else { lo };
        self.sleep(d).await;
    }

    async fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(d) => {}
        }
    }
}
