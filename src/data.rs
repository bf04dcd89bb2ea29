// src/data.rs
//
// Canonical row types for the per-day result table.
//
// - Outcome:     the "both teams score" market result, Sim / Não.
// - MatchRecord: one row of the table, including the derived pattern columns.
// - MatchKey:    the natural key; how much of it counts depends on KeyShape.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::time::split_minutes;
use crate::patterns::PATTERN_COLUMNS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Sim,
    Nao,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Sim => "Sim",
            Outcome::Nao => "Não",
        }
    }

    /// Lenient parse of a table cell. Blank cells and the placeholders older
    /// tables carry (`nan`, `None`) are absent outcomes.
    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim() {
            "Sim" | "sim" | "SIM" => Some(Outcome::Sim),
            "Não" | "não" | "NÃO" | "Nao" | "nao" => Some(Outcome::Nao),
            _ => None,
        }
    }

    /// `Sim` when both outcomes agree, `Não` otherwise.
    pub fn agreement(self, other: Outcome) -> Outcome {
        if self == other { Outcome::Sim } else { Outcome::Nao }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home/away names as shown on the list button.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamPair {
    pub home: String,
    pub away: String,
}

impl TeamPair {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self { home: home.into(), away: away.into() }
    }

    /// Parse the `"Home x Away"` form used in the Teams column.
    pub fn parse(cell: &str) -> Option<Self> {
        let (home, away) = cell.split_once(" x ")?;
        let (home, away) = (home.trim(), away.trim());
        if home.is_empty() || away.is_empty() {
            return None;
        }
        Some(Self::new(home, away))
    }
}

impl fmt::Display for TeamPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.home, self.away)
    }
}

/// Which fields make two rows "the same match".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    /// (competition, hour, minute)
    #[default]
    Slot,
    /// (competition, hour, minute, teams): tells apart several matches
    /// listed under the same time slot.
    SlotAndTeams,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub competition: String,
    pub minutes: u32,
    pub teams: Option<TeamPair>,
}

impl MatchKey {
    pub fn new(competition: impl Into<String>, minutes: u32, teams: Option<TeamPair>) -> Self {
        Self { competition: competition.into(), minutes, teams }
    }

    /// Drop the parts of the key the shape does not compare.
    pub fn for_shape(mut self, shape: KeyShape) -> Self {
        if shape == KeyShape::Slot {
            self.teams = None;
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    /// Calendar day, `DD/MM/YYYY`.
    pub date: String,
    pub competition: String,
    pub hour: u32,
    pub minute: u32,
    pub teams: Option<TeamPair>,
    pub outcome: Option<Outcome>,
    /// Derived `1x..5x`; index 0 is `1x`.
    pub patterns: [Option<Outcome>; PATTERN_COLUMNS],
}

impl MatchRecord {
    pub fn new(
        day: NaiveDate,
        competition: impl Into<String>,
        minutes: u32,
        teams: Option<TeamPair>,
        outcome: Option<Outcome>,
    ) -> Self {
        let (hour, minute) = split_minutes(minutes);
        Self {
            date: date_label(day),
            competition: competition.into(),
            hour,
            minute,
            teams,
            outcome,
            patterns: [None; PATTERN_COLUMNS],
        }
    }

    /// Minute-offset since midnight; the sort key within a competition.
    pub fn minutes(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn key(&self, shape: KeyShape) -> MatchKey {
        MatchKey::new(self.competition.clone(), self.minutes(), self.teams.clone()).for_shape(shape)
    }

    pub fn has_outcome(&self) -> bool {
        self.outcome.is_some()
    }
}

/// `DD/MM/YYYY`, the Date column format.
pub fn date_label(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}
