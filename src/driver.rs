// src/driver.rs
//
// The page driver: whatever actually clicks through the results site. The
// engine only ever talks to these traits, so a browser automation backend and
// the scripted driver in the tests are interchangeable.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::sanitize::split_item_text;
use crate::data::{Outcome, TeamPair};

pub use crate::error::DriverError;

/// Where to navigate. `competition: None` is the results root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavTarget {
    pub url: String,
    pub competition: Option<String>,
    pub day: NaiveDate,
}

impl NavTarget {
    pub fn root(url: impl Into<String>, day: NaiveDate) -> Self {
        Self { url: url.into(), competition: None, day }
    }

    pub fn competition(url: impl Into<String>, competition: impl Into<String>, day: NaiveDate) -> Self {
        Self { url: url.into(), competition: Some(competition.into()), day }
    }
}

/// One match button in the competition's result list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleItem {
    pub time_label: String,
    pub teams: Option<TeamPair>,
}

impl VisibleItem {
    pub fn new(time_label: impl Into<String>, teams: Option<TeamPair>) -> Self {
        Self { time_label: time_label.into(), teams }
    }

    /// Build from the raw text of a list button.
    pub fn from_button_text(text: &str) -> Option<Self> {
        let (time_label, teams) = split_item_text(text)?;
        Some(Self { time_label, teams })
    }
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate_to(&mut self, target: &NavTarget) -> Result<(), DriverError>;

    async fn is_competition_list_visible(&mut self) -> Result<bool, DriverError>;

    async fn list_visible_items(&mut self) -> Result<Vec<VisibleItem>, DriverError>;

    /// Open a match and read its "both teams score" result. `Ok(None)` means
    /// the detail page loaded but the result is not published yet.
    async fn open_item(&mut self, item: &VisibleItem) -> Result<Option<Outcome>, DriverError>;

    async fn go_back(&mut self) -> Result<(), DriverError>;
}

/// A browser session that hands out one tab per competition.
#[async_trait]
pub trait PageSession: Send + Sync {
    type Driver: PageDriver + 'static;

    async fn open_tab(&self, competition: &str) -> Result<Self::Driver, DriverError>;
}
