// tests/common/mod.rs
//
// A page driver that plays back a fixed results list.
//
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use vf_scrape::data::Outcome;
use vf_scrape::driver::{DriverError, NavTarget, PageDriver, PageSession, VisibleItem};

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

#[derive(Clone)]
pub struct ScriptedDriver {
    pub items: Vec<VisibleItem>,
    pub outcomes: HashMap<String, Result<Option<Outcome>, DriverError>>,
    /// Navigations that fail before one succeeds; `u32::MAX` never recovers.
    pub fail_navigations: u32,
    pub list_visible: bool,
    /// "nav <competition|root>", "open <label>", "back"
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDriver {
    /// Items in list order; `None` means "no result published yet".
    pub fn new(items: &[(&str, Option<Outcome>)]) -> Self {
        Self {
            items: items.iter().map(|(l, _)| VisibleItem::new(*l, None)).collect(),
            outcomes: items.iter().map(|(l, o)| (l.to_string(), Ok(*o))).collect(),
            fail_navigations: 0,
            list_visible: true,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_item(mut self, label: &str, err: DriverError) -> Self {
        self.outcomes.insert(label.to_string(), Err(err));
        self
    }

    pub fn never_navigates(mut self) -> Self {
        self.fail_navigations = u32::MAX;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("open ").map(str::to_string))
            .collect()
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate_to(&mut self, target: &NavTarget) -> Result<(), DriverError> {
        self.record(format!("nav {}", target.competition.as_deref().unwrap_or("root")));
        if target.competition.is_some() && self.fail_navigations > 0 {
            if self.fail_navigations != u32::MAX {
                self.fail_navigations -= 1;
            }
            return Err(DriverError::Navigation("connection reset".into()));
        }
        Ok(())
    }

    async fn is_competition_list_visible(&mut self) -> Result<bool, DriverError> {
        Ok(self.list_visible)
    }

    async fn list_visible_items(&mut self) -> Result<Vec<VisibleItem>, DriverError> {
        Ok(self.items.clone())
    }

    async fn open_item(&mut self, item: &VisibleItem) -> Result<Option<Outcome>, DriverError> {
        self.record(format!("open {}", item.time_label));
        self.outcomes.get(&item.time_label).cloned().unwrap_or(Ok(None))
    }

    async fn go_back(&mut self) -> Result<(), DriverError> {
        self.record("back".to_string());
        Ok(())
    }
}

/// Hands out a clone of the scripted driver registered for each competition.
#[derive(Default)]
pub struct ScriptedSession {
    pub drivers: HashMap<String, ScriptedDriver>,
    pub broken_tabs: HashSet<String>,
}

impl ScriptedSession {
    pub fn with(mut self, competition: &str, driver: ScriptedDriver) -> Self {
        self.drivers.insert(competition.to_string(), driver);
        self
    }

    pub fn broken(mut self, competition: &str) -> Self {
        self.broken_tabs.insert(competition.to_string());
        self
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    type Driver = ScriptedDriver;

    async fn open_tab(&self, competition: &str) -> Result<ScriptedDriver, DriverError> {
        if self.broken_tabs.contains(competition) {
            return Err(DriverError::Page("tab crashed".into()));
        }
        Ok(self.drivers.get(competition).cloned().unwrap_or_else(|| ScriptedDriver::new(&[])))
    }
}
