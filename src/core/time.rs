// src/core/time.rs
//
// Time labels as shown on the results list ("9.30", "09:30", "3.02.") and
// the minute-offset-since-midnight they stand for.

use std::sync::Mutex;

use chrono::{Local, NaiveDate};

use crate::error::ParseError;

/// Parse a list label into minutes since midnight.
///
/// The hour is not range-checked: the site shows "24.05" style labels around
/// midnight, and those still order correctly after "23.55".
pub fn parse_label(label: &str) -> Result<u32, ParseError> {
    let trimmed = label.trim().trim_end_matches(['.', ':']).trim_end();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let sep = if trimmed.contains('.') {
        '.'
    } else if trimmed.contains(':') {
        ':'
    } else {
        return Err(ParseError::MissingSeparator(label.to_string()));
    };

    let parts: Vec<&str> = trimmed.split(sep).map(str::trim).collect();
    let &[h, m] = parts.as_slice() else {
        return Err(ParseError::ComponentCount(label.to_string()));
    };
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !numeric(h) || !numeric(m) {
        return Err(ParseError::NotNumeric(label.to_string()));
    }

    let minute: u32 = m.parse().map_err(|_| ParseError::NotNumeric(label.to_string()))?;
    if minute > 59 {
        return Err(ParseError::MinuteOutOfRange { label: label.to_string(), minute });
    }
    let hour: u32 = h.parse().map_err(|_| ParseError::HourOverflow(label.to_string()))?;
    hour.checked_mul(60)
        .and_then(|v| v.checked_add(minute))
        .ok_or_else(|| ParseError::HourOverflow(label.to_string()))
}

/// `"HH.MM"`, the form anchors are stored in.
pub fn format_minutes(minutes: u32) -> String {
    let (h, m) = split_minutes(minutes);
    format!("{h:02}.{m:02}")
}

pub fn split_minutes(minutes: u32) -> (u32, u32) {
    (minutes / 60, minutes % 60)
}

/// Start of the lookback window for an anchor. The window covers
/// `lookback_hours` whole hour buckets, the anchor's own hour included, and is
/// clamped at midnight. Zero hours gives a start past the anchor (no window).
pub fn lookback_start(anchor: u32, lookback_hours: u32) -> u32 {
    let (hour, _) = split_minutes(anchor);
    (hour + 1).saturating_sub(lookback_hours) * 60
}

/// Source of "today". Workers roll their state over when it changes.
pub trait Calendar: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalCalendar;

impl Calendar for LocalCalendar {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A calendar pinned to a settable day.
#[derive(Debug)]
pub struct FixedCalendar(Mutex<NaiveDate>);

impl FixedCalendar {
    pub fn new(day: NaiveDate) -> Self {
        Self(Mutex::new(day))
    }

    pub fn set(&self, day: NaiveDate) {
        match self.0.lock() {
            Ok(mut g) => *g = day,
            Err(poisoned) => *poisoned.into_inner() = day,
        }
    }
}

impl Calendar for FixedCalendar {
    fn today(&self) -> NaiveDate {
        match self.0.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
