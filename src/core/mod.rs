// src/core/mod.rs

pub mod sanitize;
pub mod time;

pub use time::{Calendar, FixedCalendar, LocalCalendar};
