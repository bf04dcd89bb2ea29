// src/lib.rs

#[macro_use]
pub mod log;

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod csv;
pub mod data;
pub mod driver;
pub mod engine;
pub mod error;
pub mod file;
pub mod patterns;
pub mod progress;
pub mod runner;
pub mod store;

pub use error::{Error, Result};

// Lets the log macros resolve `tracing` from any crate that uses them.
#[doc(hidden)]
pub use tracing as __tracing;
