// src/store.rs
//
// On-disk state shared by every competition worker: the per-day anchor files
// and the per-day result tables. Both are rewritten whole under a per-path
// async lock and replaced atomically.

pub mod anchors;
pub mod results;

pub use anchors::AnchorStore;
pub use results::{ResultStore, UpsertOutcome};

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::config::consts::{RETRY_DELAY_MS, WRITE_ATTEMPTS};
use crate::error::{Error, Result};

/// One async mutex per physical file, created on first use.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub(crate) fn get(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut map = match self.locks.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(path.to_path_buf()).or_default().clone()
    }
}

/// How hard to try before giving up on a file operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: WRITE_ATTEMPTS, delay: Duration::from_millis(RETRY_DELAY_MS) }
    }
}

impl RetryPolicy {
    pub fn immediate(attempts: u32) -> Self {
        Self { attempts, delay: Duration::ZERO }
    }

    async fn attempt<T, F, Fut>(&self, path: &Path, mut op: F) -> std::result::Result<T, (u32, io::Error)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut n = 0;
        loop {
            n += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if n >= attempts => return Err((n, e)),
                Err(e) => {
                    logw!("{} failed (attempt {n}/{attempts}): {e}", path.display());
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }

    /// Retry a write; exhausting the budget is a `PersistenceConflict`.
    pub async fn write<T, F, Fut>(&self, path: &Path, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        self.attempt(path, op).await.map_err(|(attempts, source)| Error::PersistenceConflict {
            path: path.to_path_buf(),
            attempts,
            source,
        })
    }

    /// Retry a read; exhausting the budget is a plain I/O error.
    pub async fn read<T, F, Fut>(&self, path: &Path, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        self.attempt(path, op).await.map_err(|(_, source)| Error::io(path, source))
    }
}
