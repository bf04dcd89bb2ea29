// src/store/anchors.rs
//
// `{anchor_dir}/anchor_time_{YYYY-MM-DD}.json`, one object per day mapping
// competition -> "HH.MM". Every competition shares the day file, so saves
// merge into it under the file's lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::{PathLocks, RetryPolicy};
use crate::core::time::{format_minutes, parse_label};
use crate::error::{Error, Result};
use crate::file::{ensure_directory, read_optional, write_atomic};

type DayFile = BTreeMap<String, String>;

#[derive(Debug)]
pub struct AnchorStore {
    dir: PathBuf,
    retry: RetryPolicy,
    locks: PathLocks,
}

impl AnchorStore {
    /// Open (creating if needed) the anchor directory.
    pub fn open(dir: impl Into<PathBuf>, retry: RetryPolicy) -> Result<Self> {
        let dir = dir.into();
        ensure_directory(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Self { dir, retry, locks: PathLocks::default() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("anchor_time_{}.json", day.format("%Y-%m-%d")))
    }

    /// Stored anchor for `competition` on `day`, if any.
    pub async fn load(&self, day: NaiveDate, competition: &str) -> Result<Option<u32>> {
        Ok(self.load_day(day).await?.get(competition).copied())
    }

    /// Every anchor stored for `day`. Entries that do not parse are skipped.
    pub async fn load_day(&self, day: NaiveDate) -> Result<BTreeMap<String, u32>> {
        let path = self.path_for(day);
        let raw = self.read_file(&path).await?;
        let mut out = BTreeMap::new();
        for (competition, label) in raw {
            match parse_label(&label) {
                Ok(minutes) => { out.insert(competition, minutes); }
                Err(e) => logw!("Ignoring anchor {competition:?} in {}: {e}", path.display()),
            }
        }
        Ok(out)
    }

    /// Merge `minutes` into the day file. The stored value only ever grows;
    /// returns the value in effect after the save.
    pub async fn save(&self, day: NaiveDate, competition: &str, minutes: u32) -> Result<u32> {
        let path = self.path_for(day);
        let lock = self.locks.get(&path);
        let _guard = lock.lock().await;

        let mut file = self.read_file(&path).await?;
        let stored = file.get(competition).and_then(|l| parse_label(l).ok());
        let effective = stored.map_or(minutes, |s| s.max(minutes));
        if stored == Some(effective) {
            return Ok(effective);
        }
        file.insert(competition.to_string(), format_minutes(effective));
        self.write_file(&path, &file).await?;
        logd!("Anchor {competition} -> {}", format_minutes(effective));
        Ok(effective)
    }

    /// Operator override: pin every listed competition to `hour`:00, even if
    /// that moves an anchor backwards. Other entries are left alone.
    pub async fn set_all(&self, day: NaiveDate, competitions: &[String], hour: u32) -> Result<()> {
        let path = self.path_for(day);
        let lock = self.locks.get(&path);
        let _guard = lock.lock().await;

        let mut file = self.read_file(&path).await?;
        let label = format_minutes(hour * 60);
        for competition in competitions {
            file.insert(competition.clone(), label.clone());
        }
        self.write_file(&path, &file).await?;
        logf!("Global anchor {label} set for {} competitions", competitions.len());
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<DayFile> {
        let text = self.retry.read(path, || read_optional(path)).await?;
        let Some(text) = text else { return Ok(DayFile::new()) };
        if text.trim().is_empty() {
            return Ok(DayFile::new());
        }
        match serde_json::from_str::<DayFile>(&text) {
            Ok(map) => Ok(map),
            Err(e) => {
                logw!("Anchor file {} is unreadable, starting empty: {e}", path.display());
                Ok(DayFile::new())
            }
        }
    }

    async fn write_file(&self, path: &Path, file: &DayFile) -> Result<()> {
        let bytes = encode(file).map_err(|source| Error::Json { path: path.to_path_buf(), source })?;
        self.retry.write(path, || write_atomic(path, &bytes)).await
    }
}

fn encode(file: &DayFile) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    file.serialize(&mut ser)?;
    Ok(buf)
}
