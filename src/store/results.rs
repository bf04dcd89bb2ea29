// src/store/results.rs
//
// `{history_dir}/matches_{DD-MM-YYYY}.csv`, one table per calendar day.
//
// Header: Date,Competition,Hour,Minute[,Teams],Outcome,5x,4x,3x,2x,1x
// Columns are found by name, so tables written by older collectors (Portuguese
// headers, no Teams, no pattern columns) still load.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;

use super::{PathLocks, RetryPolicy};
use crate::config::consts::STORE_SEP;
use crate::csv::{parse_rows, rows_to_string};
use crate::data::{KeyShape, MatchKey, MatchRecord, Outcome, TeamPair, date_label};
use crate::error::{Error, Result};
use crate::file::{ensure_directory, read_optional, write_atomic};
use crate::patterns::{self, PATTERN_COLUMNS, pattern_headers};

/// What an upsert did to the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New key.
    Inserted,
    /// Existing row had no outcome; it now has one.
    FilledEmpty,
    /// Existing row already had an outcome; the write was discarded.
    KeptExisting,
    /// Neither side had an outcome.
    NoOp,
}

impl UpsertOutcome {
    pub fn changed(self) -> bool {
        matches!(self, UpsertOutcome::Inserted | UpsertOutcome::FilledEmpty)
    }
}

#[derive(Debug)]
pub struct ResultStore {
    dir: PathBuf,
    key_shape: KeyShape,
    retry: RetryPolicy,
    locks: PathLocks,
}

impl ResultStore {
    pub fn open(dir: impl Into<PathBuf>, key_shape: KeyShape, retry: RetryPolicy) -> Result<Self> {
        let dir = dir.into();
        ensure_directory(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Self { dir, key_shape, retry, locks: PathLocks::default() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_shape(&self) -> KeyShape {
        self.key_shape
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("matches_{}.csv", day.format("%d-%m-%Y")))
    }

    /// Every row of the day's table. A missing table is empty.
    ///
    /// Reads take no lock: writers replace the file in one rename.
    pub async fn read_all(&self, day: NaiveDate) -> Result<Vec<MatchRecord>> {
        self.read_path(&self.path_for(day)).await
    }

    pub async fn exists_with_outcome(&self, day: NaiveDate, key: &MatchKey) -> Result<bool> {
        let key = key.clone().for_shape(self.key_shape);
        Ok(self
            .read_all(day)
            .await?
            .iter()
            .any(|r| r.has_outcome() && r.key(self.key_shape) == key))
    }

    /// Keys of the competition's rows that already carry an outcome.
    pub async fn collected_slots(&self, day: NaiveDate, competition: &str) -> Result<HashSet<MatchKey>> {
        Ok(self
            .read_all(day)
            .await?
            .iter()
            .filter(|r| r.competition == competition && r.has_outcome())
            .map(|r| r.key(self.key_shape))
            .collect())
    }

    /// Latest slot with an outcome for the competition, if any.
    pub async fn latest_collected(&self, day: NaiveDate, competition: &str) -> Result<Option<u32>> {
        Ok(self
            .read_all(day)
            .await?
            .iter()
            .filter(|r| r.competition == competition && r.has_outcome())
            .map(MatchRecord::minutes)
            .max())
    }

    /// Insert or fill one row. A row that already has an outcome is never
    /// changed.
    pub async fn upsert(&self, day: NaiveDate, mut record: MatchRecord) -> Result<UpsertOutcome> {
        record.date = date_label(day);
        let path = self.path_for(day);
        let lock = self.locks.get(&path);
        let _guard = lock.lock().await;

        let mut records = self.read_path(&path).await?;
        let key = record.key(self.key_shape);
        let outcome = match records.iter_mut().find(|r| r.key(self.key_shape) == key) {
            None => {
                records.push(record);
                UpsertOutcome::Inserted
            }
            Some(existing) if existing.has_outcome() => UpsertOutcome::KeptExisting,
            Some(existing) if record.has_outcome() => {
                existing.outcome = record.outcome;
                if existing.teams.is_none() {
                    existing.teams = record.teams;
                }
                UpsertOutcome::FilledEmpty
            }
            Some(_) => UpsertOutcome::NoOp,
        };

        if outcome.changed() {
            self.write_path(&path, patterns::compute(records)).await?;
        }
        Ok(outcome)
    }

    /// Rewrite the day's table with freshly derived pattern columns.
    /// Returns the number of rows written.
    pub async fn recompute(&self, day: NaiveDate) -> Result<usize> {
        let path = self.path_for(day);
        let lock = self.locks.get(&path);
        let _guard = lock.lock().await;

        let records = self.read_path(&path).await?;
        if records.is_empty() {
            return Ok(0);
        }
        let records = patterns::compute(records);
        let n = records.len();
        self.write_path(&path, records).await?;
        Ok(n)
    }

    /// Days that have a table, newest first.
    pub async fn list_days(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| Error::io(&self.dir, e))?;
        let mut days = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&self.dir, e))? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_prefix("matches_")?.strip_suffix(".csv"))
            else {
                continue;
            };
            if let Ok(day) = NaiveDate::parse_from_str(stem, "%d-%m-%Y") {
                days.push(day);
            }
        }
        days.sort_unstable_by(|a, b| b.cmp(a));
        Ok(days)
    }

    async fn read_path(&self, path: &Path) -> Result<Vec<MatchRecord>> {
        let text = self.retry.read(path, || read_optional(path)).await?;
        match text {
            None => Ok(Vec::new()),
            Some(text) => decode_table(&text)
                .map_err(|reason| Error::Corrupt { path: path.to_path_buf(), reason }),
        }
    }

    async fn write_path(&self, path: &Path, records: Vec<MatchRecord>) -> Result<()> {
        let with_teams = self.key_shape == KeyShape::SlotAndTeams || records.iter().any(|r| r.teams.is_some());
        let bytes = encode_table(&records, with_teams).into_bytes();
        self.retry.write(path, || write_atomic(path, &bytes)).await
    }
}

/* ---------------- Table codec ---------------- */

const DATE: &[&str] = &["Date", "Data"];
const COMPETITION: &[&str] = &["Competition", "Competição", "Competicao"];
const HOUR: &[&str] = &["Hour", "Hora"];
const MINUTE: &[&str] = &["Minute", "Minuto"];
const TEAMS: &[&str] = &["Teams", "Times"];
const OUTCOME: &[&str] = &["Outcome", "Ambos Marcam"];

fn column(header: &[String], names: &[&str]) -> Option<usize> {
    header.iter().position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Whole numbers, tolerating the `9.0` spreadsheets write back.
fn parse_number(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    cell.parse().ok().or_else(|| {
        let f: f64 = cell.parse().ok()?;
        (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
    })
}

/// Parse a table. Rows that cannot be read are skipped with a warning; a
/// table whose header lacks a required column is an error.
pub fn decode_table(text: &str) -> std::result::Result<Vec<MatchRecord>, String> {
    let mut rows = parse_rows(text, STORE_SEP).into_iter();
    let Some(header) = rows.next() else { return Ok(Vec::new()) };

    let required = |names: &[&str]| {
        column(&header, names).ok_or_else(|| format!("missing column {:?}", names[0]))
    };
    let date = required(DATE)?;
    let competition = required(COMPETITION)?;
    let hour = required(HOUR)?;
    let minute = required(MINUTE)?;
    let outcome = required(OUTCOME)?;
    let teams = column(&header, TEAMS);
    let pattern_cols: Vec<Option<usize>> =
        pattern_headers().into_iter().map(|h| column(&header, &[h])).collect();

    let mut out = Vec::new();
    for (line, row) in rows.enumerate() {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let comp = cell(competition).trim();
        let (Some(h), Some(m)) = (parse_number(cell(hour)), parse_number(cell(minute))) else {
            logw!("Skipping table row {}: bad hour/minute", line + 2);
            continue;
        };
        if comp.is_empty() || m > 59 {
            logw!("Skipping table row {}: incomplete", line + 2);
            continue;
        }

        let mut patterns = [None; PATTERN_COLUMNS];
        // file order is 5x..1x
        for (file_idx, col) in pattern_cols.iter().enumerate() {
            patterns[PATTERN_COLUMNS - 1 - file_idx] = col.and_then(|c| Outcome::parse(cell(c)));
        }

        out.push(MatchRecord {
            date: cell(date).trim().to_string(),
            competition: comp.to_string(),
            hour: h,
            minute: m,
            teams: teams.and_then(|c| TeamPair::parse(cell(c))),
            outcome: Outcome::parse(cell(outcome)),
            patterns,
        });
    }
    Ok(out)
}

/// Render a table, BOM first so spreadsheet tools pick UTF-8.
pub fn encode_table(records: &[MatchRecord], with_teams: bool) -> String {
    let mut header: Vec<String> = ["Date", "Competition", "Hour", "Minute"].map(String::from).to_vec();
    if with_teams {
        header.push("Teams".into());
    }
    header.push("Outcome".into());
    header.extend(pattern_headers().map(String::from));

    let opt = |o: Option<Outcome>| o.map(|o| o.as_str().to_string()).unwrap_or_default();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            let mut row = vec![r.date.clone(), r.competition.clone(), r.hour.to_string(), r.minute.to_string()];
            if with_teams {
                row.push(r.teams.as_ref().map(|t| t.to_string()).unwrap_or_default());
            }
            row.push(opt(r.outcome));
            row.extend(r.patterns.iter().rev().map(|p| opt(*p)));
            row
        })
        .collect();

    format!("\u{feff}{}", rows_to_string(&header, &rows, STORE_SEP))
}
