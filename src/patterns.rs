// src/patterns.rs
//
// Streak/alternation columns derived from one competition's outcome
// sequence. Column `kx` says whether a match repeated the outcome of the
// match k+1 places earlier.

use std::collections::BTreeMap;

use crate::data::{MatchRecord, Outcome};

pub const PATTERN_COLUMNS: usize = 5;

/// Pattern headers in file column order.
pub fn pattern_headers() -> [&'static str; PATTERN_COLUMNS] {
    ["5x", "4x", "3x", "2x", "1x"]
}

/// Recompute every pattern column.
///
/// Records are grouped by competition (lexical order) and sorted by time
/// slot, then team pair, within each group. Any stored pattern values are
/// discarded, so the result depends only on the set of outcomes.
pub fn compute(records: impl IntoIterator<Item = MatchRecord>) -> Vec<MatchRecord> {
    let mut groups: BTreeMap<String, Vec<MatchRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.competition.clone()).or_default().push(r);
    }

    let mut out = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            a.minutes()
                .cmp(&b.minutes())
                .then_with(|| a.teams.cmp(&b.teams))
                .then_with(|| a.outcome.cmp(&b.outcome))
        });
        let outcomes: Vec<_> = group.iter().map(|r| r.outcome).collect();
        for (i, r) in group.iter_mut().enumerate() {
            for k in 1..=PATTERN_COLUMNS {
                r.patterns[k - 1] = i.checked_sub(k + 1).and_then(|j| lagged(outcomes[i], outcomes[j]));
            }
        }
        out.extend(group);
    }
    out
}

/// Blank only when the earlier outcome is missing; a missing current outcome
/// never equals a present one.
fn lagged(current: Option<Outcome>, earlier: Option<Outcome>) -> Option<Outcome> {
    let earlier = earlier?;
    Some(match current {
        Some(c) => c.agreement(earlier),
        None => Outcome::Nao,
    })
}
