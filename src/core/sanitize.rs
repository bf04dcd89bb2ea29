// src/core/sanitize.rs
//
// Raw list-button text -> (time label, team pair).

use crate::data::TeamPair;

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

fn looks_like_time(s: &str) -> bool {
    (s.contains('.') || s.contains(':')) && s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn split_versus(s: &str) -> Option<TeamPair> {
    let (home, away) = s.split_once(" v ").or_else(|| s.split_once(" x "))?;
    let (home, away) = (normalize_ws(home), normalize_ws(away));
    (!home.is_empty() && !away.is_empty()).then(|| TeamPair::new(home, away))
}

/// Split the text of a result button into its time label and teams.
///
/// The list renders a match in one of three ways:
/// - three lines: time, home, away
/// - two lines, `"3.02 Inglaterra"` then the away team
/// - two lines, time then `"Home v Away"` (or `x`)
///
/// A single line may carry everything (`"9.30 Home v Away"`). Returns `None`
/// when no time label can be found at all.
pub fn split_item_text(text: &str) -> Option<(String, Option<TeamPair>)> {
    let lines: Vec<String> = text
        .lines()
        .map(normalize_ws)
        .filter(|l| !l.is_empty())
        .collect();

    match lines.as_slice() {
        [] => None,
        [only] => {
            let (time, rest) = only.split_once(' ').unwrap_or((only.as_str(), ""));
            looks_like_time(time).then(|| (time.to_string(), split_versus(rest)))
        }
        [first, second] => {
            match first.split_once(' ') {
                Some((time, home)) if looks_like_time(time) => {
                    Some((time.to_string(), Some(TeamPair::new(home, second.as_str()))))
                }
                _ => Some((first.clone(), split_versus(second))),
            }
        }
        [time, home, away, ..] => {
            Some((time.clone(), Some(TeamPair::new(home.as_str(), away.as_str()))))
        }
    }
}
