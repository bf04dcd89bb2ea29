// src/cli.rs
//
// Maintenance commands over the stores. The collector itself needs a page
// session and is started through `runner::run`.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};

use crate::config::Config;
use crate::config::consts::{CONFIG_FILE, STORE_SEP};
use crate::core::time::format_minutes;
use crate::data::MatchRecord;
use crate::runner::Stores;

#[derive(Parser, Debug)]
#[command(name = "vf_scrape")]
#[command(about = "Inspect and maintain collected virtual-football results", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List days that have a result table
    Days,
    /// Print a day's table
    Show {
        /// YYYY-MM-DD or DD/MM/YYYY; today if omitted
        #[arg(long, value_parser = parse_day)]
        day: Option<NaiveDate>,
        #[arg(long)]
        competition: Option<String>,
    },
    /// Rewrite pattern columns
    Recompute {
        #[arg(long, value_parser = parse_day, conflicts_with = "all")]
        day: Option<NaiveDate>,
        /// Every table in the history directory
        #[arg(long)]
        all: bool,
    },
    /// Inspect or override anchors
    Anchor {
        #[command(subcommand)]
        action: AnchorCommand,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum AnchorCommand {
    /// Show the anchors stored for a day
    Show {
        #[arg(long, value_parser = parse_day)]
        day: Option<NaiveDate>,
    },
    /// Pin every configured competition's anchor to HOUR:00 today
    Set {
        #[arg(value_parser = clap::value_parser!(u32).range(0..24))]
        hour: u32,
    },
}

pub fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%m-%Y"))
        .map_err(|_| format!("not a date: {s} (use YYYY-MM-DD or DD/MM/YYYY)"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let stores = Stores::open(&config)?;
    match cli.command {
        Commands::Days => {
            for day in stores.results.list_days().await? {
                println!("{}", day.format("%Y-%m-%d"));
            }
        }
        Commands::Show { day, competition } => {
            let day = day.unwrap_or_else(today);
            let rows = stores.results.read_all(day).await?;
            let rows: Vec<&MatchRecord> = rows
                .iter()
                .filter(|r| competition.as_deref().is_none_or(|c| r.competition == c))
                .collect();
            if rows.is_empty() {
                println!("No results for {}", day.format("%Y-%m-%d"));
            }
            for r in rows {
                println!("{}", format_row(r));
            }
        }
        Commands::Recompute { day, all } => {
            let days = if all {
                stores.results.list_days().await?
            } else {
                vec![day.unwrap_or_else(today)]
            };
            for day in days {
                let n = stores.results.recompute(day).await?;
                println!("{}: {n} rows", day.format("%Y-%m-%d"));
            }
        }
        Commands::Anchor { action: AnchorCommand::Show { day } } => {
            let day = day.unwrap_or_else(today);
            let anchors = stores.anchors.load_day(day).await?;
            if anchors.is_empty() {
                println!("No anchors for {}", day.format("%Y-%m-%d"));
            }
            for (competition, minutes) in anchors {
                println!("{competition}: {}", format_minutes(minutes));
            }
        }
        Commands::Anchor { action: AnchorCommand::Set { hour } } => {
            if config.competitions.is_empty() {
                bail!("no competitions configured");
            }
            stores.anchors.set_all(today(), &config.competitions, hour).await?;
            println!("Anchor {} set for: {}", format_minutes(hour * 60), config.competitions.join(", "));
        }
        Commands::Config => {}
    }
    Ok(())
}

fn format_row(r: &MatchRecord) -> String {
    let cell = |o: Option<crate::data::Outcome>| o.map_or("-", |o| o.as_str());
    let sep = STORE_SEP.to_string();
    let patterns: Vec<&str> = r.patterns.iter().rev().map(|p| cell(*p)).collect();
    format!(
        "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
        r.date,
        r.competition,
        format_minutes(r.minutes()),
        r.teams.as_ref().map(|t| t.to_string()).unwrap_or_default(),
        cell(r.outcome),
        patterns.join(sep.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn day_accepts_both_formats() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(parse_day("2026-03-01"), Ok(d));
        assert_eq!(parse_day("01/03/2026"), Ok(d));
        assert!(parse_day("March 1").is_err());
    }

    #[test]
    fn parses_anchor_set() {
        let cli = Cli::try_parse_from(["vf_scrape", "anchor", "set", "9"]).unwrap();
        assert!(matches!(cli.command, Commands::Anchor { action: AnchorCommand::Set { hour: 9 } }));
        assert!(Cli::try_parse_from(["vf_scrape", "anchor", "set", "24"]).is_err());
        assert!(Cli::try_parse_from(["vf_scrape", "recompute", "--all", "--day", "2026-03-01"]).is_err());
    }
}
