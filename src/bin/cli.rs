// src/bin/cli.rs
use clap::Parser;
use vf_scrape::{cli, log};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = cli::Cli::parse();
    log::init(args.verbose)?;
    cli::run(args).await
}
