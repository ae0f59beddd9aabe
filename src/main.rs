use anyhow::Result;
use clap::Parser;
use sportsight_client::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.json || args.text;

    let res = cli::run(args).await;
    // Explicitly exit with code 0 on success in scripted modes
    if res.is_ok() && is_non_tui {
        std::process::exit(0);
    }
    res
}
