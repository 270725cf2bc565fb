pub mod analysis;
pub mod cli;
pub mod commands;
pub mod models;

use clap::Parser;

/// Parses the command line, runs the command and prints its JSON result.
pub async fn run() -> Result<(), String> {
    let cli = cli::Cli::parse();
    let output = cli::execute(cli).await?;
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| format!("Failed to render output: {e}"))?;
    println!("{rendered}");
    Ok(())
}
