mod api;
mod cli;
mod config;
mod lifecycle;
mod logging;
mod model;
mod orchestrator;
mod source;
mod storage;
mod store;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_json = args.json;

    if args.opens_dashboard() {
        if let Err(e) = logging::init_file() {
            eprintln!("Logging disabled: {e:#}");
        }
    } else {
        logging::init_stderr();
    }

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_json {
                // Keep stdout machine-readable when scripted.
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
