mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{init, inspect, jobs, version, Workspace};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = match cli.command {
        Commands::Version => version::run(),
        command => {
            let ws = Workspace::resolve(
                cli.home.as_deref(),
                cli.db.as_deref(),
                cli.config.as_deref(),
            )?;
            match command {
                Commands::Init { force } => init::run(&ws, force)?,
                command => run_engine_command(&ws, command)?,
            }
        }
    };
    println!("{output}");
    Ok(())
}

fn run_engine_command(ws: &Workspace, command: Commands) -> anyhow::Result<serde_json::Value> {
    let engine = ws.engine()?;
    match command {
        Commands::Mine => jobs::mine(&engine),
        Commands::Decay { days } => jobs::decay(&engine, days),
        Commands::Predict => jobs::predict(&engine),
        Commands::Resolve { actual } => jobs::resolve(&engine, &actual),
        Commands::Reject { text, workers } => jobs::reject(&engine, &text, &workers),
        Commands::RegisterPattern { category, slot } => {
            jobs::register_pattern(&engine, &category, slot.as_deref())
        }
        Commands::Accuracy => inspect::accuracy(&engine),
        Commands::Stats => inspect::stats(&engine),
        Commands::Pathways { limit } => inspect::pathways(&engine, limit),
        Commands::Pending { limit } => inspect::pending(&engine, limit),
        Commands::Bias { category, text } => {
            inspect::bias(&engine, category.as_deref(), text.as_deref())
        }
        Commands::Categorize { text } => inspect::categorize(&engine, &text),
        Commands::Init { .. } | Commands::Version => {
            anyhow::bail!("command does not run against the engine")
        }
    }
}
