mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{import, init, tree, ImportArgs, InitArgs, TreeArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Vellum CLI - import and inspect design documents
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default vellum.config.json
    Init(InitArgs),

    /// Import Figma JSON or PDF content streams into one document
    Import(ImportArgs),

    /// Print the node hierarchy of an imported file
    Tree(TreeArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Import(args) => import(args, &config, &cwd),
        Command::Tree(args) => tree(args, &config, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
