pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "leadgate",
    about = "Leadgate operator CLI",
    long_about = "Inspect effective gateway configuration, tenant readiness, and required environment.",
    after_help = "Examples:\n  leadgate doctor --json\n  leadgate config\n  leadgate clients"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, tenant credentials, and required environment variables")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List configured clients and whether each would register at startup")]
    Clients,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Clients => commands::clients::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
