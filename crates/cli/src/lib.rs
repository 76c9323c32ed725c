pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "herald",
    about = "Herald operator CLI",
    long_about = "Operate the Herald mission pipeline: migrations, readiness checks, \
                  one-shot mission runs, and mission inspection.",
    after_help = "Examples:\n  herald doctor --json\n  herald run --user U-1 --prompt \"Launch \
                  our podcast on LinkedIn\"\n  herald show <mission-id>"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Validate config, llm credentials, and mission store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create a mission and run its workflow to a resting status")]
    Run {
        #[arg(long, help = "Id of the user who owns the mission")]
        user: String,
        #[arg(long, help = "Free-text campaign request")]
        prompt: String,
    },
    #[command(about = "Print a mission with its stage results and agent logs")]
    Show {
        #[arg(help = "Mission id")]
        mission_id: String,
    },
}

fn init_logging() {
    use herald_core::config::{AppConfig, LoadOptions};
    use tracing::Level;

    // Stdout carries the JSON command payload; diagnostics go to stderr.
    let level = AppConfig::load(LoadOptions::default())
        .ok()
        .and_then(|config| config.logging.level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Run { user, prompt } => commands::run::run(&user, &prompt),
        Command::Show { mission_id } => commands::show::run(&mission_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
