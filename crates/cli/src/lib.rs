pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use callscript_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

use crate::commands::{render::RenderArgs, resolve::ResolveArgs, validate::ValidateArgs};

#[derive(Debug, Parser)]
#[command(
    name = "callscript",
    about = "Call-script operator CLI",
    long_about = "Inspect configuration, lint call scripts, and replay caller resolution and node rendering against exported CRM records.",
    after_help = "Examples:\n  callscript config\n  callscript validate --script scripts/energy.toml\n  callscript render --people people.json --accounts accounts.json --number 9725551234 --path Speaking,\"Go ahead\""
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of callscript.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Agent first name used by {{agent.first_name}}")]
    agent: Option<String>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Load a script and report dangling edges and unreachable nodes")]
    Validate(ValidateArgs),
    #[command(about = "Resolve the caller against exported contact and account records")]
    Resolve(ResolveArgs),
    #[command(about = "Walk the script and print the rendered dialog node")]
    Render(RenderArgs),
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                agent_first_name: self.agent.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => commands::config::run(&options),
        Command::Validate(args) => commands::validate::run(&options, &args),
        Command::Resolve(args) => commands::resolve::run(&options, &args),
        Command::Render(args) => commands::render::run(&options, &args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
