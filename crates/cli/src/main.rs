use crate::{
    commands::Commands,
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_config::settings::MigrationSettings;
use engine_runtime::{error::MigrationError, factory::Runtime, reset, step::StepName};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "shopmig", version = "0.1.0", about = "Shop data migration tool")]
struct Cli {
    #[arg(long, global = true, default_value = "shopmig.json", help = "Settings file path")]
    config: PathBuf,

    #[arg(long, global = true, help = "Env file with ${VAR} values (default: ./.env if present)")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => ExitCode::Success,
        Err(CliError::Runner(MigrationError::Interrupted)) => {
            info!("Migration interrupted, rerun to continue");
            ExitCode::ShutdownRequested
        }
        Err(CliError::Runner(err @ MigrationError::StepFailed { .. })) => {
            error!("{err}");
            ExitCode::StepFailed
        }
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::RunStep { step, json } => {
            let step: StepName = step.parse()?;
            let runtime = Runtime::from_settings(&settings).await?;
            let orchestrator = runtime.orchestrator(&settings, None)?;
            let token = orchestrator.run_chunk(step).await?;
            output::print_reports(&output::reports(&[token]), json)?;
        }
        Commands::Migrate { json } => {
            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            let runtime = Runtime::from_settings(&settings).await?;
            let orchestrator = runtime.orchestrator(&settings, Some(shutdown.cancel_token()))?;
            let tokens = orchestrator.run_all(&shutdown.cancel_token()).await?;
            output::print_reports(&output::reports(&tokens), json)?;
        }
        Commands::Clear {
            section,
            keep_tokens,
        } => {
            let sections = commands::sections(&section);
            let runtime = Runtime::from_settings(&settings).await?;
            let removed = reset::clear_shop(
                runtime.target.as_ref(),
                runtime.mappings.as_ref(),
                &sections,
            )
            .await?;
            if !keep_tokens {
                runtime.orchestrator(&settings, None)?.reset_tokens().await?;
            }
            println!("Cleared {} section(s), removed {removed} mapping(s)", sections.len());
        }
        Commands::Progress { json } => {
            let runtime = Runtime::from_settings(&settings).await?;
            let tokens = runtime.orchestrator(&settings, None)?.tokens().await?;
            output::print_reports(&output::reports(&tokens), json)?;
        }
        Commands::TestConn => conn::test_connections(&settings).await?,
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<MigrationSettings, CliError> {
    let mut env = EnvManager::from_process();
    match &cli.env_file {
        Some(path) => env.load_from_file(path)?,
        None => {
            env.load_if_present(".env")?;
        }
    }
    let settings = MigrationSettings::load(&cli.config, env.all())?;
    info!(config = %cli.config.display(), run_id = %settings.run_id, "Settings loaded");
    Ok(settings)
}
