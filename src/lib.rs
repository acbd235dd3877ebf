pub mod cli;
pub mod commands;
pub mod config;
pub mod helpers;
pub mod id;
pub mod llm;
pub mod models;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod sandbox;
pub mod store;
pub mod templates;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, TemplateCommands};
use config::Config;
use llm::GeminiClient;
use models::ExecutionResult;
use pipeline::Pipeline;
use sandbox::Executor;
use store::ArtifactStore;

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn build_pipeline(config: &Config, timeout: Option<u64>) -> Result<Pipeline> {
    let timeout = match timeout {
        Some(0) => bail!("--timeout must be greater than zero"),
        Some(secs) => Duration::from_secs(secs),
        None => config.timeout(),
    };
    let executor =
        Executor::new(config.runtime.interpreter.clone()).with_policy(config.sandbox.clone());
    Ok(Pipeline::new(
        ArtifactStore::new(&config.output_dir),
        executor,
        timeout,
    ))
}

fn exit_code(result: &ExecutionResult) -> ExitCode {
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let store = ArtifactStore::new(&config.output_dir);

    match cli.command {
        Commands::Generate(args) => {
            // Input errors surface before the key is even looked at.
            commands::generate::build_request(&args)?;
            let pipeline = build_pipeline(&config, args.timeout)?;
            let agent = GeminiClient::new(&config.llm, config.api_key()?)
                .context("Failed to create model client")?;
            let outcome = commands::generate::run(&args, &pipeline, &agent).await?;
            output::generated(&outcome, args.json)?;
            Ok(exit_code(&outcome.result))
        }
        Commands::Render {
            script,
            name,
            overwrite,
            timeout,
            json,
        } => {
            let pipeline = build_pipeline(&config, timeout)?;
            let outcome = commands::render::run(&script, name, overwrite, &pipeline).await?;
            output::rendered(&outcome, json)?;
            Ok(exit_code(&outcome.result))
        }
        Commands::List { json } => {
            let artifacts = commands::list::run(&store)?;
            output::artifact_list(&artifacts, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { name, json } => {
            let result = commands::show::run(&name, &store)?;
            output::show(&result, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Export { name, dest, json } => {
            let outcome = commands::export::run(&name, &dest, &store)?;
            output::exported(&outcome, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear { force, json } => {
            let outcome = commands::clear::run(force, &store)?;
            output::cleared(&outcome, store.dir(), json)?;
            if outcome.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Templates(TemplateCommands::List { json }) => {
            output::template_list(commands::templates::list(), json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Templates(TemplateCommands::Show { name, json }) => {
            output::template(commands::templates::show(&name)?, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { json } => {
            output::config(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
