use crate::{
    commands::{Commands, RunArgs},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::adapter::DriverConnector;
use engine_config::{connections::ConnectionRegistry, settings::PipelineSettings};
use engine_core::{connectors::resolver::ConnectionResolver, logging::RunLogger};
use engine_runtime::execution::{
    executor::Orchestrator,
    pipeline::{ExecutionMode, Pipeline},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

const DEFAULT_CONFIG: &str = "config.json";

#[derive(Parser)]
#[command(name = "etl-runner", version = "0.1.0", about = "Chunked SQL-to-SQL loader")]
struct Cli {
    #[arg(long, global = true, help = "Connection file (JSON, keyed by logical name)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Pipeline settings file (JSON)")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match dispatch(cli, &shutdown).await {
        Ok(()) => ExitCode::Success,
        Err(err) if shutdown.is_shutdown_requested() => {
            error!(error = %err, "Stopped by shutdown request");
            ExitCode::ShutdownRequested
        }
        Err(err) => {
            error!(error = %err, "etl-runner failed");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn dispatch(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let registry = load_registry(cli.config.as_deref())?;
    let mut settings = match &cli.settings {
        Some(path) => PipelineSettings::from_file(path)?,
        None => PipelineSettings::default(),
    };
    let resolver = ConnectionResolver::new(Arc::new(registry), Arc::new(DriverConnector));

    match cli.command {
        Commands::Run(args) => {
            if let Some(schema) = &args.schema {
                settings.target_schema = schema.clone();
            }
            let pipeline = build_pipeline(args).await?;
            let orchestrator = Orchestrator::new(resolver, settings)
                .with_cancellation(shutdown.cancel_token());

            let summary = orchestrator.run(&pipeline).await?;
            output::print_summary(&summary);
        }
        Commands::Status { table } => {
            let logger = RunLogger::new(resolver, settings.log_connection, settings.log_table);
            let step = logger.status(&table).await?;
            println!("{step}");
        }
        Commands::TestConn { name } => {
            conn::ping(&resolver, &name).await?;
        }
        Commands::Exec {
            name,
            sql,
            sql_file,
        } => {
            let script = inline_or_file(sql, sql_file).await?;
            let logger = RunLogger::new(
                resolver.clone(),
                settings.log_connection,
                settings.log_table,
            );
            resolver.exec_sql(&name, &script, &logger).await?;
        }
    }

    Ok(())
}

/// `--config` when given; otherwise `config.json` in the working directory,
/// then `~/.etl-runner/config.json`.
fn load_registry(explicit: Option<&Path>) -> Result<ConnectionRegistry, CliError> {
    if let Some(path) = explicit {
        return Ok(ConnectionRegistry::from_file(path)?);
    }

    let mut candidates = vec![PathBuf::from(DEFAULT_CONFIG)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".etl-runner").join(DEFAULT_CONFIG));
    }

    match candidates.iter().find(|path| path.is_file()) {
        Some(path) => {
            info!(path = %path.display(), "Using connection file");
            Ok(ConnectionRegistry::from_file(path)?)
        }
        None => Err(CliError::MissingConfig(
            candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

async fn build_pipeline(args: RunArgs) -> Result<Pipeline, CliError> {
    let query = inline_or_file(args.query, args.query_file).await?;
    let mode = if args.single_shot {
        ExecutionMode::SingleShot
    } else {
        ExecutionMode::Parallel
    };

    let mut pipeline = Pipeline::new(args.source, query, args.destination, args.table)
        .logging(!args.no_log)
        .mode(mode);
    if let Some(sql) = args.pre_delete {
        pipeline = pipeline.pre_delete(sql);
    }
    if let Some(sql) = args.post_load {
        pipeline = pipeline.post_load(sql);
    }
    Ok(pipeline)
}

/// Inline text wins; clap guarantees one of the two is present.
async fn inline_or_file(inline: Option<String>, file: Option<String>) -> Result<String, CliError> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CliError::FileRead { path, source }),
        (None, None) => Ok(String::new()),
    }
}
