use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudctl::commands::{self, DeleteCmd, ListCmd, OperationRef, WaitCmd};
use cloudctl::config::Config;
use cloudctl::gcp::client::GcpClient;
use cloudctl::output::OutputFormat;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// Command-line front end for Compute Engine style control-plane APIs
#[derive(Parser, Debug)]
#[command(name = "cloudctl", version, about, long_about = None)]
struct Cli {
    /// Project to operate on
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// API host override (testing or staging endpoints)
    #[arg(long, global = true)]
    api_host: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format for listings
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resources across zones, regions, or the global scope
    List(ListCmd),

    /// Delete resources and wait for the backend operations to finish
    Delete(DeleteCmd),

    /// List the project's zones
    Zones,

    /// List the project's regions
    Regions,

    /// Inspect or wait on backend operations
    Operations {
        #[command(subcommand)]
        command: OperationsCommand,
    },

    /// Print the known resource types
    Resources,
}

#[derive(Subcommand, Debug)]
enum OperationsCommand {
    /// Fetch the current status of one operation
    Get(OperationRef),

    /// Poll an existing operation until it reaches a terminal state
    Wait(WaitCmd),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("warning: cannot open log file {}: {}", path.display(), err);
                return None;
            }
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        tracing_subscriber::fmt()
            .with_max_level(tracing_level)
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
    None
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = setup_logging(cli.log_level, cli.log_file.as_ref());

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load();

    // The registry listing needs no project or client.
    if matches!(cli.command, Command::Resources) {
        return commands::run_resources(cli.format);
    }

    let project = cli
        .project
        .clone()
        .or_else(|| config.effective_project())
        .context(
            "no project configured; pass --project, set GOOGLE_CLOUD_PROJECT, \
             or run 'gcloud config set project'",
        )?;
    let api_host = cli
        .api_host
        .clone()
        .unwrap_or_else(|| config.effective_api_host());

    tracing::info!("using project {} against {}", project, api_host);
    let client = GcpClient::new(&project, &api_host).await?;

    // Ctrl-C stops new submissions and polls; in-flight requests finish.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; winding down");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Command::List(cmd) => commands::run_list(&client, cmd, cli.format).await,
        Command::Delete(cmd) => commands::run_delete(&client, &cancel, cmd, &config).await,
        Command::Zones => commands::run_scope_listing(&client, "zones", cli.format).await,
        Command::Regions => commands::run_scope_listing(&client, "regions", cli.format).await,
        Command::Operations { command } => match command {
            OperationsCommand::Get(op) => commands::run_operation_get(&client, op, cli.format).await,
            OperationsCommand::Wait(cmd) => commands::run_operation_wait(&client, &cancel, cmd).await,
        },
        Command::Resources => unreachable!("handled above"),
    }
}
