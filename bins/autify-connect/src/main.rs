use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use connect_access_point::{
    load_static_access_point, save_access_point, user_agent, EnvFileConfigStore,
};
use connect_client_management::{
    AccessPointSource, ClientManager, ClientManagerConfig, ExitOptions,
};

/// Autify Connect - run the Autify Connect client from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Autify Connect client and wait until it exits
    Start(StartArgs),

    /// Manage the static Access Point
    #[command(subcommand)]
    AccessPoint(AccessPointCommand),
}

#[derive(Args, Debug)]
struct StartArgs {
    /// Verbose output, also passed to the client
    #[arg(short, long)]
    verbose: bool,

    /// Write client logs to a file instead of the console
    #[arg(long)]
    file_logging: bool,

    /// Port for the client's debug server (a free port by default)
    #[arg(long, value_name = "PORT")]
    debug_server_port: Option<u16>,

    /// Extra arguments passed to the client, e.g. "--tunnel-proxy http://proxy"
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    extra_arguments: Option<String>,

    /// Create an ephemeral Access Point in this Autify for Web workspace
    #[arg(long, value_name = "ID")]
    web_workspace_id: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum AccessPointCommand {
    /// Save a static Access Point. The key is read from stdin.
    Set {
        /// Access Point name
        #[arg(short, long)]
        name: String,

        /// Overwrite an Access Point that is already set
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Command::Start(args) if args.verbose);
    initialize_logging(verbose)?;

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Start(args) => start(config, args).await,
        Command::AccessPoint(AccessPointCommand::Set { name, force }) => {
            set_access_point(&config, &name, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn initialize_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientManagerConfig> {
    match path {
        Some(path) => {
            info!("Config file: {}", path.display());
            ClientManagerConfig::load_from_file(path)
        }
        None => ClientManagerConfig::with_default_dirs(),
    }
}

async fn start(mut config: ClientManagerConfig, args: StartArgs) -> Result<ExitCode> {
    config.verbose |= args.verbose;
    config.file_logging |= args.file_logging;
    if args.debug_server_port.is_some() {
        config.debug_server_port = args.debug_server_port;
    }
    if args.extra_arguments.is_some() {
        config.extra_arguments = args.extra_arguments;
    }

    let source = match args.web_workspace_id {
        Some(workspace_id) => {
            let store = EnvFileConfigStore::new(config.config_dir.clone());
            let base = format!("autify-connect/{}", env!("CARGO_PKG_VERSION"));
            AccessPointSource::Ephemeral {
                workspace_id,
                user_agent: user_agent(&base, &store),
            }
        }
        None => AccessPointSource::Static,
    };

    let manager = ClientManager::create(config, source)
        .await
        .context("Failed to prepare Autify Connect Client")?;
    info!(access_point = %manager.access_point_name(), "Access Point");

    if let Err(e) = manager.start().await {
        error!("Failed to start Autify Connect Client: {}", e);
        manager.exit(ExitOptions { ignore_error: true }).await?;
        return Err(e.into());
    }
    if let Some(warning) = manager.version_warning() {
        warn!("{}", warning);
    }

    if let Err(e) = manager.once_ready().await {
        error!("Autify Connect Client failed to connect: {}", e);
        manager.exit(ExitOptions { ignore_error: true }).await?;
        return Err(e.into());
    }
    info!("Autify Connect Client is ready. Press Ctrl+C to stop.");

    match manager.once_done().await? {
        Some(code) => {
            info!("Autify Connect Client exited with code {}", code);
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        None => {
            warn!("Exit status of Autify Connect Client is unknown");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn set_access_point(config: &ClientManagerConfig, name: &str, force: bool) -> Result<()> {
    let store = EnvFileConfigStore::new(config.config_dir.clone()).without_env_override();

    if let Ok(existing) = load_static_access_point(&store) {
        if !force {
            bail!(
                "Access Point {} is already set. Use --force to overwrite it.",
                existing.name
            );
        }
        warn!(access_point = %existing.name, "Overwriting the current Access Point");
    }

    eprintln!("Enter the Access Point key:");
    let mut key = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut key)
        .context("Failed to read the Access Point key from stdin")?;

    save_access_point(&store, name, &key)?;
    info!(access_point = %name.trim(), "Access Point is set");
    Ok(())
}
