/// Clap argument definitions
mod args;

/// `login` and `logout`
mod auth;

/// Workspace commands
mod workspace;

use clap::Parser;
use std::sync::OnceLock;

use collabspace_core::{Config, DataCenter};

pub use args::Cli;
use args::Commands;

/// Helper to run core futures from the synchronous CLI.
///
/// One runtime for the whole process so pooled HTTP connections stay valid.
fn block_on<F: std::future::Future>(f: F) -> F::Output {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to start async runtime")
        })
        .block_on(f)
}

fn load_config(cli: &Cli) -> collabspace_core::Result<Config> {
    match &cli.config {
        Some(path) if path.exists() => Config::load_from(path),
        Some(_) => Ok(Config::default()),
        None => Config::load(),
    }
}

fn save_config(cli: &Cli, config: &Config) -> collabspace_core::Result<()> {
    match &cli.config {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

/// Open the data center and load every provider's workspace list
fn open_data_center(config: &Config) -> collabspace_core::Result<DataCenter> {
    log::debug!("Opening local database at {}", config.local_db_path.display());
    let data_center = DataCenter::init(config)?;
    block_on(data_center.refresh_workspaces());
    Ok(data_center)
}

fn with_data_center(
    config: &Config,
    f: impl FnOnce(&DataCenter) -> collabspace_core::Result<()>,
) -> collabspace_core::Result<()> {
    let data_center = open_data_center(config)?;
    f(&data_center)
}

/// Main entry point for the CLI. Returns false when the command failed.
pub fn run_cli() -> bool {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return false;
        }
    };

    let filter = if cli.verbose || config.debug {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = match &cli.command {
        Commands::Login { token, server } => {
            auth::handle_login(&cli, config, token, server.as_deref())
        }
        Commands::Logout => auth::handle_logout(&cli, config),
        Commands::List { json } => {
            with_data_center(&config, |dc| workspace::handle_list(dc, *json))
        }
        Commands::Create { name, avatar } => with_data_center(&config, |dc| {
            workspace::handle_create(dc, name, avatar.as_deref())
        }),
        Commands::Rename { id, name } => {
            with_data_center(&config, |dc| workspace::handle_rename(dc, id, name))
        }
        Commands::Delete { id } => with_data_center(&config, |dc| workspace::handle_delete(dc, id)),
        Commands::Publish { id, off } => {
            with_data_center(&config, |dc| workspace::handle_publish(dc, id, !off))
        }
        Commands::EnableCloud { id } => {
            with_data_center(&config, |dc| workspace::handle_enable_cloud(dc, id))
        }
        Commands::Export { id, output } => {
            with_data_center(&config, |dc| workspace::handle_export(dc, id, output))
        }
        Commands::Import { path } => {
            with_data_center(&config, |dc| workspace::handle_import(dc, path))
        }
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}
