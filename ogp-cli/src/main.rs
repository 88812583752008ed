mod api;
mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use ogp_core::OgpError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ogp")]
#[command(about = "OGP game backend - register games and share creator rewards")]
#[command(version)]
struct Cli {
    /// Data directory for the database and local assets
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite database file (defaults to DATABASE_PATH or <data-dir>/games.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP backend
    Serve(commands::ServeArgs),

    /// Inspect and maintain locally mirrored games
    #[command(subcommand)]
    Game(commands::GameCommands),

    /// Inspect locally known users
    #[command(subcommand)]
    User(commands::UserCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "ogp={0},ogp_core={0},tower_http=info",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CliConfig::default();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let database = config.database_path(cli.database);

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let result = match cli.command {
        Commands::Serve(args) => commands::handle_serve_command(args, &config, database).await,
        Commands::Game(cmd) => commands::handle_game_command(cmd, &database).await,
        Commands::User(cmd) => commands::handle_user_command(cmd, &database).await,
    };

    if let Err(e) = result {
        match e {
            OgpError::GameNotFound { game_id } => {
                eprintln!("Error: Game '{}' not found", game_id);
                eprintln!("Use 'ogp game list' to see mirrored games");
            }
            OgpError::UserNotFound { email } => {
                eprintln!("Error: User '{}' not found", email);
                eprintln!("Use 'ogp user list' to see known users");
            }
            OgpError::Config(msg) => {
                eprintln!("Error: Invalid configuration: {}", msg);
                eprintln!("OGP_API_KEY and OGP_SECRET_KEY must be set to serve");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
