//! # Command Line Interface
//!
//! Starts the API server and runs database maintenance commands.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{start_api_server, ApiState};
use crate::config::AppConfig;
use crate::observability::{init_observability, log_config_info};
use crate::storage::{
    create_pool, get_migration_version, list_applied_migrations, run_db_migrations,
    validate_migrations, MigrationInfo,
};
use crate::{APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "school-api")]
#[command(about = "School API: organizations and student accounts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (TOML or YAML); environment variables still apply on top
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Run pending migrations
    Migrate,

    /// Show applied migrations and whether the schema is current
    Status,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    match cli.command.unwrap_or(Commands::Serve { port: None, addr: None }) {
        Commands::Serve { port, addr } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(addr) = addr {
                config.server.host = addr;
            }
            config.validate().context("invalid configuration")?;
            serve(config).await?;
        }
        Commands::Migrate => migrate(config).await?,
        Commands::Status => status(config).await?,
    }

    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    init_observability(&config.observability).await.context("failed to initialise observability")?;
    info!(app_name = APP_NAME, version = VERSION, "Starting School API");
    log_config_info(&config);
    if config.auth.uses_default_secret() {
        warn!(
            "JWT secret is the built-in default; set SCHOOL_API__AUTH__JWT_SECRET before exposing this server"
        );
    }

    let pool = create_pool(&config.database).await.context("failed to open database")?;
    let state = ApiState::new(pool, config)?;

    start_api_server(state).await?;
    Ok(())
}

async fn migrate(mut config: AppConfig) -> anyhow::Result<()> {
    crate::observability::init_logging(&config.observability)?;
    config.database.auto_migrate = false;
    let pool = create_pool(&config.database).await?;

    println!("Running database migrations...");
    run_db_migrations(&pool).await?;
    println!("Migrations completed successfully! Schema version: {}", get_migration_version(&pool).await?);
    Ok(())
}

async fn status(mut config: AppConfig) -> anyhow::Result<()> {
    crate::observability::init_logging(&config.observability)?;
    config.database.auto_migrate = false;
    let pool = create_pool(&config.database).await?;

    let migrations = list_applied_migrations(&pool).await?;
    if migrations.is_empty() {
        println!("No migrations have been applied");
    } else {
        println!("Applied migrations:");
        print_migrations_table(&migrations);
    }

    if validate_migrations(&pool).await? {
        println!("Database schema is up to date");
    } else {
        println!("Database schema has pending or modified migrations");
        process::exit(1);
    }

    Ok(())
}

/// Print migrations in a formatted table
fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!();
    println!("{:<15} {:<40} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(90));

    for migration in migrations {
        println!(
            "{:<15} {:<40} {:<25} {:<10}",
            migration.version,
            truncate_string(&migration.description, 38),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["school-api", "--config", "school.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("school.toml")));

        let cli = Cli::try_parse_from(["school-api", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000), addr: None })));

        let cli = Cli::try_parse_from(["school-api", "status", "-v"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Status)));
        assert!(cli.verbose);
    }

    #[test]
    fn truncation_keeps_short_strings() {
        assert_eq!(truncate_string("seed_roles", 38), "seed_roles");
        assert_eq!(truncate_string("abcdefghij", 6), "abc...");
    }
}
