use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{load_config, Config, LogFormat};
use database::{connect, run_migrations, PgEnrollmentStore};
use enrollment::EnrollmentCoordinator;
use std::path::PathBuf;
use std::process::ExitCode;

/// The main entry point for the Campus enrollment service.
#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file, if one exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match load_settings(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match configuration::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Serve => web_server::run_server(config).await,
        Commands::Migrate => handle_migrate(&config).await,
        Commands::Enroll(args) => handle_enroll(args, &config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed.");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Student and teacher enrollment management backend.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to ./config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the console log format from the configuration file.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Enroll a student into a subject, taking one seat.
    Enroll(EnrollArgs),
}

#[derive(Parser)]
struct EnrollArgs {
    /// The user id of the student.
    #[arg(long)]
    student_id: i32,

    /// The id of the subject to enroll into.
    #[arg(long)]
    subject_id: i32,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = load_config(cli.config.as_deref()).context("invalid configuration")?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    Ok(config)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = connect(&config.database).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied.");
    println!("Migrations applied.");
    Ok(())
}

/// Runs one seat-checked enrollment and prints the created record as JSON.
async fn handle_enroll(args: EnrollArgs, config: &Config) -> anyhow::Result<()> {
    let pool = connect(&config.database).await?;
    let coordinator = EnrollmentCoordinator::new(PgEnrollmentStore::new(pool));

    let enrollment = coordinator
        .enroll(args.student_id, args.subject_id)
        .await
        .with_context(|| {
            format!(
                "could not enroll student {} in subject {}",
                args.student_id, args.subject_id
            )
        })?;

    println!("{}", serde_json::to_string_pretty(&enrollment)?);
    Ok(())
}
