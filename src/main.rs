use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use taskstore::migration::version;
use taskstore::{
    DurabilityMode, DurableStore, MigrationConfig, MigrationReport, MigrationRunner, StoreConfig,
    builtin_registry,
};

#[derive(Parser)]
#[command(name = "taskstore")]
#[command(about = "Operator tooling for the task manager's local document store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the store to the latest schema version
    Migrate {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long, default_value = "sync")]
        durability: DurabilityMode,
        #[arg(long, default_value_t = 100)]
        page_size: usize,
    },
    /// Show the stored schema version and the steps still pending
    Status {
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// Fold the journal into a fresh snapshot
    Checkpoint {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Migrate {
            data_dir,
            durability,
            page_size,
        } => migrate(data_dir, durability, page_size).await,
        Command::Status { data_dir } => status(data_dir).await,
        Command::Checkpoint { data_dir } => checkpoint(data_dir).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(data_dir: PathBuf, durability: DurabilityMode) -> Result<DurableStore> {
    let config = StoreConfig::new(&data_dir).durability(durability);
    DurableStore::open(&config)
        .with_context(|| format!("Failed to open store at '{}'", data_dir.display()))
}

async fn migrate(data_dir: PathBuf, durability: DurabilityMode, page_size: usize) -> Result<()> {
    let store = open_store(data_dir, durability)?;
    let runner = MigrationRunner::new(builtin_registry())
        .with_config(MigrationConfig::default().page_size(page_size));

    let report = runner.run(&store).await.context("Migration failed")?;
    store.checkpoint().await.context("Failed to checkpoint store")?;
    print_report(&report);
    Ok(())
}

async fn status(data_dir: PathBuf) -> Result<()> {
    if !data_dir.exists() {
        return Err(anyhow!("No store at '{}'", data_dir.display()));
    }
    let store = open_store(data_dir, DurabilityMode::None)?;
    let runner = MigrationRunner::new(builtin_registry());
    runner
        .registry()
        .validate()
        .context("Built-in migration registry is invalid")?;

    let stored = version::stored_version(&store).await?;
    let pending = runner.pending(&store).await?;

    match stored {
        Some(stored) => println!("Stored schema version: {}", stored),
        None => println!("Stored schema version: none (never migrated)"),
    }
    println!(
        "Latest schema version: {}",
        runner.registry().latest_version().unwrap_or_default()
    );

    if pending.is_empty() {
        println!("Pending migrations: none");
        return Ok(());
    }
    println!("Pending migrations:");
    for version in pending {
        if let Some(step) = runner.registry().get(version) {
            println!("- v{} {}", step.version(), step.name());
        }
    }
    Ok(())
}

async fn checkpoint(data_dir: PathBuf) -> Result<()> {
    let store = open_store(data_dir, DurabilityMode::Sync)?;
    store.checkpoint().await.context("Failed to checkpoint store")?;
    println!("Checkpoint written");
    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.is_noop() {
        println!("Store already up to date");
    } else {
        let applied = report
            .applied
            .iter()
            .map(|version| format!("v{}", version))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Applied migrations: {}", applied);
    }
    match report.final_version {
        Some(version) => println!("Schema version: {}", version),
        None => println!("Schema version: none"),
    }
}
