use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use clover::Result;
use clover::config::Config;
use clover::logging::{LogFormat, init_logging};
use clover::store::{MemoryBackend, SqliteBackend};
use clover::watch::{self, Classifier, Dispatcher};

#[derive(Parser)]
#[command(name = "clover")]
#[command(
    about = "Load fixed-width data files into tables declared by spec files",
    long_about = None
)]
struct Cli {
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use an in-memory store and print the statements instead of writing.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the spec and data directories and load files as they arrive.
    Watch {
        #[arg(long)]
        specs: Option<PathBuf>,

        #[arg(long)]
        data: Option<PathBuf>,

        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Process the given spec/data files once, in order, then exit.
    Ingest {
        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.cmd {
        Commands::Watch { specs, data, db } => {
            if let Some(specs) = specs {
                config.specs_dir = specs;
            }
            if let Some(data) = data {
                config.data_dir = data;
            }
            if let Some(db) = db {
                config.db_path = db;
            }

            // Directories must exist before the classifier resolves them.
            let (_watcher, events) =
                watch::spawn_watcher(&[config.specs_dir.as_path(), config.data_dir.as_path()])?;
            let classifier = classifier(&config)?;

            if cli.dry_run {
                Dispatcher::new(classifier, config.settle(), echo_backend()).run(&events);
            } else {
                let backend = open_sqlite(&config)?;
                Dispatcher::new(classifier, config.settle(), backend).run(&events);
            }
        }
        Commands::Ingest { db, files } => {
            if let Some(db) = db {
                config.db_path = db;
            }
            let classifier = classifier(&config)?;

            let ok = if cli.dry_run {
                Dispatcher::new(classifier, config.settle(), echo_backend()).ingest(&files)
            } else {
                let backend = open_sqlite(&config)?;
                Dispatcher::new(classifier, config.settle(), backend).ingest(&files)
            };
            println!("Processed {} of {} files", ok, files.len());
        }
    }

    Ok(())
}

fn classifier(config: &Config) -> Result<Classifier> {
    Classifier::new(
        &config.specs_dir,
        &config.data_dir,
        &config.spec_ext,
        &config.data_ext,
    )
    .context("build file name patterns")
}

fn open_sqlite(config: &Config) -> Result<SqliteBackend> {
    info!(db = %config.db_path.display(), "opening store");
    SqliteBackend::open(&config.db_path)
        .with_context(|| format!("open database {}", config.db_path.display()))
}

/// In-memory store that prints each statement as it is accepted.
fn echo_backend() -> MemoryBackend {
    MemoryBackend::new().on_record(|stmt| println!("{}", stmt))
}
