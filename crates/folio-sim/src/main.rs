mod events;
mod output;
mod persist;
mod race;
mod scenario_common;
mod scenarios;
mod soak;

use clap::{Parser, Subcommand};
use folio_groups::EngineConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio-sim", about = "Scenario runner for the Folio reading-group engine")]
struct Cli {
    /// JSON engine config; defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write JSONL events to a timestamped file in this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the built-in membership scenarios.
    Scenarios,

    /// Approve queued applicants from concurrent tasks.
    Race {
        /// Group capacity, owner included.
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(2..=10))]
        capacity: u8,
        /// Number of queued applicants.
        #[arg(long, default_value = "16")]
        applicants: usize,
    },

    /// Seeded random membership traffic with invariant checks.
    Soak {
        /// RNG seed (random if omitted).
        #[arg(long)]
        seed: Option<u64>,
        /// Number of groups.
        #[arg(long, default_value = "8")]
        groups: usize,
        /// Size of the reader pool.
        #[arg(long, default_value = "24")]
        readers: usize,
        /// Number of operations.
        #[arg(long, default_value = "10000")]
        ops: usize,
    },

    /// Write groups to a SQLite file, reopen it and verify.
    Persist {
        /// Database file.
        #[arg(long)]
        db: PathBuf,
    },
}

impl Command {
    fn mode(&self) -> &'static str {
        match self {
            Command::Scenarios => "scenarios",
            Command::Race { .. } => "race",
            Command::Soak { .. } => "soak",
            Command::Persist { .. } => "persist",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let mode = cli.command.mode();

    if let Some(dir) = &cli.output_dir {
        let path = output::resolve_report_path(dir, mode)?;
        output::init_jsonl_writer(&path)?;
        eprintln!("JSONL report: {}", path.display());
    }

    eprintln!("folio-sim v{}", env!("CARGO_PKG_VERSION"));
    events::emit(&events::EventStarted::new(mode));

    let ok = match cli.command {
        Command::Scenarios => {
            let results = scenarios::run(&config).await?;
            for result in &results {
                result.print_summary();
                result.emit_jsonl();
            }
            results.iter().all(|r| r.success())
        }

        Command::Race {
            capacity,
            applicants,
        } => race::run(&config, race::RaceConfig {
            capacity,
            applicants,
        })
        .await?,

        Command::Soak {
            seed,
            groups,
            readers,
            ops,
        } => {
            anyhow::ensure!(groups > 0 && readers > 0, "--groups and --readers must be > 0");
            let seed = seed.unwrap_or_else(rand::random);
            eprintln!("soak seed: {seed}");
            soak::run(&config, soak::SoakConfig {
                seed,
                groups,
                readers,
                ops,
            })?
        }

        Command::Persist { db } => {
            let result = persist::run(&db, &config)?;
            result.print_summary();
            result.emit_jsonl();
            result.success()
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
