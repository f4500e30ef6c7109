use clap::{Parser, ValueEnum};
use job_escrow::application::engine::MarketEngine;
use job_escrow::domain::address::Address;
use job_escrow::domain::ports::BackendBox;
use job_escrow::infrastructure::Faucet;
use job_escrow::infrastructure::clock::ManualClock;
use job_escrow::infrastructure::in_memory::InMemoryBackend;
use job_escrow::interfaces::csv::instruction_reader::{InstructionReader, ScriptStep};
use job_escrow::interfaces::csv::labels::Labels;
use job_escrow::interfaces::csv::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Report {
    Jobs,
    Providers,
    Balances,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input instruction script (CSV)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "JOB_ESCROW_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Label of the token mint the market is bound to
    #[arg(long, env = "JOB_ESCROW_MINT", default_value = "usdc")]
    mint: String,

    /// Which state to print once the script has run
    #[arg(long, value_enum, default_value_t = Report::Jobs)]
    report: Report,
}

type FaucetBox = Box<dyn Faucet>;

fn open_backend(db_path: Option<PathBuf>, mint: Address) -> Result<(BackendBox, FaucetBox)> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        let store =
            job_escrow::infrastructure::rocksdb::RocksDBStore::open(db_path, mint).into_diagnostic()?;
        let backend: BackendBox = Box::new(store.clone());
        let faucet: FaucetBox = Box::new(store);
        return Ok((backend, faucet));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    let store = InMemoryBackend::new(mint);
    let backend: BackendBox = Box::new(store.clone());
    let faucet: FaucetBox = Box::new(store);
    Ok((backend, faucet))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut labels = Labels::new();
    let mint = labels.resolve(&cli.mint);
    labels.insert(Address::vault(&mint), "vault");

    let (backend, faucet) = open_backend(cli.db_path, mint)?;
    let clock = ManualClock::new(0);
    let engine = MarketEngine::new(backend, Box::new(clock.clone()));

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = InstructionReader::new(file);
    let mut executed = 0usize;
    let mut failed = 0usize;
    for row_result in reader.rows() {
        let step = match row_result.and_then(|row| {
            clock.set(row.at);
            row.resolve(&mut labels)
        }) {
            Ok(step) => step,
            Err(e) => {
                eprintln!("Error reading instruction: {}", e);
                failed += 1;
                continue;
            }
        };

        let outcome = match step {
            ScriptStep::Airdrop { account, amount } => faucet.airdrop(&account, amount).await,
            ScriptStep::Execute {
                signer,
                instruction,
            } => {
                let name = instruction.name();
                engine.execute(&signer, instruction).await.map_err(|e| {
                    warn!(instruction = name, code = ?e.kind(), "instruction rejected");
                    e
                })
            }
        };
        match outcome {
            Ok(()) => executed += 1,
            Err(e) => {
                eprintln!("Error executing instruction: {}", e);
                failed += 1;
            }
        }
    }
    info!(executed, failed, "script finished");

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock(), &labels);
    match cli.report {
        Report::Jobs => writer.write_jobs(&engine.jobs().await?)?,
        Report::Providers => writer.write_providers(&engine.providers().await?)?,
        Report::Balances => {
            let mut balances = Vec::new();
            for account in labels.addresses() {
                if *account == mint {
                    continue;
                }
                balances.push((*account, engine.balance_of(account).await?));
            }
            balances.sort_by_key(|(account, _)| labels.name(account));
            writer.write_balances(&balances)?;
        }
    }

    Ok(())
}
