//! Hive CLI
//!
//! Offline tool that works directly on a data directory. Do not point it at a
//! directory a running server owns.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hive::index::Index;
use hive::snapshot::Snapshot;
use hive::wal::{WalEntry, WalRecovery};
use hive::{CompactionOutcome, Config, Engine, HiveError};
use tracing_subscriber::{fmt, EnvFilter};

/// Hive CLI
#[derive(Parser, Debug)]
#[command(name = "hive-cli")]
#[command(about = "Offline tools for a Hive data directory")]
struct Args {
    /// Data directory
    #[arg(short, long, env = "STORAGE_PATH", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Compact the data directory now
    Compact,

    /// Print the records of the WAL (or the snapshot)
    Dump {
        /// Dump the snapshot instead of the WAL
        #[arg(long)]
        snapshot: bool,
    },

    /// Check that the WAL and snapshot parse, without modifying them
    Verify,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(HiveError::NotFound) => {
            eprintln!("(not found)");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> hive::Result<()> {
    let wal_path = args.data_dir.join(Engine::WAL_FILENAME);
    let snapshot_path = args.data_dir.join(Engine::SNAPSHOT_FILENAME);

    match args.command {
        Commands::Dump { snapshot } => {
            let path = if snapshot { snapshot_path } else { wal_path };
            dump(&path)
        }
        Commands::Verify => {
            // Same rules as Engine::open: a snapshot must be whole PUT records
            match Snapshot::load(&snapshot_path, &mut Index::new())? {
                Some(snapshot) => println!(
                    "snapshot: {} records, {} bytes",
                    snapshot.entry_count, snapshot.file_size
                ),
                None => println!("snapshot: none"),
            }

            let result = WalRecovery::verify(&wal_path)?;
            println!(
                "wal: {} records, {} valid bytes{}",
                result.entries_recovered,
                result.valid_len,
                if result.was_truncated {
                    format!(", torn tail of {} bytes", result.truncated_bytes)
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Commands::Get { key } => with_engine(&args.data_dir, |engine| {
            let value = engine.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
            Ok(())
        }),
        Commands::Put { key, value } => with_engine(&args.data_dir, |engine| {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
            Ok(())
        }),
        Commands::Del { key } => with_engine(&args.data_dir, |engine| {
            engine.delete(key.as_bytes())?;
            println!("OK");
            Ok(())
        }),
        Commands::Compact => with_engine(&args.data_dir, |engine| {
            match engine.compact()? {
                CompactionOutcome::Completed(stats) => {
                    println!(
                        "compacted: {} live keys, {} tombstones dropped, {} bytes",
                        stats.live_keys, stats.tombstones_dropped, stats.snapshot_bytes
                    );
                    if let Some(archive) = &stats.archive {
                        println!("previous snapshot archived to {}", archive.display());
                    }
                }
                CompactionOutcome::Skipped => println!("compaction already in progress"),
            }
            Ok(())
        }),
    }
}

/// Open the engine with background compaction off, run `f`, close it
fn with_engine<F>(data_dir: &Path, f: F) -> hive::Result<()>
where
    F: FnOnce(&Engine) -> hive::Result<()>,
{
    let config = Config::builder()
        .data_dir(data_dir)
        .manual_compaction_only()
        .build();
    let engine = Engine::open(config)?;
    let result = f(&engine);
    engine.close()?;
    result
}

fn dump(path: &Path) -> hive::Result<()> {
    let mut lsn = 0u64;
    let result = WalRecovery::replay(path, |entry: &WalEntry| {
        lsn += 1;
        println!(
            "{:>6}  {:<14} {:<24} {:<24} {}",
            lsn,
            entry.operation.tag(),
            String::from_utf8_lossy(entry.operation.key()),
            String::from_utf8_lossy(entry.operation.value()),
            entry.timestamp
        );
    })?;
    if result.was_truncated {
        println!("(torn tail: {} bytes)", result.truncated_bytes);
    }
    Ok(())
}
