//! vlogkv CLI
//!
//! Drives a local vlogkv data directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vlogkv::record_log::LogReader;
use vlogkv::vlog::record;
use vlogkv::{ColumnarDb, Config};

/// vlogkv CLI
#[derive(Parser, Debug)]
#[command(name = "vlogkv-cli")]
#[command(about = "CLI for the vlogkv value-log column store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./vlogkv_data")]
    data_dir: PathBuf,

    /// Number of columns keys are spread over
    #[arg(short, long, default_value = "1")]
    columns: usize,

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

    /// Print every live pair in key order
    Scan,

    /// Move buffered writes into the columns
    Flush,

    /// Print the records of one value-log file
    DumpVlog {
        /// Path to a .vlog file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vlogkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> vlogkv::Result<()> {
    if let Commands::DumpVlog { path } = &args.command {
        return dump_vlog(path);
    }

    let config = Config::builder()
        .data_dir(args.data_dir.clone())
        .num_columns(args.columns)
        .build();
    let db = ColumnarDb::open(config)?;

    match args.command {
        Commands::Get { key } => match db.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            db.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            db.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Scan => {
            for (key, value) in db.scan()? {
                println!(
                    "{} -> {}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Flush => {
            db.flush()?;
            println!("OK");
        }
        Commands::DumpVlog { .. } => {}
    }

    db.close()
}

fn dump_vlog(path: &Path) -> vlogkv::Result<()> {
    let file = File::open(path)?;
    let mut reader = LogReader::new(BufReader::new(file), 0, true)?;

    let mut count = 0u64;
    while let Some(payload) = reader.read_record()? {
        let (key, value) = record::decode(&payload)?;
        println!(
            "@{:<10} {} ({} bytes)",
            reader.last_record_offset(),
            String::from_utf8_lossy(&key),
            value.len()
        );
        count += 1;
    }
    println!("{} records", count);
    Ok(())
}
