//! bakcheck command line
//!
//! Analyzes backup archives and prints one JSON outcome per archive, in
//! argument order. Logs go to stderr; control them with `RUST_LOG`:
//!   RUST_LOG=debug bakcheck backups/*.zip
//!   RUST_LOG=bakcheck_lib::database=trace bakcheck staging.zip

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use bakcheck_lib::common::DigestAlgorithm;
use bakcheck_lib::sync::SystemClock;
use bakcheck_lib::{logging, BatchAnalyzer, Config};

/// Command-line interface for the backup analyzer
#[derive(Parser)]
#[command(name = "bakcheck")]
#[command(about = "Backup archive integrity and freshness checker")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/bakcheck/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decompress every entry and recompute CRC-32
    #[arg(long)]
    strict: bool,

    /// Compute a digest of each archive
    #[arg(long, value_enum)]
    digest: Option<DigestArg>,

    /// Maximum concurrent analyses
    #[arg(short, long)]
    workers: Option<usize>,

    /// Verbose logging (file:line, thread IDs)
    #[arg(short, long)]
    verbose: bool,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,

    /// Archives to analyze
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DigestArg {
    Md5,
    Sha256,
}

impl From<DigestArg> for DigestAlgorithm {
    fn from(arg: DigestArg) -> Self {
        match arg {
            DigestArg::Md5 => DigestAlgorithm::Md5,
            DigestArg::Sha256 => DigestAlgorithm::Sha256,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        logging::init_verbose();
    } else {
        logging::init();
    }

    let mut config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bakcheck: {e}");
            return ExitCode::from(2);
        }
    };
    if cli.strict {
        config.reader.strict_crc = true;
    }
    if let Some(digest) = cli.digest {
        config.reader.digest = Some(digest.into());
    }
    if let Some(workers) = cli.workers {
        config.workers.max_workers = workers.max(1);
    }

    let batch = match BatchAnalyzer::new(config, Arc::new(SystemClock)) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("bakcheck: {e}");
            return ExitCode::from(2);
        }
    };

    let outcomes = batch.analyze_all(&cli.paths);
    let json = if cli.compact {
        serde_json::to_string(&outcomes)
    } else {
        serde_json::to_string_pretty(&outcomes)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("bakcheck: failed to serialize results: {e}");
            return ExitCode::from(2);
        }
    }

    if outcomes.iter().all(|o| o.is_success()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
