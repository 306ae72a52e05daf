//! CLI entrypoint for the rpcdb harness.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use rpcdb_core::rpc::{RpcDatabase, RpcEntry};
use rpcdb_harness::HarnessError;
use rpcdb_harness::report::{EntryRecord, VerifyReport};
use rpcdb_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, validate_log_file};
use rpcdb_membrane::RpcdbConfig;

/// Query and verify an `/etc/rpc`-format program database.
#[derive(Debug, Parser)]
#[command(name = "rpcdb-harness")]
#[command(about = "Lookup, dump and verification tooling for the RPC program database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up one program by name/alias or by number.
    ///
    /// Exit status: 0 found, 2 not found, 1 error.
    Lookup {
        /// Program name or alias.
        #[arg(long, conflicts_with = "number", required_unless_present = "number")]
        name: Option<String>,
        /// Program number.
        #[arg(long)]
        number: Option<u32>,
        /// Database path (default: $RPCDB_RPC_PATH or /etc/rpc).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Append a structured JSONL record of the lookup to this file.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Print every entry in file order.
    Dump {
        /// Database path (default: $RPCDB_RPC_PATH or /etc/rpc).
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = DumpFormat::Plain)]
        format: DumpFormat,
    },
    /// Report parse statistics, duplicate names/numbers and a content digest.
    Verify {
        /// Database path (default: $RPCDB_RPC_PATH or /etc/rpc).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a structured JSONL log written by `lookup --log`.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    /// `/etc/rpc` line format.
    Plain,
    /// JSON array of entries.
    Json,
}

const EXIT_NOT_FOUND: u8 = 2;

fn db_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| RpcdbConfig::from_env().db_path)
}

enum Key {
    Name(String),
    Number(u32),
}

impl Key {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Name(_) => "getrpcbyname",
            Self::Number(_) => "getrpcbynumber",
        }
    }

    fn details(&self, db: &Path) -> serde_json::Value {
        match self {
            Self::Name(name) => serde_json::json!({ "db": db.display().to_string(), "name": name }),
            Self::Number(number) => {
                serde_json::json!({ "db": db.display().to_string(), "number": number })
            }
        }
    }
}

fn lookup(key: &Key, db: &Path, log: Option<&Path>) -> Result<ExitCode, HarnessError> {
    let mut database = RpcDatabase::from_path(db);
    let started = Instant::now();
    let found = match key {
        Key::Name(name) => database.lookup_by_name(name.as_bytes()),
        Key::Number(number) => database.lookup_by_number(*number),
    };
    let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

    if let Some(log) = log {
        let run_id = format!("run-{}", std::process::id());
        let mut emitter = LogEmitter::to_file(log, "rpcdb-harness", &run_id)?;
        let entry = LogEntry::new("", LogLevel::Info, "lookup")
            .with_symbol(key.symbol())
            .with_latency_ns(latency_ns)
            .with_details(key.details(db));
        let entry = match &found {
            Ok(Some(_)) => entry.with_outcome(Outcome::Found),
            Ok(None) => entry.with_outcome(Outcome::NotFound),
            Err(err) => {
                let mut entry = entry.with_outcome(Outcome::Error).with_errno(err.errno());
                entry.level = LogLevel::Error;
                entry
            }
        };
        emitter.emit_entry(entry)?;
        emitter.flush()?;
    }

    match found? {
        Some(entry) => {
            println!("{entry}");
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::from(EXIT_NOT_FOUND)),
    }
}

fn dump(db: &Path, format: DumpFormat) -> Result<ExitCode, HarnessError> {
    let mut database = RpcDatabase::from_path(db);
    let mut cursor = database.begin_iteration()?;
    let entries: Vec<RpcEntry> = cursor.by_ref().collect();
    database.end_iteration(cursor);

    match format {
        DumpFormat::Plain => {
            for entry in &entries {
                println!("{entry}");
            }
        }
        DumpFormat::Json => {
            let records: Vec<EntryRecord> = entries.iter().map(EntryRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn verify(db: &Path, output: Option<&Path>) -> Result<ExitCode, HarnessError> {
    let report = VerifyReport::from_path(db)?;
    let json = report.to_json_pretty()?;
    if let Some(path) = output {
        std::fs::write(path, format!("{json}\n"))?;
        eprintln!("Wrote verify report to {}", path.display());
    } else {
        println!("{json}");
    }
    eprintln!(
        "verify: entries={} malformed={} duplicate_names={} duplicate_numbers={}",
        report.summary.parsed_entries,
        report.summary.malformed_lines,
        report.duplicate_names.len(),
        report.duplicate_numbers.len(),
    );
    Ok(ExitCode::SUCCESS)
}

fn validate_log(log: &Path) -> Result<ExitCode, HarnessError> {
    let (line_count, errors) = validate_log_file(log)?;
    for err in &errors {
        eprintln!("{err}");
    }
    if errors.is_empty() {
        eprintln!("{line_count} structured log line(s) valid");
        Ok(ExitCode::SUCCESS)
    } else {
        Err(HarnessError::InvalidLog {
            count: errors.len(),
        })
    }
}

fn run(cli: Cli) -> Result<ExitCode, HarnessError> {
    match cli.command {
        Command::Lookup {
            name,
            number,
            db,
            log,
        } => {
            let key = match (name, number) {
                (Some(name), _) => Key::Name(name),
                (None, Some(number)) => Key::Number(number),
                (None, None) => unreachable!("clap requires --name or --number"),
            };
            lookup(&key, &db_path(db), log.as_deref())
        }
        Command::Dump { db, format } => dump(&db_path(db), format),
        Command::Verify { db, output } => verify(&db_path(db), output.as_deref()),
        Command::ValidateLog { log } => validate_log(&log),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
