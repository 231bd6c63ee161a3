//! gslog CLI
//!
//! Thin wrapper around gslog-core for writing, listing and archiving log
//! files from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Write two lines to <log-dir>/app_main_<today>_<seq>.log
//! gslog emit --name app --desc main "service started" "listening"
//!
//! # List log files
//! gslog list
//!
//! # Archive everything dated yesterday or earlier into <yesterday>.tar.gz
//! gslog compress --days 1
//!
//! # Restore an archive
//! gslog uncompress 20240609
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gslog_core::{Archiver, FileSink, FileSinkConfig, Level, LogConfig, LogService};

/// gslog - leveled logging to rotating files
#[derive(Parser)]
#[command(name = "gslog")]
#[command(version = "0.1.0")]
#[command(about = "gslog - leveled logging to rotating files")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log directory (default: $GSLOG_DIR or ~/.gslog/log)
    #[arg(short, long, global = true)]
    log_dir: Option<PathBuf>,

    /// Rotate files once they grow past this many bytes
    #[arg(long, global = true)]
    cut_size: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write messages to a rotating log file
    Emit {
        /// Log name, the first part of the file name (no '_')
        #[arg(short, long)]
        name: String,
        /// Log description, the second part of the file name
        #[arg(short, long, default_value = "main")]
        desc: String,
        /// Logger name shown on each line
        #[arg(long, default_value = "cli")]
        logger: String,
        /// Level of every message (assert, error, warn, info, debug, verbose)
        #[arg(long, default_value = "info")]
        level: Level,
        /// Messages, one line each
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// List log files in the log directory
    List,

    /// Archive old log files into <cutoff>.tar.gz
    Compress {
        /// Only files with this log name (default: all)
        #[arg(short, long, default_value = "")]
        name: String,
        /// Only files with this description (default: all)
        #[arg(short, long, default_value = "")]
        desc: String,
        /// Cutoff in days before today (0 = today, 1 = yesterday)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Restore the files of <day>.tar.gz and delete the archive
    Uncompress {
        /// Archive day as YYYYMMDD
        day: String,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Environment settings with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<LogConfig> {
    let mut config = LogConfig::from_env().context("invalid GSLOG_* environment")?;
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir);
    }
    if let Some(size) = cli.cut_size {
        config = config.with_cut_size(size);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    tracing::debug!(log_dir = %config.log_dir.display(), cut_size = config.cut_size, "configuration loaded");

    match cli.command {
        Commands::Emit {
            name,
            desc,
            logger,
            level,
            messages,
        } => {
            let sink = FileSink::new(FileSinkConfig::from_log_config(&config, name, desc))
                .context("cannot create file sink")?;
            let sink = Arc::new(sink);

            let service =
                LogService::with_sinks(config.queue_capacity, config.flags, vec![sink.clone()])?;
            let log = service.get_logger(&logger);
            for message in &messages {
                log.log(level, format_args!("{}", message))?;
            }
            service.shutdown();

            let stats = service.stats();
            if stats.sink_failures > 0 {
                anyhow::bail!("{} message(s) could not be written", stats.sink_failures);
            }
            match sink.current_path() {
                Some(path) => println!("Wrote {} message(s) to {}", stats.delivered, path.display()),
                None => println!("No messages written (level {} disabled)", level),
            }
        }

        Commands::List => {
            let archiver = Archiver::from_config(&config);
            let logs = archiver.list_logs()?;
            if logs.is_empty() {
                println!("No log files in {}", archiver.dir().display());
                return Ok(());
            }

            println!("Log files in {}:", archiver.dir().display());
            for (path, parsed) in logs {
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                println!(
                    "  {}  {:<12} {:<16} #{:<4} {:>10} bytes",
                    parsed.date.format("%Y-%m-%d"),
                    parsed.name,
                    parsed.description,
                    parsed.seq,
                    size
                );
            }
        }

        Commands::Compress { name, desc, days } => {
            let mut archiver = Archiver::from_config(&config);
            if let Some(days) = days {
                archiver = archiver.with_day_offset(days);
            }

            let report = archiver.compress(&name, &desc)?;
            for path in &report.skipped {
                println!("Skipped (unrecognised name): {}", path.display());
            }
            match report.archive {
                Some(archive) => {
                    println!(
                        "Archived {} file(s) into {}",
                        report.archived.len(),
                        archive.display()
                    );
                    for path in &report.archived {
                        if let Some(file_name) = path.file_name() {
                            println!("  {}", file_name.to_string_lossy());
                        }
                    }
                }
                None => println!("Nothing to archive up to {}", archiver.cutoff()?),
            }
        }

        Commands::Uncompress { day } => {
            let archiver = Archiver::from_config(&config);
            let restored = archiver.uncompress(&day)?;
            println!("Restored {} file(s) from {}.tar.gz", restored.len(), day);
            for path in &restored {
                if let Some(file_name) = path.file_name() {
                    println!("  {}", file_name.to_string_lossy());
                }
            }
        }
    }

    Ok(())
}
