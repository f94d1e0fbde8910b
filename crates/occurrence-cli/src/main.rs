//! `rrq` CLI — validate RRULEs and query their occurrences from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Validate a rule (prints it back, fails on invalid input)
//! rrq validate "FREQ=WEEKLY;BYDAY=MO,WE,FR"
//!
//! # Non-failing validity check
//! rrq is-valid "NOT A RULE"          # prints false
//!
//! # Occurrences in an inclusive window
//! rrq range "FREQ=DAILY" --start 2025-11-01T00:00:00Z --end 2025-11-03T00:00:00Z \
//!     --dtstart 2025-11-01T09:00:00Z
//!
//! # Next 5 occurrences strictly after a point in time
//! rrq next "FREQ=DAILY" --after 2025-11-01T09:00:00Z --limit 5 --dtstart 2025-11-01T09:00:00Z
//!
//! # The single next occurrence, as JSON
//! rrq --output json next-one "FREQ=DAILY;COUNT=2" --after 2025-11-05T00:00:00Z \
//!     --dtstart 2025-11-01T09:00:00Z
//! ```
//!
//! Naive timestamps ("2025-11-01T09:00:00") are read in the configured
//! timezone, which is also used to render results.

mod config;
mod timestamp;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use occurrence_engine::QueryEngine;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, OutputFormat};
use crate::timestamp::{parse_timestamp, render};

#[derive(Parser)]
#[command(name = "rrq", version, about = "RRULE occurrence queries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./rrq.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// IANA timezone for naive input timestamps and for output (overrides config)
    #[arg(long, global = true)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rule and print it back verbatim
    Validate {
        /// RRULE text, e.g. "FREQ=WEEKLY;BYDAY=TU,TH"
        rule: String,
    },
    /// Print whether a rule is valid (true/false)
    IsValid {
        /// RRULE text
        rule: String,
    },
    /// Occurrences within [start, end], both inclusive (at most 1000)
    Range {
        /// RRULE text
        rule: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Anchor of the recurrence
        #[arg(long)]
        dtstart: String,
    },
    /// Up to LIMIT occurrences strictly after AFTER
    Next {
        /// RRULE text
        rule: String,
        #[arg(long)]
        after: String,
        /// Number of occurrences, 1..=10000
        #[arg(long, allow_negative_numbers = true)]
        limit: i32,
        /// Anchor of the recurrence
        #[arg(long)]
        dtstart: String,
    },
    /// The first occurrence strictly after AFTER, if any
    NextOne {
        /// RRULE text
        rule: String,
        #[arg(long)]
        after: String,
        /// Anchor of the recurrence
        #[arg(long)]
        dtstart: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.log_level);

    let output = cli.output.unwrap_or(config.output);
    let zone_name = cli.timezone.as_deref().unwrap_or(&config.timezone);
    let zone: Tz = zone_name
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid timezone: '{}'", zone_name))?;

    let engine = QueryEngine::new().with_limits(config.limits);
    tracing::debug!(?output, %zone, limits = ?engine.limits(), "rrq starting");

    match cli.command {
        Commands::Validate { rule } => {
            let rule = engine.validate_rule(&rule)?;
            println!("{}", rule);
        }
        Commands::IsValid { rule } => {
            println!("{}", engine.is_valid_rule(&rule));
        }
        Commands::Range {
            rule,
            start,
            end,
            dtstart,
        } => {
            let rule = engine.validate_rule(&rule)?;
            let start = parse_timestamp(&start, zone).context("Failed to read --start")?;
            let end = parse_timestamp(&end, zone).context("Failed to read --end")?;
            let dtstart = parse_timestamp(&dtstart, zone).context("Failed to read --dtstart")?;
            let occurrences = engine.occurrences_in_range(&rule, &start, &end, &dtstart)?;
            print_many(&occurrences, zone, output)?;
        }
        Commands::Next {
            rule,
            after,
            limit,
            dtstart,
        } => {
            let rule = engine.validate_rule(&rule)?;
            let after = parse_timestamp(&after, zone).context("Failed to read --after")?;
            let dtstart = parse_timestamp(&dtstart, zone).context("Failed to read --dtstart")?;
            let occurrences = engine.next_occurrences(&rule, &after, limit, &dtstart)?;
            print_many(&occurrences, zone, output)?;
        }
        Commands::NextOne {
            rule,
            after,
            dtstart,
        } => {
            let rule = engine.validate_rule(&rule)?;
            let after = parse_timestamp(&after, zone).context("Failed to read --after")?;
            let dtstart = parse_timestamp(&dtstart, zone).context("Failed to read --dtstart")?;
            let next = engine.next_occurrence(&rule, &after, &dtstart)?;
            match output {
                OutputFormat::Text => {
                    if let Some(ts) = next {
                        println!("{}", render(&ts, zone));
                    }
                }
                OutputFormat::Json => {
                    let value = next.map(|ts| render(&ts, zone));
                    println!("{}", serde_json::to_string(&value)?);
                }
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_many(occurrences: &[DateTime<Utc>], zone: Tz, output: OutputFormat) -> Result<()> {
    let rendered: Vec<String> = occurrences.iter().map(|ts| render(ts, zone)).collect();
    match output {
        OutputFormat::Text => {
            for line in &rendered {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&rendered)?);
        }
    }
    Ok(())
}
