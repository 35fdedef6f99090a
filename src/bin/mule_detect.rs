//! `mule_detect` — thin CLI front end over [`rust_mule_detect::Engine`].
//!
//! Reads a JSON array of transactions from `--input` (or stdin), runs the
//! detection pipeline, and writes the resulting report to stdout. This is a
//! convenience wrapper around the library; CSV ingestion and HTTP serving
//! remain out of scope (see the crate's top-level docs).

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use rust_mule_detect::engine::Config;
use rust_mule_detect::{Engine, Transaction};

/// Detect money-muling ring structures in a transaction log.
#[derive(Parser)]
#[command(name = "mule_detect")]
#[command(about = "Deterministic money-muling ring detection over directed transaction graphs")]
#[command(version)]
struct Cli {
    /// Path to a JSON file containing an array of transactions. Reads
    /// stdin when omitted.
    #[arg(short, long)]
    input: Option<String>,

    /// Suspicious-account score cutoff.
    #[arg(long, default_value_t = rust_mule_detect::assembler::DEFAULT_SCORE_CUTOFF)]
    score_cutoff: f64,

    /// Ring-merger Jaccard similarity threshold.
    #[arg(long, default_value_t = rust_mule_detect::merge::MERGE_JACCARD_THRESHOLD)]
    merge_threshold: f64,

    /// Pretty-print the JSON report and print a one-line graph summary to
    /// stderr.
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity (can be repeated).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "mule_detect=info,rust_mule_detect=info",
        1 => "mule_detect=debug,rust_mule_detect=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let raw = match read_input(cli.input.as_deref()) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("error reading input: {err}");
            return ExitCode::FAILURE;
        }
    };

    let transactions: Vec<Transaction> = match serde_json::from_str(&raw) {
        Ok(txs) => txs,
        Err(err) => {
            eprintln!("error parsing transactions: {err}");
            return ExitCode::FAILURE;
        }
    };

    let engine = Engine::with_config(Config {
        merge_jaccard_threshold: cli.merge_threshold,
        score_cutoff: cli.score_cutoff,
    });

    let report = match engine.analyze(&transactions) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error analyzing transactions: {err}");
            return ExitCode::FAILURE;
        }
    };

    if cli.pretty {
        let stats = rust_mule_detect::Graph::build(&transactions)
            .map(|g| g.stats())
            .ok();
        if let Some(stats) = stats {
            eprintln!(
                "graph: {} nodes, {} edges, {} transactions",
                stats.node_count, stats.edge_count, stats.total_transactions
            );
        }
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error serializing report: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        match serde_json::to_string(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error serializing report: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
