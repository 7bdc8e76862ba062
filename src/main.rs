use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use queueboard::dashboard::{group, ClassifiedPr, Dashboard};
use queueboard::github::{self, LoadedPr};
use queueboard::output;
use queueboard::timeline::{aggregate, reconstruct};

const EXIT_SUCCESS: i32 = 0;
const EXIT_DATA: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every cached PR and print the dashboard tables (default)
    Report {
        /// Print a single dashboard, selected by its anchor id (e.g. "queue")
        #[arg(short, long)]
        dashboard: Option<String>,
        /// Tab-separated output for scripting (no headings, no colors)
        #[arg(long)]
        tsv: bool,
    },
    /// Reconstruct one PR's state timeline from its event history
    Timeline {
        /// PR number
        number: u64,
    },
}

#[derive(Parser, Debug)]
#[command(name = "queueboard")]
#[command(about = "PR lifecycle classification and review-queue dashboards", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/queueboard/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory holding the snapshot cache (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Reference timestamp as RFC 3339, for reproducible runs (defaults to now)
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Report {
        dashboard: None,
        tsv: false,
    });
    let start_time = Instant::now();

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match queueboard::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate threshold strings at startup
    if let Err(errors) = queueboard::config::validate_thresholds(&config.thresholds) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }
    let thresholds = queueboard::config::resolve_thresholds(&config.thresholds);

    let data_dir = PathBuf::from(
        cli.data_dir
            .or(config.data_dir)
            .unwrap_or_else(|| ".".to_string()),
    );

    // The reference instant is fixed here, once, at the boundary; nothing
    // downstream reads the wall clock.
    let now: DateTime<Utc> = match cli.now.as_deref() {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                eprintln!("Invalid --now timestamp '{}': {}", raw, e);
                std::process::exit(EXIT_CONFIG);
            }
        },
        None => Utc::now(),
    };

    match command {
        Commands::Report { dashboard, tsv } => {
            run_report(&data_dir, now, &thresholds, dashboard, tsv, cli.verbose);
            if cli.verbose {
                eprintln!();
                eprintln!("Done in {:?}", start_time.elapsed());
            }
        }
        Commands::Timeline { number } => {
            run_timeline(&data_dir, now, number, cli.verbose);
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Classify the whole snapshot cache and attach review metrics where an
/// event history exists. Per-PR failures degrade that PR, never the batch.
fn classify_all(data_dir: &PathBuf, now: DateTime<Utc>, verbose: bool) -> Vec<ClassifiedPr> {
    let loaded = match github::load_snapshots(data_dir) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Data error: {:#}", e);
            std::process::exit(EXIT_DATA);
        }
    };

    if verbose {
        eprintln!("Loaded {} snapshot records from {}", loaded.len(), data_dir.display());
    }

    let mut prs = Vec::with_capacity(loaded.len());
    let mut with_history = 0usize;
    for entry in loaded {
        match entry {
            LoadedPr::Parsed(snapshot) => {
                let mut pr = ClassifiedPr::from_snapshot(snapshot);
                match github::load_event_history(data_dir, pr.number()) {
                    Ok(Some(history)) => {
                        let seed = history.seed(Some(&pr.snapshot));
                        let timeline =
                            reconstruct(history.opened_at, seed, &history.events, now);
                        pr.metrics = Some(aggregate(&timeline, now));
                        with_history += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        eprintln!("warning: PR {}: {:#}", pr.number(), e);
                    }
                }
                prs.push(pr);
            }
            LoadedPr::Malformed { number } => {
                prs.push(ClassifiedPr::unknown(number, now));
            }
        }
    }

    if verbose {
        eprintln!("Classified {} PRs ({} with event history)", prs.len(), with_history);
    }
    prs
}

fn run_report(
    data_dir: &PathBuf,
    now: DateTime<Utc>,
    thresholds: &queueboard::dashboard::Thresholds,
    dashboard: Option<String>,
    tsv: bool,
    verbose: bool,
) {
    let prs = classify_all(data_dir, now, verbose);
    let groups = group(&prs, now, thresholds);
    let by_number: HashMap<u64, &ClassifiedPr> = prs.iter().map(|pr| (pr.number(), pr)).collect();

    let selected: Vec<Dashboard> = match dashboard {
        Some(ref anchor) => match Dashboard::ALL.iter().find(|d| d.anchor() == anchor) {
            Some(d) => vec![*d],
            None => {
                eprintln!("Unknown dashboard '{}'. Available:", anchor);
                for d in Dashboard::ALL {
                    eprintln!("  {}", d.anchor());
                }
                std::process::exit(EXIT_CONFIG);
            }
        },
        None => Dashboard::ALL.to_vec(),
    };

    let use_colors = output::should_use_colors();
    for dashboard in selected {
        let members: Vec<&ClassifiedPr> = groups[&dashboard]
            .iter()
            .filter_map(|number| by_number.get(number).copied())
            .collect();
        if tsv {
            let rendered = output::format_tsv(dashboard, &members, now);
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
        } else {
            println!("{}", output::format_dashboard(dashboard, &members, now, use_colors));
        }
    }
}

fn run_timeline(data_dir: &PathBuf, now: DateTime<Utc>, number: u64, verbose: bool) {
    let history = match github::load_event_history(data_dir, number) {
        Ok(Some(h)) => h,
        Ok(None) => {
            eprintln!("No event history for PR {} in {}", number, data_dir.display());
            std::process::exit(EXIT_DATA);
        }
        Err(e) => {
            eprintln!("Data error: {:#}", e);
            std::process::exit(EXIT_DATA);
        }
    };

    // The snapshot, when present, seeds histories that start after creation.
    let snapshot = match github::load_snapshots(data_dir) {
        Ok(loaded) => loaded.into_iter().find_map(|entry| match entry {
            LoadedPr::Parsed(pr) if pr.number == number => Some(pr),
            _ => None,
        }),
        Err(_) => None,
    };

    if verbose {
        eprintln!(
            "PR {}: {} events, opened at {}",
            number,
            history.events.len(),
            history.opened_at
        );
    }

    let seed = history.seed(snapshot.as_ref());
    let timeline = reconstruct(history.opened_at, seed, &history.events, now);
    let metrics = aggregate(&timeline, now);

    let use_colors = output::should_use_colors();
    println!("{}", output::format_timeline(number, &timeline, &metrics, now, use_colors));
}
