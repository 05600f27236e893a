//! nday binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install the tracing subscriber (logs go to stderr)
//! 3. Open the profile's bury store through `BuryService`
//! 4. Run one command, then flush and close the store

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use nday_core::clock::{Clock, FixedClock, SystemClock};
use nday_core::config::NdayConfig;
use nday_core::error::NdayError;
use nday_core::types::CardId;
use nday_service::{BuryService, HostScheduler};

use cli::{CliArgs, Command};

/// Host stand-in for the command line: the cards to keep hidden are written
/// to stdout, one id per line, for the caller to feed to its scheduler.
struct StdoutHost;

impl HostScheduler for StdoutHost {
    fn bury_cards(&mut self, card_ids: &[CardId]) -> Result<usize, NdayError> {
        for id in card_ids {
            println!("{}", id);
        }
        Ok(card_ids.len())
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs, config: NdayConfig) -> Result<(), NdayError> {
    let clock: Arc<dyn Clock> = match args.today {
        Some(day) => Arc::new(FixedClock::at_date(day)),
        None => Arc::new(SystemClock::new(config.general.rollover_hour)),
    };
    let profile_dir = args.resolve_profile_dir(&config.general.data_dir);
    tracing::debug!(profile_dir = %profile_dir.display(), today = %clock.today(), "Resolved session");

    let open = || BuryService::open(&config, &profile_dir, clock.clone());

    match args.command {
        Command::Reset { yes } => {
            if !yes {
                return Err(NdayError::Config(
                    "reset discards every bury; pass --yes to confirm".to_string(),
                ));
            }
            let service = BuryService::reinitialize(&config, &profile_dir, clock.clone())?;
            service.close()?;
            println!("Bury store reset.");
        }
        Command::Bury { spec, cards } => {
            let mut service = open()?;
            let outcome = service.bury(&cards, &spec)?;
            println!("{}", outcome.summary());
            service.close()?;
        }
        Command::Unbury { cards } => {
            let service = open()?;
            let removed = service.unbury(&cards)?;
            println!("Unburied {} of {} cards.", removed, cards.len());
            service.close()?;
        }
        Command::Hook { hook } => {
            let service = open()?;
            let report = service.apply_hook(hook, &mut StdoutHost)?;
            tracing::info!(hook = %hook, swept = report.swept, "{}", report.summary());
            service.close()?;
        }
        Command::Sweep => {
            let service = open()?;
            let swept = service.sweep()?;
            println!("Removed {} expired buries.", swept);
            service.close()?;
        }
        Command::List { json } => {
            let service = open()?;
            let records = service.active_records()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}\t{}", record.card_id, record.hide_until);
                }
            }
            service.close()?;
        }
        Command::Show { card } => {
            let service = open()?;
            match service.record(card)? {
                Some(record) => println!(
                    "Card {} is buried until {} (created {}).",
                    record.card_id,
                    record.hide_until,
                    record.created_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("Card {} is not buried.", card),
            }
            service.close()?;
        }
        Command::Status { json } => {
            let service = open()?;
            let stats = service.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("active:  {}", stats.active);
                println!("expired: {}", stats.expired);
                match stats.next_release {
                    Some(day) => println!("next release: {}", day),
                    None => println!("next release: -"),
                }
            }
            service.close()?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let loaded = NdayConfig::load(&config_file);

    let log_level = args
        .resolve_log_level()
        .or_else(|| loaded.as_ref().ok().map(|c| c.general.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            if config_file.exists() {
                tracing::warn!(path = %config_file.display(), error = %e, "Invalid config; using defaults");
            } else {
                tracing::debug!(path = %config_file.display(), "No config file; using defaults");
            }
            NdayConfig::default()
        }
    };

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("{}", e.user_message());
            ExitCode::from(match e {
                NdayError::InvalidSpec(_) => 2,
                NdayError::StorageCorruption(_) => 3,
                _ => 1,
            })
        }
    }
}
