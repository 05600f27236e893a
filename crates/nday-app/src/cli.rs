//! CLI argument definitions for the nday binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use nday_core::types::{CardId, CardSignal};
use nday_service::LifecycleHook;

/// nday - hide flashcards for N days, or for a stability-weighted range of days.
#[derive(Parser, Debug)]
#[command(name = "nday", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Root data directory; each profile is a subdirectory.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Host profile whose bury store to use.
    #[arg(short = 'p', long = "profile", default_value = "default", value_parser = parse_profile)]
    pub profile: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Treat this day (YYYY-MM-DD) as today instead of reading the clock.
    #[arg(long = "today", value_parser = parse_date)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bury cards for N days or a LOW-HIGH range of days.
    Bury {
        /// Duration, e.g. "10" or "1-100".
        #[arg(allow_hyphen_values = true)]
        spec: String,
        /// Cards as ID or ID:STABILITY.
        #[arg(required = true, value_parser = parse_card_arg)]
        cards: Vec<CardSignal>,
    },
    /// Forget the buries of the given cards.
    Unbury {
        #[arg(required = true, value_parser = parse_card_id)]
        cards: Vec<CardId>,
    },
    /// Reconcile at a lifecycle point and print the cards to keep hidden.
    Hook {
        /// One of: load, before-sync, after-sync, tick.
        #[arg(value_parser = parse_hook)]
        hook: LifecycleHook,
    },
    /// Remove expired buries.
    Sweep,
    /// List active buries.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show the bury of one card.
    Show {
        #[arg(value_parser = parse_card_id)]
        card: CardId,
    },
    /// Store statistics.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Delete and recreate the store (all buries are lost).
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > NDAY_CONFIG env var > ~/.nday/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("NDAY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the profile directory.
    ///
    /// Priority: --data-dir flag > config file value, then the profile name.
    pub fn resolve_profile_dir(&self, config_data_dir: &str) -> PathBuf {
        let root = match self.data_dir {
            Some(ref p) => p.clone(),
            None => expand_home(config_data_dir),
        };
        root.join(&self.profile)
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Parse `ID` or `ID:STABILITY`.
pub fn parse_card_arg(raw: &str) -> Result<CardSignal, String> {
    let (id, stability) = match raw.split_once(':') {
        Some((id, stability)) => {
            let value: f64 = stability
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a stability value", stability))?;
            (id, Some(value))
        }
        None => (raw, None),
    };
    Ok(CardSignal::new(parse_card_id(id)?, stability))
}

pub fn parse_card_id(raw: &str) -> Result<CardId, String> {
    raw.parse::<CardId>()
        .map_err(|_| format!("'{}' is not a card id", raw.trim()))
}

fn parse_hook(raw: &str) -> Result<LifecycleHook, String> {
    raw.parse::<LifecycleHook>()
        .map_err(|_| format!("'{}' is not one of: load, before-sync, after-sync, tick", raw))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("'{}' is not a YYYY-MM-DD date: {}", raw, e))
}

fn parse_profile(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("'{}' is not a valid profile name", raw));
    }
    Ok(name.to_string())
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".nday").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".nday").join("config.toml");
    }
    PathBuf::from("config.toml")
}
