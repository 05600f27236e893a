//! Bury duration input: `N` or `LOW-HIGH`, in whole days.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use nday_core::config::BuryConfig;
use nday_core::error::NdayError;

/// Limits applied while parsing user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecRules {
    /// Accept zero-day durations (treated as "do nothing" for those cards).
    pub allow_zero: bool,
    /// Largest accepted bound.
    pub max_days: u32,
}

impl Default for SpecRules {
    fn default() -> Self {
        Self::from(&BuryConfig::default())
    }
}

impl From<&BuryConfig> for SpecRules {
    fn from(config: &BuryConfig) -> Self {
        Self {
            allow_zero: config.allow_zero_duration,
            max_days: config.max_days,
        }
    }
}

/// A validated bury duration. A fixed duration has `low == high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationSpec {
    low: u32,
    high: u32,
}

impl DurationSpec {
    pub fn fixed(days: u32) -> Self {
        Self {
            low: days,
            high: days,
        }
    }

    pub fn range(low: u32, high: u32) -> Result<Self, NdayError> {
        if low > high {
            return Err(NdayError::InvalidSpec(format!(
                "lower bound {} is greater than upper bound {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u32 {
        self.low
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn is_fixed(&self) -> bool {
        self.low == self.high
    }

    /// Number of distinct offsets minus one.
    pub fn span(&self) -> u32 {
        self.high - self.low
    }

    /// Parse user input under the given rules.
    pub fn parse(text: &str, rules: &SpecRules) -> Result<Self, NdayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NdayError::InvalidSpec("empty input".to_string()));
        }

        let spec = match text.split_once('-') {
            Some((low, high)) => {
                let low = parse_bound(low, "lower", rules)?;
                let high = parse_bound(high, "upper", rules)?;
                Self::range(low, high)?
            }
            None => Self::fixed(parse_bound(text, "day", rules)?),
        };

        if spec.low == 0 && !rules.allow_zero {
            return Err(NdayError::InvalidSpec(if spec.is_fixed() {
                "a zero-day bury does nothing".to_string()
            } else {
                "the lower bound must be at least 1 day".to_string()
            }));
        }

        Ok(spec)
    }
}

fn parse_bound(raw: &str, which: &str, rules: &SpecRules) -> Result<u32, NdayError> {
    let raw = raw.trim();
    if raw.is_empty() {
        // "-5" splits into "" and "5".
        return Err(NdayError::InvalidSpec(format!(
            "missing {} bound (negative durations are not allowed)",
            which
        )));
    }

    let value: i64 = raw.parse().map_err(|_| {
        NdayError::InvalidSpec(format!("'{}' is not a whole number of days", raw))
    })?;

    if value < 0 {
        return Err(NdayError::InvalidSpec(format!(
            "{} bound {} is negative",
            which, value
        )));
    }
    if value > i64::from(rules.max_days) {
        return Err(NdayError::InvalidSpec(format!(
            "{} bound {} exceeds the maximum of {} days",
            which, value, rules.max_days
        )));
    }

    Ok(value as u32)
}

impl FromStr for DurationSpec {
    type Err = NdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &SpecRules::default())
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fixed() {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}
