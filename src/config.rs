//! Engine settings. Defaults match the hosted service; override with env vars.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the roster is ordered into round-1 slots.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seeding {
    /// Fresh random shuffle on every build.
    #[default]
    Random,
    /// Roster order as given.
    Listed,
    /// Deterministic shuffle from a fixed seed.
    Seeded(u64),
}

impl Seeding {
    /// Parse `random`, `listed`, or `seeded:<u64>`.
    pub fn parse(s: &str) -> Option<Seeding> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "random" => Some(Seeding::Random),
            "listed" => Some(Seeding::Listed),
            other => other
                .strip_prefix("seeded:")
                .and_then(|n| n.parse().ok())
                .map(Seeding::Seeded),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// How long players get to report once a match activates.
    pub submission_window: chrono::Duration,
    pub seeding: Seeding,
    /// Period of the server's background forfeiture sweep.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submission_window: chrono::Duration::hours(24),
            seeding: Seeding::Random,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl EngineConfig {
    /// Read `BRACKET_SUBMISSION_WINDOW_HOURS`, `BRACKET_SEEDING`, `BRACKET_SWEEP_INTERVAL_SECS`.
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let submission_window = std::env::var("BRACKET_SUBMISSION_WINDOW_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .map(chrono::Duration::hours)
            .unwrap_or(defaults.submission_window);
        let seeding = std::env::var("BRACKET_SEEDING")
            .ok()
            .and_then(|s| Seeding::parse(&s))
            .unwrap_or(defaults.seeding);
        let sweep_interval = std::env::var("BRACKET_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);
        Self {
            submission_window,
            seeding,
            sweep_interval,
        }
    }

    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }
}
