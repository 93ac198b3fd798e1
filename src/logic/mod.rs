//! Bracket engine: building, advancement, consensus, forfeits, disputes and overrides.
//!
//! Every operation takes the acting identity explicitly and returns the post-state it wrote.
//! Audit log writes and event delivery happen after the authoritative write and never undo it.

mod advance;
mod arbiter;
mod bracket;
mod consensus;
mod dispute;
mod forfeit;
mod setup;
mod standings;

pub use advance::Advancement;
pub use arbiter::OverrideOutcome;
pub use bracket::BracketSummary;
pub use consensus::{ResultSubmission, SubmitOutcome};
pub use dispute::{DisputeFiling, DisputeOutcome};
pub use forfeit::{SweepFailure, SweepReport};
pub use standings::{RoundStatus, RoundSummary};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventSink, NullSink};
use crate::models::{
    Dispute, DisputeId, GameMatch, LogEntry, MatchId, MatchReport, Tournament, TournamentId,
};
use crate::store::{BracketStore, MemoryStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Entry point for all bracket operations over a [`BracketStore`].
pub struct BracketEngine<S: BracketStore = MemoryStore> {
    store: S,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Engine on the wall clock with events discarded.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            events: Arc::new(NullSink),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tournament(&self, id: TournamentId) -> Result<Tournament, EngineError> {
        Ok(self.store.tournament(id)?)
    }

    pub fn matches(&self, tournament_id: TournamentId) -> Result<Vec<GameMatch>, EngineError> {
        Ok(self.store.matches(tournament_id)?)
    }

    pub fn get_match(&self, id: MatchId) -> Result<GameMatch, EngineError> {
        Ok(self.store.get_match(id)?)
    }

    pub fn reports(&self, match_id: MatchId) -> Result<Vec<MatchReport>, EngineError> {
        Ok(self.store.reports(match_id)?)
    }

    pub fn dispute(&self, id: DisputeId) -> Result<Dispute, EngineError> {
        Ok(self.store.dispute(id)?)
    }

    pub fn disputes(&self, match_id: MatchId) -> Result<Vec<Dispute>, EngineError> {
        Ok(self.store.disputes(match_id)?)
    }

    pub fn logs(&self, tournament_id: TournamentId) -> Result<Vec<LogEntry>, EngineError> {
        Ok(self.store.logs(tournament_id)?)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.config.submission_window
    }

    /// Run a read-modify-write step; on a lost conditional write, re-run it once from a fresh read.
    /// A second loss is returned to the caller as `Conflict`.
    fn retry_once<T>(&self, mut op: impl FnMut() -> Result<T, EngineError>) -> Result<T, EngineError> {
        match op() {
            Err(EngineError::Conflict { entity, id }) => {
                log::debug!("lost update on {} {}, retrying once", entity, id);
                op()
            }
            other => other,
        }
    }

    /// Append to the audit trail. A failed write is logged, never propagated.
    fn record(&self, entry: LogEntry) {
        let action = format!("{:?}", entry.action);
        if let Err(e) = self.store.append_log(entry) {
            log::error!("audit log write failed ({}): {}", e, action);
        }
    }

    /// Hand an event to the sink, retrying once. Failure is logged as a delivery failure.
    fn notify(&self, event: EngineEvent) {
        if self.events.emit(&event).is_ok() {
            return;
        }
        if let Err(e) = self.events.emit(&event) {
            log::warn!("{} (event {:?})", e, event);
        }
    }
}
