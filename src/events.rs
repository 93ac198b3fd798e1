//! Events handed to the notification collaborator at the end of a successful transition.

use crate::error::DeliveryError;
use crate::models::{DisputeDecision, DisputeId, MatchId, ParticipantId, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum EngineEvent {
    MatchActivated {
        tournament_id: TournamentId,
        match_id: MatchId,
        round: u32,
        players: [ParticipantId; 2],
        deadline: Option<DateTime<Utc>>,
    },
    MatchNeedsArbitration {
        tournament_id: TournamentId,
        match_id: MatchId,
    },
    TournamentCompleted {
        tournament_id: TournamentId,
        champion: ParticipantId,
    },
    DisputeFiled {
        tournament_id: TournamentId,
        match_id: MatchId,
        dispute_id: DisputeId,
        filed_by: ParticipantId,
    },
    DisputeResolved {
        tournament_id: TournamentId,
        dispute_id: DisputeId,
        decision: DisputeDecision,
    },
}

/// Consumer of engine events (push, email, websockets...). Delivery is best-effort.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent) -> Result<(), DeliveryError>;
}

/// Drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &EngineEvent) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Writes each event to the log at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &EngineEvent) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(event).map_err(|e| DeliveryError(e.to_string()))?;
        log::info!("event {}", json);
        Ok(())
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &EngineEvent) -> Result<(), DeliveryError> {
        self.events
            .lock()
            .map_err(|_| DeliveryError("recording sink poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}
