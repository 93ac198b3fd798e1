//! Tournament and TournamentStatus.

use crate::error::EngineError;
use crate::models::participant::{Participant, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Taking participants; no bracket yet.
    #[default]
    Draft,
    /// Bracket built, matches in play.
    Active,
    /// Final decided; champion recorded.
    Completed,
}

/// A single-elimination tournament: roster, capacity and lifecycle status.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub organizer_id: ParticipantId,
    /// Bracket size; always a power of two, at least 2.
    pub capacity: u32,
    pub status: TournamentStatus,
    /// Ordered roster. Fixed once the bracket is built.
    pub participants: Vec<Participant>,
    pub champion: Option<ParticipantId>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every conditional write.
    pub version: u64,
}

impl Tournament {
    /// Create a draft tournament. Capacity must be a power of two and at least 2.
    pub fn new(organizer_id: ParticipantId, capacity: u32) -> Result<Self, EngineError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(EngineError::InvalidCapacity(capacity));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            organizer_id,
            capacity,
            status: TournamentStatus::Draft,
            participants: Vec::new(),
            champion: None,
            completed_at: None,
            version: 0,
        })
    }

    /// Number of rounds in the bracket (log2 of capacity).
    pub fn rounds(&self) -> u32 {
        self.capacity.trailing_zeros()
    }

    pub fn is_participant(&self, user_id: ParticipantId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Add a participant (Draft only). Users join once; the roster cannot exceed capacity.
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), EngineError> {
        if self.status != TournamentStatus::Draft {
            return Err(EngineError::InvalidState {
                reason: "participants can only join a draft tournament",
            });
        }
        if self.is_participant(participant.user_id) {
            return Err(EngineError::AlreadyJoined(participant.user_id));
        }
        if self.participants.len() as u32 >= self.capacity {
            return Err(EngineError::CapacityExceeded {
                capacity: self.capacity,
                participants: self.participants.len() + 1,
            });
        }
        self.participants.push(participant);
        Ok(())
    }
}
