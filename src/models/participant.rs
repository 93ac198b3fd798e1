//! Participant and ParticipantRecord data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user taking part in tournaments (used in slots, reports, logs).
pub type ParticipantId = Uuid;

/// A user on a tournament roster. Roster order is the seeding order once the bracket is built.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: ParticipantId,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(user_id: ParticipantId, joined_at: DateTime<Utc>) -> Self {
        Self { user_id, joined_at }
    }
}

/// Win/loss view of one participant within a tournament (for API / display).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub user_id: ParticipantId,
    pub wins: u32,
    pub losses: u32,
    /// Matches won without an opponent (byes and walkovers). Not counted in `wins`.
    pub byes: u32,
    /// Knocked out of the bracket (any recorded loss).
    pub eliminated: bool,
}

impl ParticipantRecord {
    pub fn new(user_id: ParticipantId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Record a played win for this participant.
    pub fn add_win(&mut self) {
        self.wins += 1;
    }

    /// Record a loss; a single-elimination loss eliminates.
    pub fn add_loss(&mut self) {
        self.losses += 1;
        self.eliminated = true;
    }

    /// Record an unopposed advance.
    pub fn add_bye(&mut self) {
        self.byes += 1;
    }
}
