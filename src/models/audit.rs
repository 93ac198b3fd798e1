//! Audit trail: one LogEntry per automatic or administrative transition.

use crate::models::dispute::{DisputeDecision, DisputeId};
use crate::models::game::{MatchId, Slot};
use crate::models::participant::ParticipantId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a forfeit was applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForfeitReason {
    /// One side missed the deadline.
    MissedDeadline,
    /// Both sides missed the deadline.
    BothMissedDeadline,
}

impl std::fmt::Display for ForfeitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForfeitReason::MissedDeadline => write!(f, "missed deadline"),
            ForfeitReason::BothMissedDeadline => write!(f, "both players missed deadline"),
        }
    }
}

/// Transition kind, with a fixed metadata schema per kind.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action_type")]
pub enum LogAction {
    BracketBuilt {
        rounds: u32,
        matches: usize,
        byes: usize,
    },
    MatchActivated {
        deadline: Option<DateTime<Utc>>,
    },
    ResultSubmitted {
        claimed_winner: ParticipantId,
        score_1: u32,
        score_2: u32,
    },
    AutoApproved {
        winner: ParticipantId,
    },
    ConflictFlagged {
        claimed_by_slot_1: ParticipantId,
        claimed_by_slot_2: ParticipantId,
    },
    Bye {
        winner: ParticipantId,
    },
    AutoAdvance {
        winner: ParticipantId,
        from_round: u32,
        to_round: u32,
        slot: Slot,
    },
    AdvanceRetracted {
        player: ParticipantId,
        from_match: MatchId,
    },
    AutoForfeit {
        winner: Option<ParticipantId>,
        reason: ForfeitReason,
        deadline: Option<DateTime<Utc>>,
    },
    DeadlineSet {
        round: u32,
        deadline: DateTime<Utc>,
        matches: usize,
    },
    DisputeFiled {
        reason: String,
    },
    DisputeResolved {
        decision: DisputeDecision,
        notes: String,
    },
    AdminOverride {
        winner: ParticipantId,
        previous_winner: Option<ParticipantId>,
        notes: String,
    },
    TournamentComplete {
        winner: ParticipantId,
    },
}

/// Append-only audit record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub tournament_id: TournamentId,
    pub match_id: Option<MatchId>,
    pub dispute_id: Option<DisputeId>,
    /// Who caused the transition; None for the system itself.
    pub actor: Option<ParticipantId>,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub action: LogAction,
}

impl LogEntry {
    pub fn new(tournament_id: TournamentId, action: LogAction, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            match_id: None,
            dispute_id: None,
            actor: None,
            at,
            action,
        }
    }

    pub fn for_match(mut self, match_id: MatchId) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn for_dispute(mut self, dispute_id: DisputeId) -> Self {
        self.dispute_id = Some(dispute_id);
        self
    }

    pub fn by(mut self, actor: ParticipantId) -> Self {
        self.actor = Some(actor);
        self
    }
}
