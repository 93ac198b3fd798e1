//! Bracket match, Slot, MatchStatus and Outcome.

use crate::models::participant::ParticipantId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// One of the two participant positions in a match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    #[default]
    One,
    Two,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    /// Slot a match with this number feeds in the next round: odd numbers fill slot one.
    pub fn for_match_number(number: u32) -> Slot {
        if number % 2 == 1 {
            Slot::One
        } else {
            Slot::Two
        }
    }
}

/// Lifecycle of a match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// No occupant now or ever (every feeder is empty). Never produces a winner.
    Empty,
    /// Waiting for slots to fill.
    #[default]
    Pending,
    /// Both slots filled; accepting reports until the deadline.
    Active,
    /// Winner decided.
    Completed,
    /// Awaiting arbitration; `outcome` says why.
    Disputed,
}

/// How a match was decided (or why it is waiting for an arbiter).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Consensus,
    Conflict,
    Forfeit,
    DoubleForfeit,
    Bye,
    Override,
    /// A decided result thrown out on dispute; an arbiter picks the winner.
    Overturned,
}

/// Where the next-round match for a given match lives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NextPosition {
    pub round: u32,
    pub number: u32,
    pub slot: Slot,
}

/// A single bracket match between two slots.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-indexed round.
    pub round: u32,
    /// 1-indexed position within the round.
    pub number: u32,
    pub player_1: Option<ParticipantId>,
    pub player_2: Option<ParticipantId>,
    pub status: MatchStatus,
    /// None until completed.
    pub winner: Option<ParticipantId>,
    pub player_1_submitted_at: Option<DateTime<Utc>>,
    pub player_2_submitted_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
    /// Bumped by the store on every conditional write.
    pub version: u64,
}

impl GameMatch {
    /// Placeholder match with no slots filled.
    pub fn new(tournament_id: TournamentId, round: u32, number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            number,
            player_1: None,
            player_2: None,
            status: MatchStatus::Pending,
            winner: None,
            player_1_submitted_at: None,
            player_2_submitted_at: None,
            deadline: None,
            completed_at: None,
            outcome: None,
            version: 0,
        }
    }

    pub fn player(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::One => self.player_1,
            Slot::Two => self.player_2,
        }
    }

    pub fn set_player(&mut self, slot: Slot, player: Option<ParticipantId>) {
        match slot {
            Slot::One => self.player_1 = player,
            Slot::Two => self.player_2 = player,
        }
    }

    /// Which slot the participant occupies, if any.
    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        if self.player_1 == Some(participant) {
            Some(Slot::One)
        } else if self.player_2 == Some(participant) {
            Some(Slot::Two)
        } else {
            None
        }
    }

    pub fn both_filled(&self) -> bool {
        self.player_1.is_some() && self.player_2.is_some()
    }

    pub fn submitted_at(&self, slot: Slot) -> Option<DateTime<Utc>> {
        match slot {
            Slot::One => self.player_1_submitted_at,
            Slot::Two => self.player_2_submitted_at,
        }
    }

    /// Stamp a slot's submission time. Monotonic: the first stamp wins.
    pub fn mark_submitted(&mut self, slot: Slot, at: DateTime<Utc>) {
        let field = match slot {
            Slot::One => &mut self.player_1_submitted_at,
            Slot::Two => &mut self.player_2_submitted_at,
        };
        if field.is_none() {
            *field = Some(at);
        }
    }

    pub fn has_submissions(&self) -> bool {
        self.player_1_submitted_at.is_some() || self.player_2_submitted_at.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Open for reports or forfeiture: active, or pending with both slots filled.
    pub fn is_open(&self) -> bool {
        match self.status {
            MatchStatus::Active => true,
            MatchStatus::Pending => self.both_filled(),
            _ => false,
        }
    }

    /// Deadline strictly in the past relative to `now`.
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|d| now > d).unwrap_or(false)
    }

    /// Mark completed with `winner`. Caller guarantees the winner occupies a slot.
    pub fn complete(&mut self, winner: ParticipantId, outcome: Outcome, at: DateTime<Utc>) {
        self.winner = Some(winner);
        self.status = MatchStatus::Completed;
        self.outcome = Some(outcome);
        self.completed_at = Some(at);
    }

    /// Park the match for an arbiter with no winner.
    pub fn hold_for_arbitration(&mut self, outcome: Outcome) {
        self.winner = None;
        self.status = MatchStatus::Disputed;
        self.outcome = Some(outcome);
        self.completed_at = None;
    }

    /// Drop any result and deadline; the match waits for its slots again.
    pub fn reset_to_pending(&mut self) {
        self.winner = None;
        self.status = MatchStatus::Pending;
        self.outcome = None;
        self.completed_at = None;
        self.deadline = None;
    }

    /// Position of the match this one feeds.
    pub fn next_position(&self) -> NextPosition {
        NextPosition {
            round: self.round + 1,
            number: self.number.div_ceil(2),
            slot: Slot::for_match_number(self.number),
        }
    }

    /// (round, number) of the previous-round match that feeds `slot`. None in round 1.
    pub fn feeder_position(&self, slot: Slot) -> Option<(u32, u32)> {
        if self.round <= 1 {
            return None;
        }
        let number = match slot {
            Slot::One => self.number * 2 - 1,
            Slot::Two => self.number * 2,
        };
        Some((self.round - 1, number))
    }
}
