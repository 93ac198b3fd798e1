//! Read-side views: per-round progress and per-participant records.

use super::BracketEngine;
use crate::error::EngineError;
use crate::models::{MatchStatus, Outcome, ParticipantId, ParticipantRecord, TournamentId};
use crate::store::BracketStore;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// No match in the round has both players yet.
    Waiting,
    Active,
    Completed,
}

/// Progress of one round. Empty matches (no possible occupant) are not counted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub matches: usize,
    pub completed: usize,
    /// Held for an arbiter (conflicting reports, double forfeit, overturned result).
    pub disputed: usize,
    pub status: RoundStatus,
}

impl<S: BracketStore> BracketEngine<S> {
    pub fn round_summaries(&self, tournament_id: TournamentId) -> Result<Vec<RoundSummary>, EngineError> {
        let tournament = self.store.tournament(tournament_id)?;
        let matches = self.store.matches(tournament_id)?;
        let mut out = Vec::new();
        for round in 1..=tournament.rounds() {
            let in_round: Vec<_> = matches
                .iter()
                .filter(|m| m.round == round && m.status != MatchStatus::Empty)
                .collect();
            if in_round.is_empty() {
                continue;
            }
            let completed = in_round.iter().filter(|m| m.is_completed()).count();
            let disputed = in_round
                .iter()
                .filter(|m| m.status == MatchStatus::Disputed)
                .count();
            let started = in_round
                .iter()
                .any(|m| m.status != MatchStatus::Pending || m.both_filled());
            let status = if completed == in_round.len() {
                RoundStatus::Completed
            } else if started {
                RoundStatus::Active
            } else {
                RoundStatus::Waiting
            };
            out.push(RoundSummary {
                round,
                matches: in_round.len(),
                completed,
                disputed,
                status,
            });
        }
        Ok(out)
    }

    /// Wins, losses and byes of `user` across the tournament's decided matches.
    pub fn participant_record(
        &self,
        tournament_id: TournamentId,
        user: ParticipantId,
    ) -> Result<ParticipantRecord, EngineError> {
        let tournament = self.store.tournament(tournament_id)?;
        if !tournament.is_participant(user) {
            return Err(EngineError::NotFound {
                entity: "participant",
                id: user,
            });
        }
        let mut record = ParticipantRecord::new(user);
        for game in self.store.matches(tournament_id)? {
            let Some(winner) = game.winner.filter(|_| game.is_completed()) else {
                continue;
            };
            if winner == user {
                if game.outcome == Some(Outcome::Bye) {
                    record.add_bye();
                } else {
                    record.add_win();
                }
            } else if game.slot_of(user).is_some() {
                record.add_loss();
            }
        }
        Ok(record)
    }
}
