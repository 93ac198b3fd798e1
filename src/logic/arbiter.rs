//! Arbiter override: force a winner onto a match, correcting an earlier result if needed.

use super::{Advancement, BracketEngine};
use crate::error::EngineError;
use crate::models::{
    GameMatch, LogAction, LogEntry, MatchId, MatchStatus, Outcome, ParticipantId, ReportStatus, Slot,
};
use crate::store::BracketStore;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct OverrideOutcome {
    #[serde(rename = "match")]
    pub game: GameMatch,
    pub advancement: Advancement,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Set `winner` as the result of `match_id` and advance it.
    ///
    /// Works on active, disputed and completed matches. A match with one occupant only
    /// qualifies when its other feeder is empty. Changing the winner of a completed match first
    /// pulls the old winner back out of the next round, which is only allowed while that match
    /// has not been played; otherwise `DownstreamAlreadyAdvanced`.
    pub fn override_result(
        &self,
        match_id: MatchId,
        arbiter: ParticipantId,
        winner: ParticipantId,
        notes: &str,
    ) -> Result<OverrideOutcome, EngineError> {
        let game = self.store.get_match(match_id)?;
        if game.status == MatchStatus::Empty {
            return Err(EngineError::InvalidState {
                reason: "match has no participants",
            });
        }
        if game.slot_of(winner).is_none() {
            return Err(EngineError::InvalidWinner { match_id, winner });
        }
        // a lone occupant can only be handed the match if the other side can never fill
        if !game.both_filled() {
            let open_slot = if game.player_1.is_none() { Slot::One } else { Slot::Two };
            if !self.feeder_is_empty(&game, open_slot)? {
                return Err(EngineError::InvalidState {
                    reason: "the other slot is still waiting on its feeder match",
                });
            }
        }
        let previous_winner = game.winner;
        if let (MatchStatus::Completed, Some(previous)) = (game.status, previous_winner) {
            if previous != winner {
                self.ensure_downstream_untouched(&game)?;
                self.retract_winner(&game, previous)?;
            }
        }

        let now = self.now();
        let saved = self.retry_once(|| {
            let current = self.store.get_match(match_id)?;
            let mut next = current.clone();
            next.complete(winner, Outcome::Override, now);
            Ok(self.store.update_match(current.version, next)?)
        })?;
        for r in self.store.reports(match_id)? {
            let status = if r.claimed_winner == winner {
                ReportStatus::Approved
            } else {
                ReportStatus::Rejected
            };
            if r.status != status {
                self.store.set_report_status(r.id, status)?;
            }
        }

        log::info!(
            "match {} overridden by {}: winner {} (was {:?})",
            match_id,
            arbiter,
            winner,
            previous_winner
        );
        self.record(
            LogEntry::new(
                saved.tournament_id,
                LogAction::AdminOverride {
                    winner,
                    previous_winner,
                    notes: notes.to_string(),
                },
                now,
            )
            .for_match(match_id)
            .by(arbiter),
        );
        let advancement = self.advance_winner(match_id)?;
        Ok(OverrideOutcome {
            game: self.store.get_match(match_id)?,
            advancement,
        })
    }
}
