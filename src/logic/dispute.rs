//! Disputes: a participant contests a result; an arbiter upholds, overturns or escalates.

use super::BracketEngine;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::models::{
    Dispute, DisputeDecision, DisputeId, DisputeResolution, DisputeStatus, DisputeTarget,
    GameMatch, LogAction, LogEntry, MatchStatus, Outcome, ParticipantId, ReportId, ReportStatus,
};
use crate::store::BracketStore;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DisputeFiling {
    pub filed_by: ParticipantId,
    pub reason: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Post-state after a resolution.
#[derive(Clone, Debug, Serialize)]
pub struct DisputeOutcome {
    pub dispute: Dispute,
    #[serde(rename = "match")]
    pub game: GameMatch,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Open a dispute against a match or one of its reports. At most one dispute per match
    /// can be open; the store enforces that atomically.
    pub fn file_dispute(&self, target: DisputeTarget, filing: DisputeFiling) -> Result<Dispute, EngineError> {
        let reason = filing.reason.trim();
        if reason.is_empty() {
            return Err(EngineError::EmptyReason);
        }
        let (game, report_id) = match target {
            DisputeTarget::Match(id) => (self.store.get_match(id)?, None),
            DisputeTarget::Report(id) => {
                let report = self.store.report(id)?;
                (self.store.get_match(report.match_id)?, Some(report.id))
            }
        };
        if game.slot_of(filing.filed_by).is_none() {
            return Err(EngineError::NotAParticipant {
                match_id: game.id,
                user: filing.filed_by,
            });
        }
        let decided = matches!(game.status, MatchStatus::Completed | MatchStatus::Disputed);
        if !decided && !game.has_submissions() {
            return Err(EngineError::InvalidState {
                reason: "nothing has been reported or decided on this match",
            });
        }

        let now = self.now();
        let dispute = self.store.insert_dispute(Dispute::new(
            game.id,
            report_id,
            filing.filed_by,
            reason.to_string(),
            filing.evidence,
            now,
        ))?;
        if let Some(id) = report_id {
            self.store.set_report_status(id, ReportStatus::Disputed)?;
        }

        log::info!("dispute {} filed on match {} by {}", dispute.id, game.id, filing.filed_by);
        self.record(
            LogEntry::new(
                game.tournament_id,
                LogAction::DisputeFiled {
                    reason: dispute.reason.clone(),
                },
                now,
            )
            .for_match(game.id)
            .for_dispute(dispute.id)
            .by(filing.filed_by),
        );
        self.notify(EngineEvent::DisputeFiled {
            tournament_id: game.tournament_id,
            match_id: game.id,
            dispute_id: dispute.id,
            filed_by: filing.filed_by,
        });
        Ok(dispute)
    }

    /// Close an open dispute with the arbiter's decision.
    ///
    /// Everything that can fail validation (winner not in the match, downstream already moved
    /// on) is checked before the dispute is closed, so a rejected overturn writes nothing.
    pub fn resolve_dispute(
        &self,
        dispute_id: DisputeId,
        arbiter: ParticipantId,
        decision: DisputeDecision,
        notes: &str,
    ) -> Result<DisputeOutcome, EngineError> {
        let dispute = self.store.dispute(dispute_id)?;
        if !dispute.is_open() {
            return Err(EngineError::AlreadyResolved(dispute_id));
        }
        let game = self.store.get_match(dispute.match_id)?;
        if let DisputeDecision::Overturn { winner } = decision {
            if let Some(w) = winner {
                if game.slot_of(w).is_none() {
                    return Err(EngineError::InvalidWinner {
                        match_id: game.id,
                        winner: w,
                    });
                }
                if game.is_completed() && game.winner == Some(w) {
                    return Err(EngineError::InvalidState {
                        reason: "overturn must name a different winner; uphold keeps the result",
                    });
                }
            }
            if game.is_completed() && game.winner != winner {
                self.ensure_downstream_untouched(&game)?;
            }
        }

        let now = self.now();
        let resolved = self.retry_once(|| {
            let current = self.store.dispute(dispute_id)?;
            if !current.is_open() {
                return Err(EngineError::AlreadyResolved(dispute_id));
            }
            let mut next = current.clone();
            next.status = DisputeStatus::Resolved;
            next.resolution = Some(DisputeResolution {
                decision,
                notes: notes.to_string(),
                resolved_by: arbiter,
                resolved_at: now,
            });
            Ok(self.store.update_dispute(current.version, next)?)
        })?;
        log::info!("dispute {} resolved by {}: {:?}", dispute_id, arbiter, decision);
        self.record(
            LogEntry::new(
                game.tournament_id,
                LogAction::DisputeResolved {
                    decision,
                    notes: notes.to_string(),
                },
                now,
            )
            .for_match(game.id)
            .for_dispute(dispute_id)
            .by(arbiter),
        );

        match decision {
            DisputeDecision::Uphold => self.restore_report(&resolved, &game)?,
            DisputeDecision::ManualRequired => {}
            DisputeDecision::Overturn { winner } => {
                let rejected = self.overturned_reports(&resolved, &game)?;
                match winner {
                    Some(w) => {
                        self.override_result(game.id, arbiter, w, notes)?;
                    }
                    None => self.reopen_for_arbitration(&game)?,
                }
                for id in rejected {
                    self.store.set_report_status(id, ReportStatus::Rejected)?;
                }
            }
        }

        self.notify(EngineEvent::DisputeResolved {
            tournament_id: game.tournament_id,
            dispute_id,
            decision,
        });
        Ok(DisputeOutcome {
            dispute: resolved,
            game: self.store.get_match(game.id)?,
        })
    }

    /// After an upheld dispute the report goes back to what the match outcome says it is.
    fn restore_report(&self, dispute: &Dispute, game: &GameMatch) -> Result<(), EngineError> {
        let Some(report_id) = dispute.report_id else {
            return Ok(());
        };
        let report = self.store.report(report_id)?;
        let status = if game.is_completed() && game.winner == Some(report.claimed_winner) {
            ReportStatus::Approved
        } else {
            ReportStatus::Pending
        };
        self.store.set_report_status(report_id, status)?;
        Ok(())
    }

    /// Reports an overturn throws out: the disputed one, or, for a dispute against the whole
    /// match, every report backing the current winner.
    fn overturned_reports(&self, dispute: &Dispute, game: &GameMatch) -> Result<Vec<ReportId>, EngineError> {
        if let Some(id) = dispute.report_id {
            return Ok(vec![id]);
        }
        let Some(winner) = game.winner else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .reports(game.id)?
            .into_iter()
            .filter(|r| r.claimed_winner == winner)
            .map(|r| r.id)
            .collect())
    }

    /// Clear the winner (pulling it back out of the next round) and hold the match for an arbiter.
    fn reopen_for_arbitration(&self, game: &GameMatch) -> Result<(), EngineError> {
        if let (MatchStatus::Completed, Some(previous)) = (game.status, game.winner) {
            self.retract_winner(game, previous)?;
        }
        self.retry_once(|| {
            let current = self.store.get_match(game.id)?;
            let mut next = current.clone();
            next.hold_for_arbitration(Outcome::Overturned);
            Ok(self.store.update_match(current.version, next)?)
        })?;
        self.notify(EngineEvent::MatchNeedsArbitration {
            tournament_id: game.tournament_id,
            match_id: game.id,
        });
        Ok(())
    }
}
