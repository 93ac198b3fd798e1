//! Result consensus: each side reports once; matching claimed winners finalize the match,
//! conflicting ones hold it for an arbiter. Scores are informational and never compared.

use super::{Advancement, BracketEngine};
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::models::{
    GameMatch, LogAction, LogEntry, MatchId, MatchReport, MatchStatus, Outcome, ParticipantId,
    ReportStatus,
};
use crate::store::BracketStore;
use serde::{Deserialize, Serialize};

/// One participant's report on a match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub submitter: ParticipantId,
    pub claimed_winner: ParticipantId,
    pub score_1: u32,
    pub score_2: u32,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Post-state after a submission.
#[derive(Clone, Debug, Serialize)]
pub struct SubmitOutcome {
    /// The match has a winner (now or already).
    pub finalized: bool,
    pub status: MatchStatus,
    #[serde(rename = "match")]
    pub game: GameMatch,
    pub report: MatchReport,
    /// Present when this submission finalized the match.
    pub advancement: Option<Advancement>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Verdict {
    /// Only one side has reported.
    Waiting,
    Agreement(ParticipantId),
    Conflict {
        slot_1_claims: ParticipantId,
        slot_2_claims: ParticipantId,
    },
    /// Another trigger finalized the match first.
    Settled,
}

/// Compare both sides' claimed winners.
fn reconcile(game: &GameMatch, reports: &[MatchReport]) -> Verdict {
    let claim_of = |player: Option<ParticipantId>| {
        player.and_then(|p| reports.iter().find(|r| r.submitter == p).map(|r| r.claimed_winner))
    };
    match (claim_of(game.player_1), claim_of(game.player_2)) {
        (Some(a), Some(b)) if a == b => Verdict::Agreement(a),
        (Some(a), Some(b)) => Verdict::Conflict {
            slot_1_claims: a,
            slot_2_claims: b,
        },
        _ => Verdict::Waiting,
    }
}

impl<S: BracketStore> BracketEngine<S> {
    /// Record a participant's result report and reconcile it with the opponent's, if any.
    ///
    /// Resubmitting the identical report after a `Conflict` error picks up where the failed
    /// call stopped: the stored report is reused and stamped on the match.
    pub fn submit_result(
        &self,
        match_id: MatchId,
        submission: ResultSubmission,
    ) -> Result<SubmitOutcome, EngineError> {
        let now = self.now();
        let game = self.store.get_match(match_id)?;
        let unstamped = self.unstamped_report(&game, &submission)?;
        let submitted_at = unstamped.as_ref().map_or(now, |r| r.submitted_at);
        if let Some(deadline) = game.deadline {
            if submitted_at > deadline {
                return Err(EngineError::DeadlineExpired { match_id, deadline });
            }
        }
        let slot = game
            .slot_of(submission.submitter)
            .ok_or(EngineError::NotAParticipant {
                match_id,
                user: submission.submitter,
            })?;
        if !game.is_open() {
            return Err(EngineError::MatchNotActive {
                match_id,
                status: game.status,
            });
        }
        if game.slot_of(submission.claimed_winner).is_none() {
            return Err(EngineError::InvalidWinner {
                match_id,
                winner: submission.claimed_winner,
            });
        }
        if game.submitted_at(slot).is_some() {
            return Err(EngineError::DuplicateSubmission {
                match_id,
                submitter: submission.submitter,
            });
        }

        let report = match unstamped {
            Some(report) => {
                log::info!("match {}: resuming report {} by {}", match_id, report.id, report.submitter);
                report
            }
            None => {
                let report = MatchReport::new(
                    match_id,
                    submission.submitter,
                    submission.claimed_winner,
                    (submission.score_1, submission.score_2),
                    submission.evidence,
                    now,
                );
                self.store.insert_report(report.clone())?;
                self.record(
                    LogEntry::new(
                        game.tournament_id,
                        LogAction::ResultSubmitted {
                            claimed_winner: report.claimed_winner,
                            score_1: report.score_1,
                            score_2: report.score_2,
                        },
                        now,
                    )
                    .for_match(match_id)
                    .by(report.submitter),
                );
                report
            }
        };

        let (saved, verdict) = self.retry_once(|| {
            let current = self.store.get_match(match_id)?;
            if !current.is_open() {
                return Ok((current, Verdict::Settled));
            }
            let reports = self.store.reports(match_id)?;
            let verdict = reconcile(&current, &reports);
            let mut next = current.clone();
            // also heals a stamp an earlier failed call left off
            for r in &reports {
                if let Some(s) = current.slot_of(r.submitter) {
                    next.mark_submitted(s, r.submitted_at);
                }
            }
            match verdict {
                Verdict::Agreement(winner) => next.complete(winner, Outcome::Consensus, now),
                Verdict::Conflict { .. } => next.hold_for_arbitration(Outcome::Conflict),
                Verdict::Waiting | Verdict::Settled => {}
            }
            Ok((self.store.update_match(current.version, next)?, verdict))
        })?;

        let mut advancement = None;
        match verdict {
            Verdict::Agreement(winner) => {
                for r in self.store.reports(match_id)? {
                    self.store.set_report_status(r.id, ReportStatus::Approved)?;
                }
                log::info!("match {} auto-approved, winner {}", match_id, winner);
                self.record(
                    LogEntry::new(saved.tournament_id, LogAction::AutoApproved { winner }, now)
                        .for_match(match_id)
                        .by(winner),
                );
                advancement = Some(self.advance_winner(match_id)?);
            }
            Verdict::Conflict {
                slot_1_claims,
                slot_2_claims,
            } => {
                log::warn!(
                    "match {} reports disagree ({} vs {}); held for arbitration",
                    match_id,
                    slot_1_claims,
                    slot_2_claims
                );
                self.record(
                    LogEntry::new(
                        saved.tournament_id,
                        LogAction::ConflictFlagged {
                            claimed_by_slot_1: slot_1_claims,
                            claimed_by_slot_2: slot_2_claims,
                        },
                        now,
                    )
                    .for_match(match_id),
                );
                self.notify(EngineEvent::MatchNeedsArbitration {
                    tournament_id: saved.tournament_id,
                    match_id,
                });
            }
            Verdict::Waiting => {
                log::debug!("match {}: waiting for the other report", match_id);
            }
            Verdict::Settled => {
                // decided by another trigger; the late report follows that result
                log::debug!("match {} was settled concurrently", match_id);
                if let Some(winner) = saved.winner {
                    let status = if report.claimed_winner == winner {
                        ReportStatus::Approved
                    } else {
                        ReportStatus::Rejected
                    };
                    self.store.set_report_status(report.id, status)?;
                }
            }
        }

        let report = self.store.report(report.id)?;
        Ok(SubmitOutcome {
            finalized: saved.is_completed(),
            status: saved.status,
            game: saved,
            report,
            advancement,
        })
    }

    /// The submitter's stored report when a previous call inserted it but never got the
    /// stamp onto the match. Only an identical resubmission may pick it up.
    fn unstamped_report(
        &self,
        game: &GameMatch,
        submission: &ResultSubmission,
    ) -> Result<Option<MatchReport>, EngineError> {
        let Some(slot) = game.slot_of(submission.submitter) else {
            return Ok(None);
        };
        if game.submitted_at(slot).is_some() {
            return Ok(None);
        }
        let existing = self
            .store
            .reports(game.id)?
            .into_iter()
            .find(|r| r.submitter == submission.submitter);
        match existing {
            Some(r)
                if r.claimed_winner == submission.claimed_winner
                    && (r.score_1, r.score_2) == (submission.score_1, submission.score_2) =>
            {
                Ok(Some(r))
            }
            Some(_) => Err(EngineError::DuplicateSubmission {
                match_id: game.id,
                submitter: submission.submitter,
            }),
            None => Ok(None),
        }
    }
}
