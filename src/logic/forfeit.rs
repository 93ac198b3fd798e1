//! Deadline enforcement: forfeiture sweep and round deadlines.

use super::BracketEngine;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::models::{
    ForfeitReason, GameMatch, LogAction, LogEntry, MatchId, MatchStatus, Outcome, ParticipantId,
    ReportStatus, Slot, TournamentId, TournamentStatus,
};
use crate::store::BracketStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A match the sweep could not process.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SweepFailure {
    pub match_id: MatchId,
    pub error: String,
}

/// Tally of one sweep over a tournament.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SweepReport {
    pub tournament_id: TournamentId,
    /// Matches this pass finalized or held (forfeited + double_forfeits).
    pub processed: usize,
    pub forfeited: usize,
    pub double_forfeits: usize,
    /// Expired candidates another trigger settled first.
    pub skipped: usize,
    pub failures: Vec<SweepFailure>,
}

struct Forfeit {
    game: GameMatch,
    winner: Option<ParticipantId>,
    reason: ForfeitReason,
    deadline: Option<DateTime<Utc>>,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Forfeit every open match of the tournament whose deadline has passed.
    ///
    /// One side reported: that side wins and advances. Neither reported: no winner, the match
    /// is held for an arbiter. Safe to re-run; a per-match failure is collected in the report
    /// and the scan continues.
    pub fn run_forfeiture_sweep(&self, tournament_id: TournamentId) -> Result<SweepReport, EngineError> {
        let now = self.now();
        let mut report = SweepReport {
            tournament_id,
            ..SweepReport::default()
        };
        let expired: Vec<MatchId> = self
            .store
            .matches(tournament_id)?
            .into_iter()
            .filter(|m| m.is_open() && m.deadline_passed(now))
            .map(|m| m.id)
            .collect();

        for match_id in expired {
            match self.forfeit_match(match_id, now) {
                Ok(Some(f)) if f.winner.is_some() => {
                    report.processed += 1;
                    report.forfeited += 1;
                }
                Ok(Some(_)) => {
                    report.processed += 1;
                    report.double_forfeits += 1;
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    log::warn!("forfeiture sweep: match {} failed: {}", match_id, e);
                    report.failures.push(SweepFailure {
                        match_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        if report.processed > 0 || !report.failures.is_empty() {
            log::info!(
                "forfeiture sweep on {}: {} processed ({} forfeits, {} double), {} failed",
                tournament_id,
                report.processed,
                report.forfeited,
                report.double_forfeits,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Sweep every active tournament. A tournament that fails to list is logged and skipped.
    pub fn run_forfeiture_sweep_all(&self) -> Result<Vec<SweepReport>, EngineError> {
        let active = self.store.tournaments_with_status(TournamentStatus::Active)?;
        let mut reports = Vec::with_capacity(active.len());
        for t in active {
            match self.run_forfeiture_sweep(t.id) {
                Ok(r) => reports.push(r),
                Err(e) => log::warn!("forfeiture sweep on {} failed: {}", t.id, e),
            }
        }
        Ok(reports)
    }

    fn forfeit_match(&self, match_id: MatchId, now: DateTime<Utc>) -> Result<Option<Forfeit>, EngineError> {
        let forfeit = self.retry_once(|| {
            let current = self.store.get_match(match_id)?;
            if !current.is_open() || !current.deadline_passed(now) {
                return Ok(None);
            }
            // a stored report counts even if its stamp never reached the match
            let reports = self.store.reports(match_id)?;
            let reported = |slot: Slot| {
                current.submitted_at(slot).is_some()
                    || current
                        .player(slot)
                        .is_some_and(|p| reports.iter().any(|r| r.submitter == p))
            };
            let (reported_1, reported_2) = (reported(Slot::One), reported(Slot::Two));
            let (winner, reason) = match (reported_1, reported_2) {
                (true, false) => (current.player_1, ForfeitReason::MissedDeadline),
                (false, true) => (current.player_2, ForfeitReason::MissedDeadline),
                (false, false) => (None, ForfeitReason::BothMissedDeadline),
                // both reported: consensus owns this match
                (true, true) => return Ok(None),
            };
            let mut next = current.clone();
            match winner {
                Some(w) => next.complete(w, Outcome::Forfeit, now),
                None => next.hold_for_arbitration(Outcome::DoubleForfeit),
            }
            let saved = self.store.update_match(current.version, next)?;
            Ok(Some(Forfeit {
                game: saved,
                winner,
                reason,
                deadline: current.deadline,
            }))
        })?;
        let Some(f) = forfeit else {
            return Ok(None);
        };

        log::info!("match {} forfeited ({}), winner {:?}", match_id, f.reason, f.winner);
        self.record(
            LogEntry::new(
                f.game.tournament_id,
                LogAction::AutoForfeit {
                    winner: f.winner,
                    reason: f.reason,
                    deadline: f.deadline,
                },
                now,
            )
            .for_match(match_id),
        );
        match f.winner {
            Some(winner) => {
                for r in self.store.reports(match_id)? {
                    if r.submitter == winner && r.claimed_winner == winner {
                        self.store.set_report_status(r.id, ReportStatus::Approved)?;
                    }
                }
                self.advance_winner(match_id)?;
            }
            None => self.notify(EngineEvent::MatchNeedsArbitration {
                tournament_id: f.game.tournament_id,
                match_id,
            }),
        }
        Ok(Some(f))
    }

    /// Reset the deadline of every pending or active match in `round`. Organizer only.
    pub fn set_round_deadline(
        &self,
        tournament_id: TournamentId,
        actor: ParticipantId,
        round: u32,
        deadline: DateTime<Utc>,
    ) -> Result<Vec<GameMatch>, EngineError> {
        let tournament = self.store.tournament(tournament_id)?;
        if tournament.organizer_id != actor {
            return Err(EngineError::NotOrganizer(actor));
        }
        if round == 0 || round > tournament.rounds() {
            return Err(EngineError::InvalidState {
                reason: "round is outside the bracket",
            });
        }
        let targets: Vec<MatchId> = self
            .store
            .matches(tournament_id)?
            .into_iter()
            .filter(|m| m.round == round)
            .filter(|m| matches!(m.status, MatchStatus::Pending | MatchStatus::Active))
            .map(|m| m.id)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for match_id in targets {
            let saved = self.retry_once(|| {
                let current = self.store.get_match(match_id)?;
                let mut next = current.clone();
                next.deadline = Some(deadline);
                Ok(self.store.update_match(current.version, next)?)
            })?;
            updated.push(saved);
        }
        log::info!(
            "round {} of {} deadline set to {} ({} matches)",
            round,
            tournament_id,
            deadline,
            updated.len()
        );
        self.record(
            LogEntry::new(
                tournament_id,
                LogAction::DeadlineSet {
                    round,
                    deadline,
                    matches: updated.len(),
                },
                self.now(),
            )
            .by(actor),
        );
        Ok(updated)
    }
}
