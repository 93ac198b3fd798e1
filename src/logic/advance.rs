//! Winner advancement: move a decided winner into the next round, activate matches whose
//! slots are both filled, and crown the champion after the final.

use super::BracketEngine;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::models::{
    GameMatch, LogAction, LogEntry, MatchId, MatchStatus, Outcome, ParticipantId, Slot,
    TournamentStatus,
};
use crate::store::BracketStore;
use serde::Serialize;

/// What an advancement call did.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum Advancement {
    /// Winner written into `slot` of `next_match`.
    Advanced {
        next_match: MatchId,
        slot: Slot,
        /// Both slots are now filled and the match went active.
        activated: bool,
        /// The other slot can never fill, so the next match completed as a bye too.
        walkover: bool,
    },
    /// The slot already held this winner; nothing written.
    AlreadyAdvanced { next_match: MatchId },
    /// The final was decided; the tournament is now completed.
    TournamentCompleted { champion: ParticipantId },
    /// The tournament had already been completed; nothing written.
    AlreadyCompleted { champion: Option<ParticipantId> },
}

enum Fill {
    Present,
    Filled,
    Activated,
    Walkover,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Advance the winner of a completed match. Safe to call repeatedly: a winner already in
    /// place, or an already-completed tournament, is a no-op with no new audit entries.
    ///
    /// Walkovers cascade: if the next match can never receive an opponent it completes as a
    /// bye and its winner is advanced as well. The returned value describes the first step.
    pub fn advance_winner(&self, match_id: MatchId) -> Result<Advancement, EngineError> {
        let game = self.store.get_match(match_id)?;
        let first = self.advance_one(&game)?;
        let mut step = first.clone();
        while let Advancement::Advanced {
            next_match,
            walkover: true,
            ..
        } = step
        {
            let next = self.store.get_match(next_match)?;
            step = self.advance_one(&next)?;
        }
        Ok(first)
    }

    fn advance_one(&self, game: &GameMatch) -> Result<Advancement, EngineError> {
        let winner = match (game.status, game.winner) {
            (MatchStatus::Completed, Some(w)) => w,
            _ => return Err(EngineError::NotCompleted(game.id)),
        };
        let pos = game.next_position();
        if self
            .store
            .match_at(game.tournament_id, pos.round, pos.number)?
            .is_none()
        {
            return self.crown_champion(game, winner);
        }

        let now = self.now();
        let (next, fill) = self.retry_once(|| {
            let next = self
                .store
                .match_at(game.tournament_id, pos.round, pos.number)?
                .ok_or(EngineError::NotFound {
                    entity: "next match",
                    id: game.id,
                })?;
            match next.player(pos.slot) {
                Some(existing) if existing == winner => return Ok((next, Fill::Present)),
                Some(existing) => {
                    return Err(EngineError::BracketCorruption {
                        from_match: game.id,
                        next_match: next.id,
                        slot: pos.slot,
                        existing,
                        incoming: winner,
                    })
                }
                None if matches!(next.status, MatchStatus::Completed | MatchStatus::Disputed) => {
                    return Err(EngineError::InvalidState {
                        reason: "next match was decided without this slot",
                    })
                }
                None => {}
            }
            let mut updated = next.clone();
            updated.set_player(pos.slot, Some(winner));
            let fill = if updated.both_filled() {
                if updated.status == MatchStatus::Pending {
                    updated.status = MatchStatus::Active;
                    if updated.deadline.is_none() {
                        updated.deadline = Some(self.deadline_from(now));
                    }
                    Fill::Activated
                } else {
                    Fill::Filled
                }
            } else if self.feeder_is_empty(&updated, pos.slot.other())? {
                updated.complete(winner, Outcome::Bye, now);
                Fill::Walkover
            } else {
                Fill::Filled
            };
            let saved = self.store.update_match(next.version, updated)?;
            Ok((saved, fill))
        })?;

        if let Fill::Present = fill {
            log::debug!("match {}: {} already in next match {}", game.id, winner, next.id);
            return Ok(Advancement::AlreadyAdvanced { next_match: next.id });
        }

        log::info!(
            "advanced {} from match {} (round {}) to match {} slot {:?}",
            winner,
            game.id,
            game.round,
            next.id,
            pos.slot
        );
        self.record(
            LogEntry::new(
                game.tournament_id,
                LogAction::AutoAdvance {
                    winner,
                    from_round: game.round,
                    to_round: pos.round,
                    slot: pos.slot,
                },
                now,
            )
            .for_match(game.id),
        );
        match fill {
            Fill::Activated => self.announce_activation(&next),
            Fill::Walkover => self.record(
                LogEntry::new(next.tournament_id, LogAction::Bye { winner }, now).for_match(next.id),
            ),
            _ => {}
        }
        Ok(Advancement::Advanced {
            next_match: next.id,
            slot: pos.slot,
            activated: matches!(fill, Fill::Activated),
            walkover: matches!(fill, Fill::Walkover),
        })
    }

    /// Activate a pending match whose slots are both filled. No-op for any other match.
    pub(crate) fn activate(&self, match_id: MatchId) -> Result<GameMatch, EngineError> {
        let now = self.now();
        let (game, changed) = self.retry_once(|| {
            let current = self.store.get_match(match_id)?;
            if current.status != MatchStatus::Pending || !current.both_filled() {
                return Ok((current, false));
            }
            let mut next = current.clone();
            next.status = MatchStatus::Active;
            if next.deadline.is_none() {
                next.deadline = Some(self.deadline_from(now));
            }
            Ok((self.store.update_match(current.version, next)?, true))
        })?;
        if changed {
            self.announce_activation(&game);
        }
        Ok(game)
    }

    fn announce_activation(&self, game: &GameMatch) {
        let (Some(p1), Some(p2)) = (game.player_1, game.player_2) else {
            return;
        };
        log::info!("match {} (round {}) is active", game.id, game.round);
        self.record(
            LogEntry::new(
                game.tournament_id,
                LogAction::MatchActivated {
                    deadline: game.deadline,
                },
                self.now(),
            )
            .for_match(game.id),
        );
        self.notify(EngineEvent::MatchActivated {
            tournament_id: game.tournament_id,
            match_id: game.id,
            round: game.round,
            players: [p1, p2],
            deadline: game.deadline,
        });
    }

    /// Whether the previous-round match feeding `slot` of `game` can never produce a winner.
    pub(crate) fn feeder_is_empty(&self, game: &GameMatch, slot: Slot) -> Result<bool, EngineError> {
        let Some((round, number)) = game.feeder_position(slot) else {
            return Ok(false);
        };
        Ok(self
            .store
            .match_at(game.tournament_id, round, number)?
            .map(|m| m.status == MatchStatus::Empty)
            .unwrap_or(false))
    }

    fn crown_champion(&self, final_match: &GameMatch, champion: ParticipantId) -> Result<Advancement, EngineError> {
        let now = self.now();
        let crowned = self.retry_once(|| {
            let current = self.store.tournament(final_match.tournament_id)?;
            if current.status == TournamentStatus::Completed {
                return Ok(None);
            }
            let mut next = current.clone();
            next.status = TournamentStatus::Completed;
            next.champion = Some(champion);
            next.completed_at = Some(now);
            Ok(Some(self.store.update_tournament(current.version, next)?))
        })?;
        let Some(tournament) = crowned else {
            let existing = self.store.tournament(final_match.tournament_id)?.champion;
            log::debug!("tournament {} already completed", final_match.tournament_id);
            return Ok(Advancement::AlreadyCompleted { champion: existing });
        };
        log::info!("tournament {} completed, champion {}", tournament.id, champion);
        self.record(
            LogEntry::new(tournament.id, LogAction::TournamentComplete { winner: champion }, now)
                .for_match(final_match.id)
                .by(champion),
        );
        self.notify(EngineEvent::TournamentCompleted {
            tournament_id: tournament.id,
            champion,
        });
        Ok(Advancement::TournamentCompleted { champion })
    }

    /// The match `game` feeds, if any.
    pub(crate) fn downstream_of(&self, game: &GameMatch) -> Result<Option<GameMatch>, EngineError> {
        let pos = game.next_position();
        Ok(self.store.match_at(game.tournament_id, pos.round, pos.number)?)
    }

    /// Fail with `DownstreamAlreadyAdvanced` if the match `game` feeds has moved on: decided,
    /// held for arbitration, or reported on.
    pub(crate) fn ensure_downstream_untouched(&self, game: &GameMatch) -> Result<(), EngineError> {
        let Some(next) = self.downstream_of(game)? else {
            return Ok(());
        };
        self.check_not_progressed(game, &next)
    }

    fn check_not_progressed(&self, game: &GameMatch, next: &GameMatch) -> Result<(), EngineError> {
        if self.is_unplayed_walkover(next)? {
            return match self.downstream_of(next)? {
                Some(after) => self.check_not_progressed(next, &after),
                None => Ok(()),
            };
        }
        let progressed = matches!(next.status, MatchStatus::Completed | MatchStatus::Disputed)
            || next.has_submissions()
            || !self.store.reports(next.id)?.is_empty();
        if progressed {
            return Err(EngineError::DownstreamAlreadyAdvanced {
                match_id: game.id,
                downstream: next.id,
                status: next.status,
            });
        }
        Ok(())
    }

    /// A bye completed by the engine that nobody reported on.
    fn is_unplayed_walkover(&self, game: &GameMatch) -> Result<bool, EngineError> {
        Ok(game.is_completed()
            && game.outcome == Some(Outcome::Bye)
            && !game.has_submissions()
            && self.store.reports(game.id)?.is_empty())
    }

    /// Undo the advancement of `player` out of `game`: clear the downstream slot (the match
    /// drops back to pending), or reopen the tournament when `game` is the final. A walkover
    /// `player` got in the next match is undone first, all the way down the cascade.
    pub(crate) fn retract_winner(&self, game: &GameMatch, player: ParticipantId) -> Result<(), EngineError> {
        let pos = game.next_position();
        if let Some(next) = self.store.match_at(game.tournament_id, pos.round, pos.number)? {
            if next.player(pos.slot) == Some(player) && self.is_unplayed_walkover(&next)? {
                self.retract_winner(&next, player)?;
            }
        }
        let now = self.now();
        let retracted = self.retry_once(|| {
            let Some(next) = self
                .store
                .match_at(game.tournament_id, pos.round, pos.number)?
            else {
                return self.reopen_tournament(game, player).map(|_| None);
            };
            match next.player(pos.slot) {
                None => return Ok(None),
                Some(existing) if existing != player => {
                    return Err(EngineError::BracketCorruption {
                        from_match: game.id,
                        next_match: next.id,
                        slot: pos.slot,
                        existing,
                        incoming: player,
                    })
                }
                Some(_) => {}
            }
            self.check_not_progressed(game, &next)?;
            let mut updated = next.clone();
            updated.set_player(pos.slot, None);
            updated.reset_to_pending();
            Ok(Some(self.store.update_match(next.version, updated)?))
        })?;
        if let Some(next) = retracted {
            log::info!("retracted {} from match {}", player, next.id);
            self.record(
                LogEntry::new(
                    next.tournament_id,
                    LogAction::AdvanceRetracted {
                        player,
                        from_match: game.id,
                    },
                    now,
                )
                .for_match(next.id),
            );
        }
        Ok(())
    }

    fn reopen_tournament(&self, final_match: &GameMatch, champion: ParticipantId) -> Result<(), EngineError> {
        let current = self.store.tournament(final_match.tournament_id)?;
        if current.status != TournamentStatus::Completed || current.champion != Some(champion) {
            return Ok(());
        }
        let mut next = current.clone();
        next.status = TournamentStatus::Active;
        next.champion = None;
        next.completed_at = None;
        self.store.update_tournament(current.version, next)?;
        log::info!("tournament {} reopened, champion {} retracted", current.id, champion);
        Ok(())
    }
}
