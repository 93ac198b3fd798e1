//! Bracket building: seed the roster, lay out round 1 and the empty later rounds.

use super::BracketEngine;
use crate::config::Seeding;
use crate::error::EngineError;
use crate::models::{
    GameMatch, LogAction, LogEntry, MatchStatus, Outcome, Participant, ParticipantId, Slot,
    Tournament, TournamentId, TournamentStatus,
};
use crate::store::BracketStore;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;

/// Result of a bracket build: the activated tournament and its full match tree.
#[derive(Clone, Debug, Serialize)]
pub struct BracketSummary {
    pub tournament: Tournament,
    pub rounds: u32,
    pub byes: usize,
    /// Every match, ordered by (round, number), as stored after byes were advanced.
    pub matches: Vec<GameMatch>,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Build (or rebuild) the bracket for a tournament from `participants`.
    ///
    /// The roster becomes the tournament's fixed seeding. A previous bracket is discarded in
    /// the same store write that installs the new one. Round-1 pairings are activated and
    /// byes are advanced before returning.
    pub fn build_bracket(
        &self,
        tournament_id: TournamentId,
        organizer: ParticipantId,
        participants: Vec<Participant>,
    ) -> Result<BracketSummary, EngineError> {
        let tournament = self.store.tournament(tournament_id)?;
        if tournament.organizer_id != organizer {
            return Err(EngineError::NotOrganizer(organizer));
        }
        validate_roster(&tournament, &participants)?;

        let seeded = seed(participants, self.config.seeding);
        let now = self.now();
        let layout = layout_bracket(tournament_id, tournament.capacity, &seeded, now);
        let byes = layout
            .iter()
            .filter(|m| m.outcome == Some(Outcome::Bye))
            .count();
        let match_count = layout.len();

        let tournament = self.retry_once(|| {
            let current = self.store.tournament(tournament_id)?;
            if current.status == TournamentStatus::Completed {
                return Err(EngineError::InvalidState {
                    reason: "cannot rebuild the bracket of a completed tournament",
                });
            }
            let mut next = current.clone();
            next.participants = seeded.clone();
            next.status = TournamentStatus::Active;
            next.champion = None;
            next.completed_at = None;
            Ok(self
                .store
                .install_bracket(current.version, next, layout.clone())?)
        })?;

        let rounds = tournament.rounds();
        log::info!(
            "built bracket for tournament {}: {} participants, {} rounds, {} byes",
            tournament_id,
            seeded.len(),
            rounds,
            byes
        );
        self.record(
            LogEntry::new(
                tournament_id,
                LogAction::BracketBuilt {
                    rounds,
                    matches: match_count,
                    byes,
                },
                now,
            )
            .by(organizer),
        );

        let first_round: Vec<GameMatch> = self
            .store
            .matches(tournament_id)?
            .into_iter()
            .filter(|m| m.round == 1)
            .collect();
        for game in &first_round {
            if game.status == MatchStatus::Pending && game.both_filled() {
                self.activate(game.id)?;
            }
        }
        for game in &first_round {
            if let (Some(Outcome::Bye), Some(winner)) = (game.outcome, game.winner) {
                self.record(
                    LogEntry::new(tournament_id, LogAction::Bye { winner }, now).for_match(game.id),
                );
                self.advance_winner(game.id)?;
            }
        }

        Ok(BracketSummary {
            tournament: self.store.tournament(tournament_id)?,
            rounds,
            byes,
            matches: self.store.matches(tournament_id)?,
        })
    }
}

fn validate_roster(tournament: &Tournament, participants: &[Participant]) -> Result<(), EngineError> {
    if participants.len() < 2 {
        return Err(EngineError::InsufficientParticipants {
            found: participants.len(),
        });
    }
    if participants.len() > tournament.capacity as usize {
        return Err(EngineError::CapacityExceeded {
            capacity: tournament.capacity,
            participants: participants.len(),
        });
    }
    let mut seen = HashSet::new();
    for p in participants {
        if !seen.insert(p.user_id) {
            return Err(EngineError::DuplicateParticipant(p.user_id));
        }
    }
    Ok(())
}

/// Order the roster for pairing.
fn seed(mut participants: Vec<Participant>, seeding: Seeding) -> Vec<Participant> {
    match seeding {
        Seeding::Random => participants.shuffle(&mut rand::thread_rng()),
        Seeding::Seeded(seed) => participants.shuffle(&mut StdRng::seed_from_u64(seed)),
        Seeding::Listed => {}
    }
    participants
}

/// Lay out the whole tree for a bracket of `capacity` slots.
///
/// Round 1 pairs seeds consecutively: two occupants make a pending match, a lone occupant a
/// completed bye, none an empty match. A later-round match is empty when both of its feeders
/// are, pending otherwise.
pub(crate) fn layout_bracket(
    tournament_id: TournamentId,
    capacity: u32,
    seeded: &[Participant],
    now: DateTime<Utc>,
) -> Vec<GameMatch> {
    let rounds = capacity.trailing_zeros();
    let mut all = Vec::with_capacity(capacity as usize - 1);

    let mut previous: Vec<MatchStatus> = Vec::new();
    for number in 1..=capacity / 2 {
        let index = (number as usize - 1) * 2;
        let mut game = GameMatch::new(tournament_id, 1, number);
        game.player_1 = seeded.get(index).map(|p| p.user_id);
        game.player_2 = seeded.get(index + 1).map(|p| p.user_id);
        match (game.player_1, game.player_2) {
            (Some(_), Some(_)) => {}
            (Some(sole), None) => game.complete(sole, Outcome::Bye, now),
            _ => game.status = MatchStatus::Empty,
        }
        previous.push(game.status);
        all.push(game);
    }

    for round in 2..=rounds {
        let count = capacity >> round;
        let mut current = Vec::with_capacity(count as usize);
        for number in 1..=count {
            let mut game = GameMatch::new(tournament_id, round, number);
            let feeder = |slot: Slot| match slot {
                Slot::One => previous[number as usize * 2 - 2],
                Slot::Two => previous[number as usize * 2 - 1],
            };
            if feeder(Slot::One) == MatchStatus::Empty && feeder(Slot::Two) == MatchStatus::Empty {
                game.status = MatchStatus::Empty;
            }
            current.push(game.status);
            all.push(game);
        }
        previous = current;
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn roster(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|_| Participant::new(Uuid::new_v4(), Utc::now()))
            .collect()
    }

    #[test]
    fn layout_has_one_final_and_capacity_minus_one_matches() {
        let t = Uuid::new_v4();
        let games = layout_bracket(t, 16, &roster(11), Utc::now());
        assert_eq!(games.len(), 15);
        assert_eq!(games.iter().filter(|m| m.round == 4).count(), 1);
        assert_eq!(games.iter().map(|m| m.round).max(), Some(4));
    }

    #[test]
    fn empty_subtrees_propagate_upwards() {
        let t = Uuid::new_v4();
        // 2 players in 8 slots: only match 1-1 is played, 1-2..1-4 are empty
        let games = layout_bracket(t, 8, &roster(2), Utc::now());
        let status = |round: u32, number: u32| {
            games
                .iter()
                .find(|m| m.round == round && m.number == number)
                .map(|m| m.status)
        };
        assert_eq!(status(1, 1), Some(MatchStatus::Pending));
        assert_eq!(status(1, 2), Some(MatchStatus::Empty));
        assert_eq!(status(2, 1), Some(MatchStatus::Pending));
        assert_eq!(status(2, 2), Some(MatchStatus::Empty));
        assert_eq!(status(3, 1), Some(MatchStatus::Pending));
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let players = roster(8);
        let a = seed(players.clone(), Seeding::Seeded(7));
        let b = seed(players.clone(), Seeding::Seeded(7));
        assert_eq!(a, b);
        assert_eq!(seed(players.clone(), Seeding::Listed), players);
    }
}
