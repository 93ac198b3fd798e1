//! Shared helpers for the integration tests: an engine on a manual clock with recorded events.

#![allow(dead_code)]

use bracket_engine::{
    BracketEngine, EngineConfig, EngineEvent, GameMatch, LogAction, LogEntry, ManualClock, MatchId,
    MemoryStore, Participant, ParticipantId, RecordingSink, ResultSubmission, Seeding, SubmitOutcome,
    TournamentId,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub engine: BracketEngine<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingSink>,
    pub organizer: ParticipantId,
    pub tournament: TournamentId,
    /// Roster in seeding order (seeding is `listed`).
    pub players: Vec<ParticipantId>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Engine plus a draft tournament of `capacity` with no participants yet.
pub fn draft(capacity: u32) -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let events = Arc::new(RecordingSink::new());
    let engine = BracketEngine::new(
        MemoryStore::new(),
        EngineConfig::default().with_seeding(Seeding::Listed),
    )
    .with_clock(clock.clone())
    .with_events(events.clone());
    let organizer = Uuid::new_v4();
    let tournament = engine.create_tournament(organizer, capacity).unwrap().id;
    Harness {
        engine,
        clock,
        events,
        organizer,
        tournament,
        players: Vec::new(),
    }
}

/// A tournament of `capacity` with `n` participants and its bracket built.
pub fn built(capacity: u32, n: usize) -> Harness {
    let mut h = draft(capacity);
    h.players = (0..n).map(|_| Uuid::new_v4()).collect();
    h.engine
        .build_bracket(h.tournament, h.organizer, h.roster())
        .unwrap();
    h
}

impl Harness {
    pub fn roster(&self) -> Vec<Participant> {
        self.players
            .iter()
            .map(|id| Participant::new(*id, start_time()))
            .collect()
    }

    pub fn game(&self, round: u32, number: u32) -> GameMatch {
        self.engine
            .matches(self.tournament)
            .unwrap()
            .into_iter()
            .find(|m| m.round == round && m.number == number)
            .unwrap()
    }

    pub fn report(
        &self,
        match_id: MatchId,
        submitter: ParticipantId,
        claimed_winner: ParticipantId,
    ) -> Result<SubmitOutcome, bracket_engine::EngineError> {
        self.engine.submit_result(
            match_id,
            ResultSubmission {
                submitter,
                claimed_winner,
                score_1: 2,
                score_2: 1,
                evidence: Vec::new(),
            },
        )
    }

    /// Both sides report `winner`.
    pub fn agree(&self, match_id: MatchId, winner: ParticipantId) -> SubmitOutcome {
        let game = self.engine.get_match(match_id).unwrap();
        self.report(match_id, game.player_1.unwrap(), winner).unwrap();
        self.report(match_id, game.player_2.unwrap(), winner).unwrap()
    }

    pub fn logs_where(&self, pred: impl Fn(&LogEntry) -> bool) -> Vec<LogEntry> {
        self.engine
            .logs(self.tournament)
            .unwrap()
            .into_iter()
            .filter(|e| pred(e))
            .collect()
    }

    pub fn count_logs(&self, match_id: MatchId, pred: impl Fn(&LogAction) -> bool) -> usize {
        self.logs_where(|e| e.match_id == Some(match_id) && pred(&e.action))
            .len()
    }

    pub fn events_where(&self, pred: impl Fn(&EngineEvent) -> bool) -> Vec<EngineEvent> {
        self.events.events().into_iter().filter(|e| pred(e)).collect()
    }
}
