//! Persistence seam. The engine treats the store as the source of truth and relies on
//! its conditional writes (version compare-and-swap, check-and-insert) for atomicity.

use crate::error::StoreError;
use crate::models::{
    Dispute, DisputeId, GameMatch, LogEntry, MatchId, MatchReport, ReportId, ReportStatus,
    Tournament, TournamentId, TournamentStatus,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations the engine needs. Every `update_*` is conditional on the caller's
/// `expected_version` and returns the stored record with its new version.
pub trait BracketStore: Send + Sync {
    fn insert_tournament(&self, tournament: Tournament) -> StoreResult<Tournament>;
    fn tournament(&self, id: TournamentId) -> StoreResult<Tournament>;
    fn tournaments_with_status(&self, status: TournamentStatus) -> StoreResult<Vec<Tournament>>;
    fn update_tournament(&self, expected_version: u64, tournament: Tournament) -> StoreResult<Tournament>;

    /// Write `tournament` (conditional on `expected_version`), discard every match of the
    /// tournament with their reports and disputes, and insert `matches`, as one atomic step.
    fn install_bracket(
        &self,
        expected_version: u64,
        tournament: Tournament,
        matches: Vec<GameMatch>,
    ) -> StoreResult<Tournament>;
    /// Matches ordered by (round, number).
    fn matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<GameMatch>>;
    fn get_match(&self, id: MatchId) -> StoreResult<GameMatch>;
    fn match_at(&self, tournament_id: TournamentId, round: u32, number: u32) -> StoreResult<Option<GameMatch>>;
    fn update_match(&self, expected_version: u64, game: GameMatch) -> StoreResult<GameMatch>;

    /// Fails with `DuplicateReport` if the submitter already reported on the match.
    fn insert_report(&self, report: MatchReport) -> StoreResult<()>;
    fn report(&self, id: ReportId) -> StoreResult<MatchReport>;
    /// Reports on a match in submission order.
    fn reports(&self, match_id: MatchId) -> StoreResult<Vec<MatchReport>>;
    fn set_report_status(&self, id: ReportId, status: ReportStatus) -> StoreResult<()>;

    /// Fails with `OpenDispute` if the match already has an open dispute.
    fn insert_dispute(&self, dispute: Dispute) -> StoreResult<Dispute>;
    fn dispute(&self, id: DisputeId) -> StoreResult<Dispute>;
    fn disputes(&self, match_id: MatchId) -> StoreResult<Vec<Dispute>>;
    fn update_dispute(&self, expected_version: u64, dispute: Dispute) -> StoreResult<Dispute>;

    fn append_log(&self, entry: LogEntry) -> StoreResult<()>;
    fn logs(&self, tournament_id: TournamentId) -> StoreResult<Vec<LogEntry>>;
}

#[derive(Default)]
struct Tables {
    tournaments: HashMap<TournamentId, Tournament>,
    matches: HashMap<MatchId, GameMatch>,
    reports: HashMap<ReportId, MatchReport>,
    disputes: HashMap<DisputeId, Dispute>,
    logs: Vec<LogEntry>,
}

/// In-memory store behind a single `RwLock`; each trait call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl BracketStore for MemoryStore {
    fn insert_tournament(&self, mut tournament: Tournament) -> StoreResult<Tournament> {
        let mut g = self.write()?;
        tournament.version = 1;
        g.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    fn tournament(&self, id: TournamentId) -> StoreResult<Tournament> {
        self.read()?
            .tournaments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "tournament", id })
    }

    fn tournaments_with_status(&self, status: TournamentStatus) -> StoreResult<Vec<Tournament>> {
        Ok(self
            .read()?
            .tournaments
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    fn update_tournament(&self, expected_version: u64, mut tournament: Tournament) -> StoreResult<Tournament> {
        let mut g = self.write()?;
        let id = tournament.id;
        let stored = g
            .tournaments
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "tournament", id })?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict { entity: "tournament", id });
        }
        tournament.version = expected_version + 1;
        *stored = tournament.clone();
        Ok(tournament)
    }

    fn install_bracket(
        &self,
        expected_version: u64,
        mut tournament: Tournament,
        matches: Vec<GameMatch>,
    ) -> StoreResult<Tournament> {
        let mut g = self.write()?;
        let tournament_id = tournament.id;
        let stored = g
            .tournaments
            .get(&tournament_id)
            .ok_or(StoreError::NotFound { entity: "tournament", id: tournament_id })?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict { entity: "tournament", id: tournament_id });
        }
        let old: Vec<MatchId> = g
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .map(|m| m.id)
            .collect();
        for id in &old {
            g.matches.remove(id);
        }
        g.reports.retain(|_, r| !old.contains(&r.match_id));
        g.disputes.retain(|_, d| !old.contains(&d.match_id));
        for mut m in matches {
            m.version = 1;
            g.matches.insert(m.id, m);
        }
        tournament.version = expected_version + 1;
        g.tournaments.insert(tournament_id, tournament.clone());
        Ok(tournament)
    }

    fn matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<GameMatch>> {
        let mut out: Vec<GameMatch> = self
            .read()?
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| (m.round, m.number));
        Ok(out)
    }

    fn get_match(&self, id: MatchId) -> StoreResult<GameMatch> {
        self.read()?
            .matches
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "match", id })
    }

    fn match_at(&self, tournament_id: TournamentId, round: u32, number: u32) -> StoreResult<Option<GameMatch>> {
        Ok(self
            .read()?
            .matches
            .values()
            .find(|m| m.tournament_id == tournament_id && m.round == round && m.number == number)
            .cloned())
    }

    fn update_match(&self, expected_version: u64, mut game: GameMatch) -> StoreResult<GameMatch> {
        let mut g = self.write()?;
        let id = game.id;
        let stored = g
            .matches
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "match", id })?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict { entity: "match", id });
        }
        game.version = expected_version + 1;
        *stored = game.clone();
        Ok(game)
    }

    fn insert_report(&self, report: MatchReport) -> StoreResult<()> {
        let mut g = self.write()?;
        if !g.matches.contains_key(&report.match_id) {
            return Err(StoreError::NotFound { entity: "match", id: report.match_id });
        }
        let duplicate = g
            .reports
            .values()
            .any(|r| r.match_id == report.match_id && r.submitter == report.submitter);
        if duplicate {
            return Err(StoreError::DuplicateReport {
                match_id: report.match_id,
                submitter: report.submitter,
            });
        }
        g.reports.insert(report.id, report);
        Ok(())
    }

    fn report(&self, id: ReportId) -> StoreResult<MatchReport> {
        self.read()?
            .reports
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "report", id })
    }

    fn reports(&self, match_id: MatchId) -> StoreResult<Vec<MatchReport>> {
        let mut out: Vec<MatchReport> = self
            .read()?
            .reports
            .values()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.submitted_at);
        Ok(out)
    }

    fn set_report_status(&self, id: ReportId, status: ReportStatus) -> StoreResult<()> {
        let mut g = self.write()?;
        let report = g
            .reports
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "report", id })?;
        report.status = status;
        Ok(())
    }

    fn insert_dispute(&self, mut dispute: Dispute) -> StoreResult<Dispute> {
        let mut g = self.write()?;
        if !g.matches.contains_key(&dispute.match_id) {
            return Err(StoreError::NotFound { entity: "match", id: dispute.match_id });
        }
        if let Some(open) = g
            .disputes
            .values()
            .find(|d| d.match_id == dispute.match_id && d.is_open())
        {
            return Err(StoreError::OpenDispute {
                match_id: dispute.match_id,
                dispute_id: open.id,
            });
        }
        dispute.version = 1;
        g.disputes.insert(dispute.id, dispute.clone());
        Ok(dispute)
    }

    fn dispute(&self, id: DisputeId) -> StoreResult<Dispute> {
        self.read()?
            .disputes
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "dispute", id })
    }

    fn disputes(&self, match_id: MatchId) -> StoreResult<Vec<Dispute>> {
        let mut out: Vec<Dispute> = self
            .read()?
            .disputes
            .values()
            .filter(|d| d.match_id == match_id)
            .cloned()
            .collect();
        out.sort_by_key(|d| d.filed_at);
        Ok(out)
    }

    fn update_dispute(&self, expected_version: u64, mut dispute: Dispute) -> StoreResult<Dispute> {
        let mut g = self.write()?;
        let id = dispute.id;
        let stored = g
            .disputes
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "dispute", id })?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict { entity: "dispute", id });
        }
        dispute.version = expected_version + 1;
        *stored = dispute.clone();
        Ok(dispute)
    }

    fn append_log(&self, entry: LogEntry) -> StoreResult<()> {
        self.write()?.logs.push(entry);
        Ok(())
    }

    fn logs(&self, tournament_id: TournamentId) -> StoreResult<Vec<LogEntry>> {
        Ok(self
            .read()?
            .logs
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameMatch, Tournament};
    use uuid::Uuid;

    #[test]
    fn update_match_rejects_stale_version() {
        let store = MemoryStore::new();
        let t = store
            .insert_tournament(Tournament::new(Uuid::new_v4(), 2).unwrap())
            .unwrap();
        let m = GameMatch::new(t.id, 1, 1);
        let id = m.id;
        store.install_bracket(t.version, t.clone(), vec![m]).unwrap();

        let first = store.get_match(id).unwrap();
        let saved = store.update_match(first.version, first.clone()).unwrap();
        assert_eq!(saved.version, first.version + 1);
        assert!(matches!(
            store.update_match(first.version, first),
            Err(StoreError::Conflict { entity: "match", .. })
        ));
    }

    #[test]
    fn install_bracket_discards_previous_matches() {
        let store = MemoryStore::new();
        let t = store
            .insert_tournament(Tournament::new(Uuid::new_v4(), 4).unwrap())
            .unwrap();
        let t = store
            .install_bracket(
                t.version,
                t.clone(),
                vec![GameMatch::new(t.id, 1, 1), GameMatch::new(t.id, 1, 2)],
            )
            .unwrap();
        let stale = t.version - 1;
        assert!(matches!(
            store.install_bracket(stale, t.clone(), Vec::new()),
            Err(StoreError::Conflict { entity: "tournament", .. })
        ));
        store
            .install_bracket(t.version, t.clone(), vec![GameMatch::new(t.id, 1, 1)])
            .unwrap();
        assert_eq!(store.matches(t.id).unwrap().len(), 1);
    }
}
