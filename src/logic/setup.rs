//! Setup phase: create a draft tournament and fill its roster (one at a time or from CSV).

use super::BracketEngine;
use crate::error::EngineError;
use crate::models::{Participant, ParticipantId, Tournament, TournamentId};
use crate::store::BracketStore;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io;

/// One row of a roster CSV: `user_id[,joined_at]`.
#[derive(Debug, Deserialize)]
struct RosterRow {
    user_id: ParticipantId,
    #[serde(default)]
    joined_at: Option<DateTime<Utc>>,
}

impl<S: BracketStore> BracketEngine<S> {
    /// Create a draft tournament owned by `organizer`.
    pub fn create_tournament(&self, organizer: ParticipantId, capacity: u32) -> Result<Tournament, EngineError> {
        let tournament = self.store.insert_tournament(Tournament::new(organizer, capacity)?)?;
        log::info!(
            "tournament {} created by {} (capacity {})",
            tournament.id,
            organizer,
            capacity
        );
        Ok(tournament)
    }

    /// Add `user` to the roster of a draft tournament.
    pub fn join_tournament(&self, tournament_id: TournamentId, user: ParticipantId) -> Result<Tournament, EngineError> {
        let now = self.now();
        let tournament = self.retry_once(|| {
            let current = self.store.tournament(tournament_id)?;
            let mut next = current.clone();
            next.add_participant(Participant::new(user, now))?;
            Ok(self.store.update_tournament(current.version, next)?)
        })?;
        log::info!("{} joined tournament {}", user, tournament_id);
        Ok(tournament)
    }

    /// Append participants from a CSV roster (header `user_id,joined_at`; `joined_at` optional).
    /// Organizer only. The whole file is applied in one write, or not at all.
    pub fn import_roster<R: io::Read>(
        &self,
        tournament_id: TournamentId,
        organizer: ParticipantId,
        reader: R,
    ) -> Result<Tournament, EngineError> {
        let mut rows = Vec::new();
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for row in csv_reader.deserialize::<RosterRow>() {
            rows.push(row?);
        }
        let now = self.now();
        let tournament = self.retry_once(|| {
            let current = self.store.tournament(tournament_id)?;
            if current.organizer_id != organizer {
                return Err(EngineError::NotOrganizer(organizer));
            }
            let mut next = current.clone();
            for row in &rows {
                next.add_participant(Participant::new(row.user_id, row.joined_at.unwrap_or(now)))?;
            }
            Ok(self.store.update_tournament(current.version, next)?)
        })?;
        log::info!("imported {} participants into tournament {}", rows.len(), tournament_id);
        Ok(tournament)
    }
}
