//! MatchReport: one participant's claim about a match result.

use crate::models::game::MatchId;
use crate::models::participant::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a report.
pub type ReportId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Disputed,
}

/// A submitted result. Append-only: only `status` changes after insertion.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub id: ReportId,
    pub match_id: MatchId,
    pub submitter: ParticipantId,
    pub claimed_winner: ParticipantId,
    /// Claimed score for slot one. Informational only.
    pub score_1: u32,
    /// Claimed score for slot two. Informational only.
    pub score_2: u32,
    /// Evidence references (screenshot URLs etc.), stored as given.
    pub evidence: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub status: ReportStatus,
}

impl MatchReport {
    pub fn new(
        match_id: MatchId,
        submitter: ParticipantId,
        claimed_winner: ParticipantId,
        scores: (u32, u32),
        evidence: Vec<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            submitter,
            claimed_winner,
            score_1: scores.0,
            score_2: scores.1,
            evidence,
            submitted_at,
            status: ReportStatus::Pending,
        }
    }
}
