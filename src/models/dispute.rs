//! Dispute filed against a match or a specific report.

use crate::models::game::MatchId;
use crate::models::participant::ParticipantId;
use crate::models::report::ReportId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a dispute.
pub type DisputeId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    #[default]
    Open,
    Resolved,
}

/// What a dispute is raised against.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum DisputeTarget {
    Match(MatchId),
    Report(ReportId),
}

/// Arbiter's ruling on a dispute.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum DisputeDecision {
    /// The original result stands.
    Uphold,
    /// The original result is thrown out. With a winner the arbiter decides on the spot;
    /// without one the match goes back to awaiting arbitration.
    Overturn { winner: Option<ParticipantId> },
    /// Needs follow-up outside the engine; the match is left as is.
    ManualRequired,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DisputeResolution {
    pub decision: DisputeDecision,
    pub notes: String,
    pub resolved_by: ParticipantId,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub match_id: MatchId,
    pub report_id: Option<ReportId>,
    pub filed_by: ParticipantId,
    pub reason: String,
    pub evidence: Vec<String>,
    pub status: DisputeStatus,
    pub resolution: Option<DisputeResolution>,
    pub filed_at: DateTime<Utc>,
    /// Bumped by the store on every conditional write.
    pub version: u64,
}

impl Dispute {
    pub fn new(
        match_id: MatchId,
        report_id: Option<ReportId>,
        filed_by: ParticipantId,
        reason: String,
        evidence: Vec<String>,
        filed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            report_id,
            filed_by,
            reason,
            evidence,
            status: DisputeStatus::Open,
            resolution: None,
            filed_at,
            version: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == DisputeStatus::Open
    }
}
