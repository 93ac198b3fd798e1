//! Data structures for the bracket engine: tournaments, matches, reports, disputes, audit log.

mod audit;
mod dispute;
mod game;
mod participant;
mod report;
mod tournament;

pub use audit::{ForfeitReason, LogAction, LogEntry};
pub use dispute::{
    Dispute, DisputeDecision, DisputeId, DisputeResolution, DisputeStatus, DisputeTarget,
};
pub use game::{GameMatch, MatchId, MatchStatus, NextPosition, Outcome, Slot};
pub use participant::{Participant, ParticipantId, ParticipantRecord};
pub use report::{MatchReport, ReportId, ReportStatus};
pub use tournament::{Tournament, TournamentId, TournamentStatus};
