//! Single-elimination bracket engine: library with models, store and business logic.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logic;
pub mod models;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, Seeding};
pub use error::{DeliveryError, EngineError, ErrorKind, StoreError};
pub use events::{EngineEvent, EventSink, LogSink, NullSink, RecordingSink};
pub use logic::{
    Advancement, BracketEngine, BracketSummary, DisputeFiling, DisputeOutcome, OverrideOutcome,
    ResultSubmission, RoundStatus, RoundSummary, SubmitOutcome, SweepFailure, SweepReport,
};
pub use models::{
    Dispute, DisputeDecision, DisputeId, DisputeStatus, DisputeTarget, GameMatch, LogAction,
    LogEntry, MatchId, MatchReport, MatchStatus, Outcome, Participant, ParticipantId,
    ParticipantRecord, ReportId, ReportStatus, Slot, Tournament, TournamentId, TournamentStatus,
};
pub use store::{BracketStore, MemoryStore};
