//! Errors returned by engine operations and by the store.

use crate::models::{DisputeId, MatchId, MatchStatus, ParticipantId, Slot};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Broad class of an [`EngineError`], used by callers to pick a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Rejected input; nothing was written.
    Validation,
    NotFound,
    /// Lost a concurrent update twice; safe to retry.
    Transient,
    /// The bracket is in a state that needs manual remediation; nothing was written.
    Invariant,
    /// Backing store failure.
    Storage,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("need at least 2 participants to build a bracket (got {found})")]
    InsufficientParticipants { found: usize },
    #[error("bracket capacity {capacity} cannot hold {participants} participants")]
    CapacityExceeded { capacity: u32, participants: usize },
    #[error("bracket capacity must be a power of two of at least 2 (got {0})")]
    InvalidCapacity(u32),
    #[error("participant {0} appears more than once in the roster")]
    DuplicateParticipant(ParticipantId),
    #[error("participant {0} already joined this tournament")]
    AlreadyJoined(ParticipantId),
    #[error("{0} is not the organizer of this tournament")]
    NotOrganizer(ParticipantId),
    #[error("invalid state: {reason}")]
    InvalidState { reason: &'static str },
    #[error("{user} is not a participant in match {match_id}")]
    NotAParticipant { match_id: MatchId, user: ParticipantId },
    #[error("match {match_id} is not accepting results (status {status:?})")]
    MatchNotActive { match_id: MatchId, status: MatchStatus },
    #[error("{winner} does not occupy a slot in match {match_id}")]
    InvalidWinner { match_id: MatchId, winner: ParticipantId },
    #[error("{submitter} has already submitted a result for match {match_id}")]
    DuplicateSubmission { match_id: MatchId, submitter: ParticipantId },
    #[error("submission deadline {deadline} for match {match_id} has passed")]
    DeadlineExpired { match_id: MatchId, deadline: DateTime<Utc> },
    #[error("a dispute needs a reason")]
    EmptyReason,
    #[error("match {match_id} already has open dispute {dispute_id}")]
    DisputeAlreadyOpen { match_id: MatchId, dispute_id: DisputeId },
    #[error("dispute {0} is already resolved")]
    AlreadyResolved(DisputeId),
    #[error("match {0} has no decided winner to advance")]
    NotCompleted(MatchId),
    #[error(
        "bracket corruption: match {from_match} wants {incoming} in {slot:?} of match {next_match}, which holds {existing}"
    )]
    BracketCorruption {
        from_match: MatchId,
        next_match: MatchId,
        slot: Slot,
        existing: ParticipantId,
        incoming: ParticipantId,
    },
    #[error("match {match_id} already fed match {downstream}, which has progressed (status {status:?})")]
    DownstreamAlreadyAdvanced {
        match_id: MatchId,
        downstream: MatchId,
        status: MatchStatus,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("concurrent update on {entity} {id}; try again")]
    Conflict { entity: &'static str, id: Uuid },
    #[error("roster import failed: {0}")]
    Roster(#[from] csv::Error),
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            NotFound { .. } => ErrorKind::NotFound,
            Conflict { .. } => ErrorKind::Transient,
            BracketCorruption { .. } | DownstreamAlreadyAdvanced { .. } => ErrorKind::Invariant,
            Store(_) => ErrorKind::Storage,
            _ => ErrorKind::Validation,
        }
    }
}

/// Failures reported by a [`crate::store::BracketStore`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    /// Conditional write lost: the stored version moved on.
    #[error("version conflict on {entity} {id}")]
    Conflict { entity: &'static str, id: Uuid },
    #[error("{submitter} already reported on match {match_id}")]
    DuplicateReport { match_id: MatchId, submitter: ParticipantId },
    #[error("match {match_id} already has open dispute {dispute_id}")]
    OpenDispute { match_id: MatchId, dispute_id: DisputeId },
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            StoreError::Conflict { entity, id } => EngineError::Conflict { entity, id },
            StoreError::DuplicateReport { match_id, submitter } => {
                EngineError::DuplicateSubmission { match_id, submitter }
            }
            StoreError::OpenDispute { match_id, dispute_id } => {
                EngineError::DisputeAlreadyOpen { match_id, dispute_id }
            }
            other => EngineError::Store(other),
        }
    }
}

/// Failure handing an event to the notification collaborator.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("event delivery failed: {0}")]
pub struct DeliveryError(pub String);
