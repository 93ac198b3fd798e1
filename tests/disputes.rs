//! Integration tests for disputes and arbiter overrides.

mod common;

use bracket_engine::{
    Advancement, DisputeDecision, DisputeFiling, DisputeStatus, DisputeTarget, EngineError,
    EngineEvent, LogAction, MatchStatus, Outcome, ParticipantId, ReportStatus, TournamentStatus,
};
use common::{built, Harness};
use uuid::Uuid;

fn filing(by: ParticipantId, reason: &str) -> DisputeFiling {
    DisputeFiling {
        filed_by: by,
        reason: reason.to_string(),
        evidence: Vec::new(),
    }
}

/// 4-player bracket where the two sides of match 1-1 claim different winners.
fn conflicted() -> Harness {
    let h = built(4, 4);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.report(m1.id, a, a).unwrap();
    h.report(m1.id, b, b).unwrap();
    h
}

#[test]
fn filing_a_dispute_on_a_report() {
    let h = conflicted();
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    let a_report = h.engine.reports(m1.id).unwrap().into_iter().find(|r| r.submitter == a).unwrap();

    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Report(a_report.id), filing(b, "screenshot is from another game"))
        .unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
    assert_eq!(dispute.match_id, m1.id);
    assert_eq!(dispute.report_id, Some(a_report.id));
    assert_eq!(h.engine.reports(m1.id).unwrap().iter().find(|r| r.id == a_report.id).unwrap().status, ReportStatus::Disputed);
    assert_eq!(
        h.events_where(|e| matches!(e, EngineEvent::DisputeFiled { dispute_id, .. } if *dispute_id == dispute.id))
            .len(),
        1
    );

    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Match(m1.id), filing(a, "they are lying")),
        Err(EngineError::DisputeAlreadyOpen { dispute_id, .. }) if dispute_id == dispute.id
    ));
    assert_eq!(h.engine.disputes(m1.id).unwrap().len(), 1);
}

#[test]
fn filing_validation() {
    let h = built(4, 4);
    let p = &h.players;
    let m1 = h.game(1, 1);
    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Match(m1.id), filing(p[0], "   ")),
        Err(EngineError::EmptyReason)
    ));
    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Match(m1.id), filing(p[2], "not my match")),
        Err(EngineError::NotAParticipant { .. })
    ));
    // nothing reported yet
    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Match(m1.id), filing(p[0], "early")),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Report(Uuid::new_v4()), filing(p[0], "missing")),
        Err(EngineError::NotFound { entity: "report", .. })
    ));
}

#[test]
fn overturn_with_winner_decides_a_conflict() {
    let h = conflicted();
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(b, "I won 2-0"))
        .unwrap();

    let out = h
        .engine
        .resolve_dispute(dispute.id, h.organizer, DisputeDecision::Overturn { winner: Some(b) }, "video confirms")
        .unwrap();
    assert_eq!(out.dispute.status, DisputeStatus::Resolved);
    let resolution = out.dispute.resolution.unwrap();
    assert_eq!(resolution.resolved_by, h.organizer);
    assert_eq!(out.game.status, MatchStatus::Completed);
    assert_eq!(out.game.winner, Some(b));
    assert_eq!(out.game.outcome, Some(Outcome::Override));
    assert_eq!(h.game(2, 1).player_1, Some(b));

    for r in h.engine.reports(m1.id).unwrap() {
        let expected = if r.submitter == b { ReportStatus::Approved } else { ReportStatus::Rejected };
        assert_eq!(r.status, expected);
    }
    let overrides = h.logs_where(|e| e.match_id == Some(m1.id) && matches!(e.action, LogAction::AdminOverride { .. }));
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].actor, Some(h.organizer));
    assert_eq!(
        h.logs_where(|e| e.dispute_id == Some(dispute.id) && matches!(e.action, LogAction::DisputeResolved { .. }))
            .len(),
        1
    );

    assert!(matches!(
        h.engine.resolve_dispute(dispute.id, h.organizer, DisputeDecision::Uphold, ""),
        Err(EngineError::AlreadyResolved(id)) if id == dispute.id
    ));
    assert!(matches!(
        h.engine.file_dispute(DisputeTarget::Match(m1.id), filing(a, "appeal")),
        Ok(_)
    ));
}

#[test]
fn uphold_restores_the_report() {
    let h = built(4, 4);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.agree(m1.id, a);
    let a_report = h.engine.reports(m1.id).unwrap().into_iter().find(|r| r.submitter == a).unwrap();
    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Report(a_report.id), filing(b, "changed my mind"))
        .unwrap();

    let out = h
        .engine
        .resolve_dispute(dispute.id, h.organizer, DisputeDecision::Uphold, "result stands")
        .unwrap();
    assert_eq!(out.game.winner, Some(a));
    assert_eq!(out.game.status, MatchStatus::Completed);
    assert_eq!(h.engine.reports(m1.id).unwrap().iter().find(|r| r.id == a_report.id).unwrap().status, ReportStatus::Approved);
    assert_eq!(h.game(2, 1).player_1, Some(a));
}

#[test]
fn overturn_after_consensus_swaps_the_advanced_player() {
    let h = built(4, 4);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.agree(m1.id, a);
    assert_eq!(h.game(2, 1).player_1, Some(a));

    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(b, "opponent used a smurf account"))
        .unwrap();
    let out = h
        .engine
        .resolve_dispute(dispute.id, h.organizer, DisputeDecision::Overturn { winner: Some(b) }, "confirmed")
        .unwrap();
    assert_eq!(out.game.winner, Some(b));
    assert_eq!(h.game(2, 1).player_1, Some(b));
    assert!(h
        .engine
        .reports(m1.id)
        .unwrap()
        .iter()
        .all(|r| r.status == ReportStatus::Rejected));
    assert_eq!(
        h.logs_where(|e| matches!(e.action, LogAction::AdvanceRetracted { player, .. } if player == a))
            .len(),
        1
    );
}

#[test]
fn overturn_without_winner_reopens_arbitration() {
    let h = built(4, 4);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.agree(m1.id, a);
    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(b, "match never happened"))
        .unwrap();

    let out = h
        .engine
        .resolve_dispute(dispute.id, h.organizer, DisputeDecision::Overturn { winner: None }, "replay needed")
        .unwrap();
    assert_eq!(out.game.status, MatchStatus::Disputed);
    assert_eq!(out.game.winner, None);
    assert_eq!(out.game.outcome, Some(Outcome::Overturned));
    assert_eq!(h.game(2, 1).player_1, None);

    h.engine.override_result(m1.id, h.organizer, b, "replayed").unwrap();
    assert_eq!(h.game(2, 1).player_1, Some(b));
}

#[test]
fn manual_required_leaves_the_match_alone() {
    let h = conflicted();
    let m1 = h.game(1, 1);
    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(h.players[0], "please check"))
        .unwrap();
    let out = h
        .engine
        .resolve_dispute(dispute.id, h.organizer, DisputeDecision::ManualRequired, "escalated")
        .unwrap();
    assert_eq!(out.dispute.status, DisputeStatus::Resolved);
    assert_eq!(out.game.status, MatchStatus::Disputed);
    assert_eq!(out.game.version, m1.version);
}

#[test]
fn overturn_is_refused_once_the_next_match_is_played() {
    let h = built(4, 4);
    let p = &h.players;
    let m1 = h.game(1, 1);
    h.agree(m1.id, p[0]);
    h.agree(h.game(1, 2).id, p[2]);
    h.report(h.game(2, 1).id, p[0], p[0]).unwrap();

    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(p[1], "late appeal"))
        .unwrap();
    assert!(matches!(
        h.engine.resolve_dispute(dispute.id, h.organizer, DisputeDecision::Overturn { winner: Some(p[1]) }, ""),
        Err(EngineError::DownstreamAlreadyAdvanced { match_id, .. }) if match_id == m1.id
    ));
    assert!(h.engine.dispute(dispute.id).unwrap().is_open());
    assert_eq!(h.game(1, 1).winner, Some(p[0]));
    assert!(matches!(
        h.engine.override_result(m1.id, h.organizer, p[1], ""),
        Err(EngineError::DownstreamAlreadyAdvanced { .. })
    ));
}

#[test]
fn override_validation() {
    let h = conflicted();
    let m1 = h.game(1, 1);
    assert!(matches!(
        h.engine.override_result(m1.id, h.organizer, h.players[3], ""),
        Err(EngineError::InvalidWinner { .. })
    ));
    let out = h.engine.override_result(m1.id, h.organizer, h.players[0], "checked the replay").unwrap();
    assert!(matches!(out.advancement, Advancement::Advanced { .. }));
    assert_eq!(out.game.outcome, Some(Outcome::Override));
}

#[test]
fn correcting_the_final_changes_the_champion() {
    let h = built(2, 2);
    let (a, b) = (h.players[0], h.players[1]);
    let last = h.game(1, 1);
    h.agree(last.id, a);
    assert_eq!(h.engine.tournament(h.tournament).unwrap().champion, Some(a));

    let out = h.engine.override_result(last.id, h.organizer, b, "scoring error").unwrap();
    assert_eq!(out.advancement, Advancement::TournamentCompleted { champion: b });
    let t = h.engine.tournament(h.tournament).unwrap();
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.champion, Some(b));
}

#[test]
fn override_waits_for_the_other_feeder() {
    let h = built(4, 4);
    let p = &h.players;
    h.agree(h.game(1, 1).id, p[0]);
    let last = h.game(2, 1);
    assert!(matches!(
        h.engine.override_result(last.id, h.organizer, p[0], "skip ahead"),
        Err(EngineError::InvalidState { .. })
    ));
    assert_eq!(h.engine.tournament(h.tournament).unwrap().status, TournamentStatus::Active);

    h.agree(h.game(1, 2).id, p[2]);
    let last = h.game(2, 1);
    assert_eq!((last.player_1, last.player_2), (Some(p[0]), Some(p[2])));
    assert_eq!(last.status, MatchStatus::Active);
}

#[test]
fn overturn_must_name_a_different_winner() {
    let h = built(4, 4);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.agree(m1.id, a);
    let dispute = h
        .engine
        .file_dispute(DisputeTarget::Match(m1.id), filing(b, "recount"))
        .unwrap();

    assert!(matches!(
        h.engine.resolve_dispute(dispute.id, h.organizer, DisputeDecision::Overturn { winner: Some(a) }, ""),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(h.engine.dispute(dispute.id).unwrap().is_open());
    assert!(h
        .engine
        .reports(m1.id)
        .unwrap()
        .iter()
        .all(|r| r.status == ReportStatus::Approved));
}

#[test]
fn walkover_results_can_still_be_corrected() {
    let h = built(8, 2);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.agree(m1.id, a);
    assert_eq!(h.engine.tournament(h.tournament).unwrap().champion, Some(a));

    let out = h.engine.override_result(m1.id, h.organizer, b, "wrong result entered").unwrap();
    assert!(matches!(out.advancement, Advancement::Advanced { walkover: true, .. }));
    assert_eq!(h.game(2, 1).winner, Some(b));
    assert_eq!(h.game(3, 1).winner, Some(b));
    let t = h.engine.tournament(h.tournament).unwrap();
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.champion, Some(b));
    assert_eq!(
        h.logs_where(|e| matches!(e.action, LogAction::AdvanceRetracted { player, .. } if player == a))
            .len(),
        2
    );
}
