//! Integration tests for the forfeiture sweep and round deadlines.

mod common;

use bracket_engine::models::ForfeitReason;
use bracket_engine::{
    EngineError, EngineEvent, LogAction, MatchStatus, Outcome, ReportStatus, TournamentStatus,
};
use chrono::Duration;
use common::{built, start_time};
use uuid::Uuid;

#[test]
fn sweep_forfeits_overdue_matches() {
    let h = built(4, 4);
    let p = &h.players;
    let m1 = h.game(1, 1);
    h.report(m1.id, p[0], p[0]).unwrap();

    h.clock.advance(Duration::hours(25));
    let report = h.engine.run_forfeiture_sweep(h.tournament).unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.forfeited, 1);
    assert_eq!(report.double_forfeits, 1);
    assert!(report.failures.is_empty());

    // only p0 reported: p0 wins and advances
    let m1 = h.game(1, 1);
    assert_eq!(m1.status, MatchStatus::Completed);
    assert_eq!(m1.winner, Some(p[0]));
    assert_eq!(m1.outcome, Some(Outcome::Forfeit));
    assert_eq!(h.engine.reports(m1.id).unwrap()[0].status, ReportStatus::Approved);
    assert_eq!(h.game(2, 1).player_1, Some(p[0]));
    let forfeits = h.logs_where(|e| {
        e.match_id == Some(m1.id)
            && matches!(
                e.action,
                LogAction::AutoForfeit {
                    reason: ForfeitReason::MissedDeadline,
                    ..
                }
            )
    });
    assert_eq!(forfeits.len(), 1);

    // nobody reported: no winner, held for an arbiter
    let m2 = h.game(1, 2);
    assert_eq!(m2.status, MatchStatus::Disputed);
    assert_eq!(m2.winner, None);
    assert_eq!(m2.outcome, Some(Outcome::DoubleForfeit));
    assert_eq!(h.game(2, 1).player_2, None);
    assert_eq!(
        h.events_where(|e| matches!(e, EngineEvent::MatchNeedsArbitration { match_id, .. } if *match_id == m2.id))
            .len(),
        1
    );
}

#[test]
fn sweep_is_safe_to_rerun() {
    let h = built(4, 4);
    h.report(h.game(1, 1).id, h.players[1], h.players[1]).unwrap();
    h.clock.advance(Duration::hours(25));
    assert_eq!(h.engine.run_forfeiture_sweep(h.tournament).unwrap().processed, 2);

    let again = h.engine.run_forfeiture_sweep(h.tournament).unwrap();
    assert_eq!(again.processed, 0);
    assert_eq!(
        h.logs_where(|e| matches!(e.action, LogAction::AutoForfeit { .. })).len(),
        2
    );
}

#[test]
fn sweep_and_last_report_race_to_one_decision() {
    let h = built(4, 4);
    let p = &h.players;
    let m1 = h.game(1, 1);
    h.report(m1.id, p[0], p[0]).unwrap();
    h.clock.set(m1.deadline.unwrap());

    std::thread::scope(|s| {
        let late = s.spawn(|| h.report(m1.id, p[1], p[0]));
        let sweep = s.spawn(|| {
            h.clock.advance(Duration::seconds(1));
            h.engine.run_forfeiture_sweep(h.tournament).unwrap()
        });
        let late = late.join().unwrap();
        assert!(matches!(
            late,
            Ok(_) | Err(EngineError::DeadlineExpired { .. }) | Err(EngineError::MatchNotActive { .. })
        ));
        assert!(sweep.join().unwrap().failures.is_empty());
    });

    let m1 = h.game(1, 1);
    assert_eq!(m1.status, MatchStatus::Completed);
    assert_eq!(m1.winner, Some(p[0]));
    assert_eq!(h.game(2, 1).player_1, Some(p[0]));
    assert_eq!(h.count_logs(m1.id, |a| matches!(a, LogAction::AutoAdvance { .. })), 1);
    let decisions = h.count_logs(m1.id, |a| {
        matches!(a, LogAction::AutoApproved { .. } | LogAction::AutoForfeit { .. })
    });
    assert_eq!(decisions, 1);
}

#[test]
fn sweep_leaves_matches_inside_their_window() {
    let h = built(4, 4);
    h.clock.advance(Duration::hours(23));
    let report = h.engine.run_forfeiture_sweep(h.tournament).unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(h.game(1, 1).status, MatchStatus::Active);
}

#[test]
fn disputed_matches_are_not_forfeited() {
    let h = built(2, 2);
    let (a, b) = (h.players[0], h.players[1]);
    let m1 = h.game(1, 1);
    h.report(m1.id, a, a).unwrap();
    h.report(m1.id, b, b).unwrap();
    h.clock.advance(Duration::hours(48));
    assert_eq!(h.engine.run_forfeiture_sweep(h.tournament).unwrap().processed, 0);
    assert_eq!(h.game(1, 1).outcome, Some(Outcome::Conflict));
}

#[test]
fn forfeit_in_the_final_crowns_the_reporter() {
    let h = built(2, 2);
    let b = h.players[1];
    h.report(h.game(1, 1).id, b, b).unwrap();
    h.clock.advance(Duration::hours(30));
    let swept = h.engine.run_forfeiture_sweep_all().unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].forfeited, 1);

    let t = h.engine.tournament(h.tournament).unwrap();
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.champion, Some(b));
    assert!(h.engine.run_forfeiture_sweep_all().unwrap().is_empty());
}

#[test]
fn double_forfeit_waits_for_an_override() {
    let h = built(4, 4);
    let p = &h.players;
    h.clock.advance(Duration::hours(25));
    h.engine.run_forfeiture_sweep(h.tournament).unwrap();
    let last = h.game(2, 1);
    assert_eq!((last.player_1, last.player_2), (None, None));

    h.engine
        .override_result(h.game(1, 1).id, h.organizer, p[1], "no-show, organizer picked")
        .unwrap();
    h.engine
        .override_result(h.game(1, 2).id, h.organizer, p[2], "no-show, organizer picked")
        .unwrap();
    let last = h.game(2, 1);
    assert_eq!((last.player_1, last.player_2), (Some(p[1]), Some(p[2])));
    assert_eq!(last.status, MatchStatus::Active);
}

#[test]
fn round_deadline_can_be_reset() {
    let h = built(4, 4);
    let later = start_time() + Duration::hours(48);
    let updated = h
        .engine
        .set_round_deadline(h.tournament, h.organizer, 1, later)
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert!(updated.iter().all(|m| m.deadline == Some(later)));
    assert_eq!(
        h.logs_where(|e| matches!(e.action, LogAction::DeadlineSet { round: 1, matches: 2, .. }))
            .len(),
        1
    );

    h.clock.advance(Duration::hours(25));
    assert_eq!(h.engine.run_forfeiture_sweep(h.tournament).unwrap().processed, 0);
    h.report(h.game(1, 1).id, h.players[0], h.players[0]).unwrap();

    assert!(matches!(
        h.engine.set_round_deadline(h.tournament, Uuid::new_v4(), 1, later),
        Err(EngineError::NotOrganizer(_))
    ));
    assert!(matches!(
        h.engine.set_round_deadline(h.tournament, h.organizer, 3, later),
        Err(EngineError::InvalidState { .. })
    ));
}
