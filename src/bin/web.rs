//! Single binary web server: bracket engine over a JSON REST API.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080). Engine settings: see EngineConfig::from_env.

use actix_web::{
    get, post, put,
    web::{Bytes, Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use bracket_engine::{
    BracketEngine, DisputeDecision, DisputeFiling, DisputeId, DisputeTarget, EngineConfig,
    EngineError, ErrorKind, LogSink, MatchId, MemoryStore, Participant, ParticipantId,
    ReportId, ResultSubmission, TournamentId,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

type AppState = Data<BracketEngine<MemoryStore>>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    organizer_id: ParticipantId,
    #[serde(default = "default_capacity")]
    capacity: u32,
}

fn default_capacity() -> u32 {
    8
}

#[derive(Deserialize)]
struct JoinBody {
    user_id: ParticipantId,
}

#[derive(Deserialize)]
struct BuildBracketBody {
    organizer_id: ParticipantId,
    /// Roster to seed from; the tournament's joined participants when omitted.
    #[serde(default)]
    participants: Option<Vec<ParticipantId>>,
}

#[derive(Deserialize)]
struct RoundDeadlineBody {
    actor_id: ParticipantId,
    deadline: DateTime<Utc>,
}

#[derive(Deserialize)]
struct FileDisputeBody {
    #[serde(default)]
    report_id: Option<ReportId>,
    #[serde(flatten)]
    filing: DisputeFiling,
}

#[derive(Deserialize)]
struct ResolveDisputeBody {
    arbiter_id: ParticipantId,
    #[serde(flatten)]
    decision: DisputeDecision,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct OverrideBody {
    arbiter_id: ParticipantId,
    winner: ParticipantId,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct OrganizerQuery {
    organizer_id: ParticipantId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and round number.
#[derive(Deserialize)]
struct RoundPath {
    id: TournamentId,
    round: u32,
}

/// Path segments: tournament id and participant id.
#[derive(Deserialize)]
struct ParticipantPath {
    id: TournamentId,
    user_id: ParticipantId,
}

#[derive(Deserialize)]
struct MatchPath {
    match_id: MatchId,
}

#[derive(Deserialize)]
struct DisputePath {
    dispute_id: DisputeId,
}

/// Map an engine error to a JSON error response by its kind.
fn error_response(e: EngineError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e.kind() {
        ErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Transient | ErrorKind::Invariant => HttpResponse::Conflict().json(body),
        ErrorKind::Storage => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn respond<T: serde::Serialize>(result: Result<T, EngineError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "bracket-engine",
    })
}

/// Create a draft tournament.
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    respond(state.create_tournament(body.organizer_id, body.capacity))
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.tournament(path.id))
}

/// Join a draft tournament.
#[post("/api/tournaments/{id}/participants")]
async fn api_join(state: AppState, path: Path<TournamentPath>, body: Json<JoinBody>) -> HttpResponse {
    respond(state.join_tournament(path.id, body.user_id))
}

/// Import a CSV roster (`user_id,joined_at`) from the request body.
#[post("/api/tournaments/{id}/participants/import")]
async fn api_import_roster(
    state: AppState,
    path: Path<TournamentPath>,
    query: Query<OrganizerQuery>,
    body: Bytes,
) -> HttpResponse {
    respond(state.import_roster(path.id, query.organizer_id, body.as_ref()))
}

/// Build (or rebuild) the bracket.
#[post("/api/tournaments/{id}/bracket")]
async fn api_build_bracket(state: AppState, path: Path<TournamentPath>, body: Json<BuildBracketBody>) -> HttpResponse {
    let roster = match &body.participants {
        Some(ids) => {
            let now = Utc::now();
            ids.iter().map(|id| Participant::new(*id, now)).collect()
        }
        None => match state.tournament(path.id) {
            Ok(t) => t.participants,
            Err(e) => return error_response(e),
        },
    };
    respond(state.build_bracket(path.id, body.organizer_id, roster))
}

#[get("/api/tournaments/{id}/matches")]
async fn api_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.matches(path.id))
}

#[get("/api/tournaments/{id}/rounds")]
async fn api_rounds(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.round_summaries(path.id))
}

/// Reset the deadline of every open match in a round (organizer only).
#[put("/api/tournaments/{id}/rounds/{round}/deadline")]
async fn api_round_deadline(state: AppState, path: Path<RoundPath>, body: Json<RoundDeadlineBody>) -> HttpResponse {
    respond(state.set_round_deadline(path.id, body.actor_id, path.round, body.deadline))
}

#[get("/api/tournaments/{id}/participants/{user_id}")]
async fn api_participant_record(state: AppState, path: Path<ParticipantPath>) -> HttpResponse {
    respond(state.participant_record(path.id, path.user_id))
}

#[get("/api/tournaments/{id}/logs")]
async fn api_logs(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.logs(path.id))
}

/// Run the forfeiture sweep on one tournament now.
#[post("/api/tournaments/{id}/forfeits")]
async fn api_sweep(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.run_forfeiture_sweep(path.id))
}

#[get("/api/matches/{match_id}")]
async fn api_get_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.get_match(path.match_id))
}

#[get("/api/matches/{match_id}/reports")]
async fn api_reports(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.reports(path.match_id))
}

/// Submit one participant's result report.
#[post("/api/matches/{match_id}/results")]
async fn api_submit_result(state: AppState, path: Path<MatchPath>, body: Json<ResultSubmission>) -> HttpResponse {
    respond(state.submit_result(path.match_id, body.into_inner()))
}

/// Arbiter sets the winner directly.
#[post("/api/matches/{match_id}/override")]
async fn api_override(state: AppState, path: Path<MatchPath>, body: Json<OverrideBody>) -> HttpResponse {
    respond(state.override_result(path.match_id, body.arbiter_id, body.winner, &body.notes))
}

#[get("/api/matches/{match_id}/disputes")]
async fn api_disputes(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.disputes(path.match_id))
}

/// File a dispute on the match, or on one of its reports when `report_id` is given.
#[post("/api/matches/{match_id}/disputes")]
async fn api_file_dispute(state: AppState, path: Path<MatchPath>, body: Json<FileDisputeBody>) -> HttpResponse {
    let body = body.into_inner();
    let target = match body.report_id {
        Some(id) => DisputeTarget::Report(id),
        None => DisputeTarget::Match(path.match_id),
    };
    respond(state.file_dispute(target, body.filing))
}

#[post("/api/disputes/{dispute_id}/resolve")]
async fn api_resolve_dispute(state: AppState, path: Path<DisputePath>, body: Json<ResolveDisputeBody>) -> HttpResponse {
    respond(state.resolve_dispute(path.dispute_id, body.arbiter_id, body.decision, &body.notes))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let config = EngineConfig::from_env();
    let sweep_every = config.sweep_interval;
    let state = Data::new(BracketEngine::new(MemoryStore::new(), config).with_events(Arc::new(LogSink)));

    // Background task: forfeit overdue matches across all active tournaments
    let state_sweep = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let engine = state_sweep.clone();
            match tokio::task::spawn_blocking(move || engine.run_forfeiture_sweep_all()).await {
                Ok(Ok(reports)) => {
                    let processed: usize = reports.iter().map(|r| r.processed).sum();
                    if processed > 0 {
                        log::info!("Forfeiture sweep processed {} match(es)", processed);
                    }
                }
                Ok(Err(e)) => log::warn!("Forfeiture sweep failed: {}", e),
                Err(e) => log::error!("Forfeiture sweep task failed: {}", e),
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_import_roster)
            .service(api_join)
            .service(api_participant_record)
            .service(api_build_bracket)
            .service(api_matches)
            .service(api_rounds)
            .service(api_round_deadline)
            .service(api_logs)
            .service(api_sweep)
            .service(api_get_match)
            .service(api_reports)
            .service(api_submit_result)
            .service(api_override)
            .service(api_disputes)
            .service(api_file_dispute)
            .service(api_resolve_dispute)
    })
    .bind(bind)?
    .run()
    .await
}
