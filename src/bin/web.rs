//! Single binary web server: REST API under /api, admin page from /static.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default so the app is reachable on a VPS.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080), APP_ENV
//! (set to "production" to ignore the simulateMatches setting).

use actix_files::Files;
use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use matchzy_tournament_web::logic::SimulatedServerControl;
use matchzy_tournament_web::models::{ErrorCategory, SeriesFormat};
use matchzy_tournament_web::{
    check_server, finish_tournament, force_end_match, generate_next_round, handle_match_event,
    import_players_csv, load_match, start_tournament, status_view, veto_action,
    App as TournamentApp, GameServer, MatchEvent, OrchestratorError, Player, Side, Team,
    Tournament, TournamentType, TournamentUpdate,
};
use serde::{Deserialize, Deserializer};
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// In-memory state: the whole orchestrator behind one lock.
type AppState = Data<RwLock<TournamentApp>>;

/// How often the background sweep re-checks every registered server.
const SERVER_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreatePlayerBody {
    steam_id: String,
    name: String,
    avatar: Option<String>,
    starting_elo: Option<i64>,
}

#[derive(Deserialize)]
struct CreateTeamBody {
    name: String,
    #[serde(default)]
    tag: String,
    players: Vec<Uuid>,
}

#[derive(Deserialize)]
struct CreateServerBody {
    name: String,
    host: String,
    port: u16,
    #[serde(default)]
    rcon_password: String,
}

#[derive(Deserialize)]
struct CreateMapPoolBody {
    name: String,
    maps: Vec<String>,
}

#[derive(Deserialize)]
struct UpdateMapPoolBody {
    name: Option<String>,
    maps: Option<Vec<String>>,
    enabled: Option<bool>,
}

#[derive(Deserialize)]
struct TemplateBody {
    name: String,
    k_factor: f64,
    #[serde(default)]
    kills_weight: f64,
    #[serde(default)]
    deaths_weight: f64,
    #[serde(default)]
    assists_weight: f64,
    #[serde(default)]
    mvps_weight: f64,
    min_adjustment: Option<f64>,
    max_adjustment: Option<f64>,
}

impl TemplateBody {
    fn to_template(&self) -> matchzy_tournament_web::models::EloTemplate {
        let mut template =
            matchzy_tournament_web::models::EloTemplate::new(self.name.clone(), self.k_factor);
        template.kills_weight = self.kills_weight;
        template.deaths_weight = self.deaths_weight;
        template.assists_weight = self.assists_weight;
        template.mvps_weight = self.mvps_weight;
        template.min_adjustment = self.min_adjustment;
        template.max_adjustment = self.max_adjustment;
        template
    }
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    #[serde(rename = "type")]
    kind: TournamentType,
    #[serde(default)]
    format: SeriesFormat,
    map_pool_id: Option<Uuid>,
    elo_template_id: Option<Uuid>,
    team_size: Option<u32>,
}

/// Distinguishes an absent field (leave untouched) from an explicit null
/// (clear the value).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Deserialize)]
struct UpdateTournamentBody {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<TournamentType>,
    format: Option<SeriesFormat>,
    map_pool_id: Option<Uuid>,
    team_size: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    elo_template_id: Option<Option<Uuid>>,
}

#[derive(Deserialize)]
struct AddTeamBody {
    team_id: Uuid,
}

#[derive(Deserialize)]
struct RegisterPlayerBody {
    player_id: Uuid,
}

#[derive(Deserialize)]
struct VetoBody {
    team: Side,
    map: String,
}

#[derive(Deserialize)]
struct LoadMatchBody {
    server_id: Uuid,
}

#[derive(Deserialize)]
struct ForceEndBody {
    winner: Option<Side>,
}

/// Path segment: entity id (e.g. /api/matches/{id})
#[derive(Deserialize)]
struct IdPath {
    id: Uuid,
}

/// Path segments: tournament id and team id
#[derive(Deserialize)]
struct TournamentTeamPath {
    id: Uuid,
    team_id: Uuid,
}

/// Path segments: tournament id and player id
#[derive(Deserialize)]
struct TournamentPlayerPath {
    id: Uuid,
    player_id: Uuid,
}

/// Map a domain error onto an HTTP response with the standard body.
fn fail(e: OrchestratorError) -> HttpResponse {
    let body = serde_json::json!({ "success": false, "error": e.to_string() });
    match e.category() {
        ErrorCategory::Validation => HttpResponse::BadRequest().json(body),
        ErrorCategory::Conflict => HttpResponse::Conflict().json(body),
        ErrorCategory::NotFound => HttpResponse::NotFound().json(body),
        ErrorCategory::External => HttpResponse::BadGateway().json(body),
    }
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

/// Respond with the match's current state, across all tournaments.
fn match_response(app: &TournamentApp, match_id: Uuid) -> HttpResponse {
    match app.tournaments.values().find_map(|t| t.find_match(match_id)) {
        Some(m) => HttpResponse::Ok().json(m),
        None => fail(OrchestratorError::MatchNotFound(match_id)),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "matchzy-tournament-web",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

// ---- players ----

#[post("/api/players")]
async fn api_create_player(state: AppState, body: Json<CreatePlayerBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_player(
        &body.steam_id,
        &body.name,
        body.avatar.clone(),
        body.starting_elo,
    ) {
        Ok(player) => HttpResponse::Ok().json(player),
        Err(e) => fail(e),
    }
}

#[get("/api/players")]
async fn api_list_players(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut players: Vec<&Player> = g.players.values().collect();
    players.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    HttpResponse::Ok().json(&players)
}

/// Bulk import: body is raw CSV text (`steam_id,name[,elo]` per line).
#[post("/api/players/import")]
async fn api_import_players(state: AppState, body: String) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let report = import_players_csv(&mut g, &body);
    HttpResponse::Ok().json(report)
}

#[delete("/api/players/{id}")]
async fn api_delete_player(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_player(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

// ---- teams ----

#[post("/api/teams")]
async fn api_create_team(state: AppState, body: Json<CreateTeamBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_team(&body.name, &body.tag, body.players.clone()) {
        Ok(team) => HttpResponse::Ok().json(team),
        Err(e) => fail(e),
    }
}

#[get("/api/teams")]
async fn api_list_teams(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut teams: Vec<&Team> = g.teams.values().collect();
    teams.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    HttpResponse::Ok().json(&teams)
}

#[delete("/api/teams/{id}")]
async fn api_delete_team(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_team(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

// ---- servers ----

#[post("/api/servers")]
async fn api_create_server(state: AppState, body: Json<CreateServerBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_server(&body.name, &body.host, body.port, &body.rcon_password) {
        Ok(server) => HttpResponse::Ok().json(server),
        Err(e) => fail(e),
    }
}

#[get("/api/servers")]
async fn api_list_servers(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut servers: Vec<&GameServer> = g.servers.values().collect();
    servers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    HttpResponse::Ok().json(&servers)
}

#[delete("/api/servers/{id}")]
async fn api_delete_server(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_server(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

/// Probe one server now and report the resolved status.
#[post("/api/servers/{id}/check")]
async fn api_check_server(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match check_server(&mut g, path.id, &SimulatedServerControl) {
        Ok(_) => match g.servers.get(&path.id) {
            Some(server) => HttpResponse::Ok().json(server),
            None => fail(OrchestratorError::ServerNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

// ---- map pools ----

#[post("/api/map-pools")]
async fn api_create_map_pool(state: AppState, body: Json<CreateMapPoolBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_map_pool(&body.name, body.maps.clone()) {
        Ok(pool) => HttpResponse::Ok().json(pool),
        Err(e) => fail(e),
    }
}

#[get("/api/map-pools")]
async fn api_list_map_pools(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut pools: Vec<_> = g.map_pools.values().collect();
    pools.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    HttpResponse::Ok().json(&pools)
}

#[put("/api/map-pools/{id}")]
async fn api_update_map_pool(
    state: AppState,
    path: Path<IdPath>,
    body: Json<UpdateMapPoolBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.update_map_pool(path.id, body.name.clone(), body.maps.clone(), body.enabled) {
        Ok(pool) => HttpResponse::Ok().json(pool),
        Err(e) => fail(e),
    }
}

#[delete("/api/map-pools/{id}")]
async fn api_delete_map_pool(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_map_pool(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

// ---- rating templates ----

#[post("/api/elo-templates")]
async fn api_create_elo_template(state: AppState, body: Json<TemplateBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_elo_template(body.to_template()) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => fail(e),
    }
}

#[get("/api/elo-templates")]
async fn api_list_elo_templates(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut templates: Vec<_> = g.elo_templates.values().collect();
    templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    HttpResponse::Ok().json(&templates)
}

#[put("/api/elo-templates/{id}")]
async fn api_update_elo_template(
    state: AppState,
    path: Path<IdPath>,
    body: Json<TemplateBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.update_elo_template(path.id, body.to_template()) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => fail(e),
    }
}

#[delete("/api/elo-templates/{id}")]
async fn api_delete_elo_template(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_elo_template(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

// ---- tournaments ----

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.create_tournament(
        &body.name,
        body.kind,
        body.format,
        body.map_pool_id,
        body.elo_template_id,
        body.team_size,
    ) {
        Ok(tournament) => HttpResponse::Ok().json(tournament),
        Err(e) => fail(e),
    }
}

#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let mut tournaments: Vec<&Tournament> = g.tournaments.values().collect();
    tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    HttpResponse::Ok().json(&tournaments)
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.tournaments.get(&path.id) {
        Some(tournament) => HttpResponse::Ok().json(tournament),
        None => fail(OrchestratorError::TournamentNotFound(path.id)),
    }
}

/// Edit a tournament still in setup.
#[put("/api/tournaments/{id}")]
async fn api_update_tournament(
    state: AppState,
    path: Path<IdPath>,
    body: Json<UpdateTournamentBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let update = TournamentUpdate {
        name: body.name.clone(),
        kind: body.kind,
        format: body.format,
        map_pool_id: body.map_pool_id,
        team_size: body.team_size,
        elo_template_id: body.elo_template_id,
    };
    match g.update_tournament(path.id, update) {
        Ok(tournament) => HttpResponse::Ok().json(tournament),
        Err(e) => fail(e),
    }
}

#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.delete_tournament(path.id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => fail(e),
    }
}

/// Enter a pre-formed team (team-based formats, setup only).
#[post("/api/tournaments/{id}/teams")]
async fn api_tournament_add_team(
    state: AppState,
    path: Path<IdPath>,
    body: Json<AddTeamBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.add_team_to_tournament(path.id, body.team_id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

#[delete("/api/tournaments/{id}/teams/{team_id}")]
async fn api_tournament_remove_team(
    state: AppState,
    path: Path<TournamentTeamPath>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.remove_team_from_tournament(path.id, path.team_id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

/// Register an individual player (shuffle only; also between rounds).
#[post("/api/tournaments/{id}/players")]
async fn api_tournament_register_player(
    state: AppState,
    path: Path<IdPath>,
    body: Json<RegisterPlayerBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.register_player(path.id, body.player_id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

#[delete("/api/tournaments/{id}/players/{player_id}")]
async fn api_tournament_unregister_player(
    state: AppState,
    path: Path<TournamentPlayerPath>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.unregister_player(path.id, path.player_id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

/// Leave setup: generate the opening round (or the whole bracket).
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match start_tournament(&mut g, path.id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

/// Generate the next round once the current one is fully complete.
#[post("/api/tournaments/{id}/rounds/next")]
async fn api_next_round(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match generate_next_round(&mut g, path.id) {
        Ok(_) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

/// Poll target: derived status, round counters, round label.
#[get("/api/tournaments/{id}/status")]
async fn api_tournament_status(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.tournaments.get(&path.id) {
        Some(tournament) => HttpResponse::Ok().json(status_view(tournament)),
        None => fail(OrchestratorError::TournamentNotFound(path.id)),
    }
}

#[get("/api/tournaments/{id}/matches")]
async fn api_tournament_matches(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.tournaments.get(&path.id) {
        Some(tournament) => HttpResponse::Ok().json(&tournament.matches),
        None => fail(OrchestratorError::TournamentNotFound(path.id)),
    }
}

/// Administrative completion (how a shuffle night ends).
#[post("/api/tournaments/{id}/complete")]
async fn api_complete_tournament(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match finish_tournament(&mut g, path.id) {
        Ok(()) => match g.tournaments.get(&path.id) {
            Some(tournament) => HttpResponse::Ok().json(tournament),
            None => fail(OrchestratorError::TournamentNotFound(path.id)),
        },
        Err(e) => fail(e),
    }
}

// ---- matches ----

#[get("/api/matches/{id}")]
async fn api_get_match(state: AppState, path: Path<IdPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match_response(&g, path.id)
}

/// One veto ban/pick on behalf of a side.
#[post("/api/matches/{id}/veto")]
async fn api_match_veto(
    state: AppState,
    path: Path<IdPath>,
    body: Json<VetoBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match veto_action(&mut g, path.id, body.team, &body.map) {
        Ok(()) => match_response(&g, path.id),
        Err(e) => fail(e),
    }
}

/// Assign a server and push the match config to it.
#[post("/api/matches/{id}/load")]
async fn api_match_load(
    state: AppState,
    path: Path<IdPath>,
    body: Json<LoadMatchBody>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match load_match(&mut g, path.id, body.server_id, &SimulatedServerControl) {
        Ok(()) => match_response(&g, path.id),
        Err(e) => fail(e),
    }
}

/// Idempotent event intake from the game server.
#[post("/api/matches/{id}/events")]
async fn api_match_events(
    state: AppState,
    path: Path<IdPath>,
    body: Json<MatchEvent>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match handle_match_event(&mut g, path.id, &body) {
        Ok(()) => match_response(&g, path.id),
        Err(e) => fail(e),
    }
}

/// Admin override: end the match now, optionally declaring the winner.
#[post("/api/matches/{id}/force-end")]
async fn api_match_force_end(
    state: AppState,
    path: Path<IdPath>,
    body: Option<Json<ForceEndBody>>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let winner = body.as_ref().and_then(|b| b.winner);
    match force_end_match(&mut g, path.id, winner) {
        Ok(()) => match_response(&g, path.id),
        Err(e) => fail(e),
    }
}

// ---- settings ----

#[get("/api/settings")]
async fn api_get_settings(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "settings": g.settings }))
}

/// Partial update; each provided field is type-checked before anything
/// is stored.
#[put("/api/settings")]
async fn api_put_settings(state: AppState, body: Json<serde_json::Value>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let production = g.production;
    match g.settings.apply_update(&body, production) {
        Ok(()) => {
            HttpResponse::Ok().json(serde_json::json!({ "success": true, "settings": g.settings }))
        }
        Err(e) => fail(e),
    }
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
    let production = std::env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);
    let bind = (host.as_str(), port);
    log::info!(
        "Starting server at http://{}:{} (production: {})",
        bind.0,
        bind.1,
        production
    );

    let state = Data::new(RwLock::new(TournamentApp::new(production)));

    // Background task: periodically re-check every server so status chips
    // recover without a manual check.
    let state_sweep = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(SERVER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let mut g = match state_sweep.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let ids: Vec<Uuid> = g.servers.keys().copied().collect();
            for id in &ids {
                if let Err(e) = check_server(&mut g, *id, &SimulatedServerControl) {
                    log::warn!("server sweep: check of {} failed: {}", id, e);
                }
            }
            if !ids.is_empty() {
                log::debug!("server sweep: {} server(s) checked", ids.len());
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(favicon)
            .service(api_create_player)
            .service(api_list_players)
            .service(api_import_players)
            .service(api_delete_player)
            .service(api_create_team)
            .service(api_list_teams)
            .service(api_delete_team)
            .service(api_create_server)
            .service(api_list_servers)
            .service(api_delete_server)
            .service(api_check_server)
            .service(api_create_map_pool)
            .service(api_list_map_pools)
            .service(api_update_map_pool)
            .service(api_delete_map_pool)
            .service(api_create_elo_template)
            .service(api_list_elo_templates)
            .service(api_update_elo_template)
            .service(api_delete_elo_template)
            .service(api_create_tournament)
            .service(api_list_tournaments)
            .service(api_get_tournament)
            .service(api_update_tournament)
            .service(api_delete_tournament)
            .service(api_tournament_add_team)
            .service(api_tournament_remove_team)
            .service(api_tournament_register_player)
            .service(api_tournament_unregister_player)
            .service(api_start_tournament)
            .service(api_next_round)
            .service(api_tournament_status)
            .service(api_tournament_matches)
            .service(api_complete_tournament)
            .service(api_get_match)
            .service(api_match_veto)
            .service(api_match_load)
            .service(api_match_events)
            .service(api_match_force_end)
            .service(api_get_settings)
            .service(api_put_settings)
            .service(Files::new("/", "static").index_file("index.html"))
    })
    .bind(bind)?
    .run()
    .await
}
