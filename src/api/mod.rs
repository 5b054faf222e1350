// HTTP API routes: game lifecycle, throws, engine state, replays and bot
// simulation.

pub mod ws;

use axum::{
    body::Body,
    extract::{Json, Path, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::bot::{BotProfile, Difficulty, Objective};
use crate::engine::rules::{engine_of, PlayerStatistics};
use crate::engine::score::Score;
use crate::engine::session::{GameSession, GameStatus, PlayerType};
use crate::engine::throw::TurnSlot;
use crate::error::GameError;
use crate::events::BroadcastSink;
use crate::metrics;
use crate::pipeline::{CreateGame, TurnPipeline};
use crate::replay::ReplayArchive;
use crate::store::SessionStore;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ThrowRequest {
    pub player_id: Uuid,
    pub segment: u8,
    #[serde(default = "single")]
    pub multiplier: u8,
    #[serde(default)]
    pub raw_data: Option<serde_json::Value>,
}

fn single() -> u8 {
    1
}

/// Bot to simulate: an explicit profile, a tier or a 1-100 skill, in that
/// order of preference. Defaults to the medium tier.
#[derive(Deserialize)]
pub struct SimulateRequest {
    pub objective: Objective,
    pub profile: Option<BotProfile>,
    pub difficulty: Option<Difficulty>,
    pub skill: Option<u8>,
}

impl SimulateRequest {
    fn resolve_profile(&self) -> BotProfile {
        if let Some(profile) = &self.profile {
            return profile.clone();
        }
        if let Some(difficulty) = self.difficulty {
            return BotProfile::from_difficulty(difficulty);
        }
        self.skill.map(BotProfile::from_skill).unwrap_or_default()
    }
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PlayerScore {
    pub player_id: Uuid,
    pub score: i32,
}

/// A session plus everything derived from its throw log.
#[derive(Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: GameSession,
    pub acting_player: Option<Uuid>,
    pub next_slot: Option<TurnSlot>,
    pub scores: Vec<PlayerScore>,
    pub statistics: Vec<PlayerStatistics>,
}

impl From<GameSession> for SessionView {
    fn from(session: GameSession) -> Self {
        let engine = engine_of(&session);
        let running = session.status == GameStatus::InProgress;
        let scores = session
            .players
            .iter()
            .map(|p| PlayerScore {
                player_id: p.id,
                score: engine.calculate_current_score(&session, p.id),
            })
            .collect();
        Self {
            acting_player: running
                .then(|| session.acting_player().map(|p| p.id))
                .flatten(),
            next_slot: running.then(|| session.next_slot()),
            scores,
            statistics: engine.update_statistics(&session),
            session,
        }
    }
}

// ── Shared application state ─────────────────────────────────────────

pub struct AppState<S> {
    pub pipeline: Arc<TurnPipeline<S>>,
    pub events: Arc<BroadcastSink>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            events: self.events.clone(),
        }
    }
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn game_error(e: GameError) -> Response {
    let status = match &e {
        GameError::NotFound(_) => StatusCode::NOT_FOUND,
        GameError::InvalidState(_) | GameError::NotPlayersTurn { .. } => StatusCode::CONFLICT,
        GameError::InvalidScore(_) => StatusCode::BAD_REQUEST,
        GameError::Storage(_) => {
            tracing::error!("Storage error: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .into_response();
        }
    };
    json_error(status, &e.to_string()).into_response()
}

pub fn router<S: SessionStore>(pipeline: Arc<TurnPipeline<S>>, events: Arc<BroadcastSink>) -> Router {
    let state = AppState { pipeline, events };

    Router::new()
        // Games
        .route("/api/games", get(list_games::<S>).post(create_game::<S>))
        .route("/api/games/{id}", get(get_game::<S>))
        .route("/api/games/{id}/start", post(start_game::<S>))
        .route("/api/games/{id}/throws", post(register_throw::<S>))
        .route("/api/games/{id}/end", post(end_game::<S>))
        .route(
            "/api/games/{id}/players/{player_id}/state",
            get(player_state::<S>),
        )
        .route("/api/games/{id}/replay", get(get_replay::<S>))
        // Bots
        .route("/api/bot/simulate", post(simulate_bot::<S>))
        // WebSocket
        .route("/ws/games", get(ws::ws_games::<S>))
        // Observability
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(axum::middleware::from_fn(track_requests))
}

/// Count every request by method, normalized path and status.
async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = metrics::normalize_path(req.uri().path());
    let response = next.run(req).await;
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();
    response
}

async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

// ── Game handlers ─────────────────────────────────────────────────────

async fn list_games<S: SessionStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    match state.pipeline.list_sessions().await {
        Ok(sessions) => {
            let views: Vec<SessionView> = sessions.into_iter().map(SessionView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => game_error(e),
    }
}

async fn create_game<S: SessionStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<CreateGame>,
) -> impl IntoResponse {
    if req.players.iter().any(|p| p.name.trim().is_empty()) {
        return json_error(StatusCode::BAD_REQUEST, "player name is required").into_response();
    }
    match state.pipeline.create_session(req).await {
        Ok(session) => (StatusCode::CREATED, Json(SessionView::from(session))).into_response(),
        Err(e) => game_error(e),
    }
}

async fn get_game<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.pipeline.get_session(id).await {
        Ok(session) => (StatusCode::OK, Json(SessionView::from(session))).into_response(),
        Err(e) => game_error(e),
    }
}

/// Hand the turn to the bot chain if a bot is up next.
fn wake_bots<S: SessionStore>(state: &AppState<S>, session: &GameSession) {
    let bot_up = session.status == GameStatus::InProgress
        && session
            .acting_player()
            .is_some_and(|p| p.player_type == PlayerType::Bot);
    if bot_up {
        state.pipeline.spawn_bot_turns(session.id);
    }
}

async fn start_game<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.pipeline.start_session(id).await {
        Ok(session) => {
            wake_bots(&state, &session);
            (StatusCode::OK, Json(SessionView::from(session))).into_response()
        }
        Err(e) => game_error(e),
    }
}

async fn register_throw<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ThrowRequest>,
) -> impl IntoResponse {
    let score = match Score::new(req.segment, req.multiplier) {
        Ok(score) => score,
        Err(e) => return game_error(e.into()),
    };
    match state
        .pipeline
        .register_throw(id, req.player_id, score, req.raw_data)
        .await
    {
        Ok(session) => {
            wake_bots(&state, &session);
            (StatusCode::OK, Json(SessionView::from(session))).into_response()
        }
        Err(e) => game_error(e),
    }
}

async fn end_game<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.pipeline.end_session(id).await {
        Ok(session) => (StatusCode::OK, Json(SessionView::from(session))).into_response(),
        Err(e) => game_error(e),
    }
}

async fn player_state<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.pipeline.engine_state(id, player_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => game_error(e),
    }
}

async fn get_replay<S: SessionStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let session = match state.pipeline.get_session(id).await {
        Ok(session) => session,
        Err(e) => return game_error(e),
    };

    let data = match ReplayArchive::new(session).compress() {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Failed to compress replay: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to build replay")
                .into_response();
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/gzip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"game-{id}.json.gz\""),
        )
        .body(Body::from(data))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// ── Bot handlers ──────────────────────────────────────────────────────

async fn simulate_bot<S: SessionStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<SimulateRequest>,
) -> impl IntoResponse {
    let profile = req.resolve_profile();
    if !(profile.sigma_mm.is_finite() && profile.sigma_mm >= 0.0) {
        return json_error(StatusCode::BAD_REQUEST, "sigma_mm must be a non-negative number")
            .into_response();
    }
    tracing::debug!(
        difficulty = req.difficulty.map(|d| d.label()),
        skill = req.skill,
        sigma_mm = profile.sigma_mm,
        "Simulating bot dart"
    );
    let dart = state.pipeline.simulate_bot_throw(&profile, &req.objective);
    (StatusCode::OK, Json(dart)).into_response()
}
