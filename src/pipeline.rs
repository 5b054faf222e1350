// Turn pipeline: every mutation of a game runs load -> validate -> append ->
// decide win -> persist under that game's lock. Also drives bot players.

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::engine::bot::{simulate_dart, BotProfile, Objective, SimulatedDart};
use crate::engine::rules::{engine_of, PlayerState};
use crate::engine::score::Score;
use crate::engine::session::{
    GameOptions, GameSession, GameStatus, GameType, NewPlayer, PlayerType,
};
use crate::engine::throw::ThrowRecord;
use crate::error::GameError;
use crate::events::{EventSink, GameEvent};
use crate::locks::LockRegistry;
use crate::metrics;
use crate::store::SessionStore;

/// Request to set up a new game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGame {
    pub game_type: GameType,
    #[serde(default)]
    pub starting_score: Option<u32>,
    pub players: Vec<NewPlayer>,
    #[serde(default)]
    pub options: GameOptions,
}

/// Engine projection of one player, for bot targeting and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub game_type: GameType,
    pub status: GameStatus,
    pub current_score: i32,
    pub is_acting: bool,
    pub state: PlayerState,
}

pub struct TurnPipeline<S> {
    store: S,
    locks: LockRegistry,
    events: Arc<dyn EventSink>,
    bot_delay: Duration,
    /// Cancellation flags of running bot chains, one per game.
    bot_runs: DashMap<Uuid, Arc<AtomicBool>>,
}

fn status_name(status: GameStatus) -> &'static str {
    match status {
        GameStatus::WaitingForPlayers => "waiting for players",
        GameStatus::InProgress => "in progress",
        GameStatus::Completed => "completed",
        GameStatus::Abandoned => "abandoned",
    }
}

impl<S: SessionStore> TurnPipeline<S> {
    pub fn new(store: S, events: Arc<dyn EventSink>, bot_delay: Duration) -> Self {
        Self {
            store,
            locks: LockRegistry::new(),
            events,
            bot_delay,
            bot_runs: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub async fn create_session(&self, request: CreateGame) -> Result<GameSession, GameError> {
        if request.game_type == GameType::X01 {
            if let Some(start) = request.starting_score {
                if start < 2 {
                    return Err(GameError::invalid_state(format!(
                        "starting score {start} cannot be finished"
                    )));
                }
            }
        }

        let session = GameSession::new(
            request.game_type,
            request.starting_score,
            request.players,
            request.options,
        );
        self.store.insert(session.clone()).await.inspect_err(|e| {
            tracing::error!(game_id = %session.id, "Failed to store new game: {e}");
        })?;

        tracing::info!(
            game_id = %session.id,
            game_type = session.game_type.label(),
            players = session.players.len(),
            "Game created"
        );
        Ok(session)
    }

    pub async fn get_session(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        self.store
            .load(game_id)
            .await?
            .ok_or_else(|| GameError::game_not_found(game_id))
    }

    pub async fn list_sessions(&self) -> Result<Vec<GameSession>, GameError> {
        self.store.list().await
    }

    pub async fn start_session(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let guard = self.locks.acquire(game_id).await;
        let result = self.start_locked(game_id).await;
        self.finish_locked(game_id, guard, result.as_ref().map(Some), "start");
        result
    }

    async fn start_locked(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let mut session = self.load_locked(game_id).await?;
        if session.status != GameStatus::WaitingForPlayers {
            return Err(GameError::invalid_state(format!(
                "game is {}",
                status_name(session.status)
            )));
        }
        if session.players.is_empty() {
            return Err(GameError::invalid_state("game has no players"));
        }

        session.status = GameStatus::InProgress;
        self.persist(&session).await?;

        metrics::ACTIVE_GAMES.inc();
        metrics::GAMES_STARTED_TOTAL
            .with_label_values(&[session.game_type.label()])
            .inc();
        tracing::info!(game_id = %game_id, game_type = session.game_type.label(), "Game started");
        self.events.publish(GameEvent::GameStarted {
            game_id,
            game_type: session.game_type,
            players: session.players.iter().map(|p| p.id).collect(),
        });
        Ok(session)
    }

    /// Append one dart for `player_id`, who must be the acting player.
    pub async fn register_throw(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        score: Score,
        raw_data: Option<serde_json::Value>,
    ) -> Result<GameSession, GameError> {
        let guard = self.locks.acquire(game_id).await;
        let result = self
            .register_locked(game_id, player_id, score, raw_data)
            .await;
        self.finish_locked(game_id, guard, result.as_ref().map(Some), "throw");
        result
    }

    async fn register_locked(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        score: Score,
        raw_data: Option<serde_json::Value>,
    ) -> Result<GameSession, GameError> {
        let mut session = self.load_locked(game_id).await?;
        let events = apply_throw(&mut session, player_id, score, raw_data)?;
        self.persist(&session).await?;
        self.after_throw(&session, player_id, events);
        Ok(session)
    }

    /// Force a game to end without a winner. Statistics are still flushed
    /// from whatever was thrown.
    pub async fn end_session(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        self.cancel_bot_turns(game_id);
        let guard = self.locks.acquire(game_id).await;
        let result = self.end_locked(game_id).await;
        self.finish_locked(game_id, guard, result.as_ref().map(Some), "end");
        result
    }

    async fn end_locked(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let mut session = self.load_locked(game_id).await?;
        let was_running = session.status == GameStatus::InProgress;

        session.status = GameStatus::Abandoned;
        let statistics = flush_statistics(&mut session);
        self.persist(&session).await?;

        if was_running {
            metrics::ACTIVE_GAMES.dec();
        }
        metrics::GAMES_ABANDONED_TOTAL
            .with_label_values(&[session.game_type.label()])
            .inc();
        tracing::info!(game_id = %game_id, darts = session.throws.len(), "Game abandoned");
        self.events.publish(GameEvent::GameAbandoned { game_id });
        self.events.publish(statistics);
        Ok(session)
    }

    /// Engine projection of one player, replayed from the stored throw log.
    pub async fn engine_state(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> Result<PlayerView, GameError> {
        let session = self.get_session(game_id).await?;
        if session.player(player_id).is_none() {
            return Err(GameError::NotFound(format!("player {player_id}")));
        }

        let started = Instant::now();
        let engine = engine_of(&session);
        let view = PlayerView {
            game_id,
            player_id,
            game_type: session.game_type,
            status: session.status,
            current_score: engine.calculate_current_score(&session, player_id),
            is_acting: session.status == GameStatus::InProgress
                && session.acting_player().map(|p| p.id) == Some(player_id),
            state: engine.player_state(&session, player_id),
        };
        metrics::REPLAY_DURATION_MS.observe(started.elapsed().as_secs_f64() * 1000.0);
        Ok(view)
    }

    // ── Lock bracket helpers ─────────────────────────────────────────

    /// Load a session that can still change. Games that are gone or over
    /// lose their lock entry here, since nothing will mutate them again.
    async fn load_locked(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let Some(session) = self.store.load(game_id).await? else {
            self.locks.remove(game_id);
            return Err(GameError::game_not_found(game_id));
        };
        if session.status.is_terminal() {
            self.locks.remove(game_id);
            return Err(GameError::invalid_state(format!(
                "game is {}",
                status_name(session.status)
            )));
        }
        Ok(session)
    }

    async fn persist(&self, session: &GameSession) -> Result<(), GameError> {
        self.store.save(session).await.inspect_err(|e| {
            tracing::error!(game_id = %session.id, "Failed to save game: {e}");
        })
    }

    /// Release the lock, retiring its entry once the game is over.
    fn finish_locked(
        &self,
        game_id: Uuid,
        guard: OwnedMutexGuard<()>,
        outcome: Result<Option<&GameSession>, &GameError>,
        operation: &str,
    ) {
        match outcome {
            Ok(Some(session)) if session.status.is_terminal() => self.locks.remove(game_id),
            Ok(_) => {}
            Err(e) => {
                if operation != "end" && operation != "start" {
                    metrics::THROWS_REJECTED_TOTAL
                        .with_label_values(&[e.kind()])
                        .inc();
                }
                tracing::warn!(game_id = %game_id, operation, "Rejected: {e}");
            }
        }
        drop(guard);
    }

    fn after_throw(&self, session: &GameSession, player_id: Uuid, events: Vec<GameEvent>) {
        if let Some(player) = session.player(player_id) {
            metrics::THROWS_REGISTERED_TOTAL
                .with_label_values(&[player.player_type.label()])
                .inc();
        }
        if let Some(last) = session.throws.iter().rev().find(|t| !t.forfeited) {
            tracing::debug!(
                game_id = %session.id,
                player_id = %player_id,
                round = last.round_number,
                dart = last.dart_number,
                score = %last.score,
                "Throw registered"
            );
        }
        if session.status == GameStatus::Completed {
            metrics::ACTIVE_GAMES.dec();
            metrics::GAMES_COMPLETED_TOTAL
                .with_label_values(&[session.game_type.label()])
                .inc();
            tracing::info!(
                game_id = %session.id,
                winner_id = ?session.winner_id,
                darts = session.throws.len(),
                "Game won"
            );
        }
        for event in events {
            self.events.publish(event);
        }
    }

    // ── Bots ─────────────────────────────────────────────────────────

    /// Simulate a dart without touching any game.
    pub fn simulate_bot_throw(
        &self,
        profile: &BotProfile,
        objective: &Objective,
    ) -> SimulatedDart {
        let dart = simulate_dart(profile, objective, &mut rand::thread_rng());
        metrics::BOT_DARTS_SIMULATED_TOTAL.inc();
        tracing::debug!(aim = %dart.target, score = %dart.score, "Bot dart simulated");
        dart
    }

    /// Throw one dart for the acting player if it is a bot. Returns the
    /// updated session, or `None` when no bot is due.
    async fn bot_dart(&self, game_id: Uuid) -> Result<Option<GameSession>, GameError> {
        let guard = self.locks.acquire(game_id).await;
        let result = self.bot_dart_locked(game_id).await;
        self.finish_locked(game_id, guard, result.as_ref().map(Option::as_ref), "bot throw");
        result
    }

    async fn bot_dart_locked(&self, game_id: Uuid) -> Result<Option<GameSession>, GameError> {
        let mut session = match self.store.load(game_id).await? {
            Some(session) if session.status == GameStatus::InProgress => session,
            _ => return Ok(None),
        };
        let (bot_id, profile) = match session.acting_player() {
            Some(p) if p.player_type == PlayerType::Bot => {
                (p.id, p.bot.clone().unwrap_or_default())
            }
            _ => return Ok(None),
        };

        let objective = engine_of(&session).bot_objective(&session, bot_id);
        let dart = self.simulate_bot_throw(&profile, &objective);
        let raw_data = serde_json::json!({
            "source": "bot",
            "aim": dart.target.to_string(),
            "landing": dart.landing,
        });
        let events = apply_throw(&mut session, bot_id, dart.score, Some(raw_data))?;
        self.persist(&session).await?;
        self.after_throw(&session, bot_id, events);
        Ok(Some(session))
    }

    /// Play out the acting bot's visit, one locked dart at a time with the
    /// pacing delay in between. Stops at the end of the visit, on a bust or
    /// win, or when `cancel` is set. Darts already registered stay.
    pub async fn play_bot_visit(
        &self,
        game_id: Uuid,
        cancel: &AtomicBool,
    ) -> Result<usize, GameError> {
        let mut thrown = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let Some(session) = self.bot_dart(game_id).await? else {
                break;
            };
            thrown += 1;
            if session.status.is_terminal() || session.throws.len() % 3 == 0 {
                break;
            }
            tokio::time::sleep(self.bot_delay).await;
        }
        Ok(thrown)
    }

    /// Keep playing bot visits until a non-bot is up, the game ends or the
    /// chain is cancelled. Returns the number of darts thrown.
    pub async fn run_bot_turns(
        &self,
        game_id: Uuid,
        cancel: &AtomicBool,
    ) -> Result<usize, GameError> {
        let mut total = 0;
        loop {
            let thrown = self.play_bot_visit(game_id, cancel).await?;
            if thrown == 0 || cancel.load(Ordering::Relaxed) {
                return Ok(total);
            }
            total += thrown;
            tokio::time::sleep(self.bot_delay).await;
        }
    }

    /// Whether the acting player of a running game is a bot.
    pub async fn bot_is_due(&self, game_id: Uuid) -> bool {
        match self.store.load(game_id).await {
            Ok(Some(session)) => {
                session.status == GameStatus::InProgress
                    && session
                        .acting_player()
                        .is_some_and(|p| p.player_type == PlayerType::Bot)
            }
            _ => false,
        }
    }

    /// Start a background bot chain for the game unless one is running.
    /// Returns whether a new chain was started.
    pub fn spawn_bot_turns(self: &Arc<Self>, game_id: Uuid) -> bool {
        let cancel = Arc::new(AtomicBool::new(false));
        match self.bot_runs.entry(game_id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(cancel.clone());
            }
        }

        let pipeline = self.clone();
        tokio::spawn(async move {
            loop {
                let outcome = pipeline.run_bot_turns(game_id, &cancel).await;
                pipeline
                    .bot_runs
                    .remove_if(&game_id, |_, flag| Arc::ptr_eq(flag, &cancel));
                match outcome {
                    Ok(darts) => tracing::debug!(game_id = %game_id, darts, "Bot chain finished"),
                    Err(e) => {
                        tracing::warn!(game_id = %game_id, "Bot chain stopped: {e}");
                        break;
                    }
                }
                // A throw that landed while the chain was winding down may
                // have handed the turn back to a bot.
                if cancel.load(Ordering::Relaxed) || !pipeline.bot_is_due(game_id).await {
                    break;
                }
                match pipeline.bot_runs.entry(game_id) {
                    Entry::Occupied(_) => break,
                    Entry::Vacant(slot) => {
                        slot.insert(cancel.clone());
                    }
                }
            }
        });
        true
    }

    /// Stop the game's bot chain after its current dart. Returns whether a
    /// chain was running.
    pub fn cancel_bot_turns(&self, game_id: Uuid) -> bool {
        match self.bot_runs.remove(&game_id) {
            Some((_, cancel)) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::debug!(game_id = %game_id, "Bot chain cancelled");
                true
            }
            None => false,
        }
    }

    pub fn bot_turns_running(&self, game_id: Uuid) -> bool {
        self.bot_runs.contains_key(&game_id)
    }
}

/// Validate and append one dart, padding a visit cut short by a bust and
/// deciding the winner. Pure session mutation; the caller persists and
/// publishes the returned events.
fn apply_throw(
    session: &mut GameSession,
    player_id: Uuid,
    score: Score,
    raw_data: Option<serde_json::Value>,
) -> Result<Vec<GameEvent>, GameError> {
    if session.status != GameStatus::InProgress {
        return Err(GameError::invalid_state(format!(
            "game is {}",
            status_name(session.status)
        )));
    }
    if session.player(player_id).is_none() {
        return Err(GameError::NotFound(format!("player {player_id}")));
    }
    let expected = session
        .acting_player()
        .map(|p| p.id)
        .ok_or_else(|| GameError::invalid_state("game has no players"))?;
    if expected != player_id {
        return Err(GameError::NotPlayersTurn {
            expected,
            actual: player_id,
        });
    }

    let slot = session.next_slot();
    let record = ThrowRecord::new(
        session.id,
        player_id,
        slot.round_number,
        slot.dart_number,
        score,
        raw_data,
    )?;
    let first_new = session.throws.len();
    session.throws.push(record);

    let engine = engine_of(session);
    let busted = engine.visit_busted(session, player_id);
    if busted && engine.visit_ended_early(session, player_id) {
        for dart in slot.dart_number + 1..=3 {
            let filler = ThrowRecord::forfeit(session.id, player_id, slot.round_number, dart)?;
            session.throws.push(filler);
        }
    }

    // The thrower first, then everyone else in turn order: in cut-throat
    // cricket or a finished JDC round the decisive dart can make someone
    // else the winner.
    let candidates: Vec<Uuid> = iter::once(player_id)
        .chain(session.opponents(player_id).map(|p| p.id))
        .collect();
    let winner = candidates.into_iter().find_map(|id| {
        let check = engine.check_win_condition(session, id);
        check.won.then_some((id, check.final_score))
    });

    if let Some((winner_id, _)) = winner {
        session.status = GameStatus::Completed;
        session.winner_id = Some(winner_id);
        for player in &mut session.players {
            player.is_winner = player.id == winner_id;
        }
    }

    let next_player = if session.status == GameStatus::InProgress {
        session.acting_player().map(|p| p.id)
    } else {
        None
    };
    let mut events: Vec<GameEvent> = session.throws[first_new..]
        .iter()
        .map(|throw| GameEvent::ThrowRegistered {
            game_id: session.id,
            throw: throw.clone(),
            next_player,
        })
        .collect();
    if busted {
        events.push(GameEvent::VisitBust {
            game_id: session.id,
            player_id,
            round_number: slot.round_number,
        });
    }
    if let Some((winner_id, final_score)) = winner {
        events.push(GameEvent::GameWon {
            game_id: session.id,
            winner_id,
            final_score,
        });
        events.push(flush_statistics(session));
    }
    Ok(events)
}

/// Rebuild every player's cached counters from the throw log.
fn flush_statistics(session: &mut GameSession) -> GameEvent {
    let statistics = engine_of(session).update_statistics(session);
    for stats in &statistics {
        if let Some(player) = session.players.iter_mut().find(|p| p.id == stats.player_id) {
            player.darts_thrown = stats.darts_thrown;
            player.points_scored = stats.points_scored;
            player.ppd = stats.ppd;
            player.is_winner = stats.is_winner;
        }
    }
    GameEvent::StatisticsUpdated {
        game_id: session.id,
        statistics,
    }
}
