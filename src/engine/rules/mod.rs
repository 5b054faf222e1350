// Game engines: replay a session's throw log into live state, one engine per
// game type behind a common trait.

pub mod clock;
pub mod cricket;
pub mod jdc;
pub mod x01;

use serde::Serialize;
use uuid::Uuid;

use super::bot::Objective;
use super::session::{GameSession, GameType};

pub use clock::{AroundTheClockEngine, ClockState};
pub use cricket::{CricketEngine, CricketState};
pub use jdc::{JdcEngine, JdcState};
pub use x01::{X01Engine, X01State};

/// Outcome of a win check for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinCheck {
    pub won: bool,
    pub final_score: Option<i32>,
}

impl WinCheck {
    pub const NOT_WON: WinCheck = WinCheck {
        won: false,
        final_score: None,
    };

    pub fn won(final_score: i32) -> Self {
        Self {
            won: true,
            final_score: Some(final_score),
        }
    }
}

/// Engine-specific projection of one player, rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerState {
    X01(X01State),
    Cricket(CricketState),
    AroundTheClock(ClockState),
    Jdc(JdcState),
}

/// Per-player totals recomputed from the whole throw log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatistics {
    pub player_id: Uuid,
    pub darts_thrown: u32,
    pub points_scored: u32,
    pub ppd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_per_round: Option<f64>,
    pub is_winner: bool,
}

/// Replay contract shared by every game type. Implementations are pure: the
/// same session always yields the same answers, and no well-formed log
/// (including one that stops mid-visit) makes them fail.
pub trait GameEngine: Send + Sync {
    fn game_type(&self) -> GameType;

    /// Head-line number: remaining score for X01, accumulated points or
    /// progress otherwise.
    fn calculate_current_score(&self, session: &GameSession, player_id: Uuid) -> i32;

    fn check_win_condition(&self, session: &GameSession, player_id: Uuid) -> WinCheck;

    fn player_state(&self, session: &GameSession, player_id: Uuid) -> PlayerState;

    /// What a bot playing `player_id` should be trying to do next.
    fn bot_objective(&self, session: &GameSession, player_id: Uuid) -> Objective;

    /// Whether the player's latest visit busted.
    fn visit_busted(&self, _session: &GameSession, _player_id: Uuid) -> bool {
        false
    }

    /// Whether the player's latest visit was cut short (an X01 bust).
    fn visit_ended_early(&self, _session: &GameSession, _player_id: Uuid) -> bool {
        false
    }

    /// Points credited to the player for statistics.
    fn points_scored(&self, session: &GameSession, player_id: Uuid) -> u32 {
        session
            .player_throws(player_id)
            .iter()
            .map(|t| t.score.points() as u32)
            .sum()
    }

    fn marks_per_round(&self, _session: &GameSession, _player_id: Uuid) -> Option<f64> {
        None
    }

    /// One statistics row per player, recomputed from scratch.
    fn update_statistics(&self, session: &GameSession) -> Vec<PlayerStatistics> {
        session
            .players
            .iter()
            .map(|player| {
                let darts_thrown = session.player_throws(player.id).len() as u32;
                let points_scored = self.points_scored(session, player.id);
                PlayerStatistics {
                    player_id: player.id,
                    darts_thrown,
                    points_scored,
                    ppd: points_per_dart(points_scored, darts_thrown),
                    marks_per_round: self.marks_per_round(session, player.id),
                    is_winner: session.winner_id == Some(player.id),
                }
            })
            .collect()
    }
}

pub fn points_per_dart(points: u32, darts: u32) -> f64 {
    if darts == 0 {
        0.0
    } else {
        points as f64 / darts as f64
    }
}

static X01: X01Engine = X01Engine;
static CRICKET: CricketEngine = CricketEngine;
static AROUND_THE_CLOCK: AroundTheClockEngine = AroundTheClockEngine;
static JDC: JdcEngine = JdcEngine;

/// Engine lookup table. Every game type maps to exactly one engine.
pub fn engine_for(game_type: GameType) -> &'static dyn GameEngine {
    match game_type {
        GameType::X01 => &X01,
        GameType::Cricket => &CRICKET,
        GameType::AroundTheClock => &AROUND_THE_CLOCK,
        GameType::JdcChallenge => &JDC,
    }
}

/// Engine for a session's own game type.
pub fn engine_of(session: &GameSession) -> &'static dyn GameEngine {
    engine_for(session.game_type)
}
