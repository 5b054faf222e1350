// Around the Clock: hit 1 through 20 and then the bull, in order. Fewest darts wins.

use serde::Serialize;
use uuid::Uuid;

use super::{GameEngine, PlayerState, WinCheck};
use crate::engine::bot::Objective;
use crate::engine::score::BULL;
use crate::engine::session::{GameSession, GameType};

pub const CLOCK_TARGETS: [u8; 21] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, BULL,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockState {
    /// Next number to hit, `None` once the bull is done.
    pub current_target: Option<u8>,
    pub progress: usize,
    pub targets_total: usize,
    pub darts_thrown: u32,
    pub finished: bool,
}

struct Replay {
    progress: usize,
    darts_thrown: u32,
    /// Darts it took to reach the end, if the player got there.
    finished_after: Option<u32>,
}

fn replay(session: &GameSession, player_id: Uuid) -> Replay {
    let mut state = Replay {
        progress: 0,
        darts_thrown: 0,
        finished_after: None,
    };
    for dart in session.player_throws(player_id) {
        state.darts_thrown += 1;
        if state.finished_after.is_some() {
            continue;
        }
        if dart.score.segment() == CLOCK_TARGETS[state.progress] {
            state.progress += 1;
            if state.progress == CLOCK_TARGETS.len() {
                state.finished_after = Some(state.darts_thrown);
            }
        }
    }
    state
}

pub struct AroundTheClockEngine;

impl GameEngine for AroundTheClockEngine {
    fn game_type(&self) -> GameType {
        GameType::AroundTheClock
    }

    /// Number of targets ticked off so far.
    fn calculate_current_score(&self, session: &GameSession, player_id: Uuid) -> i32 {
        replay(session, player_id).progress as i32
    }

    /// The final score is the number of darts needed, lower is better.
    fn check_win_condition(&self, session: &GameSession, player_id: Uuid) -> WinCheck {
        if session.player(player_id).is_none() {
            return WinCheck::NOT_WON;
        }
        match replay(session, player_id).finished_after {
            Some(darts) => WinCheck::won(darts as i32),
            None => WinCheck::NOT_WON,
        }
    }

    fn player_state(&self, session: &GameSession, player_id: Uuid) -> PlayerState {
        let state = replay(session, player_id);
        PlayerState::AroundTheClock(ClockState {
            current_target: CLOCK_TARGETS.get(state.progress).copied(),
            progress: state.progress,
            targets_total: CLOCK_TARGETS.len(),
            darts_thrown: state.darts_thrown,
            finished: state.finished_after.is_some(),
        })
    }

    fn bot_objective(&self, session: &GameSession, player_id: Uuid) -> Objective {
        let state = replay(session, player_id);
        let target = CLOCK_TARGETS.get(state.progress).copied().unwrap_or(BULL);
        Objective::Hit {
            segment: target,
            multiplier: None,
        }
    }
}
