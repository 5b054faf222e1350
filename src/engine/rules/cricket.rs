// Cricket: close 20 down to 15 and the bull, scoring on numbers opponents
// still have open.

use serde::Serialize;
use uuid::Uuid;

use super::{GameEngine, PlayerState, WinCheck};
use crate::engine::bot::Objective;
use crate::engine::score::BULL;
use crate::engine::session::{CricketMode, GameSession, GameType};

pub const CRICKET_NUMBERS: [u8; 7] = [20, 19, 18, 17, 16, 15, BULL];
pub const MARKS_TO_CLOSE: u8 = 3;

fn number_index(segment: u8) -> Option<usize> {
    CRICKET_NUMBERS.iter().position(|&n| n == segment)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberMarks {
    pub number: u8,
    pub marks: u8,
    /// Every player in the game has closed this number.
    pub dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CricketState {
    pub marks: Vec<NumberMarks>,
    pub score: i32,
    pub closed_all: bool,
    pub darts_thrown: u32,
}

/// Marks and scores of every player, indexed by turn order.
#[derive(Debug, Clone)]
struct Board {
    marks: Vec<[u8; 7]>,
    scores: Vec<i32>,
    /// Marks landed on cricket numbers including overflow, for MPR.
    marks_hit: Vec<u32>,
    darts: Vec<u32>,
    /// Position in the throw log of the dart that closed the player's last number.
    closed_at: Vec<Option<usize>>,
}

impl Board {
    fn closed(&self, player: usize, number: usize) -> bool {
        self.marks[player][number] >= MARKS_TO_CLOSE
    }

    fn closed_all(&self, player: usize) -> bool {
        (0..CRICKET_NUMBERS.len()).all(|n| self.closed(player, n))
    }

    fn dead(&self, number: usize) -> bool {
        (0..self.marks.len()).all(|p| self.closed(p, number))
    }
}

/// Replay the whole game in throw order; a dart's value depends on what the
/// opponents had closed at that moment.
fn replay(session: &GameSession) -> Board {
    let players = session.players.len();
    let mode = session.options.cricket_mode;
    let mut board = Board {
        marks: vec![[0; 7]; players],
        scores: vec![0; players],
        marks_hit: vec![0; players],
        darts: vec![0; players],
        closed_at: vec![None; players],
    };

    for (index, dart) in session.ordered_throws().into_iter().enumerate() {
        let Some(p) = session.player_index(dart.player_id) else {
            continue;
        };
        board.darts[p] += 1;
        let Some(n) = number_index(dart.score.segment()) else {
            continue;
        };

        let hits = dart.score.multiplier();
        board.marks_hit[p] += hits as u32;
        let current = board.marks[p][n];
        let closing = hits.min(MARKS_TO_CLOSE.saturating_sub(current));
        let overflow = hits - closing;
        board.marks[p][n] += closing;
        if board.closed_at[p].is_none() && board.closed_all(p) {
            board.closed_at[p] = Some(index);
        }

        if overflow == 0 {
            continue;
        }
        let value = CRICKET_NUMBERS[n] as i32 * overflow as i32;
        match mode {
            CricketMode::Standard => {
                let open_somewhere = (0..players).any(|o| o != p && !board.closed(o, n));
                if open_somewhere {
                    board.scores[p] += value;
                }
            }
            CricketMode::CutThroat => {
                for o in 0..players {
                    if o != p && !board.closed(o, n) {
                        board.scores[o] += value;
                    }
                }
            }
            CricketMode::NoScore => {}
        }
    }

    board
}

pub struct CricketEngine;

impl GameEngine for CricketEngine {
    fn game_type(&self) -> GameType {
        GameType::Cricket
    }

    fn calculate_current_score(&self, session: &GameSession, player_id: Uuid) -> i32 {
        match session.player_index(player_id) {
            Some(p) => replay(session).scores[p],
            None => 0,
        }
    }

    /// All seven numbers closed and strictly ahead of everyone else (strictly
    /// behind in cut-throat, where low scores win). Once every player has
    /// closed everything nothing can change, so a level score goes to whoever
    /// closed first.
    fn check_win_condition(&self, session: &GameSession, player_id: Uuid) -> WinCheck {
        let Some(p) = session.player_index(player_id) else {
            return WinCheck::NOT_WON;
        };
        let board = replay(session);
        if !board.closed_all(p) {
            return WinCheck::NOT_WON;
        }

        let mode = session.options.cricket_mode;
        let mine = board.scores[p];
        let settled = (0..board.scores.len()).all(|o| board.closed_all(o));
        let beats = |o: usize, theirs: i32| {
            let ahead = match mode {
                CricketMode::Standard => mine > theirs,
                CricketMode::CutThroat => mine < theirs,
                CricketMode::NoScore => true,
            };
            ahead || (settled && mine == theirs && board.closed_at[p] < board.closed_at[o])
        };
        let won = board
            .scores
            .iter()
            .enumerate()
            .filter(|&(o, _)| o != p)
            .all(|(o, &theirs)| beats(o, theirs));

        if won {
            WinCheck::won(mine)
        } else {
            WinCheck::NOT_WON
        }
    }

    fn player_state(&self, session: &GameSession, player_id: Uuid) -> PlayerState {
        let board = replay(session);
        let p = session.player_index(player_id);
        let marks = CRICKET_NUMBERS
            .iter()
            .enumerate()
            .map(|(n, &number)| NumberMarks {
                number,
                marks: p.map(|p| board.marks[p][n]).unwrap_or(0),
                dead: board.dead(n),
            })
            .collect();

        PlayerState::Cricket(CricketState {
            marks,
            score: p.map(|p| board.scores[p]).unwrap_or(0),
            closed_all: p.map(|p| board.closed_all(p)).unwrap_or(false),
            darts_thrown: p.map(|p| board.darts[p]).unwrap_or(0),
        })
    }

    /// Highest number still open for the player; once everything is closed,
    /// the highest number an opponent can still be scored on.
    fn bot_objective(&self, session: &GameSession, player_id: Uuid) -> Objective {
        let board = replay(session);
        let Some(p) = session.player_index(player_id) else {
            return Objective::hit_treble(20);
        };

        let open = (0..CRICKET_NUMBERS.len()).find(|&n| !board.closed(p, n));
        let scoring = || (0..CRICKET_NUMBERS.len()).find(|&n| !board.dead(n));
        match open.or_else(scoring) {
            Some(n) => Objective::hit_treble(CRICKET_NUMBERS[n]),
            None => Objective::hit_treble(20),
        }
    }

    fn marks_per_round(&self, session: &GameSession, player_id: Uuid) -> Option<f64> {
        let p = session.player_index(player_id)?;
        let board = replay(session);
        let rounds = board.darts[p].div_ceil(3);
        if rounds == 0 {
            return Some(0.0);
        }
        Some(board.marks_hit[p] as f64 / rounds as f64)
    }
}
