// JDC Challenge: 33 three-dart visits over three phases.
//
// Phase 1: 10-15, any ring, Shanghai bonus.
// Phase 2: doubles 1-20 and bull, 50 per double hit.
// Phase 3: 15-20, any ring, Shanghai bonus.

use serde::Serialize;
use uuid::Uuid;

use super::{GameEngine, PlayerState, WinCheck};
use crate::engine::bot::Objective;
use crate::engine::score::{Score, BULL};
use crate::engine::session::{GameSession, GameType};
use crate::engine::throw::ThrowRecord;

pub const SHANGHAI_BONUS: i32 = 100;
pub const DOUBLE_HIT_POINTS: i32 = 50;
pub const DARTS_PER_VISIT: usize = 3;
pub const TOTAL_VISITS: usize = 33;
pub const TOTAL_DARTS: usize = TOTAL_VISITS * DARTS_PER_VISIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JdcVisit {
    pub phase: u8,
    pub target: u8,
}

/// The fixed visit sequence.
pub fn visit_plan() -> Vec<JdcVisit> {
    let phase1 = (10..=15).map(|target| JdcVisit { phase: 1, target });
    let phase2 = (1..=20)
        .chain(std::iter::once(BULL))
        .map(|target| JdcVisit { phase: 2, target });
    let phase3 = (15..=20).map(|target| JdcVisit { phase: 3, target });
    phase1.chain(phase2).chain(phase3).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JdcState {
    /// Current phase, `None` once all 99 darts are thrown.
    pub phase: Option<u8>,
    pub current_target: Option<u8>,
    pub darts_in_visit: u8,
    /// Points from completed visits.
    pub score: i32,
    /// Provisional points of the visit in progress.
    pub visit_points: i32,
    pub shanghais: u32,
    pub visits_completed: usize,
    pub darts_thrown: u32,
    pub finished: bool,
}

struct Replay {
    score: i32,
    visit_points: i32,
    shanghais: u32,
    visits_completed: usize,
    darts_in_visit: usize,
    darts_thrown: u32,
}

impl Replay {
    fn finished(&self) -> bool {
        self.visits_completed >= TOTAL_VISITS
    }
}

/// Points for the darts thrown so far at one visit target, and whether they
/// form a Shanghai.
fn score_visit(visit: JdcVisit, darts: &[&ThrowRecord]) -> (i32, bool) {
    let on_target = darts.iter().map(|t| t.score).filter(|s| s.segment() == visit.target);

    if visit.phase == 2 {
        let doubles = on_target.filter(Score::is_double).count() as i32;
        return (doubles * DOUBLE_HIT_POINTS, false);
    }

    let mut points = 0;
    let mut rings = [false; 3];
    for score in on_target {
        points += score.points() as i32;
        rings[score.multiplier() as usize - 1] = true;
    }
    let shanghai = rings.iter().all(|&hit| hit);
    if shanghai {
        points += SHANGHAI_BONUS;
    }
    (points, shanghai)
}

fn replay(session: &GameSession, player_id: Uuid) -> Replay {
    let plan = visit_plan();
    let throws = session.player_throws(player_id);
    let mut state = Replay {
        score: 0,
        visit_points: 0,
        shanghais: 0,
        visits_completed: 0,
        darts_in_visit: 0,
        darts_thrown: throws.len().min(TOTAL_DARTS) as u32,
    };

    for (visit, darts) in plan.iter().zip(throws.chunks(DARTS_PER_VISIT)) {
        let (points, shanghai) = score_visit(*visit, darts);
        if darts.len() < DARTS_PER_VISIT {
            state.visit_points = points;
            state.darts_in_visit = darts.len();
            break;
        }
        state.score += points;
        state.visits_completed += 1;
        if shanghai {
            state.shanghais += 1;
        }
    }

    state
}

pub struct JdcEngine;

impl GameEngine for JdcEngine {
    fn game_type(&self) -> GameType {
        GameType::JdcChallenge
    }

    fn calculate_current_score(&self, session: &GameSession, player_id: Uuid) -> i32 {
        replay(session, player_id).score
    }

    /// A player's challenge ends at 99 darts. Solo, that is the win; with
    /// several players the game is decided once everyone has finished, by the
    /// highest score with ties going to the earlier player.
    fn check_win_condition(&self, session: &GameSession, player_id: Uuid) -> WinCheck {
        let Some(index) = session.player_index(player_id) else {
            return WinCheck::NOT_WON;
        };
        let results: Vec<Replay> = session
            .players
            .iter()
            .map(|p| replay(session, p.id))
            .collect();
        if !results.iter().all(Replay::finished) {
            return WinCheck::NOT_WON;
        }

        let mine = results[index].score;
        let beaten_or_tied_earlier = results.iter().enumerate().any(|(i, other)| {
            i != index && (other.score > mine || (other.score == mine && i < index))
        });
        if beaten_or_tied_earlier {
            WinCheck::NOT_WON
        } else {
            WinCheck::won(mine)
        }
    }

    fn player_state(&self, session: &GameSession, player_id: Uuid) -> PlayerState {
        let state = replay(session, player_id);
        let current = visit_plan().get(state.visits_completed).copied();
        PlayerState::Jdc(JdcState {
            phase: current.map(|v| v.phase),
            current_target: current.map(|v| v.target),
            darts_in_visit: state.darts_in_visit as u8,
            score: state.score,
            visit_points: state.visit_points,
            shanghais: state.shanghais,
            visits_completed: state.visits_completed,
            darts_thrown: state.darts_thrown,
            finished: state.finished(),
        })
    }

    /// Trebles in the Shanghai phases, the double in phase 2.
    fn bot_objective(&self, session: &GameSession, player_id: Uuid) -> Objective {
        let state = replay(session, player_id);
        match visit_plan().get(state.visits_completed) {
            Some(visit) if visit.phase == 2 => Objective::Hit {
                segment: visit.target,
                multiplier: Some(2),
            },
            Some(visit) => Objective::hit_treble(visit.target),
            None => Objective::hit_treble(20),
        }
    }

    fn points_scored(&self, session: &GameSession, player_id: Uuid) -> u32 {
        replay(session, player_id).score.max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::testing::*;
    use crate::engine::session::GameOptions;

    fn jdc(players: usize) -> GameSession {
        session(GameType::JdcChallenge, None, players, GameOptions::default())
    }

    fn state(game: &GameSession, p: Uuid) -> JdcState {
        match JdcEngine.player_state(game, p) {
            PlayerState::Jdc(state) => state,
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_plan_has_33_visits() {
        let plan = visit_plan();
        assert_eq!(plan.len(), TOTAL_VISITS);
        assert_eq!(plan[0], JdcVisit { phase: 1, target: 10 });
        assert_eq!(plan[5], JdcVisit { phase: 1, target: 15 });
        assert_eq!(plan[6], JdcVisit { phase: 2, target: 1 });
        assert_eq!(plan[26], JdcVisit { phase: 2, target: BULL });
        assert_eq!(plan[27], JdcVisit { phase: 3, target: 15 });
        assert_eq!(plan[32], JdcVisit { phase: 3, target: 20 });
    }

    #[test]
    fn test_shanghai_bonus() {
        let mut game = jdc(1);
        let p = game.players[0].id;
        throw(&mut game, p, s(10));
        throw(&mut game, p, d(10));
        throw(&mut game, p, t(10));
        assert_eq!(JdcEngine.calculate_current_score(&game, p), 60 + SHANGHAI_BONUS);
        assert_eq!(state(&game, p).shanghais, 1);
    }

    #[test]
    fn test_off_target_darts_score_nothing() {
        let mut game = jdc(1);
        let p = game.players[0].id;
        throw(&mut game, p, t(20));
        throw(&mut game, p, s(10));
        throw(&mut game, p, s(11));
        assert_eq!(JdcEngine.calculate_current_score(&game, p), 10);
    }

    #[test]
    fn test_partial_visit_is_in_progress() {
        let mut game = jdc(1);
        let p = game.players[0].id;
        throw(&mut game, p, t(10));
        throw(&mut game, p, t(10));
        let st = state(&game, p);
        assert_eq!(st.score, 0);
        assert_eq!(st.visit_points, 60);
        assert_eq!(st.darts_in_visit, 2);
        assert_eq!(st.current_target, Some(10));
        assert_eq!(st.phase, Some(1));
    }

    #[test]
    fn test_doubles_phase() {
        let mut game = jdc(1);
        let p = game.players[0].id;
        for _ in 0..6 {
            skip_visit(&mut game);
        }
        assert_eq!(state(&game, p).phase, Some(2));
        assert_eq!(
            JdcEngine.bot_objective(&game, p),
            Objective::Hit {
                segment: 1,
                multiplier: Some(2)
            }
        );
        throw(&mut game, p, d(1));
        throw(&mut game, p, s(1));
        throw(&mut game, p, d(1));
        assert_eq!(JdcEngine.calculate_current_score(&game, p), 2 * DOUBLE_HIT_POINTS);
    }

    #[test]
    fn test_solo_finishes_at_99_darts() {
        let mut game = jdc(1);
        let p = game.players[0].id;
        for _ in 0..32 {
            skip_visit(&mut game);
        }
        throw(&mut game, p, s(20));
        throw(&mut game, p, s(20));
        assert!(!JdcEngine.check_win_condition(&game, p).won);
        throw(&mut game, p, s(20));
        assert_eq!(JdcEngine.check_win_condition(&game, p), WinCheck::won(60));
        let st = state(&game, p);
        assert!(st.finished);
        assert_eq!(st.phase, None);
        assert_eq!(st.darts_thrown, 99);
    }

    #[test]
    fn test_multiplayer_waits_for_everyone() {
        let mut game = jdc(2);
        let a = game.players[0].id;
        let b = game.players[1].id;

        throw(&mut game, a, s(10));
        finish_visit(&mut game);
        for _ in 0..64 {
            skip_visit(&mut game);
        }
        // A finished with 10 points, B has one visit left.
        assert!(!JdcEngine.check_win_condition(&game, a).won);
        skip_visit(&mut game);
        assert_eq!(JdcEngine.check_win_condition(&game, a), WinCheck::won(10));
        assert!(!JdcEngine.check_win_condition(&game, b).won);
    }

    #[test]
    fn test_tie_goes_to_earlier_player() {
        let mut game = jdc(2);
        let a = game.players[0].id;
        let b = game.players[1].id;
        for _ in 0..66 {
            skip_visit(&mut game);
        }
        assert!(JdcEngine.check_win_condition(&game, a).won);
        assert!(!JdcEngine.check_win_condition(&game, b).won);
    }
}
