// X01 (301/501/701...): count down to exactly zero under in/out rules.

use serde::Serialize;
use uuid::Uuid;

use super::{GameEngine, PlayerState, WinCheck};
use crate::engine::bot::Objective;
use crate::engine::checkout::{checkout_route, describe_route};
use crate::engine::score::Score;
use crate::engine::session::{GameSession, GameType, InMode, OutMode, DEFAULT_X01_START};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
    /// Fewer than three darts and nothing decided yet.
    InProgress,
    Scored,
    Bust,
    Checkout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct X01State {
    pub starting_score: u32,
    pub remaining: u32,
    pub opened: bool,
    pub darts_thrown: u32,
    pub busts: u32,
    pub finished: bool,
    /// Outcome of the player's latest visit, if they have thrown at all.
    pub last_visit: Option<VisitOutcome>,
    pub darts_in_visit: u8,
    /// Suggested finish for the remaining score, e.g. "T20 T20 Bull".
    pub checkout: Option<String>,
}

/// Result of replaying one player's throws.
#[derive(Debug, Clone)]
struct Replay {
    remaining: u32,
    opened: bool,
    darts_thrown: u32,
    busts: u32,
    finished: bool,
    last_visit: Option<(VisitOutcome, u8)>,
}

fn opens(in_mode: InMode, score: Score) -> bool {
    match in_mode {
        InMode::Straight => !score.is_miss(),
        InMode::Double => score.is_double(),
        InMode::Master => score.is_double() || score.is_triple(),
    }
}

fn finishes(out_mode: OutMode, score: Score) -> bool {
    match out_mode {
        OutMode::Straight => true,
        OutMode::Double => score.is_double(),
        OutMode::Master => score.is_double() || score.is_triple(),
    }
}

fn replay(session: &GameSession, player_id: Uuid) -> Replay {
    let start = session.starting_score.unwrap_or(DEFAULT_X01_START);
    let in_mode = session.options.in_mode;
    let out_mode = session.options.out_mode;

    let mut state = Replay {
        remaining: start,
        opened: in_mode == InMode::Straight,
        darts_thrown: 0,
        busts: 0,
        finished: false,
        last_visit: None,
    };

    let throws = session.player_throws(player_id);
    for visit in throws.chunk_by(|a, b| a.round_number == b.round_number) {
        if state.finished {
            break;
        }

        let mut visit_total: u32 = 0;
        let mut outcome = VisitOutcome::InProgress;

        for dart in visit {
            state.darts_thrown += 1;
            // Darts after a bust in the same visit never score.
            if outcome != VisitOutcome::InProgress {
                continue;
            }
            if !state.opened {
                if !opens(in_mode, dart.score) {
                    continue;
                }
                state.opened = true;
            }

            let points = dart.score.points() as u32;
            let before = state.remaining - visit_total;
            if points > before {
                outcome = VisitOutcome::Bust;
                continue;
            }
            let after = before - points;
            if after == 1 && out_mode != OutMode::Straight {
                outcome = VisitOutcome::Bust;
            } else if after == 0 {
                if finishes(out_mode, dart.score) {
                    visit_total += points;
                    outcome = VisitOutcome::Checkout;
                } else {
                    outcome = VisitOutcome::Bust;
                }
            } else {
                visit_total += points;
            }
        }

        match outcome {
            VisitOutcome::Bust => state.busts += 1,
            VisitOutcome::Checkout => {
                state.remaining -= visit_total;
                state.finished = true;
            }
            VisitOutcome::InProgress | VisitOutcome::Scored => state.remaining -= visit_total,
        }

        let outcome = match outcome {
            VisitOutcome::InProgress if visit.len() >= 3 => VisitOutcome::Scored,
            other => other,
        };
        state.last_visit = Some((outcome, visit.len() as u8));
    }

    state
}

pub struct X01Engine;

impl GameEngine for X01Engine {
    fn game_type(&self) -> GameType {
        GameType::X01
    }

    fn calculate_current_score(&self, session: &GameSession, player_id: Uuid) -> i32 {
        replay(session, player_id).remaining as i32
    }

    fn check_win_condition(&self, session: &GameSession, player_id: Uuid) -> WinCheck {
        if session.player(player_id).is_none() {
            return WinCheck::NOT_WON;
        }
        let state = replay(session, player_id);
        if state.finished {
            WinCheck::won(state.remaining as i32)
        } else {
            WinCheck::NOT_WON
        }
    }

    fn player_state(&self, session: &GameSession, player_id: Uuid) -> PlayerState {
        let state = replay(session, player_id);
        let checkout = if state.opened && !state.finished {
            checkout_route(state.remaining, session.options.out_mode, 3)
                .map(|route| describe_route(&route))
        } else {
            None
        };
        PlayerState::X01(X01State {
            starting_score: session.starting_score.unwrap_or(DEFAULT_X01_START),
            remaining: state.remaining,
            opened: state.opened,
            darts_thrown: state.darts_thrown,
            busts: state.busts,
            finished: state.finished,
            last_visit: state.last_visit.map(|(outcome, _)| outcome),
            darts_in_visit: state.last_visit.map(|(_, darts)| darts).unwrap_or(0),
            checkout,
        })
    }

    fn bot_objective(&self, session: &GameSession, player_id: Uuid) -> Objective {
        let state = replay(session, player_id);
        Objective::Score {
            remaining: state.remaining,
            opened: state.opened,
            in_mode: session.options.in_mode,
            out_mode: session.options.out_mode,
            darts_left: session.next_slot().darts_left(),
        }
    }

    fn visit_busted(&self, session: &GameSession, player_id: Uuid) -> bool {
        matches!(
            replay(session, player_id).last_visit,
            Some((VisitOutcome::Bust, _))
        )
    }

    fn visit_ended_early(&self, session: &GameSession, player_id: Uuid) -> bool {
        matches!(
            replay(session, player_id).last_visit,
            Some((VisitOutcome::Bust, darts)) if darts < 3
        )
    }

    /// Effective points: how far the remaining score has come down.
    fn points_scored(&self, session: &GameSession, player_id: Uuid) -> u32 {
        let start = session.starting_score.unwrap_or(DEFAULT_X01_START);
        start - replay(session, player_id).remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::testing::*;
    use crate::engine::session::GameOptions;

    fn x01(start: u32, in_mode: InMode, out_mode: OutMode) -> GameSession {
        session(
            GameType::X01,
            Some(start),
            1,
            GameOptions {
                in_mode,
                out_mode,
                ..GameOptions::default()
            },
        )
    }

    #[test]
    fn test_bot_objective_counts_darts_left() {
        let mut game = x01(101, InMode::Straight, OutMode::Double);
        let a = game.players[0].id;
        let plan = |game: &GameSession| match X01Engine.bot_objective(game, a) {
            Objective::Score {
                remaining,
                darts_left,
                ..
            } => (remaining, darts_left),
            other => panic!("unexpected objective {other:?}"),
        };
        assert_eq!(plan(&game), (101, 3));
        throw(&mut game, a, s(1));
        assert_eq!(plan(&game), (100, 2));
        throw(&mut game, a, s(20));
        assert_eq!(plan(&game), (80, 1));
    }

    fn remaining(game: &GameSession) -> i32 {
        X01Engine.calculate_current_score(game, game.players[0].id)
    }

    #[test]
    fn test_single_twenty_on_twenty_busts_under_double_out() {
        let mut game = x01(20, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, s(20));
        assert_eq!(remaining(&game), 20);
        assert!(X01Engine.visit_ended_early(&game, p));
        assert!(!X01Engine.check_win_condition(&game, p).won);
    }

    #[test]
    fn test_overshoot_busts() {
        let mut game = x01(20, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, t(20));
        assert_eq!(remaining(&game), 20);
    }

    #[test]
    fn test_leaving_one_busts() {
        let mut game = x01(20, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, s(19));
        assert_eq!(remaining(&game), 20);
    }

    #[test]
    fn test_leaving_one_is_fine_on_straight_out() {
        let mut game = x01(20, InMode::Straight, OutMode::Straight);
        let p = game.players[0].id;
        throw(&mut game, p, s(19));
        assert_eq!(remaining(&game), 1);
        throw(&mut game, p, s(1));
        assert_eq!(X01Engine.check_win_condition(&game, p), WinCheck::won(0));
    }

    #[test]
    fn test_double_finish_wins() {
        let mut game = x01(40, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, d(20));
        assert_eq!(X01Engine.check_win_condition(&game, p), WinCheck::won(0));
        assert_eq!(remaining(&game), 0);
    }

    #[test]
    fn test_master_out_accepts_treble_finish() {
        let mut game = x01(60, InMode::Straight, OutMode::Master);
        let p = game.players[0].id;
        throw(&mut game, p, t(20));
        assert!(X01Engine.check_win_condition(&game, p).won);
    }

    #[test]
    fn test_bust_discards_whole_visit() {
        let mut game = x01(100, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, t(20)); // 40 left provisionally
        assert_eq!(remaining(&game), 40);
        throw(&mut game, p, t(20)); // overshoot
        assert_eq!(remaining(&game), 100);
        // Third dart would check out, but the visit is already bust.
        throw(&mut game, p, d(20));
        assert_eq!(remaining(&game), 100);
        assert!(!X01Engine.check_win_condition(&game, p).won);
        // Full visit, so it busted without ending early.
        assert!(X01Engine.visit_busted(&game, p));
        assert!(!X01Engine.visit_ended_early(&game, p));

        throw(&mut game, p, t(20));
        throw(&mut game, p, d(20));
        assert!(X01Engine.check_win_condition(&game, p).won);
    }

    #[test]
    fn test_double_in_ignores_darts_until_opened() {
        let mut game = x01(301, InMode::Double, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, t(20));
        throw(&mut game, p, s(20));
        assert_eq!(remaining(&game), 301);
        throw(&mut game, p, d(10));
        assert_eq!(remaining(&game), 281);
        throw(&mut game, p, t(20));
        assert_eq!(remaining(&game), 221);

        match X01Engine.player_state(&game, p) {
            PlayerState::X01(state) => {
                assert!(state.opened);
                assert_eq!(state.darts_thrown, 4);
                assert_eq!(state.last_visit, Some(VisitOutcome::InProgress));
                assert_eq!(state.darts_in_visit, 1);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_finish_with_single_under_double_out_busts() {
        let mut game = x01(32, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, s(16));
        throw(&mut game, p, s(16));
        assert_eq!(remaining(&game), 32);
        assert!(X01Engine.visit_ended_early(&game, p));
    }

    #[test]
    fn test_state_offers_checkout() {
        let mut game = x01(170, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        if let PlayerState::X01(state) = X01Engine.player_state(&game, p) {
            assert_eq!(state.checkout.as_deref(), Some("T20 T20 Bull"));
        }
        throw(&mut game, p, t(20));
        if let PlayerState::X01(state) = X01Engine.player_state(&game, p) {
            assert_eq!(state.remaining, 110);
            assert_eq!(state.checkout.as_deref(), Some("T20 Bull"));
        }
    }

    #[test]
    fn test_effective_points_exclude_busts() {
        let mut game = x01(100, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        throw(&mut game, p, t(20));
        throw(&mut game, p, s(20));
        throw(&mut game, p, s(5)); // 15 left, scored visit
        throw(&mut game, p, t(20)); // bust
        finish_visit(&mut game);

        let stats = X01Engine.update_statistics(&game);
        assert_eq!(stats[0].darts_thrown, 6);
        assert_eq!(stats[0].points_scored, 85);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut game = x01(501, InMode::Straight, OutMode::Double);
        let p = game.players[0].id;
        for score in [t(20), t(19), s(5), d(20), t(1)] {
            throw(&mut game, p, score);
        }
        let first = (
            X01Engine.calculate_current_score(&game, p),
            X01Engine.check_win_condition(&game, p),
            X01Engine.player_state(&game, p),
        );
        let second = (
            X01Engine.calculate_current_score(&game, p),
            X01Engine.check_win_condition(&game, p),
            X01Engine.player_state(&game, p),
        );
        assert_eq!(first, second);
    }
}
