// Checkout routes for X01: how to take a remaining score out in up to three darts.

use super::score::{Score, BULL};
use super::session::OutMode;

/// Highest score that can be finished in one visit under double out.
pub const MAX_DOUBLE_OUT: u32 = 170;

/// Master out can finish on a treble, so T20 T20 T20 is the ceiling.
pub const MAX_MASTER_OUT: u32 = 180;

/// Totals at or below 170 that no three-dart double-out visit can finish.
pub const BOGEY_NUMBERS: [u32; 7] = [169, 168, 166, 165, 163, 162, 159];

/// Whether `remaining` can be finished within one visit.
pub fn is_checkout(remaining: u32, out_mode: OutMode) -> bool {
    checkout_route(remaining, out_mode, 3).is_some()
}

/// First dart of the preferred route with the darts left in the visit, if
/// the score is on a finish.
pub fn checkout_target(remaining: u32, out_mode: OutMode, darts: u8) -> Option<Score> {
    checkout_route(remaining, out_mode, darts).and_then(|route| route.first().copied())
}

/// Preferred route for `remaining` using at most `darts` darts.
pub fn checkout_route(remaining: u32, out_mode: OutMode, darts: u8) -> Option<Vec<Score>> {
    if remaining == 0 || darts == 0 {
        return None;
    }
    let out_of_reach = match out_mode {
        OutMode::Double => remaining > MAX_DOUBLE_OUT || BOGEY_NUMBERS.contains(&remaining),
        OutMode::Master => remaining > MAX_MASTER_OUT,
        OutMode::Straight => false,
    };
    if out_of_reach {
        return None;
    }
    if let Some(finish) = one_dart_finish(remaining, out_mode) {
        return Some(vec![finish]);
    }
    if darts == 1 {
        return None;
    }

    for setup in setup_candidates(remaining) {
        let points = setup.points() as u32;
        if points >= remaining {
            continue;
        }
        if let Some(mut rest) = checkout_route(remaining - points, out_mode, darts - 1) {
            rest.insert(0, setup);
            return Some(rest);
        }
    }
    None
}

fn one_dart_finish(remaining: u32, out_mode: OutMode) -> Option<Score> {
    let double = || -> Option<Score> {
        match remaining {
            50 => Score::double(BULL).ok(),
            r if r <= 40 && r % 2 == 0 => Score::double(r as u8 / 2).ok(),
            _ => None,
        }
    };
    let triple = || -> Option<Score> {
        match remaining {
            r if r <= 60 && r % 3 == 0 => Score::triple(r as u8 / 3).ok(),
            _ => None,
        }
    };

    match out_mode {
        OutMode::Double => double(),
        OutMode::Master => double().or_else(triple),
        OutMode::Straight => match remaining {
            r if r <= 20 => Score::single(r as u8).ok(),
            25 => Score::single(BULL).ok(),
            _ => double().or_else(triple),
        },
    }
}

/// Setup darts in order of preference. Low scores set up with a single that
/// leaves the friendliest double; big scores go through the trebles first.
fn setup_candidates(remaining: u32) -> Vec<Score> {
    let trebles = (10..=20).rev().filter_map(|s| Score::triple(s).ok());
    let bulls = [Score::double(BULL), Score::single(BULL)]
        .into_iter()
        .filter_map(Result::ok);

    let mut singles: Vec<Score> = (1..=20).filter_map(|s| Score::single(s).ok()).collect();
    singles.sort_by_key(|s| {
        let leave = remaining.saturating_sub(s.points() as u32);
        (std::cmp::Reverse(halvings(leave)), std::cmp::Reverse(leave))
    });

    if remaining <= 60 {
        singles.into_iter().chain(trebles).chain(bulls).collect()
    } else {
        trebles.chain(bulls).chain(singles).collect()
    }
}

/// How many times a leave can be halved while staying even: 32 -> D16 -> D8...
fn halvings(mut leave: u32) -> u32 {
    if leave == 0 || leave > 40 {
        return 0;
    }
    let mut count = 0;
    while leave % 2 == 0 {
        leave /= 2;
        count += 1;
    }
    count
}

/// Human readable route, e.g. "T20 T20 Bull".
pub fn describe_route(route: &[Score]) -> String {
    route
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(remaining: u32) -> Option<String> {
        checkout_route(remaining, OutMode::Double, 3).map(|r| describe_route(&r))
    }

    #[test]
    fn test_direct_doubles() {
        assert_eq!(route(40).as_deref(), Some("D20"));
        assert_eq!(route(32).as_deref(), Some("D16"));
        assert_eq!(route(2).as_deref(), Some("D1"));
        assert_eq!(route(50).as_deref(), Some("Bull"));
    }

    #[test]
    fn test_odd_numbers_set_up_a_double() {
        assert_eq!(route(41).as_deref(), Some("S9 D16"));
        assert_eq!(route(33).as_deref(), Some("S1 D16"));
        assert_eq!(route(3).as_deref(), Some("S1 D1"));
    }

    #[test]
    fn test_big_finishes_use_trebles() {
        assert_eq!(route(170).as_deref(), Some("T20 T20 Bull"));
        assert_eq!(route(100).as_deref(), Some("T20 D20"));
        assert_eq!(route(167).as_deref(), Some("T20 T19 Bull"));
    }

    #[test]
    fn test_bogey_numbers_have_no_route() {
        for bogey in BOGEY_NUMBERS {
            assert!(!is_checkout(bogey, OutMode::Double), "{bogey} should be a bogey");
        }
        assert!(!is_checkout(171, OutMode::Double));
        assert!(!is_checkout(1, OutMode::Double));
    }

    #[test]
    fn test_every_non_bogey_up_to_170_has_a_route() {
        for remaining in 2..=170 {
            if BOGEY_NUMBERS.contains(&remaining) {
                continue;
            }
            let route = checkout_route(remaining, OutMode::Double, 3)
                .unwrap_or_else(|| panic!("no route for {remaining}"));
            let total: u32 = route.iter().map(|s| s.points() as u32).sum();
            assert_eq!(total, remaining);
            assert!(route.last().unwrap().is_double());
        }
    }

    #[test]
    fn test_straight_out_accepts_singles() {
        assert_eq!(checkout_target(7, OutMode::Straight, 3), Score::single(7).ok());
        assert_eq!(checkout_target(25, OutMode::Straight, 3), Score::single(25).ok());
        assert!(is_checkout(180, OutMode::Straight));
    }

    #[test]
    fn test_master_out_accepts_trebles() {
        assert_eq!(checkout_target(57, OutMode::Master, 3), Score::triple(19).ok());
        assert_eq!(checkout_target(57, OutMode::Double, 3), Score::single(17).ok());
    }

    #[test]
    fn test_master_out_above_double_out_ceiling() {
        let master = |r| checkout_route(r, OutMode::Master, 3).map(|r| describe_route(&r));
        assert_eq!(master(162).as_deref(), Some("T20 T20 T14"));
        assert_eq!(master(165).as_deref(), Some("T20 T20 T15"));
        assert_eq!(master(168).as_deref(), Some("T20 T20 T16"));
        assert_eq!(master(171).as_deref(), Some("T20 T20 T17"));
        assert_eq!(master(180).as_deref(), Some("T20 T20 T20"));
        assert!(!is_checkout(181, OutMode::Master));
        assert!(!is_checkout(162, OutMode::Double));

        for remaining in 159..=180 {
            if let Some(route) = checkout_route(remaining, OutMode::Master, 3) {
                let total: u32 = route.iter().map(|s| s.points() as u32).sum();
                assert_eq!(total, remaining);
                let last = route.last().unwrap();
                assert!(last.is_double() || last.is_triple());
            }
        }
    }

    #[test]
    fn test_last_dart_goes_for_a_one_dart_finish() {
        // 41 is a two-dart finish: the first dart sets up, the last has none.
        assert_eq!(checkout_target(41, OutMode::Double, 3), Score::single(9).ok());
        assert_eq!(checkout_target(41, OutMode::Double, 1), None);
        assert_eq!(checkout_target(40, OutMode::Double, 1), Score::double(20).ok());
    }

    #[test]
    fn test_limited_darts() {
        assert!(checkout_route(100, OutMode::Double, 1).is_none());
        assert!(checkout_route(100, OutMode::Double, 2).is_some());
    }
}
