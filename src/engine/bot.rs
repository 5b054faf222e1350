// Bot players: pick a target for the current objective, aim at it and let
// Gaussian dispersion decide where the dart lands.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::{neighbours, point_to_score, target_to_point, Point, SEGMENT_ORDER};
use super::checkout::checkout_target;
use super::score::{Score, BULL};
use super::session::{InMode, OutMode};

/// Dispersion at skill 1 and skill 100, in millimetres.
pub const MAX_SIGMA_MM: f64 = 150.0;
pub const MIN_SIGMA_MM: f64 = 5.0;

/// Scoring numbers a bot picks from when not on a finish, most favoured first.
const SCORING_NUMBERS: [(u8, f64); 4] = [(20, 0.70), (19, 0.15), (18, 0.10), (17, 0.05)];

/// What the bot is trying to do with its next dart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    /// Bring an X01 score down and finish it.
    Score {
        remaining: u32,
        #[serde(default)]
        opened: bool,
        #[serde(default)]
        in_mode: InMode,
        #[serde(default)]
        out_mode: OutMode,
        /// Darts left in the visit, this one included.
        #[serde(default = "full_visit")]
        darts_left: u8,
    },
    /// Hit a specific number; `None` means any ring of it.
    Hit {
        segment: u8,
        #[serde(default)]
        multiplier: Option<u8>,
    },
}

fn full_visit() -> u8 {
    3
}

impl Objective {
    /// The treble of `segment`, or the double bull when the bull is wanted.
    pub fn hit_treble(segment: u8) -> Self {
        let multiplier = if segment == BULL { 2 } else { 3 };
        Objective::Hit {
            segment,
            multiplier: Some(multiplier),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

/// How well a bot throws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    /// Drives how often the bot goes for trebles when scoring.
    pub average_ppd: f64,
    /// Chance in [0, 1] that a scoring dart passes the hit gate.
    pub consistency: f64,
    /// Chance in [0, 1] that a finishing dart passes the hit gate.
    pub checkout_skill: f64,
    /// Standard deviation of the landing point on each axis.
    pub sigma_mm: f64,
    /// Route darts that fail the hit gate through the miss table instead of
    /// pure coordinate noise.
    #[serde(default)]
    pub deliberate_misses: bool,
}

impl Default for BotProfile {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::Medium)
    }
}

impl BotProfile {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let (average_ppd, consistency, checkout_skill, sigma_mm) = match difficulty {
            Difficulty::Easy => (8.0, 0.35, 0.10, 90.0),
            Difficulty::Medium => (13.0, 0.55, 0.30, 55.0),
            Difficulty::Hard => (18.0, 0.75, 0.55, 30.0),
            Difficulty::Expert => (25.0, 0.90, 0.80, 15.0),
        };
        Self {
            average_ppd,
            consistency,
            checkout_skill,
            sigma_mm,
            deliberate_misses: true,
        }
    }

    /// Continuous skill scale. Dispersion runs linearly from 150 mm at
    /// skill 1 to 5 mm at skill 100; out-of-range skills are clamped.
    pub fn from_skill(skill: u8) -> Self {
        let t = (skill.clamp(1, 100) - 1) as f64 / 99.0;
        Self {
            average_ppd: 5.0 + 22.0 * t,
            consistency: 0.2 + 0.75 * t,
            checkout_skill: 0.05 + 0.85 * t,
            sigma_mm: MAX_SIGMA_MM - (MAX_SIGMA_MM - MIN_SIGMA_MM) * t,
            deliberate_misses: false,
        }
    }

    /// Chance the bot goes for the treble rather than the fat single.
    fn treble_rate(&self) -> f64 {
        ((self.average_ppd - 5.0) / 20.0).clamp(0.1, 0.95)
    }
}

/// One simulated dart: what the bot aimed at and where it landed. `landing`
/// is `None` when the miss table decided the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulatedDart {
    pub target: Score,
    pub landing: Option<Point>,
    pub score: Score,
}

fn ring(segment: u8, multiplier: u8) -> Score {
    Score::new(segment, multiplier)
        .or_else(|_| Score::single(segment))
        .unwrap_or(Score::miss())
}

/// Pick the target for the next dart.
pub fn select_target<R: Rng + ?Sized>(
    profile: &BotProfile,
    objective: &Objective,
    rng: &mut R,
) -> Score {
    match *objective {
        Objective::Hit {
            segment,
            multiplier: Some(multiplier),
        } => ring(segment, multiplier),
        // Any ring counts: the bull is aimed dead centre, numbers at the big single.
        Objective::Hit {
            segment,
            multiplier: None,
        } => {
            if segment == BULL {
                ring(BULL, 2)
            } else {
                ring(segment, 1)
            }
        }
        Objective::Score {
            remaining,
            opened,
            in_mode,
            out_mode,
            darts_left,
        } => {
            if !opened {
                match in_mode {
                    InMode::Double => return ring(20, 2),
                    InMode::Master => return ring(20, 3),
                    InMode::Straight => {}
                }
            }
            // Finish within this visit if possible, else set up the next one.
            let finish = checkout_target(remaining, out_mode, darts_left.clamp(1, 3))
                .or_else(|| checkout_target(remaining, out_mode, 3));
            if let Some(finish) = finish {
                return finish;
            }
            scoring_target(profile, rng)
        }
    }
}

fn scoring_target<R: Rng + ?Sized>(profile: &BotProfile, rng: &mut R) -> Score {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut segment = SCORING_NUMBERS[0].0;
    for (number, weight) in SCORING_NUMBERS {
        cumulative += weight;
        if roll < cumulative {
            segment = number;
            break;
        }
    }

    if rng.gen_bool(profile.treble_rate()) {
        ring(segment, 3)
    } else {
        ring(segment, 1)
    }
}

/// Two independent standard normal samples from two uniforms.
pub fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    // gen() is in [0, 1); flip it so ln never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = TAU * u2;
    (r * theta.cos(), r * theta.sin())
}

/// Where a dart aimed at `aim` lands.
pub fn sample_landing<R: Rng + ?Sized>(profile: &BotProfile, aim: Point, rng: &mut R) -> Point {
    let (dx, dy) = box_muller(rng);
    aim.offset(dx * profile.sigma_mm, dy * profile.sigma_mm)
}

/// Result of a dart that failed the hit gate: a neighbouring number, the
/// wrong ring of the right number, or off the board.
fn deliberate_miss<R: Rng + ?Sized>(target: Score, rng: &mut R) -> Score {
    let roll: f64 = rng.gen();
    if target.is_miss() || roll >= 0.85 {
        return Score::miss();
    }

    if target.is_bull() {
        return if target.multiplier() == 2 {
            ring(BULL, 1)
        } else {
            let wedge = SEGMENT_ORDER[rng.gen_range(0..SEGMENT_ORDER.len())];
            ring(wedge, 1)
        };
    }

    if roll < 0.5 {
        let Some((left, right)) = neighbours(target.segment()) else {
            return Score::miss();
        };
        let segment = if rng.gen_bool(0.5) { left } else { right };
        return ring(segment, target.multiplier());
    }

    match target.multiplier() {
        1 => {
            let multiplier = if rng.gen_bool(0.5) { 2 } else { 3 };
            ring(target.segment(), multiplier)
        }
        // Doubles are on the edge of the board; half the misses fall off.
        2 if rng.gen_bool(0.5) => Score::miss(),
        _ => ring(target.segment(), 1),
    }
}

/// Simulate one dart for `objective`, keeping the aim and landing point.
pub fn simulate_dart<R: Rng + ?Sized>(
    profile: &BotProfile,
    objective: &Objective,
    rng: &mut R,
) -> SimulatedDart {
    let target = select_target(profile, objective, rng);

    if profile.deliberate_misses {
        let finishing = matches!(objective, Objective::Score { .. }) && target.is_double();
        let gate = if finishing {
            profile.checkout_skill
        } else {
            profile.consistency
        };
        if !rng.gen_bool(gate.clamp(0.0, 1.0)) {
            return SimulatedDart {
                target,
                landing: None,
                score: deliberate_miss(target, rng),
            };
        }
    }

    let landing = sample_landing(profile, target_to_point(target), rng);
    SimulatedDart {
        target,
        landing: Some(landing),
        score: point_to_score(landing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn score_objective(remaining: u32) -> Objective {
        Objective::Score {
            remaining,
            opened: true,
            in_mode: InMode::Straight,
            out_mode: OutMode::Double,
            darts_left: 3,
        }
    }

    fn std_dev(samples: &[f64]) -> f64 {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        (samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt()
    }

    fn landing_spread(skill: u8) -> (f64, f64, f64) {
        let profile = BotProfile::from_skill(skill);
        let mut rng = StdRng::seed_from_u64(42);
        let aim = target_to_point(Score::triple(20).unwrap());
        let (xs, ys): (Vec<f64>, Vec<f64>) = (0..20_000)
            .map(|_| {
                let p = sample_landing(&profile, aim, &mut rng);
                (p.x - aim.x, p.y - aim.y)
            })
            .unzip();
        (std_dev(&xs), std_dev(&ys), profile.sigma_mm)
    }

    #[test]
    fn test_skill_scale_endpoints() {
        assert_eq!(BotProfile::from_skill(1).sigma_mm, 150.0);
        assert!((BotProfile::from_skill(100).sigma_mm - 5.0).abs() < 1e-9);
        assert_eq!(BotProfile::from_skill(0), BotProfile::from_skill(1));
        assert_eq!(BotProfile::from_skill(255), BotProfile::from_skill(100));
        let mid = BotProfile::from_skill(50).sigma_mm;
        assert!(mid < 150.0 && mid > 5.0);
    }

    #[test]
    fn test_tiers_get_tighter() {
        let sigmas: Vec<f64> = [
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Expert,
        ]
        .iter()
        .map(|d| BotProfile::from_difficulty(*d).sigma_mm)
        .collect();
        assert!(sigmas.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_box_muller_is_standard_normal() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20_000)
            .flat_map(|_| {
                let (a, b) = box_muller(&mut rng);
                [a, b]
            })
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((std_dev(&samples) - 1.0).abs() < 0.03);
    }

    #[test]
    fn test_expert_spread_matches_sigma() {
        let (sx, sy, sigma) = landing_spread(100);
        assert!((sx - sigma).abs() / sigma < 0.05, "x spread {sx}");
        assert!((sy - sigma).abs() / sigma < 0.05, "y spread {sy}");
    }

    #[test]
    fn test_beginner_spread_matches_sigma() {
        let (sx, sy, sigma) = landing_spread(1);
        assert!((sx - sigma).abs() / sigma < 0.05, "x spread {sx}");
        assert!((sy - sigma).abs() / sigma < 0.05, "y spread {sy}");
    }

    #[test]
    fn test_checkout_targets() {
        let profile = BotProfile::default();
        let mut rng = StdRng::seed_from_u64(1);
        let pick = |r: u32, rng: &mut StdRng| select_target(&profile, &score_objective(r), rng);
        assert_eq!(pick(40, &mut rng), Score::double(20).unwrap());
        assert_eq!(pick(32, &mut rng), Score::double(16).unwrap());
        assert_eq!(pick(50, &mut rng), Score::double(BULL).unwrap());
        assert_eq!(pick(170, &mut rng), Score::triple(20).unwrap());
    }

    #[test]
    fn test_checkout_respects_darts_left() {
        let profile = BotProfile::default();
        let mut rng = StdRng::seed_from_u64(2);
        let with_darts = |darts_left| Objective::Score {
            remaining: 101,
            opened: true,
            in_mode: InMode::Straight,
            out_mode: OutMode::Double,
            darts_left,
        };
        // Three darts: T20 S9 D16. Two darts: only T17 Bull finishes.
        assert_eq!(
            select_target(&profile, &with_darts(3), &mut rng),
            Score::triple(20).unwrap()
        );
        assert_eq!(
            select_target(&profile, &with_darts(2), &mut rng),
            Score::triple(17).unwrap()
        );
        // No one-dart finish: set up the next visit instead.
        assert_eq!(
            select_target(&profile, &with_darts(1), &mut rng),
            Score::triple(20).unwrap()
        );
    }

    #[test]
    fn test_scoring_targets_stay_on_the_big_numbers() {
        let profile = BotProfile::from_difficulty(Difficulty::Expert);
        let mut rng = StdRng::seed_from_u64(3);
        let mut trebles = 0;
        for _ in 0..1000 {
            let target = select_target(&profile, &score_objective(501), &mut rng);
            assert!([20, 19, 18, 17].contains(&target.segment()));
            assert!(target.multiplier() != 2);
            if target.is_triple() {
                trebles += 1;
            }
        }
        assert!(trebles > 800, "expert went for {trebles} trebles");
    }

    #[test]
    fn test_opening_targets() {
        let profile = BotProfile::default();
        let mut rng = StdRng::seed_from_u64(5);
        let closed = |in_mode| Objective::Score {
            remaining: 501,
            opened: false,
            in_mode,
            out_mode: OutMode::Double,
            darts_left: 3,
        };
        assert_eq!(
            select_target(&profile, &closed(InMode::Double), &mut rng),
            Score::double(20).unwrap()
        );
        assert_eq!(
            select_target(&profile, &closed(InMode::Master), &mut rng),
            Score::triple(20).unwrap()
        );
    }

    #[test]
    fn test_hit_objectives() {
        let profile = BotProfile::default();
        let mut rng = StdRng::seed_from_u64(9);
        let any_bull = Objective::Hit {
            segment: BULL,
            multiplier: None,
        };
        assert_eq!(select_target(&profile, &any_bull, &mut rng), Score::double(BULL).unwrap());
        let any_seven = Objective::Hit {
            segment: 7,
            multiplier: None,
        };
        assert_eq!(select_target(&profile, &any_seven, &mut rng), Score::single(7).unwrap());
        assert_eq!(
            select_target(&profile, &Objective::hit_treble(19), &mut rng),
            Score::triple(19).unwrap()
        );
        assert_eq!(
            select_target(&profile, &Objective::hit_treble(BULL), &mut rng),
            Score::double(BULL).unwrap()
        );
    }

    #[test]
    fn test_sharp_bot_lands_around_its_target() {
        let profile = BotProfile::from_skill(100);
        let mut rng = StdRng::seed_from_u64(11);
        let objective = Objective::hit_treble(20);
        let mut hits = 0;
        for _ in 0..1000 {
            let dart = simulate_dart(&profile, &objective, &mut rng);
            assert!([20, 1, 5].contains(&dart.score.segment()), "landed on {}", dart.score);
            if dart.score == dart.target {
                hits += 1;
            }
        }
        assert!(hits > 400, "only {hits} trebles");
    }

    #[test]
    fn test_failed_gate_never_hits_target() {
        let profile = BotProfile {
            consistency: 0.0,
            checkout_skill: 0.0,
            deliberate_misses: true,
            ..BotProfile::from_difficulty(Difficulty::Hard)
        };
        let mut rng = StdRng::seed_from_u64(13);
        for objective in [Objective::hit_treble(20), Objective::hit_treble(BULL), score_objective(40)] {
            for _ in 0..200 {
                let dart = simulate_dart(&profile, &objective, &mut rng);
                assert!(dart.landing.is_none());
                assert_ne!(dart.score, dart.target);
            }
        }
    }

    #[test]
    fn test_objective_wire_format() {
        let objective: Objective =
            serde_json::from_str(r#"{"kind":"hit","segment":19,"multiplier":3}"#).unwrap();
        assert_eq!(objective, Objective::hit_treble(19));
        let objective: Objective = serde_json::from_str(r#"{"kind":"score","remaining":81}"#).unwrap();
        assert_eq!(
            objective,
            Objective::Score {
                remaining: 81,
                opened: false,
                in_mode: InMode::Straight,
                out_mode: OutMode::Double,
                darts_left: 3,
            }
        );
    }
}
