#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure stat scaling from species baselines to concrete instance stats.
//!
//! Scaling is additive per factor rather than compounded across waves, which
//! keeps late-game growth linear:
//!
//! ```text
//! health = base * (1 + (difficulty - 1) * 0.2 + wave * 0.1)
//! damage = base * (1 + (difficulty - 1) * 0.1 + wave * 0.05)
//! speed  = base * (1 + (difficulty - 1) * 0.05)
//! reward = base * (1 + wave * 0.1)
//! ```
//!
//! Every output is floored to an integer. Elite and boss waves layer a fixed
//! multiplier on top through [`apply_composition`], applied once per spawn.

use horde_core::{DifficultyLevel, MobStats, SpecialWaveType, WaveNumber};

const HEALTH_PER_DIFFICULTY: f64 = 0.2;
const HEALTH_PER_WAVE: f64 = 0.1;
const DAMAGE_PER_DIFFICULTY: f64 = 0.1;
const DAMAGE_PER_WAVE: f64 = 0.05;
const SPEED_PER_DIFFICULTY: f64 = 0.05;
const REWARD_PER_WAVE: f64 = 0.1;

/// Fixed multipliers layered on top of the baseline scaling for a wave type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositionMultiplier {
    /// Factor applied to health.
    pub health: f64,
    /// Factor applied to damage.
    pub damage: f64,
    /// Factor applied to experience and gold.
    pub reward: f64,
}

impl CompositionMultiplier {
    /// Multiplier that leaves stats untouched.
    pub const IDENTITY: Self = Self {
        health: 1.0,
        damage: 1.0,
        reward: 1.0,
    };
}

/// Scale factors derived from difficulty and wave before flooring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    /// Health factor.
    pub health: f64,
    /// Damage factor.
    pub damage: f64,
    /// Speed factor.
    pub speed: f64,
    /// Experience and gold factor.
    pub reward: f64,
}

/// Computes the additive scale factors for a difficulty and wave.
#[must_use]
pub fn scale_factors(difficulty: DifficultyLevel, wave: WaveNumber) -> ScaleFactors {
    let difficulty_steps = f64::from(difficulty.get().saturating_sub(1));
    let wave = f64::from(wave.get());

    ScaleFactors {
        health: 1.0 + difficulty_steps * HEALTH_PER_DIFFICULTY + wave * HEALTH_PER_WAVE,
        damage: 1.0 + difficulty_steps * DAMAGE_PER_DIFFICULTY + wave * DAMAGE_PER_WAVE,
        speed: 1.0 + difficulty_steps * SPEED_PER_DIFFICULTY,
        reward: 1.0 + wave * REWARD_PER_WAVE,
    }
}

/// Scales a species baseline into concrete instance stats.
///
/// Health never drops below one so that a freshly spawned mob is alive.
#[must_use]
pub fn compute(base: MobStats, difficulty: DifficultyLevel, wave: WaveNumber) -> MobStats {
    let factors = scale_factors(difficulty, wave);
    MobStats {
        health: scale(base.health, factors.health).max(1),
        damage: scale(base.damage, factors.damage),
        speed: scale(base.speed, factors.speed),
        exp: scale(base.exp, factors.reward),
        gold: scale(base.gold, factors.reward),
    }
}

/// Multiplier associated with a wave composition.
///
/// Elite doubles health, adds half again to damage and doubles rewards; boss
/// triples health, doubles damage and quintuples rewards. Other compositions
/// return [`CompositionMultiplier::IDENTITY`].
#[must_use]
pub const fn composition_multiplier(special: SpecialWaveType) -> CompositionMultiplier {
    match special {
        SpecialWaveType::Elite => CompositionMultiplier {
            health: 2.0,
            damage: 1.5,
            reward: 2.0,
        },
        SpecialWaveType::Boss => CompositionMultiplier {
            health: 3.0,
            damage: 2.0,
            reward: 5.0,
        },
        SpecialWaveType::None | SpecialWaveType::Swarm | SpecialWaveType::Mixed => {
            CompositionMultiplier::IDENTITY
        }
    }
}

/// Layers the composition multiplier of `special` on top of scaled stats.
///
/// Callers apply this exactly once, at spawn time.
#[must_use]
pub fn apply_composition(stats: MobStats, special: SpecialWaveType) -> MobStats {
    let multiplier = composition_multiplier(special);
    if multiplier == CompositionMultiplier::IDENTITY {
        return stats;
    }

    MobStats {
        health: scale(stats.health, multiplier.health).max(1),
        damage: scale(stats.damage, multiplier.damage),
        speed: stats.speed,
        exp: scale(stats.exp, multiplier.reward),
        gold: scale(stats.gold, multiplier.reward),
    }
}

fn scale(value: u32, factor: f64) -> u32 {
    let scaled = (f64::from(value) * factor).floor();
    if scaled <= 0.0 {
        return 0;
    }
    scaled.min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MobStats {
        MobStats {
            health: 100,
            damage: 10,
            speed: 80,
            exp: 5,
            gold: 3,
        }
    }

    #[test]
    fn baseline_at_entry_difficulty_and_wave_zero() {
        let stats = compute(base(), DifficultyLevel::BASELINE, WaveNumber::new(0));
        assert_eq!(stats, base());
    }

    #[test]
    fn scaling_matches_reference_values() {
        let stats = compute(base(), DifficultyLevel::new(3), WaveNumber::new(4));
        assert_eq!(
            stats,
            MobStats {
                health: 180,
                damage: 14,
                speed: 88,
                exp: 7,
                gold: 4,
            }
        );
    }

    #[test]
    fn scaling_is_additive_not_compounded() {
        let wave_ten = compute(base(), DifficultyLevel::BASELINE, WaveNumber::new(10));
        let wave_twenty = compute(base(), DifficultyLevel::BASELINE, WaveNumber::new(20));
        assert_eq!(wave_ten.health, 200);
        assert_eq!(wave_twenty.health, 300);
    }

    #[test]
    fn outputs_are_floored() {
        let stats = compute(
            MobStats {
                health: 7,
                damage: 3,
                speed: 9,
                exp: 3,
                gold: 1,
            },
            DifficultyLevel::new(2),
            WaveNumber::new(1),
        );
        assert_eq!(stats.health, 9);
        assert_eq!(stats.damage, 3);
        assert_eq!(stats.speed, 9);
        assert_eq!(stats.exp, 3);
        assert_eq!(stats.gold, 1);
    }

    #[test]
    fn zero_health_baseline_still_spawns_alive() {
        let stats = compute(MobStats::default(), DifficultyLevel::BASELINE, WaveNumber::new(0));
        assert_eq!(stats.health, 1);
    }

    #[test]
    fn elite_and_boss_layer_fixed_multipliers() {
        let elite = apply_composition(base(), SpecialWaveType::Elite);
        assert_eq!(
            elite,
            MobStats {
                health: 200,
                damage: 15,
                speed: 80,
                exp: 10,
                gold: 6,
            }
        );

        let boss = apply_composition(base(), SpecialWaveType::Boss);
        assert_eq!(
            boss,
            MobStats {
                health: 300,
                damage: 20,
                speed: 80,
                exp: 25,
                gold: 15,
            }
        );
    }

    #[test]
    fn other_compositions_leave_stats_untouched() {
        for special in [
            SpecialWaveType::None,
            SpecialWaveType::Swarm,
            SpecialWaveType::Mixed,
        ] {
            assert_eq!(apply_composition(base(), special), base());
        }
    }

    #[test]
    fn compute_is_monotonic_in_difficulty_and_wave() {
        let bases = [
            base(),
            MobStats {
                health: 1,
                damage: 1,
                speed: 1,
                exp: 1,
                gold: 1,
            },
            MobStats {
                health: 1_337,
                damage: 97,
                speed: 333,
                exp: 41,
                gold: 13,
            },
        ];

        for base in bases {
            for difficulty in 1..=30 {
                for wave in 0..=60 {
                    let here = compute(base, DifficultyLevel::new(difficulty), WaveNumber::new(wave));
                    let harder = compute(
                        base,
                        DifficultyLevel::new(difficulty + 1),
                        WaveNumber::new(wave),
                    );
                    let later = compute(
                        base,
                        DifficultyLevel::new(difficulty),
                        WaveNumber::new(wave + 1),
                    );

                    for next in [harder, later] {
                        assert!(next.health >= here.health);
                        assert!(next.damage >= here.damage);
                        assert!(next.speed >= here.speed);
                    }
                }
            }
        }
    }
}
