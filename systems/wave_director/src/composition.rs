//! Wave classification, composition sizing and completion rewards.

use horde_core::{DifficultyLevel, SpecialWaveType, SpeciesId, WaveNumber};

/// Sizing rule and species allow-list for one wave type.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionRule {
    /// Members before any scaling.
    pub base: f32,
    /// Additional members per wave number.
    pub per_wave: f32,
    /// Additional members per difficulty level.
    pub per_difficulty: f32,
    /// Species the wave may draw from. Empty means any eligible species.
    pub allow_list: Vec<SpeciesId>,
}

impl CompositionRule {
    /// Creates a rule without an allow-list.
    #[must_use]
    pub const fn new(base: f32, per_wave: f32, per_difficulty: f32) -> Self {
        Self {
            base,
            per_wave,
            per_difficulty,
            allow_list: Vec::new(),
        }
    }

    /// Restricts the rule to the provided species.
    #[must_use]
    pub fn with_allow_list(mut self, allow_list: Vec<SpeciesId>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// `floor(base + wave * per_wave + difficulty * per_difficulty)`, clamped to
    /// `[0, max]`.
    #[must_use]
    pub fn size(&self, wave: WaveNumber, difficulty: DifficultyLevel, max: u32) -> u32 {
        let raw = f64::from(self.base)
            + f64::from(wave.get()) * f64::from(self.per_wave)
            + f64::from(difficulty.get()) * f64::from(self.per_difficulty);
        let floored = raw.floor();
        if !floored.is_finite() || floored <= 0.0 {
            return 0;
        }
        floored.min(f64::from(max)) as u32
    }
}

/// Composition rule for every wave type.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionTable {
    /// Rule for regular waves.
    pub normal: CompositionRule,
    /// Rule for swarm waves.
    pub swarm: CompositionRule,
    /// Rule for elite waves.
    pub elite: CompositionRule,
    /// Rule for mixed waves.
    pub mixed: CompositionRule,
    /// Rule for boss waves.
    pub boss: CompositionRule,
}

impl CompositionTable {
    /// Rule applied to waves of the provided type.
    #[must_use]
    pub fn rule(&self, special: SpecialWaveType) -> &CompositionRule {
        match special {
            SpecialWaveType::None => &self.normal,
            SpecialWaveType::Swarm => &self.swarm,
            SpecialWaveType::Elite => &self.elite,
            SpecialWaveType::Mixed => &self.mixed,
            SpecialWaveType::Boss => &self.boss,
        }
    }
}

impl Default for CompositionTable {
    fn default() -> Self {
        Self {
            normal: CompositionRule::new(5.0, 1.0, 1.0),
            swarm: CompositionRule::new(15.0, 2.0, 2.0),
            elite: CompositionRule::new(2.0, 0.3, 0.5),
            mixed: CompositionRule::new(8.0, 1.5, 1.0),
            boss: CompositionRule::new(1.0, 0.1, 0.0),
        }
    }
}

/// Classifies a wave number.
///
/// Precedence is boss (multiples of 10), elite (7), swarm (5), mixed (8).
/// Wave zero is a regular wave.
#[must_use]
pub const fn special_type_for(wave: WaveNumber) -> SpecialWaveType {
    let n = wave.get();
    if n == 0 {
        SpecialWaveType::None
    } else if n % 10 == 0 {
        SpecialWaveType::Boss
    } else if n % 7 == 0 {
        SpecialWaveType::Elite
    } else if n % 5 == 0 {
        SpecialWaveType::Swarm
    } else if n % 8 == 0 {
        SpecialWaveType::Mixed
    } else {
        SpecialWaveType::None
    }
}

/// Reward multiplier paid on completion of a wave of the provided type.
#[must_use]
pub const fn completion_multiplier(special: SpecialWaveType) -> f64 {
    match special {
        SpecialWaveType::None => 1.0,
        SpecialWaveType::Swarm => 1.5,
        SpecialWaveType::Mixed => 1.8,
        SpecialWaveType::Elite => 2.0,
        SpecialWaveType::Boss => 3.0,
    }
}

/// Experience and gold granted for completing a wave.
#[must_use]
pub fn completion_bonus(wave: WaveNumber, special: SpecialWaveType) -> (u32, u32) {
    let multiplier = completion_multiplier(special);
    let n = f64::from(wave.get());
    (
        to_reward(n * 100.0 * multiplier),
        to_reward(n * 50.0 * multiplier),
    )
}

fn to_reward(value: f64) -> u32 {
    value.floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_resolves_overlapping_moduli() {
        let expectations = [
            (10, SpecialWaveType::Boss),
            (7, SpecialWaveType::Elite),
            (5, SpecialWaveType::Swarm),
            (35, SpecialWaveType::Elite),
            (8, SpecialWaveType::Mixed),
            (40, SpecialWaveType::Boss),
            (56, SpecialWaveType::Elite),
            (70, SpecialWaveType::Boss),
            (0, SpecialWaveType::None),
            (4, SpecialWaveType::None),
        ];
        for (wave, expected) in expectations {
            assert_eq!(special_type_for(WaveNumber::new(wave)), expected, "wave {wave}");
        }
    }

    #[test]
    fn normal_wave_four_pays_reference_bonus() {
        assert_eq!(
            completion_bonus(WaveNumber::new(4), SpecialWaveType::None),
            (400, 200)
        );
    }

    #[test]
    fn bonuses_scale_with_type_multiplier() {
        assert_eq!(
            completion_bonus(WaveNumber::new(5), SpecialWaveType::Swarm),
            (750, 375)
        );
        assert_eq!(
            completion_bonus(WaveNumber::new(8), SpecialWaveType::Mixed),
            (1_440, 720)
        );
        assert_eq!(
            completion_bonus(WaveNumber::new(7), SpecialWaveType::Elite),
            (1_400, 700)
        );
        assert_eq!(
            completion_bonus(WaveNumber::new(10), SpecialWaveType::Boss),
            (3_000, 1_500)
        );
    }

    #[test]
    fn default_sizes_follow_coefficients() {
        let table = CompositionTable::default();
        let difficulty = DifficultyLevel::new(2);
        assert_eq!(table.normal.size(WaveNumber::new(4), difficulty, 500), 11);
        assert_eq!(table.swarm.size(WaveNumber::new(5), difficulty, 500), 29);
        assert_eq!(table.elite.size(WaveNumber::new(7), difficulty, 500), 5);
        assert_eq!(table.mixed.size(WaveNumber::new(8), difficulty, 500), 22);
        assert_eq!(table.boss.size(WaveNumber::new(10), difficulty, 500), 2);
    }

    #[test]
    fn size_is_clamped_to_maximum() {
        let rule = CompositionRule::new(15.0, 2.0, 2.0);
        assert_eq!(rule.size(WaveNumber::new(400), DifficultyLevel::new(9), 60), 60);
        assert_eq!(
            CompositionRule::new(-4.0, 0.0, 0.0).size(WaveNumber::new(1), DifficultyLevel::BASELINE, 60),
            0
        );
    }
}
