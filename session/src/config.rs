//! TOML configuration for a horde session.
//!
//! Every section is optional and falls back to the defaults of the component
//! it configures. Durations are expressed in milliseconds.

use std::time::Duration;

use horde_core::{SpeciesDescriptor, SpeciesId, SpeciesTable, SpeciesTableError};
use horde_system_separation::DEFAULT_STRENGTH;
use horde_system_spawning::Config as SpawningConfig;
use horde_system_wave_director::{CompositionRule, CompositionTable, Config as WaveConfig};
use horde_world::{RegistryConfig, TilePalette, DEFAULT_RELOCATION_RADIUS};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::bestiary;

/// Reasons a configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse horde configuration")]
    Parse(#[from] toml::de::Error),
    /// The species table is inconsistent.
    #[error(transparent)]
    Species(#[from] SpeciesTableError),
    /// A field carries an unusable value.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// Complete configuration of a horde session.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HordeConfig {
    /// Seeds and identifier salt.
    pub session: SessionSection,
    /// Ambient spawn cadence.
    pub spawning: SpawningSection,
    /// Wave timing and composition.
    pub waves: WavesSection,
    /// Local avoidance.
    pub steering: SteeringSection,
    /// Population bookkeeping.
    pub registry: RegistrySection,
    /// Tile classification.
    pub terrain: TerrainSection,
    /// Species templates. The builtin bestiary is used when empty.
    pub species: Vec<SpeciesDescriptor>,
}

/// `[session]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Seed every random stream of the session is derived from.
    pub seed: u64,
    /// Salt mixed into every mob identifier.
    pub salt: u16,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            seed: 0x686f_7264_65,
            salt: 1,
        }
    }
}

/// `[spawning]` section.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawningSection {
    /// Interval at difficulty one.
    pub base_interval_ms: u64,
    /// Interval reduction per difficulty level above one.
    pub interval_step_ms: u64,
    /// Floor of the interval.
    pub min_interval_ms: u64,
    /// Cap at difficulty one.
    pub base_cap: u32,
    /// Cap increase per difficulty level above one.
    pub cap_per_level: u32,
    /// Ceiling of the cap.
    pub max_cap: u32,
    /// Inner radius of the spawn annulus.
    pub min_distance: f32,
    /// Outer radius of the spawn annulus.
    pub max_distance: f32,
    /// Rejection-sampling attempts per spawn.
    pub max_attempts: u32,
}

impl Default for SpawningSection {
    fn default() -> Self {
        let defaults = SpawningConfig::default();
        Self {
            base_interval_ms: millis(defaults.base_interval),
            interval_step_ms: millis(defaults.interval_step),
            min_interval_ms: millis(defaults.min_interval),
            base_cap: defaults.base_cap,
            cap_per_level: defaults.cap_per_level,
            max_cap: defaults.max_cap,
            min_distance: defaults.min_distance,
            max_distance: defaults.max_distance,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// `[waves]` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WavesSection {
    /// Time between consecutive wave starts.
    pub interval_ms: u64,
    /// Delay between consecutive members of a wave.
    pub stagger_ms: u64,
    /// Inner radius of the spawn annulus.
    pub min_distance: f32,
    /// Outer radius of the spawn annulus.
    pub max_distance: f32,
    /// Rejection-sampling attempts per member.
    pub max_attempts: u32,
    /// Upper bound on members per wave.
    pub max_composition: u32,
    /// `[waves.normal]`.
    pub normal: CompositionSection,
    /// `[waves.swarm]`.
    pub swarm: CompositionSection,
    /// `[waves.elite]`.
    pub elite: CompositionSection,
    /// `[waves.mixed]`.
    pub mixed: CompositionSection,
    /// `[waves.boss]`.
    pub boss: CompositionSection,
}

impl Default for WavesSection {
    fn default() -> Self {
        let defaults = WaveConfig::default();
        let table = &defaults.compositions;
        Self {
            interval_ms: millis(defaults.wave_interval),
            stagger_ms: millis(defaults.stagger_step),
            min_distance: defaults.min_distance,
            max_distance: defaults.max_distance,
            max_attempts: defaults.max_attempts,
            max_composition: defaults.max_composition,
            normal: CompositionSection::from(&table.normal),
            swarm: CompositionSection::from(&table.swarm),
            elite: CompositionSection::from(&table.elite),
            mixed: CompositionSection::from(&table.mixed),
            boss: CompositionSection::from(&table.boss),
        }
    }
}

/// Sizing coefficients and allow-list of one wave type.
///
/// Omitted fields take the value of the wave type's builtin rule rather than
/// zero, so `[waves.boss] allow_list = [5]` keeps the boss sizing intact.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositionSection {
    /// Members before any scaling.
    pub base: Option<f32>,
    /// Additional members per wave number.
    pub per_wave: Option<f32>,
    /// Additional members per difficulty level.
    pub per_difficulty: Option<f32>,
    /// Species the wave may draw from. Empty allows every eligible species.
    pub allow_list: Vec<SpeciesId>,
}

impl From<&CompositionRule> for CompositionSection {
    fn from(rule: &CompositionRule) -> Self {
        Self {
            base: Some(rule.base),
            per_wave: Some(rule.per_wave),
            per_difficulty: Some(rule.per_difficulty),
            allow_list: rule.allow_list.clone(),
        }
    }
}

impl CompositionSection {
    fn resolve(&self, fallback: &CompositionRule) -> CompositionRule {
        CompositionRule::new(
            self.base.unwrap_or(fallback.base),
            self.per_wave.unwrap_or(fallback.per_wave),
            self.per_difficulty.unwrap_or(fallback.per_difficulty),
        )
        .with_allow_list(self.allow_list.clone())
    }
}

/// `[steering]` section.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteeringSection {
    /// Push strength in world units per second.
    pub strength: f32,
    /// Bucket size of the neighbor search. Must cover the largest radius.
    pub cell_size: f32,
}

impl Default for SteeringSection {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            cell_size: 48.0,
        }
    }
}

/// `[registry]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    /// Hard ceiling on live mobs from every source.
    pub population_cap: u32,
    /// Ring radius, in tiles, searched when relocating stranded mobs.
    pub relocation_radius: u32,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            population_cap: 300,
            relocation_radius: DEFAULT_RELOCATION_RADIUS,
        }
    }
}

/// `[terrain]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainSection {
    /// Tile indices that block movement.
    pub blocked_tiles: Vec<u32>,
}

impl Default for TerrainSection {
    fn default() -> Self {
        Self {
            blocked_tiles: vec![1],
        }
    }
}

impl HordeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spawning = &self.spawning;
        if spawning.base_interval_ms == 0 {
            return Err(invalid("spawning.base_interval_ms", "must be non-zero"));
        }
        if spawning.min_interval_ms == 0 {
            return Err(invalid("spawning.min_interval_ms", "must be non-zero"));
        }
        check_annulus(
            "spawning.min_distance",
            spawning.min_distance,
            spawning.max_distance,
        )?;
        if spawning.max_attempts == 0 {
            return Err(invalid("spawning.max_attempts", "must be non-zero"));
        }

        let waves = &self.waves;
        if waves.interval_ms == 0 {
            return Err(invalid("waves.interval_ms", "must be non-zero"));
        }
        check_annulus("waves.min_distance", waves.min_distance, waves.max_distance)?;
        if waves.max_attempts == 0 {
            return Err(invalid("waves.max_attempts", "must be non-zero"));
        }
        for (field, section) in [
            ("waves.normal", &waves.normal),
            ("waves.swarm", &waves.swarm),
            ("waves.elite", &waves.elite),
            ("waves.mixed", &waves.mixed),
            ("waves.boss", &waves.boss),
        ] {
            for coefficient in [section.base, section.per_wave, section.per_difficulty]
                .into_iter()
                .flatten()
            {
                if !(coefficient.is_finite() && coefficient >= 0.0) {
                    return Err(invalid(
                        field,
                        format!("coefficients must be non-negative, got {coefficient}"),
                    ));
                }
            }
        }

        if !(self.steering.strength.is_finite() && self.steering.strength >= 0.0) {
            return Err(invalid(
                "steering.strength",
                format!("must be non-negative, got {}", self.steering.strength),
            ));
        }
        if !(self.steering.cell_size.is_finite() && self.steering.cell_size > 0.0) {
            return Err(invalid(
                "steering.cell_size",
                format!("must be positive, got {}", self.steering.cell_size),
            ));
        }

        if self.registry.population_cap == 0 {
            return Err(invalid("registry.population_cap", "must be non-zero"));
        }

        let species = self.species_table()?;
        let widest = species
            .iter()
            .map(|definition| definition.separation_radius)
            .fold(0.0_f32, f32::max);
        if self.steering.cell_size < widest {
            return Err(invalid(
                "steering.cell_size",
                format!(
                    "{} is smaller than the widest separation radius {widest}",
                    self.steering.cell_size
                ),
            ));
        }
        Ok(())
    }

    /// Validated species table, falling back to the builtin bestiary.
    pub fn species_table(&self) -> Result<SpeciesTable, ConfigError> {
        let definitions = if self.species.is_empty() {
            bestiary::builtin()
        } else {
            self.species.clone()
        };
        Ok(SpeciesTable::new(definitions)?)
    }

    /// Scheduler configuration derived from `[spawning]`.
    #[must_use]
    pub fn spawning_config(&self) -> SpawningConfig {
        let section = &self.spawning;
        SpawningConfig {
            base_interval: Duration::from_millis(section.base_interval_ms),
            interval_step: Duration::from_millis(section.interval_step_ms),
            min_interval: Duration::from_millis(section.min_interval_ms),
            base_cap: section.base_cap,
            cap_per_level: section.cap_per_level,
            max_cap: section.max_cap,
            min_distance: section.min_distance,
            max_distance: section.max_distance,
            max_attempts: section.max_attempts,
            rng_seed: self.derive_seed("spawning"),
        }
    }

    /// Wave director configuration derived from `[waves]`.
    #[must_use]
    pub fn wave_config(&self) -> WaveConfig {
        let section = &self.waves;
        let builtin = CompositionTable::default();
        WaveConfig {
            wave_interval: Duration::from_millis(section.interval_ms),
            stagger_step: Duration::from_millis(section.stagger_ms),
            min_distance: section.min_distance,
            max_distance: section.max_distance,
            max_attempts: section.max_attempts,
            max_composition: section.max_composition,
            compositions: CompositionTable {
                normal: section.normal.resolve(&builtin.normal),
                swarm: section.swarm.resolve(&builtin.swarm),
                elite: section.elite.resolve(&builtin.elite),
                mixed: section.mixed.resolve(&builtin.mixed),
                boss: section.boss.resolve(&builtin.boss),
            },
            seed: self.derive_seed("waves"),
        }
    }

    /// Registry configuration derived from `[session]` and `[registry]`.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(
            self.session.salt,
            self.registry.population_cap,
            self.derive_seed("registry"),
        )
        .with_relocation_radius(self.registry.relocation_radius)
    }

    /// Steering configuration derived from `[steering]`.
    #[must_use]
    pub fn steering_config(&self) -> horde_system_separation::Config {
        horde_system_separation::Config::new(self.steering.strength)
    }

    /// Tile palette derived from `[terrain]`.
    #[must_use]
    pub fn palette(&self) -> TilePalette {
        TilePalette::with_blocked(self.terrain.blocked_tiles.iter().copied())
    }

    /// Derives an independent seed for one random stream of the session.
    #[must_use]
    pub fn derive_seed(&self, label: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.session.seed.to_le_bytes());
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[0..8]);
        u64::from_le_bytes(bytes)
    }
}

fn check_annulus(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite()) || min < 0.0 || max < min {
        return Err(invalid(
            field,
            format!("spawn annulus [{min}, {max}] is not a non-negative range"),
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
