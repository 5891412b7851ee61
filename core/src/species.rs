//! Static species templates and the weighted spawn pool built from them.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SpeciesId;

const DEFAULT_SEPARATION_RADIUS: f32 = 24.0;

/// Composable behavior attached to every instance of a species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityTag {
    /// Fires projectiles at the player while within range.
    RangedAttack {
        /// Maximum distance at which the mob opens fire.
        range: f32,
        /// Delay between consecutive shots in milliseconds.
        cooldown_ms: u32,
        /// Projectile velocity in world units per second.
        projectile_speed: f32,
    },
    /// Detonates when the mob dies.
    DeathExplosion {
        /// Blast radius in world units.
        radius: f32,
        /// Damage dealt at the center of the blast.
        damage: u32,
    },
}

impl AbilityTag {
    /// Stable lowercase label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RangedAttack { .. } => "ranged_attack",
            Self::DeathExplosion { .. } => "death_explosion",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            Self::RangedAttack {
                range,
                cooldown_ms,
                projectile_speed,
            } => {
                if !(range.is_finite() && range > 0.0) {
                    return Err(format!("ranged attack range must be positive, got {range}"));
                }
                if cooldown_ms == 0 {
                    return Err("ranged attack cooldown must be non-zero".to_owned());
                }
                if !(projectile_speed.is_finite() && projectile_speed > 0.0) {
                    return Err(format!(
                        "projectile speed must be positive, got {projectile_speed}"
                    ));
                }
            }
            Self::DeathExplosion { radius, .. } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(format!("explosion radius must be positive, got {radius}"));
                }
            }
        }
        Ok(())
    }

    /// Cooldown of a ranged attack, or `None` for other tags.
    #[must_use]
    pub fn cooldown(&self) -> Option<Duration> {
        match self {
            Self::RangedAttack { cooldown_ms, .. } => {
                Some(Duration::from_millis(u64::from(*cooldown_ms)))
            }
            Self::DeathExplosion { .. } => None,
        }
    }
}

/// Integer stat block used both for species baselines and scaled instances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MobStats {
    /// Hit points.
    pub health: u32,
    /// Damage dealt per hit or projectile.
    pub damage: u32,
    /// Movement speed in world units per second.
    pub speed: u32,
    /// Experience awarded on a successful drop.
    pub exp: u32,
    /// Gold awarded on a successful drop.
    pub gold: u32,
}

/// Static template describing a category of hostile agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDescriptor {
    /// Unique identifier of the species.
    pub id: SpeciesId,
    /// Human readable name used in logs.
    #[serde(default)]
    pub name: String,
    /// Health before scaling.
    pub base_health: u32,
    /// Damage before scaling.
    pub base_damage: u32,
    /// Speed before scaling.
    pub base_speed: u32,
    /// Experience value before scaling.
    pub exp_value: u32,
    /// Gold value before scaling.
    pub gold_value: u32,
    /// Relative frequency inside the weighted spawn pool.
    pub spawn_weight: u32,
    /// Minimum eligibility level required before the species may spawn.
    #[serde(default)]
    pub min_wave_gate: u32,
    /// Probability in `[0, 1]` that a kill grants experience.
    #[serde(default = "default_exp_drop_chance")]
    pub exp_drop_chance: f32,
    /// Probability in `[0, 1]` that a kill grants gold.
    #[serde(default)]
    pub gold_drop_chance: f32,
    /// Abilities bound to every instance.
    #[serde(default)]
    pub ability_tags: Vec<AbilityTag>,
    /// Distance below which neighbors are pushed apart.
    #[serde(default = "default_separation_radius")]
    pub separation_radius: f32,
}

fn default_exp_drop_chance() -> f32 {
    1.0
}

fn default_separation_radius() -> f32 {
    DEFAULT_SEPARATION_RADIUS
}

impl SpeciesDescriptor {
    /// Unscaled stat block of the species.
    #[must_use]
    pub const fn base_stats(&self) -> MobStats {
        MobStats {
            health: self.base_health,
            damage: self.base_damage,
            speed: self.base_speed,
            exp: self.exp_value,
            gold: self.gold_value,
        }
    }

    /// Reports whether the species may spawn at the provided eligibility level.
    #[must_use]
    pub const fn is_eligible(&self, level: u32) -> bool {
        level >= self.min_wave_gate
    }

    fn validate(&self) -> Result<(), SpeciesTableError> {
        let invalid = |reason: String| SpeciesTableError::InvalidSpecies {
            species: self.id,
            reason,
        };

        for (label, chance) in [
            ("exp_drop_chance", self.exp_drop_chance),
            ("gold_drop_chance", self.gold_drop_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(invalid(format!("{label} must lie in [0, 1], got {chance}")));
            }
        }

        if !(self.separation_radius.is_finite() && self.separation_radius >= 0.0) {
            return Err(invalid(format!(
                "separation_radius must be non-negative, got {}",
                self.separation_radius
            )));
        }

        for tag in &self.ability_tags {
            tag.validate().map_err(|reason| invalid(reason))?;
        }

        Ok(())
    }
}

/// Reasons a species table may be rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SpeciesTableError {
    /// Two descriptors share the same identifier.
    #[error("species id {0:?} is declared more than once")]
    DuplicateSpecies(SpeciesId),
    /// A descriptor carries out-of-range values.
    #[error("species {species:?} is invalid: {reason}")]
    InvalidSpecies {
        /// Offending species.
        species: SpeciesId,
        /// Human readable explanation.
        reason: String,
    },
}

/// Validated, id-ordered collection of species descriptors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeciesTable {
    definitions: Vec<SpeciesDescriptor>,
}

impl SpeciesTable {
    /// Validates the descriptors and orders them by identifier.
    pub fn new(mut definitions: Vec<SpeciesDescriptor>) -> Result<Self, SpeciesTableError> {
        definitions.sort_by_key(|definition| definition.id);
        for pair in definitions.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(SpeciesTableError::DuplicateSpecies(pair[0].id));
            }
        }
        for definition in &definitions {
            definition.validate()?;
        }
        Ok(Self { definitions })
    }

    /// Looks up a descriptor by identifier.
    #[must_use]
    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesDescriptor> {
        self.definitions
            .binary_search_by_key(&id, |definition| definition.id)
            .ok()
            .map(|index| &self.definitions[index])
    }

    /// Iterator over the descriptors in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &SpeciesDescriptor> {
        self.definitions.iter()
    }

    /// Descriptors eligible at the provided level, in identifier order.
    pub fn eligible(&self, level: u32) -> impl Iterator<Item = &SpeciesDescriptor> {
        self.definitions
            .iter()
            .filter(move |definition| definition.is_eligible(level))
    }

    /// Number of descriptors in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Reports whether the table holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Flat draw pool where each eligible species appears `spawn_weight` times.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpeciesPool {
    entries: Vec<SpeciesId>,
}

impl SpeciesPool {
    /// Builds the weighted pool from the species eligible at `level`.
    #[must_use]
    pub fn weighted<'a, I>(species: I, level: u32) -> Self
    where
        I: IntoIterator<Item = &'a SpeciesDescriptor>,
    {
        let mut entries = Vec::new();
        for definition in species {
            if !definition.is_eligible(level) {
                continue;
            }
            let repeats = usize::try_from(definition.spawn_weight).unwrap_or(0);
            entries.extend(std::iter::repeat(definition.id).take(repeats));
        }
        Self { entries }
    }

    /// Draws a species uniformly from the pool.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<SpeciesId> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        Some(self.entries[index])
    }

    /// Number of slots in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing can be drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether the species occupies at least one slot.
    #[must_use]
    pub fn contains(&self, species: SpeciesId) -> bool {
        self.entries.contains(&species)
    }
}
