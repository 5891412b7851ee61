#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mob bookkeeping and terrain state for the horde director.
//!
//! [`MobRegistry`] owns every live [`Mob`] and is the only place entries are
//! created or removed. [`WalkabilityGrid`] answers terrain questions for the
//! spawn pipeline and for relocation during [`MobRegistry::tick`].

mod hooks;
mod mob;
mod neighbors;
mod walkability;

use std::{collections::BTreeMap, fmt, time::Duration};

use horde_core::{Collaborators, Event, MobId, NeighborView, SpeciesId, SteeringSnapshot, Vec2};
use horde_system_abilities::Projectiles;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

pub use hooks::{
    default_chain, AbilityDeathEffects, DeathContext, DeathHook, KillLedger, RewardDrop,
    SpeciesKillCounter, TotalKillCounter,
};
pub use mob::{Mob, MobBlueprint, ATTACK_WIND_DOWN, CONTACT_DISTANCE};
pub use walkability::{GridError, TilePalette, WalkabilityGrid, MAX_WALKABLE_SAMPLES};

/// Ring radius, in tiles, searched when relocating a stranded mob.
pub const DEFAULT_RELOCATION_RADIUS: u32 = 8;

/// Reasons the registry refuses to track a mob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The live population already equals the cap.
    #[error("population cap of {cap} reached")]
    AtCapacity {
        /// Cap in effect when the request was refused.
        cap: u32,
    },
    /// Every serial representable in a [`MobId`] has been handed out.
    #[error("mob id serial space exhausted")]
    IdSpaceExhausted,
}

/// Configuration parameters required to construct the registry.
#[derive(Clone, Copy, Debug)]
pub struct RegistryConfig {
    salt: u16,
    population_cap: u32,
    rng_seed: u64,
    relocation_radius: u32,
}

impl RegistryConfig {
    /// Creates a configuration with the default relocation radius.
    #[must_use]
    pub const fn new(salt: u16, population_cap: u32, rng_seed: u64) -> Self {
        Self {
            salt,
            population_cap,
            rng_seed,
            relocation_radius: DEFAULT_RELOCATION_RADIUS,
        }
    }

    /// Overrides the relocation search radius in tiles.
    #[must_use]
    pub const fn with_relocation_radius(mut self, radius: u32) -> Self {
        self.relocation_radius = radius;
        self
    }
}

/// Bookkeeping record stored for every live mob.
///
/// An entry exists only while its mob is alive.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub(crate) mob: Mob,
    pub(crate) species: SpeciesId,
    pub(crate) spawned_at: Duration,
}

impl RegistryEntry {
    /// Tracked mob.
    #[must_use]
    pub fn mob(&self) -> &Mob {
        &self.mob
    }

    /// Species of the tracked mob.
    #[must_use]
    pub const fn species(&self) -> SpeciesId {
        self.species
    }

    /// Session time at which the mob was tracked.
    #[must_use]
    pub const fn spawned_at(&self) -> Duration {
        self.spawned_at
    }
}

/// Authoritative table of live mobs.
pub struct MobRegistry {
    salt: u16,
    next_serial: u64,
    population_cap: u32,
    relocation_radius: u32,
    entries: BTreeMap<MobId, RegistryEntry>,
    ledger: KillLedger,
    hooks: Vec<Box<dyn DeathHook>>,
    rng: ChaCha8Rng,
    snapshot: Vec<MobId>,
}

impl MobRegistry {
    /// Creates an empty registry with the standard death hook chain.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            salt: config.salt,
            next_serial: 1,
            population_cap: config.population_cap,
            relocation_radius: config.relocation_radius,
            entries: BTreeMap::new(),
            ledger: KillLedger::default(),
            hooks: default_chain(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            snapshot: Vec::new(),
        }
    }

    /// Appends a hook that runs after every hook already installed.
    pub fn push_death_hook(&mut self, hook: Box<dyn DeathHook>) {
        self.hooks.push(hook);
    }

    /// Maximum number of simultaneously live mobs.
    #[must_use]
    pub const fn population_cap(&self) -> u32 {
        self.population_cap
    }

    /// Replaces the population cap. Mobs above a lowered cap are kept.
    pub fn set_population_cap(&mut self, cap: u32) {
        self.population_cap = cap;
    }

    /// Lifetime counters.
    #[must_use]
    pub fn ledger(&self) -> &KillLedger {
        &self.ledger
    }

    /// Looks up a live mob.
    #[must_use]
    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.entries.get(&id).map(|entry| &entry.mob)
    }

    /// Reports whether the id refers to a live mob.
    #[must_use]
    pub fn is_alive(&self, id: MobId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterator over live entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (MobId, &RegistryEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Assigns an id to the mob and starts tracking it.
    ///
    /// Emits [`Event::MobSpawned`] on success.
    pub fn track(
        &mut self,
        blueprint: MobBlueprint,
        spawned_at: Duration,
        out: &mut Vec<Event>,
    ) -> Result<MobId, TrackError> {
        if self.entries.len() >= self.population_cap as usize {
            return Err(TrackError::AtCapacity {
                cap: self.population_cap,
            });
        }
        let id =
            MobId::compose(self.salt, self.next_serial).ok_or(TrackError::IdSpaceExhausted)?;
        self.next_serial += 1;

        let mob = Mob::from_blueprint(blueprint);
        let species = mob.species();
        let wave = mob.wave();
        trace!(
            mob = id.get(),
            species = species.get(),
            health = mob.health(),
            "tracking mob"
        );

        let _ = self.entries.insert(
            id,
            RegistryEntry {
                mob,
                species,
                spawned_at,
            },
        );
        self.ledger.record_spawn();
        out.push(Event::MobSpawned {
            mob: id,
            species,
            wave,
        });
        Ok(id)
    }

    /// Subtracts health from a live mob.
    ///
    /// Returns `Some(true)` when the mob is now depleted, `None` when the id is
    /// unknown. Depleted mobs die on the next [`MobRegistry::tick`] unless the
    /// caller marks them dead first.
    pub fn damage(&mut self, id: MobId, amount: u32) -> Option<bool> {
        self.entries
            .get_mut(&id)
            .map(|entry| entry.mob.apply_damage(amount))
    }

    /// Runs the death hook chain and removes the entry.
    ///
    /// Only the first call for an id has any effect; later calls return
    /// `false` without touching rewards or counters.
    pub fn mark_dead(
        &mut self,
        id: MobId,
        host: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> bool {
        let Some(mut entry) = self.entries.remove(&id) else {
            return false;
        };

        {
            let mut context = DeathContext::new(
                id,
                &mut entry.mob,
                &mut self.entries,
                host,
                &mut self.ledger,
                &mut self.rng,
            );
            for hook in &mut self.hooks {
                hook.on_death(&mut context);
            }
        }

        let wave_mob = entry.mob.is_wave_mob();
        debug!(
            mob = id.get(),
            species = entry.species.get(),
            wave_mob,
            spawned_at_ms = entry.spawned_at.as_millis() as u64,
            "mob died"
        );
        out.push(Event::MobKilled {
            mob: id,
            species: entry.species,
            wave_mob,
        });
        true
    }

    /// Frame housekeeping over a snapshot of live ids.
    ///
    /// Depleted mobs are routed through [`MobRegistry::mark_dead`]. When the
    /// grid holds terrain, mobs standing on unwalkable tiles are moved to the
    /// nearest walkable tile center.
    pub fn tick(
        &mut self,
        grid: &WalkabilityGrid,
        host: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) {
        let mut snapshot = std::mem::take(&mut self.snapshot);
        snapshot.clear();
        snapshot.extend(self.entries.keys().copied());

        for id in &snapshot {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            let depleted = entry.mob.is_depleted();
            let from = entry.mob.position();

            if depleted {
                let _ = self.mark_dead(*id, host, out);
                continue;
            }
            if !grid.is_initialized() || grid.is_walkable(from) {
                continue;
            }

            let Some(to) = grid.nearest_walkable(from, self.relocation_radius, &mut self.rng)
            else {
                warn!(mob = id.get(), "no walkable tile available for relocation");
                continue;
            };
            if let Some(entry) = self.entries.get_mut(id) {
                entry.mob.set_position(to);
                trace!(mob = id.get(), ?from, ?to, "relocated stranded mob");
                out.push(Event::MobRelocated { mob: *id, from, to });
            }
        }

        self.snapshot = snapshot;
    }

    /// Runs abilities and pursuit for every live mob.
    pub fn update_behaviours(
        &mut self,
        dt: Duration,
        player_position: Option<Vec2>,
        projectiles: &mut Projectiles,
    ) {
        for entry in self.entries.values_mut() {
            if !entry.mob.is_depleted() {
                entry.mob.update_behaviour(dt, player_position, projectiles);
            }
        }
    }

    /// Captures live mobs and the pairs that may be within `cell_size`.
    #[must_use]
    pub fn neighbor_view(&self, cell_size: f32) -> NeighborView {
        let snapshots: Vec<SteeringSnapshot> = self
            .entries
            .iter()
            .map(|(id, entry)| SteeringSnapshot {
                id: *id,
                position: entry.mob.position(),
                separation_radius: entry.mob.separation_radius(),
                interruptible: entry.mob.action().is_interruptible(),
            })
            .collect();
        let positions: Vec<Vec2> = snapshots.iter().map(|snapshot| snapshot.position).collect();
        let pairs = neighbors::candidate_pairs(&positions, cell_size);
        NeighborView::new(snapshots, pairs)
    }

    /// Hands a steering impulse to the mob. Returns `true` when it moved.
    pub fn apply_impulse(&mut self, id: MobId, impulse: Vec2) -> bool {
        self.entries
            .get_mut(&id)
            .map_or(false, |entry| entry.mob.receive_impulse(impulse))
    }

    /// Drops every entry without running hooks or touching counters.
    pub fn clear_silently(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.snapshot.clear();
        debug!(dropped, "registry cleared");
    }
}

impl fmt::Debug for MobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MobRegistry")
            .field("salt", &self.salt)
            .field("next_serial", &self.next_serial)
            .field("population_cap", &self.population_cap)
            .field("live", &self.entries.len())
            .field("ledger", &self.ledger)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Query functions that provide read-only access to the registry.
pub mod query {
    use horde_core::{MobId, SpeciesId, Statistics, WaveNumber};

    use super::MobRegistry;

    /// Number of live mobs.
    #[must_use]
    pub fn population_count(registry: &MobRegistry) -> u32 {
        u32::try_from(registry.entries.len()).unwrap_or(u32::MAX)
    }

    /// Live mobs of one species in ascending id order.
    #[must_use]
    pub fn by_species(registry: &MobRegistry, species: SpeciesId) -> Vec<MobId> {
        registry
            .entries
            .iter()
            .filter(|(_, entry)| entry.species == species)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Snapshot of the lifetime counters combined with the wave status.
    #[must_use]
    pub fn statistics(
        registry: &MobRegistry,
        current_wave: WaveNumber,
        wave_active: bool,
    ) -> Statistics {
        Statistics {
            total_spawned: registry.ledger.total_spawned(),
            total_killed: registry.ledger.total_killed(),
            active_count: population_count(registry),
            kills_by_species: registry.ledger.kills_by_species().clone(),
            current_wave,
            wave_active,
        }
    }
}
