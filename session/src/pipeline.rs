//! Spawn pipeline: position, stats, abilities, then tracking.

use std::time::Duration;

use horde_core::{DifficultyLevel, Event, MobId, SpawnRequest, SpeciesTable, WaveNumber};
use horde_system_abilities::AbilityBinder;
use horde_system_stat_scaling::{apply_composition, compute};
use horde_world::{MobBlueprint, MobRegistry, TrackError, WalkabilityGrid};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Borrowed inputs shared by every request materialised in one frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnPipeline<'a> {
    pub(crate) species: &'a SpeciesTable,
    pub(crate) grid: &'a WalkabilityGrid,
    pub(crate) binder: &'a AbilityBinder,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) current_wave: WaveNumber,
    pub(crate) relocation_radius: u32,
    pub(crate) now: Duration,
}

impl SpawnPipeline<'_> {
    /// Turns a request into a tracked mob, or refuses it.
    ///
    /// Unknown species, positions with no walkable fallback and registry
    /// refusals are logged and yield `None`. Nothing is queued for retry.
    pub(crate) fn materialise(
        &self,
        request: &SpawnRequest,
        registry: &mut MobRegistry,
        rng: &mut ChaCha8Rng,
        out: &mut Vec<Event>,
    ) -> Option<MobId> {
        let Some(descriptor) = self.species.get(request.species) else {
            warn!(
                species = request.species.get(),
                "spawn refused: unknown species"
            );
            return None;
        };

        let position = if self.grid.is_walkable(request.position) {
            request.position
        } else {
            let Some(position) =
                self.grid
                    .nearest_walkable(request.position, self.relocation_radius, rng)
            else {
                warn!(
                    species = request.species.get(),
                    "spawn refused: terrain has no walkable tile"
                );
                return None;
            };
            position
        };

        let (wave, stats) = match request.wave {
            Some(tag) => {
                let scaled = compute(descriptor.base_stats(), self.difficulty, tag.wave);
                (Some(tag.wave), apply_composition(scaled, tag.special))
            }
            None => (
                None,
                compute(descriptor.base_stats(), self.difficulty, self.current_wave),
            ),
        };

        let blueprint = MobBlueprint {
            species: descriptor.id,
            position,
            stats,
            wave,
            abilities: self.binder.bind(&descriptor.ability_tags),
            separation_radius: descriptor.separation_radius,
            exp_drop_chance: f64::from(descriptor.exp_drop_chance),
            gold_drop_chance: f64::from(descriptor.gold_drop_chance),
        };

        match registry.track(blueprint, self.now, out) {
            Ok(id) => {
                debug!(
                    mob = id.get(),
                    species = %descriptor.name,
                    wave = wave.map(|wave| wave.get()),
                    health = stats.health,
                    "mob spawned"
                );
                Some(id)
            }
            Err(TrackError::AtCapacity { cap }) => {
                debug!(
                    species = request.species.get(),
                    cap, "spawn refused: population cap reached"
                );
                None
            }
            Err(error) => {
                warn!(%error, "spawn refused by the registry");
                None
            }
        }
    }
}
