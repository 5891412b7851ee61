#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame driver that owns one registry, grid, scheduler and wave director.
//!
//! [`HordeSession::update`] runs the systems in dependency order: time
//! advance, difficulty poll, wave timers, ambient spawning, the spawn
//! pipeline, wave roster bookkeeping, abilities and pursuit, projectiles,
//! separation, registry housekeeping, wave completion and finally reward
//! routing. Every notification produced along the way is returned as one
//! batch of [`Event`] values.

pub mod bestiary;
mod config;
mod pipeline;

use std::time::Duration;

use horde_core::{
    Collaborators, DifficultyLevel, Event, MobId, SpawnRequest, SpeciesTable, Statistics,
    SteeringImpulse,
};
use horde_system_abilities::{AbilityBinder, Projectiles};
use horde_system_separation::SeparationSteering;
use horde_system_spawning::{SpawnContext, SpawnScheduler};
use horde_system_wave_director::{WaveContext, WaveDirector};
use horde_world::{query, GridError, MobRegistry, WalkabilityGrid};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, trace};

pub use config::{
    CompositionSection, ConfigError, HordeConfig, RegistrySection, SessionSection,
    SpawningSection, SteeringSection, TerrainSection, WavesSection,
};

use pipeline::SpawnPipeline;

/// Reasons a session cannot be built or fed terrain.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The terrain layer was rejected.
    #[error("terrain rejected")]
    Terrain(#[from] GridError),
}

/// One play session of the horde director.
#[derive(Debug)]
pub struct HordeSession {
    species: SpeciesTable,
    grid: WalkabilityGrid,
    registry: MobRegistry,
    scheduler: SpawnScheduler,
    director: WaveDirector,
    steering: SeparationSteering,
    binder: AbilityBinder,
    projectiles: Projectiles,
    cell_size: f32,
    relocation_radius: u32,
    clock: Duration,
    difficulty: DifficultyLevel,
    polled_difficulty: DifficultyLevel,
    pending: Vec<Event>,
    wave_requests: Vec<SpawnRequest>,
    ambient_requests: Vec<SpawnRequest>,
    impulses: Vec<SteeringImpulse>,
    rng: ChaCha8Rng,
    running: bool,
}

impl HordeSession {
    /// Validates the configuration and builds every component.
    pub fn new(config: &HordeConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let species = config.species_table()?;
        info!(
            species = species.len(),
            population_cap = config.registry.population_cap,
            "horde session created"
        );

        Ok(Self {
            species,
            grid: WalkabilityGrid::new(config.palette()),
            registry: MobRegistry::new(config.registry_config()),
            scheduler: SpawnScheduler::new(config.spawning_config()),
            director: WaveDirector::new(config.wave_config()),
            steering: SeparationSteering::new(config.steering_config()),
            binder: AbilityBinder::new(),
            projectiles: Projectiles::default(),
            cell_size: config.steering.cell_size,
            relocation_radius: config.registry.relocation_radius,
            clock: Duration::ZERO,
            difficulty: DifficultyLevel::BASELINE,
            polled_difficulty: DifficultyLevel::BASELINE,
            pending: Vec::new(),
            wave_requests: Vec::new(),
            ambient_requests: Vec::new(),
            impulses: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.derive_seed("pipeline")),
            running: true,
        })
    }

    /// Loads a row-major tile layer into the walkability grid.
    ///
    /// A tile count that disagrees with `width * height` fails fast.
    pub fn load_terrain(
        &mut self,
        tiles: Vec<u32>,
        width: u32,
        height: u32,
        tile_size: f32,
    ) -> Result<(), SessionError> {
        self.grid.initialize(tiles, width, height, tile_size)?;
        Ok(())
    }

    /// Loads terrain expressed as rows of tile indices.
    pub fn load_terrain_rows<I, R>(&mut self, rows: I, tile_size: f32) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u32]>,
    {
        self.grid.initialize_from_rows(rows, tile_size)?;
        Ok(())
    }

    /// Advances the session by `dt` and returns the frame's notifications.
    ///
    /// A zero `dt` still polls difficulty and runs housekeeping, but no timer
    /// moves. After [`HordeSession::shutdown`] the call does nothing.
    pub fn update(&mut self, dt: Duration, host: &mut Collaborators<'_>) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }

        self.clock = self.clock.saturating_add(dt);
        let mut frame = std::mem::take(&mut self.pending);
        frame.insert(0, Event::TimeAdvanced { dt });
        let level = host.difficulty.current_level();
        if level != self.polled_difficulty {
            self.polled_difficulty = level;
            if level != self.difficulty {
                self.difficulty = level;
                info!(level = level.get(), "difficulty changed");
                frame.push(Event::DifficultyChanged { level });
            }
        }
        let mut events = frame.clone();

        let player = host.player_position();
        self.wave_requests.clear();
        self.ambient_requests.clear();
        {
            let context = WaveContext {
                difficulty: self.difficulty,
                player,
                species: &self.species,
                grid: &self.grid,
            };
            self.director
                .handle(&frame, &context, &mut self.wave_requests, &mut events);
        }
        self.scheduler.handle(
            &frame,
            SpawnContext {
                population: query::population_count(&self.registry),
                wave: self.director.current_wave(),
                player,
                species: &self.species,
                grid: &self.grid,
            },
            &mut self.ambient_requests,
        );

        let pipeline = SpawnPipeline {
            species: &self.species,
            grid: &self.grid,
            binder: &self.binder,
            difficulty: self.difficulty,
            current_wave: self.director.current_wave(),
            relocation_radius: self.relocation_radius,
            now: self.clock,
        };
        for request in self.wave_requests.iter().chain(&self.ambient_requests) {
            let outcome =
                pipeline.materialise(request, &mut self.registry, &mut self.rng, &mut events);
            if let Some(tag) = request.wave {
                self.director.record_spawn(tag, outcome, &mut events);
            }
        }

        self.registry.update_behaviours(dt, player, &mut self.projectiles);
        let hits = self.projectiles.update(dt, host.player.as_deref_mut());
        if hits > 0 {
            debug!(hits, "projectiles struck the player");
        }

        let view = self.registry.neighbor_view(self.cell_size);
        self.impulses.clear();
        self.steering.handle(&frame, &view, &mut self.impulses);
        let refused = self
            .impulses
            .iter()
            .filter(|impulse| !self.registry.apply_impulse(impulse.mob, impulse.impulse))
            .count();
        if refused > 0 {
            trace!(refused, "steering impulses refused by busy or missing mobs");
        }

        let mut deaths = Vec::new();
        self.registry.tick(&self.grid, host, &mut deaths);
        let mut settled = Vec::new();
        self.director.handle_deaths(&deaths, &mut settled);
        events.append(&mut deaths);
        events.append(&mut settled);

        route_rewards(&events, host);
        events
    }

    /// Kills a mob immediately, running its death hooks once.
    ///
    /// Returns the resulting notifications; an unknown or already dead id
    /// yields none.
    pub fn kill_mob(&mut self, id: MobId, host: &mut Collaborators<'_>) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.registry.mark_dead(id, host, &mut events) {
            return events;
        }
        let mut settled = Vec::new();
        self.director.handle_deaths(&events, &mut settled);
        route_rewards(&settled, host);
        events.append(&mut settled);
        events
    }

    /// Damages a live mob. The mob dies on the next update once depleted.
    ///
    /// Returns `None` for unknown ids and `Some(true)` when health ran out.
    pub fn damage_mob(&mut self, id: MobId, amount: u32) -> Option<bool> {
        self.registry.damage(id, amount)
    }

    /// Applies a difficulty change ahead of the next frame's poll.
    ///
    /// The pushed level holds until the host's reported level moves again.
    pub fn on_difficulty_changed(&mut self, level: DifficultyLevel) {
        if level == self.difficulty {
            return;
        }
        self.difficulty = level;
        info!(level = level.get(), "difficulty changed");
        self.pending.push(Event::DifficultyChanged { level });
    }

    /// Cancels every pending timer and clears the registry without rewards.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.director.cancel();
        self.projectiles.clear();
        self.pending.clear();
        self.registry.clear_silently();
        self.running = false;
        info!(
            elapsed_ms = u64::try_from(self.clock.as_millis()).unwrap_or(u64::MAX),
            "horde session shut down"
        );
    }

    /// Lifetime counters and the wave status.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        query::statistics(
            &self.registry,
            self.director.current_wave(),
            self.director.is_wave_active(),
        )
    }

    /// Reports whether [`HordeSession::shutdown`] has not been called yet.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Simulated time elapsed since the session started.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Difficulty the session currently runs at.
    #[must_use]
    pub const fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    /// Species templates in use.
    #[must_use]
    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    /// Authoritative mob table.
    #[must_use]
    pub fn registry(&self) -> &MobRegistry {
        &self.registry
    }

    /// Terrain oracle.
    #[must_use]
    pub fn grid(&self) -> &WalkabilityGrid {
        &self.grid
    }

    /// Wave state machine.
    #[must_use]
    pub fn director(&self) -> &WaveDirector {
        &self.director
    }

    /// Ambient spawn scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &Projectiles {
        &self.projectiles
    }
}

fn route_rewards(events: &[Event], host: &mut Collaborators<'_>) {
    for event in events {
        if let Event::WaveCompleted {
            exp_bonus,
            gold_bonus,
            ..
        } = *event
        {
            host.economy.add_experience(exp_bonus);
            host.economy.add_gold(gold_bonus);
        }
    }
}
