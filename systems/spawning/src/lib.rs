#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ambient, interval-driven spawning under a population cap.

use std::time::Duration;

use horde_core::{
    eligibility_level, DifficultyLevel, Event, SpawnRequest, SpeciesPool, SpeciesTable, Vec2,
    WaveNumber,
};
use horde_world::WalkabilityGrid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Configuration parameters required to construct the spawn scheduler.
///
/// The interval shrinks and the cap grows linearly with difficulty:
///
/// ```text
/// interval = max(min_interval, base_interval - (level - 1) * interval_step)
/// cap      = min(max_cap, base_cap + (level - 1) * cap_per_level)
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Interval at the baseline difficulty.
    pub base_interval: Duration,
    /// Reduction of the interval per difficulty level above the baseline.
    pub interval_step: Duration,
    /// Shortest interval the scheduler will ever use.
    pub min_interval: Duration,
    /// Cap at the baseline difficulty.
    pub base_cap: u32,
    /// Cap increase per difficulty level above the baseline.
    pub cap_per_level: u32,
    /// Largest cap the scheduler will ever use.
    pub max_cap: u32,
    /// Inner radius of the spawn annulus around the player.
    pub min_distance: f32,
    /// Outer radius of the spawn annulus around the player.
    pub max_distance: f32,
    /// Rejection-sampling attempts before falling back to any walkable point.
    pub max_attempts: u32,
    /// Seed of the scheduler's random source.
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(2_000),
            interval_step: Duration::from_millis(150),
            min_interval: Duration::from_millis(400),
            base_cap: 20,
            cap_per_level: 5,
            max_cap: 200,
            min_distance: 250.0,
            max_distance: 450.0,
            max_attempts: 16,
            rng_seed: 0x5eed_0f_a11,
        }
    }
}

impl Config {
    /// Interval in effect at `level`.
    #[must_use]
    pub fn interval_for(&self, level: DifficultyLevel) -> Duration {
        let steps = level.get().saturating_sub(1);
        self.base_interval
            .saturating_sub(self.interval_step.saturating_mul(steps))
            .max(self.min_interval)
    }

    /// Population cap in effect at `level`.
    #[must_use]
    pub fn cap_for(&self, level: DifficultyLevel) -> u32 {
        let steps = level.get().saturating_sub(1);
        self.base_cap
            .saturating_add(self.cap_per_level.saturating_mul(steps))
            .min(self.max_cap)
    }
}

/// Inputs describing the world as the scheduler sees it this frame.
#[derive(Clone, Copy, Debug)]
pub struct SpawnContext<'a> {
    /// Live population reported by the registry.
    pub population: u32,
    /// Most recently started wave, for species eligibility.
    pub wave: WaveNumber,
    /// Player position, if a player is present.
    pub player: Option<Vec2>,
    /// Species available for selection.
    pub species: &'a SpeciesTable,
    /// Terrain used to pick spawn positions.
    pub grid: &'a WalkabilityGrid,
}

/// Pure system that emits ambient spawn requests on a difficulty-scaled cadence.
#[derive(Debug)]
pub struct SpawnScheduler {
    config: Config,
    level: DifficultyLevel,
    interval: Duration,
    cap: u32,
    accumulator: Duration,
    rng: ChaCha8Rng,
}

impl SpawnScheduler {
    /// Creates a scheduler at the baseline difficulty.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let level = DifficultyLevel::BASELINE;
        Self {
            config,
            level,
            interval: config.interval_for(level),
            cap: config.cap_for(level),
            accumulator: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Interval currently in effect.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Population cap currently in effect.
    #[must_use]
    pub const fn cap(&self) -> u32 {
        self.cap
    }

    /// Difficulty the interval and cap were derived from.
    #[must_use]
    pub const fn level(&self) -> DifficultyLevel {
        self.level
    }

    /// Drops any partially elapsed interval.
    pub fn cancel(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Consumes events and the frame context to emit spawn requests.
    ///
    /// Each elapsed interval yields at most one request. Intervals that elapse
    /// while the population is at the cap, while no player is present or
    /// while no species is eligible lapse without being retried.
    pub fn handle(&mut self, events: &[Event], context: SpawnContext<'_>, out: &mut Vec<SpawnRequest>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::DifficultyChanged { level } => self.apply_difficulty(*level),
                _ => {}
            }
        }

        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let spawn_attempts = self.resolve_spawn_attempts();
        if spawn_attempts == 0 {
            return;
        }

        let Some(player) = context.player else {
            trace!(spawn_attempts, "no player present, spawn ticks lapse");
            return;
        };

        let level = eligibility_level(self.level, context.wave);
        let pool = SpeciesPool::weighted(context.species.iter(), level);
        let mut population = context.population;

        for _ in 0..spawn_attempts {
            if population >= self.cap {
                debug!(population, cap = self.cap, "spawn tick lapsed at cap");
                continue;
            }
            let Some(species) = pool.draw(&mut self.rng) else {
                debug!(level, "no eligible species, spawn tick lapsed");
                continue;
            };
            let Some(position) = context.grid.random_near(
                player,
                self.config.min_distance,
                self.config.max_distance,
                self.config.max_attempts,
                &mut self.rng,
            ) else {
                debug!("no walkable spawn position, spawn tick lapsed");
                continue;
            };

            out.push(SpawnRequest {
                species,
                position,
                wave: None,
            });
            population += 1;
        }
    }

    fn apply_difficulty(&mut self, level: DifficultyLevel) {
        self.level = level;
        self.interval = self.config.interval_for(level);
        self.cap = self.config.cap_for(level);
        debug!(
            level = level.get(),
            interval_ms = self.interval.as_millis() as u64,
            cap = self.cap,
            "spawn cadence updated"
        );
    }

    fn resolve_spawn_attempts(&mut self) -> usize {
        if self.interval.is_zero() {
            return 0;
        }

        let mut attempts = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            attempts += 1;
        }
        attempts
    }
}
