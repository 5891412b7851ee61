#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave escalation state machine.
//!
//! A fixed-interval timer starts wave `n + 1` whether or not wave `n`
//! finished, so waves may overlap; starting a wave supersedes the roster of
//! the previous one. Each wave draws its members from a ChaCha stream seeded
//! by a SHA-256 derivation of the session seed, the wave number and the
//! difficulty, so the roster of a wave replays exactly.

mod composition;

use std::{collections::VecDeque, time::Duration};

use horde_core::{
    eligibility_level, DifficultyLevel, Event, MobId, SpawnRequest, SpecialWaveType,
    SpeciesDescriptor, SpeciesId, SpeciesPool, SpeciesTable, Vec2, WaveNumber, WaveTag,
};
use horde_world::WalkabilityGrid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use composition::{
    completion_bonus, completion_multiplier, special_type_for, CompositionRule, CompositionTable,
};

const RNG_STREAM_POSITIONS: &str = "wave-positions";

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Time between consecutive wave starts.
    pub wave_interval: Duration,
    /// Delay between consecutive members of a wave.
    pub stagger_step: Duration,
    /// Inner radius of the spawn annulus around the player.
    pub min_distance: f32,
    /// Outer radius of the spawn annulus around the player.
    pub max_distance: f32,
    /// Rejection-sampling attempts per member position.
    pub max_attempts: u32,
    /// Upper bound on the number of members in a single wave.
    pub max_composition: u32,
    /// Sizing rules and allow-lists per wave type.
    pub compositions: CompositionTable,
    /// Session seed all wave streams are derived from.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wave_interval: Duration::from_secs(45),
            stagger_step: Duration::from_millis(250),
            min_distance: 300.0,
            max_distance: 500.0,
            max_attempts: 16,
            max_composition: 120,
            compositions: CompositionTable::default(),
            seed: 0x7761_7665,
        }
    }
}

/// Lifecycle of the most recent wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WavePhase {
    /// No wave is in progress.
    #[default]
    Idle,
    /// Members are pending or alive.
    WaveActive,
    /// Every member died and the rewards are being settled.
    Completing,
}

/// Bookkeeping for the most recently started wave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaveState {
    wave: WaveNumber,
    special: SpecialWaveType,
    roster: Vec<(MobId, bool)>,
    pending_spawn_count: u32,
}

impl WaveState {
    /// Number of the wave.
    #[must_use]
    pub const fn wave(&self) -> WaveNumber {
        self.wave
    }

    /// Composition rule of the wave.
    #[must_use]
    pub const fn special(&self) -> SpecialWaveType {
        self.special
    }

    /// Members that spawned, in spawn order.
    pub fn roster(&self) -> impl Iterator<Item = MobId> + '_ {
        self.roster.iter().map(|(id, _)| *id)
    }

    /// Members that are still alive.
    #[must_use]
    pub fn living_members(&self) -> usize {
        self.roster.iter().filter(|(_, alive)| *alive).count()
    }

    /// Members scheduled or requested but not yet resolved.
    #[must_use]
    pub const fn pending_spawn_count(&self) -> u32 {
        self.pending_spawn_count
    }

    fn is_cleared(&self) -> bool {
        self.pending_spawn_count == 0 && self.roster.iter().all(|(_, alive)| !alive)
    }
}

/// Inputs describing the world as the director sees it this frame.
#[derive(Clone, Copy, Debug)]
pub struct WaveContext<'a> {
    /// Difficulty in effect.
    pub difficulty: DifficultyLevel,
    /// Player position, if a player is present.
    pub player: Option<Vec2>,
    /// Species available for selection.
    pub species: &'a SpeciesTable,
    /// Terrain used to pick spawn positions.
    pub grid: &'a WalkabilityGrid,
}

#[derive(Clone, Copy, Debug)]
struct StaggeredSpawn {
    due: Duration,
    species: SpeciesId,
    tag: WaveTag,
}

/// Pure system that starts waves, releases their members and settles rewards.
#[derive(Debug)]
pub struct WaveDirector {
    config: Config,
    phase: WavePhase,
    state: WaveState,
    clock: Duration,
    wave_timer: Duration,
    queue: VecDeque<StaggeredSpawn>,
    anchor: Vec2,
    position_rng: ChaCha8Rng,
}

impl WaveDirector {
    /// Creates an idle director. The first wave starts one interval in.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let position_rng =
            ChaCha8Rng::seed_from_u64(derive_labeled_seed(config.seed, RNG_STREAM_POSITIONS));
        Self {
            config,
            phase: WavePhase::Idle,
            state: WaveState::default(),
            clock: Duration::ZERO,
            wave_timer: Duration::ZERO,
            queue: VecDeque::new(),
            anchor: Vec2::ZERO,
            position_rng,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Bookkeeping of the most recent wave.
    #[must_use]
    pub fn state(&self) -> &WaveState {
        &self.state
    }

    /// Most recently started wave. Zero before the first wave.
    #[must_use]
    pub const fn current_wave(&self) -> WaveNumber {
        self.state.wave
    }

    /// Reports whether the most recent wave is still in progress.
    #[must_use]
    pub fn is_wave_active(&self) -> bool {
        self.phase == WavePhase::WaveActive
    }

    /// Number of staggered members not yet released, across every wave.
    #[must_use]
    pub fn queued_spawns(&self) -> usize {
        self.queue.len()
    }

    /// Advances the wave timer and releases staggered members that are due.
    pub fn handle(
        &mut self,
        events: &[Event],
        context: &WaveContext<'_>,
        out_requests: &mut Vec<SpawnRequest>,
        out_events: &mut Vec<Event>,
    ) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if let Some(player) = context.player {
            self.anchor = player;
        }
        if accumulated.is_zero() {
            return;
        }

        self.clock = self.clock.saturating_add(accumulated);
        self.wave_timer = self.wave_timer.saturating_add(accumulated);

        if !self.config.wave_interval.is_zero() {
            while self.wave_timer >= self.config.wave_interval {
                self.wave_timer -= self.config.wave_interval;
                let next = self.state.wave.next();
                self.start_wave(next, context, out_events);
            }
        }

        self.release_due(context, out_requests, out_events);
    }

    /// Starts wave `wave`, superseding any wave still in progress.
    ///
    /// Members are queued with delay `index * stagger_step` from now; the
    /// first member is released on the next [`WaveDirector::handle`] call.
    pub fn start_wave(
        &mut self,
        wave: WaveNumber,
        context: &WaveContext<'_>,
        out_events: &mut Vec<Event>,
    ) {
        if self.phase == WavePhase::WaveActive {
            info!(
                superseded = self.state.wave.get(),
                living = self.state.living_members(),
                pending = self.state.pending_spawn_count,
                "wave superseded before completion"
            );
        }

        let special = special_type_for(wave);
        let rule = self.config.compositions.rule(special);
        let size = rule.size(wave, context.difficulty, self.config.max_composition);
        let members = select_members(
            rule,
            special,
            size,
            wave,
            context,
            derive_wave_seed(self.config.seed, wave, context.difficulty),
        );

        let tag = WaveTag { wave, special };
        let mut delay = Duration::ZERO;
        for species in &members {
            self.queue.push_back(StaggeredSpawn {
                due: self.clock.saturating_add(delay),
                species: *species,
                tag,
            });
            delay = delay.saturating_add(self.config.stagger_step);
        }

        self.state = WaveState {
            wave,
            special,
            roster: Vec::new(),
            pending_spawn_count: u32::try_from(members.len()).unwrap_or(u32::MAX),
        };
        self.phase = WavePhase::WaveActive;

        info!(
            wave = wave.get(),
            special = special.label(),
            members = members.len(),
            difficulty = context.difficulty.get(),
            "wave started"
        );
        out_events.push(Event::WaveStarted { wave, special });

        self.check_completion(out_events);
    }

    /// Records the outcome of a wave spawn request.
    ///
    /// `mob` is `None` when the pipeline refused the request. Outcomes for a
    /// superseded wave are ignored.
    pub fn record_spawn(&mut self, tag: WaveTag, mob: Option<MobId>, out_events: &mut Vec<Event>) {
        if tag.wave != self.state.wave || self.phase != WavePhase::WaveActive {
            return;
        }

        self.state.pending_spawn_count = self.state.pending_spawn_count.saturating_sub(1);
        match mob {
            Some(id) => self.state.roster.push((id, true)),
            None => debug!(wave = tag.wave.get(), "wave member refused by the pipeline"),
        }

        if self.state.pending_spawn_count == 0 {
            self.check_completion(out_events);
        }
    }

    /// Marks roster members that died this frame and settles completion.
    pub fn handle_deaths(&mut self, events: &[Event], out_events: &mut Vec<Event>) {
        let mut member_died = false;
        for event in events {
            let Event::MobKilled {
                mob,
                wave_mob: true,
                ..
            } = event
            else {
                continue;
            };
            if let Some(entry) = self
                .state
                .roster
                .iter_mut()
                .find(|(id, alive)| *alive && id == mob)
            {
                entry.1 = false;
                member_died = true;
            }
        }

        if member_died {
            self.check_completion(out_events);
        }
    }

    /// Cancels the wave timer and every staggered member.
    pub fn cancel(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.wave_timer = Duration::ZERO;
        self.state.pending_spawn_count = 0;
        self.phase = WavePhase::Idle;
        debug!(dropped, "wave director cancelled");
    }

    fn release_due(
        &mut self,
        context: &WaveContext<'_>,
        out_requests: &mut Vec<SpawnRequest>,
        out_events: &mut Vec<Event>,
    ) {
        while let Some(next) = self.queue.front().copied() {
            if next.due > self.clock {
                break;
            }
            let _ = self.queue.pop_front();

            let position = context.grid.random_near(
                self.anchor,
                self.config.min_distance,
                self.config.max_distance,
                self.config.max_attempts,
                &mut self.position_rng,
            );
            match position {
                Some(position) => out_requests.push(SpawnRequest {
                    species: next.species,
                    position,
                    wave: Some(next.tag),
                }),
                None => {
                    warn!(
                        wave = next.tag.wave.get(),
                        "no walkable position for wave member"
                    );
                    self.record_spawn(next.tag, None, out_events);
                }
            }
        }
    }

    fn check_completion(&mut self, out_events: &mut Vec<Event>) {
        if self.phase != WavePhase::WaveActive || !self.state.is_cleared() {
            return;
        }

        self.phase = WavePhase::Completing;
        let wave = self.state.wave;
        let (exp_bonus, gold_bonus) = completion_bonus(wave, self.state.special);
        info!(
            wave = wave.get(),
            special = self.state.special.label(),
            exp_bonus,
            gold_bonus,
            "wave completed"
        );
        out_events.push(Event::WaveCompleted {
            wave,
            exp_bonus,
            gold_bonus,
        });
        self.phase = WavePhase::Idle;
    }
}

fn select_members(
    rule: &CompositionRule,
    special: SpecialWaveType,
    size: u32,
    wave: WaveNumber,
    context: &WaveContext<'_>,
    seed: u64,
) -> Vec<SpeciesId> {
    let level = eligibility_level(context.difficulty, wave);
    let eligible: Vec<&SpeciesDescriptor> = context.species.eligible(level).collect();
    if eligible.is_empty() || size == 0 {
        if size > 0 {
            warn!(wave = wave.get(), level, "no species eligible for wave");
        }
        return Vec::new();
    }

    let allowed: Vec<&SpeciesDescriptor> = if rule.allow_list.is_empty() {
        eligible.clone()
    } else {
        let filtered: Vec<&SpeciesDescriptor> = eligible
            .iter()
            .copied()
            .filter(|definition| rule.allow_list.contains(&definition.id))
            .collect();
        if filtered.is_empty() {
            debug!(
                wave = wave.get(),
                special = special.label(),
                "allow-list has no eligible species, using every eligible species"
            );
            eligible.clone()
        } else {
            filtered
        }
    };

    let count = size as usize;
    if special == SpecialWaveType::Mixed {
        return round_robin(&allowed, count);
    }

    let pool = SpeciesPool::weighted(allowed.iter().copied(), level);
    if pool.is_empty() {
        return round_robin(&allowed, count);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).filter_map(|_| pool.draw(&mut rng)).collect()
}

fn round_robin(allowed: &[&SpeciesDescriptor], count: usize) -> Vec<SpeciesId> {
    allowed
        .iter()
        .map(|definition| definition.id)
        .cycle()
        .take(count)
        .collect()
}

fn derive_wave_seed(seed: u64, wave: WaveNumber, difficulty: DifficultyLevel) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(wave.get().to_le_bytes());
    hasher.update(difficulty.get().to_le_bytes());
    finalize_seed(hasher)
}

fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
