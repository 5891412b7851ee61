#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the horde director.
//!
//! This crate defines the message surface that connects the session driver,
//! the authoritative mob registry, and pure systems. Systems consume
//! [`Event`] streams and immutable views, and respond with [`SpawnRequest`]
//! batches that the session routes through the spawn pipeline. Collaborators
//! owned by the surrounding game (player, economy, difficulty) are reached
//! exclusively through the traits defined here.

mod species;

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

pub use glam::Vec2;
pub use species::{
    AbilityTag, MobStats, SpeciesDescriptor, SpeciesPool, SpeciesTable, SpeciesTableError,
};

/// Unique identifier assigned to a tracked mob.
///
/// The upper 16 bits carry the registry salt and the lower 48 bits a serial
/// drawn from a monotonic counter. Two identifiers compare equal only when both
/// parts match, so ids minted by differently salted registries never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MobId(u64);

impl MobId {
    /// Number of bits reserved for the serial component.
    pub const SERIAL_BITS: u32 = 48;

    /// Largest serial that can be encoded.
    pub const MAX_SERIAL: u64 = (1 << Self::SERIAL_BITS) - 1;

    /// Packs a salt and serial into an identifier, or `None` when the serial
    /// does not fit in the reserved bits.
    #[must_use]
    pub const fn compose(salt: u16, serial: u64) -> Option<Self> {
        if serial > Self::MAX_SERIAL {
            return None;
        }
        Some(Self(((salt as u64) << Self::SERIAL_BITS) | serial))
    }

    /// Salt component of the identifier.
    #[must_use]
    pub const fn salt(&self) -> u16 {
        (self.0 >> Self::SERIAL_BITS) as u16
    }

    /// Serial component of the identifier.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.0 & Self::MAX_SERIAL
    }

    /// Retrieves the packed numeric representation.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a static species template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(u32);

impl SpeciesId {
    /// Creates a new species identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Sequence number of a wave. Wave zero means no wave has started yet.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// Creates a new wave number wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Externally supplied difficulty scalar. Levels start at one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyLevel(u32);

impl DifficultyLevel {
    /// Entry difficulty of a fresh session.
    pub const BASELINE: Self = Self(1);

    /// Creates a difficulty level, clamping zero up to the baseline.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value == 0 {
            Self::BASELINE
        } else {
            Self(value)
        }
    }

    /// Retrieves the numeric level.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Level compared against a species' `min_wave_gate`.
///
/// A species is eligible when `max(difficulty, wave) >= min_wave_gate`.
#[must_use]
pub fn eligibility_level(difficulty: DifficultyLevel, wave: WaveNumber) -> u32 {
    difficulty.get().max(wave.get())
}

/// Special composition rule attached to a wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialWaveType {
    /// Regular wave drawn from the weighted pool.
    #[default]
    None,
    /// Large burst of weak mobs.
    Swarm,
    /// Small group of reinforced mobs.
    Elite,
    /// Even mix of every allowed species.
    Mixed,
    /// Boss wave.
    Boss,
}

impl SpecialWaveType {
    /// Stable lowercase label used in logs and configuration.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "normal",
            Self::Swarm => "swarm",
            Self::Elite => "elite",
            Self::Mixed => "mixed",
            Self::Boss => "boss",
        }
    }
}

/// Behavioral state of a mob. Attacking and charging cannot be interrupted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActionState {
    /// Free movement; the mob accepts steering impulses.
    #[default]
    Moving,
    /// Mid-attack; the mob ignores incoming steering impulses.
    Attacking,
    /// Mid-charge; the mob ignores incoming steering impulses.
    Charging,
}

impl ActionState {
    /// Reports whether the state may be interrupted by external impulses.
    #[must_use]
    pub const fn is_interruptible(self) -> bool {
        matches!(self, Self::Moving)
    }
}

/// Marks a spawn request as belonging to a numbered wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveTag {
    /// Wave that scheduled the spawn.
    pub wave: WaveNumber,
    /// Composition rule of that wave.
    pub special: SpecialWaveType,
}

/// Request emitted by a system asking the pipeline to materialise a mob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Species template to instantiate.
    pub species: SpeciesId,
    /// World position the mob should appear at.
    pub position: Vec2,
    /// Wave membership, if the request originates from the wave director.
    pub wave: Option<WaveTag>,
}

/// Notifications broadcast while the director runs.
///
/// Events are fire-and-forget: nothing requires a subscriber.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the frame.
        dt: Duration,
    },
    /// Announces that the difficulty collaborator reported a new level.
    DifficultyChanged {
        /// Level that became active.
        level: DifficultyLevel,
    },
    /// Confirms that a mob was tracked by the registry.
    MobSpawned {
        /// Identifier assigned to the new mob.
        mob: MobId,
        /// Species the mob was instantiated from.
        species: SpeciesId,
        /// Wave the mob belongs to, if any.
        wave: Option<WaveNumber>,
    },
    /// Confirms that a mob's death hooks ran and its entry was removed.
    MobKilled {
        /// Identifier of the mob that died.
        mob: MobId,
        /// Species of the mob that died.
        species: SpeciesId,
        /// Whether the mob was spawned as part of a wave.
        wave_mob: bool,
    },
    /// Reports that a mob standing on unwalkable terrain was moved.
    MobRelocated {
        /// Identifier of the relocated mob.
        mob: MobId,
        /// Position before relocation.
        from: Vec2,
        /// Walkable position after relocation.
        to: Vec2,
    },
    /// Announces that a wave began.
    WaveStarted {
        /// Number of the wave.
        wave: WaveNumber,
        /// Composition rule of the wave.
        special: SpecialWaveType,
    },
    /// Announces that every member of a wave died.
    WaveCompleted {
        /// Number of the completed wave.
        wave: WaveNumber,
        /// Experience granted for the completion.
        exp_bonus: u32,
        /// Gold granted for the completion.
        gold_bonus: u32,
    },
}

/// Immutable representation of a mob as seen by local avoidance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteeringSnapshot {
    /// Identifier of the mob.
    pub id: MobId,
    /// Current world position.
    pub position: Vec2,
    /// Species-appropriate separation radius.
    pub separation_radius: f32,
    /// Whether the mob currently accepts impulses.
    pub interruptible: bool,
}

/// Read-only snapshot of every live mob plus candidate neighbor pairs.
///
/// Pairs index into the snapshot list, hold the lower index first and are
/// listed at most once.
#[derive(Clone, Debug, Default)]
pub struct NeighborView {
    snapshots: Vec<SteeringSnapshot>,
    pairs: Vec<(usize, usize)>,
}

impl NeighborView {
    /// Creates a view from snapshots and candidate pairs.
    ///
    /// Pairs that reference missing snapshots or a snapshot twice are dropped.
    #[must_use]
    pub fn new(snapshots: Vec<SteeringSnapshot>, mut pairs: Vec<(usize, usize)>) -> Self {
        let len = snapshots.len();
        pairs.retain(|(first, second)| first != second && *first < len && *second < len);
        for pair in &mut pairs {
            if pair.0 > pair.1 {
                *pair = (pair.1, pair.0);
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        Self { snapshots, pairs }
    }

    /// Captured snapshots in the order they were supplied.
    #[must_use]
    pub fn snapshots(&self) -> &[SteeringSnapshot] {
        &self.snapshots
    }

    /// Candidate pairs as indices into [`NeighborView::snapshots`].
    #[must_use]
    pub fn pair_indices(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Iterator over candidate pairs as snapshot references.
    pub fn pairs(&self) -> impl Iterator<Item = (&SteeringSnapshot, &SteeringSnapshot)> {
        self.pairs
            .iter()
            .map(|(first, second)| (&self.snapshots[*first], &self.snapshots[*second]))
    }

    /// Number of candidate pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

/// Displacement requested by the steering system for one mob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteeringImpulse {
    /// Mob that should receive the impulse.
    pub mob: MobId,
    /// World-space displacement.
    pub impulse: Vec2,
}

/// Aggregate counters exposed through the query surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of mobs ever tracked.
    pub total_spawned: u64,
    /// Number of mobs whose death hooks ran.
    pub total_killed: u64,
    /// Number of mobs currently alive.
    pub active_count: u32,
    /// Kills grouped by species.
    pub kills_by_species: BTreeMap<SpeciesId, u64>,
    /// Most recently started wave.
    pub current_wave: WaveNumber,
    /// Whether the current wave is still in progress.
    pub wave_active: bool,
}

/// Player collaborator. The director writes to it and reads its position.
pub trait Player {
    /// Current world position of the player.
    fn position(&self) -> Vec2;

    /// Applies damage dealt by a mob, projectile or explosion.
    fn take_damage(&mut self, amount: u32);

    /// Pushes the player by the provided world-space impulse.
    fn knockback(&mut self, impulse: Vec2);
}

/// Economy collaborator receiving kill and wave rewards.
pub trait Economy {
    /// Credits experience to the player.
    fn add_experience(&mut self, amount: u32);

    /// Credits gold to the player.
    fn add_gold(&mut self, amount: u32);
}

/// Difficulty collaborator polled once per frame.
pub trait Difficulty {
    /// Currently active difficulty level.
    fn current_level(&self) -> DifficultyLevel;
}

impl Difficulty for DifficultyLevel {
    fn current_level(&self) -> DifficultyLevel {
        *self
    }
}

/// Borrowed handles to every external collaborator for the span of a frame.
///
/// The player may be momentarily absent (for example while a scene tears
/// down); every consumer treats `None` as "skip player interaction".
pub struct Collaborators<'a> {
    /// Player reference, if one currently exists.
    pub player: Option<&'a mut dyn Player>,
    /// Economy receiving rewards.
    pub economy: &'a mut dyn Economy,
    /// Difficulty source.
    pub difficulty: &'a dyn Difficulty,
}

impl Collaborators<'_> {
    /// Position of the player, if present.
    #[must_use]
    pub fn player_position(&self) -> Option<Vec2> {
        self.player.as_deref().map(|player| player.position())
    }
}

/// In-memory economy that simply accumulates rewards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTally {
    /// Total experience credited.
    pub experience: u64,
    /// Total gold credited.
    pub gold: u64,
}

impl Economy for RewardTally {
    fn add_experience(&mut self, amount: u32) {
        self.experience = self.experience.saturating_add(u64::from(amount));
    }

    fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(u64::from(amount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mob_id_keeps_salt_and_serial_apart() {
        let id = MobId::compose(0xbeef, 42).expect("serial fits");
        assert_eq!(id.salt(), 0xbeef);
        assert_eq!(id.serial(), 42);

        let other_salt = MobId::compose(0xbeee, 42).expect("serial fits");
        assert_ne!(id, other_salt);
    }

    #[test]
    fn mob_id_rejects_oversized_serial() {
        assert!(MobId::compose(1, MobId::MAX_SERIAL).is_some());
        assert!(MobId::compose(1, MobId::MAX_SERIAL + 1).is_none());
    }

    #[test]
    fn difficulty_level_clamps_to_baseline() {
        assert_eq!(DifficultyLevel::new(0), DifficultyLevel::BASELINE);
        assert_eq!(DifficultyLevel::new(4).get(), 4);
    }

    #[test]
    fn eligibility_uses_the_larger_of_difficulty_and_wave() {
        assert_eq!(
            eligibility_level(DifficultyLevel::new(2), WaveNumber::new(5)),
            5
        );
        assert_eq!(
            eligibility_level(DifficultyLevel::new(6), WaveNumber::new(1)),
            6
        );
    }

    #[test]
    fn only_moving_mobs_are_interruptible() {
        assert!(ActionState::Moving.is_interruptible());
        assert!(!ActionState::Attacking.is_interruptible());
        assert!(!ActionState::Charging.is_interruptible());
    }

    #[test]
    fn reward_tally_accumulates() {
        let mut tally = RewardTally::default();
        tally.add_experience(30);
        tally.add_experience(12);
        tally.add_gold(5);
        assert_eq!(tally.experience, 42);
        assert_eq!(tally.gold, 5);
    }

    #[test]
    fn neighbor_view_normalizes_pairs() {
        let snapshot = |serial| SteeringSnapshot {
            id: MobId::compose(0, serial).expect("serial fits"),
            position: Vec2::ZERO,
            separation_radius: 10.0,
            interruptible: true,
        };
        let view = NeighborView::new(
            vec![snapshot(1), snapshot(2), snapshot(3)],
            vec![(1, 0), (0, 1), (2, 2), (0, 9), (1, 2)],
        );
        let pairs: Vec<(u64, u64)> = view
            .pairs()
            .map(|(first, second)| (first.id.serial(), second.id.serial()))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
        assert_eq!(view.pair_count(), 2);
    }

    #[test]
    fn statistics_round_trip_through_bincode() {
        let mut statistics = Statistics {
            total_spawned: 12,
            total_killed: 7,
            active_count: 5,
            current_wave: WaveNumber::new(3),
            wave_active: true,
            ..Statistics::default()
        };
        let _ = statistics.kills_by_species.insert(SpeciesId::new(2), 7);

        let bytes = bincode::serialize(&statistics).expect("serialize");
        let restored: Statistics = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, statistics);
    }
}
