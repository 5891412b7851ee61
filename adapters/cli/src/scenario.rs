//! Simulated collaborators that drive a session without a game attached.

use std::{fmt::Write as _, time::Duration};

use horde_core::{
    Collaborators, Difficulty, DifficultyLevel, Event, MobId, Player, RewardTally, Statistics,
    Vec2,
};
use horde_session::HordeSession;
use serde::Serialize;
use tracing::info;

const DIFFICULTY_STEP: Duration = Duration::from_secs(30);
const ORBIT_RADIUS: f32 = 120.0;
const ORBIT_SPEED: f32 = 0.4;
const KNOCKBACK_DECAY: f32 = 0.9;
const ATTACK_RANGE: f32 = 180.0;
const ATTACK_DAMAGE: u32 = 14;
const ATTACK_COOLDOWN: Duration = Duration::from_millis(300);

/// Player that circles an anchor point and shoots the nearest mob.
#[derive(Clone, Debug)]
struct SimulatedPlayer {
    anchor: Vec2,
    angle: f32,
    displacement: Vec2,
    damage_taken: u64,
    ready_in: Duration,
}

impl SimulatedPlayer {
    fn new(anchor: Vec2) -> Self {
        Self {
            anchor,
            angle: 0.0,
            displacement: Vec2::ZERO,
            damage_taken: 0,
            ready_in: Duration::ZERO,
        }
    }

    fn advance(&mut self, dt: Duration) {
        self.angle = (self.angle + ORBIT_SPEED * dt.as_secs_f32()) % std::f32::consts::TAU;
        self.displacement *= KNOCKBACK_DECAY;
        self.ready_in = self.ready_in.saturating_sub(dt);
    }

    fn pick_target(&mut self, session: &HordeSession) -> Option<MobId> {
        if !self.ready_in.is_zero() {
            return None;
        }
        let origin = self.position();
        let (target, _) = session
            .registry()
            .iter()
            .map(|(id, entry)| (id, entry.mob().position().distance(origin)))
            .filter(|(_, distance)| *distance <= ATTACK_RANGE)
            .min_by(|left, right| left.1.total_cmp(&right.1))?;
        self.ready_in = ATTACK_COOLDOWN;
        Some(target)
    }
}

impl Player for SimulatedPlayer {
    fn position(&self) -> Vec2 {
        self.anchor + Vec2::from_angle(self.angle) * ORBIT_RADIUS + self.displacement
    }

    fn take_damage(&mut self, amount: u32) {
        self.damage_taken = self.damage_taken.saturating_add(u64::from(amount));
    }

    fn knockback(&mut self, impulse: Vec2) {
        self.displacement += impulse;
    }
}

/// Difficulty that rises one level per fixed span of simulated time.
#[derive(Clone, Copy, Debug)]
struct ElapsedDifficulty {
    elapsed: Duration,
    step: Duration,
}

impl ElapsedDifficulty {
    fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }
}

impl Difficulty for ElapsedDifficulty {
    fn current_level(&self) -> DifficultyLevel {
        let steps = self.elapsed.as_millis() / self.step.as_millis().max(1);
        DifficultyLevel::new(u32::try_from(steps).unwrap_or(u32::MAX).saturating_add(1))
    }
}

/// Outcome of a headless run.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct Report {
    simulated_seconds: f64,
    frames: u64,
    final_difficulty: u32,
    statistics: Statistics,
    rewards: RewardTally,
    waves_started: u32,
    waves_completed: u32,
    relocations: u32,
    player_damage_taken: u64,
}

impl Report {
    /// Human readable multi-line summary.
    pub(crate) fn summary(&self) -> String {
        let mut text = String::new();
        let statistics = &self.statistics;
        let _ = writeln!(
            text,
            "simulated {:.1}s over {} frames, final difficulty {}",
            self.simulated_seconds, self.frames, self.final_difficulty
        );
        let _ = writeln!(
            text,
            "mobs: {} spawned, {} killed, {} alive",
            statistics.total_spawned, statistics.total_killed, statistics.active_count
        );
        let _ = writeln!(
            text,
            "waves: {} started, {} completed, current {} ({})",
            self.waves_started,
            self.waves_completed,
            statistics.current_wave.get(),
            if statistics.wave_active {
                "active"
            } else {
                "idle"
            }
        );
        for (species, kills) in &statistics.kills_by_species {
            let _ = writeln!(text, "  species {}: {kills} kills", species.get());
        }
        let _ = writeln!(
            text,
            "rewards: {} exp, {} gold; player took {} damage; {} relocations",
            self.rewards.experience, self.rewards.gold, self.player_damage_taken, self.relocations
        );
        text
    }
}

/// Runs `session` for `duration` at `fps` frames per second, then shuts it
/// down.
pub(crate) fn run(session: &mut HordeSession, duration: Duration, fps: u32) -> Report {
    let frame = Duration::from_secs(1) / fps.max(1);
    let frames = (duration.as_secs_f64() * f64::from(fps)).ceil() as u64;

    let mut player = SimulatedPlayer::new(arena_center(session));
    let mut difficulty = ElapsedDifficulty {
        elapsed: Duration::ZERO,
        step: DIFFICULTY_STEP,
    };
    let mut rewards = RewardTally::default();
    let mut waves_started = 0u32;
    let mut waves_completed = 0u32;
    let mut relocations = 0u32;

    for _ in 0..frames {
        player.advance(frame);
        difficulty.advance(frame);
        let events = {
            let mut host = Collaborators {
                player: Some(&mut player),
                economy: &mut rewards,
                difficulty: &difficulty,
            };
            session.update(frame, &mut host)
        };
        for event in &events {
            match event {
                Event::WaveStarted { .. } => waves_started += 1,
                Event::WaveCompleted { .. } => waves_completed += 1,
                Event::MobRelocated { .. } => relocations += 1,
                _ => {}
            }
        }
        if let Some(target) = player.pick_target(session) {
            let _ = session.damage_mob(target, ATTACK_DAMAGE);
        }
    }

    let statistics = session.statistics();
    session.shutdown();
    info!(
        spawned = statistics.total_spawned,
        killed = statistics.total_killed,
        waves = waves_started,
        "simulation finished"
    );

    Report {
        simulated_seconds: duration.as_secs_f64(),
        frames,
        final_difficulty: difficulty.current_level().get(),
        statistics,
        rewards,
        waves_started,
        waves_completed,
        relocations,
        player_damage_taken: player.damage_taken,
    }
}

/// Center of the loaded terrain, snapped to the closest walkable sample.
fn arena_center(session: &HordeSession) -> Vec2 {
    let grid = session.grid();
    let (Some((width, height)), Some(tile_size)) = (grid.dimensions(), grid.tile_size()) else {
        return Vec2::ZERO;
    };
    let center = Vec2::new(width as f32, height as f32) * tile_size * 0.5;
    if grid.is_walkable(center) {
        return center;
    }
    grid.walkable_samples()
        .iter()
        .copied()
        .min_by(|left, right| {
            left.distance_squared(center)
                .total_cmp(&right.distance_squared(center))
        })
        .unwrap_or(center)
}
