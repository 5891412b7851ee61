#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Composable ability modules bound to individual mob instances.
//!
//! Species declare [`AbilityTag`] values; the [`AbilityBinder`] turns them into
//! an [`AbilitySet`] owned by a single mob. Each module keeps its own cooldown
//! state, so two mobs of the same species never share timers.

mod projectiles;

use std::time::Duration;

use horde_core::{AbilityTag, MobId, Vec2};
use tracing::trace;

pub use projectiles::{Projectile, Projectiles, PROJECTILE_HIT_RADIUS, PROJECTILE_LIFETIME};

/// Peak knockback applied to the player at the center of an explosion.
pub const EXPLOSION_KNOCKBACK: f32 = 220.0;

/// Fraction of the falloff damage dealt to mobs caught in an explosion.
pub const BYSTANDER_DAMAGE_FRACTION: f32 = 0.5;

/// Everything a death effect may touch while its owner is being removed.
///
/// The dying mob is never listed among the bystanders.
pub trait BlastTargets {
    /// Position of the player, or `None` when no player is present.
    fn player_position(&self) -> Option<Vec2>;

    /// Damages and pushes the player. A no-op when no player is present.
    fn damage_player(&mut self, amount: u32, knockback: Vec2);

    /// Live mobs whose position lies within `radius` of `center`.
    fn mobs_within(&self, center: Vec2, radius: f32) -> Vec<(MobId, Vec2)>;

    /// Damages a live mob. Unknown or dead mobs are ignored.
    fn damage_mob(&mut self, mob: MobId, amount: u32);
}

/// Per-frame inputs handed to every module of a mob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilityFrame {
    /// Simulated time that elapsed since the previous frame.
    pub dt: Duration,
    /// Current position of the owning mob.
    pub origin: Vec2,
    /// Scaled damage of the owning mob.
    pub damage: u32,
    /// Player position, if a player is present.
    pub player_position: Option<Vec2>,
}

/// Fires a projectile toward the player whenever the cooldown allows.
#[derive(Clone, Debug, PartialEq)]
pub struct RangedAttack {
    range: f32,
    cooldown: Duration,
    projectile_speed: f32,
    ready_in: Duration,
}

impl RangedAttack {
    /// Creates a module that starts on a full cooldown.
    #[must_use]
    pub fn new(range: f32, cooldown: Duration, projectile_speed: f32) -> Self {
        Self {
            range,
            cooldown,
            projectile_speed,
            ready_in: cooldown,
        }
    }

    /// Maximum firing distance.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Time remaining until the next shot may be fired.
    #[must_use]
    pub const fn ready_in(&self) -> Duration {
        self.ready_in
    }

    /// Advances the cooldown and fires when the player is in range.
    ///
    /// Returns `true` when a projectile was spawned this frame.
    pub fn update(&mut self, frame: &AbilityFrame, projectiles: &mut Projectiles) -> bool {
        self.ready_in = self.ready_in.saturating_sub(frame.dt);

        let Some(target) = frame.player_position else {
            return false;
        };
        if !self.ready_in.is_zero() {
            return false;
        }
        if frame.origin.distance(target) > self.range {
            return false;
        }

        let heading = (target - frame.origin).normalize_or_zero();
        projectiles.spawn(frame.origin, heading * self.projectile_speed, frame.damage);
        self.ready_in = self.cooldown;
        true
    }
}

/// Damages everything nearby when the owning mob dies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeathExplosion {
    radius: f32,
    damage: u32,
}

impl DeathExplosion {
    /// Creates an explosion with the provided radius and center damage.
    #[must_use]
    pub const fn new(radius: f32, damage: u32) -> Self {
        Self { radius, damage }
    }

    /// Blast radius in world units.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Linear falloff `damage * (1 - distance / radius)`, zero outside the radius.
    #[must_use]
    pub fn falloff(&self, distance: f32) -> f32 {
        if self.radius <= 0.0 || distance > self.radius {
            return 0.0;
        }
        self.damage as f32 * (1.0 - distance / self.radius)
    }

    /// Applies the blast to the player and every bystander in range.
    pub fn detonate(&self, origin: Vec2, targets: &mut dyn BlastTargets) {
        if let Some(player) = targets.player_position() {
            let distance = origin.distance(player);
            if distance <= self.radius {
                let amount = self.falloff(distance).floor() as u32;
                let strength = EXPLOSION_KNOCKBACK * (1.0 - distance / self.radius);
                let knockback = (player - origin).normalize_or_zero() * strength;
                targets.damage_player(amount, knockback);
            }
        }

        for (mob, position) in targets.mobs_within(origin, self.radius) {
            let amount =
                (self.falloff(origin.distance(position)) * BYSTANDER_DAMAGE_FRACTION).floor();
            if amount >= 1.0 {
                targets.damage_mob(mob, amount as u32);
            }
        }
    }
}

/// Tagged union over every composable ability.
#[derive(Clone, Debug, PartialEq)]
pub enum AbilityModule {
    /// See [`RangedAttack`].
    RangedAttack(RangedAttack),
    /// See [`DeathExplosion`].
    DeathExplosion(DeathExplosion),
}

impl AbilityModule {
    fn update(&mut self, frame: &AbilityFrame, projectiles: &mut Projectiles) -> bool {
        match self {
            Self::RangedAttack(module) => module.update(frame, projectiles),
            Self::DeathExplosion(_) => false,
        }
    }

    fn on_death(&mut self, origin: Vec2, targets: &mut dyn BlastTargets) {
        match self {
            Self::RangedAttack(_) => {}
            Self::DeathExplosion(module) => module.detonate(origin, targets),
        }
    }
}

/// Modules owned by one mob instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbilitySet {
    modules: Vec<AbilityModule>,
}

impl AbilitySet {
    /// Creates a set from explicit modules.
    #[must_use]
    pub fn from_modules(modules: Vec<AbilityModule>) -> Self {
        Self { modules }
    }

    /// Runs the per-frame update of every module.
    ///
    /// Returns `true` when any module started an attack this frame.
    pub fn update(&mut self, frame: &AbilityFrame, projectiles: &mut Projectiles) -> bool {
        let mut attacked = false;
        for module in &mut self.modules {
            attacked |= module.update(frame, projectiles);
        }
        attacked
    }

    /// Runs every death effect in binding order.
    pub fn on_death(&mut self, origin: Vec2, targets: &mut dyn BlastTargets) {
        for module in &mut self.modules {
            module.on_death(origin, targets);
        }
    }

    /// Iterator over the bound modules.
    pub fn iter(&self) -> impl Iterator<Item = &AbilityModule> {
        self.modules.iter()
    }

    /// Number of bound modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Reports whether the mob carries no abilities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Maps species ability tags to fresh module instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbilityBinder;

impl AbilityBinder {
    /// Creates a new binder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Instantiates one module per tag, in declaration order.
    #[must_use]
    pub fn bind(&self, tags: &[AbilityTag]) -> AbilitySet {
        let modules = tags
            .iter()
            .map(|tag| {
                trace!(ability = tag.label(), "binding ability");
                match *tag {
                    AbilityTag::RangedAttack {
                        range,
                        cooldown_ms,
                        projectile_speed,
                    } => AbilityModule::RangedAttack(RangedAttack::new(
                        range,
                        Duration::from_millis(u64::from(cooldown_ms)),
                        projectile_speed,
                    )),
                    AbilityTag::DeathExplosion { radius, damage } => {
                        AbilityModule::DeathExplosion(DeathExplosion::new(radius, damage))
                    }
                }
            })
            .collect();
        AbilitySet::from_modules(modules)
    }
}
