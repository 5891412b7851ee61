//! Generic mob instance driven by species data and bound ability modules.

use std::time::Duration;

use horde_core::{ActionState, MobStats, SpeciesId, Vec2, WaveNumber};
use horde_system_abilities::{AbilityFrame, AbilitySet, Projectiles};

/// Distance at which a pursuing mob stops closing in on the player.
pub const CONTACT_DISTANCE: f32 = 16.0;

/// Time a mob stays in the attacking state after firing.
pub const ATTACK_WIND_DOWN: Duration = Duration::from_millis(350);

/// Fully resolved mob ready to be tracked by the registry.
///
/// Produced by the spawn pipeline after position, stats and abilities have
/// been decided.
#[derive(Clone, Debug)]
pub struct MobBlueprint {
    /// Species the mob is instantiated from.
    pub species: SpeciesId,
    /// Walkable spawn position.
    pub position: Vec2,
    /// Scaled instance stats.
    pub stats: MobStats,
    /// Wave the mob belongs to, if any.
    pub wave: Option<WaveNumber>,
    /// Bound ability modules.
    pub abilities: AbilitySet,
    /// Species separation radius.
    pub separation_radius: f32,
    /// Probability that the death drops experience.
    pub exp_drop_chance: f64,
    /// Probability that the death drops gold.
    pub gold_drop_chance: f64,
}

/// Live hostile agent.
#[derive(Clone, Debug)]
pub struct Mob {
    species: SpeciesId,
    position: Vec2,
    health: u32,
    max_health: u32,
    damage: u32,
    speed: u32,
    exp_value: u32,
    gold_value: u32,
    wave: Option<WaveNumber>,
    action: ActionState,
    action_remaining: Duration,
    abilities: AbilitySet,
    separation_radius: f32,
    exp_drop_chance: f64,
    gold_drop_chance: f64,
}

impl Mob {
    /// Instantiates a mob at full health from a blueprint.
    #[must_use]
    pub fn from_blueprint(blueprint: MobBlueprint) -> Self {
        let health = blueprint.stats.health.max(1);
        Self {
            species: blueprint.species,
            position: blueprint.position,
            health,
            max_health: health,
            damage: blueprint.stats.damage,
            speed: blueprint.stats.speed,
            exp_value: blueprint.stats.exp,
            gold_value: blueprint.stats.gold,
            wave: blueprint.wave,
            action: ActionState::Moving,
            action_remaining: Duration::ZERO,
            abilities: blueprint.abilities,
            separation_radius: blueprint.separation_radius,
            exp_drop_chance: blueprint.exp_drop_chance,
            gold_drop_chance: blueprint.gold_drop_chance,
        }
    }

    /// Species the mob was instantiated from.
    #[must_use]
    pub const fn species(&self) -> SpeciesId {
        self.species
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Health at spawn time.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Damage dealt by attacks.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Experience granted when the drop roll succeeds.
    #[must_use]
    pub const fn exp_value(&self) -> u32 {
        self.exp_value
    }

    /// Gold granted when the drop roll succeeds.
    #[must_use]
    pub const fn gold_value(&self) -> u32 {
        self.gold_value
    }

    /// Wave the mob belongs to, if any.
    #[must_use]
    pub const fn wave(&self) -> Option<WaveNumber> {
        self.wave
    }

    /// Reports whether the mob was spawned by a wave.
    #[must_use]
    pub const fn is_wave_mob(&self) -> bool {
        self.wave.is_some()
    }

    /// Current behavioral state.
    #[must_use]
    pub const fn action(&self) -> ActionState {
        self.action
    }

    /// Threshold used by local avoidance.
    #[must_use]
    pub const fn separation_radius(&self) -> f32 {
        self.separation_radius
    }

    /// Probability that the death drops experience.
    #[must_use]
    pub const fn exp_drop_chance(&self) -> f64 {
        self.exp_drop_chance
    }

    /// Probability that the death drops gold.
    #[must_use]
    pub const fn gold_drop_chance(&self) -> f64 {
        self.gold_drop_chance
    }

    /// Ability modules bound to this instance.
    #[must_use]
    pub fn abilities(&self) -> &AbilitySet {
        &self.abilities
    }

    /// Reports whether health has been depleted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.health == 0
    }

    /// Subtracts damage, saturating at zero. Returns `true` once depleted.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(amount);
        self.is_depleted()
    }

    /// Applies a steering displacement unless the mob is mid-action.
    ///
    /// Returns `true` when the impulse moved the mob.
    pub fn receive_impulse(&mut self, impulse: Vec2) -> bool {
        if !self.action.is_interruptible() || !impulse.is_finite() {
            return false;
        }
        self.position += impulse;
        true
    }

    /// Forces the mob into a state for the provided duration.
    pub fn begin_action(&mut self, action: ActionState, duration: Duration) {
        self.action = action;
        self.action_remaining = duration;
        if duration.is_zero() {
            self.action = ActionState::Moving;
        }
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn abilities_mut(&mut self) -> &mut AbilitySet {
        &mut self.abilities
    }

    /// Runs abilities, expires the current action and pursues the player.
    pub(crate) fn update_behaviour(
        &mut self,
        dt: Duration,
        player_position: Option<Vec2>,
        projectiles: &mut Projectiles,
    ) {
        if !self.action_remaining.is_zero() {
            self.action_remaining = self.action_remaining.saturating_sub(dt);
            if self.action_remaining.is_zero() {
                self.action = ActionState::Moving;
            }
        }

        let frame = AbilityFrame {
            dt,
            origin: self.position,
            damage: self.damage,
            player_position,
        };
        if self.abilities.update(&frame, projectiles) {
            self.begin_action(ActionState::Attacking, ATTACK_WIND_DOWN);
        }

        if self.action != ActionState::Moving {
            return;
        }
        let Some(target) = player_position else {
            return;
        };

        let offset = target - self.position;
        let distance = offset.length();
        if distance <= CONTACT_DISTANCE {
            return;
        }
        let step = (self.speed as f32 * dt.as_secs_f32()).min(distance - CONTACT_DISTANCE);
        self.position += offset / distance * step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::AbilityTag;
    use horde_system_abilities::AbilityBinder;

    fn blueprint(abilities: AbilitySet) -> MobBlueprint {
        MobBlueprint {
            species: SpeciesId::new(1),
            position: Vec2::ZERO,
            stats: MobStats {
                health: 30,
                damage: 4,
                speed: 100,
                exp: 2,
                gold: 1,
            },
            wave: None,
            abilities,
            separation_radius: 20.0,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.0,
        }
    }

    #[test]
    fn pursuit_stops_at_contact_distance() {
        let mut mob = Mob::from_blueprint(blueprint(AbilitySet::default()));
        let mut projectiles = Projectiles::default();
        let player = Some(Vec2::new(50.0, 0.0));

        mob.update_behaviour(Duration::from_millis(100), player, &mut projectiles);
        assert!((mob.position().x - 10.0).abs() < 1e-4);

        mob.update_behaviour(Duration::from_secs(5), player, &mut projectiles);
        assert!((mob.position().x - (50.0 - CONTACT_DISTANCE)).abs() < 1e-4);
    }

    #[test]
    fn mobs_hold_without_player() {
        let mut mob = Mob::from_blueprint(blueprint(AbilitySet::default()));
        mob.update_behaviour(Duration::from_secs(1), None, &mut Projectiles::default());
        assert_eq!(mob.position(), Vec2::ZERO);
    }

    #[test]
    fn firing_enters_uninterruptible_wind_down() {
        let abilities = AbilityBinder::new().bind(&[AbilityTag::RangedAttack {
            range: 500.0,
            cooldown_ms: 100,
            projectile_speed: 300.0,
        }]);
        let mut mob = Mob::from_blueprint(blueprint(abilities));
        let mut projectiles = Projectiles::default();
        let player = Some(Vec2::new(200.0, 0.0));

        mob.update_behaviour(Duration::from_millis(100), player, &mut projectiles);
        assert_eq!(mob.action(), ActionState::Attacking);
        assert_eq!(projectiles.len(), 1);
        assert!(!mob.receive_impulse(Vec2::new(5.0, 0.0)));

        let out_of_range = Some(Vec2::new(2_000.0, 0.0));
        mob.update_behaviour(ATTACK_WIND_DOWN, out_of_range, &mut projectiles);
        assert_eq!(mob.action(), ActionState::Moving);
        assert_eq!(projectiles.len(), 1);
        assert!(mob.receive_impulse(Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn damage_saturates_and_reports_depletion() {
        let mut mob = Mob::from_blueprint(blueprint(AbilitySet::default()));
        assert!(!mob.apply_damage(29));
        assert!(mob.apply_damage(100));
        assert_eq!(mob.health(), 0);
    }
}
