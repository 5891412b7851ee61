//! Ordered side effects executed exactly once when a mob dies.

use std::collections::BTreeMap;

use horde_core::{Collaborators, Economy, MobId, SpeciesId, Vec2};
use horde_system_abilities::BlastTargets;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{mob::Mob, RegistryEntry};

/// Lifetime spawn and kill counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KillLedger {
    total_spawned: u64,
    total_killed: u64,
    kills_by_species: BTreeMap<SpeciesId, u64>,
}

impl KillLedger {
    /// Number of mobs ever tracked.
    #[must_use]
    pub const fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    /// Number of deaths counted by the kill counter hook.
    #[must_use]
    pub const fn total_killed(&self) -> u64 {
        self.total_killed
    }

    /// Kills grouped by species.
    #[must_use]
    pub fn kills_by_species(&self) -> &BTreeMap<SpeciesId, u64> {
        &self.kills_by_species
    }

    /// Kills recorded for one species.
    #[must_use]
    pub fn kills_of(&self, species: SpeciesId) -> u64 {
        self.kills_by_species.get(&species).copied().unwrap_or(0)
    }

    pub(crate) fn record_spawn(&mut self) {
        self.total_spawned = self.total_spawned.saturating_add(1);
    }

    fn record_species_kill(&mut self, species: SpeciesId) {
        let count = self.kills_by_species.entry(species).or_insert(0);
        *count = count.saturating_add(1);
    }

    fn record_total_kill(&mut self) {
        self.total_killed = self.total_killed.saturating_add(1);
    }
}

/// Side effect invoked while a mob is being removed from the registry.
pub trait DeathHook: Send {
    /// Runs the side effect for the dying mob.
    fn on_death(&mut self, context: &mut DeathContext<'_, '_>);
}

/// State visible to death hooks.
///
/// The dying mob has already been detached from the registry, so it never
/// shows up among the bystanders reachable through [`DeathContext::targets`].
pub struct DeathContext<'a, 'c> {
    mob_id: MobId,
    mob: &'a mut Mob,
    surroundings: Surroundings<'a, 'c>,
    ledger: &'a mut KillLedger,
    rng: &'a mut ChaCha8Rng,
}

impl<'a, 'c> DeathContext<'a, 'c> {
    pub(crate) fn new(
        mob_id: MobId,
        mob: &'a mut Mob,
        entries: &'a mut BTreeMap<MobId, RegistryEntry>,
        host: &'a mut Collaborators<'c>,
        ledger: &'a mut KillLedger,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            mob_id,
            mob,
            surroundings: Surroundings { entries, host },
            ledger,
            rng,
        }
    }

    /// Identifier of the dying mob.
    #[must_use]
    pub fn mob_id(&self) -> MobId {
        self.mob_id
    }

    /// The dying mob.
    #[must_use]
    pub fn mob(&self) -> &Mob {
        self.mob
    }

    /// Counters as updated by the hooks that already ran.
    #[must_use]
    pub fn ledger(&self) -> &KillLedger {
        self.ledger
    }

    /// Registry random source used for drop rolls.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }

    /// Economy collaborator receiving rewards.
    pub fn economy(&mut self) -> &mut dyn Economy {
        &mut *self.surroundings.host.economy
    }

    /// Player and surviving mobs a death effect may damage.
    pub fn targets(&mut self) -> &mut dyn BlastTargets {
        &mut self.surroundings
    }
}

struct Surroundings<'a, 'c> {
    entries: &'a mut BTreeMap<MobId, RegistryEntry>,
    host: &'a mut Collaborators<'c>,
}

impl BlastTargets for Surroundings<'_, '_> {
    fn player_position(&self) -> Option<Vec2> {
        self.host.player_position()
    }

    fn damage_player(&mut self, amount: u32, knockback: Vec2) {
        if let Some(player) = self.host.player.as_deref_mut() {
            player.take_damage(amount);
            player.knockback(knockback);
        }
    }

    fn mobs_within(&self, center: Vec2, radius: f32) -> Vec<(MobId, Vec2)> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.mob.position()))
            .filter(|(_, position)| position.distance(center) <= radius)
            .collect()
    }

    fn damage_mob(&mut self, mob: MobId, amount: u32) {
        if let Some(entry) = self.entries.get_mut(&mob) {
            let _ = entry.mob.apply_damage(amount);
        }
    }
}

/// Runs every death effect bound to the mob, such as explosions.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbilityDeathEffects;

impl DeathHook for AbilityDeathEffects {
    fn on_death(&mut self, context: &mut DeathContext<'_, '_>) {
        let origin = context.mob.position();
        context
            .mob
            .abilities_mut()
            .on_death(origin, &mut context.surroundings);
    }
}

/// Rolls the drop chances and pushes rewards into the economy.
#[derive(Clone, Copy, Debug, Default)]
pub struct RewardDrop;

impl DeathHook for RewardDrop {
    fn on_death(&mut self, context: &mut DeathContext<'_, '_>) {
        let exp = roll(context.rng, context.mob.exp_drop_chance())
            .then_some(context.mob.exp_value())
            .filter(|value| *value > 0);
        let gold = roll(context.rng, context.mob.gold_drop_chance())
            .then_some(context.mob.gold_value())
            .filter(|value| *value > 0);

        if let Some(exp) = exp {
            context.surroundings.host.economy.add_experience(exp);
        }
        if let Some(gold) = gold {
            context.surroundings.host.economy.add_gold(gold);
        }
        debug!(mob = context.mob_id.get(), ?exp, ?gold, "reward drop resolved");
    }
}

/// Increments the per-species kill counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpeciesKillCounter;

impl DeathHook for SpeciesKillCounter {
    fn on_death(&mut self, context: &mut DeathContext<'_, '_>) {
        context.ledger.record_species_kill(context.mob.species());
    }
}

/// Increments the lifetime kill counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TotalKillCounter;

impl DeathHook for TotalKillCounter {
    fn on_death(&mut self, context: &mut DeathContext<'_, '_>) {
        context.ledger.record_total_kill();
    }
}

/// Builds the standard chain: death effects, rewards, species and total counters.
#[must_use]
pub fn default_chain() -> Vec<Box<dyn DeathHook>> {
    vec![
        Box::new(AbilityDeathEffects),
        Box::new(RewardDrop),
        Box::new(SpeciesKillCounter),
        Box::new(TotalKillCounter),
    ]
}

fn roll(rng: &mut ChaCha8Rng, chance: f64) -> bool {
    if chance >= 1.0 {
        return true;
    }
    if chance <= 0.0 || chance.is_nan() {
        return false;
    }
    rng.gen_bool(chance)
}
