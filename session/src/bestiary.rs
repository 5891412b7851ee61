//! Species used when a configuration does not declare any.

use horde_core::{AbilityTag, SpeciesDescriptor, SpeciesId};

/// Identifier of the baseline melee species.
pub const GRUNT: SpeciesId = SpeciesId::new(1);
/// Identifier of the fast, fragile species.
pub const RUNNER: SpeciesId = SpeciesId::new(2);
/// Identifier of the ranged species.
pub const SPITTER: SpeciesId = SpeciesId::new(3);
/// Identifier of the species that explodes on death.
pub const BOMBER: SpeciesId = SpeciesId::new(4);
/// Identifier of the slow, heavy species.
pub const BRUTE: SpeciesId = SpeciesId::new(5);

/// Builtin species templates in identifier order.
#[must_use]
pub fn builtin() -> Vec<SpeciesDescriptor> {
    vec![
        SpeciesDescriptor {
            id: GRUNT,
            name: "grunt".to_owned(),
            base_health: 30,
            base_damage: 5,
            base_speed: 60,
            exp_value: 10,
            gold_value: 2,
            spawn_weight: 10,
            min_wave_gate: 0,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.25,
            ability_tags: Vec::new(),
            separation_radius: 24.0,
        },
        SpeciesDescriptor {
            id: RUNNER,
            name: "runner".to_owned(),
            base_health: 15,
            base_damage: 3,
            base_speed: 110,
            exp_value: 8,
            gold_value: 1,
            spawn_weight: 6,
            min_wave_gate: 2,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.2,
            ability_tags: Vec::new(),
            separation_radius: 20.0,
        },
        SpeciesDescriptor {
            id: SPITTER,
            name: "spitter".to_owned(),
            base_health: 20,
            base_damage: 4,
            base_speed: 50,
            exp_value: 14,
            gold_value: 3,
            spawn_weight: 4,
            min_wave_gate: 3,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.35,
            ability_tags: vec![AbilityTag::RangedAttack {
                range: 260.0,
                cooldown_ms: 1_800,
                projectile_speed: 220.0,
            }],
            separation_radius: 24.0,
        },
        SpeciesDescriptor {
            id: BOMBER,
            name: "bomber".to_owned(),
            base_health: 25,
            base_damage: 6,
            base_speed: 80,
            exp_value: 12,
            gold_value: 3,
            spawn_weight: 3,
            min_wave_gate: 4,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.3,
            ability_tags: vec![AbilityTag::DeathExplosion {
                radius: 72.0,
                damage: 20,
            }],
            separation_radius: 24.0,
        },
        SpeciesDescriptor {
            id: BRUTE,
            name: "brute".to_owned(),
            base_health: 120,
            base_damage: 12,
            base_speed: 40,
            exp_value: 40,
            gold_value: 10,
            spawn_weight: 2,
            min_wave_gate: 6,
            exp_drop_chance: 1.0,
            gold_drop_chance: 0.6,
            ability_tags: Vec::new(),
            separation_radius: 36.0,
        },
    ]
}
