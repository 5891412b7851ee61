use std::{collections::BTreeSet, time::Duration};

use horde_core::{
    DifficultyLevel, Event, MobId, SpawnRequest, SpecialWaveType, SpeciesDescriptor, SpeciesId,
    SpeciesTable, Vec2, WaveNumber,
};
use horde_system_wave_director::{
    CompositionRule, Config, WaveContext, WaveDirector, WavePhase,
};
use horde_world::WalkabilityGrid;

#[test]
fn start_wave_classifies_special_types() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);

    for (wave, expected) in [
        (10, SpecialWaveType::Boss),
        (7, SpecialWaveType::Elite),
        (5, SpecialWaveType::Swarm),
        (35, SpecialWaveType::Elite),
        (16, SpecialWaveType::Mixed),
        (4, SpecialWaveType::None),
    ] {
        let mut director = WaveDirector::new(Config::default());
        let mut events = Vec::new();
        director.start_wave(WaveNumber::new(wave), &context, &mut events);
        assert_eq!(
            events.first(),
            Some(&Event::WaveStarted {
                wave: WaveNumber::new(wave),
                special: expected,
            })
        );
        assert_eq!(director.state().special(), expected);
    }
}

#[test]
fn normal_wave_four_completes_with_reference_bonus() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(4), &context, &mut events);
    assert_eq!(director.state().pending_spawn_count(), 10);

    let requests = release_all(&mut director, &context, &mut events);
    assert_eq!(requests.len(), 10);
    let ids = accept_all(&mut director, &requests, &mut events);
    assert!(director.is_wave_active());
    assert_eq!(director.state().living_members(), 10);

    let (last, rest) = ids.split_last().expect("members");
    director.handle_deaths(&kills(rest), &mut events);
    assert!(director.is_wave_active(), "one member still alive");

    events.clear();
    director.handle_deaths(&kills(&[*last]), &mut events);
    assert_eq!(
        events,
        vec![Event::WaveCompleted {
            wave: WaveNumber::new(4),
            exp_bonus: 400,
            gold_bonus: 200,
        }]
    );
    assert_eq!(director.phase(), WavePhase::Idle);
}

#[test]
fn members_are_staggered() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();
    director.start_wave(WaveNumber::new(1), &context, &mut events);

    let mut requests = Vec::new();
    director.handle(&[tick(1)], &context, &mut requests, &mut events);
    assert_eq!(requests.len(), 1);

    director.handle(&[tick(248)], &context, &mut requests, &mut events);
    assert_eq!(requests.len(), 1);

    director.handle(&[tick(1)], &context, &mut requests, &mut events);
    assert_eq!(requests.len(), 2);

    director.handle(&[tick(500)], &context, &mut requests, &mut events);
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|request| {
        let tag = request.wave.expect("wave member");
        tag.wave == WaveNumber::new(1)
    }));
}

#[test]
fn members_spawn_in_annulus_around_player() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let player = Vec2::new(1_000.0, -300.0);
    let context = WaveContext {
        player: Some(player),
        ..context(&table, &grid)
    };
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();
    director.start_wave(WaveNumber::new(3), &context, &mut events);

    let requests = release_all(&mut director, &context, &mut events);
    assert!(!requests.is_empty());
    for request in requests {
        let distance = request.position.distance(player);
        assert!((300.0 - 1e-2..=500.0 + 1e-2).contains(&distance));
    }
}

#[test]
fn timer_starts_waves_regardless_of_completion() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();
    let mut requests = Vec::new();

    director.handle(&[tick(44_999)], &context, &mut requests, &mut events);
    assert_eq!(director.current_wave(), WaveNumber::new(0));

    director.handle(&[tick(1)], &context, &mut requests, &mut events);
    assert_eq!(director.current_wave(), WaveNumber::new(1));
    assert!(director.is_wave_active());

    director.handle(&[tick(45_000)], &context, &mut requests, &mut events);
    assert_eq!(director.current_wave(), WaveNumber::new(2));

    let started: Vec<WaveNumber> = events
        .iter()
        .filter_map(|event| match event {
            Event::WaveStarted { wave, .. } => Some(*wave),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![WaveNumber::new(1), WaveNumber::new(2)]);
}

#[test]
fn superseded_wave_outcomes_are_ignored() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(1), &context, &mut events);
    let old_requests = release_all(&mut director, &context, &mut events);

    director.start_wave(WaveNumber::new(2), &context, &mut events);
    let pending = director.state().pending_spawn_count();
    let _ = accept_all(&mut director, &old_requests, &mut events);

    assert_eq!(director.state().pending_spawn_count(), pending);
    assert_eq!(director.state().roster().count(), 0);
}

#[test]
fn refused_members_still_resolve_the_wave() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(2), &context, &mut events);
    let requests = release_all(&mut director, &context, &mut events);
    events.clear();
    for request in &requests {
        director.record_spawn(request.wave.expect("wave member"), None, &mut events);
    }

    assert!(matches!(
        events.as_slice(),
        [Event::WaveCompleted {
            exp_bonus: 200,
            gold_bonus: 100,
            ..
        }]
    ));
}

#[test]
fn wave_without_eligible_species_completes_immediately() {
    let table = SpeciesTable::new(vec![species(1, 1, 50)]).expect("valid species");
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(1), &context, &mut events);

    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], Event::WaveCompleted { .. }));
    assert!(!director.is_wave_active());
}

#[test]
fn rosters_replay_for_identical_inputs() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);

    let roster = |seed: u64| {
        let mut director = WaveDirector::new(Config {
            seed,
            ..Config::default()
        });
        let mut events = Vec::new();
        director.start_wave(WaveNumber::new(6), &context, &mut events);
        release_all(&mut director, &context, &mut events)
            .into_iter()
            .map(|request| request.species)
            .collect::<Vec<_>>()
    };

    assert_eq!(roster(11), roster(11));
}

#[test]
fn allow_list_restricts_selection() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut config = Config::default();
    config.compositions.swarm = CompositionRule::new(15.0, 2.0, 2.0)
        .with_allow_list(vec![SpeciesId::new(2)]);
    let mut director = WaveDirector::new(config);
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(5), &context, &mut events);
    let requests = release_all(&mut director, &context, &mut events);

    assert_eq!(requests.len(), 27);
    assert!(requests
        .iter()
        .all(|request| request.species == SpeciesId::new(2)));
}

#[test]
fn ineligible_allow_list_falls_back_to_every_eligible_species() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut config = Config::default();
    config.compositions.elite = CompositionRule::new(2.0, 0.3, 0.5)
        .with_allow_list(vec![SpeciesId::new(3)]);
    let mut director = WaveDirector::new(config);
    let mut events = Vec::new();

    // Species 3 is gated at 9, so wave 7 may not use it.
    director.start_wave(WaveNumber::new(7), &context, &mut events);
    let requests = release_all(&mut director, &context, &mut events);

    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|request| request.species != SpeciesId::new(3)));
}

#[test]
fn mixed_waves_cycle_through_allowed_species() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();

    director.start_wave(WaveNumber::new(16), &context, &mut events);
    let requests = release_all(&mut director, &context, &mut events);

    let species: Vec<u32> = requests
        .iter()
        .take(6)
        .map(|request| request.species.get())
        .collect();
    assert_eq!(species, vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn cancel_drops_queued_members() {
    let table = table();
    let grid = WalkabilityGrid::default();
    let context = context(&table, &grid);
    let mut director = WaveDirector::new(Config::default());
    let mut events = Vec::new();
    director.start_wave(WaveNumber::new(3), &context, &mut events);
    assert!(director.queued_spawns() > 0);

    director.cancel();

    let mut requests = Vec::new();
    director.handle(&[tick(60_000)], &context, &mut requests, &mut events);
    assert_eq!(director.current_wave(), WaveNumber::new(4));
    assert_eq!(requests.len(), 1, "only the next wave's first member is due");
    assert_eq!(
        requests[0].wave.map(|tag| tag.wave),
        Some(WaveNumber::new(4))
    );
}

fn release_all(
    director: &mut WaveDirector,
    context: &WaveContext<'_>,
    events: &mut Vec<Event>,
) -> Vec<SpawnRequest> {
    let mut requests = Vec::new();
    director.handle(&[tick(30_000)], context, &mut requests, events);
    requests
}

fn accept_all(
    director: &mut WaveDirector,
    requests: &[SpawnRequest],
    events: &mut Vec<Event>,
) -> Vec<MobId> {
    let mut ids = Vec::new();
    let mut used = BTreeSet::new();
    for (serial, request) in requests.iter().enumerate() {
        let id = MobId::compose(1, serial as u64 + 1).expect("serial fits");
        assert!(used.insert(id));
        director.record_spawn(request.wave.expect("wave member"), Some(id), events);
        ids.push(id);
    }
    ids
}

fn kills(ids: &[MobId]) -> Vec<Event> {
    ids.iter()
        .map(|mob| Event::MobKilled {
            mob: *mob,
            species: SpeciesId::new(1),
            wave_mob: true,
        })
        .collect()
}

fn tick(millis: u64) -> Event {
    Event::TimeAdvanced {
        dt: Duration::from_millis(millis),
    }
}

fn context<'a>(table: &'a SpeciesTable, grid: &'a WalkabilityGrid) -> WaveContext<'a> {
    WaveContext {
        difficulty: DifficultyLevel::BASELINE,
        player: Some(Vec2::ZERO),
        species: table,
        grid,
    }
}

fn table() -> SpeciesTable {
    SpeciesTable::new(vec![species(1, 10, 0), species(2, 5, 0), species(3, 2, 9)])
        .expect("valid species")
}

fn species(id: u32, spawn_weight: u32, min_wave_gate: u32) -> SpeciesDescriptor {
    SpeciesDescriptor {
        id: SpeciesId::new(id),
        name: format!("species-{id}"),
        base_health: 20,
        base_damage: 3,
        base_speed: 60,
        exp_value: 1,
        gold_value: 1,
        spawn_weight,
        min_wave_gate,
        exp_drop_chance: 1.0,
        gold_drop_chance: 0.0,
        ability_tags: Vec::new(),
        separation_radius: 16.0,
    }
}
