#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local-avoidance steering that pushes crowded mobs apart.
//!
//! For every candidate pair closer than the mean of their separation radii,
//! both mobs receive opposite displacements along the connecting line with
//! magnitude `strength * dt * (1 - distance / threshold)`. Mobs that are
//! mid-attack or mid-charge still push their neighbors but are not pushed.

use std::time::Duration;

use horde_core::{Event, NeighborView, SteeringImpulse, Vec2};

/// Default push strength in world units per second.
pub const DEFAULT_STRENGTH: f32 = 120.0;

const COINCIDENT_EPSILON: f32 = 1e-4;

/// Configuration parameters required to construct the steering system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    strength: f32,
}

impl Config {
    /// Creates a configuration with the provided push strength.
    #[must_use]
    pub const fn new(strength: f32) -> Self {
        Self { strength }
    }

    /// Push strength in world units per second.
    #[must_use]
    pub const fn strength(&self) -> f32 {
        self.strength
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_STRENGTH)
    }
}

/// Pure system that converts neighbor pairs into per-mob impulses.
#[derive(Debug, Default)]
pub struct SeparationSteering {
    config: Config,
    accumulated: Vec<Vec2>,
}

impl SeparationSteering {
    /// Creates a steering system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            accumulated: Vec::new(),
        }
    }

    /// Consumes the frame's events and neighbor view to emit impulses.
    ///
    /// At most one impulse is emitted per mob, summing every pair it is part
    /// of. Nothing is emitted when no time advanced.
    pub fn handle(
        &mut self,
        events: &[Event],
        neighbors: &NeighborView,
        out: &mut Vec<SteeringImpulse>,
    ) {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }
        if dt.is_zero() || neighbors.pair_count() == 0 {
            return;
        }
        let scale = self.config.strength * dt.as_secs_f32();

        let snapshots = neighbors.snapshots();
        self.accumulated.clear();
        self.accumulated.resize(snapshots.len(), Vec2::ZERO);
        for &(first_index, second_index) in neighbors.pair_indices() {
            let (first, second) = (&snapshots[first_index], &snapshots[second_index]);
            let threshold = (first.separation_radius + second.separation_radius) * 0.5;
            if threshold.is_nan() || threshold <= 0.0 {
                continue;
            }
            let offset = second.position - first.position;
            let distance = offset.length();
            if distance >= threshold {
                continue;
            }

            // Coincident mobs split along x; the lower id moves toward -x.
            let direction = if distance < COINCIDENT_EPSILON {
                if first.id < second.id {
                    Vec2::X
                } else {
                    Vec2::NEG_X
                }
            } else {
                offset / distance
            };
            let push = direction * scale * (1.0 - distance / threshold);

            if first.interruptible {
                self.accumulated[first_index] -= push;
            }
            if second.interruptible {
                self.accumulated[second_index] += push;
            }
        }

        for (snapshot, impulse) in snapshots.iter().zip(&self.accumulated) {
            if *impulse != Vec2::ZERO {
                out.push(SteeringImpulse {
                    mob: snapshot.id,
                    impulse: *impulse,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::{MobId, SteeringSnapshot};

    fn snapshot(serial: u64, position: Vec2, interruptible: bool) -> SteeringSnapshot {
        SteeringSnapshot {
            id: MobId::compose(0, serial).expect("serial fits"),
            position,
            separation_radius: 20.0,
            interruptible,
        }
    }

    fn frame(ms: u64) -> [Event; 1] {
        [Event::TimeAdvanced {
            dt: Duration::from_millis(ms),
        }]
    }

    #[test]
    fn close_pair_receives_opposite_impulses() {
        let view = NeighborView::new(
            vec![
                snapshot(1, Vec2::ZERO, true),
                snapshot(2, Vec2::new(10.0, 0.0), true),
            ],
            vec![(0, 1)],
        );
        let mut steering = SeparationSteering::default();
        let mut out = Vec::new();
        steering.handle(&frame(500), &view, &mut out);

        assert_eq!(out.len(), 2);
        assert!((out[0].impulse - Vec2::new(-30.0, 0.0)).length() < 1e-4);
        assert!((out[1].impulse - Vec2::new(30.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn pairs_beyond_threshold_are_ignored() {
        let view = NeighborView::new(
            vec![
                snapshot(1, Vec2::ZERO, true),
                snapshot(2, Vec2::new(20.0, 0.0), true),
            ],
            vec![(0, 1)],
        );
        let mut steering = SeparationSteering::default();
        let mut out = Vec::new();
        steering.handle(&frame(500), &view, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn busy_mobs_push_but_are_not_pushed() {
        let view = NeighborView::new(
            vec![
                snapshot(1, Vec2::ZERO, false),
                snapshot(2, Vec2::new(0.0, 5.0), true),
            ],
            vec![(0, 1)],
        );
        let mut steering = SeparationSteering::default();
        let mut out = Vec::new();
        steering.handle(&frame(100), &view, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mob.serial(), 2);
        assert!(out[0].impulse.y > 0.0);
    }

    #[test]
    fn coincident_mobs_split_along_x() {
        let view = NeighborView::new(
            vec![
                snapshot(4, Vec2::new(3.0, 3.0), true),
                snapshot(9, Vec2::new(3.0, 3.0), true),
            ],
            vec![(0, 1)],
        );
        let mut steering = SeparationSteering::default();
        let mut out = Vec::new();
        steering.handle(&frame(1_000), &view, &mut out);

        assert_eq!(out.len(), 2);
        assert!((out[0].impulse - Vec2::new(-120.0, 0.0)).length() < 1e-3);
        assert!((out[1].impulse - Vec2::new(120.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn paused_simulation_emits_nothing() {
        let view = NeighborView::new(
            vec![snapshot(1, Vec2::ZERO, true), snapshot(2, Vec2::ZERO, true)],
            vec![(0, 1)],
        );
        let mut steering = SeparationSteering::default();
        let mut out = Vec::new();
        steering.handle(&frame(0), &view, &mut out);
        assert!(out.is_empty());
    }
}
