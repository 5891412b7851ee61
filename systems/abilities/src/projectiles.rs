//! Projectiles fired by ranged modules.

use std::time::Duration;

use horde_core::{Player, Vec2};

/// Distance at which a projectile connects with the player.
pub const PROJECTILE_HIT_RADIUS: f32 = 12.0;

/// Time after which an unspent projectile disappears.
pub const PROJECTILE_LIFETIME: Duration = Duration::from_secs(4);

/// Single projectile in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    position: Vec2,
    velocity: Vec2,
    damage: u32,
    age: Duration,
}

impl Projectile {
    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity in world units per second.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Damage dealt on contact.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }
}

/// Pool of projectiles advanced once per frame.
#[derive(Clone, Debug, Default)]
pub struct Projectiles {
    live: Vec<Projectile>,
}

impl Projectiles {
    /// Launches a projectile from `origin`.
    pub fn spawn(&mut self, origin: Vec2, velocity: Vec2, damage: u32) {
        self.live.push(Projectile {
            position: origin,
            velocity,
            damage,
            age: Duration::ZERO,
        });
    }

    /// Moves every projectile, resolves player contact and expires old ones.
    ///
    /// Returns the number of projectiles that hit the player. Without a
    /// player, projectiles keep flying until they expire.
    pub fn update<P>(&mut self, dt: Duration, mut player: Option<&mut P>) -> u32
    where
        P: Player + ?Sized,
    {
        let step = dt.as_secs_f32();
        let target = player.as_deref().map(|player| player.position());
        let mut hits = 0;

        self.live.retain_mut(|projectile| {
            let previous = projectile.position;
            projectile.position += projectile.velocity * step;
            projectile.age = projectile.age.saturating_add(dt);

            if let (Some(target), Some(player)) = (target, player.as_deref_mut()) {
                if closest_on_segment(previous, projectile.position, target).distance(target)
                    <= PROJECTILE_HIT_RADIUS
                {
                    player.take_damage(projectile.damage);
                    hits += 1;
                    return false;
                }
            }

            projectile.age < PROJECTILE_LIFETIME
        });

        hits
    }

    /// Iterator over projectiles in flight.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.live.iter()
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Reports whether no projectile is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Removes every projectile without resolving hits.
    pub fn clear(&mut self) {
        self.live.clear();
    }
}

/// Point of the segment `start..end` nearest to `point`.
fn closest_on_segment(start: Vec2, end: Vec2, point: Vec2) -> Vec2 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f32::EPSILON {
        return end;
    }
    let t = ((point - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    start + segment * t
}
