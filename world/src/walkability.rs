//! Tile-indexed walkability oracle and random-point sampler.

use std::collections::BTreeSet;

use horde_core::Vec2;
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on the number of cached walkable sample points.
pub const MAX_WALKABLE_SAMPLES: usize = 4_096;

/// Reasons terrain data may be rejected outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The tile array does not cover exactly `width * height` cells.
    #[error("terrain holds {actual} tiles but {width}x{height} requires {expected}")]
    DimensionMismatch {
        /// Declared width in tiles.
        width: u32,
        /// Declared height in tiles.
        height: u32,
        /// Number of tiles implied by the dimensions.
        expected: u64,
        /// Number of tiles supplied.
        actual: u64,
    },
    /// A row delivered through the row adapter differs in length from the first.
    #[error("terrain row {row} holds {actual} tiles, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        actual: usize,
    },
}

/// Tile indices that block movement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TilePalette {
    blocked: BTreeSet<u32>,
}

impl TilePalette {
    /// Creates a palette that blocks the provided tile indices.
    #[must_use]
    pub fn with_blocked<I: IntoIterator<Item = u32>>(blocked: I) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    /// Reports whether the tile index blocks movement.
    #[must_use]
    pub fn is_blocked(&self, tile: u32) -> bool {
        self.blocked.contains(&tile)
    }
}

#[derive(Clone, Debug)]
struct GridLayout {
    width: u32,
    height: u32,
    tile_size: f32,
    walkable: Vec<bool>,
    samples: Vec<Vec2>,
}

impl GridLayout {
    fn index(&self, column: i64, row: i64) -> Option<usize> {
        if column < 0 || row < 0 || column >= i64::from(self.width) || row >= i64::from(self.height)
        {
            return None;
        }
        let column = usize::try_from(column).ok()?;
        let row = usize::try_from(row).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn is_tile_walkable(&self, column: i64, row: i64) -> bool {
        self.index(column, row)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    fn tile_of(&self, point: Vec2) -> Option<(i64, i64)> {
        if !point.is_finite() {
            return None;
        }
        let column = (point.x / self.tile_size).floor();
        let row = (point.y / self.tile_size).floor();
        Some((column as i64, row as i64))
    }

    fn center(&self, column: i64, row: i64) -> Vec2 {
        Vec2::new(
            (column as f32 + 0.5) * self.tile_size,
            (row as f32 + 0.5) * self.tile_size,
        )
    }
}

/// Traversability oracle built from a flattened tile layer.
///
/// Before [`WalkabilityGrid::initialize`] succeeds with usable terrain the grid
/// is permissive: every point is walkable and samplers return their first
/// candidate.
#[derive(Clone, Debug, Default)]
pub struct WalkabilityGrid {
    palette: TilePalette,
    layout: Option<GridLayout>,
}

impl WalkabilityGrid {
    /// Creates a permissive grid that will classify tiles with `palette`.
    #[must_use]
    pub fn new(palette: TilePalette) -> Self {
        Self {
            palette,
            layout: None,
        }
    }

    /// Loads a row-major tile layer.
    ///
    /// A tile count that disagrees with `width * height` is rejected before any
    /// state changes. Zero-area layers and non-positive tile sizes are logged
    /// and leave the grid permissive.
    pub fn initialize(
        &mut self,
        tiles: Vec<u32>,
        width: u32,
        height: u32,
        tile_size: f32,
    ) -> Result<(), GridError> {
        let expected = u64::from(width) * u64::from(height);
        let actual = tiles.len() as u64;
        if expected != actual {
            return Err(GridError::DimensionMismatch {
                width,
                height,
                expected,
                actual,
            });
        }

        if expected == 0 || !(tile_size.is_finite() && tile_size > 0.0) {
            warn!(
                width,
                height, tile_size, "malformed terrain payload, treating every tile as walkable"
            );
            self.layout = None;
            return Ok(());
        }

        let walkable: Vec<bool> = tiles
            .iter()
            .map(|tile| !self.palette.is_blocked(*tile))
            .collect();
        let mut layout = GridLayout {
            width,
            height,
            tile_size,
            walkable,
            samples: Vec::new(),
        };
        layout.samples = collect_samples(&layout);

        if layout.samples.is_empty() {
            warn!(width, height, "terrain contains no walkable tile");
        } else {
            debug!(
                width,
                height,
                tile_size,
                samples = layout.samples.len(),
                "walkability grid initialized"
            );
        }

        self.layout = Some(layout);
        Ok(())
    }

    /// Adapter for terrain delivered row by row.
    pub fn initialize_from_rows<I, R>(&mut self, rows: I, tile_size: f32) -> Result<(), GridError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u32]>,
    {
        let mut tiles = Vec::new();
        let mut width = None;
        let mut height = 0usize;

        for (row_index, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            let expected = *width.get_or_insert(row.len());
            if row.len() != expected {
                return Err(GridError::RaggedRow {
                    row: row_index,
                    expected,
                    actual: row.len(),
                });
            }
            tiles.extend_from_slice(row);
            height += 1;
        }

        let width = u32::try_from(width.unwrap_or(0)).unwrap_or(u32::MAX);
        let height = u32::try_from(height).unwrap_or(u32::MAX);
        self.initialize(tiles, width, height, tile_size)
    }

    /// Reports whether terrain data is loaded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    /// Width and height in tiles, if terrain is loaded.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.layout
            .as_ref()
            .map(|layout| (layout.width, layout.height))
    }

    /// Edge length of a tile, if terrain is loaded.
    #[must_use]
    pub fn tile_size(&self) -> Option<f32> {
        self.layout.as_ref().map(|layout| layout.tile_size)
    }

    /// Cached walkable sample points.
    #[must_use]
    pub fn walkable_samples(&self) -> &[Vec2] {
        self.layout
            .as_ref()
            .map_or(&[], |layout| layout.samples.as_slice())
    }

    /// Reports whether the point lies on a walkable tile.
    ///
    /// Out-of-bounds points are unwalkable once terrain is loaded.
    #[must_use]
    pub fn is_walkable(&self, point: Vec2) -> bool {
        let Some(layout) = &self.layout else {
            return true;
        };
        layout
            .tile_of(point)
            .map_or(false, |(column, row)| layout.is_tile_walkable(column, row))
    }

    /// Finds the closest walkable tile center by expanding square rings.
    ///
    /// The containing tile is returned when walkable. Otherwise rings of radius
    /// `1..=max_radius` are scanned in a fixed order: top edge left to right,
    /// bottom edge left to right, left edge top to bottom, right edge top to
    /// bottom. The first walkable cell wins, which is not necessarily the
    /// Euclidean nearest. When no ring hits, a random cached walkable point is
    /// returned instead. `None` means the terrain has no walkable tile at all.
    pub fn nearest_walkable<R: Rng + ?Sized>(
        &self,
        point: Vec2,
        max_radius: u32,
        rng: &mut R,
    ) -> Option<Vec2> {
        let Some(layout) = &self.layout else {
            return Some(point);
        };

        if let Some((column, row)) = layout.tile_of(point) {
            if layout.is_tile_walkable(column, row) {
                return Some(layout.center(column, row));
            }

            for radius in 1..=i64::from(max_radius) {
                for (dx, dy) in ring_offsets(radius) {
                    let (Some(x), Some(y)) = (column.checked_add(dx), row.checked_add(dy)) else {
                        continue;
                    };
                    if layout.is_tile_walkable(x, y) {
                        return Some(layout.center(x, y));
                    }
                }
            }
        }

        self.random_walkable_point(rng)
    }

    /// Rejection-samples a walkable point in the annulus around `center`.
    ///
    /// Falls back to a random cached walkable point after `max_attempts`
    /// misses.
    pub fn random_near<R: Rng + ?Sized>(
        &self,
        center: Vec2,
        min_distance: f32,
        max_distance: f32,
        max_attempts: u32,
        rng: &mut R,
    ) -> Option<Vec2> {
        let low = min_distance.max(0.0);
        let high = max_distance.max(low);

        for _ in 0..max_attempts {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = if high > low {
                rng.gen_range(low..high)
            } else {
                low
            };
            let candidate = center + Vec2::from_angle(angle) * distance;
            if self.is_walkable(candidate) {
                return Some(candidate);
            }
        }

        if self.layout.is_none() {
            return Some(center);
        }
        self.random_walkable_point(rng)
    }

    /// Uniformly random point from the walkable sample cache.
    pub fn random_walkable_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec2> {
        self.walkable_samples().choose(rng).copied()
    }
}

fn collect_samples(layout: &GridLayout) -> Vec<Vec2> {
    let walkable_count = layout.walkable.iter().filter(|walkable| **walkable).count();
    if walkable_count == 0 {
        return Vec::new();
    }

    let stride = walkable_count.div_ceil(MAX_WALKABLE_SAMPLES).max(1);
    let width = layout.width as usize;

    layout
        .walkable
        .iter()
        .enumerate()
        .filter(|(_, walkable)| **walkable)
        .step_by(stride)
        .map(|(index, _)| {
            let column = (index % width) as i64;
            let row = (index / width) as i64;
            layout.center(column, row)
        })
        .collect()
}

fn ring_offsets(radius: i64) -> impl Iterator<Item = (i64, i64)> {
    let top = (-radius..=radius).map(move |dx| (dx, -radius));
    let bottom = (-radius..=radius).map(move |dx| (dx, radius));
    let left = (-radius + 1..radius).map(move |dy| (-radius, dy));
    let right = (-radius + 1..radius).map(move |dy| (radius, dy));
    top.chain(bottom).chain(left).chain(right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const WALL: u32 = 1;

    fn grid(rows: &[&[u32]]) -> WalkabilityGrid {
        let mut grid = WalkabilityGrid::new(TilePalette::with_blocked([WALL]));
        grid.initialize_from_rows(rows.iter().copied(), 10.0)
            .expect("rectangular rows");
        grid
    }

    #[test]
    fn ring_offsets_cover_the_perimeter_once() {
        for radius in 1..5 {
            let offsets: Vec<_> = ring_offsets(radius).collect();
            assert_eq!(offsets.len() as i64, 8 * radius);
            let unique: BTreeSet<_> = offsets.iter().copied().collect();
            assert_eq!(unique.len(), offsets.len());
            assert!(offsets
                .iter()
                .all(|(dx, dy)| dx.abs() == radius || dy.abs() == radius));
        }
    }

    #[test]
    fn ring_scan_order_is_fixed() {
        let offsets: Vec<_> = ring_offsets(1).collect();
        assert_eq!(
            offsets,
            vec![
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 1),
                (0, 1),
                (1, 1),
                (-1, 0),
                (1, 0),
            ]
        );
    }

    #[test]
    fn uninitialized_grid_is_permissive() {
        let grid = WalkabilityGrid::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let point = Vec2::new(-1_000.0, 55.5);
        assert!(grid.is_walkable(point));
        assert_eq!(grid.nearest_walkable(point, 4, &mut rng), Some(point));
        assert!(grid
            .random_near(Vec2::ZERO, 10.0, 20.0, 1, &mut rng)
            .is_some());
    }

    #[test]
    fn dimension_mismatch_fails_fast() {
        let mut grid = WalkabilityGrid::default();
        let result = grid.initialize(vec![0; 5], 2, 3, 16.0);
        assert_eq!(
            result,
            Err(GridError::DimensionMismatch {
                width: 2,
                height: 3,
                expected: 6,
                actual: 5,
            })
        );
        assert!(!grid.is_initialized());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut grid = WalkabilityGrid::default();
        let rows: [&[u32]; 2] = [&[0, 0, 0], &[0, 0]];
        assert_eq!(
            grid.initialize_from_rows(rows, 8.0),
            Err(GridError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn malformed_payload_falls_back_to_permissive() {
        let mut grid = WalkabilityGrid::default();
        grid.initialize(vec![1, 1, 1, 1], 2, 2, 0.0)
            .expect("dimensions agree");
        assert!(!grid.is_initialized());

        grid.initialize(Vec::new(), 0, 0, 16.0)
            .expect("dimensions agree");
        assert!(!grid.is_initialized());
        assert!(grid.is_walkable(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn out_of_bounds_is_unwalkable() {
        let grid = grid(&[&[0, 0], &[0, 0]]);
        assert!(grid.is_walkable(Vec2::new(5.0, 5.0)));
        assert!(!grid.is_walkable(Vec2::new(-0.1, 5.0)));
        assert!(!grid.is_walkable(Vec2::new(5.0, 20.0)));
        assert!(!grid.is_walkable(Vec2::new(f32::NAN, 5.0)));
    }

    #[test]
    fn nearest_walkable_prefers_first_ring_hit() {
        let grid = grid(&[&[1, 1, 1], &[1, 1, 0], &[0, 1, 1]]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let found = grid
            .nearest_walkable(Vec2::new(15.0, 15.0), 1, &mut rng)
            .expect("walkable tile exists");
        // Bottom edge is scanned before the right edge.
        assert_eq!(found, Vec2::new(5.0, 25.0));
    }

    #[test]
    fn nearest_walkable_returns_center_of_walkable_tile() {
        let grid = grid(&[&[0, 0], &[0, 0]]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(
            grid.nearest_walkable(Vec2::new(12.0, 3.0), 2, &mut rng),
            Some(Vec2::new(15.0, 5.0))
        );
    }

    #[test]
    fn nearest_walkable_falls_back_to_sample_cache() {
        let mut rows = vec![vec![WALL; 12]; 12];
        rows[11][11] = 0;
        let mut grid = WalkabilityGrid::new(TilePalette::with_blocked([WALL]));
        grid.initialize_from_rows(&rows, 10.0).expect("rectangular");
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let found = grid
            .nearest_walkable(Vec2::new(5.0, 5.0), 3, &mut rng)
            .expect("one walkable tile");
        assert_eq!(found, Vec2::new(115.0, 115.0));
        assert!(grid.is_walkable(found));
    }

    #[test]
    fn nearest_walkable_handles_points_far_outside_the_grid() {
        let grid = grid(&[&[0, 1], &[1, 1]]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for point in [
            Vec2::new(1.0e20, 0.0),
            Vec2::new(-1.0e20, 1.0e20),
            Vec2::new(f32::MAX, f32::MIN),
        ] {
            assert_eq!(
                grid.nearest_walkable(point, 4, &mut rng),
                Some(Vec2::new(5.0, 5.0))
            );
        }
    }

    #[test]
    fn nearest_walkable_is_none_without_walkable_tiles() {
        let grid = grid(&[&[1, 1], &[1, 1]]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(grid.nearest_walkable(Vec2::new(5.0, 5.0), 4, &mut rng).is_none());
        assert!(grid.random_near(Vec2::ZERO, 1.0, 5.0, 8, &mut rng).is_none());
    }

    #[test]
    fn nearest_walkable_never_returns_blocked_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xfeed);
        for _ in 0..50 {
            let rows: Vec<Vec<u32>> = (0..16)
                .map(|_| {
                    (0..16)
                        .map(|_| if rng.gen_bool(0.8) { WALL } else { 0 })
                        .collect()
                })
                .collect();
            let mut grid = WalkabilityGrid::new(TilePalette::with_blocked([WALL]));
            grid.initialize_from_rows(&rows, 8.0).expect("rectangular");

            for _ in 0..40 {
                let probe = Vec2::new(rng.gen_range(0.0..128.0), rng.gen_range(0.0..128.0));
                match grid.nearest_walkable(probe, 3, &mut rng) {
                    Some(found) => assert!(grid.is_walkable(found)),
                    None => assert!(grid.walkable_samples().is_empty()),
                }
            }
        }
    }

    #[test]
    fn random_near_stays_in_annulus_when_terrain_allows() {
        let rows = vec![vec![0u32; 40]; 40];
        let mut grid = WalkabilityGrid::new(TilePalette::with_blocked([WALL]));
        grid.initialize_from_rows(&rows, 10.0).expect("rectangular");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let center = Vec2::new(200.0, 200.0);

        for _ in 0..200 {
            let point = grid
                .random_near(center, 50.0, 100.0, 16, &mut rng)
                .expect("open terrain");
            let distance = point.distance(center);
            assert!((50.0 - 1e-3..=100.0 + 1e-3).contains(&distance));
            assert!(grid.is_walkable(point));
        }
    }

    #[test]
    fn sample_cache_is_bounded() {
        let rows = vec![vec![0u32; 100]; 100];
        let mut grid = WalkabilityGrid::default();
        grid.initialize_from_rows(&rows, 1.0).expect("rectangular");
        assert!(grid.walkable_samples().len() <= MAX_WALKABLE_SAMPLES);
        assert!(!grid.walkable_samples().is_empty());
    }
}
