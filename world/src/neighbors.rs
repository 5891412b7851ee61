//! Uniform-bucket enumeration of nearby mob pairs.

use std::collections::BTreeMap;

use horde_core::Vec2;

/// Lists index pairs whose buckets touch.
///
/// Each position is hashed into a square bucket of `cell_size`; a pair is a
/// candidate when the buckets are equal or adjacent, so every pair closer than
/// `cell_size` is guaranteed to be listed. Pairs hold the lower index first.
pub(crate) fn candidate_pairs(positions: &[Vec2], cell_size: f32) -> Vec<(usize, usize)> {
    if positions.len() < 2 {
        return Vec::new();
    }
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return all_pairs(positions.len());
    }

    let mut buckets: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (index, position) in positions.iter().enumerate() {
        buckets.entry(bucket_of(*position, cell_size)).or_default().push(index);
    }

    let mut pairs = Vec::new();
    for (&(column, row), members) in &buckets {
        for (offset, first) in members.iter().enumerate() {
            for second in &members[offset + 1..] {
                pairs.push(ordered(*first, *second));
            }
        }

        // Visit half of the neighborhood so each bucket pair is seen once.
        for (dx, dy) in [(1, -1), (1, 0), (1, 1), (0, 1)] {
            let (Some(next_column), Some(next_row)) = (column.checked_add(dx), row.checked_add(dy))
            else {
                continue;
            };
            let Some(others) = buckets.get(&(next_column, next_row)) else {
                continue;
            };
            for first in members {
                for second in others {
                    pairs.push(ordered(*first, *second));
                }
            }
        }
    }

    pairs.sort_unstable();
    pairs
}

fn bucket_of(position: Vec2, cell_size: f32) -> (i64, i64) {
    if !position.is_finite() {
        return (i64::MIN, i64::MIN);
    }
    (
        (position.x / cell_size).floor() as i64,
        (position.y / cell_size).floor() as i64,
    )
}

fn all_pairs(len: usize) -> Vec<(usize, usize)> {
    (0..len)
        .flat_map(|first| (first + 1..len).map(move |second| (first, second)))
        .collect()
}

fn ordered(first: usize, second: usize) -> (usize, usize) {
    if first <= second {
        (first, second)
    } else {
        (second, first)
    }
}
