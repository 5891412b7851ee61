//! Plain-text terrain files: one row of tile indices per line.
//!
//! Blank lines and lines starting with `#` are skipped. Row lengths are
//! checked by the walkability grid, not here.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};

/// Reads and parses the terrain file at `path`.
pub(crate) fn load_rows(path: &Path) -> Result<Vec<Vec<u32>>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read terrain at {}", path.display()))?;
    parse_rows(&contents).with_context(|| format!("failed to parse terrain at {}", path.display()))
}

fn parse_rows(contents: &str) -> Result<Vec<Vec<u32>>> {
    let mut rows = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<u32>()
                    .with_context(|| format!("line {}: `{token}` is not a tile index", index + 1))
            })
            .collect::<Result<Vec<u32>>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("terrain contains no tile rows");
    }
    Ok(rows)
}
