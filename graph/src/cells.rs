//! Dense cell arena backing a [`Grid`](crate::Grid).
//!
//! Cells live in one flat row-major allocation. Zone labels and neighbor
//! links are wired once at construction and never change afterwards; obstacle
//! occupancy and the per-cell next-step cache are the only mutable state.

use lane_defence_core::{CellCoord, Facing, ObstacleId, Zone, ZoneBands};

/// One remembered hop toward the target of a previously solved route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CachedStep {
    /// Arena index of the next cell along the remembered route.
    pub(crate) next: usize,
    /// Facing of the hop into that cell.
    pub(crate) facing: Facing,
}

/// Flat arena of grid cells with precomputed neighbor links.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellArena {
    columns: u32,
    rows: u32,
    zones: Vec<Zone>,
    links: Vec<[Option<u32>; 4]>,
    obstacles: Vec<Option<ObstacleId>>,
    cached: Vec<Option<CachedStep>>,
}

impl CellArena {
    /// Builds an arena for `columns` by `rows` cells zoned per `bands`.
    ///
    /// Callers validate the layout first; `bands.total()` must equal `rows`.
    pub(crate) fn new(columns: u32, rows: u32, bands: ZoneBands) -> CellArena {
        let width = usize::try_from(columns).unwrap_or(0);
        let height = usize::try_from(rows).unwrap_or(0);
        let cell_count = width.saturating_mul(height);

        let mut zones = Vec::with_capacity(cell_count);
        for row in 0..rows {
            let zone = bands.zone_of_row(row).unwrap_or(Zone::Death);
            for _ in 0..columns {
                zones.push(zone);
            }
        }

        let mut links = vec![[None; 4]; cell_count];
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column, row);
                let Some(slot) = index(width, cell) else {
                    continue;
                };
                for facing in Facing::ALL {
                    links[slot][facing.index()] = neighbor(cell, facing, columns, rows)
                        .and_then(|next| index(width, next))
                        .and_then(|next| u32::try_from(next).ok());
                }
            }
        }

        CellArena {
            columns,
            rows,
            zones,
            links,
            obstacles: vec![None; cell_count],
            cached: vec![None; cell_count],
        }
    }

    /// Number of cells in the arena.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.zones.len()
    }

    /// Width of the arena in cells.
    #[must_use]
    pub(crate) const fn columns(&self) -> u32 {
        self.columns
    }

    /// Height of the arena in cells.
    #[must_use]
    pub(crate) const fn rows(&self) -> u32 {
        self.rows
    }

    /// Maps a cell coordinate to its arena index, if in bounds.
    #[must_use]
    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        index(usize::try_from(self.columns).unwrap_or(0), cell)
    }

    /// Maps an arena index back to its cell coordinate.
    #[must_use]
    pub(crate) fn coord(&self, slot: usize) -> CellCoord {
        let width = usize::try_from(self.columns).unwrap_or(1).max(1);
        CellCoord::new((slot % width) as u32, (slot / width) as u32)
    }

    /// Zone label of the cell at `slot`.
    #[must_use]
    pub(crate) fn zone(&self, slot: usize) -> Zone {
        self.zones[slot]
    }

    /// Arena index of the neighbor of `slot` in `facing`, if one exists.
    #[must_use]
    pub(crate) fn neighbor(&self, slot: usize, facing: Facing) -> Option<usize> {
        self.links[slot][facing.index()].map(|next| next as usize)
    }

    /// Obstacle occupying the cell at `slot`, if any.
    #[must_use]
    pub(crate) fn obstacle(&self, slot: usize) -> Option<ObstacleId> {
        self.obstacles[slot]
    }

    /// Marks the cell at `slot` as occupied by `id`.
    pub(crate) fn set_obstacle(&mut self, slot: usize, id: ObstacleId) {
        self.obstacles[slot] = Some(id);
    }

    /// Clears every cell occupied by `id` and returns how many there were.
    pub(crate) fn clear_obstacle(&mut self, id: ObstacleId) -> usize {
        let mut cleared = 0;
        for slot in &mut self.obstacles {
            if *slot == Some(id) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Remembered next step of the cell at `slot`, if any.
    #[must_use]
    pub(crate) fn cached(&self, slot: usize) -> Option<CachedStep> {
        self.cached[slot]
    }

    /// Records the next step of the cell at `slot`.
    pub(crate) fn remember(&mut self, slot: usize, step: CachedStep) {
        self.cached[slot] = Some(step);
    }

    /// Forgets every remembered step.
    ///
    /// Must run after each occupancy change; cached chains never outlive the
    /// topology they were solved against.
    pub(crate) fn wipe_cache(&mut self) {
        self.cached.fill(None);
    }
}

/// Maps a cell coordinate to a row-major index for a grid of `width` columns.
fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

/// Coordinate of the neighbor of `cell` in `facing`, if it stays on a grid
/// of `columns` by `rows` cells.
fn neighbor(cell: CellCoord, facing: Facing, columns: u32, rows: u32) -> Option<CellCoord> {
    match facing {
        Facing::Up => cell
            .row()
            .checked_sub(1)
            .map(|row| CellCoord::new(cell.column(), row)),
        Facing::Right => {
            let column = cell.column().checked_add(1)?;
            (column < columns).then_some(CellCoord::new(column, cell.row()))
        }
        Facing::Down => {
            let row = cell.row().checked_add(1)?;
            (row < rows).then_some(CellCoord::new(cell.column(), row))
        }
        Facing::Left => cell
            .column()
            .checked_sub(1)
            .map(|column| CellCoord::new(column, cell.row())),
    }
}
