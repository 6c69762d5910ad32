#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid engine of Lane Defence: a zoned cell graph, transactional obstacle
//! placement, and memoized uniform-cost routing in pixel space.
//!
//! The [`Grid`] owns every mutable piece of the engine: obstacle occupancy
//! and the per-cell next-step cache. Hosts speak pixel coordinates; cells
//! exist only behind the lattice arithmetic of this crate. Placement is
//! transactional: a request that would seal the exit off from the spawn rows
//! is rejected without touching the live cells.

mod cells;
mod search;

use lane_defence_core::{
    CellCoord, Facing, ObstacleId, Path, PathRequest, PathStep, PixelRect, PlacementError,
    Position, Scale, SearchOutcome, Traversal, Zone, ZoneBands, ZoneLayoutError,
};
use rand::Rng;

use crate::cells::{CachedStep, CellArena};
use crate::search::{Hop, Route};

/// Construction parameters of a [`Grid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    /// Pixel position of the upper-left corner of the grid.
    pub origin: Position,
    /// Width of the grid in cells.
    pub columns: u32,
    /// Height of the grid in cells.
    pub rows: u32,
    /// Pixels per cell edge.
    pub scale: Scale,
    /// Row heights of the spawn, building, and death bands.
    pub bands: ZoneBands,
}

impl GridSpec {
    /// Bundles grid construction parameters.
    #[must_use]
    pub const fn new(
        origin: Position,
        columns: u32,
        rows: u32,
        scale: Scale,
        bands: ZoneBands,
    ) -> Self {
        Self {
            origin,
            columns,
            rows,
            scale,
            bands,
        }
    }
}

/// Zoned cell grid with obstacle occupancy and memoized routing.
///
/// Rows split top to bottom into a spawn band, a building band, and a death
/// band. Units appear on the top row, walk toward the exit cell on the first
/// death row, and obstacles may only ever occupy building cells. Every
/// successful occupancy change wipes the next-step cache.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    origin: Position,
    scale: Scale,
    bands: ZoneBands,
    target: CellCoord,
    arena: CellArena,
}

impl Grid {
    /// Builds a grid from its layout description.
    ///
    /// Every band must span at least one row and the bands together must
    /// cover the grid's vertical extent exactly.
    pub fn new(spec: GridSpec) -> Result<Grid, ZoneLayoutError> {
        if spec.columns == 0 {
            return Err(ZoneLayoutError::ZeroColumns);
        }
        for (zone, rows) in [
            (Zone::Spawn, spec.bands.spawn()),
            (Zone::Building, spec.bands.building()),
            (Zone::Death, spec.bands.death()),
        ] {
            if rows == 0 {
                return Err(ZoneLayoutError::EmptyBand { zone });
            }
        }
        if spec.bands.total() != spec.rows {
            return Err(ZoneLayoutError::BandMismatch {
                rows: spec.rows,
                covered: spec.bands.total(),
            });
        }
        let target = CellCoord::new(
            center_column(spec.columns),
            spec.bands.spawn() + spec.bands.building(),
        );
        Ok(Grid {
            origin: spec.origin,
            scale: spec.scale,
            bands: spec.bands,
            target,
            arena: CellArena::new(spec.columns, spec.rows, spec.bands),
        })
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.arena.columns()
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.arena.rows()
    }

    /// Pixels per cell edge.
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Pixel position of the upper-left corner of the grid.
    #[must_use]
    pub const fn origin(&self) -> Position {
        self.origin
    }

    /// Row heights of the three zone bands.
    #[must_use]
    pub const fn bands(&self) -> ZoneBands {
        self.bands
    }

    /// Exit cell on the first death row, horizontally centered.
    #[must_use]
    pub const fn target_cell(&self) -> CellCoord {
        self.target
    }

    /// Pixel position of the exit cell.
    #[must_use]
    pub fn target_position(&self) -> Position {
        self.lattice(self.target)
    }

    /// Cell whose lattice point is exactly `position`.
    ///
    /// Positions between lattice points resolve to `None`; use [`cell_of`]
    /// for the containing cell instead.
    ///
    /// [`cell_of`]: Grid::cell_of
    #[must_use]
    pub fn cell_at(&self, position: Position) -> Option<CellCoord> {
        let (dx, dy) = self.grid_offset(position)?;
        let step = i32::try_from(self.scale.get()).ok()?;
        if dx % step != 0 || dy % step != 0 {
            return None;
        }
        self.cell_of(position)
    }

    /// Cell containing `position`, mid-cell pixels included.
    #[must_use]
    pub fn cell_of(&self, position: Position) -> Option<CellCoord> {
        let (dx, dy) = self.grid_offset(position)?;
        let step = i32::try_from(self.scale.get()).ok()?;
        let cell = CellCoord::new(
            u32::try_from(dx / step).ok()?,
            u32::try_from(dy / step).ok()?,
        );
        (cell.column() < self.columns() && cell.row() < self.rows()).then_some(cell)
    }

    /// Pixel position of the upper-left lattice point of `cell`.
    #[must_use]
    pub fn position_of(&self, cell: CellCoord) -> Option<Position> {
        (cell.column() < self.columns() && cell.row() < self.rows()).then(|| self.lattice(cell))
    }

    /// Zone of the cell containing `position`.
    #[must_use]
    pub fn zone_at(&self, position: Position) -> Option<Zone> {
        let slot = self.slot_of(position)?;
        Some(self.arena.zone(slot))
    }

    /// Obstacle occupying the cell containing `position`, if any.
    #[must_use]
    pub fn obstacle_at(&self, position: Position) -> Option<ObstacleId> {
        let slot = self.slot_of(position)?;
        self.arena.obstacle(slot)
    }

    /// Remembered next step of `cell` toward the last solved target.
    #[must_use]
    pub fn cached_step(&self, cell: CellCoord) -> Option<(CellCoord, Facing)> {
        let slot = self.arena.index(cell)?;
        let step = self.arena.cached(slot)?;
        Some((self.arena.coord(step.next), step.facing))
    }

    /// Picks a uniformly random spawn-band cell and returns its pixel
    /// position.
    pub fn random_spawn_cell<R: Rng>(&self, rng: &mut R) -> Position {
        let columns = u64::from(self.columns());
        let candidates = u64::from(self.bands.spawn()) * columns;
        let pick = rng.gen_range(0..candidates);
        self.lattice(CellCoord::new(
            (pick % columns) as u32,
            (pick / columns) as u32,
        ))
    }

    /// Reports whether `footprint` could be placed right now.
    ///
    /// Runs the same validation as [`place`](Grid::place) without committing
    /// anything; the identifier does not affect the verdict.
    #[must_use]
    pub fn can_place(&self, id: ObstacleId, footprint: PixelRect) -> bool {
        let _ = id;
        self.validate_placement(footprint).is_ok()
    }

    /// Places an obstacle covering `footprint`, marking every covered cell.
    ///
    /// The footprint's origin must sit exactly on a lattice point; widths and
    /// heights round up to whole cells. Placement commits only when every
    /// covered cell is a free building cell and at least one route from the
    /// spawn rows to the exit survives. On success the next-step cache is
    /// wiped grid-wide.
    pub fn place(&mut self, id: ObstacleId, footprint: PixelRect) -> Result<(), PlacementError> {
        let covered = self.validate_placement(footprint)?;
        for &slot in &covered {
            self.arena.set_obstacle(slot, id);
        }
        self.arena.wipe_cache();
        Ok(())
    }

    /// Removes every cell of the obstacle `id`.
    ///
    /// Returns whether anything was removed; the cache is wiped only when
    /// the occupancy actually changed.
    pub fn remove(&mut self, id: ObstacleId) -> bool {
        if self.arena.clear_obstacle(id) == 0 {
            return false;
        }
        self.arena.wipe_cache();
        true
    }

    /// Routes a unit per `request` and returns the outcome.
    ///
    /// Ground units walk cell to cell around obstacles; flying units descend
    /// in a straight vertical line through the source column and never
    /// consult occupancy. An unreachable target yields an empty path, not an
    /// error. Routes that reach the true target refresh the next-step cache
    /// along the way; attacker interceptions and flying descents do not.
    pub fn find_path(&mut self, request: &PathRequest) -> SearchOutcome {
        let Some(source) = self.cell_of(request.source) else {
            return SearchOutcome::unreachable(0);
        };
        let Some(target) = self.cell_of(request.target) else {
            return SearchOutcome::unreachable(0);
        };
        match request.traversal {
            Traversal::Flying => self.flying_outcome(request, source, target),
            Traversal::Ground => self.ground_outcome(request, source, target),
        }
    }

    fn ground_outcome(
        &mut self,
        request: &PathRequest,
        source: CellCoord,
        target: CellCoord,
    ) -> SearchOutcome {
        let (Some(start), Some(goal)) = (self.arena.index(source), self.arena.index(target))
        else {
            return SearchOutcome::unreachable(0);
        };
        let blocked = |slot: usize| self.arena.obstacle(slot).is_some();
        let (route, expanded) = search::route(
            &self.arena,
            &blocked,
            start,
            request.facing,
            goal,
            request.attacker,
        );
        match route {
            Route::Reached(hops) => {
                self.remember_route(&hops);
                SearchOutcome {
                    path: self.assemble(&hops, request),
                    obstacle: None,
                    expanded,
                }
            }
            Route::Intercepted(hops, id) => SearchOutcome {
                path: self.assemble(&hops, request),
                obstacle: Some(id),
                expanded,
            },
            Route::Unreachable => SearchOutcome::unreachable(expanded),
        }
    }

    fn flying_outcome(
        &self,
        request: &PathRequest,
        source: CellCoord,
        target: CellCoord,
    ) -> SearchOutcome {
        let Some(start) = self.arena.index(source) else {
            return SearchOutcome::unreachable(0);
        };
        let descent = if target.row() >= source.row() {
            Facing::Down
        } else {
            Facing::Up
        };
        let mut hops = vec![Hop {
            cell: start,
            facing: request.facing,
        }];
        let mut row = source.row();
        while row != target.row() {
            row = if target.row() > row { row + 1 } else { row - 1 };
            let Some(slot) = self.arena.index(CellCoord::new(source.column(), row)) else {
                break;
            };
            hops.push(Hop {
                cell: slot,
                facing: descent,
            });
        }
        SearchOutcome {
            path: self.assemble(&hops, request),
            obstacle: None,
            expanded: 0,
        }
    }

    /// Validates `footprint` and returns the arena slots it would cover.
    fn validate_placement(&self, footprint: PixelRect) -> Result<Vec<usize>, PlacementError> {
        let anchor = self
            .cell_at(footprint.origin())
            .ok_or(PlacementError::OutOfBounds)?;
        let scale = self.scale.get();
        let span_columns = footprint.width().div_ceil(scale);
        let span_rows = footprint.height().div_ceil(scale);
        if span_columns == 0 || span_rows == 0 {
            return Err(PlacementError::OutOfBounds);
        }
        let end_column = anchor
            .column()
            .checked_add(span_columns)
            .ok_or(PlacementError::OutOfBounds)?;
        let end_row = anchor
            .row()
            .checked_add(span_rows)
            .ok_or(PlacementError::OutOfBounds)?;
        if end_column > self.columns() || end_row > self.rows() {
            return Err(PlacementError::OutOfBounds);
        }

        let mut covered = Vec::new();
        for row in anchor.row()..end_row {
            for column in anchor.column()..end_column {
                let slot = self
                    .arena
                    .index(CellCoord::new(column, row))
                    .ok_or(PlacementError::OutOfBounds)?;
                if self.arena.obstacle(slot).is_some() || self.arena.zone(slot) != Zone::Building {
                    return Err(PlacementError::InvalidPosition);
                }
                covered.push(slot);
            }
        }

        if !self.exit_reachable_with(&covered) {
            return Err(PlacementError::BlocksExit);
        }
        Ok(covered)
    }

    /// Probes whether any top-row cell still reaches the exit when the
    /// `candidate` slots are treated as occupied.
    ///
    /// The live cells are never touched; the candidate set rides along as an
    /// overlay on the blocking predicate. Obstacles never stand in the spawn
    /// band, so one open entry column proves the whole band still routes.
    fn exit_reachable_with(&self, candidate: &[usize]) -> bool {
        let Some(goal) = self.arena.index(self.target) else {
            return false;
        };
        let blocked = |slot: usize| self.arena.obstacle(slot).is_some() || candidate.contains(&slot);
        for column in 0..self.columns() {
            let Some(entry) = self.arena.index(CellCoord::new(column, 0)) else {
                continue;
            };
            if blocked(entry) {
                continue;
            }
            let (route, _) = search::route(&self.arena, &blocked, entry, Facing::Down, goal, false);
            if matches!(route, Route::Reached(_)) {
                return true;
            }
        }
        false
    }

    fn remember_route(&mut self, hops: &[Hop]) {
        for pair in hops.windows(2) {
            self.arena.remember(
                pair[0].cell,
                CachedStep {
                    next: pair[1].cell,
                    facing: pair[1].facing,
                },
            );
        }
    }

    /// Converts arena hops into pixel steps.
    ///
    /// The first step always carries the request's exact source position and
    /// facing. With sub-step expansion on, each hop unrolls into `speed`
    /// pixel decrements anchored at the hop's destination; the walk of the
    /// first hop stops once it meets or passes the exact source, which then
    /// fronts the path.
    fn assemble(&self, hops: &[Hop], request: &PathRequest) -> Path {
        if hops.is_empty() {
            return Path::default();
        }
        if !request.expand_substeps {
            let mut steps = Vec::with_capacity(hops.len());
            steps.push(PathStep::new(request.source, request.facing));
            for hop in &hops[1..] {
                steps.push(PathStep::new(
                    self.lattice(self.arena.coord(hop.cell)),
                    hop.facing,
                ));
            }
            return Path::from_steps(steps);
        }

        let speed = i32::try_from(request.speed.get()).unwrap_or(i32::MAX);
        let mut reversed = Vec::new();
        for pair in hops.windows(2).skip(1).rev() {
            let into = pair[1];
            let from_position = self.lattice(self.arena.coord(pair[0].cell));
            let mut cursor = self.lattice(self.arena.coord(into.cell));
            while cursor != from_position {
                reversed.push(PathStep::new(cursor, into.facing));
                cursor = step_toward(cursor, from_position, speed);
            }
        }
        if let Some(pair) = hops.windows(2).next() {
            let into = pair[1];
            let from_position = self.lattice(self.arena.coord(pair[0].cell));
            let mut cursor = self.lattice(self.arena.coord(into.cell));
            while cursor != from_position && ahead_of(cursor, request.source, into.facing) {
                reversed.push(PathStep::new(cursor, into.facing));
                cursor = step_toward(cursor, from_position, speed);
            }
        }
        reversed.push(PathStep::new(request.source, request.facing));
        reversed.reverse();
        Path::from_steps(reversed)
    }

    fn grid_offset(&self, position: Position) -> Option<(i32, i32)> {
        let dx = position.x().checked_sub(self.origin.x())?;
        let dy = position.y().checked_sub(self.origin.y())?;
        (dx >= 0 && dy >= 0).then_some((dx, dy))
    }

    fn slot_of(&self, position: Position) -> Option<usize> {
        let cell = self.cell_of(position)?;
        self.arena.index(cell)
    }

    fn lattice(&self, cell: CellCoord) -> Position {
        let scale = i64::from(self.scale.get());
        let x = i64::from(self.origin.x()) + i64::from(cell.column()) * scale;
        let y = i64::from(self.origin.y()) + i64::from(cell.row()) * scale;
        Position::new(x as i32, y as i32)
    }
}

/// Column of the exit cell for a grid `columns` wide.
const fn center_column(columns: u32) -> u32 {
    if columns % 2 == 0 {
        (columns - 1) / 2
    } else {
        columns / 2
    }
}

/// Whether `cursor` still lies ahead of `source` along the travel axis of
/// `facing`.
fn ahead_of(cursor: Position, source: Position, facing: Facing) -> bool {
    match facing {
        Facing::Up => cursor.y() < source.y(),
        Facing::Right => cursor.x() > source.x(),
        Facing::Down => cursor.y() > source.y(),
        Facing::Left => cursor.x() < source.x(),
    }
}

/// Moves `from` up to `speed` pixels per axis toward `toward` without
/// overshooting.
fn step_toward(from: Position, toward: Position, speed: i32) -> Position {
    Position::new(
        advance_axis(from.x(), toward.x(), speed),
        advance_axis(from.y(), toward.y(), speed),
    )
}

fn advance_axis(from: i32, toward: i32, speed: i32) -> i32 {
    if from < toward {
        from.saturating_add(speed).min(toward)
    } else if from > toward {
        from.saturating_sub(speed).max(toward)
    } else {
        from
    }
}
