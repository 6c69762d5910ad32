#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence engine.
//!
//! This crate defines the vocabulary that connects the grid engine to its
//! hosts: pixel-space positions, cell coordinates, facings, zone bands, the
//! clamped sub-cell scale, obstacle identifiers, path steps, search requests
//! and outcomes, and the typed errors the engine can return. The engine crate
//! owns all mutable state; everything here is an immutable value.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the scenario harness boots.
pub const WELCOME_BANNER: &str = "Lane Defence.";

/// Cardinal facing carried by moving units and path steps.
///
/// Variants are ordered clockwise starting from `Up`; this order is also the
/// deterministic neighbor-expansion order of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing column indices.
    Right,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
}

impl Facing {
    /// All facings in their canonical clockwise order.
    pub const ALL: [Facing; 4] = [Facing::Up, Facing::Right, Facing::Down, Facing::Left];

    /// Stable index of the facing within facing-keyed tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Facing::Up => 0,
            Facing::Right => 1,
            Facing::Down => 2,
            Facing::Left => 3,
        }
    }

    /// Unit offset of one step in this facing, as `(column, row)` deltas.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Facing::Up => (0, -1),
            Facing::Right => (1, 0),
            Facing::Down => (0, 1),
            Facing::Left => (-1, 0),
        }
    }

    /// Facing pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Facing {
        match self {
            Facing::Up => Facing::Down,
            Facing::Right => Facing::Left,
            Facing::Down => Facing::Up,
            Facing::Left => Facing::Right,
        }
    }
}

/// Classification of a cell's row band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Units appear here; obstacles may never occupy these rows.
    Spawn,
    /// Players may place obstacles here.
    Building,
    /// Reaching here removes or transfers the unit; obstacles are forbidden.
    Death,
}

/// Heights, in rows, of the spawn, building, and death bands of a grid.
///
/// Bands partition the grid top to bottom in this order. Whether the bands
/// actually cover the grid is validated at grid construction, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneBands {
    spawn: u32,
    building: u32,
    death: u32,
}

impl ZoneBands {
    /// Creates a new band description from individual heights.
    #[must_use]
    pub const fn new(spawn: u32, building: u32, death: u32) -> Self {
        Self {
            spawn,
            building,
            death,
        }
    }

    /// Rows in the spawn band.
    #[must_use]
    pub const fn spawn(&self) -> u32 {
        self.spawn
    }

    /// Rows in the building band.
    #[must_use]
    pub const fn building(&self) -> u32 {
        self.building
    }

    /// Rows in the death band.
    #[must_use]
    pub const fn death(&self) -> u32 {
        self.death
    }

    /// Total rows covered by all three bands.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.spawn + self.building + self.death
    }

    /// Zone of the provided row, or `None` when the row lies below all bands.
    #[must_use]
    pub const fn zone_of_row(&self, row: u32) -> Option<Zone> {
        if row < self.spawn {
            Some(Zone::Spawn)
        } else if row < self.spawn + self.building {
            Some(Zone::Building)
        } else if row < self.total() {
            Some(Zone::Death)
        } else {
            None
        }
    }
}

/// Pixels per cell edge.
///
/// The only constructor clamps its input, so a scale below 1 cannot exist;
/// lattice arithmetic divides by the scale and relies on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scale(u32);

impl Scale {
    /// Scale of one pixel per cell, where sub-cell expansion is a no-op.
    pub const ONE: Scale = Scale(1);

    /// Creates a scale, coercing any value below 1 up to 1.
    #[must_use]
    pub const fn clamped(value: i32) -> Self {
        if value < 1 {
            Scale(1)
        } else {
            Scale(value as u32)
        }
    }

    /// Retrieves the scale in pixels per cell.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Traversal capability of a routed unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// Routes around obstacle-occupied cells.
    Ground,
    /// Ignores obstacles and descends in a straight vertical line.
    Flying,
}

/// Opaque identifier of a placed obstacle, allocated by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Point in a grid's pixel space.
///
/// Positions are measured from the host's coordinate origin, not the grid's:
/// the grid's own pixel offset is part of its lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new pixel-space position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal pixel coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical pixel coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

/// Axis-aligned rectangle expressed in pixel space.
///
/// Obstacle footprints arrive in pixels; the grid converts them to cell spans
/// through its scale during placement validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    origin: Position,
    width: u32,
    height: u32,
}

impl PixelRect {
    /// Constructs a rectangle from an upper-left origin and pixel dimensions.
    #[must_use]
    pub const fn new(origin: Position, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Upper-left corner that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> Position {
        self.origin
    }

    /// Width of the rectangle in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// One point of a computed route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// Pixel-space position the unit occupies at this step.
    pub position: Position,
    /// Facing the unit shows while occupying this step.
    pub facing: Facing,
}

impl PathStep {
    /// Creates a new path step.
    #[must_use]
    pub const fn new(position: Position, facing: Facing) -> Self {
        Self { position, facing }
    }
}

/// Ordered sequence of steps from a source position toward a target.
///
/// An empty path means the target was unreachable; consumers pop one step per
/// simulation tick and never restart a partially consumed path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// Creates a path from an already ordered step sequence.
    #[must_use]
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Steps of the path in travel order.
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the path holds no steps, meaning no route exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consumes the path, yielding the underlying steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<PathStep> {
        self.steps
    }
}

/// Parameters of a single path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathRequest {
    /// Exact pixel position the route starts from; may sit between lattice
    /// points when the unit is mid-hop.
    pub source: Position,
    /// Facing the unit currently shows; annotates the first step.
    pub facing: Facing,
    /// Pixels the unit advances per simulation tick; spaces expanded
    /// sub-steps.
    pub speed: NonZeroU32,
    /// Pixel position of the destination cell.
    pub target: Position,
    /// Traversal capability of the unit being routed.
    pub traversal: Traversal,
    /// Routes to the nearest blocking obstacle when the target is
    /// unreachable.
    pub attacker: bool,
    /// Expands cell hops into per-tick sub-steps when the scale exceeds 1.
    pub expand_substeps: bool,
}

impl PathRequest {
    /// Creates a request with unit speed and no attacker or sub-step options.
    #[must_use]
    pub const fn new(
        source: Position,
        facing: Facing,
        target: Position,
        traversal: Traversal,
    ) -> Self {
        Self {
            source,
            facing,
            speed: NonZeroU32::MIN,
            target,
            traversal,
            attacker: false,
            expand_substeps: false,
        }
    }
}

/// Result of a single path search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Computed route; empty when no route exists.
    pub path: Path,
    /// Obstacle the route leads to when attacker interception applied.
    pub obstacle: Option<ObstacleId>,
    /// Cells the frontier expanded; drops sharply when a cached suffix was
    /// reused.
    pub expanded: u32,
}

impl SearchOutcome {
    /// Outcome representing an unreachable target.
    #[must_use]
    pub fn unreachable(expanded: u32) -> Self {
        Self {
            path: Path::default(),
            obstacle: None,
            expanded,
        }
    }
}

/// Reasons grid construction may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ZoneLayoutError {
    /// The zone bands do not sum to the grid's row extent.
    #[error("zone bands cover {covered} rows but the grid spans {rows}")]
    BandMismatch {
        /// Rows the grid spans vertically.
        rows: u32,
        /// Rows covered by the three bands together.
        covered: u32,
    },
    /// A zone band spans zero rows, leaving the grid without that zone.
    #[error("the {zone:?} band must span at least one row")]
    EmptyBand {
        /// Zone whose band was empty.
        zone: Zone,
    },
    /// The grid spans zero columns and therefore contains no cells.
    #[error("the grid must span at least one column")]
    ZeroColumns,
}

/// Reasons an obstacle placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The footprint is empty, misaligned, or extends beyond the grid.
    #[error("obstacle footprint falls outside the grid lattice")]
    OutOfBounds,
    /// The footprint overlaps an obstacle or a protected zone.
    #[error("obstacle footprint overlaps an obstacle or a protected zone")]
    InvalidPosition,
    /// The footprint would sever every route from the spawn rows to the exit.
    #[error("obstacle would block every route to the exit")]
    BlocksExit,
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, Facing, ObstacleId, PathStep, PixelRect, PlacementError, Position, Scale, Zone,
        ZoneBands, ZoneLayoutError,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn scale_clamps_non_positive_values_to_one() {
        assert_eq!(Scale::clamped(0).get(), 1);
        assert_eq!(Scale::clamped(-16).get(), 1);
        assert_eq!(Scale::clamped(1).get(), 1);
        assert_eq!(Scale::clamped(16).get(), 16);
    }

    #[test]
    fn zone_bands_partition_rows_in_order() {
        let bands = ZoneBands::new(2, 3, 1);
        assert_eq!(bands.total(), 6);
        assert_eq!(bands.zone_of_row(0), Some(Zone::Spawn));
        assert_eq!(bands.zone_of_row(1), Some(Zone::Spawn));
        assert_eq!(bands.zone_of_row(2), Some(Zone::Building));
        assert_eq!(bands.zone_of_row(4), Some(Zone::Building));
        assert_eq!(bands.zone_of_row(5), Some(Zone::Death));
        assert_eq!(bands.zone_of_row(6), None);
    }

    #[test]
    fn facing_offsets_cancel_against_opposites() {
        for facing in Facing::ALL {
            let (dx, dy) = facing.offset();
            let (ox, oy) = facing.opposite().offset();
            assert_eq!(dx + ox, 0);
            assert_eq!(dy + oy, 0);
        }
    }

    #[test]
    fn facing_indices_are_unique_and_dense() {
        let mut seen = [false; 4];
        for facing in Facing::ALL {
            assert!(!seen[facing.index()], "facing index {facing:?} repeated");
            seen[facing.index()] = true;
        }
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn obstacle_id_round_trips_through_bincode() {
        assert_round_trip(&ObstacleId::new(42));
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(5, 7));
    }

    #[test]
    fn path_step_round_trips_through_bincode() {
        let step = PathStep::new(Position::new(-3, 128), Facing::Left);
        assert_round_trip(&step);
    }

    #[test]
    fn pixel_rect_round_trips_through_bincode() {
        let rect = PixelRect::new(Position::new(32, 48), 32, 32);
        assert_round_trip(&rect);
    }

    #[test]
    fn zone_bands_round_trip_through_bincode() {
        assert_round_trip(&ZoneBands::new(2, 5, 2));
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::BlocksExit);
    }

    #[test]
    fn zone_layout_error_round_trips_through_bincode() {
        assert_round_trip(&ZoneLayoutError::BandMismatch {
            rows: 9,
            covered: 8,
        });
    }

    #[test]
    fn placement_error_messages_name_the_rejection() {
        assert_eq!(
            PlacementError::BlocksExit.to_string(),
            "obstacle would block every route to the exit"
        );
        assert_eq!(
            ZoneLayoutError::ZeroColumns.to_string(),
            "the grid must span at least one column"
        );
    }
}
