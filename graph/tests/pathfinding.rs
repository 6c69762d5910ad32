use std::num::NonZeroU32;

use lane_defence_core::{
    CellCoord, Facing, ObstacleId, PathRequest, PathStep, PixelRect, Position, Scale, Traversal,
    ZoneBands,
};
use lane_defence_graph::{Grid, GridSpec};

fn unit_grid() -> Grid {
    Grid::new(GridSpec::new(
        Position::new(0, 0),
        3,
        3,
        Scale::ONE,
        ZoneBands::new(1, 1, 1),
    ))
    .expect("layout should be valid")
}

fn pocket_grid() -> (Grid, ObstacleId) {
    let mut grid = Grid::new(GridSpec::new(
        Position::new(0, 0),
        5,
        5,
        Scale::ONE,
        ZoneBands::new(1, 3, 1),
    ))
    .expect("layout should be valid");
    // Seals the cell (2, 2) off on all four sides.
    for (id, cell) in [
        (1, CellCoord::new(2, 1)),
        (2, CellCoord::new(1, 2)),
        (3, CellCoord::new(3, 2)),
        (4, CellCoord::new(2, 3)),
    ] {
        let origin = grid.position_of(cell).expect("cell is in bounds");
        grid.place(ObstacleId::new(id), PixelRect::new(origin, 1, 1))
            .expect("each wall alone keeps the exit open");
    }
    (grid, ObstacleId::new(1))
}

fn tall_grid() -> Grid {
    Grid::new(GridSpec::new(
        Position::new(0, 0),
        5,
        8,
        Scale::ONE,
        ZoneBands::new(1, 6, 1),
    ))
    .expect("layout should be valid")
}

fn lane_grid() -> Grid {
    Grid::new(GridSpec::new(
        Position::new(0, 0),
        1,
        3,
        Scale::clamped(16),
        ZoneBands::new(1, 1, 1),
    ))
    .expect("layout should be valid")
}

fn step(x: i32, y: i32, facing: Facing) -> PathStep {
    PathStep::new(Position::new(x, y), facing)
}

#[test]
fn ground_routes_detour_around_obstacles() {
    let mut grid = unit_grid();
    grid.place(
        ObstacleId::new(1),
        PixelRect::new(Position::new(0, 1), 1, 1),
    )
    .expect("placement should succeed");

    let request = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        Position::new(0, 2),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&request);

    assert_eq!(
        outcome.path.steps(),
        &[
            step(0, 0, Facing::Down),
            step(1, 0, Facing::Right),
            step(1, 1, Facing::Down),
            step(1, 2, Facing::Down),
            step(0, 2, Facing::Left),
        ],
    );
    assert_eq!(outcome.obstacle, None);
}

#[test]
fn flying_routes_descend_the_source_column() {
    let mut grid = unit_grid();
    grid.place(
        ObstacleId::new(1),
        PixelRect::new(Position::new(0, 1), 1, 1),
    )
    .expect("placement should succeed");

    let mut request = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        Position::new(2, 2),
        Traversal::Flying,
    );
    request.speed = NonZeroU32::new(3).expect("speed");
    let outcome = grid.find_path(&request);

    // The descent stays in the source column; the target's column is
    // irrelevant and the obstacle underneath is overflown.
    assert_eq!(
        outcome.path.steps(),
        &[
            step(0, 0, Facing::Down),
            step(0, 1, Facing::Down),
            step(0, 2, Facing::Down),
        ],
    );
    assert_eq!(outcome.expanded, 0);
    assert_eq!(grid.cached_step(CellCoord::new(0, 0)), None);
}

#[test]
fn flying_level_with_the_target_row_hovers_in_place() {
    let mut grid = unit_grid();
    let request = PathRequest::new(
        Position::new(1, 2),
        Facing::Left,
        Position::new(2, 2),
        Traversal::Flying,
    );
    let outcome = grid.find_path(&request);

    assert_eq!(outcome.path.steps(), &[step(1, 2, Facing::Left)]);
}

#[test]
fn sealed_units_get_an_empty_path() {
    let (mut grid, _) = pocket_grid();
    let request = PathRequest::new(
        Position::new(2, 2),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&request);

    assert!(outcome.path.is_empty(), "no route may exist out of the pocket");
    assert_eq!(outcome.obstacle, None);
}

#[test]
fn attackers_are_routed_onto_the_sealing_obstacle() {
    let (mut grid, first_wall) = pocket_grid();
    let mut request = PathRequest::new(
        Position::new(2, 2),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    request.attacker = true;
    let outcome = grid.find_path(&request);

    assert_eq!(
        outcome.path.steps(),
        &[step(2, 2, Facing::Down), step(2, 1, Facing::Up)],
    );
    assert_eq!(outcome.obstacle, Some(first_wall));
    assert_eq!(
        grid.cached_step(CellCoord::new(2, 2)),
        None,
        "interceptions must not populate the cache",
    );
}

#[test]
fn routes_to_the_target_populate_the_cache() {
    let mut grid = tall_grid();
    let request = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&request);
    let steps = outcome.path.steps();
    assert!(!steps.is_empty());

    for pair in steps.windows(2) {
        let cell = grid.cell_at(pair[0].position).expect("step is on the lattice");
        let next = grid.cell_at(pair[1].position).expect("step is on the lattice");
        assert_eq!(
            grid.cached_step(cell),
            Some((next, pair[1].facing)),
            "cell {cell:?} should remember its successor",
        );
    }
}

#[test]
fn repeated_searches_reuse_the_remembered_route() {
    let mut grid = tall_grid();
    let request = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );

    let cold = grid.find_path(&request);
    let warm = grid.find_path(&request);

    assert_eq!(warm.path, cold.path);
    assert!(
        warm.expanded < cold.expanded,
        "remembered chain should spare the frontier, {} vs {}",
        warm.expanded,
        cold.expanded,
    );
    assert_eq!(warm.expanded, 1, "only the source cell should expand");
}

#[test]
fn hop_optimal_routes_take_one_step_per_cell() {
    let mut grid = tall_grid();
    let source = CellCoord::new(4, 0);
    let request = PathRequest::new(
        grid.position_of(source).expect("cell is in bounds"),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&request);

    let distance = source.manhattan_distance(grid.target_cell());
    assert_eq!(outcome.path.len(), usize::try_from(distance).unwrap() + 1);
}

#[test]
fn substeps_advance_by_the_unit_speed() {
    let mut grid = lane_grid();
    let mut request = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    request.speed = NonZeroU32::new(4).expect("speed");
    request.expand_substeps = true;
    let outcome = grid.find_path(&request);

    let expected: Vec<PathStep> = (0..=8).map(|tick| step(0, tick * 4, Facing::Down)).collect();
    assert_eq!(outcome.path.steps(), expected.as_slice());
}

#[test]
fn substeps_resume_from_a_mid_cell_source() {
    let mut grid = lane_grid();
    let mut request = PathRequest::new(
        Position::new(0, 6),
        Facing::Left,
        grid.target_position(),
        Traversal::Ground,
    );
    request.speed = NonZeroU32::new(4).expect("speed");
    request.expand_substeps = true;
    let outcome = grid.find_path(&request);

    // The backward walk truncates at the exact source; the first step keeps
    // the unit's current facing.
    let mut expected = vec![step(0, 6, Facing::Left)];
    expected.extend((2..=8).map(|tick| step(0, tick * 4, Facing::Down)));
    assert_eq!(outcome.path.steps(), expected.as_slice());
}

#[test]
fn sources_and_targets_off_the_grid_are_unreachable() {
    let mut grid = unit_grid();

    let outside_source = PathRequest::new(
        Position::new(-1, 0),
        Facing::Down,
        grid.target_position(),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&outside_source);
    assert!(outcome.path.is_empty());
    assert_eq!(outcome.expanded, 0);

    let outside_target = PathRequest::new(
        Position::new(0, 0),
        Facing::Down,
        Position::new(3, 3),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&outside_target);
    assert!(outcome.path.is_empty());
    assert_eq!(outcome.expanded, 0);
}

#[test]
fn a_source_inside_the_target_cell_yields_a_single_step() {
    let mut grid = unit_grid();
    let request = PathRequest::new(
        grid.target_position(),
        Facing::Right,
        grid.target_position(),
        Traversal::Ground,
    );
    let outcome = grid.find_path(&request);

    assert_eq!(
        outcome.path.steps(),
        &[PathStep::new(grid.target_position(), Facing::Right)],
    );
    assert_eq!(outcome.expanded, 1);
}
