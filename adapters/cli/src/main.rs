#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line scenario harness for the Lane Defence engine.
//!
//! Builds a grid from shape flags or an imported layout string, places
//! towers, summons units at seeded-random spawn cells, routes them, and
//! prints an ASCII occupancy map together with each route and its expansion
//! count.

mod layout_transfer;

use std::num::NonZeroU32;

use anyhow::{anyhow, Context};
use clap::Parser;
use lane_defence_core::{
    CellCoord, Facing, ObstacleId, PathRequest, PathStep, PixelRect, Position, Scale,
    SearchOutcome, Traversal, Zone, ZoneBands, WELCOME_BANNER,
};
use lane_defence_graph::{Grid, GridSpec};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::layout_transfer::{LayoutObstacle, LayoutSnapshot};

const UNIT_SEED_STREAM: &str = "summoned-unit";

/// Scenario harness for the Lane Defence grid engine.
#[derive(Debug, Parser)]
#[command(name = "lane-defence", version, about)]
struct Args {
    /// Width of the grid in cells.
    #[arg(long, default_value_t = 12)]
    columns: u32,

    /// Height of the grid in cells; must equal the three band heights
    /// combined.
    #[arg(long, default_value_t = 10)]
    rows: u32,

    /// Pixels per cell edge; values below 1 are clamped up to 1.
    #[arg(long, default_value_t = 16)]
    scale: i32,

    /// Rows in the spawn band at the top of the grid.
    #[arg(long, default_value_t = 2)]
    spawn_rows: u32,

    /// Rows in the building band between spawn and death.
    #[arg(long, default_value_t = 6)]
    building_rows: u32,

    /// Rows in the death band at the bottom of the grid.
    #[arg(long, default_value_t = 2)]
    death_rows: u32,

    /// Tower footprint as COL,ROW or COL,ROW,WxH in cell units; repeatable.
    #[arg(long = "tower", value_name = "SPEC", value_parser = parse_tower)]
    towers: Vec<TowerSpec>,

    /// Encoded layout string to apply instead of the shape flags.
    #[arg(
        long,
        conflicts_with_all = ["columns", "rows", "scale", "spawn_rows", "building_rows", "death_rows"]
    )]
    layout: Option<String>,

    /// Print the encoded layout of the configured grid and exit.
    #[arg(long)]
    export_layout: bool,

    /// Number of units to summon and route.
    #[arg(long, default_value_t = 1)]
    summon: u32,

    /// Label every random draw is derived from.
    #[arg(long, default_value = "lane-defence")]
    seed: String,

    /// Route units as flying; obstacles are overflown.
    #[arg(long)]
    flying: bool,

    /// Route trapped units onto the nearest blocking tower.
    #[arg(long)]
    attacker: bool,

    /// Expand cell hops into per-tick sub-steps.
    #[arg(long)]
    substeps: bool,

    /// Pixels a unit advances per simulation tick.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    speed: u32,
}

/// Cell-space footprint of one tower taken from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TowerSpec {
    column: u32,
    row: u32,
    columns: u32,
    rows: u32,
}

/// Fully resolved scenario: grid shape plus the towers to place on it.
#[derive(Clone, Debug)]
struct Scenario {
    columns: u32,
    rows: u32,
    scale: Scale,
    bands: ZoneBands,
    towers: Vec<TowerSpec>,
}

impl Scenario {
    /// Resolves the scenario from the command line, decoding `--layout`
    /// when present and appending any `--tower` footprints.
    fn from_args(args: &Args) -> anyhow::Result<Scenario> {
        let mut scenario = match &args.layout {
            Some(encoded) => {
                let snapshot =
                    LayoutSnapshot::decode(encoded).context("could not import --layout")?;
                Scenario {
                    columns: snapshot.columns,
                    rows: snapshot.rows,
                    scale: Scale::clamped(i32::try_from(snapshot.scale).unwrap_or(i32::MAX)),
                    bands: ZoneBands::new(
                        snapshot.spawn_rows,
                        snapshot.building_rows,
                        snapshot.death_rows,
                    ),
                    towers: snapshot
                        .obstacles
                        .iter()
                        .map(|obstacle| TowerSpec {
                            column: obstacle.origin.column(),
                            row: obstacle.origin.row(),
                            columns: obstacle.columns,
                            rows: obstacle.rows,
                        })
                        .collect(),
                }
            }
            None => Scenario {
                columns: args.columns,
                rows: args.rows,
                scale: Scale::clamped(args.scale),
                bands: ZoneBands::new(args.spawn_rows, args.building_rows, args.death_rows),
                towers: Vec::new(),
            },
        };
        scenario.towers.extend(args.towers.iter().copied());
        Ok(scenario)
    }

    fn build_grid(&self) -> anyhow::Result<Grid> {
        Grid::new(GridSpec::new(
            Position::new(0, 0),
            self.columns,
            self.rows,
            self.scale,
            self.bands,
        ))
        .context("grid layout is invalid")
    }

    fn place_towers(&self, grid: &mut Grid) -> anyhow::Result<()> {
        let mut id = 0u32;
        for tower in &self.towers {
            id += 1;
            let rect = self.tower_rect(grid, tower)?;
            grid.place(ObstacleId::new(id), rect).with_context(|| {
                format!("tower {id} at {},{} cannot be placed", tower.column, tower.row)
            })?;
        }
        Ok(())
    }

    fn tower_rect(&self, grid: &Grid, tower: &TowerSpec) -> anyhow::Result<PixelRect> {
        let origin = grid
            .position_of(CellCoord::new(tower.column, tower.row))
            .ok_or_else(|| anyhow!("cell {},{} is outside the grid", tower.column, tower.row))?;
        let scale = self.scale.get();
        Ok(PixelRect::new(
            origin,
            tower.columns.saturating_mul(scale),
            tower.rows.saturating_mul(scale),
        ))
    }

    fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            columns: self.columns,
            rows: self.rows,
            scale: self.scale.get(),
            spawn_rows: self.bands.spawn(),
            building_rows: self.bands.building(),
            death_rows: self.bands.death(),
            obstacles: self
                .towers
                .iter()
                .map(|tower| LayoutObstacle {
                    origin: CellCoord::new(tower.column, tower.row),
                    columns: tower.columns,
                    rows: tower.rows,
                })
                .collect(),
        }
    }
}

/// Entry point for the Lane Defence command-line harness.
fn main() -> anyhow::Result<()> {
    run(&Args::parse())
}

fn run(args: &Args) -> anyhow::Result<()> {
    println!("{WELCOME_BANNER}");

    let scenario = Scenario::from_args(args)?;
    let mut grid = scenario.build_grid()?;
    scenario.place_towers(&mut grid)?;

    if args.export_layout {
        println!("{}", scenario.snapshot().encode());
        return Ok(());
    }

    println!("{}", render_map(&grid));

    let base_seed = derive_base_seed(&args.seed);
    let speed = NonZeroU32::new(args.speed).context("speed must be at least 1")?;
    let traversal = if args.flying {
        Traversal::Flying
    } else {
        Traversal::Ground
    };

    for unit in 0..args.summon {
        let mut rng = ChaCha8Rng::seed_from_u64(derive_unit_seed(base_seed, unit));
        let source = grid.random_spawn_cell(&mut rng);
        let mut request = PathRequest::new(source, Facing::Down, grid.target_position(), traversal);
        request.speed = speed;
        request.attacker = args.attacker;
        request.expand_substeps = args.substeps;
        let outcome = grid.find_path(&request);
        println!("{}", describe_outcome(unit, &request, &outcome));
    }
    Ok(())
}

/// Renders the grid as one character per cell.
///
/// `~` spawn, `.` building, `_` death, `#` obstacle, `T` the exit cell.
fn render_map(grid: &Grid) -> String {
    let mut map = String::new();
    for row in 0..grid.rows() {
        if row > 0 {
            map.push('\n');
        }
        for column in 0..grid.columns() {
            map.push(cell_glyph(grid, CellCoord::new(column, row)));
        }
    }
    map
}

fn cell_glyph(grid: &Grid, cell: CellCoord) -> char {
    let Some(position) = grid.position_of(cell) else {
        return '?';
    };
    if grid.obstacle_at(position).is_some() {
        return '#';
    }
    if cell == grid.target_cell() {
        return 'T';
    }
    match grid.zone_at(position) {
        Some(Zone::Spawn) => '~',
        Some(Zone::Building) => '.',
        Some(Zone::Death) => '_',
        None => '?',
    }
}

fn describe_outcome(unit: u32, request: &PathRequest, outcome: &SearchOutcome) -> String {
    let source = request.source;
    let mut report = format!("unit {unit} from ({}, {}): ", source.x(), source.y());
    if outcome.path.is_empty() {
        report.push_str("no route");
    } else {
        report.push_str(&format!("{} steps", outcome.path.len()));
    }
    report.push_str(&format!(" ({} expanded)", outcome.expanded));
    if let Some(obstacle) = outcome.obstacle {
        report.push_str(&format!(", attacks obstacle {}", obstacle.get()));
    }
    if !outcome.path.is_empty() {
        report.push('\n');
        report.push_str(&format_steps(outcome.path.steps()));
    }
    report
}

fn format_steps(steps: &[PathStep]) -> String {
    let mut line = String::from(" ");
    for step in steps {
        line.push_str(&format!(
            " ({},{}){}",
            step.position.x(),
            step.position.y(),
            facing_glyph(step.facing),
        ));
    }
    line
}

const fn facing_glyph(facing: Facing) -> char {
    match facing {
        Facing::Up => '^',
        Facing::Right => '>',
        Facing::Down => 'v',
        Facing::Left => '<',
    }
}

fn parse_tower(value: &str) -> Result<TowerSpec, String> {
    let mut parts = value.split(',');
    let column = parse_field(parts.next(), value, "column")?;
    let row = parse_field(parts.next(), value, "row")?;
    let (columns, rows) = match parts.next() {
        None => (1, 1),
        Some(span) => parse_span(span, value)?,
    };
    if parts.next().is_some() {
        return Err(format!("tower '{value}' has trailing fields"));
    }
    Ok(TowerSpec {
        column,
        row,
        columns,
        rows,
    })
}

fn parse_field(field: Option<&str>, spec: &str, name: &str) -> Result<u32, String> {
    field
        .ok_or_else(|| format!("tower '{spec}' is missing its {name}"))?
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("tower '{spec}' has an unreadable {name}"))
}

fn parse_span(span: &str, spec: &str) -> Result<(u32, u32), String> {
    let (columns, rows) = span
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("tower '{spec}' span must look like WxH"))?;
    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("tower '{spec}' has an unreadable span width"))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("tower '{spec}' has an unreadable span height"))?;
    if columns == 0 || rows == 0 {
        return Err(format!("tower '{spec}' span must cover at least one cell"));
    }
    Ok((columns, rows))
}

fn derive_base_seed(label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn derive_unit_seed(base: u64, unit: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(UNIT_SEED_STREAM.as_bytes());
    hasher.update(unit.to_le_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn tower_specs_parse_with_optional_spans() {
        assert_eq!(
            parse_tower("3,4"),
            Ok(TowerSpec {
                column: 3,
                row: 4,
                columns: 1,
                rows: 1
            }),
        );
        assert_eq!(
            parse_tower("3,4,2x2"),
            Ok(TowerSpec {
                column: 3,
                row: 4,
                columns: 2,
                rows: 2
            }),
        );
        assert!(parse_tower("3").is_err());
        assert!(parse_tower("3,4,0x2").is_err());
        assert!(parse_tower("3,4,2x2,9").is_err());
        assert!(parse_tower("a,4").is_err());
    }

    #[test]
    fn seeds_replay_and_differ_between_units() {
        let base = derive_base_seed("test-label");
        assert_eq!(base, derive_base_seed("test-label"));
        assert_ne!(base, derive_base_seed("another-label"));
        assert_eq!(derive_unit_seed(base, 3), derive_unit_seed(base, 3));
        assert_ne!(derive_unit_seed(base, 0), derive_unit_seed(base, 1));
    }

    #[test]
    fn maps_mark_zones_obstacles_and_the_target() {
        let scenario = Scenario {
            columns: 3,
            rows: 3,
            scale: Scale::ONE,
            bands: ZoneBands::new(1, 1, 1),
            towers: vec![TowerSpec {
                column: 0,
                row: 1,
                columns: 1,
                rows: 1,
            }],
        };
        let mut grid = scenario.build_grid().expect("grid builds");
        scenario.place_towers(&mut grid).expect("tower places");

        assert_eq!(render_map(&grid), "~~~\n#..\n_T_");
    }

    #[test]
    fn scenarios_import_layout_strings() {
        let encoded = LayoutSnapshot {
            columns: 5,
            rows: 5,
            scale: 1,
            spawn_rows: 1,
            building_rows: 3,
            death_rows: 1,
            obstacles: vec![LayoutObstacle {
                origin: CellCoord::new(2, 1),
                columns: 1,
                rows: 1,
            }],
        }
        .encode();

        let args =
            Args::parse_from(["lane-defence", "--layout", encoded.as_str(), "--tower", "1,2"]);
        let scenario = Scenario::from_args(&args).expect("layout imports");
        assert_eq!(scenario.columns, 5);
        assert_eq!(scenario.towers.len(), 2);

        let mut grid = scenario.build_grid().expect("grid builds");
        scenario.place_towers(&mut grid).expect("towers place");
        for cell in [CellCoord::new(2, 1), CellCoord::new(1, 2)] {
            let position = grid.position_of(cell).expect("cell is in bounds");
            assert!(grid.obstacle_at(position).is_some(), "cell {cell:?}");
        }
    }

    #[test]
    fn exported_layouts_round_trip_through_import() {
        let args = Args::parse_from([
            "lane-defence",
            "--columns",
            "6",
            "--rows",
            "6",
            "--scale",
            "16",
            "--spawn-rows",
            "1",
            "--building-rows",
            "4",
            "--death-rows",
            "1",
            "--tower",
            "2,2,2x1",
        ]);
        let scenario = Scenario::from_args(&args).expect("flags resolve");
        let encoded = scenario.snapshot().encode();

        let imported = Args::parse_from(["lane-defence", "--layout", encoded.as_str()]);
        let restored = Scenario::from_args(&imported).expect("layout imports");
        assert_eq!(restored.columns, scenario.columns);
        assert_eq!(restored.rows, scenario.rows);
        assert_eq!(restored.scale, scenario.scale);
        assert_eq!(restored.bands, scenario.bands);
        assert_eq!(restored.towers, scenario.towers);
    }
}
