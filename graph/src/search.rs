//! Route search over a [`CellArena`].
//!
//! Uniform-cost expansion with a subordinate tie-break: among equally short
//! routes, the one with fewer same-facing continuations pops first, which
//! steers units into stair-steps instead of long straight runs. A cell whose
//! remembered next-step chain still reaches the goal is taken as-is rather
//! than expanded further.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use lane_defence_core::{Facing, ObstacleId};

use crate::cells::CellArena;

/// Shortest remembered chain worth trusting during expansion, in hops.
pub(crate) const MIN_CACHED_SUFFIX: usize = 4;

const UNVISITED: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// One hop of a resolved route: a cell plus the facing of arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Hop {
    /// Arena index of the cell.
    pub(crate) cell: usize,
    /// Facing the route enters the cell with.
    pub(crate) facing: Facing,
}

/// Resolution of a route search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    /// The goal was reached; hops run from the start cell to the goal.
    Reached(Vec<Hop>),
    /// The goal is sealed off, but the walk can end on this obstacle.
    Intercepted(Vec<Hop>, ObstacleId),
    /// The frontier drained without reaching the goal or an obstacle.
    Unreachable,
}

/// Frontier entry ordered so the heap pops the cheapest cell first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrontierEntry {
    cost: u32,
    straight_runs: u32,
    seq: u32,
    cell: usize,
    facing: Facing,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &FrontierEntry) -> Ordering {
        // Reversed so the max-heap yields the minimum entry.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.straight_runs.cmp(&self.straight_runs))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &FrontierEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Searches for a route from `start` to `goal` over open cells.
///
/// `blocked` decides which cells the walk may not enter; obstacles never
/// stand on death cells, so the goal itself is always open. Cost is one per
/// hop. Same-facing continuations count against an entry only when comparing
/// equal costs, so routes stay hop-optimal. With `attacker` set, a drained
/// frontier falls back to the first blocked cell the expansion touched
/// instead of reporting failure.
///
/// Returns the route together with the number of cells expanded.
pub(crate) fn route<F>(
    arena: &CellArena,
    blocked: F,
    start: usize,
    start_facing: Facing,
    goal: usize,
    attacker: bool,
) -> (Route, u32)
where
    F: Fn(usize) -> bool,
{
    let cell_count = arena.len();
    let mut status = vec![UNVISITED; cell_count];
    let mut best = vec![(u32::MAX, u32::MAX); cell_count];
    let mut parents: Vec<Option<(usize, Facing)>> = vec![None; cell_count];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u32;
    let mut expanded = 0u32;
    let mut intercept: Option<(Hop, usize, ObstacleId)> = None;

    best[start] = (0, 0);
    status[start] = OPEN;
    frontier.push(FrontierEntry {
        cost: 0,
        straight_runs: 0,
        seq,
        cell: start,
        facing: start_facing,
    });

    while let Some(entry) = frontier.pop() {
        if status[entry.cell] == CLOSED {
            continue;
        }
        if (entry.cost, entry.straight_runs) != best[entry.cell] {
            // Superseded by a cheaper discovery still waiting in the heap.
            continue;
        }
        status[entry.cell] = CLOSED;
        expanded += 1;

        if entry.cell == goal {
            let hops = reconstruct(&parents, start, start_facing, entry.cell);
            return (Route::Reached(hops), expanded);
        }

        if let Some(suffix) = cached_suffix(arena, &blocked, entry.cell, goal) {
            let mut hops = reconstruct(&parents, start, start_facing, entry.cell);
            hops.extend(suffix);
            return (Route::Reached(hops), expanded);
        }

        for facing in Facing::ALL {
            let Some(next) = arena.neighbor(entry.cell, facing) else {
                continue;
            };
            if status[next] == CLOSED {
                continue;
            }
            if blocked(next) {
                if attacker && intercept.is_none() {
                    if let Some(id) = arena.obstacle(next) {
                        intercept = Some((Hop { cell: next, facing }, entry.cell, id));
                    }
                }
                continue;
            }
            let cost = entry.cost + 1;
            let straight_runs = entry.straight_runs + u32::from(facing == entry.facing);
            if (cost, straight_runs) < best[next] {
                best[next] = (cost, straight_runs);
                parents[next] = Some((entry.cell, facing));
                status[next] = OPEN;
                seq += 1;
                frontier.push(FrontierEntry {
                    cost,
                    straight_runs,
                    seq,
                    cell: next,
                    facing,
                });
            }
        }
    }

    if let Some((hop, via, id)) = intercept {
        let mut hops = reconstruct(&parents, start, start_facing, via);
        hops.push(hop);
        return (Route::Intercepted(hops, id), expanded);
    }
    (Route::Unreachable, expanded)
}

/// Follows the remembered next-step chain out of `from` toward `goal`.
///
/// The chain counts only while every cell on it stays open; it must end at
/// `goal` and span at least [`MIN_CACHED_SUFFIX`] hops to be worth taking.
fn cached_suffix<F>(arena: &CellArena, blocked: &F, from: usize, goal: usize) -> Option<Vec<Hop>>
where
    F: Fn(usize) -> bool,
{
    let mut hops = Vec::new();
    let mut current = from;
    // Bounded by the arena; a healthy chain never revisits a cell.
    for _ in 0..arena.len() {
        let step = arena.cached(current)?;
        if blocked(step.next) {
            return None;
        }
        hops.push(Hop {
            cell: step.next,
            facing: step.facing,
        });
        if step.next == goal {
            return (hops.len() >= MIN_CACHED_SUFFIX).then_some(hops);
        }
        current = step.next;
    }
    None
}

/// Rebuilds the hop sequence from `start` to `end` out of the parent links.
fn reconstruct(
    parents: &[Option<(usize, Facing)>],
    start: usize,
    start_facing: Facing,
    end: usize,
) -> Vec<Hop> {
    let mut hops = Vec::new();
    let mut current = end;
    while current != start {
        let Some((parent, facing)) = parents[current] else {
            break;
        };
        hops.push(Hop {
            cell: current,
            facing,
        });
        current = parent;
    }
    hops.push(Hop {
        cell: start,
        facing: start_facing,
    });
    hops.reverse();
    hops
}
