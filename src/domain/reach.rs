/// Reachability: BFS over the torus honoring hazard-avoidance flags.
///
/// Used by the generator to reject dungeons where neither the rope nor
/// the arrow can be reached on foot.
///
/// Blocking rules for a neighbour (never enqueued if any holds):
///   - already visited
///   - `avoid_pits` and the cell is a pit
///   - `avoid_dragon`, the dragon is alive, and the cell is the dragon's
///   - the cell holds a bat (always, regardless of flags)
///
/// Bats are single-use in play, so treating them as walls is conservative:
/// a `false` here does not prove the dungeon is unwinnable.

use std::collections::VecDeque;

use super::rules::HazardView;
use super::topology::{Cell, GRID_SIZE};

pub fn reachable(
    view: &HazardView,
    start: Cell,
    target: Cell,
    avoid_pits: bool,
    avoid_dragon: bool,
) -> bool {
    let mut visited = [false; GRID_SIZE * GRID_SIZE];
    visited[start.index()] = true;

    let mut queue: VecDeque<Cell> = VecDeque::with_capacity(GRID_SIZE * GRID_SIZE);
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        if cur == target { return true; }

        for next in cur.neighbors() {
            if visited[next.index()] { continue; }
            if avoid_pits && view.is_pit(next) { continue; }
            if avoid_dragon && view.is_live_dragon(next) { continue; }
            if view.is_bat(next) { continue; }

            visited[next.index()] = true;
            queue.push_back(next);
        }
    }

    false
}
