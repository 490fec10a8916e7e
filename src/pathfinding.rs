//! Breadth-first shortest paths over the tile grid.
//!
//! The maze is small and unweighted, so a plain multi-source BFS is optimal.
//! Expansion order is fixed so ties between equal-length routes always resolve
//! the same way: sources in the order given, then neighbours up, left, right,
//! down.

use std::collections::VecDeque;

use crate::grid::{BlockSet, TileGrid};
use crate::types::Tile;

/// (drow, dcol) expansion order.
pub const NEIGHBOR_ORDER: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Ordered tiles from a start cell to the goal, both inclusive.
pub type Path = Vec<Tile>;

/// Neighbours of `tile` that are in bounds and not blocked for `blockers`.
pub fn neighbors(
    grid: &TileGrid,
    tile: Tile,
    blockers: BlockSet,
) -> impl Iterator<Item = Tile> + '_ {
    NEIGHBOR_ORDER
        .iter()
        .map(move |(dr, dc)| Tile::new(tile.row + dr, tile.col + dc))
        .filter(move |next| grid.is_passable(*next, blockers))
}

/// Shortest path from any of `starts` to `goal`, or `None` when the goal is
/// unreachable under `blockers`. A start equal to the goal yields a one-tile path.
pub fn shortest_path(
    grid: &TileGrid,
    starts: &[Tile],
    goal: Tile,
    blockers: BlockSet,
) -> Option<Path> {
    let cols = grid.cols();
    let index = |tile: Tile| (tile.row * cols + tile.col) as usize;
    let cell_count = (grid.rows() * cols).max(0) as usize;

    let mut parent: Vec<Option<usize>> = vec![None; cell_count];
    let mut visited = vec![false; cell_count];
    let mut queue = VecDeque::new();

    for &start in starts {
        if !grid.contains(start) {
            continue;
        }
        if start == goal {
            return Some(vec![start]);
        }
        let idx = index(start);
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        queue.push_back(start);
    }

    while let Some(tile) = queue.pop_front() {
        for next in neighbors(grid, tile, blockers) {
            let next_idx = index(next);
            if visited[next_idx] {
                continue;
            }
            visited[next_idx] = true;
            parent[next_idx] = Some(index(tile));
            if next == goal {
                return Some(rebuild_path(&parent, next_idx, cols));
            }
            queue.push_back(next);
        }
    }

    None
}

/// First move along the shortest path, if the goal is reachable and not the start.
pub fn first_step(grid: &TileGrid, from: Tile, goal: Tile, blockers: BlockSet) -> Option<Tile> {
    shortest_path(grid, &[from], goal, blockers).and_then(|path| path.get(1).copied())
}

fn rebuild_path(parent: &[Option<usize>], goal_idx: usize, cols: i32) -> Path {
    let to_tile = |idx: usize| Tile::new(idx as i32 / cols, idx as i32 % cols);
    let mut path = vec![to_tile(goal_idx)];
    let mut cursor = goal_idx;
    while let Some(prev) = parent[cursor] {
        path.push(to_tile(prev));
        cursor = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet, VecDeque};

    use super::*;
    use crate::world::classic_world;

    /// Plain distance flood used as an oracle.
    fn reference_distances(
        grid: &TileGrid,
        start: Tile,
        blockers: BlockSet,
    ) -> HashMap<Tile, usize> {
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        dist.insert(start, 0usize);
        queue.push_back(start);
        while let Some(tile) = queue.pop_front() {
            let d = dist[&tile];
            for (dr, dc) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let next = Tile::new(tile.row + dr, tile.col + dc);
                if !grid.is_passable(next, blockers) || dist.contains_key(&next) {
                    continue;
                }
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
        dist
    }

    fn open_tiles(grid: &TileGrid, blockers: BlockSet) -> Vec<Tile> {
        let mut out = Vec::new();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let tile = Tile::new(row, col);
                if grid.is_passable(tile, blockers) {
                    out.push(tile);
                }
            }
        }
        out
    }

    #[test]
    fn path_lengths_match_reference_distances() {
        let world = classic_world();
        let grid = &world.grid;
        for blockers in [BlockSet::WALLS, BlockSet::CONFINED] {
            let tiles = open_tiles(grid, blockers);
            for start in tiles.iter().step_by(7) {
                let reference = reference_distances(grid, *start, blockers);
                for goal in tiles.iter().step_by(5) {
                    let path = shortest_path(grid, &[*start], *goal, blockers);
                    match reference.get(goal) {
                        Some(distance) => {
                            let path = path.expect("reachable goal has a path");
                            assert_eq!(path.len(), distance + 1, "{start:?} -> {goal:?}");
                        }
                        None => assert!(path.is_none(), "{start:?} -> {goal:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn paths_are_simple_connected_and_unblocked() {
        let world = classic_world();
        let grid = &world.grid;
        let tiles = open_tiles(grid, BlockSet::WALLS);
        for start in tiles.iter().step_by(11) {
            for goal in tiles.iter().step_by(13) {
                let Some(path) = shortest_path(grid, &[*start], *goal, BlockSet::WALLS) else {
                    continue;
                };
                assert_eq!(path.first(), Some(start));
                assert_eq!(path.last(), Some(goal));
                let unique: HashSet<_> = path.iter().collect();
                assert_eq!(unique.len(), path.len());
                for pair in path.windows(2) {
                    let step =
                        (pair[0].row - pair[1].row).abs() + (pair[0].col - pair[1].col).abs();
                    assert_eq!(step, 1);
                }
                for tile in &path[1..] {
                    assert!(grid.is_passable(*tile, BlockSet::WALLS));
                }
            }
        }
    }

    #[test]
    fn restricted_wall_blocks_confined_search() {
        let world = classic_world();
        let inside = world.ghost_spawn;
        let outside = world.player_spawn;
        assert!(shortest_path(&world.grid, &[inside], outside, BlockSet::CONFINED).is_none());
        let path = shortest_path(&world.grid, &[inside], outside, BlockSet::WALLS)
            .expect("door opens for released ghosts");
        let through_door = path
            .iter()
            .any(|tile| tile.row == 9 && (9..=11).contains(&tile.col));
        assert!(through_door);
    }

    #[test]
    fn ties_break_by_neighbor_order() {
        let grid = TileGrid::parse(&["   ", "   ", "   "]).expect("open grid");
        let path = shortest_path(&grid, &[Tile::new(1, 1)], Tile::new(0, 0), BlockSet::WALLS)
            .expect("open grid is connected");
        // up is expanded before left
        assert_eq!(path, vec![Tile::new(1, 1), Tile::new(0, 1), Tile::new(0, 0)]);
    }

    #[test]
    fn earlier_sources_win_ties() {
        let grid = TileGrid::parse(&["     "]).expect("corridor");
        let path = shortest_path(
            &grid,
            &[Tile::new(0, 0), Tile::new(0, 4)],
            Tile::new(0, 2),
            BlockSet::WALLS,
        )
        .expect("goal between sources");
        assert_eq!(path.first(), Some(&Tile::new(0, 0)));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn start_on_goal_and_blocked_goal() {
        let grid = TileGrid::parse(&[" # "]).expect("split corridor");
        let here = Tile::new(0, 0);
        assert_eq!(shortest_path(&grid, &[here], here, BlockSet::WALLS), Some(vec![here]));
        assert_eq!(first_step(&grid, here, here, BlockSet::WALLS), None);
        assert!(shortest_path(&grid, &[here], Tile::new(0, 2), BlockSet::WALLS).is_none());
        assert!(shortest_path(&grid, &[here], Tile::new(0, 1), BlockSet::WALLS).is_none());
    }
}
