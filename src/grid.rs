use thiserror::Error;

use crate::types::{CellCode, Tile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("tile ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: i32,
        col: i32,
        rows: i32,
        cols: i32,
    },
    #[error("layout row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown cell '{symbol}' at ({row}, {col})")]
    UnknownCell { symbol: char, row: usize, col: usize },
    #[error("layout is empty")]
    Empty,
}

/// Set of cell codes that block one entity. Stored as a bitset over `CellCode`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockSet(u8);

impl BlockSet {
    /// Released ghosts and dead ghosts: only real walls block.
    pub const WALLS: BlockSet = BlockSet(bit(CellCode::Wall));
    /// The player and ghosts still held in base.
    pub const CONFINED: BlockSet = BlockSet(bit(CellCode::Wall) | bit(CellCode::RestrictedWall));

    pub fn contains(self, code: CellCode) -> bool {
        self.0 & bit(code) != 0
    }

    pub fn with(self, code: CellCode) -> Self {
        Self(self.0 | bit(code))
    }

    pub fn without(self, code: CellCode) -> Self {
        Self(self.0 & !bit(code))
    }
}

const fn bit(code: CellCode) -> u8 {
    1 << (code as u8)
}

/// A cell blocks an entity iff its code is in that entity's block set.
pub fn is_blocking(code: CellCode, blockers: BlockSet) -> bool {
    blockers.contains(code)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    rows: i32,
    cols: i32,
    cells: Vec<CellCode>,
}

impl TileGrid {
    pub fn parse<S: AsRef<str>>(layout: &[S]) -> Result<Self, GridError> {
        let Some(first) = layout.first() else {
            return Err(GridError::Empty);
        };
        let cols = first.as_ref().chars().count();
        if cols == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(cols * layout.len());
        for (row, line) in layout.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != cols {
                return Err(GridError::RaggedRow {
                    row,
                    found,
                    expected: cols,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                let code =
                    CellCode::parse(symbol).ok_or(GridError::UnknownCell { symbol, row, col })?;
                cells.push(code);
            }
        }

        Ok(Self {
            rows: layout.len() as i32,
            cols: cols as i32,
            cells,
        })
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.row >= 0 && tile.col >= 0 && tile.row < self.rows && tile.col < self.cols
    }

    pub fn cell_at(&self, row: i32, col: i32) -> Result<CellCode, GridError> {
        let idx = self.index(row, col)?;
        Ok(self.cells[idx])
    }

    pub fn set_cell(&mut self, row: i32, col: i32, code: CellCode) -> Result<(), GridError> {
        let idx = self.index(row, col)?;
        self.cells[idx] = code;
        Ok(())
    }

    /// In-bounds and not blocked for `blockers`. Off-grid tiles are never passable.
    pub fn is_passable(&self, tile: Tile, blockers: BlockSet) -> bool {
        match self.cell_at(tile.row, tile.col) {
            Ok(code) => !is_blocking(code, blockers),
            Err(_) => false,
        }
    }

    pub fn pickup_count(&self) -> usize {
        self.cells.iter().filter(|code| code.is_pickup()).count()
    }

    pub fn has_pickups(&self) -> bool {
        self.cells.iter().any(|code| code.is_pickup())
    }

    /// Every cell currently holding a pickup, row-major.
    pub fn pickups(&self) -> impl Iterator<Item = (Tile, CellCode)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, code)| code.is_pickup())
            .map(move |(idx, code)| (Tile::new(idx as i32 / cols, idx as i32 % cols), *code))
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols as usize)
            .map(|row| row.iter().map(|code| code.to_char()).collect())
            .collect()
    }

    fn index(&self, row: i32, col: i32) -> Result<usize, GridError> {
        if row < 0 || col < 0 || row >= self.rows || col >= self.cols {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok((row * self.cols + col) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> TileGrid {
        TileGrid::parse(&["#####", "#.o #", "#-###"]).expect("valid layout")
    }

    #[test]
    fn cell_at_reads_parsed_codes() {
        let grid = small_grid();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid.cell_at(1, 1), Ok(CellCode::SmallPickup));
        assert_eq!(grid.cell_at(1, 2), Ok(CellCode::BigPickup));
        assert_eq!(grid.cell_at(1, 3), Ok(CellCode::Empty));
        assert_eq!(grid.cell_at(2, 1), Ok(CellCode::RestrictedWall));
    }

    #[test]
    fn out_of_bounds_queries_fail() {
        let mut grid = small_grid();
        assert!(matches!(
            grid.cell_at(-1, 0),
            Err(GridError::OutOfBounds { row: -1, col: 0, .. })
        ));
        assert!(grid.cell_at(3, 0).is_err());
        assert!(grid.cell_at(0, 5).is_err());
        assert!(grid.set_cell(0, 9, CellCode::Empty).is_err());
        assert!(!grid.is_passable(Tile::new(-1, 1), BlockSet::WALLS));
    }

    #[test]
    fn set_cell_clears_pickups() {
        let mut grid = small_grid();
        assert_eq!(grid.pickup_count(), 2);
        grid.set_cell(1, 1, CellCode::Empty).expect("in bounds");
        grid.set_cell(1, 2, CellCode::Empty).expect("in bounds");
        assert_eq!(grid.pickup_count(), 0);
        assert!(!grid.has_pickups());
    }

    #[test]
    fn restricted_wall_blocks_only_confined_entities() {
        let grid = small_grid();
        let door = Tile::new(2, 1);
        assert!(grid.is_passable(door, BlockSet::WALLS));
        assert!(!grid.is_passable(door, BlockSet::CONFINED));
        assert!(!grid.is_passable(Tile::new(0, 0), BlockSet::WALLS));
        assert!(is_blocking(CellCode::RestrictedWall, BlockSet::CONFINED));
        assert!(!is_blocking(CellCode::SmallPickup, BlockSet::CONFINED));
    }

    #[test]
    fn block_set_edits_are_per_code() {
        let set = BlockSet::CONFINED.without(CellCode::RestrictedWall);
        assert_eq!(set, BlockSet::WALLS);
        assert_eq!(set.with(CellCode::RestrictedWall), BlockSet::CONFINED);
        for code in CellCode::ALL {
            assert!(!BlockSet::default().contains(code));
        }
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert_eq!(TileGrid::parse::<&str>(&[]), Err(GridError::Empty));
        assert!(matches!(
            TileGrid::parse(&["##", "#"]),
            Err(GridError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            TileGrid::parse(&["#x"]),
            Err(GridError::UnknownCell { symbol: 'x', .. })
        ));
    }

    #[test]
    fn pickups_are_listed_row_major() {
        let grid = small_grid();
        let pickups: Vec<_> = grid.pickups().collect();
        assert_eq!(
            pickups,
            vec![
                (Tile::new(1, 1), CellCode::SmallPickup),
                (Tile::new(1, 2), CellCode::BigPickup)
            ]
        );
        assert_eq!(grid.to_rows(), vec!["#####", "#.o #", "#-###"]);
    }
}
