use crate::constants::{SPRITE_INSET, TILE_SIZE};
use crate::grid::{GridError, TileGrid};
use crate::types::{Tile, WorldInit};

/// '#' wall, '-' base door, '.' small pickup, 'o' big pickup, ' ' empty.
pub const CLASSIC_LAYOUT: [&str; 24] = [
    "#####################",
    "#.........#.........#",
    "#o###.###.#.###.###o#",
    "#.###.###.#.###.###.#",
    "#...................#",
    "#.###.#.#####.#.###.#",
    "#.###.#...#...#.###.#",
    "#.....### # ###.....#",
    "#####.#       #.#####",
    "#####.# #---# #.#####",
    "#####.# #   # #.#####",
    "     .  #   #  .     ",
    "#####.# ##### #.#####",
    "#####.#       #.#####",
    "#####.# ##### #.#####",
    "#.........#.........#",
    "#.###.###.#.###.###.#",
    "#o..#..... .....#..o#",
    "###.#.#.#####.#.#.###",
    "#.....#...#...#.....#",
    "#.#######.#.#######.#",
    "#.#######.#.#######.#",
    "#...................#",
    "#####################",
];

pub const CLASSIC_PLAYER_SPAWN: Tile = Tile::new(17, 10);
pub const CLASSIC_GHOST_SPAWN: Tile = Tile::new(11, 10);

#[derive(Clone, Debug)]
pub struct World {
    pub grid: TileGrid,
    pub player_spawn: Tile,
    pub ghost_spawn: Tile,
}

impl World {
    pub fn from_layout<S: AsRef<str>>(
        layout: &[S],
        player_spawn: Tile,
        ghost_spawn: Tile,
    ) -> Result<Self, GridError> {
        let grid = TileGrid::parse(layout)?;
        for spawn in [player_spawn, ghost_spawn] {
            grid.cell_at(spawn.row, spawn.col)?;
        }
        Ok(Self {
            grid,
            player_spawn,
            ghost_spawn,
        })
    }

    pub fn board_width(&self) -> i32 {
        self.grid.cols() * TILE_SIZE
    }

    pub fn board_height(&self) -> i32 {
        self.grid.rows() * TILE_SIZE
    }
}

pub fn classic_world() -> World {
    World {
        grid: TileGrid::parse(&CLASSIC_LAYOUT).expect("classic layout is well formed"),
        player_spawn: CLASSIC_PLAYER_SPAWN,
        ghost_spawn: CLASSIC_GHOST_SPAWN,
    }
}

pub fn to_world_init(grid: &TileGrid) -> WorldInit {
    WorldInit {
        rows: grid.rows(),
        cols: grid.cols(),
        tile_size: TILE_SIZE,
        sprite_inset: SPRITE_INSET,
        tiles: grid.to_rows(),
    }
}
