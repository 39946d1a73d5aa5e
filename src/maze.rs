use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::types::{GhostState, Vec2};

/// Structural classification of one maze cell. Set once at load; the only
/// mutation ever applied is `Pellet`/`PowerPellet` -> `Empty` on consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Empty,
    Pellet,
    PowerPellet,
    GhostDoor,
    GhostInterior,
}

impl Tile {
    fn from_code(code: char) -> Option<Self> {
        match code {
            '#' => Some(Tile::Wall),
            ' ' => Some(Tile::Empty),
            '.' => Some(Tile::Pellet),
            'o' => Some(Tile::PowerPellet),
            '=' => Some(Tile::GhostDoor),
            'H' => Some(Tile::GhostInterior),
            _ => None,
        }
    }

    pub fn is_pellet(self) -> bool {
        matches!(self, Tile::Pellet | Tile::PowerPellet)
    }

    /// Part of the ghost house (door or interior)?
    pub fn is_house(self) -> bool {
        matches!(self, Tile::GhostDoor | Tile::GhostInterior)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze definition has no rows")]
    EmptyGrid,
    #[error("maze row {row} is {found} cells wide, expected {expected}")]
    NotRectangular {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile code {code:?} at ({x}, {y})")]
    UnknownTileCode { code: char, x: i32, y: i32 },
    #[error("tunnel row {0} is outside the maze")]
    TunnelRowOutOfBounds(i32),
    #[error("expected exactly one player start, found {0}")]
    PlayerStartCount(usize),
    #[error("expected exactly four ghost homes, found {0}")]
    GhostHomeCount(usize),
    #[error("player start ({x}, {y}) is not an open cell")]
    BlockedPlayerStart { x: i32, y: i32 },
    #[error("ghost home ({x}, {y}) is not inside the ghost house")]
    HomeOutsideHouse { x: i32, y: i32 },
    #[error("maze has no ghost-house door")]
    MissingDoor,
    #[error("ghost-house door has no open cell outside the house")]
    SealedDoor,
    #[error("ghost-house interior is not reachable from its door")]
    UnreachableInterior,
}

/// Static maze input for `Simulation::new`. Rows are per-cell codes
/// (`#` wall, space empty, `.` pellet, `o` power pellet, `=` door,
/// `H` house interior); tunnel rows wrap horizontally; the start and home
/// coordinates place the five entities.
#[derive(Clone, Debug)]
pub struct MazeDefinition {
    pub rows: Vec<String>,
    pub tunnel_rows: Vec<i32>,
    pub player_starts: Vec<Vec2>,
    pub ghost_homes: Vec<Vec2>,
}

impl MazeDefinition {
    /// The built-in 28x31 layout: one tunnel row through the middle, four
    /// power pellets in the corners, a central four-ghost house.
    pub fn classic() -> Self {
        Self {
            rows: CLASSIC_ROWS.iter().map(|row| row.to_string()).collect(),
            tunnel_rows: vec![14],
            player_starts: vec![Vec2::new(13, 23)],
            ghost_homes: vec![
                Vec2::new(12, 14),
                Vec2::new(13, 14),
                Vec2::new(14, 14),
                Vec2::new(15, 14),
            ],
        }
    }
}

const CLASSIC_ROWS: [&str; 31] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "######.##### ## #####.######",
    "######.##          ##.######",
    "######.## ###==### ##.######",
    "######.## #HHHHHH# ##.######",
    "      .## #HHHHHH# ##.      ",
    "######.## #HHHHHH# ##.######",
    "######.## ######## ##.######",
    "######.##          ##.######",
    "######.## ######## ##.######",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......  .......##..o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
];

/// The loaded maze: immutable structure plus the pellet-consumption state.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    tunnel_rows: Vec<i32>,
    house_exit: Vec2,
}

impl Grid {
    /// Parses and validates a definition. Every defect listed in `MazeError`
    /// is fatal here; a grid that constructs is safe to simulate on.
    pub fn from_definition(definition: &MazeDefinition) -> Result<Self, MazeError> {
        if definition.rows.is_empty() || definition.rows[0].is_empty() {
            return Err(MazeError::EmptyGrid);
        }
        let width = definition.rows[0].chars().count();
        let height = definition.rows.len();

        let mut tiles = Vec::with_capacity(width * height);
        for (row_index, row) in definition.rows.iter().enumerate() {
            let cells: Vec<char> = row.chars().collect();
            if cells.len() != width {
                return Err(MazeError::NotRectangular {
                    row: row_index,
                    expected: width,
                    found: cells.len(),
                });
            }
            for (col_index, code) in cells.iter().enumerate() {
                let tile = Tile::from_code(*code).ok_or(MazeError::UnknownTileCode {
                    code: *code,
                    x: col_index as i32,
                    y: row_index as i32,
                })?;
                tiles.push(tile);
            }
        }

        for &row in &definition.tunnel_rows {
            if row < 0 || row >= height as i32 {
                return Err(MazeError::TunnelRowOutOfBounds(row));
            }
        }

        let mut grid = Self {
            width: width as i32,
            height: height as i32,
            tiles,
            tunnel_rows: definition.tunnel_rows.clone(),
            house_exit: Vec2::new(0, 0),
        };

        if definition.player_starts.len() != 1 {
            return Err(MazeError::PlayerStartCount(definition.player_starts.len()));
        }
        let start = definition.player_starts[0];
        if grid.is_wall(start.x, start.y, None) {
            return Err(MazeError::BlockedPlayerStart {
                x: start.x,
                y: start.y,
            });
        }

        if definition.ghost_homes.len() != 4 {
            return Err(MazeError::GhostHomeCount(definition.ghost_homes.len()));
        }
        for &home in &definition.ghost_homes {
            if grid.tile(home.x, home.y) != Tile::GhostInterior {
                return Err(MazeError::HomeOutsideHouse {
                    x: home.x,
                    y: home.y,
                });
            }
        }

        grid.house_exit = grid.find_house_exit()?;
        grid.check_interior_reachable()?;
        Ok(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Tile at `(x, y)`; anything out of bounds reads as `Wall`.
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Tile::Wall;
        }
        self.tiles[(y * self.width + x) as usize]
    }

    /// Whether `(x, y)` blocks the asking entity. `ghost_state` is `None`
    /// for the player, who may never enter the ghost house; ghosts pass the
    /// door and interior only while `LeavingHome` or `Eaten`.
    ///
    /// Vertical out-of-bounds is always a wall. Horizontal out-of-bounds is
    /// open only on tunnel rows, where it signals a wrap.
    pub fn is_wall(&self, x: i32, y: i32, ghost_state: Option<GhostState>) -> bool {
        if y < 0 || y >= self.height {
            return true;
        }
        if x < 0 || x >= self.width {
            return !self.is_tunnel_row(y);
        }
        match self.tile(x, y) {
            Tile::Wall => true,
            Tile::GhostDoor | Tile::GhostInterior => !matches!(
                ghost_state,
                Some(GhostState::LeavingHome) | Some(GhostState::Eaten)
            ),
            _ => false,
        }
    }

    /// Consumes the pellet at `(x, y)` and returns what was there. A no-op
    /// returning `Empty` on any non-pellet tile.
    pub fn consume(&mut self, x: i32, y: i32) -> Tile {
        let prior = self.tile(x, y);
        if prior.is_pellet() {
            self.tiles[(y * self.width + x) as usize] = Tile::Empty;
            prior
        } else {
            Tile::Empty
        }
    }

    pub fn is_tunnel_row(&self, y: i32) -> bool {
        self.tunnel_rows.contains(&y)
    }

    /// Wraps a horizontal coordinate around the grid edge.
    pub fn wrap_x(&self, x: i32) -> i32 {
        if x < 0 {
            self.width - 1
        } else if x >= self.width {
            0
        } else {
            x
        }
    }

    /// The open cell just outside the ghost-house door: where a leaving
    /// ghost heads, and where it flips to `Chase`.
    pub fn house_exit(&self) -> Vec2 {
        self.house_exit
    }

    pub fn pellet_count(&self) -> u32 {
        self.tiles.iter().filter(|tile| tile.is_pellet()).count() as u32
    }

    pub fn pellet_cells(&self) -> Vec<(i32, i32)> {
        self.cells_of(Tile::Pellet)
    }

    pub fn power_pellet_cells(&self) -> Vec<(i32, i32)> {
        self.cells_of(Tile::PowerPellet)
    }

    fn cells_of(&self, wanted: Tile) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.tile(x, y) == wanted {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    fn door_cells(&self) -> Vec<Vec2> {
        let mut doors = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.tile(x, y) == Tile::GhostDoor {
                    doors.push(Vec2::new(x, y));
                }
            }
        }
        doors
    }

    fn find_house_exit(&self) -> Result<Vec2, MazeError> {
        let doors = self.door_cells();
        if doors.is_empty() {
            return Err(MazeError::MissingDoor);
        }
        for door in &doors {
            for (dx, dy) in [(0, -1), (-1, 0), (0, 1), (1, 0)] {
                let neighbor = Vec2::new(door.x + dx, door.y + dy);
                let tile = self.tile(neighbor.x, neighbor.y);
                if !tile.is_house() && tile != Tile::Wall {
                    return Ok(neighbor);
                }
            }
        }
        Err(MazeError::SealedDoor)
    }

    /// Flood-fills the house from its door cells; every interior tile must
    /// be reached or respawning ghosts could get stranded.
    fn check_interior_reachable(&self) -> Result<(), MazeError> {
        let interior: HashSet<(i32, i32)> = self
            .cells_of(Tile::GhostInterior)
            .into_iter()
            .collect();
        let mut seen: HashSet<(i32, i32)> = HashSet::new();
        let mut queue: VecDeque<(i32, i32)> = self
            .door_cells()
            .into_iter()
            .map(|door| (door.x, door.y))
            .collect();
        while let Some((x, y)) = queue.pop_front() {
            for (dx, dy) in [(0, -1), (-1, 0), (0, 1), (1, 0)] {
                let next = (x + dx, y + dy);
                if interior.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        if seen.len() == interior.len() {
            Ok(())
        } else {
            Err(MazeError::UnreachableInterior)
        }
    }
}
