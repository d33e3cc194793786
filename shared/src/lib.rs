use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CLIENT_VERSION: u32 = 1;

/// Side length of one grid cell in world units.
pub const CELL_SIZE: f32 = 1.0;
/// Forward speed of the local player in world units per second.
pub const PLAYER_SPEED: f32 = 3.0;
/// Yaw rate of the local player in radians per second.
pub const TURN_SPEED: f32 = 2.5;
/// Row (z index) that holds valid spawn cells.
pub const SPAWN_ROW: usize = 1;

pub const ANIM_IDLE: &str = "idle";
pub const ANIM_WALK: &str = "walk";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// World position of the center of cell `(x, z)` at floor height.
    pub fn from_cell(x: usize, z: usize) -> Self {
        Self::new(x as f32 * CELL_SIZE, 0.0, z as f32 * CELL_SIZE)
    }

    /// Grid cell containing this position, or `None` when it lies at negative coordinates.
    pub fn cell(&self) -> Option<(usize, usize)> {
        let x = (self.x / CELL_SIZE).round();
        let z = (self.z / CELL_SIZE).round();
        if x < 0.0 || z < 0.0 {
            return None;
        }
        Some((x as usize, z as usize))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Open,
    Wall,
}

impl Cell {
    pub fn code(self) -> u8 {
        match self {
            Cell::Open => 0,
            Cell::Wall => 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell code {code} at ({x}, {z})")]
    UnknownCell { x: usize, z: usize, code: u8 },
}

/// Rectangular maze layout indexed `[x][z]`.
///
/// A `Grid` can only be built through [`Grid::try_from`], so every value in
/// circulation is rectangular and contains only known cell codes. The same
/// check runs when a grid is decoded off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid {
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// Builds a grid with every cell open.
    pub fn open(width: usize, depth: usize) -> Self {
        Self {
            cells: vec![vec![Cell::Open; depth]; width],
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    pub fn depth(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn get(&self, x: usize, z: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|column| column.get(z)).copied()
    }

    pub fn is_open(&self, x: usize, z: usize) -> bool {
        self.get(x, z) == Some(Cell::Open)
    }

    /// Iterates every cell as `(x, z, cell)`, x-major.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(x, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(z, cell)| (x, z, *cell))
        })
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = GridError;

    fn try_from(codes: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        let expected = codes.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(codes.len());

        for (x, column) in codes.into_iter().enumerate() {
            if column.len() != expected {
                return Err(GridError::Ragged {
                    row: x,
                    expected,
                    found: column.len(),
                });
            }

            let parsed = column
                .into_iter()
                .enumerate()
                .map(|(z, code)| match code {
                    0 => Ok(Cell::Open),
                    1 => Ok(Cell::Wall),
                    code => Err(GridError::UnknownCell { x, z, code }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            cells.push(parsed);
        }

        Ok(Self { cells })
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.cells
            .into_iter()
            .map(|column| column.into_iter().map(Cell::code).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub color: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub animation: String,
}

impl Player {
    pub fn new(id: u32, name: &str, color: &str, position: Vec3) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            position,
            rotation: Vec3::ZERO,
            animation: ANIM_IDLE.to_string(),
        }
    }
}

/// Identity-only reference to a player, as carried by quit notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: u32,
}

/// Packets pushed from the server to the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerPacket {
    Connected { client_id: u32 },
    SyncWorld { grid: Grid, players: Vec<Player> },
    PlayerJoin { player: Player },
    PlayerQuit { player: PlayerRef },
    PlayerEscape { player: Player },
    MapRegen { grid: Grid },
    Update { players: Vec<Player> },
    Disconnected { reason: String },
}

/// Packets sent from the client to the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientPacket {
    Connect {
        client_version: u32,
        name: String,
        color: String,
    },
    SyncWorld,
    Move {
        position: Vec3,
        rotation: Vec3,
        animation: String,
    },
    PlayerEscape,
    Disconnect,
}
