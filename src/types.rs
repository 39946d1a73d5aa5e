use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

}

/// Which targeting personality a ghost uses while chasing. Fixed at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostKind {
    /// Aims straight at the player's tile.
    Chaser,
    /// Aims a few tiles ahead of the player's facing.
    Ambusher,
    /// Aims at the player only part of the time, otherwise wanders.
    Wanderer,
    /// Same rule as Wanderer; a second semi-erratic ghost.
    Prowler,
}

impl GhostKind {
    pub const ALL: [GhostKind; 4] = [
        GhostKind::Chaser,
        GhostKind::Ambusher,
        GhostKind::Wanderer,
        GhostKind::Prowler,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    LeavingHome,
    Chase,
    Frightened,
    Eaten,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Won,
    Lost,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Self::InProgress
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GhostView {
    pub kind: GhostKind,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub state: GhostState,
}

/// Read-only run status for the host's HUD and the leaderboard hand-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub score: u32,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: u32,
    #[serde(rename = "powerTicksRemaining")]
    pub power_ticks_remaining: u32,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PelletEaten { x: i32, y: i32 },
    PowerPelletEaten { x: i32, y: i32 },
    GhostsFrightened,
    PowerModeExpired,
    GhostEaten { kind: GhostKind },
    PlayerCaught { kind: GhostKind },
    LevelCleared,
}

/// Everything the presentation layer needs out of one `step` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickResult {
    pub tick: u64,
    #[serde(rename = "scoreDelta")]
    pub score_delta: u32,
    #[serde(rename = "pelletEaten")]
    pub pellet_eaten: bool,
    #[serde(rename = "powerPelletEaten")]
    pub power_pellet_eaten: bool,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: Vec<GhostKind>,
    pub outcome: Outcome,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub events: Vec<RuntimeEvent>,
}

/// Full render snapshot: entity views plus the remaining consumables.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub pellets: Vec<(i32, i32)>,
    #[serde(rename = "powerPellets")]
    pub power_pellets: Vec<(i32, i32)>,
    pub run: RunState,
}
