/// Reference cadence for the external driver loop. The engine itself only
/// counts ticks; the host decides how fast to call `step`.
pub const TICK_MS: u64 = 120;

pub const PELLET_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const GHOST_EATEN_SCORE: u32 = 200;

/// How many ticks power mode lasts once a power pellet is eaten.
pub const POWER_MODE_TICKS: u32 = 50;

/// How far ahead of the player's facing the ambusher aims.
pub const AMBUSH_LOOKAHEAD: i32 = 4;

/// Ticks a frightened ghost rests between moves (half speed).
pub const FRIGHTENED_REST_TICKS: u32 = 1;

/// Default chance per tick that a semi-erratic ghost aims at the player
/// instead of a random tile.
pub const DEFAULT_PURSUIT_BIAS: f32 = 0.4;

/// Default chance per tick that a frightened ghost ignores its target and
/// picks uniformly among legal moves.
pub const DEFAULT_FRIGHTENED_SCATTER: f32 = 0.7;
