pub mod constants;
pub mod engine;
pub mod maze;
pub mod rng;
pub mod types;

pub use engine::{Simulation, SimulationOptions, StepError};
pub use maze::{MazeDefinition, MazeError};
pub use types::{Direction, GhostKind, GhostState, Outcome, RunState, Snapshot, TickResult};
