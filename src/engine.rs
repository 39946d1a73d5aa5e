use thiserror::Error;

use crate::constants::{
    AMBUSH_LOOKAHEAD, DEFAULT_FRIGHTENED_SCATTER, DEFAULT_PURSUIT_BIAS, FRIGHTENED_REST_TICKS,
    GHOST_EATEN_SCORE, PELLET_SCORE, POWER_MODE_TICKS, POWER_PELLET_SCORE,
};
use crate::maze::{Grid, MazeDefinition, MazeError, Tile};
use crate::rng::Rng;
use crate::types::{
    Direction, GhostKind, GhostState, GhostView, Outcome, PlayerView, RunState, RuntimeEvent,
    Snapshot, TickResult, Vec2,
};

/// Fixed candidate order for ghost move selection; equally scored moves
/// resolve to the earliest entry, which keeps runs reproducible.
const MOVE_PRIORITY: [Direction; 4] = [
    Direction::Up,
    Direction::Left,
    Direction::Down,
    Direction::Right,
];

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("run already finished")]
    RunAlreadyFinished,
}

/// Tunables for one run. Probabilities here are defaults observed to play
/// well, not contracts; hosts may override them per run.
#[derive(Clone, Copy, Debug)]
pub struct SimulationOptions {
    pub seed: u32,
    pub power_mode_ticks: u32,
    pub pursuit_bias: f32,
    pub frightened_scatter: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            power_mode_ticks: POWER_MODE_TICKS,
            pursuit_bias: DEFAULT_PURSUIT_BIAS,
            frightened_scatter: DEFAULT_FRIGHTENED_SCATTER,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PlayerInternal {
    pos: Vec2,
    facing: Direction,
    pending: Direction,
}

#[derive(Clone, Copy, Debug)]
struct GhostInternal {
    kind: GhostKind,
    pos: Vec2,
    facing: Direction,
    state: GhostState,
    home: Vec2,
    /// Ticks to sit out before acting again (frightened slowdown).
    cooldown: u32,
}

/// One tile-stepped chase run. Owns every piece of mutable state; the only
/// mutation path is `step`, called once per tick by the host's clock.
#[derive(Clone, Debug)]
pub struct Simulation {
    grid: Grid,
    rng: Rng,
    options: SimulationOptions,
    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    score: u32,
    pellets_remaining: u32,
    power_ticks_remaining: u32,
    outcome: Outcome,
    tick: u64,
}

impl Simulation {
    pub fn new(
        definition: &MazeDefinition,
        options: SimulationOptions,
    ) -> Result<Self, MazeError> {
        let grid = Grid::from_definition(definition)?;
        let pellets_remaining = grid.pellet_count();
        let rng = Rng::new(options.seed);

        let player = PlayerInternal {
            pos: definition.player_starts[0],
            facing: Direction::None,
            pending: Direction::None,
        };
        let ghosts = GhostKind::ALL
            .iter()
            .zip(definition.ghost_homes.iter())
            .map(|(&kind, &home)| GhostInternal {
                kind,
                pos: home,
                facing: Direction::Up,
                state: GhostState::LeavingHome,
                home,
                cooldown: 0,
            })
            .collect();

        Ok(Self {
            grid,
            rng,
            options,
            player,
            ghosts,
            score: 0,
            pellets_remaining,
            power_ticks_remaining: 0,
            outcome: Outcome::InProgress,
            tick: 0,
        })
    }

    /// Advances the run one tick: player move (with input buffering), then
    /// every ghost's decision against the player's fresh position, then
    /// collision and scoring. Rejected once the outcome is terminal.
    pub fn step(&mut self, requested: Direction) -> Result<TickResult, StepError> {
        if self.outcome.is_terminal() {
            return Err(StepError::RunAlreadyFinished);
        }
        self.tick += 1;

        let player_before = self.player.pos;
        let ghosts_before: Vec<Vec2> = self.ghosts.iter().map(|ghost| ghost.pos).collect();

        if requested != Direction::None {
            self.player.pending = requested;
        }
        self.advance_player();
        self.advance_ghosts();
        Ok(self.resolve(player_before, &ghosts_before))
    }

    pub fn run_state(&self) -> RunState {
        RunState {
            score: self.score,
            pellets_remaining: self.pellets_remaining,
            power_ticks_remaining: self.power_ticks_remaining,
            outcome: self.outcome,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            width: self.grid.width(),
            height: self.grid.height(),
            player: self.player_view(),
            ghosts: self.ghost_views(),
            pellets: self.grid.pellet_cells(),
            power_pellets: self.grid.power_pellet_cells(),
            run: self.run_state(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn player_view(&self) -> PlayerView {
        PlayerView {
            x: self.player.pos.x,
            y: self.player.pos.y,
            dir: self.player.facing,
        }
    }

    fn ghost_views(&self) -> Vec<GhostView> {
        self.ghosts
            .iter()
            .map(|ghost| GhostView {
                kind: ghost.kind,
                x: ghost.pos.x,
                y: ghost.pos.y,
                dir: ghost.facing,
                state: ghost.state,
            })
            .collect()
    }

    /// Destination one step from `from` in `dir`, with tunnel wrap applied.
    fn dest(&self, from: Vec2, dir: Direction) -> Vec2 {
        let (dx, dy) = dir.delta();
        let mut x = from.x + dx;
        let y = from.y + dy;
        if self.grid.is_tunnel_row(y) {
            x = self.grid.wrap_x(x);
        }
        Vec2::new(x, y)
    }

    fn advance_player(&mut self) {
        // Adopt the buffered direction only where the turn is open.
        let pending = self.player.pending;
        if pending != Direction::None && pending != self.player.facing {
            let turn = self.dest(self.player.pos, pending);
            if !self.grid.is_wall(turn.x, turn.y, None) {
                self.player.facing = pending;
            }
        }
        if self.player.facing == Direction::None {
            return;
        }
        let ahead = self.dest(self.player.pos, self.player.facing);
        if !self.grid.is_wall(ahead.x, ahead.y, None) {
            self.player.pos = ahead;
        }
    }

    fn advance_ghosts(&mut self) {
        for idx in 0..self.ghosts.len() {
            self.arrival_transition(idx);

            if self.ghosts[idx].cooldown > 0 {
                self.ghosts[idx].cooldown -= 1;
                continue;
            }

            let target = self.ghost_target(idx);
            if let Some(dir) = self.choose_ghost_move(idx, target) {
                let to = self.dest(self.ghosts[idx].pos, dir);
                self.ghosts[idx].pos = to;
                self.ghosts[idx].facing = dir;
            }

            if self.ghosts[idx].state == GhostState::Frightened {
                self.ghosts[idx].cooldown = FRIGHTENED_REST_TICKS;
            }
        }
    }

    /// Arrival-triggered state changes: a leaving ghost that stands on the
    /// house exit starts chasing; an eaten ghost that reached home turns
    /// around and leaves again.
    fn arrival_transition(&mut self, idx: usize) {
        match self.ghosts[idx].state {
            GhostState::LeavingHome if self.ghosts[idx].pos == self.grid.house_exit() => {
                self.ghosts[idx].state = GhostState::Chase;
            }
            GhostState::Eaten if self.ghosts[idx].pos == self.ghosts[idx].home => {
                self.ghosts[idx].state = GhostState::LeavingHome;
            }
            _ => {}
        }
    }

    fn ghost_target(&mut self, idx: usize) -> Vec2 {
        let ghost = self.ghosts[idx];
        match ghost.state {
            GhostState::LeavingHome => self.grid.house_exit(),
            GhostState::Eaten => ghost.home,
            GhostState::Frightened => self.random_tile(),
            GhostState::Chase => match ghost.kind {
                GhostKind::Chaser => self.player.pos,
                GhostKind::Ambusher => {
                    let (dx, dy) = self.player.facing.delta();
                    Vec2::new(
                        self.player.pos.x + dx * AMBUSH_LOOKAHEAD,
                        self.player.pos.y + dy * AMBUSH_LOOKAHEAD,
                    )
                }
                GhostKind::Wanderer | GhostKind::Prowler => {
                    if self.rng.chance(self.options.pursuit_bias) {
                        self.player.pos
                    } else {
                        self.random_tile()
                    }
                }
            },
        }
    }

    fn random_tile(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.int(0, self.grid.width() - 1),
            self.rng.int(0, self.grid.height() - 1),
        )
    }

    /// Greedy single-step selection: legal neighbors in `MOVE_PRIORITY`
    /// order, no reversing mid-chase, nearest squared distance wins. Returns
    /// `None` when the ghost is fully boxed in.
    fn choose_ghost_move(&mut self, idx: usize, target: Vec2) -> Option<Direction> {
        let ghost = self.ghosts[idx];
        let may_reverse = matches!(
            ghost.state,
            GhostState::Frightened | GhostState::LeavingHome | GhostState::Eaten
        );

        let mut legal: Vec<(Direction, Vec2)> = Vec::with_capacity(4);
        for dir in MOVE_PRIORITY {
            if !may_reverse && dir == ghost.facing.opposite() {
                continue;
            }
            let to = self.dest(ghost.pos, dir);
            if !self.grid.is_wall(to.x, to.y, Some(ghost.state)) {
                legal.push((dir, to));
            }
        }

        if legal.is_empty() {
            // Boxed in on every forward side: reverse if even that is open.
            let back = ghost.facing.opposite();
            let to = self.dest(ghost.pos, back);
            if back != Direction::None && !self.grid.is_wall(to.x, to.y, Some(ghost.state)) {
                return Some(back);
            }
            return None;
        }

        if ghost.state == GhostState::Frightened && self.rng.chance(self.options.frightened_scatter)
        {
            let pick = self.rng.pick_index(legal.len());
            return Some(legal[pick].0);
        }

        let mut best = legal[0].0;
        let mut best_distance = squared_distance(legal[0].1, target);
        for &(dir, to) in &legal[1..] {
            let distance = squared_distance(to, target);
            if distance < best_distance {
                best = dir;
                best_distance = distance;
            }
        }
        Some(best)
    }

    /// Post-move reconciliation, in fixed order: pellet pickup, win check,
    /// power-mode decay, overlap resolution. A terminal outcome set by an
    /// earlier stage short-circuits the later ones.
    fn resolve(&mut self, player_before: Vec2, ghosts_before: &[Vec2]) -> TickResult {
        let mut events = Vec::new();
        let mut score_delta = 0u32;
        let mut pellet_eaten = false;
        let mut power_pellet_eaten = false;
        let mut ghosts_eaten = Vec::new();

        let pos = self.player.pos;
        match self.grid.consume(pos.x, pos.y) {
            Tile::Pellet => {
                score_delta += PELLET_SCORE;
                self.pellets_remaining = self.pellets_remaining.saturating_sub(1);
                pellet_eaten = true;
                events.push(RuntimeEvent::PelletEaten { x: pos.x, y: pos.y });
            }
            Tile::PowerPellet => {
                score_delta += POWER_PELLET_SCORE;
                self.pellets_remaining = self.pellets_remaining.saturating_sub(1);
                power_pellet_eaten = true;
                self.power_ticks_remaining = self.options.power_mode_ticks;
                events.push(RuntimeEvent::PowerPelletEaten { x: pos.x, y: pos.y });
                for ghost in &mut self.ghosts {
                    if !matches!(ghost.state, GhostState::Eaten | GhostState::LeavingHome) {
                        ghost.state = GhostState::Frightened;
                    }
                }
                events.push(RuntimeEvent::GhostsFrightened);
            }
            _ => {}
        }

        if self.pellets_remaining == 0 {
            self.outcome = Outcome::Won;
            events.push(RuntimeEvent::LevelCleared);
        }

        // Decay skips the tick that armed power mode, so the reported
        // counter equals the configured duration on that tick.
        if self.outcome == Outcome::InProgress
            && !power_pellet_eaten
            && self.power_ticks_remaining > 0
        {
            self.power_ticks_remaining -= 1;
            if self.power_ticks_remaining == 0 {
                for ghost in &mut self.ghosts {
                    if ghost.state == GhostState::Frightened {
                        ghost.state = GhostState::Chase;
                        ghost.cooldown = 0;
                    }
                }
                events.push(RuntimeEvent::PowerModeExpired);
            }
        }

        if self.outcome == Outcome::InProgress {
            for idx in 0..self.ghosts.len() {
                let overlap = self.ghosts[idx].pos == self.player.pos;
                let swapped = self.ghosts[idx].pos == player_before
                    && ghosts_before[idx] == self.player.pos;
                if !overlap && !swapped {
                    continue;
                }
                match self.ghosts[idx].state {
                    GhostState::Frightened => {
                        score_delta += GHOST_EATEN_SCORE;
                        self.ghosts[idx].state = GhostState::Eaten;
                        // Shed any frightened rest; eaten ghosts act every tick.
                        self.ghosts[idx].cooldown = 0;
                        ghosts_eaten.push(self.ghosts[idx].kind);
                        events.push(RuntimeEvent::GhostEaten {
                            kind: self.ghosts[idx].kind,
                        });
                    }
                    GhostState::Chase | GhostState::LeavingHome => {
                        self.outcome = Outcome::Lost;
                        events.push(RuntimeEvent::PlayerCaught {
                            kind: self.ghosts[idx].kind,
                        });
                        break;
                    }
                    GhostState::Eaten => {}
                }
            }
        }

        self.score += score_delta;

        TickResult {
            tick: self.tick,
            score_delta,
            pellet_eaten,
            power_pellet_eaten,
            ghosts_eaten,
            outcome: self.outcome,
            player: self.player_view(),
            ghosts: self.ghost_views(),
            events,
        }
    }
}

fn squared_distance(a: Vec2, b: Vec2) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::{Simulation, SimulationOptions, StepError};
    use crate::constants::{GHOST_EATEN_SCORE, PELLET_SCORE, POWER_PELLET_SCORE};
    use crate::maze::MazeDefinition;
    use crate::types::{Direction, GhostState, Outcome, RuntimeEvent, Vec2};

    fn def_with_rows(rows: &[&str]) -> MazeDefinition {
        MazeDefinition {
            rows: rows.iter().map(|row| row.to_string()).collect(),
            tunnel_rows: vec![5],
            player_starts: vec![Vec2::new(1, 1)],
            ghost_homes: vec![
                Vec2::new(3, 3),
                Vec2::new(4, 3),
                Vec2::new(5, 3),
                Vec2::new(6, 3),
            ],
        }
    }

    /// 10x7 maze with an open top corridor, a four-cell ghost house, and a
    /// fully open tunnel row.
    fn open_def() -> MazeDefinition {
        def_with_rows(&[
            "##########",
            "#        #",
            "#.##==##.#",
            "#.#HHHH#.#",
            "#.######.#",
            "          ",
            "##########",
        ])
    }

    fn sim(def: &MazeDefinition) -> Simulation {
        Simulation::new(def, SimulationOptions::default()).expect("maze loads")
    }

    /// Parks every ghost so a test can script the player alone.
    fn freeze_ghosts(sim: &mut Simulation) {
        for ghost in &mut sim.ghosts {
            ghost.cooldown = u32::MAX;
        }
    }

    #[test]
    fn three_steps_right_on_an_empty_row() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        for _ in 0..3 {
            sim.step(Direction::Right).expect("run in progress");
        }
        assert_eq!(sim.player.pos, Vec2::new(4, 1));
        assert_eq!(sim.player.facing, Direction::Right);
        assert_eq!(sim.run_state().score, 0);
    }

    #[test]
    fn blocked_entity_keeps_position_but_adopts_facing() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.step(Direction::Up).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(1, 1));
        // The turn itself was blocked, so facing stays idle too.
        assert_eq!(sim.player.facing, Direction::None);

        sim.step(Direction::Right).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(2, 1));
        // Walking right along the wall: an Up request is ignored while
        // blocked, and the entity keeps sliding on its old facing.
        sim.step(Direction::Up).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(3, 1));
        assert_eq!(sim.player.facing, Direction::Right);
    }

    #[test]
    fn tunnel_wraps_both_ways_and_only_there() {
        let mut def = open_def();
        def.player_starts = vec![Vec2::new(0, 5)];
        let mut sim = sim(&def);
        freeze_ghosts(&mut sim);

        sim.step(Direction::Left).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(9, 5));
        sim.step(Direction::Right).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(0, 5));

        // The top corridor is not a tunnel row: the side wall holds.
        let mut sim = super::Simulation::new(&open_def(), SimulationOptions::default())
            .expect("maze loads");
        freeze_ghosts(&mut sim);
        sim.step(Direction::Left).expect("run in progress");
        assert_eq!(sim.player.pos, Vec2::new(1, 1));
    }

    #[test]
    fn power_pellet_frightens_every_chasing_ghost() {
        let mut def = open_def();
        def.rows[1] = "#o       #".to_string();
        def.player_starts = vec![Vec2::new(2, 1)];
        let mut sim = sim(&def);
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Chase;
        sim.ghosts[1].state = GhostState::Chase;
        // An eaten ghost still on its way home; parked on its home tile it
        // would relaunch at the top of the tick.
        sim.ghosts[2].state = GhostState::Eaten;
        sim.ghosts[2].pos = Vec2::new(8, 1);
        sim.ghosts[3].state = GhostState::LeavingHome;

        let result = sim.step(Direction::Left).expect("run in progress");

        assert!(result.power_pellet_eaten);
        assert_eq!(result.score_delta, POWER_PELLET_SCORE);
        assert_eq!(sim.ghosts[0].state, GhostState::Frightened);
        assert_eq!(sim.ghosts[1].state, GhostState::Frightened);
        // Eaten and leaving ghosts are exempt.
        assert_eq!(sim.ghosts[2].state, GhostState::Eaten);
        assert_eq!(sim.ghosts[3].state, GhostState::LeavingHome);
        assert_eq!(
            sim.run_state().power_ticks_remaining,
            SimulationOptions::default().power_mode_ticks
        );
        assert!(result.events.contains(&RuntimeEvent::GhostsFrightened));
    }

    #[test]
    fn power_mode_expiry_restores_chase_in_the_same_tick() {
        let mut def = open_def();
        def.rows[1] = "#o       #".to_string();
        def.player_starts = vec![Vec2::new(2, 1)];
        let options = SimulationOptions {
            power_mode_ticks: 2,
            ..SimulationOptions::default()
        };
        let mut sim = Simulation::new(&def, options).expect("maze loads");
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Chase;
        sim.ghosts[1].state = GhostState::Chase;

        sim.step(Direction::Left).expect("eat the power pellet");
        assert_eq!(sim.run_state().power_ticks_remaining, 2);

        sim.step(Direction::None).expect("decay tick");
        assert_eq!(sim.run_state().power_ticks_remaining, 1);
        assert_eq!(sim.ghosts[0].state, GhostState::Frightened);

        let result = sim.step(Direction::None).expect("expiry tick");
        assert_eq!(sim.run_state().power_ticks_remaining, 0);
        assert_eq!(sim.ghosts[0].state, GhostState::Chase);
        assert_eq!(sim.ghosts[1].state, GhostState::Chase);
        assert!(result.events.contains(&RuntimeEvent::PowerModeExpired));
    }

    #[test]
    fn catching_a_frightened_ghost_scores_and_marks_it_eaten() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Frightened;
        sim.ghosts[0].pos = Vec2::new(2, 1);

        let result = sim.step(Direction::Right).expect("run in progress");

        assert_eq!(result.score_delta, GHOST_EATEN_SCORE);
        assert_eq!(result.ghosts_eaten, vec![sim.ghosts[0].kind]);
        assert_eq!(sim.ghosts[0].state, GhostState::Eaten);
        assert_eq!(result.outcome, Outcome::InProgress);
    }

    #[test]
    fn eaten_ghost_hurries_home_without_resting() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Frightened;
        sim.ghosts[0].pos = Vec2::new(2, 1);
        // Mid-rest when the player arrives.
        sim.ghosts[0].cooldown = 2;

        sim.step(Direction::Right).expect("run in progress");
        assert_eq!(sim.ghosts[0].state, GhostState::Eaten);
        let caught_at = sim.ghosts[0].pos;

        sim.step(Direction::None).expect("run in progress");
        assert_ne!(
            sim.ghosts[0].pos, caught_at,
            "eaten ghost sat out a tick instead of heading home"
        );
    }

    #[test]
    fn power_mode_expiry_clears_the_frightened_rest() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Frightened;
        sim.ghosts[0].pos = Vec2::new(8, 1);
        sim.ghosts[0].cooldown = 2;
        sim.power_ticks_remaining = 1;

        sim.step(Direction::None).expect("expiry tick");
        assert_eq!(sim.ghosts[0].state, GhostState::Chase);
        let parked = sim.ghosts[0].pos;

        sim.step(Direction::None).expect("run in progress");
        assert_ne!(
            sim.ghosts[0].pos, parked,
            "restored chaser sat out a leftover frightened rest"
        );
    }

    #[test]
    fn overlapping_an_eaten_ghost_is_harmless() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Eaten;
        sim.ghosts[0].pos = Vec2::new(2, 1);

        let result = sim.step(Direction::Right).expect("run in progress");
        assert_eq!(result.score_delta, 0);
        assert_eq!(result.outcome, Outcome::InProgress);
    }

    #[test]
    fn chase_contact_loses_the_run_and_freezes_state() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Chase;
        sim.ghosts[0].pos = Vec2::new(2, 1);

        let result = sim.step(Direction::Right).expect("run in progress");
        assert_eq!(result.outcome, Outcome::Lost);
        assert!(matches!(
            result.events.last(),
            Some(RuntimeEvent::PlayerCaught { .. })
        ));

        let frozen = sim.run_state();
        let player = sim.player.pos;
        for _ in 0..3 {
            assert_eq!(sim.step(Direction::Left), Err(StepError::RunAlreadyFinished));
        }
        assert_eq!(sim.run_state(), frozen);
        assert_eq!(sim.player.pos, player);
    }

    #[test]
    fn swapping_tiles_with_a_ghost_counts_as_contact() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Chase;
        sim.ghosts[0].pos = Vec2::new(2, 1);
        sim.ghosts[0].cooldown = 0;
        sim.ghosts[0].facing = Direction::Left;

        // The chaser targets the player's fresh tile: it moves left into
        // (1,1) while the player moves right into (2,1) - a pass-through.
        let result = sim.step(Direction::Right).expect("run in progress");
        assert_eq!(result.outcome, Outcome::Lost);
    }

    #[test]
    fn last_pellet_wins_on_the_same_tick() {
        let mut sim = sim(&def_with_rows(&[
            "##########",
            "# .      #",
            "# ##==## #",
            "# #HHHH# #",
            "# ###### #",
            "          ",
            "##########",
        ]));
        assert_eq!(sim.run_state().pellets_remaining, 1);

        let result = sim.step(Direction::Right).expect("run in progress");
        assert_eq!(result.outcome, Outcome::Won);
        assert_eq!(result.score_delta, PELLET_SCORE);
        assert!(result.events.contains(&RuntimeEvent::LevelCleared));
        assert_eq!(sim.run_state().pellets_remaining, 0);

        assert_eq!(sim.step(Direction::Right), Err(StepError::RunAlreadyFinished));
    }

    #[test]
    fn pellets_remaining_never_increases() {
        let mut sim = Simulation::new(
            &MazeDefinition::classic(),
            SimulationOptions {
                seed: 2024,
                ..SimulationOptions::default()
            },
        )
        .expect("classic maze loads");
        let mut previous = sim.run_state().pellets_remaining;
        let inputs = [
            Direction::Left,
            Direction::Up,
            Direction::Right,
            Direction::Down,
        ];
        for tick in 0..300 {
            match sim.step(inputs[tick % inputs.len()]) {
                Ok(result) => {
                    let remaining = sim.run_state().pellets_remaining;
                    assert!(remaining <= previous);
                    if remaining == 0 {
                        assert_eq!(result.outcome, Outcome::Won);
                    }
                    previous = remaining;
                }
                Err(StepError::RunAlreadyFinished) => break,
            }
        }
    }

    #[test]
    fn leaving_ghost_exits_the_house_then_chases() {
        let mut sim = sim(&open_def());
        let exit = sim.grid.house_exit();
        assert_eq!(exit, Vec2::new(4, 1));

        let mut reached = false;
        for _ in 0..12 {
            if sim.step(Direction::None).is_err() {
                break;
            }
            if sim.ghosts[1].state == GhostState::Chase {
                reached = true;
                break;
            }
        }
        assert!(reached, "ghost never cleared the house");
        // Once outside, the house reads as a wall again for it.
        assert!(sim.grid.is_wall(4, 2, Some(sim.ghosts[1].state)));
    }

    #[test]
    fn eaten_ghost_returns_home_and_leaves_again() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[2].state = GhostState::Eaten;
        sim.ghosts[2].pos = Vec2::new(1, 1);
        sim.ghosts[2].cooldown = 0;
        // Park the player away from the route home.
        sim.player.pos = Vec2::new(8, 1);

        let mut relaunched = false;
        for _ in 0..20 {
            if sim.step(Direction::None).is_err() {
                break;
            }
            if sim.ghosts[2].state == GhostState::LeavingHome {
                relaunched = true;
                break;
            }
        }
        assert!(relaunched, "eaten ghost never reached home");
    }

    #[test]
    fn chasing_ghosts_never_reverse_unless_cornered() {
        let mut sim = Simulation::new(
            &MazeDefinition::classic(),
            SimulationOptions {
                seed: 77,
                ..SimulationOptions::default()
            },
        )
        .expect("classic maze loads");

        for tick in 0..200 {
            let before: Vec<_> = sim
                .ghosts
                .iter()
                .map(|ghost| (ghost.state, ghost.facing, ghost.pos))
                .collect();
            let inputs = [Direction::Left, Direction::Down, Direction::Right];
            if sim.step(inputs[tick % inputs.len()]).is_err() {
                break;
            }
            for (ghost, (state, facing, pos)) in sim.ghosts.iter().zip(before.iter()) {
                if *state != GhostState::Chase || ghost.state != GhostState::Chase {
                    continue;
                }
                if ghost.pos == *pos {
                    continue;
                }
                assert_ne!(
                    ghost.facing,
                    facing.opposite(),
                    "chasing ghost reversed with open forward moves"
                );
            }
        }
    }

    #[test]
    fn no_entity_ever_rests_on_a_wall() {
        let mut sim = Simulation::new(
            &MazeDefinition::classic(),
            SimulationOptions {
                seed: 4242,
                ..SimulationOptions::default()
            },
        )
        .expect("classic maze loads");
        let mut inputs = crate::rng::Rng::new(9);

        for _ in 0..400 {
            let requested = match inputs.int(0, 3) {
                0 => Direction::Up,
                1 => Direction::Down,
                2 => Direction::Left,
                _ => Direction::Right,
            };
            if sim.step(requested).is_err() {
                break;
            }
            let player = sim.player.pos;
            assert!(!sim.grid.is_wall(player.x, player.y, None));
            for ghost in &sim.ghosts {
                assert!(!sim.grid.is_wall(ghost.pos.x, ghost.pos.y, Some(ghost.state)));
            }
        }
    }

    #[test]
    fn frightened_ghosts_move_every_other_tick() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        sim.ghosts[0].state = GhostState::Frightened;
        sim.ghosts[0].pos = Vec2::new(8, 1);
        sim.ghosts[0].cooldown = 0;
        sim.player.pos = Vec2::new(1, 1);

        let mut moves = 0;
        let mut previous = sim.ghosts[0].pos;
        for _ in 0..10 {
            sim.step(Direction::None).expect("run in progress");
            if sim.ghosts[0].pos != previous {
                moves += 1;
                previous = sim.ghosts[0].pos;
            }
        }
        assert_eq!(moves, 5);
    }

    #[test]
    fn same_seed_replays_identically() {
        let options = SimulationOptions {
            seed: 424_242,
            ..SimulationOptions::default()
        };
        let def = MazeDefinition::classic();
        let mut a = Simulation::new(&def, options).expect("classic maze loads");
        let mut b = Simulation::new(&def, options).expect("classic maze loads");
        let mut inputs = crate::rng::Rng::new(31);

        for _ in 0..400 {
            let requested = match inputs.int(0, 3) {
                0 => Direction::Up,
                1 => Direction::Down,
                2 => Direction::Left,
                _ => Direction::Right,
            };
            let ra = a.step(requested);
            let rb = b.step(requested);
            match (ra, rb) {
                (Ok(ta), Ok(tb)) => {
                    assert_eq!(ta.player, tb.player);
                    assert_eq!(ta.ghosts, tb.ghosts);
                    assert_eq!(ta.score_delta, tb.score_delta);
                    assert_eq!(ta.outcome, tb.outcome);
                }
                (Err(ea), Err(eb)) => {
                    assert_eq!(ea, eb);
                    break;
                }
                _ => panic!("runs diverged"),
            }
            assert_eq!(a.run_state(), b.run_state());
        }
    }

    #[test]
    fn snapshot_reflects_consumed_pellets() {
        let mut sim = sim(&open_def());
        freeze_ghosts(&mut sim);
        let before = sim.snapshot();
        assert_eq!(
            before.pellets.len() as u32 + before.power_pellets.len() as u32,
            sim.run_state().pellets_remaining
        );

        // (1,2) holds a pellet below the start; step onto it.
        sim.step(Direction::Down).expect("run in progress");
        let after = sim.snapshot();
        assert_eq!(after.pellets.len(), before.pellets.len() - 1);
        assert!(!after.pellets.contains(&(1, 2)));
    }
}
