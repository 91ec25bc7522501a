use std::collections::BTreeSet;

use ndarray::{Array1, Array3, ArrayView1, ArrayView3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::agent::Agent;
use crate::config::GridConfig;
use crate::error::{Error, Result};

pub const N_ACTIONS: usize = 4;

// Action
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Movement {
    Up,
    Right,
    Down,
    Left,
}

impl Movement {
    /// In index order: Up, Right, Down, Left.
    pub const ALL: [Movement; N_ACTIONS] =
        [Movement::Up, Movement::Right, Movement::Down, Movement::Left];

    pub fn into_vector(self) -> (isize, isize) {
        match self {
            Movement::Up    => (-1, 0),
            Movement::Down  => ( 1, 0),
            Movement::Left  => ( 0,-1),
            Movement::Right => ( 0, 1),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(Error::InvalidAction(index))
    }

    pub fn symbol(self) -> char {
        match self {
            Movement::Up    => '↑',
            Movement::Right => '→',
            Movement::Down  => '↓',
            Movement::Left  => '←',
        }
    }

    /// The two slip directions: `(a + 1) mod 4` and `(a - 1) mod 4`.
    pub fn perpendicular(self) -> [Movement; 2] {
        let i = self.index();
        [
            Self::ALL[(i + 1) % N_ACTIONS],
            Self::ALL[(i + N_ACTIONS - 1) % N_ACTIONS],
        ]
    }
}

/// Square grid MDP with walls, penalty cells and terminal goals.
///
/// States are row-major indices in `0..size * size`. Rewards are paid on
/// arrival. The transition table is filled once in `new` and never
/// changes; the only mutable part afterwards is the agent.
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: usize,
    n_states: usize,
    initial_state: usize,
    terminal_states: BTreeSet<usize>,
    walls: BTreeSet<usize>,
    penalty_states: BTreeSet<usize>,
    rewards: Array1<f64>,
    main_transition_prob: f64,
    transition_probs: Array3<f64>,
    agent: Agent,
    rng: StdRng,
}

impl GridWorld {
    pub fn new(config: &GridConfig) -> Result<Self> {
        config.validate()?;
        let size = config.size;
        let n_states = size * size;
        let layout = config.layout();
        let to_state = |&(row, col): &(usize, usize)| row * size + col;

        let terminal_states: BTreeSet<usize> = layout.terminal.iter().map(to_state).collect();
        let walls: BTreeSet<usize> = layout.walls.iter().map(to_state).collect();
        let penalty_states: BTreeSet<usize> = layout.penalties.iter().map(to_state).collect();

        let mut rewards = Array1::<f64>::zeros(n_states);
        for &s in terminal_states.iter() {
            rewards[s] = 1.0;
        }
        for &s in penalty_states.iter() {
            rewards[s] = -1.0;
        }

        let initial_state = 0;
        let mut env = Self {
            size,
            n_states,
            initial_state,
            terminal_states,
            walls,
            penalty_states,
            rewards,
            main_transition_prob: config.main_transition_prob,
            transition_probs: Array3::zeros((n_states, N_ACTIONS, n_states)),
            agent: Agent::new(initial_state),
            rng: StdRng::seed_from_u64(config.seed),
        };
        env.setup_transition_table();
        Ok(env)
    }

    /// The default layout on a `size` x `size` grid.
    pub fn standard(size: usize, seed: u64) -> Result<Self> {
        Self::new(&GridConfig {
            seed,
            ..GridConfig::with_size(size)
        })
    }

    // Mass for coincident destinations is summed, so a cell boxed in on
    // every side keeps probability 1.0 on itself.
    fn setup_transition_table(&mut self) {
        let slip = (1.0 - self.main_transition_prob) / 2.0;
        for s in 0..self.n_states {
            for a in Movement::ALL {
                let intended = self.transition(s, a);
                self.transition_probs[[s, a.index(), intended]] += self.main_transition_prob;
                for p in a.perpendicular() {
                    let slipped = self.transition(s, p);
                    self.transition_probs[[s, a.index(), slipped]] += slip;
                }
            }
        }
        debug!(
            size = self.size,
            n_states = self.n_states,
            walls = self.walls.len(),
            "transition table built"
        );
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn initial_state(&self) -> usize {
        self.initial_state
    }

    pub fn terminal_states(&self) -> &BTreeSet<usize> {
        &self.terminal_states
    }

    pub fn walls(&self) -> &BTreeSet<usize> {
        &self.walls
    }

    pub fn penalty_states(&self) -> &BTreeSet<usize> {
        &self.penalty_states
    }

    pub fn is_terminal(&self, state: usize) -> bool {
        self.terminal_states.contains(&state)
    }

    pub fn is_wall(&self, state: usize) -> bool {
        self.walls.contains(&state)
    }

    pub fn is_penalty(&self, state: usize) -> bool {
        self.penalty_states.contains(&state)
    }

    pub fn rewards(&self) -> ArrayView1<'_, f64> {
        self.rewards.view()
    }

    pub fn reward(&self, state: usize) -> f64 {
        self.rewards[state]
    }

    pub fn main_transition_prob(&self) -> f64 {
        self.main_transition_prob
    }

    pub fn transition_probs(&self) -> ArrayView3<'_, f64> {
        self.transition_probs.view()
    }

    pub fn transition_prob(&self, state: usize, action: Movement, next: usize) -> f64 {
        self.transition_probs[[state, action.index(), next]]
    }

    pub fn state_to_index(&self, state: usize) -> (usize, usize) {
        (state / self.size, state % self.size)
    }

    pub fn index_to_state(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    fn check_movement(&self, state: usize, movement_vec: (isize, isize)) -> Option<usize> {
        let (row, col) = self.state_to_index(state);
        let size = self.size as isize;
        let new_row = row as isize + movement_vec.0;
        let new_col = col as isize + movement_vec.1;

        if new_row < 0 || new_row >= size || new_col < 0 || new_col >= size {
            return None;
        }
        let next = self.index_to_state(new_row as usize, new_col as usize);
        if self.walls.contains(&next) {
            return None;
        }
        Some(next)
    }

    /// Deterministic geometric result of `action`. Bumping into the border
    /// or a wall leaves the agent where it was.
    pub fn transition(&self, state: usize, action: Movement) -> usize {
        self.check_movement(state, action.into_vector())
            .unwrap_or(state)
    }

    /// Distinct outcomes of the intended move and its two slips, intended
    /// destination first.
    pub fn get_possible_successors(&self, state: usize, action: Movement) -> Vec<usize> {
        let [p1, p2] = action.perpendicular();
        let mut successors = Vec::with_capacity(3);
        for a in [action, p1, p2] {
            let next = self.transition(state, a);
            if !successors.contains(&next) {
                successors.push(next);
            }
        }
        successors
    }

    /// One sampled move: the intended action with `main_transition_prob`,
    /// otherwise one of the perpendicular actions chosen uniformly.
    pub fn transition_w_perp(&mut self, state: usize, action: Movement) -> usize {
        let mut action = action;
        if self.rng.gen::<f64>() >= self.main_transition_prob {
            let perp = action.perpendicular();
            action = perp[self.rng.gen_range(0..perp.len())];
        }
        self.transition(state, action)
    }

    /// Moves the agent and reports whether it reached a terminal state.
    pub fn move_agent(&mut self, action: Movement) -> bool {
        let next = self.transition_w_perp(self.agent.state(), action);
        let reward = self.rewards[next];
        self.agent.record(next, reward);
        self.is_terminated()
    }

    pub fn reset_agent(&mut self) {
        self.agent.reset();
    }

    pub fn is_terminated(&self) -> bool {
        self.is_terminal(self.agent.state())
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_state(&self) -> usize {
        self.agent.state()
    }

    pub fn agent_trace(&self) -> &[Option<usize>] {
        self.agent.trace()
    }

    /// Reseeds the slip sampler.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}
