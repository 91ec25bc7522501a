use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::AlgorithmConfig;
use crate::environment::{GridWorld, Movement, N_ACTIONS};
use crate::error::{Error, Result};
use crate::policy::TablePolicy;

pub const DEFAULT_MAX_STEPS: usize = 1000;

/// The generalized policy iteration variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    /// Bellman expectation backup under the current stochastic policy.
    PolicyIteration,
    /// Bellman optimality backup, policy only read back greedily.
    ValueIteration,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmKind::PolicyIteration => write!(f, "Policy Iteration"),
            AlgorithmKind::ValueIteration => write!(f, "Value Iteration"),
        }
    }
}

/// Result of one evaluation + improvement cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub delta: f64,
    pub policy_stable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    Converged { steps: usize, delta: f64 },
    /// `max_steps` ran out first. Not an error.
    Exhausted { steps: usize, delta: f64 },
}

impl RunOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, RunOutcome::Converged { .. })
    }

    pub fn steps(&self) -> usize {
        match *self {
            RunOutcome::Converged { steps, .. } | RunOutcome::Exhausted { steps, .. } => steps,
        }
    }

    pub fn delta(&self) -> f64 {
        match *self {
            RunOutcome::Converged { delta, .. } | RunOutcome::Exhausted { delta, .. } => delta,
        }
    }
}

/// Outcome of letting the agent follow `select_action` from the start cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub trace: Vec<Option<usize>>,
    pub reward: f64,
    pub moves: usize,
    pub reached_terminal: bool,
}

/// A dynamic-programming solver bound to the dimensions of one `GridWorld`.
///
/// The environment is borrowed per call rather than stored, so any number
/// of algorithms can work against the same model. Each one owns its value,
/// policy and Q tables.
#[derive(Debug, Clone)]
pub struct Algorithm {
    kind: AlgorithmKind,
    gamma: f64,
    theta: f64,
    n_states: usize,
    rng: StdRng,
    values: Array1<f64>,
    policy: TablePolicy,
    q_values: Array2<f64>,
    evaluations_since_improvement: usize,
    last_delta: Option<f64>,
}

impl Algorithm {
    pub fn new(kind: AlgorithmKind, env: &GridWorld, config: &AlgorithmConfig) -> Result<Self> {
        config.validate()?;
        let n_states = env.n_states();
        Ok(Self {
            kind,
            gamma: config.gamma,
            theta: config.theta,
            n_states,
            rng: StdRng::seed_from_u64(config.seed),
            values: Array1::zeros(n_states),
            policy: TablePolicy::uniform(n_states),
            q_values: Array2::zeros((n_states, N_ACTIONS)),
            evaluations_since_improvement: 0,
            last_delta: None,
        })
    }

    pub fn policy_iteration(env: &GridWorld, config: &AlgorithmConfig) -> Result<Self> {
        Self::new(AlgorithmKind::PolicyIteration, env, config)
    }

    pub fn value_iteration(env: &GridWorld, config: &AlgorithmConfig) -> Result<Self> {
        Self::new(AlgorithmKind::ValueIteration, env, config)
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn policy(&self) -> ArrayView2<'_, f64> {
        self.policy.table()
    }

    pub fn policy_table(&self) -> &TablePolicy {
        &self.policy
    }

    pub fn q_values(&self) -> ArrayView2<'_, f64> {
        self.q_values.view()
    }

    /// Evaluation sweeps performed since the last improvement or reset.
    pub fn evaluations_since_improvement(&self) -> usize {
        self.evaluations_since_improvement
    }

    /// Delta of the most recent evaluation sweep, `None` after a reset.
    pub fn last_delta(&self) -> Option<f64> {
        self.last_delta
    }

    /// Whether a sweep that moved values by at most `delta` counts as
    /// settled. An unchanged sweep always does, whatever `theta` is.
    pub fn settles(&self, delta: f64) -> bool {
        delta < self.theta || delta == 0.0
    }

    pub fn is_evaluation_settled(&self) -> bool {
        self.last_delta.map_or(false, |d| self.settles(d))
    }

    /// Zero values and Q-values, uniform policy.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.q_values.fill(0.0);
        self.policy = TablePolicy::uniform(self.n_states);
        self.evaluations_since_improvement = 0;
        self.last_delta = None;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // Only the table dimensions are compared. A same-sized grid with another
    // layout is accepted and simply becomes the model the tables describe.
    fn check_env(&self, env: &GridWorld) -> Result<()> {
        if env.n_states() != self.n_states {
            return Err(Error::EnvironmentMismatch {
                expected: self.n_states,
                found: env.n_states(),
            });
        }
        Ok(())
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.n_states {
            return Err(Error::StateOutOfRange {
                state,
                n_states: self.n_states,
            });
        }
        Ok(())
    }

    // \sum_{s'} T(s, a, s') * [R(s') + \gamma V(s')], over successors only
    fn action_value(
        &self,
        env: &GridWorld,
        old_values: &Array1<f64>,
        state: usize,
        action: Movement,
    ) -> Result<f64> {
        let mut mass = 0.0;
        let mut q = 0.0;
        for next in env.get_possible_successors(state, action) {
            let p = env.transition_prob(state, action, next);
            mass += p;
            q += p * (env.reward(next) + self.gamma * old_values[next]);
        }
        if mass <= 0.0 {
            return Err(Error::NoTransitionMass {
                state,
                action: action.index(),
            });
        }
        Ok(q)
    }

    /// One synchronous sweep over every non-terminal, non-wall state.
    /// All backups read the values of the previous sweep. Returns the
    /// largest absolute value change.
    pub fn policy_evaluation_step(&mut self, env: &GridWorld) -> Result<f64> {
        self.check_env(env)?;
        let old_values = self.values.clone();
        let mut delta: f64 = 0.0;

        for s in 0..self.n_states {
            if env.is_terminal(s) || env.is_wall(s) {
                continue;
            }
            let mut q = [0.0; N_ACTIONS];
            for a in Movement::ALL {
                q[a.index()] = self.action_value(env, &old_values, s, a)?;
            }
            for (a, &value) in q.iter().enumerate() {
                self.q_values[[s, a]] = value;
            }

            let new_value: f64 = match self.kind {
                // Bellman expectation equation
                AlgorithmKind::PolicyIteration => Movement::ALL
                    .iter()
                    .map(|&a| self.policy.prob(s, a) * q[a.index()])
                    .sum(),
                // Bellman optimality equation
                AlgorithmKind::ValueIteration => q
                    .iter()
                    .copied()
                    .map(OrderedFloat)
                    .max()
                    .map_or(0.0, OrderedFloat::into_inner),
            };
            trace!(state = s, value = new_value, "backup");
            delta = delta.max((new_value - old_values[s]).abs());
            self.values[s] = new_value;
        }

        self.evaluations_since_improvement += 1;
        self.last_delta = Some(delta);
        debug!(algorithm = %self.kind, delta, "evaluation sweep");
        Ok(delta)
    }

    // Both variants improve greedily on the Q-values of the last sweep.
    pub fn policy_improvement_step(&mut self, env: &GridWorld) -> Result<bool> {
        self.greedy_policy_improvement(env)
    }

    /// Deterministic greedy policy from the current Q-values. Returns
    /// `true` when no policy row changed.
    pub fn greedy_policy_improvement(&mut self, env: &GridWorld) -> Result<bool> {
        self.check_env(env)?;
        let converged = self.policy.improve_greedy(self.q_values.view(), env);
        self.evaluations_since_improvement = 0;
        debug!(algorithm = %self.kind, converged, "policy improvement");
        Ok(converged)
    }

    pub fn step_report(&mut self, env: &GridWorld) -> Result<StepReport> {
        let delta = self.policy_evaluation_step(env)?;
        let policy_stable = self.policy_improvement_step(env)?;
        Ok(StepReport {
            delta,
            policy_stable,
        })
    }

    /// One evaluation followed by one improvement. Returns the
    /// improvement's convergence flag.
    pub fn step(&mut self, env: &GridWorld) -> Result<bool> {
        Ok(self.step_report(env)?.policy_stable)
    }

    pub fn run(&mut self, env: &GridWorld, max_steps: usize) -> Result<RunOutcome> {
        self.run_with(env, max_steps, |_, _| {})
    }

    /// Steps until the policy is stable and the last sweep settled (see
    /// `settles`), or until `max_steps` cycles have run.
    /// `on_step` sees every cycle, numbered from 1.
    pub fn run_with<F>(
        &mut self,
        env: &GridWorld,
        max_steps: usize,
        mut on_step: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(usize, &StepReport),
    {
        let mut delta = f64::INFINITY;
        for step in 1..=max_steps {
            let report = self.step_report(env)?;
            on_step(step, &report);
            delta = report.delta;
            if report.policy_stable && self.settles(report.delta) {
                info!(algorithm = %self.kind, steps = step, delta, "converged");
                return Ok(RunOutcome::Converged { steps: step, delta });
            }
        }
        warn!(algorithm = %self.kind, max_steps, delta, "step budget exhausted before convergence");
        Ok(RunOutcome::Exhausted {
            steps: max_steps,
            delta,
        })
    }

    /// Samples from the policy row using this algorithm's generator.
    pub fn select_policy_action(&mut self, state: usize) -> Result<Movement> {
        self.check_state(state)?;
        self.policy.sample(state, &mut self.rng)
    }

    pub fn select_greedy_action(&self, state: usize) -> Result<Movement> {
        self.check_state(state)?;
        Ok(self.policy.greedy_action(state))
    }

    /// Stochastic for Policy Iteration, greedy for Value Iteration.
    pub fn select_action(&mut self, state: usize) -> Result<Movement> {
        match self.kind {
            AlgorithmKind::PolicyIteration => self.select_policy_action(state),
            AlgorithmKind::ValueIteration => self.select_greedy_action(state),
        }
    }

    pub fn move_agent(&self, env: &mut GridWorld, action: Movement) -> bool {
        env.move_agent(action)
    }

    pub fn reset_agent(&self, env: &mut GridWorld) {
        env.reset_agent();
    }

    /// Resets the agent and follows `select_action` until a terminal state
    /// or `max_moves` moves.
    pub fn run_episode(&mut self, env: &mut GridWorld, max_moves: usize) -> Result<Episode> {
        self.check_env(env)?;
        self.reset_agent(env);
        let mut moves = 0;
        while !env.is_terminated() && moves < max_moves {
            let action = self.select_action(env.agent_state())?;
            self.move_agent(env, action);
            moves += 1;
        }
        Ok(Episode {
            trace: env.agent_trace().to_vec(),
            reward: env.agent().reward(),
            moves,
            reached_terminal: env.is_terminated(),
        })
    }
}
