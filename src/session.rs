use crate::algorithm::{Algorithm, AlgorithmKind};
use crate::config::{AlgorithmConfig, GridConfig};
use crate::environment::{GridWorld, Movement};
use crate::error::{Error, Result};
use crate::event::{Event, VisualizationKind};

/// Which display layers are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visualization {
    pub rewards: bool,
    pub state_values: bool,
    pub action_values: bool,
    pub policy: bool,
}

impl Default for Visualization {
    fn default() -> Self {
        Self {
            rewards: true,
            state_values: false,
            action_values: false,
            policy: false,
        }
    }
}

impl Visualization {
    pub fn is_on(&self, kind: VisualizationKind) -> bool {
        match kind {
            VisualizationKind::Rewards => self.rewards,
            VisualizationKind::StateValues => self.state_values,
            VisualizationKind::ActionValues => self.action_values,
            VisualizationKind::Policy => self.policy,
        }
    }

    fn toggle(&mut self, kind: VisualizationKind) -> bool {
        let flag = match kind {
            VisualizationKind::Rewards => &mut self.rewards,
            VisualizationKind::StateValues => &mut self.state_values,
            VisualizationKind::ActionValues => &mut self.action_values,
            VisualizationKind::Policy => &mut self.policy,
        };
        *flag = !*flag;
        *flag
    }
}

/// Turn-based command surface over one environment and the algorithms
/// attached to it.
///
/// Commands that make no sense in the current state (improving before
/// evaluating, moving an agent that already finished) are refused with an
/// error and change nothing.
#[derive(Debug)]
pub struct Session {
    env: GridWorld,
    algorithms: Vec<Algorithm>,
    current: Option<usize>,
    evaluation_steps: usize,
    iteration_steps: usize,
    is_eval_converged: bool,
    is_policy_converged: bool,
    visualization: Visualization,
}

impl Session {
    pub fn new(env: GridWorld, algorithms: Vec<Algorithm>) -> Self {
        Self {
            env,
            algorithms,
            current: None,
            evaluation_steps: 0,
            iteration_steps: 0,
            is_eval_converged: false,
            is_policy_converged: false,
            visualization: Visualization::default(),
        }
    }

    /// One environment with a Policy Iteration and a Value Iteration
    /// instance, nothing selected.
    pub fn with_defaults(grid: &GridConfig, algorithm: &AlgorithmConfig) -> Result<Self> {
        let env = GridWorld::new(grid)?;
        let algorithms = vec![
            Algorithm::policy_iteration(&env, algorithm)?,
            Algorithm::value_iteration(&env, algorithm)?,
        ];
        Ok(Self::new(env, algorithms))
    }

    pub fn env(&self) -> &GridWorld {
        &self.env
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    pub fn current(&self) -> Option<&Algorithm> {
        self.current.map(|i| &self.algorithms[i])
    }

    pub fn current_kind(&self) -> Option<AlgorithmKind> {
        self.current().map(Algorithm::kind)
    }

    pub fn evaluation_steps(&self) -> usize {
        self.evaluation_steps
    }

    pub fn iteration_steps(&self) -> usize {
        self.iteration_steps
    }

    pub fn is_eval_converged(&self) -> bool {
        self.is_eval_converged
    }

    pub fn is_policy_converged(&self) -> bool {
        self.is_policy_converged
    }

    pub fn visualization(&self) -> Visualization {
        self.visualization
    }

    fn clear_progress(&mut self) {
        self.evaluation_steps = 0;
        self.iteration_steps = 0;
        self.is_eval_converged = false;
        self.is_policy_converged = false;
    }

    fn current_index(&self) -> Result<usize> {
        self.current.ok_or(Error::NoAlgorithmSelected)
    }

    /// Switching algorithms clears the step counters, not the tables.
    pub fn select_algorithm(&mut self, index: usize) -> Result<Event> {
        let algorithm = self
            .algorithms
            .get(index)
            .map(Algorithm::kind)
            .ok_or(Error::UnknownAlgorithm(index))?;
        self.current = Some(index);
        self.clear_progress();
        Ok(Event::AlgorithmChanged { algorithm })
    }

    pub fn evaluate(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        if self.is_eval_converged {
            return Err(Error::EvaluationAlreadyConverged);
        }
        let alg = &mut self.algorithms[i];
        let delta = alg.policy_evaluation_step(&self.env)?;
        let converged = alg.settles(delta);
        self.evaluation_steps += 1;
        self.is_policy_converged = false;
        self.is_eval_converged = converged;
        Ok(Event::PolicyEvaluation {
            steps: self.evaluation_steps,
            delta,
            converged,
        })
    }

    pub fn improve(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        if self.evaluation_steps == 0 {
            return Err(Error::NoEvaluationSinceImprovement);
        }
        if self.is_policy_converged {
            return Err(Error::PolicyAlreadyConverged);
        }
        let converged = self.algorithms[i].policy_improvement_step(&self.env)?;
        self.evaluation_steps = 0;
        self.is_eval_converged = false;
        self.is_policy_converged = converged;
        self.iteration_steps += 1;
        Ok(Event::PolicyImprovement {
            iterations: self.iteration_steps,
            converged,
        })
    }

    /// Evaluation and improvement in one go.
    pub fn step(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        if self.is_policy_converged {
            return Err(Error::PolicyAlreadyConverged);
        }
        let converged = self.algorithms[i].step(&self.env)?;
        self.iteration_steps += 1;
        self.is_policy_converged = converged;
        Ok(Event::AlgorithmStep {
            iterations: self.iteration_steps,
            converged,
        })
    }

    pub fn reset_algorithm(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        self.algorithms[i].reset();
        self.clear_progress();
        Ok(Event::AlgorithmReset {
            algorithm: self.algorithms[i].kind(),
        })
    }

    /// Moves the agent one step along the selected algorithm's policy.
    pub fn move_agent(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        if self.env.is_terminated() {
            return Err(Error::AgentAlreadyTerminated);
        }
        let action = self.algorithms[i].select_action(self.env.agent_state())?;
        Ok(self.apply_move(i, action))
    }

    /// Moves the agent with an explicit action instead of the policy.
    pub fn move_agent_with(&mut self, action: Movement) -> Result<Event> {
        let i = self.current_index()?;
        if self.env.is_terminated() {
            return Err(Error::AgentAlreadyTerminated);
        }
        Ok(self.apply_move(i, action))
    }

    fn apply_move(&mut self, i: usize, action: Movement) -> Event {
        let done = self.algorithms[i].move_agent(&mut self.env, action);
        Event::AgentMoved {
            action,
            state: self.env.agent_state(),
            done,
        }
    }

    pub fn reset_agent(&mut self) -> Result<Event> {
        let i = self.current_index()?;
        self.algorithms[i].reset_agent(&mut self.env);
        Ok(Event::AgentReset {
            state: self.env.agent_state(),
        })
    }

    pub fn toggle_visualization(&mut self, kind: VisualizationKind) -> Event {
        let state = self.visualization.toggle(kind);
        Event::VisualizationChanged { kind, state }
    }
}
