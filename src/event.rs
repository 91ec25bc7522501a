use std::fmt;

use crate::algorithm::AlgorithmKind;
use crate::environment::Movement;

/// Display layers a front end can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualizationKind {
    Rewards,
    StateValues,
    ActionValues,
    Policy,
}

impl fmt::Display for VisualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisualizationKind::Rewards => "rewards",
            VisualizationKind::StateValues => "state values",
            VisualizationKind::ActionValues => "action values",
            VisualizationKind::Policy => "policy",
        };
        f.write_str(name)
    }
}

/// What a session command changed, for whoever keeps a display in sync.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AlgorithmChanged { algorithm: AlgorithmKind },
    PolicyEvaluation { steps: usize, delta: f64, converged: bool },
    PolicyImprovement { iterations: usize, converged: bool },
    AlgorithmStep { iterations: usize, converged: bool },
    AlgorithmReset { algorithm: AlgorithmKind },
    AgentMoved { action: Movement, state: usize, done: bool },
    AgentReset { state: usize },
    VisualizationChanged { kind: VisualizationKind, state: bool },
}
