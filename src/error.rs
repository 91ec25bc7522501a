use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid layout: cell ({row}, {col}) {reason}")]
    InvalidLayout {
        row: usize,
        col: usize,
        reason: &'static str,
    },

    #[error("State {state} out of range for a grid with {n_states} states")]
    StateOutOfRange { state: usize, n_states: usize },

    #[error("Invalid action: {0}")]
    InvalidAction(usize),

    #[error("Policy row for state {state} sums to {sum}, expected a probability distribution")]
    InvalidPolicyRow { state: usize, sum: f64 },

    #[error("Algorithm tables sized for {expected} states, environment has {found}")]
    EnvironmentMismatch { expected: usize, found: usize },

    #[error("No transition mass for state {state}, action {action}")]
    NoTransitionMass { state: usize, action: usize },

    #[error("Policy improvement requested before any evaluation step")]
    NoEvaluationSinceImprovement,

    #[error("Policy evaluation already converged")]
    EvaluationAlreadyConverged,

    #[error("Policy improvement already converged")]
    PolicyAlreadyConverged,

    #[error("Agent already reached a terminal state")]
    AgentAlreadyTerminated,

    #[error("No algorithm selected")]
    NoAlgorithmSelected,

    #[error("Unknown algorithm index {0}")]
    UnknownAlgorithm(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
