//! Gridworld MDP with a precomputed stochastic transition model and the
//! dynamic-programming solvers of the generalized policy iteration family.

pub mod agent;
pub mod algorithm;
pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod policy;
pub mod render;
pub mod session;

pub use algorithm::{Algorithm, AlgorithmKind, Episode, RunOutcome, StepReport, DEFAULT_MAX_STEPS};
pub use config::{AlgorithmConfig, GridConfig, GridLayout};
pub use environment::{GridWorld, Movement};
pub use error::{Error, Result};
pub use event::{Event, VisualizationKind};
pub use session::Session;
