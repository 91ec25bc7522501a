//! Plain-text views of a grid, one layer at a time.

use std::fmt;

use crate::algorithm::Algorithm;
use crate::environment::{GridWorld, Movement};
use crate::event::VisualizationKind;
use crate::policy::argmax;

const WALL: &str = "######";

/// One display layer of `env`. Layers other than rewards need an algorithm
/// and render as empty cells without one.
pub struct GridView<'a> {
    pub env: &'a GridWorld,
    pub algorithm: Option<&'a Algorithm>,
    pub layer: VisualizationKind,
}

impl<'a> GridView<'a> {
    pub fn new(env: &'a GridWorld, algorithm: Option<&'a Algorithm>, layer: VisualizationKind) -> Self {
        Self {
            env,
            algorithm,
            layer,
        }
    }

    fn cell(&self, f: &mut fmt::Formatter<'_>, s: usize) -> fmt::Result {
        if self.env.is_wall(s) {
            return write!(f, "{:>6}", WALL);
        }
        match (self.layer, self.algorithm) {
            (VisualizationKind::Rewards, _) => write!(f, "{:>6.1}", self.env.reward(s)),
            (_, None) => write!(f, "{:>6}", ""),
            (VisualizationKind::StateValues, Some(alg)) => write!(f, "{:>6.3}", alg.values()[s]),
            (VisualizationKind::ActionValues, Some(alg)) => {
                let q = alg.q_values();
                let best = argmax(q.row(s));
                write!(f, "{} {:>4.2}", Movement::ALL[best].symbol(), q[[s, best]])
            }
            (VisualizationKind::Policy, Some(alg)) => {
                if self.env.is_terminal(s) {
                    return write!(f, "{:>6}", "G");
                }
                let policy = alg.policy();
                let row = policy.row(s);
                let best = argmax(row);
                // only deterministic rows get an arrow
                let symbol = if row[best] == 1.0 {
                    Movement::ALL[best].symbol()
                } else {
                    '·'
                };
                write!(f, "{:>6}", symbol)
            }
        }
    }
}

impl<'a> fmt::Display for GridView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.layer)?;
        let size = self.env.size();
        for row in 0..size {
            for col in 0..size {
                if col > 0 {
                    f.write_str(" ")?;
                }
                self.cell(f, self.env.index_to_state(row, col))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The grid with the agent (`A`), visited cells (`.`), walls (`#`),
/// penalties (`x`) and goals (`G`).
pub struct AgentView<'a>(pub &'a GridWorld);

impl<'a> fmt::Display for AgentView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = self.0;
        let visited: Vec<usize> = env.agent_trace().iter().flatten().copied().collect();
        for row in 0..env.size() {
            for col in 0..env.size() {
                let s = env.index_to_state(row, col);
                let c = if s == env.agent_state() {
                    'A'
                } else if env.is_wall(s) {
                    '#'
                } else if env.is_terminal(s) {
                    'G'
                } else if env.is_penalty(s) {
                    'x'
                } else if visited.contains(&s) {
                    '.'
                } else {
                    ' '
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
