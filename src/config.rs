use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Special cells of the grid, as (row, col) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub terminal: Vec<(usize, usize)>,
    pub walls: Vec<(usize, usize)>,
    pub penalties: Vec<(usize, usize)>,
}

impl GridLayout {
    /// Goal in the bottom-right corner, a small L-shaped wall near the
    /// top-left and two penalty cells. On small grids, cells that fall
    /// outside the grid or onto one already placed are dropped, with the goal
    /// placed first, then walls, then penalties.
    pub fn standard(size: usize) -> Self {
        let last = size.saturating_sub(1);
        let before_last = size.saturating_sub(2);
        let mut placed = HashSet::new();
        let mut keep = |cells: &[(usize, usize)]| -> Vec<(usize, usize)> {
            cells
                .iter()
                .copied()
                .filter(|&(row, col)| row < size && col < size && placed.insert((row, col)))
                .collect()
        };

        let terminal = keep(&[(last, last)]);
        let walls = keep(&[(2, 2), (2, 3), (3, 2)]);
        let penalties = keep(&[(1, 1), (before_last, before_last)]);
        Self {
            terminal,
            walls,
            penalties,
        }
    }

    /// A layout with no special cells at all.
    pub fn empty() -> Self {
        Self {
            terminal: Vec::new(),
            walls: Vec::new(),
            penalties: Vec::new(),
        }
    }

    fn validate(&self, size: usize) -> Result<()> {
        let mut seen = HashSet::new();
        for cells in [&self.terminal, &self.walls, &self.penalties] {
            for &(row, col) in cells.iter() {
                if row >= size || col >= size {
                    return Err(Error::InvalidLayout {
                        row,
                        col,
                        reason: "lies outside the grid",
                    });
                }
                if !seen.insert((row, col)) {
                    return Err(Error::InvalidLayout {
                        row,
                        col,
                        reason: "is listed more than once",
                    });
                }
            }
        }
        if self.walls.contains(&(0, 0)) {
            return Err(Error::InvalidLayout {
                row: 0,
                col: 0,
                reason: "is the initial cell and cannot be a wall",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: usize,
    pub seed: u64,
    /// Probability of executing the intended action.
    pub main_transition_prob: f64,
    /// `None` selects `GridLayout::standard(size)`.
    pub layout: Option<GridLayout>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::with_size(7)
    }
}

impl GridConfig {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            seed: 42,
            main_transition_prob: 0.8,
            layout: None,
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
            .clone()
            .unwrap_or_else(|| GridLayout::standard(self.size))
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("grid size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.main_transition_prob) {
            return Err(Error::InvalidConfig(format!(
                "main_transition_prob must be in [0, 1], got {}",
                self.main_transition_prob
            )));
        }
        self.layout().validate(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Discount factor.
    pub gamma: f64,
    pub seed: u64,
    /// Evaluation is settled once a sweep changes no value by more than this.
    pub theta: f64,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            seed: 42,
            theta: 1e-6,
        }
    }
}

impl AlgorithmConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(Error::InvalidConfig(format!(
                "gamma must be in [0, 1), got {}",
                self.gamma
            )));
        }
        if self.theta.is_nan() || self.theta < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "theta must be non-negative, got {}",
                self.theta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn standard_layout_matches_default_grid() {
        let layout = GridLayout::standard(7);
        assert_eq!(layout.terminal, vec![(6, 6)]);
        assert_eq!(layout.walls, vec![(2, 2), (2, 3), (3, 2)]);
        assert_eq!(layout.penalties, vec![(1, 1), (5, 5)]);
        assert!(GridConfig::default().validate().is_ok());
    }

    #[test]
    fn standard_layout_drops_cells_outside_small_grids() {
        let layout = GridLayout::standard(3);
        assert_eq!(layout.terminal, vec![(2, 2)]);
        // the goal wins the corner shared with a wall
        assert!(layout.walls.is_empty());
        assert_eq!(layout.penalties, vec![(1, 1)]);

        let layout = GridLayout::standard(4);
        assert_eq!(layout.walls, vec![(2, 2), (2, 3), (3, 2)]);
        assert_eq!(layout.penalties, vec![(1, 1)]);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    #[case(5)]
    fn standard_layout_is_valid_for_small_sizes(#[case] size: usize) {
        assert!(GridConfig::with_size(size).validate().is_ok());
    }

    #[test]
    fn rejects_overlapping_cells() {
        let cfg = GridConfig {
            layout: Some(GridLayout {
                terminal: vec![(3, 3)],
                penalties: vec![(3, 3)],
                ..GridLayout::empty()
            }),
            ..GridConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidLayout { row: 3, col: 3, .. })
        ));
    }

    #[rstest]
    #[case(0, 0.8)]
    #[case(5, 1.5)]
    #[case(5, -0.1)]
    fn rejects_bad_grid_parameters(#[case] size: usize, #[case] p: f64) {
        let cfg = GridConfig {
            size,
            main_transition_prob: p,
            layout: Some(GridLayout::empty()),
            ..GridConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_wall_on_initial_cell() {
        let cfg = GridConfig {
            layout: Some(GridLayout {
                walls: vec![(0, 0)],
                ..GridLayout::empty()
            }),
            ..GridConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[rstest]
    #[case(1.0, 1e-6)]
    #[case(-0.5, 1e-6)]
    #[case(0.9, -1.0)]
    #[case(0.9, f64::NAN)]
    fn rejects_bad_algorithm_parameters(#[case] gamma: f64, #[case] theta: f64) {
        let cfg = AlgorithmConfig {
            gamma,
            theta,
            ..AlgorithmConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn grid_size_from_json_drives_standard_layout() {
        let cfg: GridConfig = serde_json::from_str(r#"{"size": 5}"#).unwrap();
        assert_eq!(cfg.layout(), GridLayout::standard(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AlgorithmConfig = serde_json::from_str(r#"{"gamma": 0.5}"#).unwrap();
        assert_eq!(cfg.gamma, 0.5);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.theta, 1e-6);
    }
}
