use ndarray::{Array2, ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::environment::{GridWorld, Movement, N_ACTIONS};
use crate::error::{Error, Result};

const ROW_SUM_TOLERANCE: f64 = 1e-8;

/// Index of the largest entry; the first one wins on ties.
pub fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_value = OrderedFloat(f64::NEG_INFINITY);
    for (i, &v) in row.iter().enumerate() {
        if OrderedFloat(v) > best_value {
            best = i;
            best_value = OrderedFloat(v);
        }
    }
    best
}

/// Stochastic policy stored as a `[n_states, 4]` probability table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePolicy {
    table: Array2<f64>,
}

impl TablePolicy {
    // Uniform probability over all actions in every state
    pub fn uniform(n_states: usize) -> Self {
        Self {
            table: Array2::from_elem((n_states, N_ACTIONS), 1.0 / N_ACTIONS as f64),
        }
    }

    pub fn table(&self) -> ArrayView2<'_, f64> {
        self.table.view()
    }

    pub fn row(&self, state: usize) -> ArrayView1<'_, f64> {
        self.table.row(state)
    }

    pub fn n_states(&self) -> usize {
        self.table.nrows()
    }

    pub fn prob(&self, state: usize, movement: Movement) -> f64 {
        self.table[[state, movement.index()]]
    }

    /// Draws an action from the row of `state`. A row that is not a
    /// probability distribution is an error, it is never renormalised.
    pub fn sample<R: Rng + ?Sized>(&self, state: usize, rng: &mut R) -> Result<Movement> {
        let row = self.row(state);
        let sum: f64 = row.sum();
        let invalid = || Error::InvalidPolicyRow { state, sum };
        if !sum.is_finite() || (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(invalid());
        }
        let dist = WeightedIndex::new(row.iter()).map_err(|_| invalid())?;
        Movement::from_index(dist.sample(rng))
    }

    pub fn greedy_action(&self, state: usize) -> Movement {
        Movement::ALL[argmax(self.row(state))]
    }

    /// Makes every non-terminal row deterministic on the best action of
    /// `q_values`. Returns `true` when no row changed.
    pub fn improve_greedy(&mut self, q_values: ArrayView2<'_, f64>, env: &GridWorld) -> bool {
        let mut is_policy_converged = true;
        for s in 0..self.table.nrows() {
            if env.is_terminal(s) {
                continue;
            }
            let best_action = argmax(q_values.row(s));
            let mut row = self.table.row_mut(s);
            let unchanged = row
                .iter()
                .enumerate()
                .all(|(a, &p)| p == if a == best_action { 1.0 } else { 0.0 });
            if !unchanged {
                is_policy_converged = false;
                row.fill(0.0);
                row[best_action] = 1.0;
            }
        }
        is_policy_converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(array![0.0, 0.0, 0.0, 0.0].view()), 0);
        assert_eq!(argmax(array![0.1, 0.5, 0.5, 0.2].view()), 1);
        assert_eq!(argmax(array![-3.0, -1.0, -2.0, -1.0].view()), 1);
    }

    #[test]
    fn sample_rejects_rows_that_do_not_sum_to_one() {
        let mut policy = TablePolicy::uniform(2);
        policy.table[[1, 0]] = 0.5;
        let mut rng = StdRng::seed_from_u64(0);
        assert!(policy.sample(0, &mut rng).is_ok());
        assert!(matches!(
            policy.sample(1, &mut rng),
            Err(Error::InvalidPolicyRow { state: 1, .. })
        ));

        policy.table.row_mut(1).fill(0.0);
        assert!(policy.sample(1, &mut rng).is_err());
    }

    #[test]
    fn sample_from_deterministic_row() {
        let mut policy = TablePolicy::uniform(1);
        policy.table.row_mut(0).fill(0.0);
        policy.table[[0, 3]] = 1.0;
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            assert_eq!(policy.sample(0, &mut rng).unwrap(), Movement::Left);
        }
    }

    #[test]
    fn uniform_sampling_visits_every_action() {
        let policy = TablePolicy::uniform(1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut counts = [0usize; N_ACTIONS];
        for _ in 0..4000 {
            counts[policy.sample(0, &mut rng).unwrap().index()] += 1;
        }
        for c in counts.iter() {
            assert!((800..1200).contains(c), "counts {:?}", counts);
        }
    }

    #[test]
    fn greedy_improvement_skips_terminals_and_detects_stability() {
        let env = GridWorld::standard(7, 42).unwrap();
        let mut q = Array2::<f64>::zeros((env.n_states(), N_ACTIONS));
        q[[0, 2]] = 1.0;
        let mut policy = TablePolicy::uniform(env.n_states());

        assert!(!policy.improve_greedy(q.view(), &env));
        assert_eq!(policy.greedy_action(0), Movement::Down);
        assert_eq!(policy.row(1).to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(policy.row(48).to_vec(), vec![0.25; 4]);

        let before = policy.clone();
        assert!(policy.improve_greedy(q.view(), &env));
        assert_eq!(policy, before);

        q[[0, 1]] = 2.0;
        assert!(!policy.improve_greedy(q.view(), &env));
        assert_eq!(policy.greedy_action(0), Movement::Right);
    }
}
