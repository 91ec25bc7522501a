use float_eq::assert_float_eq;
use gridworld_dp::{Algorithm, AlgorithmConfig, AlgorithmKind, GridWorld, DEFAULT_MAX_STEPS};
use rstest::rstest;

fn solved(kind: AlgorithmKind) -> (GridWorld, Algorithm) {
    let env = GridWorld::standard(7, 42).unwrap();
    let mut alg = Algorithm::new(kind, &env, &AlgorithmConfig::default()).unwrap();
    let outcome = alg.run(&env, DEFAULT_MAX_STEPS).unwrap();
    assert!(outcome.is_converged(), "{} did not converge: {:?}", kind, outcome);
    (env, alg)
}

#[test]
fn policy_and_value_iteration_agree() {
    let (_, pi) = solved(AlgorithmKind::PolicyIteration);
    let (_, vi) = solved(AlgorithmKind::ValueIteration);
    for (s, (a, b)) in pi.values().iter().zip(vi.values().iter()).enumerate() {
        assert_float_eq!(*a, *b, abs <= 1e-4, "state {}", s);
    }
}

#[test]
fn both_algorithms_share_one_environment() {
    let env = GridWorld::standard(7, 42).unwrap();
    let config = AlgorithmConfig::default();
    let mut pi = Algorithm::policy_iteration(&env, &config).unwrap();
    let mut vi = Algorithm::value_iteration(&env, &config).unwrap();
    pi.step(&env).unwrap();
    pi.step(&env).unwrap();
    // vi has not seen pi's progress
    assert!(vi.values().iter().all(|&v| v == 0.0));
    vi.step(&env).unwrap();
    assert_ne!(pi.values(), vi.values());
}

#[test]
fn converged_values_point_toward_the_goal() {
    let (env, vi) = solved(AlgorithmKind::ValueIteration);
    let v = vi.values();
    // next to the goal beats the far corner
    assert!(v[env.index_to_state(5, 6)] > v[env.index_to_state(0, 0)]);
    assert!(v.iter().all(|x| x.is_finite()));
    assert!(v[env.index_to_state(0, 0)] > 0.0);
}

#[rstest]
#[case(AlgorithmKind::PolicyIteration)]
#[case(AlgorithmKind::ValueIteration)]
fn greedy_improvement_is_idempotent_after_convergence(#[case] kind: AlgorithmKind) {
    let (env, mut alg) = solved(kind);
    let policy = alg.policy().to_owned();
    assert!(alg.greedy_policy_improvement(&env).unwrap());
    assert_eq!(alg.policy(), policy);
    assert!(alg.greedy_policy_improvement(&env).unwrap());
    assert_eq!(alg.policy(), policy);
}

#[rstest]
#[case(AlgorithmKind::PolicyIteration)]
#[case(AlgorithmKind::ValueIteration)]
fn reset_discards_converged_progress(#[case] kind: AlgorithmKind) {
    let (env, mut alg) = solved(kind);
    alg.reset();
    assert!(alg.values().iter().all(|&v| v == 0.0));
    assert!(alg.q_values().iter().all(|&v| v == 0.0));
    assert!(alg.policy().iter().all(|&p| p == 0.25));

    // and it converges again from scratch
    assert!(alg.run(&env, DEFAULT_MAX_STEPS).unwrap().is_converged());
}

#[test]
fn evaluation_delta_shrinks_for_value_iteration() {
    let env = GridWorld::standard(7, 42).unwrap();
    let mut vi = Algorithm::value_iteration(&env, &AlgorithmConfig::default()).unwrap();
    let deltas: Vec<f64> = (0..60)
        .map(|_| vi.policy_evaluation_step(&env).unwrap())
        .collect();
    assert!(deltas[59] < deltas[20]);
    assert!(deltas[59] < 1e-2);
}

#[test]
fn episode_reaches_the_goal_after_solving() {
    let (mut env, mut vi) = solved(AlgorithmKind::ValueIteration);
    let episode = vi.run_episode(&mut env, 500).unwrap();
    assert!(episode.reached_terminal);
    assert_eq!(episode.trace[0], None);
    assert_eq!(episode.trace[1], Some(0));
    assert_eq!(episode.trace.last().copied().flatten(), Some(48));
    assert_eq!(episode.moves, episode.trace.len() - 2);
}
