//! The 0/1 backend: domain checks and the incremental-cut loop.
#![cfg(feature = "sat")]

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lpbridge::{
    Linear, Number, Operator, OptimizationType, Parameter, ParameterValue, Problem,
    SolverBackend, SolverError, SolverFactory, SolverService, Term, VariableType,
};

fn boolean_problem(n: usize) -> Problem<usize> {
    let mut problem = Problem::new();
    for i in 0..n {
        problem.set_var_type(i, VariableType::Boolean);
    }
    problem
}

#[test]
fn non_boolean_variable_fails_before_the_native_call() {
    let mut problem = boolean_problem(3);
    problem.set_objective((0..4).map(|i| Term::new(1, i)).collect());
    problem.set_var_type(3, VariableType::Real);

    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut solver = SolverFactory::new(SolverBackend::Sat).sat();
    solver.add_hook(move |_, _| seen.set(seen.get() + 1));

    match solver.solve(&problem) {
        Err(SolverError::DomainViolation { variable, .. }) => assert_eq!(variable, "3"),
        other => panic!("expected a domain violation, got {:?}", other.map(|s| s.is_some())),
    }
    assert_eq!(calls.get(), 0);
}

#[test]
fn fractional_values_are_rejected() {
    let mut fractional_rhs = boolean_problem(2);
    fractional_rhs.add_constraint((0..2).map(|i| Term::new(1, i)).collect(), Operator::Le, 1.5);

    let mut fractional_objective = boolean_problem(2);
    fractional_objective.set_objective([Term::new(0.25, 0), Term::new(1, 1)].into_iter().collect());

    let mut solver = SolverFactory::new(SolverBackend::Sat).get().unwrap();
    for problem in [fractional_rhs, fractional_objective] {
        assert!(matches!(
            solver.solve(&problem),
            Err(SolverError::CoefficientDomain { .. })
        ));
    }
}

#[test]
fn incumbents_improve_strictly_until_optimal() {
    // Maximize: sum (i + 1) * x_i
    // Subject to: sum (i % 4 + 1) * x_i <= 9
    let n = 8;
    let mut problem = boolean_problem(n);
    let objective: Linear<usize> = (0..n).map(|i| Term::new(i as i64 + 1, i)).collect();
    let weights: Linear<usize> = (0..n).map(|i| Term::new((i % 4) as i64 + 1, i)).collect();
    problem.set_objective_with_sense(objective, OptimizationType::Maximize);
    problem.add_constraint(weights, Operator::Le, 9);

    let mut solver = SolverFactory::new(SolverBackend::Sat)
        .with_parameter(Parameter::Verbose, 2)
        .sat();
    let solution = solver.solve(&problem).unwrap().expect("feasible");

    // weights 1,2,3,4,1,2,3,4 and values 1..=8; the best fit of weight 9
    // takes items 0, 1, 4, 5 and 6 for 1 + 2 + 5 + 6 + 7 = 21
    assert_eq!(solution.objective(), Some(Number::Int(21)));

    let incumbents = solver.incumbents();
    assert!(!incumbents.is_empty());
    assert!(incumbents
        .windows(2)
        .all(|w| w[0].to_i64().unwrap() < w[1].to_i64().unwrap()));
    assert_eq!(incumbents.last(), Some(&Number::Int(21)));
    assert!(incumbents.len() <= 37, "one round per attainable value at most");
}

#[test]
fn feasibility_search_takes_one_round() {
    let mut problem = boolean_problem(4);
    problem.add_constraint((0..4).map(|i| Term::new(1, i)).collect(), Operator::Eq, 2);

    let mut solver = SolverFactory::new(SolverBackend::Sat).sat();
    let solution = solver.solve(&problem).unwrap().expect("feasible");

    let chosen = (0..4).filter(|i| solution.get_boolean(i) == Some(true)).count();
    assert_eq!(chosen, 2);
    assert!(solver.incumbents().is_empty());
    assert_eq!(solution.objective(), None);
}

#[test]
fn a_second_solve_starts_from_scratch() {
    let mut problem = boolean_problem(2);
    problem.set_objective((0..2).map(|i| Term::new(-1, i)).collect());

    let mut solver = SolverFactory::new(SolverBackend::Sat).sat();
    let first = solver.solve(&problem).unwrap().expect("feasible");
    let rounds = solver.incumbents().len();
    let second = solver.solve(&problem).unwrap().expect("feasible");

    assert_eq!(first.objective(), Some(Number::Int(-2)));
    assert_eq!(second.objective(), Some(Number::Int(-2)));
    assert_eq!(solver.incumbents().len(), rounds);
}

// Distinct weights between 10.00 and 10000.00, in cents
fn cent_weights(n: usize) -> Vec<i64> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            1_000 + (state >> 33) as i64 % 999_000
        })
        .collect()
}

fn weighted(weights: &[i64]) -> Linear<usize> {
    weights.iter().enumerate().map(|(i, &w)| Term::new(w, i)).collect()
}

fn cent_knapsack(weights: &[i64]) -> (Problem<usize>, i64) {
    let capacity = weights.iter().sum::<i64>() / 2;
    let mut problem = boolean_problem(weights.len());
    problem.add_constraint(weighted(weights), Operator::Le, capacity);
    (problem, capacity)
}

fn chosen_weight(solution: &lpbridge::Solution<usize>, weights: &[i64]) -> i64 {
    weights
        .iter()
        .enumerate()
        .filter(|(i, _)| solution.get_boolean(i) == Some(true))
        .map(|(_, w)| w)
        .sum()
}

#[test]
fn wide_weight_rows_encode_within_the_time_limit() {
    let weights = cent_weights(36);
    let (mut problem, capacity) = cent_knapsack(&weights);
    problem.add_constraint(weighted(&weights), Operator::Ge, capacity / 4);

    let mut solver = SolverFactory::new(SolverBackend::Sat)
        .with_parameter(Parameter::Timeout, 5)
        .sat();
    let started = Instant::now();
    let solution = solver.solve(&problem).unwrap().expect("feasible");

    assert!(started.elapsed() < Duration::from_secs(5));
    let total = chosen_weight(&solution, &weights);
    assert!(total <= capacity && total >= capacity / 4, "weight {}", total);
}

#[test]
fn short_timeout_still_optimises_over_wide_weights() {
    let weights = cent_weights(36);
    let (mut problem, capacity) = cent_knapsack(&weights);
    let picks: Linear<usize> = (0..3).map(|i| Term::new(1, i)).collect();
    problem.set_objective_with_sense(picks, OptimizationType::Maximize);

    let mut solver = SolverFactory::new(SolverBackend::Sat)
        .with_parameter(Parameter::Timeout, ParameterValue::Float(1.0))
        .sat();
    let started = Instant::now();
    let solution = solver.solve(&problem).unwrap().expect("an incumbent");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(chosen_weight(&solution, &weights) <= capacity);
    assert_eq!(solution.objective(), Some(Number::Int(3)));
    assert_eq!(solver.incumbents().last(), Some(&Number::Int(3)));
    assert!(solver
        .incumbents()
        .windows(2)
        .all(|w| w[0].to_i64().unwrap() < w[1].to_i64().unwrap()));
}
