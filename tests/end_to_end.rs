//! End-to-end solves through the factory on every compiled backend.

use lpbridge::{
    Linear, Number, Operator, OptimizationType, Parameter, Problem, SolverBackend, SolverFactory,
    Term, VariableType,
};
use proptest::prelude::*;

/// LP/MILP backends compiled into this build.
fn lp_backends() -> Vec<SolverBackend> {
    let mut backends = Vec::new();
    if cfg!(feature = "highs") {
        backends.push(SolverBackend::Highs);
    }
    if cfg!(feature = "coin_cbc") {
        backends.push(SolverBackend::CoinCbc);
    }
    if cfg!(feature = "microlp") {
        backends.push(SolverBackend::MicroLp);
    }
    backends
}

fn all_backends() -> Vec<SolverBackend> {
    let mut backends = lp_backends();
    if cfg!(feature = "sat") {
        backends.push(SolverBackend::Sat);
    }
    backends
}

fn linear(terms: &[(i64, &'static str)]) -> Linear<&'static str> {
    terms.iter().map(|&(c, v)| Term::new(c, v)).collect()
}

/// Maximize: 143x + 60y
/// Subject to:
///   120x + 210y <= 15000
///   110x +  30y <=  4000
///      x +    y <=    75
/// x, y integer
fn production_problem() -> Problem<&'static str> {
    let mut problem = Problem::new();
    problem.set_objective_with_sense(linear(&[(143, "x"), (60, "y")]), OptimizationType::Maximize);
    problem.add_constraint(linear(&[(120, "x"), (210, "y")]), Operator::Le, 15000);
    problem.add_constraint(linear(&[(110, "x"), (30, "y")]), Operator::Le, 4000);
    problem.add_constraint(linear(&[(1, "x"), (1, "y")]), Operator::Le, 75);
    problem.set_var_type("x", VariableType::Integer);
    problem.set_var_type("y", VariableType::Integer);
    problem
}

#[test]
fn integer_production_plan() {
    let problem = production_problem();

    for backend in lp_backends() {
        let mut factory = SolverFactory::new(backend);
        factory.set_parameter(Parameter::Verbose, 0);
        factory.set_parameter(Parameter::Timeout, 100);

        let mut solver = factory.get().unwrap();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert_eq!(solution.objective(), Some(Number::Int(6266)), "{}", backend);
        assert_eq!(solution.get(&"x"), Some(Number::Int(22)), "{}", backend);
        assert_eq!(solution.get(&"y"), Some(Number::Int(52)), "{}", backend);
    }
}

#[test]
fn tightened_bound_needs_a_fresh_solve() {
    let mut problem = production_problem();
    problem.set_var_upper_bound("x", 16);

    for backend in lp_backends() {
        let mut solver = SolverFactory::new(backend).get().unwrap();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert_eq!(solution.objective(), Some(Number::Int(5828)), "{}", backend);
        assert_eq!(solution.get(&"x"), Some(Number::Int(16)), "{}", backend);
    }
}

#[test]
fn contradictory_cardinalities_have_no_solution() {
    let mut problem: Problem<usize> = Problem::new();
    let sum: Linear<usize> = (0..10).map(|i| Term::new(1, i)).collect();
    problem.add_constraint(sum.clone(), Operator::Eq, 5);
    problem.add_constraint(sum, Operator::Eq, 6);
    for i in 0..10 {
        problem.set_var_type(i, VariableType::Boolean);
    }

    for backend in all_backends() {
        let mut solver = SolverFactory::new(backend).get().unwrap();
        assert!(solver.solve(&problem).unwrap().is_none(), "{}", backend);
    }
}

#[test]
fn boolean_lower_bound_forces_one() {
    let mut problem = Problem::new();
    problem.set_objective(linear(&[(1, "x"), (1, "y")]));
    problem.set_var_bounds_and_type(0.5, "x", 1, VariableType::Boolean);
    problem.set_var_type("y", VariableType::Boolean);

    for backend in all_backends() {
        let mut solver = SolverFactory::new(backend).get().unwrap();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert_eq!(solution.get(&"x"), Some(Number::Int(1)), "{}", backend);
        assert_eq!(solution.get(&"y"), Some(Number::Int(0)), "{}", backend);
        assert_eq!(solution.objective(), Some(Number::Int(1)), "{}", backend);
    }
}

#[test]
fn metadata_only_variables_get_values() {
    let mut problem = Problem::new();
    problem.set_objective(linear(&[(1, "x")]));
    problem.set_var_bounds(1, "x", 4);
    problem.set_var_bounds_and_type(2, "unused", 3, VariableType::Integer);

    for backend in lp_backends() {
        let mut solver = SolverFactory::new(backend).get().unwrap();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert!(solution.contains_var(&"unused"), "{}", backend);
        let value = solution.get(&"unused").unwrap();
        assert!(value.is_int());
        assert!((2..=3).contains(&value.to_i64().unwrap()), "{}", backend);
    }
}

#[derive(Debug, Clone)]
struct BoundedColumn {
    lower: i64,
    width: i64,
    cost: i64,
    integer: bool,
}

fn bounded_column() -> impl Strategy<Value = BoundedColumn> {
    (-20i64..20, 0i64..10, -5i64..5, any::<bool>()).prop_map(|(lower, width, cost, integer)| {
        BoundedColumn {
            lower,
            width,
            cost,
            integer,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn unconstrained_solutions_respect_bounds(
        columns in prop::collection::vec(bounded_column(), 1..6),
        maximize in any::<bool>(),
    ) {
        let mut problem: Problem<usize> = Problem::new();
        let objective: Linear<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Term::new(c.cost, i))
            .collect();
        problem.set_objective_with_sense(
            objective,
            if maximize { OptimizationType::Maximize } else { OptimizationType::Minimize },
        );
        for (i, column) in columns.iter().enumerate() {
            let var_type = if column.integer { VariableType::Integer } else { VariableType::Real };
            problem.set_var_bounds_and_type(column.lower, i, column.lower + column.width, var_type);
        }

        for backend in lp_backends() {
            let mut solver = SolverFactory::new(backend).get().unwrap();
            let solution = solver.solve(&problem).unwrap().expect("bounded box is feasible");
            for (i, column) in columns.iter().enumerate() {
                let value = solution.get(&i).unwrap().as_f64();
                prop_assert!(value >= column.lower as f64 - 1e-6, "{}: {} below bound", backend, value);
                prop_assert!(
                    value <= (column.lower + column.width) as f64 + 1e-6,
                    "{}: {} above bound",
                    backend,
                    value
                );
            }
        }
    }
}
