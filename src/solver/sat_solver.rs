// SAT Solver Adapter
// Solves 0-1 problems with integer coefficients on varisat. Rows become
// pseudo-boolean CNF; the objective is optimised by re-solving with a
// strengthening cut after every model found

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, warn};
use varisat::{ExtendFormula, Solver, Var};

use crate::domain::{
    hooks::{HookId, Hooks, VariableIndex},
    models::{Linear, Problem, VariableId},
    parameters::{Parameter, ParameterValue, Parameters, Verbosity},
    solution::Solution,
    solver_service::{validate_structure, Result, SolverError, SolverService},
    value_objects::{Number, Operator, OptimizationType, VariableType},
};
use crate::solver::encoding::{self, ColumnSpec};
use crate::solver::pseudo_boolean::{self, AtMost};

const NAME: &str = "SAT";

/// Native model handed to hooks.
pub type SatModel = Solver<'static>;

/// Pseudo-boolean adapter over varisat.
///
/// Every variable must be `Boolean` and every coefficient and right-hand
/// side a whole number. Objective values of the successive models are
/// kept and can be read back with [`SatSolver::incumbents`].
pub struct SatSolver<V: VariableId> {
    parameters: Parameters,
    hooks: Hooks<SatModel, V>,
    incumbents: Vec<Number>,
}

impl<V: VariableId> SatSolver<V> {
    pub fn new() -> Self {
        Self::with_parameters(Parameters::new())
    }

    pub fn with_parameters(parameters: Parameters) -> Self {
        Self {
            parameters,
            hooks: Hooks::new(),
            incumbents: Vec::new(),
        }
    }

    /// Register a hook that receives the encoded varisat solver. Variable
    /// `i` of the index is varisat variable `i`.
    pub fn add_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut SatModel, &VariableIndex<V>) + 'static,
    {
        self.hooks.add(hook)
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    /// Objective values of the models found by the last solve, in order.
    /// Strictly improving in the optimisation direction.
    pub fn incumbents(&self) -> &[Number] {
        &self.incumbents
    }

    fn log_incumbent(&self, value: Number, round: usize) {
        if self.parameters.verbosity().unwrap_or(Verbosity::Silent) >= Verbosity::Normal {
            info!(backend = NAME, round, objective = %value, "new incumbent");
        } else {
            debug!(backend = NAME, round, objective = %value, "new incumbent");
        }
    }
}

impl<V: VariableId> Default for SatSolver<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn integral(value: Number) -> Result<i64> {
    value.to_i64().ok_or(SolverError::CoefficientDomain {
        value: value.as_f64(),
        backend: NAME,
    })
}

fn integral_terms<V: VariableId>(
    linear: &Linear<V>,
    index: &VariableIndex<V>,
    vars: &[Var],
) -> Result<Vec<(i64, Var)>> {
    linear
        .iter()
        .map(|term| {
            let column = index.index_of(term.variable()).ok_or_else(|| {
                SolverError::InvalidProblem(format!("variable {:?} has no column", term.variable()))
            })?;
            Ok((integral(term.coefficient())?, vars[column]))
        })
        .collect()
}

fn encode_relation(
    formula: &mut impl ExtendFormula,
    terms: &[(i64, Var)],
    operator: Operator,
    rhs: i64,
) -> usize {
    let mut created = 0;
    for row in AtMost::from_relation(terms, operator, rhs) {
        created += pseudo_boolean::encode(&mut *formula, &row);
    }
    created
}

impl<V: VariableId> SolverService<V> for SatSolver<V> {
    fn validate(&self, problem: &Problem<V>) -> Result<()> {
        validate_structure(problem)?;

        for variable in problem.indexed_variables() {
            if problem.var_type(&variable) != VariableType::Boolean {
                return Err(SolverError::DomainViolation {
                    variable: format!("{:?}", variable),
                    backend: NAME,
                });
            }
        }

        let objective = problem.objective().into_iter().flat_map(|o| o.iter());
        let rows = problem.constraints().iter().flat_map(|c| c.lhs().iter());
        for term in objective.chain(rows) {
            integral(term.coefficient())?;
        }
        for constraint in problem.constraints() {
            integral(constraint.rhs())?;
        }
        Ok(())
    }

    fn solve(&mut self, problem: &Problem<V>) -> Result<Option<Solution<V>>> {
        // Validate first
        self.validate(problem)?;
        self.incumbents.clear();

        let start_time = Instant::now();
        let parameters = self.parameters.clone();
        let index = VariableIndex::build(problem);

        let mut solver = Solver::new();
        let vars: Vec<Var> = (0..index.len()).map(|_| solver.new_var()).collect();

        for (column, variable) in index.iter() {
            let spec = ColumnSpec::of(problem, variable);
            if spec.lower_or(0.0) >= 1.0 {
                solver.add_clause(&[vars[column].positive()]);
            }
            if spec.upper_or(1.0) <= 0.0 {
                solver.add_clause(&[vars[column].negative()]);
            }
        }

        let mut auxiliary = 0;
        for (row, constraint) in problem.constraints().iter().enumerate() {
            if encoding::time_budget_exhausted(start_time, &parameters) {
                warn!(backend = NAME, row, "time limit reached while encoding");
                return Ok(None);
            }
            let terms = integral_terms(constraint.lhs(), &index, &vars)?;
            auxiliary += encode_relation(
                &mut solver,
                &terms,
                constraint.operator(),
                integral(constraint.rhs())?,
            );
        }

        let objective = match problem.objective() {
            Some(objective) => Some(integral_terms(objective, &index, &vars)?),
            None => None,
        };

        debug!(
            backend = NAME,
            columns = index.len(),
            rows = problem.constraints_count(),
            auxiliary,
            "model built"
        );

        if parameters.postsolve().is_some() {
            debug!(backend = NAME, "postsolve parameter has no effect");
        }
        for (name, _) in parameters.native() {
            warn!(backend = NAME, option = name, "ignoring native option");
        }
        self.hooks.run(&mut solver, &index);

        let mut best: Option<Vec<bool>> = None;
        let mut round = 0;
        loop {
            // varisat cannot be interrupted; the budget is checked per round
            if encoding::time_budget_exhausted(start_time, &parameters) {
                warn!(backend = NAME, round, "time limit reached");
                break;
            }

            let satisfiable = solver
                .solve()
                .map_err(|e| SolverError::backend(NAME, format!("{:?}", e)))?;
            if !satisfiable {
                break;
            }
            round += 1;

            let model = solver
                .model()
                .ok_or_else(|| SolverError::backend(NAME, "satisfiable but no model"))?;
            let positive: HashSet<Var> = model
                .iter()
                .filter(|lit| lit.is_positive())
                .map(|lit| lit.var())
                .collect();
            let assignment: Vec<bool> = vars.iter().map(|v| positive.contains(v)).collect();

            let Some(objective) = objective.as_ref() else {
                best = Some(assignment);
                break;
            };

            let value = objective
                .iter()
                .filter(|(_, var)| positive.contains(var))
                .fold(0i64, |sum, (c, _)| sum.saturating_add(*c));
            self.incumbents.push(Number::Int(value));
            self.log_incumbent(Number::Int(value), round);
            best = Some(assignment);

            // next model must be strictly better
            auxiliary += match problem.optimization_type() {
                OptimizationType::Minimize => {
                    encode_relation(&mut solver, objective, Operator::Le, value.saturating_sub(1))
                }
                OptimizationType::Maximize => {
                    encode_relation(&mut solver, objective, Operator::Ge, value.saturating_add(1))
                }
            };
        }

        debug!(
            backend = NAME,
            rounds = round,
            auxiliary,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "solve finished"
        );

        let Some(assignment) = best else {
            debug!(backend = NAME, "no solution");
            return Ok(None);
        };

        let mut solution = Solution::for_objective(problem.objective());
        for (column, variable) in index.iter() {
            solution.put_primal(variable.clone(), Number::Int(assignment[column] as i64));
        }
        if let Some(&value) = self.incumbents.last() {
            solution.set_objective_value(value);
        }
        Ok(Some(solution))
    }

    fn set_parameter(&mut self, parameter: Parameter, value: ParameterValue) {
        self.parameters.set(parameter, value);
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn name(&self) -> &str {
        NAME
    }

    fn supports_mip(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Term;
    use std::cell::Cell;
    use std::rc::Rc;

    fn linear(terms: &[(i64, &'static str)]) -> Linear<&'static str> {
        terms.iter().map(|&(c, v)| Term::new(c, v)).collect()
    }

    fn booleans(problem: &mut Problem<&'static str>, names: &[&'static str]) {
        for name in names {
            problem.set_var_type(*name, VariableType::Boolean);
        }
    }

    #[test]
    fn integer_variable_is_a_domain_violation() {
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(1, "x"), (1, "y")]));
        problem.set_var_type("x", VariableType::Boolean);
        problem.set_var_type("y", VariableType::Integer);

        let mut solver = SatSolver::new();
        match solver.solve(&problem) {
            Err(SolverError::DomainViolation { variable, backend }) => {
                assert_eq!(variable, "\"y\"");
                assert_eq!(backend, "SAT");
            }
            other => panic!("unexpected result: {:?}", other.map(|s| s.is_some())),
        }
    }

    #[test]
    fn fractional_coefficient_is_rejected() {
        let mut problem = Problem::new();
        let lhs: Linear<_> = [Term::new(0.5, "x")].into_iter().collect();
        problem.add_constraint(lhs, Operator::Le, 1);
        booleans(&mut problem, &["x"]);

        let solver: SatSolver<&str> = SatSolver::new();
        assert!(matches!(
            solver.validate(&problem),
            Err(SolverError::CoefficientDomain { backend: "SAT", .. })
        ));
    }

    #[test]
    fn whole_float_coefficients_are_accepted() {
        let mut problem = Problem::new();
        let lhs: Linear<_> = [Term::new(2.0, "x"), Term::new(1.0, "y")].into_iter().collect();
        problem.add_constraint(lhs, Operator::Ge, 3.0);
        booleans(&mut problem, &["x", "y"]);

        let mut solver = SatSolver::new();
        let solution = solver.solve(&problem).unwrap().expect("feasible");
        assert_eq!(solution.get(&"x"), Some(Number::Int(1)));
        assert_eq!(solution.get(&"y"), Some(Number::Int(1)));
        assert_eq!(solution.objective(), None);
    }

    #[test]
    fn minimises_with_cuts() {
        // Minimize: 3a + 2b + 4c
        // Subject to: a + b + c >= 2
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(3, "a"), (2, "b"), (4, "c")]));
        problem.add_constraint(linear(&[(1, "a"), (1, "b"), (1, "c")]), Operator::Ge, 2);
        booleans(&mut problem, &["a", "b", "c"]);

        let mut solver = SatSolver::new();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert_eq!(solution.objective(), Some(Number::Int(5)));
        assert_eq!(solution.get_boolean(&"c"), Some(false));
        assert_eq!(solver.incumbents().last(), Some(&Number::Int(5)));
        assert!(solver
            .incumbents()
            .windows(2)
            .all(|w| w[1].as_f64() < w[0].as_f64()));
    }

    #[test]
    fn maximises_with_cuts() {
        // Maximize: 5a + 4b + 3c
        // Subject to: 2a + 3b + c <= 4
        let mut problem = Problem::new();
        problem.set_objective_with_sense(
            linear(&[(5, "a"), (4, "b"), (3, "c")]),
            OptimizationType::Maximize,
        );
        problem.add_constraint(linear(&[(2, "a"), (3, "b"), (1, "c")]), Operator::Le, 4);
        booleans(&mut problem, &["a", "b", "c"]);

        let mut solver = SatSolver::new();
        let solution = solver.solve(&problem).unwrap().expect("feasible");

        assert_eq!(solution.objective(), Some(Number::Int(8)));
        assert_eq!(solution.get_boolean(&"b"), Some(false));
        assert!(solver
            .incumbents()
            .windows(2)
            .all(|w| w[1].as_f64() > w[0].as_f64()));
    }

    #[test]
    fn infeasible_is_none() {
        let names = ["a", "b", "c"];
        let mut problem = Problem::new();
        let all: Linear<_> = names.iter().map(|&n| Term::new(1, n)).collect();
        problem.add_constraint(all.clone(), Operator::Eq, 1);
        problem.add_constraint(all, Operator::Eq, 2);
        booleans(&mut problem, &names);

        let mut solver = SatSolver::new();
        assert!(solver.solve(&problem).unwrap().is_none());
        assert!(solver.incumbents().is_empty());
    }

    #[test]
    fn bounds_fix_booleans() {
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(1, "x"), (1, "y")]));
        problem.set_var_bounds_and_type(0.5, "x", 1, VariableType::Boolean);
        problem.set_var_bounds_and_type(0, "y", 1, VariableType::Boolean);

        let mut solver = SatSolver::new();
        let solution = solver.solve(&problem).unwrap().expect("feasible");
        assert_eq!(solution.get(&"x"), Some(Number::Int(1)));
        assert_eq!(solution.get(&"y"), Some(Number::Int(0)));
    }

    #[test]
    fn hooks_can_add_clauses() {
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(1, "x"), (1, "y")]));
        problem.add_constraint(linear(&[(1, "x"), (1, "y")]), Operator::Ge, 1);
        booleans(&mut problem, &["x", "y"]);

        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut solver = SatSolver::new();
        solver.add_hook(move |native, index| {
            let x = Var::from_index(index.index_of(&"x").unwrap());
            native.add_clause(&[x.negative()]);
            seen.set(seen.get() + 1);
        });

        let solution = solver.solve(&problem).unwrap().expect("feasible");
        assert_eq!(calls.get(), 1);
        assert_eq!(solution.get(&"x"), Some(Number::Int(0)));
        assert_eq!(solution.get(&"y"), Some(Number::Int(1)));
    }

    #[test]
    fn zero_timeout_gives_no_solution() {
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(1, "x")]));
        booleans(&mut problem, &["x"]);

        let mut solver = SatSolver::new();
        solver.set_parameter(Parameter::Timeout, ParameterValue::Float(0.0));
        assert!(solver.solve(&problem).unwrap().is_none());
    }

    #[test]
    fn timeout_during_encoding_skips_hooks() {
        let mut problem = Problem::new();
        problem.set_objective(linear(&[(1, "x"), (1, "y")]));
        problem.add_constraint(linear(&[(3, "x"), (2, "y")]), Operator::Ge, 2);
        booleans(&mut problem, &["x", "y"]);

        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut solver = SatSolver::new();
        solver.add_hook(move |_, _| seen.set(seen.get() + 1));
        solver.set_parameter(Parameter::Timeout, ParameterValue::Int(0));

        assert!(solver.solve(&problem).unwrap().is_none());
        assert_eq!(calls.get(), 0);
        assert!(solver.incumbents().is_empty());
    }
}
