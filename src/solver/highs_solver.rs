// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS
// Translates the problem model to a HiGHS row problem and marshals the
// primal and dual values back

use std::time::Instant;

use highs::{Col, HighsModelStatus, Model, RowProblem, Sense};
use tracing::{debug, warn};

use crate::domain::{
    hooks::{HookId, Hooks, VariableIndex},
    models::{Problem, VariableId},
    parameters::{Parameter, ParameterValue, Parameters, Verbosity},
    solution::{DualKey, Solution},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{Number, Operator, OptimizationType},
};
use crate::solver::encoding::{self, ColumnSpec, FEASIBILITY_TOLERANCE};

const NAME: &str = "HiGHS";

/// LP/MILP adapter over HiGHS. Reports duals for pure LPs.
pub struct HighsSolver<V: VariableId> {
    parameters: Parameters,
    hooks: Hooks<Model, V>,
}

impl<V: VariableId> HighsSolver<V> {
    pub fn new() -> Self {
        Self::with_parameters(Parameters::new())
    }

    pub fn with_parameters(parameters: Parameters) -> Self {
        Self {
            parameters,
            hooks: Hooks::new(),
        }
    }

    /// Register a hook that receives the built `highs::Model` before solving.
    pub fn add_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut Model, &VariableIndex<V>) + 'static,
    {
        self.hooks.add(hook)
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    fn apply_parameters(model: &mut Model, parameters: &Parameters) {
        if let Some(limit) = parameters.timeout() {
            model.set_option("time_limit", limit.as_secs_f64());
        }

        if let Some(verbosity) = parameters.verbosity() {
            model.set_option("output_flag", console_output(verbosity));
            model.set_option("log_to_console", console_output(verbosity));
            if verbosity == Verbosity::Full {
                model.set_option("log_dev_level", 1);
            }
        }

        if parameters.postsolve().is_some() {
            debug!(backend = NAME, "postsolve parameter has no effect");
        }

        for (name, value) in parameters.native() {
            match value {
                ParameterValue::Int(v) => match i32::try_from(*v) {
                    Ok(v) => model.set_option(name, v),
                    Err(_) => warn!(option = name, value = v, "ignoring out-of-range HiGHS option"),
                },
                ParameterValue::Float(v) => model.set_option(name, *v),
                ParameterValue::Bool(v) => model.set_option(name, *v),
                ParameterValue::Text(v) => model.set_option(name, v.as_str()),
            }
        }
    }
}

// HiGHS has no errors-only log level
fn console_output(verbosity: Verbosity) -> bool {
    verbosity >= Verbosity::Normal
}

impl<V: VariableId> Default for HighsSolver<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VariableId> SolverService<V> for HighsSolver<V> {
    fn solve(&mut self, problem: &Problem<V>) -> Result<Option<Solution<V>>> {
        // Validate first
        self.validate(problem)?;

        let start_time = Instant::now();
        let parameters = self.parameters.clone();
        let index = VariableIndex::build(problem);
        let costs = encoding::dense_objective(problem, &index)?;

        let mut pb = RowProblem::default();
        let mut columns: Vec<Col> = Vec::with_capacity(index.len());
        let has_integers = problem.is_mixed_integer();

        for (column, variable) in index.iter() {
            let spec = ColumnSpec::of(problem, variable);
            let bounds = spec.lower_or(f64::NEG_INFINITY)..=spec.upper_or(f64::INFINITY);
            let col = if spec.is_integer() {
                pb.add_integer_column(costs[column], bounds)
            } else {
                pb.add_column(costs[column], bounds)
            };
            columns.push(col);
        }

        for constraint in problem.constraints() {
            let row: Vec<(Col, f64)> = encoding::sparse_row(constraint.lhs(), &index)?
                .into_iter()
                .map(|(column, coefficient)| (columns[column], coefficient))
                .collect();
            let rhs = constraint.rhs().as_f64();
            match constraint.operator() {
                Operator::Le => {
                    pb.add_row(..=rhs, &row);
                }
                Operator::Ge => {
                    pb.add_row(rhs.., &row);
                }
                Operator::Eq => {
                    pb.add_row(rhs..=rhs, &row);
                }
            }
        }

        let sense = match problem.optimization_type() {
            OptimizationType::Maximize => Sense::Maximise,
            OptimizationType::Minimize => Sense::Minimise,
        };

        debug!(
            backend = NAME,
            columns = index.len(),
            rows = problem.constraints_count(),
            integer = problem.num_integer_variables(),
            "model built"
        );

        let mut model = pb.optimise(sense);
        Self::apply_parameters(&mut model, &parameters);
        self.hooks.run(&mut model, &index);

        let solved = model
            .try_solve()
            .map_err(|status| SolverError::backend(NAME, format!("{:?}", status)))?;
        let status = solved.status();
        debug!(backend = NAME, ?status, elapsed_ms = start_time.elapsed().as_millis() as u64, "solve finished");

        let found = match status {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => true,
            HighsModelStatus::Infeasible
            | HighsModelStatus::Unbounded
            | HighsModelStatus::UnboundedOrInfeasible => false,
            HighsModelStatus::ReachedTimeLimit
            | HighsModelStatus::ReachedIterationLimit
            | HighsModelStatus::ObjectiveBound
            | HighsModelStatus::ObjectiveTarget => {
                // keep the point only if it is a real incumbent
                let solution = solved.get_solution();
                encoding::is_feasible_point(problem, &index, solution.columns(), FEASIBILITY_TOLERANCE)
            }
            status => {
                return Err(SolverError::backend(
                    NAME,
                    format!("HiGHS solver returned status: {:?}", status),
                ))
            }
        };

        if !found {
            debug!(backend = NAME, ?status, "no solution");
            return Ok(None);
        }

        let solution_data = solved.get_solution();
        let mut solution = encoding::extract_solution(problem, &index, solution_data.columns());

        // duals are only meaningful for continuous problems
        if !has_integers {
            for (column, variable) in index.iter() {
                if let Some(&dual) = solution_data.dual_columns().get(column) {
                    solution.put_dual(DualKey::Variable(variable.clone()), Number::Float(dual));
                }
            }
            for (row, constraint) in problem.constraints().iter().enumerate() {
                if let Some(&dual) = solution_data.dual_rows().get(row) {
                    solution.put_dual(
                        DualKey::Constraint(constraint.name().to_string()),
                        Number::Float(dual),
                    );
                }
            }
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
        true
    }

    fn supports_duals(&self) -> bool {
        true
    }
}
