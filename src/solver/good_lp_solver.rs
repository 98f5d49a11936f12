// good_lp Solver Adapters
// One adapter generic over the good_lp solver it drives (COIN-OR CBC or
// microlp). good_lp does the native translation; this module maps the
// problem model onto good_lp variables and constraints

use std::time::Instant;

use good_lp::solvers::Solver as GoodLpModelFactory;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution as _, SolverModel,
    Variable as GoodLpVariable,
};
use tracing::{debug, warn};

use crate::domain::{
    hooks::{HookId, Hooks, VariableIndex},
    models::{Problem, VariableId},
    parameters::{Parameter, ParameterValue, Parameters},
    solution::Solution,
    solver_service::{Result, SolverError, SolverService},
    value_objects::{Operator, OptimizationType},
};
use crate::solver::encoding::{self, ColumnSpec};

/// A good_lp solver usable behind [`GoodLpSolver`].
pub trait GoodLpBackend {
    /// good_lp model handed to hooks
    type Model: SolverModel<Error = ResolutionError>;

    const NAME: &'static str;

    fn solver() -> impl GoodLpModelFactory<Model = Self::Model>;

    /// Apply the parameter bag to the native model.
    fn configure(model: &mut Self::Model, parameters: &Parameters);
}

/// MILP adapter over a good_lp backend. No duals are reported.
pub struct GoodLpSolver<B: GoodLpBackend, V: VariableId> {
    parameters: Parameters,
    hooks: Hooks<B::Model, V>,
}

impl<B: GoodLpBackend, V: VariableId> GoodLpSolver<B, V> {
    pub fn new() -> Self {
        Self::with_parameters(Parameters::new())
    }

    pub fn with_parameters(parameters: Parameters) -> Self {
        Self {
            parameters,
            hooks: Hooks::new(),
        }
    }

    /// Register a hook that receives the built good_lp model before solving.
    pub fn add_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut B::Model, &VariableIndex<V>) + 'static,
    {
        self.hooks.add(hook)
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }
}

impl<B: GoodLpBackend, V: VariableId> Default for GoodLpSolver<B, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GoodLpBackend, V: VariableId> SolverService<V> for GoodLpSolver<B, V> {
    fn solve(&mut self, problem: &Problem<V>) -> Result<Option<Solution<V>>> {
        // Validate first
        self.validate(problem)?;

        let start_time = Instant::now();
        let parameters = self.parameters.clone();
        let index = VariableIndex::build(problem);

        // Build variables using good_lp
        let mut vars = variables!();
        let mut lp_variables: Vec<GoodLpVariable> = Vec::with_capacity(index.len());

        for (_, var) in index.iter() {
            let spec = ColumnSpec::of(problem, var);
            let mut definition = variable();
            if spec.is_integer() {
                definition = definition.integer();
            }
            if let Some(lower) = spec.lower {
                definition = definition.min(lower);
            }
            if let Some(upper) = spec.upper {
                definition = definition.max(upper);
            }
            lp_variables.push(vars.add(definition));
        }

        let costs = encoding::dense_objective(problem, &index)?;
        let objective: Expression = costs
            .iter()
            .zip(&lp_variables)
            .filter(|(c, _)| **c != 0.0)
            .map(|(&c, &v)| c * v)
            .sum();

        let unsolved = match problem.optimization_type() {
            OptimizationType::Maximize => vars.maximise(objective),
            OptimizationType::Minimize => vars.minimise(objective),
        };
        let mut model = unsolved.using(B::solver());

        for row in problem.constraints() {
            let lhs: Expression = encoding::sparse_row(row.lhs(), &index)?
                .into_iter()
                .map(|(column, coefficient)| coefficient * lp_variables[column])
                .sum();
            let rhs = row.rhs().as_f64();

            match row.operator() {
                Operator::Le => model.add_constraint(constraint!(lhs <= rhs)),
                Operator::Ge => model.add_constraint(constraint!(lhs >= rhs)),
                Operator::Eq => model.add_constraint(constraint!(lhs == rhs)),
            };
        }

        debug!(
            backend = B::NAME,
            columns = index.len(),
            rows = problem.constraints_count(),
            integer = problem.num_integer_variables(),
            "model built"
        );

        B::configure(&mut model, &parameters);
        self.hooks.run(&mut model, &index);

        let outcome = model.solve();
        debug!(backend = B::NAME, elapsed_ms = start_time.elapsed().as_millis() as u64, "solve finished");

        match outcome {
            Ok(sol) => {
                let values: Vec<f64> = lp_variables.iter().map(|&v| sol.value(v)).collect();
                Ok(Some(encoding::extract_solution(problem, &index, &values)))
            }
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => {
                debug!(backend = B::NAME, "no solution");
                Ok(None)
            }
            Err(e) if encoding::time_budget_exhausted(start_time, &parameters) => {
                warn!(backend = B::NAME, error = %e, "time limit reached without a solution");
                Ok(None)
            }
            Err(e) => Err(SolverError::backend(B::NAME, e.to_string())),
        }
    }

    fn set_parameter(&mut self, parameter: Parameter, value: ParameterValue) {
        self.parameters.set(parameter, value);
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn name(&self) -> &str {
        B::NAME
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

#[cfg(feature = "coin_cbc")]
pub use cbc::{CoinCbc, CoinCbcSolver};

#[cfg(feature = "coin_cbc")]
mod cbc {
    use good_lp::solvers::coin_cbc::{coin_cbc, CoinCbcProblem};

    use super::*;
    use crate::domain::parameters::Verbosity;

    /// COIN-OR CBC through good_lp
    pub struct CoinCbc;

    pub type CoinCbcSolver<V> = GoodLpSolver<CoinCbc, V>;

    impl GoodLpBackend for CoinCbc {
        type Model = CoinCbcProblem;

        const NAME: &'static str = "COIN-OR CBC";

        fn solver() -> impl GoodLpModelFactory<Model = CoinCbcProblem> {
            coin_cbc
        }

        fn configure(model: &mut CoinCbcProblem, parameters: &Parameters) {
            if let Some(limit) = parameters.timeout() {
                model.set_parameter("seconds", &limit.as_secs_f64().to_string());
            }
            if let Some(verbosity) = parameters.verbosity() {
                let level = match verbosity {
                    Verbosity::Silent | Verbosity::Errors => "0",
                    Verbosity::Normal => "1",
                    Verbosity::Full => "3",
                };
                model.set_parameter("logLevel", level);
            }
            if parameters.postsolve().is_some() {
                debug!(backend = Self::NAME, "postsolve parameter has no effect");
            }
            for (name, value) in parameters.native() {
                model.set_parameter(name, &value.to_string());
            }
        }
    }
}

#[cfg(feature = "microlp")]
pub use micro::{MicroLp, MicroLpSolver};

#[cfg(feature = "microlp")]
mod micro {
    use good_lp::solvers::microlp::{microlp, MicroLpProblem};

    use super::*;

    /// microlp through good_lp, pure Rust
    pub struct MicroLp;

    pub type MicroLpSolver<V> = GoodLpSolver<MicroLp, V>;

    impl GoodLpBackend for MicroLp {
        type Model = MicroLpProblem;

        const NAME: &'static str = "microlp";

        fn solver() -> impl GoodLpModelFactory<Model = MicroLpProblem> {
            microlp
        }

        // microlp has no options; the time limit is still honoured when
        // classifying a failed solve
        fn configure(_model: &mut MicroLpProblem, parameters: &Parameters) {
            if parameters.timeout().is_some() || parameters.verbosity().is_some() {
                debug!(backend = Self::NAME, "timeout and verbosity are not forwarded");
            }
            for (name, _) in parameters.native() {
                warn!(backend = Self::NAME, option = name, "ignoring native option");
            }
        }
    }
}
