// Domain service interface for solving optimization problems
// Defines the contract that every backend adapter must follow

use super::models::{Problem, VariableId};
use super::parameters::{Parameter, ParameterValue, Parameters};
use super::solution::Solution;

/// Error types for model construction and solving
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Unknown relational operator: {0:?} (expected \"<=\", \"=\" or \">=\")")]
    MalformedOperator(String),

    #[error("Unknown optimization type: {0:?} (expected \"min\" or \"max\")")]
    MalformedOptimizationType(String),

    #[error("The number of coefficients ({coefficients}) and variables ({variables}) must be equal")]
    VariableCountMismatch { coefficients: usize, variables: usize },

    #[error("The variable {0} is missing in the given assignment")]
    MissingVariable(String),

    #[error("Variable {variable} is not a boolean variable; {backend} can only solve 0-1 problems")]
    DomainViolation {
        variable: String,
        backend: &'static str,
    },

    #[error("{backend} requires integer coefficients, found {value}")]
    CoefficientDomain { value: f64, backend: &'static str },

    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("{backend} failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

impl SolverError {
    pub(crate) fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        SolverError::Backend {
            backend,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Contract implemented by every backend adapter.
///
/// `solve` has two distinct outcomes besides success: `Ok(None)` when the
/// problem has no solution (infeasible, unbounded, or the time budget ran
/// out before an incumbent was found), and `Err` when the model is rejected
/// or the engine itself fails.
pub trait SolverService<V: VariableId> {
    /// Solve an optimization problem
    fn solve(&mut self, problem: &Problem<V>) -> Result<Option<Solution<V>>>;

    /// Checks run before any native call. Adapters with a narrower model
    /// domain extend [`validate_structure`].
    fn validate(&self, problem: &Problem<V>) -> Result<()> {
        validate_structure(problem)
    }

    /// Set a parameter for the next solve
    fn set_parameter(&mut self, parameter: Parameter, value: ParameterValue);

    /// Parameters applied by the next solve
    fn parameters(&self) -> &Parameters;

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports general integer variables
    fn supports_mip(&self) -> bool;

    /// Check if this solver reports dual values
    fn supports_duals(&self) -> bool {
        false
    }
}

/// Rejects non-finite coefficients and right-hand sides and NaN bounds.
pub fn validate_structure<V: VariableId>(problem: &Problem<V>) -> Result<()> {
    let mut errors = Vec::new();

    if let Some(objective) = problem.objective() {
        if objective.iter().any(|t| !t.coefficient().is_finite()) {
            errors.push("objective has a non-finite coefficient".to_string());
        }
    }

    for constraint in problem.constraints() {
        if constraint.lhs().iter().any(|t| !t.coefficient().is_finite()) {
            errors.push(format!(
                "constraint '{}' has a non-finite coefficient",
                constraint.name()
            ));
        }
        if !constraint.rhs().is_finite() {
            errors.push(format!(
                "constraint '{}' has a non-finite right-hand side",
                constraint.name()
            ));
        }
    }

    for variable in problem.indexed_variables() {
        let lower = problem.var_lower_bound(&variable);
        let upper = problem.var_upper_bound(&variable);
        if lower.is_some_and(|b| b.as_f64().is_nan()) || upper.is_some_and(|b| b.as_f64().is_nan()) {
            errors.push(format!("variable {:?} has a NaN bound", variable));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SolverError::InvalidProblem(errors.join("; ")))
    }
}
