// Translation rules shared by every adapter: column domains, sparse rows,
// objective vectors and result extraction

use std::collections::HashMap;
use std::time::Instant;

use crate::domain::{
    hooks::VariableIndex,
    models::{Linear, Problem, VariableId},
    parameters::Parameters,
    solution::Solution,
    solver_service::{Result, SolverError},
    value_objects::{Number, Operator, VariableType},
};

/// Tolerance used to accept a point returned by a stopped solver as an incumbent.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Native domain of one column.
///
/// `None` bounds are unbounded; backends substitute their own infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub var_type: VariableType,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ColumnSpec {
    /// Effective domain of `variable`.
    ///
    /// Boolean columns are clamped to {0, 1}: any positive lower bound
    /// forces 1 and any upper bound below 1 forces 0.
    pub fn of<V: VariableId>(problem: &Problem<V>, variable: &V) -> Self {
        let var_type = problem.var_type(variable);
        let lower = problem.var_lower_bound(variable).map(Number::as_f64);
        let upper = problem.var_upper_bound(variable).map(Number::as_f64);

        match var_type {
            VariableType::Boolean => Self {
                var_type,
                lower: Some(if lower.is_some_and(|l| l > 0.0) { 1.0 } else { 0.0 }),
                upper: Some(if upper.is_some_and(|u| u < 1.0) { 0.0 } else { 1.0 }),
            },
            _ => Self {
                var_type,
                lower: lower.filter(|l| *l != f64::NEG_INFINITY),
                upper: upper.filter(|u| *u != f64::INFINITY),
            },
        }
    }

    pub fn is_integer(&self) -> bool {
        self.var_type.is_integer()
    }

    pub fn lower_or(&self, unbounded: f64) -> f64 {
        self.lower.unwrap_or(unbounded)
    }

    pub fn upper_or(&self, unbounded: f64) -> f64 {
        self.upper.unwrap_or(unbounded)
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.lower.map_or(true, |l| value >= l - tolerance)
            && self.upper.map_or(true, |u| value <= u + tolerance)
    }
}

/// Sparse row of `(column, coefficient)` with repeated variables summed
/// into their first position. Zero entries are dropped.
pub fn sparse_row<V: VariableId>(
    linear: &Linear<V>,
    index: &VariableIndex<V>,
) -> Result<Vec<(usize, f64)>> {
    let mut row: Vec<(usize, f64)> = Vec::with_capacity(linear.size());
    let mut slot: HashMap<usize, usize> = HashMap::with_capacity(linear.size());

    for term in linear {
        let column = index.index_of(term.variable()).ok_or_else(|| {
            SolverError::InvalidProblem(format!(
                "variable {:?} has no column",
                term.variable()
            ))
        })?;
        let coefficient = term.coefficient().as_f64();
        match slot.get(&column) {
            Some(&at) => row[at].1 += coefficient,
            None => {
                slot.insert(column, row.len());
                row.push((column, coefficient));
            }
        }
    }

    row.retain(|&(_, c)| c != 0.0);
    Ok(row)
}

/// Objective coefficient of every column (zeros without an objective).
pub fn dense_objective<V: VariableId>(
    problem: &Problem<V>,
    index: &VariableIndex<V>,
) -> Result<Vec<f64>> {
    let mut costs = vec![0.0; index.len()];
    if let Some(objective) = problem.objective() {
        for (column, coefficient) in sparse_row(objective, index)? {
            costs[column] = coefficient;
        }
    }
    Ok(costs)
}

/// Stored form of a raw primal value: integer columns are rounded.
pub fn extract_value(var_type: VariableType, raw: f64) -> Number {
    if var_type.is_integer() {
        Number::round(raw)
    } else {
        Number::Float(raw)
    }
}

/// Build the result from raw column values (indexed like `index`).
pub fn extract_solution<V: VariableId>(
    problem: &Problem<V>,
    index: &VariableIndex<V>,
    values: &[f64],
) -> Solution<V> {
    let mut solution = Solution::for_objective(problem.objective());
    for (column, variable) in index.iter() {
        let raw = values.get(column).copied().unwrap_or(0.0);
        solution.put_primal(variable.clone(), extract_value(problem.var_type(variable), raw));
    }
    solution
}

/// Check raw column values against every bound and row.
pub fn is_feasible_point<V: VariableId>(
    problem: &Problem<V>,
    index: &VariableIndex<V>,
    values: &[f64],
    tolerance: f64,
) -> bool {
    if values.len() < index.len() || values.iter().any(|v| !v.is_finite()) {
        return false;
    }

    let within_bounds = index
        .iter()
        .all(|(column, variable)| ColumnSpec::of(problem, variable).contains(values[column], tolerance));
    if !within_bounds {
        return false;
    }

    problem.constraints().iter().all(|constraint| {
        let activity: f64 = match sparse_row(constraint.lhs(), index) {
            Ok(row) => row.iter().map(|&(column, c)| c * values[column]).sum(),
            Err(_) => return false,
        };
        let rhs = constraint.rhs().as_f64();
        match constraint.operator() {
            Operator::Le => activity <= rhs + tolerance,
            Operator::Ge => activity >= rhs - tolerance,
            Operator::Eq => (activity - rhs).abs() <= tolerance,
        }
    })
}

/// True once the configured time budget is spent.
pub fn time_budget_exhausted(start: Instant, parameters: &Parameters) -> bool {
    parameters
        .timeout()
        .is_some_and(|limit| start.elapsed() >= limit)
}
