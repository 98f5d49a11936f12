use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use super::solver_service::{Result, SolverError};
use super::value_objects::{Number, Operator, OptimizationType, VariableType};

/// Identity of a decision variable.
///
/// Any cloneable, hashable client value works; the crate only references
/// variables, it never creates them.
pub trait VariableId: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> VariableId for T {}

/// One `coefficient * variable` pair of a linear expression
#[derive(Debug, Clone, PartialEq)]
pub struct Term<V> {
    variable: V,
    coefficient: Number,
}

impl<V> Term<V> {
    pub fn new(coefficient: impl Into<Number>, variable: V) -> Self {
        Self {
            variable,
            coefficient: coefficient.into(),
        }
    }

    pub fn variable(&self) -> &V {
        &self.variable
    }

    pub fn coefficient(&self) -> Number {
        self.coefficient
    }
}

/// Weighted sum of variables.
///
/// Terms keep their insertion order and repeated variables are not merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear<V> {
    terms: Vec<Term<V>>,
}

impl<V> Default for Linear<V> {
    fn default() -> Self {
        Self { terms: Vec::new() }
    }
}

impl<V> Linear<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up coefficients and variables position by position.
    pub fn from_parts(coefficients: Vec<Number>, variables: Vec<V>) -> Result<Self> {
        if coefficients.len() != variables.len() {
            return Err(SolverError::VariableCountMismatch {
                coefficients: coefficients.len(),
                variables: variables.len(),
            });
        }
        Ok(coefficients
            .into_iter()
            .zip(variables)
            .map(|(c, v)| Term::new(c, v))
            .collect())
    }

    pub fn add(&mut self, coefficient: impl Into<Number>, variable: V) {
        self.terms.push(Term::new(coefficient, variable));
    }

    pub fn push(&mut self, term: Term<V>) {
        self.terms.push(term);
    }

    pub fn size(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn get(&self, i: usize) -> Option<&Term<V>> {
        self.terms.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term<V>> {
        self.terms.iter()
    }

    pub fn variables(&self) -> Vec<&V> {
        self.terms.iter().map(Term::variable).collect()
    }

    pub fn coefficients(&self) -> Vec<Number> {
        self.terms.iter().map(Term::coefficient).collect()
    }
}

impl<V: VariableId> Linear<V> {
    /// Evaluate against a full assignment; a missing variable is an error.
    pub fn evaluate(&self, assignment: &HashMap<V, Number>) -> Result<Number> {
        self.evaluate_with(assignment, false)
    }

    /// Evaluate against an assignment.
    ///
    /// The sum is accumulated in `f64`. It is returned as `Number::Int` only
    /// if every coefficient and every looked-up value is an `Int`. With
    /// `ignore_missing`, absent variables contribute nothing.
    pub fn evaluate_with(
        &self,
        assignment: &HashMap<V, Number>,
        ignore_missing: bool,
    ) -> Result<Number> {
        let mut sum = 0.0;
        let mut integral = true;

        for term in &self.terms {
            let coefficient = term.coefficient();
            integral &= coefficient.is_int();
            match assignment.get(term.variable()) {
                Some(value) => {
                    integral &= value.is_int();
                    sum += coefficient.as_f64() * value.as_f64();
                }
                None if ignore_missing => {}
                None => {
                    return Err(SolverError::MissingVariable(format!(
                        "{:?}",
                        term.variable()
                    )))
                }
            }
        }

        if integral {
            Ok(Number::Int(sum as i64))
        } else {
            Ok(Number::Float(sum))
        }
    }
}

impl<V> FromIterator<Term<V>> for Linear<V> {
    fn from_iter<I: IntoIterator<Item = Term<V>>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

impl<V> Extend<Term<V>> for Linear<V> {
    fn extend<I: IntoIterator<Item = Term<V>>>(&mut self, iter: I) {
        self.terms.extend(iter);
    }
}

impl<'a, V> IntoIterator for &'a Linear<V> {
    type Item = &'a Term<V>;
    type IntoIter = std::slice::Iter<'a, Term<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl<V: fmt::Display> fmt::Display for Linear<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.terms.len().saturating_sub(1);
        for (i, term) in self.terms.iter().enumerate() {
            write!(f, "{}*{}", term.coefficient, term.variable)?;
            if i < last {
                if (i + 1) % 100 == 0 {
                    writeln!(f)?;
                }
                write!(f, " + ")?;
            }
        }
        Ok(())
    }
}

/// Named linear constraint `lhs <op> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint<V> {
    name: String,
    lhs: Linear<V>,
    operator: Operator,
    rhs: Number,
}

impl<V: fmt::Display> Constraint<V> {
    /// Unnamed constraint. Its name is the rendered constraint, fixed now.
    pub fn new(lhs: Linear<V>, operator: Operator, rhs: impl Into<Number>) -> Self {
        let rhs = rhs.into();
        let name = format!("{} {} {}", lhs, operator, rhs);
        Self {
            name,
            lhs,
            operator,
            rhs,
        }
    }

    /// Like [`Constraint::new`] with the operator given as `"<="`, `"="` or `">="`.
    pub fn parse(lhs: Linear<V>, operator: &str, rhs: impl Into<Number>) -> Result<Self> {
        Ok(Self::new(lhs, operator.parse()?, rhs))
    }
}

impl<V> Constraint<V> {
    pub fn named(
        name: impl Into<String>,
        lhs: Linear<V>,
        operator: Operator,
        rhs: impl Into<Number>,
    ) -> Self {
        Self {
            name: name.into(),
            lhs,
            operator,
            rhs: rhs.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lhs(&self) -> &Linear<V> {
        &self.lhs
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn rhs(&self) -> Number {
        self.rhs
    }

    pub fn size(&self) -> usize {
        self.lhs.size()
    }
}

impl<V: fmt::Display> fmt::Display for Constraint<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.operator, self.rhs)
    }
}

/// Complete optimization problem: objective, constraints and variable domains.
///
/// Setting the objective or adding a constraint registers every referenced
/// variable. Type and bound metadata is kept per variable; unset types are
/// `Real` and unset bounds are unbounded.
#[derive(Debug, Clone)]
pub struct Problem<V: VariableId> {
    objective: Option<Linear<V>>,
    optimization_type: OptimizationType,
    constraints: Vec<Constraint<V>>,
    variables: Vec<V>,
    registered: HashSet<V>,
    var_types: HashMap<V, VariableType>,
    lower_bounds: HashMap<V, Number>,
    upper_bounds: HashMap<V, Number>,
    // variables first seen through type/bound metadata, in that order
    declared_only: Vec<V>,
}

impl<V: VariableId> Default for Problem<V> {
    fn default() -> Self {
        Self {
            objective: None,
            optimization_type: OptimizationType::default(),
            constraints: Vec::new(),
            variables: Vec::new(),
            registered: HashSet::new(),
            var_types: HashMap::new(),
            lower_bounds: HashMap::new(),
            upper_bounds: HashMap::new(),
            declared_only: Vec::new(),
        }
    }
}

impl<V: VariableId> Problem<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, linear: &Linear<V>) {
        for term in linear {
            if self.registered.insert(term.variable().clone()) {
                self.variables.push(term.variable().clone());
            }
        }
    }

    fn declare(&mut self, variable: &V) {
        let known = self.var_types.contains_key(variable)
            || self.lower_bounds.contains_key(variable)
            || self.upper_bounds.contains_key(variable);
        if !known {
            self.declared_only.push(variable.clone());
        }
    }

    pub fn objective(&self) -> Option<&Linear<V>> {
        self.objective.as_ref()
    }

    /// Replace the objective. The previous objective is discarded, not merged.
    pub fn set_objective(&mut self, objective: Linear<V>) {
        self.register(&objective);
        self.objective = Some(objective);
    }

    pub fn set_objective_with_sense(&mut self, objective: Linear<V>, sense: OptimizationType) {
        self.set_objective(objective);
        self.optimization_type = sense;
    }

    /// Set the objective with the sense given as `"min"` or `"max"`.
    ///
    /// An unknown sense leaves the problem untouched.
    pub fn set_objective_str(&mut self, objective: Linear<V>, sense: &str) -> Result<()> {
        let sense = sense.parse()?;
        self.set_objective_with_sense(objective, sense);
        Ok(())
    }

    pub fn set_optimization_type(&mut self, sense: OptimizationType) {
        self.optimization_type = sense;
    }

    pub fn optimization_type(&self) -> OptimizationType {
        self.optimization_type
    }

    pub fn constraints(&self) -> &[Constraint<V>] {
        &self.constraints
    }

    pub fn constraints_count(&self) -> usize {
        self.constraints.len()
    }

    /// Variables referenced by the objective or a constraint, in first-reference order.
    pub fn variables(&self) -> &[V] {
        &self.variables
    }

    pub fn variables_count(&self) -> usize {
        self.variables.len()
    }

    /// Every variable a backend has to index: the registered ones followed by
    /// variables that only carry type or bound metadata.
    pub fn indexed_variables(&self) -> Vec<V> {
        self.variables
            .iter()
            .chain(
                self.declared_only
                    .iter()
                    .filter(|v| !self.registered.contains(*v)),
            )
            .cloned()
            .collect()
    }

    pub fn add(&mut self, constraint: Constraint<V>) {
        self.register(constraint.lhs());
        self.constraints.push(constraint);
    }

    pub fn add_named_constraint(
        &mut self,
        name: impl Into<String>,
        lhs: Linear<V>,
        operator: Operator,
        rhs: impl Into<Number>,
    ) {
        self.add(Constraint::named(name, lhs, operator, rhs));
    }

    pub fn var_type(&self, variable: &V) -> VariableType {
        self.var_types.get(variable).copied().unwrap_or_default()
    }

    pub fn set_var_type(&mut self, variable: V, var_type: VariableType) {
        self.declare(&variable);
        self.var_types.insert(variable, var_type);
    }

    pub fn var_lower_bound(&self, variable: &V) -> Option<Number> {
        self.lower_bounds.get(variable).copied()
    }

    pub fn var_upper_bound(&self, variable: &V) -> Option<Number> {
        self.upper_bounds.get(variable).copied()
    }

    pub fn set_var_lower_bound(&mut self, variable: V, value: impl Into<Number>) {
        self.declare(&variable);
        self.lower_bounds.insert(variable, value.into());
    }

    pub fn set_var_upper_bound(&mut self, variable: V, value: impl Into<Number>) {
        self.declare(&variable);
        self.upper_bounds.insert(variable, value.into());
    }

    pub fn set_var_bounds(
        &mut self,
        lower: impl Into<Number>,
        variable: V,
        upper: impl Into<Number>,
    ) {
        self.set_var_lower_bound(variable.clone(), lower);
        self.set_var_upper_bound(variable, upper);
    }

    pub fn set_var_bounds_and_type(
        &mut self,
        lower: impl Into<Number>,
        variable: V,
        upper: impl Into<Number>,
        var_type: VariableType,
    ) {
        self.set_var_bounds(lower, variable.clone(), upper);
        self.set_var_type(variable, var_type);
    }

    pub fn num_integer_variables(&self) -> usize {
        self.indexed_variables()
            .iter()
            .filter(|v| self.var_type(v).is_integer())
            .count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }
}

impl<V: VariableId + fmt::Display> Problem<V> {
    pub fn add_constraint(&mut self, lhs: Linear<V>, operator: Operator, rhs: impl Into<Number>) {
        self.add(Constraint::new(lhs, operator, rhs));
    }

    /// Add a constraint with the operator given as a string, named or not.
    pub fn add_parsed(
        &mut self,
        name: Option<&str>,
        lhs: Linear<V>,
        operator: &str,
        rhs: impl Into<Number>,
    ) -> Result<()> {
        let operator: Operator = operator.parse()?;
        match name {
            Some(name) => self.add_named_constraint(name, lhs, operator, rhs),
            None => self.add_constraint(lhs, operator, rhs),
        }
        Ok(())
    }
}

impl<V: VariableId + fmt::Display> fmt::Display for Problem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.objective {
            Some(objective) => {
                writeln!(f, "{}", self.optimization_type)?;
                writeln!(f, " {}", objective)?;
            }
            None => writeln!(f, "Find one solution")?,
        }

        writeln!(f, "Subject To")?;
        for constraint in &self.constraints {
            writeln!(f, " {}", constraint)?;
        }

        let variables = self.indexed_variables();

        writeln!(f, "Bounds")?;
        for variable in &variables {
            let lower = self.var_lower_bound(variable);
            let upper = self.var_upper_bound(variable);
            if lower.is_none() && upper.is_none() {
                continue;
            }
            write!(f, " ")?;
            if let Some(lower) = lower {
                write!(f, "{} <= ", lower)?;
            }
            write!(f, "{}", variable)?;
            if let Some(upper) = upper {
                write!(f, " <= {}", upper)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Variables")?;
        for variable in &variables {
            writeln!(f, " {} {}", variable, self.var_type(variable))?;
        }
        Ok(())
    }
}
