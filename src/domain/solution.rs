use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use super::models::{Linear, VariableId};
use super::value_objects::Number;

/// Key of a dual value: a variable (reduced cost) or a constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DualKey<V> {
    Variable(V),
    Constraint(String),
}

/// Solution to an optimization problem
///
/// Created once per successful solve. When the backend does not report an
/// objective value it is evaluated from the objective expression over the
/// primal values on first request.
#[derive(Debug, Clone)]
pub struct Solution<V: VariableId> {
    primal: HashMap<V, Number>,
    dual: HashMap<DualKey<V>, Number>,
    objective_value: Option<Number>,
    objective_function: Option<Linear<V>>,
    evaluated: OnceCell<Option<Number>>,
}

impl<V: VariableId> Default for Solution<V> {
    fn default() -> Self {
        Self {
            primal: HashMap::new(),
            dual: HashMap::new(),
            objective_value: None,
            objective_function: None,
            evaluated: OnceCell::new(),
        }
    }
}

impl<V: VariableId> Solution<V> {
    /// Solution of a problem without objective function
    pub fn new() -> Self {
        Self::default()
    }

    /// Solution whose objective value is derived from `objective`
    pub fn with_objective_function(objective: Linear<V>) -> Self {
        Self {
            objective_function: Some(objective),
            ..Self::default()
        }
    }

    /// Solution with an objective value reported by the backend
    pub fn with_objective_value(value: impl Into<Number>) -> Self {
        Self {
            objective_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub(crate) fn for_objective(objective: Option<&Linear<V>>) -> Self {
        match objective {
            Some(objective) => Self::with_objective_function(objective.clone()),
            None => Self::new(),
        }
    }

    pub(crate) fn set_objective_value(&mut self, value: Number) {
        self.objective_value = Some(value);
    }

    /// Objective value, if the problem has an objective.
    pub fn objective(&self) -> Option<Number> {
        if let Some(value) = self.objective_value {
            return Some(value);
        }
        let function = self.objective_function.as_ref()?;
        *self
            .evaluated
            .get_or_init(|| function.evaluate(&self.primal).ok())
    }

    pub fn get(&self, variable: &V) -> Option<Number> {
        self.primal.get(variable).copied()
    }

    /// `true` if the primal value is non-zero.
    pub fn get_boolean(&self, variable: &V) -> Option<bool> {
        self.get(variable).map(|v| !v.is_zero())
    }

    pub fn put(&mut self, variable: V, value: impl Into<Number>) {
        self.put_primal(variable, value);
    }

    pub fn primal(&self, variable: &V) -> Option<Number> {
        self.get(variable)
    }

    pub fn put_primal(&mut self, variable: V, value: impl Into<Number>) {
        self.primal.insert(variable, value.into());
        self.evaluated = OnceCell::new();
    }

    pub fn dual(&self, variable: &V) -> Option<Number> {
        self.dual.get(&DualKey::Variable(variable.clone())).copied()
    }

    pub fn constraint_dual(&self, name: &str) -> Option<Number> {
        self.dual.get(&DualKey::Constraint(name.to_string())).copied()
    }

    pub fn put_dual(&mut self, key: DualKey<V>, value: impl Into<Number>) {
        self.dual.insert(key, value.into());
    }

    pub fn has_duals(&self) -> bool {
        !self.dual.is_empty()
    }

    pub fn contains_var(&self, variable: &V) -> bool {
        self.primal.contains_key(variable)
    }

    pub fn primal_values(&self) -> &HashMap<V, Number> {
        &self.primal
    }

    pub fn dual_values(&self) -> &HashMap<DualKey<V>, Number> {
        &self.dual
    }
}

impl<V: VariableId + fmt::Display> fmt::Display for Solution<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective() {
            Some(value) => write!(f, "Objective: {} {{", value)?,
            None => write!(f, "Objective: none {{")?,
        }
        for (i, (variable, value)) in self.primal.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", variable, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Term;

    fn objective() -> Linear<&'static str> {
        [Term::new(143, "x"), Term::new(60, "y")].into_iter().collect()
    }

    #[test]
    fn objective_is_derived_from_primal_values() {
        let mut solution = Solution::with_objective_function(objective());
        solution.put("x", 22);
        solution.put("y", 52);
        assert_eq!(solution.objective(), Some(Number::Int(6266)));
    }

    #[test]
    fn derived_objective_follows_later_puts() {
        let mut solution = Solution::with_objective_function(objective());
        solution.put("x", 1);
        assert_eq!(solution.objective(), None);
        solution.put("y", 1);
        assert_eq!(solution.objective(), Some(Number::Int(203)));
    }

    #[test]
    fn reported_objective_wins() {
        let mut solution: Solution<&str> = Solution::with_objective_value(1.5);
        solution.put("x", 3);
        assert_eq!(solution.objective(), Some(Number::Float(1.5)));
        assert_eq!(Solution::<&str>::new().objective(), None);
    }

    #[test]
    fn duals_by_variable_and_constraint() {
        let mut solution = Solution::new();
        solution.put_dual(DualKey::Variable("x"), 0.25);
        solution.put_dual(DualKey::Constraint("cap".to_string()), -1.0);

        assert_eq!(solution.dual(&"x"), Some(Number::Float(0.25)));
        assert_eq!(solution.constraint_dual("cap"), Some(Number::Float(-1.0)));
        assert_eq!(solution.dual(&"y"), None);
        assert!(solution.has_duals());
    }

    #[test]
    fn booleans() {
        let mut solution = Solution::new();
        solution.put("a", 0);
        solution.put("b", 1);
        assert_eq!(solution.get_boolean(&"a"), Some(false));
        assert_eq!(solution.get_boolean(&"b"), Some(true));
        assert_eq!(solution.get_boolean(&"c"), None);
        assert!(solution.contains_var(&"a"));
    }
}
