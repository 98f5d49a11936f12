// Solver parameters: the bag shared by factories and adapters

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use super::solver_service::SolverError;
use super::value_objects::SolverBackend;

/// Parameter key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Time budget in seconds
    Timeout,
    /// Verbosity level, see [`Verbosity`]
    Verbose,
    /// Reserved; backends may ignore it
    Postsolve,
    /// Backend option passed through by name
    Native(String),
}

impl Parameter {
    /// Numeric identifier of the built-in keys.
    pub fn code(&self) -> Option<u32> {
        match self {
            Parameter::Timeout => Some(0),
            Parameter::Verbose => Some(1),
            Parameter::Postsolve => Some(2),
            Parameter::Native(_) => None,
        }
    }
}

impl TryFrom<u32> for Parameter {
    type Error = SolverError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Parameter::Timeout),
            1 => Ok(Parameter::Verbose),
            2 => Ok(Parameter::Postsolve),
            other => Err(SolverError::InvalidProblem(format!(
                "unknown parameter code {}",
                other
            ))),
        }
    }
}

/// Parameter value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(i) => Some(*i as f64),
            ParameterValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(i) => Some(*i),
            ParameterValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Int(i) => write!(f, "{}", i),
            ParameterValue::Float(x) => write!(f, "{}", x),
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value as i64)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Int(value as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// Output level requested through [`Parameter::Verbose`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// 0: no output
    Silent,
    /// 1: errors only
    Errors,
    /// 2: normal output
    Normal,
    /// 3 and above: full diagnostics
    Full,
}

impl Verbosity {
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Verbosity::Silent,
            1 => Verbosity::Errors,
            2 => Verbosity::Normal,
            _ => Verbosity::Full,
        }
    }
}

/// Parameter bag.
///
/// Readers for the built-in keys ignore values of the wrong type with a
/// warning instead of failing the solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: HashMap<Parameter, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, parameter: Parameter, value: impl Into<ParameterValue>) {
        self.values.insert(parameter, value.into());
    }

    pub fn with(mut self, parameter: Parameter, value: impl Into<ParameterValue>) -> Self {
        self.set(parameter, value);
        self
    }

    pub fn get(&self, parameter: &Parameter) -> Option<&ParameterValue> {
        self.values.get(parameter)
    }

    pub fn remove(&mut self, parameter: &Parameter) -> Option<ParameterValue> {
        self.values.remove(parameter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Parameter, &ParameterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every entry of `other` into this bag, overwriting equal keys.
    pub fn extend_from(&mut self, other: &Parameters) {
        for (parameter, value) in other.iter() {
            self.values.insert(parameter.clone(), value.clone());
        }
    }

    /// Named backend options, in no particular order.
    pub fn native(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().filter_map(|(parameter, value)| match parameter {
            Parameter::Native(name) => Some((name.as_str(), value)),
            _ => None,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        let value = self.values.get(&Parameter::Timeout)?;
        match value.as_f64() {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                Some(Duration::from_secs_f64(seconds))
            }
            _ => {
                warn!(value = %value, "ignoring timeout parameter, expected non-negative seconds");
                None
            }
        }
    }

    pub fn verbosity(&self) -> Option<Verbosity> {
        let value = self.values.get(&Parameter::Verbose)?;
        match value {
            ParameterValue::Int(level) => Some(Verbosity::from_level(*level)),
            ParameterValue::Float(level) if level.is_finite() => {
                Some(Verbosity::from_level(*level as i64))
            }
            _ => {
                warn!(value = %value, "ignoring verbose parameter, expected a numeric level");
                None
            }
        }
    }

    pub fn postsolve(&self) -> Option<bool> {
        let value = self.values.get(&Parameter::Postsolve)?;
        match value {
            ParameterValue::Bool(b) => Some(*b),
            ParameterValue::Int(i) => Some(*i != 0),
            _ => {
                warn!(value = %value, "ignoring postsolve parameter, expected a flag");
                None
            }
        }
    }
}

/// Configuration for building solvers
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Seconds
    pub time_limit: Option<f64>,
    pub verbose: Option<u32>,
    pub postsolve: Option<bool>,
}

impl SolverConfig {
    pub fn new(backend: SolverBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_verbose(mut self, level: u32) -> Self {
        self.verbose = Some(level);
        self
    }

    pub fn parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(seconds) = self.time_limit {
            parameters.set(Parameter::Timeout, seconds);
        }
        if let Some(level) = self.verbose {
            parameters.set(Parameter::Verbose, level);
        }
        if let Some(postsolve) = self.postsolve {
            parameters.set(Parameter::Postsolve, postsolve);
        }
        parameters
    }
}
