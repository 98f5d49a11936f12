// Domain value objects representing core modelling concepts

use std::fmt;
use std::str::FromStr;

use super::solver_service::SolverError;

/// Numeric value carried by coefficients, bounds and results.
///
/// The variant records the declared type: `Int` is integral by declaration,
/// `Float` is not, even when its value happens to be whole.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// True for the `Int` variant only.
    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }

    /// True if the value is a whole number that fits an `i64`, whatever the variant.
    pub fn is_integral_value(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64,
        }
    }

    /// The value as an `i64`, if it is integral.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if self.is_integral_value() => Some(f as i64),
            Number::Float(_) => None,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    /// Round to the nearest integer, ties away from zero.
    pub fn round(value: f64) -> Number {
        Number::Int(value.round() as i64)
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Int(0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Number {
            fn from(value: $t) -> Self {
                Number::Int(value as i64)
            }
        })*
    };
}

number_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Float(value as f64)
    }
}

impl From<bool> for Number {
    fn from(value: bool) -> Self {
        Number::Int(value as i64)
    }
}

/// Type of decision variable in the optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    #[default]
    Real,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Boolean variable (x ∈ {0, 1})
    Boolean,
}

impl VariableType {
    pub fn is_integer(self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Boolean)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Real => write!(f, "REAL"),
            VariableType::Integer => write!(f, "INT"),
            VariableType::Boolean => write!(f, "BOOL"),
        }
    }
}

/// Relational operator of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    /// Less than or equal (≤)
    Le,
    /// Equal (=)
    Eq,
    /// Greater than or equal (≥)
    Ge,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Le => write!(f, "<="),
            Operator::Eq => write!(f, "="),
            Operator::Ge => write!(f, ">="),
        }
    }
}

impl FromStr for Operator {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<=" => Ok(Operator::Le),
            "=" => Ok(Operator::Eq),
            ">=" => Ok(Operator::Ge),
            other => Err(SolverError::MalformedOperator(other.to_string())),
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptimizationType {
    /// Minimize the objective function
    #[default]
    Minimize,
    /// Maximize the objective function
    Maximize,
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationType::Minimize => write!(f, "MIN"),
            OptimizationType::Maximize => write!(f, "MAX"),
        }
    }
}

impl FromStr for OptimizationType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("min") {
            Ok(OptimizationType::Minimize)
        } else if s.eq_ignore_ascii_case("max") {
            Ok(OptimizationType::Maximize)
        } else {
            Err(SolverError::MalformedOptimizationType(s.to_string()))
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverBackend {
    /// Automatically select the best compiled-in LP/MILP solver
    #[default]
    Auto,
    /// HiGHS
    Highs,
    /// COIN-OR CBC (through good_lp)
    CoinCbc,
    /// microlp, pure Rust (through good_lp)
    MicroLp,
    /// varisat with the pseudo-boolean encoding, 0/1 problems only
    Sat,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::Highs => write!(f, "HiGHS"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::MicroLp => write!(f, "microlp"),
            SolverBackend::Sat => write!(f, "varisat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_parses_exact_symbols() {
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::Le);
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Ge);

        for bad in ["<", "==", "=<", " <=", ""] {
            assert!(matches!(
                bad.parse::<Operator>(),
                Err(SolverError::MalformedOperator(_))
            ));
        }
    }

    #[test]
    fn optimization_type_is_case_insensitive() {
        assert_eq!("MAX".parse::<OptimizationType>().unwrap(), OptimizationType::Maximize);
        assert_eq!("Min".parse::<OptimizationType>().unwrap(), OptimizationType::Minimize);
        assert!("maximum".parse::<OptimizationType>().is_err());
    }

    #[test]
    fn number_integrality() {
        assert!(Number::Int(3).is_int());
        assert!(!Number::Float(3.0).is_int());
        assert!(Number::Float(3.0).is_integral_value());
        assert!(!Number::Float(3.5).is_integral_value());
        assert!(!Number::Float(f64::NAN).is_integral_value());
        assert_eq!(Number::Float(-4.0).to_i64(), Some(-4));
        assert_eq!(Number::round(2.5), Number::Int(3));
        assert_eq!(Number::round(-0.4), Number::Int(0));
    }
}
