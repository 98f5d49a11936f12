// Domain layer: problem model, parameters, results and the solver contract
pub mod domain;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Re-export commonly used types
pub use domain::{
    Constraint, DualKey, HookId, Hooks, Linear, Number, Operator, OptimizationType, Parameter,
    ParameterValue, Parameters, Problem, Solution, SolverBackend, SolverConfig, SolverError,
    SolverService, Term, VariableId, VariableIndex, VariableType, Verbosity,
};

pub use solver::SolverFactory;

#[cfg(feature = "coin_cbc")]
pub use solver::CoinCbcSolver;
#[cfg(feature = "highs")]
pub use solver::HighsSolver;
#[cfg(feature = "microlp")]
pub use solver::MicroLpSolver;
#[cfg(feature = "sat")]
pub use solver::SatSolver;
