// Solver adapters module

pub mod encoding;
pub mod factory;
#[cfg(any(feature = "coin_cbc", feature = "microlp"))]
pub mod good_lp_solver;
#[cfg(feature = "highs")]
pub mod highs_solver;
#[cfg(feature = "sat")]
pub mod pseudo_boolean;
#[cfg(feature = "sat")]
pub mod sat_solver;

pub use factory::SolverFactory;
#[cfg(feature = "coin_cbc")]
pub use good_lp_solver::CoinCbcSolver;
#[cfg(any(feature = "coin_cbc", feature = "microlp"))]
pub use good_lp_solver::{GoodLpBackend, GoodLpSolver};
#[cfg(feature = "microlp")]
pub use good_lp_solver::MicroLpSolver;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
#[cfg(feature = "sat")]
pub use sat_solver::{SatModel, SatSolver};
