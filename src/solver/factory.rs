// Solver Factory
// Creates backend adapters from a backend choice and a parameter bag

use tracing::debug;

use crate::domain::{
    models::VariableId,
    parameters::{Parameter, ParameterValue, Parameters, SolverConfig},
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolverBackend,
};

#[cfg(any(feature = "coin_cbc", feature = "microlp"))]
use crate::solver::good_lp_solver;
#[cfg(feature = "highs")]
use crate::solver::highs_solver::HighsSolver;
#[cfg(feature = "sat")]
use crate::solver::sat_solver::SatSolver;

/// Factory for creating solver instances.
///
/// Parameters set on the factory are copied into every adapter it creates;
/// adapters created earlier are not affected by later changes.
#[derive(Debug, Clone, Default)]
pub struct SolverFactory {
    backend: SolverBackend,
    parameters: Parameters,
}

impl SolverFactory {
    pub fn new(backend: SolverBackend) -> Self {
        Self {
            backend,
            parameters: Parameters::new(),
        }
    }

    /// Factory for the configured backend, seeded with the configured parameters
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            backend: config.backend,
            parameters: config.parameters(),
        }
    }

    pub fn set_parameter(&mut self, parameter: Parameter, value: impl Into<ParameterValue>) {
        self.parameters.set(parameter, value);
    }

    pub fn with_parameter(mut self, parameter: Parameter, value: impl Into<ParameterValue>) -> Self {
        self.set_parameter(parameter, value);
        self
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }

    /// Backend `Auto` resolves to with the compiled features: HiGHS, then
    /// CBC, then microlp.
    pub fn resolve(backend: SolverBackend) -> Result<SolverBackend> {
        if backend != SolverBackend::Auto {
            return Ok(backend);
        }
        if cfg!(feature = "highs") {
            Ok(SolverBackend::Highs)
        } else if cfg!(feature = "coin_cbc") {
            Ok(SolverBackend::CoinCbc)
        } else if cfg!(feature = "microlp") {
            Ok(SolverBackend::MicroLp)
        } else {
            Err(SolverError::SolverNotAvailable(
                "no LP backend compiled in (enable highs, coin_cbc or microlp)".to_string(),
            ))
        }
    }

    /// Create a fresh adapter for the factory's backend
    pub fn get<V: VariableId + 'static>(&self) -> Result<Box<dyn SolverService<V>>> {
        let backend = Self::resolve(self.backend)?;
        debug!(%backend, parameters = self.parameters.len(), "creating solver");

        let parameters = self.parameters.clone();
        match backend {
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Ok(Box::new(HighsSolver::<V>::with_parameters(parameters))),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Ok(Box::new(
                good_lp_solver::CoinCbcSolver::<V>::with_parameters(parameters),
            )),
            #[cfg(feature = "microlp")]
            SolverBackend::MicroLp => Ok(Box::new(
                good_lp_solver::MicroLpSolver::<V>::with_parameters(parameters),
            )),
            #[cfg(feature = "sat")]
            SolverBackend::Sat => Ok(Box::new(SatSolver::<V>::with_parameters(parameters))),
            other => Err(not_compiled(other)),
        }
    }

    #[cfg(feature = "highs")]
    pub fn highs<V: VariableId>(&self) -> HighsSolver<V> {
        HighsSolver::with_parameters(self.parameters.clone())
    }

    #[cfg(feature = "coin_cbc")]
    pub fn coin_cbc<V: VariableId>(&self) -> good_lp_solver::CoinCbcSolver<V> {
        good_lp_solver::CoinCbcSolver::with_parameters(self.parameters.clone())
    }

    #[cfg(feature = "microlp")]
    pub fn microlp<V: VariableId>(&self) -> good_lp_solver::MicroLpSolver<V> {
        good_lp_solver::MicroLpSolver::with_parameters(self.parameters.clone())
    }

    #[cfg(feature = "sat")]
    pub fn sat<V: VariableId>(&self) -> SatSolver<V> {
        SatSolver::with_parameters(self.parameters.clone())
    }
}

fn not_compiled(backend: SolverBackend) -> SolverError {
    SolverError::SolverNotAvailable(format!("{} backend is not compiled in", backend))
}
