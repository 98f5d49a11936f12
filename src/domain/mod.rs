// Domain module: the problem model and the solver contract

pub mod hooks;
pub mod models;
pub mod parameters;
pub mod solution;
pub mod solver_service;
pub mod value_objects;

pub use hooks::*;
pub use models::*;
pub use parameters::*;
pub use solution::*;
pub use solver_service::*;
pub use value_objects::*;
