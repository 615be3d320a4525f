// src/flows/mod.rs
pub mod advisor;
pub mod status;
pub mod try_on;

pub use advisor::AdvisorController;
pub use try_on::TryOnController;
