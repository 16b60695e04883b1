//! Module providing the Model struct for representing a metabolic network.

pub mod gene;
pub mod gpr;
pub mod metabolite;
pub mod model;
pub mod reaction;
