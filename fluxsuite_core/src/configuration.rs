//! Global configuration and numeric tolerances
use std::sync::{LazyLock, RwLock};

/// Values with a magnitude below this are solver noise, and are reported as exactly zero
pub const SOLVER_NOISE_TOLERANCE: f64 = 1e-9;
/// Tolerance used when comparing objective values
pub const OBJECTIVE_TOLERANCE: f64 = 1e-6;
/// Tolerance used when comparing fluxes (e.g. deciding if a reaction is blocked)
pub const FLUX_TOLERANCE: f64 = 1e-6;
/// Smallest flux magnitude considered to be real activity
pub const ACTIVITY_EPSILON: f64 = 1e-3;
/// Default growth rate (h^-1) below which a phenotype is considered lethal
pub const VIABILITY_THRESHOLD: f64 = 0.001;
/// Smallest Big-M value used when linearizing indicator constraints
pub const BIG_M_FLOOR: f64 = 1000.;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Debug, Clone)]
pub struct Configuration {
    /// Lower bound given to reactions when none is specified
    pub lower_bound: f64,
    /// Upper bound given to reactions when none is specified
    pub upper_bound: f64,
    /// Solver backend used by [`crate::optimize::solvers::default_solver`]
    pub solver: SolverChoice,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            solver: SolverChoice::default(),
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverChoice {
    /// Use the pure rust microlp simplex/branch-and-bound solver
    Microlp,
    /// Use the Clarabel interior point solver (continuous problems only, supports quadratic
    /// objectives)
    Clarabel,
    /// Use the HiGHS solver, requires the highs feature to be enabled
    Highs,
}

impl Default for SolverChoice {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "highs")] {
                SolverChoice::Highs
            } else {
                SolverChoice::Microlp
            }
        }
    }
}

/// Read a copy of the current configuration
///
/// A poisoned lock still holds a valid configuration, so it is read through.
pub fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Snap values within solver noise of zero to exactly zero
pub fn snap_to_zero(value: f64) -> f64 {
    if value.abs() < SOLVER_NOISE_TOLERANCE {
        0.
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_hierarchy() {
        assert!(SOLVER_NOISE_TOLERANCE < OBJECTIVE_TOLERANCE);
        assert!(OBJECTIVE_TOLERANCE <= FLUX_TOLERANCE);
        assert!(FLUX_TOLERANCE < ACTIVITY_EPSILON);
        assert_eq!(SOLVER_NOISE_TOLERANCE, 1e-9);
        assert_eq!(VIABILITY_THRESHOLD, 0.001);
    }

    #[test]
    fn snapping() {
        assert_eq!(snap_to_zero(5e-10), 0.);
        assert!(snap_to_zero(-5e-10).is_sign_positive());
        assert_eq!(snap_to_zero(2e-9), 2e-9);
        assert_eq!(snap_to_zero(-3.5), -3.5);
    }

    #[test]
    fn default_bounds() {
        let config = Configuration::default();
        assert_eq!(config.lower_bound, -1000.);
        assert_eq!(config.upper_bound, 1000.);
        #[cfg(not(feature = "highs"))]
        assert_eq!(config.solver, SolverChoice::Microlp);
    }
}
