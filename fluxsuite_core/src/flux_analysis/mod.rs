//! Constraint based analysis of metabolic models
//!
//! A [`SolveRequest`](options::SolveRequest) is turned into a
//! [`StoichiometricModel`](stoichiometry::StoichiometricModel), one of the method modules
//! formulates and solves the optimization problem(s), and [`result`] interprets the numbers.
//! [`dispatcher::Dispatcher`] ties these together.
use thiserror::Error;

use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub mod compare;
pub mod dispatcher;
pub mod eflux;
pub mod essentiality;
pub mod fba;
pub mod fva;
pub mod gimme;
pub mod imat;
pub mod made;
pub mod moma;
pub mod options;
pub mod pfba;
pub mod result;
pub mod stoichiometry;

/// Errors raised while formulating or solving an analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Request options failed validation
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    /// A bound override left a reaction with lower bound > upper bound
    #[error("Reaction {reaction} has invalid bounds [{lower}, {upper}]")]
    InvalidBounds {
        reaction: String,
        lower: f64,
        upper: f64,
    },
    /// The requested objective reaction isn't in the model
    #[error("Objective reaction {0} is not in the model")]
    UnknownObjective(String),
    /// No objective could be determined for a method which needs one
    #[error("Model has no objective")]
    NoObjective,
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// A problem solved without an optimal solution
    #[error("{stage} problem is {status:?}")]
    NotOptimal {
        stage: String,
        status: OptimizationStatus,
    },
}

/// Progress reporting and cancellation for multi solve analyses
///
/// Sweeps call [`SweepMonitor::report`] after every item and stop at the next item
/// boundary once [`SweepMonitor::is_cancelled`] returns true.
pub trait SweepMonitor {
    /// Fraction of the sweep done, within [0, 1]
    fn report(&self, progress: f64);

    fn is_cancelled(&self) -> bool;
}

/// Monitor which ignores progress and never cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct Unmonitored;

impl SweepMonitor for Unmonitored {
    fn report(&self, _progress: f64) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Solve a problem, returning the solution only if it is optimal
pub(crate) fn solve_optimal(
    solver: &dyn Solver,
    problem: &Problem,
    stage: &str,
) -> Result<ProblemSolution, AnalysisError> {
    tracing::debug!(
        component = "flux_analysis",
        operation = "solve",
        stage,
        solver = solver.name(),
        variables = problem.num_variables(),
        constraints = problem.num_constraints(),
        "Submitting problem"
    );
    let solution = solver.solve(problem)?;
    if solution.is_optimal() {
        Ok(solution)
    } else {
        Err(AnalysisError::NotOptimal {
            stage: stage.to_string(),
            status: solution.status,
        })
    }
}
