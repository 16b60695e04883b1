//! Solver backends able to solve a [`Problem`]
//!
//! Every backend implements [`Solver`], and reports which problem types it can handle so
//! that a problem is rejected before any backend specific translation happens.
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::configuration::{self, SolverChoice};
use crate::optimize::problem::{Problem, ProblemError, ProblemType};
use crate::optimize::ProblemSolution;

pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;
pub mod microlp;

/// A capability that, given a problem, returns a status and primal values
pub trait Solver: Send + Sync + Debug {
    /// Name of the backend, used in logs and error messages
    fn name(&self) -> &str;

    /// Whether the backend accepts quadratic objective terms
    fn quadratic_objective_capable(&self) -> bool;

    /// Whether the backend accepts integer and binary variables
    fn integer_variable_capable(&self) -> bool;

    /// Whether `solve` can safely be called from several threads at once
    fn is_reentrant(&self) -> bool {
        false
    }

    /// Solve the problem
    ///
    /// Infeasible and unbounded problems are reported through the status of the returned
    /// [`ProblemSolution`], `Err` is reserved for problems the backend can't attempt.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The backend can't handle this kind of problem
    #[error("Solver {solver} doesn't support {problem_type:?} problems")]
    UnsupportedProblemType {
        solver: String,
        problem_type: ProblemType,
    },
    /// The problem failed validation before being handed to the backend
    #[error("Invalid problem: {0}")]
    InvalidProblem(#[from] ProblemError),
    /// The backend failed while setting up or solving the problem
    #[error("Solver backend error: {0}")]
    Backend(String),
    /// The requested backend isn't compiled into this build
    #[error("Solver {0} is not available, check enabled features")]
    Unavailable(String),
}

/// Validate the problem, and check that the solver can handle its type
pub fn check_capabilities(solver: &dyn Solver, problem: &Problem) -> Result<(), SolverError> {
    problem.validate()?;
    let supported = match problem.problem_type() {
        ProblemType::LinearContinuous => true,
        ProblemType::QuadraticContinuous => solver.quadratic_objective_capable(),
        ProblemType::LinearMixedInteger => solver.integer_variable_capable(),
        ProblemType::QuadraticMixedInteger => {
            solver.quadratic_objective_capable() && solver.integer_variable_capable()
        }
    };
    if supported {
        Ok(())
    } else {
        Err(SolverError::UnsupportedProblemType {
            solver: solver.name().to_string(),
            problem_type: problem.problem_type(),
        })
    }
}

/// Wraps a solver which isn't reentrant, so that solves are serialized through a mutex
#[derive(Debug)]
pub struct SerializedSolver {
    inner: Arc<dyn Solver>,
    lock: Mutex<()>,
}

impl SerializedSolver {
    pub fn new(inner: Arc<dyn Solver>) -> Self {
        SerializedSolver {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl Solver for SerializedSolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn quadratic_objective_capable(&self) -> bool {
        self.inner.quadratic_objective_capable()
    }

    fn integer_variable_capable(&self) -> bool {
        self.inner.integer_variable_capable()
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        // The guard protects no data, so a poisoned lock is still usable
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.inner.solve(problem)
    }
}

/// Wrap the solver in a [`SerializedSolver`] unless it is reentrant
pub fn serialized(solver: Arc<dyn Solver>) -> Arc<dyn Solver> {
    if solver.is_reentrant() {
        solver
    } else {
        Arc::new(SerializedSolver::new(solver))
    }
}

/// Create the solver backend for a given choice
pub fn solver_for(choice: SolverChoice) -> Result<Arc<dyn Solver>, SolverError> {
    match choice {
        SolverChoice::Microlp => Ok(Arc::new(microlp::MicrolpSolver::new())),
        SolverChoice::Clarabel => Ok(Arc::new(clarabel::ClarabelSolver::new())),
        SolverChoice::Highs => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "highs")] {
                    Ok(Arc::new(highs::HighsSolver::new()))
                } else {
                    Err(SolverError::Unavailable("HiGHS".to_string()))
                }
            }
        }
    }
}

/// Create the solver selected by the global configuration
pub fn default_solver() -> Result<Arc<dyn Solver>, SolverError> {
    solver_for(configuration::current().solver)
}
