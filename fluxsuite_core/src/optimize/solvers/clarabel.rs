//! Implements a solver interface for Clarabel
//!
//! Clarabel solves problems of the form
//! ```text
//! minimize    1/2 x'Px + q'x
//! subject to  Ax + s = b,  s in K
//! ```
//! Equalities map to rows of the zero cone, every finite inequality side and variable
//! bound maps to a row of the nonnegative cone.
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix as NalgebraCsc};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{check_capabilities, Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Continuous LP and convex QP solver backed by Clarabel
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    max_iter: u32,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver { max_iter: 200 }
    }
}

impl ClarabelSolver {
    pub fn new() -> Self {
        ClarabelSolver::default()
    }
}

/// Rows of the constraint matrix, split by cone
#[derive(Default)]
struct ConeRows {
    equality: Vec<(Vec<(usize, f64)>, f64)>,
    nonnegative: Vec<(Vec<(usize, f64)>, f64)>,
}

impl ConeRows {
    /// Add `lower <= row <= upper`, dropping infinite sides
    fn push_range(&mut self, row: Vec<(usize, f64)>, lower: f64, upper: f64) {
        if lower == upper {
            self.equality.push((row, upper));
            return;
        }
        if upper.is_finite() {
            self.nonnegative.push((row.clone(), upper));
        }
        if lower.is_finite() {
            let negated = row.into_iter().map(|(j, v)| (j, -v)).collect();
            self.nonnegative.push((negated, -lower));
        }
    }

    fn num_rows(&self) -> usize {
        self.equality.len() + self.nonnegative.len()
    }
}

/// Convert a nalgebra-sparse CSC matrix into Clarabel's representation
fn to_clarabel(matrix: &NalgebraCsc<f64>) -> CscMatrix<f64> {
    CscMatrix::new(
        matrix.nrows(),
        matrix.ncols(),
        matrix.col_offsets().to_vec(),
        matrix.row_indices().to_vec(),
        matrix.values().to_vec(),
    )
}

impl ClarabelSolver {
    /// Assemble P, q, A, b and the cones
    #[allow(clippy::type_complexity)]
    fn assemble(
        &self,
        problem: &Problem,
    ) -> (
        CscMatrix<f64>,
        Vec<f64>,
        CscMatrix<f64>,
        Vec<f64>,
        Vec<SupportedConeT<f64>>,
    ) {
        let n = problem.num_variables();
        let index_of = |id: &str| problem.variables().get_index_of(id);
        // Clarabel only minimizes
        let sign = match problem.objective_sense() {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };

        let mut q = vec![0.; n];
        let mut p = CooMatrix::new(n, n);
        for term in problem.objective().terms() {
            match term {
                ObjectiveTerm::Linear { var, coef } => {
                    if let Some(i) = index_of(var) {
                        q[i] += sign * coef;
                    }
                }
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    if let (Some(i), Some(j)) = (index_of(var1), index_of(var2)) {
                        // P is upper triangular, and the objective is 1/2 x'Px
                        if i == j {
                            p.push(i, i, sign * 2. * coef);
                        } else {
                            p.push(i.min(j), i.max(j), sign * coef);
                        }
                    }
                }
            }
        }

        let mut rows = ConeRows::default();
        for constraint in problem.constraints().values() {
            let row: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .filter_map(|t| index_of(&t.variable).map(|j| (j, t.coefficient)))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => rows.equality.push((row, *equals)),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => rows.push_range(row, *lower_bound, *upper_bound),
            }
        }
        for (j, var) in problem.variables().values().enumerate() {
            rows.push_range(vec![(j, 1.)], var.lower_bound, var.upper_bound);
        }

        let mut a = CooMatrix::new(rows.num_rows(), n);
        let mut b = Vec::with_capacity(rows.num_rows());
        for (i, (row, rhs)) in rows.equality.iter().chain(&rows.nonnegative).enumerate() {
            for (j, value) in row {
                a.push(i, *j, *value);
            }
            b.push(*rhs);
        }
        let mut cones = Vec::new();
        if !rows.equality.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(rows.equality.len()));
        }
        if !rows.nonnegative.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(rows.nonnegative.len()));
        }

        (
            to_clarabel(&NalgebraCsc::from(&p)),
            q,
            to_clarabel(&NalgebraCsc::from(&a)),
            b,
            cones,
        )
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn quadratic_objective_capable(&self) -> bool {
        true
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        check_capabilities(self, problem)?;
        if problem.num_variables() == 0 {
            return Ok(ProblemSolution::solved(
                OptimizationStatus::Optimal,
                0.,
                IndexMap::new(),
            ));
        }
        let (p, q, a, b, cones) = self.assemble(problem);
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(self.max_iter)
            .build()
            .map_err(|err| SolverError::Backend(err.to_string()))?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::SolverHalted,
        };
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => {
                let values: IndexMap<String, f64> = problem
                    .variables()
                    .keys()
                    .cloned()
                    .zip(solver.solution.x.iter().copied())
                    .collect();
                let objective_value = problem.evaluate_objective(&values);
                Ok(ProblemSolution::solved(status, objective_value, values))
            }
            other => Ok(ProblemSolution::unsolved(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn simple_lp() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., f64::INFINITY)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_inequality_constraint("c1", [("x", 1.), ("y", 1.)], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem
            .add_new_inequality_constraint("c2", [("x", 2.), ("y", 1.)], 2., f64::INFINITY)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem.add_new_linear_objective_term("y", 2.).unwrap();

        let solution = ClarabelSolver::new().solve(&problem).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.objective_value.unwrap() - 7.).abs() < 1e-6);
        assert!((solution.value("y").unwrap() - 3.).abs() < 1e-6);
    }

    #[test]
    fn simple_qp() {
        // minimize (x - 2)^2 = x^2 - 4x + 4, with x <= 1.5
        let mut problem = Problem::new(ObjectiveSense::Minimize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.5)
            .unwrap();
        problem.add_new_quadratic_objective_term("x", "x", 1.).unwrap();
        problem.add_new_linear_objective_term("x", -4.).unwrap();
        let solution = ClarabelSolver::new().solve(&problem).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.value("x").unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn infeasible() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_equality_constraint("c", [("x", 1.)], 20.)
            .unwrap();
        let solution = ClarabelSolver::new().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
    }
}
