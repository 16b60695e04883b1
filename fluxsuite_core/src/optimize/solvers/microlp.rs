//! Implements a solver interface for microlp, a pure rust simplex and branch and bound solver
use indexmap::IndexMap;
use microlp::{ComparisonOp, OptimizationDirection};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{check_capabilities, Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// LP and MILP solver backed by microlp
#[derive(Debug, Default, Clone)]
pub struct MicrolpSolver {}

impl MicrolpSolver {
    pub fn new() -> Self {
        MicrolpSolver {}
    }

    /// Translate the problem into a microlp problem
    ///
    /// Returns None when an empty constraint can never be satisfied.
    fn translate(
        &self,
        problem: &Problem,
    ) -> Option<(microlp::Problem, Vec<microlp::Variable>)> {
        let direction = match problem.objective_sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut objective_coefficients = vec![0.; problem.num_variables()];
        for term in problem.objective().terms() {
            if let ObjectiveTerm::Linear { var, coef } = term {
                if let Some(index) = problem.variables().get_index_of(var) {
                    objective_coefficients[index] += coef;
                }
            }
        }

        let mut lp = microlp::Problem::new(direction);
        let lp_vars: Vec<microlp::Variable> = problem
            .variables()
            .values()
            .zip(objective_coefficients)
            .map(|(var, obj)| match var.variable_type {
                VariableType::Continuous => lp.add_var(obj, (var.lower_bound, var.upper_bound)),
                VariableType::Binary => lp.add_binary_var(obj),
                VariableType::Integer => lp.add_integer_var(
                    obj,
                    (
                        clamp_to_i32(var.lower_bound.ceil()),
                        clamp_to_i32(var.upper_bound.floor()),
                    ),
                ),
            })
            .collect();

        for constraint in problem.constraints().values() {
            let expr: Vec<(microlp::Variable, f64)> = constraint
                .terms()
                .iter()
                .filter(|t| t.coefficient != 0.)
                .filter_map(|t| {
                    problem
                        .variables()
                        .get_index_of(&t.variable)
                        .map(|i| (lp_vars[i], t.coefficient))
                })
                .collect();
            let (lower, upper) = constraint.bounds();
            if expr.is_empty() {
                // 0 must lie within the bounds
                if lower > 0. || upper < 0. {
                    return None;
                }
                continue;
            }
            match constraint {
                Constraint::Equality { equals, .. } => {
                    lp.add_constraint(expr, ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality { .. } => {
                    if lower.is_finite() && upper.is_finite() && lower == upper {
                        lp.add_constraint(expr, ComparisonOp::Eq, lower);
                        continue;
                    }
                    if lower.is_finite() {
                        lp.add_constraint(expr.clone(), ComparisonOp::Ge, lower);
                    }
                    if upper.is_finite() {
                        lp.add_constraint(expr, ComparisonOp::Le, upper);
                    }
                }
            }
        }
        Some((lp, lp_vars))
    }
}

fn clamp_to_i32(value: f64) -> i32 {
    value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn quadratic_objective_capable(&self) -> bool {
        false
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        check_capabilities(self, problem)?;
        let Some((lp, lp_vars)) = self.translate(problem) else {
            return Ok(ProblemSolution::unsolved(OptimizationStatus::Infeasible));
        };
        match lp.solve() {
            Ok(solution) => {
                let values: IndexMap<String, f64> = problem
                    .variables()
                    .keys()
                    .zip(&lp_vars)
                    .map(|(id, var)| (id.clone(), solution[*var]))
                    .collect();
                let objective_value = problem.evaluate_objective(&values);
                Ok(ProblemSolution::solved(
                    OptimizationStatus::Optimal,
                    objective_value,
                    values,
                ))
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::unsolved(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::unsolved(OptimizationStatus::Unbounded))
            }
            Err(microlp::Error::InternalError(message)) => Err(SolverError::Backend(message)),
        }
    }
}
