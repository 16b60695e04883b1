//! Implements a solver interface for HiGHS
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;

use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{check_capabilities, Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// LP and MILP solver backed by HiGHS
#[derive(Debug, Default, Clone)]
pub struct HighsSolver {}

impl HighsSolver {
    pub fn new() -> Self {
        HighsSolver {}
    }
}

impl Solver for HighsSolver {
    fn name(&self) -> &str {
        "HiGHS"
    }

    fn quadratic_objective_capable(&self) -> bool {
        false
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn is_reentrant(&self) -> bool {
        // Every solve builds its own HiGHS instance
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
        let mut objective_coefficients = vec![0.; problem.num_variables()];
        for term in problem.objective().terms() {
            if let ObjectiveTerm::Linear { var, coef } = term {
                if let Some(index) = problem.variables().get_index_of(var) {
                    objective_coefficients[index] += coef;
                }
            }
        }

        let mut pb = RowProblem::default();
        let columns: Vec<_> = problem
            .variables()
            .values()
            .zip(objective_coefficients)
            .map(|(var, obj)| match var.variable_type {
                VariableType::Continuous => {
                    pb.add_column(obj, var.lower_bound..=var.upper_bound)
                }
                VariableType::Integer | VariableType::Binary => {
                    pb.add_integer_column(obj, var.lower_bound..=var.upper_bound)
                }
            })
            .collect();

        for constraint in problem.constraints().values() {
            let terms: Vec<_> = constraint
                .terms()
                .iter()
                .filter(|t| t.coefficient != 0.)
                .filter_map(|t| {
                    problem
                        .variables()
                        .get_index_of(&t.variable)
                        .map(|i| (columns[i], t.coefficient))
                })
                .collect();
            let (lower, upper) = constraint.bounds();
            pb.add_row(lower..=upper, &terms);
        }

        let sense = match problem.objective_sense() {
            ObjectiveSense::Maximize => Sense::Maximise,
            ObjectiveSense::Minimize => Sense::Minimise,
        };
        let mut model = pb.optimise(sense);
        model.set_option("output_flag", false);
        let solved = model.solve();

        match solved.status() {
            HighsModelStatus::Optimal => {
                let values: IndexMap<String, f64> = problem
                    .variables()
                    .keys()
                    .cloned()
                    .zip(solved.get_solution().columns().iter().copied())
                    .collect();
                let objective_value = problem.evaluate_objective(&values);
                Ok(ProblemSolution::solved(
                    OptimizationStatus::Optimal,
                    objective_value,
                    values,
                ))
            }
            HighsModelStatus::Infeasible => {
                Ok(ProblemSolution::unsolved(OptimizationStatus::Infeasible))
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(ProblemSolution::unsolved(OptimizationStatus::Unbounded))
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                Ok(ProblemSolution::unsolved(OptimizationStatus::SolverHalted))
            }
            status => Err(SolverError::Backend(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }
}
