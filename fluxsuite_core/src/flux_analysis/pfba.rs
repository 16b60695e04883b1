//! Parsimonious Flux Balance Analysis
//!
//! Finds the optimal objective Z* with FBA, then minimizes the total absolute flux while
//! keeping the objective at or above `fraction_of_optimum * Z*`.
use crate::configuration::OBJECTIVE_TOLERANCE;
use crate::flux_analysis::options::PfbaOptions;
use crate::flux_analysis::result::{MethodDetails, MethodOutcome};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, solve_optimal, AnalysisError};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;

/// Formulate the second stage, given the optimal objective of the first
pub fn formulate(
    model: &StoichiometricModel,
    optimal_objective: f64,
    fraction_of_optimum: f64,
) -> Result<Problem, AnalysisError> {
    let mut problem = model.flux_problem(model.bounds(), ObjectiveSense::Minimize)?;
    model.add_objective_floor(
        &mut problem,
        optimal_objective * fraction_of_optimum - OBJECTIVE_TOLERANCE,
    )?;
    for j in 0..model.num_reactions() {
        for (variable, coefficient) in model.total_flux_terms(j, 1.) {
            problem.add_new_linear_objective_term(variable, coefficient)?;
        }
    }
    Ok(problem)
}

pub fn run(
    model: &StoichiometricModel,
    options: &PfbaOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let (_, optimal_objective) = fba::optimize(model, model.bounds(), solver)?;
    let problem = formulate(model, optimal_objective, options.fraction_of_optimum)?;
    let solution = solve_optimal(solver, &problem, "pfba")?;
    let fluxes = model.net_fluxes(&solution);
    let total_flux: f64 = fluxes.iter().map(|v| v.abs()).sum();
    tracing::debug!(
        component = "pfba",
        operation = "run",
        optimal_objective,
        total_flux,
        "Minimized total flux"
    );
    Ok(
        MethodOutcome::optimal(total_flux, fluxes).with_details(MethodDetails::Pfba {
            optimal_objective,
            total_flux,
        }),
    )
}
