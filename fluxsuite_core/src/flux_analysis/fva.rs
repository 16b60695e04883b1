//! Flux Variability Analysis
//!
//! With the objective held at or above `fraction_of_optimum * Z*`, each target reaction is
//! minimized and maximized in turn. A failed sub-solve leaves the corresponding bound
//! infinite instead of failing the whole analysis.
use indexmap::IndexMap;

use crate::configuration::{snap_to_zero, OBJECTIVE_TOLERANCE};
use crate::flux_analysis::options::FvaOptions;
use crate::flux_analysis::result::{FluxRange, MethodDetails, MethodOutcome, ResultStatus};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, AnalysisError, SweepMonitor};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;

/// Formulate the shared FVA problem, without an objective
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
    Ok(problem)
}

/// Optimize the net flux of one reaction, None if the sub-solve failed
fn extreme_flux(
    model: &StoichiometricModel,
    problem: &mut Problem,
    reaction: usize,
    sense: ObjectiveSense,
    solver: &dyn Solver,
) -> Result<Option<f64>, AnalysisError> {
    problem.remove_all_objective_terms();
    problem.update_objective_sense(sense);
    for (variable, coefficient) in model.flux_terms(reaction, 1.) {
        problem.add_new_linear_objective_term(variable, coefficient)?;
    }
    match solver.solve(problem) {
        Ok(solution) if solution.is_optimal() => {
            Ok(Some(snap_to_zero(model.net_fluxes(&solution)[reaction])))
        }
        Ok(solution) => {
            tracing::warn!(
                component = "fva",
                operation = "sweep",
                reaction = model.reaction_id(reaction),
                sense = ?sense,
                status = ?solution.status,
                "Sub-solve was not optimal"
            );
            Ok(None)
        }
        Err(err) => {
            tracing::warn!(
                component = "fva",
                operation = "sweep",
                reaction = model.reaction_id(reaction),
                sense = ?sense,
                error = %err,
                "Sub-solve failed"
            );
            Ok(None)
        }
    }
}

pub fn run(
    model: &StoichiometricModel,
    options: &FvaOptions,
    solver: &dyn Solver,
    monitor: &dyn SweepMonitor,
) -> Result<MethodOutcome, AnalysisError> {
    let (fluxes, optimal_objective) = fba::optimize(model, model.bounds(), solver)?;
    let mut problem = formulate(model, optimal_objective, options.fraction_of_optimum)?;

    let targets: Vec<usize> = match &options.reactions {
        Some(ids) => ids
            .iter()
            .filter_map(|id| {
                let index = model.reaction_index(id);
                if index.is_none() {
                    tracing::warn!(
                        component = "fva",
                        operation = "run",
                        reaction = %id,
                        "Unknown target reaction skipped"
                    );
                }
                index
            })
            .collect(),
        None => (0..model.num_reactions()).collect(),
    };

    let mut ranges: IndexMap<String, FluxRange> = IndexMap::new();
    let mut cancelled = false;
    for (done, j) in targets.iter().enumerate() {
        if monitor.is_cancelled() {
            cancelled = true;
            break;
        }
        let minimum = extreme_flux(model, &mut problem, *j, ObjectiveSense::Minimize, solver)?
            .unwrap_or(f64::NEG_INFINITY);
        let maximum = extreme_flux(model, &mut problem, *j, ObjectiveSense::Maximize, solver)?
            .unwrap_or(f64::INFINITY);
        ranges.insert(
            model.reaction_id(*j).to_string(),
            FluxRange { minimum, maximum },
        );
        monitor.report((done + 1) as f64 / targets.len() as f64);
    }
    if targets.is_empty() {
        monitor.report(1.);
    }

    let blocked_reactions = ranges
        .iter()
        .filter(|(_, range)| range.is_blocked())
        .map(|(id, _)| id.clone())
        .collect();
    tracing::info!(
        component = "fva",
        operation = "run",
        analyzed = ranges.len(),
        targets = targets.len(),
        cancelled,
        "Flux variability sweep finished"
    );
    let outcome = MethodOutcome::optimal(optimal_objective, fluxes).with_details(
        MethodDetails::Fva {
            optimal_objective,
            fraction_of_optimum: options.fraction_of_optimum,
            ranges,
            blocked_reactions,
        },
    );
    if cancelled {
        Ok(outcome.with_status(ResultStatus::Cancelled, "Flux variability sweep was cancelled"))
    } else {
        Ok(outcome)
    }
}
