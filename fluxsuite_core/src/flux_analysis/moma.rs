//! Minimization of Metabolic Adjustment
//!
//! Finds the flux distribution of the (perturbed) model closest to a reference distribution.
//! The default formulation is linear and minimizes the L1 distance with one deviation
//! variable per reference reaction. The quadratic formulation minimizes the squared euclidean
//! distance and needs a solver with quadratic objective support.
use indexmap::IndexMap;

use crate::flux_analysis::options::MomaOptions;
use crate::flux_analysis::result::{MethodDetails, MethodOutcome};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, solve_optimal, AnalysisError};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableType;

fn deviation_id(reaction: &str) -> String {
    format!("moma_deviation_{}", reaction)
}

/// Resolve the reference onto reaction indices, dropping unknown reactions
fn reference_pairs(
    model: &StoichiometricModel,
    reference: &IndexMap<String, f64>,
) -> Vec<(usize, f64)> {
    reference
        .iter()
        .filter_map(|(id, flux)| match model.reaction_index(id) {
            Some(j) => Some((j, *flux)),
            None => {
                tracing::warn!(
                    component = "moma",
                    operation = "formulate",
                    reaction = %id,
                    "Reference flux for unknown reaction ignored"
                );
                None
            }
        })
        .collect()
}

/// Formulate linear MOMA: minimize sum d_r with -d_r <= v_r - w_r <= d_r
pub fn formulate_linear(
    model: &StoichiometricModel,
    reference: &IndexMap<String, f64>,
) -> Result<Problem, AnalysisError> {
    let mut problem = model.flux_problem(model.bounds(), ObjectiveSense::Minimize)?;
    for (j, w) in reference_pairs(model, reference) {
        let d = deviation_id(model.reaction_id(j));
        problem.add_new_variable(&d, None, VariableType::Continuous, 0., f64::INFINITY)?;
        let [forward, reverse] = model.flux_terms(j, 1.);
        // v - d <= w
        problem.add_new_inequality_constraint(
            &format!("{}_upper", d),
            [forward, reverse, (d.as_str(), -1.)],
            f64::NEG_INFINITY,
            w,
        )?;
        // v + d >= w
        problem.add_new_inequality_constraint(
            &format!("{}_lower", d),
            [forward, reverse, (d.as_str(), 1.)],
            w,
            f64::INFINITY,
        )?;
        problem.add_new_linear_objective_term(&d, 1.)?;
    }
    Ok(problem)
}

/// Formulate quadratic MOMA: minimize sum e_r^2 with e_r = v_r - w_r
pub fn formulate_quadratic(
    model: &StoichiometricModel,
    reference: &IndexMap<String, f64>,
) -> Result<Problem, AnalysisError> {
    let mut problem = model.flux_problem(model.bounds(), ObjectiveSense::Minimize)?;
    for (j, w) in reference_pairs(model, reference) {
        let e = deviation_id(model.reaction_id(j));
        problem.add_new_variable(
            &e,
            None,
            VariableType::Continuous,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
        let [forward, reverse] = model.flux_terms(j, 1.);
        problem.add_new_equality_constraint(
            &format!("{}_definition", e),
            [forward, reverse, (e.as_str(), -1.)],
            w,
        )?;
        problem.add_new_quadratic_objective_term(&e, &e, 1.)?;
    }
    Ok(problem)
}

/// Wild type reference: FBA fluxes of the model without knockouts
pub fn wild_type_reference(
    wild_type: &StoichiometricModel,
    solver: &dyn Solver,
) -> Result<IndexMap<String, f64>, AnalysisError> {
    let (fluxes, _) = fba::optimize(wild_type, wild_type.bounds(), solver)?;
    Ok(wild_type
        .reaction_ids()
        .map(|id| id.to_string())
        .zip(fluxes)
        .collect())
}

/// Run MOMA against the request reference, or against wild type FBA of `wild_type`
pub fn run(
    model: &StoichiometricModel,
    wild_type: &StoichiometricModel,
    options: &MomaOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let reference = match &options.reference_fluxes {
        Some(reference) => reference.clone(),
        None => wild_type_reference(wild_type, solver)?,
    };
    let problem = if options.quadratic {
        formulate_quadratic(model, &reference)?
    } else {
        formulate_linear(model, &reference)?
    };
    let solution = solve_optimal(solver, &problem, "moma")?;
    let fluxes = model.net_fluxes(&solution);

    let distance: f64 = reference_pairs(model, &reference)
        .into_iter()
        .map(|(j, w)| {
            let deviation = fluxes[j] - w;
            if options.quadratic {
                deviation * deviation
            } else {
                deviation.abs()
            }
        })
        .sum();
    tracing::debug!(
        component = "moma",
        operation = "run",
        distance,
        quadratic = options.quadratic,
        "Minimized distance to reference"
    );
    Ok(
        MethodOutcome::optimal(distance, fluxes).with_details(MethodDetails::Moma {
            distance,
            quadratic: options.quadratic,
            reference_from_request: options.reference_fluxes.is_some(),
        }),
    )
}
