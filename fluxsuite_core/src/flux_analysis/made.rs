//! MADE
//!
//! Runs E-Flux under a reference and a comparison expression profile and flags reactions whose
//! flux changes by at least the fold change threshold on a log2 scale.
use indexmap::IndexMap;

use crate::configuration::ACTIVITY_EPSILON;
use crate::flux_analysis::options::MadeOptions;
use crate::flux_analysis::result::{DifferentialActivity, MethodDetails, MethodOutcome, Regulation};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{eflux, fba, AnalysisError};
use crate::optimize::solvers::Solver;

/// log2((|v2| + eps) / (|v1| + eps))
pub fn log2_fold_change(reference: f64, comparison: f64) -> f64 {
    ((comparison.abs() + ACTIVITY_EPSILON) / (reference.abs() + ACTIVITY_EPSILON)).log2()
}

/// E-Flux fluxes and objective under one expression profile
fn condition_fluxes(
    model: &StoichiometricModel,
    options: &MadeOptions,
    expression: &IndexMap<String, f64>,
    solver: &dyn Solver,
) -> Result<(Vec<f64>, f64), AnalysisError> {
    let factors = eflux::scaling_factors(model, &options.eflux_options(expression));
    let bounds = eflux::scaled_bounds(model, &factors);
    fba::optimize(model, &bounds, solver)
}

pub fn run(
    model: &StoichiometricModel,
    options: &MadeOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let (reference, reference_objective) =
        condition_fluxes(model, options, &options.reference_expression, solver)?;
    let (comparison, objective_value) =
        condition_fluxes(model, options, &options.comparison_expression, solver)?;

    let mut fold_changes = IndexMap::new();
    let mut differential = Vec::new();
    for (j, id) in model.reaction_ids().enumerate() {
        let fold_change = log2_fold_change(reference[j], comparison[j]);
        if fold_change.abs() >= options.fold_change_threshold {
            differential.push(DifferentialActivity {
                reaction: id.to_string(),
                fold_change,
                direction: if fold_change > 0. {
                    Regulation::Up
                } else {
                    Regulation::Down
                },
            });
        }
        fold_changes.insert(id.to_string(), fold_change);
    }
    tracing::debug!(
        component = "made",
        operation = "run",
        reference_objective,
        objective_value,
        differential = differential.len(),
        "Compared conditions"
    );
    let reference_fluxes = model
        .reaction_ids()
        .map(|id| id.to_string())
        .zip(reference)
        .collect();
    Ok(
        MethodOutcome::optimal(objective_value, comparison).with_details(MethodDetails::Made {
            reference_objective,
            reference_fluxes,
            fold_changes,
            differential,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::options::Scaling;
    use crate::flux_analysis::stoichiometry::tests::chain_model;
    use crate::flux_analysis::stoichiometry::BuildOptions;
    use crate::optimize::solvers::microlp::MicrolpSolver;

    fn expression(gr1: f64, gr2: f64) -> IndexMap<String, f64> {
        [("gR1".to_string(), gr1), ("gR2".to_string(), gr2)]
            .into_iter()
            .collect()
    }

    fn options(fold_change_threshold: f64) -> MadeOptions {
        MadeOptions {
            reference_expression: expression(2., 2.),
            comparison_expression: expression(4., 0.5),
            scaling: Scaling::Linear,
            min_bound: 0.,
            fold_change_threshold,
        }
    }

    #[test]
    fn fold_change_is_symmetric() {
        assert_eq!(log2_fold_change(0., 0.), 0.);
        let up = log2_fold_change(1., 4.);
        let down = log2_fold_change(4., 1.);
        assert!((up + down).abs() < 1e-12);
        assert!(up > 1.9 && up < 2.);
    }

    #[test]
    fn down_regulated_chain() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        let outcome = run(
            &sm,
            &options(MadeOptions::DEFAULT_FOLD_CHANGE_THRESHOLD),
            &MicrolpSolver::new(),
        )
        .unwrap();
        // Reference: R2 unscaled, growth 10. Comparison: R2 at 0.5 / 4, growth 1.25
        assert!((outcome.objective_value.unwrap() - 1.25).abs() < 1e-6);
        match outcome.details.unwrap() {
            MethodDetails::Made {
                reference_objective,
                differential,
                fold_changes,
                ..
            } => {
                assert!((reference_objective - 10.).abs() < 1e-6);
                assert_eq!(fold_changes.len(), 3);
                assert_eq!(differential.len(), 3);
                assert!(differential
                    .iter()
                    .all(|d| d.direction == Regulation::Down && d.fold_change < -2.9));
            }
            other => panic!("Unexpected details {:?}", other),
        }
    }

    #[test]
    fn threshold_filters_changes() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        let outcome = run(&sm, &options(4.), &MicrolpSolver::new()).unwrap();
        match outcome.details.unwrap() {
            MethodDetails::Made { differential, .. } => assert!(differential.is_empty()),
            other => panic!("Unexpected details {:?}", other),
        }
    }
}
