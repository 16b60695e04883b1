//! GIMME
//!
//! Keeps the objective near its optimum while minimizing the flux through reactions whose
//! expression falls below a percentile threshold, weighted by how far below the threshold
//! each reaction is.
use crate::configuration::{snap_to_zero, OBJECTIVE_TOLERANCE};
use crate::flux_analysis::options::GimmeOptions;
use crate::flux_analysis::result::{MethodDetails, MethodOutcome};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, solve_optimal, AnalysisError};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::utils::statistics::percentile;

/// Reactions expressed below `threshold` with their penalty weight `threshold - e_r`
pub fn penalties(levels: &[Option<f64>], threshold: f64) -> Vec<(usize, f64)> {
    levels
        .iter()
        .enumerate()
        .filter_map(|(j, level)| match level {
            Some(e) if *e < threshold => Some((j, threshold - e)),
            _ => None,
        })
        .collect()
}

/// Expression threshold of the options, None without any reaction carrying a GPR
pub fn threshold(levels: &[Option<f64>], options: &GimmeOptions) -> Option<f64> {
    let values: Vec<f64> = levels.iter().flatten().copied().collect();
    percentile(&values, options.threshold_percentile)
}

pub fn formulate(
    model: &StoichiometricModel,
    penalties: &[(usize, f64)],
    optimal_objective: f64,
    fraction_of_optimum: f64,
) -> Result<Problem, AnalysisError> {
    let mut problem = model.flux_problem(model.bounds(), ObjectiveSense::Minimize)?;
    model.add_objective_floor(
        &mut problem,
        optimal_objective * fraction_of_optimum - OBJECTIVE_TOLERANCE,
    )?;
    for (j, weight) in penalties {
        for (variable, coefficient) in model.total_flux_terms(*j, *weight) {
            problem.add_new_linear_objective_term(variable, coefficient)?;
        }
    }
    Ok(problem)
}

pub fn run(
    model: &StoichiometricModel,
    options: &GimmeOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let levels = model.expression_levels(&options.expression);
    let threshold = threshold(&levels, options).ok_or_else(|| {
        AnalysisError::InvalidOption(
            "GIMME needs at least one reaction with a gene reaction rule".to_string(),
        )
    })?;
    let penalties = penalties(&levels, threshold);

    let (_, optimal_objective) = fba::optimize(model, model.bounds(), solver)?;
    let problem = formulate(model, &penalties, optimal_objective, options.fraction_of_optimum)?;
    let solution = solve_optimal(solver, &problem, "gimme")?;
    let fluxes = model.net_fluxes(&solution);
    let inconsistency_score = snap_to_zero(
        penalties
            .iter()
            .map(|(j, weight)| weight * fluxes[*j].abs())
            .sum(),
    );
    tracing::debug!(
        component = "gimme",
        operation = "run",
        threshold,
        penalized = penalties.len(),
        inconsistency_score,
        "Minimized flux through lowly expressed reactions"
    );
    let penalized_reactions = penalties
        .iter()
        .map(|(j, _)| model.reaction_id(*j).to_string())
        .collect();
    Ok(
        MethodOutcome::optimal(inconsistency_score, fluxes).with_details(MethodDetails::Gimme {
            inconsistency_score,
            threshold,
            optimal_objective,
            penalized_reactions,
        }),
    )
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::flux_analysis::stoichiometry::tests::detour_model;
    use crate::flux_analysis::stoichiometry::BuildOptions;
    use crate::optimize::solvers::microlp::MicrolpSolver;

    fn expression() -> IndexMap<String, f64> {
        [("gR1", 5.), ("gR2", 0.1), ("gR5", 5.), ("gR6", 5.)]
            .into_iter()
            .map(|(gene, level)| (gene.to_string(), level))
            .collect()
    }

    #[test]
    fn only_low_expression_is_penalized() {
        let sm = StoichiometricModel::build(&detour_model(), &BuildOptions::default()).unwrap();
        let levels = sm.expression_levels(&expression());
        // R3 has no GPR
        assert_eq!(levels[2], None);
        let options = GimmeOptions {
            expression: expression(),
            ..Default::default()
        };
        // 25th percentile of [0.1, 5, 5, 5]
        let t = threshold(&levels, &options).unwrap();
        assert!((t - 3.775).abs() < 1e-9);
        let penalties = penalties(&levels, t);
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].0, 1);
        assert!((penalties[0].1 - 3.675).abs() < 1e-9);
    }

    #[test]
    fn flux_moves_to_expressed_route() {
        let sm = StoichiometricModel::build(&detour_model(), &BuildOptions::default()).unwrap();
        let options = GimmeOptions {
            expression: expression(),
            fraction_of_optimum: 0.5,
            ..Default::default()
        };
        let outcome = run(&sm, &options, &MicrolpSolver::new()).unwrap();
        let fluxes = outcome.fluxes.clone().unwrap();
        assert!(fluxes[1].abs() < 1e-6);
        assert!(fluxes[2] >= 10. - 1e-4);
        assert!(outcome.objective_value.unwrap().abs() < 1e-6);
        match outcome.details.unwrap() {
            MethodDetails::Gimme {
                optimal_objective,
                penalized_reactions,
                ..
            } => {
                assert!((optimal_objective - 20.).abs() < 1e-6);
                assert_eq!(penalized_reactions, vec!["R2"]);
            }
            other => panic!("Unexpected details {:?}", other),
        }
    }

    #[test]
    fn high_fraction_forces_penalized_flux() {
        let sm = StoichiometricModel::build(&detour_model(), &BuildOptions::default()).unwrap();
        let options = GimmeOptions {
            expression: expression(),
            ..Default::default()
        };
        let outcome = run(&sm, &options, &MicrolpSolver::new()).unwrap();
        let fluxes = outcome.fluxes.unwrap();
        // 18 units of growth, at most 10 through the detour
        assert!((fluxes[1] - 8.).abs() < 1e-4);
        assert!((outcome.objective_value.unwrap() - 3.675 * 8.).abs() < 1e-3);
    }

    #[test]
    fn uniform_expression_penalizes_nothing() {
        let sm = StoichiometricModel::build(&detour_model(), &BuildOptions::default()).unwrap();
        let expression = ["gR1", "gR2", "gR5", "gR6"]
            .into_iter()
            .map(|gene| (gene.to_string(), 5.))
            .collect();
        let options = GimmeOptions {
            expression,
            ..Default::default()
        };
        let outcome = run(&sm, &options, &MicrolpSolver::new()).unwrap();
        let score = outcome.objective_value.unwrap();
        assert_eq!(score, 0.);
        assert!(!score.is_sign_negative());
        match outcome.details.unwrap() {
            MethodDetails::Gimme {
                inconsistency_score,
                penalized_reactions,
                ..
            } => {
                assert!(!inconsistency_score.is_sign_negative());
                assert!(penalized_reactions.is_empty());
            }
            other => panic!("Unexpected details {:?}", other),
        }
    }

    #[test]
    fn no_gene_rules_is_an_error() {
        let mut model = detour_model();
        for reaction in model.reactions.values_mut() {
            reaction.gene_reaction_rule.clear();
        }
        let sm = StoichiometricModel::build(&model, &BuildOptions::default()).unwrap();
        let err = run(&sm, &GimmeOptions::default(), &MicrolpSolver::new()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidOption(_)));
    }
}
