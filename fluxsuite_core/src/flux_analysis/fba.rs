//! Flux Balance Analysis
use crate::flux_analysis::result::MethodOutcome;
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{solve_optimal, AnalysisError};
use crate::metabolic_model::reaction::FluxBounds;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;

/// Formulate FBA: maximize the objective subject to mass balance and `bounds`
pub fn formulate(model: &StoichiometricModel, bounds: &[FluxBounds]) -> Result<Problem, AnalysisError> {
    model.require_objective()?;
    let mut problem = model.flux_problem(bounds, ObjectiveSense::Maximize)?;
    model.set_flux_objective(&mut problem)?;
    Ok(problem)
}

/// Solve FBA with the given bounds, returning the net fluxes and the optimal objective value
pub fn optimize(
    model: &StoichiometricModel,
    bounds: &[FluxBounds],
    solver: &dyn Solver,
) -> Result<(Vec<f64>, f64), AnalysisError> {
    let problem = formulate(model, bounds)?;
    let solution = solve_optimal(solver, &problem, "fba")?;
    let fluxes = model.net_fluxes(&solution);
    let objective_value = model.objective_value(&fluxes);
    Ok((fluxes, objective_value))
}

/// Run FBA on the effective bounds of the model
pub fn run(model: &StoichiometricModel, solver: &dyn Solver) -> Result<MethodOutcome, AnalysisError> {
    let (fluxes, objective_value) = optimize(model, model.bounds(), solver)?;
    Ok(MethodOutcome::optimal(objective_value, fluxes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::stoichiometry::tests::chain_model;
    use crate::flux_analysis::stoichiometry::BuildOptions;
    use crate::optimize::solvers::microlp::MicrolpSolver;
    use crate::optimize::OptimizationStatus;

    #[test]
    fn chain_is_limited_by_middle_reaction() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        let outcome = run(&sm, &MicrolpSolver::new()).unwrap();
        let fluxes = outcome.fluxes.unwrap();
        assert!((outcome.objective_value.unwrap() - 10.).abs() < 1e-6);
        for flux in fluxes {
            assert!((flux - 10.).abs() < 1e-6);
        }
    }

    #[test]
    fn knockout_of_only_gene_blocks_growth() {
        let options = BuildOptions {
            knockouts: vec!["gR2".to_string()],
            ..Default::default()
        };
        let sm = StoichiometricModel::build(&chain_model(), &options).unwrap();
        let outcome = run(&sm, &MicrolpSolver::new()).unwrap();
        assert!(outcome.objective_value.unwrap().abs() < 1e-9);
    }

    #[test]
    fn zero_objective_is_positive_zero() {
        let mut model = chain_model();
        // Maximizing -v3 keeps the chain idle
        model.reactions["R3"].objective_coefficient = -1.;
        let sm = StoichiometricModel::build(&model, &BuildOptions::default()).unwrap();
        let outcome = run(&sm, &MicrolpSolver::new()).unwrap();
        let objective = outcome.objective_value.unwrap();
        assert_eq!(objective, 0.);
        assert!(!objective.is_sign_negative());
        assert_eq!(serde_json::to_string(&objective).unwrap(), "0.0");
    }

    #[test]
    fn infeasible_bounds_report_status() {
        let mut model = chain_model();
        // Force more biomass than R2 can supply
        model.reactions["R3"].lower_bound = 20.;
        let sm = StoichiometricModel::build(&model, &BuildOptions::default()).unwrap();
        let err = run(&sm, &MicrolpSolver::new()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NotOptimal {
                stage: "fba".to_string(),
                status: OptimizationStatus::Infeasible
            }
        );
    }
}
