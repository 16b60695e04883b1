//! E-Flux
//!
//! Bounds of reactions with a GPR are scaled by a normalized expression factor before a
//! standard FBA. The scaled bounds are a separate table, the stoichiometric model is untouched.
use indexmap::IndexMap;

use crate::flux_analysis::options::{EfluxOptions, Scaling};
use crate::flux_analysis::result::{MethodDetails, MethodOutcome};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, AnalysisError};
use crate::metabolic_model::reaction::FluxBounds;
use crate::optimize::solvers::Solver;
use crate::utils::statistics::rank_fraction;

/// Scaling factor of every reaction, 1 for reactions without a GPR
pub fn scaling_factors(model: &StoichiometricModel, options: &EfluxOptions) -> Vec<f64> {
    let levels = model.expression_levels(&options.expression);
    let values: Vec<f64> = levels.iter().flatten().map(|e| e.max(0.)).collect();
    let max = values.iter().copied().fold(0., f64::max);
    if max <= 0. {
        tracing::warn!(
            component = "eflux",
            operation = "scaling_factors",
            "No positive reaction expression, bounds are left unscaled"
        );
        return vec![1.; levels.len()];
    }
    levels
        .iter()
        .map(|level| match level {
            None => 1.,
            Some(e) => {
                let e = e.max(0.);
                let factor = match options.scaling {
                    Scaling::Linear => e / max,
                    Scaling::Log => (1. + e).ln() / (1. + max).ln(),
                    Scaling::Percentile => rank_fraction(&values, e),
                };
                factor.clamp(options.min_bound.min(1.), 1.)
            }
        })
        .collect()
}

/// Effective bounds multiplied by their scaling factor
pub fn scaled_bounds(model: &StoichiometricModel, factors: &[f64]) -> Vec<FluxBounds> {
    model
        .bounds()
        .iter()
        .zip(factors)
        .map(|(bounds, factor)| bounds.scaled(*factor))
        .collect()
}

pub fn run(
    model: &StoichiometricModel,
    options: &EfluxOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let factors = scaling_factors(model, options);
    let bounds = scaled_bounds(model, &factors);
    let (fluxes, objective_value) = fba::optimize(model, &bounds, solver)?;
    tracing::debug!(
        component = "eflux",
        operation = "run",
        scaling = ?options.scaling,
        objective_value,
        "Solved with expression scaled bounds"
    );
    let scaling_factors: IndexMap<String, f64> = model
        .reaction_ids()
        .map(|id| id.to_string())
        .zip(factors)
        .collect();
    Ok(MethodOutcome::optimal(objective_value, fluxes)
        .with_details(MethodDetails::Eflux { scaling_factors }))
}
