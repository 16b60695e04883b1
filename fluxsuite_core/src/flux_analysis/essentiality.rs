//! Single gene essentiality
//!
//! Each gene of the model is knocked out in turn, on top of the knockouts already applied to
//! the model, and growth is recomputed with FBA. A gene is essential when its knockout leaves
//! no optimal solution or growth below the viability threshold.
use std::collections::HashSet;

use crate::configuration::VIABILITY_THRESHOLD;
use crate::flux_analysis::result::{
    GeneEssentiality, MethodDetails, MethodOutcome, ResultStatus,
};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{fba, AnalysisError, SweepMonitor};
use crate::optimize::solvers::Solver;

/// Growth with `gene` knocked out
pub fn knockout_growth(
    model: &StoichiometricModel,
    gene: &str,
    solver: &dyn Solver,
) -> GeneEssentiality {
    let knockouts = HashSet::from([gene.to_string()]);
    let bounds = model.bounds_with_knockouts(&knockouts);
    match fba::optimize(model, &bounds, solver) {
        Ok((fluxes, _)) => {
            let growth_rate = model
                .objective_reaction()
                .map(|j| fluxes[j])
                .unwrap_or_default();
            GeneEssentiality {
                gene: gene.to_string(),
                growth_rate: Some(growth_rate),
                status: ResultStatus::Optimal,
                essential: growth_rate < VIABILITY_THRESHOLD,
            }
        }
        Err(err) => {
            let status = match &err {
                AnalysisError::NotOptimal { status, .. } => ResultStatus::from(*status),
                _ => ResultStatus::Error,
            };
            tracing::debug!(
                component = "essentiality",
                operation = "knockout",
                gene,
                error = %err,
                "Knockout has no optimal solution"
            );
            GeneEssentiality {
                gene: gene.to_string(),
                growth_rate: None,
                status,
                essential: true,
            }
        }
    }
}

pub fn run(
    model: &StoichiometricModel,
    solver: &dyn Solver,
    monitor: &dyn SweepMonitor,
) -> Result<MethodOutcome, AnalysisError> {
    let (fluxes, objective_value) = fba::optimize(model, model.bounds(), solver)?;
    let wild_type_growth = model
        .objective_reaction()
        .map(|j| fluxes[j])
        .unwrap_or_default();

    let total = model.genes().len();
    let mut genes = Vec::with_capacity(total);
    let mut cancelled = false;
    for (done, gene) in model.genes().iter().enumerate() {
        if monitor.is_cancelled() {
            cancelled = true;
            break;
        }
        genes.push(knockout_growth(model, gene, solver));
        monitor.report((done + 1) as f64 / total as f64);
    }
    if total == 0 {
        monitor.report(1.);
    }

    let essential_genes: Vec<String> = genes
        .iter()
        .filter(|g| g.essential)
        .map(|g| g.gene.clone())
        .collect();
    tracing::info!(
        component = "essentiality",
        operation = "run",
        analyzed = genes.len(),
        genes = total,
        essential = essential_genes.len(),
        cancelled,
        "Gene essentiality sweep finished"
    );
    let outcome =
        MethodOutcome::optimal(objective_value, fluxes).with_details(MethodDetails::Essentiality {
            wild_type_growth,
            genes,
            essential_genes,
        });
    if cancelled {
        Ok(outcome.with_status(ResultStatus::Cancelled, "Gene essentiality sweep was cancelled"))
    } else {
        Ok(outcome)
    }
}
