//! Comparison of two analysis results, e.g. the same request solved by two backends
use serde::{Deserialize, Serialize};

use crate::configuration::OBJECTIVE_TOLERANCE;
use crate::flux_analysis::result::{AnalysisResult, MethodDetails};

/// Flux difference above which a reaction is listed in the notes
pub const NOTE_FLUX_TOLERANCE: f64 = 1e-4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    /// |a - b| of the objective values, None when either is missing
    pub objective_difference: Option<f64>,
    /// Objective difference over max(|a|, |b|, 1e-10)
    pub relative_difference: Option<f64>,
    /// Euclidean norm of the flux differences over the union of reactions
    pub flux_l2_norm: f64,
    pub max_flux_difference: f64,
    pub max_difference_reaction: Option<String>,
    /// Both results share their status and their objectives agree within tolerance
    pub passed: bool,
    pub notes: Vec<String>,
}

/// Compare `a` against `b`
///
/// Missing fluxes count as zero. For FVA results the flux ranges are compared as well, by the
/// larger of the minimum and maximum differences.
pub fn compare_results(a: &AnalysisResult, b: &AnalysisResult) -> ComparisonReport {
    let mut notes = Vec::new();
    if a.status != b.status {
        notes.push(format!("Status differs: {:?} vs {:?}", a.status, b.status));
    }

    let (objective_difference, relative_difference) = match (a.objective_value, b.objective_value)
    {
        (Some(x), Some(y)) => {
            let difference = (x - y).abs();
            let scale = x.abs().max(y.abs()).max(1e-10);
            (Some(difference), Some(difference / scale))
        }
        _ => (None, None),
    };

    let mut differences: Vec<(String, f64)> = a
        .fluxes
        .iter()
        .map(|(id, v)| (id.clone(), (v - b.fluxes.get(id).copied().unwrap_or(0.)).abs()))
        .collect();
    differences.extend(
        b.fluxes
            .iter()
            .filter(|(id, _)| !a.fluxes.contains_key(*id))
            .map(|(id, v)| (id.clone(), v.abs())),
    );
    if let (Some(MethodDetails::Fva { ranges: ra, .. }), Some(MethodDetails::Fva { ranges: rb, .. })) =
        (&a.details, &b.details)
    {
        for (id, range) in ra {
            if let Some(other) = rb.get(id) {
                let difference = range_difference(range.minimum, other.minimum)
                    .max(range_difference(range.maximum, other.maximum));
                differences.push((format!("{} (range)", id), difference));
            }
        }
    }

    let flux_l2_norm = differences.iter().map(|(_, d)| d * d).sum::<f64>().sqrt();
    let mut max_flux_difference = 0.;
    let mut max_difference_reaction = None;
    for (id, difference) in &differences {
        if *difference > max_flux_difference {
            max_flux_difference = *difference;
            max_difference_reaction = Some(id.clone());
        }
        if *difference > NOTE_FLUX_TOLERANCE {
            notes.push(format!("Flux of {} differs by {:.6}", id, difference));
        }
    }

    let passed = a.status == b.status
        && match objective_difference {
            Some(difference) => difference < OBJECTIVE_TOLERANCE,
            None => a.objective_value.is_none() && b.objective_value.is_none(),
        };
    ComparisonReport {
        objective_difference,
        relative_difference,
        flux_l2_norm,
        max_flux_difference,
        max_difference_reaction,
        passed,
        notes,
    }
}

/// Difference of two possibly infinite bounds, zero when both are the same infinity
fn range_difference(x: f64, y: f64) -> f64 {
    if x == y {
        0.
    } else {
        (x - y).abs()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::flux_analysis::options::Method;
    use crate::flux_analysis::result::{FluxRange, ResultStatus};

    fn result(objective: f64, fluxes: &[(&str, f64)]) -> AnalysisResult {
        let mut result = AnalysisResult::failed(Method::Fba, ResultStatus::Optimal, "");
        result.message = None;
        result.objective_value = Some(objective);
        result.fluxes = fluxes.iter().map(|(id, v)| (id.to_string(), *v)).collect();
        result
    }

    #[test]
    fn identical_results_pass() {
        let a = result(10., &[("R1", 10.), ("R2", 10.)]);
        let report = compare_results(&a, &a.clone());
        assert!(report.passed);
        assert_eq!(report.objective_difference, Some(0.));
        assert_eq!(report.flux_l2_norm, 0.);
        assert_eq!(report.max_difference_reaction, None);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn differences_are_reported() {
        let a = result(10., &[("R1", 10.), ("R2", 4.)]);
        let b = result(9., &[("R1", 10.), ("R3", 3.)]);
        let report = compare_results(&a, &b);
        assert!(!report.passed);
        assert_eq!(report.objective_difference, Some(1.));
        assert!((report.relative_difference.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(report.flux_l2_norm, 5.);
        assert_eq!(report.max_flux_difference, 4.);
        assert_eq!(report.max_difference_reaction.as_deref(), Some("R2"));
        assert_eq!(report.notes.len(), 2);
    }

    #[test]
    fn fva_ranges_are_compared() {
        let ranges = |max: f64| -> IndexMap<String, FluxRange> {
            [(
                "R1".to_string(),
                FluxRange {
                    minimum: f64::NEG_INFINITY,
                    maximum: max,
                },
            )]
            .into_iter()
            .collect()
        };
        let details = |max: f64| MethodDetails::Fva {
            optimal_objective: 10.,
            fraction_of_optimum: 0.9,
            ranges: ranges(max),
            blocked_reactions: Vec::new(),
        };
        let mut a = result(10., &[]);
        a.details = Some(details(10.));
        let mut b = result(10., &[]);
        b.details = Some(details(7.));
        let report = compare_results(&a, &b);
        // Objectives agree, the range difference is still reported
        assert!(report.passed);
        assert_eq!(report.max_flux_difference, 3.);
        assert_eq!(report.max_difference_reaction.as_deref(), Some("R1 (range)"));
    }
}
