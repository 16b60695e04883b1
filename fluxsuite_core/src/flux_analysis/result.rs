//! Interpretation of solver output into analysis results
use std::fmt::{Display, Formatter};
use std::time::Duration;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::configuration::{snap_to_zero, ACTIVITY_EPSILON, VIABILITY_THRESHOLD};
use crate::flux_analysis::options::Method;
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::AnalysisError;
use crate::optimize::OptimizationStatus;

/// Outcome status of an analysis
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Error,
    /// The model was missing or had no reactions
    NoModel,
    /// A sweep was cancelled, results are partial
    Cancelled,
}

impl From<OptimizationStatus> for ResultStatus {
    fn from(status: OptimizationStatus) -> Self {
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => ResultStatus::Optimal,
            OptimizationStatus::Infeasible => ResultStatus::Infeasible,
            OptimizationStatus::Unbounded => ResultStatus::Unbounded,
            OptimizationStatus::NumericalError | OptimizationStatus::SolverHalted => {
                ResultStatus::Error
            }
        }
    }
}

/// Coarse metabolic phenotype derived from a flux distribution
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phenotype {
    /// Growth below the viability threshold
    Lethal,
    /// Secretion of the overflow metabolite while growing
    Overflow,
    /// Uptake of the respiratory electron acceptor
    Respiration,
    Fermentation,
}

impl Display for Phenotype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phenotype::Lethal => "lethal",
            Phenotype::Overflow => "overflow",
            Phenotype::Respiration => "respiration",
            Phenotype::Fermentation => "fermentation",
        };
        write!(f, "{}", name)
    }
}

/// Thresholds of the phenotype classification
///
/// This is an illustrative rule, it doesn't aim to be a complete taxonomy of phenotypes.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(default)]
pub struct PhenotypeRule {
    /// Growth rate below which the phenotype is lethal
    pub viability_threshold: f64,
    /// Metabolite whose secretion signals overflow metabolism
    #[builder(setter(into))]
    pub overflow_metabolite: String,
    /// Secretion rate of the overflow metabolite above which the phenotype is overflow
    pub overflow_threshold: f64,
    /// Metabolite whose uptake signals respiration
    #[builder(setter(into))]
    pub respiration_metabolite: String,
    /// Uptake rate of the respiration metabolite above which the phenotype is respiration
    pub uptake_epsilon: f64,
}

impl Default for PhenotypeRule {
    fn default() -> Self {
        PhenotypeRule {
            viability_threshold: VIABILITY_THRESHOLD,
            overflow_metabolite: "ac_e".to_string(),
            overflow_threshold: 1.,
            respiration_metabolite: "o2_e".to_string(),
            uptake_epsilon: ACTIVITY_EPSILON,
        }
    }
}

impl PhenotypeRule {
    pub fn classify(&self, model: &StoichiometricModel, growth_rate: f64, fluxes: &[f64]) -> Phenotype {
        if growth_rate < self.viability_threshold {
            return Phenotype::Lethal;
        }
        if model.net_secretion(&self.overflow_metabolite, fluxes) > self.overflow_threshold {
            return Phenotype::Overflow;
        }
        if -model.net_secretion(&self.respiration_metabolite, fluxes) > self.uptake_epsilon {
            return Phenotype::Respiration;
        }
        Phenotype::Fermentation
    }
}

// region Details
/// Minimum and maximum flux of a reaction
///
/// Failed sub-solves leave an infinite bound, which is written to JSON as the strings
/// "-Infinity" / "Infinity".
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxRange {
    #[serde(with = "extended_float")]
    pub minimum: f64,
    #[serde(with = "extended_float")]
    pub maximum: f64,
}

impl FluxRange {
    /// A reaction is blocked if it can't carry flux in either direction
    pub fn is_blocked(&self) -> bool {
        self.minimum.abs() < crate::configuration::FLUX_TOLERANCE
            && self.maximum.abs() < crate::configuration::FLUX_TOLERANCE
    }
}

/// Direction of a differential activity call
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regulation {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialActivity {
    pub reaction: String,
    pub fold_change: f64,
    pub direction: Regulation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneEssentiality {
    pub gene: String,
    /// Growth rate with the gene knocked out, None if the knockout problem wasn't optimal
    pub growth_rate: Option<f64>,
    pub status: ResultStatus,
    pub essential: bool,
}

/// Method specific details of a result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MethodDetails {
    #[serde(rename_all = "camelCase")]
    Pfba {
        /// Optimal objective of the first stage
        optimal_objective: f64,
        /// Minimized sum of absolute fluxes
        total_flux: f64,
    },
    #[serde(rename_all = "camelCase")]
    Fva {
        optimal_objective: f64,
        fraction_of_optimum: f64,
        ranges: IndexMap<String, FluxRange>,
        blocked_reactions: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Moma {
        /// L1 distance, or squared euclidean distance for quadratic MOMA, to the reference
        distance: f64,
        quadratic: bool,
        /// Whether the reference came from the request or from wild type FBA
        reference_from_request: bool,
    },
    #[serde(rename_all = "camelCase")]
    Gimme {
        inconsistency_score: f64,
        threshold: f64,
        optimal_objective: f64,
        penalized_reactions: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Eflux {
        scaling_factors: IndexMap<String, f64>,
    },
    #[serde(rename_all = "camelCase")]
    Imat {
        high_threshold: f64,
        low_threshold: f64,
        high_reactions: Vec<String>,
        low_reactions: Vec<String>,
        /// Number of satisfied indicators
        consistency_score: f64,
    },
    #[serde(rename_all = "camelCase")]
    Made {
        reference_objective: f64,
        reference_fluxes: IndexMap<String, f64>,
        fold_changes: IndexMap<String, f64>,
        differential: Vec<DifferentialActivity>,
    },
    #[serde(rename_all = "camelCase")]
    Essentiality {
        wild_type_growth: f64,
        genes: Vec<GeneEssentiality>,
        essential_genes: Vec<String>,
    },
}
impl MethodDetails {
    /// Snap the scalar summaries to zero, so a zero is never reported as `-0.0`
    fn snapped(self) -> Self {
        match self {
            MethodDetails::Pfba {
                optimal_objective,
                total_flux,
            } => MethodDetails::Pfba {
                optimal_objective: snap_to_zero(optimal_objective),
                total_flux: snap_to_zero(total_flux),
            },
            MethodDetails::Fva {
                optimal_objective,
                fraction_of_optimum,
                ranges,
                blocked_reactions,
            } => MethodDetails::Fva {
                optimal_objective: snap_to_zero(optimal_objective),
                fraction_of_optimum,
                ranges,
                blocked_reactions,
            },
            MethodDetails::Moma {
                distance,
                quadratic,
                reference_from_request,
            } => MethodDetails::Moma {
                distance: snap_to_zero(distance),
                quadratic,
                reference_from_request,
            },
            MethodDetails::Gimme {
                inconsistency_score,
                threshold,
                optimal_objective,
                penalized_reactions,
            } => MethodDetails::Gimme {
                inconsistency_score: snap_to_zero(inconsistency_score),
                threshold,
                optimal_objective: snap_to_zero(optimal_objective),
                penalized_reactions,
            },
            MethodDetails::Made {
                reference_objective,
                reference_fluxes,
                fold_changes,
                differential,
            } => MethodDetails::Made {
                reference_objective: snap_to_zero(reference_objective),
                reference_fluxes,
                fold_changes,
                differential,
            },
            MethodDetails::Essentiality {
                wild_type_growth,
                genes,
                essential_genes,
            } => MethodDetails::Essentiality {
                wild_type_growth: snap_to_zero(wild_type_growth),
                genes,
                essential_genes,
            },
            other => other,
        }
    }
}
// endregion Details

/// What a method produced, before interpretation
#[derive(Clone, Debug, PartialEq)]
pub struct MethodOutcome {
    pub status: ResultStatus,
    pub objective_value: Option<f64>,
    /// Net fluxes indexed like the reactions of the stoichiometric model
    pub fluxes: Option<Vec<f64>>,
    pub details: Option<MethodDetails>,
    pub message: Option<String>,
}

impl MethodOutcome {
    pub fn optimal(objective_value: f64, fluxes: Vec<f64>) -> Self {
        MethodOutcome {
            status: ResultStatus::Optimal,
            objective_value: Some(snap_to_zero(objective_value)),
            fluxes: Some(fluxes),
            details: None,
            message: None,
        }
    }

    pub fn with_details(mut self, details: MethodDetails) -> Self {
        self.details = Some(details.snapped());
        self
    }

    pub fn with_status(mut self, status: ResultStatus, message: &str) -> Self {
        self.status = status;
        self.message = Some(message.to_string());
        self
    }
}

/// Result of an analysis, as returned to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub status: ResultStatus,
    pub method: Method,
    pub objective_value: Option<f64>,
    /// Flux of the objective reaction
    pub growth_rate: Option<f64>,
    pub fluxes: IndexMap<String, f64>,
    pub phenotype: Option<Phenotype>,
    pub details: Option<MethodDetails>,
    pub message: Option<String>,
    pub solve_time_ms: f64,
}

impl AnalysisResult {
    /// Result which carries only a status and a message
    pub fn failed(method: Method, status: ResultStatus, message: impl Into<String>) -> Self {
        AnalysisResult {
            status,
            method,
            objective_value: None,
            growth_rate: None,
            fluxes: IndexMap::new(),
            phenotype: None,
            details: None,
            message: Some(message.into()),
            solve_time_ms: 0.,
        }
    }

    /// Convert an error into a typed result
    pub fn from_error(method: Method, error: &AnalysisError) -> Self {
        let status = match error {
            AnalysisError::NotOptimal { status, .. } => ResultStatus::from(*status),
            _ => ResultStatus::Error,
        };
        AnalysisResult::failed(method, status, error.to_string())
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.solve_time_ms = elapsed.as_secs_f64() * 1000.;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == ResultStatus::Optimal
    }
}

/// Turn a method outcome into a result: per reaction fluxes, growth rate and phenotype
pub fn interpret(
    method: Method,
    model: &StoichiometricModel,
    outcome: MethodOutcome,
    rule: &PhenotypeRule,
) -> AnalysisResult {
    let mut growth_rate = None;
    let mut phenotype = None;
    let mut flux_map = IndexMap::new();
    if let Some(fluxes) = &outcome.fluxes {
        flux_map = model
            .reaction_ids()
            .zip(fluxes.iter())
            .map(|(id, flux)| (id.to_string(), *flux))
            .collect();
        if let Some(j) = model.objective_reaction() {
            let growth = snap_to_zero(fluxes[j]);
            growth_rate = Some(growth);
            phenotype = Some(rule.classify(model, growth, fluxes));
        }
    }
    AnalysisResult {
        status: outcome.status,
        method,
        objective_value: outcome.objective_value.map(snap_to_zero),
        growth_rate,
        fluxes: flux_map,
        phenotype,
        details: outcome.details,
        message: outcome.message,
        solve_time_ms: 0.,
    }
}

/// Serde support for floats which may be infinite
mod extended_float {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value > 0. {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number or +/-Infinity, got {}",
                    other
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::stoichiometry::tests::chain_model;
    use crate::flux_analysis::stoichiometry::BuildOptions;

    #[test]
    fn interpret_growth_and_phenotype() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        let result = interpret(
            Method::Fba,
            &sm,
            MethodOutcome::optimal(10., vec![10., 10., 10.]),
            &PhenotypeRule::default(),
        );
        assert_eq!(result.growth_rate, Some(10.));
        assert_eq!(result.fluxes["R2"], 10.);
        // No acetate and no oxygen in the chain
        assert_eq!(result.phenotype, Some(Phenotype::Fermentation));

        let result = interpret(
            Method::Fba,
            &sm,
            MethodOutcome::optimal(0., vec![0., 0., 0.]),
            &PhenotypeRule::default(),
        );
        assert_eq!(result.phenotype, Some(Phenotype::Lethal));
    }

    #[test]
    fn interpret_never_reports_negative_zero() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        let mut outcome = MethodOutcome::optimal(0., vec![0., 0., -0.])
            .with_details(MethodDetails::Pfba {
                optimal_objective: -0.,
                total_flux: -1e-12,
            });
        outcome.objective_value = Some(-0.);
        let result = interpret(Method::Pfba, &sm, outcome, &PhenotypeRule::default());
        assert!(!result.objective_value.unwrap().is_sign_negative());
        assert!(!result.growth_rate.unwrap().is_sign_negative());
        match result.details.unwrap() {
            MethodDetails::Pfba {
                optimal_objective,
                total_flux,
            } => {
                assert!(!optimal_objective.is_sign_negative());
                assert_eq!(total_flux, 0.);
                assert!(!total_flux.is_sign_negative());
            }
            other => panic!("Unexpected details {:?}", other),
        }
    }

    #[test]
    fn custom_phenotype_rule() {
        let sm = StoichiometricModel::build(&chain_model(), &BuildOptions::default()).unwrap();
        // Treat the biomass precursor B as the overflow metabolite
        let rule = PhenotypeRuleBuilder::default()
            .overflow_metabolite("B")
            .overflow_threshold(5.)
            .build()
            .unwrap();
        assert_eq!(rule.classify(&sm, 10., &[10., 10., 10.]), Phenotype::Overflow);
        let rule = PhenotypeRuleBuilder::default()
            .respiration_metabolite("A")
            .build()
            .unwrap();
        assert_eq!(rule.classify(&sm, 10., &[10., 10., 10.]), Phenotype::Respiration);
        // Unset fields keep the defaults
        assert_eq!(rule.overflow_metabolite, PhenotypeRule::default().overflow_metabolite);
        assert_eq!(
            PhenotypeRuleBuilder::default().build().unwrap(),
            PhenotypeRule::default()
        );
    }

    #[test]
    fn errors_become_typed_results() {
        let err = AnalysisError::NotOptimal {
            stage: "fba".to_string(),
            status: OptimizationStatus::Unbounded,
        };
        assert_eq!(
            AnalysisResult::from_error(Method::Fba, &err).status,
            ResultStatus::Unbounded
        );
        let err = AnalysisError::InvalidOption("bad".to_string());
        let result = AnalysisResult::from_error(Method::Gimme, &err);
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.message.as_deref(), Some("Invalid option: bad"));
    }

    #[test]
    fn infinite_ranges_serialize() {
        let range = FluxRange {
            minimum: f64::NEG_INFINITY,
            maximum: 2.5,
        };
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"minimum":"-Infinity","maximum":2.5}"#);
        let back: FluxRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
        assert!(FluxRange {
            minimum: -1e-7,
            maximum: 1e-8
        }
        .is_blocked());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResultStatus::NoModel).unwrap(),
            r#""no_model""#
        );
        assert_eq!(
            serde_json::to_string(&Phenotype::Overflow).unwrap(),
            r#""overflow""#
        );
    }
}
