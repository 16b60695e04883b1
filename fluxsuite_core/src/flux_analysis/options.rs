//! Solve requests as received on the wire, and the validated per method options
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::flux_analysis::AnalysisError;

/// Analysis methods that can be requested
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Fba,
    Pfba,
    Fva,
    Moma,
    Gimme,
    Eflux,
    Imat,
    Made,
    Essentiality,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Fba => "fba",
            Method::Pfba => "pfba",
            Method::Fva => "fva",
            Method::Moma => "moma",
            Method::Gimme => "gimme",
            Method::Eflux => "eflux",
            Method::Imat => "imat",
            Method::Made => "made",
            Method::Essentiality => "essentiality",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Override of a reaction's flux bounds, missing sides keep the model value
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ub: Option<f64>,
}

/// Expression normalization used by E-Flux
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// e / max(e)
    #[default]
    Linear,
    /// ln(1 + e) / ln(1 + max(e))
    Log,
    /// Fraction of reaction expression values less than or equal to e
    Percentile,
}

/// Flat method options, every field is optional and only some apply to each method
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_of_optimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_data: Option<IndexMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_expression_data: Option<IndexMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_fluxes: Option<IndexMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<Scaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fold_change_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadratic: Option<bool>,
}

/// A request to analyze a model with one method
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub method: Method,
    /// Bound overrides keyed by reaction id
    #[serde(default)]
    pub constraints: IndexMap<String, BoundOverride>,
    /// Genes to knock out
    #[serde(default)]
    pub knockouts: Vec<String>,
    /// Reaction to maximize instead of the model objective
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default)]
    pub options: RequestOptions,
}

impl SolveRequest {
    /// A request for `method` with no overrides, knockouts or options
    pub fn new(method: Method) -> Self {
        SolveRequest {
            method,
            constraints: IndexMap::new(),
            knockouts: Vec::new(),
            objective: None,
            options: RequestOptions::default(),
        }
    }

    /// Override the bounds of a reaction
    pub fn with_bounds(mut self, reaction: &str, lb: Option<f64>, ub: Option<f64>) -> Self {
        self.constraints
            .insert(reaction.to_string(), BoundOverride { lb, ub });
        self
    }

    /// Knock out a gene
    pub fn with_knockout(mut self, gene: &str) -> Self {
        self.knockouts.push(gene.to_string());
        self
    }

    /// Replace the model objective by a single reaction
    pub fn with_objective(mut self, reaction: &str) -> Self {
        self.objective = Some(reaction.to_string());
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the flat options into the options of the requested method
    pub fn method_options(&self) -> Result<MethodOptions, AnalysisError> {
        let o = &self.options;
        let options = match self.method {
            Method::Fba => MethodOptions::Fba,
            Method::Pfba => MethodOptions::Pfba(PfbaOptions {
                fraction_of_optimum: fraction(o.fraction_of_optimum, 1.)?,
            }),
            Method::Fva => MethodOptions::Fva(FvaOptions {
                fraction_of_optimum: fraction(o.fraction_of_optimum, 0.9)?,
                reactions: o.reactions.clone(),
            }),
            Method::Moma => MethodOptions::Moma(MomaOptions {
                reference_fluxes: o.reference_fluxes.clone(),
                quadratic: o.quadratic.unwrap_or(false),
            }),
            Method::Gimme => {
                let defaults = GimmeOptions::default();
                MethodOptions::Gimme(GimmeOptions {
                    expression: required_expression(&o.expression_data, "expressionData")?,
                    threshold_percentile: percentile(o.threshold, defaults.threshold_percentile)?,
                    fraction_of_optimum: fraction(
                        o.fraction_of_optimum,
                        defaults.fraction_of_optimum,
                    )?,
                })
            }
            Method::Eflux => MethodOptions::Eflux(EfluxOptions {
                expression: required_expression(&o.expression_data, "expressionData")?,
                scaling: o.scaling.unwrap_or_default(),
                min_bound: min_bound(o.min_bound)?,
            }),
            Method::Imat => {
                let defaults = ImatOptions::default();
                let high = percentile(o.high_threshold, defaults.high_percentile)?;
                let low = percentile(o.low_threshold, defaults.low_percentile)?;
                if low > high {
                    return Err(AnalysisError::InvalidOption(format!(
                        "lowThreshold ({}) must not exceed highThreshold ({})",
                        low, high
                    )));
                }
                let epsilon = o.epsilon.unwrap_or(defaults.epsilon);
                if !(epsilon.is_finite() && epsilon > 0.) {
                    return Err(AnalysisError::InvalidOption(format!(
                        "epsilon must be positive, got {}",
                        epsilon
                    )));
                }
                MethodOptions::Imat(ImatOptions {
                    expression: required_expression(&o.expression_data, "expressionData")?,
                    high_percentile: high,
                    low_percentile: low,
                    epsilon,
                })
            }
            Method::Made => {
                let threshold = o
                    .fold_change_threshold
                    .unwrap_or(MadeOptions::DEFAULT_FOLD_CHANGE_THRESHOLD);
                if !(threshold.is_finite() && threshold >= 0.) {
                    return Err(AnalysisError::InvalidOption(format!(
                        "foldChangeThreshold must be nonnegative, got {}",
                        threshold
                    )));
                }
                MethodOptions::Made(MadeOptions {
                    reference_expression: required_expression(
                        &o.expression_data,
                        "expressionData",
                    )?,
                    comparison_expression: required_expression(
                        &o.comparison_expression_data,
                        "comparisonExpressionData",
                    )?,
                    scaling: o.scaling.unwrap_or_default(),
                    min_bound: min_bound(o.min_bound)?,
                    fold_change_threshold: threshold,
                })
            }
            Method::Essentiality => MethodOptions::Essentiality,
        };
        Ok(options)
    }
}

fn fraction(value: Option<f64>, default: f64) -> Result<f64, AnalysisError> {
    let value = value.unwrap_or(default);
    if (0. ..=1.).contains(&value) {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidOption(format!(
            "fractionOfOptimum must be within [0, 1], got {}",
            value
        )))
    }
}

fn percentile(value: Option<f64>, default: f64) -> Result<f64, AnalysisError> {
    let value = value.unwrap_or(default);
    if (0. ..=100.).contains(&value) {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidOption(format!(
            "percentile thresholds must be within [0, 100], got {}",
            value
        )))
    }
}

fn min_bound(value: Option<f64>) -> Result<f64, AnalysisError> {
    let value = value.unwrap_or(0.);
    if (0. ..=1.).contains(&value) {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidOption(format!(
            "minBound must be within [0, 1], got {}",
            value
        )))
    }
}

fn required_expression(
    data: &Option<IndexMap<String, f64>>,
    field: &str,
) -> Result<IndexMap<String, f64>, AnalysisError> {
    match data {
        Some(expression) if !expression.is_empty() => {
            if let Some((gene, value)) = expression.iter().find(|(_, v)| !v.is_finite()) {
                return Err(AnalysisError::InvalidOption(format!(
                    "{} has a non finite value for gene {}: {}",
                    field, gene, value
                )));
            }
            Ok(expression.clone())
        }
        _ => Err(AnalysisError::InvalidOption(format!(
            "{} is required for this method",
            field
        ))),
    }
}

// region Method Options
/// Validated options of a request, one variant per method
#[derive(Clone, Debug, PartialEq)]
pub enum MethodOptions {
    Fba,
    Pfba(PfbaOptions),
    Fva(FvaOptions),
    Moma(MomaOptions),
    Gimme(GimmeOptions),
    Eflux(EfluxOptions),
    Imat(ImatOptions),
    Made(MadeOptions),
    Essentiality,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PfbaOptions {
    /// Fraction of the optimal objective that must be kept while minimizing total flux
    pub fraction_of_optimum: f64,
}

impl Default for PfbaOptions {
    fn default() -> Self {
        PfbaOptions {
            fraction_of_optimum: 1.,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FvaOptions {
    pub fraction_of_optimum: f64,
    /// Reactions to analyze, all reactions when None
    pub reactions: Option<Vec<String>>,
}

impl Default for FvaOptions {
    fn default() -> Self {
        FvaOptions {
            fraction_of_optimum: 0.9,
            reactions: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MomaOptions {
    /// Reference flux distribution, wild type FBA when None
    pub reference_fluxes: Option<IndexMap<String, f64>>,
    /// Minimize the squared euclidean distance instead of the L1 distance
    pub quadratic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GimmeOptions {
    pub expression: IndexMap<String, f64>,
    /// Percentile of reaction expression below which reactions are penalized
    pub threshold_percentile: f64,
    pub fraction_of_optimum: f64,
}

impl Default for GimmeOptions {
    fn default() -> Self {
        GimmeOptions {
            expression: IndexMap::new(),
            threshold_percentile: 25.,
            fraction_of_optimum: 0.9,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EfluxOptions {
    pub expression: IndexMap<String, f64>,
    pub scaling: Scaling,
    /// Smallest scaling factor a reaction's bounds can receive
    pub min_bound: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImatOptions {
    pub expression: IndexMap<String, f64>,
    pub high_percentile: f64,
    pub low_percentile: f64,
    /// Flux magnitude a highly expressed reaction must reach to count as active
    pub epsilon: f64,
}

impl Default for ImatOptions {
    fn default() -> Self {
        ImatOptions {
            expression: IndexMap::new(),
            high_percentile: 75.,
            low_percentile: 25.,
            epsilon: crate::configuration::ACTIVITY_EPSILON,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MadeOptions {
    /// Expression of the first (reference) condition
    pub reference_expression: IndexMap<String, f64>,
    /// Expression of the second condition
    pub comparison_expression: IndexMap<String, f64>,
    pub scaling: Scaling,
    pub min_bound: f64,
    /// Absolute log2 fold change at which a reaction is differentially active
    pub fold_change_threshold: f64,
}

impl MadeOptions {
    pub const DEFAULT_FOLD_CHANGE_THRESHOLD: f64 = 2.;

    /// E-Flux options for one of the two conditions
    pub(crate) fn eflux_options(&self, expression: &IndexMap<String, f64>) -> EfluxOptions {
        EfluxOptions {
            expression: expression.clone(),
            scaling: self.scaling,
            min_bound: self.min_bound,
        }
    }
}
// endregion Method Options
