//! JSON wire format of models, solve requests and analysis results
//!
//! Models use a list based layout (`{"metabolites": [...], "reactions": [...], "genes": [...]}`),
//! requests and results use the camelCase serde layout of their types.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configuration;
use crate::flux_analysis::options::SolveRequest;
use crate::flux_analysis::result::AnalysisResult;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{ReactionBuilder, ReactionBuilderError};

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to parse json due to {0}")]
    UnableToParse(#[from] serde_json::Error),
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
}

// region JSON Model
/// Represents a JSON serialized model
#[derive(Serialize, Deserialize, Debug, Default)]
struct JsonModel {
    #[serde(default)]
    metabolites: Vec<JsonMetabolite>,
    #[serde(default)]
    reactions: Vec<JsonReaction>,
    #[serde(default)]
    genes: Vec<JsonGene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonMetabolite {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compartment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    charge: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonReaction {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    metabolites: IndexMap<String, f64>,
    #[serde(default)]
    lower_bound: Option<f64>,
    #[serde(default)]
    upper_bound: Option<f64>,
    #[serde(default)]
    gene_reaction_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    objective_coefficient: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subsystem: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonGene {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    essential: bool,
}
// endregion JSON Model

// region Conversions
impl From<JsonGene> for Gene {
    fn from(g: JsonGene) -> Self {
        Self {
            id: g.id,
            name: g.name,
            essential: g.essential,
        }
    }
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
        }
    }
}

impl From<&Gene> for JsonGene {
    fn from(g: &Gene) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            essential: g.essential,
        }
    }
}

impl From<&Metabolite> for JsonMetabolite {
    fn from(m: &Metabolite) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            compartment: m.compartment.clone(),
            charge: Some(m.charge),
            formula: m.formula.clone(),
        }
    }
}

impl JsonModel {
    fn into_model(self) -> Result<Model, JsonError> {
        let mut model = Model::new_empty();
        model.id = self.id;
        model.name = self.name;
        for gene in self.genes {
            if model.genes.contains_key(&gene.id) {
                return Err(JsonError::DuplicateId {
                    kind: "gene",
                    id: gene.id,
                });
            }
            model.add_gene(gene.into());
        }
        for metabolite in self.metabolites {
            if model.metabolites.contains_key(&metabolite.id) {
                return Err(JsonError::DuplicateId {
                    kind: "metabolite",
                    id: metabolite.id,
                });
            }
            model.add_metabolite(metabolite.into());
        }
        let defaults = configuration::current();
        for rxn in self.reactions {
            if model.reactions.contains_key(&rxn.id) {
                return Err(JsonError::DuplicateId {
                    kind: "reaction",
                    id: rxn.id,
                });
            }
            let mut builder = ReactionBuilder::default();
            builder
                .id(rxn.id)
                .metabolites(rxn.metabolites)
                .gene_reaction_rule(rxn.gene_reaction_rule)
                .lower_bound(rxn.lower_bound.unwrap_or(defaults.lower_bound))
                .upper_bound(rxn.upper_bound.unwrap_or(defaults.upper_bound))
                .objective_coefficient(rxn.objective_coefficient.unwrap_or_default());
            if let Some(name) = rxn.name {
                builder.name(name);
            }
            if let Some(subsystem) = rxn.subsystem {
                builder.subsystem(subsystem);
            }
            // Genes only referenced by GPRs are added by the model
            model.add_reaction(builder.build()?);
        }
        Ok(model)
    }

    fn from_model(model: &Model) -> Self {
        let reactions = model
            .reactions
            .values()
            .map(|r| JsonReaction {
                id: r.id.clone(),
                name: r.name.clone(),
                metabolites: r.metabolites.clone(),
                lower_bound: Some(r.lower_bound),
                upper_bound: Some(r.upper_bound),
                gene_reaction_rule: r.gene_reaction_rule.clone(),
                objective_coefficient: (r.objective_coefficient != 0.)
                    .then_some(r.objective_coefficient),
                subsystem: r.subsystem.clone(),
            })
            .collect();
        JsonModel {
            metabolites: model.metabolites.values().map(JsonMetabolite::from).collect(),
            reactions,
            genes: model.genes.values().map(JsonGene::from).collect(),
            id: model.id.clone(),
            name: model.name.clone(),
        }
    }
}
// endregion Conversions

// region Wire Functions
/// Parse a model from its JSON representation
pub fn model_from_json(json: &str) -> Result<Model, JsonError> {
    let json_model: JsonModel = serde_json::from_str(json)?;
    let model = json_model.into_model()?;
    tracing::debug!(
        component = "io",
        operation = "model_from_json",
        reactions = model.reactions.len(),
        metabolites = model.metabolites.len(),
        genes = model.genes.len(),
        "Parsed model"
    );
    Ok(model)
}

pub fn model_to_json(model: &Model) -> Result<String, JsonError> {
    Ok(serde_json::to_string(&JsonModel::from_model(model))?)
}

/// Parse a solve request, options are validated later when the request is dispatched
pub fn request_from_json(json: &str) -> Result<SolveRequest, JsonError> {
    Ok(serde_json::from_str(json)?)
}

pub fn request_to_json(request: &SolveRequest) -> Result<String, JsonError> {
    Ok(serde_json::to_string(request)?)
}

pub fn result_to_json(result: &AnalysisResult) -> Result<String, JsonError> {
    Ok(serde_json::to_string(result)?)
}

pub fn result_from_json(json: &str) -> Result<AnalysisResult, JsonError> {
    Ok(serde_json::from_str(json)?)
}
// endregion Wire Functions
