//! This module provides the Model struct for representing an entire metabolic network
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

use indexmap::IndexMap;
use serde::Serialize;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reactions, insertion order defines the column order of the
    /// stoichiometric matrix
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Genes
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolites, insertion order defines the row order of the
    /// stoichiometric matrix
    pub metabolites: IndexMap<String, Metabolite>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the Model
    pub name: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model::default()
    }

    /// Add a reaction to the model
    ///
    /// Genes referenced by the reaction's GPR which are not yet in the model are added.
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use fluxsuite_core::metabolic_model::model::Model;
    /// use fluxsuite_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default()
    ///     .id("new_reaction")
    ///     .gene_reaction_rule("b0001 and b0002")
    ///     .build()
    ///     .unwrap();
    /// model.add_reaction(new_reaction);
    /// assert_eq!(model.genes.len(), 2);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        if let Ok(Some(gpr)) = reaction.gpr() {
            for gene in gpr.genes() {
                self.insert_gene_if_needed(gene);
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Examples
    /// ```rust
    /// use fluxsuite_core::metabolic_model::gene::GeneBuilder;
    /// use fluxsuite_core::metabolic_model::model::Model;
    /// let mut model = Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene").build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Check if a gene id exists in the gene map, if it doesn't insert a new gene with that id
    fn insert_gene_if_needed(&mut self, gene_id: &str) {
        if !self.genes.contains_key(gene_id) {
            self.add_gene(Gene::new(gene_id));
        }
    }

    /// A model without reactions can't be analyzed
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Reactions with a nonzero objective coefficient, in model order
    pub fn objective_reactions(&self) -> Vec<(&str, f64)> {
        self.reactions
            .values()
            .filter(|r| r.objective_coefficient != 0.)
            .map(|r| (r.id.as_str(), r.objective_coefficient))
            .collect()
    }

    /// Check the structural invariants of the model
    ///
    /// Returns every problem found, an empty Vec means the model is valid.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.validate_with_objective(None)
    }

    /// Like [`Model::validate`], additionally checking that `objective` (a reaction id, as in a
    /// solve request) names a reaction of the model
    ///
    /// Without an explicit objective, the model must have a reaction with a nonzero objective
    /// coefficient or a reaction whose id or name mentions biomass.
    pub fn validate_with_objective(&self, objective: Option<&str>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for reaction in self.reactions.values() {
            for metabolite in reaction.metabolites.keys() {
                if !self.metabolites.contains_key(metabolite) {
                    issues.push(ValidationIssue::UndeclaredMetabolite {
                        reaction: reaction.id.clone(),
                        metabolite: metabolite.clone(),
                    });
                }
            }
            if !(reaction.lower_bound <= reaction.upper_bound) {
                issues.push(ValidationIssue::InvalidBounds {
                    reaction: reaction.id.clone(),
                    lower_bound: reaction.lower_bound,
                    upper_bound: reaction.upper_bound,
                });
            }
            if let Err(err) = reaction.gpr() {
                issues.push(ValidationIssue::MalformedGpr {
                    reaction: reaction.id.clone(),
                    message: err.to_string(),
                });
            }
        }
        let resolvable = match objective {
            Some(id) => self.reactions.contains_key(id),
            None => !self.objective_reactions().is_empty() || self.has_biomass_reaction(),
        };
        if !resolvable {
            issues.push(ValidationIssue::UnknownObjective {
                reaction: objective.map(str::to_string),
            });
        }
        issues
    }

    fn has_biomass_reaction(&self) -> bool {
        self.reactions.values().any(|r| {
            r.id.to_lowercase().contains("biomass")
                || r.name
                    .as_ref()
                    .is_some_and(|n| n.to_lowercase().contains("biomass"))
        })
    }

    /// Summary statistics about the model
    pub fn info(&self) -> ModelInfo {
        let compartments: BTreeSet<String> = self
            .metabolites
            .values()
            .filter_map(|m| m.compartment.clone())
            .collect();
        let subsystems: BTreeSet<String> = self
            .reactions
            .values()
            .filter_map(|r| r.subsystem.clone())
            .filter(|s| !s.is_empty())
            .collect();
        ModelInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            num_reactions: self.reactions.len(),
            num_metabolites: self.metabolites.len(),
            num_genes: self.genes.len(),
            objective: self
                .objective_reactions()
                .into_iter()
                .map(|(id, _)| id.to_string())
                .collect(),
            compartments: compartments.into_iter().collect(),
            subsystems: subsystems.into_iter().collect(),
        }
    }
}

/// A violated model invariant
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationIssue {
    /// Reaction stoichiometry references a metabolite that isn't in the model
    UndeclaredMetabolite { reaction: String, metabolite: String },
    /// Reaction has lower_bound > upper_bound (or a NaN bound)
    InvalidBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// Reaction GPR couldn't be parsed (it will be treated as always active)
    MalformedGpr { reaction: String, message: String },
    /// The requested objective reaction doesn't exist, or (None) no objective can be found
    UnknownObjective { reaction: Option<String> },
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UndeclaredMetabolite {
                reaction,
                metabolite,
            } => write!(
                f,
                "reaction {} references undeclared metabolite {}",
                reaction, metabolite
            ),
            ValidationIssue::InvalidBounds {
                reaction,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "reaction {} has invalid bounds [{}, {}]",
                reaction, lower_bound, upper_bound
            ),
            ValidationIssue::MalformedGpr { reaction, message } => {
                write!(f, "reaction {} has a malformed GPR: {}", reaction, message)
            }
            ValidationIssue::UnknownObjective {
                reaction: Some(reaction),
            } => write!(f, "objective reaction {} is not in the model", reaction),
            ValidationIssue::UnknownObjective { reaction: None } => {
                write!(f, "model has no objective reaction")
            }
        }
    }
}

/// Model information/statistics
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub num_reactions: usize,
    pub num_metabolites: usize,
    pub num_genes: usize,
    /// Ids of the reactions with a nonzero objective coefficient
    pub objective: Vec<String>,
    pub compartments: Vec<String>,
    pub subsystems: Vec<String>,
}
