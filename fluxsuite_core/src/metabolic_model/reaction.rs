//! This module provides a struct for representing reactions
use crate::configuration;
use crate::io::gpr_parse::GprParseError;
use crate::metabolic_model::gpr::GprTree;
use crate::utils::hashing::hash_as_hex_string;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active, empty when the reaction
    /// is not associated with any gene
    #[builder(setter(into), default = "String::new()")]
    pub gene_reaction_rule: String,
    /// Lower flux bound
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Weight of this reaction's flux in the model objective
    #[builder(default = "0.")]
    pub objective_coefficient: f64,
    /// Reaction subsystem
    #[builder(setter(into, strip_option), default = "None")]
    pub subsystem: Option<String>,
}

impl ReactionBuilder {
    /// Add a single metabolite to the stoichiometry
    pub fn metabolite(&mut self, id: &str, coefficient: f64) -> &mut Self {
        self.metabolites
            .get_or_insert_with(IndexMap::new)
            .insert(id.to_string(), coefficient);
        self
    }
}

impl Reaction {
    /// Determine the id to be associated with the forward reaction in the optimization problem
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        forward_id(&self.id)
    }

    /// Determine the id to be associated with the reverse reaction in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        reverse_id(&self.id)
    }

    /// Current flux bounds of the reaction
    pub fn bounds(&self) -> FluxBounds {
        FluxBounds::new(self.lower_bound, self.upper_bound)
    }

    /// Parse the gene reaction rule, `None` if the reaction has no rule
    pub fn gpr(&self) -> Result<Option<GprTree>, GprParseError> {
        GprTree::parse(&self.gene_reaction_rule)
    }

    /// A boundary reaction exchanges a single metabolite with the environment
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Whether the reaction can carry flux in both directions
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }
}

pub(crate) fn forward_id(reaction_id: &str) -> String {
    format!("{}_forward", reaction_id)
}

pub(crate) fn reverse_id(reaction_id: &str) -> String {
    format!("{}_reverse_{}", reaction_id, hash_as_hex_string(&reaction_id))
}

/// Lower and upper bound on the net flux through a reaction
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FluxBounds {
    pub lower: f64,
    pub upper: f64,
}

impl FluxBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        FluxBounds { lower, upper }
    }

    /// Bounds of a reaction that can't carry flux
    pub fn blocked() -> Self {
        FluxBounds::new(0., 0.)
    }

    pub fn is_valid(&self) -> bool {
        self.lower <= self.upper
    }

    /// Scale both bounds by a nonnegative factor
    pub fn scaled(&self, factor: f64) -> Self {
        FluxBounds::new(self.lower * factor, self.upper * factor)
    }

    /// Largest magnitude of either bound
    pub fn max_magnitude(&self) -> f64 {
        self.lower.abs().max(self.upper.abs())
    }

    /// Determine the lower bound of the variable associated with the forward reaction
    pub(crate) fn forward_lower(&self) -> f64 {
        self.lower.max(0.)
    }

    /// Determine the upper bound of the variable associated with the forward reaction
    pub(crate) fn forward_upper(&self) -> f64 {
        self.upper.max(0.)
    }

    /// Determine the lower bound of the variable associated with the reverse reaction
    pub(crate) fn reverse_lower(&self) -> f64 {
        (-self.upper).max(0.)
    }

    /// Determine the upper bound of the variable associated with the reverse reaction
    pub(crate) fn reverse_upper(&self) -> f64 {
        (-self.lower).max(0.)
    }

    /// Whether flux can run in both directions
    pub(crate) fn is_reversible(&self) -> bool {
        self.lower < 0. && self.upper > 0.
    }
}
