//! Builds the stoichiometric matrix, effective flux bounds and objective of a model
//!
//! Every reaction becomes a pair of nonnegative variables `(v_pos, v_neg)` with net flux
//! `v = v_pos - v_neg`, and every metabolite with at least one nonzero coefficient becomes a
//! mass balance equality `S v = 0`.
use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use nalgebra::DMatrix;

use crate::configuration::snap_to_zero;
use crate::flux_analysis::options::{BoundOverride, SolveRequest};
use crate::flux_analysis::AnalysisError;
use crate::metabolic_model::gpr::{gpr_expression, gpr_is_active};
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{forward_id, reverse_id, FluxBounds};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// The parts of a request that shape the stoichiometric model
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildOptions {
    /// Bound overrides keyed by reaction id
    pub constraints: IndexMap<String, BoundOverride>,
    /// Genes to knock out
    pub knockouts: Vec<String>,
    /// Single objective reaction replacing the model objective
    pub objective: Option<String>,
}

impl BuildOptions {
    pub fn from_request(request: &SolveRequest) -> Self {
        BuildOptions {
            constraints: request.constraints.clone(),
            knockouts: request.knockouts.clone(),
            objective: request.objective.clone(),
        }
    }

    /// The same options with every knockout removed
    pub fn without_knockouts(&self) -> Self {
        BuildOptions {
            knockouts: Vec::new(),
            ..self.clone()
        }
    }
}

/// Matrix form of a model, ready to be formulated into optimization problems
#[derive(Clone, Debug, PartialEq)]
pub struct StoichiometricModel {
    reactions: IndexSet<String>,
    metabolites: IndexSet<String>,
    /// Metabolites x reactions
    stoichiometry: DMatrix<f64>,
    /// Effective bounds after overrides and knockouts
    bounds: Vec<FluxBounds>,
    /// (reaction index, coefficient) pairs of the objective
    objective: Vec<(usize, f64)>,
    gene_rules: Vec<String>,
    genes: Vec<String>,
    /// Genes knocked out by the build options
    gene_knockouts: HashSet<String>,
    knocked_out: Vec<usize>,
    /// (forward, reverse) variable ids per reaction
    variable_ids: Vec<(String, String)>,
}

impl StoichiometricModel {
    /// Build the stoichiometric model
    ///
    /// Bound overrides are applied first, then knockouts force reactions whose GPR evaluates
    /// to false to zero flux, and finally the objective is resolved: the requested reaction,
    /// else the reactions with a nonzero objective coefficient, else the first reaction whose id
    /// or name contains "biomass".
    pub fn build(model: &Model, options: &BuildOptions) -> Result<Self, AnalysisError> {
        let reactions: IndexSet<String> = model.reactions.keys().cloned().collect();
        let mut metabolites: IndexSet<String> = model.metabolites.keys().cloned().collect();
        for reaction in model.reactions.values() {
            for metabolite in reaction.metabolites.keys() {
                if metabolites.insert(metabolite.clone()) {
                    tracing::warn!(
                        component = "stoichiometry",
                        operation = "build",
                        reaction = %reaction.id,
                        metabolite = %metabolite,
                        "Reaction references an undeclared metabolite, adding it"
                    );
                }
            }
        }

        let mut stoichiometry = DMatrix::zeros(metabolites.len(), reactions.len());
        for (j, reaction) in model.reactions.values().enumerate() {
            for (metabolite, coefficient) in &reaction.metabolites {
                if let Some(i) = metabolites.get_index_of(metabolite) {
                    stoichiometry[(i, j)] += coefficient;
                }
            }
        }

        let mut bounds: Vec<FluxBounds> = model.reactions.values().map(|r| r.bounds()).collect();
        for (reaction, bound_override) in &options.constraints {
            let Some(j) = reactions.get_index_of(reaction) else {
                tracing::warn!(
                    component = "stoichiometry",
                    operation = "apply_overrides",
                    reaction = %reaction,
                    "Bound override for unknown reaction ignored"
                );
                continue;
            };
            let lower = bound_override.lb.unwrap_or(bounds[j].lower);
            let upper = bound_override.ub.unwrap_or(bounds[j].upper);
            let overridden = FluxBounds::new(lower, upper);
            if !overridden.is_valid() {
                return Err(AnalysisError::InvalidBounds {
                    reaction: reaction.clone(),
                    lower,
                    upper,
                });
            }
            bounds[j] = overridden;
        }

        let gene_rules: Vec<String> = model
            .reactions
            .values()
            .map(|r| r.gene_reaction_rule.clone())
            .collect();
        let genes: Vec<String> = model.genes.keys().cloned().collect();

        let objective = Self::resolve_objective(model, &reactions, options.objective.as_deref())?;
        let variable_ids = reactions
            .iter()
            .map(|id| (forward_id(id), reverse_id(id)))
            .collect();

        let mut built = StoichiometricModel {
            reactions,
            metabolites,
            stoichiometry,
            bounds,
            objective,
            gene_rules,
            genes,
            gene_knockouts: options.knockouts.iter().cloned().collect(),
            knocked_out: Vec::new(),
            variable_ids,
        };

        if !options.knockouts.is_empty() {
            for gene in &options.knockouts {
                if !model.genes.contains_key(gene) {
                    tracing::warn!(
                        component = "stoichiometry",
                        operation = "apply_knockouts",
                        gene = %gene,
                        "Knockout of a gene not in the model"
                    );
                }
            }
            let knocked_out = built.reactions_disabled_by(&HashSet::new());
            for j in &knocked_out {
                built.bounds[*j] = FluxBounds::blocked();
            }
            built.knocked_out = knocked_out;
        }

        tracing::debug!(
            component = "stoichiometry",
            operation = "build",
            reactions = built.num_reactions(),
            metabolites = built.num_metabolites(),
            knocked_out = built.knocked_out.len(),
            objective_terms = built.objective.len(),
            "Built stoichiometric model"
        );
        Ok(built)
    }

    fn resolve_objective(
        model: &Model,
        reactions: &IndexSet<String>,
        requested: Option<&str>,
    ) -> Result<Vec<(usize, f64)>, AnalysisError> {
        if let Some(requested) = requested {
            return match reactions.get_index_of(requested) {
                Some(j) => Ok(vec![(j, 1.)]),
                None => Err(AnalysisError::UnknownObjective(requested.to_string())),
            };
        }
        let from_coefficients: Vec<(usize, f64)> = model
            .reactions
            .values()
            .enumerate()
            .filter(|(_, r)| r.objective_coefficient != 0.)
            .map(|(j, r)| (j, r.objective_coefficient))
            .collect();
        if !from_coefficients.is_empty() {
            return Ok(from_coefficients);
        }
        let biomass = model.reactions.values().position(|r| {
            r.id.to_lowercase().contains("biomass")
                || r.name
                    .as_ref()
                    .is_some_and(|n| n.to_lowercase().contains("biomass"))
        });
        Ok(biomass.map(|j| vec![(j, 1.)]).unwrap_or_default())
    }

    // region Accessors
    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn num_metabolites(&self) -> usize {
        self.metabolites.len()
    }

    pub fn reaction_ids(&self) -> impl Iterator<Item = &str> {
        self.reactions.iter().map(|r| r.as_str())
    }

    pub fn reaction_id(&self, index: usize) -> &str {
        &self.reactions[index]
    }

    pub fn reaction_index(&self, id: &str) -> Option<usize> {
        self.reactions.get_index_of(id)
    }

    pub fn metabolite_ids(&self) -> impl Iterator<Item = &str> {
        self.metabolites.iter().map(|m| m.as_str())
    }

    /// Metabolites x reactions stoichiometric matrix
    pub fn stoichiometry(&self) -> &DMatrix<f64> {
        &self.stoichiometry
    }

    /// Effective flux bounds, indexed like the reactions
    pub fn bounds(&self) -> &[FluxBounds] {
        &self.bounds
    }

    pub fn objective(&self) -> &[(usize, f64)] {
        &self.objective
    }

    /// The objective, or an error if none could be resolved
    pub fn require_objective(&self) -> Result<&[(usize, f64)], AnalysisError> {
        if self.objective.is_empty() {
            Err(AnalysisError::NoObjective)
        } else {
            Ok(&self.objective)
        }
    }

    /// The growth reaction, the first reaction of the objective
    pub fn objective_reaction(&self) -> Option<usize> {
        self.objective.first().map(|(j, _)| *j)
    }

    pub fn gene_rule(&self, index: usize) -> &str {
        &self.gene_rules[index]
    }

    pub fn has_gene_rule(&self, index: usize) -> bool {
        !self.gene_rules[index].trim().is_empty()
    }

    /// Genes of the model, in model order
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// Reactions forced to zero flux by the knockouts of the build options
    pub fn knocked_out_reactions(&self) -> Vec<&str> {
        self.knocked_out
            .iter()
            .map(|j| self.reactions[*j].as_str())
            .collect()
    }

    pub fn forward_variable(&self, index: usize) -> &str {
        &self.variable_ids[index].0
    }

    pub fn reverse_variable(&self, index: usize) -> &str {
        &self.variable_ids[index].1
    }
    // endregion Accessors

    // region Gene Evaluation
    /// Reactions with a GPR that evaluates to false once `knockouts` are removed on top of the
    /// genes already knocked out
    pub fn reactions_disabled_by(&self, knockouts: &HashSet<String>) -> Vec<usize> {
        let removed: HashSet<String> = self.gene_knockouts.union(knockouts).cloned().collect();
        (0..self.num_reactions())
            .filter(|j| self.has_gene_rule(*j) && !gpr_is_active(&self.gene_rules[*j], &removed))
            .collect()
    }

    /// Effective bounds with `knockouts` applied on top of the current bounds
    pub fn bounds_with_knockouts(&self, knockouts: &HashSet<String>) -> Vec<FluxBounds> {
        let mut bounds = self.bounds.clone();
        for j in self.reactions_disabled_by(knockouts) {
            bounds[j] = FluxBounds::blocked();
        }
        bounds
    }

    /// Expression level of each reaction, None for reactions without a GPR
    pub fn expression_levels(&self, expression: &IndexMap<String, f64>) -> Vec<Option<f64>> {
        (0..self.num_reactions())
            .map(|j| {
                if self.has_gene_rule(j) {
                    Some(gpr_expression(&self.gene_rules[j], expression))
                } else {
                    None
                }
            })
            .collect()
    }
    // endregion Gene Evaluation

    // region Problem Construction
    /// `[(v_pos, coefficient), (v_neg, -coefficient)]`, the terms of `coefficient * v`
    pub fn flux_terms(&self, index: usize, coefficient: f64) -> [(&str, f64); 2] {
        [
            (self.forward_variable(index), coefficient),
            (self.reverse_variable(index), -coefficient),
        ]
    }

    /// `[(v_pos, coefficient), (v_neg, coefficient)]`, the terms of `coefficient * |v|`
    /// when at most one direction carries flux
    pub fn total_flux_terms(&self, index: usize, coefficient: f64) -> [(&str, f64); 2] {
        [
            (self.forward_variable(index), coefficient),
            (self.reverse_variable(index), coefficient),
        ]
    }

    /// Terms of the objective expression `sum c_r v_r`
    pub fn objective_terms(&self) -> Vec<(&str, f64)> {
        self.objective
            .iter()
            .flat_map(|(j, c)| self.flux_terms(*j, *c))
            .collect()
    }

    /// Create a problem with the split flux variables and the mass balance constraints, using
    /// `bounds` in place of the effective bounds
    ///
    /// The objective is left empty.
    pub fn flux_problem(
        &self,
        bounds: &[FluxBounds],
        sense: ObjectiveSense,
    ) -> Result<Problem, ProblemError> {
        let mut problem = Problem::new(sense);
        for (j, bound) in bounds.iter().enumerate().take(self.num_reactions()) {
            problem.add_new_variable(
                self.forward_variable(j),
                None,
                VariableType::Continuous,
                bound.forward_lower(),
                bound.forward_upper(),
            )?;
            problem.add_new_variable(
                self.reverse_variable(j),
                None,
                VariableType::Continuous,
                bound.reverse_lower(),
                bound.reverse_upper(),
            )?;
        }
        for (i, metabolite) in self.metabolites.iter().enumerate() {
            let row = self.stoichiometry.row(i);
            let terms: Vec<(&str, f64)> = row
                .iter()
                .enumerate()
                .filter(|(_, s)| **s != 0.)
                .flat_map(|(j, s)| self.flux_terms(j, *s))
                .collect();
            if terms.is_empty() {
                continue;
            }
            problem.add_new_equality_constraint(&format!("{}_balance", metabolite), terms, 0.)?;
        }
        Ok(problem)
    }

    /// Add `sum c_r v_r >= lower_bound` to the problem
    pub fn add_objective_floor(
        &self,
        problem: &mut Problem,
        lower_bound: f64,
    ) -> Result<(), ProblemError> {
        problem.add_new_inequality_constraint(
            "objective_floor",
            self.objective_terms(),
            lower_bound,
            f64::INFINITY,
        )
    }

    /// Set the objective of the problem to `sum c_r v_r`
    pub fn set_flux_objective(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        problem.remove_all_objective_terms();
        for (variable, coefficient) in self.objective_terms() {
            problem.add_new_linear_objective_term(variable, coefficient)?;
        }
        Ok(())
    }
    // endregion Problem Construction

    // region Solution Interpretation
    /// Net flux of every reaction, with solver noise snapped to zero
    pub fn net_fluxes(&self, solution: &ProblemSolution) -> Vec<f64> {
        (0..self.num_reactions())
            .map(|j| {
                let forward = solution.value(self.forward_variable(j)).unwrap_or(0.);
                let reverse = solution.value(self.reverse_variable(j)).unwrap_or(0.);
                snap_to_zero(forward - reverse)
            })
            .collect()
    }

    /// Sum of c_r v_r over the objective, snapped like the fluxes
    pub fn objective_value(&self, fluxes: &[f64]) -> f64 {
        snap_to_zero(self.objective.iter().map(|(j, c)| c * fluxes[*j]).sum())
    }

    /// Net secretion of a metabolite through boundary reactions, negative for uptake
    ///
    /// A boundary reaction has a single metabolite in its stoichiometry.
    pub fn net_secretion(&self, metabolite: &str, fluxes: &[f64]) -> f64 {
        let Some(i) = self.metabolites.get_index_of(metabolite) else {
            return 0.;
        };
        (0..self.num_reactions())
            .filter(|j| self.stoichiometry.column(*j).iter().filter(|s| **s != 0.).count() == 1)
            .map(|j| -self.stoichiometry[(i, j)] * fluxes[j])
            .sum()
    }
    // endregion Solution Interpretation
}
