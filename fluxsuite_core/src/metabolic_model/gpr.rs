//! Gene Protein Reaction rules represented as an arena allocated tree, along with the boolean
//! (knockout) and numeric (expression) evaluators
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

use crate::io::gpr_parse::{parse_gpr, GprParseError};

/// Index of a node inside a [`GprTree`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Node of a GPR tree, operators refer to their operands by [`NodeId`]
#[derive(Clone, Debug, PartialEq)]
pub enum GprNode {
    /// A terminal gene node, holding the gene id
    Gene(String),
    /// All operands are required (enzyme complex)
    And(Vec<NodeId>),
    /// Any operand is sufficient (isozymes)
    Or(Vec<NodeId>),
}

/// Representation of a Gene Protein Reaction Rule as an AST
///
/// The tree is immutable once built, nodes live in a single arena and the root is
/// the last node created by the parser.
#[derive(Clone, Debug, PartialEq)]
pub struct GprTree {
    nodes: Vec<GprNode>,
    root: NodeId,
}

impl GprTree {
    pub(crate) fn from_parts(nodes: Vec<GprNode>, root: NodeId) -> Self {
        GprTree { nodes, root }
    }

    /// Parse a GPR rule
    ///
    /// Returns `Ok(None)` for an empty (or whitespace only) rule, which describes a reaction
    /// not associated with any gene.
    pub fn parse(rule: &str) -> Result<Option<GprTree>, GprParseError> {
        if rule.trim().is_empty() {
            return Ok(None);
        }
        parse_gpr(rule).map(Some)
    }

    /// Id of the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> &GprNode {
        &self.nodes[id.0]
    }

    /// Unique gene ids in the rule, in order of first appearance
    pub fn genes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut genes = Vec::new();
        self.collect_genes(self.root, &mut seen, &mut genes);
        genes
    }

    fn collect_genes<'a>(&'a self, id: NodeId, seen: &mut HashSet<&'a str>, genes: &mut Vec<&'a str>) {
        match self.node(id) {
            GprNode::Gene(g) => {
                if seen.insert(g.as_str()) {
                    genes.push(g.as_str());
                }
            }
            GprNode::And(operands) | GprNode::Or(operands) => {
                for operand in operands {
                    self.collect_genes(*operand, seen, genes);
                }
            }
        }
    }

    /// Boolean evaluation: AND requires all operands active, OR requires any
    pub fn is_active<F: Fn(&str) -> bool>(&self, gene_active: F) -> bool {
        self.eval_active(self.root, &gene_active)
    }

    fn eval_active<F: Fn(&str) -> bool>(&self, id: NodeId, gene_active: &F) -> bool {
        match self.node(id) {
            GprNode::Gene(g) => gene_active(g),
            GprNode::And(operands) => operands.iter().all(|o| self.eval_active(*o, gene_active)),
            GprNode::Or(operands) => operands.iter().any(|o| self.eval_active(*o, gene_active)),
        }
    }

    /// Numeric evaluation: AND takes the minimum operand level (a complex is limited by its
    /// scarcest subunit), OR the maximum. Genes absent from `expression` have level 1.0.
    pub fn expression_level(&self, expression: &IndexMap<String, f64>) -> f64 {
        self.eval_expression(self.root, expression)
    }

    fn eval_expression(&self, id: NodeId, expression: &IndexMap<String, f64>) -> f64 {
        match self.node(id) {
            GprNode::Gene(g) => expression.get(g).copied().unwrap_or(1.),
            GprNode::And(operands) => operands
                .iter()
                .map(|o| self.eval_expression(*o, expression))
                .fold(f64::INFINITY, f64::min),
            GprNode::Or(operands) => operands
                .iter()
                .map(|o| self.eval_expression(*o, expression))
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        self.node_to_string(self.root)
    }

    fn node_to_string(&self, id: NodeId) -> String {
        match self.node(id) {
            GprNode::Gene(g) => g.clone(),
            GprNode::And(operands) => self.join(operands, " and "),
            GprNode::Or(operands) => self.join(operands, " or "),
        }
    }

    fn join(&self, operands: &[NodeId], op: &str) -> String {
        let parts: Vec<String> = operands.iter().map(|o| self.node_to_string(*o)).collect();
        format!("({})", parts.join(op))
    }
}

impl Display for GprTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

/// Determine whether a reaction with GPR `rule` can carry flux when `knockouts` are removed
///
/// Fails soft: an empty or malformed rule is treated as active, so that a bad rule never
/// blocks the enclosing optimization.
pub fn gpr_is_active(rule: &str, knockouts: &HashSet<String>) -> bool {
    match GprTree::parse(rule) {
        Ok(Some(tree)) => tree.is_active(|g| !knockouts.contains(g)),
        Ok(None) => true,
        Err(err) => {
            tracing::warn!(
                component = "gpr",
                operation = "eval_active",
                rule,
                error = %err,
                "Malformed GPR rule, treating reaction as active"
            );
            true
        }
    }
}

/// Expression level of a reaction with GPR `rule`
///
/// Fails soft: an empty or malformed rule evaluates to 1.0.
pub fn gpr_expression(rule: &str, expression: &IndexMap<String, f64>) -> f64 {
    match GprTree::parse(rule) {
        Ok(Some(tree)) => tree.expression_level(expression),
        Ok(None) => 1.,
        Err(err) => {
            tracing::warn!(
                component = "gpr",
                operation = "eval_expression",
                rule,
                error = %err,
                "Malformed GPR rule, using expression level 1.0"
            );
            1.
        }
    }
}
