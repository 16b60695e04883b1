//! Provides struct for representing an optimization problem's objective

use indexmap::IndexMap;

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Current sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Terms of the objective, in insertion order
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a new Linear term to the objective
    pub fn add_linear_term(&mut self, variable: &str, coefficient: f64) {
        self.terms
            .push(ObjectiveTerm::new_linear(variable, coefficient));
    }

    /// Add a new Quadratic term to the objective
    pub fn add_quadratic_term(&mut self, variable1: &str, variable2: &str, coefficient: f64) {
        self.terms
            .push(ObjectiveTerm::new_quadratic(variable1, variable2, coefficient));
    }

    /// Remove all terms from the objective, keeping the sense
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Whether any term of the objective is quadratic
    pub fn contains_quadratic(&self) -> bool {
        self.terms
            .iter()
            .any(|t| matches!(t, ObjectiveTerm::Quadratic { .. }))
    }

    /// Evaluate the objective for the given variable values
    ///
    /// Variables missing from `values` are taken to be 0.
    pub fn evaluate(&self, values: &IndexMap<String, f64>) -> f64 {
        let value_of = |id: &str| values.get(id).copied().unwrap_or(0.);
        self.terms
            .iter()
            .map(|term| match term {
                ObjectiveTerm::Linear { var, coef } => coef * value_of(var),
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    coef * value_of(var1) * value_of(var2)
                }
            })
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

// region Objective Terms
/// A term in the objective
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectiveTerm {
    /// A quadratic term in the objective, `coef * var1 * var2`
    Quadratic {
        /// Id of the first variable in the objective term
        var1: String,
        /// Id of the second variable in the objective term
        var2: String,
        /// Coefficient for quadratic term
        coef: f64,
    },
    /// A linear term in the objective
    Linear {
        /// Id of the variable in objective term
        var: String,
        /// Coefficient for linear term
        coef: f64,
    },
}

impl ObjectiveTerm {
    /// Create a new quadratic objective term
    pub fn new_quadratic(var1: &str, var2: &str, coef: f64) -> Self {
        ObjectiveTerm::Quadratic {
            var1: var1.to_string(),
            var2: var2.to_string(),
            coef,
        }
    }

    /// Create a new linear objective term
    pub fn new_linear(var: &str, coef: f64) -> Self {
        ObjectiveTerm::Linear {
            var: var.to_string(),
            coef,
        }
    }

    /// Coefficient of the term
    pub fn coefficient(&self) -> f64 {
        match self {
            ObjectiveTerm::Quadratic { coef, .. } | ObjectiveTerm::Linear { coef, .. } => *coef,
        }
    }
}

// endregion Objective Terms
