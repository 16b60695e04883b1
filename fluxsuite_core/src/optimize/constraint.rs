//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`.
    ///
    /// One sided constraints use an infinite bound on the other side.
    Inequality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `terms`: (variable id, coefficient) pairs, repeated variables are merged
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use fluxsuite_core::optimize::constraint::Constraint;
    /// // Create a constraint representing 3*x + 2*y = 6
    /// let new_constraint = Constraint::new_equality([("x", 3.0), ("y", 2.0)], 6.);
    /// assert_eq!(new_constraint.to_string(), "3*x + 2*y = 6");
    /// ```
    pub fn new_equality<I, S>(terms: I, equals: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Constraint::Equality {
            terms: Constraint::merge_into_terms(terms),
            equals,
        }
    }

    /// Create a new inequality constraint
    ///
    /// # Examples
    /// ```rust
    /// use fluxsuite_core::optimize::constraint::Constraint;
    /// // represents the inequality 2 <= 3*x + 2*y <= 6
    /// let new_constraint = Constraint::new_inequality([("x", 3.0), ("y", 2.0)], 2., 6.);
    /// ```
    pub fn new_inequality<I, S>(terms: I, lower_bound: f64, upper_bound: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Constraint::Inequality {
            terms: Constraint::merge_into_terms(terms),
            lower_bound,
            upper_bound,
        }
    }

    /// Get the terms of the constraint
    pub fn terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } => terms,
            Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Get the (lower, upper) bounds of the constraint, equal for an equality
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    /// Take (variable, coefficient) pairs and merge them into a vec of ConstraintTerms,
    /// summing the coefficients of repeated variables so each variable appears once
    fn merge_into_terms<I, S>(terms: I) -> Vec<ConstraintTerm>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut merged: IndexMap<String, f64> = IndexMap::new();
        for (variable, coefficient) in terms {
            *merged.entry(variable.into()).or_insert(0.) += coefficient;
        }
        merged
            .into_iter()
            .map(|(variable, coefficient)| ConstraintTerm {
                variable,
                coefficient,
            })
            .collect()
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals } => {
                write!(f, "{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{} <= {} <= {}",
                lower_bound,
                Self::terms_to_string(terms),
                upper_bound
            ),
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTerm {
    /// Id of the variable
    pub variable: String,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.coefficient, self.variable)
    }
}
