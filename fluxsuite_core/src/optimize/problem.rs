//! Provides struct representing an optimization problem
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::variable::{Variable, VariableType};
use indexmap::IndexMap;
use thiserror::Error;

/// An optimization problem
///
/// Variables and constraints are owned by the problem and referenced by id, every
/// id used by a constraint or an objective term must belong to a variable already
/// added to the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    // endregion Creation Functions

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn objective_sense(&self) -> ObjectiveSense {
        self.objective.sense()
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
    // endregion Accessors

    // region Update Objective Sense
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        variable.index = self.variables.len();
        if variable.variable_type != VariableType::Continuous {
            self.problem_type = match self.problem_type {
                ProblemType::LinearContinuous => ProblemType::LinearMixedInteger,
                ProblemType::QuadraticContinuous => ProblemType::QuadraticMixedInteger,
                other => other,
            };
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let mut new_var = Variable::continuous(id, lower_bound, upper_bound);
        new_var.name = name.map(|n| n.to_string());
        new_var.variable_type = variable_type;
        self.add_variable(new_var)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, id: &str, constraint: Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        self.validate_constraint(id, &constraint)?;
        self.constraints.insert(id.to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the problem
    ///
    /// # Examples
    /// ```rust
    /// use fluxsuite_core::optimize::problem::Problem;
    /// use fluxsuite_core::optimize::objective::ObjectiveSense;
    /// use fluxsuite_core::optimize::variable::VariableType;
    /// let mut problem = Problem::new(ObjectiveSense::Maximize);
    /// problem.add_new_variable("x", None, VariableType::Continuous, 0., 10.).unwrap();
    /// problem.add_new_variable("y", None, VariableType::Continuous, 0., 10.).unwrap();
    /// problem.add_new_equality_constraint("sum", [("x", 1.), ("y", 1.)], 5.).unwrap();
    /// assert!(problem.add_new_equality_constraint("bad", [("z", 1.)], 5.).is_err());
    /// ```
    pub fn add_new_equality_constraint<I, S>(
        &mut self,
        id: &str,
        terms: I,
        equals: f64,
    ) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.add_constraint(id, Constraint::new_equality(terms, equals))
    }

    /// Create a new inequality constraint and add it to the problem
    pub fn add_new_inequality_constraint<I, S>(
        &mut self,
        id: &str,
        terms: I,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.add_constraint(
            id,
            Constraint::new_inequality(terms, lower_bound, upper_bound),
        )
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        self.validate_objective_term(&objective_term)?;
        if let ObjectiveTerm::Quadratic { .. } = &objective_term {
            self.problem_type = match self.problem_type {
                ProblemType::LinearContinuous => ProblemType::QuadraticContinuous,
                ProblemType::LinearMixedInteger => ProblemType::QuadraticMixedInteger,
                other => other,
            };
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new_linear(variable_id, coefficient))
    }

    /// Add a new quadratic term to the objective using the variable ids
    pub fn add_new_quadratic_objective_term(
        &mut self,
        variable1: &str,
        variable2: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new_quadratic(
            variable1,
            variable2,
            coefficient,
        ))
    }
    // endregion Adding Objective Terms

    // region Remove Objective Terms
    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
        self.fix_problem_type();
    }
    // endregion Remove Objective Terms

    // region Validation Functions
    /// Check that the whole problem is well formed
    ///
    /// Every variable has valid bounds, every constraint and objective term references declared
    /// variables with finite coefficients.
    pub fn validate(&self) -> Result<(), ProblemError> {
        for variable in self.variables.values() {
            if !(variable.lower_bound <= variable.upper_bound) {
                return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
            }
        }
        for (id, constraint) in &self.constraints {
            self.validate_constraint(id, constraint)?;
        }
        for term in self.objective.terms() {
            self.validate_objective_term(term)?;
        }
        Ok(())
    }

    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        if !(variable.lower_bound <= variable.upper_bound) {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint is valid for this Problem
    fn validate_constraint(&self, id: &str, constraint: &Constraint) -> Result<(), ProblemError> {
        let (lower_bound, upper_bound) = constraint.bounds();
        if lower_bound.is_nan() || upper_bound.is_nan() || lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
        }
        for term in constraint.terms() {
            if !self.variables.contains_key(&term.variable) {
                return Err(ProblemError::NonExistentVariablesInConstraint(
                    id.to_string(),
                ));
            }
            if !term.coefficient.is_finite() {
                return Err(ProblemError::NonFiniteCoefficient(id.to_string()));
            }
        }
        Ok(())
    }

    /// Check that an objective term is valid for this Problem
    fn validate_objective_term(&self, objective_term: &ObjectiveTerm) -> Result<(), ProblemError> {
        let all_present = match objective_term {
            ObjectiveTerm::Quadratic { var1, var2, .. } => {
                self.variables.contains_key(var1) && self.variables.contains_key(var2)
            }
            ObjectiveTerm::Linear { var, .. } => self.variables.contains_key(var),
        };
        if !all_present {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        if !objective_term.coefficient().is_finite() {
            return Err(ProblemError::NonFiniteCoefficient("objective".to_string()));
        }
        Ok(())
    }
    // endregion Validation Functions

    // region Fix Problem Functions
    fn fix_problem_type(&mut self) {
        let integer_variables = self.has_integer_variables();
        let quadratic_objective = self.has_quadratic_objective_terms();
        self.problem_type = match (integer_variables, quadratic_objective) {
            (true, true) => ProblemType::QuadraticMixedInteger,
            (false, true) => ProblemType::QuadraticContinuous,
            (true, false) => ProblemType::LinearMixedInteger,
            (false, false) => ProblemType::LinearContinuous,
        }
    }
    // endregion Fix Problem Functions

    // region Check Problem
    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|var| var.variable_type != VariableType::Continuous)
    }

    pub fn has_quadratic_objective_terms(&self) -> bool {
        self.objective.contains_quadratic()
    }

    /// Value of the objective for the given variable values
    pub fn evaluate_objective(&self, values: &IndexMap<String, f64>) -> f64 {
        self.objective.evaluate(values)
    }
    // endregion Check Problem
}

/// Types of optimization problems
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with quadratic objective, linear constraints, and continuous variables
    QuadraticContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
    /// Problem with a quadratic objective function, and some integer variables
    ///
    /// # Note:
    /// This problem type is not currently supported by any of the solvers
    QuadraticMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable: {0}")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Variable {0} has lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint: {0}")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Constraint {0} has lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Constraint {0} references variables not in the problem")]
    NonExistentVariablesInConstraint(String),
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the problem")]
    NonExistentVariablesInObjective,
    /// A NaN or infinite coefficient in a constraint or the objective
    #[error("Non finite coefficient in {0}")]
    NonFiniteCoefficient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new(ObjectiveSense::Maximize);
        assert_eq!(max_problem.objective_sense(), ObjectiveSense::Maximize);
        assert_eq!(max_problem.num_variables(), 0);
        assert_eq!(max_problem.problem_type(), ProblemType::LinearContinuous);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective_sense(), ObjectiveSense::Minimize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        let var = problem.variable("x").expect("Variable not added to problem");
        assert_eq!(var.variable_type, VariableType::Continuous);
        assert_eq!(var.index(), 0);
        assert!((var.lower_bound - 64.0).abs() < 1e-25);
        assert!((var.upper_bound - 100.0).abs() < 1e-25);
        assert_eq!(problem.problem_type(), ProblemType::LinearContinuous);

        problem
            .add_new_variable("y", Some("why"), VariableType::Integer, 64., 100.)
            .unwrap();
        let var = problem.variable("y").expect("Variable not added to problem");
        assert_eq!(var.index(), 1);
        assert_eq!(var.name.as_deref(), Some("why"));
        assert_eq!(problem.problem_type(), ProblemType::LinearMixedInteger);

        let res = problem.add_new_variable("x", None, VariableType::Continuous, 0., 1.);
        assert_eq!(
            res,
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 100., 64.);
        assert_eq!(res, Err(ProblemError::InvalidVariableBounds("x".to_string())));
        let res = problem.add_new_variable("y", None, VariableType::Continuous, f64::NAN, 64.);
        assert!(res.is_err());
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        problem
            .add_new_equality_constraint("test_constraint", [("x", 2.), ("y", 3.)], 200.)
            .unwrap();
        match problem.constraints().get("test_constraint").unwrap() {
            Constraint::Equality { equals, .. } => assert!((equals - 200.).abs() < 1e-25),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        // Duplicate id is rejected
        let res = problem.add_new_inequality_constraint(
            "test_constraint",
            [("x", 2.), ("y", 3.)],
            100.,
            200.,
        );
        assert!(matches!(res, Err(ProblemError::ConstraintAlreadyExists(_))));

        problem
            .add_new_inequality_constraint("range", [("x", 2.), ("y", 3.)], 100., 200.)
            .unwrap();
        assert_eq!(problem.num_constraints(), 2);
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        let res = problem.add_new_inequality_constraint("bad_bounds", [("x", 2.)], 200., 100.);
        assert!(matches!(res, Err(ProblemError::InvalidConstraintBounds(_))));

        let res = problem.add_new_equality_constraint("missing_var", [("x", 1.), ("z", 1.)], 0.);
        assert!(matches!(
            res,
            Err(ProblemError::NonExistentVariablesInConstraint(_))
        ));

        let res = problem.add_new_equality_constraint("nan_coef", [("x", f64::NAN)], 0.);
        assert!(matches!(res, Err(ProblemError::NonFiniteCoefficient(_))));
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn objective_terms_and_problem_type() {
        let mut problem = Problem::new(ObjectiveSense::Minimize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        assert_eq!(
            problem.add_new_linear_objective_term("nope", 1.),
            Err(ProblemError::NonExistentVariablesInObjective)
        );
        problem.add_new_quadratic_objective_term("x", "x", 1.).unwrap();
        assert_eq!(problem.problem_type(), ProblemType::QuadraticContinuous);
        problem.remove_all_objective_terms();
        assert_eq!(problem.problem_type(), ProblemType::LinearContinuous);

        problem.add_variable(Variable::binary("b")).unwrap();
        assert_eq!(problem.problem_type(), ProblemType::LinearMixedInteger);
        problem.add_new_linear_objective_term("b", 3.).unwrap();
        let values: IndexMap<String, f64> = [("b".to_string(), 1.)].into_iter().collect();
        assert_eq!(problem.evaluate_objective(&values), 3.);
    }
}
