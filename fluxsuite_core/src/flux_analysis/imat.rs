//! iMAT
//!
//! Mixed integer formulation maximizing the number of highly expressed reactions that carry
//! flux plus the number of lowly expressed reactions that carry none.
//!
//! For a highly expressed reaction, the indicator `y_h` can only be 1 if `v_pos + v_neg >= eps`.
//! Reversible highly expressed reactions also get a direction indicator `z` with
//! `v_pos <= M z` and `v_neg <= M (1 - z)`, so a split pair cancelling to zero net flux cannot
//! satisfy `y_h`. For a lowly expressed reaction `v_pos + v_neg <= M (1 - y_l)`.
use crate::configuration::BIG_M_FLOOR;
use crate::flux_analysis::options::ImatOptions;
use crate::flux_analysis::result::{MethodDetails, MethodOutcome};
use crate::flux_analysis::stoichiometry::StoichiometricModel;
use crate::flux_analysis::{solve_optimal, AnalysisError};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::Variable;
use crate::utils::statistics::percentile;

/// Reactions split by expression, high takes precedence when both thresholds match
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionSets {
    pub high_threshold: f64,
    pub low_threshold: f64,
    pub high: Vec<usize>,
    pub low: Vec<usize>,
}

impl ExpressionSets {
    pub fn classify(levels: &[Option<f64>], options: &ImatOptions) -> Option<Self> {
        let values: Vec<f64> = levels.iter().flatten().copied().collect();
        let high_threshold = percentile(&values, options.high_percentile)?;
        let low_threshold = percentile(&values, options.low_percentile)?;
        let mut high = Vec::new();
        let mut low = Vec::new();
        for (j, level) in levels.iter().enumerate() {
            match level {
                Some(e) if *e >= high_threshold => high.push(j),
                Some(e) if *e <= low_threshold => low.push(j),
                _ => {}
            }
        }
        Some(ExpressionSets {
            high_threshold,
            low_threshold,
            high,
            low,
        })
    }
}

/// Big-M: the largest finite bound magnitude, at least `BIG_M_FLOOR`
pub fn big_m(model: &StoichiometricModel) -> f64 {
    model
        .bounds()
        .iter()
        .map(|b| b.max_magnitude())
        .filter(|m| m.is_finite())
        .fold(BIG_M_FLOOR, f64::max)
}

fn high_indicator(reaction: &str) -> String {
    format!("imat_high_{}", reaction)
}

fn direction_indicator(reaction: &str) -> String {
    format!("imat_direction_{}", reaction)
}

fn low_indicator(reaction: &str) -> String {
    format!("imat_low_{}", reaction)
}

pub fn formulate(
    model: &StoichiometricModel,
    sets: &ExpressionSets,
    epsilon: f64,
) -> Result<Problem, AnalysisError> {
    let mut problem = model.flux_problem(model.bounds(), ObjectiveSense::Maximize)?;
    let m = big_m(model);

    for j in &sets.high {
        let reaction = model.reaction_id(*j);
        let y = high_indicator(reaction);
        problem.add_variable(Variable::binary(&y))?;
        let [forward, reverse] = model.total_flux_terms(*j, 1.);
        problem.add_new_inequality_constraint(
            &format!("{}_activity", y),
            [forward, reverse, (y.as_str(), -epsilon)],
            0.,
            f64::INFINITY,
        )?;
        problem.add_new_linear_objective_term(&y, 1.)?;

        let bounds = model.bounds()[*j];
        if bounds.lower < 0. && bounds.upper > 0. {
            let z = direction_indicator(reaction);
            problem.add_variable(Variable::binary(&z))?;
            // v_pos - M z <= 0
            problem.add_new_inequality_constraint(
                &format!("{}_forward", z),
                [(model.forward_variable(*j), 1.), (z.as_str(), -m)],
                f64::NEG_INFINITY,
                0.,
            )?;
            // v_neg + M z <= M
            problem.add_new_inequality_constraint(
                &format!("{}_reverse", z),
                [(model.reverse_variable(*j), 1.), (z.as_str(), m)],
                f64::NEG_INFINITY,
                m,
            )?;
        }
    }

    for j in &sets.low {
        let y = low_indicator(model.reaction_id(*j));
        problem.add_variable(Variable::binary(&y))?;
        let [forward, reverse] = model.total_flux_terms(*j, 1.);
        problem.add_new_inequality_constraint(
            &format!("{}_inactivity", y),
            [forward, reverse, (y.as_str(), m)],
            f64::NEG_INFINITY,
            m,
        )?;
        problem.add_new_linear_objective_term(&y, 1.)?;
    }
    tracing::debug!(
        component = "imat",
        operation = "formulate",
        high = sets.high.len(),
        low = sets.low.len(),
        big_m = m,
        "Formulated indicator problem"
    );
    Ok(problem)
}

pub fn run(
    model: &StoichiometricModel,
    options: &ImatOptions,
    solver: &dyn Solver,
) -> Result<MethodOutcome, AnalysisError> {
    let levels = model.expression_levels(&options.expression);
    let sets = ExpressionSets::classify(&levels, options).ok_or_else(|| {
        AnalysisError::InvalidOption(
            "iMAT needs at least one reaction with a gene reaction rule".to_string(),
        )
    })?;
    let problem = formulate(model, &sets, options.epsilon)?;
    let solution = solve_optimal(solver, &problem, "imat")?;
    let fluxes = model.net_fluxes(&solution);

    let satisfied = |id: String| solution.value(&id).is_some_and(|y| y > 0.5);
    let consistency_score = sets
        .high
        .iter()
        .filter(|j| satisfied(high_indicator(model.reaction_id(**j))))
        .chain(
            sets.low
                .iter()
                .filter(|j| satisfied(low_indicator(model.reaction_id(**j)))),
        )
        .count() as f64;
    let ids = |indices: &[usize]| -> Vec<String> {
        indices
            .iter()
            .map(|j| model.reaction_id(*j).to_string())
            .collect()
    };
    Ok(
        MethodOutcome::optimal(consistency_score, fluxes).with_details(MethodDetails::Imat {
            high_threshold: sets.high_threshold,
            low_threshold: sets.low_threshold,
            high_reactions: ids(&sets.high),
            low_reactions: ids(&sets.low),
            consistency_score,
        }),
    )
}
