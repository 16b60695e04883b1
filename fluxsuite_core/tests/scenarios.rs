mod common;

use std::collections::HashSet;

use fluxsuite_core::configuration::{
    snap_to_zero, ACTIVITY_EPSILON, FLUX_TOLERANCE, OBJECTIVE_TOLERANCE, SOLVER_NOISE_TOLERANCE,
};
use fluxsuite_core::flux_analysis::options::{Method, RequestOptions, SolveRequest};
use fluxsuite_core::flux_analysis::pfba;
use fluxsuite_core::flux_analysis::result::{MethodDetails, ResultStatus};
use fluxsuite_core::flux_analysis::stoichiometry::{BuildOptions, StoichiometricModel};
use fluxsuite_core::metabolic_model::gpr::gpr_is_active;
use fluxsuite_core::optimize::solvers::microlp::MicrolpSolver;
use fluxsuite_core::optimize::solvers::Solver;

use common::{assert_close, chain, dispatcher, respiration, reversible};

#[test]
fn chain_is_limited_by_tightest_bound() {
    let result = dispatcher()
        .run(&chain(), &SolveRequest::new(Method::Fba))
        .unwrap();
    assert_eq!(result.status, ResultStatus::Optimal);
    assert_close(result.objective_value.unwrap(), 10., OBJECTIVE_TOLERANCE);
    assert_close(result.growth_rate.unwrap(), 10., OBJECTIVE_TOLERANCE);
    assert_eq!(result.fluxes.len(), 3);
}

#[test]
fn fba_is_deterministic() {
    let dispatcher = dispatcher();
    let model = respiration();
    let request = SolveRequest::new(Method::Fba);
    let first = dispatcher.run(&model, &request).unwrap();
    for _ in 0..3 {
        let again = dispatcher.run(&model, &request).unwrap();
        assert_close(
            again.objective_value.unwrap(),
            first.objective_value.unwrap(),
            OBJECTIVE_TOLERANCE,
        );
    }
}

#[test]
fn sole_and_term_knockout_blocks_reaction() {
    let request = SolveRequest::new(Method::Fba).with_knockout("g2");
    let stoichiometric =
        StoichiometricModel::build(&chain(), &BuildOptions::from_request(&request)).unwrap();
    let j = stoichiometric.reaction_index("A_TO_B").unwrap();
    assert_eq!(stoichiometric.bounds()[j].lower, 0.);
    assert_eq!(stoichiometric.bounds()[j].upper, 0.);
    assert_eq!(stoichiometric.knocked_out_reactions(), vec!["A_TO_B"]);

    let result = dispatcher().run(&chain(), &request).unwrap();
    assert_eq!(result.status, ResultStatus::Optimal);
    assert_eq!(result.fluxes["A_TO_B"], 0.);
    assert_eq!(result.growth_rate, Some(0.));
}

#[test]
fn pfba_is_parsimonious() {
    let dispatcher = dispatcher();
    let model = respiration();
    let fba = dispatcher
        .run(&model, &SolveRequest::new(Method::Fba))
        .unwrap();
    let pfba = dispatcher
        .run(&model, &SolveRequest::new(Method::Pfba))
        .unwrap();
    assert_eq!(pfba.status, ResultStatus::Optimal);
    let fba_total: f64 = fba.fluxes.values().map(|v| v.abs()).sum();
    let pfba_total: f64 = pfba.fluxes.values().map(|v| v.abs()).sum();
    assert!(pfba_total <= fba_total + FLUX_TOLERANCE);
    assert_close(pfba.objective_value.unwrap(), pfba_total, 1e-6);
    match pfba.details.as_ref().unwrap() {
        MethodDetails::Pfba {
            optimal_objective, ..
        } => {
            assert_close(*optimal_objective, fba.objective_value.unwrap(), 1e-6);
            assert!(pfba.growth_rate.unwrap() >= optimal_objective - 1e-5);
        }
        other => panic!("Unexpected details {:?}", other),
    }

    // With a lower fraction, growth only has to stay above the fraction of the optimum
    let request = SolveRequest::new(Method::Pfba).with_options(RequestOptions {
        fraction_of_optimum: Some(0.5),
        ..Default::default()
    });
    let half = dispatcher.run(&model, &request).unwrap();
    let z = fba.objective_value.unwrap();
    assert!(half.growth_rate.unwrap() >= 0.5 * z - 1e-5);
    assert!(half.objective_value.unwrap() <= pfba.objective_value.unwrap() + FLUX_TOLERANCE);
}

#[test]
fn reversibility_round_trip() {
    let solver = MicrolpSolver::new();
    let model =
        StoichiometricModel::build(&reversible(), &BuildOptions::default()).unwrap();
    let problem = pfba::formulate(&model, 5., 1.).unwrap();
    let solution = solver.solve(&problem).unwrap();
    assert!(solution.is_optimal());
    let fluxes = model.net_fluxes(&solution);
    for j in 0..model.num_reactions() {
        let forward = solution.value(model.forward_variable(j)).unwrap();
        let reverse = solution.value(model.reverse_variable(j)).unwrap();
        assert_close(fluxes[j], snap_to_zero(forward - reverse), 1e-12);
        assert!(forward.min(reverse) < FLUX_TOLERANCE);
    }
    // The loop carries exactly the converted flux
    let a_c = model.reaction_index("A_C").unwrap();
    let c_a = model.reaction_index("C_A").unwrap();
    assert_close(fluxes[a_c].abs() + fluxes[c_a].abs(), 5., 1e-5);
}

#[test]
fn gpr_precedence() {
    let knockouts = |genes: &[&str]| -> HashSet<String> {
        genes.iter().map(|g| g.to_string()).collect()
    };
    assert!(gpr_is_active("A and B", &knockouts(&[])));
    assert!(!gpr_is_active("A and B", &knockouts(&["A"])));
    assert!(gpr_is_active("A or B", &knockouts(&["A"])));
    assert!(!gpr_is_active("A or B", &knockouts(&["A", "B"])));
    assert!(gpr_is_active("(A and B) or C", &knockouts(&["A"])));
    assert!(!gpr_is_active("(A and B) or C", &knockouts(&["A", "C"])));
    // AND binds tighter than OR without parentheses
    assert!(gpr_is_active("A and B or C", &knockouts(&["B"])));
    assert!(!gpr_is_active("A and B or C", &knockouts(&["B", "C"])));
}

#[test]
fn tolerance_hierarchy() {
    assert!(SOLVER_NOISE_TOLERANCE < OBJECTIVE_TOLERANCE);
    assert!(OBJECTIVE_TOLERANCE <= FLUX_TOLERANCE);
    assert!(FLUX_TOLERANCE < ACTIVITY_EPSILON);
    assert_eq!(snap_to_zero(5e-10), 0.);
    assert!(snap_to_zero(-5e-10).is_sign_positive());
    assert_eq!(snap_to_zero(2e-9), 2e-9);
}
