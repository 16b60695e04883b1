mod common;

use std::sync::Arc;

use fluxsuite_core::flux_analysis::compare::compare_results;
use fluxsuite_core::flux_analysis::dispatcher::{DispatchError, Dispatcher};
use fluxsuite_core::flux_analysis::options::{Method, SolveRequest};
use fluxsuite_core::flux_analysis::result::{Phenotype, ResultStatus};
use fluxsuite_core::io::json::{
    model_from_json, model_to_json, request_from_json, result_from_json, result_to_json,
};
use fluxsuite_core::metabolic_model::model::Model;
use fluxsuite_core::optimize::solvers::clarabel::ClarabelSolver;

use common::{assert_close, chain, dispatcher, respiration};

#[test]
fn readiness_gate() {
    let dispatcher = Dispatcher::uninitialized();
    assert!(!dispatcher.is_ready());
    let err = dispatcher
        .run(&chain(), &SolveRequest::new(Method::Fba))
        .unwrap_err();
    assert_eq!(err, DispatchError::NotInitialized);
}

#[test]
fn empty_network_is_never_solved() {
    let result = dispatcher()
        .run(&Model::new_empty(), &SolveRequest::new(Method::Fva))
        .unwrap();
    assert_eq!(result.status, ResultStatus::NoModel);
    assert!(result.details.is_none());
}

#[test]
fn submitted_sweep_streams_progress() {
    let dispatcher = dispatcher();
    let handle = dispatcher
        .submit(Arc::new(respiration()), SolveRequest::new(Method::Fva))
        .unwrap();
    let progress: Vec<f64> = handle.progress().iter().map(|e| e.progress).collect();
    let result = handle.wait().unwrap();
    assert_eq!(result.status, ResultStatus::Optimal);
    assert_eq!(progress.len(), 9);
    assert!(progress.iter().all(|p| (0. ..=1.).contains(p)));
    assert_eq!(progress.last().copied(), Some(1.));
    assert!(result.solve_time_ms >= 0.);
}

#[test]
fn single_solve_job_reports_completion() {
    let handle = dispatcher()
        .submit(Arc::new(chain()), SolveRequest::new(Method::Pfba))
        .unwrap();
    assert_eq!(handle.method(), Method::Pfba);
    let progress: Vec<f64> = handle.progress().iter().map(|e| e.progress).collect();
    assert_eq!(progress, vec![1.]);
    let result = handle.wait().unwrap();
    assert_close(result.growth_rate.unwrap(), 10., 1e-6);
}

#[test]
fn json_request_to_json_result() {
    let model_json = model_to_json(&respiration()).unwrap();
    let model = model_from_json(&model_json).unwrap();
    assert_eq!(model, respiration());

    let request = request_from_json(
        r#"{"method": "fba", "constraints": {"EX_o2_e": {"lb": 0}}, "knockouts": ["ack"]}"#,
    )
    .unwrap();
    let result = dispatcher().run(&model, &request).unwrap();
    assert_eq!(result.phenotype, Some(Phenotype::Fermentation));

    let json = result_to_json(&result).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "optimal");
    assert_eq!(value["phenotype"], "fermentation");
    assert!(value["solveTimeMs"].is_number());
    assert_eq!(result_from_json(&json).unwrap(), result);
}

#[test]
fn backends_agree() {
    let microlp = dispatcher();
    let clarabel = Dispatcher::new(Arc::new(ClarabelSolver::new()));
    let request = SolveRequest::new(Method::Fba);
    let a = microlp.run(&respiration(), &request).unwrap();
    let b = clarabel.run(&respiration(), &request).unwrap();
    let report = compare_results(&a, &b);
    assert_eq!(a.status, b.status);
    // Interior point solutions are only accurate to the solver tolerance
    assert!(report.relative_difference.unwrap() < 1e-5, "{:?}", report);
    assert!(report.max_flux_difference < 1e-3, "{:?}", report);
}
