//! Execution of solve requests
//!
//! The [`Dispatcher`] owns the solver capability. Requests either run on the calling thread
//! with [`Dispatcher::run`], or on a worker thread with [`Dispatcher::submit`], which hands
//! back a [`JobHandle`] for progress, cancellation and the final result.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use thiserror::Error;

use crate::flux_analysis::options::{Method, MethodOptions, SolveRequest};
use crate::flux_analysis::result::{interpret, AnalysisResult, PhenotypeRule, ResultStatus};
use crate::flux_analysis::stoichiometry::{BuildOptions, StoichiometricModel};
use crate::flux_analysis::{
    eflux, essentiality, fba, fva, gimme, imat, made, moma, pfba, AnalysisError, SweepMonitor,
    Unmonitored,
};
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::{default_solver, serialized, Solver, SolverError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The dispatcher was created without a solver
    #[error("No solver available, the dispatcher is not initialized")]
    NotInitialized,
    /// The worker thread could not be started
    #[error("Unable to spawn worker thread: {0}")]
    Spawn(String),
    #[error("Worker thread panicked")]
    WorkerPanicked,
}

// region Jobs
/// Progress of a submitted job
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub job_id: u64,
    /// Fraction done, within [0, 1]
    pub progress: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    fn from_result(result: &AnalysisResult) -> Self {
        match result.status {
            ResultStatus::Cancelled => JobState::Cancelled,
            ResultStatus::Error | ResultStatus::NoModel => JobState::Failed,
            _ => JobState::Completed,
        }
    }
}

/// Monitor sending progress events over a channel and reading the job's cancel flag
struct JobMonitor {
    job_id: u64,
    sender: Sender<ProgressEvent>,
    cancel: Arc<AtomicBool>,
}

impl SweepMonitor for JobMonitor {
    fn report(&self, progress: f64) {
        // The handle may have been dropped, nobody is listening then
        let _ = self.sender.send(ProgressEvent {
            job_id: self.job_id,
            progress,
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Handle of a job running on a worker thread
#[derive(Debug)]
pub struct JobHandle {
    id: u64,
    method: Method,
    cancel: Arc<AtomicBool>,
    state: Arc<Mutex<JobState>>,
    progress: Receiver<ProgressEvent>,
    worker: JoinHandle<AnalysisResult>,
}

impl JobHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request cancellation, honored at the next sweep boundary
    ///
    /// A solve that is already running is never interrupted.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> JobState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Channel of progress events
    pub fn progress(&self) -> &Receiver<ProgressEvent> {
        &self.progress
    }

    /// All progress events received so far, without blocking
    pub fn try_progress(&self) -> Vec<ProgressEvent> {
        self.progress.try_iter().collect()
    }

    /// Block until the job finishes and return its result
    pub fn wait(self) -> Result<AnalysisResult, DispatchError> {
        self.worker.join().map_err(|_| DispatchError::WorkerPanicked)
    }
}

fn set_state(state: &Mutex<JobState>, new_state: JobState) {
    match state.lock() {
        Ok(mut state) => *state = new_state,
        Err(poisoned) => *poisoned.into_inner() = new_state,
    }
}
// endregion Jobs

// region Dispatcher
/// Runs solve requests against models with an injected solver
#[derive(Debug)]
pub struct Dispatcher {
    solver: Option<Arc<dyn Solver>>,
    phenotype_rule: PhenotypeRule,
    next_job: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher using `solver`, serialized unless it is reentrant
    pub fn new(solver: Arc<dyn Solver>) -> Self {
        Dispatcher {
            solver: Some(serialized(solver)),
            phenotype_rule: PhenotypeRule::default(),
            next_job: AtomicU64::new(1),
        }
    }

    /// Create a dispatcher without a solver, every request fails with
    /// [`DispatchError::NotInitialized`]
    pub fn uninitialized() -> Self {
        Dispatcher {
            solver: None,
            phenotype_rule: PhenotypeRule::default(),
            next_job: AtomicU64::new(1),
        }
    }

    /// Create a dispatcher with the solver selected by the configuration
    pub fn with_default_solver() -> Result<Self, SolverError> {
        Ok(Dispatcher::new(default_solver()?))
    }

    pub fn with_phenotype_rule(mut self, rule: PhenotypeRule) -> Self {
        self.phenotype_rule = rule;
        self
    }

    /// Whether a solver capability is present
    pub fn is_ready(&self) -> bool {
        self.solver.is_some()
    }

    pub fn solver_name(&self) -> Option<&str> {
        self.solver.as_ref().map(|s| s.name())
    }

    fn solver(&self) -> Result<&Arc<dyn Solver>, DispatchError> {
        self.solver.as_ref().ok_or(DispatchError::NotInitialized)
    }

    /// Run a request on the calling thread
    pub fn run(&self, model: &Model, request: &SolveRequest) -> Result<AnalysisResult, DispatchError> {
        self.run_with_monitor(model, request, &Unmonitored)
    }

    /// Run a request on the calling thread, reporting sweep progress to `monitor`
    pub fn run_with_monitor(
        &self,
        model: &Model,
        request: &SolveRequest,
        monitor: &dyn SweepMonitor,
    ) -> Result<AnalysisResult, DispatchError> {
        let solver = self.solver()?;
        Ok(execute(
            solver.as_ref(),
            model,
            request,
            &self.phenotype_rule,
            monitor,
        ))
    }

    /// Run a request on a worker thread
    pub fn submit(
        &self,
        model: Arc<Model>,
        request: SolveRequest,
    ) -> Result<JobHandle, DispatchError> {
        let solver = Arc::clone(self.solver()?);
        let rule = self.phenotype_rule.clone();
        let id = self.next_job.fetch_add(1, Ordering::SeqCst);
        let method = request.method;
        let cancel = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(JobState::Created));
        let (sender, receiver) = mpsc::channel();

        let monitor = JobMonitor {
            job_id: id,
            sender,
            cancel: Arc::clone(&cancel),
        };
        let worker_state = Arc::clone(&state);
        let worker = std::thread::Builder::new()
            .name(format!("fluxsuite-job-{}", id))
            .spawn(move || {
                set_state(&worker_state, JobState::Running);
                tracing::info!(
                    component = "dispatcher",
                    operation = "job",
                    job_id = id,
                    method = %method,
                    "Job started"
                );
                let result = if monitor.is_cancelled() {
                    AnalysisResult::failed(
                        method,
                        ResultStatus::Cancelled,
                        "Job was cancelled before it started",
                    )
                } else {
                    execute(solver.as_ref(), &model, &request, &rule, &monitor)
                };
                if !matches!(method, Method::Fva | Method::Essentiality)
                    && result.status != ResultStatus::Cancelled
                {
                    monitor.report(1.);
                }
                let final_state = JobState::from_result(&result);
                set_state(&worker_state, final_state);
                tracing::info!(
                    component = "dispatcher",
                    operation = "job",
                    job_id = id,
                    method = %method,
                    state = ?final_state,
                    status = ?result.status,
                    "Job finished"
                );
                result
            })
            .map_err(|err| DispatchError::Spawn(err.to_string()))?;

        Ok(JobHandle {
            id,
            method,
            cancel,
            state,
            progress: receiver,
            worker,
        })
    }
}
// endregion Dispatcher

// region Execution
/// Execute a request, converting every failure into a typed result
pub fn execute(
    solver: &dyn Solver,
    model: &Model,
    request: &SolveRequest,
    rule: &PhenotypeRule,
    monitor: &dyn SweepMonitor,
) -> AnalysisResult {
    let start = Instant::now();
    let method = request.method;
    let result = if model.is_empty() {
        tracing::warn!(
            component = "dispatcher",
            operation = "execute",
            method = %method,
            "Model has no reactions"
        );
        AnalysisResult::failed(method, ResultStatus::NoModel, "Model has no reactions")
    } else {
        match analyze(solver, model, request, rule, monitor) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    component = "dispatcher",
                    operation = "execute",
                    method = %method,
                    error = %err,
                    "Analysis failed"
                );
                AnalysisResult::from_error(method, &err)
            }
        }
    };
    let result = result.with_elapsed(start.elapsed());
    tracing::info!(
        component = "dispatcher",
        operation = "execute",
        method = %method,
        solver = solver.name(),
        status = ?result.status,
        solve_time_ms = result.solve_time_ms,
        "Request finished"
    );
    result
}

fn analyze(
    solver: &dyn Solver,
    model: &Model,
    request: &SolveRequest,
    rule: &PhenotypeRule,
    monitor: &dyn SweepMonitor,
) -> Result<AnalysisResult, AnalysisError> {
    let options = request.method_options()?;
    let build_options = BuildOptions::from_request(request);
    let stoichiometric = StoichiometricModel::build(model, &build_options)?;
    let outcome = match &options {
        MethodOptions::Fba => fba::run(&stoichiometric, solver)?,
        MethodOptions::Pfba(options) => pfba::run(&stoichiometric, options, solver)?,
        MethodOptions::Fva(options) => fva::run(&stoichiometric, options, solver, monitor)?,
        MethodOptions::Moma(options) => {
            let wild_type =
                StoichiometricModel::build(model, &build_options.without_knockouts())?;
            moma::run(&stoichiometric, &wild_type, options, solver)?
        }
        MethodOptions::Gimme(options) => gimme::run(&stoichiometric, options, solver)?,
        MethodOptions::Eflux(options) => eflux::run(&stoichiometric, options, solver)?,
        MethodOptions::Imat(options) => imat::run(&stoichiometric, options, solver)?,
        MethodOptions::Made(options) => made::run(&stoichiometric, options, solver)?,
        MethodOptions::Essentiality => essentiality::run(&stoichiometric, solver, monitor)?,
    };
    Ok(interpret(request.method, &stoichiometric, outcome, rule))
}
// endregion Execution
