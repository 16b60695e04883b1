//! Constraint based analysis of metabolic networks.
//!
//! A [`Model`](metabolic_model::model::Model) is combined with a
//! [`SolveRequest`](flux_analysis::options::SolveRequest) and run by a
//! [`Dispatcher`](flux_analysis::dispatcher::Dispatcher), which formulates the requested method
//! as an optimization [`Problem`](optimize::problem::Problem), solves it with the injected
//! backend, and interprets the solution into an
//! [`AnalysisResult`](flux_analysis::result::AnalysisResult).

pub mod configuration;
pub mod flux_analysis;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
mod utils;
