//! Parsing of GPR rules and JSON IO of models, requests and results
pub mod gpr_parse;
pub mod json;
