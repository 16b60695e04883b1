//! Module for parsing Gene Protein Reaction strings into GPR trees

use crate::io::gpr_parse::lexer::LexerError;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gpr::GprTree;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
///
/// # Returns
/// Parse result which is
/// - `Ok`: The GPR tree, with `and` binding tighter than `or`
/// - `Err`: Returns the GprParseError describing the issue with the GPR rule which
///     was being parsed.
///
/// # Examples
/// ```rust
/// use fluxsuite_core::io::gpr_parse::parse_gpr;
/// let gpr: &str = "Rv0001 and (Rv0002 or Rv0003)";
/// let gpr_tree = parse_gpr(gpr).unwrap();
/// assert_eq!(gpr_tree.genes(), vec!["Rv0001", "Rv0002", "Rv0003"]);
/// ```
pub fn parse_gpr(input: &str) -> Result<GprTree, GprParseError> {
    // Convert the GPR string into tokens
    let tokens = lexer::Lexer::new(input).lex()?;
    // Now parse those tokens into a GPR tree
    let gpr = parser::GprParser::new(&tokens).parse()?;
    Ok(gpr)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error occurred during lexing (conversion of GPR string to tokens): {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing (conversion of tokens to GPR tree): {0}")]
    ParsingError(#[from] ParseError),
}
