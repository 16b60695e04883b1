use crate::io::gpr_parse::token::Token;
use crate::metabolic_model::gpr::{GprNode, GprTree, NodeId};

use thiserror::Error;
/*
GPR Grammar:
expression -> term ( "OR" term )* ;
term       -> factor ( "AND" factor )* ;
factor     -> "(" expression ")" | GENE ;

e.g. (Gene1 AND Gene2) OR Gene3

Every rule takes the position of the token it starts at, and returns the node it built
together with the position of the first token it did not consume.
 */

/// GPR Parser
pub struct GprParser<'t> {
    /// Tokens from the GPR string, terminated by [`Token::Eof`]
    tokens: &'t [Token],
    /// Arena holding the nodes of the tree under construction
    nodes: Vec<GprNode>,
}

impl<'t> GprParser<'t> {
    /// Create a new GprParser
    pub fn new(tokens: &'t [Token]) -> GprParser<'t> {
        GprParser {
            tokens,
            nodes: Vec::new(),
        }
    }

    // region Parsing Functions

    /// Parse the token slice into a GPR tree
    pub fn parse(mut self) -> Result<GprTree, ParseError> {
        let (root, pos) = self.expression(0)?;
        if self.peek(pos) != &Token::Eof {
            // If entire expression has not been parsed, an error has occurred
            return Err(ParseError::EarlyTermination(pos));
        }
        Ok(GprTree::from_parts(self.nodes, root))
    }

    fn expression(&mut self, pos: usize) -> Result<(NodeId, usize), ParseError> {
        let (first, mut pos) = self.term(pos)?;
        let mut operands = vec![first];
        while self.peek(pos) == &Token::Or {
            let (next, next_pos) = self.term(pos + 1)?;
            operands.push(next);
            pos = next_pos;
        }
        Ok((self.collapse(operands, GprNode::Or), pos))
    }

    fn term(&mut self, pos: usize) -> Result<(NodeId, usize), ParseError> {
        let (first, mut pos) = self.factor(pos)?;
        let mut operands = vec![first];
        while self.peek(pos) == &Token::And {
            let (next, next_pos) = self.factor(pos + 1)?;
            operands.push(next);
            pos = next_pos;
        }
        Ok((self.collapse(operands, GprNode::And), pos))
    }

    fn factor(&mut self, pos: usize) -> Result<(NodeId, usize), ParseError> {
        match self.peek(pos) {
            Token::Identifier(gene) => {
                let node = GprNode::Gene(gene.clone());
                Ok((self.push(node), pos + 1))
            }
            Token::LeftParen => {
                let (inner, pos) = self.expression(pos + 1)?;
                if self.peek(pos) != &Token::RightParen {
                    return Err(ParseError::MissingToken(
                        "Expect ')' after expression.".to_string(),
                    ));
                }
                Ok((inner, pos + 1))
            }
            _ => Err(ParseError::ExpectedExpression(pos)),
        }
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Get the token at `pos`, positions past the end of the slice read as [`Token::Eof`]
    fn peek(&self, pos: usize) -> &Token {
        self.tokens.get(pos).unwrap_or(&Token::Eof)
    }

    /// Add a node to the arena, returning its id
    fn push(&mut self, node: GprNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// A single operand needs no operator node
    fn collapse(&mut self, mut operands: Vec<NodeId>, op: fn(Vec<NodeId>) -> GprNode) -> NodeId {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            self.push(op(operands))
        }
    }

    // endregion parsing helper functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// No expression found when one was expected
    #[error("No expression found at token {0}, check that the GPR string is not empty")]
    ExpectedExpression(usize),
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early at token {0}, check for a missing operator between two genes")]
    EarlyTermination(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpr_parse::lexer::Lexer;

    fn parse(rule: &str) -> Result<GprTree, ParseError> {
        let tokens = Lexer::new(rule).lex().unwrap();
        GprParser::new(&tokens).parse()
    }

    fn gene_id(tree: &GprTree, id: NodeId) -> String {
        match tree.node(id) {
            GprNode::Gene(g) => g.clone(),
            _ => panic!("Should have been a gene"),
        }
    }

    #[test]
    fn single_gene_parse() {
        let tree = parse("Rv1304").unwrap();
        assert_eq!(gene_id(&tree, tree.root()), "Rv1304");
    }

    #[test]
    fn and_parse() {
        let tree = parse("Rv1304 and Rv0023").unwrap();
        match tree.node(tree.root()) {
            GprNode::And(operands) => {
                assert_eq!(operands.len(), 2);
                assert_eq!(gene_id(&tree, operands[0]), "Rv1304");
                assert_eq!(gene_id(&tree, operands[1]), "Rv0023");
            }
            _ => panic!("Should have been an AND operation"),
        }
    }

    #[test]
    fn or_parse() {
        let tree = parse("Rv1304 or Rv0023").unwrap();
        match tree.node(tree.root()) {
            GprNode::Or(operands) => {
                assert_eq!(gene_id(&tree, operands[0]), "Rv1304");
                assert_eq!(gene_id(&tree, operands[1]), "Rv0023");
            }
            _ => panic!("Should have been an OR operation"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // Parsed as (A and B) or C, and as A or (B and C)
        let tree = parse("A and B or C").unwrap();
        match tree.node(tree.root()) {
            GprNode::Or(operands) => {
                assert!(matches!(tree.node(operands[0]), GprNode::And(_)));
                assert_eq!(gene_id(&tree, operands[1]), "C");
            }
            _ => panic!("Top level should have been an OR operation"),
        }
        let tree = parse("A or B and C").unwrap();
        match tree.node(tree.root()) {
            GprNode::Or(operands) => {
                assert_eq!(gene_id(&tree, operands[0]), "A");
                assert!(matches!(tree.node(operands[1]), GprNode::And(_)));
            }
            _ => panic!("Top level should have been an OR operation"),
        }
    }

    #[test]
    fn grouping_parse() {
        let tree = parse("(Rv3141 or Rv0023) and Rv0018").unwrap();
        match tree.node(tree.root()) {
            GprNode::And(operands) => {
                match tree.node(operands[0]) {
                    GprNode::Or(inner) => {
                        assert_eq!(gene_id(&tree, inner[0]), "Rv3141");
                        assert_eq!(gene_id(&tree, inner[1]), "Rv0023");
                    }
                    _ => panic!("Should have parsed an OR operation"),
                }
                assert_eq!(gene_id(&tree, operands[1]), "Rv0018");
            }
            _ => panic!("Incorrect Parse (should have been an AND operation)"),
        }
    }

    #[test]
    fn repeated_binary_parse() {
        let tree = parse("Rv0001 and Rv0002 and Rv0003").unwrap();
        match tree.node(tree.root()) {
            GprNode::And(operands) => {
                let genes: Vec<String> = operands.iter().map(|o| gene_id(&tree, *o)).collect();
                assert_eq!(genes, vec!["Rv0001", "Rv0002", "Rv0003"]);
            }
            _ => panic!("Incorrect parse"),
        }
    }

    #[test]
    fn invalid_parse() {
        assert_eq!(
            parse("Rv0001 Rv0023").err(),
            Some(ParseError::EarlyTermination(1))
        );
        assert!(matches!(
            parse("(Rv0001 and Rv0023"),
            Err(ParseError::MissingToken(_))
        ));
        assert_eq!(
            parse("Rv0001 and").err(),
            Some(ParseError::ExpectedExpression(2))
        );
        assert_eq!(parse("").err(), Some(ParseError::ExpectedExpression(0)));
    }
}
