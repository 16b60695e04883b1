//! Lex a GPR string into a series of tokens for later parsing

use thiserror::Error;

use crate::io::gpr_parse::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Consume the lexer, producing the token sequence (always terminated by [`Token::Eof`])
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            // Whitespace
            c if c.is_whitespace() => {}
            // Identifiers and Operators
            c if Lexer::is_identifier_char(c) => self.read_identifier(),
            character => {
                return Err(LexerError::InvalidCharacter {
                    character,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_identifier(&mut self) {
        while !self.is_at_end() && Lexer::is_identifier_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        if text.eq_ignore_ascii_case("and") {
            self.add_token(Token::And)
        } else if text.eq_ignore_ascii_case("or") {
            self.add_token(Token::Or)
        } else {
            self.add_token(Token::Identifier(text))
        }
    }

    /// Anything but whitespace, parentheses and control characters belongs to a gene
    /// identifier, e.g. `STM_1234.1`, `HGNC:1234`, `gene/1` or `Rv0001c+`
    fn is_identifier_char(c: char) -> bool {
        !c.is_whitespace() && !c.is_control() && !matches!(c, '(' | ')')
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    #[error("Invalid character `{character}` at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::lexer::{Lexer, LexerError};
    use crate::io::gpr_parse::token::Token;

    #[test]
    fn test_single_gene() {
        let tokens = match Lexer::new("Rv0023").lex() {
            Ok(t) => t,
            Err(_) => panic!("Failed to lex during test"),
        };
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Identifier(String::from("Rv0023")));
    }

    #[test]
    fn test_grouping() {
        let tokens = match Lexer::new("(Rv0023 OR Rv0123)").lex() {
            Ok(t) => t,
            Err(_) => panic!("Failed to lex during test"),
        };
        let expected_tokens = vec![
            Token::LeftParen,
            Token::Identifier(String::from("Rv0023")),
            Token::Or,
            Token::Identifier(String::from("Rv0123")),
            Token::RightParen,
            Token::Eof,
        ];
        assert_eq!(tokens, expected_tokens);
    }

    #[test]
    fn test_mixed_case_operators() {
        let tokens = Lexer::new("b0001 And b0002 oR b0003").lex().unwrap();
        assert_eq!(tokens[1], Token::And);
        assert_eq!(tokens[3], Token::Or);
    }

    #[test]
    fn test_versioned_identifiers() {
        let tokens = Lexer::new("STM_1234.1 and HGNC:5-2").lex().unwrap();
        assert_eq!(tokens[0], Token::Identifier(String::from("STM_1234.1")));
        assert_eq!(tokens[2], Token::Identifier(String::from("HGNC:5-2")));
    }

    #[test]
    fn test_operator_prefix_is_gene() {
        // "android" starts with "and" but is an identifier
        let tokens = Lexer::new("android or order").lex().unwrap();
        assert_eq!(tokens[0], Token::Identifier(String::from("android")));
        assert_eq!(tokens[2], Token::Identifier(String::from("order")));
    }

    #[test]
    fn test_unusual_identifiers() {
        let tokens = Lexer::new("gene/1 AND (Rv0001c+ or gène)").lex().unwrap();
        let expected_tokens = vec![
            Token::Identifier(String::from("gene/1")),
            Token::And,
            Token::LeftParen,
            Token::Identifier(String::from("Rv0001c+")),
            Token::Or,
            Token::Identifier(String::from("gène")),
            Token::RightParen,
            Token::Eof,
        ];
        assert_eq!(tokens, expected_tokens);
    }

    #[test]
    fn test_invalid_character() {
        match Lexer::new("b0001 \u{7} b0002").lex() {
            Err(LexerError::InvalidCharacter { character, position }) => {
                assert_eq!(character, '\u{7}');
                assert_eq!(position, 6);
            }
            Ok(_) => panic!("Should not have lexed"),
        }
    }
}
