//! Lexer for Mica source text
//!
//! Mica is indentation-structured, so layout is part of the token stream:
//! every tab becomes an `Indent` token and every newline an `Endl` token.
//! Other whitespace is discarded. Exactly one token is produced per scan
//! step, and each token's literal is the verbatim slice of source it was
//! scanned from.

use crate::error::CompileError;
use crate::token::{Token, TokenKind, keyword_kind};

/// One-character-lookahead scanner over a character cursor.
pub struct Lexer {
    chars: Vec<char>,
    /// Current character index.
    index: usize,
    /// Index of the first character of the token being scanned.
    token_start: usize,
}

/// Tokenize an entire source buffer.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source).scan_tokens()
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            index: 0,
            token_start: 0,
        }
    }

    /// Scan the whole input into a token sequence.
    ///
    /// The cursor convention: `scan_token` leaves the cursor on the last
    /// character of the scanned token, and this loop advances past it.
    pub fn scan_tokens(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        while self.has_current() {
            self.skip_whitespace();

            if !self.has_current() {
                break;
            }

            tokens.push(self.scan_token()?);
            self.next();
        }

        Ok(tokens)
    }

    fn current(&self) -> char {
        self.chars[self.index]
    }

    fn next(&mut self) {
        self.index += 1;
    }

    fn prev(&mut self) {
        self.index -= 1;
    }

    fn has_current(&self) -> bool {
        self.index < self.chars.len()
    }

    /// Advance onto the next character if it matches, else stay put.
    fn match_next(&mut self, ch: char) -> bool {
        self.next();

        if self.has_current() && self.current() == ch {
            return true;
        }

        self.prev();
        false
    }

    /// Whether the current character is layout (newline or tab).
    fn is_layout(&self) -> bool {
        self.current() == '\n' || self.current() == '\t'
    }

    /// Skip whitespace that is not layout. Newlines and tabs are
    /// significant and must survive to the token stream.
    fn skip_whitespace(&mut self) {
        while self.has_current() {
            if !self.current().is_whitespace() || self.is_layout() {
                break;
            }

            self.next();
        }
    }

    /// Build a token of the given kind whose literal is the streak of
    /// characters from `token_start` through the current index.
    fn create_token(&self, kind: TokenKind) -> Token {
        let literal: String = self.chars[self.token_start..=self.index].iter().collect();
        Token::new(kind, literal)
    }

    fn scan_token(&mut self) -> Result<Token, CompileError> {
        self.token_start = self.index;

        if self.is_layout() {
            return Ok(self.scan_layout());
        }

        if self.current().is_ascii_digit() {
            return Ok(self.scan_number());
        }

        self.scan_operator()
    }

    fn scan_layout(&mut self) -> Token {
        match self.current() {
            '\n' => self.create_token(TokenKind::Endl),
            '\t' => self.create_token(TokenKind::Indent),
            _ => self.create_token(TokenKind::Invalid),
        }
    }

    /// Scan a numeric literal. A single `.` inside the run makes it a
    /// float; a second `.` terminates the run.
    fn scan_number(&mut self) -> Token {
        let mut is_decimal = false;

        self.next();

        while self.has_current() {
            let cur = self.current();

            if !cur.is_ascii_digit() {
                if cur != '.' || is_decimal {
                    break;
                }

                is_decimal = true;
            }

            self.next();
        }

        // The loop exits on the first invalid character, so step back onto
        // the last character of the number.
        self.prev();

        self.create_token(if is_decimal {
            TokenKind::Float
        } else {
            TokenKind::Int
        })
    }

    /// Scan a maximal `[A-Za-z][A-Za-z0-9]*` run and classify it as a
    /// keyword or identifier.
    fn scan_word(&mut self) -> Result<Token, CompileError> {
        if !self.current().is_ascii_alphabetic() {
            return Err(CompileError::LexError {
                ch: self.current(),
                index: self.index,
            });
        }

        let mut word = String::new();
        word.push(self.current());

        self.next();

        while self.has_current() {
            let cur = self.current();

            if !cur.is_ascii_alphabetic() && !cur.is_ascii_digit() {
                break;
            }

            word.push(cur);
            self.next();
        }

        self.prev();

        Ok(self.create_token(keyword_kind(&word).unwrap_or(TokenKind::Id)))
    }

    /// Scan a single-quoted character literal. The token's literal is the
    /// one enclosed character, not the apostrophes.
    fn scan_char(&mut self) -> Result<Token, CompileError> {
        self.next(); // Skip the opening apostrophe.

        if !self.has_current() {
            return Err(CompileError::UnexpectedEof);
        }

        self.token_start = self.index;
        let token = self.create_token(TokenKind::Char);

        self.next();

        if !self.has_current() {
            return Err(CompileError::UnexpectedEof);
        }
        if self.current() != '\'' {
            return Err(CompileError::LexError {
                ch: self.current(),
                index: self.index,
            });
        }

        Ok(token)
    }

    /// Dispatch on an operator lead character, using one or two extra
    /// lookaheads for the multi-character and compound-assignment forms.
    fn scan_operator(&mut self) -> Result<Token, CompileError> {
        let token = match self.current() {
            '(' => self.create_token(TokenKind::LParen),
            ')' => self.create_token(TokenKind::RParen),
            '[' => self.create_token(TokenKind::LBracket),
            ']' => self.create_token(TokenKind::RBracket),
            '{' => self.create_token(TokenKind::LBrace),
            '}' => self.create_token(TokenKind::RBrace),

            '+' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::AddEq)
                } else {
                    self.create_token(TokenKind::Add)
                }
            }
            '-' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::SubEq)
                } else {
                    self.create_token(TokenKind::Sub)
                }
            }
            '*' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::MultEq)
                } else if self.match_next('*') {
                    self.create_token(TokenKind::Pow)
                } else {
                    self.create_token(TokenKind::Mult)
                }
            }
            '/' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::DivEq)
                } else {
                    self.create_token(TokenKind::Div)
                }
            }
            '%' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::ModEq)
                } else {
                    self.create_token(TokenKind::Mod)
                }
            }
            '~' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::BitNotEq)
                } else {
                    self.create_token(TokenKind::BitNot)
                }
            }
            '^' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::BitXorEq)
                } else {
                    self.create_token(TokenKind::BitXor)
                }
            }
            '&' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::BitAndEq)
                } else if self.match_next('&') {
                    self.create_token(TokenKind::And)
                } else {
                    self.create_token(TokenKind::BitAnd)
                }
            }
            '|' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::BitOrEq)
                } else if self.match_next('|') {
                    self.create_token(TokenKind::Or)
                } else {
                    self.create_token(TokenKind::BitOr)
                }
            }
            '=' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::EqEq)
                } else {
                    self.create_token(TokenKind::Eq)
                }
            }
            '!' => {
                if self.match_next('=') {
                    self.create_token(TokenKind::NotEq)
                } else {
                    self.create_token(TokenKind::Not)
                }
            }
            '<' => {
                if self.match_next('<') {
                    if self.match_next('=') {
                        self.create_token(TokenKind::ShlEq)
                    } else {
                        self.create_token(TokenKind::Shl)
                    }
                } else if self.match_next('=') {
                    self.create_token(TokenKind::LessEq)
                } else {
                    self.create_token(TokenKind::Less)
                }
            }
            '>' => {
                if self.match_next('>') {
                    if self.match_next('=') {
                        self.create_token(TokenKind::ShrEq)
                    } else {
                        self.create_token(TokenKind::Shr)
                    }
                } else if self.match_next('=') {
                    self.create_token(TokenKind::GreaterEq)
                } else {
                    self.create_token(TokenKind::Greater)
                }
            }

            '?' => self.create_token(TokenKind::QMark),
            ':' => self.create_token(TokenKind::Colon),
            ',' => self.create_token(TokenKind::Comma),
            ';' => self.create_token(TokenKind::Semicolon),

            '\'' => return self.scan_char(),

            _ => return self.scan_word(),
        };

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_literals_are_verbatim_slices() {
        let source = "int total = 42 + 3.5";
        let tokens = tokenize(source).unwrap();
        for token in &tokens {
            assert!(
                source.contains(&token.literal),
                "literal '{}' not found in source",
                token.literal
            );
        }
        assert_eq!(tokens[3].literal, "42");
        assert_eq!(tokens[5].literal, "3.5");
    }

    #[test]
    fn test_power_is_one_token() {
        assert_eq!(
            kinds("2 ** 3"),
            vec![TokenKind::Int, TokenKind::Pow, TokenKind::Int]
        );
    }

    #[test]
    fn test_compound_shift_assignments() {
        assert_eq!(kinds("<<="), vec![TokenKind::ShlEq]);
        assert_eq!(kinds(">>="), vec![TokenKind::ShrEq]);
        assert_eq!(kinds("<<"), vec![TokenKind::Shl]);
        assert_eq!(kinds("<="), vec![TokenKind::LessEq]);
        assert_eq!(kinds("<"), vec![TokenKind::Less]);
    }

    #[test]
    fn test_layout_tokens() {
        // One Endl per newline, one Indent per tab; blank lines produce
        // back-to-back Endl tokens.
        assert_eq!(
            kinds("x\n\n\ty"),
            vec![
                TokenKind::Id,
                TokenKind::Endl,
                TokenKind::Endl,
                TokenKind::Indent,
                TokenKind::Id
            ]
        );
    }

    #[test]
    fn test_spaces_are_discarded() {
        assert_eq!(kinds("a   +    b"), kinds("a+b"));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("while whilex true int x2"),
            vec![
                TokenKind::While,
                TokenKind::Id,
                TokenKind::Bool,
                TokenKind::TypeInt,
                TokenKind::Id
            ]
        );
    }

    #[test]
    fn test_char_literal_strips_apostrophes() {
        let tokens = tokenize("'a'").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Char);
        assert_eq!(tokens[0].literal, "a");
    }

    #[test]
    fn test_unterminated_char_literal() {
        assert_eq!(tokenize("'a").unwrap_err(), CompileError::UnexpectedEof);
        assert!(matches!(
            tokenize("'ab'").unwrap_err(),
            CompileError::LexError { ch: 'b', .. }
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(
            tokenize("x = @").unwrap_err(),
            CompileError::LexError { ch: '@', index: 4 }
        ));
    }

    #[test]
    fn test_second_decimal_point_terminates_number() {
        // "1.2.3" scans as FLOAT "1.2" and then fails on the dangling dot.
        let err = tokenize("1.2.3").unwrap_err();
        assert!(matches!(err, CompileError::LexError { ch: '.', .. }));
    }

    #[test]
    fn test_float_and_int_classification() {
        let tokens = tokenize("10 10.0").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[1].kind, TokenKind::Float);
    }

    #[test]
    fn test_operator_at_end_of_input() {
        assert_eq!(kinds("x +"), vec![TokenKind::Id, TokenKind::Add]);
    }
}
