//! Parser for Mica
//!
//! A recursive-descent parser over the token stream. Operator precedence is
//! a ladder of methods, one per level, each delegating to the next-tighter
//! level. Block structure comes from layout tokens: the parser tracks the
//! expected indentation depth and a block ends at the first line with fewer
//! leading `Indent` tokens.
//!
//! Cursor protocol: every rule exits with the cursor on the last token it
//! consumed, and the caller advances past it. Lookahead that does not pan
//! out rewinds the cursor, so the enclosing rule re-observes the
//! terminating token.

use crate::ast::{Block, Expr, IfChain};
use crate::error::CompileError;
use crate::token::{Token, TokenKind};

/// Parse a token sequence into the root [`Block`].
pub fn parse(tokens: Vec<Token>) -> Result<Block, CompileError> {
    let mut parser = Parser::new(tokens);
    parser.deep_code_block()
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    /// Expected number of leading `Indent` tokens per line in the current
    /// block. Starts at -1 so the outermost block parses at depth 0.
    indent_count: i32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            index: 0,
            indent_count: -1,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn next(&mut self) {
        self.index += 1;
    }

    fn prev(&mut self) {
        self.index -= 1;
    }

    fn has_current(&self) -> bool {
        self.index < self.tokens.len()
    }

    /// Whether the current token's kind is one of the given kinds.
    fn check(&self, kinds: &[TokenKind]) -> bool {
        self.has_current() && kinds.contains(&self.current().kind)
    }

    /// Whether the current token is a primitive type keyword.
    fn is_type(&self) -> bool {
        self.has_current() && self.current().kind.is_type_keyword()
    }

    /// Advance if the next token matches one of the given kinds, else stay.
    fn match_next(&mut self, kinds: &[TokenKind]) -> bool {
        self.next();

        if !self.has_current() {
            return false;
        }

        if kinds.contains(&self.current().kind) {
            return true;
        }

        self.prev();
        false
    }

    /// Advance if the next token is a simple or compound assignment
    /// operator, else stay.
    fn match_next_assign(&mut self) -> bool {
        self.next();

        if !self.has_current() {
            return false;
        }

        if self.current().kind.is_assign_op() {
            return true;
        }

        self.prev();
        false
    }

    /// Require the current token to match one of the given kinds.
    fn expect(&self, kinds: &[TokenKind]) -> Result<(), CompileError> {
        if !self.has_current() {
            return Err(CompileError::UnexpectedEof);
        }

        if kinds.contains(&self.current().kind) {
            return Ok(());
        }

        Err(CompileError::ParseError {
            literal: self.current().literal.clone(),
            index: self.index,
        })
    }

    /// Whether the line starting at the cursor carries exactly the current
    /// block's indentation.
    fn has_indents(&self) -> bool {
        let count = self.indent_count.max(0) as usize;

        if self.index + count >= self.tokens.len() {
            return false;
        }

        for i in self.index..self.index + count {
            if self.tokens[i].kind != TokenKind::Indent {
                return false;
            }
        }

        true
    }

    /// Consume the current block's worth of leading `Indent` tokens.
    fn expect_indents(&mut self) -> Result<(), CompileError> {
        for _ in 0..self.indent_count.max(0) {
            if !self.has_current() {
                return Err(CompileError::UnexpectedEof);
            }

            if self.current().kind != TokenKind::Indent {
                return Err(CompileError::IndentError { index: self.index });
            }

            self.next();
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Value expressions, tightest level first
    // ------------------------------------------------------------------

    /// Identifier (optionally indexed) or value literal.
    fn atom(&mut self) -> Result<Expr, CompileError> {
        if self.check(&[TokenKind::Id]) {
            let id = self.current().clone();

            if self.match_next(&[TokenKind::LBracket]) {
                self.next();
                let index = self.value_expr()?;

                self.next();
                self.expect(&[TokenKind::RBracket])?;

                return Ok(Expr::Accessible {
                    id,
                    index: Some(Box::new(index)),
                });
            }

            return Ok(Expr::Accessible { id, index: None });
        }

        self.expect(&[
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::Bool,
            TokenKind::Char,
        ])?;
        Ok(Expr::Literal(self.current().clone()))
    }

    /// Array literal `[a, b, c]`, or an atom.
    fn list(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::LBracket]) {
            return self.atom();
        }

        self.next();

        let mut values = Vec::new();

        loop {
            if self.check(&[TokenKind::RBracket]) {
                break;
            }

            values.push(self.value_expr()?);
            self.next();

            if self.check(&[TokenKind::Comma]) {
                self.next();
            }
        }

        Ok(Expr::Array(values))
    }

    /// Parenthesized expression or a list.
    fn primary(&mut self) -> Result<Expr, CompileError> {
        if self.check(&[TokenKind::LParen]) {
            self.next();
            let value = self.value_expr()?;

            self.next();
            self.expect(&[TokenKind::RParen])?;

            return Ok(Expr::Group(Box::new(value)));
        }

        self.list()
    }

    /// `**`, right-associative through the unary level.
    fn power(&mut self) -> Result<Expr, CompileError> {
        let left = self.primary()?;

        if self.match_next(&[TokenKind::Pow]) {
            let op = self.current().clone();

            self.next();
            let right = self.factor()?;

            return Ok(Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    /// Prefix `+ - ! ~`, right-recursive.
    fn factor(&mut self) -> Result<Expr, CompileError> {
        if self.check(&[
            TokenKind::Add,
            TokenKind::Sub,
            TokenKind::Not,
            TokenKind::BitNot,
        ]) {
            let op = self.current().clone();

            self.next();
            let value = self.factor()?;

            return Ok(Expr::Unary {
                op,
                value: Box::new(value),
            });
        }

        self.power()
    }

    /// Left-associative binary level: parse `operand`, then fold as long as
    /// the next token is one of `ops`.
    fn binary_level(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut left = operand(self)?;

        while self.match_next(ops) {
            let op = self.current().clone();

            self.next();
            let right = operand(self)?;

            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[TokenKind::Mult, TokenKind::Div, TokenKind::Mod],
            Self::factor,
        )
    }

    fn sum(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::Add, TokenKind::Sub], Self::term)
    }

    fn shift(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::Shl, TokenKind::Shr], Self::sum)
    }

    fn bit_and(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::BitAnd], Self::shift)
    }

    fn bit_xor(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::BitXor], Self::bit_and)
    }

    fn bit_or(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::BitOr], Self::bit_xor)
    }

    fn relation(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEq,
                TokenKind::Less,
                TokenKind::LessEq,
            ],
            Self::bit_or,
        )
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::EqEq, TokenKind::NotEq], Self::relation)
    }

    fn logic_and(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::And], Self::equality)
    }

    fn logic_or(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::Or], Self::logic_and)
    }

    /// `cond ? a : b`, right-associative in both branches.
    fn ternary(&mut self) -> Result<Expr, CompileError> {
        let left = self.logic_or()?;

        if self.match_next(&[TokenKind::QMark]) {
            self.next();
            let case_true = self.ternary()?;

            self.next();
            self.expect(&[TokenKind::Colon])?;
            self.next();

            let case_false = self.ternary()?;

            return Ok(Expr::Ternary {
                cond: Box::new(left),
                case_true: Box::new(case_true),
                case_false: Box::new(case_false),
            });
        }

        Ok(left)
    }

    fn value_expr(&mut self) -> Result<Expr, CompileError> {
        self.ternary()
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Assignment, or a bare value expression.
    fn assign(&mut self) -> Result<Expr, CompileError> {
        let left = self.value_expr()?;

        if self.match_next_assign() {
            // The token just before the operator must be a plain
            // identifier; indexed and parenthesized targets are rejected.
            self.prev();
            self.expect(&[TokenKind::Id])?;
            self.next();

            let op = self.current().clone();

            self.next();
            let value = self.value_expr()?;

            if !matches!(left, Expr::Accessible { .. }) {
                return Err(CompileError::ParseError {
                    literal: op.literal,
                    index: self.index,
                });
            }

            return Ok(Expr::Assign {
                target: Box::new(left),
                op,
                value: Box::new(value),
            });
        }

        Ok(left)
    }

    /// Variable declaration or function header, or an assignment.
    ///
    /// Both start with a type keyword; a `(` after the name selects the
    /// function form. Declaration values chain right-recursively, so
    /// `int x = int y = 1` declares both.
    fn init(&mut self) -> Result<Expr, CompileError> {
        if !self.is_type() {
            return self.assign();
        }

        let ty = self.current().clone();
        self.next();

        self.expect(&[TokenKind::Id])?;
        let id = self.current().clone();
        self.next();

        if self.check(&[TokenKind::LParen]) {
            self.next();
            self.expect(&[TokenKind::RParen])?;
            self.next();

            self.expect(&[TokenKind::Endl])?;
            self.next();

            let body = self.deep_code_block()?;

            return Ok(Expr::Func { ty, id, body });
        }

        self.expect(&[TokenKind::Eq])?;
        self.next();

        let value = self.init()?;

        Ok(Expr::Init {
            ty,
            id,
            value: Box::new(value),
        })
    }

    fn print(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::Print]) {
            return self.init();
        }

        self.next();
        self.expect(&[TokenKind::LParen])?;
        self.next();

        let value = self.value_expr()?;

        self.next();
        self.expect(&[TokenKind::RParen])?;

        Ok(Expr::Print(Box::new(value)))
    }

    /// One `if` (or `elif`) header and body. The cursor sits on the
    /// keyword at entry.
    fn if_stmt(&mut self) -> Result<IfChain, CompileError> {
        self.next();

        let cond = Expr::Cond(Box::new(self.value_expr()?));

        self.next();
        self.expect(&[TokenKind::Endl])?;
        self.next();

        let body = self.deep_code_block()?;

        Ok(IfChain {
            cond: Box::new(cond),
            body,
            elif: None,
        })
    }

    /// An `if` plus any number of trailing `elif` links.
    ///
    /// After each body the parser skips the line terminator and the
    /// indentation to peek at the next keyword. The cursor position after
    /// the last confirmed link is remembered so the speculative lookahead
    /// can be undone when no `elif` follows.
    fn elif(&mut self) -> Result<IfChain, CompileError> {
        let mut chain = self.if_stmt()?;
        let mut if_end = self.index;
        let mut links = Vec::new();

        loop {
            self.next();
            if !self.has_current() {
                break;
            }

            self.expect(&[TokenKind::Endl])?;
            self.next();

            if !self.has_indents() {
                break;
            }
            self.expect_indents()?;

            if !self.check(&[TokenKind::Elif]) {
                break;
            }

            links.push(self.if_stmt()?);
            if_end = self.index;
        }

        // Rewind to the end of the last confirmed link.
        self.index = if_end;

        let mut elif = None;
        for mut link in links.into_iter().rev() {
            link.elif = elif;
            elif = Some(Box::new(link));
        }
        chain.elif = elif;

        Ok(chain)
    }

    /// Full conditional: `if`/`elif` chain with an optional trailing
    /// `else`, which attaches to the chain head.
    fn else_stmt(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::If]) {
            return self.print();
        }

        let chain = self.elif()?;
        let backup = self.index;

        self.next();
        if self.has_current() {
            self.expect(&[TokenKind::Endl])?;
            self.next();

            if self.has_indents() {
                self.expect_indents()?;

                if self.check(&[TokenKind::Else]) {
                    self.next();
                    self.expect(&[TokenKind::Endl])?;
                    self.next();

                    let body = self.deep_code_block()?;

                    return Ok(Expr::Else { chain, body });
                }
            }
        }

        self.index = backup;
        Ok(Expr::If(chain))
    }

    fn jump(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::Break, TokenKind::Continue]) {
            return self.else_stmt();
        }

        Ok(Expr::ControlFlow(self.current().clone()))
    }

    fn while_stmt(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::While]) {
            return self.jump();
        }

        self.next();

        let cond = Expr::Cond(Box::new(self.value_expr()?));

        self.next();
        self.expect(&[TokenKind::Endl])?;
        self.next();

        let body = self.deep_code_block()?;

        Ok(Expr::While {
            cond: Box::new(cond),
            body,
        })
    }

    /// `for <init> , <cond> , <incr>` — clauses separated by commas.
    fn for_stmt(&mut self) -> Result<Expr, CompileError> {
        if !self.check(&[TokenKind::For]) {
            return self.while_stmt();
        }

        self.next();
        let init = self.init()?;

        self.next();
        self.expect(&[TokenKind::Comma])?;
        self.next();

        let cond = Expr::Cond(Box::new(self.value_expr()?));

        self.next();
        self.expect(&[TokenKind::Comma])?;
        self.next();

        let incr = self.assign()?;

        self.next();
        self.expect(&[TokenKind::Endl])?;
        self.next();

        let body = self.deep_code_block()?;

        Ok(Expr::For {
            init: Box::new(init),
            cond: Box::new(cond),
            incr: Box::new(incr),
            body,
        })
    }

    fn statement(&mut self) -> Result<Expr, CompileError> {
        self.for_stmt()
    }

    /// Parse a block one indentation level deeper than the current one.
    ///
    /// The block ends at the first line with fewer indents; the cursor is
    /// rewound two tokens so the enclosing frame re-observes the line
    /// terminator before that line.
    pub fn deep_code_block(&mut self) -> Result<Block, CompileError> {
        self.indent_count += 1;

        let mut block = Block::new();

        while self.has_current() {
            if !self.has_indents() {
                self.prev();
                self.prev();
                break;
            }

            self.expect_indents()?;

            // Blank lines inside a block are allowed.
            if self.check(&[TokenKind::Endl]) {
                self.next();
                continue;
            }

            // Deeper indentation than the block expects.
            if self.check(&[TokenKind::Indent]) {
                return Err(CompileError::IndentError { index: self.index });
            }

            block.exprs.push(self.statement()?);
            self.next();

            if !self.has_current() {
                break;
            }

            self.expect(&[TokenKind::Endl])?;
            self.next();
        }

        self.indent_count -= 1;

        Ok(block)
    }
}
