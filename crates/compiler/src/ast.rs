//! Abstract syntax tree for Mica
//!
//! The tree is a sum type rooted at a [`Block`]. Nodes keep the tokens they
//! were built from, so diagnostics and the pretty printer can echo source
//! text verbatim. The `Display` implementations re-print a tree in a
//! fully-parenthesized form; re-tokenizing that output preserves every
//! operator and identifier of the original program.

use crate::token::Token;
use std::fmt;

/// An ordered sequence of statements: the tree root and every nested body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub exprs: Vec<Expr>,
}

impl Block {
    pub fn new() -> Self {
        Block { exprs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Apply [`Expr::strip_groups`] to every statement in the block.
    pub fn strip_groups(self) -> Block {
        Block {
            exprs: self.exprs.into_iter().map(Expr::strip_groups).collect(),
        }
    }
}

/// One link of an `if`/`elif` chain.
///
/// `elif` chains are linked lists: each link owns its condition and body and
/// points at the next `elif`, if any. A trailing `else` wraps the whole
/// chain in [`Expr::Else`].
#[derive(Debug, Clone, PartialEq)]
pub struct IfChain {
    pub cond: Box<Expr>,
    pub body: Block,
    pub elif: Option<Box<IfChain>>,
}

impl IfChain {
    fn strip_groups(self) -> IfChain {
        IfChain {
            cond: Box::new(self.cond.strip_groups()),
            body: self.body.strip_groups(),
            elif: self.elif.map(|link| Box::new(link.strip_groups())),
        }
    }
}

/// Expression node. Statements and values share one tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A value literal token (`Int`/`Float`/`Bool`/`Char`).
    Literal(Token),

    /// A storage-designating expression: a variable, optionally indexed.
    Accessible {
        id: Token,
        index: Option<Box<Expr>>,
    },

    /// Array literal `[a, b, c]`. Parsed only; no code path.
    Array(Vec<Expr>),

    /// Prefix operator application.
    Unary { op: Token, value: Box<Expr> },

    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },

    /// Parenthesized expression.
    Group(Box<Expr>),

    Ternary {
        cond: Box<Expr>,
        case_true: Box<Expr>,
        case_false: Box<Expr>,
    },

    /// Marker for an expression evaluated in boolean context (loop and
    /// branch headers). Evaluation of the inner value is unchanged; the
    /// consumer emits the zero test.
    Cond(Box<Expr>),

    /// `print(value)`, lowered to a runtime call.
    Print(Box<Expr>),

    /// Assignment through a simple or compound operator. The target is
    /// always an [`Expr::Accessible`].
    Assign {
        target: Box<Expr>,
        op: Token,
        value: Box<Expr>,
    },

    /// Variable declaration `type id = value`.
    Init {
        ty: Token,
        id: Token,
        value: Box<Expr>,
    },

    /// `if`/`elif` chain without a trailing `else`.
    If(IfChain),

    /// `if`/`elif` chain with a trailing `else` body.
    Else { chain: IfChain, body: Block },

    /// `break` or `continue`.
    ControlFlow(Token),

    While { cond: Box<Expr>, body: Block },

    For {
        init: Box<Expr>,
        cond: Box<Expr>,
        incr: Box<Expr>,
        body: Block,
    },

    /// Function header and body. Parsed only; no code path.
    Func { ty: Token, id: Token, body: Block },

    /// Nested statement sequence.
    Block(Block),
}

impl Expr {
    /// Remove redundant grouping nodes, recursively. `((e))` and `e`
    /// normalize to the same tree.
    pub fn strip_groups(self) -> Expr {
        match self {
            Expr::Group(inner) => inner.strip_groups(),
            Expr::Unary { op, value } => Expr::Unary {
                op,
                value: Box::new(value.strip_groups()),
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(left.strip_groups()),
                op,
                right: Box::new(right.strip_groups()),
            },
            Expr::Ternary {
                cond,
                case_true,
                case_false,
            } => Expr::Ternary {
                cond: Box::new(cond.strip_groups()),
                case_true: Box::new(case_true.strip_groups()),
                case_false: Box::new(case_false.strip_groups()),
            },
            Expr::Cond(inner) => Expr::Cond(Box::new(inner.strip_groups())),
            Expr::Accessible { id, index } => Expr::Accessible {
                id,
                index: index.map(|e| Box::new(e.strip_groups())),
            },
            Expr::Array(values) => {
                Expr::Array(values.into_iter().map(Expr::strip_groups).collect())
            }
            Expr::Print(value) => Expr::Print(Box::new(value.strip_groups())),
            Expr::Assign { target, op, value } => Expr::Assign {
                target: Box::new(target.strip_groups()),
                op,
                value: Box::new(value.strip_groups()),
            },
            Expr::Init { ty, id, value } => Expr::Init {
                ty,
                id,
                value: Box::new(value.strip_groups()),
            },
            Expr::If(chain) => Expr::If(chain.strip_groups()),
            Expr::Else { chain, body } => Expr::Else {
                chain: chain.strip_groups(),
                body: body.strip_groups(),
            },
            Expr::While { cond, body } => Expr::While {
                cond: Box::new(cond.strip_groups()),
                body: body.strip_groups(),
            },
            Expr::For {
                init,
                cond,
                incr,
                body,
            } => Expr::For {
                init: Box::new(init.strip_groups()),
                cond: Box::new(cond.strip_groups()),
                incr: Box::new(incr.strip_groups()),
                body: body.strip_groups(),
            },
            Expr::Func { ty, id, body } => Expr::Func {
                ty,
                id,
                body: body.strip_groups(),
            },
            Expr::Block(block) => Expr::Block(block.strip_groups()),
            other => other,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for expr in &self.exprs {
            writeln!(f, "{}", expr)?;
        }
        Ok(())
    }
}

impl fmt::Display for IfChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if ({})\n{{\n{}}}", self.cond, self.body)?;

        // An elif link re-prints as "if"; the "el" prefix comes from here.
        if let Some(elif) = &self.elif {
            write!(f, "\nel{}", elif)?;
        }

        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(token) => write!(f, "{}", token.literal),

            Expr::Accessible { id, index } => {
                write!(f, "{}", id.literal)?;
                if let Some(index) = index {
                    write!(f, "[{}]", index)?;
                }
                Ok(())
            }

            Expr::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }

            Expr::Unary { op, value } => write!(f, "({} {})", op.literal, value),

            Expr::Binary { left, op, right } => {
                write!(f, "({} {} {})", left, op.literal, right)
            }

            Expr::Group(inner) => write!(f, "{}", inner),

            Expr::Ternary {
                cond,
                case_true,
                case_false,
            } => write!(f, "({} ? {} : {})", cond, case_true, case_false),

            Expr::Cond(inner) => write!(f, "{}", inner),

            Expr::Print(value) => write!(f, "print ({})", value),

            Expr::Assign { target, op, value } => {
                write!(f, "({} {} {})", target, op.literal, value)
            }

            Expr::Init { ty, id, value } => {
                write!(f, "({} {} = {})", ty.literal, id.literal, value)
            }

            Expr::If(chain) => write!(f, "{}", chain),

            Expr::Else { chain, body } => {
                write!(f, "{}\nelse\n{{\n{}}}", chain, body)
            }

            Expr::ControlFlow(stmt) => write!(f, "{}", stmt.literal),

            Expr::While { cond, body } => {
                write!(f, "while ({})\n{{\n{}}}", cond, body)
            }

            Expr::For {
                init,
                cond,
                incr,
                body,
            } => {
                write!(f, "for ({}; {}; {})\n{{\n{}}}", init, cond, incr, body)
            }

            Expr::Func { ty, id, body } => {
                write!(f, "{} {} ()\n{{\n{}}}", ty.literal, id.literal, body)
            }

            Expr::Block(block) => write!(f, "{}", block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn int(n: &str) -> Expr {
        Expr::Literal(Token::new(TokenKind::Int, n))
    }

    fn add(left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op: Token::new(TokenKind::Add, "+"),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_strip_groups_removes_nesting() {
        let grouped = Expr::Group(Box::new(Expr::Group(Box::new(int("7")))));
        assert_eq!(grouped.strip_groups(), int("7"));
    }

    #[test]
    fn test_strip_groups_descends_into_operands() {
        let expr = add(Expr::Group(Box::new(int("1"))), int("2"));
        assert_eq!(expr.strip_groups(), add(int("1"), int("2")));
    }

    #[test]
    fn test_display_parenthesizes_binary() {
        let expr = add(int("1"), add(int("2"), int("3")));
        assert_eq!(format!("{}", expr), "(1 + (2 + 3))");
    }

    #[test]
    fn test_display_accessible_with_index() {
        let expr = Expr::Accessible {
            id: Token::new(TokenKind::Id, "xs"),
            index: Some(Box::new(int("0"))),
        };
        assert_eq!(format!("{}", expr), "xs[0]");
    }

    #[test]
    fn test_display_if_chain_prints_elif() {
        let chain = IfChain {
            cond: Box::new(int("1")),
            body: Block::new(),
            elif: Some(Box::new(IfChain {
                cond: Box::new(int("2")),
                body: Block::new(),
                elif: None,
            })),
        };
        let printed = format!("{}", Expr::If(chain));
        assert!(printed.contains("if (1)"));
        assert!(printed.contains("elif (2)"));
    }
}
