//! Value-position code generation
//!
//! Every method here emits code that leaves a 32-bit result on top of the
//! runtime stack and reports the type of that result. Binary operators
//! evaluate right before left so that the left operand ends up on top,
//! where the shared pop sequences expect it.

use super::CodeGen;
use super::asm::{Instr, Reg};
use crate::ast::Expr;
use crate::error::CompileError;
use crate::token::{FALSE_LITERAL, Token, TokenKind};
use crate::types::{Ty, TypeTable};

impl CodeGen {
    /// Emit evaluation of a value expression; the result is pushed and its
    /// type returned.
    pub(super) fn emit_value(&mut self, expr: &Expr) -> Result<Ty, CompileError> {
        match expr {
            Expr::Literal(token) => self.emit_literal(token),

            Expr::Accessible { id, .. } => {
                let var = self
                    .scopes
                    .lookup(&id.literal)
                    .ok_or_else(|| CompileError::UndefinedVariable {
                        name: id.literal.clone(),
                    })?;

                self.asm.push_value(&var.pointer())?;
                Ok(var.ty)
            }

            Expr::Array(_) => Err(CompileError::InvalidLiteral {
                literal: expr.to_string(),
            }),

            Expr::Unary { op, value } => self.emit_unary(op, value),

            Expr::Binary { left, op, right } => self.emit_binary(left, op, right),

            Expr::Group(inner) => self.emit_value(inner),

            Expr::Ternary {
                cond,
                case_true,
                case_false,
            } => self.emit_ternary(cond, case_true, case_false),

            // The boolean-context marker changes the reported type, not
            // the evaluation; the consumer emits the zero test.
            Expr::Cond(inner) => {
                self.emit_value(inner)?;
                Ok(Ty::Bool)
            }

            _ => unreachable!("value emission only receives value expressions"),
        }
    }

    fn emit_literal(&mut self, token: &Token) -> Result<Ty, CompileError> {
        match TypeTable::of_literal(token.kind) {
            Some(Ty::Bool) => {
                let bit = if token.literal == FALSE_LITERAL { "0" } else { "1" };
                self.asm.push_value(bit)?;
                Ok(Ty::Bool)
            }

            Some(Ty::Int) => {
                self.asm.push_value(&token.literal)?;
                Ok(Ty::Int)
            }

            // Floats and chars have no value representation in the
            // integer-only evaluation protocol.
            _ => Err(CompileError::InvalidLiteral {
                literal: token.literal.clone(),
            }),
        }
    }

    fn emit_unary(&mut self, op: &Token, value: &Expr) -> Result<Ty, CompileError> {
        let ty = self.emit_value(value)?;

        match op.kind {
            TokenKind::Sub => self.asm.append_unary(Instr::Neg)?,
            TokenKind::Not => self.emit_not()?,
            TokenKind::BitNot => self.asm.append_unary(Instr::Not)?,
            // Unary plus leaves the pushed value as-is.
            TokenKind::Add => {}
            _ => unreachable!("parser only produces prefix + - ! ~"),
        }

        self.asm.append_space()?;
        Ok(ty)
    }

    fn emit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Ty, CompileError> {
        // Right first: the runtime stack is LIFO, so evaluating left last
        // leaves it on top for the pop sequences.
        let right_ty = self.emit_value(right)?;
        let left_ty = self.emit_value(left)?;

        let has_float = right_ty == Ty::Float || left_ty == Ty::Float;
        let arith_ty = if has_float { Ty::Float } else { left_ty };

        let ty = match op.kind {
            TokenKind::Add => {
                self.asm.append_binary(Instr::Add)?;
                arith_ty
            }
            TokenKind::Sub => {
                self.asm.append_binary(Instr::Sub)?;
                arith_ty
            }
            TokenKind::Mult => {
                self.asm.append_binary(Instr::Imul)?;
                arith_ty
            }

            TokenKind::Div => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line("MOV edx, 0")?;
                self.asm.pop_reg(Reg::Ebx)?;
                self.asm.append_line("IDIV ebx")?;
                self.asm.push_value("eax")?;
                arith_ty
            }

            TokenKind::Mod => {
                if has_float {
                    return Err(CompileError::IllegalFloatOperator {
                        op: op.literal.clone(),
                    });
                }
                self.emit_modulo()?;
                left_ty
            }

            TokenKind::And => {
                if has_float {
                    return Err(CompileError::IllegalFloatOperator {
                        op: op.literal.clone(),
                    });
                }
                self.emit_and()?;
                left_ty
            }

            TokenKind::Or => {
                if has_float {
                    return Err(CompileError::IllegalFloatOperator {
                        op: op.literal.clone(),
                    });
                }
                self.emit_or()?;
                left_ty
            }

            TokenKind::Pow => {
                self.emit_pow()?;
                left_ty
            }

            TokenKind::BitAnd => {
                self.asm.append_binary(Instr::And)?;
                left_ty
            }
            TokenKind::BitOr => {
                self.asm.append_binary(Instr::Or)?;
                left_ty
            }
            TokenKind::BitXor => {
                self.asm.append_binary(Instr::Xor)?;
                left_ty
            }

            TokenKind::Shl | TokenKind::Shr => {
                self.emit_shift(op.kind)?;
                left_ty
            }

            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Greater
            | TokenKind::GreaterEq
            | TokenKind::Less
            | TokenKind::LessEq => {
                self.emit_condition(op.kind)?;
                Ty::Bool
            }

            _ => unreachable!("parser only produces binary operators here"),
        };

        self.asm.append_space()?;
        Ok(ty)
    }

    /// Boolean NOT of the pushed value: zero becomes 1, non-zero 0.
    fn emit_not(&mut self) -> Result<(), CompileError> {
        let is_false = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.asm.pop_reg(Reg::Edx)?;
        self.asm.append_line("CMP edx, 0")?;
        self.asm.append_line(&format!("JZ {}", is_false))?;

        self.asm.push_value("0")?;
        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_line(&format!("{}: PUSH 1", is_false))?;
        self.asm.append_label(&exit)
    }

    /// Boolean AND: both operands are already pushed and both are tested.
    fn emit_and(&mut self) -> Result<(), CompileError> {
        let has_zero = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.pop_reg(Reg::Ebx)?;

        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JZ {}", has_zero))?;
        self.asm.append_line("CMP ebx, 0")?;
        self.asm.append_line(&format!("JZ {}", has_zero))?;

        self.asm.push_value("1")?;
        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_line(&format!("{}: PUSH 0", has_zero))?;
        self.asm.append_label(&exit)
    }

    /// Boolean OR, symmetric to AND with the tests inverted.
    fn emit_or(&mut self) -> Result<(), CompileError> {
        let has_one = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.pop_reg(Reg::Ebx)?;

        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JNZ {}", has_one))?;
        self.asm.append_line("CMP ebx, 0")?;
        self.asm.append_line(&format!("JNZ {}", has_one))?;

        self.asm.push_value("0")?;
        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_line(&format!("{}: PUSH 1", has_one))?;
        self.asm.append_label(&exit)
    }

    /// Remainder of the two pushed operands; quotient is discarded.
    fn emit_modulo(&mut self) -> Result<(), CompileError> {
        self.asm.pop_reg(Reg::Eax)?;
        self.asm.append_line("MOV edx, 0")?;
        self.asm.pop_reg(Reg::Ebx)?;
        self.asm.append_line("IDIV ebx")?;
        self.asm.push_value("edx")
    }

    /// Exponentiation by repeated multiply. The exponent was pushed first
    /// and ends up in `ecx` as the `LOOP` counter; it must be a positive
    /// integer for the loop to terminate.
    fn emit_pow(&mut self) -> Result<(), CompileError> {
        self.asm.pop_reg(Reg::Ebx)?;
        self.asm.append_line("MOV eax, 1")?;
        self.asm.append_space()?;

        let loop_label = self.asm.enter_loop()?;
        self.asm.append_line("IMUL eax, ebx")?;
        self.asm.exit_loop(&loop_label)?;

        self.asm.push_value("eax")
    }

    /// Shift left/right: the count moves through `cl`.
    fn emit_shift(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        let instr = if kind == TokenKind::Shl { "SHL" } else { "SHR" };

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.pop_reg(Reg::Ecx)?;
        self.asm.append_line(&format!("{} eax, cl", instr))?;
        self.asm.push_value("eax")
    }

    /// Relational comparison selecting `PUSH 1` or `PUSH 0` through the
    /// matching conditional jump.
    fn emit_condition(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        let jump = match kind {
            TokenKind::EqEq => "JE",
            TokenKind::NotEq => "JNE",
            TokenKind::Greater => "JG",
            TokenKind::GreaterEq => "JGE",
            TokenKind::Less => "JL",
            TokenKind::LessEq => "JLE",
            _ => unreachable!("not a relational operator"),
        };

        let case_true = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.pop_reg(Reg::Ebx)?;
        self.asm.append_line("CMP eax, ebx")?;
        self.asm.append_line(&format!("{} {}", jump, case_true))?;
        self.asm.push_value("0")?;
        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_line(&format!("{}: PUSH 1", case_true))?;
        self.asm.append_label(&exit)
    }

    /// Ternary selection. Both branches must agree on their value type.
    fn emit_ternary(
        &mut self,
        cond: &Expr,
        case_true: &Expr,
        case_false: &Expr,
    ) -> Result<Ty, CompileError> {
        let case_false_label = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.emit_value(cond)?;

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JZ {}", case_false_label))?;
        self.asm.append_space()?;

        let true_ty = self.emit_value(case_true)?;
        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_space()?;

        self.asm.append_label(&case_false_label)?;
        let false_ty = self.emit_value(case_false)?;

        self.asm.append_label(&exit)?;
        self.asm.append_space()?;

        if true_ty != false_ty {
            return Err(CompileError::TernaryTypeMismatch);
        }

        Ok(true_ty)
    }
}
