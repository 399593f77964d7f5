//! Statement-position code generation
//!
//! Dispatches each node of a block. Value-producing nodes in statement
//! position delegate to the value emitter; declarations, assignments and
//! `print` have their own sequences; control flow lives in
//! `control_flow.rs`.

use super::CodeGen;
use super::asm::Reg;
use super::scope::SLOT_SIZE;
use crate::ast::{Block, Expr};
use crate::error::CompileError;
use crate::token::{Token, TokenKind};
use crate::types::Ty;

impl CodeGen {
    /// Emit every statement of a block, in order.
    pub(super) fn emit_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for expr in &block.exprs {
            self.emit_statement(expr)?;
        }
        Ok(())
    }

    /// Emit one statement.
    pub(super) fn emit_statement(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            // A bare value expression in statement position still
            // evaluates; its result is left on the runtime stack.
            Expr::Literal(_)
            | Expr::Accessible { .. }
            | Expr::Array(_)
            | Expr::Unary { .. }
            | Expr::Binary { .. }
            | Expr::Group(_)
            | Expr::Ternary { .. }
            | Expr::Cond(_) => {
                self.emit_value(expr)?;
                Ok(())
            }

            Expr::Print(value) => self.emit_print(value),

            Expr::Assign { target, op, value } => self.emit_assign(target, op, value),

            Expr::Init { id, value, .. } => self.emit_init(id, value),

            Expr::If(chain) => self.emit_if(chain),
            Expr::Else { chain, body } => self.emit_else(chain, body),
            Expr::ControlFlow(stmt) => self.emit_control_flow(stmt),
            Expr::While { cond, body } => self.emit_while(cond, body),
            Expr::For {
                init,
                cond,
                incr,
                body,
            } => self.emit_for(init, cond, incr, body),

            // Function bodies are parsed but not compiled.
            Expr::Func { .. } => Ok(()),

            Expr::Block(block) => self.emit_block(block),
        }
    }

    /// Evaluate the argument, then call into the runtime. The value is
    /// consumed from the runtime stack by the callee.
    fn emit_print(&mut self, value: &Expr) -> Result<(), CompileError> {
        self.emit_value(value)?;
        self.asm.append_line("CALL print_number")?;
        self.asm.append_space()
    }

    /// Assignment through `=` or a compound operator.
    ///
    /// The right-hand side is evaluated exactly once; compound forms then
    /// read-modify-write the variable's slot.
    fn emit_assign(
        &mut self,
        target: &Expr,
        op: &Token,
        value: &Expr,
    ) -> Result<(), CompileError> {
        let Expr::Accessible { id, .. } = target else {
            unreachable!("parser guarantees an accessible assignment target");
        };

        let var =
            self.scopes
                .lookup(&id.literal)
                .ok_or_else(|| CompileError::UndefinedVariable {
                    name: id.literal.clone(),
                })?;

        self.emit_value(value)?;

        let ptr = var.pointer();

        match op.kind {
            TokenKind::Eq => {
                self.asm.append_line(&format!("POP {}", ptr))?;
            }

            TokenKind::AddEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("ADD {}, eax", ptr))?;
            }

            TokenKind::SubEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("SUB {}, eax", ptr))?;
            }

            TokenKind::MultEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("IMUL eax, {}", ptr))?;
                self.asm.append_line(&format!("MOV {}, eax", ptr))?;
            }

            TokenKind::DivEq => {
                self.asm.pop_reg(Reg::Ebx)?;
                self.asm.append_line(&format!("MOV eax, {}", ptr))?;
                self.asm.append_line("MOV edx, 0")?;
                self.asm.append_line("IDIV ebx")?;
                self.asm.append_line(&format!("MOV {}, eax", ptr))?;
            }

            TokenKind::ModEq => {
                self.asm.pop_reg(Reg::Ebx)?;
                self.asm.append_line(&format!("MOV eax, {}", ptr))?;
                self.asm.append_line("MOV edx, 0")?;
                self.asm.append_line("IDIV ebx")?;
                self.asm.append_line(&format!("MOV {}, edx", ptr))?;
            }

            TokenKind::PowEq => {
                // The evaluated value is the exponent; the slot holds the
                // base. Same repeated-multiply idiom as the value operator.
                self.asm.append_line(&format!("MOV ebx, {}", ptr))?;
                self.asm.append_line("MOV eax, 1")?;

                let loop_label = self.asm.enter_loop()?;
                self.asm.append_line("IMUL eax, ebx")?;
                self.asm.exit_loop(&loop_label)?;

                self.asm.append_line(&format!("MOV {}, eax", ptr))?;
            }

            TokenKind::BitAndEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("AND {}, eax", ptr))?;
            }

            TokenKind::BitOrEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("OR {}, eax", ptr))?;
            }

            TokenKind::BitXorEq => {
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("XOR {}, eax", ptr))?;
            }

            TokenKind::ShlEq => {
                self.asm.pop_reg(Reg::Ecx)?;
                self.asm.append_line(&format!("SHL {}, cl", ptr))?;
            }

            TokenKind::ShrEq => {
                self.asm.pop_reg(Reg::Ecx)?;
                self.asm.append_line(&format!("SHR {}, cl", ptr))?;
            }

            TokenKind::BitNotEq => {
                // `~` is unary: the evaluated value is discarded and the
                // slot is complemented in place.
                self.asm.pop_reg(Reg::Eax)?;
                self.asm.append_line(&format!("NOT {}", ptr))?;
            }

            _ => unreachable!("parser guarantees an assignment operator"),
        }

        self.asm.append_space()
    }

    /// Variable declaration: evaluate, save, grow the frame, store.
    ///
    /// The evaluated value's type becomes the variable's type.
    fn emit_init(&mut self, id: &Token, value: &Expr) -> Result<(), CompileError> {
        let ty = self.emit_init_value(value)?;

        self.asm.pop_reg(Reg::Eax)?;

        let var = self.scopes.declare(&id.literal, ty)?;

        self.asm.append_line(&format!("SUB esp, {}", SLOT_SIZE))?;
        self.asm.push_value("eax")?;
        self.asm.append_line(&format!("POP {}", var.pointer()))?;
        self.asm.append_space()
    }

    /// Evaluate a declaration's right-hand side.
    ///
    /// Declarations chain right-associatively (`int x = int y = 1`); an
    /// inner declaration runs as a statement and its freshly stored slot
    /// is re-pushed as the outer declaration's value.
    fn emit_init_value(&mut self, value: &Expr) -> Result<Ty, CompileError> {
        if let Expr::Init { id, .. } = value {
            self.emit_statement(value)?;

            let var = self
                .scopes
                .lookup(&id.literal)
                .expect("inner declaration just bound this name");

            self.asm.push_value(&var.pointer())?;
            return Ok(var.ty);
        }

        self.emit_value(value)
    }
}
