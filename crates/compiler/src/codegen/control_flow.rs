//! Control-flow code generation
//!
//! Branch chains share one exit label; each branch gets its own false
//! label. Loop bodies are emitted under a loop context carrying the labels
//! `break` and `continue` resolve to, and under a fresh variable scope.

use super::CodeGen;
use super::asm::Reg;
use super::state::LoopLabels;
use crate::ast::{Block, Expr, IfChain};
use crate::error::CompileError;
use crate::token::{Token, TokenKind};

impl CodeGen {
    /// `if`/`elif` chain without a trailing `else`.
    pub(super) fn emit_if(&mut self, chain: &IfChain) -> Result<(), CompileError> {
        let exit = self.asm.generate_label();

        self.emit_if_chain(chain, &exit)?;
        self.asm.append_label(&exit)
    }

    /// `if`/`elif` chain with a trailing `else`.
    ///
    /// The chain is emitted once; the else body sits at the fall-through
    /// point after the last false label, before the shared exit.
    pub(super) fn emit_else(&mut self, chain: &IfChain, body: &Block) -> Result<(), CompileError> {
        let exit = self.asm.generate_label();

        self.emit_if_chain(chain, &exit)?;
        self.emit_scoped_block(body)?;
        self.asm.append_label(&exit)
    }

    /// Emit one chain link: test, body, jump to the shared exit, false
    /// label, then recurse into the next link.
    fn emit_if_chain(&mut self, chain: &IfChain, exit: &str) -> Result<(), CompileError> {
        let false_label = self.asm.generate_label();

        self.emit_value(&chain.cond)?;

        self.asm.pop_reg(Reg::Eax)?;
        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JZ {}", false_label))?;
        self.asm.append_space()?;

        self.emit_scoped_block(&chain.body)?;

        self.asm.append_line(&format!("JMP {}", exit))?;
        self.asm.append_label(&false_label)?;

        if let Some(elif) = &chain.elif {
            self.emit_if_chain(elif, exit)?;
        }

        Ok(())
    }

    /// `while`: both labels exist before the condition is evaluated, so
    /// the loop's own labels number lower than any the condition makes.
    pub(super) fn emit_while(&mut self, cond: &Expr, body: &Block) -> Result<(), CompileError> {
        let start = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.asm.append_label(&start)?;

        self.emit_value(cond)?;
        self.asm.pop_reg(Reg::Eax)?;
        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JZ {}", exit))?;

        self.emit_loop_body(body, &start, &exit)?;

        self.asm.append_line(&format!("JMP {}", start))?;
        self.asm.append_label(&exit)
    }

    /// `for`: the init clause runs in the enclosing scope; `continue`
    /// targets the increment step, which runs in the enclosing scope too.
    pub(super) fn emit_for(
        &mut self,
        init: &Expr,
        cond: &Expr,
        incr: &Expr,
        body: &Block,
    ) -> Result<(), CompileError> {
        let start = self.asm.generate_label();
        let exit = self.asm.generate_label();

        self.emit_statement(init)?;

        self.asm.append_label(&start)?;

        self.emit_value(cond)?;
        self.asm.pop_reg(Reg::Eax)?;
        self.asm.append_line("CMP eax, 0")?;
        self.asm.append_line(&format!("JZ {}", exit))?;

        let incr_label = self.asm.generate_label();

        self.emit_loop_body(body, &incr_label, &exit)?;

        self.asm.append_label(&incr_label)?;
        self.emit_statement(incr)?;
        self.asm.append_line(&format!("JMP {}", start))?;

        self.asm.append_label(&exit)
    }

    /// `break`/`continue`, resolved against the innermost loop context.
    pub(super) fn emit_control_flow(&mut self, stmt: &Token) -> Result<(), CompileError> {
        let Some(labels) = self.loops.last().cloned() else {
            return Err(CompileError::ControlFlowOutsideLoop);
        };

        match stmt.kind {
            TokenKind::Break => self
                .asm
                .append_line(&format!("JMP {} ; break", labels.exit)),
            TokenKind::Continue => self
                .asm
                .append_line(&format!("JMP {} ; continue", labels.enter)),
            _ => unreachable!("parser only produces break/continue here"),
        }
    }

    /// Emit a block under a fresh variable scope.
    fn emit_scoped_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.scopes.push();
        let result = self.emit_block(block);
        self.scopes.pop();
        result
    }

    /// Emit a loop body: fresh scope plus a loop context for
    /// `break`/`continue`.
    fn emit_loop_body(
        &mut self,
        block: &Block,
        enter: &str,
        exit: &str,
    ) -> Result<(), CompileError> {
        self.loops.push(LoopLabels {
            enter: enter.to_string(),
            exit: exit.to_string(),
        });

        let result = self.emit_scoped_block(block);

        self.loops.pop();
        result
    }
}
