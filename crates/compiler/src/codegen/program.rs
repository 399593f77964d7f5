//! Whole-program code generation
//!
//! Wraps the root block in the file and method framing: assembler
//! directives and the entry label outside, frame setup and teardown
//! inside.

use super::CodeGen;
use crate::ast::Block;
use crate::error::CompileError;

/// Compile a parsed program into assembly text.
pub fn compile(block: &Block) -> Result<String, CompileError> {
    let mut codegen = CodeGen::new();
    codegen.emit_program(block)?;
    Ok(codegen.into_text())
}

impl CodeGen {
    /// Emit the complete output for one program.
    pub fn emit_program(&mut self, block: &Block) -> Result<(), CompileError> {
        self.asm.file_prologue()?;
        self.asm.enter_method()?;

        self.emit_block(block)?;

        self.asm.exit_method()?;
        self.asm.file_epilogue()
    }

    /// Consume the generator, yielding the emitted text.
    pub fn into_text(self) -> String {
        self.asm.into_text()
    }
}
