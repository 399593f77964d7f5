//! Assembly text buffer
//!
//! The sole writer of output text. `AsmBuf` owns an append-only string and
//! the label counter, and provides the shared emission sequences of the
//! stack-machine protocol: push a value, pop into a register, apply a
//! binary or unary instruction to the top of the runtime stack.

use crate::error::CompileError;
use std::fmt::Write as _;

/// Prefix for generated branch labels.
const LABEL_PREFIX: &str = "L";

/// General-purpose 32-bit registers used by the emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ebx,
    Ecx,
    Edx,
}

impl Reg {
    pub fn name(self) -> &'static str {
        match self {
            Reg::Eax => "eax",
            Reg::Ebx => "ebx",
            Reg::Ecx => "ecx",
            Reg::Edx => "edx",
        }
    }
}

/// Instructions emitted through the shared unary/binary helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Add,
    Sub,
    Imul,
    And,
    Or,
    Xor,
    Neg,
    Not,
}

impl Instr {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Instr::Add => "ADD",
            Instr::Sub => "SUB",
            Instr::Imul => "IMUL",
            Instr::And => "AND",
            Instr::Or => "OR",
            Instr::Xor => "XOR",
            Instr::Neg => "NEG",
            Instr::Not => "NOT",
        }
    }
}

/// Append-only assembly text accumulator with a monotonic label counter.
#[derive(Debug, Default)]
pub struct AsmBuf {
    text: String,
    label_count: usize,
}

impl AsmBuf {
    pub fn new() -> Self {
        AsmBuf::default()
    }

    /// The accumulated output text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the buffer, yielding the output text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of labels generated so far.
    pub fn label_count(&self) -> usize {
        self.label_count
    }

    /// Render the label with the given index.
    pub fn create_label(index: usize) -> String {
        format!("{}{}", LABEL_PREFIX, index)
    }

    /// Allocate the next label. Labels are never reused.
    pub fn generate_label(&mut self) -> String {
        let label = Self::create_label(self.label_count);
        self.label_count += 1;
        label
    }

    pub fn append_line(&mut self, code: &str) -> Result<(), CompileError> {
        writeln!(self.text, "{}", code)?;
        Ok(())
    }

    pub fn append_space(&mut self) -> Result<(), CompileError> {
        self.append_line("")
    }

    /// Emit a label definition line.
    pub fn append_label(&mut self, label: &str) -> Result<(), CompileError> {
        writeln!(self.text, "{}:", label)?;
        Ok(())
    }

    /// Push a value (immediate, register or memory operand) onto the
    /// runtime stack.
    pub fn push_value(&mut self, value: &str) -> Result<(), CompileError> {
        writeln!(self.text, "PUSH {}", value)?;
        Ok(())
    }

    /// Pop the top of the runtime stack into a register.
    pub fn pop_reg(&mut self, reg: Reg) -> Result<(), CompileError> {
        writeln!(self.text, "POP {}", reg.name())?;
        Ok(())
    }

    /// Apply a unary instruction to the top of the runtime stack.
    ///
    /// Goes through `edx`: several unary mnemonics use `eax` implicitly,
    /// so it is kept out of the way.
    pub fn append_unary(&mut self, instr: Instr) -> Result<(), CompileError> {
        self.pop_reg(Reg::Edx)?;
        writeln!(self.text, "{} edx", instr.mnemonic())?;
        self.push_value("edx")
    }

    /// Apply a binary instruction to the top two runtime-stack entries.
    ///
    /// The left operand is on top (it was evaluated second), so `eax`
    /// receives left and `ebx` receives right.
    pub fn append_binary(&mut self, instr: Instr) -> Result<(), CompileError> {
        self.pop_reg(Reg::Eax)?;
        self.pop_reg(Reg::Ebx)?;
        writeln!(self.text, "{} eax, ebx", instr.mnemonic())?;
        self.push_value("eax")
    }

    /// Open a counted loop: pops the iteration count into `ecx` and emits
    /// the backward-branch target. Returns the loop label for
    /// [`AsmBuf::exit_loop`].
    pub fn enter_loop(&mut self) -> Result<String, CompileError> {
        let label = self.generate_label();

        self.pop_reg(Reg::Ecx)?;
        self.append_label(&label)?;

        Ok(label)
    }

    /// Close a counted loop opened by [`AsmBuf::enter_loop`].
    pub fn exit_loop(&mut self, label: &str) -> Result<(), CompileError> {
        writeln!(self.text, "LOOP {}", label)?;
        Ok(())
    }

    /// Frame setup bracketing the user program.
    pub fn enter_method(&mut self) -> Result<(), CompileError> {
        self.append_line("PUSH ebp")?;
        self.append_line("MOV ebp, esp")?;
        self.append_space()
    }

    /// Frame teardown bracketing the user program.
    pub fn exit_method(&mut self) -> Result<(), CompileError> {
        self.append_line("MOV esp, ebp")?;
        self.append_line("POP ebp")?;
        self.append_space()
    }

    /// Assembler directives and the entry label.
    pub fn file_prologue(&mut self) -> Result<(), CompileError> {
        self.append_line("include \\masm32\\include\\masm32rt.inc")?;
        self.append_space()?;
        self.append_line(".code")?;
        self.append_line("start:")?;
        self.append_space()
    }

    pub fn file_epilogue(&mut self) -> Result<(), CompileError> {
        self.append_space()?;
        self.append_line("end start")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_monotonic_and_unique() {
        let mut asm = AsmBuf::new();
        assert_eq!(asm.generate_label(), "L0");
        assert_eq!(asm.generate_label(), "L1");
        assert_eq!(asm.generate_label(), "L2");
        assert_eq!(asm.label_count(), 3);
    }

    #[test]
    fn test_binary_helper_sequence() {
        let mut asm = AsmBuf::new();
        asm.append_binary(Instr::Add).unwrap();
        assert_eq!(asm.text(), "POP eax\nPOP ebx\nADD eax, ebx\nPUSH eax\n");
    }

    #[test]
    fn test_unary_helper_avoids_eax() {
        let mut asm = AsmBuf::new();
        asm.append_unary(Instr::Neg).unwrap();
        assert_eq!(asm.text(), "POP edx\nNEG edx\nPUSH edx\n");
    }

    #[test]
    fn test_counted_loop_brackets() {
        let mut asm = AsmBuf::new();
        let label = asm.enter_loop().unwrap();
        asm.append_line("IMUL eax, ebx").unwrap();
        asm.exit_loop(&label).unwrap();
        assert_eq!(asm.text(), "POP ecx\nL0:\nIMUL eax, ebx\nLOOP L0\n");
    }

    #[test]
    fn test_file_framing() {
        let mut asm = AsmBuf::new();
        asm.file_prologue().unwrap();
        asm.file_epilogue().unwrap();
        let text = asm.text();
        assert!(text.contains(".code"));
        assert!(text.contains("start:"));
        assert!(text.trim_end().ends_with("end start"));
    }
}
