//! x86 code generation
//!
//! Walks the AST and emits 32-bit x86 assembly text. Evaluation follows a
//! stack-machine protocol: every expression leaves its result pushed on
//! the runtime stack, so composition is uniform. Emission order is the
//! left-to-right, depth-first traversal of the tree.
//!
//! # Module structure
//!
//! - `asm.rs`: append-only text buffer, label counter, shared sequences
//! - `scope.rs`: variable scopes and frame layout
//! - `state.rs`: the `CodeGen` context threaded through emission
//! - `program.rs`: file and method framing around the root block
//! - `statements.rs`: statement-position emission
//! - `values.rs`: value-position emission (reports the value's type)
//! - `control_flow.rs`: branches, loops, `break`/`continue`

mod asm;
mod control_flow;
mod program;
mod scope;
mod state;
mod statements;
mod values;

pub use program::compile;
pub use scope::SLOT_SIZE;
pub use state::CodeGen;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Block;
    use crate::error::CompileError;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use std::collections::HashSet;

    fn parse_source(source: &str) -> Block {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn compile_source(source: &str) -> Result<String, CompileError> {
        compile(&parse_source(source))
    }

    fn asm(source: &str) -> String {
        compile_source(source).unwrap()
    }

    /// Position of `needle` in `text`, asserting it occurs.
    fn pos(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("expected '{}' in:\n{}", needle, text))
    }

    fn count(text: &str, needle: &str) -> usize {
        text.matches(needle).count()
    }

    /// All distinct `L<N>` labels appearing in the text, whether as a
    /// definition or a branch target.
    fn distinct_labels(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| {
                word.len() > 1
                    && word.starts_with('L')
                    && word[1..].chars().all(|c| c.is_ascii_digit())
            })
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_empty_program_is_framing_only() {
        let text = asm("");
        assert_eq!(
            text,
            "include \\masm32\\include\\masm32rt.inc\n\n.code\nstart:\n\n\
             PUSH ebp\nMOV ebp, esp\n\n\
             MOV esp, ebp\nPOP ebp\n\n\
             \nend start\n"
        );
    }

    #[test]
    fn test_addition_declaration_sequence() {
        let text = asm("int x = 1 + 2");

        // Right operand first, then left, then the pop-apply-push.
        let push2 = pos(&text, "PUSH 2");
        let push1 = pos(&text, "PUSH 1");
        assert!(push2 < push1);

        let apply = pos(&text, "POP eax\nPOP ebx\nADD eax, ebx\nPUSH eax");
        assert!(push1 < apply);

        let alloc = pos(&text, "SUB esp, 4");
        let store = pos(&text, "POP DWORD [ebp-4]");
        assert!(apply < alloc);
        assert!(alloc < store);
    }

    #[test]
    fn test_print_loads_variable_then_calls_runtime() {
        let text = asm("int x = 5\nprint(x)");

        let load = pos(&text, "PUSH DWORD [ebp-4]");
        let call = pos(&text, "CALL print_number");
        assert!(load < call);
    }

    #[test]
    fn test_while_labels_and_continue_target() {
        let text = asm("while 0 == 1\n\tcontinue");

        // The loop's own labels are allocated before the condition's.
        assert!(text.contains("L0:"));
        assert!(text.contains("JZ L1"));
        assert!(text.contains("JMP L0 ; continue"));
        assert!(text.contains("JMP L0\nL1:"));
    }

    #[test]
    fn test_if_elif_else_three_way_dispatch() {
        let source = "if 1 == 1\n\tint a = 1\nelif 1 == 2\n\tint a = 2\nelse\n\tint a = 3";
        let text = asm(source);

        // Shared exit is the first label; two chain branches jump to it.
        assert_eq!(count(&text, "JMP L0"), 2);
        assert_eq!(count(&text, "L0:"), 1);

        // Branch false labels cascade: first branch's false label leads
        // into the second test, the second's into the else body.
        let first_false = pos(&text, "L1:");
        let second_test = text[first_false..].find("CMP eax, 0").unwrap() + first_false;
        let second_false = pos(&text, "L4:");
        assert!(first_false < second_test);
        assert!(second_test < second_false);

        // Each branch stores into its own slot; the else body is emitted
        // exactly once, after the last false label.
        let else_store = pos(&text, "POP DWORD [ebp-12]");
        let exit_label = pos(&text, "\nL0:");
        assert!(second_false < else_store);
        assert!(else_store < exit_label);
        assert_eq!(count(&text, "PUSH 3"), 1);
    }

    #[test]
    fn test_break_outside_loop_is_an_error() {
        assert_eq!(
            compile_source("break").unwrap_err(),
            CompileError::ControlFlowOutsideLoop
        );
    }

    #[test]
    fn test_for_loop_shape() {
        let text = asm("for int i = 0 , i < 3 , i = i + 1\n\tprint(i)");

        // Init before the start label, body before the increment label,
        // increment before the back-jump, exit label last.
        let init = pos(&text, "SUB esp, 4");
        let start = pos(&text, "L0:");
        let body = pos(&text, "CALL print_number");
        let incr_label = pos(&text, "L4:");
        let back_jump = pos(&text, "JMP L0");
        let exit = pos(&text, "L1:");

        assert!(init < start);
        assert!(start < body);
        assert!(body < incr_label);
        assert!(incr_label < back_jump);
        assert!(back_jump < exit);
    }

    #[test]
    fn test_continue_in_for_targets_increment_step() {
        let text = asm("for int i = 0 , i < 3 , i = i + 1\n\tcontinue");
        assert!(text.contains("JMP L4 ; continue"));
    }

    #[test]
    fn test_break_targets_innermost_loop() {
        let source = "while 0 == 0\n\twhile 0 == 0\n\t\tbreak";
        let text = asm(source);

        // Outer loop: L0/L1. Inner loop: L4/L5 (outer condition takes
        // L2/L3). Break must target the inner exit.
        assert!(text.contains("JMP L5 ; break"));
        assert!(!text.contains("JMP L1 ; break"));
    }

    #[test]
    fn test_label_counter_matches_emitted_labels() {
        let source = "int x = 0\nwhile x < 3\n\tif x == 1\n\t\tx += 2\n\tx = x + 1\nprint(x)";
        let block = parse_source(source);

        let mut codegen = CodeGen::new();
        codegen.emit_program(&block).unwrap();

        let labels = distinct_labels(codegen.text());
        assert_eq!(labels.len(), codegen.label_count());
    }

    #[test]
    fn test_frame_references_match_allocated_offsets() {
        let source = "int x = 1\nint y = 2\ny = x";
        let block = parse_source(source);

        let mut codegen = CodeGen::new();
        codegen.emit_program(&block).unwrap();
        assert_eq!(codegen.frame_bytes(), 8);

        let text = codegen.into_text();
        assert!(text.contains("[ebp-4]"));
        assert!(text.contains("[ebp-8]"));
        assert!(!text.contains("[ebp-12]"));
    }

    #[test]
    fn test_undefined_variable_in_assignment() {
        assert_eq!(
            compile_source("x = 5").unwrap_err(),
            CompileError::UndefinedVariable {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_variable_in_read() {
        assert!(matches!(
            compile_source("print(y)").unwrap_err(),
            CompileError::UndefinedVariable { .. }
        ));
    }

    #[test]
    fn test_duplicate_definition_in_same_scope() {
        assert!(matches!(
            compile_source("int x = 1\nint x = 2").unwrap_err(),
            CompileError::DuplicateDefinition { .. }
        ));
    }

    #[test]
    fn test_shadowing_in_nested_scope_is_allowed() {
        assert!(compile_source("int x = 1\nif 1 == 1\n\tint x = 2").is_ok());
    }

    #[test]
    fn test_inner_scope_reads_outer_variable() {
        let text = asm("int x = 1\nwhile x < 3\n\tx = x + 1");
        assert!(text.contains("POP DWORD [ebp-4]"));
    }

    #[test]
    fn test_ternary_branch_types_must_agree() {
        assert_eq!(
            compile_source("int x = 1 ? 2 : true").unwrap_err(),
            CompileError::TernaryTypeMismatch
        );
    }

    #[test]
    fn test_ternary_emits_both_branches() {
        let text = asm("int x = 1 ? 2 : 3");
        let push_true = pos(&text, "PUSH 2");
        let push_false = pos(&text, "PUSH 3");
        assert!(push_true < push_false);
    }

    #[test]
    fn test_float_literal_is_invalid() {
        assert!(matches!(
            compile_source("int x = 1.5").unwrap_err(),
            CompileError::InvalidLiteral { .. }
        ));
    }

    #[test]
    fn test_char_literal_is_invalid() {
        assert!(matches!(
            compile_source("int x = 'a'").unwrap_err(),
            CompileError::InvalidLiteral { .. }
        ));
    }

    #[test]
    fn test_array_literal_has_no_code_path() {
        assert!(matches!(
            compile_source("int x = [1, 2]").unwrap_err(),
            CompileError::InvalidLiteral { .. }
        ));
    }

    #[test]
    fn test_bool_literals_push_bits() {
        let text = asm("bool t = true\nbool f = false");
        let push_one = pos(&text, "PUSH 1");
        let push_zero = pos(&text, "PUSH 0");
        assert!(push_one < push_zero);
    }

    #[test]
    fn test_boolean_and_evaluates_both_operands() {
        let text = asm("int x = 1 && 0");
        // Both operands are pushed before any test.
        let push0 = pos(&text, "PUSH 0");
        let push1 = pos(&text, "PUSH 1");
        let test = pos(&text, "CMP eax, 0");
        assert!(push0 < test);
        assert!(push1 < test);
        assert!(text.contains("JZ "));
    }

    #[test]
    fn test_boolean_or_uses_inverted_tests() {
        let text = asm("int x = 0 || 1");
        assert!(text.contains("JNZ "));
    }

    #[test]
    fn test_relational_selects_bit() {
        let text = asm("int x = 1 < 2");
        assert!(text.contains("CMP eax, ebx"));
        assert!(text.contains("JL "));
        assert!(text.contains(": PUSH 1"));
    }

    #[test]
    fn test_division_zeroes_edx_and_pushes_quotient() {
        let text = asm("int x = 7 / 2");
        assert!(text.contains("MOV edx, 0\nPOP ebx\nIDIV ebx\nPUSH eax"));
    }

    #[test]
    fn test_modulo_pushes_remainder() {
        let text = asm("int x = 7 % 2");
        assert!(text.contains("IDIV ebx\nPUSH edx"));
    }

    #[test]
    fn test_power_uses_counted_loop() {
        let text = asm("int x = 2 ** 3");
        // Exponent pushed first, base popped into ebx, counted multiply.
        let seq = pos(&text, "POP ebx\nMOV eax, 1");
        let body = pos(&text, "POP ecx\nL0:\nIMUL eax, ebx\nLOOP L0");
        assert!(seq < body);
    }

    #[test]
    fn test_bitwise_operators_share_binary_helper() {
        let text = asm("int x = 6 & 3\nx = 6 | 3\nx = 6 ^ 3");
        assert!(text.contains("AND eax, ebx"));
        assert!(text.contains("OR eax, ebx"));
        assert!(text.contains("XOR eax, ebx"));
    }

    #[test]
    fn test_shift_count_moves_through_cl() {
        let text = asm("int x = 1 << 3");
        assert!(text.contains("POP eax\nPOP ecx\nSHL eax, cl\nPUSH eax"));
    }

    #[test]
    fn test_unary_minus_goes_through_edx() {
        let text = asm("int x = -5");
        assert!(text.contains("POP edx\nNEG edx\nPUSH edx"));
    }

    #[test]
    fn test_bitwise_not_unary() {
        let text = asm("int x = ~5");
        assert!(text.contains("POP edx\nNOT edx\nPUSH edx"));
    }

    #[test]
    fn test_compound_add_assignment() {
        let text = asm("int x = 1\nx += 2");
        assert!(text.contains("ADD DWORD [ebp-4], eax"));
        // The right-hand side is evaluated exactly once.
        assert_eq!(count(&text, "PUSH 2"), 1);
    }

    #[test]
    fn test_compound_divide_assignment() {
        let text = asm("int x = 8\nx /= 2");
        assert!(text.contains("POP ebx\nMOV eax, DWORD [ebp-4]\nMOV edx, 0\nIDIV ebx"));
        assert!(text.contains("MOV DWORD [ebp-4], eax"));
    }

    #[test]
    fn test_compound_shift_assignment() {
        let text = asm("int x = 1\nx <<= 3");
        assert!(text.contains("POP ecx\nSHL DWORD [ebp-4], cl"));
    }

    #[test]
    fn test_compound_power_assignment() {
        let text = asm("int x = 2\nx **= 3");
        assert!(text.contains("MOV ebx, DWORD [ebp-4]\nMOV eax, 1"));
        assert!(text.contains("LOOP "));
        assert!(text.contains("MOV DWORD [ebp-4], eax"));
    }

    #[test]
    fn test_chained_declaration_initializes_both() {
        let text = asm("int x = int y = 5");
        // Inner declaration stores y, then its slot is re-pushed for x.
        let store_y = pos(&text, "POP DWORD [ebp-4]");
        let reload = pos(&text, "PUSH DWORD [ebp-4]");
        let store_x = pos(&text, "POP DWORD [ebp-8]");
        assert!(store_y < reload);
        assert!(reload < store_x);
    }

    #[test]
    fn test_function_bodies_emit_nothing() {
        let text = asm("int main ()\n\tint x = 1");
        assert!(!text.contains("SUB esp"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let source = "int x = 0\nwhile x < 2\n\tx += 1\nprint(x)";
        assert_eq!(asm(source), asm(source));
    }
}
