mod common;

use rstest::rstest;

use bytecodeinterpreter::compiler::resolve_labels;
use bytecodeinterpreter::instruction::{Instruction, InstructionKind};
use common::compile;

fn instructions_of(source: &str) -> Vec<Instruction> {
    compile(source).expect("compile failure").program
}

fn contains(program: &[Instruction], kind: InstructionKind) -> bool {
    program.iter().any(|instruction| instruction.kind == kind)
}

fn contains_native(program: &[Instruction], id: usize) -> bool {
    program.iter().any(|instruction| {
        instruction.kind == InstructionKind::NATIVE && instruction.operand.as_pointer() == id
    })
}

#[rstest]
#[case("1 + 2", InstructionKind::IADD)]
#[case("1 - 2", InstructionKind::ISUB)]
#[case("1 * 2", InstructionKind::IMUL)]
#[case("1 / 2", InstructionKind::IDIV)]
#[case("1 % 2", InstructionKind::IMOD)]
#[case("1 << 2", InstructionKind::ISHL)]
#[case("1 >> 2", InstructionKind::ISHR)]
#[case("1 & 2", InstructionKind::IAND)]
#[case("1 | 2", InstructionKind::IOR)]
#[case("1 ^ 2", InstructionKind::IXOR)]
#[case("1.0 + 2.0", InstructionKind::FADD)]
#[case("1.0 - 2.0", InstructionKind::FSUB)]
#[case("1.0 * 2.0", InstructionKind::FMUL)]
#[case("1.0 / 2.0", InstructionKind::FDIV)]
#[case("1 < 2", InstructionKind::JIGE)]
#[case("1 <= 2", InstructionKind::JIGT)]
#[case("1 > 2", InstructionKind::JILE)]
#[case("1 >= 2", InstructionKind::JILT)]
#[case("1.0 < 2.0", InstructionKind::JFGE)]
#[case("1.0 <= 2.0", InstructionKind::JFGT)]
#[case("1.0 > 2.0", InstructionKind::JFLE)]
#[case("1.0 >= 2.0", InstructionKind::JFLT)]
#[case("1 == 2", InstructionKind::JNEQ)]
#[case("1 != 2", InstructionKind::JEQ)]
fn operator_table_entries_emit_their_instruction(
    #[case] expression: &str,
    #[case] expected: InstructionKind,
) {
    let source = format!("fn main(): void {{ {}; }}", expression);
    let program = instructions_of(&source);
    assert!(
        contains(&program, expected),
        "expected {} for `{}`",
        expected,
        expression
    );
}

#[rstest]
#[case("1 + 1.5")]
#[case("1.5 % 2.0")]
#[case("1.5 << 1.0")]
#[case("true < false")]
#[case("1 && 2")]
#[case("\"a\" + \"b\"")]
fn omitted_operator_combinations_are_type_errors(#[case] expression: &str) {
    let source = format!("fn main(): void {{ {}; }}", expression);
    let error = compile(&source).expect_err("should not type check");
    assert!(format!("{}", error).contains("TYPE_ERROR"));
}

#[rstest]
#[case("~1", InstructionKind::IBNEG)]
#[case("-1", InstructionKind::INEG)]
#[case("-1.5", InstructionKind::FNEG)]
#[case("!true", InstructionKind::LNEG)]
fn unary_operators_lower_to_their_instruction(
    #[case] expression: &str,
    #[case] expected: InstructionKind,
) {
    let source = format!("fn main(): void {{ {}; }}", expression);
    assert!(contains(&instructions_of(&source), expected));
}

#[rstest]
#[case("float(1)", InstructionKind::I2F)]
#[case("int(1.5)", InstructionKind::F2I)]
#[case("char(65)", InstructionKind::I2C)]
fn conversion_casts_lower_to_conversion_instructions(
    #[case] expression: &str,
    #[case] expected: InstructionKind,
) {
    let source = format!("fn main(): void {{ {}; }}", expression);
    assert!(contains(&instructions_of(&source), expected));
}

#[test]
fn string_casts_lower_to_natives() {
    let program = instructions_of(
        "fn main(): void { string(1); string('c'); string(1.5); string(true); \
         [char](\"x\"); string(['a']); }",
    );
    for native_id in [2, 3, 4, 5, 6, 7] {
        assert!(
            contains_native(&program, native_id),
            "expected a NATIVE {} dispatch",
            native_id
        );
    }
}

#[test]
fn fitting_casts_are_transparent() {
    let with_cast = instructions_of("fn main(): void { var x: [int] = [int]([]); }");
    assert!(!contains(&with_cast, InstructionKind::NATIVE));
    assert!(!contains(&with_cast, InstructionKind::I2C));
}

#[test]
fn every_jump_lands_on_a_label_after_finalize() {
    let program = instructions_of(
        "fn helper(n: int): int { \
           var total = 0; \
           while (n > 0) { \
             if (n % 2 == 0) { total = total + n; } else { total = total - 1; } \
             n = n - 1; \
           } \
           return total; \
         } \
         fn main(): void { print_line(int_to_string(helper(10))); }",
    );
    for instruction in &program {
        if instruction.kind.is_jump() {
            let target = instruction.operand.as_pointer();
            assert!(target < program.len(), "jump target out of range");
            assert_eq!(
                program[target].kind,
                InstructionKind::LABEL,
                "jump target must begin with a LABEL"
            );
        }
    }
}

#[test]
fn finalize_is_idempotent() {
    let mut program = instructions_of(
        "fn main(): void { \
           var i = 0; \
           while (i < 4) { if (i == 2) { break; } i = i + 1; } \
         }",
    );
    let resolved_once = program.clone();
    resolve_labels(&mut program);
    assert_eq!(program, resolved_once);
}

#[test]
fn program_starts_with_a_jump_to_main() {
    let program = instructions_of("fn f(): void { } fn main(): void { }");
    assert_eq!(program[0].kind, InstructionKind::JUMP);
    let target = program[0].operand.as_pointer();
    assert_eq!(program[target].kind, InstructionKind::LABEL);
}

#[test]
fn missing_main_is_a_generation_error() {
    let error = compile("fn helper(): void { }").expect_err("should fail");
    assert_eq!(
        format!("{}", error),
        "GENERATION_ERROR: No main function defined..."
    );
}

#[test]
fn prologue_pops_arguments_in_reverse_order() {
    let program = instructions_of(
        "fn sub(a: int, b: int): int { return a - b; } \
         fn main(): void { sub(1, 2); }",
    );
    let vwrites: Vec<usize> = program
        .iter()
        .filter(|instruction| instruction.kind == InstructionKind::VWRITE)
        .map(|instruction| instruction.operand.as_pointer())
        .collect();
    // sub's prologue: slot 1 first, then slot 0.
    assert_eq!(vwrites, vec![1, 0]);
}

#[test]
fn string_literal_bytes_land_in_static_data() {
    let compiled = compile("fn main(): void { print(\"hi\\n\"); }").expect("compile failure");
    assert_eq!(compiled.static_data, b"hi\n");
    assert!(contains(&compiled.program, InstructionKind::SPTR));
}

#[test]
fn invalid_escape_is_a_generation_error() {
    let error = compile("fn main(): void { print(\"\\q\"); }").expect_err("should fail");
    assert!(format!("{}", error).contains("GENERATION_ERROR"));
    assert!(format!("{}", error).contains("\\q"));
}

#[test]
fn multi_byte_char_literal_is_a_generation_error() {
    let error = compile("fn main(): void { 'ab'; }").expect_err("should fail");
    assert!(format!("{}", error).contains("GENERATION_ERROR"));
}

#[test]
fn expression_statements_pop_their_value() {
    let program = instructions_of("fn main(): void { 1 + 2; }");
    assert!(contains(&program, InstructionKind::POP));

    let void_call = instructions_of("fn main(): void { print(\"\"); }");
    assert!(!contains(&void_call, InstructionKind::POP));
}
