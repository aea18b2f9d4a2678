use rstest::rstest;

use crate::ast::{Expr, ExprRef, Stmt};
use crate::lexer::Lexer;
use crate::parser::error::ParserErrorKind;
use crate::parser::Parser;
use crate::token::TokenKind;
use crate::types::Ty;

fn parser_for(source: &str) -> Parser {
    let tokens = Lexer::new(source, "test.ni")
        .collect_tokens()
        .expect("lex failure");
    Parser::new(tokens)
}

fn parse_expression(source: &str) -> (Parser, ExprRef) {
    let mut parser = parser_for(source);
    let expr = parser.parse_expression().expect("parse failure");
    (parser, expr)
}

/// Renders an expression tree with explicit parentheses around every binary
/// and unary node, so tests can assert associativity and precedence.
fn render(parser: &Parser, expr: ExprRef) -> String {
    let node = parser
        .ast_builder
        .expr_pool()
        .get(expr.to_index())
        .expect("expression out of pool bounds");
    let resolve = |sym| parser.string_interner.resolve(sym).unwrap().to_string();
    match node {
        Expr::IntLiteral(text)
        | Expr::FloatLiteral(text)
        | Expr::StringLiteral(text)
        | Expr::CharLiteral(text) => resolve(*text),
        Expr::True => "true".to_string(),
        Expr::False => "false".to_string(),
        Expr::Identifier(name) => resolve(*name),
        Expr::Unary(op, operand) => format!(
            "({}{})",
            op.fixed_lexeme().unwrap(),
            render(parser, *operand)
        ),
        Expr::Binary(op, left, right) => format!(
            "({} {} {})",
            render(parser, *left),
            op.fixed_lexeme().unwrap(),
            render(parser, *right)
        ),
        Expr::Call(callee, args) => {
            let rendered: Vec<String> = args.iter().map(|a| render(parser, *a)).collect();
            format!("{}({})", render(parser, *callee), rendered.join(", "))
        }
        Expr::MemberAccess(receiver, member) => {
            format!("{}.{}", render(parser, *receiver), resolve(*member))
        }
        Expr::Indexing(receiver, index) => format!(
            "{}[{}]",
            render(parser, *receiver),
            render(parser, *index)
        ),
        Expr::ListLiteral(elements) => {
            let rendered: Vec<String> = elements.iter().map(|e| render(parser, *e)).collect();
            format!("[{}]", rendered.join(", "))
        }
        Expr::Cast(ty, inner) => format!("{}({})", ty, render(parser, *inner)),
    }
}

fn assert_parses_as(source: &str, expected: &str) {
    let (parser, expr) = parse_expression(source);
    assert_eq!(render(&parser, expr), expected, "for source: {}", source);
}

#[rstest]
#[case("a + b * c", "(a + (b * c))")]
#[case("a * b + c", "((a * b) + c)")]
#[case("a - b + c", "((a - b) + c)")]
#[case("a / b / c", "((a / b) / c)")]
#[case("a + b << c", "((a + b) << c)")]
#[case("a << b < c", "((a << b) < c)")]
#[case("a < b == c", "((a < b) == c)")]
#[case("a == b & c", "((a == b) & c)")]
#[case("a & b ^ c", "((a & b) ^ c)")]
#[case("a ^ b | c", "((a ^ b) | c)")]
#[case("a | b && c", "((a | b) && c)")]
#[case("a && b || c", "((a && b) || c)")]
#[case("a || b = c", "((a || b) = c)")]
#[case("a % b - c", "((a % b) - c)")]
#[case("a == b && c == d", "((a == b) && (c == d))")]
fn binary_precedence_and_associativity(#[case] source: &str, #[case] expected: &str) {
    assert_parses_as(source, expected);
}

#[test]
fn assignment_is_right_associative() {
    assert_parses_as("a = b = c", "(a = (b = c))");
    assert_parses_as("a = b + c = d", "(a = ((b + c) = d))");
}

#[rstest]
#[case("-a", "(-a)")]
#[case("!a && b", "((!a) && b)")]
#[case("~-a", "(~(-a))")]
#[case("-a * b", "((-a) * b)")]
#[case("+a + b", "((+a) + b)")]
fn unary_operators_bind_tighter_than_binary(#[case] source: &str, #[case] expected: &str) {
    assert_parses_as(source, expected);
}

#[test]
fn postfix_suffixes_chain_left_to_right() {
    assert_parses_as("obj.m(x)[i]", "obj.m(x)[i]");
    assert_parses_as("f(a, b).length", "f(a, b).length");
    assert_parses_as("xs[0][1]", "xs[0][1]");
}

#[test]
fn parenthesized_expressions_override_precedence() {
    assert_parses_as("(a + b) * c", "((a + b) * c)");
}

#[test]
fn list_literals() {
    assert_parses_as("[]", "[]");
    assert_parses_as("[1, 2, 3]", "[1, 2, 3]");
    assert_parses_as("[[1], [2]]", "[[1], [2]]");
}

#[test]
fn cast_expressions() {
    assert_parses_as("int(x)", "INT(x)");
    assert_parses_as("string(65)", "STRING(65)");
    assert_parses_as("[char](s)", "[CHAR](s)");
    assert_parses_as("float(a + b)", "FLOAT((a + b))");
}

#[test]
fn cast_is_distinguished_from_list_literal() {
    let (parser, expr) = parse_expression("[char](s)");
    let node = parser.ast_builder.expr_pool().get(expr.to_index()).unwrap();
    assert!(matches!(node, Expr::Cast(Ty::List(_), _)));

    let (parser, expr) = parse_expression("[c](s)");
    // `[c]` is a one-element list literal; `(s)` then calls it.
    let node = parser.ast_builder.expr_pool().get(expr.to_index()).unwrap();
    assert!(matches!(node, Expr::Call(_, _)));
}

#[test]
fn var_definition_with_and_without_annotation() {
    let mut parser = parser_for("var x: [int] = [1, 2]; var y = 3;");
    let first = parser.parse_statement().expect("parse failure");
    let second = parser.parse_statement().expect("parse failure");

    match parser.ast_builder.stmt_pool().get(first.to_index()).unwrap() {
        Stmt::VarDef { annotation, .. } => {
            assert_eq!(annotation, &Some(Ty::List(Box::new(Ty::Int))));
        }
        other => panic!("expected VarDef, got {:?}", other),
    }
    match parser.ast_builder.stmt_pool().get(second.to_index()).unwrap() {
        Stmt::VarDef { annotation, .. } => assert_eq!(annotation, &None),
        other => panic!("expected VarDef, got {:?}", other),
    }
}

#[test]
fn control_flow_statements() {
    let mut parser = parser_for("if (a) { b; } else { c; } while (d) { break; continue; }");
    let if_stmt = parser.parse_statement().expect("parse failure");
    let while_stmt = parser.parse_statement().expect("parse failure");

    assert!(matches!(
        parser.ast_builder.stmt_pool().get(if_stmt.to_index()).unwrap(),
        Stmt::IfElse { .. }
    ));
    assert!(matches!(
        parser
            .ast_builder
            .stmt_pool()
            .get(while_stmt.to_index())
            .unwrap(),
        Stmt::While { .. }
    ));
}

#[test]
fn return_with_and_without_value() {
    let mut parser = parser_for("return; return 1 + 2;");
    let bare = parser.parse_statement().expect("parse failure");
    let valued = parser.parse_statement().expect("parse failure");
    assert!(matches!(
        parser.ast_builder.stmt_pool().get(bare.to_index()).unwrap(),
        Stmt::Return(None)
    ));
    assert!(matches!(
        parser.ast_builder.stmt_pool().get(valued.to_index()).unwrap(),
        Stmt::Return(Some(_))
    ));
}

#[test]
fn function_definition_shape() {
    let mut parser = parser_for("fn add(a: int, b: int): int { return a + b; }");
    let program = parser.parse_program().expect("parse failure");
    assert_eq!(program.functions.len(), 1);
    let function = &program.functions[0];
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.return_type, Ty::Int);
    assert_eq!(function.parameters[0].1, Ty::Int);
    assert!(matches!(program.stmt(function.body), Stmt::Block(_)));
}

#[test]
fn missing_semicolon_is_a_parse_error() {
    let mut parser = parser_for("fn main(): void { var x = 1 }");
    let error = parser.parse_program().unwrap_err();
    assert!(matches!(
        error.kind,
        ParserErrorKind::UnexpectedToken {
            expected: TokenKind::SemiColon,
            ..
        }
    ));
}

#[test]
fn bad_primary_reports_the_offending_token() {
    let mut parser = parser_for("var x = * 2;");
    let error = parser.parse_statement().unwrap_err();
    match error.kind {
        ParserErrorKind::UnexpectedPrimaryToken { found } => {
            assert_eq!(found, TokenKind::Star);
        }
        other => panic!("expected primary error, got {:?}", other),
    }
    assert_eq!(
        format!("{}", error),
        "test.ni:1:9: PARSE_ERROR: Unexpected token of type <STAR> at the beginning of a primary expression."
    );
}

#[test]
fn function_body_must_be_a_block() {
    let mut parser = parser_for("fn main(): void return;");
    let error = parser.parse_program().unwrap_err();
    assert!(matches!(
        error.kind,
        ParserErrorKind::UnexpectedToken {
            expected: TokenKind::OpenCurlyBrace,
            ..
        }
    ));
}

#[test]
fn type_annotation_errors() {
    let mut parser = parser_for("fn f(a: 3): void { }");
    let error = parser.parse_program().unwrap_err();
    assert!(matches!(error.kind, ParserErrorKind::ExpectedType { .. }));
}
