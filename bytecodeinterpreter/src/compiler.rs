use std::collections::HashMap;
use std::fmt;

use string_interner::DefaultStringInterner;

use frontend::ast::{Expr, ExprRef, Program, Stmt, StmtRef};
use frontend::token::{Location, TokenKind};
use frontend::type_checker::{
    CheckedFunction, CheckedProgram, NATIVE_BOOL_TO_STRING, NATIVE_CHAR_LIST_TO_STRING,
    NATIVE_CHAR_TO_STRING, NATIVE_FLOAT_TO_STRING, NATIVE_INT_TO_STRING,
    NATIVE_STRING_TO_CHAR_LIST,
};
use frontend::types::{Ty, LIST_CAPACITY_OFFSET, LIST_DATA_OFFSET, STRING_DATA_OFFSET};

use crate::instruction::{Instruction, InstructionKind, Word};
use crate::layout::{element_layout, LIST_LAYOUT, STRING_LAYOUT};

#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    InvalidIntLiteral { text: String },
    InvalidFloatLiteral { text: String },
    InvalidEscapeSequence { sequence: String },
    InvalidCharLiteral { text: String },
    UnsupportedAssignmentTarget,
    NoEnclosingLoop,
    NoMainFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub location: Option<Location>,
}

impl CompileError {
    fn at(kind: CompileErrorKind, location: Location) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match &self.kind {
            CompileErrorKind::InvalidIntLiteral { text } => {
                format!("Invalid integer literal '{}'.", text)
            }
            CompileErrorKind::InvalidFloatLiteral { text } => {
                format!("Invalid float literal '{}'.", text)
            }
            CompileErrorKind::InvalidEscapeSequence { sequence } => {
                format!("Invalid escape sequence '{}'.", sequence)
            }
            CompileErrorKind::InvalidCharLiteral { text } => {
                format!("Char literal {} does not denote a single byte.", text)
            }
            CompileErrorKind::UnsupportedAssignmentTarget => {
                "Assignment to this target is not supported.".to_string()
            }
            CompileErrorKind::NoEnclosingLoop => {
                "No enclosing loop to jump to.".to_string()
            }
            CompileErrorKind::NoMainFunction => "No main function defined...".to_string(),
        };
        match &self.location {
            Some(location) => write!(f, "{}: GENERATION_ERROR: {}", location, message),
            None => write!(f, "GENERATION_ERROR: {}", message),
        }
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub program: Vec<Instruction>,
    pub static_data: Vec<u8>,
}

/// Resolves symbolic labels to absolute instruction indices: every control
/// flow destination starts with a `LABEL` instruction whose index is the
/// final address. `LABEL` operands are rewritten to their own index, which
/// makes the pass idempotent.
pub fn resolve_labels(program: &mut [Instruction]) {
    let mut label_locations: HashMap<u64, usize> = HashMap::new();
    for (index, instruction) in program.iter().enumerate() {
        if instruction.kind == InstructionKind::LABEL {
            label_locations.insert(instruction.operand.0, index);
        }
    }

    for (index, instruction) in program.iter_mut().enumerate() {
        if instruction.kind == InstructionKind::LABEL {
            instruction.operand = Word::from_pointer(index);
        } else if instruction.kind.is_jump() {
            let target = *label_locations
                .get(&instruction.operand.0)
                .expect("jump references an unbound label");
            instruction.operand = Word::from_pointer(target);
        }
    }
}

/// Lowers the typed program to a flat instruction vector plus its static
/// data section. Function ids double as entry label ids, so the label
/// counter starts past them.
pub fn compile(
    program: &Program,
    checked: &CheckedProgram,
    interner: &DefaultStringInterner,
) -> Result<CompiledProgram, CompileError> {
    let mut compiler = Compiler {
        ast: program,
        checked,
        interner,
        program: Vec::new(),
        static_data: Vec::new(),
        label_count: checked.function_count,
        break_label: None,
        continue_label: None,
        main_label: None,
        in_main: false,
    };

    for function in &checked.functions {
        compiler.emit_function(function)?;
    }

    compiler.finalize()
}

struct Compiler<'a> {
    ast: &'a Program,
    checked: &'a CheckedProgram,
    interner: &'a DefaultStringInterner,
    program: Vec<Instruction>,
    static_data: Vec<u8>,
    label_count: usize,
    break_label: Option<usize>,
    continue_label: Option<usize>,
    main_label: Option<usize>,
    in_main: bool,
}

impl<'a> Compiler<'a> {
    fn push(&mut self, kind: InstructionKind) {
        self.program.push(Instruction::new(kind));
    }

    fn push_with(&mut self, kind: InstructionKind, operand: Word) {
        self.program.push(Instruction::with_operand(kind, operand));
    }

    fn push_int(&mut self, value: i64) {
        self.push_with(InstructionKind::PUSH, Word::from_int(value));
    }

    fn generate_label(&mut self) -> usize {
        let label = self.label_count;
        self.label_count += 1;
        label
    }

    fn place_label(&mut self, label: usize) {
        self.push_with(InstructionKind::LABEL, Word::from_pointer(label));
    }

    fn jump_to(&mut self, kind: InstructionKind, label: usize) {
        self.push_with(kind, Word::from_pointer(label));
    }

    fn expr_ty(&self, expr: ExprRef) -> &Ty {
        &self.checked.expr_types[expr.to_index()]
    }

    fn resolve(&self, symbol: string_interner::DefaultSymbol) -> &str {
        self.interner
            .resolve(symbol)
            .expect("symbol missing from interner")
    }

    fn finalize(mut self) -> Result<CompiledProgram, CompileError> {
        let main_label = match self.main_label {
            Some(label) => label,
            None => {
                return Err(CompileError {
                    kind: CompileErrorKind::NoMainFunction,
                    location: None,
                })
            }
        };

        self.program.insert(
            0,
            Instruction::with_operand(InstructionKind::JUMP, Word::from_pointer(main_label)),
        );
        resolve_labels(&mut self.program);

        Ok(CompiledProgram {
            program: self.program,
            static_data: self.static_data,
        })
    }

    fn emit_function(&mut self, function: &CheckedFunction) -> Result<(), CompileError> {
        if function.is_main {
            self.main_label = Some(function.id);
        }
        self.in_main = function.is_main;

        self.place_label(function.id);
        // The caller pushed arguments left to right; pop them back into
        // their frame slots in reverse order.
        for id in (0..function.arity).rev() {
            self.push_with(InstructionKind::VWRITE, Word::from_pointer(id));
        }

        self.emit_stmt(function.body)?;

        self.emit_return();
        Ok(())
    }

    fn emit_return(&mut self) {
        if self.in_main {
            self.push(InstructionKind::HALT);
        } else {
            self.push(InstructionKind::RET);
        }
    }

    fn emit_stmt(&mut self, stmt: StmtRef) -> Result<(), CompileError> {
        match self.ast.stmt(stmt).clone() {
            Stmt::Expression(expression) => {
                self.emit_expr(expression)?;
                if *self.expr_ty(expression) != Ty::Void {
                    self.push(InstructionKind::POP);
                }
                Ok(())
            }

            Stmt::VarDef { initializer, .. } => {
                self.emit_expr(initializer)?;
                let id = *self
                    .checked
                    .var_def_ids
                    .get(&stmt)
                    .expect("checker assigned an id to every var definition");
                self.push_with(InstructionKind::VWRITE, Word::from_pointer(id));
                Ok(())
            }

            Stmt::Block(sub_statements) => {
                for sub_statement in sub_statements {
                    self.emit_stmt(sub_statement)?;
                }
                Ok(())
            }

            Stmt::If {
                condition,
                then_body,
            } => {
                let then_label = self.generate_label();
                let end_label = self.generate_label();
                self.emit_condition(condition, end_label, then_label)?;
                self.place_label(then_label);
                self.emit_stmt(then_body)?;
                self.place_label(end_label);
                Ok(())
            }

            Stmt::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                let then_label = self.generate_label();
                let else_label = self.generate_label();
                let end_label = self.generate_label();
                self.emit_condition(condition, else_label, then_label)?;
                self.place_label(then_label);
                self.emit_stmt(then_body)?;
                self.jump_to(InstructionKind::JUMP, end_label);
                self.place_label(else_label);
                self.emit_stmt(else_body)?;
                self.place_label(end_label);
                Ok(())
            }

            Stmt::While { condition, body } => {
                let saved_break = self.break_label;
                let saved_continue = self.continue_label;

                let continue_label = self.generate_label();
                let after_condition_label = self.generate_label();
                let break_label = self.generate_label();
                self.break_label = Some(break_label);
                self.continue_label = Some(continue_label);

                self.place_label(continue_label);
                self.emit_condition(condition, break_label, after_condition_label)?;
                self.place_label(after_condition_label);
                self.emit_stmt(body)?;
                self.jump_to(InstructionKind::JUMP, continue_label);
                self.place_label(break_label);

                self.break_label = saved_break;
                self.continue_label = saved_continue;
                Ok(())
            }

            Stmt::Break => match self.break_label {
                Some(label) => {
                    self.jump_to(InstructionKind::JUMP, label);
                    Ok(())
                }
                None => Err(CompileError::at(
                    CompileErrorKind::NoEnclosingLoop,
                    self.ast.stmt_location(stmt).clone(),
                )),
            },

            Stmt::Continue => match self.continue_label {
                Some(label) => {
                    self.jump_to(InstructionKind::JUMP, label);
                    Ok(())
                }
                None => Err(CompileError::at(
                    CompileErrorKind::NoEnclosingLoop,
                    self.ast.stmt_location(stmt).clone(),
                )),
            },

            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.emit_expr(value)?;
                }
                self.emit_return();
                Ok(())
            }
        }
    }

    fn emit_expr(&mut self, expr: ExprRef) -> Result<(), CompileError> {
        match self.ast.expr(expr).clone() {
            Expr::IntLiteral(text) => {
                let text = self.resolve(text).to_string();
                let value: i64 = text.parse().map_err(|_| {
                    CompileError::at(
                        CompileErrorKind::InvalidIntLiteral { text: text.clone() },
                        self.ast.expr_location(expr).clone(),
                    )
                })?;
                self.push_int(value);
                Ok(())
            }

            Expr::FloatLiteral(text) => {
                let text = self.resolve(text).to_string();
                let value: f64 = text.parse().map_err(|_| {
                    CompileError::at(
                        CompileErrorKind::InvalidFloatLiteral { text: text.clone() },
                        self.ast.expr_location(expr).clone(),
                    )
                })?;
                self.push_with(InstructionKind::PUSH, Word::from_float(value));
                Ok(())
            }

            Expr::StringLiteral(text) => {
                let location = self.ast.expr_location(expr).clone();
                let lexeme = self.resolve(text).to_string();
                let bytes = decode_escapes(&lexeme, &location)?;
                self.emit_string_constant(&bytes);
                Ok(())
            }

            Expr::CharLiteral(text) => {
                let location = self.ast.expr_location(expr).clone();
                let lexeme = self.resolve(text).to_string();
                let bytes = decode_escapes(&lexeme, &location)?;
                if bytes.len() != 1 {
                    return Err(CompileError::at(
                        CompileErrorKind::InvalidCharLiteral { text: lexeme },
                        location,
                    ));
                }
                self.push_int(bytes[0] as i8 as i64);
                Ok(())
            }

            Expr::True => {
                self.push_int(1);
                Ok(())
            }
            Expr::False => {
                self.push_int(0);
                Ok(())
            }

            Expr::Identifier(_) => {
                let id = *self
                    .checked
                    .variable_ids
                    .get(&expr)
                    .expect("checker resolved every variable reference");
                self.push_with(InstructionKind::VLOAD, Word::from_pointer(id));
                Ok(())
            }

            Expr::Unary(operator, operand) => {
                self.emit_expr(operand)?;
                match operator {
                    TokenKind::Plus => {}
                    TokenKind::Minus => {
                        if *self.expr_ty(operand) == Ty::Float {
                            self.push(InstructionKind::FNEG);
                        } else {
                            self.push(InstructionKind::INEG);
                        }
                    }
                    TokenKind::Tilde => self.push(InstructionKind::IBNEG),
                    TokenKind::Bang => self.push(InstructionKind::LNEG),
                    other => unreachable!("not a unary operator: {}", other),
                }
                Ok(())
            }

            Expr::Binary(TokenKind::Equal, target, value) => {
                self.emit_assignment(target, value)
            }

            Expr::Binary(operator, left, right) => match operator {
                TokenKind::EqualEqual
                | TokenKind::BangEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::AndAnd
                | TokenKind::PipePipe => self.emit_bool_value(expr),
                _ => {
                    self.emit_expr(left)?;
                    self.emit_expr(right)?;
                    let is_float = *self.expr_ty(expr) == Ty::Float;
                    let kind = match operator {
                        TokenKind::Plus if is_float => InstructionKind::FADD,
                        TokenKind::Minus if is_float => InstructionKind::FSUB,
                        TokenKind::Star if is_float => InstructionKind::FMUL,
                        TokenKind::Slash if is_float => InstructionKind::FDIV,
                        TokenKind::Plus => InstructionKind::IADD,
                        TokenKind::Minus => InstructionKind::ISUB,
                        TokenKind::Star => InstructionKind::IMUL,
                        TokenKind::Slash => InstructionKind::IDIV,
                        TokenKind::Percent => InstructionKind::IMOD,
                        TokenKind::LessLess => InstructionKind::ISHL,
                        TokenKind::GreaterGreater => InstructionKind::ISHR,
                        TokenKind::And => InstructionKind::IAND,
                        TokenKind::Pipe => InstructionKind::IOR,
                        TokenKind::Hat => InstructionKind::IXOR,
                        other => unreachable!("not a binary operator: {}", other),
                    };
                    self.push(kind);
                    Ok(())
                }
            },

            Expr::Call(callee, arguments) => {
                let target = self
                    .checked
                    .call_targets
                    .get(&expr)
                    .expect("checker resolved every call")
                    .clone();
                if target.method {
                    let receiver = match self.ast.expr(callee) {
                        Expr::MemberAccess(receiver, _) => *receiver,
                        _ => unreachable!("method call without member access callee"),
                    };
                    self.emit_expr(receiver)?;
                }
                for argument in arguments {
                    self.emit_expr(argument)?;
                }
                if target.native {
                    self.push_with(
                        InstructionKind::NATIVE,
                        Word::from_pointer(target.function_id),
                    );
                } else {
                    self.jump_to(InstructionKind::CALL, target.function_id);
                }
                Ok(())
            }

            Expr::MemberAccess(receiver, member) => {
                self.emit_expr(receiver)?;
                let member_name = self.resolve(member).to_string();
                let field = self
                    .expr_ty(receiver)
                    .field(&member_name)
                    .expect("checker verified the member exists");
                self.push_int(field.offset as i64);
                self.push(InstructionKind::PADD);
                self.emit_read(&field.ty);
                Ok(())
            }

            Expr::Indexing(receiver, index) => {
                self.emit_element_pointer(receiver, index)?;
                let element_ty = self
                    .expr_ty(receiver)
                    .index_field()
                    .expect("checker verified the receiver is indexable")
                    .ty;
                self.emit_read(&element_ty);
                Ok(())
            }

            Expr::ListLiteral(elements) => self.emit_list_literal(expr, &elements),

            Expr::Cast(target, inner) => {
                self.emit_expr(inner)?;
                self.emit_cast(self.expr_ty(inner).clone(), target);
                Ok(())
            }
        }
    }

    /// Reads the value a pointer on the stack points at, choosing byte or
    /// word width and tagging objects for the machine.
    fn emit_read(&mut self, ty: &Ty) {
        if ty.element_size() == 1 {
            self.push(InstructionKind::READB);
        } else {
            let is_object = if ty.is_object() { 1 } else { 0 };
            self.push_with(InstructionKind::READW, Word::from_int(is_object));
        }
    }

    fn emit_write(&mut self, ty: &Ty) {
        if ty.element_size() == 1 {
            self.push(InstructionKind::WRITEB);
        } else {
            self.push(InstructionKind::WRITEW);
        }
    }

    /// Leaves a pointer to `receiver[index]`'s storage on the stack.
    fn emit_element_pointer(
        &mut self,
        receiver: ExprRef,
        index: ExprRef,
    ) -> Result<(), CompileError> {
        let field = self
            .expr_ty(receiver)
            .index_field()
            .expect("checker verified the receiver is indexable");
        self.emit_expr(receiver)?;
        self.push_int(field.offset as i64);
        self.push(InstructionKind::PADD);
        // Dereference the backing data pointer, then offset into it.
        self.push_with(InstructionKind::READW, Word::from_int(1));
        self.emit_expr(index)?;
        self.push_int(field.ty.element_size() as i64);
        self.push(InstructionKind::IMUL);
        self.push(InstructionKind::PADD);
        Ok(())
    }

    fn emit_assignment(&mut self, target: ExprRef, value: ExprRef) -> Result<(), CompileError> {
        match self.ast.expr(target).clone() {
            Expr::Identifier(_) => {
                self.emit_expr(value)?;
                self.push(InstructionKind::DUP);
                let id = *self
                    .checked
                    .variable_ids
                    .get(&target)
                    .expect("checker resolved every variable reference");
                self.push_with(InstructionKind::VWRITE, Word::from_pointer(id));
                Ok(())
            }

            Expr::Indexing(receiver, index) => {
                let element_ty = self
                    .expr_ty(receiver)
                    .index_field()
                    .expect("checker verified the receiver is indexable")
                    .ty;
                self.emit_element_pointer(receiver, index)?;
                // Keep a copy of the element pointer so the stored value can
                // be read back as the value of the assignment expression.
                self.push(InstructionKind::DUP);
                self.emit_expr(value)?;
                self.emit_write(&element_ty);
                self.emit_read(&element_ty);
                Ok(())
            }

            _ => Err(CompileError::at(
                CompileErrorKind::UnsupportedAssignmentTarget,
                self.ast.expr_location(target).clone(),
            )),
        }
    }

    fn emit_string_constant(&mut self, bytes: &[u8]) {
        let static_offset = self.static_data.len();
        self.static_data.extend_from_slice(bytes);

        self.push_int(1);
        self.push_with(InstructionKind::HALLOC, Word::from_pointer(STRING_LAYOUT));
        // length
        self.push(InstructionKind::DUP);
        self.push_int(bytes.len() as i64);
        self.push(InstructionKind::WRITEW);
        // data points into the static section
        self.push(InstructionKind::DUP);
        self.push_int(STRING_DATA_OFFSET as i64);
        self.push(InstructionKind::PADD);
        self.push_with(InstructionKind::SPTR, Word::from_pointer(static_offset));
        self.push(InstructionKind::WRITEW);
    }

    fn emit_list_literal(
        &mut self,
        expr: ExprRef,
        elements: &[ExprRef],
    ) -> Result<(), CompileError> {
        let element_ty = match self.expr_ty(expr) {
            Ty::List(inner) => (**inner).clone(),
            other => unreachable!("list literal with non-list type {}", other),
        };
        let element_size = element_ty.element_size();
        let length = elements.len();
        let capacity = length * 2;

        self.push_int(1);
        self.push_with(InstructionKind::HALLOC, Word::from_pointer(LIST_LAYOUT));
        // length
        self.push(InstructionKind::DUP);
        self.push_int(length as i64);
        self.push(InstructionKind::WRITEW);
        // capacity
        self.push(InstructionKind::DUP);
        self.push_int(LIST_CAPACITY_OFFSET as i64);
        self.push(InstructionKind::PADD);
        self.push_int(capacity as i64);
        self.push(InstructionKind::WRITEW);
        // data buffer, sized by the capacity
        self.push(InstructionKind::DUP);
        self.push_int(LIST_DATA_OFFSET as i64);
        self.push(InstructionKind::PADD);
        self.push_int(capacity as i64);
        self.push_with(
            InstructionKind::HALLOC,
            Word::from_pointer(element_layout(&element_ty)),
        );
        self.push(InstructionKind::WRITEW);

        for (position, element) in elements.iter().enumerate() {
            self.push(InstructionKind::DUP);
            self.push_int(LIST_DATA_OFFSET as i64);
            self.push(InstructionKind::PADD);
            self.push_with(InstructionKind::READW, Word::from_int(1));
            self.push_int((position * element_size) as i64);
            self.push(InstructionKind::PADD);
            self.emit_expr(*element)?;
            self.emit_write(&element_ty);
        }
        Ok(())
    }

    fn emit_cast(&mut self, from: Ty, to: Ty) {
        if from.fits(&to) {
            // Physically identical; nothing to convert.
            return;
        }
        match (from, to) {
            (Ty::Int, Ty::Char) => self.push(InstructionKind::I2C),
            (Ty::Int, Ty::Float) => self.push(InstructionKind::I2F),
            (Ty::Float, Ty::Int) => self.push(InstructionKind::F2I),
            (Ty::Char, Ty::Int) | (Ty::Bool, Ty::Int) => {}
            (Ty::Int, Ty::String) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_INT_TO_STRING),
            ),
            (Ty::Char, Ty::String) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_CHAR_TO_STRING),
            ),
            (Ty::Float, Ty::String) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_FLOAT_TO_STRING),
            ),
            (Ty::Bool, Ty::String) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_BOOL_TO_STRING),
            ),
            (Ty::String, Ty::List(_)) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_STRING_TO_CHAR_LIST),
            ),
            (Ty::List(_), Ty::String) => self.push_with(
                InstructionKind::NATIVE,
                Word::from_pointer(NATIVE_CHAR_LIST_TO_STRING),
            ),
            (from, to) => unreachable!("checker admitted an unsupported cast {} -> {}", from, to),
        }
    }

    /// Materializes a boolean expression as 0 or 1 by branching through its
    /// condition form and joining.
    fn emit_bool_value(&mut self, expr: ExprRef) -> Result<(), CompileError> {
        let false_label = self.generate_label();
        let true_label = self.generate_label();
        let end_label = self.generate_label();
        self.emit_condition(expr, false_label, true_label)?;
        self.place_label(true_label);
        self.push_int(1);
        self.jump_to(InstructionKind::JUMP, end_label);
        self.place_label(false_label);
        self.push_int(0);
        self.place_label(end_label);
        Ok(())
    }

    /// Lowers a boolean expression directly into branches: exactly one jump
    /// to `false_label` or `true_label` is taken and no value is left on the
    /// stack. Comparisons invert, so the conditional jump goes to the false
    /// side and the fall-through jump to the true side.
    fn emit_condition(
        &mut self,
        expr: ExprRef,
        false_label: usize,
        true_label: usize,
    ) -> Result<(), CompileError> {
        match self.ast.expr(expr).clone() {
            Expr::Binary(operator, left, right)
                if matches!(
                    operator,
                    TokenKind::EqualEqual
                        | TokenKind::BangEqual
                        | TokenKind::Less
                        | TokenKind::LessEqual
                        | TokenKind::Greater
                        | TokenKind::GreaterEqual
                ) =>
            {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                let float = *self.expr_ty(left) == Ty::Float;
                let inverted = match operator {
                    TokenKind::EqualEqual => InstructionKind::JNEQ,
                    TokenKind::BangEqual => InstructionKind::JEQ,
                    TokenKind::Less if float => InstructionKind::JFGE,
                    TokenKind::LessEqual if float => InstructionKind::JFGT,
                    TokenKind::Greater if float => InstructionKind::JFLE,
                    TokenKind::GreaterEqual if float => InstructionKind::JFLT,
                    TokenKind::Less => InstructionKind::JIGE,
                    TokenKind::LessEqual => InstructionKind::JIGT,
                    TokenKind::Greater => InstructionKind::JILE,
                    TokenKind::GreaterEqual => InstructionKind::JILT,
                    _ => unreachable!(),
                };
                self.jump_to(inverted, false_label);
                self.jump_to(InstructionKind::JUMP, true_label);
                Ok(())
            }

            Expr::Binary(TokenKind::AndAnd, left, right) => {
                let mid_label = self.generate_label();
                self.emit_condition(left, false_label, mid_label)?;
                self.place_label(mid_label);
                self.emit_condition(right, false_label, true_label)
            }

            Expr::Binary(TokenKind::PipePipe, left, right) => {
                let mid_label = self.generate_label();
                self.emit_condition(left, mid_label, true_label)?;
                self.place_label(mid_label);
                self.emit_condition(right, false_label, true_label)
            }

            Expr::Unary(TokenKind::Bang, operand) => {
                self.emit_condition(operand, true_label, false_label)
            }

            // Any other boolean-valued expression: test its value.
            _ => {
                self.emit_expr(expr)?;
                self.jump_to(InstructionKind::JEQZ, false_label);
                self.jump_to(InstructionKind::JUMP, true_label);
                Ok(())
            }
        }
    }
}

/// Decodes the escape sequences of a quoted string or char lexeme. The
/// surrounding quotes are still present and are stripped here.
fn decode_escapes(lexeme: &str, location: &Location) -> Result<Vec<u8>, CompileError> {
    let bytes = lexeme.as_bytes();
    debug_assert!(bytes.len() >= 2, "quoted lexeme always keeps its quotes");
    let inner = &bytes[1..bytes.len() - 1];

    let mut decoded = Vec::with_capacity(inner.len());
    let mut position = 0;
    while position < inner.len() {
        let byte = inner[position];
        if byte != b'\\' {
            decoded.push(byte);
            position += 1;
            continue;
        }

        position += 1;
        let escaped = inner.get(position).copied().unwrap_or(0);
        let replacement = match escaped {
            b'\'' => b'\'',
            b'"' => b'"',
            b'\\' => b'\\',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0B,
            other => {
                return Err(CompileError::at(
                    CompileErrorKind::InvalidEscapeSequence {
                        sequence: format!("\\{}", other as char),
                    },
                    location.clone(),
                ));
            }
        };
        decoded.push(replacement);
        position += 1;
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::start_of("test.ni")
    }

    #[test]
    fn decode_plain_text() {
        assert_eq!(decode_escapes("\"abc\"", &loc()).unwrap(), b"abc");
        assert_eq!(decode_escapes("''", &loc()).unwrap(), b"");
    }

    #[test]
    fn decode_known_escapes() {
        assert_eq!(
            decode_escapes(r#""a\nb\tc""#, &loc()).unwrap(),
            b"a\nb\tc"
        );
        assert_eq!(decode_escapes(r#""\\""#, &loc()).unwrap(), b"\\");
        assert_eq!(decode_escapes(r#""\"""#, &loc()).unwrap(), b"\"");
        assert_eq!(decode_escapes(r"'\a'", &loc()).unwrap(), vec![0x07]);
        assert_eq!(decode_escapes(r"'\v'", &loc()).unwrap(), vec![0x0B]);
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let error = decode_escapes(r#""\q""#, &loc()).unwrap_err();
        assert!(matches!(
            error.kind,
            CompileErrorKind::InvalidEscapeSequence { .. }
        ));
    }

    #[test]
    fn resolve_labels_is_idempotent() {
        let mut program = vec![
            Instruction::with_operand(InstructionKind::JUMP, Word::from_pointer(1)),
            Instruction::with_operand(InstructionKind::LABEL, Word::from_pointer(0)),
            Instruction::with_operand(InstructionKind::JEQZ, Word::from_pointer(0)),
            Instruction::with_operand(InstructionKind::LABEL, Word::from_pointer(1)),
        ];
        resolve_labels(&mut program);
        let once = program.clone();
        resolve_labels(&mut program);
        assert_eq!(program, once);

        assert_eq!(program[0].operand.as_pointer(), 3);
        assert_eq!(program[2].operand.as_pointer(), 1);
    }
}
