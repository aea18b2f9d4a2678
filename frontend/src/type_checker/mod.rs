mod context;
mod error;
mod expression;
mod statement;


use std::collections::HashMap;

use string_interner::{DefaultStringInterner, DefaultSymbol};

pub use self::context::{Symbol, TypeCheckContext};
pub use self::error::{TypeCheckError, TypeCheckErrorKind};

use crate::ast::{ExprRef, FunctionDefinition, Program, StmtRef};
use crate::types::Ty;

pub const NATIVE_PRINT: usize = 0;
pub const NATIVE_PRINT_LINE: usize = 1;
pub const NATIVE_INT_TO_STRING: usize = 2;
pub const NATIVE_CHAR_TO_STRING: usize = 3;
pub const NATIVE_STRING_TO_CHAR_LIST: usize = 4;
pub const NATIVE_CHAR_LIST_TO_STRING: usize = 5;
pub const NATIVE_FLOAT_TO_STRING: usize = 6;
pub const NATIVE_BOOL_TO_STRING: usize = 7;

/// Resolution of a call expression: which function to invoke, whether it is
/// dispatched through the native table, and whether the callee was written
/// method-style (receiver prepended to the arguments).
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    pub function_id: usize,
    pub native: bool,
    pub method: bool,
}

#[derive(Debug)]
pub struct CheckedFunction {
    pub name: DefaultSymbol,
    pub id: usize,
    pub arity: usize,
    pub body: StmtRef,
    pub is_main: bool,
}

/// Output of the checker: resolved types parallel to the expression pool
/// plus the symbol caches the code generator reads back.
#[derive(Debug)]
pub struct CheckedProgram {
    pub expr_types: Vec<Ty>,
    pub variable_ids: HashMap<ExprRef, usize>,
    pub var_def_ids: HashMap<StmtRef, usize>,
    pub call_targets: HashMap<ExprRef, CallTarget>,
    pub functions: Vec<CheckedFunction>,
    pub function_count: usize,
}

pub struct TypeChecker<'a> {
    pub(crate) program: &'a Program,
    pub(crate) interner: &'a mut DefaultStringInterner,
    pub(crate) context: TypeCheckContext,
    pub(crate) expr_types: Vec<Ty>,
    pub(crate) variable_ids: HashMap<ExprRef, usize>,
    pub(crate) var_def_ids: HashMap<StmtRef, usize>,
    pub(crate) call_targets: HashMap<ExprRef, CallTarget>,
}

/// Two-pass check: register every top-level function symbol, then check each
/// body. Returns the side tables the code generator consumes.
pub fn check_program(
    program: &Program,
    interner: &mut DefaultStringInterner,
) -> Result<CheckedProgram, TypeCheckError> {
    let expression_count = program.expressions.len();
    let mut checker = TypeChecker {
        program,
        interner,
        context: TypeCheckContext::new(),
        expr_types: vec![Ty::No; expression_count],
        variable_ids: HashMap::new(),
        var_def_ids: HashMap::new(),
        call_targets: HashMap::new(),
    };
    checker.register_native_functions();

    for function in &program.functions {
        if checker.context.symbol_exists(function.name) {
            return Err(TypeCheckError::new(
                TypeCheckErrorKind::SymbolAlreadyExists {
                    name: checker.resolve(function.name),
                },
                function.location.clone(),
            ));
        }
        let argument_types = function.parameters.iter().map(|(_, ty)| ty.clone()).collect();
        checker
            .context
            .add_function(function.name, function.return_type.clone(), argument_types);
    }

    let main_symbol = checker.interner.get_or_intern("main");
    let mut functions = Vec::with_capacity(program.functions.len());
    for function in &program.functions {
        let id = match checker.context.lookup(function.name) {
            Some(Symbol::Function { id, .. }) => *id,
            _ => unreachable!("function symbol was registered by the pre-pass"),
        };
        checker.check_function(function)?;
        functions.push(CheckedFunction {
            name: function.name,
            id,
            arity: function.parameters.len(),
            body: function.body,
            is_main: function.name == main_symbol,
        });
    }

    Ok(CheckedProgram {
        expr_types: checker.expr_types,
        variable_ids: checker.variable_ids,
        var_def_ids: checker.var_def_ids,
        call_targets: checker.call_targets,
        functions,
        function_count: checker.context.function_count(),
    })
}

impl<'a> TypeChecker<'a> {
    fn register_native_functions(&mut self) {
        let natives: [(&str, Ty, Vec<Ty>, usize); 8] = [
            ("print", Ty::Void, vec![Ty::String], NATIVE_PRINT),
            ("print_line", Ty::Void, vec![Ty::String], NATIVE_PRINT_LINE),
            ("int_to_string", Ty::String, vec![Ty::Int], NATIVE_INT_TO_STRING),
            ("char_to_string", Ty::String, vec![Ty::Char], NATIVE_CHAR_TO_STRING),
            (
                "string_to_char_list",
                Ty::List(Box::new(Ty::Char)),
                vec![Ty::String],
                NATIVE_STRING_TO_CHAR_LIST,
            ),
            (
                "char_list_to_string",
                Ty::String,
                vec![Ty::List(Box::new(Ty::Char))],
                NATIVE_CHAR_LIST_TO_STRING,
            ),
            ("float_to_string", Ty::String, vec![Ty::Float], NATIVE_FLOAT_TO_STRING),
            ("bool_to_string", Ty::String, vec![Ty::Bool], NATIVE_BOOL_TO_STRING),
        ];
        for (name, return_type, argument_types, id) in natives {
            let symbol = self.interner.get_or_intern(name);
            self.context
                .add_native_function(symbol, return_type, argument_types, id);
        }
    }

    fn check_function(&mut self, function: &FunctionDefinition) -> Result<(), TypeCheckError> {
        self.context.reset_variable_count();
        self.context
            .set_current_return_type(function.return_type.clone());
        self.context.push_scope();

        for (name, ty) in &function.parameters {
            if self.context.symbol_exists(*name) {
                return Err(TypeCheckError::new(
                    TypeCheckErrorKind::SymbolAlreadyExists {
                        name: self.resolve(*name),
                    },
                    function.location.clone(),
                ));
            }
            self.context.add_variable(*name, ty.clone());
        }

        self.check_stmt(function.body)?;

        if !function.return_type.fits(&Ty::Void) && !self.is_definite_return(function.body) {
            return Err(TypeCheckError::new(
                TypeCheckErrorKind::MissingReturn {
                    name: self.resolve(function.name),
                },
                function.location.clone(),
            ));
        }

        self.context.pop_scope();
        Ok(())
    }

    pub(crate) fn resolve(&self, symbol: DefaultSymbol) -> String {
        self.interner
            .resolve(symbol)
            .unwrap_or("<unknown>")
            .to_string()
    }
}
