use std::fmt;

use crate::token::Location;
use crate::types::Ty;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeCheckErrorKind {
    SymbolAlreadyExists { name: String },
    UndefinedSymbol { name: String },
    NotAVariable { name: String },
    NotAFunction { name: String },
    NotCallable,
    BinaryOperatorNotDefined { operator: String, left: Ty, right: Ty },
    UnaryOperatorNotDefined { operator: String, operand: Ty },
    TypeMismatch { expected: Ty, actual: Ty },
    ArgumentCountMismatch { name: String, expected: usize, found: usize },
    ArgumentTypeMismatch { name: String, position: usize, expected: Ty, actual: Ty },
    MemberNotFound { ty: Ty, name: String },
    NotIndexable { ty: Ty },
    UnsupportedCast { from: Ty, to: Ty },
    AssignmentToNonLvalue,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    MissingReturn { name: String },
    VoidListElement,
    VoidVariable { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCheckError {
    pub kind: TypeCheckErrorKind,
    pub location: Location,
}

impl TypeCheckError {
    pub fn new(kind: TypeCheckErrorKind, location: Location) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for TypeCheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TypeCheckErrorKind::*;
        let message = match &self.kind {
            SymbolAlreadyExists { name } => format!("Symbol '{}' already exists.", name),
            UndefinedSymbol { name } => format!("Symbol '{}' is not defined.", name),
            NotAVariable { name } => format!("Symbol '{}' is not a variable.", name),
            NotAFunction { name } => format!("Symbol '{}' is not a function.", name),
            NotCallable => "Called expression is not callable.".to_string(),
            BinaryOperatorNotDefined {
                operator,
                left,
                right,
            } => format!(
                "Operator '{}' is not defined for types <{}> and <{}>.",
                operator, left, right
            ),
            UnaryOperatorNotDefined { operator, operand } => format!(
                "Operator '{}' is not defined for type <{}>.",
                operator, operand
            ),
            TypeMismatch { expected, actual } => {
                format!("Expected type <{}>, but got <{}>.", expected, actual)
            }
            ArgumentCountMismatch {
                name,
                expected,
                found,
            } => format!(
                "Function '{}' expects {} arguments, but {} were given.",
                name, expected, found
            ),
            ArgumentTypeMismatch {
                name,
                position,
                expected,
                actual,
            } => format!(
                "Argument {} of '{}' expects <{}>, but got <{}>.",
                position, name, expected, actual
            ),
            MemberNotFound { ty, name } => {
                format!("Type <{}> has no accessible member '{}'.", ty, name)
            }
            NotIndexable { ty } => format!("Type <{}> cannot be indexed.", ty),
            UnsupportedCast { from, to } => format!("Cannot cast <{}> to <{}>.", from, to),
            AssignmentToNonLvalue => "Left side of assignment is not assignable.".to_string(),
            BreakOutsideLoop => "'break' outside of a while statement.".to_string(),
            ContinueOutsideLoop => "'continue' outside of a while statement.".to_string(),
            MissingReturn { name } => {
                format!("Function '{}' does not definitely return a value.", name)
            }
            VoidListElement => "List elements may not have type <VOID>.".to_string(),
            VoidVariable { name } => {
                format!("Variable '{}' may not have type <VOID>.", name)
            }
        };
        write!(f, "{}: TYPE_ERROR: {}", self.location, message)
    }
}

impl std::error::Error for TypeCheckError {}
