use std::fmt;

use once_cell::sync::Lazy;

use crate::token::TokenKind;

/// Resolved type of an expression or symbol. `No` is the pre-checking
/// sentinel; `Generic` only arises from empty list literals and the equality
/// operator table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Int,
    Char,
    Void,
    String,
    Float,
    Bool,
    Generic,
    List(Box<Ty>),
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    Internal,
    Read,
    ReadWrite,
}

/// A named field of a type: its access level, value type and the byte
/// offset inside the heap object. The offsets here are the ones the code
/// generator bakes into instructions and the VM natives rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub access: FieldAccess,
    pub ty: Ty,
    pub offset: usize,
}

pub const STRING_LENGTH_OFFSET: usize = 0;
pub const STRING_DATA_OFFSET: usize = 8;
pub const LIST_LENGTH_OFFSET: usize = 0;
pub const LIST_CAPACITY_OFFSET: usize = 8;
pub const LIST_DATA_OFFSET: usize = 16;

impl Ty {
    /// The fits relation: `a.fits(b)` governs argument passing, assignment
    /// and list element compatibility. Generic acts as a wildcard on either
    /// side (never against VOID), which is what lets an empty list literal
    /// satisfy a concrete list annotation.
    pub fn fits(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Void, Ty::Generic) | (Ty::Generic, Ty::Void) => false,
            (_, Ty::Generic) | (Ty::Generic, _) => true,
            (Ty::List(inner), Ty::List(other_inner)) => inner.fits(other_inner),
            (a, b) => a == b,
        }
    }

    /// Byte width of a value of this type when stored in a field or a list
    /// data array. Object types are stored as word-sized pointers.
    pub fn element_size(&self) -> usize {
        match self {
            Ty::Int | Ty::Float => 8,
            Ty::Char | Ty::Bool => 1,
            Ty::Void => 0,
            Ty::String | Ty::List(_) | Ty::Generic => 8,
            Ty::No => 0,
        }
    }

    /// Whether runtime values of this type are heap pointers.
    pub fn is_object(&self) -> bool {
        matches!(self, Ty::String | Ty::List(_))
    }

    pub fn contains_generic(&self) -> bool {
        match self {
            Ty::Generic => true,
            Ty::List(inner) => inner.contains_generic(),
            _ => false,
        }
    }

    /// Looks up a named field. `Internal` fields are returned too; member
    /// access resolution filters them out.
    pub fn field(&self, name: &str) -> Option<Field> {
        match self {
            Ty::String => match name {
                "length" => Some(Field {
                    access: FieldAccess::Read,
                    ty: Ty::Int,
                    offset: STRING_LENGTH_OFFSET,
                }),
                "data" => Some(Field {
                    access: FieldAccess::Internal,
                    ty: Ty::Char,
                    offset: STRING_DATA_OFFSET,
                }),
                _ => None,
            },
            Ty::List(inner) => match name {
                "length" => Some(Field {
                    access: FieldAccess::Read,
                    ty: Ty::Int,
                    offset: LIST_LENGTH_OFFSET,
                }),
                "capacity" => Some(Field {
                    access: FieldAccess::Internal,
                    ty: Ty::Int,
                    offset: LIST_CAPACITY_OFFSET,
                }),
                "data" => Some(Field {
                    access: FieldAccess::Internal,
                    ty: (**inner).clone(),
                    offset: LIST_DATA_OFFSET,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    /// The `@index` pseudo-field: element type and mutability seen through
    /// subscripting, plus the offset of the backing data pointer.
    pub fn index_field(&self) -> Option<Field> {
        match self {
            Ty::String => Some(Field {
                access: FieldAccess::Read,
                ty: Ty::Char,
                offset: STRING_DATA_OFFSET,
            }),
            Ty::List(inner) => Some(Field {
                access: FieldAccess::ReadWrite,
                ty: (**inner).clone(),
                offset: LIST_DATA_OFFSET,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "INT"),
            Ty::Char => write!(f, "CHAR"),
            Ty::Void => write!(f, "VOID"),
            Ty::String => write!(f, "STRING"),
            Ty::Float => write!(f, "FLOAT"),
            Ty::Bool => write!(f, "BOOL"),
            Ty::Generic => write!(f, "GENERIC"),
            Ty::List(inner) => write!(f, "[{}]", inner),
            Ty::No => write!(f, "NO_TYPE"),
        }
    }
}

pub struct BinaryOperator {
    pub token: TokenKind,
    pub left: Ty,
    pub right: Ty,
    pub result: Ty,
}

impl BinaryOperator {
    fn new(token: TokenKind, left: Ty, right: Ty, result: Ty) -> Self {
        Self {
            token,
            left,
            right,
            result,
        }
    }

    fn fits_criteria(&self, token: TokenKind, left: &Ty, right: &Ty) -> bool {
        self.token == token && left.fits(&self.left) && right.fits(&self.right)
    }
}

fn arithmetic_operators(ty: Ty) -> Vec<BinaryOperator> {
    [TokenKind::Plus, TokenKind::Star, TokenKind::Minus, TokenKind::Slash]
        .into_iter()
        .map(|token| BinaryOperator::new(token, ty.clone(), ty.clone(), ty.clone()))
        .collect()
}

fn bit_operators(ty: Ty) -> Vec<BinaryOperator> {
    [
        TokenKind::LessLess,
        TokenKind::GreaterGreater,
        TokenKind::And,
        TokenKind::Hat,
        TokenKind::Pipe,
    ]
    .into_iter()
    .map(|token| BinaryOperator::new(token, ty.clone(), ty.clone(), ty.clone()))
    .collect()
}

fn ordering_operators(ty: Ty) -> Vec<BinaryOperator> {
    [
        TokenKind::Less,
        TokenKind::LessEqual,
        TokenKind::Greater,
        TokenKind::GreaterEqual,
    ]
    .into_iter()
    .map(|token| BinaryOperator::new(token, ty.clone(), ty.clone(), Ty::Bool))
    .collect()
}

/// The global binary operator table. Lookups scan in order and take the
/// first entry the operand types fit.
pub static BINARY_OPERATORS: Lazy<Vec<BinaryOperator>> = Lazy::new(|| {
    let mut operators = Vec::new();
    operators.extend(arithmetic_operators(Ty::Int));
    operators.extend(bit_operators(Ty::Int));
    operators.extend(ordering_operators(Ty::Int));

    operators.push(BinaryOperator::new(
        TokenKind::Percent,
        Ty::Int,
        Ty::Int,
        Ty::Int,
    ));

    operators.extend(arithmetic_operators(Ty::Float));
    operators.extend(ordering_operators(Ty::Float));

    operators.push(BinaryOperator::new(
        TokenKind::EqualEqual,
        Ty::Generic,
        Ty::Generic,
        Ty::Bool,
    ));
    operators.push(BinaryOperator::new(
        TokenKind::BangEqual,
        Ty::Generic,
        Ty::Generic,
        Ty::Bool,
    ));

    operators.push(BinaryOperator::new(
        TokenKind::AndAnd,
        Ty::Bool,
        Ty::Bool,
        Ty::Bool,
    ));
    operators.push(BinaryOperator::new(
        TokenKind::PipePipe,
        Ty::Bool,
        Ty::Bool,
        Ty::Bool,
    ));

    operators
});

pub fn lookup_binary_operator(
    token: TokenKind,
    left: &Ty,
    right: &Ty,
) -> Option<&'static BinaryOperator> {
    BINARY_OPERATORS
        .iter()
        .find(|op| op.fits_criteria(token, left, right))
}

pub struct UnaryOperator {
    pub token: TokenKind,
    pub operand: Ty,
    pub result: Ty,
}

pub static UNARY_OPERATORS: Lazy<Vec<UnaryOperator>> = Lazy::new(|| {
    vec![
        UnaryOperator {
            token: TokenKind::Tilde,
            operand: Ty::Int,
            result: Ty::Int,
        },
        UnaryOperator {
            token: TokenKind::Plus,
            operand: Ty::Int,
            result: Ty::Int,
        },
        UnaryOperator {
            token: TokenKind::Minus,
            operand: Ty::Int,
            result: Ty::Int,
        },
        UnaryOperator {
            token: TokenKind::Plus,
            operand: Ty::Float,
            result: Ty::Float,
        },
        UnaryOperator {
            token: TokenKind::Minus,
            operand: Ty::Float,
            result: Ty::Float,
        },
        UnaryOperator {
            token: TokenKind::Bang,
            operand: Ty::Bool,
            result: Ty::Bool,
        },
    ]
});

pub fn lookup_unary_operator(token: TokenKind, operand: &Ty) -> Option<&'static UnaryOperator> {
    UNARY_OPERATORS
        .iter()
        .find(|op| op.token == token && operand.fits(&op.operand))
}

/// (source, destination) pairs of the explicit casts the checker accepts
/// beyond the fits relation.
pub static ALLOWED_TYPE_CASTS: Lazy<Vec<(Ty, Ty)>> = Lazy::new(|| {
    vec![
        (Ty::Int, Ty::Char),
        (Ty::Int, Ty::String),
        (Ty::Int, Ty::Float),
        (Ty::Char, Ty::Int),
        (Ty::Char, Ty::String),
        (Ty::String, Ty::List(Box::new(Ty::Char))),
        (Ty::List(Box::new(Ty::Char)), Ty::String),
        (Ty::Float, Ty::Int),
        (Ty::Float, Ty::String),
        (Ty::Bool, Ty::String),
        (Ty::Bool, Ty::Int),
    ]
});

pub fn cast_allowed(source: &Ty, destination: &Ty) -> bool {
    ALLOWED_TYPE_CASTS
        .iter()
        .any(|(from, to)| source.fits(from) && destination.fits(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_is_reflexive_on_primitives() {
        for ty in [Ty::Int, Ty::Char, Ty::Void, Ty::String, Ty::Float, Ty::Bool] {
            assert!(ty.fits(&ty), "{} should fit itself", ty);
        }
    }

    #[test]
    fn generic_accepts_everything_but_void() {
        assert!(Ty::Int.fits(&Ty::Generic));
        assert!(Ty::List(Box::new(Ty::Int)).fits(&Ty::Generic));
        assert!(!Ty::Void.fits(&Ty::Generic));
    }

    #[test]
    fn empty_list_type_fits_concrete_list() {
        let empty = Ty::List(Box::new(Ty::Generic));
        let ints = Ty::List(Box::new(Ty::Int));
        assert!(empty.fits(&ints));
        assert!(ints.fits(&empty));
        assert!(!ints.fits(&Ty::List(Box::new(Ty::Float))));
    }

    #[test]
    fn field_offsets_match_the_object_layouts() {
        let string_length = Ty::String.field("length").unwrap();
        assert_eq!(string_length.offset, 0);
        assert_eq!(string_length.ty, Ty::Int);
        assert_eq!(string_length.access, FieldAccess::Read);

        let list = Ty::List(Box::new(Ty::Int));
        assert_eq!(list.field("length").unwrap().offset, 0);
        assert_eq!(list.field("capacity").unwrap().offset, 8);
        assert_eq!(list.field("capacity").unwrap().access, FieldAccess::Internal);
        assert_eq!(list.field("data").unwrap().offset, 16);

        let index = list.index_field().unwrap();
        assert_eq!(index.access, FieldAccess::ReadWrite);
        assert_eq!(index.ty, Ty::Int);
        assert_eq!(index.offset, 16);

        let string_index = Ty::String.index_field().unwrap();
        assert_eq!(string_index.access, FieldAccess::Read);
        assert_eq!(string_index.ty, Ty::Char);
        assert_eq!(string_index.offset, 8);
    }

    #[test]
    fn operator_table_first_match_wins() {
        let plus = lookup_binary_operator(TokenKind::Plus, &Ty::Int, &Ty::Int).unwrap();
        assert_eq!(plus.result, Ty::Int);

        let less = lookup_binary_operator(TokenKind::Less, &Ty::Float, &Ty::Float).unwrap();
        assert_eq!(less.result, Ty::Bool);

        let eq = lookup_binary_operator(TokenKind::EqualEqual, &Ty::String, &Ty::String).unwrap();
        assert_eq!(eq.result, Ty::Bool);

        assert!(lookup_binary_operator(TokenKind::Percent, &Ty::Float, &Ty::Float).is_none());
        assert!(lookup_binary_operator(TokenKind::Plus, &Ty::Int, &Ty::Float).is_none());
        assert!(lookup_binary_operator(TokenKind::AndAnd, &Ty::Int, &Ty::Int).is_none());
    }

    #[test]
    fn unary_table() {
        assert_eq!(
            lookup_unary_operator(TokenKind::Minus, &Ty::Float).unwrap().result,
            Ty::Float
        );
        assert_eq!(
            lookup_unary_operator(TokenKind::Tilde, &Ty::Int).unwrap().result,
            Ty::Int
        );
        assert!(lookup_unary_operator(TokenKind::Tilde, &Ty::Float).is_none());
        assert!(lookup_unary_operator(TokenKind::Bang, &Ty::Int).is_none());
    }

    #[test]
    fn cast_table() {
        assert!(cast_allowed(&Ty::Int, &Ty::String));
        assert!(cast_allowed(&Ty::String, &Ty::List(Box::new(Ty::Char))));
        assert!(cast_allowed(&Ty::Bool, &Ty::Int));
        assert!(!cast_allowed(&Ty::String, &Ty::Int));
        assert!(!cast_allowed(&Ty::Int, &Ty::Bool));
    }
}
