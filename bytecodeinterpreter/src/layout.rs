use once_cell::sync::Lazy;

use frontend::types::Ty;

/// Shape of a heap object: total byte size plus the offsets inside it that
/// hold object pointers. The offsets are unused by the current machine but
/// are what a tracing collector would walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLayout {
    pub size: usize,
    pub object_offsets: Vec<usize>,
}

pub const LIST_LAYOUT: usize = 0;
pub const POINTER_LAYOUT: usize = 1;
pub const WORD_LAYOUT: usize = 2;
pub const BYTE_LAYOUT: usize = 3;
pub const INT_LAYOUT: usize = 4;
pub const CHAR_LAYOUT: usize = 5;
pub const VOID_LAYOUT: usize = 6;
pub const STRING_LAYOUT: usize = 7;
pub const FLOAT_LAYOUT: usize = 8;
pub const BOOL_LAYOUT: usize = 9;

/// Indexed by the layout tags above; `HALLOC`'s operand selects an entry.
pub static PREDEFINED_LAYOUTS: Lazy<Vec<ObjectLayout>> = Lazy::new(|| {
    vec![
        // LIST: length, capacity, data pointer
        ObjectLayout {
            size: 24,
            object_offsets: vec![16],
        },
        // POINTER: a single word-sized cell holding an object reference
        ObjectLayout {
            size: 8,
            object_offsets: vec![0],
        },
        // WORD
        ObjectLayout {
            size: 8,
            object_offsets: vec![],
        },
        // BYTE
        ObjectLayout {
            size: 1,
            object_offsets: vec![],
        },
        // INT
        ObjectLayout {
            size: 8,
            object_offsets: vec![],
        },
        // CHAR
        ObjectLayout {
            size: 1,
            object_offsets: vec![],
        },
        // VOID
        ObjectLayout {
            size: 0,
            object_offsets: vec![],
        },
        // STRING: length, data pointer
        ObjectLayout {
            size: 16,
            object_offsets: vec![8],
        },
        // FLOAT
        ObjectLayout {
            size: 8,
            object_offsets: vec![],
        },
        // BOOL
        ObjectLayout {
            size: 1,
            object_offsets: vec![],
        },
    ]
});

/// Layout tag for the data array of a list whose elements have type `ty`.
/// Object elements are stored as pointer cells.
pub fn element_layout(ty: &Ty) -> usize {
    match ty {
        Ty::Int => INT_LAYOUT,
        Ty::Char => CHAR_LAYOUT,
        Ty::Float => FLOAT_LAYOUT,
        Ty::Bool => BOOL_LAYOUT,
        Ty::Void => VOID_LAYOUT,
        Ty::String | Ty::List(_) | Ty::Generic | Ty::No => POINTER_LAYOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_match_field_tables() {
        assert_eq!(PREDEFINED_LAYOUTS[STRING_LAYOUT].size, 16);
        assert_eq!(PREDEFINED_LAYOUTS[STRING_LAYOUT].object_offsets, vec![8]);
        assert_eq!(PREDEFINED_LAYOUTS[LIST_LAYOUT].size, 24);
        assert_eq!(PREDEFINED_LAYOUTS[LIST_LAYOUT].object_offsets, vec![16]);
        assert_eq!(PREDEFINED_LAYOUTS[INT_LAYOUT].size, 8);
        assert_eq!(PREDEFINED_LAYOUTS[CHAR_LAYOUT].size, 1);
        assert_eq!(PREDEFINED_LAYOUTS[BOOL_LAYOUT].size, 1);
        assert_eq!(PREDEFINED_LAYOUTS[VOID_LAYOUT].size, 0);
    }

    #[test]
    fn element_layouts() {
        assert_eq!(element_layout(&Ty::Int), INT_LAYOUT);
        assert_eq!(element_layout(&Ty::Char), CHAR_LAYOUT);
        assert_eq!(element_layout(&Ty::String), POINTER_LAYOUT);
        assert_eq!(element_layout(&Ty::List(Box::new(Ty::Int))), POINTER_LAYOUT);
    }
}
