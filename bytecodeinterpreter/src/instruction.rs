use std::fmt;

/// A 64-bit machine word, interpretable as a signed integer, an IEEE-754
/// double or a heap address. The interpretation is chosen by the
/// instruction reading it; the bits are preserved across moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word(pub u64);

impl Word {
    pub const ZERO: Word = Word(0);

    pub fn from_int(value: i64) -> Self {
        Word(value as u64)
    }

    pub fn from_float(value: f64) -> Self {
        Word(value.to_bits())
    }

    pub fn from_pointer(address: usize) -> Self {
        Word(address as u64)
    }

    pub fn as_int(self) -> i64 {
        self.0 as i64
    }

    pub fn as_float(self) -> f64 {
        f64::from_bits(self.0)
    }

    pub fn as_pointer(self) -> usize {
        self.0 as usize
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    HALT,

    PUSH,
    DUP,
    POP,

    HALLOC,
    WRITEW,
    READW,
    WRITEB,
    READB,
    PADD,
    SPTR,

    VLOAD,
    VWRITE,

    IBNEG,
    FNEG,
    INEG,
    LNEG,

    IADD,
    ISUB,
    IMUL,
    IDIV,
    IMOD,

    ISHL,
    ISHR,
    IAND,
    IOR,
    IXOR,

    FADD,
    FSUB,
    FMUL,
    FDIV,

    LABEL,
    JUMP,
    JNEQ,
    JEQ,
    JEQZ,

    JILT,
    JILE,
    JIGT,
    JIGE,

    JFLT,
    JFLE,
    JFGT,
    JFGE,

    CALL,
    NATIVE,
    RET,

    I2C,
    I2F,
    F2I,
}

impl InstructionKind {
    /// The jump family: every instruction whose operand is a label id until
    /// `finalize` rewrites it to an absolute instruction index.
    pub fn is_jump(self) -> bool {
        use InstructionKind::*;
        matches!(
            self,
            JUMP | JNEQ
                | JEQ
                | JEQZ
                | JILT
                | JILE
                | JIGT
                | JIGE
                | JFLT
                | JFLE
                | JFGT
                | JFGE
                | CALL
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub operand: Word,
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            operand: Word::ZERO,
        }
    }

    pub fn with_operand(kind: InstructionKind, operand: Word) -> Self {
        Self { kind, operand }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.operand.as_int())
    }
}
