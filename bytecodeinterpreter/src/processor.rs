use std::fmt;
use std::io::{self, Write};

use frontend::type_checker::{
    NATIVE_BOOL_TO_STRING, NATIVE_CHAR_LIST_TO_STRING, NATIVE_CHAR_TO_STRING,
    NATIVE_FLOAT_TO_STRING, NATIVE_INT_TO_STRING, NATIVE_PRINT, NATIVE_PRINT_LINE,
    NATIVE_STRING_TO_CHAR_LIST,
};
use frontend::types::{LIST_CAPACITY_OFFSET, LIST_DATA_OFFSET, STRING_DATA_OFFSET};

use crate::compiler::CompiledProgram;
use crate::instruction::{Instruction, InstructionKind, Word};
use crate::layout::{CHAR_LAYOUT, LIST_LAYOUT, PREDEFINED_LAYOUTS, STRING_LAYOUT};

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    DivisionByZero,
    ModuloByZero,
    UnknownNativeFunction { id: usize },
    InvalidMemoryAccess { address: usize },
    StackUnderflow,
    CallStackUnderflow,
    InvalidLayout { index: usize },
    UninitializedVariable { id: usize },
    OutputFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    fn new(kind: RuntimeErrorKind) -> Self {
        Self { kind }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match &self.kind {
            RuntimeErrorKind::DivisionByZero => "Division by zero.".to_string(),
            RuntimeErrorKind::ModuloByZero => "Modulo by zero.".to_string(),
            RuntimeErrorKind::UnknownNativeFunction { id } => {
                format!("Unknown native function id {}.", id)
            }
            RuntimeErrorKind::InvalidMemoryAccess { address } => {
                format!("Invalid memory access at address {}.", address)
            }
            RuntimeErrorKind::StackUnderflow => "Operand stack underflow.".to_string(),
            RuntimeErrorKind::CallStackUnderflow => "Call stack underflow.".to_string(),
            RuntimeErrorKind::InvalidLayout { index } => {
                format!("Invalid object layout {}.", index)
            }
            RuntimeErrorKind::UninitializedVariable { id } => {
                format!("Read of uninitialized variable slot {}.", id)
            }
            RuntimeErrorKind::OutputFailed => "Failed to write output.".to_string(),
        };
        write!(f, "RUNTIME_ERROR: {}", message)
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCellKind {
    Primitive,
    Object,
}

/// A tagged stack slot: the tag records whether the word is a heap address.
/// It is preserved across moves and only changes through `READW`'s flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackCell {
    pub kind: StackCellKind,
    pub word: Word,
}

impl StackCell {
    pub fn primitive(word: Word) -> Self {
        Self {
            kind: StackCellKind::Primitive,
            word,
        }
    }

    pub fn object(word: Word) -> Self {
        Self {
            kind: StackCellKind::Object,
            word,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub count: usize,
    pub address: usize,
    pub layout: usize,
}

#[derive(Debug, Clone, Copy)]
struct CallInfo {
    return_address: usize,
    local_var_offset: usize,
}

/// The stack machine. Memory is a single byte-addressed arena: address 0 is
/// the null pointer, the static data section sits at the bottom, and heap
/// allocations grow upward. Nothing is reclaimed before the machine is
/// dropped.
pub struct Processor<W: Write> {
    program: Vec<Instruction>,
    memory: Vec<u8>,
    static_base: usize,
    allocations: Vec<Allocation>,
    operand_stack: Vec<StackCell>,
    local_vars: Vec<StackCell>,
    call_stack: Vec<CallInfo>,
    instruction_pointer: usize,
    output: W,
}

impl Processor<io::Stdout> {
    pub fn new(compiled: CompiledProgram) -> Self {
        Self::with_output(compiled, io::stdout())
    }
}

impl<W: Write> Processor<W> {
    pub fn with_output(compiled: CompiledProgram, output: W) -> Self {
        let static_base = 1;
        Self {
            program: compiled.program,
            memory: compiled.static_data,
            static_base,
            allocations: Vec::new(),
            operand_stack: Vec::new(),
            local_vars: Vec::new(),
            call_stack: Vec::new(),
            instruction_pointer: 0,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.instruction_pointer < self.program.len() {
            if self.program[self.instruction_pointer].kind == InstructionKind::HALT {
                break;
            }
            self.execute_instruction()?;
        }
        self.output
            .flush()
            .map_err(|_| RuntimeError::new(RuntimeErrorKind::OutputFailed))?;
        Ok(())
    }

    fn push_on_stack(&mut self, cell: StackCell) {
        self.operand_stack.push(cell);
    }

    fn pop_from_stack(&mut self) -> Result<StackCell, RuntimeError> {
        self.operand_stack
            .pop()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackUnderflow))
    }

    fn stack_top(&self) -> Result<StackCell, RuntimeError> {
        self.operand_stack
            .last()
            .copied()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackUnderflow))
    }

    fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        Ok(self.pop_from_stack()?.word.as_int())
    }

    fn pop_float(&mut self) -> Result<f64, RuntimeError> {
        Ok(self.pop_from_stack()?.word.as_float())
    }

    fn pop_pointer(&mut self) -> Result<usize, RuntimeError> {
        Ok(self.pop_from_stack()?.word.as_pointer())
    }

    fn frame_base(&self) -> usize {
        match self.call_stack.last() {
            Some(call_info) => call_info.local_var_offset,
            None => 0,
        }
    }

    fn get_variable(&self, id: usize) -> Result<StackCell, RuntimeError> {
        let index = self.frame_base() + id;
        self.local_vars
            .get(index)
            .copied()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UninitializedVariable { id }))
    }

    fn set_variable(&mut self, id: usize, value: StackCell) {
        let index = self.frame_base() + id;
        if index >= self.local_vars.len() {
            self.local_vars
                .resize(index + 1, StackCell::primitive(Word::ZERO));
        }
        self.local_vars[index] = value;
    }

    /// Reserves `count` objects of the given layout at the top of the arena
    /// and records the allocation. Returns the address of the first byte.
    fn allocate_object(&mut self, layout: usize, count: usize) -> Result<usize, RuntimeError> {
        let object_layout = PREDEFINED_LAYOUTS
            .get(layout)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidLayout { index: layout }))?;
        let address = self.memory.len() + 1;
        self.memory.resize(self.memory.len() + count * object_layout.size, 0);
        self.allocations.push(Allocation {
            count,
            address,
            layout,
        });
        Ok(address)
    }

    fn check_range(&self, address: usize, length: usize) -> Result<usize, RuntimeError> {
        if address == 0 || address - 1 + length > self.memory.len() {
            return Err(RuntimeError::new(RuntimeErrorKind::InvalidMemoryAccess {
                address,
            }));
        }
        Ok(address - 1)
    }

    pub fn read_word(&self, address: usize) -> Result<Word, RuntimeError> {
        let offset = self.check_range(address, 8)?;
        let bytes: [u8; 8] = self.memory[offset..offset + 8]
            .try_into()
            .expect("slice length is eight");
        Ok(Word(u64::from_le_bytes(bytes)))
    }

    fn write_word(&mut self, address: usize, value: Word) -> Result<(), RuntimeError> {
        let offset = self.check_range(address, 8)?;
        self.memory[offset..offset + 8].copy_from_slice(&value.0.to_le_bytes());
        Ok(())
    }

    /// Byte reads sign-extend, matching a signed character load.
    pub fn read_byte(&self, address: usize) -> Result<i64, RuntimeError> {
        let offset = self.check_range(address, 1)?;
        Ok(self.memory[offset] as i8 as i64)
    }

    fn write_byte(&mut self, address: usize, value: i64) -> Result<(), RuntimeError> {
        let offset = self.check_range(address, 1)?;
        self.memory[offset] = (value & 0xFF) as u8;
        Ok(())
    }

    pub fn read_bytes(&self, address: usize, length: usize) -> Result<Vec<u8>, RuntimeError> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let offset = self.check_range(address, length)?;
        Ok(self.memory[offset..offset + length].to_vec())
    }

    fn write_bytes(&mut self, address: usize, bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let offset = self.check_range(address, bytes.len())?;
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn jump_if(&mut self, target: usize, taken: bool) {
        if taken {
            self.instruction_pointer = target;
        } else {
            self.instruction_pointer += 1;
        }
    }

    fn execute_instruction(&mut self) -> Result<(), RuntimeError> {
        let instruction = self.program[self.instruction_pointer];
        let operand = instruction.operand;

        use InstructionKind::*;
        match instruction.kind {
            HALT => {}

            PUSH => {
                self.push_on_stack(StackCell::primitive(operand));
                self.instruction_pointer += 1;
            }

            DUP => {
                let top = self.stack_top()?;
                self.push_on_stack(top);
                self.instruction_pointer += 1;
            }

            POP => {
                self.pop_from_stack()?;
                self.instruction_pointer += 1;
            }

            HALLOC => {
                let count = self.pop_int()? as usize;
                let layout = operand.as_pointer();
                let address = self.allocate_object(layout, count)?;
                self.push_on_stack(StackCell::object(Word::from_pointer(address)));
                self.instruction_pointer += 1;
            }

            WRITEW => {
                let value = self.pop_from_stack()?.word;
                let address = self.pop_pointer()?;
                self.write_word(address, value)?;
                self.instruction_pointer += 1;
            }

            READW => {
                let address = self.pop_pointer()?;
                let value = self.read_word(address)?;
                if operand.as_int() != 0 {
                    self.push_on_stack(StackCell::object(value));
                } else {
                    self.push_on_stack(StackCell::primitive(value));
                }
                self.instruction_pointer += 1;
            }

            WRITEB => {
                let value = self.pop_int()?;
                let address = self.pop_pointer()?;
                self.write_byte(address, value)?;
                self.instruction_pointer += 1;
            }

            READB => {
                let address = self.pop_pointer()?;
                let value = self.read_byte(address)?;
                self.push_on_stack(StackCell::primitive(Word::from_int(value)));
                self.instruction_pointer += 1;
            }

            PADD => {
                let offset = self.pop_int()?;
                let address = self.pop_pointer()?;
                let new_address = (address as i64 + offset) as usize;
                self.push_on_stack(StackCell::object(Word::from_pointer(new_address)));
                self.instruction_pointer += 1;
            }

            SPTR => {
                let address = self.static_base + operand.as_pointer();
                self.push_on_stack(StackCell::object(Word::from_pointer(address)));
                self.instruction_pointer += 1;
            }

            VLOAD => {
                let value = self.get_variable(operand.as_pointer())?;
                self.push_on_stack(value);
                self.instruction_pointer += 1;
            }

            VWRITE => {
                let value = self.pop_from_stack()?;
                self.set_variable(operand.as_pointer(), value);
                self.instruction_pointer += 1;
            }

            IBNEG => {
                let value = self.pop_int()?;
                self.push_on_stack(StackCell::primitive(Word::from_int(!value)));
                self.instruction_pointer += 1;
            }

            INEG => {
                let value = self.pop_int()?;
                self.push_on_stack(StackCell::primitive(Word::from_int(value.wrapping_neg())));
                self.instruction_pointer += 1;
            }

            FNEG => {
                let value = self.pop_float()?;
                self.push_on_stack(StackCell::primitive(Word::from_float(-value)));
                self.instruction_pointer += 1;
            }

            LNEG => {
                let value = self.pop_int()?;
                let negated = if value == 0 { 1 } else { 0 };
                self.push_on_stack(StackCell::primitive(Word::from_int(negated)));
                self.instruction_pointer += 1;
            }

            IADD | ISUB | IMUL | IDIV | IMOD | ISHL | ISHR | IAND | IOR | IXOR => {
                let second = self.pop_int()?;
                let first = self.pop_int()?;
                let result = match instruction.kind {
                    IADD => first.wrapping_add(second),
                    ISUB => first.wrapping_sub(second),
                    IMUL => first.wrapping_mul(second),
                    IDIV => {
                        if second == 0 {
                            return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero));
                        }
                        first.wrapping_div(second)
                    }
                    IMOD => {
                        if second == 0 {
                            return Err(RuntimeError::new(RuntimeErrorKind::ModuloByZero));
                        }
                        first.wrapping_rem(second)
                    }
                    ISHL => first.wrapping_shl(second as u32),
                    ISHR => first.wrapping_shr(second as u32),
                    IAND => first & second,
                    IOR => first | second,
                    IXOR => first ^ second,
                    _ => unreachable!(),
                };
                self.push_on_stack(StackCell::primitive(Word::from_int(result)));
                self.instruction_pointer += 1;
            }

            FADD | FSUB | FMUL | FDIV => {
                let second = self.pop_float()?;
                let first = self.pop_float()?;
                let result = match instruction.kind {
                    FADD => first + second,
                    FSUB => first - second,
                    FMUL => first * second,
                    FDIV => {
                        if second == 0.0 {
                            return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero));
                        }
                        first / second
                    }
                    _ => unreachable!(),
                };
                self.push_on_stack(StackCell::primitive(Word::from_float(result)));
                self.instruction_pointer += 1;
            }

            LABEL => {
                self.instruction_pointer += 1;
            }

            JUMP => {
                self.instruction_pointer = operand.as_pointer();
            }

            JEQ | JNEQ => {
                let second = self.pop_int()?;
                let first = self.pop_int()?;
                let taken = match instruction.kind {
                    JEQ => first == second,
                    JNEQ => first != second,
                    _ => unreachable!(),
                };
                self.jump_if(operand.as_pointer(), taken);
            }

            JEQZ => {
                let value = self.pop_int()?;
                self.jump_if(operand.as_pointer(), value == 0);
            }

            JILT | JILE | JIGT | JIGE => {
                let second = self.pop_int()?;
                let first = self.pop_int()?;
                let taken = match instruction.kind {
                    JILT => first < second,
                    JILE => first <= second,
                    JIGT => first > second,
                    JIGE => first >= second,
                    _ => unreachable!(),
                };
                self.jump_if(operand.as_pointer(), taken);
            }

            JFLT | JFLE | JFGT | JFGE => {
                let second = self.pop_float()?;
                let first = self.pop_float()?;
                let taken = match instruction.kind {
                    JFLT => first < second,
                    JFLE => first <= second,
                    JFGT => first > second,
                    JFGE => first >= second,
                    _ => unreachable!(),
                };
                self.jump_if(operand.as_pointer(), taken);
            }

            CALL => {
                let return_address = self.instruction_pointer + 1;
                let local_var_offset = self.local_vars.len();
                self.call_stack.push(CallInfo {
                    return_address,
                    local_var_offset,
                });
                self.instruction_pointer = operand.as_pointer();
            }

            RET => {
                let call_info = self
                    .call_stack
                    .pop()
                    .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::CallStackUnderflow))?;
                self.instruction_pointer = call_info.return_address;
            }

            NATIVE => {
                self.execute_native(operand.as_pointer())?;
                self.instruction_pointer += 1;
            }

            I2C => {
                let value = self.pop_int()?;
                self.push_on_stack(StackCell::primitive(Word::from_int(value & 0xFF)));
                self.instruction_pointer += 1;
            }

            I2F => {
                let value = self.pop_int()?;
                self.push_on_stack(StackCell::primitive(Word::from_float(value as f64)));
                self.instruction_pointer += 1;
            }

            F2I => {
                let value = self.pop_float()?;
                self.push_on_stack(StackCell::primitive(Word::from_int(value as i64)));
                self.instruction_pointer += 1;
            }
        }
        Ok(())
    }

    /// Reads the bytes of a string object (length word plus data pointer).
    fn read_string_object(&self, address: usize) -> Result<Vec<u8>, RuntimeError> {
        let length = self.read_word(address)?.as_int() as usize;
        let data = self.read_word(address + STRING_DATA_OFFSET)?.as_pointer();
        self.read_bytes(data, length)
    }

    /// Builds a fresh string object and its data buffer through the same
    /// allocation path compiled code uses, keeping field offsets aligned.
    fn allocate_string(&mut self, bytes: &[u8]) -> Result<usize, RuntimeError> {
        let string_object = self.allocate_object(STRING_LAYOUT, 1)?;
        let string_data = self.allocate_object(CHAR_LAYOUT, bytes.len())?;
        self.write_bytes(string_data, bytes)?;
        self.write_word(string_object, Word::from_int(bytes.len() as i64))?;
        self.write_word(
            string_object + STRING_DATA_OFFSET,
            Word::from_pointer(string_data),
        )?;
        Ok(string_object)
    }

    fn push_string(&mut self, bytes: &[u8]) -> Result<(), RuntimeError> {
        let address = self.allocate_string(bytes)?;
        self.push_on_stack(StackCell::object(Word::from_pointer(address)));
        Ok(())
    }

    fn execute_native(&mut self, id: usize) -> Result<(), RuntimeError> {
        match id {
            NATIVE_PRINT => {
                let string_object = self.pop_pointer()?;
                let bytes = self.read_string_object(string_object)?;
                self.output
                    .write_all(&bytes)
                    .map_err(|_| RuntimeError::new(RuntimeErrorKind::OutputFailed))?;
            }

            NATIVE_PRINT_LINE => {
                let string_object = self.pop_pointer()?;
                let mut bytes = self.read_string_object(string_object)?;
                bytes.push(b'\n');
                self.output
                    .write_all(&bytes)
                    .map_err(|_| RuntimeError::new(RuntimeErrorKind::OutputFailed))?;
            }

            NATIVE_INT_TO_STRING => {
                let value = self.pop_int()?;
                self.push_string(&value.to_string().into_bytes())?;
            }

            NATIVE_CHAR_TO_STRING => {
                let value = self.pop_int()?;
                self.push_string(&[(value & 0xFF) as u8])?;
            }

            NATIVE_STRING_TO_CHAR_LIST => {
                let string_object = self.pop_pointer()?;
                let bytes = self.read_string_object(string_object)?;

                let char_list = self.allocate_object(LIST_LAYOUT, 1)?;
                let list_data = self.allocate_object(CHAR_LAYOUT, bytes.len())?;
                self.write_bytes(list_data, &bytes)?;
                self.write_word(char_list, Word::from_int(bytes.len() as i64))?;
                self.write_word(
                    char_list + LIST_CAPACITY_OFFSET,
                    Word::from_int((bytes.len() * 2) as i64),
                )?;
                self.write_word(char_list + LIST_DATA_OFFSET, Word::from_pointer(list_data))?;
                self.push_on_stack(StackCell::object(Word::from_pointer(char_list)));
            }

            NATIVE_CHAR_LIST_TO_STRING => {
                let char_list = self.pop_pointer()?;
                let length = self.read_word(char_list)?.as_int() as usize;
                let data = self.read_word(char_list + LIST_DATA_OFFSET)?.as_pointer();
                let bytes = self.read_bytes(data, length)?;
                self.push_string(&bytes)?;
            }

            NATIVE_FLOAT_TO_STRING => {
                let value = self.pop_float()?;
                self.push_string(format!("{:.6}", value).as_bytes())?;
            }

            NATIVE_BOOL_TO_STRING => {
                let value = self.pop_int()?;
                let text: &[u8] = if value == 0 { b"false" } else { b"true" };
                self.push_string(text)?;
            }

            id => {
                return Err(RuntimeError::new(RuntimeErrorKind::UnknownNativeFunction {
                    id,
                }));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_program() -> CompiledProgram {
        CompiledProgram {
            program: vec![Instruction::new(InstructionKind::HALT)],
            static_data: Vec::new(),
        }
    }

    fn processor() -> Processor<Vec<u8>> {
        Processor::with_output(empty_program(), Vec::new())
    }

    #[test]
    fn arena_read_write_round_trip() {
        let mut p = processor();
        let address = p.allocate_object(INT_TEST_LAYOUT, 2).unwrap();
        p.write_word(address, Word::from_int(-5)).unwrap();
        p.write_word(address + 8, Word::from_int(7)).unwrap();
        assert_eq!(p.read_word(address).unwrap().as_int(), -5);
        assert_eq!(p.read_word(address + 8).unwrap().as_int(), 7);
    }

    const INT_TEST_LAYOUT: usize = crate::layout::INT_LAYOUT;

    #[test]
    fn null_and_out_of_range_accesses_fail() {
        let mut p = processor();
        assert!(p.read_word(0).is_err());
        assert!(p.write_word(0, Word::ZERO).is_err());
        let address = p.allocate_object(INT_TEST_LAYOUT, 1).unwrap();
        assert!(p.read_word(address).is_ok());
        assert!(p.read_word(address + 1).is_err());
    }

    #[test]
    fn byte_reads_sign_extend() {
        let mut p = processor();
        let address = p.allocate_object(INT_TEST_LAYOUT, 1).unwrap();
        p.write_byte(address, 0xFF).unwrap();
        assert_eq!(p.read_byte(address).unwrap(), -1);
        p.write_byte(address, 0x41).unwrap();
        assert_eq!(p.read_byte(address).unwrap(), 0x41);
    }

    #[test]
    fn allocations_are_contiguous_and_recorded() {
        let mut p = processor();
        let first = p.allocate_object(INT_TEST_LAYOUT, 1).unwrap();
        let second = p.allocate_object(crate::layout::CHAR_LAYOUT, 3).unwrap();
        assert_eq!(second, first + 8);
        assert_eq!(p.allocations().len(), 2);
        assert_eq!(p.allocations()[1].count, 3);
    }

    #[test]
    fn allocated_string_has_the_layout_the_emitter_expects() {
        let mut p = processor();
        let address = p.allocate_string(b"hi").unwrap();
        assert_eq!(p.read_word(address).unwrap().as_int(), 2);
        let data = p.read_word(address + STRING_DATA_OFFSET).unwrap().as_pointer();
        assert_eq!(p.read_bytes(data, 2).unwrap(), b"hi");
    }

    #[test]
    fn stack_underflow_is_reported() {
        let mut p = processor();
        assert_eq!(
            p.pop_from_stack().unwrap_err().kind,
            RuntimeErrorKind::StackUnderflow
        );
    }

    #[test]
    fn locals_grow_on_write_and_respect_the_frame_base() {
        let mut p = processor();
        p.set_variable(2, StackCell::primitive(Word::from_int(9)));
        assert_eq!(p.get_variable(2).unwrap().word.as_int(), 9);
        // Slots 0 and 1 were grown with primitive zero fill.
        assert_eq!(p.get_variable(0).unwrap().word.as_int(), 0);

        p.call_stack.push(CallInfo {
            return_address: 0,
            local_var_offset: 3,
        });
        p.set_variable(0, StackCell::primitive(Word::from_int(4)));
        assert_eq!(p.get_variable(0).unwrap().word.as_int(), 4);
        p.call_stack.pop();
        assert_eq!(p.get_variable(0).unwrap().word.as_int(), 0);
    }
}
