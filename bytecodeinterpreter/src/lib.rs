pub mod compiler;
pub mod instruction;
pub mod layout;
pub mod processor;

use std::fmt;

use tracing::debug;

use frontend::lexer::{LexError, Lexer};
use frontend::parser::{Parser, ParserError};
use frontend::type_checker::{check_program, TypeCheckError};

pub use crate::compiler::{compile, CompileError, CompiledProgram};
pub use crate::processor::{Processor, RuntimeError};

/// Any error out of the compilation half of the pipeline. Each variant
/// already formats itself in the `file:row:col: KIND_ERROR: message`
/// diagnostic convention.
#[derive(Debug)]
pub enum PipelineError {
    Lex(LexError),
    Parse(ParserError),
    Type(TypeCheckError),
    Generation(CompileError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Lex(error) => write!(f, "{}", error),
            PipelineError::Parse(error) => write!(f, "{}", error),
            PipelineError::Type(error) => write!(f, "{}", error),
            PipelineError::Generation(error) => write!(f, "{}", error),
        }
    }
}

impl From<LexError> for PipelineError {
    fn from(error: LexError) -> Self {
        PipelineError::Lex(error)
    }
}

impl From<ParserError> for PipelineError {
    fn from(error: ParserError) -> Self {
        PipelineError::Parse(error)
    }
}

impl From<TypeCheckError> for PipelineError {
    fn from(error: TypeCheckError) -> Self {
        PipelineError::Type(error)
    }
}

impl From<CompileError> for PipelineError {
    fn from(error: CompileError) -> Self {
        PipelineError::Generation(error)
    }
}

impl std::error::Error for PipelineError {}

/// Runs source text through lexing, parsing, type checking and code
/// generation, yielding a program ready for the processor.
pub fn compile_source(source: &str, file_name: &str) -> Result<CompiledProgram, PipelineError> {
    let tokens = Lexer::new(source, file_name).collect_tokens()?;
    debug!(count = tokens.len(), "tokenized");

    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    debug!(functions = program.functions.len(), "parsed");
    let mut interner = parser.into_interner();

    let checked = check_program(&program, &mut interner)?;
    debug!(functions = checked.functions.len(), "type checked");

    let compiled = compile(&program, &checked, &interner)?;
    debug!(
        instructions = compiled.program.len(),
        static_bytes = compiled.static_data.len(),
        "generated"
    );
    Ok(compiled)
}
