use bytecodeinterpreter::{compile_source, CompiledProgram, PipelineError, Processor};

/// Compiles a test program through the whole frontend pipeline.
pub fn compile(source: &str) -> Result<CompiledProgram, PipelineError> {
    compile_source(source, "test.ni")
}

/// Compiles and executes a program, capturing everything the natives wrote
/// to the output sink. Errors from any stage come back as their displayed
/// diagnostic.
pub fn run_program(source: &str) -> Result<String, String> {
    let compiled = compile(source).map_err(|error| format!("{}", error))?;
    let mut processor = Processor::with_output(compiled, Vec::new());
    processor.run().map_err(|error| format!("{}", error))?;
    let output = processor.into_output();
    Ok(String::from_utf8_lossy(&output).into_owned())
}

pub fn assert_program_output(source: &str, expected: &str) {
    match run_program(source) {
        Ok(output) => assert_eq!(output, expected, "for program:\n{}", source),
        Err(error) => panic!("program failed: {}\nsource:\n{}", error, source),
    }
}

pub fn assert_program_fails_with(source: &str, expected_fragment: &str) {
    match run_program(source) {
        Ok(output) => panic!(
            "expected failure containing '{}', but program printed: {:?}",
            expected_fragment, output
        ),
        Err(error) => assert!(
            error.contains(expected_fragment),
            "expected '{}' in '{}'",
            expected_fragment,
            error
        ),
    }
}
