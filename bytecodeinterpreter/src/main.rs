use std::process::exit;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use bytecodeinterpreter::{compile_source, Processor};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} SOURCE_PATH", args[0]);
        exit(1);
    }
    let source_path = &args[1];

    let source = match std::fs::read_to_string(source_path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("IOError: Failed to load file {}", source_path);
            exit(1);
        }
    };

    let compiled = match compile_source(&source, source_path) {
        Ok(compiled) => compiled,
        Err(error) => {
            eprintln!("{}", error);
            exit(1);
        }
    };
    debug!("starting execution");

    let mut processor = Processor::new(compiled);
    if let Err(error) = processor.run() {
        eprintln!("{}", error);
        exit(1);
    }
}
