use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bytecodeinterpreter::{compile_source, Processor};

const FIB_PROGRAM: &str = "\
fn fib(n: int): int { \
  if (n < 2) { return n; } \
  return fib(n - 1) + fib(n - 2); \
} \
fn main(): void { \
  print_line(int_to_string(fib(18))); \
}";

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_fib", |b| {
        b.iter(|| compile_source(black_box(FIB_PROGRAM), "bench.ni").expect("compile failure"))
    });
}

fn bench_execute(c: &mut Criterion) {
    let compiled = compile_source(FIB_PROGRAM, "bench.ni").expect("compile failure");
    c.bench_function("run_fib", |b| {
        b.iter(|| {
            let mut processor = Processor::with_output(compiled.clone(), Vec::new());
            processor.run().expect("run failure");
            processor.into_output()
        })
    });
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
