use calclib::Calculator;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Benchmark simple arithmetic expressions
fn benchmark_simple_arithmetic(c: &mut Criterion) {
    let _ = pretty_env_logger::try_init();
    let mut group = c.benchmark_group("Simple arithmetic Expression Evaluation");

    let mut calc = Calculator::new();
    let expr = "2 + 3 * 4";
    let parsed = calc.parse(expr).unwrap();

    group.bench_function("parse_and_eval_arithmetic", |b| {
        b.iter(|| calc.parse_and_eval(black_box(expr)).unwrap())
    });

    group.bench_function("preparsed_arithmetic", |b| {
        b.iter(|| calc.evaluate(black_box(&parsed)).unwrap())
    });

    group.bench_function("native_rust_arithmetic", |b| {
        b.iter(|| black_box(2.0 + 3.0 * 4.0))
    });
}

/// Benchmark exact-arithmetic expressions that exercise the numeric tower
fn benchmark_exact_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Exact arithmetic Expression Evaluation");

    let mut calc = Calculator::new();
    let expr = "(10 + 20) * 3 / (4 - 1) + 2^32 / 7";
    let parsed = calc.parse(expr).unwrap();

    group.bench_function("parse_and_eval_exact", |b| {
        b.iter(|| calc.parse_and_eval(black_box(expr)).unwrap())
    });

    group.bench_function("preparsed_exact", |b| {
        b.iter(|| calc.evaluate(black_box(&parsed)).unwrap())
    });
}

/// Benchmark function calls and variable expansion
fn benchmark_function_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("Function Call Evaluation");

    let mut calc = Calculator::new();
    calc.set_var("n", "2^16");
    let expr = "sqrt(square(n)) + sin(pi/4)";
    let parsed = calc.parse(expr).unwrap();

    group.bench_function("parse_and_eval_functions", |b| {
        b.iter(|| calc.parse_and_eval(black_box(expr)).unwrap())
    });

    group.bench_function("preparsed_functions", |b| {
        b.iter(|| calc.evaluate(black_box(&parsed)).unwrap())
    });
}

/// Benchmark number formatting
fn benchmark_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("Number Formatting");

    let mut calc = Calculator::new();
    let value = calc.parse_and_eval("2^200 / 3^100").unwrap();

    group.bench_function("format_number", |b| {
        b.iter(|| calc.format_number(black_box(&value)))
    });
}

criterion_group!(
    benches,
    benchmark_simple_arithmetic,
    benchmark_exact_arithmetic,
    benchmark_function_calls,
    benchmark_formatting,
);
criterion_main!(benches);
