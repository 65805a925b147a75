//! Parser benchmarks.
//!
//! Run with `cargo bench --package ewvmc-par`.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ewvmc_util::diagnostic::Handler;
use ewvmc_util::Interner;

fn parse_source(source: &str) {
    let mut interner = Interner::new();
    let mut handler = Handler::new();
    let _ = ewvmc_par::parse(black_box(source), &mut interner, &mut handler);
}

fn bench_parser_minimal(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_minimal");
    let source = "program p; begin end.";
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("empty_program", |b| b.iter(|| parse_source(source)));
    group.finish();
}

fn bench_parser_declarations(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_declarations");
    let source = r#"
        program declarations;
        var
            a, b, c: integer;
            flag: boolean;
            name: string;
            scores: array[0..99] of integer;
        begin
            a := 1;
            b := 2;
            c := a + b;
            flag := a < b;
            scores[0] := c
        end.
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("var_block", |b| b.iter(|| parse_source(source)));
    group.finish();
}

fn bench_parser_control_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_control_flow");
    let source = r#"
        program control;
        var
            i, total: integer;
        begin
            total := 0;
            for i := 1 to 100 do
            begin
                if i mod 2 = 0 then
                    total := total + i
                else
                    total := total - i
            end;
            while total > 0 do
                total := total - 1
        end.
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("for_while_if", |b| b.iter(|| parse_source(source)));
    group.finish();
}

fn bench_parser_subprograms(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_subprograms");
    let source = r#"
        program subprograms;

        function fib(n: integer): integer;
        begin
            if n < 2 then
                fib := n
            else
                fib := fib(n - 1) + fib(n - 2)
        end;

        procedure report(label: string; value: integer);
        begin
            write(label);
            writeln(value)
        end;

        var
            i: integer;
        begin
            for i := 0 to 10 do
                report('fib', fib(i))
        end.
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("recursive_function", |b| b.iter(|| parse_source(source)));
    group.finish();
}

fn bench_parser_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_expressions");
    let source = r#"
        program expressions;
        var
            x, y, z: integer;
            ok: boolean;
        begin
            x := 1 + 2 * 3 - 4 div 2 + 5 mod 3;
            y := (x + 1) * (x - 1);
            z := -x + -y;
            ok := (x < y) and (y < z) or not (x = z)
        end.
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("mixed_precedence", |b| b.iter(|| parse_source(source)));
    group.finish();
}

criterion_group!(
    benches,
    bench_parser_minimal,
    bench_parser_declarations,
    bench_parser_control_flow,
    bench_parser_subprograms,
    bench_parser_expressions
);
criterion_main!(benches);
