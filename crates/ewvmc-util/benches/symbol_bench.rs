//! Symbol interning benchmarks.
//!
//! Run with `cargo bench --package ewvmc-util`.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ewvmc_util::Interner;

fn bench_intern_new_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.throughput(Throughput::Elements(1));

    group.bench_function("intern_new_string", |b| {
        let mut interner = Interner::new();
        let mut counter: u64 = 0;
        b.iter(|| {
            counter += 1;
            black_box(interner.intern(&format!("ident_{counter}")))
        })
    });

    group.finish();
}

fn bench_intern_existing_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.throughput(Throughput::Elements(1));

    group.bench_function("intern_existing_string", |b| {
        let mut interner = Interner::new();
        let _ = interner.intern("existing_string");
        b.iter(|| black_box(interner.intern("existing_string")))
    });

    group.finish();
}

fn bench_intern_case_insensitive(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.throughput(Throughput::Elements(1));

    group.bench_function("intern_mixed_case_variants", |b| {
        let mut interner = Interner::new();
        let _ = interner.intern("WriteLn");
        b.iter(|| black_box(interner.intern("wRiTeLn")))
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(1));

    group.bench_function("resolve_interned_symbol", |b| {
        let mut interner = Interner::new();
        let sym = interner.intern("total");
        b.iter(|| black_box(interner.resolve(sym)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_intern_new_strings,
    bench_intern_existing_string,
    bench_intern_case_insensitive,
    bench_resolve
);
criterion_main!(benches);
