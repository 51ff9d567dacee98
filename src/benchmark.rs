use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dfa_table::emit::{pairs, table};
use dfa_table::{compile, Nfa, PairsOptions, TableOptions};

const TRACE: &str = r"^[ \t]*//[ \t]*TRACE[ \t]*#[0-9]+[ \t]*$";
const DIRECTIVE: &str = r"^[ \t]*#[0-9]+.*$";

fn criterion_benchmark_compile(c: &mut Criterion) {
    c.bench_function("compile trace scanner", |b| {
        b.iter(|| compile(black_box(TRACE)).unwrap())
    });
    c.bench_function("compile directive scanner", |b| {
        b.iter(|| compile(black_box(DIRECTIVE)).unwrap())
    });
    c.bench_function("thompson construction", |b| {
        b.iter(|| Nfa::new(black_box("(a|b)*abb(a|b)*[0-9]+\"x.y\"")).unwrap())
    });
}

fn criterion_benchmark_emit(c: &mut Criterion) {
    let dfa = compile(TRACE).unwrap();
    let table_options = TableOptions::default();
    let pairs_options = PairsOptions::default();
    c.bench_function("emit full table", |b| {
        b.iter(|| table(black_box(&dfa), &table_options).to_string())
    });
    c.bench_function("emit compressed table", |b| {
        b.iter(|| pairs(black_box(&dfa), &pairs_options).to_string())
    });
}

criterion_group!(benches, criterion_benchmark_compile, criterion_benchmark_emit);
criterion_main!(benches);
