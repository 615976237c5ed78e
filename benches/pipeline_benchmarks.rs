//! Semantic Pipeline Benchmarks
//!
//! Measures the full six-pass pipeline over programs of increasing size:
//! record-heavy declarations, expression-heavy control bodies, and a
//! representative parser+control unit.
//!
//! ```bash
//! cargo bench
//! cargo bench record_heavy
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use p4_frontend::analyze;
use p4_frontend::ast::{Ast, AstBuilder, AstOp};
use p4_frontend::ir::SymbolTable;

/// `n` structs of four fields each, every one referenced by a constant.
fn record_heavy_program(n: usize) -> Ast {
    let mut b = AstBuilder::new();
    let mut decls = Vec::new();
    for i in 0..n {
        let fields = (0..4i64)
            .map(|j| {
                let ty = b.bit_type(Some(8 * (j + 1)));
                b.struct_field(ty, &format!("f{}", j))
            })
            .collect();
        let name = format!("S{}", i);
        decls.push(b.struct_decl(&name, fields));
        let s_ref = b.named_type(&name);
        decls.push(b.var_decl(s_ref, &format!("s{}", i), None));
    }
    b.program(decls)
}

/// A control whose body chains `n` arithmetic assignments.
fn expression_heavy_program(n: usize) -> Ast {
    let mut b = AstBuilder::new();
    let a_ty = b.bit_type(Some(32));
    let a_decl = b.var_decl(a_ty, "acc", None);
    let stmts = (0..n)
        .map(|i| {
            let lhs = b.name("acc");
            let acc = b.name("acc");
            let lit = b.int_literal(i as i64);
            let sum = b.binary(AstOp::Add, acc, lit);
            b.assign(lhs, sum)
        })
        .collect();
    let body = b.block(stmts);
    let params = b.param_list(vec![]);
    let proto = b.control_type_decl("C", params);
    let ctrl = b.control_decl(proto, None, vec![a_decl], body);
    b.program(vec![ctrl])
}

fn bench_record_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_heavy");
    for n in [10, 100, 500] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter_batched(
                || record_heavy_program(n),
                |ast| black_box(analyze(ast, SymbolTable::new()).expect("well-typed")),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_expression_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_heavy");
    for n in [10, 100, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter_batched(
                || expression_heavy_program(n),
                |ast| black_box(analyze(ast, SymbolTable::new()).expect("well-typed")),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record_heavy, bench_expression_heavy);
criterion_main!(benches);
