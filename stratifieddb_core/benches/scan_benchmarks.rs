use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use stratifieddb_core::core::column::Column;
use stratifieddb_core::core::compile::compile;
use stratifieddb_core::core::condition::Condition;
use stratifieddb_core::core::db_type::DbType;
use stratifieddb_core::core::matcher::match_column;
use stratifieddb_core::core::placement::PlacementIndex;
use stratifieddb_core::core::prune::may_match;
use stratifieddb_core::core::schema::FieldDesc;
use stratifieddb_core::core::stats::{BlockStats, PackStats};

const PACKS: u32 = 4096;
const ROWS: usize = stratifieddb_core::DEFAULT_MAX_ROWS_PER_PACK;

fn build_index() -> PlacementIndex {
    let mut index = PlacementIndex::new(0, ROWS);
    for key in 0..PACKS {
        let min = key as u64 * ROWS as u64;
        let max = min + ROWS as u64 - 1;
        index.add_or_update(PackStats::new(key, ROWS, vec![BlockStats::new(min, max)]));
    }
    index
}

fn benchmark_placement_best(c: &mut Criterion) {
    let index = build_index();
    let span = PACKS as u64 * ROWS as u64;

    c.bench_function("placement_best_sequential_appends", |b| {
        let mut probe = 0u64;
        b.iter(|| {
            probe = (probe + 7919) % span;
            black_box(index.best(black_box(probe)))
        })
    });
}

fn benchmark_prune(c: &mut Criterion) {
    let field = FieldDesc::new("pk", DbType::U64, 0).primary();
    let cond = compile(&Condition::range("pk", 1_000_000u64, 1_100_000u64), &field).unwrap();
    let index = build_index();

    c.bench_function("prune_all_packs_range", |b| {
        b.iter(|| {
            let mut kept = 0usize;
            for pos in 0..index.len() {
                if may_match(&cond, index.get(pos).unwrap()) {
                    kept += 1;
                }
            }
            black_box(kept)
        })
    });
}

fn benchmark_match_strategies(c: &mut Criterion) {
    let field = FieldDesc::new("pk", DbType::U64, 0).primary();
    let values: Vec<u64> = (0..ROWS as u64).map(|i| i * 3).collect();
    let sorted_col = Column::new_sorted(values.clone());
    let journal_col = Column::new(values);

    let ops: Vec<u64> = (0..256u64).map(|i| i * 97).collect();
    let in_cond = compile(&Condition::in_set("pk", ops), &field).unwrap();
    let range_cond = compile(&Condition::range("pk", 900u64, 90_000u64), &field).unwrap();

    c.bench_function("match_in_sorted_pk_merge_join", |b| {
        b.iter(|| black_box(match_column(&in_cond, black_box(&sorted_col), None)))
    });

    c.bench_function("match_in_unsorted_pk_hash_set", |b| {
        b.iter(|| black_box(match_column(&in_cond, black_box(&journal_col), None)))
    });

    c.bench_function("match_range_vector", |b| {
        b.iter(|| black_box(match_column(&range_cond, black_box(&sorted_col), None)))
    });
}

criterion_group!(
    benches,
    benchmark_placement_best,
    benchmark_prune,
    benchmark_match_strategies
);
criterion_main!(benches);
