use rand::prelude::*;

use stratifieddb_core::core::{
    bitset::Bitset,
    column::Column,
    compile::{compile, CompiledCondition},
    condition::Condition,
    db_type::DbType,
    matcher::match_column,
    placement::PlacementIndex,
    prune::may_match,
    schema::FieldDesc,
    stats::{BlockStats, PackStats},
    value::Value,
};

const PACK_ROWS: usize = 256;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pk_field() -> FieldDesc {
    FieldDesc::new("pk", DbType::U64, 0).primary()
}

fn val_field() -> FieldDesc {
    FieldDesc::new("amount", DbType::I64, 1)
}

// one synthetic pack: sorted pk column plus a random i64 payload column
struct TestPack {
    stats: PackStats,
    pk: Column,
    amount: Column,
}

fn build_pack(key: u32, first_pk: u64, rng: &mut impl Rng) -> TestPack {
    let pk_values: Vec<u64> = (0..PACK_ROWS as u64).map(|i| first_pk + i).collect();
    let amount_values: Vec<i64> = (0..PACK_ROWS).map(|_| rng.random_range(-100..100)).collect();

    let pk = Column::new_sorted(pk_values);
    let amount = Column::new(amount_values);
    let stats = PackStats::new(
        key,
        PACK_ROWS,
        vec![
            BlockStats::from_column(&pk).unwrap(),
            BlockStats::from_column(&amount).unwrap(),
        ],
    );
    TestPack { stats, pk, amount }
}

// drive the scan pipeline over all packs for one condition on the payload
// column intersected with a pk range condition, mirroring how a query with
// two ANDed predicates composes bitsets
fn scan_matching_rows(
    packs: &[TestPack],
    index: &PlacementIndex,
    pk_cond: &CompiledCondition,
    amount_cond: &CompiledCondition,
) -> Vec<(u32, usize)> {
    let mut out = Vec::new();
    let mut placement = index.best(0);
    loop {
        let pack = &packs[placement.pos];
        if may_match(pk_cond, &pack.stats) && may_match(amount_cond, &pack.stats) {
            let mask = match_column(pk_cond, &pack.pk, None);
            if mask.any() {
                let bits = match_column(amount_cond, &pack.amount, Some(&mask));
                for pos in bits.iter_ones() {
                    out.push((pack.stats.key, pos));
                }
            }
        }
        placement = index.next(placement.order);
        if placement == Default::default() {
            break;
        }
    }
    out
}

#[test]
fn test_pipeline_prunes_and_matches() {
    init_logs();
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = PlacementIndex::new(0, PACK_ROWS);
    let packs: Vec<TestPack> = (0..8)
        .map(|key| {
            let pack = build_pack(key, key as u64 * 1000, &mut rng);
            index.add_or_update(pack.stats.clone());
            pack
        })
        .collect();

    let pk_cond = compile(&Condition::range("pk", 2100u64, 2200u64), &pk_field()).unwrap();
    let amount_cond = compile(&Condition::ge("amount", 0i64), &val_field()).unwrap();

    let rows = scan_matching_rows(&packs, &index, &pk_cond, &amount_cond);
    // all surviving rows come from pack 2 and satisfy both predicates
    assert!(!rows.is_empty());
    for (key, pos) in rows {
        assert_eq!(key, 2);
        let pack = &packs[2];
        if let stratifieddb_core::core::column::ColumnValues::U64(v) = &pack.pk.values {
            assert!((2100..=2200).contains(&v[pos]));
        }
        if let stratifieddb_core::core::column::ColumnValues::I64(v) = &pack.amount.values {
            assert!(v[pos] >= 0);
        }
    }
}

#[test]
fn test_pruning_soundness_randomized() {
    // for random packs and random predicates: whenever the matcher finds a
    // row, the pruner must have kept the pack
    let mut rng = StdRng::seed_from_u64(42);
    let field = val_field();

    for _ in 0..200 {
        let values: Vec<i64> = (0..64).map(|_| rng.random_range(-50..50)).collect();
        let col = Column::new(values);
        let stats = PackStats::new(
            0,
            col.len(),
            vec![
                BlockStats::new(0u64, 0u64),
                BlockStats::from_column(&col).unwrap(),
            ],
        );

        let a = rng.random_range(-60i64..60);
        let b = rng.random_range(-60i64..60);
        let (lo, hi) = (a.min(b), a.max(b));
        let set: Vec<i64> = (0..4).map(|_| rng.random_range(-60..60)).collect();
        let conds = [
            Condition::equal("amount", a),
            Condition::not_equal("amount", a),
            Condition::gt("amount", a),
            Condition::ge("amount", a),
            Condition::lt("amount", a),
            Condition::le("amount", a),
            Condition::range("amount", lo, hi),
            Condition::in_set("amount", set.clone()),
            Condition::not_in_set("amount", set),
        ];
        for cond in conds {
            let compiled = compile(&cond, &field).unwrap();
            let bits = match_column(&compiled, &col, None);
            if bits.any() {
                assert!(
                    may_match(&compiled, &stats),
                    "pruner produced a false negative for {}",
                    cond
                );
            }
        }
    }
}

#[test]
fn test_merge_join_equivalence_randomized() {
    // the sorted-pk merge-join and the hash fallback must agree bit for bit
    let mut rng = StdRng::seed_from_u64(99);
    let field = pk_field();

    for _ in 0..100 {
        let mut values: Vec<u64> = (0..128).map(|_| rng.random_range(0..500)).collect();
        values.sort_unstable();
        let sorted_col = Column::new_sorted(values.clone());
        let journal_col = Column::new(values);

        let ops: Vec<u64> = (0..16).map(|_| rng.random_range(0..500)).collect();
        for cond in [
            Condition::in_set("pk", ops.clone()),
            Condition::not_in_set("pk", ops.clone()),
        ] {
            let compiled = compile(&cond, &field).unwrap();
            let merge = match_column(&compiled, &sorted_col, None);
            let hash = match_column(&compiled, &journal_col, None);
            assert_eq!(merge, hash, "strategy mismatch for {}", cond);
        }
    }
}

#[test]
fn test_string_set_agrees_with_naive_scan_randomized() {
    init_logs();
    let mut rng = StdRng::seed_from_u64(1312);
    let field = FieldDesc::new("tag", DbType::STRING, 0);
    let alphabet = ["ab", "ba", "cd", "dc", "ee", "ff", "gg", "hh"];

    for _ in 0..100 {
        let rows: Vec<&str> = (0..64).map(|_| alphabet[rng.random_range(0..alphabet.len())]).collect();
        let ops: Vec<&str> = (0..5).map(|_| alphabet[rng.random_range(0..alphabet.len())]).collect();
        let col = Column::new(rows.clone());

        let compiled = compile(&Condition::in_set("tag", ops.clone()), &field).unwrap();
        let bits = match_column(&compiled, &col, None);
        let naive: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| ops.contains(r))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), naive);
    }
}

#[test]
fn test_placement_monotonicity_randomized() {
    let mut rng = StdRng::seed_from_u64(5);

    // random disjoint ranges registered in shuffled order
    let mut bounds: Vec<u64> = (0..40).map(|_| rng.random_range(0..100_000)).collect();
    bounds.sort_unstable();
    bounds.dedup();
    let mut ranges: Vec<(u64, u64)> = bounds
        .windows(2)
        .map(|w| (w[0], w[1] - 1))
        .collect();
    ranges.shuffle(&mut rng);

    let mut index = PlacementIndex::new(0, 0);
    for (key, (lo, hi)) in ranges.iter().enumerate() {
        index.add_or_update(PackStats::new(
            key as u32,
            1,
            vec![BlockStats::new(*lo, *hi)],
        ));
    }

    let mut last_min = 0;
    for probe in (0..100_000).step_by(311) {
        let p = index.best(probe);
        assert!(p.min >= last_min);
        last_min = p.min;
    }
}

#[test]
fn test_mask_composition_never_resurrects_rows() {
    // second predicate can only narrow the surviving set
    let field = val_field();
    let col = Column::new(vec![5i64, -3, 10, 7, -8, 2]);

    let first = compile(&Condition::gt("amount", 0i64), &field).unwrap();
    let second = compile(&Condition::le("amount", 7i64), &field).unwrap();

    let mask = match_column(&first, &col, None);
    let mut combined = match_column(&second, &col, Some(&mask));
    combined.and(&mask);

    for pos in combined.iter_ones() {
        assert!(mask.get(pos));
    }
    assert_eq!(combined.iter_ones().collect::<Vec<_>>(), vec![0, 3, 5]);
}

#[test]
fn test_decimal_conditions_on_scaled_column() {
    // price DECIMAL64(2) stored as scaled i64 cents
    let field = FieldDesc::new("price", DbType::DECIMAL64, 0).with_scale(2);
    let col = Column::new(vec![199i64, 250, 1099, 99]);

    let c = compile(&Condition::range("price", Value::F64(1.0), Value::F64(2.5)), &field).unwrap();
    let bits = match_column(&c, &col, None);
    assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 1]);

    let c = compile(&Condition::equal("price", Value::F64(10.99)), &field).unwrap();
    let bits = match_column(&c, &col, None);
    assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_empty_mask_short_circuits_result() {
    let field = val_field();
    let col = Column::new(vec![1i64, 2, 3]);
    let mask = Bitset::new(3);
    let c = compile(&Condition::gt("amount", 0i64), &field).unwrap();
    let bits = match_column(&c, &col, Some(&mask));
    assert!(!bits.any());
}
