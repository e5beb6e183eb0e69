use std::cmp::Ordering;

use super::compile::CompiledCondition;
use super::condition::FilterMode;
use super::stats::{BlockStats, PackStats};
use super::value::Value;

// Statistics-only pack exclusion. Every decision here must be conservative:
// a pack is only skipped when its stat block proves no row can match. Any
// operator without such a proof answers "maybe" and forces the full scan.

/// Returns false only if the pack provably contains no matching row.
pub fn may_match(cond: &CompiledCondition, stats: &PackStats) -> bool {
    // never visit empty packs
    if stats.n_values == 0 {
        return false;
    }
    let block = &stats.blocks[cond.field_index];

    match cond.mode {
        FilterMode::Equal => {
            let value = scalar(cond);
            if !within(block, value) {
                return false;
            }
            if let (Some(filter), Some(hash)) = (&block.bloom, cond.scalar_hash) {
                if !filter.contains_hash(hash) {
                    return false;
                }
            }
            if let Some(bitmap) = &block.bitmap {
                if let Value::U64(v) = value {
                    return bitmap.contains(*v);
                }
            }
            true
        }
        // exclusion operators and regexp have no statistic-only proof
        FilterMode::NotEqual | FilterMode::NotIn | FilterMode::Regexp => true,
        FilterMode::Range => {
            let from = cond.from.as_ref().expect("range condition without bounds");
            let to = cond.to.as_ref().expect("range condition without bounds");
            // overlap of [min,max] and [from,to], both inclusive
            !(block.max.cmp_same(from) == Ordering::Less
                || block.min.cmp_same(to) == Ordering::Greater)
        }
        FilterMode::In => {
            let set = cond.set.as_ref().expect("set condition without operands");
            if !set.any_in_range(&block.min, &block.max) {
                return false;
            }
            if let Some(filter) = &block.bloom {
                let hashes = set.bloom_hashes();
                if !hashes.is_empty() && !filter.contains_any(hashes) {
                    return false;
                }
            }
            if let Some(bitmap) = &block.bitmap {
                if let super::compile::OperandSet::Uint { sorted, .. } = set {
                    return sorted.iter().any(|v| bitmap.contains(*v));
                }
            }
            true
        }
        // either bound clearing the threshold keeps the pack
        FilterMode::Gt => {
            let v = scalar(cond);
            gt(&block.min, v) || gt(&block.max, v)
        }
        FilterMode::Ge => {
            let v = scalar(cond);
            ge(&block.min, v) || ge(&block.max, v)
        }
        FilterMode::Lt => {
            let v = scalar(cond);
            lt(&block.min, v) || lt(&block.max, v)
        }
        FilterMode::Le => {
            let v = scalar(cond);
            le(&block.min, v) || le(&block.max, v)
        }
    }
}

/// Returns true if the condition provably matches every row of the pack, so
/// an AND combinator can skip the vectorized scan for it entirely.
pub fn always_match(cond: &CompiledCondition, block: &BlockStats) -> bool {
    match cond.mode {
        FilterMode::Equal => {
            let v = scalar(cond);
            block.min.cmp_same(v) == Ordering::Equal && block.max.cmp_same(v) == Ordering::Equal
        }
        FilterMode::NotEqual => {
            let v = scalar(cond);
            lt(v, &block.min) || gt(v, &block.max)
        }
        FilterMode::Range => {
            let from = cond.from.as_ref().expect("range condition without bounds");
            let to = cond.to.as_ref().expect("range condition without bounds");
            le(from, &block.min) && ge(to, &block.max)
        }
        FilterMode::Gt => gt(&block.min, scalar(cond)),
        FilterMode::Ge => ge(&block.min, scalar(cond)),
        FilterMode::Lt => lt(&block.max, scalar(cond)),
        FilterMode::Le => le(&block.max, scalar(cond)),
        FilterMode::In | FilterMode::NotIn | FilterMode::Regexp => false,
    }
}

#[track_caller]
fn scalar(cond: &CompiledCondition) -> &Value {
    cond.value.as_ref().expect("scalar condition without value")
}

#[inline]
fn within(block: &BlockStats, v: &Value) -> bool {
    block.min.cmp_same(v) != Ordering::Greater && block.max.cmp_same(v) != Ordering::Less
}

#[inline]
fn gt(a: &Value, b: &Value) -> bool {
    a.cmp_same(b) == Ordering::Greater
}

#[inline]
fn ge(a: &Value, b: &Value) -> bool {
    a.cmp_same(b) != Ordering::Less
}

#[inline]
fn lt(a: &Value, b: &Value) -> bool {
    a.cmp_same(b) == Ordering::Less
}

#[inline]
fn le(a: &Value, b: &Value) -> bool {
    a.cmp_same(b) != Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compile::compile;
    use crate::core::condition::Condition;
    use crate::core::db_type::DbType;
    use crate::core::filter::bloom::{self, Filter};
    use crate::core::schema::FieldDesc;

    fn pk_field() -> FieldDesc {
        FieldDesc::new("pk", DbType::U64, 0).primary()
    }

    fn pack(min: u64, max: u64) -> PackStats {
        PackStats::new(1, 4, vec![BlockStats::new(min, max)])
    }

    #[test]
    fn test_equal_range_check() {
        let c = compile(&Condition::equal("pk", 25u64), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(10, 40)));
        assert!(!may_match(&c, &pack(100, 200)));
        assert!(!may_match(&c, &PackStats::new(1, 0, vec![BlockStats::new(0u64, 0u64)])));
    }

    #[test]
    fn test_in_set_overlap() {
        let c = compile(&Condition::in_set("pk", [20u64, 40, 50]), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(10, 40)));
        assert!(!may_match(&c, &pack(100, 200)));
        // operands straddle but miss the pack range entirely
        let c = compile(&Condition::in_set("pk", [5u64, 60]), &pk_field()).unwrap();
        assert!(!may_match(&c, &pack(10, 40)));
    }

    #[test]
    fn test_range_overlap() {
        let c = compile(&Condition::range("pk", 15u64, 35u64), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(10, 40)));
        assert!(may_match(&c, &pack(30, 90)));
        assert!(!may_match(&c, &pack(36, 90)));
        assert!(!may_match(&c, &pack(0, 14)));
    }

    #[test]
    fn test_exclusion_operators_never_prune() {
        let c = compile(&Condition::not_equal("pk", 25u64), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(100, 200)));
        let c = compile(&Condition::not_in_set("pk", [1u64, 2]), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(100, 200)));
    }

    #[test]
    fn test_threshold_operators() {
        let c = compile(&Condition::gt("pk", 50u64), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(10, 60)));
        assert!(!may_match(&c, &pack(10, 50)));
        let c = compile(&Condition::le("pk", 10u64), &pk_field()).unwrap();
        assert!(may_match(&c, &pack(10, 60)));
        assert!(!may_match(&c, &pack(11, 60)));
    }

    #[test]
    fn test_bloom_rejects_pack() {
        let f = pk_field().with_bloom();
        let mut filter = Filter::new(512);
        filter.add_hash(bloom::hash_u64(30));

        let with_bloom = PackStats::new(
            1,
            4,
            vec![BlockStats::new(10u64, 40u64).with_bloom(filter)],
        );
        // 25 is inside [10,40] but not in the filter
        let c = compile(&Condition::equal("pk", 25u64), &f).unwrap();
        assert!(!may_match(&c, &with_bloom));
        let c = compile(&Condition::equal("pk", 30u64), &f).unwrap();
        assert!(may_match(&c, &with_bloom));
        // any operand passing the filter keeps the pack
        let c = compile(&Condition::in_set("pk", [25u64, 30]), &f).unwrap();
        assert!(may_match(&c, &with_bloom));
        let c = compile(&Condition::in_set("pk", [25u64, 26]), &f).unwrap();
        assert!(!may_match(&c, &with_bloom));
    }

    #[test]
    fn test_bitmap_rejects_pack() {
        let mut bm = roaring::RoaringTreemap::new();
        bm.insert(30);
        let stats = PackStats::new(
            1,
            4,
            vec![BlockStats::new(10u64, 40u64).with_bitmap(bm)],
        );
        let c = compile(&Condition::equal("pk", 25u64), &pk_field()).unwrap();
        assert!(!may_match(&c, &stats));
        let c = compile(&Condition::equal("pk", 30u64), &pk_field()).unwrap();
        assert!(may_match(&c, &stats));
    }

    #[test]
    fn test_always_match() {
        let block = BlockStats::new(10u64, 40u64);
        let c = compile(&Condition::ge("pk", 10u64), &pk_field()).unwrap();
        assert!(always_match(&c, &block));
        let c = compile(&Condition::ge("pk", 11u64), &pk_field()).unwrap();
        assert!(!always_match(&c, &block));
        let c = compile(&Condition::range("pk", 0u64, 100u64), &pk_field()).unwrap();
        assert!(always_match(&c, &block));
        let c = compile(&Condition::not_equal("pk", 50u64), &pk_field()).unwrap();
        assert!(always_match(&c, &block));
        let c = compile(&Condition::equal("pk", 10u64), &pk_field()).unwrap();
        assert!(!always_match(&c, &block));
        let uniform = BlockStats::new(10u64, 10u64);
        assert!(always_match(&c, &uniform));
    }
}
