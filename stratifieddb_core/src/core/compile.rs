use log::warn;
use once_cell::sync::OnceCell;
use regex::Regex;
use smallvec::SmallVec;

use super::condition::{Condition, FilterMode};
use super::db_type::{DbType, TypeClass};
use super::errors::{CompileError, Result};
use super::filter::bloom::{self, HashPair};
use super::hashing::{self, SeededMap, SeededSet};
use super::schema::FieldDesc;
use super::value::Value;

// Use a hash structure for set conditions with at least this many operands;
// below the threshold a binary search over the sorted operands is cheaper.
pub(crate) const SET_HASH_THRESHOLD: usize = 2;

// Hash map slot value marking a hash shared by several operands. Lookups
// landing on it must consult the overflow list.
pub(crate) const SHARED_HASH: u32 = u32::MAX;

/// One entry of the collision overflow list: an operand whose 64-bit hash
/// collides with at least one other operand.
#[derive(Debug, Clone)]
pub(crate) struct HashEntry {
    pub hash: u64,
    pub pos: u32,
}

/// Membership structures for byte-string/text operand sets.
///
/// Lookups hash the probe and consult `hmap`; a hit still re-verifies true
/// equality against the operand stored at the mapped index, and a
/// `SHARED_HASH` hit scans the overflow list exhaustively. A miss is proof
/// of non-membership, so the false-positive cost of 64-bit hashing is
/// bounded by the collision set instead of the whole operand set.
#[derive(Debug, Clone)]
pub(crate) struct ByteSet<T> {
    pub sorted: Vec<T>,
    pub hmap: Option<SeededMap<u64, u32>>,
    pub overflow: SmallVec<[HashEntry; 4]>,
    pub hashes: Vec<HashPair>,
}

impl<T: AsRef<[u8]> + Ord> ByteSet<T> {
    fn build(mut values: Vec<T>, presorted: bool, want_bloom: bool) -> Self {
        if !presorted {
            values.sort_unstable();
        }
        values.dedup_by(|a, b| a.as_ref() == b.as_ref());

        let hashes = if want_bloom {
            values.iter().map(|v| bloom::hash_bytes(v.as_ref())).collect()
        } else {
            Vec::new()
        };

        let mut overflow: SmallVec<[HashEntry; 4]> = SmallVec::new();
        let hmap = if values.len() >= SET_HASH_THRESHOLD {
            let mut map = hashing::new_map::<u64, u32>();
            for (i, v) in values.iter().enumerate() {
                let sum = hashing::sum64(v.as_ref());
                match map.get(&sum).copied() {
                    None => {
                        map.insert(sum, i as u32);
                    }
                    Some(pos) => {
                        // operands are unique after dedup, so a repeated hash
                        // is a genuine collision
                        if pos != SHARED_HASH {
                            warn!("condition hash collision {:02x?} / {:02x?} == {:016x}",
                                v.as_ref(), values[pos as usize].as_ref(), sum);
                            overflow.push(HashEntry { hash: sum, pos });
                        } else {
                            warn!("condition double hash collision {:02x?} == {:016x}", v.as_ref(), sum);
                        }
                        overflow.push(HashEntry { hash: sum, pos: i as u32 });
                        map.insert(sum, SHARED_HASH);
                    }
                }
            }
            Some(map)
        } else {
            None
        };

        ByteSet {
            sorted: values,
            hmap,
            overflow,
            hashes,
        }
    }

    /// Membership test with collision fallback.
    pub fn contains(&self, probe: &[u8]) -> bool {
        let Some(map) = &self.hmap else {
            return self
                .sorted
                .binary_search_by(|v| v.as_ref().cmp(probe))
                .is_ok();
        };
        let sum = hashing::sum64(probe);
        match map.get(&sum).copied() {
            None => false,
            Some(SHARED_HASH) => self
                .overflow
                .iter()
                .any(|e| e.hash == sum && self.sorted[e.pos as usize].as_ref() == probe),
            Some(pos) => self.sorted[pos as usize].as_ref() == probe,
        }
    }

}

/// Pre-optimized operand structures of an In/NotIn condition, specialized
/// per comparison class.
#[derive(Debug, Clone)]
pub(crate) enum OperandSet {
    Bool {
        sorted: Vec<bool>,
    },
    Int {
        sorted: Vec<i64>,
        set: SeededSet<i64>,
        hashes: Vec<HashPair>,
    },
    Uint {
        sorted: Vec<u64>,
        /// Eager membership set; absent for primary-key fields where the
        /// merge-join path makes it unnecessary on sorted packs.
        set: Option<SeededSet<u64>>,
        /// Built on first use against an unsorted primary-key column (the
        /// journal pack). The cell guarantees one blocking initialization
        /// even when packs are scanned concurrently.
        fallback: OnceCell<SeededSet<u64>>,
        hashes: Vec<HashPair>,
    },
    Float {
        sorted: Vec<f64>,
        hashes: Vec<HashPair>,
    },
    Bytes(ByteSet<Vec<u8>>),
    Str(ByteSet<String>),
}

impl OperandSet {
    pub fn len(&self) -> usize {
        match self {
            OperandSet::Bool { sorted } => sorted.len(),
            OperandSet::Int { sorted, .. } => sorted.len(),
            OperandSet::Uint { sorted, .. } => sorted.len(),
            OperandSet::Float { sorted, .. } => sorted.len(),
            OperandSet::Bytes(s) => s.sorted.len(),
            OperandSet::Str(s) => s.sorted.len(),
        }
    }

    /// True if any operand falls inside the inclusive [min, max] range.
    /// Binary search over the sorted operand sequence.
    pub fn any_in_range(&self, min: &Value, max: &Value) -> bool {
        fn overlap<T: PartialOrd>(sorted: &[T], min: &T, max: &T) -> bool {
            let i = sorted.partition_point(|v| v < min);
            i < sorted.len() && sorted[i] <= *max
        }
        match self {
            OperandSet::Bool { sorted } => {
                let (min, max) = (min.expect_bool(), max.expect_bool());
                sorted.iter().any(|v| *v >= min && *v <= max)
            }
            OperandSet::Int { sorted, .. } => overlap(sorted, &min.expect_i64(), &max.expect_i64()),
            OperandSet::Uint { sorted, .. } => overlap(sorted, &min.expect_u64(), &max.expect_u64()),
            OperandSet::Float { sorted, .. } => overlap(sorted, &min.expect_f64(), &max.expect_f64()),
            OperandSet::Bytes(s) => {
                let i = s.sorted.partition_point(|v| v.as_slice() < min.expect_bytes());
                i < s.sorted.len() && s.sorted[i].as_slice() <= max.expect_bytes()
            }
            OperandSet::Str(s) => {
                let i = s.sorted.partition_point(|v| v.as_str() < min.expect_str());
                i < s.sorted.len() && s.sorted[i].as_str() <= max.expect_str()
            }
        }
    }

    /// Precomputed bloom hash pairs, one per operand; empty when the field
    /// carries no filter.
    pub fn bloom_hashes(&self) -> &[HashPair] {
        match self {
            OperandSet::Bool { .. } => &[],
            OperandSet::Int { hashes, .. } => hashes,
            OperandSet::Uint { hashes, .. } => hashes,
            OperandSet::Float { hashes, .. } => hashes,
            OperandSet::Bytes(s) => &s.hashes,
            OperandSet::Str(s) => &s.hashes,
        }
    }

    /// Membership set for unsorted primary-key columns, built once on first
    /// use from the sorted operand sequence.
    pub fn uint_fallback(&self) -> &SeededSet<u64> {
        match self {
            OperandSet::Uint {
                sorted, fallback, ..
            } => fallback.get_or_init(|| {
                let mut set = hashing::new_set();
                set.extend(sorted.iter().copied());
                set
            }),
            _ => unreachable!("fallback set requested for non-uint operand set"),
        }
    }
}

/// A condition bound to a concrete field and rewritten into its storage
/// representation, with auxiliary lookup structures attached. Built once per
/// query, then shared read-only across all scanned packs.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    pub field: String,
    pub field_index: usize,
    pub db_type: DbType,
    pub is_primary: bool,
    pub mode: FilterMode,
    pub value: Option<Value>,
    pub from: Option<Value>,
    pub to: Option<Value>,
    /// Number of discrete operand values: 1 for scalar operators, 2 for
    /// ranges, N for set operators (after dedup).
    pub value_count: usize,
    pub(crate) set: Option<OperandSet>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) scalar_hash: Option<HashPair>,
}

/// Compiles a raw condition against a field descriptor.
///
/// All errors surface here; pruning and matching on the returned value are
/// error-free by construction.
pub fn compile(cond: &Condition, field: &FieldDesc) -> Result<CompiledCondition> {
    let mut out = CompiledCondition {
        field: field.name.clone(),
        field_index: field.index,
        db_type: field.db_type,
        is_primary: field.is_primary,
        mode: cond.mode,
        value: None,
        from: None,
        to: None,
        value_count: 0,
        set: None,
        pattern: None,
        scalar_hash: None,
    };

    match cond.mode {
        FilterMode::Regexp => {
            if !field.db_type.is_text() {
                return Err(CompileError::UnsupportedOperator(format!(
                    "regexp on {} field '{}'",
                    field.db_type, field.name
                )));
            }
            let pattern = match &cond.value {
                Some(Value::Str(p)) => p,
                _ => {
                    return Err(CompileError::TypeMismatch(
                        "regexp condition expects a string pattern".to_string(),
                    ));
                }
            };
            out.pattern =
                Some(Regex::new(pattern).map_err(|e| CompileError::BadPattern(e.to_string()))?);
            out.value = Some(Value::Str(pattern.clone()));
            out.value_count = 1;
        }
        FilterMode::Range => {
            let (Some(from), Some(to)) = (&cond.from, &cond.to) else {
                return Err(CompileError::InvalidRange(
                    "range condition expects from and to values".to_string(),
                ));
            };
            let from = from.coerce(field.db_type, field.scale)?;
            let to = to.coerce(field.db_type, field.scale)?;
            if from.cmp_same(&to) == std::cmp::Ordering::Greater {
                return Err(CompileError::InvalidRange("from > to".to_string()));
            }
            out.from = Some(from);
            out.to = Some(to);
            out.value_count = 2;
        }
        FilterMode::In | FilterMode::NotIn => {
            let set = build_operand_set(&cond.values, field, cond.is_sorted)?;
            out.value_count = set.len();
            out.set = Some(set);
        }
        _ => {
            let Some(value) = &cond.value else {
                return Err(CompileError::TypeMismatch(
                    "condition has no value".to_string(),
                ));
            };
            let value = value.coerce(field.db_type, field.scale)?;
            if field.bloom {
                out.scalar_hash = Some(bloom::hash_value(&value));
            }
            out.value = Some(value);
            out.value_count = 1;
        }
    }
    Ok(out)
}

fn build_operand_set(values: &[Value], field: &FieldDesc, presorted: bool) -> Result<OperandSet> {
    let coerced: Vec<Value> = values
        .iter()
        .map(|v| v.coerce(field.db_type, field.scale))
        .collect::<Result<_>>()?;
    let want_bloom = field.bloom;

    let set = match field.db_type.class() {
        TypeClass::Bool => {
            let mut sorted: Vec<bool> = coerced.iter().map(|v| v.expect_bool()).collect();
            if !presorted {
                sorted.sort_unstable();
            }
            sorted.dedup();
            OperandSet::Bool { sorted }
        }
        TypeClass::Int => {
            let mut sorted: Vec<i64> = coerced.iter().map(|v| v.expect_i64()).collect();
            if !presorted {
                sorted.sort_unstable();
            }
            sorted.dedup();
            let mut set = hashing::new_set();
            set.extend(sorted.iter().copied());
            let hashes = if want_bloom {
                sorted.iter().map(|v| bloom::hash_i64(*v)).collect()
            } else {
                Vec::new()
            };
            OperandSet::Int { sorted, set, hashes }
        }
        TypeClass::Uint => {
            let mut sorted: Vec<u64> = coerced.iter().map(|v| v.expect_u64()).collect();
            if !presorted {
                sorted.sort_unstable();
            }
            sorted.dedup();
            // primary keys usually hit the merge-join path on sorted packs;
            // the eager set would mostly go unused
            let set = if field.is_primary {
                None
            } else {
                let mut set = hashing::new_set();
                set.extend(sorted.iter().copied());
                Some(set)
            };
            let hashes = if want_bloom {
                sorted.iter().map(|v| bloom::hash_u64(*v)).collect()
            } else {
                Vec::new()
            };
            OperandSet::Uint {
                sorted,
                set,
                fallback: OnceCell::new(),
                hashes,
            }
        }
        TypeClass::Float => {
            let mut sorted: Vec<f64> = coerced.iter().map(|v| v.expect_f64()).collect();
            if !presorted {
                sorted.sort_unstable_by(|a, b| a.total_cmp(b));
            }
            sorted.dedup_by(|a, b| a.to_bits() == b.to_bits());
            let hashes = if want_bloom {
                sorted.iter().map(|v| bloom::hash_f64(*v)).collect()
            } else {
                Vec::new()
            };
            OperandSet::Float { sorted, hashes }
        }
        TypeClass::Bytes => {
            let items: Vec<Vec<u8>> = coerced
                .into_iter()
                .map(|v| match v {
                    Value::Bytes(b) => b,
                    _ => unreachable!("bytes coercion produced non-bytes value"),
                })
                .collect();
            OperandSet::Bytes(ByteSet::build(items, presorted, want_bloom))
        }
        TypeClass::Str => {
            let items: Vec<String> = coerced
                .into_iter()
                .map(|v| match v {
                    Value::Str(s) => s,
                    _ => unreachable!("string coercion produced non-string value"),
                })
                .collect();
            OperandSet::Str(ByteSet::build(items, presorted, want_bloom))
        }
    };
    Ok(set)
}
