use super::bitset::Bitset;
use super::column::{Column, ColumnValues};
use super::compile::{CompiledCondition, OperandSet};
use super::condition::FilterMode;
use super::value::Value;

// Vectorized predicate evaluation over one pack column. Two strategies:
// direct comparison loops for scalar operators, specialized membership
// probes for In/NotIn. All loops share the same mask discipline: rows with
// an unset mask bit are never evaluated and never set, and bits already set
// by the caller are never cleared.

/// Evaluates the condition against every row of `col`, honoring `mask`, and
/// returns the bitset of matching positions.
pub fn match_column(cond: &CompiledCondition, col: &Column, mask: Option<&Bitset>) -> Bitset {
    let len = col.len();
    if let Some(m) = mask {
        assert_eq!(m.len(), len, "mask length must equal pack row count");
    }
    let mut bits = Bitset::new(len);
    match cond.mode {
        FilterMode::In => match_set(cond, col, mask, &mut bits, false),
        FilterMode::NotIn => match_set(cond, col, mask, &mut bits, true),
        FilterMode::Regexp => match_regexp(cond, col, mask, &mut bits),
        _ => match_compare(cond, col, mask, &mut bits),
    }
    bits
}

/// Evaluates the condition against a single row position. Used to check
/// journal-overlay rows against the same compiled condition without
/// constructing a bitset.
pub fn match_at(cond: &CompiledCondition, col: &Column, pos: usize) -> bool {
    debug_assert!(pos < col.len(), "row position out of range");
    match cond.mode {
        FilterMode::In => member_at(cond, col, pos),
        FilterMode::NotIn => !member_at(cond, col, pos),
        FilterMode::Regexp => {
            let re = cond.pattern.as_ref().expect("regexp condition without pattern");
            match &col.values {
                ColumnValues::Str(v) => re.is_match(&v[pos]),
                _ => unreachable!("regexp condition on non-text column"),
            }
        }
        mode => {
            let (a, b) = operands(cond);
            match &col.values {
                ColumnValues::Bool(v) => cmp_ok(mode, v[pos], a.expect_bool(), b.map(|b| b.expect_bool())),
                ColumnValues::I8(v) => cmp_ok(mode, v[pos] as i64, a.expect_i64(), b.map(|b| b.expect_i64())),
                ColumnValues::I16(v) => cmp_ok(mode, v[pos] as i64, a.expect_i64(), b.map(|b| b.expect_i64())),
                ColumnValues::I32(v) => cmp_ok(mode, v[pos] as i64, a.expect_i64(), b.map(|b| b.expect_i64())),
                ColumnValues::I64(v) => cmp_ok(mode, v[pos], a.expect_i64(), b.map(|b| b.expect_i64())),
                ColumnValues::U8(v) => cmp_ok(mode, v[pos] as u64, a.expect_u64(), b.map(|b| b.expect_u64())),
                ColumnValues::U16(v) => cmp_ok(mode, v[pos] as u64, a.expect_u64(), b.map(|b| b.expect_u64())),
                ColumnValues::U32(v) => cmp_ok(mode, v[pos] as u64, a.expect_u64(), b.map(|b| b.expect_u64())),
                ColumnValues::U64(v) => cmp_ok(mode, v[pos], a.expect_u64(), b.map(|b| b.expect_u64())),
                ColumnValues::F32(v) => cmp_ok(mode, v[pos] as f64, a.expect_f64(), b.map(|b| b.expect_f64())),
                ColumnValues::F64(v) => cmp_ok(mode, v[pos], a.expect_f64(), b.map(|b| b.expect_f64())),
                ColumnValues::Bytes(v) => {
                    cmp_ok(mode, v[pos].as_slice(), a.expect_bytes(), b.map(|b| b.expect_bytes()))
                }
                ColumnValues::Str(v) => {
                    cmp_ok(mode, v[pos].as_str(), a.expect_str(), b.map(|b| b.expect_str()))
                }
            }
        }
    }
}

// first and (for ranges) second comparison operand
fn operands(cond: &CompiledCondition) -> (&Value, Option<&Value>) {
    if cond.mode == FilterMode::Range {
        let from = cond.from.as_ref().expect("range condition without bounds");
        let to = cond.to.as_ref().expect("range condition without bounds");
        (from, Some(to))
    } else {
        (cond.value.as_ref().expect("scalar condition without value"), None)
    }
}

#[inline]
fn cmp_ok<T: PartialOrd>(mode: FilterMode, v: T, a: T, b: Option<T>) -> bool {
    match mode {
        FilterMode::Equal => v == a,
        FilterMode::NotEqual => v != a,
        FilterMode::Gt => v > a,
        FilterMode::Ge => v >= a,
        FilterMode::Lt => v < a,
        FilterMode::Le => v <= a,
        FilterMode::Range => {
            let to = b.expect("range condition without upper bound");
            v >= a && v <= to
        }
        _ => unreachable!("set operator in comparison loop"),
    }
}

// One loop shared by every storage type: `get` widens the row value into
// the column's comparison class.
fn scan_cmp<T: PartialOrd + Copy>(
    len: usize,
    get: impl Fn(usize) -> T,
    mode: FilterMode,
    a: T,
    b: Option<T>,
    mask: Option<&Bitset>,
    bits: &mut Bitset,
) {
    for i in 0..len {
        if let Some(m) = mask {
            if !m.get(i) {
                continue;
            }
        }
        if cmp_ok(mode, get(i), a, b) {
            bits.set(i);
        }
    }
}

fn match_compare(cond: &CompiledCondition, col: &Column, mask: Option<&Bitset>, bits: &mut Bitset) {
    let len = col.len();
    let mode = cond.mode;
    let (a, b) = operands(cond);
    match &col.values {
        ColumnValues::Bool(v) => {
            scan_cmp(len, |i| v[i], mode, a.expect_bool(), b.map(|b| b.expect_bool()), mask, bits)
        }
        ColumnValues::I8(v) => {
            scan_cmp(len, |i| v[i] as i64, mode, a.expect_i64(), b.map(|b| b.expect_i64()), mask, bits)
        }
        ColumnValues::I16(v) => {
            scan_cmp(len, |i| v[i] as i64, mode, a.expect_i64(), b.map(|b| b.expect_i64()), mask, bits)
        }
        ColumnValues::I32(v) => {
            scan_cmp(len, |i| v[i] as i64, mode, a.expect_i64(), b.map(|b| b.expect_i64()), mask, bits)
        }
        ColumnValues::I64(v) => {
            scan_cmp(len, |i| v[i], mode, a.expect_i64(), b.map(|b| b.expect_i64()), mask, bits)
        }
        ColumnValues::U8(v) => {
            scan_cmp(len, |i| v[i] as u64, mode, a.expect_u64(), b.map(|b| b.expect_u64()), mask, bits)
        }
        ColumnValues::U16(v) => {
            scan_cmp(len, |i| v[i] as u64, mode, a.expect_u64(), b.map(|b| b.expect_u64()), mask, bits)
        }
        ColumnValues::U32(v) => {
            scan_cmp(len, |i| v[i] as u64, mode, a.expect_u64(), b.map(|b| b.expect_u64()), mask, bits)
        }
        ColumnValues::U64(v) => {
            scan_cmp(len, |i| v[i], mode, a.expect_u64(), b.map(|b| b.expect_u64()), mask, bits)
        }
        ColumnValues::F32(v) => {
            scan_cmp(len, |i| v[i] as f64, mode, a.expect_f64(), b.map(|b| b.expect_f64()), mask, bits)
        }
        ColumnValues::F64(v) => {
            scan_cmp(len, |i| v[i], mode, a.expect_f64(), b.map(|b| b.expect_f64()), mask, bits)
        }
        ColumnValues::Bytes(v) => scan_cmp(
            len,
            |i| v[i].as_slice(),
            mode,
            a.expect_bytes(),
            b.map(|b| b.expect_bytes()),
            mask,
            bits,
        ),
        ColumnValues::Str(v) => scan_cmp(
            len,
            |i| v[i].as_str(),
            mode,
            a.expect_str(),
            b.map(|b| b.expect_str()),
            mask,
            bits,
        ),
    }
}

fn match_regexp(cond: &CompiledCondition, col: &Column, mask: Option<&Bitset>, bits: &mut Bitset) {
    let re = cond.pattern.as_ref().expect("regexp condition without pattern");
    match &col.values {
        ColumnValues::Str(v) => {
            for i in 0..v.len() {
                if let Some(m) = mask {
                    if !m.get(i) {
                        continue;
                    }
                }
                if re.is_match(&v[i]) {
                    bits.set(i);
                }
            }
        }
        _ => unreachable!("regexp condition on non-text column"),
    }
}

// membership loop shared by all non-merge-join set strategies
fn scan_member<T: Copy>(
    len: usize,
    get: impl Fn(usize) -> T,
    is_member: impl Fn(T) -> bool,
    negate: bool,
    mask: Option<&Bitset>,
    bits: &mut Bitset,
) {
    for i in 0..len {
        if let Some(m) = mask {
            if !m.get(i) {
                continue;
            }
        }
        if is_member(get(i)) != negate {
            bits.set(i);
        }
    }
}

fn match_set(
    cond: &CompiledCondition,
    col: &Column,
    mask: Option<&Bitset>,
    bits: &mut Bitset,
    negate: bool,
) {
    let len = col.len();
    let set = cond.set.as_ref().expect("set condition without operands");
    match (&col.values, set) {
        (ColumnValues::Bool(v), OperandSet::Bool { sorted }) => {
            scan_member(len, |i| v[i], |x| sorted.contains(&x), negate, mask, bits)
        }
        (ColumnValues::I8(v), OperandSet::Int { set, .. }) => {
            scan_member(len, |i| v[i] as i64, |x| set.contains(&x), negate, mask, bits)
        }
        (ColumnValues::I16(v), OperandSet::Int { set, .. }) => {
            scan_member(len, |i| v[i] as i64, |x| set.contains(&x), negate, mask, bits)
        }
        (ColumnValues::I32(v), OperandSet::Int { set, .. }) => {
            scan_member(len, |i| v[i] as i64, |x| set.contains(&x), negate, mask, bits)
        }
        (ColumnValues::I64(v), OperandSet::Int { set, .. }) => {
            scan_member(len, |i| v[i], |x| set.contains(&x), negate, mask, bits)
        }
        (ColumnValues::U8(v), OperandSet::Uint { .. }) => {
            let probe = uint_probe(set);
            scan_member(len, |i| v[i] as u64, probe, negate, mask, bits)
        }
        (ColumnValues::U16(v), OperandSet::Uint { .. }) => {
            let probe = uint_probe(set);
            scan_member(len, |i| v[i] as u64, probe, negate, mask, bits)
        }
        (ColumnValues::U32(v), OperandSet::Uint { .. }) => {
            let probe = uint_probe(set);
            scan_member(len, |i| v[i] as u64, probe, negate, mask, bits)
        }
        (ColumnValues::U64(v), OperandSet::Uint { sorted, .. }) => {
            // sorted primary-key columns pair with the pre-sorted operand
            // sequence in a merge-style two-pointer scan; the journal pack
            // is unsorted and takes the hash path below
            if cond.is_primary && col.sorted {
                let mut scratch = Bitset::new(len);
                merge_join_u64(v, sorted, &mut scratch);
                if negate {
                    scratch.negate();
                }
                if let Some(m) = mask {
                    scratch.and(m);
                }
                bits.or(&scratch);
            } else {
                let probe = uint_probe(set);
                scan_member(len, |i| v[i], probe, negate, mask, bits)
            }
        }
        (ColumnValues::F32(v), OperandSet::Float { sorted, .. }) => {
            scan_member(len, |i| v[i] as f64, |x| float_contains(sorted, x), negate, mask, bits)
        }
        (ColumnValues::F64(v), OperandSet::Float { sorted, .. }) => {
            scan_member(len, |i| v[i], |x| float_contains(sorted, x), negate, mask, bits)
        }
        (ColumnValues::Bytes(v), OperandSet::Bytes(s)) => {
            scan_member(len, |i| v[i].as_slice(), |x| s.contains(x), negate, mask, bits)
        }
        (ColumnValues::Str(v), OperandSet::Str(s)) => {
            scan_member(len, |i| v[i].as_bytes(), |x| s.contains(x), negate, mask, bits)
        }
        _ => unreachable!("operand set class does not match column storage class"),
    }
}

// membership closure for unsigned columns: eager set when present,
// otherwise the build-once fallback (primary-key set vs unsorted pack)
fn uint_probe<'a>(set: &'a OperandSet) -> impl Fn(u64) -> bool + 'a {
    let eager = match set {
        OperandSet::Uint { set, .. } => set.as_ref(),
        _ => unreachable!("uint probe on non-uint operand set"),
    };
    move |x| match eager {
        Some(s) => s.contains(&x),
        None => set.uint_fallback().contains(&x),
    }
}

fn member_at(cond: &CompiledCondition, col: &Column, pos: usize) -> bool {
    let set = cond.set.as_ref().expect("set condition without operands");
    match (&col.values, set) {
        (ColumnValues::Bool(v), OperandSet::Bool { sorted }) => sorted.contains(&v[pos]),
        (ColumnValues::I8(v), OperandSet::Int { set, .. }) => set.contains(&(v[pos] as i64)),
        (ColumnValues::I16(v), OperandSet::Int { set, .. }) => set.contains(&(v[pos] as i64)),
        (ColumnValues::I32(v), OperandSet::Int { set, .. }) => set.contains(&(v[pos] as i64)),
        (ColumnValues::I64(v), OperandSet::Int { set, .. }) => set.contains(&v[pos]),
        (ColumnValues::U8(v), OperandSet::Uint { .. }) => uint_probe(set)(v[pos] as u64),
        (ColumnValues::U16(v), OperandSet::Uint { .. }) => uint_probe(set)(v[pos] as u64),
        (ColumnValues::U32(v), OperandSet::Uint { .. }) => uint_probe(set)(v[pos] as u64),
        (ColumnValues::U64(v), OperandSet::Uint { .. }) => uint_probe(set)(v[pos]),
        (ColumnValues::F32(v), OperandSet::Float { sorted, .. }) => {
            float_contains(sorted, v[pos] as f64)
        }
        (ColumnValues::F64(v), OperandSet::Float { sorted, .. }) => float_contains(sorted, v[pos]),
        (ColumnValues::Bytes(v), OperandSet::Bytes(s)) => s.contains(v[pos].as_slice()),
        (ColumnValues::Str(v), OperandSet::Str(s)) => s.contains(v[pos].as_bytes()),
        _ => unreachable!("operand set class does not match column storage class"),
    }
}

/// Merge-style scan of a sorted primary-key column against a sorted operand
/// sequence. Advances both cursors in lock step and marks every pk position
/// whose value appears in the operand set. Repeated key values in the column
/// all match the same operand.
fn merge_join_u64(pk: &[u64], ops: &[u64], bits: &mut Bitset) {
    let (Some(&max_op), Some(&max_pk)) = (ops.last(), pk.last()) else {
        return;
    };
    let (mut i, mut p) = (0usize, 0usize);
    while i < ops.len() && p < pk.len() {
        // no further matches possible in this pack
        if pk[p] > max_op || max_pk < ops[i] {
            break;
        }
        while p < pk.len() && pk[p] < ops[i] {
            p += 1;
        }
        if p == pk.len() {
            break;
        }
        while i < ops.len() && pk[p] > ops[i] {
            i += 1;
        }
        if i == ops.len() {
            break;
        }
        if pk[p] == ops[i] {
            bits.set(p);
            p += 1;
        }
    }
}

// total-order binary search plus numeric equality check on the neighbors,
// so 0.0 matches -0.0 and NaN operands never match anything
fn float_contains(sorted: &[f64], probe: f64) -> bool {
    let i = sorted.partition_point(|v| v.total_cmp(&probe) == std::cmp::Ordering::Less);
    (i < sorted.len() && sorted[i] == probe) || (i > 0 && sorted[i - 1] == probe)
}
