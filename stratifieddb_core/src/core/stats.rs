use itertools::{Itertools, MinMaxResult};
use roaring::RoaringTreemap;

use super::column::{Column, ColumnValues};
use super::filter::bloom;
use super::value::Value;

/// Per-column summary of one pack: value bounds, distinct-value count and
/// optional membership structures. Produced by the flush path, consumed
/// read-only by the pack pruner.
#[derive(Debug, Clone)]
pub struct BlockStats {
    pub min: Value,
    pub max: Value,
    pub cardinality: u64,
    pub bloom: Option<bloom::Filter>,
    pub bitmap: Option<RoaringTreemap>,
}

impl BlockStats {
    pub fn new(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        BlockStats {
            min: min.into(),
            max: max.into(),
            cardinality: 0,
            bloom: None,
            bitmap: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: u64) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_bloom(mut self, bloom: bloom::Filter) -> Self {
        self.bloom = Some(bloom);
        self
    }

    pub fn with_bitmap(mut self, bitmap: RoaringTreemap) -> Self {
        self.bitmap = Some(bitmap);
        self
    }

    /// Computes min/max bounds for a column. Empty columns produce no stats.
    pub fn from_column(col: &Column) -> Option<Self> {
        fn bounds<T: Copy + PartialOrd, F: Fn(T) -> Value>(v: &[T], f: F) -> Option<BlockStats> {
            let (lo, hi) = match v.iter().copied().minmax() {
                MinMaxResult::NoElements => return None,
                MinMaxResult::OneElement(a) => (a, a),
                MinMaxResult::MinMax(a, b) => (a, b),
            };
            Some(BlockStats::new(f(lo), f(hi)))
        }
        match &col.values {
            ColumnValues::Bool(v) => bounds(v, Value::Bool),
            ColumnValues::I8(v) => bounds(v, |x| Value::I64(x as i64)),
            ColumnValues::I16(v) => bounds(v, |x| Value::I64(x as i64)),
            ColumnValues::I32(v) => bounds(v, |x| Value::I64(x as i64)),
            ColumnValues::I64(v) => bounds(v, Value::I64),
            ColumnValues::U8(v) => bounds(v, |x| Value::U64(x as u64)),
            ColumnValues::U16(v) => bounds(v, |x| Value::U64(x as u64)),
            ColumnValues::U32(v) => bounds(v, |x| Value::U64(x as u64)),
            ColumnValues::U64(v) => bounds(v, Value::U64),
            ColumnValues::F32(v) => bounds(v, |x| Value::F64(x as f64)),
            ColumnValues::F64(v) => bounds(v, Value::F64),
            ColumnValues::Bytes(v) => {
                let min = v.iter().min()?.clone();
                let max = v.iter().max()?.clone();
                Some(BlockStats::new(Value::Bytes(min), Value::Bytes(max)))
            }
            ColumnValues::Str(v) => {
                let min = v.iter().min()?.clone();
                let max = v.iter().max()?.clone();
                Some(BlockStats::new(Value::Str(min), Value::Str(max)))
            }
        }
    }
}

/// Identity and per-column statistics of one pack, registered with the
/// placement index when the pack is flushed and refreshed on every
/// append/update to it.
#[derive(Debug, Clone)]
pub struct PackStats {
    pub key: u32,
    pub n_values: usize,
    pub blocks: Vec<BlockStats>,
}

impl PackStats {
    pub fn new(key: u32, n_values: usize, blocks: Vec<BlockStats>) -> Self {
        PackStats {
            key,
            n_values,
            blocks,
        }
    }

    /// Primary-key bounds of this pack. The pk stat block always carries
    /// u64 bounds; anything else is an invariant violation.
    #[track_caller]
    pub fn pk_bounds(&self, pk_index: usize) -> (u64, u64) {
        let block = &self.blocks[pk_index];
        (block.min.expect_u64(), block.max.expect_u64())
    }
}
