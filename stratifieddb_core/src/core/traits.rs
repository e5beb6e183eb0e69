use super::bitset::Bitset;
use super::column::Column;
use super::compile::CompiledCondition;
use super::matcher;

// Contracts of the collaborators surrounding the scan core. The engine
// implements these elsewhere; the scan pipeline only consumes them.

/// Materialized per-field access into one loaded pack.
pub trait ColumnAccessor {
    /// Typed values of the column at `field_index`.
    fn column(&self, field_index: usize) -> &Column;
    fn row_count(&self) -> usize;
}

/// Reference-counted pack cache. Eviction may occur on any `add`, so scan
/// drivers must re-acquire a pack reference per use instead of caching
/// positions across mutations.
pub trait PackCache {
    type Pack;

    /// Fetches and promotes a pack in the eviction order.
    fn get(&self, key: u32) -> Option<std::sync::Arc<Self::Pack>>;
    /// Fetches without promoting.
    fn peek(&self, key: u32) -> Option<std::sync::Arc<Self::Pack>>;
    /// Inserts a pack; the displaced pack, if any, is passed to the
    /// eviction callback before this returns.
    fn add(&self, key: u32, pack: std::sync::Arc<Self::Pack>);
    fn remove(&self, key: u32);
    fn contains(&self, key: u32) -> bool;
}

/// The unflushed in-memory tail of a table: one unsorted pack plus the set
/// of rows deleted since the last flush.
pub trait JournalOverlay: ColumnAccessor {
    /// True when the row at `pos` has a pending tombstone.
    fn is_deleted(&self, pos: usize) -> bool;
}

/// Checks every live journal row against a compiled condition through the
/// single-row matcher. This is how uncommitted rows join a scan result
/// without the journal pack carrying statistics.
pub fn match_overlay<J: JournalOverlay>(cond: &CompiledCondition, overlay: &J) -> Bitset {
    let col = overlay.column(cond.field_index);
    let mut bits = Bitset::new(overlay.row_count());
    for pos in 0..overlay.row_count() {
        if overlay.is_deleted(pos) {
            continue;
        }
        if matcher::match_at(cond, col, pos) {
            bits.set(pos);
        }
    }
    bits
}
