use log::warn;

use super::stats::PackStats;

// Pack placement index: maps primary-key ranges to packs for lookup and
// placement of new rows.
//
// Packs are registered in key order (u32, monotonically allocated) while
// their pk min/max ranges may be registered out of order; ranges never
// overlap except for the degenerate case of one repeated key value spanning
// several packs. A permutation of pack positions sorted by min value gives
// O(log n) placement. Trailing appends and trailing removals patch the
// permutation without sorting, interior mutations rebuild it; packs are
// appended far more often than edited out of order.

/// Validity state of the min-order permutation. Mutations that disturb
/// relative order mark it and must restore `Sorted` before returning; every
/// lookup asserts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermOrder {
    Sorted,
    NeedsRebuild,
}

/// Result of a placement lookup. `order` is the pack's ordinal in
/// ascending-min order and feeds `next()`; `pos` is its position in key
/// order and feeds `get()`. The all-zero value doubles as the terminal
/// sentinel: an empty index and iteration past the last pack both produce
/// it, which callers read as "create the first pack" / "done".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub order: usize,
    pub pos: usize,
    pub min: u64,
    pub max: u64,
    pub next_min: u64,
    pub is_full: bool,
}

pub struct PlacementIndex {
    packs: Vec<PackStats>,
    min_pks: Vec<u64>,
    max_pks: Vec<u64>,
    /// pack positions sorted by (min, max, position)
    perm: Vec<u32>,
    /// sorted keys of removed packs, so a stale re-add is distinguishable
    /// from a genuine new pack
    removed: Vec<u32>,
    pk_index: usize,
    max_rows: usize,
    order: PermOrder,
}

impl PlacementIndex {
    /// `pk_index` selects the primary-key stat block inside each pack;
    /// `max_rows` is the per-pack row capacity (0 disables fullness checks).
    pub fn new(pk_index: usize, max_rows: usize) -> Self {
        PlacementIndex {
            packs: Vec::new(),
            min_pks: Vec::new(),
            max_pks: Vec::new(),
            perm: Vec::new(),
            removed: Vec::new(),
            pk_index,
            max_rows,
            order: PermOrder::Sorted,
        }
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Total row count across all registered packs.
    pub fn row_count(&self) -> usize {
        self.packs.iter().map(|p| p.n_values).sum()
    }

    /// Key for the next new pack.
    pub fn next_key(&self) -> u32 {
        match self.packs.last() {
            Some(p) => p.key + 1,
            None => 0,
        }
    }

    pub fn get(&self, pos: usize) -> Option<&PackStats> {
        self.packs.get(pos)
    }

    /// Pack stats by pack key. Removed keys answer `None` even if a pack
    /// with the same key was never registered.
    pub fn get_by_key(&self, key: u32) -> Option<&PackStats> {
        if self.removed.binary_search(&key).is_ok() {
            return None;
        }
        let pos = self.packs.binary_search_by_key(&key, |p| p.key).ok()?;
        self.packs.get(pos)
    }

    pub fn min_max(&self, pos: usize) -> Option<(u64, u64)> {
        if pos >= self.len() {
            return None;
        }
        Some((self.min_pks[pos], self.max_pks[pos]))
    }

    pub fn global_min_max(&self) -> Option<(u64, u64)> {
        debug_assert_eq!(self.order, PermOrder::Sorted);
        let first = *self.perm.first()? as usize;
        let last = *self.perm.last()? as usize;
        Some((self.min_pks[first], self.max_pks[last]))
    }

    /// Returns the pack whose range should hold `val`: the last pack whose
    /// min <= val, or the first pack when val is smaller than every min.
    /// Never fails; an empty index degrades to the zero sentinel which the
    /// caller interprets as "create the first pack".
    pub fn best(&self, val: u64) -> Placement {
        debug_assert_eq!(self.order, PermOrder::Sorted);
        let count = self.len();
        if count == 0 {
            return Placement::default();
        }

        // first pack with min larger than val, then step back one
        let mut i = self
            .perm
            .partition_point(|&p| self.min_pks[p as usize] <= val);
        if i > 0 {
            i -= 1;
        }
        self.placement_at(i)
    }

    /// Logical successor of a placement in ascending-min order; the zero
    /// sentinel when no successor exists.
    pub fn next(&self, last_order: usize) -> Placement {
        debug_assert_eq!(self.order, PermOrder::Sorted);
        let next = last_order + 1;
        if next >= self.len() {
            return Placement::default();
        }
        self.placement_at(next)
    }

    fn placement_at(&self, order: usize) -> Placement {
        let next_min = if order + 1 < self.len() {
            self.min_pks[self.perm[order + 1] as usize]
        } else {
            0
        };
        let pos = self.perm[order] as usize;
        Placement {
            order,
            pos,
            min: self.min_pks[pos],
            max: self.max_pks[pos],
            next_min,
            is_full: self.is_full_pos(pos),
        }
    }

    #[inline]
    fn is_full_pos(&self, pos: usize) -> bool {
        self.max_rows > 0 && self.packs[pos].n_values >= self.max_rows
    }

    /// Registers a new pack range or refreshes an existing one (by pack
    /// key). A trailing append whose min does not undercut the current
    /// last range extends the permutation without sorting; anything that
    /// disturbs interior order triggers a full rebuild.
    pub fn add_or_update(&mut self, stats: PackStats) {
        if let Ok(i) = self.removed.binary_search(&stats.key) {
            warn!("placement: re-adding previously removed pack {}", stats.key);
            self.removed.remove(i);
        }
        let (new_min, new_max) = stats.pk_bounds(self.pk_index);

        match self.packs.binary_search_by_key(&stats.key, |p| p.key) {
            Ok(pos) => {
                // refresh: keep min/max caches in sync, re-sort only when
                // the min moved
                let old_min = self.min_pks[pos];
                self.packs[pos] = stats;
                self.min_pks[pos] = new_min;
                self.max_pks[pos] = new_max;
                if old_min != new_min {
                    self.order = PermOrder::NeedsRebuild;
                    self.resort();
                }
            }
            Err(pos) => {
                self.packs.insert(pos, stats);
                if pos > 0 && pos == self.packs.len() - 1 {
                    // trailing append in key order; permutation entries for
                    // existing packs are untouched
                    let last = *self.perm.last().expect("non-empty index without permutation") as usize;
                    let last_max = self.max_pks[last];
                    self.min_pks.push(new_min);
                    self.max_pks.push(new_max);
                    self.perm.push(pos as u32);
                    if new_min < last_max {
                        self.order = PermOrder::NeedsRebuild;
                        self.resort();
                    }
                } else {
                    // interior insert shifts every position after `pos`
                    self.order = PermOrder::NeedsRebuild;
                    self.rebuild();
                }
            }
        }
    }

    /// Deregisters a pack and tombstones its key. Removing the trailing
    /// pack splices the permutation via binary search; interior removals
    /// rebuild it.
    pub fn remove(&mut self, key: u32) {
        let Ok(pos) = self.packs.binary_search_by_key(&key, |p| p.key) else {
            return;
        };
        self.packs.remove(pos);
        if let Err(i) = self.removed.binary_search(&key) {
            self.removed.insert(i, key);
        }

        if pos > 0 && pos == self.packs.len() {
            // trailing removal: remaining positions are unchanged, locate
            // the permutation entry by its min value
            let old_min = self.min_pks[pos];
            let mut i = self
                .perm
                .partition_point(|&p| self.min_pks[p as usize] < old_min);
            while i < self.perm.len()
                && self.perm[i] as usize != pos
                && self.min_pks[self.perm[i] as usize] == old_min
            {
                i += 1;
            }
            debug_assert!(i < self.perm.len() && self.perm[i] as usize == pos);
            self.perm.remove(i);
            self.min_pks.remove(pos);
            self.max_pks.remove(pos);
        } else {
            self.min_pks.remove(pos);
            self.max_pks.remove(pos);
            self.order = PermOrder::NeedsRebuild;
            self.rebuild();
        }
    }

    // rebuild min/max caches and the permutation from the pack list
    fn rebuild(&mut self) {
        self.min_pks.clear();
        self.max_pks.clear();
        for p in &self.packs {
            let (lo, hi) = p.pk_bounds(self.pk_index);
            self.min_pks.push(lo);
            self.max_pks.push(hi);
        }
        self.perm.clear();
        self.perm.extend(0..self.packs.len() as u32);
        self.resort();
    }

    fn resort(&mut self) {
        let min_pks = &self.min_pks;
        let max_pks = &self.max_pks;
        self.perm.sort_unstable_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            min_pks[a]
                .cmp(&min_pks[b])
                .then(max_pks[a].cmp(&max_pks[b]))
                .then(a.cmp(&b))
        });
        self.order = PermOrder::Sorted;
    }
}
