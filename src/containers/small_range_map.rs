//! Fixed-capacity, array-backed range map for small integer domains.
//!
//! Every index `i` in `[0, limit)` stores either the full range of the entry
//! covering it (if any), or the nearest occupied neighbors on either side
//! (if `i` falls in a gap). That gives O(1) point lookup in both cases, at
//! the cost of O(limit) insert/erase (propagating neighbor pointers through
//! however many gap cells an edit touches) instead of a tree's O(log n).

use super::range::Range;

/// Conversion between a `SmallRangeMap` index type and the plain array
/// index used to address its backing storage. Implemented for the unsigned
/// integer types small-index domains are realistically built from.
pub trait SmallIndex: Copy + Ord + Default + std::ops::Sub<Output = Self> + std::ops::Add<Output = Self> {
    fn as_usize(self) -> usize;
    fn from_usize(v: usize) -> Self;
}

macro_rules! impl_small_index {
    ($($t:ty),*) => {
        $(impl SmallIndex for $t {
            fn as_usize(self) -> usize { self as usize }
            fn from_usize(v: usize) -> Self { v as $t }
        })*
    };
}
impl_small_index!(u8, u16, u32, u64, usize);

#[derive(Clone, Copy)]
enum Cell<I> {
    Occupied(Range<I>),
    Gap { next_begin: I, prev_end: I },
}

pub struct SmallRangeMap<I, V, const N: usize> {
    limit: usize,
    cells: [Cell<I>; N],
    values: [Option<V>; N],
}

impl<I: SmallIndex, V, const N: usize> SmallRangeMap<I, V, N> {
    pub fn new(limit: usize) -> Self {
        debug_assert!(limit <= N, "SmallRangeMap limit exceeds inline capacity");
        let limit_idx = I::from_usize(limit);
        SmallRangeMap {
            limit,
            cells: [Cell::Gap { next_begin: limit_idx, prev_end: I::default() }; N],
            values: std::array::from_fn(|_| None),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.cells[..self.limit].iter().all(|c| matches!(c, Cell::Gap { .. }))
    }

    /// O(1): every index, occupied or not, carries enough local information
    /// to answer directly.
    pub fn find(&self, index: I) -> Option<(Range<I>, &V)> {
        let i = index.as_usize();
        if i >= self.limit {
            return None;
        }
        match self.cells[i] {
            Cell::Occupied(r) => Some((r, self.values[r.begin.as_usize()].as_ref().unwrap())),
            Cell::Gap { .. } => None,
        }
    }

    fn prev_occupied_end(&self, at: usize) -> I {
        if at == 0 {
            return I::default();
        }
        match self.cells[at - 1] {
            Cell::Occupied(r) => r.end,
            Cell::Gap { prev_end, .. } => prev_end,
        }
    }

    fn next_occupied_begin(&self, at: usize) -> I {
        if at >= self.limit {
            return I::from_usize(self.limit);
        }
        match self.cells[at] {
            Cell::Occupied(r) => r.begin,
            Cell::Gap { next_begin, .. } => next_begin,
        }
    }

    /// First occupied entry intersecting or following `key`, same contract
    /// as `RangeMap::lower_bound`: the entry immediately preceding `key` is
    /// checked first, since it may still extend into it.
    pub fn lower_bound(&self, key: Range<I>) -> Option<Range<I>> {
        let b = key.begin.as_usize().min(self.limit);
        if b > 0 {
            if let Cell::Occupied(r) = self.cells[b - 1] {
                if r.end.as_usize() > key.begin.as_usize() {
                    return Some(r);
                }
            }
        }
        if b >= self.limit {
            return None;
        }
        match self.cells[b] {
            Cell::Occupied(r) => Some(r),
            Cell::Gap { next_begin, .. } => {
                let nb = next_begin.as_usize();
                if nb >= self.limit {
                    None
                } else if let Cell::Occupied(r) = self.cells[nb] {
                    Some(r)
                } else {
                    None
                }
            }
        }
    }

    fn has_entry_at(&self, i: usize) -> bool {
        i < self.limit && matches!(self.cells[i], Cell::Occupied(_))
    }

    fn insert_unchecked(&mut self, key: Range<I>, value: V) {
        let b = key.begin.as_usize();
        let e = key.end.as_usize();
        for cell in self.cells[b..e].iter_mut() {
            *cell = Cell::Occupied(key);
        }
        self.values[b] = Some(value);

        let mut i = b;
        while i > 0 {
            i -= 1;
            match &mut self.cells[i] {
                Cell::Gap { next_begin, .. } => *next_begin = key.begin,
                Cell::Occupied(_) => break,
            }
        }
        let mut i = e;
        while i < self.limit {
            match &mut self.cells[i] {
                Cell::Gap { prev_end, .. } => {
                    *prev_end = key.end;
                    i += 1;
                }
                Cell::Occupied(_) => break,
            }
        }
    }

    fn clear_range(&mut self, r: Range<I>) {
        let b = r.begin.as_usize();
        let e = r.end.as_usize();
        self.values[b] = None;
        let prev_end = self.prev_occupied_end(b);
        let next_begin = self.next_occupied_begin(e);
        for cell in self.cells[b..e].iter_mut() {
            *cell = Cell::Gap { next_begin, prev_end };
        }
        let mut i = b;
        while i > 0 {
            i -= 1;
            match &mut self.cells[i] {
                Cell::Gap { next_begin: nb, .. } => *nb = next_begin,
                Cell::Occupied(_) => break,
            }
        }
        let mut i = e;
        while i < self.limit {
            match &mut self.cells[i] {
                Cell::Gap { prev_end: pe, .. } => {
                    *pe = prev_end;
                    i += 1;
                }
                Cell::Occupied(_) => break,
            }
        }
    }

    /// Requires `key ⊆ [0, limit)`. Returns `false` (no-op) if out of range
    /// or intersecting an existing entry.
    pub fn emplace(&mut self, key: Range<I>, value: V) -> bool {
        if key.invalid() || key.empty() {
            return false;
        }
        let b = key.begin.as_usize();
        let e = key.end.as_usize();
        if e > self.limit {
            return false;
        }
        if (b..e).any(|i| matches!(self.cells[i], Cell::Occupied(_))) {
            return false;
        }
        self.insert_unchecked(key, value);
        true
    }

    /// Splits the stored entry `key` at `at`, cloning its value into both
    /// halves.
    pub fn split(&mut self, key: Range<I>, at: I) -> bool
    where
        V: Clone,
    {
        if !key.includes_index(at) || key.begin >= at {
            return false;
        }
        let b = key.begin.as_usize();
        if b >= self.limit {
            return false;
        }
        match self.cells[b] {
            Cell::Occupied(r) if r == key => {}
            _ => return false,
        }
        let value = self.values[b].take().unwrap();
        self.clear_range(key);
        self.insert_unchecked(Range::new(key.begin, at), value.clone());
        self.insert_unchecked(Range::new(at, key.end), value);
        true
    }

    pub fn erase_range(&mut self, bounds: Range<I>)
    where
        V: Clone,
    {
        self.erase_range_or_touch(bounds, |_| true);
    }

    pub fn erase_range_or_touch<F>(&mut self, bounds: Range<I>, mut touch: F)
    where
        V: Clone,
        F: FnMut(&mut V) -> bool,
    {
        if bounds.empty() {
            return;
        }
        let lo = bounds.begin.as_usize().min(self.limit);
        let hi = bounds.end.as_usize().min(self.limit);
        if lo >= hi {
            return;
        }

        if let Cell::Occupied(r) = self.cells[lo] {
            if r.begin.as_usize() < lo {
                self.split(r, bounds.begin);
            }
        }

        let mut i = lo;
        while i < hi {
            let r = match self.cells[i] {
                Cell::Occupied(r) => r,
                Cell::Gap { next_begin, .. } => {
                    let nb = next_begin.as_usize();
                    if nb >= hi || nb <= i {
                        break;
                    }
                    i = nb;
                    continue;
                }
            };
            let full = r.end.as_usize() <= hi;
            let target = if full {
                r
            } else {
                self.split(r, bounds.end);
                Range::new(r.begin, bounds.end)
            };
            let b = target.begin.as_usize();
            let should_erase = match self.values[b].as_mut() {
                Some(v) => touch(v),
                None => false,
            };
            let next_i = target.end.as_usize();
            if should_erase {
                self.clear_range(target);
            }
            i = next_i;
        }
    }

    pub fn overwrite_range(&mut self, bounds: Range<I>, value: V)
    where
        V: Clone,
    {
        self.erase_range(bounds);
        self.insert_unchecked(bounds, value);
    }

    /// Entries in ascending order. O(limit) — walks the array once, using
    /// each gap's `next_begin` to skip ahead rather than stepping cell by
    /// cell.
    pub fn iter(&self) -> SmallRangeMapIter<'_, I, V, N> {
        SmallRangeMapIter { map: self, pos: 0 }
    }

    /// Merges maximal runs of adjacent, equal-valued entries. Re-scans until
    /// a pass makes no further merges; cheap relative to `limit`, and keeps
    /// the merge loop simple compared to tracking run boundaries by hand.
    pub fn consolidate(&mut self)
    where
        V: Clone + Eq,
    {
        loop {
            let entries: Vec<Range<I>> = self.iter().map(|(r, _)| r).collect();
            let mut merged_any = false;
            for pair in entries.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if !self.has_entry_at(a.begin.as_usize()) || !self.has_entry_at(b.begin.as_usize()) {
                    continue;
                }
                let same = self.values[a.begin.as_usize()] == self.values[b.begin.as_usize()];
                if a.is_prior_to(&b) && same {
                    let value = self.values[a.begin.as_usize()].clone().unwrap();
                    self.clear_range(a);
                    self.clear_range(b);
                    self.insert_unchecked(Range::new(a.begin, b.end), value);
                    merged_any = true;
                }
            }
            if !merged_any {
                break;
            }
        }
    }
}

pub struct SmallRangeMapIter<'a, I, V, const N: usize> {
    map: &'a SmallRangeMap<I, V, N>,
    pos: usize,
}

impl<'a, I: SmallIndex, V, const N: usize> Iterator for SmallRangeMapIter<'a, I, V, N> {
    type Item = (Range<I>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.map.limit {
            match self.map.cells[self.pos] {
                Cell::Occupied(r) => {
                    self.pos = r.end.as_usize();
                    return Some((r, self.map.values[r.begin.as_usize()].as_ref().unwrap()));
                }
                Cell::Gap { next_begin, .. } => {
                    let nb = next_begin.as_usize();
                    if nb <= self.pos {
                        return None;
                    }
                    self.pos = nb;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build<const N: usize>(limit: usize, entries: &[(u32, u32, char)]) -> SmallRangeMap<u32, char, N> {
        let mut m = SmallRangeMap::new(limit);
        for &(b, e, v) in entries {
            assert!(m.emplace(Range::new(b, e), v));
        }
        m
    }

    fn as_vec<const N: usize>(m: &SmallRangeMap<u32, char, N>) -> Vec<(u32, u32, char)> {
        m.iter().map(|(r, v)| (r.begin, r.end, *v)).collect()
    }

    #[test]
    fn emplace_and_find() {
        let m: SmallRangeMap<u32, char, 16> = build(16, &[(0, 4, 'A'), (4, 8, 'B')]);
        assert_eq!(m.find(2).map(|(_, v)| *v), Some('A'));
        assert_eq!(m.find(5).map(|(_, v)| *v), Some('B'));
        assert_eq!(m.find(9), None);
    }

    #[test]
    fn emplace_rejects_out_of_range_and_overlap() {
        let mut m: SmallRangeMap<u32, char, 8> = SmallRangeMap::new(8);
        assert!(m.emplace(Range::new(0, 4), 'A'));
        assert!(!m.emplace(Range::new(2, 6), 'B'));
        assert!(!m.emplace(Range::new(4, 10), 'C'));
    }

    #[test]
    fn erase_range_trims_boundaries() {
        let mut m: SmallRangeMap<u32, char, 32> = build(32, &[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C')]);
        m.erase_range(Range::new(3, 22));
        assert_eq!(as_vec(&m), vec![(0, 3, 'A'), (22, 30, 'C')]);
    }

    #[test]
    fn consolidate_merges_equal_adjacent() {
        let mut m: SmallRangeMap<u32, char, 32> =
            build(32, &[(0, 5, 'A'), (5, 10, 'A'), (10, 15, 'B'), (15, 20, 'B'), (20, 25, 'A')]);
        m.consolidate();
        assert_eq!(as_vec(&m), vec![(0, 10, 'A'), (10, 20, 'B'), (20, 25, 'A')]);
    }

    #[test]
    fn split_shares_value() {
        let mut m: SmallRangeMap<u32, char, 16> = build(16, &[(0, 10, 'A')]);
        assert!(m.split(Range::new(0, 10), 4));
        assert_eq!(as_vec(&m), vec![(0, 4, 'A'), (4, 10, 'A')]);
    }
}
