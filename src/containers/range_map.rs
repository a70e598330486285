//! Ordered map keyed by disjoint, non-empty half-open ranges.
//!
//! Backed by a [`BTreeMap`] over [`Range`], whose `Ord` already encodes the
//! comparison a plain integer-keyed map would need; the non-standard part is
//! `lower_bound`, where the entry *preceding* a probe key may still extend
//! into it. That search is implemented once in [`RangeMap::lower_bound`] and
//! every other traversal (`find`, `erase_range`, `splice`, ...) builds on it.

use std::collections::BTreeMap;
use std::ops::{Add, Sub};

use super::range::Range;

/// Bound requirements shared by every `RangeMap<I, _>` operation.
pub trait Index: Copy + Ord + Default + Add<Output = Self> + Sub<Output = Self> {}
impl<T: Copy + Ord + Default + Add<Output = T> + Sub<Output = T>> Index for T {}

#[derive(Clone, Debug)]
pub struct RangeMap<I, V> {
    map: BTreeMap<Range<I>, V>,
}

impl<I: Index, V> Default for RangeMap<I, V> {
    fn default() -> Self {
        RangeMap { map: BTreeMap::new() }
    }
}

impl<I: Index, V> RangeMap<I, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Range<I>, &V)> {
        self.map.iter()
    }

    pub fn get(&self, key: &Range<I>) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &Range<I>) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    /// The unique entry whose key includes `index`, if any.
    pub fn find(&self, index: I) -> Option<(&Range<I>, &V)> {
        let probe = Range::new(index, index);
        if let Some((k, v)) = self.map.range(probe..).next() {
            if k.begin == index {
                return Some((k, v));
            }
        }
        if let Some((k, v)) = self.map.range(..probe).next_back() {
            if k.includes_index(index) {
                return Some((k, v));
            }
        }
        None
    }

    /// First entry whose key intersects or follows `key`. Differs from a
    /// plain ordered-map lower bound: the entry immediately preceding `key`
    /// may still extend into it, so that predecessor is checked first.
    pub fn lower_bound(&self, key: Range<I>) -> Option<(&Range<I>, &V)> {
        let probe = Range::new(key.begin, key.begin);
        if let Some((k, v)) = self.map.range(..probe).next_back() {
            if k.end > key.begin {
                return Some((k, v));
            }
        }
        self.map.range(probe..).next()
    }

    /// First entry strictly greater than (disjoint from and above) `key`.
    pub fn upper_bound(&self, key: Range<I>) -> Option<(&Range<I>, &V)> {
        let probe = Range::new(key.end, key.end);
        self.map.range(probe..).next()
    }

    /// Inserts `key -> value` if `key` is non-empty and intersects nothing
    /// already present. Returns the key actually present at that location
    /// afterward (the new key on success, the conflicting key on failure)
    /// and whether the insertion happened.
    pub fn insert(&mut self, key: Range<I>, value: V) -> (Range<I>, bool) {
        crate::strict_assert!(key.non_empty(), "range map keys must be non-empty");
        if let Some((existing, _)) = self.lower_bound(key) {
            if existing.intersects(&key) {
                return (*existing, false);
            }
        }
        self.map.insert(key, value);
        (key, true)
    }

    /// As [`insert`](Self::insert), but the caller supplies a position hint
    /// (typically the key of a nearby entry it just touched). The hint is
    /// used only to validate placement via `strictly_less`/`strictly_greater`
    /// before falling back to the general search; unlike the tree this type
    /// sits on top of in the source implementation, `BTreeMap` offers no
    /// stable hinted-insertion entry point, so this does not itself change
    /// the insertion's algorithmic complexity.
    pub fn insert_hint(&mut self, hint: Option<Range<I>>, key: Range<I>, value: V) -> (Range<I>, bool) {
        if let Some(h) = hint {
            if h.strictly_less(&key) || h.strictly_greater(&key) {
                // hint confirmed disjoint from key; no cheaper path available
                // on this backing map, fall through to the general insert.
            }
        }
        self.insert(key, value)
    }

    /// Splits the stored entry at `key` into `[key.begin, at)` and
    /// `[at, key.end)`, cloning the value into both halves. No-op (returns
    /// `false`) if `key` is not a stored key or `at` is not a strict
    /// interior point of it.
    pub fn split(&mut self, key: Range<I>, at: I) -> bool
    where
        V: Clone,
    {
        if !key.includes_index(at) || key.begin >= at {
            return false;
        }
        if let Some(value) = self.map.remove(&key) {
            self.map.insert(Range::new(key.begin, at), value.clone());
            self.map.insert(Range::new(at, key.end), value);
            true
        } else {
            false
        }
    }

    /// Removes the entry at `key` directly, e.g. one obtained from `iter()`,
    /// `find()`, or `lower_bound()`. Unlike [`erase_range`](Self::erase_range)
    /// this performs no intersection search or boundary trimming — it is a
    /// position-based removal, not a key-range removal, so it costs exactly
    /// one `BTreeMap` removal rather than a lower-bound search plus a
    /// forward scan.
    pub fn erase(&mut self, key: &Range<I>) -> Option<V> {
        self.map.remove(key)
    }

    /// Removes every entry in `keys`, the position-range counterpart to
    /// `erase_range`'s key-range removal: `keys` is typically a slice of
    /// `iter()` positions (e.g. `first..last`) rather than an arbitrary
    /// `Range<I>` bound.
    pub fn erase_iter<It: IntoIterator<Item = Range<I>>>(&mut self, keys: It) {
        for k in keys {
            self.map.remove(&k);
        }
    }

    /// Removes every entry intersecting `bounds`, trimming partially
    /// overlapped entries at either end via [`split`](Self::split) rather
    /// than dropping their out-of-bounds remainder.
    pub fn erase_range(&mut self, bounds: Range<I>)
    where
        V: Clone,
    {
        self.erase_range_or_touch(bounds, |_| true);
    }

    /// As [`erase_range`](Self::erase_range), but `touch` is called on every
    /// entry fully contained in `bounds` (after trimming the boundary
    /// entries down to their in-bounds half); an entry is erased only if
    /// `touch` returns `true`.
    pub fn erase_range_or_touch<F>(&mut self, bounds: Range<I>, mut touch: F)
    where
        V: Clone,
        F: FnMut(&mut V) -> bool,
    {
        if bounds.empty() {
            return;
        }
        crate::strict_assert!(bounds.valid());

        if let Some((k, _)) = self.lower_bound(bounds) {
            let k = *k;
            if k.begin < bounds.begin && k.end > bounds.begin {
                self.split(k, bounds.begin);
            }
        }

        let probe = Range::new(bounds.begin, bounds.begin);
        let keys: Vec<Range<I>> = self
            .map
            .range(probe..)
            .take_while(|(k, _)| k.begin < bounds.end)
            .map(|(k, _)| *k)
            .collect();

        for k in keys {
            let target = if k.end <= bounds.end {
                k
            } else {
                self.split(k, bounds.end);
                Range::new(k.begin, bounds.end)
            };
            let should_erase = match self.map.get_mut(&target) {
                Some(v) => touch(v),
                None => false,
            };
            if should_erase {
                self.map.remove(&target);
            }
        }
    }

    /// Erases every entry intersecting `bounds` (trimming partial overlaps)
    /// and inserts `value` over the whole of `bounds`.
    pub fn overwrite_range(&mut self, bounds: Range<I>, value: V)
    where
        V: Clone,
    {
        self.erase_range(bounds);
        self.map.insert(bounds, value);
    }

    /// `overwrite_range`, but when `precedence` is [`ValuePrecedence::PreferDest`]
    /// only the gaps in `bounds` are filled with `value`; existing coverage
    /// is left untouched. [`ValuePrecedence::PreferSource`] is plain
    /// `overwrite_range`.
    pub fn update_range_value(&mut self, bounds: Range<I>, value: V, precedence: ValuePrecedence)
    where
        V: Clone,
    {
        match precedence {
            ValuePrecedence::PreferSource => self.overwrite_range(bounds, value),
            ValuePrecedence::PreferDest => {
                self.infill_update_range(bounds, |_| {}, |m, gap| {
                    m.map.insert(gap, value.clone());
                });
            }
        }
    }

    /// Trims `self` to `bounds` (splitting boundary entries rather than
    /// dropping their tails) and then walks every sub-range of `bounds` in
    /// order, calling `update` on the value of each pre-trimmed existing
    /// entry and `infill` on each gap between entries. `infill` receives
    /// `&mut Self` to insert into, matching the source's "infill may insert
    /// using the position hint, but must not invalidate the entries the
    /// traversal has already visited" contract.
    pub fn infill_update_range<U, F>(&mut self, bounds: Range<I>, mut update: U, mut infill: F)
    where
        V: Clone,
        U: FnMut(&mut V),
        F: FnMut(&mut Self, Range<I>),
    {
        if bounds.empty() {
            return;
        }

        if let Some((k, _)) = self.lower_bound(bounds) {
            let k = *k;
            if k.begin < bounds.begin && k.end > bounds.begin {
                self.split(k, bounds.begin);
            }
        }
        let probe = Range::new(bounds.begin, bounds.begin);
        if let Some(k) = self
            .map
            .range(probe..)
            .take_while(|(k, _)| k.begin < bounds.end)
            .map(|(k, _)| *k)
            .last()
        {
            if k.begin < bounds.end && k.end > bounds.end {
                self.split(k, bounds.end);
            }
        }

        let mut cursor = bounds.begin;
        let keys: Vec<Range<I>> = self
            .map
            .range(Range::new(bounds.begin, bounds.begin)..)
            .take_while(|(k, _)| k.begin < bounds.end)
            .map(|(k, _)| *k)
            .collect();

        for k in keys {
            if k.begin > cursor {
                infill(self, Range::new(cursor, k.begin));
            }
            if let Some(v) = self.map.get_mut(&k) {
                update(v);
            }
            cursor = k.end;
        }
        if cursor < bounds.end {
            infill(self, Range::new(cursor, bounds.end));
        }
    }

    /// Merges maximal runs of adjacent, equal-valued entries into one.
    pub fn consolidate(&mut self)
    where
        V: Clone + Eq,
    {
        profiling::scope!("RangeMap::consolidate");
        let keys: Vec<Range<I>> = self.map.keys().copied().collect();
        if keys.is_empty() {
            return;
        }

        let mut runs: Vec<Vec<Range<I>>> = Vec::new();
        let mut run = vec![keys[0]];
        for &k in &keys[1..] {
            let prev = *run.last().unwrap();
            let same_value = self.map.get(&prev) == self.map.get(&k);
            if prev.is_prior_to(&k) && same_value {
                run.push(k);
            } else {
                runs.push(std::mem::replace(&mut run, vec![k]));
            }
        }
        runs.push(run);

        for run in runs {
            if run.len() < 2 {
                continue;
            }
            let merged = Range::new(run[0].begin, run[run.len() - 1].end);
            let value = self.map.remove(&run[0]).unwrap();
            for k in &run[1..] {
                self.map.remove(k);
            }
            self.map.insert(merged, value);
        }
    }
}

/// Which side's value wins when [`RangeMap::update_range_value`] is applied
/// over a sub-range already covered by an existing entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValuePrecedence {
    PreferSource,
    PreferDest,
}

/// Memoized cursor over a `RangeMap`'s lower bound at a moving index.
///
/// Holding one of these and calling [`seek`](Self::seek) with a
/// monotonically increasing index avoids repeating the full lower-bound
/// search as long as the index stays inside the entry (or gap) the cursor
/// already knows about; the search is repeated only when the index crosses
/// an entry boundary.
#[derive(Clone, Copy, Debug)]
pub struct CachedLowerBound<I> {
    index: I,
    current: Option<Range<I>>,
    valid: bool,
}

impl<I: Index> CachedLowerBound<I> {
    pub fn new<V>(map: &RangeMap<I, V>, index: I) -> Self {
        let current = map.lower_bound(Range::new(index, index)).map(|(k, _)| *k);
        let valid = current.map_or(false, |k| k.includes_index(index));
        CachedLowerBound { index, current, valid }
    }

    pub fn index(&self) -> I {
        self.index
    }

    /// True if `index()` falls inside the cached entry (as opposed to a gap).
    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn current(&self) -> Option<Range<I>> {
        self.current
    }

    /// Invalidates the cursor; mandatory after any structural change to the
    /// underlying map (insert, split, erase, consolidate).
    pub fn invalidate(&mut self) {
        self.current = None;
        self.valid = false;
    }

    /// Moves the cursor to `index`. O(1) when `index` stays within the
    /// cached entry or the cached gap before the next entry; otherwise
    /// falls back to a full `lower_bound` search.
    pub fn seek<V>(&mut self, map: &RangeMap<I, V>, index: I) {
        if let Some(cur) = self.current {
            let still_current = if self.valid {
                cur.includes_index(index)
            } else {
                index < cur.begin && index >= self.index
            };
            if still_current {
                self.index = index;
                return;
            }
        } else if index == self.index {
            return;
        }
        self.index = index;
        self.current = map.lower_bound(Range::new(index, index)).map(|(k, _)| *k);
        self.valid = self.current.map_or(false, |k| k.includes_index(index));
    }

    pub fn offset<V>(&mut self, map: &RangeMap<I, V>, delta: I) {
        self.seek(map, self.index + delta);
    }

    /// Distance from `index()` to the end of the entry it sits in (if
    /// valid), or to the start of the next entry (if in a gap), or `None`
    /// if there is no next entry at all.
    pub fn distance_to_edge(&self) -> Option<I> {
        match (self.current, self.valid) {
            (Some(k), true) => Some(k.end - self.index),
            (Some(k), false) => Some(k.begin - self.index),
            (None, _) => None,
        }
    }
}

/// Walks two range maps in lock-step, yielding maximal sub-ranges over
/// which neither map transitions, together with each map's value (if any)
/// covering that sub-range.
pub struct ParallelIterator<'a, I, VA, VB> {
    map_a: &'a RangeMap<I, VA>,
    map_b: &'a RangeMap<I, VB>,
    index: I,
    end: I,
    cursor_a: CachedLowerBound<I>,
    cursor_b: CachedLowerBound<I>,
}

impl<'a, I: Index, VA, VB> ParallelIterator<'a, I, VA, VB> {
    pub fn new(map_a: &'a RangeMap<I, VA>, map_b: &'a RangeMap<I, VB>, bounds: Range<I>) -> Self {
        ParallelIterator {
            map_a,
            map_b,
            index: bounds.begin,
            end: bounds.end,
            cursor_a: CachedLowerBound::new(map_a, bounds.begin),
            cursor_b: CachedLowerBound::new(map_b, bounds.begin),
        }
    }

    pub fn invalidate_a(&mut self) {
        self.cursor_a = CachedLowerBound::new(self.map_a, self.index);
    }

    pub fn invalidate_b(&mut self) {
        self.cursor_b = CachedLowerBound::new(self.map_b, self.index);
    }

    pub fn invalidate(&mut self) {
        self.invalidate_a();
        self.invalidate_b();
    }

    /// Advances only the A-side cursor to the edge of its current range,
    /// without yielding a step. Used when a caller has already consumed A's
    /// value for the current position and wants to skip ahead to A's next
    /// transition.
    pub fn trim_a(&mut self) {
        if let Some(d) = self.cursor_a.distance_to_edge() {
            self.cursor_a.offset(self.map_a, d);
        }
    }

    pub fn seek(&mut self, index: I) {
        self.index = index;
        self.cursor_a.seek(self.map_a, index);
        self.cursor_b.seek(self.map_b, index);
    }
}

impl<'a, I: Index, VA, VB> Iterator for ParallelIterator<'a, I, VA, VB> {
    type Item = (Range<I>, Option<&'a VA>, Option<&'a VB>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }
        let remaining = self.end - self.index;
        let da = self.cursor_a.distance_to_edge();
        let db = self.cursor_b.distance_to_edge();
        let delta = match (da, db) {
            (Some(a), Some(b)) => {
                if a < b {
                    a
                } else {
                    b
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => remaining,
        };
        let delta = if delta > remaining { remaining } else { delta };

        let range = Range::new(self.index, self.index + delta);
        let va = if self.cursor_a.valid() {
            self.cursor_a.current().and_then(|k| self.map_a.get(&k))
        } else {
            None
        };
        let vb = if self.cursor_b.valid() {
            self.cursor_b.current().and_then(|k| self.map_b.get(&k))
        } else {
            None
        };

        self.index = self.index + delta;
        self.cursor_a.seek(self.map_a, self.index);
        self.cursor_b.seek(self.map_b, self.index);

        Some((range, va, vb))
    }
}

/// Callback pair for [`splice`]: decides what happens to `dst` on each
/// sub-range where `src` has a value.
pub trait Splicer<VD, VS> {
    /// `dst` already has a value on this sub-range; update it in place.
    fn update(&mut self, dst: &mut VD, src: &VS);
    /// `dst` has no value on this sub-range (a gap); return `Some(v)` to
    /// fill it with `v`, or `None` to leave the gap alone.
    fn insert(&mut self, src: &VS) -> Option<VD>;
}

/// Merges `src`'s coverage of `bounds` into `dst`, calling back into
/// `updater` on every sub-range where `src` has a value. Never inserts an
/// entry `updater` did not request, and never erases one.
pub fn splice<I, VD, VS, U>(
    dst: &mut RangeMap<I, VD>,
    src: &RangeMap<I, VS>,
    bounds: Range<I>,
    updater: &mut U,
) where
    I: Index,
    VD: Clone,
    U: Splicer<VD, VS>,
{
    let src_entries: Vec<Range<I>> = src
        .map
        .range(Range::new(bounds.begin, bounds.begin)..)
        .take_while(|(k, _)| k.begin < bounds.end)
        .map(|(k, _)| *k)
        .collect();

    for src_key in src_entries {
        let clipped = src_key.intersection(&bounds);
        if clipped.empty() {
            continue;
        }
        let src_value = match src.map.get(&src_key) {
            Some(v) => v,
            None => continue,
        };

        if let Some((k, _)) = dst.lower_bound(clipped) {
            let k = *k;
            if k.begin < clipped.begin && k.end > clipped.begin {
                dst.split(k, clipped.begin);
            }
        }
        if let Some(k) = dst
            .map
            .range(Range::new(clipped.begin, clipped.begin)..)
            .take_while(|(k, _)| k.begin < clipped.end)
            .map(|(k, _)| *k)
            .last()
        {
            if k.begin < clipped.end && k.end > clipped.end {
                dst.split(k, clipped.end);
            }
        }

        let mut cursor = clipped.begin;
        let dst_keys: Vec<Range<I>> = dst
            .map
            .range(Range::new(clipped.begin, clipped.begin)..)
            .take_while(|(k, _)| k.begin < clipped.end)
            .map(|(k, _)| *k)
            .collect();

        for dk in dst_keys {
            if dk.begin > cursor {
                let gap = Range::new(cursor, dk.begin);
                if let Some(v) = updater.insert(src_value) {
                    dst.map.insert(gap, v);
                }
            }
            if let Some(dv) = dst.map.get_mut(&dk) {
                updater.update(dv, src_value);
            }
            cursor = dk.end;
        }
        if cursor < clipped.end {
            let gap = Range::new(cursor, clipped.end);
            if let Some(v) = updater.insert(src_value) {
                dst.map.insert(gap, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: &[(u32, u32, char)]) -> RangeMap<u32, char> {
        let mut m = RangeMap::new();
        for &(begin, end, v) in entries {
            m.insert(Range::new(begin, end), v);
        }
        m
    }

    fn as_vec(m: &RangeMap<u32, char>) -> Vec<(u32, u32, char)> {
        m.iter().map(|(k, v)| (k.begin, k.end, *v)).collect()
    }

    #[test]
    fn insert_rejects_intersecting() {
        let mut m = build(&[(0, 10, 'A')]);
        let (key, ok) = m.insert(Range::new(5, 15), 'B');
        assert!(!ok);
        assert_eq!(key, Range::new(0, 10));
        assert_eq!(as_vec(&m), vec![(0, 10, 'A')]);
    }

    #[test]
    fn find_and_lower_bound() {
        let m = build(&[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C')]);
        assert_eq!(m.find(15).map(|(_, v)| *v), Some('B'));
        assert_eq!(m.find(30), None);
        let (k, v) = m.lower_bound(Range::new(12, 18)).unwrap();
        assert_eq!(*k, Range::new(10, 20));
        assert_eq!(*v, 'B');
    }

    #[test]
    fn split_shares_value() {
        let mut m = build(&[(0, 10, 'A')]);
        assert!(m.split(Range::new(0, 10), 4));
        assert_eq!(as_vec(&m), vec![(0, 4, 'A'), (4, 10, 'A')]);
    }

    #[test]
    fn scenario_overwrite_partial_overlap() {
        let mut m = build(&[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C')]);
        m.overwrite_range(Range::new(5, 25), 'X');
        assert_eq!(as_vec(&m), vec![(0, 5, 'A'), (5, 25, 'X'), (25, 30, 'C')]);
    }

    #[test]
    fn erase_removes_single_entry_by_position() {
        let mut m = build(&[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C')]);
        let (key, _) = m.find(15).unwrap();
        let key = *key;
        assert_eq!(m.erase(&key), Some('B'));
        assert_eq!(as_vec(&m), vec![(0, 10, 'A'), (20, 30, 'C')]);
        assert_eq!(m.erase(&key), None);
    }

    #[test]
    fn erase_iter_removes_a_run_of_positions() {
        let mut m = build(&[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C'), (30, 40, 'D')]);
        let middle: Vec<Range<u32>> = m.iter().skip(1).take(2).map(|(k, _)| *k).collect();
        m.erase_iter(middle);
        assert_eq!(as_vec(&m), vec![(0, 10, 'A'), (30, 40, 'D')]);
    }

    #[test]
    fn scenario_erase_trimming() {
        let mut m = build(&[(0, 10, 'A'), (10, 20, 'B'), (20, 30, 'C')]);
        m.erase_range(Range::new(3, 22));
        assert_eq!(as_vec(&m), vec![(0, 3, 'A'), (22, 30, 'C')]);
    }

    #[test]
    fn scenario_consolidate_merges() {
        let mut m = build(&[(0, 5, 'A'), (5, 10, 'A'), (10, 15, 'B'), (15, 20, 'B'), (20, 25, 'A')]);
        m.consolidate();
        assert_eq!(as_vec(&m), vec![(0, 10, 'A'), (10, 20, 'B'), (20, 25, 'A')]);
    }

    #[test]
    fn consolidate_is_idempotent() {
        let mut m = build(&[(0, 5, 'A'), (5, 10, 'A'), (10, 20, 'B')]);
        m.consolidate();
        let once = as_vec(&m);
        m.consolidate();
        assert_eq!(as_vec(&m), once);
    }

    #[test]
    fn touch_false_keeps_entry() {
        let mut m = build(&[(0, 10, 'A'), (10, 20, 'B')]);
        m.erase_range_or_touch(Range::new(0, 20), |v| *v != 'B');
        assert_eq!(as_vec(&m), vec![(10, 20, 'B')]);
    }

    #[test]
    fn parallel_iterator_yields_maximal_subranges() {
        let a = build(&[(0, 10, 'A'), (10, 20, 'B')]);
        let mut b_map: RangeMap<u32, i32> = RangeMap::new();
        b_map.insert(Range::new(5, 15), 1);
        let steps: Vec<_> = ParallelIterator::new(&a, &b_map, Range::new(0, 20)).collect();
        let ranges: Vec<Range<u32>> = steps.iter().map(|(r, _, _)| *r).collect();
        assert_eq!(
            ranges,
            vec![
                Range::new(0, 5),
                Range::new(5, 10),
                Range::new(10, 15),
                Range::new(15, 20),
            ]
        );
    }

    struct Overwrite;
    impl Splicer<char, char> for Overwrite {
        fn update(&mut self, dst: &mut char, src: &char) {
            *dst = *src;
        }
        fn insert(&mut self, src: &char) -> Option<char> {
            Some(*src)
        }
    }

    #[test]
    fn splice_merges_src_into_dst() {
        let mut dst = build(&[(0, 10, 'A')]);
        let src = build(&[(5, 15, 'Z')]);
        splice(&mut dst, &src, Range::new(0, 15), &mut Overwrite);
        assert_eq!(as_vec(&dst), vec![(0, 5, 'A'), (5, 15, 'Z')]);
    }

    #[test]
    fn update_range_value_prefer_dest_only_fills_gaps() {
        let mut dst = build(&[(0, 5, 'A')]);
        dst.update_range_value(Range::new(0, 10), 'X', ValuePrecedence::PreferDest);
        assert_eq!(as_vec(&dst), vec![(0, 5, 'A'), (5, 10, 'X')]);
    }
}
