//! Identifier sets for message ranges.
//!
//! An [`IdSet`] stores a union of closed ranges over one of the two
//! identifier spaces ([`SeqNum`] or [`Uid`]). Ranges are kept sorted,
//! disjoint, and minimal (adjacent ranges merge), so membership tests and
//! the emitted wire form are both canonical.

use std::marker::PhantomData;

use crate::{Error, Result};

use super::{SeqNum, Uid};

/// An identifier usable in an [`IdSet`]: a non-zero 32-bit value with a
/// `*` sentinel for "latest".
pub trait MessageId:
    Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display
{
    /// The `*` sentinel (highest identifier in the mailbox).
    const LATEST: Self;

    /// Constructs from a raw value; `None` for 0.
    fn from_raw(n: u32) -> Option<Self>;

    /// Returns the raw value.
    fn raw(self) -> u32;
}

impl MessageId for SeqNum {
    const LATEST: Self = Self::LATEST;

    fn from_raw(n: u32) -> Option<Self> {
        Self::new(n)
    }

    fn raw(self) -> u32 {
        self.get()
    }
}

impl MessageId for Uid {
    const LATEST: Self = Self::LATEST;

    fn from_raw(n: u32) -> Option<Self> {
        Self::new(n)
    }

    fn raw(self) -> u32 {
        self.get()
    }
}

/// A set of message identifiers stored as sorted, disjoint, minimal
/// closed ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSet<T> {
    /// Invariant: sorted by start, pairwise disjoint, no two ranges
    /// adjacent (they would have been merged), each `lo <= hi`, `lo >= 1`.
    ranges: Vec<(u32, u32)>,
    _marker: PhantomData<T>,
}

impl<T> Default for IdSet<T> {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            _marker: PhantomData,
        }
    }
}

/// Sequence-number set.
pub type SeqSet = IdSet<SeqNum>;

/// UID set.
pub type UidSet = IdSet<Uid>;

impl<T: MessageId> IdSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ranges: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Creates a set containing a single identifier.
    #[must_use]
    pub fn single(id: T) -> Self {
        let mut set = Self::new();
        set.insert(id);
        set
    }

    /// Creates a set from a closed range. Bounds in either order.
    #[must_use]
    pub fn range(lo: T, hi: T) -> Self {
        let mut set = Self::new();
        set.insert_range(lo, hi);
        set
    }

    /// Creates a set covering `lo` through the latest identifier (`lo:*`).
    #[must_use]
    pub fn range_from(lo: T) -> Self {
        Self::range(lo, T::LATEST)
    }

    /// Inserts a single identifier.
    pub fn insert(&mut self, id: T) {
        self.insert_raw(id.raw(), id.raw());
    }

    /// Inserts a closed range. Bounds in either order.
    pub fn insert_range(&mut self, lo: T, hi: T) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.insert_raw(lo.raw(), hi.raw());
    }

    fn insert_raw(&mut self, mut lo: u32, mut hi: u32) {
        // Find every existing range that overlaps or is adjacent, fold it
        // into the new one, and splice the result back in place.
        let start = self.ranges.partition_point(|&(_, b)| b.saturating_add(1) < lo);
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].0 <= hi.saturating_add(1) {
            lo = lo.min(self.ranges[end].0);
            hi = hi.max(self.ranges[end].1);
            end += 1;
        }
        self.ranges.splice(start..end, std::iter::once((lo, hi)));
    }

    /// Returns true if the set contains the identifier.
    #[must_use]
    pub fn contains(&self, id: T) -> bool {
        let n = id.raw();
        let idx = self.ranges.partition_point(|&(_, b)| b < n);
        self.ranges.get(idx).is_some_and(|&(a, _)| a <= n)
    }

    /// Returns the number of identifiers in the set.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(a, b)| u64::from(b) - u64::from(a) + 1)
            .sum()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the ranges in ascending order.
    pub fn ranges(&self) -> impl Iterator<Item = (T, T)> + '_ {
        self.ranges.iter().filter_map(|&(a, b)| {
            let lo = T::from_raw(a)?;
            let hi = T::from_raw(b)?;
            Some((lo, hi))
        })
    }

    /// Returns every identifier in ascending order.
    ///
    /// Walks range contents one by one; avoid on sets covering `*`.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.ranges
            .iter()
            .flat_map(|&(a, b)| (a..=b).filter_map(T::from_raw))
    }

    /// Splits the set into subsets of at most `n` identifiers each,
    /// preserving membership and order.
    ///
    /// `n == 0` yields the whole set as a single chunk. An empty set
    /// yields no chunks.
    #[must_use]
    pub fn chunked(&self, n: usize) -> Vec<Self> {
        if self.is_empty() {
            return Vec::new();
        }
        if n == 0 {
            return vec![self.clone()];
        }

        let n = n as u64;
        let mut chunks = Vec::new();
        let mut current = Self::new();
        let mut room = n;

        for &(a, b) in &self.ranges {
            let mut lo = u64::from(a);
            let hi = u64::from(b);
            while lo <= hi {
                let take = room.min(hi - lo + 1);
                #[allow(clippy::cast_possible_truncation)]
                current
                    .ranges
                    .push((lo as u32, (lo + take - 1) as u32));
                lo += take;
                room -= take;
                if room == 0 {
                    chunks.push(std::mem::take(&mut current));
                    room = n;
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Parses the IMAP set syntax, e.g. `"1,3:5,7"`, `"12:*"`, `"*"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on empty input, zero
    /// identifiers, or malformed ranges.
    pub fn parse(s: &str) -> Result<Self> {
        let mut set = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::InvalidArgument(format!("empty element in set: {s:?}")));
            }

            if let Some((lo, hi)) = part.split_once(':') {
                let lo = Self::parse_one(lo)?;
                let hi = Self::parse_one(hi)?;
                set.insert_range(lo, hi);
            } else {
                set.insert(Self::parse_one(part)?);
            }
        }

        Ok(set)
    }

    fn parse_one(s: &str) -> Result<T> {
        if s == "*" {
            return Ok(T::LATEST);
        }
        s.parse::<u32>()
            .ok()
            .and_then(T::from_raw)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid identifier: {s:?}")))
    }
}

impl<T: MessageId> std::fmt::Display for IdSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, &(a, b)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let star = |n: u32| n == u32::MAX;
            if a == b {
                if star(a) {
                    f.write_str("*")?;
                } else {
                    write!(f, "{a}")?;
                }
            } else if star(b) {
                write!(f, "{a}:*")?;
            } else {
                write!(f, "{a}:{b}")?;
            }
        }
        Ok(())
    }
}

impl<T: MessageId> From<T> for IdSet<T> {
    fn from(id: T) -> Self {
        Self::single(id)
    }
}

impl<T: MessageId> FromIterator<T> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[test]
    fn empty_set() {
        let set = SeqSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.to_string(), "");
        assert!(set.chunked(10).is_empty());
    }

    #[test]
    fn single_and_contains() {
        let set = SeqSet::single(seq(5));
        assert!(set.contains(seq(5)));
        assert!(!set.contains(seq(4)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn adjacent_ranges_merge() {
        let mut set = SeqSet::new();
        set.insert_range(seq(1), seq(3));
        set.insert_range(seq(4), seq(6));
        assert_eq!(set.to_string(), "1:6");
        assert_eq!(set.ranges().count(), 1);
    }

    #[test]
    fn overlapping_ranges_merge() {
        let mut set = UidSet::new();
        set.insert_range(uid(10), uid(20));
        set.insert_range(uid(15), uid(30));
        assert_eq!(set.to_string(), "10:30");
    }

    #[test]
    fn disjoint_ranges_stay_sorted() {
        let mut set = SeqSet::new();
        set.insert(seq(7));
        set.insert_range(seq(3), seq(5));
        set.insert(seq(1));
        assert_eq!(set.to_string(), "1,3:5,7");
    }

    #[test]
    fn insert_bridges_gap() {
        let mut set = SeqSet::new();
        set.insert(seq(1));
        set.insert(seq(3));
        assert_eq!(set.to_string(), "1,3");
        set.insert(seq(2));
        assert_eq!(set.to_string(), "1:3");
    }

    #[test]
    fn reversed_bounds_normalize() {
        let set = SeqSet::range(seq(9), seq(4));
        assert_eq!(set.to_string(), "4:9");
    }

    #[test]
    fn range_from_emits_star() {
        let set = UidSet::range_from(uid(12));
        assert_eq!(set.to_string(), "12:*");
        assert!(set.contains(Uid::LATEST));
    }

    #[test]
    fn latest_alone_is_star() {
        let set = UidSet::single(Uid::LATEST);
        assert_eq!(set.to_string(), "*");
    }

    #[test]
    fn parse_round_trip() {
        let set = SeqSet::parse("1,3:5,7").unwrap();
        assert_eq!(set.to_string(), "1,3:5,7");
        assert!(set.contains(seq(4)));
        assert!(!set.contains(seq(6)));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn parse_star_forms() {
        assert_eq!(UidSet::parse("*").unwrap().to_string(), "*");
        assert_eq!(UidSet::parse("12:*").unwrap().to_string(), "12:*");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SeqSet::parse("").is_err());
        assert!(SeqSet::parse("0").is_err());
        assert!(SeqSet::parse("1,,3").is_err());
        assert!(SeqSet::parse("a:b").is_err());
    }

    #[test]
    fn chunked_splits_and_preserves_order() {
        let set = SeqSet::parse("1:7").unwrap();
        let chunks = set.chunked(3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].to_string(), "1:3");
        assert_eq!(chunks[1].to_string(), "4:6");
        assert_eq!(chunks[2].to_string(), "7");
    }

    #[test]
    fn chunked_zero_is_one_chunk() {
        let set = SeqSet::parse("1:7").unwrap();
        let chunks = set.chunked(0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], set);
    }

    #[test]
    fn chunked_spans_range_boundaries() {
        let set = SeqSet::parse("1:2,10:12").unwrap();
        let chunks = set.chunked(4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].to_string(), "1:2,10:11");
        assert_eq!(chunks[1].to_string(), "12");
    }

    #[test]
    fn iter_ascending() {
        let set = SeqSet::parse("3,1,2,9").unwrap();
        let ids: Vec<u32> = set.iter().map(SeqNum::get).collect();
        assert_eq!(ids, vec![1, 2, 3, 9]);
    }

    proptest! {
        #[test]
        fn insert_implies_contains(
            existing in proptest::collection::vec(1u32..10_000, 0..50),
            lo in 1u32..10_000,
            span in 0u32..100,
            probe in 1u32..11_000,
        ) {
            let mut set: SeqSet = existing.iter().filter_map(|&n| SeqNum::new(n)).collect();
            let contained_before = set.contains(seq(probe));
            let hi = lo.saturating_add(span);
            set.insert_range(seq(lo), seq(hi));
            let in_range = probe >= lo && probe <= hi;
            prop_assert_eq!(set.contains(seq(probe)), contained_before || in_range);
        }

        #[test]
        fn chunks_partition_the_set(
            values in proptest::collection::btree_set(1u32..5_000, 0..200),
            n in 0usize..17,
        ) {
            let set: SeqSet = values.iter().filter_map(|&v| SeqNum::new(v)).collect();
            let chunks = set.chunked(n);

            // Sizes bounded by n (except the n == 0 single chunk).
            if n > 0 {
                for chunk in &chunks {
                    prop_assert!(chunk.len() <= n as u64);
                }
            }

            // Union equals the set, in order, with no duplicates.
            let rebuilt: Vec<u32> = chunks
                .iter()
                .flat_map(|c| c.iter().map(SeqNum::get))
                .collect();
            let expected: Vec<u32> = values.iter().copied().collect();
            prop_assert_eq!(rebuilt, expected);
        }

        #[test]
        fn display_parse_round_trip(
            values in proptest::collection::btree_set(1u32..5_000, 1..100),
        ) {
            let set: SeqSet = values.iter().filter_map(|&v| SeqNum::new(v)).collect();
            let parsed = SeqSet::parse(&set.to_string()).unwrap();
            prop_assert_eq!(parsed, set);
        }
    }
}
