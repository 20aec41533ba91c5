//! Specializations for `bool`, whose two-element domain needs no table.

use crate::collection::{Collection, CollectionMut};
use crate::primitive::mix;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::marker::PhantomData;

// Which of the two values a `BoolSet` holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
enum BoolState {
    #[default]
    Empty,
    FalseOnly,
    TrueOnly,
    Both,
}

impl BoolState {
    #[inline]
    fn has(self, value: bool) -> bool {
        matches!(
            (self, value),
            (BoolState::Both, _) | (BoolState::FalseOnly, false) | (BoolState::TrueOnly, true)
        )
    }

    #[inline]
    fn with(self, value: bool) -> BoolState {
        match (self, value) {
            (BoolState::Empty, false) => BoolState::FalseOnly,
            (BoolState::Empty, true) => BoolState::TrueOnly,
            (BoolState::FalseOnly, true) | (BoolState::TrueOnly, false) => BoolState::Both,
            (state, _) => state,
        }
    }

    #[inline]
    fn without(self, value: bool) -> BoolState {
        match (self, value) {
            (BoolState::FalseOnly, false) | (BoolState::TrueOnly, true) => BoolState::Empty,
            (BoolState::Both, false) => BoolState::TrueOnly,
            (BoolState::Both, true) => BoolState::FalseOnly,
            (state, _) => state,
        }
    }
}

#[inline]
fn hash_bool(value: bool) -> u64 {
    mix(value as u64)
}

/// A set of `bool` values.
///
/// The whole value domain has two elements, so the set is a single four-state
/// scalar and every operation is a constant-time state transition. Iteration
/// yields `false` before `true`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolSet {
    state: BoolState,
}

impl BoolSet {
    /// Creates an empty set.
    pub fn new() -> BoolSet {
        BoolSet::default()
    }

    /// Returns the number of values in the set, at most two.
    #[inline]
    pub fn len(&self) -> usize {
        match self.state {
            BoolState::Empty => 0,
            BoolState::FalseOnly | BoolState::TrueOnly => 1,
            BoolState::Both => 2,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state == BoolState::Empty
    }

    #[inline]
    pub fn contains(&self, value: bool) -> bool {
        self.state.has(value)
    }

    /// Adds `value`, returning `true` if it was not already present.
    pub fn add(&mut self, value: bool) -> bool {
        let before = self.state;
        self.state = before.with(value);
        self.state != before
    }

    /// Removes `value`, returning `true` if it was present.
    pub fn remove(&mut self, value: bool) -> bool {
        let before = self.state;
        self.state = before.without(value);
        self.state != before
    }

    pub fn clear(&mut self) {
        self.state = BoolState::Empty;
    }

    /// Returns an iterator over the values, `false` first.
    pub fn iter(&self) -> BoolSetIter<'_> {
        BoolSetIter {
            state: self.state,
            _set: PhantomData,
        }
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().copied().collect()
    }

    /// Returns a hash of the set's contents, consistent with the other
    /// primitive sets.
    pub fn hash_code(&self) -> u64 {
        self.iter()
            .fold(0u64, |acc, &value| acc.wrapping_add(hash_bool(value)))
    }
}

impl fmt::Debug for BoolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Hash for BoolSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl FromIterator<bool> for BoolSet {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut set = BoolSet::new();
        set.extend(iter);
        set
    }
}

impl<const N: usize> From<[bool; N]> for BoolSet {
    fn from(values: [bool; N]) -> Self {
        values.into_iter().collect()
    }
}

impl Extend<bool> for BoolSet {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl Collection for BoolSet {
    type Item = bool;
    type Iter<'a> = BoolSetIter<'a>;

    fn len(&self) -> usize {
        self.len()
    }

    fn contains(&self, item: &bool) -> bool {
        self.contains(*item)
    }

    fn iter(&self) -> BoolSetIter<'_> {
        self.iter()
    }
}

impl CollectionMut for BoolSet {
    fn add(&mut self, item: bool) -> bool {
        self.add(item)
    }

    fn remove(&mut self, item: &bool) -> bool {
        self.remove(*item)
    }

    fn clear(&mut self) {
        self.clear()
    }
}

/// An iterator over the values of a [`BoolSet`], `false` first.
#[derive(Clone, Debug)]
pub struct BoolSetIter<'a> {
    // The values not yet yielded.
    state: BoolState,
    _set: PhantomData<&'a BoolSet>,
}

impl<'a> Iterator for BoolSetIter<'a> {
    type Item = &'a bool;

    fn next(&mut self) -> Option<&'a bool> {
        let value = if self.state.has(false) {
            false
        } else if self.state.has(true) {
            true
        } else {
            return None;
        };

        self.state = self.state.without(value);
        Some(if value { &true } else { &false })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = BoolSet { state: self.state }.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for BoolSetIter<'_> {}

impl FusedIterator for BoolSetIter<'_> {}

/// A multiset of `bool` values, stored as two occurrence counters.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolBag {
    falses: usize,
    trues: usize,
}

impl BoolBag {
    /// Creates an empty bag.
    pub fn new() -> BoolBag {
        BoolBag::default()
    }

    /// Returns the total number of occurrences in the bag.
    #[inline]
    pub fn len(&self) -> usize {
        self.falses + self.trues
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of distinct values in the bag, at most two.
    #[inline]
    pub fn distinct_len(&self) -> usize {
        (self.falses != 0) as usize + (self.trues != 0) as usize
    }

    #[inline]
    pub fn contains(&self, value: bool) -> bool {
        self.occurrences_of(value) != 0
    }

    #[inline]
    pub fn occurrences_of(&self, value: bool) -> usize {
        if value {
            self.trues
        } else {
            self.falses
        }
    }

    #[inline]
    fn counter(&mut self, value: bool) -> &mut usize {
        if value {
            &mut self.trues
        } else {
            &mut self.falses
        }
    }

    /// Adds one occurrence of `value`, returning `true` if it was absent before.
    pub fn add(&mut self, value: bool) -> bool {
        self.add_occurrences(value, 1) == 1
    }

    /// Adds `count` occurrences of `value`, returning the new occurrence count.
    ///
    /// # Panics
    ///
    /// Panics if the total number of occurrences overflows `usize`.
    pub fn add_occurrences(&mut self, value: bool, count: usize) -> usize {
        assert!(
            self.len().checked_add(count).is_some(),
            "occurrence count overflow"
        );

        let counter = self.counter(value);
        *counter += count;
        *counter
    }

    /// Removes one occurrence of `value`, returning `true` if one was present.
    pub fn remove(&mut self, value: bool) -> bool {
        self.remove_occurrences(value, 1)
    }

    /// Removes up to `count` occurrences of `value`, returning `true` if any
    /// were removed.
    pub fn remove_occurrences(&mut self, value: bool, count: usize) -> bool {
        let counter = self.counter(value);
        if *counter == 0 || count == 0 {
            return false;
        }

        *counter = counter.saturating_sub(count);
        true
    }

    /// Sets the occurrence count of `value`, returning the previous count.
    ///
    /// # Panics
    ///
    /// Panics if the total number of occurrences overflows `usize`.
    pub fn set_occurrences(&mut self, value: bool, count: usize) -> usize {
        assert!(
            self.occurrences_of(!value).checked_add(count).is_some(),
            "occurrence count overflow"
        );

        std::mem::replace(self.counter(value), count)
    }

    pub fn clear(&mut self) {
        *self = BoolBag::default();
    }

    /// Returns an iterator that yields each occurrence, all `false`
    /// occurrences first.
    pub fn iter(&self) -> BoolBagIter<'_> {
        BoolBagIter {
            falses: self.falses,
            trues: self.trues,
            _bag: PhantomData,
        }
    }

    /// Returns an iterator over each distinct value and its occurrence count.
    pub fn distinct(&self) -> impl Iterator<Item = (bool, usize)> {
        [(false, self.falses), (true, self.trues)]
            .into_iter()
            .filter(|&(_, count)| count != 0)
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().copied().collect()
    }

    /// Returns a hash of the bag's contents, consistent with the other
    /// primitive bags.
    pub fn hash_code(&self) -> u64 {
        self.distinct().fold(0u64, |acc, (value, count)| {
            acc.wrapping_add(hash_bool(value) ^ count as u64)
        })
    }
}

impl fmt::Debug for BoolBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.distinct()).finish()
    }
}

impl Hash for BoolBag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl FromIterator<bool> for BoolBag {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bag = BoolBag::new();
        bag.extend(iter);
        bag
    }
}

impl<const N: usize> From<[bool; N]> for BoolBag {
    fn from(values: [bool; N]) -> Self {
        values.into_iter().collect()
    }
}

impl Extend<bool> for BoolBag {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl Collection for BoolBag {
    type Item = bool;
    type Iter<'a> = BoolBagIter<'a>;

    fn len(&self) -> usize {
        self.len()
    }

    fn contains(&self, item: &bool) -> bool {
        self.contains(*item)
    }

    fn iter(&self) -> BoolBagIter<'_> {
        self.iter()
    }
}

impl CollectionMut for BoolBag {
    fn add(&mut self, item: bool) -> bool {
        self.add(item)
    }

    fn remove(&mut self, item: &bool) -> bool {
        self.remove(*item)
    }

    fn clear(&mut self) {
        self.clear()
    }
}

/// An iterator over every occurrence in a [`BoolBag`].
#[derive(Clone, Debug)]
pub struct BoolBagIter<'a> {
    falses: usize,
    trues: usize,
    _bag: PhantomData<&'a BoolBag>,
}

impl<'a> Iterator for BoolBagIter<'a> {
    type Item = &'a bool;

    fn next(&mut self) -> Option<&'a bool> {
        if self.falses > 0 {
            self.falses -= 1;
            Some(&false)
        } else if self.trues > 0 {
            self.trues -= 1;
            Some(&true)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.falses + self.trues;
        (len, Some(len))
    }
}

impl ExactSizeIterator for BoolBagIter<'_> {}

impl FusedIterator for BoolBagIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions() {
        let mut set = BoolSet::new();
        assert!(set.add(true));
        assert!(!set.add(true));
        assert_eq!(set.len(), 1);
        assert!(set.add(false));
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec![false, true]);

        assert!(set.remove(false));
        assert!(!set.remove(false));
        assert_eq!(set.to_vec(), vec![true]);
        assert!(set.remove(true));
        assert!(set.is_empty());
    }

    #[test]
    fn bag_counts() {
        let mut bag: BoolBag = [true, false, true].into();
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.distinct_len(), 2);
        assert_eq!(bag.to_vec(), vec![false, true, true]);

        assert!(bag.remove_occurrences(true, 5));
        assert!(!bag.contains(true));
        assert_eq!(bag.set_occurrences(false, 4), 1);
        assert_eq!(bag.len(), 4);
    }

    #[test]
    fn set_occurrences_up_to_limit() {
        let mut bag = BoolBag::new();
        bag.add(false);
        assert_eq!(bag.set_occurrences(true, usize::MAX - 1), 0);
        assert_eq!(bag.len(), usize::MAX);
    }

    #[test]
    #[should_panic(expected = "occurrence count overflow")]
    fn set_occurrences_overflow() {
        let mut bag = BoolBag::new();
        bag.add(false);
        bag.set_occurrences(true, usize::MAX);
    }

    #[test]
    fn order_independent_equality() {
        let a: BoolSet = [true, false].into();
        let b: BoolSet = [false, true, false].into();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
    }
}
