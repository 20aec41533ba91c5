use crate::collection::{Collection, CollectionMut};
use crate::primitive::Primitive;

use std::borrow::Borrow;
use std::collections::hash_map::{self, RandomState};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;

/// A multiset of arbitrary hashable elements.
///
/// This is the general-element counterpart of [`PrimitiveBag`], backed by a
/// standard `HashMap` from element to occurrence count. A `PrimitiveBag<T>`
/// compares equal to a `HashBag<T>` holding the same occurrences.
///
/// [`PrimitiveBag`]: crate::PrimitiveBag
#[derive(Clone)]
pub struct HashBag<T, S = RandomState> {
    counts: HashMap<T, usize, S>,
    total: usize,
}

impl<T> HashBag<T> {
    /// Creates an empty bag.
    pub fn new() -> HashBag<T> {
        HashBag::with_hasher(RandomState::new())
    }

    /// Creates an empty bag with room for at least `capacity` distinct
    /// elements.
    pub fn with_capacity(capacity: usize) -> HashBag<T> {
        HashBag::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, S> HashBag<T, S> {
    /// Creates an empty bag which will use the given hash builder to hash
    /// elements.
    pub fn with_hasher(hasher: S) -> HashBag<T, S> {
        HashBag {
            counts: HashMap::with_hasher(hasher),
            total: 0,
        }
    }

    /// Creates an empty bag with room for at least `capacity` distinct
    /// elements, using `hasher` to hash them.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> HashBag<T, S> {
        HashBag {
            counts: HashMap::with_capacity_and_hasher(capacity, hasher),
            total: 0,
        }
    }

    /// Returns the total number of occurrences in the bag.
    #[inline]
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns `true` if the bag contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns the number of distinct elements in the bag.
    #[inline]
    pub fn distinct_len(&self) -> usize {
        self.counts.len()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }

    /// Returns an iterator that yields each element once per occurrence.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            entries: self.counts.iter(),
            current: None,
            remaining: self.total,
        }
    }

    /// Returns an iterator over each distinct element and its occurrence count.
    pub fn distinct(&self) -> impl ExactSizeIterator<Item = (&T, usize)> + '_ {
        self.counts.iter().map(|(element, &count)| (element, count))
    }
}

impl<T, S> HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Returns `true` if the bag contains at least one occurrence of `element`.
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.contains_key(element)
    }

    /// Returns the number of occurrences of `element`.
    pub fn occurrences_of<Q>(&self, element: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.get(element).copied().unwrap_or(0)
    }

    /// Adds one occurrence of `element`, returning `true` if it was absent
    /// before.
    pub fn add(&mut self, element: T) -> bool {
        self.add_occurrences(element, 1) == 1
    }

    /// Adds `count` occurrences of `element`, returning the new occurrence
    /// count.
    ///
    /// # Panics
    ///
    /// Panics if the occurrence count overflows `usize`.
    pub fn add_occurrences(&mut self, element: T, count: usize) -> usize {
        if count == 0 {
            return self.occurrences_of(&element);
        }

        self.total = self
            .total
            .checked_add(count)
            .expect("occurrence count overflow");

        let slot = self.counts.entry(element).or_insert(0);
        *slot += count;
        *slot
    }

    /// Removes one occurrence of `element`, returning `true` if one was present.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(count) = self.counts.get_mut(element) else {
            return false;
        };

        if *count > 1 {
            *count -= 1;
        } else {
            self.counts.remove(element);
        }

        self.total -= 1;
        true
    }

    /// Merges every occurrence from `other` into this bag.
    pub fn merge(&mut self, other: HashBag<T, S>) {
        for (element, count) in other.counts {
            self.add_occurrences(element, count);
        }
    }
}

impl<T: Primitive, S> HashBag<T, S> {
    /// Returns a hash of the bag's contents that does not depend on insertion
    /// order. Matches [`PrimitiveBag::hash_code`] for the same occurrences.
    ///
    /// [`PrimitiveBag::hash_code`]: crate::PrimitiveBag::hash_code
    pub fn hash_code(&self) -> u64 {
        self.distinct().fold(0u64, |acc, (&element, count)| {
            acc.wrapping_add(Primitive::hash(element) ^ count as u64)
        })
    }
}

impl<T, S: Default> Default for HashBag<T, S> {
    fn default() -> Self {
        HashBag::with_hasher(S::default())
    }
}

impl<T, S> fmt::Debug for HashBag<T, S>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.distinct()).finish()
    }
}

impl<T, S> PartialEq for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total && self.counts == other.counts
    }
}

impl<T, S> Eq for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> FromIterator<T> for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut bag = HashBag::default();
        bag.extend(iter);
        bag
    }
}

impl<T, S> Extend<T> for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.add(element);
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashBag<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> Collection for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = T;
    type Iter<'a> = Iter<'a, T> where Self: 'a;

    fn len(&self) -> usize {
        self.total
    }

    fn contains(&self, item: &T) -> bool {
        self.counts.contains_key(item)
    }

    fn iter(&self) -> Iter<'_, T> {
        HashBag::iter(self)
    }
}

impl<T, S> CollectionMut for HashBag<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn add(&mut self, item: T) -> bool {
        HashBag::add(self, item)
    }

    fn remove(&mut self, item: &T) -> bool {
        HashBag::remove(self, item)
    }

    fn clear(&mut self) {
        HashBag::clear(self)
    }
}

/// An iterator over every occurrence in a [`HashBag`].
pub struct Iter<'a, T> {
    entries: hash_map::Iter<'a, T, usize>,
    current: Option<(&'a T, usize)>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let (element, left) = match self.current {
            Some((element, left)) if left > 0 => (element, left),
            _ => {
                let (element, &count) = self.entries.next()?;
                (element, count)
            }
        };

        self.current = Some((element, left - 1));
        self.remaining -= 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
