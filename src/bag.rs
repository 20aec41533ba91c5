use crate::collection::{Collection, CollectionMut};
use crate::hash_bag::HashBag;
use crate::primitive::Primitive;
use crate::raw::{self, RawCursor, RawTable, Slot};
use crate::Error;

use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::iter::FusedIterator;

/// A multiset of unboxed primitive values.
///
/// Each distinct value occupies one slot of an open-addressing table and
/// carries its occurrence count alongside. The [`len`](PrimitiveBag::len) of a
/// bag counts every occurrence.
///
/// # Examples
///
/// ```
/// use primcoll::PrimitiveBag;
///
/// let mut bag = PrimitiveBag::<i64>::new();
/// assert!(bag.add(3));
/// assert!(!bag.add(3));
/// assert_eq!(bag.occurrences_of(3), 2);
/// assert_eq!(bag.len(), 2);
/// assert_eq!(bag.distinct_len(), 1);
/// ```
#[derive(Clone)]
pub struct PrimitiveBag<T> {
    raw: RawTable<T, usize>,
    total: usize,
}

/// A bag of `i8` values.
pub type I8Bag = PrimitiveBag<i8>;
/// A bag of bytes.
pub type ByteBag = PrimitiveBag<u8>;
/// A bag of `i16` values.
pub type I16Bag = PrimitiveBag<i16>;
/// A bag of `i32` values.
pub type I32Bag = PrimitiveBag<i32>;
/// A bag of `i64` values.
pub type I64Bag = PrimitiveBag<i64>;
/// A bag of `f32` values.
pub type F32Bag = PrimitiveBag<f32>;
/// A bag of `f64` values.
pub type F64Bag = PrimitiveBag<f64>;
/// A bag of `char` values.
pub type CharBag = PrimitiveBag<char>;

impl<T: Primitive> PrimitiveBag<T> {
    /// Creates an empty bag.
    ///
    /// The bag is initially created with a capacity of 0, so it will not
    /// allocate until it is first inserted into.
    pub fn new() -> PrimitiveBag<T> {
        PrimitiveBag {
            raw: RawTable::new(),
            total: 0,
        }
    }

    /// Creates an empty bag that can hold at least `capacity` distinct values
    /// without rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`. See
    /// [`PrimitiveBag::try_with_capacity`] for a fallible version.
    pub fn with_capacity(capacity: usize) -> PrimitiveBag<T> {
        PrimitiveBag::try_with_capacity(capacity).expect("capacity overflow")
    }

    /// Creates an empty bag that can hold at least `capacity` distinct values
    /// without rehashing, or returns [`Error::IllegalArgument`] if that many
    /// slots cannot be represented.
    pub fn try_with_capacity(capacity: usize) -> Result<PrimitiveBag<T>, Error> {
        Ok(PrimitiveBag {
            raw: RawTable::with_capacity(capacity)?,
            total: 0,
        })
    }

    /// Returns the total number of occurrences in the bag.
    #[inline]
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns `true` if the bag contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns the number of distinct values in the bag.
    #[inline]
    pub fn distinct_len(&self) -> usize {
        self.raw.len()
    }

    /// Returns the number of slots in the underlying table.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns `true` if the bag contains at least one occurrence of `value`.
    #[inline]
    pub fn contains(&self, value: T) -> bool {
        self.raw.find(value).is_some()
    }

    /// Returns the number of occurrences of `value`.
    #[inline]
    pub fn occurrences_of(&self, value: T) -> usize {
        self.raw.find(value).map_or(0, |i| *self.raw.payload(i))
    }

    /// Adds one occurrence of `value`, returning `true` if the value was absent
    /// before.
    ///
    /// # Panics
    ///
    /// Panics if the total occurrence count overflows `usize`, or if growing
    /// the table would overflow the slot count.
    pub fn add(&mut self, value: T) -> bool {
        self.add_occurrences(value, 1) == 1
    }

    /// Adds `count` occurrences of `value`, returning the new occurrence count.
    ///
    /// Adding zero occurrences leaves the bag unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the total occurrence count overflows `usize`, or if growing
    /// the table would overflow the slot count.
    pub fn add_occurrences(&mut self, value: T, count: usize) -> usize {
        if count == 0 {
            return self.occurrences_of(value);
        }

        let total = self
            .total
            .checked_add(count)
            .expect("occurrence count overflow");

        let count = match self.raw.entry(value) {
            Slot::Found(i) => {
                let slot = self.raw.payload_mut(i);
                *slot += count;
                *slot
            }
            Slot::Vacant(i) => {
                self.raw.occupy(i, value, count);
                count
            }
        };

        self.total = total;
        count
    }

    /// Removes one occurrence of `value`, returning `true` if one was present.
    pub fn remove(&mut self, value: T) -> bool {
        self.remove_occurrences(value, 1)
    }

    /// Removes up to `count` occurrences of `value`, returning `true` if any
    /// were removed.
    pub fn remove_occurrences(&mut self, value: T, count: usize) -> bool {
        if count == 0 {
            return false;
        }

        let Some(i) = self.raw.find(value) else {
            return false;
        };

        let current = *self.raw.payload(i);
        if count >= current {
            self.raw.vacate(i);
            self.total -= current;
        } else {
            *self.raw.payload_mut(i) = current - count;
            self.total -= count;
        }

        true
    }

    /// Sets the occurrence count of `value`, returning the previous count.
    ///
    /// Setting a count of zero removes the value.
    pub fn set_occurrences(&mut self, value: T, count: usize) -> usize {
        let previous = self.occurrences_of(value);

        if count > previous {
            self.add_occurrences(value, count - previous);
        } else if count < previous {
            self.remove_occurrences(value, previous - count);
        }

        previous
    }

    /// Removes all values, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.raw.clear();
        self.total = 0;
    }

    /// Reserves room for at least `additional` more distinct values.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.raw.reserve(additional)
    }

    /// Retains only the values for which `f` returns `true`, given each value
    /// and its occurrence count.
    pub fn retain(&mut self, mut f: impl FnMut(T, usize) -> bool) {
        for i in 0..self.raw.capacity() {
            if self.raw.is_occupied(i) && !f(*self.raw.value(i), *self.raw.payload(i)) {
                self.total -= self.raw.vacate(i);
            }
        }
    }

    /// Returns an iterator that yields each value once per occurrence.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            raw: &self.raw,
            slots: self.raw.occupied_in(0, self.raw.capacity()),
            current: None,
            remaining: self.total,
        }
    }

    /// Returns an iterator over each distinct value and its occurrence count.
    pub fn distinct(&self) -> Distinct<'_, T> {
        Distinct {
            raw: &self.raw,
            slots: self.raw.occupied_in(0, self.raw.capacity()),
            remaining: self.raw.len(),
        }
    }

    /// Returns a cursor that yields each occurrence and can remove the
    /// occurrence it most recently returned.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor {
            raw: &mut self.raw,
            total: &mut self.total,
            cursor: RawCursor::new(),
            emitted: 0,
            removable: false,
        }
    }

    /// Copies every occurrence into a vector, in iteration order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }

    /// Returns a hash of the bag's contents that does not depend on insertion
    /// order or capacity.
    pub fn hash_code(&self) -> u64 {
        self.distinct().fold(0u64, |acc, (value, count)| {
            acc.wrapping_add(Primitive::hash(value) ^ count as u64)
        })
    }

    /// Returns the smallest value, or [`Error::NoSuchElement`] if the bag is
    /// empty.
    pub fn min(&self) -> Result<T, Error>
    where
        T: PartialOrd,
    {
        self.distinct()
            .map(|(value, _)| value)
            .reduce(|min, value| if value < min { value } else { min })
            .ok_or(Error::NoSuchElement)
    }

    /// Returns the largest value, or [`Error::NoSuchElement`] if the bag is
    /// empty.
    pub fn max(&self) -> Result<T, Error>
    where
        T: PartialOrd,
    {
        self.distinct()
            .map(|(value, _)| value)
            .reduce(|max, value| if value > max { value } else { max })
            .ok_or(Error::NoSuchElement)
    }

    #[inline]
    pub(crate) fn raw(&self) -> &RawTable<T, usize> {
        &self.raw
    }
}

impl<T: Primitive> Default for PrimitiveBag<T> {
    fn default() -> Self {
        PrimitiveBag::new()
    }
}

impl<T: Primitive> fmt::Debug for PrimitiveBag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.distinct()).finish()
    }
}

impl<T: Primitive> PartialEq for PrimitiveBag<T> {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total
            && self.distinct_len() == other.distinct_len()
            && self
                .distinct()
                .all(|(value, count)| other.occurrences_of(value) == count)
    }
}

impl<T: Primitive> Eq for PrimitiveBag<T> {}

impl<T, S> PartialEq<HashBag<T, S>> for PrimitiveBag<T>
where
    T: Primitive + Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &HashBag<T, S>) -> bool {
        self.total == other.len()
            && self.distinct_len() == other.distinct_len()
            && self
                .distinct()
                .all(|(value, count)| other.occurrences_of(&value) == count)
    }
}

impl<T: Primitive> Hash for PrimitiveBag<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<T: Primitive> FromIterator<T> for PrimitiveBag<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut bag = PrimitiveBag::new();
        bag.extend(iter);
        bag
    }
}

impl<T: Primitive, const N: usize> From<[T; N]> for PrimitiveBag<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Primitive> Extend<T> for PrimitiveBag<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<'a, T: Primitive> Extend<&'a T> for PrimitiveBag<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, T: Primitive> IntoIterator for &'a PrimitiveBag<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Primitive> Collection for PrimitiveBag<T> {
    type Item = T;
    type Iter<'a> = Iter<'a, T> where Self: 'a;

    fn len(&self) -> usize {
        self.len()
    }

    fn contains(&self, item: &T) -> bool {
        self.contains(*item)
    }

    fn iter(&self) -> Iter<'_, T> {
        self.iter()
    }
}

impl<T: Primitive> CollectionMut for PrimitiveBag<T> {
    fn add(&mut self, item: T) -> bool {
        self.add(item)
    }

    fn remove(&mut self, item: &T) -> bool {
        self.remove(*item)
    }

    fn clear(&mut self) {
        self.clear()
    }
}

/// An iterator over every occurrence in a [`PrimitiveBag`].
pub struct Iter<'a, T> {
    raw: &'a RawTable<T, usize>,
    slots: raw::Occupied<'a>,
    // The current slot and the occurrences of it left to yield.
    current: Option<(usize, usize)>,
    remaining: usize,
}

impl<'a, T: Primitive> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let (i, left) = match self.current {
            Some((i, left)) if left > 0 => (i, left),
            _ => {
                let i = self.slots.next()?;
                (i, *self.raw.payload(i))
            }
        };

        self.current = Some((i, left - 1));
        self.remaining -= 1;
        Some(self.raw.value(i))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Primitive> ExactSizeIterator for Iter<'_, T> {}

impl<T: Primitive> FusedIterator for Iter<'_, T> {}

impl<T: Primitive> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

/// An iterator over the distinct values of a [`PrimitiveBag`] and their
/// occurrence counts.
pub struct Distinct<'a, T> {
    raw: &'a RawTable<T, usize>,
    slots: raw::Occupied<'a>,
    remaining: usize,
}

impl<T: Primitive> Iterator for Distinct<'_, T> {
    type Item = (T, usize);

    #[inline]
    fn next(&mut self) -> Option<(T, usize)> {
        let i = self.slots.next()?;
        self.remaining -= 1;
        Some((*self.raw.value(i), *self.raw.payload(i)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Primitive> ExactSizeIterator for Distinct<'_, T> {}

impl<T: Primitive> fmt::Debug for Distinct<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distinct")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

/// A cursor over every occurrence in a [`PrimitiveBag`] that can remove the
/// occurrence it most recently returned.
pub struct Cursor<'a, T> {
    raw: &'a mut RawTable<T, usize>,
    total: &'a mut usize,
    cursor: RawCursor,
    // Occurrences of the current slot returned so far.
    emitted: usize,
    removable: bool,
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

impl<T: Primitive> Cursor<'_, T> {
    /// Removes the occurrence most recently returned by `next`.
    ///
    /// Returns [`Error::IllegalState`] if `next` has not been called, or the
    /// occurrence was already removed.
    pub fn remove(&mut self) -> Result<(), Error> {
        let i = match self.cursor.current() {
            Some(i) if self.removable => i,
            _ => return Err(Error::IllegalState("no current occurrence to remove")),
        };

        let count = self.raw.payload_mut(i);
        *count -= 1;
        if *count == 0 {
            self.raw.vacate(i);
            self.cursor.release();
        }

        self.emitted -= 1;
        *self.total -= 1;
        self.removable = false;
        Ok(())
    }
}

impl<T: Primitive> Iterator for Cursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(i) = self.cursor.current() {
            if self.emitted < *self.raw.payload(i) {
                self.emitted += 1;
                self.removable = true;
                return Some(*self.raw.value(i));
            }
        }

        match self.cursor.advance(self.raw) {
            Some(i) => {
                self.emitted = 1;
                self.removable = true;
                Some(*self.raw.value(i))
            }
            None => {
                self.removable = false;
                None
            }
        }
    }
}
