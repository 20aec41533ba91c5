use crate::collection::{Collection, CollectionMut};
use crate::primitive::Primitive;
use crate::raw::{self, RawCursor, RawTable, Slot};
use crate::Error;

use std::collections::HashSet;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::iter::FusedIterator;

/// A hash set of unboxed primitive values.
///
/// Values are stored inline in an open-addressing table with out-of-band slot
/// state, so no value of `T` is reserved as a sentinel. Iteration order is
/// unspecified and may change after any mutation.
///
/// # Examples
///
/// ```
/// use primcoll::PrimitiveSet;
///
/// let mut set = PrimitiveSet::<i32>::new();
/// assert!(set.add(7));
/// assert!(!set.add(7));
/// assert!(set.contains(7));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Clone)]
pub struct PrimitiveSet<T> {
    raw: RawTable<T, ()>,
}

/// A set of `i8` values.
pub type I8Set = PrimitiveSet<i8>;
/// A set of bytes.
pub type ByteSet = PrimitiveSet<u8>;
/// A set of `i16` values.
pub type I16Set = PrimitiveSet<i16>;
/// A set of `i32` values.
pub type I32Set = PrimitiveSet<i32>;
/// A set of `i64` values.
pub type I64Set = PrimitiveSet<i64>;
/// A set of `f32` values.
pub type F32Set = PrimitiveSet<f32>;
/// A set of `f64` values.
pub type F64Set = PrimitiveSet<f64>;
/// A set of `char` values.
pub type CharSet = PrimitiveSet<char>;

impl<T: Primitive> PrimitiveSet<T> {
    /// Creates an empty set.
    ///
    /// The set is initially created with a capacity of 0, so it will not
    /// allocate until it is first inserted into.
    pub fn new() -> PrimitiveSet<T> {
        PrimitiveSet {
            raw: RawTable::new(),
        }
    }

    /// Creates an empty set that can hold at least `capacity` values without
    /// rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`. See
    /// [`PrimitiveSet::try_with_capacity`] for a fallible version.
    pub fn with_capacity(capacity: usize) -> PrimitiveSet<T> {
        PrimitiveSet::try_with_capacity(capacity).expect("capacity overflow")
    }

    /// Creates an empty set that can hold at least `capacity` values without
    /// rehashing, or returns [`Error::IllegalArgument`] if that many slots
    /// cannot be represented.
    pub fn try_with_capacity(capacity: usize) -> Result<PrimitiveSet<T>, Error> {
        Ok(PrimitiveSet {
            raw: RawTable::with_capacity(capacity)?,
        })
    }

    /// Returns the number of values in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the set contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots in the underlying table.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns `true` if the set contains `value`.
    #[inline]
    pub fn contains(&self, value: T) -> bool {
        self.raw.find(value).is_some()
    }

    /// Adds `value` to the set, returning `true` if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if growing the table would overflow the slot count.
    pub fn add(&mut self, value: T) -> bool {
        match self.raw.entry(value) {
            Slot::Found(_) => false,
            Slot::Vacant(i) => {
                self.raw.occupy(i, value, ());
                true
            }
        }
    }

    /// Removes `value` from the set, returning `true` if it was present.
    pub fn remove(&mut self, value: T) -> bool {
        match self.raw.find(value) {
            Some(i) => {
                self.raw.vacate(i);
                true
            }
            None => false,
        }
    }

    /// Removes all values, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Reserves room for at least `additional` more values.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.raw.reserve(additional)
    }

    /// Retains only the values for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(T) -> bool) {
        for i in 0..self.raw.capacity() {
            if self.raw.is_occupied(i) && !f(*self.raw.value(i)) {
                self.raw.vacate(i);
            }
        }
    }

    /// Returns an iterator over the values in the set.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            raw: &self.raw,
            slots: self.raw.occupied_in(0, self.raw.capacity()),
            remaining: self.raw.len(),
        }
    }

    /// Returns a cursor over the values in the set that can remove the value
    /// it most recently returned.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor {
            raw: &mut self.raw,
            cursor: RawCursor::new(),
        }
    }

    /// Copies the values into a vector, in iteration order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }

    /// Returns a hash of the set's contents that does not depend on insertion
    /// order or capacity.
    pub fn hash_code(&self) -> u64 {
        self.iter()
            .fold(0u64, |acc, value| acc.wrapping_add(Primitive::hash(*value)))
    }

    /// Returns the smallest value, or [`Error::NoSuchElement`] if the set is
    /// empty.
    pub fn min(&self) -> Result<T, Error>
    where
        T: PartialOrd,
    {
        self.iter()
            .copied()
            .reduce(|min, value| if value < min { value } else { min })
            .ok_or(Error::NoSuchElement)
    }

    /// Returns the largest value, or [`Error::NoSuchElement`] if the set is
    /// empty.
    pub fn max(&self) -> Result<T, Error>
    where
        T: PartialOrd,
    {
        self.iter()
            .copied()
            .reduce(|max, value| if value > max { value } else { max })
            .ok_or(Error::NoSuchElement)
    }

    #[inline]
    pub(crate) fn raw(&self) -> &RawTable<T, ()> {
        &self.raw
    }
}

impl<T: Primitive> Default for PrimitiveSet<T> {
    fn default() -> Self {
        PrimitiveSet::new()
    }
}

impl<T: Primitive> fmt::Debug for PrimitiveSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Primitive> PartialEq for PrimitiveSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|&value| other.contains(value))
    }
}

impl<T: Primitive> Eq for PrimitiveSet<T> {}

impl<T, S> PartialEq<HashSet<T, S>> for PrimitiveSet<T>
where
    T: Primitive + Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &HashSet<T, S>) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T: Primitive> Hash for PrimitiveSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<T: Primitive> FromIterator<T> for PrimitiveSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = PrimitiveSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Primitive, const N: usize> From<[T; N]> for PrimitiveSet<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Primitive> Extend<T> for PrimitiveSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<'a, T: Primitive> Extend<&'a T> for PrimitiveSet<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, T: Primitive> IntoIterator for &'a PrimitiveSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Primitive> Collection for PrimitiveSet<T> {
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

impl<T: Primitive> CollectionMut for PrimitiveSet<T> {
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

/// An iterator over the values of a [`PrimitiveSet`].
pub struct Iter<'a, T> {
    raw: &'a RawTable<T, ()>,
    slots: raw::Occupied<'a>,
    remaining: usize,
}

impl<'a, T: Primitive> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let i = self.slots.next()?;
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

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            raw: self.raw,
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<T: Primitive> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// A cursor over a [`PrimitiveSet`] that can remove the value it most recently
/// returned.
///
/// The cursor holds the set mutably, so no other path can modify the set
/// while it is alive.
pub struct Cursor<'a, T> {
    raw: &'a mut RawTable<T, ()>,
    cursor: RawCursor,
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

impl<T: Primitive> Cursor<'_, T> {
    /// Removes the value most recently returned by `next`.
    ///
    /// Returns [`Error::IllegalState`] if `next` has not been called, or the
    /// value was already removed.
    pub fn remove(&mut self) -> Result<(), Error> {
        let i = self
            .cursor
            .current()
            .ok_or(Error::IllegalState("no current value to remove"))?;

        self.raw.vacate(i);
        self.cursor.release();
        Ok(())
    }
}

impl<T: Primitive> Iterator for Cursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let i = self.cursor.advance(self.raw)?;
        Some(*self.raw.value(i))
    }
}
