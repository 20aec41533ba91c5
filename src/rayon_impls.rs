//! Rayon parallel iterators over the primitive tables.

use rayon::iter::plumbing::{bridge_unindexed, Folder, UnindexedConsumer, UnindexedProducer};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use std::fmt;
use std::iter;

use crate::primitive::Primitive;
use crate::raw::RawTable;
use crate::{PrimitiveBag, PrimitiveSet};

// Slot ranges at or below this size are not split further.
const MIN_SPLIT: usize = 256;

impl<T: Primitive> PrimitiveSet<T> {
    /// Returns a parallel iterator over the values of the set.
    ///
    /// ```
    /// use primcoll::I64Set;
    /// use rayon::prelude::*;
    ///
    /// let set: I64Set = (1..=100).collect();
    /// assert_eq!(set.par_iter().sum::<i64>(), 5050);
    /// ```
    pub fn par_iter(&self) -> ParSetIter<'_, T> {
        ParSetIter { raw: self.raw() }
    }
}

impl<T: Primitive> PrimitiveBag<T> {
    /// Returns a parallel iterator that yields each value once per occurrence.
    pub fn par_iter(&self) -> ParBagIter<'_, T> {
        ParBagIter { raw: self.raw() }
    }
}

impl<'a, T: Primitive> IntoParallelIterator for &'a PrimitiveSet<T> {
    type Iter = ParSetIter<'a, T>;
    type Item = &'a T;

    fn into_par_iter(self) -> Self::Iter {
        self.par_iter()
    }
}

impl<'a, T: Primitive> IntoParallelIterator for &'a PrimitiveBag<T> {
    type Iter = ParBagIter<'a, T>;
    type Item = &'a T;

    fn into_par_iter(self) -> Self::Iter {
        self.par_iter()
    }
}

/// Parallel iterator over the values of a [`PrimitiveSet`].
///
/// This struct is created by [`PrimitiveSet::par_iter`].
pub struct ParSetIter<'a, T> {
    raw: &'a RawTable<T, ()>,
}

impl<T> fmt::Debug for ParSetIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParSetIter").finish()
    }
}

impl<'a, T: Primitive> ParallelIterator for ParSetIter<'a, T> {
    type Item = &'a T;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: UnindexedConsumer<Self::Item>,
    {
        bridge_unindexed(SlotProducer::new(self.raw), consumer)
    }
}

/// Parallel iterator over the occurrences of a [`PrimitiveBag`].
///
/// This struct is created by [`PrimitiveBag::par_iter`].
pub struct ParBagIter<'a, T> {
    raw: &'a RawTable<T, usize>,
}

impl<T> fmt::Debug for ParBagIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParBagIter").finish()
    }
}

impl<'a, T: Primitive> ParallelIterator for ParBagIter<'a, T> {
    type Item = &'a T;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: UnindexedConsumer<Self::Item>,
    {
        bridge_unindexed(SlotProducer::new(self.raw), consumer)
    }
}

// How many times the value in a slot is yielded.
trait Multiplicity: Copy + Default + Send + Sync {
    fn times(self) -> usize;
}

impl Multiplicity for () {
    fn times(self) -> usize {
        1
    }
}

impl Multiplicity for usize {
    fn times(self) -> usize {
        self
    }
}

// Splits a table's slot range in halves.
struct SlotProducer<'a, T, P> {
    raw: &'a RawTable<T, P>,
    start: usize,
    end: usize,
}

impl<'a, T, P> SlotProducer<'a, T, P>
where
    T: Primitive,
    P: Multiplicity,
{
    fn new(raw: &'a RawTable<T, P>) -> Self {
        SlotProducer {
            raw,
            start: 0,
            end: raw.capacity(),
        }
    }
}

impl<'a, T, P> UnindexedProducer for SlotProducer<'a, T, P>
where
    T: Primitive,
    P: Multiplicity,
{
    type Item = &'a T;

    fn split(self) -> (Self, Option<Self>) {
        if self.end - self.start <= MIN_SPLIT {
            return (self, None);
        }

        let mid = self.start + (self.end - self.start) / 2;
        (
            SlotProducer {
                raw: self.raw,
                start: self.start,
                end: mid,
            },
            Some(SlotProducer {
                raw: self.raw,
                start: mid,
                end: self.end,
            }),
        )
    }

    fn fold_with<F>(self, mut folder: F) -> F
    where
        F: Folder<Self::Item>,
    {
        for i in self.raw.occupied_in(self.start, self.end) {
            let value = self.raw.value(i);
            folder = folder.consume_iter(iter::repeat(value).take(self.raw.payload(i).times()));

            if folder.full() {
                break;
            }
        }

        folder
    }
}
