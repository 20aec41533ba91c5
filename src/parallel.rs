//! Batch partitioning and parallel traversal.
//!
//! A [`ParallelDriver`] splits any [`Batchable`] collection into contiguous
//! index ranges described by a [`BatchPlan`], runs a worker per batch on a
//! rayon pool, and merges the partial results.

use crate::guarded::Guarded;
use crate::primitive::Primitive;
use crate::{Error, PrimitiveBag, PrimitiveSet};

use std::fmt;
use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

/// A collection that can be traversed by index range.
///
/// Positions run from `0` to [`batch_len`](Batchable::batch_len). A position
/// need not hold an element: hash tables expose their slots, and empty slots
/// are skipped by [`for_each_in_range`](Batchable::for_each_in_range).
pub trait Batchable {
    /// The element type.
    type Item;

    /// Returns the number of positions.
    fn batch_len(&self) -> usize;

    /// Calls `f` on every element stored at a position in `[start, end)`.
    ///
    /// # Panics
    ///
    /// May panic if `start > end` or `end > self.batch_len()`.
    fn for_each_in_range<F>(&self, start: usize, end: usize, f: F)
    where
        F: FnMut(&Self::Item);
}

impl<T> Batchable for [T] {
    type Item = T;

    fn batch_len(&self) -> usize {
        self.len()
    }

    fn for_each_in_range<F>(&self, start: usize, end: usize, f: F)
    where
        F: FnMut(&T),
    {
        self[start..end].iter().for_each(f)
    }
}

impl<T> Batchable for Vec<T> {
    type Item = T;

    fn batch_len(&self) -> usize {
        self.len()
    }

    fn for_each_in_range<F>(&self, start: usize, end: usize, f: F)
    where
        F: FnMut(&T),
    {
        self.as_slice().for_each_in_range(start, end, f)
    }
}

impl<T: Primitive> Batchable for PrimitiveSet<T> {
    type Item = T;

    fn batch_len(&self) -> usize {
        self.raw().capacity()
    }

    fn for_each_in_range<F>(&self, start: usize, end: usize, mut f: F)
    where
        F: FnMut(&T),
    {
        let raw = self.raw();
        for i in raw.occupied_in(start, end) {
            f(raw.value(i));
        }
    }
}

// Bags visit each value once per occurrence.
impl<T: Primitive> Batchable for PrimitiveBag<T> {
    type Item = T;

    fn batch_len(&self) -> usize {
        self.raw().capacity()
    }

    fn for_each_in_range<F>(&self, start: usize, end: usize, mut f: F)
    where
        F: FnMut(&T),
    {
        let raw = self.raw();
        for i in raw.occupied_in(start, end) {
            for _ in 0..*raw.payload(i) {
                f(raw.value(i));
            }
        }
    }
}

// Each range is visited under its own shared hold, so writers may interleave
// between batches. Ranges that fall past a shrunken delegate are clamped.
impl<C: Batchable> Batchable for Guarded<C> {
    type Item = C::Item;

    fn batch_len(&self) -> usize {
        self.with_read_lock(|view| view.get().map_or(0, |c| c.batch_len()))
    }

    fn for_each_in_range<F>(&self, start: usize, end: usize, f: F)
    where
        F: FnMut(&C::Item),
    {
        self.with_read_lock(|view| {
            if let Ok(c) = view.get() {
                let end = end.min(c.batch_len());
                if start < end {
                    c.for_each_in_range(start, end, f);
                }
            }
        })
    }
}

/// A split of `[0, len)` into contiguous, non-empty, in-order ranges whose
/// sizes differ by at most one.
///
/// The first `len % batch_count` batches hold one extra element.
///
/// # Examples
///
/// ```
/// use primcoll::BatchPlan;
///
/// let plan = BatchPlan::new(10, 4)?;
/// let ranges: Vec<_> = plan.ranges().collect();
/// assert_eq!(ranges, [0..3, 3..6, 6..8, 8..10]);
/// # Ok::<(), primcoll::Error>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    len: usize,
    count: usize,
}

impl BatchPlan {
    /// Splits `[0, len)` into `min(desired, len)` batches.
    ///
    /// Returns [`Error::IllegalArgument`] if `desired` is zero. A `len` of zero
    /// yields a plan with no batches.
    pub fn new(len: usize, desired: usize) -> Result<BatchPlan, Error> {
        if desired == 0 {
            return Err(Error::IllegalArgument("batch count must be positive"));
        }

        Ok(BatchPlan::split(len, desired))
    }

    // `desired` must be positive.
    fn split(len: usize, desired: usize) -> BatchPlan {
        BatchPlan {
            len,
            count: desired.min(len),
        }
    }

    /// Returns the number of positions the plan covers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the plan covers no positions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of batches.
    pub fn batch_count(&self) -> usize {
        self.count
    }

    /// Returns the range of the batch at `index`.
    pub fn range(&self, index: usize) -> Result<Range<usize>, Error> {
        if index >= self.count {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.count,
            });
        }

        Ok(self.range_unchecked(index))
    }

    fn range_unchecked(&self, index: usize) -> Range<usize> {
        let base = self.len / self.count;
        let extra = self.len % self.count;

        let start = index * base + index.min(extra);
        let size = base + usize::from(index < extra);
        start..start + size
    }

    /// Returns the batch ranges in order.
    pub fn ranges(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        (0..self.count).map(|index| self.range_unchecked(index))
    }
}

/// One batch of a collection, handed to a worker.
pub struct Batch<'a, C: ?Sized> {
    collection: &'a C,
    index: usize,
    range: Range<usize>,
}

impl<'a, C> Batch<'a, C>
where
    C: Batchable + ?Sized,
{
    /// Returns the position of this batch in its plan.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the positions this batch covers.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns the number of positions this batch covers.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Calls `f` on every element in this batch.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&C::Item),
    {
        self.collection
            .for_each_in_range(self.range.start, self.range.end, f)
    }
}

impl<C: ?Sized> fmt::Debug for Batch<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("index", &self.index)
            .field("range", &self.range)
            .finish()
    }
}

/// Runs batch workers over collections on a rayon thread pool.
///
/// Every call blocks until all of its batches have finished. Batches run in
/// no particular order. A failing worker does not cancel the others; once
/// all have finished, the error of the lowest-indexed failing batch is
/// returned. A panicking worker is resumed on the caller after all batches
/// have finished.
///
/// Running a driver over a [`Guarded`] collection while the calling thread
/// holds that collection's write lock deadlocks.
///
/// # Examples
///
/// ```
/// use primcoll::{BatchPlan, HashBag, ParallelDriver};
///
/// let input: Vec<u32> = (0..1000).collect();
/// let driver = ParallelDriver::new();
/// let plan = BatchPlan::new(input.len(), 8)?;
///
/// let bag = driver.collect_batches(
///     &input,
///     &plan,
///     |n| n % 10,
///     |bag: &mut HashBag<u32>, digits| bag.extend(digits),
///     HashBag::new(),
/// )?;
/// assert_eq!(bag.occurrences_of(&3), 100);
/// # Ok::<(), primcoll::Error>(())
/// ```
pub struct ParallelDriver {
    pool: Option<ThreadPool>,
    min_batch_size: usize,
    batches_per_thread: usize,
}

impl ParallelDriver {
    /// Creates a driver on the global rayon pool with default settings.
    pub fn new() -> ParallelDriver {
        ParallelDriver {
            pool: None,
            min_batch_size: ParallelDriverBuilder::MIN_BATCH_SIZE,
            batches_per_thread: ParallelDriverBuilder::BATCHES_PER_THREAD,
        }
    }

    /// Returns a builder for a configured driver.
    pub fn builder() -> ParallelDriverBuilder {
        ParallelDriverBuilder::default()
    }

    /// Returns the number of threads batches are spread across.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Plans a traversal of `len` positions.
    ///
    /// Batches hold at least the configured minimum batch size where
    /// possible, and there are at most `threads * batches_per_thread` of them.
    pub fn plan(&self, len: usize) -> BatchPlan {
        let most = self.threads().saturating_mul(self.batches_per_thread);
        let desired = (len / self.min_batch_size).clamp(1, most.max(1));
        BatchPlan::split(len, desired)
    }

    /// Runs `worker` once per batch of `plan` and waits for all of them.
    ///
    /// Returns [`Error::IndexOutOfRange`] if the plan does not cover exactly
    /// the collection's positions. Otherwise returns the error of the
    /// lowest-indexed failing batch, if any.
    pub fn for_each_batch<C, W, E>(
        &self,
        collection: &C,
        plan: &BatchPlan,
        worker: W,
    ) -> Result<(), E>
    where
        C: Batchable + Sync + ?Sized,
        W: Fn(Batch<'_, C>) -> Result<(), E> + Sync,
        E: From<Error> + Send,
    {
        check(collection, plan)?;

        debug!(
            len = plan.len(),
            batches = plan.batch_count(),
            threads = self.threads(),
            "dispatching batches"
        );

        let failure: Mutex<Option<(usize, E)>> = Mutex::new(None);

        self.install(|| {
            rayon::scope(|s| {
                for (index, range) in plan.ranges().enumerate() {
                    let (worker, failure) = (&worker, &failure);

                    s.spawn(move |_| {
                        let batch = Batch {
                            collection,
                            index,
                            range,
                        };

                        if let Err(err) = worker(batch) {
                            warn!(batch = index, "batch worker failed");

                            let mut first = failure.lock().unwrap_or_else(PoisonError::into_inner);
                            if first.as_ref().map_or(true, |&(seen, _)| index < seen) {
                                *first = Some((index, err));
                            }
                        }
                    });
                }
            })
        });

        match failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Maps every element through `mapper` in parallel and merges each
    /// batch's output into `target` with `combiner`.
    ///
    /// Batches are merged as they finish, in no particular order, so
    /// `combiner` should not depend on the order it sees batches in. Use
    /// [`collect_ordered`](ParallelDriver::collect_ordered) for
    /// order-sensitive output.
    pub fn collect_batches<C, M, A, F, R>(
        &self,
        collection: &C,
        plan: &BatchPlan,
        mapper: M,
        combiner: F,
        target: R,
    ) -> Result<R, Error>
    where
        C: Batchable + Sync + ?Sized,
        M: Fn(&C::Item) -> A + Sync,
        A: Send,
        F: Fn(&mut R, Vec<A>) + Sync,
        R: Send,
    {
        let target = Mutex::new(target);

        self.for_each_batch(collection, plan, |batch| {
            let mut local = Vec::new();
            batch.for_each(|item| local.push(mapper(item)));

            let mut target = target.lock().unwrap_or_else(PoisonError::into_inner);
            combiner(&mut target, local);
            Ok::<_, Error>(())
        })?;

        Ok(target.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    /// Maps every element through `mapper` in parallel, returning the outputs
    /// in batch order.
    pub fn collect_ordered<C, M, A>(
        &self,
        collection: &C,
        plan: &BatchPlan,
        mapper: M,
    ) -> Result<Vec<A>, Error>
    where
        C: Batchable + Sync + ?Sized,
        M: Fn(&C::Item) -> A + Sync,
        A: Send,
    {
        let parts: Vec<Mutex<Vec<A>>> = (0..plan.batch_count())
            .map(|_| Mutex::new(Vec::new()))
            .collect();

        self.for_each_batch(collection, plan, |batch| {
            let mut local = Vec::new();
            batch.for_each(|item| local.push(mapper(item)));

            *parts[batch.index()].lock().unwrap_or_else(PoisonError::into_inner) = local;
            Ok::<_, Error>(())
        })?;

        let mut out = Vec::new();
        for part in parts {
            out.extend(part.into_inner().unwrap_or_else(PoisonError::into_inner));
        }

        Ok(out)
    }

    /// Calls `f` on every element in parallel, planning the batches
    /// automatically.
    pub fn for_each<C, F>(&self, collection: &C, f: F) -> Result<(), Error>
    where
        C: Batchable + Sync + ?Sized,
        F: Fn(&C::Item) + Sync,
    {
        let plan = self.plan(collection.batch_len());

        self.for_each_batch(collection, &plan, |batch| {
            batch.for_each(&f);
            Ok(())
        })
    }

    /// Maps every element through `mapper` in parallel and extends `target`
    /// with the outputs, planning the batches automatically.
    pub fn collect_into<C, M, A, R>(&self, collection: &C, mapper: M, target: R) -> Result<R, Error>
    where
        C: Batchable + Sync + ?Sized,
        M: Fn(&C::Item) -> A + Sync,
        A: Send,
        R: Extend<A> + Send,
    {
        let plan = self.plan(collection.batch_len());
        self.collect_batches(collection, &plan, mapper, |target, part| target.extend(part), target)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for ParallelDriver {
    fn default() -> ParallelDriver {
        ParallelDriver::new()
    }
}

impl fmt::Debug for ParallelDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelDriver")
            .field("threads", &self.threads())
            .field("dedicated_pool", &self.pool.is_some())
            .field("min_batch_size", &self.min_batch_size)
            .field("batches_per_thread", &self.batches_per_thread)
            .finish()
    }
}

// Verifies that `plan` covers exactly the positions of `collection`.
fn check<C>(collection: &C, plan: &BatchPlan) -> Result<(), Error>
where
    C: Batchable + ?Sized,
{
    let len = collection.batch_len();
    if plan.len() != len {
        return Err(Error::IndexOutOfRange {
            index: plan.len(),
            len,
        });
    }

    Ok(())
}

/// A builder for a [`ParallelDriver`].
///
/// ```
/// use primcoll::ParallelDriver;
///
/// let driver = ParallelDriver::builder()
///     .threads(2)
///     .min_batch_size(64)
///     .build()?;
/// assert_eq!(driver.threads(), 2);
/// # Ok::<(), primcoll::Error>(())
/// ```
#[derive(Clone)]
pub struct ParallelDriverBuilder {
    threads: Option<usize>,
    min_batch_size: usize,
    batches_per_thread: usize,
}

impl ParallelDriverBuilder {
    const MIN_BATCH_SIZE: usize = 1024;
    const BATCHES_PER_THREAD: usize = 4;

    /// Run batches on a dedicated pool of `threads` threads instead of the
    /// global rayon pool.
    pub fn threads(self, threads: usize) -> ParallelDriverBuilder {
        ParallelDriverBuilder {
            threads: Some(threads),
            ..self
        }
    }

    /// Set the smallest batch automatic planning aims for. Defaults to 1024.
    pub fn min_batch_size(self, min_batch_size: usize) -> ParallelDriverBuilder {
        ParallelDriverBuilder {
            min_batch_size,
            ..self
        }
    }

    /// Set how many batches automatic planning creates per thread at most.
    /// Defaults to 4.
    pub fn batches_per_thread(self, batches_per_thread: usize) -> ParallelDriverBuilder {
        ParallelDriverBuilder {
            batches_per_thread,
            ..self
        }
    }

    /// Construct a [`ParallelDriver`] from the builder.
    ///
    /// Returns [`Error::IllegalArgument`] if any setting is zero or the thread
    /// pool cannot be started.
    pub fn build(self) -> Result<ParallelDriver, Error> {
        if self.min_batch_size == 0 {
            return Err(Error::IllegalArgument("minimum batch size must be positive"));
        }

        if self.batches_per_thread == 0 {
            return Err(Error::IllegalArgument("batches per thread must be positive"));
        }

        let pool = match self.threads {
            Some(0) => return Err(Error::IllegalArgument("thread count must be positive")),
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("primcoll-batch-{i}"))
                    .build()
                    .map_err(|_| Error::IllegalArgument("failed to start thread pool"))?,
            ),
            None => None,
        };

        Ok(ParallelDriver {
            pool,
            min_batch_size: self.min_batch_size,
            batches_per_thread: self.batches_per_thread,
        })
    }
}

impl Default for ParallelDriverBuilder {
    fn default() -> ParallelDriverBuilder {
        ParallelDriverBuilder {
            threads: None,
            min_batch_size: ParallelDriverBuilder::MIN_BATCH_SIZE,
            batches_per_thread: ParallelDriverBuilder::BATCHES_PER_THREAD,
        }
    }
}

impl fmt::Debug for ParallelDriverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelDriverBuilder")
            .field("threads", &self.threads)
            .field("min_batch_size", &self.min_batch_size)
            .field("batches_per_thread", &self.batches_per_thread)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_sizes_differ_by_one() {
        let plan = BatchPlan::new(10, 3).unwrap();
        let sizes: Vec<_> = plan.ranges().map(|r| r.len()).collect();
        assert_eq!(sizes, [4, 3, 3]);
        assert_eq!(plan.range(2), Ok(7..10));
        assert_eq!(plan.range(3), Err(Error::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn plan_edges() {
        assert_eq!(
            BatchPlan::new(5, 0),
            Err(Error::IllegalArgument("batch count must be positive"))
        );

        let empty = BatchPlan::new(0, 4).unwrap();
        assert_eq!(empty.batch_count(), 0);
        assert_eq!(empty.ranges().count(), 0);

        let capped = BatchPlan::new(3, 10).unwrap();
        assert_eq!(capped.ranges().collect::<Vec<_>>(), [0..1, 1..2, 2..3]);
    }

    #[test]
    fn builder_rejects_zero() {
        assert!(ParallelDriver::builder().threads(0).build().is_err());
        assert!(ParallelDriver::builder().min_batch_size(0).build().is_err());
        assert!(ParallelDriver::builder().batches_per_thread(0).build().is_err());
    }

    #[test]
    fn automatic_plan() {
        let driver = ParallelDriver::builder()
            .threads(2)
            .min_batch_size(10)
            .batches_per_thread(3)
            .build()
            .unwrap();

        assert_eq!(driver.plan(0).batch_count(), 0);
        assert_eq!(driver.plan(5).batch_count(), 1);
        assert_eq!(driver.plan(35).batch_count(), 3);
        assert_eq!(driver.plan(10_000).batch_count(), 6);
    }

    #[test]
    fn mismatched_plan() {
        let driver = ParallelDriver::new();
        let plan = BatchPlan::new(4, 2).unwrap();
        let result = driver.for_each_batch(&vec![1, 2, 3], &plan, |_| Ok::<_, Error>(()));
        assert_eq!(result, Err(Error::IndexOutOfRange { index: 4, len: 3 }));
    }
}
