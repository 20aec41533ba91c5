use crate::collection::{Collection, CollectionMut};
use crate::raw::rwlock::RwLock;
use crate::Error;

use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::rc::Rc;

/// A collection shared between many readers and at most one writer.
///
/// `Guarded` owns its delegate collection and gates every access to it behind
/// a reader/writer lock. There are three ways in:
///
/// - Per-call methods such as [`len`](Guarded::len) and [`add`](Guarded::add)
///   take the lock for the duration of a single operation.
/// - [`with_read_lock`](Guarded::with_read_lock) holds the shared lock while a
///   closure runs against a [`ReadView`], which rejects mutation.
/// - [`with_write_lock`](Guarded::with_write_lock) holds the exclusive lock
///   while a closure runs against a [`WriteView`] of the real delegate.
///
/// Views are revoked when the granting call returns. A view smuggled out of
/// its closure fails every operation with [`Error::UsageAfterScope`].
///
/// The lock is not reentrant. Taking the write lock on a `Guarded` while the
/// same thread already holds it in any mode, or a read lock while holding the
/// write lock, panics. Nested read scopes are allowed.
///
/// # Examples
///
/// ```
/// use primcoll::{Error, Guarded, I32Bag};
///
/// let bag = Guarded::new(I32Bag::new());
/// bag.add(7);
///
/// let seen = bag.with_write_lock(|mut view| {
///     view.add(7)?;
///     Ok::<_, Error>(view.get()?.occurrences_of(7))
/// });
/// assert_eq!(seen, Ok(2));
/// ```
pub struct Guarded<C> {
    lock: RwLock,
    delegate: UnsafeCell<C>,
}

// Safety: the delegate is only reached through the lock, which hands out
// shared access to many threads or unique access to one.
unsafe impl<C: Send> Send for Guarded<C> {}
unsafe impl<C: Send + Sync> Sync for Guarded<C> {}

impl<C> Guarded<C> {
    /// Wraps `delegate`.
    pub fn new(delegate: C) -> Guarded<C> {
        Guarded {
            lock: RwLock::new(),
            delegate: UnsafeCell::new(delegate),
        }
    }

    /// Returns a mutable reference to the delegate.
    ///
    /// The exclusive borrow of the wrapper statically rules out any other
    /// holder, so no lock is taken.
    pub fn get_mut(&mut self) -> &mut C {
        self.delegate.get_mut()
    }

    /// Unwraps the delegate.
    pub fn into_inner(self) -> C {
        self.delegate.into_inner()
    }

    /// Runs `f` with a read-only view of the delegate while holding the
    /// shared lock.
    ///
    /// Other readers may run concurrently, writers are excluded until `f`
    /// returns. The view is revoked as soon as this call returns.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds the write lock on this collection.
    pub fn with_read_lock<'g, F, R>(&'g self, f: F) -> R
    where
        F: FnOnce(ReadView<'g, C>) -> R,
    {
        let _guard = self.lock.read();
        let scope = Scope::open();

        f(ReadView {
            guarded: self,
            alive: scope.token(),
        })
    }

    /// Runs `f` with the real delegate while holding the exclusive lock.
    ///
    /// The view, and anything borrowed through it, is revoked as soon as this
    /// call returns.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds any lock on this collection.
    pub fn with_write_lock<'g, F, R>(&'g self, f: F) -> R
    where
        F: FnOnce(WriteView<'g, C>) -> R,
    {
        let _guard = self.lock.write();
        let scope = Scope::open();

        f(WriteView {
            guarded: self,
            alive: scope.token(),
        })
    }

    // Safety: the caller must hold the lock in either mode.
    unsafe fn shared(&self) -> &C {
        unsafe { &*self.delegate.get() }
    }

    // Safety: the caller must hold the lock exclusively and must not create
    // another reference to the delegate while the returned one is live.
    #[allow(clippy::mut_from_ref)]
    unsafe fn exclusive(&self) -> &mut C {
        unsafe { &mut *self.delegate.get() }
    }

    fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let _guard = self.lock.read();
        f(unsafe { self.shared() })
    }

    fn write<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let _guard = self.lock.write();
        f(unsafe { self.exclusive() })
    }
}

impl<C: Collection> Guarded<C> {
    /// Returns the number of elements, under the shared lock.
    pub fn len(&self) -> usize {
        self.read(|c| c.len())
    }

    /// Returns `true` if the collection is empty, under the shared lock.
    pub fn is_empty(&self) -> bool {
        self.read(|c| c.is_empty())
    }

    /// Returns `true` if the collection holds `item`, under the shared lock.
    pub fn contains(&self, item: &C::Item) -> bool {
        self.read(|c| c.contains(item))
    }

    /// Returns a snapshot of the elements, taken under the shared lock.
    pub fn to_vec(&self) -> Vec<C::Item>
    where
        C::Item: Clone,
    {
        self.read(|c| c.iter().cloned().collect())
    }
}

impl<C: CollectionMut> Guarded<C> {
    /// Adds `item` under the exclusive lock.
    pub fn add(&self, item: C::Item) -> bool {
        self.write(|c| c.add(item))
    }

    /// Removes one occurrence of `item` under the exclusive lock.
    pub fn remove(&self, item: &C::Item) -> bool {
        self.write(|c| c.remove(item))
    }

    /// Removes every element under the exclusive lock.
    pub fn clear(&self) {
        self.write(|c| c.clear())
    }

    /// Adds every item of `iter`, holding the exclusive lock once for the
    /// whole batch.
    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = C::Item>,
    {
        self.write(|c| {
            for item in iter {
                c.add(item);
            }
        })
    }
}

impl<C: Default> Default for Guarded<C> {
    fn default() -> Guarded<C> {
        Guarded::new(C::default())
    }
}

impl<C> From<C> for Guarded<C> {
    fn from(delegate: C) -> Guarded<C> {
        Guarded::new(delegate)
    }
}

impl<C: fmt::Debug> fmt::Debug for Guarded<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|c| f.debug_tuple("Guarded").field(c).finish())
    }
}

// Marks views as revoked when the granting call returns, including by
// unwinding.
struct Scope {
    alive: Rc<Cell<bool>>,
}

impl Scope {
    fn open() -> Scope {
        Scope {
            alive: Rc::new(Cell::new(true)),
        }
    }

    fn token(&self) -> Rc<Cell<bool>> {
        self.alive.clone()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

/// A read-only view of a [`Guarded`] collection, valid for the duration of a
/// [`with_read_lock`](Guarded::with_read_lock) call.
///
/// Mutating operations always fail with [`Error::UnsupportedOperation`], and
/// every operation fails with [`Error::UsageAfterScope`] once the view has
/// been revoked. Views cannot be sent to other threads.
pub struct ReadView<'g, C> {
    guarded: &'g Guarded<C>,
    alive: Rc<Cell<bool>>,
}

impl<'g, C> ReadView<'g, C> {
    /// Returns `true` until the granting call returns.
    pub fn is_valid(&self) -> bool {
        self.alive.get()
    }

    /// Returns a shared reference to the delegate.
    pub fn get(&self) -> Result<&C, Error> {
        self.check()?;
        // Safety: the view is alive, so the granting call still holds the
        // shared lock on this thread.
        Ok(unsafe { self.guarded.shared() })
    }

    fn check(&self) -> Result<(), Error> {
        if self.alive.get() {
            Ok(())
        } else {
            Err(Error::UsageAfterScope)
        }
    }

    fn reject(&self, op: &'static str) -> Error {
        match self.check() {
            Ok(()) => Error::UnsupportedOperation(op),
            Err(err) => err,
        }
    }
}

impl<'g, C: Collection> ReadView<'g, C> {
    pub fn len(&self) -> Result<usize, Error> {
        self.get().map(|c| c.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        self.get().map(|c| c.is_empty())
    }

    pub fn contains(&self, item: &C::Item) -> Result<bool, Error> {
        self.get().map(|c| c.contains(item))
    }

    /// Returns an iterator over the elements.
    ///
    /// The iterator borrows the view, so it cannot leave the scope either.
    pub fn iter(&self) -> Result<C::Iter<'_>, Error> {
        self.get().map(|c| c.iter())
    }

    pub fn to_vec(&self) -> Result<Vec<C::Item>, Error>
    where
        C::Item: Clone,
    {
        self.get().map(|c| c.iter().cloned().collect())
    }

    /// Always fails: the view is read-only.
    pub fn add(&self, _item: C::Item) -> Result<bool, Error> {
        Err(self.reject("add"))
    }

    /// Always fails: the view is read-only.
    pub fn remove(&self, _item: &C::Item) -> Result<bool, Error> {
        Err(self.reject("remove"))
    }

    /// Always fails: the view is read-only.
    pub fn clear(&self) -> Result<(), Error> {
        Err(self.reject("clear"))
    }
}

impl<C> fmt::Debug for ReadView<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadView")
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}

/// A mutable view of a [`Guarded`] collection, valid for the duration of a
/// [`with_write_lock`](Guarded::with_write_lock) call.
///
/// Every operation fails with [`Error::UsageAfterScope`] once the view has
/// been revoked. Views cannot be sent to other threads.
pub struct WriteView<'g, C> {
    guarded: &'g Guarded<C>,
    alive: Rc<Cell<bool>>,
}

impl<'g, C> WriteView<'g, C> {
    /// Returns `true` until the granting call returns.
    pub fn is_valid(&self) -> bool {
        self.alive.get()
    }

    /// Returns a shared reference to the delegate.
    pub fn get(&self) -> Result<&C, Error> {
        self.check()?;
        // Safety: the view is alive, so the granting call still holds the
        // exclusive lock, and `&self` excludes the `&mut` from `delegate`.
        Ok(unsafe { self.guarded.shared() })
    }

    /// Returns the real delegate.
    ///
    /// The reference borrows the view, so it cannot outlive the scope.
    pub fn delegate(&mut self) -> Result<&mut C, Error> {
        self.check()?;
        // Safety: the view is alive and borrowed uniquely, and the granting
        // call holds the exclusive lock.
        Ok(unsafe { self.guarded.exclusive() })
    }

    fn check(&self) -> Result<(), Error> {
        if self.alive.get() {
            Ok(())
        } else {
            Err(Error::UsageAfterScope)
        }
    }
}

impl<'g, C: Collection> WriteView<'g, C> {
    pub fn len(&self) -> Result<usize, Error> {
        self.get().map(|c| c.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        self.get().map(|c| c.is_empty())
    }

    pub fn contains(&self, item: &C::Item) -> Result<bool, Error> {
        self.get().map(|c| c.contains(item))
    }

    pub fn iter(&self) -> Result<C::Iter<'_>, Error> {
        self.get().map(|c| c.iter())
    }
}

impl<'g, C: CollectionMut> WriteView<'g, C> {
    pub fn add(&mut self, item: C::Item) -> Result<bool, Error> {
        self.delegate().map(|c| c.add(item))
    }

    pub fn remove(&mut self, item: &C::Item) -> Result<bool, Error> {
        self.delegate().map(|c| c.remove(item))
    }

    pub fn clear(&mut self) -> Result<(), Error> {
        self.delegate().map(|c| c.clear())
    }
}

impl<C> fmt::Debug for WriteView<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteView")
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}
