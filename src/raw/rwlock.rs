use std::cell::RefCell;
use std::hint;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use atomic_wait::{wait, wake_all};

/// This bit is set in the `state` of a `RwLock` while it is held exclusively.
const WRITER: u32 = 1 << 31;

/// This bit is set in the `state` of a `RwLock` just before a thread parks on it.
/// Whoever releases the lock and observes this bit must wake all parked threads.
const PARKED: u32 = 1 << 30;

/// The low bits of the `state` count the shared holders.
const READERS: u32 = PARKED - 1;

/// Number of spins before a thread parks.
const SPIN_LIMIT: u32 = 64;

// The mode a lock is held in by the current thread.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Read,
    Write,
}

thread_local! {
    // Locks held by the current thread, used to detect acquisitions that
    // would deadlock against the thread itself.
    static HELD: RefCell<Vec<(usize, Mode)>> = const { RefCell::new(Vec::new()) };
}

/// A non-reentrant reader/writer lock backed by futex-style waiting.
///
/// # State table:
///
/// WRITER | PARKED | READERS | Description
///   0    |   0    |    0    | Unlocked, nobody waiting.
/// -------+--------+---------+----------------------------------------------------
///   0    |   x    |   n>0   | Held shared by `n` readers.
/// -------+--------+---------+----------------------------------------------------
///   1    |   x    |    0    | Held exclusively by one writer.
/// -------+--------+---------+----------------------------------------------------
///   x    |   1    |    x    | One or more threads are parked or about to park.
///
/// Readers are admitted whenever no writer holds the lock, so a steady stream
/// of readers can delay a writer indefinitely.
///
/// A thread may take the read lock again while already holding it. Any other
/// nested acquisition by the same thread panics rather than deadlocking.
pub struct RwLock {
    state: AtomicU32,
}

impl RwLock {
    pub const fn new() -> RwLock {
        RwLock {
            state: AtomicU32::new(0),
        }
    }

    /// Acquires the lock in shared mode, blocking until no writer holds it.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds this lock in exclusive mode.
    #[inline]
    pub fn read(&self) -> ReadGuard<'_> {
        self.enter(Mode::Read);

        let state = self.state.load(Ordering::Relaxed);
        if state & WRITER != 0
            || state & READERS >= READERS - 1
            || self
                .state
                .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            self.read_slow();
        }

        ReadGuard {
            lock: self,
            _nosend: PhantomData,
        }
    }

    /// Acquires the lock in exclusive mode, blocking until all other holders
    /// release it.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds this lock in any mode.
    #[inline]
    pub fn write(&self) -> WriteGuard<'_> {
        self.enter(Mode::Write);

        if self
            .state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.write_slow();
        }

        WriteGuard {
            lock: self,
            _nosend: PhantomData,
        }
    }

    #[cold]
    fn read_slow(&self) {
        let mut spins = 0;
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            // Grab a shared hold if no writer has the lock, even if there are parked threads.
            if state & WRITER == 0 {
                assert!(state & READERS < READERS - 1, "too many readers");

                match self.state.compare_exchange_weak(
                    state,
                    state + 1,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(found) => state = found,
                }
                continue;
            }

            if self.spin(&mut spins, &mut state) {
                continue;
            }

            state = self.park(state);
        }
    }

    #[cold]
    fn write_slow(&self) {
        let mut spins = 0;
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            if state & (WRITER | READERS) == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state | WRITER,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(found) => state = found,
                }
                continue;
            }

            if self.spin(&mut spins, &mut state) {
                continue;
            }

            state = self.park(state);
        }
    }

    // Spins briefly, reloading the state. Returns `false` once the spin
    // budget is exhausted.
    #[inline]
    fn spin(&self, spins: &mut u32, state: &mut u32) -> bool {
        if *spins >= SPIN_LIMIT {
            return false;
        }

        *spins += 1;
        hint::spin_loop();
        *state = self.state.load(Ordering::Relaxed);
        true
    }

    // Sets the parked bit and sleeps until the state changes.
    //
    // Returns the reloaded state, or the conflicting state if the parked bit
    // could not be set.
    fn park(&self, state: u32) -> u32 {
        if state & PARKED == 0 {
            if let Err(found) = self.state.compare_exchange(
                state,
                state | PARKED,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                return found;
            }
        }

        wait(&self.state, state | PARKED);
        self.state.load(Ordering::Relaxed)
    }

    fn unlock_read(&self) {
        let prev = self.state.fetch_sub(1, Ordering::Release);
        debug_assert!(prev & READERS != 0);

        // The last reader out wakes any parked writers.
        if prev & READERS == 1 && prev & PARKED != 0 {
            self.state.fetch_and(!PARKED, Ordering::Relaxed);
            wake_all(&self.state);
        }
    }

    fn unlock_write(&self) {
        let prev = self.state.swap(0, Ordering::Release);
        debug_assert!(prev & WRITER != 0);

        if prev & PARKED != 0 {
            wake_all(&self.state);
        }
    }

    // Records that the current thread is acquiring this lock in `mode`,
    // panicking if that would deadlock.
    fn enter(&self, mode: Mode) {
        let addr = self as *const RwLock as usize;

        HELD.with(|held| {
            let mut held = held.borrow_mut();
            let conflict = held
                .iter()
                .any(|&(lock, held)| lock == addr && (mode == Mode::Write || held == Mode::Write));

            if conflict {
                drop(held);
                panic!("lock is already held by this thread, {mode:?} acquisition would deadlock");
            }

            held.push((addr, mode));
        });
    }

    fn exit(&self, mode: Mode) {
        let addr = self as *const RwLock as usize;

        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(i) = held.iter().rposition(|&entry| entry == (addr, mode)) {
                held.swap_remove(i);
            }
        });
    }

    /// Returns `true` if the lock is held by any thread, in any mode.
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & (WRITER | READERS) != 0
    }
}

impl Default for RwLock {
    fn default() -> RwLock {
        RwLock::new()
    }
}

/// A shared hold on a [`RwLock`], released on drop.
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
    // Must be released by the acquiring thread.
    _nosend: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_read();
        self.lock.exit(Mode::Read);
    }
}

/// An exclusive hold on a [`RwLock`], released on drop.
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
    _nosend: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_write();
        self.lock.exit(Mode::Write);
    }
}
