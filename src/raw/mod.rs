mod probe;
pub mod rwlock;

use std::mem;

use crate::primitive::Primitive;
use crate::Error;
use probe::Probe;

// The state of a slot.
//
// Primitive kinds have no spare bit pattern to mark a slot as unused, so
// slot state is tracked out-of-band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Meta {
    // The slot has never held a value since the last rehash.
    Empty,
    // The slot holds a live value.
    Occupied,
    // The slot held a value that was removed. Probe sequences must continue
    // past it.
    Tombstone,
}

// The result of probing for a value.
#[derive(Debug, PartialEq, Eq)]
pub enum Slot {
    // The value lives at this index.
    Found(usize),
    // The value is absent and may be inserted at this index.
    Vacant(usize),
}

// An open-addressing table of primitive values, with a per-slot payload `P`.
//
// Sets use `P = ()`, which never allocates. Bags store occurrence counts.
#[derive(Clone)]
pub struct RawTable<T, P> {
    values: Box<[T]>,
    meta: Box<[Meta]>,
    payload: Box<[P]>,
    occupied: usize,
    tombstones: usize,
}

impl<T, P> RawTable<T, P>
where
    T: Primitive,
    P: Copy + Default,
{
    // Creates an empty table that does not allocate.
    pub fn new() -> RawTable<T, P> {
        RawTable {
            values: Box::new([]),
            meta: Box::new([]),
            payload: Box::new([]),
            occupied: 0,
            tombstones: 0,
        }
    }

    // Creates a table that can hold `capacity` values without rehashing.
    pub fn with_capacity(capacity: usize) -> Result<RawTable<T, P>, Error> {
        let len = probe::slots_for(capacity, T::MAX_LOAD)
            .ok_or(Error::IllegalArgument("capacity overflow"))?;

        Ok(RawTable::alloc(len))
    }

    fn alloc(len: usize) -> RawTable<T, P> {
        RawTable {
            values: vec![T::default(); len].into_boxed_slice(),
            meta: vec![Meta::Empty; len].into_boxed_slice(),
            payload: vec![P::default(); len].into_boxed_slice(),
            occupied: 0,
            tombstones: 0,
        }
    }

    // The number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    // The number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.meta.len()
    }

    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    #[inline]
    pub fn value(&self, i: usize) -> &T {
        &self.values[i]
    }

    #[inline]
    pub fn payload(&self, i: usize) -> &P {
        &self.payload[i]
    }

    #[inline]
    pub fn payload_mut(&mut self, i: usize) -> &mut P {
        &mut self.payload[i]
    }

    #[inline]
    pub fn is_occupied(&self, i: usize) -> bool {
        self.meta[i] == Meta::Occupied
    }

    // Returns the slot holding `value`, if any.
    pub fn find(&self, value: T) -> Option<usize> {
        if self.occupied == 0 {
            return None;
        }

        let (mut probe, limit) = Probe::start(value.hash(), self.capacity());

        while probe.len < limit {
            match self.meta[probe.i] {
                // encountered an empty slot, the value cannot exist further along the chain
                Meta::Empty => return None,
                Meta::Occupied if self.values[probe.i].key_eq(value) => return Some(probe.i),
                _ => {}
            }

            probe.next();
        }

        None
    }

    // Locates `value`, or the slot it should be inserted into.
    //
    // The table must have at least one slot. Tombstones along the probe
    // chain are preferred over the terminating empty slot.
    fn locate(&self, value: T) -> Slot {
        let (mut probe, limit) = Probe::start(value.hash(), self.capacity());
        let mut tombstone = None;

        while probe.len < limit {
            match self.meta[probe.i] {
                Meta::Empty => return Slot::Vacant(tombstone.unwrap_or(probe.i)),
                Meta::Occupied if self.values[probe.i].key_eq(value) => {
                    return Slot::Found(probe.i)
                }
                Meta::Tombstone if tombstone.is_none() => tombstone = Some(probe.i),
                _ => {}
            }

            probe.next();
        }

        match tombstone {
            Some(i) => Slot::Vacant(i),
            // the load factor is always below one
            None => unreachable!("probe sequence exhausted a full table"),
        }
    }

    // Locates `value`, making room for an insertion if it is absent.
    //
    // A returned `Slot::Vacant` index may be passed directly to `occupy`.
    pub fn entry(&mut self, value: T) -> Slot {
        if self.capacity() == 0 {
            self.rehash(probe::MIN_LEN);
        }

        match self.locate(value) {
            Slot::Found(i) => Slot::Found(i),
            // reusing a tombstone does not raise the load
            Slot::Vacant(i) if self.meta[i] == Meta::Tombstone => Slot::Vacant(i),
            Slot::Vacant(i) if !self.over_limit(1) => Slot::Vacant(i),
            Slot::Vacant(_) => {
                self.grow();
                self.locate(value)
            }
        }
    }

    // Stores `value` in a vacant slot returned by `entry`.
    pub fn occupy(&mut self, i: usize, value: T, payload: P) {
        match self.meta[i] {
            Meta::Empty => {}
            Meta::Tombstone => self.tombstones -= 1,
            Meta::Occupied => unreachable!("occupying a live slot"),
        }

        self.meta[i] = Meta::Occupied;
        self.values[i] = value;
        self.payload[i] = payload;
        self.occupied += 1;
    }

    // Removes the value at slot `i`, leaving a tombstone so that probe
    // chains passing through the slot stay intact.
    pub fn vacate(&mut self, i: usize) -> P {
        debug_assert_eq!(self.meta[i], Meta::Occupied);

        self.meta[i] = Meta::Tombstone;
        self.occupied -= 1;
        self.tombstones += 1;
        mem::take(&mut self.payload[i])
    }

    // Removes all values, keeping the allocation.
    pub fn clear(&mut self) {
        self.meta.fill(Meta::Empty);
        self.payload.fill(P::default());
        self.occupied = 0;
        self.tombstones = 0;
    }

    // Ensures `additional` more values can be inserted without a rehash.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        if !self.over_limit(additional) {
            return Ok(());
        }

        let needed = self
            .occupied
            .checked_add(additional)
            .ok_or(Error::IllegalArgument("capacity overflow"))?;
        let len = probe::slots_for(needed, T::MAX_LOAD)
            .ok_or(Error::IllegalArgument("capacity overflow"))?;

        // never shrink
        self.rehash(len.max(self.capacity()));
        Ok(())
    }

    // Returns `true` if inserting `additional` values into empty slots
    // would push the used slot count over the load limit.
    #[inline]
    fn over_limit(&self, additional: usize) -> bool {
        let (num, den) = T::MAX_LOAD;
        let used = (self.occupied + self.tombstones).saturating_add(additional);
        used.saturating_mul(den) > self.capacity().saturating_mul(num)
    }

    // Makes room for a single insertion.
    //
    // If live values alone fill at most half of the load limit, tombstones
    // are the problem and the table is rebuilt at the same capacity.
    // Otherwise the capacity doubles.
    #[cold]
    fn grow(&mut self) {
        let (num, den) = T::MAX_LOAD;
        let capacity = self.capacity();

        let len = if (self.occupied + 1) * den * 2 > capacity * num {
            capacity.checked_mul(2).expect("capacity overflow")
        } else {
            capacity
        };

        self.rehash(len);
    }

    // Reinserts every live value into a fresh table of `len` slots.
    // Tombstones are dropped.
    fn rehash(&mut self, len: usize) {
        let mut table = RawTable::alloc(len);

        for i in self.occupied_in(0, self.capacity()) {
            let value = self.values[i];
            let (mut probe, _) = Probe::start(value.hash(), len);

            while table.meta[probe.i] != Meta::Empty {
                probe.next();
            }

            table.occupy(probe.i, value, self.payload[i]);
        }

        tracing::trace!(
            from = self.capacity(),
            to = len,
            live = self.occupied,
            dropped_tombstones = self.tombstones,
            "rehashed primitive table"
        );

        *self = table;
    }

    // Returns an iterator over the indices of live slots in `[start, end)`.
    #[inline]
    pub fn occupied_in(&self, start: usize, end: usize) -> Occupied<'_> {
        debug_assert!(start <= end && end <= self.capacity());

        Occupied {
            meta: &self.meta[start..end],
            offset: start,
            i: 0,
        }
    }
}

impl<T, P> Default for RawTable<T, P>
where
    T: Primitive,
    P: Copy + Default,
{
    fn default() -> Self {
        RawTable::new()
    }
}

// An iterator over the indices of live slots in a range.
#[derive(Clone)]
pub struct Occupied<'a> {
    meta: &'a [Meta],
    offset: usize,
    i: usize,
}

impl Iterator for Occupied<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.i < self.meta.len() {
            let i = self.i;
            self.i += 1;

            if self.meta[i] == Meta::Occupied {
                return Some(self.offset + i);
            }
        }

        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.meta.len() - self.i))
    }
}

// Walks the live slots of a table while allowing the current slot to be
// removed.
//
// Removal only ever turns the current slot into a tombstone, and a table
// never rehashes on removal, so the slot index stays a valid position.
pub struct RawCursor {
    // The next slot to inspect.
    next: usize,
    // The slot most recently returned, if it has not been removed.
    current: Option<usize>,
}

impl RawCursor {
    pub fn new() -> RawCursor {
        RawCursor {
            next: 0,
            current: None,
        }
    }

    // Advances to the next live slot.
    pub fn advance<T, P>(&mut self, table: &RawTable<T, P>) -> Option<usize>
    where
        T: Primitive,
        P: Copy + Default,
    {
        let next = table.occupied_in(self.next, table.capacity()).next();

        match next {
            Some(i) => {
                self.next = i + 1;
                self.current = Some(i);
            }
            None => {
                self.next = table.capacity();
                self.current = None;
            }
        }

        next
    }

    // The slot most recently returned by `advance`, if still live.
    #[inline]
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    // Forgets the current slot, after it has been vacated.
    #[inline]
    pub fn release(&mut self) {
        self.current = None;
    }
}
