//! A compact binary encoding for the primitive containers.
//!
//! ```text
//! set:  tag:u8 | len:u64 | value * len
//! bag:  tag:u8 | distinct:u64 | (value, count:u64) * distinct
//! ```
//!
//! Integers are little-endian and each value takes the width of its kind.
//! Bag tags have the high bit set. The encoding preserves contents, not slot
//! layout.

use crate::boolean::{BoolBag, BoolSet};
use crate::primitive::Primitive;
use crate::{Error, PrimitiveBag, PrimitiveSet};

const BAG: u8 = 0x80;
const BOOL: u8 = 0;

impl<T: Primitive> PrimitiveSet<T> {
    /// Encodes the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use primcoll::CharSet;
    ///
    /// let set = CharSet::from(['a', 'z']);
    /// let bytes = set.to_bytes();
    /// assert_eq!(CharSet::from_bytes(&bytes), Ok(set));
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.len() * T::WIDTH);
        out.push(T::TAG);
        put_u64(&mut out, self.len() as u64);
        for &value in self.iter() {
            put_value(&mut out, value);
        }
        out
    }

    /// Decodes a set produced by [`to_bytes`](PrimitiveSet::to_bytes).
    ///
    /// Returns [`Error::MalformedInput`] if the input is for a different kind,
    /// is truncated, has trailing bytes, repeats a value, or holds an invalid
    /// value.
    pub fn from_bytes(bytes: &[u8]) -> Result<PrimitiveSet<T>, Error> {
        let mut reader = Reader::new(bytes);
        reader.tag(T::TAG)?;

        let len = reader.len(T::WIDTH)?;
        let mut set = PrimitiveSet::try_with_capacity(len)?;
        for _ in 0..len {
            if !set.add(reader.value()?) {
                return Err(Error::MalformedInput("duplicate value"));
            }
        }

        reader.finish()?;
        Ok(set)
    }
}

impl<T: Primitive> PrimitiveBag<T> {
    /// Encodes the bag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.distinct_len() * (T::WIDTH + 8));
        out.push(T::TAG | BAG);
        put_u64(&mut out, self.distinct_len() as u64);
        for (value, count) in self.distinct() {
            put_value(&mut out, value);
            put_u64(&mut out, count as u64);
        }
        out
    }

    /// Decodes a bag produced by [`to_bytes`](PrimitiveBag::to_bytes).
    ///
    /// Returns [`Error::MalformedInput`] under the same conditions as
    /// [`PrimitiveSet::from_bytes`], and also for zero occurrence counts or
    /// a total that does not fit in `usize`.
    pub fn from_bytes(bytes: &[u8]) -> Result<PrimitiveBag<T>, Error> {
        let mut reader = Reader::new(bytes);
        reader.tag(T::TAG | BAG)?;

        let distinct = reader.len(T::WIDTH + 8)?;
        let mut bag = PrimitiveBag::try_with_capacity(distinct)?;
        let mut total = 0usize;

        for _ in 0..distinct {
            let value = reader.value()?;
            let count = reader.count()?;

            total = total
                .checked_add(count)
                .ok_or(Error::MalformedInput("occurrence count overflow"))?;

            if bag.set_occurrences(value, count) != 0 {
                return Err(Error::MalformedInput("duplicate value"));
            }
        }

        reader.finish()?;
        Ok(bag)
    }
}

impl BoolSet {
    /// Encodes the set.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![BOOL];
        put_u64(&mut out, self.len() as u64);
        out.extend(self.iter().map(|&value| value as u8));
        out
    }

    /// Decodes a set produced by [`to_bytes`](BoolSet::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<BoolSet, Error> {
        let mut reader = Reader::new(bytes);
        reader.tag(BOOL)?;

        let len = reader.len(1)?;
        let mut set = BoolSet::new();
        for _ in 0..len {
            if !set.add(reader.bool()?) {
                return Err(Error::MalformedInput("duplicate value"));
            }
        }

        reader.finish()?;
        Ok(set)
    }
}

impl BoolBag {
    /// Encodes the bag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![BOOL | BAG];
        put_u64(&mut out, self.distinct_len() as u64);
        for (value, count) in self.distinct() {
            out.push(value as u8);
            put_u64(&mut out, count as u64);
        }
        out
    }

    /// Decodes a bag produced by [`to_bytes`](BoolBag::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<BoolBag, Error> {
        let mut reader = Reader::new(bytes);
        reader.tag(BOOL | BAG)?;

        let distinct = reader.len(9)?;
        let mut bag = BoolBag::new();
        let mut total = 0usize;

        for _ in 0..distinct {
            let value = reader.bool()?;
            let count = reader.count()?;

            total = total
                .checked_add(count)
                .ok_or(Error::MalformedInput("occurrence count overflow"))?;

            if bag.set_occurrences(value, count) != 0 {
                return Err(Error::MalformedInput("duplicate value"));
            }
        }

        reader.finish()?;
        Ok(bag)
    }
}

fn put_u64(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn put_value<T: Primitive>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(&value.to_bits().to_le_bytes()[..T::WIDTH]);
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.bytes.len() < n {
            return Err(Error::MalformedInput("unexpected end of input"));
        }

        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(head)
    }

    fn tag(&mut self, expected: u8) -> Result<(), Error> {
        match self.take(1)? {
            [tag] if *tag == expected => Ok(()),
            _ => Err(Error::MalformedInput("unexpected kind tag")),
        }
    }

    fn u64(&mut self) -> Result<u64, Error> {
        let mut buf = [0; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    // Reads an entry count, rejecting counts the remaining input cannot hold.
    fn len(&mut self, entry_width: usize) -> Result<usize, Error> {
        let len = usize::try_from(self.u64()?)
            .map_err(|_| Error::MalformedInput("length does not fit in usize"))?;

        match len.checked_mul(entry_width) {
            Some(needed) if needed <= self.bytes.len() => Ok(len),
            _ => Err(Error::MalformedInput("unexpected end of input")),
        }
    }

    fn count(&mut self) -> Result<usize, Error> {
        match usize::try_from(self.u64()?) {
            Ok(0) => Err(Error::MalformedInput("zero occurrence count")),
            Ok(count) => Ok(count),
            Err(_) => Err(Error::MalformedInput("occurrence count overflow")),
        }
    }

    fn value<T: Primitive>(&mut self) -> Result<T, Error> {
        let mut buf = [0; 8];
        buf[..T::WIDTH].copy_from_slice(self.take(T::WIDTH)?);
        T::from_bits(u64::from_le_bytes(buf)).ok_or(Error::MalformedInput("invalid value"))
    }

    fn bool(&mut self) -> Result<bool, Error> {
        match self.take(1)? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::MalformedInput("invalid value")),
        }
    }

    fn finish(self) -> Result<(), Error> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(Error::MalformedInput("trailing bytes"))
        }
    }
}
