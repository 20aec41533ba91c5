use serde::de::{Error as _, SeqAccess, Visitor};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use std::fmt::{self, Formatter};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use crate::error::Error;
use crate::primitive::Primitive;
use crate::{BoolBag, BoolSet, Guarded, HashBag, PrimitiveBag, PrimitiveSet};

// Sets are sequences of values. Bags are sequences of `[value, count]` pairs.

impl<T> Serialize for PrimitiveSet<T>
where
    T: Primitive + Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T> Deserialize<'de> for PrimitiveSet<T>
where
    T: Primitive + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SetVisitor::<Self, T>::new())
    }
}

impl Serialize for BoolSet {
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for BoolSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SetVisitor::<Self, bool>::new())
    }
}

struct SetVisitor<C, T> {
    _marker: PhantomData<(C, T)>,
}

impl<C, T> SetVisitor<C, T> {
    fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<'de, C, T> Visitor<'de> for SetVisitor<C, T>
where
    C: Default + Extend<T>,
    T: Deserialize<'de>,
{
    type Value = C;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "a set")
    }

    fn visit_seq<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: SeqAccess<'de>,
    {
        let mut values = C::default();
        while let Some(value) = access.next_element()? {
            values.extend(Some(value));
        }

        Ok(values)
    }
}

impl<T> Serialize for PrimitiveBag<T>
where
    T: Primitive + Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_seq(self.distinct())
    }
}

impl<'de, T> Deserialize<'de> for PrimitiveBag<T>
where
    T: Primitive + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(BagVisitor::<Self, T>::new())
    }
}

impl Serialize for BoolBag {
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_seq(self.distinct())
    }
}

impl<'de> Deserialize<'de> for BoolBag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(BagVisitor::<Self, bool>::new())
    }
}

impl<T, S> Serialize for HashBag<T, S>
where
    T: Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_seq(self.distinct())
    }
}

impl<'de, T, S> Deserialize<'de> for HashBag<T, S>
where
    T: Deserialize<'de> + Hash + Eq,
    S: Default + BuildHasher,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(BagVisitor::<Self, T>::new())
    }
}

// A bag that can absorb a deserialized `[value, count]` pair. Counts come from
// untrusted input, so an overflowing total is an error rather than a panic.
trait Occurrences<T>: Default {
    fn len(&self) -> usize;

    fn add_unchecked(&mut self, value: T, count: usize);

    fn put(&mut self, value: T, count: usize) -> Result<(), Error> {
        if self.len().checked_add(count).is_none() {
            return Err(Error::MalformedInput("occurrence count overflow"));
        }

        self.add_unchecked(value, count);
        Ok(())
    }
}

impl<T: Primitive> Occurrences<T> for PrimitiveBag<T> {
    fn len(&self) -> usize {
        PrimitiveBag::len(self)
    }

    fn add_unchecked(&mut self, value: T, count: usize) {
        self.add_occurrences(value, count);
    }
}

impl Occurrences<bool> for BoolBag {
    fn len(&self) -> usize {
        BoolBag::len(self)
    }

    fn add_unchecked(&mut self, value: bool, count: usize) {
        self.add_occurrences(value, count);
    }
}

impl<T, S> Occurrences<T> for HashBag<T, S>
where
    T: Hash + Eq,
    S: Default + BuildHasher,
{
    fn len(&self) -> usize {
        HashBag::len(self)
    }

    fn add_unchecked(&mut self, value: T, count: usize) {
        self.add_occurrences(value, count);
    }
}

struct BagVisitor<B, T> {
    _marker: PhantomData<(B, T)>,
}

impl<B, T> BagVisitor<B, T> {
    fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<'de, B, T> Visitor<'de> for BagVisitor<B, T>
where
    B: Occurrences<T>,
    T: Deserialize<'de>,
{
    type Value = B;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "a sequence of [value, count] pairs")
    }

    fn visit_seq<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: SeqAccess<'de>,
    {
        let mut bag = B::default();
        while let Some((value, count)) = access.next_element::<(T, usize)>()? {
            bag.put(value, count).map_err(M::Error::custom)?;
        }

        Ok(bag)
    }
}

impl<C: Serialize> Serialize for Guarded<C> {
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        self.with_read_lock(|view| match view.get() {
            Ok(delegate) => delegate.serialize(serializer),
            Err(err) => Err(Sr::Error::custom(err)),
        })
    }
}

impl<'de, C: Deserialize<'de>> Deserialize<'de> for Guarded<C> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        C::deserialize(deserializer).map(Guarded::new)
    }
}

#[cfg(test)]
mod test {
    use crate::{BoolBag, BoolSet, F32Set, Guarded, HashBag, I32Bag, I64Bag};

    #[test]
    fn test_set() {
        let set = F32Set::from([0.5, -1.0, 3.25]);

        let serialized = serde_json::to_string(&set).unwrap();
        let deserialized: F32Set = serde_json::from_str(&serialized).unwrap();

        assert_eq!(set, deserialized);

        let bools = BoolSet::from([true]);
        assert_eq!(serde_json::to_string(&bools).unwrap(), "[true]");
    }

    #[test]
    fn test_bag() {
        let mut bag = I64Bag::new();
        bag.add_occurrences(-3, 2);
        bag.add(1 << 40);

        let serialized = serde_json::to_string(&bag).unwrap();
        let deserialized: I64Bag = serde_json::from_str(&serialized).unwrap();
        assert_eq!(bag, deserialized);

        let words: HashBag<String> = serde_json::from_str(r#"[["a", 2], ["b", 1]]"#).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words.occurrences_of("a"), 2);
    }

    #[test]
    fn test_bag_count_overflow() {
        let overflow = "[[1, 18446744073709551615], [2, 1]]";
        assert!(serde_json::from_str::<I32Bag>(overflow).is_err());

        let overflow = "[[false, 18446744073709551615], [true, 1]]";
        assert!(serde_json::from_str::<BoolBag>(overflow).is_err());

        let overflow = r#"[["a", 18446744073709551615], ["b", 1]]"#;
        assert!(serde_json::from_str::<HashBag<String>>(overflow).is_err());

        let bag: I32Bag = serde_json::from_str("[[1, 18446744073709551614], [2, 1]]").unwrap();
        assert_eq!(bag.len(), usize::MAX);
    }

    #[test]
    fn test_guarded() {
        let guarded = Guarded::new(I64Bag::from([4, 4]));

        let serialized = serde_json::to_string(&guarded).unwrap();
        assert_eq!(serialized, "[[4,2]]");

        let deserialized: Guarded<I64Bag> = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.into_inner(), I64Bag::from([4, 4]));
    }
}
