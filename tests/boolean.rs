use primcoll::{BoolBag, BoolSet, Collection, CollectionMut, Error, Guarded};

#[test]
fn set_holds_at_most_two() {
    let mut set = BoolSet::new();
    assert!(set.add(true));
    assert!(!set.add(true));
    assert_eq!(set.len(), 1);

    assert!(set.add(false));
    assert!(!set.add(false));
    assert_eq!(set.len(), 2);
    assert!(set.contains(true) && set.contains(false));
}

#[test]
fn set_iterates_false_first() {
    let set = BoolSet::from([true, false]);
    assert_eq!(set.iter().copied().collect::<Vec<_>>(), [false, true]);
    assert_eq!(set.iter().len(), 2);

    let only_true = BoolSet::from([true]);
    assert_eq!(only_true.to_vec(), [true]);
    assert_eq!(BoolSet::new().iter().next(), None);
}

#[test]
fn set_remove_clears_one_value() {
    let mut set = BoolSet::from([true, false]);
    assert!(set.remove(true));
    assert!(!set.contains(true));
    assert!(set.contains(false));
    assert!(!set.remove(true));

    set.clear();
    assert!(set.is_empty());
}

#[test]
fn set_equality_and_hash() {
    let a = BoolSet::from([false, true]);
    let b: BoolSet = [true, true, false].into_iter().collect();
    assert_eq!(a, b);
    assert_eq!(a.hash_code(), b.hash_code());
    assert_ne!(a, BoolSet::from([true]));
    assert_eq!(format!("{:?}", a), "{false, true}");
}

#[test]
fn bag_counts() {
    let mut bag = BoolBag::new();
    assert!(bag.add(true));
    assert!(!bag.add(true));
    assert_eq!(bag.add_occurrences(false, 3), 3);

    assert_eq!(bag.len(), 5);
    assert_eq!(bag.distinct_len(), 2);
    assert_eq!(bag.occurrences_of(true), 2);
    assert_eq!(bag.to_vec(), [false, false, false, true, true]);

    assert!(bag.remove(false));
    assert_eq!(bag.occurrences_of(false), 2);
    assert!(bag.remove_occurrences(false, 9));
    assert!(!bag.contains(false));
    assert_eq!(bag.distinct().collect::<Vec<_>>(), [(true, 2)]);
}

#[test]
fn bag_equality_and_hash() {
    let a = BoolBag::from([true, false, true]);
    let b = BoolBag::from([true, true, false]);
    assert_eq!(a, b);
    assert_eq!(a.hash_code(), b.hash_code());
    assert_ne!(a, BoolBag::from([true, false]));
}

#[test]
fn codec() {
    let set = BoolSet::from([false]);
    assert_eq!(BoolSet::from_bytes(&set.to_bytes()), Ok(set));

    let bag = BoolBag::from([true, false, false]);
    assert_eq!(BoolBag::from_bytes(&bag.to_bytes()), Ok(bag));

    assert_eq!(
        BoolSet::from_bytes(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 2]),
        Err(Error::MalformedInput("invalid value"))
    );
}

#[test]
fn guarded_bool_set() {
    let set = Guarded::new(BoolSet::new());
    assert!(set.add(true));
    assert!(set.contains(&true));

    set.with_read_lock(|view| {
        assert_eq!(view.len(), Ok(1));
        assert_eq!(view.add(false), Err(Error::UnsupportedOperation("add")));
    });
}

// Exercises the boolean containers through the shared capability traits.
fn roundtrip<C>(mut collection: C) -> usize
where
    C: CollectionMut<Item = bool>,
{
    collection.add(true);
    collection.add(false);
    collection.add(true);
    collection.remove(&false);
    collection.iter().count()
}

#[test]
fn capability_traits() {
    assert_eq!(roundtrip(BoolSet::new()), 1);
    assert_eq!(roundtrip(BoolBag::new()), 2);
    assert!(Collection::contains(&BoolSet::from([true]), &true));
}
