#![no_main]

use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;
use primcoll::{I32Bag, I32Set};
use std::collections::{HashMap as StdHashMap, HashSet as StdHashSet};

#[derive(Debug, Arbitrary)]
enum Operation<K> {
    Add(K),
    Remove(K),
    Contains(K),
    AddOccurrences(K, u8),
    RemoveOccurrences(K, u8),
    SetOccurrences(K, u8),
    Clear,
    Len,
    Roundtrip,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    operations: Vec<Operation<i32>>,
}

fn fuzz_collections(input: FuzzInput) {
    let mut std_set = StdHashSet::new();
    let mut std_bag: StdHashMap<i32, usize> = StdHashMap::new();
    let mut set = I32Set::new();
    let mut bag = I32Bag::new();

    for op in input.operations {
        match op {
            Operation::Add(k) => {
                assert_eq!(std_set.insert(k), set.add(k));

                let count = std_bag.entry(k).or_default();
                *count += 1;
                assert_eq!(*count == 1, bag.add(k));
            }
            Operation::Remove(k) => {
                assert_eq!(std_set.remove(&k), set.remove(k));

                let present = match std_bag.get_mut(&k) {
                    Some(count) if *count > 1 => {
                        *count -= 1;
                        true
                    }
                    Some(_) => std_bag.remove(&k).is_some(),
                    None => false,
                };
                assert_eq!(present, bag.remove(k));
            }
            Operation::Contains(k) => {
                assert_eq!(std_set.contains(&k), set.contains(k));
                assert_eq!(std_bag.contains_key(&k), bag.contains(k));
            }
            Operation::AddOccurrences(k, n) => {
                let n = n as usize;
                let count = std_bag.entry(k).or_default();
                *count += n;
                let expected = *count;
                if expected == 0 {
                    std_bag.remove(&k);
                }
                assert_eq!(expected, bag.add_occurrences(k, n));
            }
            Operation::RemoveOccurrences(k, n) => {
                let n = n as usize;
                let removed = match std_bag.get_mut(&k) {
                    Some(_) if n == 0 => false,
                    Some(count) if *count > n => {
                        *count -= n;
                        true
                    }
                    Some(_) => std_bag.remove(&k).is_some(),
                    None => false,
                };
                assert_eq!(removed, bag.remove_occurrences(k, n));
            }
            Operation::SetOccurrences(k, n) => {
                let n = n as usize;
                let previous = if n == 0 {
                    std_bag.remove(&k)
                } else {
                    std_bag.insert(k, n)
                };
                assert_eq!(previous.unwrap_or(0), bag.set_occurrences(k, n));
            }
            Operation::Clear => {
                std_set.clear();
                std_bag.clear();
                set.clear();
                bag.clear();
            }
            Operation::Len => {
                assert_eq!(std_set.len(), set.len());
                assert_eq!(std_bag.len(), bag.distinct_len());
                assert_eq!(std_bag.values().sum::<usize>(), bag.len());
            }
            Operation::Roundtrip => {
                assert_eq!(I32Set::from_bytes(&set.to_bytes()).as_ref(), Ok(&set));
                assert_eq!(I32Bag::from_bytes(&bag.to_bytes()).as_ref(), Ok(&bag));
            }
        }
    }

    // Final consistency checks
    assert_eq!(set, std_set);
    for (&k, &count) in &std_bag {
        assert_eq!(count, bag.occurrences_of(k));
    }
    assert_eq!(std_bag.len(), bag.distinct_len());
}

fuzz_target!(|data: FuzzInput| {
    fuzz_collections(data);
});
