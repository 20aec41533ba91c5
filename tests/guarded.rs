use primcoll::{Error, Guarded, HashBag, I32Bag, I32Set};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

mod common;
use common::threads;

#[test]
fn scoped_write_counts() {
    // 100 keys, each incremented four times by its own thread.
    let bag = Guarded::new(I32Bag::new());

    thread::scope(|s| {
        for key in 1..=100 {
            let bag = &bag;
            s.spawn(move || {
                bag.with_write_lock(|mut view| {
                    view.add(key)?;
                    assert!(view.contains(&key)?);
                    view.add(key)?;
                    view.add(key)?;
                    view.add(key)?;
                    Ok::<_, Error>(())
                })
                .unwrap();
            });
        }
    });

    let bag = bag.into_inner();
    assert_eq!(bag.len(), 400);
    for key in 1..=100 {
        assert_eq!(bag.occurrences_of(key), 4);
    }
}

#[test]
fn escaped_read_view() {
    let set = Guarded::new(I32Set::from([1, 2, 3]));

    let view = set.with_read_lock(|view| {
        assert!(view.is_valid());
        assert_eq!(view.len(), Ok(3));
        view
    });

    assert!(!view.is_valid());
    assert_eq!(view.len(), Err(Error::UsageAfterScope));
    assert_eq!(view.contains(&1), Err(Error::UsageAfterScope));
    assert!(matches!(view.iter(), Err(Error::UsageAfterScope)));
    assert!(matches!(view.get(), Err(Error::UsageAfterScope)));
    assert_eq!(view.add(4), Err(Error::UsageAfterScope));

    // The lock was released, so writers are unaffected.
    assert!(set.add(4));
}

#[test]
fn escaped_write_view() {
    let set = Guarded::new(I32Set::new());

    let mut view = set.with_write_lock(|mut view| {
        view.add(1).unwrap();
        view
    });

    assert!(matches!(view.delegate(), Err(Error::UsageAfterScope)));
    assert_eq!(view.add(2), Err(Error::UsageAfterScope));
    assert_eq!(view.clear(), Err(Error::UsageAfterScope));
    assert_eq!(set.to_vec(), [1]);
}

#[test]
fn read_view_is_read_only() {
    let bag = Guarded::new(I32Bag::from([7]));

    bag.with_read_lock(|view| {
        assert_eq!(view.add(1), Err(Error::UnsupportedOperation("add")));
        assert_eq!(view.remove(&7), Err(Error::UnsupportedOperation("remove")));
        assert_eq!(view.clear(), Err(Error::UnsupportedOperation("clear")));

        let values: Vec<i32> = view.iter().unwrap().copied().collect();
        assert_eq!(values, [7]);
        assert_eq!(view.get().unwrap().occurrences_of(7), 1);
    });

    assert_eq!(bag.len(), 1);
}

#[test]
fn write_view_reaches_delegate() {
    let bag = Guarded::new(I32Bag::new());

    bag.with_write_lock(|mut view| {
        view.delegate().unwrap().add_occurrences(3, 10);
        assert!(view.remove(&3).unwrap());
        assert_eq!(view.len(), Ok(9));
    });

    assert_eq!(bag.len(), 9);
}

#[test]
fn general_element_delegate() {
    let words: Guarded<HashBag<String>> = Guarded::default();
    words.extend(["a", "b", "a"].map(String::from));

    assert_eq!(words.len(), 3);
    assert!(words.contains(&"a".to_string()));

    let a = words.with_read_lock(|view| view.get().map(|bag| bag.occurrences_of("a")));
    assert_eq!(a, Ok(2));
}

#[test]
fn write_inside_read_panics() {
    let set = Guarded::new(I32Set::new());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        set.with_read_lock(|_| {
            set.add(1);
        })
    }));
    assert!(result.is_err());

    // Both the read hold and the aborted scope were released.
    assert!(set.add(1));
    assert_eq!(set.len(), 1);
}

#[test]
fn read_inside_write_panics() {
    let set = Guarded::new(I32Set::new());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        set.with_write_lock(|_| set.len())
    }));
    assert!(result.is_err());
    assert_eq!(set.len(), 0);
}

#[test]
fn nested_reads_allowed() {
    let set = Guarded::new(I32Set::from([1]));

    let total = set.with_read_lock(|outer| {
        set.with_read_lock(|inner| inner.len().unwrap()) + outer.len().unwrap() + set.len()
    });
    assert_eq!(total, 3);
}

#[test]
fn distinct_wrappers_do_not_conflict() {
    let a = Guarded::new(I32Set::new());
    let b = Guarded::new(I32Set::new());

    a.with_read_lock(|_| {
        b.with_write_lock(|mut view| view.add(1).unwrap());
    });
    assert_eq!(b.len(), 1);
}

#[test]
fn no_partial_writes_visible() {
    const ROUNDS: usize = if cfg!(miri) { 10 } else { 2_000 };

    // Writers always add a pair of values together, so readers must never
    // observe an odd length.
    let set = Guarded::new(I32Set::new());
    let threads = threads().clamp(2, 4);
    let barrier = Barrier::new(threads);
    let odd = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        for t in 0..threads {
            let (set, barrier, odd, done) = (&set, &barrier, &odd, &done);
            s.spawn(move || {
                barrier.wait();
                if t == 0 {
                    for i in 0..ROUNDS as i32 {
                        set.with_write_lock(|mut view| {
                            view.add(i * 2).unwrap();
                            thread::yield_now();
                            view.add(i * 2 + 1).unwrap();
                        });
                    }
                    done.store(true, Ordering::Release);
                } else {
                    while !done.load(Ordering::Acquire) {
                        set.with_read_lock(|view| {
                            if view.len().unwrap() % 2 != 0 {
                                odd.fetch_add(1, Ordering::Relaxed);
                            }
                        });
                        thread::yield_now();
                    }
                }
            });
        }
    });

    assert_eq!(odd.load(Ordering::Relaxed), 0);
    assert_eq!(set.len(), ROUNDS * 2);
}

#[test]
fn get_mut_and_into_inner() {
    let mut set = Guarded::new(I32Set::new());
    set.get_mut().add(10);
    assert_eq!(format!("{:?}", set), "Guarded({10})");
    assert_eq!(set.into_inner(), I32Set::from([10]));
}
