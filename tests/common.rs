#![allow(dead_code)]

use primcoll::{Primitive, PrimitiveBag, PrimitiveSet};

// Run the test on different configurations of a `PrimitiveSet`.
pub fn with_set<T: Primitive>(mut test: impl FnMut(&dyn Fn() -> PrimitiveSet<T>)) {
    // Lazily allocated on first insert.
    test(&PrimitiveSet::new);

    // Presized, so small tests never rehash.
    if !cfg!(primcoll_stress) {
        test(&(|| PrimitiveSet::with_capacity(1024)));
    }

    // Emptied after heavy use, leaving a table full of tombstones to stress
    // slot reuse and compaction.
    test(&(|| {
        let mut set = PrimitiveSet::new();
        for value in churn() {
            set.add(value);
        }
        for value in churn() {
            set.remove(value);
        }
        set
    }));
}

// Run the test on different configurations of a `PrimitiveBag`.
pub fn with_bag<T: Primitive>(mut test: impl FnMut(&dyn Fn() -> PrimitiveBag<T>)) {
    test(&PrimitiveBag::new);

    if !cfg!(primcoll_stress) {
        test(&(|| PrimitiveBag::with_capacity(1024)));
    }

    test(&(|| {
        let mut bag = PrimitiveBag::new();
        for value in churn() {
            bag.add_occurrences(value, 2);
        }
        for value in churn() {
            bag.remove_occurrences(value, 2);
        }
        bag
    }));
}

// Values that are valid for every primitive kind.
fn churn<T: Primitive>() -> impl Iterator<Item = T> {
    (0..100).filter_map(T::from_bits)
}

// Prints a log message if `RUST_LOG=debug` is set.
#[macro_export]
macro_rules! debug {
    ($($x:tt)*) => {
        if std::env::var("RUST_LOG").as_deref() == Ok("debug") {
            println!($($x)*);
        }
    };
}

// Returns the number of threads to use for stress testing.
pub fn threads() -> usize {
    if cfg!(miri) {
        2
    } else {
        num_cpus::get_physical().next_power_of_two()
    }
}
