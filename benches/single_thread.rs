use std::collections::{HashMap, HashSet};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primcoll::{I64Bag, I64Set};

const SIZE: usize = 10_000;

#[derive(Clone, Copy)]
struct RandomKeys {
    state: i64,
}

impl RandomKeys {
    fn new() -> Self {
        RandomKeys { state: 0 }
    }
}

impl Iterator for RandomKeys {
    type Item = i64;
    fn next(&mut self) -> Option<i64> {
        // Add 1 then multiply by some 32 bit prime.
        self.state = self.state.wrapping_add(1).wrapping_mul(3_787_392_781);
        Some(self.state)
    }
}

fn read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    group.bench_function("primcoll", |b| {
        let set: I64Set = RandomKeys::new().take(SIZE).collect();

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(set.contains(i)));
            }
        });
    });

    group.bench_function("std", |b| {
        let set: HashSet<i64> = RandomKeys::new().take(SIZE).collect();

        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                black_box(assert!(set.contains(&i)));
            }
        });
    });

    group.finish();
}

fn insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    group.bench_function("primcoll", |b| {
        b.iter(|| {
            let mut set = I64Set::new();
            for i in RandomKeys::new().take(SIZE) {
                black_box(set.add(i));
            }
        });
    });

    group.bench_function("std", |b| {
        b.iter(|| {
            let mut set = HashSet::<i64>::new();
            for i in RandomKeys::new().take(SIZE) {
                black_box(set.insert(i));
            }
        });
    });

    group.finish();
}

fn churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    group.bench_function("primcoll", |b| {
        let mut set = I64Set::new();
        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                set.add(i);
            }
            for i in RandomKeys::new().take(SIZE) {
                black_box(set.remove(i));
            }
        });
    });

    group.bench_function("std", |b| {
        let mut set = HashSet::<i64>::new();
        b.iter(|| {
            for i in RandomKeys::new().take(SIZE) {
                set.insert(i);
            }
            for i in RandomKeys::new().take(SIZE) {
                black_box(set.remove(&i));
            }
        });
    });

    group.finish();
}

fn count(c: &mut Criterion) {
    let mut group = c.benchmark_group("count");

    group.bench_function("primcoll", |b| {
        b.iter(|| {
            let mut bag = I64Bag::new();
            for i in RandomKeys::new().take(SIZE) {
                bag.add(i % 512);
            }
            black_box(bag.occurrences_of(7));
        });
    });

    group.bench_function("std", |b| {
        b.iter(|| {
            let mut bag = HashMap::<i64, usize>::new();
            for i in RandomKeys::new().take(SIZE) {
                *bag.entry(i % 512).or_default() += 1;
            }
            black_box(bag.get(&7).copied().unwrap_or(0));
        });
    });

    group.finish();
}

criterion_group!(benches, read, insert, churn, count);
criterion_main!(benches);
