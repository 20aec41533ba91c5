use primcoll::{BatchPlan, Error, Guarded, HashBag, I32Bag, I64Set, ParallelDriver};

use rand::prelude::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

mod common;
use common::threads;

fn driver() -> ParallelDriver {
    ParallelDriver::builder()
        .threads(threads().max(2))
        .build()
        .unwrap()
}

#[test]
fn batch_coverage() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..if cfg!(miri) { 20 } else { 2_000 } {
        let n = rng.gen_range(0..5_000);
        let desired = rng.gen_range(1..6_000);
        let plan = BatchPlan::new(n, desired).unwrap();

        assert_eq!(plan.len(), n);
        assert_eq!(plan.batch_count(), desired.min(n));

        let mut next = 0;
        let mut sizes = Vec::new();
        for range in plan.ranges() {
            assert_eq!(range.start, next, "batches must be contiguous");
            assert!(!range.is_empty(), "empty batch for n = {n}");
            sizes.push(range.len());
            next = range.end;
        }
        assert_eq!(next, n);

        if let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) {
            assert!(max - min <= 1);
        }
    }
}

#[test]
fn zero_batches_rejected() {
    assert_eq!(
        BatchPlan::new(10, 0),
        Err(Error::IllegalArgument("batch count must be positive"))
    );
}

#[test]
fn collect_equivalence() {
    const LEN: usize = if cfg!(miri) { 500 } else { 50_000 };

    let input: Vec<usize> = (0..LEN).collect();
    let expected: HashBag<String> = input.iter().map(|i| i.to_string()).collect();
    let driver = driver();

    let mut counts = vec![1, 2, 3, 7, 64, 1000, LEN - 1, LEN];
    let mut rng = StdRng::seed_from_u64(7);
    counts.extend((0..4).map(|_| rng.gen_range(1..=LEN)));

    for desired in counts {
        let plan = BatchPlan::new(LEN, desired).unwrap();
        let got = driver
            .collect_batches(
                &input,
                &plan,
                |i| i.to_string(),
                |bag: &mut HashBag<String>, part| bag.extend(part),
                HashBag::new(),
            )
            .unwrap();

        assert_eq!(got, expected, "desired batch count {desired}");
    }
}

#[test]
fn collect_ordered_preserves_order() {
    let input: Vec<u32> = (0..10_007).collect();
    let driver = driver();

    for desired in [1, 3, 16, 10_007] {
        let plan = BatchPlan::new(input.len(), desired).unwrap();
        let doubled = driver.collect_ordered(&input, &plan, |n| n * 2).unwrap();
        assert_eq!(doubled, input.iter().map(|n| n * 2).collect::<Vec<_>>());
    }
}

#[test]
fn every_batch_runs_once() {
    let input = vec![1u64; 1000];
    let plan = BatchPlan::new(input.len(), 37).unwrap();
    let seen = Mutex::new(vec![0; plan.batch_count()]);
    let sum = AtomicUsize::new(0);

    driver()
        .for_each_batch(&input, &plan, |batch| {
            assert_eq!(plan.range(batch.index()), Ok(batch.range()));
            seen.lock().unwrap()[batch.index()] += 1;

            batch.for_each(|&n| {
                sum.fetch_add(n as usize, Ordering::Relaxed);
            });
            Ok::<_, Error>(())
        })
        .unwrap();

    assert!(seen.into_inner().unwrap().iter().all(|&n| n == 1));
    assert_eq!(sum.load(Ordering::Relaxed), 1000);
}

#[derive(Debug, PartialEq)]
enum JobError {
    Failed(usize),
    Driver(Error),
}

impl From<Error> for JobError {
    fn from(err: Error) -> JobError {
        JobError::Driver(err)
    }
}

#[test]
fn failures_wait_for_all_batches() {
    let input: Vec<usize> = (0..100).collect();
    let plan = BatchPlan::new(input.len(), 10).unwrap();
    let finished = AtomicUsize::new(0);

    let result = driver().for_each_batch(&input, &plan, |batch| {
        finished.fetch_add(1, Ordering::SeqCst);
        match batch.index() {
            3 | 6 => Err(JobError::Failed(batch.index())),
            _ => Ok(()),
        }
    });

    // The lowest failing batch wins, and no batch was skipped.
    assert_eq!(result, Err(JobError::Failed(3)));
    assert_eq!(finished.load(Ordering::SeqCst), 10);
}

#[test]
fn plan_must_match_collection() {
    let input = vec![0u8; 5];
    let plan = BatchPlan::new(6, 2).unwrap();

    let result = driver().for_each_batch(&input, &plan, |_| Ok::<_, JobError>(()));
    assert_eq!(
        result,
        Err(JobError::Driver(Error::IndexOutOfRange { index: 6, len: 5 }))
    );
}

#[test]
fn worker_panics_propagate() {
    let input: Vec<usize> = (0..64).collect();
    let plan = BatchPlan::new(input.len(), 8).unwrap();
    let finished = AtomicUsize::new(0);
    let driver = driver();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        driver.for_each_batch(&input, &plan, |batch| {
            if batch.index() == 2 {
                panic!("worker failed");
            }
            finished.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(())
        })
    }));

    assert!(result.is_err());
    assert_eq!(finished.load(Ordering::SeqCst), 7);
}

#[test]
fn empty_collection() {
    let input: Vec<i32> = Vec::new();
    let plan = BatchPlan::new(0, 4).unwrap();

    let out = driver().collect_ordered(&input, &plan, |n| *n).unwrap();
    assert!(out.is_empty());

    let bag = driver().collect_into(&input, |n| *n, I32Bag::new()).unwrap();
    assert!(bag.is_empty());
}

#[test]
fn primitive_tables_as_source() {
    let set: I64Set = (0..20_000).collect();
    let driver = driver();

    // Tables are split by slot, so the plan covers the capacity.
    let plan = BatchPlan::new(set.capacity(), 12).unwrap();
    let sum = driver
        .collect_batches(
            &set,
            &plan,
            |&n| n,
            |sum: &mut i64, part| *sum += part.iter().sum::<i64>(),
            0,
        )
        .unwrap();
    assert_eq!(sum, (0..20_000).sum::<i64>());

    let mut bag = I32Bag::new();
    for i in 0..1000 {
        bag.add_occurrences(i, 3);
    }
    let copy = driver.collect_into(&bag, |&n| n, I32Bag::new()).unwrap();
    assert_eq!(copy, bag);
}

#[test]
fn guarded_source() {
    let bag = Guarded::new(I32Bag::from([1, 2, 2, 3]));
    let driver = driver();

    let strings: HashBag<String> = driver
        .collect_into(&bag, |n| n.to_string(), HashBag::new())
        .unwrap();
    assert_eq!(strings.len(), 4);
    assert_eq!(strings.occurrences_of("2"), 2);

    let count = AtomicUsize::new(0);
    driver
        .for_each(&bag, |_| {
            count.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    assert_eq!(count.load(Ordering::Relaxed), 4);
}

#[test]
fn global_pool() {
    let input: Vec<u8> = (0..=255).collect();
    let driver = ParallelDriver::new();
    let total = driver.collect_into(&input, |&b| b as u32, Vec::new()).unwrap();
    assert_eq!(total.iter().sum::<u32>(), (0..=255).sum());
}
