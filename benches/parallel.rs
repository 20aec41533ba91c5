use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use primcoll::{BatchPlan, HashBag, I64Set, ParallelDriver};

const SIZE: usize = 50_000;

fn collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");
    let input: Vec<usize> = (0..SIZE).collect();
    let driver = ParallelDriver::new();

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let bag: HashBag<String> = input.iter().map(|i| i.to_string()).collect();
            black_box(bag);
        });
    });

    for batches in [1, 4, 16, 64] {
        let plan = BatchPlan::new(SIZE, batches).unwrap();

        group.bench_with_input(BenchmarkId::new("batches", batches), &plan, |b, plan| {
            b.iter(|| {
                let bag = driver
                    .collect_batches(
                        &input,
                        plan,
                        |i| i.to_string(),
                        |bag: &mut HashBag<String>, part| bag.extend(part),
                        HashBag::new(),
                    )
                    .unwrap();
                black_box(bag);
            });
        });
    }

    group.finish();
}

fn traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse");
    let set: I64Set = (0..SIZE as i64).collect();
    let driver = ParallelDriver::new();

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(set.iter().map(|n| n.wrapping_mul(31)).sum::<i64>()));
    });

    group.bench_function("driver", |b| {
        b.iter(|| {
            let sums = driver.collect_into(&set, |n| n.wrapping_mul(31), Vec::new()).unwrap();
            black_box(sums.iter().sum::<i64>())
        });
    });

    group.finish();
}

criterion_group!(benches, collect, traverse);
criterion_main!(benches);
