use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mimic_core::{deep_copy, DynValue};
use std::collections::HashMap;

mimic_core::reflect_struct! {
    pub struct Account {
        pub id: i64,
        secret: String,
        pub tags: Vec<String>,
        pub meta: HashMap<String, i64>,
    }
}

fn sample_account() -> Account {
    let mut meta = HashMap::new();
    for i in 0..8 {
        meta.insert(format!("meta-{i}"), i);
    }
    Account {
        id: 7,
        secret: "s3cret".to_string(),
        tags: (0..8).map(|i| format!("tag-{i}")).collect(),
        meta,
    }
}

fn bench_scalars(c: &mut Criterion) {
    c.bench_function("copy_i64", |b| {
        b.iter(|| deep_copy(black_box(&123_456_789i64)));
    });

    let text = "a moderately sized heap string".to_string();
    c.bench_function("copy_string", |b| {
        b.iter(|| deep_copy(black_box(&text)));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let account = sample_account();
    c.bench_function("copy_account", |b| {
        b.iter(|| deep_copy(black_box(&account)));
    });
}

fn bench_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequences");

    for len in [16usize, 256, 4096] {
        let ints: Vec<i64> = (0..len as i64).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("ints", len), &ints, |b, v| {
            b.iter(|| deep_copy(black_box(v)));
        });

        let strings: Vec<String> = (0..len).map(|i| format!("item-{i}")).collect();
        group.bench_with_input(BenchmarkId::new("strings", len), &strings, |b, v| {
            b.iter(|| deep_copy(black_box(v)));
        });
    }

    group.finish();
}

fn bench_maps(c: &mut Criterion) {
    let mut group = c.benchmark_group("maps");

    for len in [16usize, 256] {
        let map: HashMap<String, Vec<i64>> = (0..len)
            .map(|i| (format!("key-{i}"), vec![i as i64; 4]))
            .collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("string_to_vec", len), &map, |b, m| {
            b.iter(|| deep_copy(black_box(m)));
        });
    }

    group.finish();
}

fn bench_polymorphic(c: &mut Criterion) {
    let slot = DynValue::new(sample_account());
    c.bench_function("copy_dyn_account", |b| {
        b.iter(|| mimic_core::copy_dyn(black_box(&slot)));
    });
}

criterion_group!(
    benches,
    bench_scalars,
    bench_aggregate,
    bench_sequences,
    bench_maps,
    bench_polymorphic
);

criterion_main!(benches);
