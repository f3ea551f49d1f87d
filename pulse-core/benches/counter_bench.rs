#[macro_use]
extern crate criterion;

use chrono::{NaiveDate, TimeDelta};
use criterion::{black_box, Criterion};

use pulse_core::{count_at, count_by_category_at, Event, EventSequence};

const CATEGORIES: [&str; 4] = ["X-Ray", "CT", "MRI", "US"];

fn bench_point_in_time_counts(c: &mut Criterion) {
    let midnight = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let mut group = c.benchmark_group("replay_counter");

    for size in [1_000usize, 100_000, 1_000_000] {
        let events = (0..size)
            .map(|i| {
                let offset = (i as i64 * 86_400) / size as i64;
                Event::new(midnight + TimeDelta::seconds(offset), CATEGORIES[i % 4])
            })
            .collect();
        let sequence = EventSequence::new(events).unwrap();
        let noon = midnight + TimeDelta::hours(12);

        group.bench_function(format!("count_at_{}", size), |b| {
            b.iter(|| count_at(black_box(&sequence), black_box(noon)))
        });
        group.bench_function(format!("count_by_category_at_{}", size), |b| {
            b.iter(|| count_by_category_at(black_box(&sequence), black_box(noon)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_point_in_time_counts);
criterion_main!(benches);
