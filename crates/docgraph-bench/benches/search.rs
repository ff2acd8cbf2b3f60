use criterion::{Criterion, criterion_group, criterion_main};
use docgraph_bench::synthetic_payload;
use docgraph_graph::{BuildOptions, Graph};
use docgraph_search::{FilterState, LevelThreshold};
use std::hint::black_box;

fn bench_filter_refresh(c: &mut Criterion) {
    let graph = Graph::build(&synthetic_payload(3, 8), BuildOptions::default());

    c.bench_function("filter_refresh_substring", |b| {
        let mut filter = FilterState::new(LevelThreshold::UpTo(2));
        filter.set_query("chapter ch3.");
        b.iter(|| black_box(filter.refresh(black_box(&graph))))
    });

    c.bench_function("filter_refresh_narrowed", |b| {
        let mut filter = FilterState::new(LevelThreshold::All);
        filter.set_narrow_to_matches(true);
        filter.set_query("7");
        b.iter(|| black_box(filter.refresh(black_box(&graph))))
    });
}

criterion_group!(benches, bench_filter_refresh);
criterion_main!(benches);
