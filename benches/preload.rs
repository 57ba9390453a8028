//! Benchmarks for the preload cache bookkeeping.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tooncast::page::PageDescriptor;
use tooncast::preload::{PreloadCache, PreloadConfig};

fn sequence(n: u32) -> Vec<PageDescriptor> {
    (0..n)
        .map(|i| PageDescriptor::new(format!("p{i}"), i + 1, format!("pages/{i}.png")))
        .collect()
}

/// Read straight through a long chapter, completing every load at once.
fn bench_read_through(c: &mut Criterion) {
    let seq = sequence(500);
    c.bench_function("read_through_500_pages", |b| {
        b.iter(|| {
            let mut cache: PreloadCache<u32> = PreloadCache::new(PreloadConfig {
                capacity: 20,
                ..PreloadConfig::default()
            });
            for index in 0..seq.len() {
                let mut pending = cache.preload_around(&seq, black_box(index));
                while let Some(request) = pending.pop() {
                    pending.extend(cache.finish_load(&request.src, Ok(0)));
                }
            }
            cache.len()
        });
    });
}

fn bench_wide_window(c: &mut Criterion) {
    let seq = sequence(500);
    c.bench_function("preload_window_60", |b| {
        b.iter(|| {
            let mut cache: PreloadCache<u32> = PreloadCache::new(PreloadConfig {
                ahead: 40,
                behind: 20,
                ..PreloadConfig::default()
            });
            cache.preload_around(&seq, black_box(250))
        });
    });
}

criterion_group!(benches, bench_read_through, bench_wide_window);
criterion_main!(benches);
