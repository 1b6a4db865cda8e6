use core::hash::BuildHasher;
use core::hint::black_box;

use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use rand::TryRngCore;
use rand::rngs::OsRng;
use siphasher::sip::SipHasher;
use trickle_map::HashMap as TrickleMap;

#[derive(Clone)]
struct SipState {
    k1: u64,
    k2: u64,
}

impl BuildHasher for SipState {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(self.k1, self.k2)
    }
}

impl SipState {
    fn random() -> Self {
        let mut rng = OsRng;
        Self {
            k1: rng.try_next_u64().unwrap_or(0x5132),
            k2: rng.try_next_u64().unwrap_or(0x1423),
        }
    }
}

const SIZES: &[usize] = &[1 << 10, 1 << 15];

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequential");
    let state = SipState::random();

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("trickle_map/{}", size), |b| {
            b.iter(|| {
                let mut map = TrickleMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });

        group.bench_function(format!("std/{}", size), |b| {
            b.iter(|| {
                let mut map = std::collections::HashMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut map = hashbrown::HashMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_lookup_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_hit");
    let state = SipState::random();

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let mut trickle = TrickleMap::with_hasher(state.clone());
        let mut std_map = std::collections::HashMap::with_hasher(state.clone());
        let mut brown = hashbrown::HashMap::with_hasher(state.clone());
        for k in 0..size as u64 {
            trickle.insert(k, k);
            std_map.insert(k, k);
            brown.insert(k, k);
        }

        group.bench_function(format!("trickle_map/{}", size), |b| {
            b.iter(|| {
                for k in 0..size as u64 {
                    black_box(trickle.get(&k));
                }
            })
        });

        group.bench_function(format!("std/{}", size), |b| {
            b.iter(|| {
                for k in 0..size as u64 {
                    black_box(std_map.get(&k));
                }
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                for k in 0..size as u64 {
                    black_box(brown.get(&k));
                }
            })
        });
    }

    group.finish();
}

/// Grow-heavy churn: interleaved inserts and removals that repeatedly
/// cross the resize thresholds, the case progressive migration exists
/// for.
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    let state = SipState::random();

    for &size in SIZES {
        group.throughput(Throughput::Elements(2 * size as u64));

        group.bench_function(format!("trickle_map/{}", size), |b| {
            b.iter(|| {
                let mut map = TrickleMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                    if k % 4 == 3 {
                        map.remove(&(k - 3));
                    }
                }
                for k in 0..size as u64 {
                    black_box(map.remove(&k));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("std/{}", size), |b| {
            b.iter(|| {
                let mut map = std::collections::HashMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                    if k % 4 == 3 {
                        map.remove(&(k - 3));
                    }
                }
                for k in 0..size as u64 {
                    black_box(map.remove(&k));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut map = hashbrown::HashMap::with_hasher(state.clone());
                for k in 0..size as u64 {
                    map.insert(k, k);
                    if k % 4 == 3 {
                        map.remove(&(k - 3));
                    }
                }
                for k in 0..size as u64 {
                    black_box(map.remove(&k));
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_lookup_hit,
    bench_churn
);
criterion_main!(benches);
