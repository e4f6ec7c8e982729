use alloc::format;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use probe_set::HashSet as ProbeHashSet;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

extern crate alloc;

#[derive(Clone, Default)]
struct SipBuilder;

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new()
    }
}

trait BenchKey: Clone + Hash + Eq {
    fn new(key: u64) -> Self;
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct SmallKey(u64);

impl BenchKey for SmallKey {
    fn new(key: u64) -> Self {
        black_box(Self(key))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct StringKey(String);

impl BenchKey for StringKey {
    fn new(key: u64) -> Self {
        black_box(Self(format!("key_{:016X}", key)))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct LargeKey {
    key: String,
    payload: [u8; 256],
}

impl BenchKey for LargeKey {
    fn new(key: u64) -> Self {
        let mut payload = [0u8; 256];
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte = ((key >> ((i % 8) * 8)) & 0xFF) as u8;
        }
        black_box(Self {
            key: format!("key_{:064b}", key),
            payload,
        })
    }
}

/// The operations every benchmarked set exposes, so one workload body can
/// drive all of them.
trait BenchSet<K>: Sized {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn add(&mut self, key: K) -> bool;
    fn has(&self, key: &K) -> bool;
    fn take_out(&mut self, key: &K) -> bool;
}

impl<K: BenchKey> BenchSet<K> for ProbeHashSet<K, SipBuilder> {
    const NAME: &'static str = "probe_set";

    fn with_capacity(capacity: usize) -> Self {
        ProbeHashSet::with_capacity_and_hasher(capacity, SipBuilder)
    }

    fn add(&mut self, key: K) -> bool {
        self.insert(key)
    }

    fn has(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn take_out(&mut self, key: &K) -> bool {
        self.remove(key)
    }
}

impl<K: BenchKey> BenchSet<K> for hashbrown::HashSet<K, SipBuilder> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        hashbrown::HashSet::with_capacity_and_hasher(capacity, SipBuilder)
    }

    fn add(&mut self, key: K) -> bool {
        self.insert(key)
    }

    fn has(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn take_out(&mut self, key: &K) -> bool {
        self.remove(key)
    }
}

impl<K: BenchKey> BenchSet<K> for std::collections::HashSet<K, SipBuilder> {
    const NAME: &'static str = "std";

    fn with_capacity(capacity: usize) -> Self {
        std::collections::HashSet::with_capacity_and_hasher(capacity, SipBuilder)
    }

    fn add(&mut self, key: K) -> bool {
        self.insert(key)
    }

    fn has(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn take_out(&mut self, key: &K) -> bool {
        self.remove(key)
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_keys<K: BenchKey>(count: usize) -> Vec<K> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| K::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn sequential_keys<K: BenchKey>(count: usize) -> Vec<K> {
    (0..count as u64).map(K::new).collect()
}

fn filled<K: BenchKey, S: BenchSet<K>>(keys: &[K]) -> S {
    let mut set = S::with_capacity(0);
    for key in keys.iter().cloned() {
        set.add(key);
    }
    set
}

fn insert_random_into<K: BenchKey, S: BenchSet<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    keys: &[K],
    preallocate: bool,
) {
    group.bench_function(S::NAME, |b| {
        b.iter_batched(
            || {
                let mut keys = keys.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                keys
            },
            |keys| {
                let mut set = S::with_capacity(if preallocate { keys.len() } else { 0 });
                for key in keys {
                    black_box(set.add(key));
                }
                black_box(set)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_random<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("insert_random_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        insert_random_into::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &keys, false);
        insert_random_into::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &keys, false);
        insert_random_into::<K, std::collections::HashSet<K, SipBuilder>>(
            &mut group, &keys, false,
        );
    }
    group.finish();
}

fn bench_insert_random_preallocated<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_preallocated_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        insert_random_into::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &keys, true);
        insert_random_into::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &keys, true);
        insert_random_into::<K, std::collections::HashSet<K, SipBuilder>>(&mut group, &keys, true);
    }
    group.finish();
}

fn find_hit_miss_in<K: BenchKey, S: BenchSet<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    present: &[K],
    lookups: &[K],
) {
    let set: S = filled(present);
    group.bench_function(S::NAME, |b| {
        b.iter(|| {
            for key in lookups {
                black_box(set.has(key));
            }
        })
    });
}

fn bench_find_hit<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_hit_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let present = sequential_keys::<K>(*size);
        let mut lookups = present.clone();
        lookups.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(*size as u64));
        find_hit_miss_in::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, std::collections::HashSet<K, SipBuilder>>(
            &mut group, &present, &lookups,
        );
    }
    group.finish();
}

fn bench_find_miss<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_miss_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let present = sequential_keys::<K>(*size);
        let lookups = (*size as u64..*size as u64 * 2)
            .map(K::new)
            .collect::<Vec<K>>();

        group.throughput(Throughput::Elements(*size as u64));
        find_hit_miss_in::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, std::collections::HashSet<K, SipBuilder>>(
            &mut group, &present, &lookups,
        );
    }
    group.finish();
}

fn bench_find_zipf<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_zipf_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    const KEY_SPACE_MULTIPLIER: u64 = 2;

    for size in SIZES[..=MAX_SIZE].iter() {
        let present = sequential_keys::<K>(*size);

        let mut rng = SmallRng::from_os_rng();
        let distr = Zipf::new(*size as f32 * KEY_SPACE_MULTIPLIER as f32 - 1.0, 1.0).unwrap();
        let lookups = (0..*size)
            .map(|_| K::new(rng.sample(distr) as u64))
            .collect::<Vec<K>>();

        group.throughput(Throughput::Elements(*size as u64));
        find_hit_miss_in::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &present, &lookups);
        find_hit_miss_in::<K, std::collections::HashSet<K, SipBuilder>>(
            &mut group, &present, &lookups,
        );
    }
    group.finish();
}

fn remove_from<K: BenchKey, S: BenchSet<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    keys: &[K],
) {
    group.bench_function(S::NAME, |b| {
        b.iter_batched(
            || {
                let set: S = filled(keys);
                let mut keys = keys.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                (set, keys)
            },
            |(mut set, keys)| {
                for key in keys.iter() {
                    black_box(set.take_out(key));
                }
                black_box(set)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let keys = sequential_keys::<K>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        remove_from::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &keys);
        remove_from::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &keys);
        remove_from::<K, std::collections::HashSet<K, SipBuilder>>(&mut group, &keys);
    }
    group.finish();
}

fn churn_in<K: BenchKey, S: BenchSet<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    toggles: &[K],
) {
    group.bench_function(S::NAME, |b| {
        b.iter_batched(
            || {
                let mut toggles = toggles.to_vec();
                toggles.shuffle(&mut SmallRng::from_os_rng());
                toggles
            },
            |toggles| {
                let mut set = S::with_capacity(0);
                for key in toggles {
                    if set.has(&key) {
                        black_box(set.take_out(&key));
                    } else {
                        black_box(set.add(key));
                    }
                }
                black_box(set)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let toggles = (0..*size as u64)
            .flat_map(|i| [K::new(i), K::new(i)])
            .collect::<Vec<K>>();

        group.throughput(Throughput::Elements(*size as u64 * 2));
        churn_in::<K, ProbeHashSet<K, SipBuilder>>(&mut group, &toggles);
        churn_in::<K, hashbrown::HashSet<K, SipBuilder>>(&mut group, &toggles);
        churn_in::<K, std::collections::HashSet<K, SipBuilder>>(&mut group, &toggles);
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallKey, 4>,
    bench_insert_random::<StringKey, 4>,
    bench_insert_random::<LargeKey, 2>,
    bench_insert_random_preallocated::<SmallKey, 4>,
    bench_insert_random_preallocated::<StringKey, 4>,
    bench_insert_random_preallocated::<LargeKey, 2>,
    bench_find_hit::<SmallKey, 4>,
    bench_find_hit::<StringKey, 4>,
    bench_find_hit::<LargeKey, 2>,
    bench_find_miss::<SmallKey, 4>,
    bench_find_miss::<StringKey, 4>,
    bench_find_miss::<LargeKey, 2>,
    bench_find_zipf::<SmallKey, 4>,
    bench_find_zipf::<StringKey, 4>,
    bench_find_zipf::<LargeKey, 2>,
    bench_remove::<SmallKey, 4>,
    bench_remove::<StringKey, 4>,
    bench_remove::<LargeKey, 2>,
    bench_churn::<SmallKey, 4>,
    bench_churn::<StringKey, 4>,
    bench_churn::<LargeKey, 2>,
);

criterion_main!(benches);
