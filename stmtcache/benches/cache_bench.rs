use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use stmtcache::{
    Cache, CacheBuilder, CacheKey, EvictionPolicy, LruCache, PerpetualCache, RowBounds,
    TransactionalCacheManager, Value, compute_cache_key,
};

fn row(id: i64) -> Value {
    Value::map()
        .with("id", id)
        .with("name", format!("user-{}", id))
        .with("active", true)
}

fn bench_cache_key(c: &mut Criterion) {
    let values = vec![Value::Int(42), Value::from("ann"), Value::Null];

    c.bench_function("compute_cache_key", |b| {
        b.iter(|| {
            compute_cache_key(
                black_box("users.find"),
                RowBounds::DEFAULT,
                black_box("SELECT * FROM users WHERE id = ? AND name = ? AND deleted = ?"),
                black_box(&values),
                Some("prod"),
            )
        });
    });
}

fn bench_lru_put_get(c: &mut Criterion) {
    let cache = LruCache::with_size(Arc::new(PerpetualCache::new("lru")), 1024);
    let keys: Vec<CacheKey> = (0..2048)
        .map(|i| CacheKey::from_parts([Value::Int(i)]))
        .collect();

    c.bench_function("lru_put_get", |b| {
        let mut i = 0;
        b.iter(|| {
            let key = &keys[i % keys.len()];
            cache.put(key.clone(), Value::Int(i as i64)).unwrap();
            black_box(cache.get(key).unwrap());
            i += 1;
        });
    });
}

fn bench_chain_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_get");

    for read_write in [false, true] {
        let cache = CacheBuilder::new("users")
            .eviction(Some(EvictionPolicy::Lru))
            .read_write(read_write)
            .build()
            .unwrap();
        let key = CacheKey::from_parts(["users.all"]);
        cache
            .put(key.clone(), Value::List((0..50).map(row).collect()))
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("read_write", read_write),
            &read_write,
            |b, _| {
                b.iter(|| black_box(cache.get(&key).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_transactional_commit(c: &mut Criterion) {
    let cache = CacheBuilder::new("users").build().unwrap();

    c.bench_function("transactional_commit_10", |b| {
        b.iter(|| {
            let mut tcm = TransactionalCacheManager::new();
            for i in 0..10 {
                let key = CacheKey::from_parts([Value::Int(i)]);
                tcm.get_object(&cache, &key).unwrap();
                tcm.put_object(&cache, key, row(i));
            }
            tcm.commit().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_cache_key,
    bench_lru_put_get,
    bench_chain_get,
    bench_transactional_commit
);
criterion_main!(benches);
