use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fever_storage::{LocalStore, MemoryStore, Store};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn bench_local_write_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let data_1k = vec![b'A'; 1024];
    let data_1m = vec![b'C'; 1024 * 1024];

    c.bench_function("local_write_read_1kb_x100", |b| {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        b.iter(|| {
            rt.block_on(async {
                for i in 0..100 {
                    let path = format!("bench/file_{i}");
                    store.write(&path, &data_1k).await.unwrap();
                    black_box(store.read(&path).await.unwrap());
                }
            })
        })
    });

    c.bench_function("local_write_read_1mb_x10", |b| {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        b.iter(|| {
            rt.block_on(async {
                for i in 0..10 {
                    let path = format!("bench/file_{i}");
                    store.write(&path, &data_1m).await.unwrap();
                    black_box(store.read(&path).await.unwrap());
                }
            })
        })
    });
}

fn bench_memory_write_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let data = vec![b'B'; 100 * 1024];
    let store = MemoryStore::new();
    c.bench_function("memory_write_read_100kb_x50", |b| {
        b.iter(|| {
            rt.block_on(async {
                for i in 0..50 {
                    let path = format!("bench/file_{i}");
                    store.write(&path, &data).await.unwrap();
                    black_box(store.read(&path).await.unwrap());
                }
            })
        })
    });
}

criterion_group!(benches, bench_local_write_read, bench_memory_write_read);
criterion_main!(benches);
