use axum::body::Body;
use axum::http::{header, Request};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fever::{Fever, FeverConfig, FileOptions, MemoryStore};
use fever_server::app;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tower::ServiceExt;

fn bench_http_serve(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert("bundle.js", "console.log('bench');\n".repeat(2_000));
    let fever = Fever::new(FeverConfig { recache: 0, ..Default::default() }, store);
    let file = rt
        .block_on(fever.add("bundle.js", FileOptions::default()))
        .unwrap();
    let url = file.url().unwrap();

    c.bench_function("http_serve_stream_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..1000 {
                    let req = Request::builder()
                        .uri(&url)
                        .header(header::ACCEPT_ENCODING, "gzip")
                        .body(Body::empty())
                        .unwrap();
                    let resp = app(fever.clone()).oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });

    rt.block_on(fever.cache()).unwrap();
    c.bench_function("http_serve_hot_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..1000 {
                    let req = Request::builder().uri(&url).body(Body::empty()).unwrap();
                    let resp = app(fever.clone()).oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

fn bench_http_passthrough(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let fever = Fever::new(FeverConfig::default(), Arc::new(MemoryStore::new()));

    c.bench_function("http_passthrough_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..1000 {
                    let req = Request::builder().uri("/missing.js").body(Body::empty()).unwrap();
                    let resp = app(fever.clone()).oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

criterion_group!(benches, bench_http_serve, bench_http_passthrough);
criterion_main!(benches);
