use criterion::{criterion_group, criterion_main, Criterion};
use defer_dispatch::deferred::{DeferredInitHandler, InitState};
use defer_dispatch::dispatcher::{Dispatcher, HandlerRequest};
use defer_dispatch::echo::EchoHandler;
use defer_dispatch::handler::{CancellationToken, Handler, HandlerConfig};
use defer_dispatch::registry::HandlerRegistry;
use http::Method;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn deferred(delegate: &str, extra: Option<(&str, &str)>) -> DeferredInitHandler {
    let mut handler = DeferredInitHandler::new(Arc::new(HandlerRegistry::builtin()));
    let mut config = HandlerConfig::new("bench").with_param("delegate-handler-type", delegate);
    if let Some((key, value)) = extra {
        config.insert_param(key, value);
    }
    handler
        .setup(&config, &CancellationToken::new())
        .expect("setup");
    handler
}

fn bench_request_path(c: &mut Criterion) {
    let req = HandlerRequest::new(Method::GET, "bench", "/items").with_query_param("limit", "10");

    let mut direct = EchoHandler::default();
    direct
        .setup(&HandlerConfig::new("bench"), &CancellationToken::new())
        .expect("setup");
    c.bench_function("echo_direct", |b| {
        b.iter(|| black_box(direct.handle(black_box(&req))))
    });

    let ready = deferred("echo", None);
    assert_eq!(
        ready.wait_for_outcome(Duration::from_secs(10)),
        InitState::Ready
    );
    c.bench_function("deferred_ready", |b| {
        b.iter(|| black_box(ready.handle(black_box(&req))))
    });

    let pending = deferred("delayed-echo", Some(("init-delay-ms", "3600000")));
    c.bench_function("deferred_not_loaded", |b| {
        b.iter(|| black_box(pending.handle(black_box(&req))))
    });
    pending.shutdown();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register(
            &HandlerConfig::new("bench").with_param("delegate-handler-type", "echo"),
            Box::new(DeferredInitHandler::new(Arc::new(HandlerRegistry::builtin()))),
        )
        .expect("register");
    let warm = HandlerRequest::new(Method::GET, "bench", "/");
    while dispatcher
        .dispatch(warm.clone())
        .is_some_and(|resp| resp.status == 502)
    {
        std::thread::sleep(Duration::from_millis(1));
    }

    c.bench_function("dispatch_deferred_ready", |b| {
        b.iter(|| black_box(dispatcher.dispatch(HandlerRequest::new(Method::GET, "bench", "/"))))
    });
    dispatcher.shutdown();
}

criterion_group!(benches, bench_request_path, bench_dispatch);
criterion_main!(benches);
