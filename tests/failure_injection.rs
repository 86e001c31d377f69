//! Failure injection tests for the admission proxy.

use std::time::Duration;

use axum::http::StatusCode;

mod common;

use common::{MockResponse, SECRET};

#[tokio::test]
async fn test_unreachable_upstream_returns_502_and_frees_slot() {
    let upstream = common::unreachable_addr().await;
    let mut config = common::proxy_config(upstream);
    config.queue.max_concurrency = 1;
    config.queue.max_queue_size = 1;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    let res = client.get(proxy.url("/first")).header("x-proxy-secret", SECRET).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Upstream error");

    // With one slot, a leaked slot would leave the second job stuck in the queue.
    let res = tokio::time::timeout(
        Duration::from_secs(5),
        client.get(proxy.url("/second")).header("x-proxy-secret", SECRET).send(),
    )
    .await
    .expect("second job was never dispatched")
    .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let snapshot = proxy.queue.snapshot();
    assert_eq!(snapshot.in_flight, 0);
    assert_eq!(snapshot.pending, 0);
    assert_eq!(snapshot.upstream_failures_total, 2);
}

#[tokio::test]
async fn test_upstream_deadline_returns_502() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        MockResponse::ok("too late")
    })
    .await;

    let mut config = common::proxy_config(backend);
    config.upstream.request_timeout_secs = 1;
    config.queue.max_concurrency = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .get(proxy.url("/slow"))
        .header("x-proxy-secret", SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(proxy.queue.snapshot().in_flight, 0);
}

#[tokio::test]
async fn test_upstream_error_status_is_passed_through() {
    let backend = common::start_programmable_backend(|_| async {
        MockResponse::ok("rate limited").status(429).header("Retry-After", "7")
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(backend)).await;

    let res = common::client()
        .get(proxy.url("/api"))
        .header("x-proxy-secret", SECRET)
        .send()
        .await
        .unwrap();

    // An upstream-produced error is a response, not a transport failure.
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers().get("retry-after").unwrap(), "7");
    assert_eq!(res.text().await.unwrap(), "rate limited");
    assert_eq!(proxy.queue.snapshot().upstream_failures_total, 0);
}

#[tokio::test]
async fn test_disconnected_caller_does_not_leak_slot() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        MockResponse::ok("late")
    })
    .await;

    let mut config = common::proxy_config(backend);
    config.queue.max_concurrency = 1;
    let proxy = common::start_proxy(config).await;

    let impatient = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let err = impatient
        .get(proxy.url("/abandoned"))
        .header("x-proxy-secret", SECRET)
        .send()
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let res = common::client()
        .get(proxy.url("/next"))
        .header("x-proxy-secret", SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let snapshot = proxy.queue.snapshot();
    assert_eq!(snapshot.completed_total, 2, "abandoned job still ran to completion");
    assert_eq!(snapshot.in_flight, 0);
}
