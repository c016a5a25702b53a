#![cfg(feature = "prometheus")]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Scrape endpoint served from the installed Prometheus recorder.

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;

use {
    stubwire_config::StubwireConfig,
    stubwire_engine::MessagingEngine,
    stubwire_gateway::{GatewayState, METRICS_PATH, serve},
    stubwire_metrics::{MetricsRecorderConfig, gateway as gw_metrics, init_metrics},
};

async fn start(state: GatewayState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.unwrap();
    });
    addr
}

fn engine() -> Arc<MessagingEngine> {
    Arc::new(MessagingEngine::from_config(StubwireConfig::default()).unwrap())
}

#[tokio::test]
async fn scrape_reports_gateway_counters() {
    // One test per binary: the recorder can only be installed once.
    let handle = init_metrics(MetricsRecorderConfig {
        enabled: true,
        ..Default::default()
    })
    .unwrap();
    assert!(handle.is_some());

    let addr = start(GatewayState::new(engine()).with_metrics(handle)).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/api/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let scrape = client
        .get(format!("http://{addr}{METRICS_PATH}"))
        .send()
        .await
        .unwrap();
    assert_eq!(scrape.status(), 200);
    let body = scrape.text().await.unwrap();
    assert!(body.contains(gw_metrics::HTTP_REQUESTS_TOTAL));
    assert!(body.contains("method=\"GET\""));

    let bare = start(GatewayState::new(engine())).await;
    let resp = client
        .get(format!("http://{bare}{METRICS_PATH}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}
