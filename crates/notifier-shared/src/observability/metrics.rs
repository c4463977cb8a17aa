//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 指标服务器守卫，持有后台任务
pub struct MetricsHandle {
    server: JoinHandle<()>,
    addr: SocketAddr,
}

impl MetricsHandle {
    /// 指标服务器实际监听的地址
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// 安装全局 recorder，并在指定端口暴露 `/metrics` 与 `/health`
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_transport_metrics();
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);

    serve(SocketAddr::from(([0, 0, 0, 0], port)), handle).await
}

fn describe_transport_metrics() {
    metrics::describe_counter!(
        "notifications_dispatched_total",
        "Total number of notifications routed by the dispatch registry"
    );
    metrics::describe_counter!(
        "transport_sends_total",
        "Total number of transport-level delivery attempts"
    );
    metrics::describe_histogram!(
        "transport_send_duration_seconds",
        "Transport delivery duration in seconds"
    );
}

fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }))
}

async fn serve(addr: SocketAddr, handle: PrometheusHandle) -> Result<MetricsHandle> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Metrics server listening");

    let app = router(handle);
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Metrics server error");
        }
    });

    Ok(MetricsHandle { server, addr })
}

/// 记录一次传输层投递
#[inline]
pub fn record_transport_send(channel: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "transport_sends_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "transport_send_duration_seconds",
        "channel" => channel.to_string()
    )
    .record(duration_secs);
}
