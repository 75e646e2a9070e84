use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::task;

/// Metrics prefix for the forum API
pub const METRICS_PREFIX: &str = "qa_api";

/// Labels used for metrics dimensions
pub mod labels {
    pub const OPERATION: &str = "operation";
    pub const STATUS: &str = "status";
    pub const TRANSITION: &str = "transition";
    pub const TARGET_TYPE: &str = "target_type";
    pub const DIRECTION: &str = "direction";
}

/// Operation names for metrics labeling
pub mod operations {
    pub const VOTE: &str = "vote";
    pub const CREATE_ANSWER: &str = "create_answer";
    pub const DELETE_ANSWER: &str = "delete_answer";
}

/// Status values for metrics labeling
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
}

/// Installs the global Prometheus recorder.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_operation_latency_seconds", METRICS_PREFIX)),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
        )?
        .install_recorder()
}

/// Spawn a metrics exporter server that serves Prometheus metrics
pub fn spawn_metrics_exporter(handle: PrometheusHandle, addr: SocketAddr) -> task::JoinHandle<()> {
    task::spawn(async move {
        let app = axum::Router::new().route(
            "/metrics",
            axum::routing::get(move || std::future::ready(handle.render())),
        );

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to bind metrics exporter on {}: {}", addr, e);
                return;
            }
        };
        tracing::info!("Starting metrics exporter on {}", addr);
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Metrics exporter stopped: {}", e);
        }
    })
}

/// Records latency and a success/error count around an async block.
#[macro_export]
macro_rules! time_op {
    ($operation:expr, $code:block) => {{
        let started = std::time::Instant::now();
        let result = $code;

        ::metrics::histogram!(
            concat!("qa_api", "_operation_latency_seconds"),
            $crate::metrics::labels::OPERATION => $operation
        )
        .record(started.elapsed().as_secs_f64());

        let status = if result.is_ok() {
            $crate::metrics::status::SUCCESS
        } else {
            $crate::metrics::status::ERROR
        };
        ::metrics::counter!(
            concat!("qa_api", "_operations_total"),
            $crate::metrics::labels::OPERATION => $operation,
            $crate::metrics::labels::STATUS => status
        )
        .increment(1);

        result
    }};
}

/// Counts one applied vote transition.
pub fn record_vote_transition(transition: &'static str, target_type: &'static str) {
    metrics::counter!(
        format!("{}_vote_transitions_total", METRICS_PREFIX),
        labels::TRANSITION => transition,
        labels::TARGET_TYPE => target_type
    )
    .increment(1);
}

/// Counts one applied reputation step.
pub fn record_reputation_step(delta: i64) {
    let direction = if delta >= 0 { "up" } else { "down" };
    metrics::counter!(
        format!("{}_reputation_steps_total", METRICS_PREFIX),
        labels::DIRECTION => direction
    )
    .increment(1);
}

pub fn record_reputation_conflict() {
    metrics::counter!(format!("{}_reputation_conflicts_total", METRICS_PREFIX)).increment(1);
}

pub fn record_reputation_exhausted() {
    metrics::counter!(format!("{}_reputation_retries_exhausted_total", METRICS_PREFIX)).increment(1);
}
