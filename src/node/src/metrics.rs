//! Metrics for the overlay node.

use anyhow::Result;
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_gauge, register_histogram, Counter, Encoder, Gauge, Histogram,
    HistogramOpts, Opts, TextEncoder,
};
use std::net::SocketAddr;
use tracing::error;
use warp::http::StatusCode;
use warp::Filter;

lazy_static! {
    /// Counter for the number of actions submitted.
    pub static ref SUBMISSION_COUNTER: Counter = register_counter!(
        Opts::new(
            "postboard_submissions_total",
            "Total number of actions submitted"
        )
    )
    .expect("submission counter registers once");

    /// Counter for the number of outputs admitted.
    pub static ref OUTPUTS_ADMITTED: Counter = register_counter!(
        Opts::new(
            "postboard_outputs_admitted_total",
            "Total number of outputs admitted"
        )
    )
    .expect("admitted counter registers once");

    /// Counter for the number of outputs removed by a spend.
    pub static ref OUTPUTS_REMOVED: Counter = register_counter!(
        Opts::new(
            "postboard_outputs_removed_total",
            "Total number of tracked outputs spent"
        )
    )
    .expect("removed counter registers once");

    /// Counter for the number of lookups answered.
    pub static ref LOOKUP_COUNTER: Counter = register_counter!(
        Opts::new(
            "postboard_lookups_total",
            "Total number of lookups answered"
        )
    )
    .expect("lookup counter registers once");

    /// Counter for the number of messages delivered.
    pub static ref MESSAGE_COUNTER: Counter = register_counter!(
        Opts::new(
            "postboard_messages_total",
            "Total number of messages delivered"
        )
    )
    .expect("message counter registers once");

    /// Gauge for the number of tracked outputs.
    pub static ref TRACKED_OUTPUTS: Gauge = register_gauge!(
        Opts::new(
            "postboard_tracked_outputs",
            "Number of outputs currently tracked"
        )
    )
    .expect("tracked outputs gauge registers once");

    /// Histogram for request handling time.
    pub static ref REQUEST_TIME: Histogram = register_histogram!(
        HistogramOpts::new(
            "postboard_request_time_seconds",
            "Time to handle a request"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0])
    )
    .expect("request histogram registers once");
}

/// Forces registration of every metric so they show up before first use.
pub fn register_metrics() {
    lazy_static::initialize(&SUBMISSION_COUNTER);
    lazy_static::initialize(&OUTPUTS_ADMITTED);
    lazy_static::initialize(&OUTPUTS_REMOVED);
    lazy_static::initialize(&LOOKUP_COUNTER);
    lazy_static::initialize(&MESSAGE_COUNTER);
    lazy_static::initialize(&TRACKED_OUTPUTS);
    lazy_static::initialize(&REQUEST_TIME);
}

/// Renders all registered metrics in the text exposition format.
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Starts the metrics server.
pub async fn start_metrics_server(addr: SocketAddr) -> Result<()> {
    register_metrics();

    let metrics_route = warp::path("metrics").map(|| match render() {
        Ok(body) => warp::reply::with_status(body, StatusCode::OK),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            warp::reply::with_status(String::new(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    });

    let (bound, server) = warp::serve(metrics_route).try_bind_ephemeral(addr)?;
    tracing::info!("Metrics server listening on {}", bound);
    tokio::spawn(server);

    Ok(())
}
