//! Metrics collection and exposition.
//!
//! # Metrics
//! - `masthead_resolutions_total` (counter): resolutions by outcome
//!   (context, redirect, not_found)
//! - `masthead_url_regenerations_total` (counter): completed URL
//!   regeneration passes
//! - `masthead_ambiguous_ownership_total` (counter): arbitration
//!   tie-breaks between overlapping routes
//! - `masthead_index_resources` (gauge): resources currently indexed
//!
//! # Design Decisions
//! - The metrics facade records everywhere; exposition only starts when
//!   the exporter is installed, so tests and library users pay nothing

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address and describe
/// the crate's metrics.
pub fn init(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    if let Err(e) = builder.install() {
        tracing::error!(error = %e, "failed to install metrics exporter");
        return;
    }

    metrics::describe_counter!(
        "masthead_resolutions_total",
        "Request resolutions by outcome"
    );
    metrics::describe_counter!(
        "masthead_url_regenerations_total",
        "Completed URL regeneration passes"
    );
    metrics::describe_counter!(
        "masthead_ambiguous_ownership_total",
        "URL ownership ties broken by route priority"
    );
    metrics::describe_gauge!("masthead_index_resources", "Resources currently indexed");

    tracing::info!(address = %addr, "metrics exporter started");
}
