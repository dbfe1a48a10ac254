pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use metrics_exporter_prometheus::PrometheusHandle;
use services::{ClientWriter, InboundStore, OnlineTracker, StatsService};
use std::sync::Arc;

/// Shared application state: the panel behind its trait seams.
#[derive(Clone)]
pub struct AppState {
    pub inbounds: Arc<dyn InboundStore>,
    pub clients: Arc<dyn ClientWriter>,
    pub stats: Arc<StatsService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        inbounds: Arc<dyn InboundStore>,
        online: Arc<dyn OnlineTracker>,
        clients: Arc<dyn ClientWriter>,
    ) -> Self {
        let stats = Arc::new(StatsService::new(inbounds.clone(), online));
        Self {
            inbounds,
            clients,
            stats,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
