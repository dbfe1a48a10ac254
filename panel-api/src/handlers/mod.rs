pub mod app;
pub mod extract;
pub mod inbounds;
pub mod metrics;
pub mod stats;
