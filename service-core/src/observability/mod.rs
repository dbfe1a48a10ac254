pub mod logging;
pub mod propagation;

pub use logging::init_tracing;
pub use propagation::{PropagateTrace, TRACEPARENT_HEADER, TRACESTATE_HEADER, inject_trace_context};
