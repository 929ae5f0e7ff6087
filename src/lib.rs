// Domain layer (business logic)
pub mod analytics;
pub mod attachment;
pub mod dispatch;
pub mod logs;
pub mod template;
pub mod transport;

// Application layer
pub mod service;

// Supporting modules
pub mod config;
pub mod metrics;
pub mod telemetry;
