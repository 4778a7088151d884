// Configuration & shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain
pub mod directory;
pub mod notification;
pub mod session;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod shutdown;
