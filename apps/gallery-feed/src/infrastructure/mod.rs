//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Gallery backend adapters: feed client, probes, login.
pub mod backend;

/// Configuration loading.
pub mod config;

/// Bearer token persistence.
pub mod credentials;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
