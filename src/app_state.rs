//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::pipeline::CircuitBreaker;
use crate::store::Repository;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Repository for fingerprints, observations, insights, and alerts.
    pub repo: Arc<dyn Repository>,
    /// Circuit breaker, read by the provider status endpoint.
    pub breaker: Arc<CircuitBreaker>,
}
