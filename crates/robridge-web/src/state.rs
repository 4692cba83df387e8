use std::sync::Arc;

use robridge_core::ProxyService;
use tokio::time::Instant;

/// Shared handler state. Cloned per request; the service is built once.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProxyService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: ProxyService) -> Self {
        Self {
            service: Arc::new(service),
            started_at: Instant::now(),
        }
    }
}
