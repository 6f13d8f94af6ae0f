use std::sync::Arc;

use domains::IdentityProvider;
use services::{Services, SharedStore};

use crate::metrics::AuthzMetrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub identity: Arc<dyn IdentityProvider>,
    pub metrics: Arc<AuthzMetrics>,
    pub login_url: Arc<str>,
}

impl AppState {
    /// Wires the use cases over `store`, counting every guard decision.
    pub fn new(store: SharedStore, identity: Arc<dyn IdentityProvider>, login_url: &str) -> Self {
        let metrics = Arc::new(AuthzMetrics::new());
        Self {
            services: Services::new(store, metrics.clone()),
            identity,
            metrics,
            login_url: Arc::from(login_url),
        }
    }
}
