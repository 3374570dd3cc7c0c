//! Shared state between handlers.

use ::std::sync::Arc;

use crate::backend::RecommendationBackend;

pub(crate) struct GatewayState<B: RecommendationBackend> {
    backend: Arc<B>,
}

impl<B: RecommendationBackend> Clone for GatewayState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: RecommendationBackend> GatewayState<B> {
    pub(crate) fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub(crate) fn get_backend(&self) -> &B {
        &self.backend
    }
}
