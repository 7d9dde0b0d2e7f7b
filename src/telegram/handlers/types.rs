//! Handler types and dependencies

use std::sync::Arc;

use crate::core::auth::Authorizer;
use crate::download::session::PipelineContext;
use crate::download::worker::ChatWorkers;
use crate::telegram::cancel::CancellationGate;
use crate::telegram::transport::ChatTransport;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub authorizer: Arc<Authorizer>,
    pub pipeline: Arc<PipelineContext>,
    pub gate: CancellationGate,
    pub workers: ChatWorkers,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(authorizer: Arc<Authorizer>, pipeline: Arc<PipelineContext>) -> Self {
        Self {
            authorizer,
            pipeline,
            gate: CancellationGate::new(),
            workers: ChatWorkers::new(),
        }
    }

    pub fn transport(&self) -> &dyn ChatTransport {
        self.pipeline.transport.as_ref()
    }
}
