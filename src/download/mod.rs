//! Link classification, retrieval and the per-link transfer session

pub mod artifact;
pub mod classifier;
pub mod error;
pub mod progress;
pub mod session;
pub mod source;
pub mod worker;

// Re-exports for convenience
pub use classifier::{classify, split_links, RetrievalPlan};
pub use error::{DeliveryError, RetrievalError, SessionOutcome};
pub use progress::ProgressReporter;
pub use session::{PipelineContext, SessionControl, SessionState, TransferSession};
pub use source::{ProgressEvent, Retriever, Retrievers};
pub use worker::ChatWorkers;
