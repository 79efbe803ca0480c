//! assay-engine - Adaptive assessment loop
//!
//! Generates personalized assessments from a learner's proficiency context,
//! runs attempts through a strict lifecycle, scores submissions and feeds the
//! results back into the context. CozoDB backs persistence; an in-memory
//! store is provided for tests and embedding.

pub mod clock;
pub mod config;
pub mod context_updater;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod locks;
pub mod performance;
pub mod scoring;
pub mod service;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, Sampler, SystemClock};
pub use config::AssayConfig;
pub use error::{AssayError, ErrorKind, Result};
pub use generation::{GenerateRequest, QuestionSource};
pub use lifecycle::StartedAttempt;
pub use service::AssessmentService;
pub use store::{AssayStore, CozoStore, MemoryStore, QuestionFilter};
pub use types::*;
