//! Adaptive assessment generation

mod collaborator;
mod generator;
mod pool;

pub use collaborator::{CandidateRequest, QuestionSource, fetch_candidates};
pub use generator::{AdaptiveGenerator, GenerateRequest, GenerationPlan};
pub use pool::{DifficultyCounts, TopicBand, TopicPool, classify, mix_for};
