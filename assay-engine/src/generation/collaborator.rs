//! External question-generation collaborator
//!
//! The generator asks a [`QuestionSource`] for extra candidates when a
//! difficulty bucket comes up short in the catalog. The source is opaque and
//! fallible; every call is bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AssayError, Result};
use crate::types::{CourseId, Difficulty, Question};

/// What the generator is short of
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRequest {
    pub course_id: CourseId,
    /// Pool topics the candidates should cover
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    /// Number of missing questions
    pub count: u32,
}

/// Produces structured question candidates on demand
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn candidates(&self, request: &CandidateRequest) -> Result<Vec<Question>>;
}

/// Ask `source` for candidates and keep only the usable ones.
///
/// Errors, timeouts and empty results all come back as an empty list after a
/// warning. Candidates that fail validation or do not match the requested
/// course, difficulty or topics are dropped.
pub async fn fetch_candidates(
    source: &dyn QuestionSource,
    request: &CandidateRequest,
    timeout: Duration,
) -> Vec<Question> {
    let outcome = match tokio::time::timeout(timeout, source.candidates(request)).await {
        Ok(result) => result,
        Err(_) => Err(AssayError::UpstreamUnavailable(format!(
            "question source timed out after {}ms",
            timeout.as_millis()
        ))),
    };

    let candidates = match outcome {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(
                course_id = %request.course_id,
                difficulty = request.difficulty.as_str(),
                error = %e,
                "Question source failed, falling back to catalog"
            );
            return Vec::new();
        }
    };

    if candidates.is_empty() {
        warn!(
            course_id = %request.course_id,
            difficulty = request.difficulty.as_str(),
            "Question source returned no candidates"
        );
        return Vec::new();
    }

    let received = candidates.len();
    let usable: Vec<Question> = candidates
        .into_iter()
        .filter(|q| {
            q.course_id == request.course_id
                && q.difficulty == request.difficulty
                && q.active
                && request.topics.contains(&q.topic)
        })
        .filter(|q| match q.validate() {
            Ok(()) => true,
            Err(e) => {
                debug!(question_id = %q.id, error = %e, "Dropping invalid candidate");
                false
            }
        })
        .collect();

    debug!(
        received,
        usable = usable.len(),
        difficulty = request.difficulty.as_str(),
        "Received question candidates"
    );
    usable
}
