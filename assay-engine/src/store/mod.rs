//! Persistence layer.
//!
//! Components depend on these traits only. [`CozoStore`] persists to CozoDB;
//! [`MemoryStore`] keeps everything in process for tests and embedding.
//!
//! Implementations must make each of these a single critical section:
//! attempt creation (check for an in-progress attempt, count, insert),
//! attempt finalization (compare-and-set on `in_progress`), committing a
//! context update together with its attempt's pending flag, question usage
//! updates, and assessment stats updates.

mod cozo;
mod memory;
mod schema;

pub use cozo::CozoStore;
pub use memory::MemoryStore;
pub use schema::{CURRENT_SCHEMA_VERSION, INITIAL_SCHEMA, MIGRATIONS, Migration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{
    Assessment, AssessmentId, AssessmentStatus, Attempt, AttemptId, Course, CourseId, Difficulty,
    LearnerId, ProficiencyContext, Question, QuestionId,
};

/// Filter for catalog queries
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFilter {
    pub course_id: CourseId,
    /// Restrict to these topics; `None` means any topic
    pub topics: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    pub active_only: bool,
}

impl QuestionFilter {
    pub fn for_course(course_id: CourseId) -> Self {
        Self {
            course_id,
            topics: None,
            difficulty: None,
            active_only: true,
        }
    }

    #[must_use]
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = Some(topics);
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn matches(&self, question: &Question) -> bool {
        question.course_id == self.course_id
            && (!self.active_only || question.active)
            && self.difficulty.is_none_or(|d| d == question.difficulty)
            && self
                .topics
                .as_ref()
                .is_none_or(|topics| topics.iter().any(|t| t == &question.topic))
    }
}

/// Question catalog queries and usage bookkeeping
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn put_course(&self, course: &Course) -> Result<()>;
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>>;

    /// Insert or replace a question; rejects questions that fail validation
    async fn put_question(&self, question: &Question) -> Result<()>;
    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>>;
    /// Fetch many questions; missing ids are skipped
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>>;
    /// Matching questions ordered by id
    async fn find_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>>;

    /// Fold one graded use into the question's running averages
    async fn record_usage(
        &self,
        id: &QuestionId,
        correct: bool,
        time_spent_seconds: u32,
    ) -> Result<()>;
}

/// Assessment snapshots
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn put_assessment(&self, assessment: &Assessment) -> Result<()>;
    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>>;

    /// Move from `from` to `to`; returns false if the stored status was not `from`
    async fn set_assessment_status(
        &self,
        id: AssessmentId,
        from: AssessmentStatus,
        to: AssessmentStatus,
    ) -> Result<bool>;

    /// Fold one completed attempt into the assessment's aggregates
    async fn record_assessment_result(
        &self,
        id: AssessmentId,
        percentage: u32,
        passed: bool,
    ) -> Result<()>;
}

/// Outcome of [`AttemptStore::create_attempt`]
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptCreation {
    Created(Attempt),
    /// An in-progress attempt already existed for the pair
    Existing(Attempt),
}

/// Learner attempts
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Create an in-progress attempt unless one already exists for the pair.
    ///
    /// The attempt number is the count of prior attempts for the pair plus
    /// one. Check, count and insert happen as one critical section.
    async fn create_attempt(
        &self,
        learner_id: &LearnerId,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<AttemptCreation>;

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>>;

    /// All attempts on an assessment, oldest first
    async fn attempts_for_assessment(&self, id: AssessmentId) -> Result<Vec<Attempt>>;

    /// A learner's most recent attempts, newest first
    async fn attempts_for_learner(&self, learner_id: &LearnerId, limit: usize)
    -> Result<Vec<Attempt>>;

    /// Replace a stored attempt only if it is still in progress.
    ///
    /// Returns false when the stored attempt had already left `in_progress`.
    async fn finalize_attempt(&self, attempt: &Attempt) -> Result<bool>;
}

/// Proficiency profiles
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Load a learner's context, creating and persisting an empty one on first read
    async fn load_context(&self, learner_id: &LearnerId) -> Result<ProficiencyContext>;
    async fn save_context(&self, context: &ProficiencyContext) -> Result<()>;

    /// Save `context` and clear `attempt_id`'s pending flag as one unit.
    ///
    /// Returns false and writes nothing when the attempt is missing or has
    /// no pending context update.
    async fn commit_context_update(
        &self,
        context: &ProficiencyContext,
        attempt_id: AttemptId,
    ) -> Result<bool>;
}

/// Everything the service needs from one backend
pub trait AssayStore: CatalogStore + AssessmentStore + AttemptStore + ContextStore {}

impl<T> AssayStore for T where T: CatalogStore + AssessmentStore + AttemptStore + ContextStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QuestionType, UsageStats};

    fn question(topic: &str, difficulty: Difficulty, active: bool) -> Question {
        Question {
            id: QuestionId::new(format!("{topic}-{}", difficulty.as_str())),
            course_id: CourseId::new("CS301"),
            topic: topic.into(),
            prompt: "?".into(),
            difficulty,
            question_type: QuestionType::ShortAnswer,
            options: vec![],
            correct_answer: Some("x".into()),
            explanation: None,
            usage: UsageStats::default(),
            active,
        }
    }

    #[test]
    fn test_filter_matches_course_topic_difficulty() {
        let filter = QuestionFilter::for_course(CourseId::new("CS301"))
            .with_topics(vec!["Arrays".into()])
            .with_difficulty(Difficulty::Easy);

        assert!(filter.matches(&question("Arrays", Difficulty::Easy, true)));
        assert!(!filter.matches(&question("Arrays", Difficulty::Hard, true)));
        assert!(!filter.matches(&question("Trees", Difficulty::Easy, true)));
        assert!(!filter.matches(&question("Arrays", Difficulty::Easy, false)));
    }

    #[test]
    fn test_filter_without_active_only_includes_inactive() {
        let mut filter = QuestionFilter::for_course(CourseId::new("CS301"));
        filter.active_only = false;
        assert!(filter.matches(&question("Trees", Difficulty::Medium, false)));
    }

    #[test]
    fn test_filter_other_course() {
        let filter = QuestionFilter::for_course(CourseId::new("CS101"));
        assert!(!filter.matches(&question("Arrays", Difficulty::Easy, true)));
    }
}
