//! In-process store for tests and embedding
//!
//! All state sits behind one `RwLock`; every write operation holds the write
//! guard for its whole read-modify-write.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AssessmentStore, AttemptCreation, AttemptStore, CatalogStore, ContextStore, QuestionFilter,
};
use crate::error::{AssayError, Result};
use crate::types::{
    Assessment, AssessmentId, AssessmentStatus, Attempt, AttemptId, Course, CourseId, LearnerId,
    ProficiencyContext, Question, QuestionId,
};

#[derive(Debug, Default)]
struct State {
    courses: HashMap<CourseId, Course>,
    questions: HashMap<QuestionId, Question>,
    assessments: HashMap<AssessmentId, Assessment>,
    attempts: HashMap<AttemptId, Attempt>,
    contexts: HashMap<LearnerId, ProficiencyContext>,
}

/// Store that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn put_course(&self, course: &Course) -> Result<()> {
        let mut state = self.state.write().await;
        state.courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>> {
        Ok(self.state.read().await.courses.get(id).cloned())
    }

    async fn put_question(&self, question: &Question) -> Result<()> {
        question.validate()?;
        let mut state = self.state.write().await;
        state
            .questions
            .insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>> {
        Ok(self.state.read().await.questions.get(id).cloned())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.questions.get(id).cloned())
            .collect())
    }

    async fn find_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        let mut found: Vec<Question> = state
            .questions
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn record_usage(
        &self,
        id: &QuestionId,
        correct: bool,
        time_spent_seconds: u32,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let question = state
            .questions
            .get_mut(id)
            .ok_or_else(|| AssayError::not_found("question", id))?;
        question.usage.record(correct, time_spent_seconds);
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn put_assessment(&self, assessment: &Assessment) -> Result<()> {
        let mut state = self.state.write().await;
        state.assessments.insert(assessment.id, assessment.clone());
        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>> {
        Ok(self.state.read().await.assessments.get(&id).cloned())
    }

    async fn set_assessment_status(
        &self,
        id: AssessmentId,
        from: AssessmentStatus,
        to: AssessmentStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let assessment = state
            .assessments
            .get_mut(&id)
            .ok_or_else(|| AssayError::not_found("assessment", id))?;
        if assessment.status != from {
            return Ok(false);
        }
        assessment.status = to;
        Ok(true)
    }

    async fn record_assessment_result(
        &self,
        id: AssessmentId,
        percentage: u32,
        passed: bool,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let assessment = state
            .assessments
            .get_mut(&id)
            .ok_or_else(|| AssayError::not_found("assessment", id))?;
        assessment.stats.record(percentage, passed);
        Ok(())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn create_attempt(
        &self,
        learner_id: &LearnerId,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<AttemptCreation> {
        let mut state = self.state.write().await;

        let mut prior = 0u32;
        for attempt in state
            .attempts
            .values()
            .filter(|a| &a.learner_id == learner_id && a.assessment_id == assessment.id)
        {
            if attempt.is_in_progress() {
                return Ok(AttemptCreation::Existing(attempt.clone()));
            }
            prior += 1;
        }

        let attempt = Attempt::start(learner_id.clone(), assessment, prior + 1, now);
        state.attempts.insert(attempt.id, attempt.clone());
        Ok(AttemptCreation::Created(attempt))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>> {
        Ok(self.state.read().await.attempts.get(&id).cloned())
    }

    async fn attempts_for_assessment(&self, id: AssessmentId) -> Result<Vec<Attempt>> {
        let state = self.state.read().await;
        let mut attempts: Vec<Attempt> = state
            .attempts
            .values()
            .filter(|a| a.assessment_id == id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    async fn attempts_for_learner(
        &self,
        learner_id: &LearnerId,
        limit: usize,
    ) -> Result<Vec<Attempt>> {
        let state = self.state.read().await;
        let mut attempts: Vec<Attempt> = state
            .attempts
            .values()
            .filter(|a| &a.learner_id == learner_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn finalize_attempt(&self, attempt: &Attempt) -> Result<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .attempts
            .get_mut(&attempt.id)
            .ok_or_else(|| AssayError::not_found("attempt", attempt.id))?;
        if !stored.is_in_progress() {
            return Ok(false);
        }
        *stored = attempt.clone();
        Ok(true)
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    async fn load_context(&self, learner_id: &LearnerId) -> Result<ProficiencyContext> {
        let mut state = self.state.write().await;
        Ok(state
            .contexts
            .entry(learner_id.clone())
            .or_insert_with(|| ProficiencyContext::new(learner_id.clone()))
            .clone())
    }

    async fn save_context(&self, context: &ProficiencyContext) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .contexts
            .insert(context.learner_id.clone(), context.clone());
        Ok(())
    }

    async fn commit_context_update(
        &self,
        context: &ProficiencyContext,
        attempt_id: AttemptId,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.attempts.get_mut(&attempt_id) {
            Some(attempt)
                if attempt.awaits_context_update() && attempt.learner_id == context.learner_id =>
            {
                attempt.context_pending = false
            }
            _ => return Ok(false),
        }
        state
            .contexts
            .insert(context.learner_id.clone(), context.clone());
        Ok(true)
    }
}
