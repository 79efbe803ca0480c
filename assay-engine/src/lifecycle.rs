//! Assessment and attempt lifecycle
//!
//! Assessments move forward through draft, published, ongoing, completed
//! and archived. Attempts start in progress and end exactly once, either as
//! completed (through the scorer), abandoned, or time-expired.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{AssayError, Result};
use crate::store::{AssayStore, AttemptCreation};
use crate::types::{
    Assessment, AssessmentId, AssessmentStatus, Attempt, AttemptId, AttemptStatus, LearnerId,
    RedactedAssessment, RedactedSlot,
};

/// Response to a successful start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub attempt_id: AttemptId,
    pub attempt_number: u32,
    pub assessment: RedactedAssessment,
    pub duration_minutes: u32,
    pub start_time: DateTime<Utc>,
}

/// Enforces lifecycle transitions for assessments and attempts
pub struct AttemptManager {
    store: Arc<dyn AssayStore>,
    clock: Arc<dyn Clock>,
}

impl AttemptManager {
    pub fn new(store: Arc<dyn AssayStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn load_assessment(&self, id: AssessmentId) -> Result<Assessment> {
        self.store
            .get_assessment(id)
            .await?
            .ok_or_else(|| AssayError::not_found("assessment", id))
    }

    /// Load an attempt and check that `learner_id` owns it
    pub async fn owned_attempt(&self, id: AttemptId, learner_id: &LearnerId) -> Result<Attempt> {
        let attempt = self
            .store
            .get_attempt(id)
            .await?
            .ok_or_else(|| AssayError::not_found("attempt", id))?;
        if &attempt.learner_id != learner_id {
            return Err(AssayError::Forbidden(format!(
                "attempt {id} belongs to another learner"
            )));
        }
        Ok(attempt)
    }

    /// Open an attempt for `learner_id`.
    ///
    /// Fails with [`AssayError::NotActive`] outside the published schedule
    /// window and with [`AssayError::DuplicateAttempt`] if the learner
    /// already has one in progress.
    pub async fn start(
        &self,
        learner_id: &LearnerId,
        assessment_id: AssessmentId,
    ) -> Result<StartedAttempt> {
        let assessment = self.load_assessment(assessment_id).await?;
        let now = self.clock.now();
        if !assessment.is_active(now) {
            return Err(AssayError::NotActive(assessment_id));
        }

        let attempt = match self.store.create_attempt(learner_id, &assessment, now).await? {
            AttemptCreation::Created(attempt) => attempt,
            AttemptCreation::Existing(existing) => {
                debug!(
                    attempt_id = %existing.id,
                    learner_id = %learner_id,
                    "Attempt already in progress"
                );
                return Err(AssayError::DuplicateAttempt(Box::new(existing)));
            }
        };

        info!(
            attempt_id = %attempt.id,
            assessment_id = %assessment_id,
            learner_id = %learner_id,
            attempt_number = attempt.attempt_number,
            "Started attempt"
        );

        Ok(StartedAttempt {
            attempt_id: attempt.id,
            attempt_number: attempt.attempt_number,
            duration_minutes: assessment.config.duration_minutes,
            start_time: attempt.start_time,
            assessment: self.redact(&assessment).await?,
        })
    }

    /// The assessment as a learner sees it, with answer keys removed
    pub async fn redact(&self, assessment: &Assessment) -> Result<RedactedAssessment> {
        let ids: Vec<_> = assessment
            .questions
            .iter()
            .map(|q| q.question_id.clone())
            .collect();
        let questions = self.store.get_questions(&ids).await?;

        let mut slots = Vec::with_capacity(assessment.questions.len());
        for slot in &assessment.questions {
            match questions.iter().find(|q| q.id == slot.question_id) {
                Some(question) => slots.push(RedactedSlot {
                    order: slot.order,
                    marks: slot.marks,
                    question: question.redacted(),
                }),
                None => warn!(
                    assessment_id = %assessment.id,
                    question_id = %slot.question_id,
                    "Assessment references a question missing from the catalog"
                ),
            }
        }
        slots.sort_by_key(|s| s.order);

        Ok(RedactedAssessment {
            id: assessment.id,
            course_id: assessment.course_id.clone(),
            title: assessment.title.clone(),
            kind: assessment.kind,
            duration_minutes: assessment.config.duration_minutes,
            total_marks: assessment.config.total_marks,
            passing_marks: assessment.config.passing_marks,
            schedule: assessment.schedule,
            questions: slots,
        })
    }

    /// End an owned in-progress attempt without scoring it
    pub async fn abandon(&self, attempt_id: AttemptId, learner_id: &LearnerId) -> Result<Attempt> {
        let attempt = self.owned_attempt(attempt_id, learner_id).await?;
        if !attempt.is_in_progress() {
            return Err(AssayError::InvalidState(format!(
                "attempt {attempt_id} is {}",
                attempt.status.as_str()
            )));
        }

        let closed = close(attempt, AttemptStatus::Abandoned, self.clock.now());
        if !self.store.finalize_attempt(&closed).await? {
            return Err(AssayError::InvalidState(format!(
                "attempt {attempt_id} was finalized concurrently"
            )));
        }

        info!(attempt_id = %attempt_id, learner_id = %learner_id, "Abandoned attempt");
        Ok(closed)
    }

    /// Mark in-progress attempts past their time limit as time-expired.
    ///
    /// Returns the ids that this call expired.
    pub async fn expire_overdue(&self, assessment_id: AssessmentId) -> Result<Vec<AttemptId>> {
        let assessment = self.load_assessment(assessment_id).await?;
        let limit = Duration::minutes(i64::from(assessment.config.duration_minutes));
        let now = self.clock.now();

        let mut expired = Vec::new();
        for attempt in self.store.attempts_for_assessment(assessment_id).await? {
            if !attempt.is_in_progress() || attempt.start_time + limit > now {
                continue;
            }
            let id = attempt.id;
            let closed = close(attempt, AttemptStatus::TimeExpired, now);
            // A concurrent submit wins
            if self.store.finalize_attempt(&closed).await? {
                expired.push(id);
            }
        }

        if !expired.is_empty() {
            info!(
                assessment_id = %assessment_id,
                count = expired.len(),
                "Expired overdue attempts"
            );
        }
        Ok(expired)
    }

    /// Move an assessment to `to` if the transition is allowed
    pub async fn transition_assessment(
        &self,
        id: AssessmentId,
        to: AssessmentStatus,
    ) -> Result<Assessment> {
        let mut assessment = self.load_assessment(id).await?;
        let from = assessment.status;
        if !from.can_transition_to(to) {
            return Err(AssayError::InvalidState(format!(
                "assessment {id} cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            )));
        }
        if !self.store.set_assessment_status(id, from, to).await? {
            return Err(AssayError::InvalidState(format!(
                "assessment {id} changed status concurrently"
            )));
        }

        debug!(
            assessment_id = %id,
            from = from.as_str(),
            to = to.as_str(),
            "Assessment transitioned"
        );
        assessment.status = to;
        Ok(assessment)
    }
}

fn close(mut attempt: Attempt, status: AttemptStatus, now: DateTime<Utc>) -> Attempt {
    attempt.status = status;
    attempt.end_time = Some(now);
    attempt.time_taken_seconds = (now - attempt.start_time).num_seconds().max(0) as u64;
    attempt
}
