//! Assessment service
//!
//! One entry point wiring generation, the attempt lifecycle, scoring,
//! context feedback and reporting over a shared store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{Clock, Sampler};
use crate::config::AssayConfig;
use crate::context_updater::ContextUpdater;
use crate::error::{AssayError, Result};
use crate::generation::{AdaptiveGenerator, GenerateRequest, GenerationPlan, QuestionSource};
use crate::lifecycle::{AttemptManager, StartedAttempt};
use crate::performance::{
    AssessmentAnalytics, LearningInsights, PerformanceAggregator, PerformanceReport,
};
use crate::scoring::SubmissionScorer;
use crate::store::{AssayStore, QuestionFilter};
use crate::types::{
    AnswerSubmission, Assessment, AssessmentId, AssessmentStatus, Attempt, AttemptId, Course,
    CourseId, DifficultyPreference, LearnerId, ProficiencyContext, Question,
};

/// Closed-loop assessment operations over one store
pub struct AssessmentService {
    store: Arc<dyn AssayStore>,
    config: AssayConfig,
    generator: AdaptiveGenerator,
    attempts: AttemptManager,
    updater: Arc<ContextUpdater>,
    scorer: SubmissionScorer,
}

impl AssessmentService {
    pub fn new(
        store: Arc<dyn AssayStore>,
        clock: Arc<dyn Clock>,
        sampler: Arc<Sampler>,
        config: AssayConfig,
    ) -> Self {
        let generator = AdaptiveGenerator::new(store.clone(), clock.clone(), sampler, &config);
        let attempts = AttemptManager::new(store.clone(), clock.clone());
        let updater = Arc::new(ContextUpdater::new(
            store.clone(),
            clock.clone(),
            config.context.clone(),
        ));
        let scorer = SubmissionScorer::new(
            store.clone(),
            clock,
            PerformanceAggregator::new(config.thresholds.clone()),
            updater.clone(),
        );

        Self {
            store,
            config,
            generator,
            attempts,
            updater,
            scorer,
        }
    }

    /// Attach a collaborator for topping up short difficulty buckets
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn QuestionSource>) -> Self {
        self.generator = self.generator.with_source(source);
        self
    }

    pub fn config(&self) -> &AssayConfig {
        &self.config
    }

    // Catalog

    pub async fn put_course(&self, course: &Course) -> Result<()> {
        self.store.put_course(course).await
    }

    pub async fn get_course(&self, id: &CourseId) -> Result<Course> {
        self.store
            .get_course(id)
            .await?
            .ok_or_else(|| AssayError::not_found("course", id))
    }

    pub async fn put_question(&self, question: &Question) -> Result<()> {
        self.store.put_question(question).await
    }

    pub async fn find_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        self.store.find_questions(filter).await
    }

    pub async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment> {
        self.store
            .get_assessment(id)
            .await?
            .ok_or_else(|| AssayError::not_found("assessment", id))
    }

    pub async fn get_context(&self, learner_id: &LearnerId) -> Result<ProficiencyContext> {
        self.store.load_context(learner_id).await
    }

    /// Store a difficulty preference for future generation
    pub async fn set_difficulty_preference(
        &self,
        learner_id: &LearnerId,
        preference: DifficultyPreference,
    ) -> Result<ProficiencyContext> {
        self.updater.set_preference(learner_id, preference).await
    }

    /// Apply context updates left pending by earlier failures
    pub async fn settle_context(&self, learner_id: &LearnerId) -> Result<usize> {
        self.updater.settle(learner_id).await
    }

    // Generation and lifecycle

    pub async fn plan_assessment(&self, request: &GenerateRequest) -> Result<GenerationPlan> {
        self.updater.settle(&request.learner_id).await?;
        self.generator.plan(request).await
    }

    /// Generate against an up-to-date context; pending updates land first
    pub async fn generate_assessment(&self, request: &GenerateRequest) -> Result<Assessment> {
        self.updater.settle(&request.learner_id).await?;
        self.generator.generate(request).await
    }

    pub async fn start_attempt(
        &self,
        learner_id: &LearnerId,
        assessment_id: AssessmentId,
    ) -> Result<StartedAttempt> {
        self.attempts.start(learner_id, assessment_id).await
    }

    pub async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        learner_id: &LearnerId,
        answers: &[AnswerSubmission],
    ) -> Result<Attempt> {
        if let Err(e) = self.updater.settle(learner_id).await {
            warn!(learner_id = %learner_id, error = %e, "Pending context updates not applied");
        }
        self.scorer.submit(attempt_id, learner_id, answers).await
    }

    pub async fn abandon_attempt(
        &self,
        attempt_id: AttemptId,
        learner_id: &LearnerId,
    ) -> Result<Attempt> {
        self.attempts.abandon(attempt_id, learner_id).await
    }

    pub async fn expire_overdue(&self, assessment_id: AssessmentId) -> Result<Vec<AttemptId>> {
        self.attempts.expire_overdue(assessment_id).await
    }

    pub async fn transition_assessment(
        &self,
        id: AssessmentId,
        to: AssessmentStatus,
    ) -> Result<Assessment> {
        self.attempts.transition_assessment(id, to).await
    }

    // Reporting

    /// Report for a completed attempt owned by `learner_id`
    pub async fn performance_report(
        &self,
        attempt_id: AttemptId,
        learner_id: &LearnerId,
    ) -> Result<PerformanceReport> {
        let attempt = self.attempts.owned_attempt(attempt_id, learner_id).await?;
        if !attempt.is_completed() {
            return Err(AssayError::InvalidState(format!(
                "attempt {attempt_id} is {}, reports need a completed attempt",
                attempt.status.as_str()
            )));
        }

        let assessment = self.get_assessment(attempt.assessment_id).await?;
        let completed_scores: Vec<u32> = self
            .store
            .attempts_for_assessment(assessment.id)
            .await?
            .iter()
            .filter(|a| a.is_completed())
            .map(|a| a.score.percentage)
            .collect();

        Ok(PerformanceReport::build(
            &attempt,
            &assessment,
            &completed_scores,
            &self.config.statistics,
        ))
    }

    pub async fn learning_insights(&self, learner_id: &LearnerId) -> Result<LearningInsights> {
        let context = self.store.load_context(learner_id).await?;
        let recent: Vec<Attempt> = self
            .store
            .attempts_for_learner(learner_id, self.config.insights.recent_attempts)
            .await?
            .into_iter()
            .filter(Attempt::is_completed)
            .collect();

        debug!(
            learner_id = %learner_id,
            recent = recent.len(),
            "Building learning insights"
        );

        Ok(LearningInsights::build(
            &context,
            &recent,
            &self.config.thresholds.context,
            &self.config.insights,
            &self.config.statistics,
        ))
    }

    pub async fn assessment_analytics(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<AssessmentAnalytics> {
        let assessment = self.get_assessment(assessment_id).await?;
        let attempts = self.store.attempts_for_assessment(assessment_id).await?;
        Ok(AssessmentAnalytics::build(
            &assessment,
            &attempts,
            &self.config.statistics,
        ))
    }
}
