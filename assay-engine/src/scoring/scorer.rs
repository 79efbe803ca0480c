//! Submission scoring
//!
//! A submission is graded entirely in memory and committed with one
//! compare-and-set from in progress to completed. The committed attempt
//! carries `context_pending`; the context update and the usage/assessment
//! bookkeeping run only after that commit and never undo the attempt. A
//! failed context update is returned to the caller and stays pending until
//! the updater settles the learner.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::grader::grade_answers;
use crate::clock::Clock;
use crate::context_updater::ContextUpdater;
use crate::error::{AssayError, Result};
use crate::performance::PerformanceAggregator;
use crate::store::AssayStore;
use crate::types::{
    AnswerSubmission, AnsweredQuestion, Assessment, Attempt, AttemptId, AttemptStatus, LearnerId,
    Question, QuestionId, Score,
};

/// Grades submissions and closes attempts
pub struct SubmissionScorer {
    store: Arc<dyn AssayStore>,
    clock: Arc<dyn Clock>,
    aggregator: PerformanceAggregator,
    updater: Arc<ContextUpdater>,
}

impl SubmissionScorer {
    pub fn new(
        store: Arc<dyn AssayStore>,
        clock: Arc<dyn Clock>,
        aggregator: PerformanceAggregator,
        updater: Arc<ContextUpdater>,
    ) -> Self {
        Self {
            store,
            clock,
            aggregator,
            updater,
        }
    }

    /// Grade and finalize an owned in-progress attempt
    pub async fn submit(
        &self,
        attempt_id: AttemptId,
        learner_id: &LearnerId,
        answers: &[AnswerSubmission],
    ) -> Result<Attempt> {
        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| AssayError::not_found("attempt", attempt_id))?;
        if &attempt.learner_id != learner_id {
            return Err(AssayError::Forbidden(format!(
                "attempt {attempt_id} belongs to another learner"
            )));
        }
        if !attempt.is_in_progress() {
            return Err(AssayError::AlreadySubmitted(attempt_id));
        }

        let assessment = self
            .store
            .get_assessment(attempt.assessment_id)
            .await?
            .ok_or_else(|| AssayError::not_found("assessment", attempt.assessment_id))?;

        let ids: Vec<QuestionId> = assessment
            .questions
            .iter()
            .map(|q| q.question_id.clone())
            .collect();
        let questions: HashMap<QuestionId, Question> = self
            .store
            .get_questions(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        let graded = grade_answers(&assessment, &questions, answers);
        let mut scored = self.score(attempt, &assessment, &questions, graded, self.clock.now());

        if !self.store.finalize_attempt(&scored).await? {
            return Err(AssayError::AlreadySubmitted(attempt_id));
        }

        info!(
            attempt_id = %attempt_id,
            learner_id = %learner_id,
            percentage = scored.score.percentage,
            passed = scored.is_passed,
            answered = scored.answered_count(),
            "Scored attempt"
        );

        let applied = self.updater.apply(&scored).await;
        self.record_post_commit(&scored).await;

        match applied {
            Ok(_) => {
                scored.context_pending = false;
                Ok(scored)
            }
            Err(e) => {
                warn!(
                    attempt_id = %attempt_id,
                    error = %e,
                    "Context update left pending"
                );
                Err(e)
            }
        }
    }

    /// Fill in every derived field of a completed attempt
    pub fn score(
        &self,
        mut attempt: Attempt,
        assessment: &Assessment,
        questions: &HashMap<QuestionId, Question>,
        answers: Vec<AnsweredQuestion>,
        now: DateTime<Utc>,
    ) -> Attempt {
        let obtained: u32 = answers.iter().map(|a| a.marks_obtained).sum();
        let correct = answers.iter().filter(|a| a.is_correct).count() as u32;
        let answered = answers.len() as u32;
        let breakdown = self.aggregator.breakdown(&answers, questions);

        attempt.status = AttemptStatus::Completed;
        attempt.end_time = Some(now);
        attempt.time_taken_seconds = (now - attempt.start_time).num_seconds().max(0) as u64;
        attempt.score = Score::new(obtained, assessment.config.total_marks);
        attempt.is_passed = obtained >= assessment.config.passing_marks;
        attempt.correct_answers = correct;
        attempt.incorrect_answers = answered - correct;
        attempt.unanswered = (assessment.question_count() as u32).saturating_sub(answered);
        attempt.answers = answers;
        attempt.topic_performance = breakdown.topic_performance;
        attempt.difficulty_performance = breakdown.difficulty_performance;
        attempt.strengths = breakdown.strengths;
        attempt.weaknesses = breakdown.weaknesses;
        attempt.context_pending = true;
        attempt
    }

    async fn record_post_commit(&self, attempt: &Attempt) {
        for answer in &attempt.answers {
            if let Err(e) = self
                .store
                .record_usage(&answer.question_id, answer.is_correct, answer.time_spent_seconds)
                .await
            {
                warn!(
                    question_id = %answer.question_id,
                    error = %e,
                    "Failed to record question usage"
                );
            }
        }

        if let Err(e) = self
            .store
            .record_assessment_result(
                attempt.assessment_id,
                attempt.score.percentage,
                attempt.is_passed,
            )
            .await
        {
            warn!(
                assessment_id = %attempt.assessment_id,
                error = %e,
                "Failed to record assessment stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{ContextUpdateConfig, ThresholdConfig};
    use crate::store::{
        AssessmentStore, AttemptCreation, AttemptStore, CatalogStore, ContextStore, MemoryStore,
    };
    use crate::types::{
        AnswerValue, AssessmentConfig, AssessmentId, AssessmentKind, AssessmentQuestion,
        AssessmentStats, AssessmentStatus, CourseId, Difficulty, QuestionType, Schedule,
        UsageStats,
    };
    use chrono::Duration;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn question(i: usize) -> Question {
        Question {
            id: QuestionId::new(format!("q{i}")),
            course_id: CourseId::new("CS301"),
            topic: if i < 5 { "Arrays" } else { "Trees" }.into(),
            prompt: format!("Question {i}"),
            difficulty: Difficulty::Medium,
            question_type: QuestionType::ShortAnswer,
            options: vec![],
            correct_answer: Some(format!("answer-{i}")),
            explanation: None,
            usage: UsageStats::default(),
            active: true,
        }
    }

    fn assessment(count: usize, passing_marks: u32) -> Assessment {
        Assessment {
            id: AssessmentId::new(),
            course_id: CourseId::new("CS301"),
            title: "Quiz".into(),
            kind: AssessmentKind::Quiz,
            questions: (0..count)
                .map(|i| AssessmentQuestion {
                    question_id: QuestionId::new(format!("q{i}")),
                    marks: 1,
                    order: i as u32 + 1,
                })
                .collect(),
            config: AssessmentConfig {
                duration_minutes: 30,
                total_marks: count as u32,
                passing_marks,
                negative_marking: false,
                show_answers: false,
                randomize: false,
            },
            schedule: Schedule {
                start: epoch(),
                end: epoch() + Duration::days(7),
            },
            status: AssessmentStatus::Published,
            adaptive: None,
            stats: AssessmentStats::default(),
            created_at: epoch(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        scorer: SubmissionScorer,
        assessment: Assessment,
        attempt: Attempt,
    }

    async fn fixture(count: usize, passing_marks: u32) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        for i in 0..count {
            store.put_question(&question(i)).await.unwrap();
        }
        let assessment = assessment(count, passing_marks);
        store.put_assessment(&assessment).await.unwrap();

        let clock = Arc::new(FixedClock::new(epoch()));
        let AttemptCreation::Created(attempt) = store
            .create_attempt(&LearnerId::new("l1"), &assessment, epoch())
            .await
            .unwrap()
        else {
            panic!("expected created");
        };

        let updater = Arc::new(ContextUpdater::new(
            store.clone(),
            clock.clone(),
            ContextUpdateConfig::default(),
        ));
        let scorer = SubmissionScorer::new(
            store.clone(),
            clock.clone(),
            PerformanceAggregator::new(ThresholdConfig::default()),
            updater,
        );
        Fixture {
            store,
            clock,
            scorer,
            assessment,
            attempt,
        }
    }

    fn answers(correct: usize, wrong: usize) -> Vec<AnswerSubmission> {
        (0..correct + wrong)
            .map(|i| AnswerSubmission {
                question_id: QuestionId::new(format!("q{i}")),
                value: Some(AnswerValue::Text(if i < correct {
                    format!("answer-{i}")
                } else {
                    "wrong".into()
                })),
                time_spent_seconds: 30,
                flagged: i == 0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_ten_answered_six_correct() {
        let f = fixture(10, 6).await;
        f.clock.advance(Duration::minutes(5));

        let scored = f
            .scorer
            .submit(f.attempt.id, &LearnerId::new("l1"), &answers(6, 4))
            .await
            .unwrap();

        assert_eq!(scored.status, AttemptStatus::Completed);
        assert_eq!(scored.score.obtained, 6);
        assert_eq!(scored.score.total, 10);
        assert_eq!(scored.score.percentage, 60);
        assert!(scored.is_passed);
        assert_eq!(scored.correct_answers, 6);
        assert_eq!(scored.incorrect_answers, 4);
        assert_eq!(scored.unanswered, 0);
        assert_eq!(scored.time_taken_seconds, 300);
        assert_eq!(scored.end_time, Some(epoch() + Duration::minutes(5)));

        let stored = f.store.get_attempt(f.attempt.id).await.unwrap().unwrap();
        assert_eq!(stored, scored);
    }

    #[tokio::test]
    async fn test_fails_below_passing_marks() {
        let f = fixture(10, 7).await;
        let scored = f
            .scorer
            .submit(f.attempt.id, &LearnerId::new("l1"), &answers(6, 4))
            .await
            .unwrap();
        assert!(!scored.is_passed);
    }

    #[tokio::test]
    async fn test_unanswered_counts_skipped_entries() {
        let f = fixture(10, 5).await;
        let mut submitted = answers(3, 1);
        submitted.push(AnswerSubmission {
            question_id: QuestionId::new("q9"),
            value: None,
            time_spent_seconds: 0,
            flagged: false,
        });
        let scored = f
            .scorer
            .submit(f.attempt.id, &LearnerId::new("l1"), &submitted)
            .await
            .unwrap();
        assert_eq!(scored.answered_count(), 4);
        assert_eq!(scored.unanswered, 6);
        assert_eq!(scored.score.percentage, 30);
    }

    #[tokio::test]
    async fn test_replay_is_rejected_without_side_effects() {
        let f = fixture(10, 6).await;
        let learner = LearnerId::new("l1");
        f.scorer
            .submit(f.attempt.id, &learner, &answers(6, 4))
            .await
            .unwrap();

        let stored = f.store.get_attempt(f.attempt.id).await.unwrap();
        let ctx = f.store.load_context(&learner).await.unwrap();
        let usage = f
            .store
            .get_question(&QuestionId::new("q0"))
            .await
            .unwrap()
            .unwrap()
            .usage;

        let replay = f
            .scorer
            .submit(f.attempt.id, &learner, &answers(10, 0))
            .await;
        assert!(matches!(replay, Err(AssayError::AlreadySubmitted(_))));

        assert_eq!(f.store.get_attempt(f.attempt.id).await.unwrap(), stored);
        assert_eq!(f.store.load_context(&learner).await.unwrap(), ctx);
        let usage_after = f
            .store
            .get_question(&QuestionId::new("q0"))
            .await
            .unwrap()
            .unwrap()
            .usage;
        assert_eq!(usage_after, usage);
    }

    #[tokio::test]
    async fn test_submit_by_other_learner_is_forbidden() {
        let f = fixture(3, 1).await;
        let result = f
            .scorer
            .submit(f.attempt.id, &LearnerId::new("intruder"), &answers(3, 0))
            .await;
        assert!(matches!(result, Err(AssayError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_submit_unknown_attempt_is_not_found() {
        let f = fixture(3, 1).await;
        let result = f
            .scorer
            .submit(AttemptId::new(), &LearnerId::new("l1"), &[])
            .await;
        assert!(matches!(result, Err(AssayError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_side_effects_after_commit() {
        let f = fixture(10, 6).await;
        let learner = LearnerId::new("l1");
        f.scorer
            .submit(f.attempt.id, &learner, &answers(5, 5))
            .await
            .unwrap();

        // Arrays q0..q4 all correct, Trees q5..q9 all wrong
        let ctx = f.store.load_context(&learner).await.unwrap();
        assert_eq!(ctx.score_or_default("Arrays"), 65);
        assert_eq!(ctx.score_or_default("Trees"), 35);
        assert_eq!(ctx.total_attempts, 1);

        let q0 = f
            .store
            .get_question(&QuestionId::new("q0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(q0.usage.times_used, 1);
        assert_eq!(q0.usage.average_score, 100);
        assert_eq!(q0.usage.average_time_seconds, 30);

        let stats = f
            .store
            .get_assessment(f.assessment.id)
            .await
            .unwrap()
            .unwrap()
            .stats;
        assert_eq!(stats.attempt_count, 1);
        assert_eq!(stats.highest_percentage, 50);
    }

    #[tokio::test]
    async fn test_breakdown_fills_strengths_and_weaknesses() {
        let f = fixture(10, 6).await;
        let scored = f
            .scorer
            .submit(f.attempt.id, &LearnerId::new("l1"), &answers(5, 5))
            .await
            .unwrap();
        assert_eq!(scored.strengths, vec!["Arrays"]);
        assert_eq!(scored.weaknesses, vec!["Trees"]);
        assert_eq!(scored.difficulty_performance.medium.accuracy, 50);
    }

    /// Memory store whose context commits fail while `failing` is set
    struct FlakyContextStore {
        inner: MemoryStore,
        failing: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl CatalogStore for FlakyContextStore {
        async fn put_course(&self, course: &crate::types::Course) -> Result<()> {
            self.inner.put_course(course).await
        }
        async fn get_course(&self, id: &CourseId) -> Result<Option<crate::types::Course>> {
            self.inner.get_course(id).await
        }
        async fn put_question(&self, question: &Question) -> Result<()> {
            self.inner.put_question(question).await
        }
        async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>> {
            self.inner.get_question(id).await
        }
        async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>> {
            self.inner.get_questions(ids).await
        }
        async fn find_questions(
            &self,
            filter: &crate::store::QuestionFilter,
        ) -> Result<Vec<Question>> {
            self.inner.find_questions(filter).await
        }
        async fn record_usage(&self, id: &QuestionId, correct: bool, time: u32) -> Result<()> {
            self.inner.record_usage(id, correct, time).await
        }
    }

    #[async_trait::async_trait]
    impl AssessmentStore for FlakyContextStore {
        async fn put_assessment(&self, assessment: &Assessment) -> Result<()> {
            self.inner.put_assessment(assessment).await
        }
        async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>> {
            self.inner.get_assessment(id).await
        }
        async fn set_assessment_status(
            &self,
            id: AssessmentId,
            from: AssessmentStatus,
            to: AssessmentStatus,
        ) -> Result<bool> {
            self.inner.set_assessment_status(id, from, to).await
        }
        async fn record_assessment_result(
            &self,
            id: AssessmentId,
            percentage: u32,
            passed: bool,
        ) -> Result<()> {
            self.inner
                .record_assessment_result(id, percentage, passed)
                .await
        }
    }

    #[async_trait::async_trait]
    impl AttemptStore for FlakyContextStore {
        async fn create_attempt(
            &self,
            learner_id: &LearnerId,
            assessment: &Assessment,
            now: DateTime<Utc>,
        ) -> Result<AttemptCreation> {
            self.inner.create_attempt(learner_id, assessment, now).await
        }
        async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>> {
            self.inner.get_attempt(id).await
        }
        async fn attempts_for_assessment(&self, id: AssessmentId) -> Result<Vec<Attempt>> {
            self.inner.attempts_for_assessment(id).await
        }
        async fn attempts_for_learner(
            &self,
            learner_id: &LearnerId,
            limit: usize,
        ) -> Result<Vec<Attempt>> {
            self.inner.attempts_for_learner(learner_id, limit).await
        }
        async fn finalize_attempt(&self, attempt: &Attempt) -> Result<bool> {
            self.inner.finalize_attempt(attempt).await
        }
    }

    #[async_trait::async_trait]
    impl ContextStore for FlakyContextStore {
        async fn load_context(
            &self,
            learner_id: &LearnerId,
        ) -> Result<crate::types::ProficiencyContext> {
            self.inner.load_context(learner_id).await
        }
        async fn save_context(&self, context: &crate::types::ProficiencyContext) -> Result<()> {
            self.inner.save_context(context).await
        }
        async fn commit_context_update(
            &self,
            context: &crate::types::ProficiencyContext,
            attempt_id: AttemptId,
        ) -> Result<bool> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AssayError::Database("context relation unavailable".into()));
            }
            self.inner.commit_context_update(context, attempt_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_context_update_stays_pending_until_settled() {
        let store = Arc::new(FlakyContextStore {
            inner: MemoryStore::new(),
            failing: std::sync::atomic::AtomicBool::new(true),
        });
        for i in 0..10 {
            store.put_question(&question(i)).await.unwrap();
        }
        let assessment = assessment(10, 6);
        store.put_assessment(&assessment).await.unwrap();
        let learner = LearnerId::new("l1");
        let AttemptCreation::Created(attempt) = store
            .create_attempt(&learner, &assessment, epoch())
            .await
            .unwrap()
        else {
            panic!("expected created");
        };

        let clock = Arc::new(FixedClock::new(epoch()));
        let updater = Arc::new(ContextUpdater::new(
            store.clone(),
            clock.clone(),
            ContextUpdateConfig::default(),
        ));
        let scorer = SubmissionScorer::new(
            store.clone(),
            clock,
            PerformanceAggregator::new(ThresholdConfig::default()),
            updater.clone(),
        );

        let result = scorer.submit(attempt.id, &learner, &answers(5, 5)).await;
        assert!(matches!(result, Err(AssayError::Database(_))));

        // The grade stands and the update is owed
        let stored = store.get_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Completed);
        assert!(stored.context_pending);
        assert_eq!(store.load_context(&learner).await.unwrap().total_attempts, 0);
        let q0 = store.get_question(&QuestionId::new("q0")).await.unwrap().unwrap();
        assert_eq!(q0.usage.times_used, 1);

        let replay = scorer.submit(attempt.id, &learner, &answers(5, 5)).await;
        assert!(matches!(replay, Err(AssayError::AlreadySubmitted(_))));

        store
            .failing
            .store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(updater.settle(&learner).await.unwrap(), 1);
        assert_eq!(updater.settle(&learner).await.unwrap(), 0);

        let ctx = store.load_context(&learner).await.unwrap();
        assert_eq!(ctx.score_or_default("Arrays"), 65);
        assert_eq!(ctx.score_or_default("Trees"), 35);
        assert_eq!(ctx.total_attempts, 1);
        assert!(!store.get_attempt(attempt.id).await.unwrap().unwrap().context_pending);
    }
}
