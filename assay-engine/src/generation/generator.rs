//! Adaptive assessment generator
//!
//! Reads the learner's proficiency context and the course catalog, plans a
//! biased topic pool and difficulty buckets, samples questions per bucket and
//! persists the result as a published assessment.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::collaborator::{CandidateRequest, QuestionSource, fetch_candidates};
use super::pool::{DifficultyCounts, TopicPool, mix_for};
use crate::clock::{Clock, Sampler};
use crate::config::{AssayConfig, CollaboratorConfig, ContextBands, GeneratorConfig};
use crate::error::{AssayError, Result};
use crate::store::{AssayStore, QuestionFilter};
use crate::types::{
    AdaptiveConfig, Assessment, AssessmentConfig, AssessmentId, AssessmentKind,
    AssessmentQuestion, AssessmentStats, AssessmentStatus, Course, CourseId, Difficulty,
    DifficultyDistribution, LearnerId, Question, Schedule,
};

/// Parameters of one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub total_questions: u32,
    /// Falls back to the configured default
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub kind: AssessmentKind,
    /// Explicit focus; all course topics when absent or empty
    #[serde(default)]
    pub focus_topics: Option<Vec<String>>,
}

impl GenerateRequest {
    pub fn new(learner_id: LearnerId, course_id: CourseId, total_questions: u32) -> Self {
        Self {
            learner_id,
            course_id,
            total_questions,
            duration_minutes: None,
            kind: AssessmentKind::default(),
            focus_topics: None,
        }
    }
}

/// Everything decided before any question is sampled
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    pub course: Course,
    pub focus_topics: Vec<String>,
    pub pool: TopicPool,
    pub mix: DifficultyDistribution,
    pub counts: DifficultyCounts,
}

/// Builds personalized assessments from the catalog
pub struct AdaptiveGenerator {
    store: Arc<dyn AssayStore>,
    clock: Arc<dyn Clock>,
    sampler: Arc<Sampler>,
    source: Option<Arc<dyn QuestionSource>>,
    config: GeneratorConfig,
    bands: ContextBands,
    collaborator: CollaboratorConfig,
}

impl AdaptiveGenerator {
    pub fn new(
        store: Arc<dyn AssayStore>,
        clock: Arc<dyn Clock>,
        sampler: Arc<Sampler>,
        config: &AssayConfig,
    ) -> Self {
        Self {
            store,
            clock,
            sampler,
            source: None,
            config: config.generator.clone(),
            bands: config.thresholds.context,
            collaborator: config.collaborator.clone(),
        }
    }

    /// Use `source` to top up short buckets
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn QuestionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Resolve topics, pool and bucket sizes without sampling
    pub async fn plan(&self, request: &GenerateRequest) -> Result<GenerationPlan> {
        if request.total_questions == 0 {
            return Err(AssayError::Validation(
                "total_questions must be at least 1".into(),
            ));
        }
        if request.total_questions > self.config.max_questions {
            return Err(AssayError::Validation(format!(
                "total_questions must be at most {}",
                self.config.max_questions
            )));
        }

        let course = self
            .store
            .get_course(&request.course_id)
            .await?
            .ok_or_else(|| AssayError::not_found("course", &request.course_id))?;

        let focus_topics = match &request.focus_topics {
            Some(topics) if !topics.is_empty() => topics.clone(),
            _ => course.topics.clone(),
        };

        let context = self.store.load_context(&request.learner_id).await?;
        let pool = TopicPool::build(&focus_topics, &context, &self.bands);
        let mix = mix_for(context.difficulty_preference, &self.config);
        let counts = DifficultyCounts::from_mix(request.total_questions, &mix);

        debug!(
            learner_id = %request.learner_id,
            course_id = %course.id,
            pool = ?pool.entries(),
            easy = counts.easy,
            medium = counts.medium,
            hard = counts.hard,
            "Planned assessment"
        );

        Ok(GenerationPlan {
            course,
            focus_topics,
            pool,
            mix,
            counts,
        })
    }

    /// Generate and persist a published assessment for the requester
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Assessment> {
        let duration_minutes = request
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);
        if duration_minutes == 0 {
            return Err(AssayError::Validation(
                "duration_minutes must be at least 1".into(),
            ));
        }

        let plan = self.plan(request).await?;

        let mut selected = Vec::new();
        if !plan.pool.is_empty() {
            for difficulty in Difficulty::ALL {
                let count = plan.counts.for_difficulty(difficulty);
                if count == 0 {
                    continue;
                }
                let bucket = self.fill_bucket(&plan, difficulty, count).await?;
                if (bucket.len() as u32) < count {
                    debug!(
                        difficulty = difficulty.as_str(),
                        wanted = count,
                        got = bucket.len(),
                        "Bucket came up short"
                    );
                }
                selected.extend(bucket);
            }
        }
        self.sampler.shuffle(&mut selected);

        let assessment = self.assemble(request, plan, &selected, duration_minutes);
        self.store.put_assessment(&assessment).await?;

        info!(
            assessment_id = %assessment.id,
            learner_id = %request.learner_id,
            course_id = %assessment.course_id,
            questions = assessment.question_count(),
            "Generated adaptive assessment"
        );
        Ok(assessment)
    }

    /// Sample up to `count` distinct questions of one difficulty
    async fn fill_bucket(
        &self,
        plan: &GenerationPlan,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<Question>> {
        let topics = plan.pool.topics();
        let filter = QuestionFilter::for_course(plan.course.id.clone())
            .with_topics(topics.clone())
            .with_difficulty(difficulty);
        let mut candidates = self.store.find_questions(&filter).await?;

        if (candidates.len() as u32) < count
            && self.collaborator.enabled
            && let Some(source) = &self.source
        {
            let request = CandidateRequest {
                course_id: plan.course.id.clone(),
                topics,
                difficulty,
                count: count - candidates.len() as u32,
            };
            let timeout = StdDuration::from_millis(self.collaborator.timeout_ms);
            for question in fetch_candidates(source.as_ref(), &request, timeout).await {
                if candidates.iter().any(|c| c.id == question.id) {
                    continue;
                }
                // Never overwrite a catalog entry, retired or not
                if self.store.get_question(&question.id).await?.is_some() {
                    warn!(question_id = %question.id, "Skipping candidate with an existing id");
                    continue;
                }
                // Only catalogued questions can be graded later
                if let Err(e) = self.store.put_question(&question).await {
                    warn!(question_id = %question.id, error = %e, "Failed to catalog candidate");
                    continue;
                }
                candidates.push(question);
            }
        }

        let weighted: Vec<(Question, f64)> = candidates
            .into_iter()
            .map(|q| {
                let weight = plan.pool.multiplicity(&q.topic) as f64;
                (q, weight)
            })
            .collect();
        let mut window = self.sampler.weighted_order(weighted);
        let window_len = u64::from(count) * u64::from(self.config.overfetch_factor.max(1));
        window.truncate(usize::try_from(window_len).unwrap_or(usize::MAX));
        self.sampler.shuffle(&mut window);

        let mut seen = HashSet::new();
        Ok(window
            .into_iter()
            .filter(|q| seen.insert(q.id.clone()))
            .take(count as usize)
            .collect())
    }

    fn assemble(
        &self,
        request: &GenerateRequest,
        plan: GenerationPlan,
        selected: &[Question],
        duration_minutes: u32,
    ) -> Assessment {
        let now = self.clock.now();
        let questions: Vec<AssessmentQuestion> = selected
            .iter()
            .zip(1u32..)
            .map(|(q, order)| AssessmentQuestion {
                question_id: q.id.clone(),
                marks: 1,
                order,
            })
            .collect();
        let total_marks: u32 = questions.iter().map(|q| q.marks).sum();
        let passing_marks = (u64::from(total_marks) * u64::from(self.config.passing_percent))
            .div_ceil(100)
            .try_into()
            .unwrap_or(total_marks);

        Assessment {
            id: AssessmentId::new(),
            course_id: plan.course.id.clone(),
            title: format!("Adaptive {}: {}", request.kind.as_str(), plan.course.title),
            kind: request.kind,
            questions,
            config: AssessmentConfig {
                duration_minutes,
                total_marks,
                passing_marks,
                negative_marking: false,
                show_answers: true,
                randomize: true,
            },
            schedule: Schedule {
                start: now,
                end: now + Duration::days(self.config.schedule_days),
            },
            status: AssessmentStatus::Published,
            adaptive: Some(AdaptiveConfig {
                target_learner: request.learner_id.clone(),
                focus_topics: plan.focus_topics,
                difficulty_distribution: plan.mix,
            }),
            stats: AssessmentStats::default(),
            created_at: now,
        }
    }
}
