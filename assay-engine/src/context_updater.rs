//! Feedback rule closing the loop from scored attempts back into the
//! learner's proficiency context.
//!
//! Each topic score and the average response time move toward the attempt's
//! observation: `new = round(retain * old + (1 - retain) * observed)`.
//!
//! Every context write goes through [`ContextUpdater`] and runs under the
//! learner's lock. A scored attempt is finalized with `context_pending` set;
//! the update commits together with clearing that flag, so it lands exactly
//! once. Updates that failed are picked up again by [`ContextUpdater::settle`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ContextUpdateConfig;
use crate::error::Result;
use crate::locks::KeyedMutex;
use crate::store::AssayStore;
use crate::types::{Attempt, DifficultyPreference, LearnerId, ProficiencyContext};

/// Fold a completed attempt into `context`
pub fn apply_attempt(
    context: &mut ProficiencyContext,
    attempt: &Attempt,
    retain_weight: f64,
    now: DateTime<Utc>,
) {
    let retain = retain_weight.clamp(0.0, 1.0);
    let observe = 1.0 - retain;

    for topic in &attempt.topic_performance {
        let old = f64::from(context.score_or_default(&topic.topic));
        context.set_score(
            &topic.topic,
            retain * old + observe * f64::from(topic.accuracy),
        );
    }

    let answered = attempt.answered_count();
    if answered > 0 {
        let per_answer = attempt.time_taken_seconds as f64 / f64::from(answered);
        context.average_response_time_seconds =
            (retain * context.average_response_time_seconds + observe * per_answer).round();
    }

    context.total_attempts += 1;
    context.last_assessment_at = Some(now);
}

/// Applies the feedback rule against the store
pub struct ContextUpdater {
    store: Arc<dyn AssayStore>,
    clock: Arc<dyn Clock>,
    locks: KeyedMutex<LearnerId>,
    config: ContextUpdateConfig,
}

impl ContextUpdater {
    pub fn new(
        store: Arc<dyn AssayStore>,
        clock: Arc<dyn Clock>,
        config: ContextUpdateConfig,
    ) -> Self {
        Self {
            store,
            clock,
            locks: KeyedMutex::new(),
            config,
        }
    }

    /// Fold a finalized attempt into its owner's context.
    ///
    /// Returns the updated context, or `None` when the attempt has no
    /// pending update (already applied, or never completed).
    pub async fn apply(&self, attempt: &Attempt) -> Result<Option<ProficiencyContext>> {
        let _guard = self.locks.lock(&attempt.learner_id).await;
        self.apply_locked(attempt).await
    }

    async fn apply_locked(&self, attempt: &Attempt) -> Result<Option<ProficiencyContext>> {
        let mut context = self.store.load_context(&attempt.learner_id).await?;
        apply_attempt(
            &mut context,
            attempt,
            self.config.retain_weight,
            self.clock.now(),
        );

        if !self
            .store
            .commit_context_update(&context, attempt.id)
            .await?
        {
            debug!(attempt_id = %attempt.id, "No pending context update");
            return Ok(None);
        }

        debug!(
            learner_id = %attempt.learner_id,
            attempt_id = %attempt.id,
            topics = attempt.topic_performance.len(),
            total_attempts = context.total_attempts,
            "Updated proficiency context"
        );
        Ok(Some(context))
    }

    /// Apply every completed attempt of `learner_id` whose update is still
    /// pending, oldest first. Returns how many were applied.
    pub async fn settle(&self, learner_id: &LearnerId) -> Result<usize> {
        let _guard = self.locks.lock(learner_id).await;

        let mut pending: Vec<Attempt> = self
            .store
            .attempts_for_learner(learner_id, usize::MAX)
            .await?
            .into_iter()
            .filter(Attempt::awaits_context_update)
            .collect();
        pending.sort_by_key(|a| (a.end_time, a.start_time));

        let mut applied = 0;
        for attempt in &pending {
            if self.apply_locked(attempt).await?.is_some() {
                applied += 1;
            }
        }
        if applied > 0 {
            info!(learner_id = %learner_id, applied, "Applied pending context updates");
        }
        Ok(applied)
    }

    /// Change the learner's difficulty preference
    pub async fn set_preference(
        &self,
        learner_id: &LearnerId,
        preference: DifficultyPreference,
    ) -> Result<ProficiencyContext> {
        let _guard = self.locks.lock(learner_id).await;

        let mut context = self.store.load_context(learner_id).await?;
        if context.difficulty_preference != preference {
            context.difficulty_preference = preference;
            self.store.save_context(&context).await?;
            debug!(learner_id = %learner_id, ?preference, "Set difficulty preference");
        }
        Ok(context)
    }
}
