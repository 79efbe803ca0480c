//! CozoDB-backed assessment store
//!
//! Wraps CozoDB with a RocksDB backend (or the in-memory engine for tests).
//! Handles schema initialization and migrations. Read-modify-write
//! operations run under a single write lock so each one is atomic with
//! respect to the others.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cozo::{DataValue, DbInstance, NamedRows, ScriptMutability};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::schema::{MIGRATIONS, Migration};
use super::{
    AssessmentStore, AttemptCreation, AttemptStore, CatalogStore, ContextStore, QuestionFilter,
};
use crate::error::{AssayError, Result};
use crate::types::{
    Assessment, AssessmentId, AssessmentStatus, Attempt, AttemptId, AttemptStatus, Course,
    CourseId, LearnerId, ProficiencyContext, Question, QuestionId,
};

/// CozoDB-backed store for every assessment relation
pub struct CozoStore {
    db: Arc<DbInstance>,
    write_lock: Mutex<()>,
}

impl CozoStore {
    /// Open or create an assessment database at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AssayError::Database(format!("Failed to create directory: {e}")))?;
        }

        let db = DbInstance::new("rocksdb", path, "")
            .map_err(|e| AssayError::Database(format!("Failed to open database: {e}")))?;

        let store = Self::from_db(db);
        store.ensure_schema().await?;
        info!(path = %path.display(), "Opened assessment database");
        Ok(store)
    }

    /// Non-persistent store backed by Cozo's in-memory engine
    pub async fn in_memory() -> Result<Self> {
        let db = DbInstance::new("mem", "", "")
            .map_err(|e| AssayError::Database(format!("Failed to create database: {e}")))?;

        let store = Self::from_db(db);
        store.ensure_schema().await?;
        Ok(store)
    }

    fn from_db(db: DbInstance) -> Self {
        Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        }
    }

    /// Get current schema version from database
    pub async fn get_schema_version(&self) -> Result<u32> {
        let query = "?[version] := *schema_version{version}, version = max(version)";

        match self.run_query(query, Default::default()).await {
            Ok(rows) if !rows.rows.is_empty() => {
                let version = rows.rows[0][0]
                    .get_int()
                    .ok_or_else(|| AssayError::Database("Invalid version type".into()))?;
                Ok(version as u32)
            }
            Ok(_) => Ok(0),
            Err(e) => {
                // Table does not exist before the first migration
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("Cannot find") {
                    Ok(0)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        let current = self.get_schema_version().await?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            self.apply_migration(migration).await?;
        }

        Ok(())
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        self.db
            .run_script(
                migration.script,
                Default::default(),
                ScriptMutability::Mutable,
            )
            .map_err(|e| {
                AssayError::Migration(format!("Migration {} failed: {e}", migration.version))
            })?;

        let record = "?[version, applied_at, description] <- [[$version, $applied_at, $description]]
            :put schema_version {version => applied_at, description}";
        let params = params([
            ("version", DataValue::from(i64::from(migration.version))),
            ("applied_at", DataValue::from(Utc::now().timestamp())),
            ("description", text(migration.description)),
        ]);

        self.db
            .run_script(record, params, ScriptMutability::Mutable)
            .map_err(|e| {
                AssayError::Migration(format!(
                    "Failed to record migration {}: {e}",
                    migration.version
                ))
            })?;

        debug!(version = migration.version, "Applied schema migration");
        Ok(())
    }

    async fn run_query(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<NamedRows> {
        self.db
            .run_script(query, params, ScriptMutability::Immutable)
            .map_err(|e| AssayError::Database(format!("Query failed: {e}")))
    }

    async fn run_mutation(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<NamedRows> {
        self.db
            .run_script(query, params, ScriptMutability::Mutable)
            .map_err(|e| AssayError::Database(format!("Mutation failed: {e}")))
    }

    /// First column of the first row, decoded from JSON
    async fn fetch_body<T: DeserializeOwned>(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<Option<T>> {
        let rows = self.run_query(query, params).await?;
        rows.rows.first().map(|row| decode(row, 0)).transpose()
    }

    /// First column of every row, decoded from JSON
    async fn fetch_bodies<T: DeserializeOwned>(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<Vec<T>> {
        let rows = self.run_query(query, params).await?;
        rows.rows.iter().map(|row| decode(row, 0)).collect()
    }

    async fn write_question(&self, question: &Question) -> Result<()> {
        let query = r#"?[id, course_id, topic, difficulty, active, body] <-
            [[$id, $course_id, $topic, $difficulty, $active, $body]]
            :put question {id => course_id, topic, difficulty, active, body}"#;
        let params = params([
            ("id", text(question.id.as_str())),
            ("course_id", text(question.course_id.as_str())),
            ("topic", text(&question.topic)),
            ("difficulty", text(question.difficulty.as_str())),
            ("active", DataValue::Bool(question.active)),
            ("body", encode(question)?),
        ]);
        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn write_assessment(&self, assessment: &Assessment) -> Result<()> {
        let query = r#"?[id, course_id, status, body] <- [[$id, $course_id, $status, $body]]
            :put assessment {id => course_id, status, body}"#;
        let params = params([
            ("id", text(assessment.id.to_string())),
            ("course_id", text(assessment.course_id.as_str())),
            ("status", text(assessment.status.as_str())),
            ("body", encode(assessment)?),
        ]);
        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn write_attempt(&self, attempt: &Attempt) -> Result<()> {
        let query = r#"?[id, learner_id, assessment_id, status, start_time, body] <-
            [[$id, $learner_id, $assessment_id, $status, $start_time, $body]]
            :put attempt {id => learner_id, assessment_id, status, start_time, body}"#;
        self.run_mutation(query, attempt_params(attempt)?).await?;
        Ok(())
    }

    async fn write_context(&self, context: &ProficiencyContext) -> Result<()> {
        let query = r#"?[learner_id, body] <- [[$learner_id, $body]]
            :put proficiency_context {learner_id => body}"#;
        let params = params([
            ("learner_id", text(context.learner_id.as_str())),
            ("body", encode(context)?),
        ]);
        self.run_mutation(query, params).await?;
        Ok(())
    }

    /// Context and attempt rows in one script, so one transaction
    async fn write_context_and_attempt(
        &self,
        context: &ProficiencyContext,
        attempt: &Attempt,
    ) -> Result<()> {
        let query = r#"
            {
                ?[learner_id, body] <- [[$learner_id, $context_body]]
                :put proficiency_context {learner_id => body}
            }
            {
                ?[id, learner_id, assessment_id, status, start_time, body] <-
                    [[$id, $learner_id, $assessment_id, $status, $start_time, $body]]
                :put attempt {id => learner_id, assessment_id, status, start_time, body}
            }"#;
        let mut params = attempt_params(attempt)?;
        params.insert("context_body".into(), encode(context)?);
        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn read_context(&self, learner_id: &LearnerId) -> Result<Option<ProficiencyContext>> {
        self.fetch_body(
            "?[body] := *proficiency_context{learner_id, body}, learner_id = $learner_id",
            params([("learner_id", text(learner_id.as_str()))]),
        )
        .await
    }
}

#[async_trait]
impl CatalogStore for CozoStore {
    async fn put_course(&self, course: &Course) -> Result<()> {
        let query = "?[id, body] <- [[$id, $body]] :put course {id => body}";
        let params = params([("id", text(course.id.as_str())), ("body", encode(course)?)]);
        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>> {
        self.fetch_body(
            "?[body] := *course{id, body}, id = $id",
            params([("id", text(id.as_str()))]),
        )
        .await
    }

    async fn put_question(&self, question: &Question) -> Result<()> {
        question.validate()?;
        self.write_question(question).await
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>> {
        self.fetch_body(
            "?[body] := *question{id, body}, id = $id",
            params([("id", text(id.as_str()))]),
        )
        .await
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = DataValue::List(ids.iter().map(|id| text(id.as_str())).collect());
        let found: Vec<Question> = self
            .fetch_bodies(
                "?[body] := *question{id, body}, is_in(id, $ids)",
                params([("ids", wanted)]),
            )
            .await?;

        // Preserve the caller's order
        let mut by_id: HashMap<QuestionId, Question> =
            found.into_iter().map(|q| (q.id.clone(), q)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn find_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        let candidates: Vec<Question> = self
            .fetch_bodies(
                "?[body, id] := *question{id, course_id, body}, course_id = $course_id :order id",
                params([("course_id", text(filter.course_id.as_str()))]),
            )
            .await?;
        Ok(candidates
            .into_iter()
            .filter(|q| filter.matches(q))
            .collect())
    }

    async fn record_usage(
        &self,
        id: &QuestionId,
        correct: bool,
        time_spent_seconds: u32,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut question = self
            .get_question(id)
            .await?
            .ok_or_else(|| AssayError::not_found("question", id))?;
        question.usage.record(correct, time_spent_seconds);
        self.write_question(&question).await
    }
}

#[async_trait]
impl AssessmentStore for CozoStore {
    async fn put_assessment(&self, assessment: &Assessment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_assessment(assessment).await
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>> {
        self.fetch_body(
            "?[body] := *assessment{id, body}, id = $id",
            params([("id", text(id.to_string()))]),
        )
        .await
    }

    async fn set_assessment_status(
        &self,
        id: AssessmentId,
        from: AssessmentStatus,
        to: AssessmentStatus,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut assessment = self
            .get_assessment(id)
            .await?
            .ok_or_else(|| AssayError::not_found("assessment", id))?;
        if assessment.status != from {
            return Ok(false);
        }
        assessment.status = to;
        self.write_assessment(&assessment).await?;
        Ok(true)
    }

    async fn record_assessment_result(
        &self,
        id: AssessmentId,
        percentage: u32,
        passed: bool,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut assessment = self
            .get_assessment(id)
            .await?
            .ok_or_else(|| AssayError::not_found("assessment", id))?;
        assessment.stats.record(percentage, passed);
        self.write_assessment(&assessment).await
    }
}

#[async_trait]
impl AttemptStore for CozoStore {
    async fn create_attempt(
        &self,
        learner_id: &LearnerId,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<AttemptCreation> {
        let _guard = self.write_lock.lock().await;

        let prior: Vec<Attempt> = self
            .fetch_bodies(
                r#"?[body] := *attempt{learner_id, assessment_id, body},
                    learner_id = $learner_id, assessment_id = $assessment_id"#,
                params([
                    ("learner_id", text(learner_id.as_str())),
                    ("assessment_id", text(assessment.id.to_string())),
                ]),
            )
            .await?;

        if let Some(existing) = prior.iter().find(|a| a.is_in_progress()) {
            return Ok(AttemptCreation::Existing(existing.clone()));
        }

        let attempt = Attempt::start(
            learner_id.clone(),
            assessment,
            prior.len() as u32 + 1,
            now,
        );
        self.write_attempt(&attempt).await?;
        Ok(AttemptCreation::Created(attempt))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>> {
        self.fetch_body(
            "?[body] := *attempt{id, body}, id = $id",
            params([("id", text(id.to_string()))]),
        )
        .await
    }

    async fn attempts_for_assessment(&self, id: AssessmentId) -> Result<Vec<Attempt>> {
        let mut attempts: Vec<Attempt> = self
            .fetch_bodies(
                "?[body] := *attempt{assessment_id, body}, assessment_id = $assessment_id",
                params([("assessment_id", text(id.to_string()))]),
            )
            .await?;
        attempts.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    async fn attempts_for_learner(
        &self,
        learner_id: &LearnerId,
        limit: usize,
    ) -> Result<Vec<Attempt>> {
        let mut attempts: Vec<Attempt> = self
            .fetch_bodies(
                "?[body] := *attempt{learner_id, body}, learner_id = $learner_id",
                params([("learner_id", text(learner_id.as_str()))]),
            )
            .await?;
        attempts.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn finalize_attempt(&self, attempt: &Attempt) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let stored = self
            .get_attempt(attempt.id)
            .await?
            .ok_or_else(|| AssayError::not_found("attempt", attempt.id))?;
        if stored.status != AttemptStatus::InProgress {
            return Ok(false);
        }
        self.write_attempt(attempt).await?;
        Ok(true)
    }
}

#[async_trait]
impl ContextStore for CozoStore {
    async fn load_context(&self, learner_id: &LearnerId) -> Result<ProficiencyContext> {
        if let Some(context) = self.read_context(learner_id).await? {
            return Ok(context);
        }

        let _guard = self.write_lock.lock().await;
        // Another caller may have created it while we waited
        if let Some(context) = self.read_context(learner_id).await? {
            return Ok(context);
        }
        let context = ProficiencyContext::new(learner_id.clone());
        self.write_context(&context).await?;
        debug!(learner_id = %learner_id, "Created proficiency context");
        Ok(context)
    }

    async fn save_context(&self, context: &ProficiencyContext) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_context(context).await
    }

    async fn commit_context_update(
        &self,
        context: &ProficiencyContext,
        attempt_id: AttemptId,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut attempt) = self.get_attempt(attempt_id).await? else {
            return Ok(false);
        };
        if !attempt.awaits_context_update() || attempt.learner_id != context.learner_id {
            return Ok(false);
        }
        attempt.context_pending = false;
        self.write_context_and_attempt(context, &attempt).await?;
        Ok(true)
    }
}

// Helper functions for building parameters and parsing rows

fn params<const N: usize>(pairs: [(&str, DataValue); N]) -> BTreeMap<String, DataValue> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn attempt_params(attempt: &Attempt) -> Result<BTreeMap<String, DataValue>> {
    Ok(params([
        ("id", text(attempt.id.to_string())),
        ("learner_id", text(attempt.learner_id.as_str())),
        ("assessment_id", text(attempt.assessment_id.to_string())),
        ("status", text(attempt.status.as_str())),
        (
            "start_time",
            DataValue::from(attempt.start_time.timestamp_millis()),
        ),
        ("body", encode(attempt)?),
    ]))
}

fn text(value: impl Into<String>) -> DataValue {
    DataValue::Str(value.into().into())
}

fn encode<T: Serialize>(value: &T) -> Result<DataValue> {
    Ok(text(serde_json::to_string(value)?))
}

fn decode<T: DeserializeOwned>(row: &[DataValue], column: usize) -> Result<T> {
    let body = row
        .get(column)
        .and_then(DataValue::get_str)
        .ok_or_else(|| AssayError::Database("Invalid body column".into()))?;
    serde_json::from_str(body).map_err(|e| AssayError::Serialization(e.to_string()))
}
