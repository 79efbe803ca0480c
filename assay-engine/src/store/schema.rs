//! CozoDB schema definitions for the assessment store
//!
//! Each relation keys on the entity id and keeps the full record as a JSON
//! `body`. Columns used for lookups are duplicated next to the body so they
//! can be indexed.

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Initial schema creation script (Datalog)
pub const INITIAL_SCHEMA: &str = r#"
{
    :create schema_version {
        version: Int =>
        applied_at: Int,
        description: String
    }
}
{
    :create course {
        id: String =>
        body: String
    }
}
{
    :create question {
        id: String =>
        course_id: String,
        topic: String,
        difficulty: String,
        active: Bool,
        body: String
    }
}
{
    :create assessment {
        id: String =>
        course_id: String,
        status: String,
        body: String
    }
}
{
    :create attempt {
        id: String =>
        learner_id: String,
        assessment_id: String,
        status: String,
        start_time: Int,
        body: String
    }
}
{
    :create proficiency_context {
        learner_id: String =>
        body: String
    }
}
{
    ::index create question:by_course { course_id }
}
{
    ::index create attempt:by_assessment { assessment_id }
}
{
    ::index create attempt:by_learner { learner_id }
}
"#;

/// Schema migration definition
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    /// Human-readable description of what this migration does
    pub description: &'static str,
    /// The Datalog script to execute for this migration
    pub script: &'static str,
}

/// All migrations in order
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema",
    script: INITIAL_SCHEMA,
}];
