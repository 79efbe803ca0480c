//! Configuration for the assessment engine.
//!
//! Every threshold the engine uses lives here. Context-level bands,
//! attempt-level topic status bands and strength/weakness highlight bands
//! are independent families.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DifficultyDistribution;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayConfig {
    /// Path to the on-disk database
    pub db_path: PathBuf,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub context: ContextUpdateConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub insights: InsightConfig,
    #[serde(default)]
    pub collaborator: CollaboratorConfig,
}

impl Default for AssayConfig {
    fn default() -> Self {
        Self {
            db_path: assay_paths::database_dir(),
            generator: GeneratorConfig::default(),
            thresholds: ThresholdConfig::default(),
            context: ContextUpdateConfig::default(),
            statistics: StatisticsConfig::default(),
            insights: InsightConfig::default(),
            collaborator: CollaboratorConfig::default(),
        }
    }
}

/// Adaptive generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Difficulty mix when the learner prefers adaptive difficulty
    pub adaptive_mix: DifficultyDistribution,
    /// Difficulty mix for every other preference
    pub fixed_mix: DifficultyDistribution,
    /// Candidate window per bucket, as a multiple of the bucket count
    pub overfetch_factor: u32,
    /// Days a generated assessment stays open
    pub schedule_days: i64,
    /// Percentage of total marks needed to pass, rounded up
    pub passing_percent: u32,
    pub default_duration_minutes: u32,
    /// Largest question count one request may ask for
    pub max_questions: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            adaptive_mix: DifficultyDistribution {
                easy: 30,
                medium: 50,
                hard: 20,
            },
            fixed_mix: DifficultyDistribution {
                easy: 30,
                medium: 40,
                hard: 30,
            },
            overfetch_factor: 2,
            schedule_days: 7,
            passing_percent: 40,
            default_duration_minutes: 30,
            max_questions: 500,
        }
    }
}

/// Context-level topic bands used by generation and insights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBands {
    /// Scores below this are weak
    pub weak_below: u32,
    /// Scores at or above this are strong
    pub strong_from: u32,
}

/// Attempt-level topic status bands used in reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicStatusBands {
    pub strong_from: u32,
    pub average_from: u32,
}

/// Attempt-level strength and weakness cut-offs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightBands {
    pub strength_from: u32,
    pub weakness_below: u32,
}

/// The three independent threshold families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub context: ContextBands,
    pub topic_status: TopicStatusBands,
    pub highlights: HighlightBands,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            context: ContextBands {
                weak_below: 60,
                strong_from: 80,
            },
            topic_status: TopicStatusBands {
                strong_from: 70,
                average_from: 50,
            },
            highlights: HighlightBands {
                strength_from: 80,
                weakness_below: 50,
            },
        }
    }
}

/// Feedback rule settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextUpdateConfig {
    /// Weight kept from the previous value (the new value gets `1 - retain_weight`)
    pub retain_weight: f64,
}

impl Default for ContextUpdateConfig {
    fn default() -> Self {
        Self { retain_weight: 0.7 }
    }
}

/// Settings for cross-attempt statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Share of attempts in each of the top and bottom groups
    pub discrimination_group_ratio: f64,
    /// Scored attempts needed before a discrimination index is computed
    pub discrimination_min_attempts: usize,
    /// Completed attempts needed before a percentile is reported
    pub percentile_min_attempts: usize,
    /// Values per side of a trend comparison
    pub trend_window: usize,
    /// Trend threshold for a single learner's history
    pub learner_trend_threshold: f64,
    /// Trend threshold for assessment-wide score series
    pub batch_trend_threshold: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            discrimination_group_ratio: 0.27,
            discrimination_min_attempts: 4,
            percentile_min_attempts: 2,
            trend_window: 3,
            learner_trend_threshold: 5.0,
            batch_trend_threshold: 10.0,
        }
    }
}

/// Settings for learner insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Recent completed attempts considered for the progress trend
    pub recent_attempts: usize,
    /// Average seconds per answer below which a learner is a rapid responder
    pub rapid_below_seconds: f64,
    /// Average seconds per answer above which a learner is deliberate
    pub deliberate_above_seconds: f64,
    /// Mean topic score needed for each mastery level
    pub developing_from: f64,
    pub proficient_from: f64,
    pub expert_from: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            recent_attempts: 10,
            rapid_below_seconds: 30.0,
            deliberate_above_seconds: 90.0,
            developing_from: 40.0,
            proficient_from: 60.0,
            expert_from: 80.0,
        }
    }
}

/// External question-generation collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Ask the collaborator when a bucket comes up short
    pub enabled: bool,
    /// Upper bound on one collaborator call
    pub timeout_ms: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssayConfig::default();
        assert_eq!(config.db_path, assay_paths::database_dir());
        assert_eq!(config.generator.overfetch_factor, 2);
        assert_eq!(config.generator.schedule_days, 7);
    }

    #[test]
    fn test_threshold_families_are_distinct() {
        let t = ThresholdConfig::default();
        assert_eq!(t.context.weak_below, 60);
        assert_eq!(t.context.strong_from, 80);
        assert_eq!(t.topic_status.strong_from, 70);
        assert_eq!(t.topic_status.average_from, 50);
        assert_eq!(t.highlights.strength_from, 80);
        assert_eq!(t.highlights.weakness_below, 50);
    }

    #[test]
    fn test_trend_thresholds_are_distinct() {
        let s = StatisticsConfig::default();
        assert!((s.learner_trend_threshold - 5.0).abs() < f64::EPSILON);
        assert!((s.batch_trend_threshold - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_serialization() {
        let config = AssayConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: AssayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
db_path = "/tmp/assay-db"

[collaborator]
enabled = false
timeout_ms = 250
"#;
        let parsed: AssayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.db_path, PathBuf::from("/tmp/assay-db"));
        assert!(!parsed.collaborator.enabled);
        assert_eq!(parsed.generator, GeneratorConfig::default());
    }

    #[test]
    fn test_partial_generator_section_keeps_other_fields() {
        let parsed: AssayConfig =
            toml::from_str("db_path = \"/tmp/x\"\n[generator]\nmax_questions = 50\n").unwrap();
        assert_eq!(parsed.generator.max_questions, 50);
        assert_eq!(parsed.generator.passing_percent, 40);
    }
}
