//! Per-learner proficiency profile

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LearnerId;

/// Score assumed for a topic the learner has never been assessed on
pub const NEUTRAL_SCORE: u32 = 50;

/// Upper bound of a topic score
pub const MAX_SCORE: u32 = 100;

/// Preferred difficulty mix for generated assessments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPreference {
    Easy,
    Medium,
    Hard,
    #[default]
    Adaptive,
}

impl std::str::FromStr for DifficultyPreference {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "adaptive" => Ok(Self::Adaptive),
            _ => Err(super::ParseEnumError::new("difficulty preference", s)),
        }
    }
}

/// A learner's persisted proficiency profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProficiencyContext {
    pub learner_id: LearnerId,
    /// Topic scores in [0, 100]
    #[serde(default)]
    pub topic_scores: BTreeMap<String, u32>,
    #[serde(default)]
    pub difficulty_preference: DifficultyPreference,
    #[serde(default)]
    pub average_response_time_seconds: f64,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub last_assessment_at: Option<DateTime<Utc>>,
}

impl ProficiencyContext {
    /// Empty profile, every topic reading as neutral
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            topic_scores: BTreeMap::new(),
            difficulty_preference: DifficultyPreference::default(),
            average_response_time_seconds: 0.0,
            total_attempts: 0,
            last_assessment_at: None,
        }
    }

    /// Stored score, or [`NEUTRAL_SCORE`] for an unseen topic
    pub fn score_or_default(&self, topic: &str) -> u32 {
        self.topic_scores
            .get(topic)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    /// Store a score, rounded and clamped to [0, 100]
    pub fn set_score(&mut self, topic: &str, score: f64) {
        let clamped = score.round().clamp(0.0, f64::from(MAX_SCORE)) as u32;
        self.topic_scores.insert(topic.to_string(), clamped);
    }

    /// Mean of all stored topic scores, `None` before the first assessment
    pub fn mean_score(&self) -> Option<f64> {
        if self.topic_scores.is_empty() {
            return None;
        }
        let sum: u32 = self.topic_scores.values().sum();
        Some(f64::from(sum) / self.topic_scores.len() as f64)
    }
}
