//! Biased topic pool and difficulty counts
//!
//! Both are pure functions of the course topics, the learner's context and
//! configuration, so repeated generation against an unchanged context plans
//! the same pool and the same bucket sizes.

use serde::{Deserialize, Serialize};

use crate::config::{ContextBands, GeneratorConfig};
use crate::types::{Difficulty, DifficultyDistribution, DifficultyPreference, ProficiencyContext};

/// Context-level classification of a topic score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicBand {
    Weak,
    Medium,
    Strong,
}

pub fn classify(score: u32, bands: &ContextBands) -> TopicBand {
    if score < bands.weak_below {
        TopicBand::Weak
    } else if score >= bands.strong_from {
        TopicBand::Strong
    } else {
        TopicBand::Medium
    }
}

/// Topic list with repeats, used as sampling weights
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPool {
    entries: Vec<String>,
}

impl TopicPool {
    /// Build the pool in topic order.
    ///
    /// Weak topics appear twice and medium topics once. Strong topics
    /// contribute only the first half of their list (rounded up), once each.
    pub fn build(topics: &[String], context: &ProficiencyContext, bands: &ContextBands) -> Self {
        let banded: Vec<(&String, TopicBand)> = topics
            .iter()
            .map(|t| (t, classify(context.score_or_default(t), bands)))
            .collect();

        let strong_total = banded
            .iter()
            .filter(|(_, b)| *b == TopicBand::Strong)
            .count();
        let strong_kept = strong_total.div_ceil(2);

        let mut entries = Vec::new();
        let mut strong_seen = 0;
        for (topic, band) in banded {
            match band {
                TopicBand::Weak => {
                    entries.push(topic.clone());
                    entries.push(topic.clone());
                }
                TopicBand::Medium => entries.push(topic.clone()),
                TopicBand::Strong => {
                    if strong_seen < strong_kept {
                        entries.push(topic.clone());
                    }
                    strong_seen += 1;
                }
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Distinct topics in first-seen order
    pub fn topics(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for topic in &self.entries {
            if !seen.contains(topic) {
                seen.push(topic.clone());
            }
        }
        seen
    }

    /// How many times `topic` appears in the pool
    pub fn multiplicity(&self, topic: &str) -> usize {
        self.entries.iter().filter(|t| t.as_str() == topic).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Question count per difficulty bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyCounts {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultyCounts {
    /// Easy and medium round up, hard rounds down. The sum can miss the
    /// target by one and is left as is.
    pub fn from_mix(total: u32, mix: &DifficultyDistribution) -> Self {
        let share = |percent: u32| u64::from(total) * u64::from(percent);
        let clamp = |n: u64| u32::try_from(n).unwrap_or(u32::MAX);
        Self {
            easy: clamp(share(mix.easy).div_ceil(100)),
            medium: clamp(share(mix.medium).div_ceil(100)),
            hard: clamp(share(mix.hard) / 100),
        }
    }

    pub fn for_difficulty(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn total(&self) -> u32 {
        self.easy.saturating_add(self.medium).saturating_add(self.hard)
    }
}

/// Difficulty percentages for a learner's preference
pub fn mix_for(preference: DifficultyPreference, config: &GeneratorConfig) -> DifficultyDistribution {
    match preference {
        DifficultyPreference::Adaptive => config.adaptive_mix,
        _ => config.fixed_mix,
    }
}
