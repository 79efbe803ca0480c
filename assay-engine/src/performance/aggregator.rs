//! Per-attempt performance breakdown
//!
//! Topic accuracy, difficulty accuracy and strength/weakness highlights for
//! a single graded attempt. Topic status uses the attempt-level bands, never
//! the context-level ones.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::types::{
    AnsweredQuestion, Difficulty, DifficultyPerformance, DifficultyStats, PerformanceStatus,
    Question, QuestionId, TopicPerformance, percentage_of,
};

/// Derived fields of a graded attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptBreakdown {
    pub topic_performance: Vec<TopicPerformance>,
    pub difficulty_performance: DifficultyPerformance,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Default)]
struct Tally {
    attempted: u32,
    correct: u32,
    time: u64,
}

/// Computes attempt-level performance from graded answers
#[derive(Debug, Clone)]
pub struct PerformanceAggregator {
    thresholds: ThresholdConfig,
}

impl PerformanceAggregator {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn topic_status(&self, accuracy: u32) -> PerformanceStatus {
        let bands = &self.thresholds.topic_status;
        if accuracy >= bands.strong_from {
            PerformanceStatus::Strong
        } else if accuracy >= bands.average_from {
            PerformanceStatus::Average
        } else {
            PerformanceStatus::Weak
        }
    }

    /// Accuracy and mean time per topic over answered questions, by topic name
    pub fn topic_performance(
        &self,
        answers: &[AnsweredQuestion],
        questions: &HashMap<QuestionId, Question>,
    ) -> Vec<TopicPerformance> {
        let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
        for answer in answers {
            let Some(question) = questions.get(&answer.question_id) else {
                continue;
            };
            let tally = tallies.entry(question.topic.as_str()).or_default();
            tally.attempted += 1;
            tally.correct += u32::from(answer.is_correct);
            tally.time += u64::from(answer.time_spent_seconds);
        }

        tallies
            .into_iter()
            .map(|(topic, t)| {
                let accuracy = percentage_of(t.correct, t.attempted);
                TopicPerformance {
                    topic: topic.to_string(),
                    attempted: t.attempted,
                    correct: t.correct,
                    accuracy,
                    average_time_seconds: (t.time as f64 / f64::from(t.attempted)).round() as u32,
                    status: self.topic_status(accuracy),
                }
            })
            .collect()
    }

    /// Accuracy per difficulty tier over answered questions
    pub fn difficulty_performance(
        &self,
        answers: &[AnsweredQuestion],
        questions: &HashMap<QuestionId, Question>,
    ) -> DifficultyPerformance {
        let mut perf = DifficultyPerformance::default();
        for answer in answers {
            let Some(question) = questions.get(&answer.question_id) else {
                continue;
            };
            let stats = match question.difficulty {
                Difficulty::Easy => &mut perf.easy,
                Difficulty::Medium => &mut perf.medium,
                Difficulty::Hard => &mut perf.hard,
            };
            stats.attempted += 1;
            stats.correct += u32::from(answer.is_correct);
        }
        for stats in [&mut perf.easy, &mut perf.medium, &mut perf.hard] {
            finish(stats);
        }
        perf
    }

    /// Topics at or above the strength cut-off and below the weakness cut-off
    pub fn highlights(&self, topics: &[TopicPerformance]) -> (Vec<String>, Vec<String>) {
        let bands = &self.thresholds.highlights;
        let strengths = topics
            .iter()
            .filter(|t| t.accuracy >= bands.strength_from)
            .map(|t| t.topic.clone())
            .collect();
        let weaknesses = topics
            .iter()
            .filter(|t| t.accuracy < bands.weakness_below)
            .map(|t| t.topic.clone())
            .collect();
        (strengths, weaknesses)
    }

    pub fn breakdown(
        &self,
        answers: &[AnsweredQuestion],
        questions: &HashMap<QuestionId, Question>,
    ) -> AttemptBreakdown {
        let topic_performance = self.topic_performance(answers, questions);
        let (strengths, weaknesses) = self.highlights(&topic_performance);
        AttemptBreakdown {
            difficulty_performance: self.difficulty_performance(answers, questions),
            topic_performance,
            strengths,
            weaknesses,
        }
    }
}

impl Default for PerformanceAggregator {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

fn finish(stats: &mut DifficultyStats) {
    stats.accuracy = percentage_of(stats.correct, stats.attempted);
}
