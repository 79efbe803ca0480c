//! User-facing performance report for one completed attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::statistics::percentile;
use crate::config::StatisticsConfig;
use crate::types::{
    Assessment, AssessmentId, Attempt, AttemptId, AttemptStatus, DifficultyPerformance,
    LearnerId, PerformanceStatus, TopicPerformance, percentage_of,
};

/// Letter grade from a score percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Self::APlus,
            80..=89 => Self::A,
            70..=79 => Self::BPlus,
            60..=69 => Self::B,
            50..=59 => Self::C,
            40..=49 => Self::D,
            _ => Self::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a percentile falls among peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Standing {
    #[serde(rename = "top-25")]
    Top25,
    AboveAverage,
    BelowAverage,
    #[serde(rename = "bottom-25")]
    Bottom25,
}

impl Standing {
    pub fn from_percentile(percentile: u32) -> Self {
        match percentile {
            75.. => Self::Top25,
            50..=74 => Self::AboveAverage,
            25..=49 => Self::BelowAverage,
            _ => Self::Bottom25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top25 => "top-25",
            Self::AboveAverage => "above-average",
            Self::BelowAverage => "below-average",
            Self::Bottom25 => "bottom-25",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub attempt_id: AttemptId,
    pub assessment_id: AssessmentId,
    pub assessment_title: String,
    pub learner_id: LearnerId,
    pub attempt_number: u32,
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInfo {
    pub obtained: u32,
    pub total: u32,
    pub percentage: u32,
    pub grade: LetterGrade,
    pub passing_marks: u32,
    pub is_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_taken_seconds: u64,
    pub duration_minutes: u32,
    /// Seconds per answered question
    pub average_time_per_question: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerStats {
    pub total_questions: u32,
    pub answered: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub flagged: u32,
    /// Correct share of answered questions
    pub accuracy: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerComparison {
    /// `None` until enough attempts are completed
    pub percentile: Option<u32>,
    pub standing: Option<Standing>,
    pub completed_attempts: usize,
}

/// Full report for a completed attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub basic: BasicInfo,
    pub score: ScoreInfo,
    pub time: TimeInfo,
    pub answers: AnswerStats,
    pub topic_performance: Vec<TopicPerformance>,
    pub difficulty_performance: DifficultyPerformance,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub peer_comparison: PeerComparison,
}

impl PerformanceReport {
    /// Build the report.
    ///
    /// `completed_scores` holds the percentage of every completed attempt on
    /// the assessment, this one included.
    pub fn build(
        attempt: &Attempt,
        assessment: &Assessment,
        completed_scores: &[u32],
        statistics: &StatisticsConfig,
    ) -> Self {
        let answered = attempt.answered_count();
        let percentile = percentile(
            attempt.score.percentage,
            completed_scores,
            statistics.percentile_min_attempts,
        );

        Self {
            basic: BasicInfo {
                attempt_id: attempt.id,
                assessment_id: assessment.id,
                assessment_title: assessment.title.clone(),
                learner_id: attempt.learner_id.clone(),
                attempt_number: attempt.attempt_number,
                status: attempt.status,
            },
            score: ScoreInfo {
                obtained: attempt.score.obtained,
                total: attempt.score.total,
                percentage: attempt.score.percentage,
                grade: LetterGrade::from_percentage(attempt.score.percentage),
                passing_marks: assessment.config.passing_marks,
                is_passed: attempt.is_passed,
            },
            time: TimeInfo {
                start_time: attempt.start_time,
                end_time: attempt.end_time,
                time_taken_seconds: attempt.time_taken_seconds,
                duration_minutes: assessment.config.duration_minutes,
                average_time_per_question: if answered == 0 {
                    0
                } else {
                    (attempt.time_taken_seconds as f64 / f64::from(answered)).round() as u32
                },
            },
            answers: AnswerStats {
                total_questions: assessment.question_count() as u32,
                answered,
                correct: attempt.correct_answers,
                incorrect: attempt.incorrect_answers,
                unanswered: attempt.unanswered,
                flagged: attempt.answers.iter().filter(|a| a.flagged).count() as u32,
                accuracy: percentage_of(attempt.correct_answers, answered),
            },
            topic_performance: attempt.topic_performance.clone(),
            difficulty_performance: attempt.difficulty_performance,
            strengths: attempt.strengths.clone(),
            weaknesses: attempt.weaknesses.clone(),
            recommendations: recommendations(attempt),
            peer_comparison: PeerComparison {
                percentile,
                standing: percentile.map(Standing::from_percentile),
                completed_attempts: completed_scores.len(),
            },
        }
    }
}

/// Next steps derived from one attempt
pub fn recommendations(attempt: &Attempt) -> Vec<String> {
    let mut out = Vec::new();

    for topic in &attempt.weaknesses {
        out.push(format!("Review the fundamentals of {topic}"));
    }
    for topic in attempt
        .topic_performance
        .iter()
        .filter(|t| t.status == PerformanceStatus::Average)
    {
        out.push(format!("Practice more {} questions", topic.topic));
    }

    let hard = &attempt.difficulty_performance.hard;
    if hard.attempted > 0 && hard.accuracy < 50 {
        out.push("Work through more hard problems step by step".to_string());
    }
    if attempt.unanswered > 0 {
        out.push(format!(
            "Attempt every question: {} left unanswered",
            attempt.unanswered
        ));
    }

    if out.is_empty() {
        out.push("Strong result: try a harder assessment next".to_string());
    }
    out
}
