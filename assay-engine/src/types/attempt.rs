//! Learner attempts and their graded results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Assessment, AssessmentId, AttemptId, LearnerId, QuestionId};

/// Lifecycle of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
    TimeExpired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::TimeExpired => "time_expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            "time_expired" => Ok(Self::TimeExpired),
            _ => Err(super::ParseEnumError::new("attempt status", s)),
        }
    }
}

/// Raw value a learner submitted for a question.
///
/// The meaning depends on the question type and is resolved by the grader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One entry of a submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    /// Missing or null values are treated as malformed
    #[serde(default)]
    pub value: Option<AnswerValue>,
    #[serde(default)]
    pub time_spent_seconds: u32,
    #[serde(default)]
    pub flagged: bool,
}

/// A graded answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: QuestionId,
    pub submitted_value: AnswerValue,
    pub is_correct: bool,
    pub marks_obtained: u32,
    pub max_marks: u32,
    pub time_spent_seconds: u32,
    pub flagged: bool,
}

/// Marks obtained against the assessment total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub obtained: u32,
    pub total: u32,
    pub percentage: u32,
}

impl Score {
    /// Build a score with `percentage = round(100 * obtained / total)`
    pub fn new(obtained: u32, total: u32) -> Self {
        Self {
            obtained,
            total,
            percentage: percentage_of(obtained, total),
        }
    }
}

/// `round(100 * part / whole)`, zero when `whole` is zero
pub fn percentage_of(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * f64::from(part) / f64::from(whole)).round() as u32
}

/// Attempt-level classification of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Strong,
    Average,
    Weak,
}

/// Accuracy on one topic within an attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub attempted: u32,
    pub correct: u32,
    pub accuracy: u32,
    pub average_time_seconds: u32,
    pub status: PerformanceStatus,
}

/// Accuracy for one difficulty tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub attempted: u32,
    pub correct: u32,
    pub accuracy: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyPerformance {
    pub easy: DifficultyStats,
    pub medium: DifficultyStats,
    pub hard: DifficultyStats,
}

/// One learner's instance of taking an assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub learner_id: LearnerId,
    pub assessment_id: AssessmentId,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_taken_seconds: u64,
    #[serde(default)]
    pub answers: Vec<AnsweredQuestion>,
    pub score: Score,
    #[serde(default)]
    pub is_passed: bool,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub incorrect_answers: u32,
    pub unanswered: u32,
    #[serde(default)]
    pub topic_performance: Vec<TopicPerformance>,
    #[serde(default)]
    pub difficulty_performance: DifficultyPerformance,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Completed but not yet folded into the learner's context
    #[serde(default)]
    pub context_pending: bool,
}

impl Attempt {
    /// Fresh in-progress attempt for `assessment`
    pub fn start(
        learner_id: LearnerId,
        assessment: &Assessment,
        attempt_number: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            learner_id,
            assessment_id: assessment.id,
            attempt_number,
            status: AttemptStatus::InProgress,
            start_time: now,
            end_time: None,
            time_taken_seconds: 0,
            answers: Vec::new(),
            score: Score::new(0, assessment.config.total_marks),
            is_passed: false,
            correct_answers: 0,
            incorrect_answers: 0,
            unanswered: assessment.question_count() as u32,
            topic_performance: Vec::new(),
            difficulty_performance: DifficultyPerformance::default(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            context_pending: false,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    /// Completed and still owed to the context updater
    pub fn awaits_context_update(&self) -> bool {
        self.is_completed() && self.context_pending
    }

    /// Count of graded answers
    pub fn answered_count(&self) -> u32 {
        self.answers.len() as u32
    }
}
