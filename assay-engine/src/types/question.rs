//! Question catalog records

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CourseId, OptionId, QuestionId};
use crate::error::{AssayError, Result};

/// Difficulty tier of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Error type for parsing enum values stored as strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

/// How a question is answered and graded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Coding,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple-choice",
            Self::TrueFalse => "true-false",
            Self::ShortAnswer => "short-answer",
            Self::Coding => "coding",
            Self::Essay => "essay",
        }
    }
}

/// One selectable option of a multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Running usage statistics for a question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub times_used: u32,
    /// Mean score (0-100) across all graded uses
    pub average_score: u32,
    /// Mean seconds spent across all graded uses
    pub average_time_seconds: u32,
}

impl UsageStats {
    /// Fold one graded use into the running averages.
    ///
    /// `avg = round((avg * (n - 1) + new) / n)` where `n` is the incremented
    /// use count.
    pub fn record(&mut self, correct: bool, time_spent_seconds: u32) {
        self.times_used += 1;
        let n = f64::from(self.times_used);
        let score = if correct { 100.0 } else { 0.0 };
        self.average_score =
            ((f64::from(self.average_score) * (n - 1.0) + score) / n).round() as u32;
        self.average_time_seconds = ((f64::from(self.average_time_seconds) * (n - 1.0)
            + f64::from(time_spent_seconds))
            / n)
            .round() as u32;
    }
}

fn default_active() -> bool {
    true
}

/// A question in the course catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub course_id: CourseId,
    pub topic: String,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Canonical answer for non-choice types
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub usage: UsageStats,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Question {
    /// Check structural invariants before a question enters the catalog
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(AssayError::Validation("question id is empty".into()));
        }
        if self.topic.trim().is_empty() {
            return Err(AssayError::Validation(format!(
                "question {} has no topic",
                self.id
            )));
        }

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.options.len() < 2 {
                    return Err(AssayError::Validation(format!(
                        "multiple-choice question {} needs at least 2 options",
                        self.id
                    )));
                }
                if !self.options.iter().any(|o| o.is_correct) {
                    return Err(AssayError::Validation(format!(
                        "multiple-choice question {} has no correct option",
                        self.id
                    )));
                }
            }
            QuestionType::TrueFalse => {
                let canonical = self
                    .correct_answer
                    .as_deref()
                    .map(|a| a.trim().to_ascii_lowercase());
                if !matches!(canonical.as_deref(), Some("true") | Some("false")) {
                    return Err(AssayError::Validation(format!(
                        "true-false question {} needs a true/false answer",
                        self.id
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Copy without answer keys, safe to hand to a learner
    pub fn redacted(&self) -> RedactedQuestion {
        RedactedQuestion {
            id: self.id.clone(),
            topic: self.topic.clone(),
            prompt: self.prompt.clone(),
            difficulty: self.difficulty,
            question_type: self.question_type,
            options: self
                .options
                .iter()
                .map(|o| RedactedOption {
                    id: o.id.clone(),
                    text: o.text.clone(),
                })
                .collect(),
        }
    }
}

/// Option as shown to a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedOption {
    pub id: OptionId,
    pub text: String,
}

/// Question as shown to a learner, without correctness data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedQuestion {
    pub id: QuestionId,
    pub topic: String,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub options: Vec<RedactedOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question(options: Vec<QuestionOption>) -> Question {
        Question {
            id: QuestionId::new("q1"),
            course_id: CourseId::new("CS301"),
            topic: "Arrays".into(),
            prompt: "Index of first element?".into(),
            difficulty: Difficulty::Easy,
            question_type: QuestionType::MultipleChoice,
            options,
            correct_answer: None,
            explanation: None,
            usage: UsageStats::default(),
            active: true,
        }
    }

    fn option(id: &str, correct: bool) -> QuestionOption {
        QuestionOption {
            id: OptionId::new(id),
            text: format!("option {id}"),
            is_correct: correct,
        }
    }

    #[test]
    fn test_difficulty_parse() {
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_str(d.as_str()).unwrap(), d);
        }
        assert!(Difficulty::from_str("brutal").is_err());
    }

    #[test]
    fn test_question_type_serializes_kebab_case() {
        let json = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
        assert_eq!(json, "\"multiple-choice\"");
        let parsed: QuestionType = serde_json::from_str("\"true-false\"").unwrap();
        assert_eq!(parsed, QuestionType::TrueFalse);
    }

    #[test]
    fn test_multiple_choice_requires_two_options() {
        let q = choice_question(vec![option("a", true)]);
        assert!(matches!(q.validate(), Err(AssayError::Validation(_))));
    }

    #[test]
    fn test_multiple_choice_requires_correct_option() {
        let q = choice_question(vec![option("a", false), option("b", false)]);
        assert!(q.validate().is_err());

        let q = choice_question(vec![option("a", false), option("b", true)]);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_true_false_requires_boolean_answer() {
        let mut q = choice_question(vec![]);
        q.question_type = QuestionType::TrueFalse;
        q.correct_answer = Some("maybe".into());
        assert!(q.validate().is_err());
        q.correct_answer = Some(" True ".into());
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_redacted_drops_correctness() {
        let q = choice_question(vec![option("a", true), option("b", false)]);
        let redacted = q.redacted();
        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("is_correct"));
        assert_eq!(redacted.options.len(), 2);
    }

    #[test]
    fn test_usage_stats_running_average() {
        let mut stats = UsageStats::default();
        stats.record(true, 30);
        assert_eq!(stats.times_used, 1);
        assert_eq!(stats.average_score, 100);
        assert_eq!(stats.average_time_seconds, 30);

        stats.record(false, 60);
        assert_eq!(stats.times_used, 2);
        assert_eq!(stats.average_score, 50);
        assert_eq!(stats.average_time_seconds, 45);

        stats.record(false, 0);
        // (50 * 2 + 0) / 3 = 33.3
        assert_eq!(stats.average_score, 33);
        assert_eq!(stats.average_time_seconds, 30);
    }

    #[test]
    fn test_active_defaults_true_when_missing() {
        let json = r#"{
            "id": "q9", "course_id": "CS301", "topic": "Trees", "prompt": "?",
            "difficulty": "hard", "question_type": "short-answer",
            "correct_answer": "root"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert!(q.active);
        assert_eq!(q.usage.times_used, 0);
    }
}
