//! Assessment snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssessmentId, CourseId, LearnerId, QuestionId, RedactedQuestion};

/// Publication lifecycle of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Archived,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Forward-only transitions; archival is reachable from any live state.
    pub fn can_transition_to(&self, next: AssessmentStatus) -> bool {
        use AssessmentStatus::*;
        matches!(
            (self, next),
            (Draft, Published)
                | (Published, Ongoing)
                | (Ongoing, Completed)
                | (Published, Completed)
                | (Draft | Published | Ongoing | Completed, Archived)
        )
    }
}

impl std::str::FromStr for AssessmentStatus {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(super::ParseEnumError::new("assessment status", s)),
        }
    }
}

/// Kind of assessment requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    #[default]
    Practice,
    Quiz,
    Exam,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Quiz => "quiz",
            Self::Exam => "exam",
        }
    }
}

impl std::str::FromStr for AssessmentKind {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practice" => Ok(Self::Practice),
            "quiz" => Ok(Self::Quiz),
            "exam" => Ok(Self::Exam),
            _ => Err(super::ParseEnumError::new("assessment kind", s)),
        }
    }
}

/// A question slot in an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub question_id: QuestionId,
    pub marks: u32,
    /// 1-based position
    pub order: u32,
}

/// Scoring and presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    pub duration_minutes: u32,
    pub total_marks: u32,
    pub passing_marks: u32,
    /// Modelled but never applied by the scorer
    #[serde(default)]
    pub negative_marking: bool,
    #[serde(default)]
    pub show_answers: bool,
    #[serde(default)]
    pub randomize: bool,
}

/// Window in which the assessment can be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Schedule {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Percentages of easy/medium/hard questions targeted by generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// Record of how an adaptive assessment was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    pub target_learner: LearnerId,
    pub focus_topics: Vec<String>,
    pub difficulty_distribution: DifficultyDistribution,
}

/// Aggregate results across scored attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentStats {
    pub attempt_count: u32,
    pub pass_count: u32,
    pub average_percentage: f64,
    pub highest_percentage: u32,
    pub lowest_percentage: u32,
}

impl AssessmentStats {
    /// Fold one completed attempt into the aggregates
    pub fn record(&mut self, percentage: u32, passed: bool) {
        if self.attempt_count == 0 {
            self.highest_percentage = percentage;
            self.lowest_percentage = percentage;
        } else {
            self.highest_percentage = self.highest_percentage.max(percentage);
            self.lowest_percentage = self.lowest_percentage.min(percentage);
        }
        self.attempt_count += 1;
        if passed {
            self.pass_count += 1;
        }
        let n = f64::from(self.attempt_count);
        self.average_percentage =
            (self.average_percentage * (n - 1.0) + f64::from(percentage)) / n;
    }
}

/// An ordered question snapshot with scoring config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub course_id: CourseId,
    pub title: String,
    pub kind: AssessmentKind,
    pub questions: Vec<AssessmentQuestion>,
    pub config: AssessmentConfig,
    pub schedule: Schedule,
    pub status: AssessmentStatus,
    #[serde(default)]
    pub adaptive: Option<AdaptiveConfig>,
    #[serde(default)]
    pub stats: AssessmentStats,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    /// Published and inside the schedule window
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == AssessmentStatus::Published && self.schedule.contains(now)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Marks for a question in this assessment, if it is part of it
    pub fn marks_for(&self, question_id: &QuestionId) -> Option<u32> {
        self.questions
            .iter()
            .find(|q| &q.question_id == question_id)
            .map(|q| q.marks)
    }
}

/// Question slot handed to the learner at attempt start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedSlot {
    pub order: u32,
    pub marks: u32,
    pub question: RedactedQuestion,
}

/// Assessment as shown to the learner, with answer keys removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedAssessment {
    pub id: AssessmentId,
    pub course_id: CourseId,
    pub title: String,
    pub kind: AssessmentKind,
    pub duration_minutes: u32,
    pub total_marks: u32,
    pub passing_marks: u32,
    pub schedule: Schedule,
    pub questions: Vec<RedactedSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assessment(status: AssessmentStatus) -> Assessment {
        let start = Utc::now();
        Assessment {
            id: AssessmentId::new(),
            course_id: CourseId::new("CS301"),
            title: "Practice".into(),
            kind: AssessmentKind::Practice,
            questions: vec![],
            config: AssessmentConfig {
                duration_minutes: 30,
                total_marks: 0,
                passing_marks: 0,
                negative_marking: false,
                show_answers: false,
                randomize: true,
            },
            schedule: Schedule {
                start,
                end: start + Duration::days(7),
            },
            status,
            adaptive: None,
            stats: AssessmentStats::default(),
            created_at: start,
        }
    }

    #[test]
    fn test_active_requires_published_and_window() {
        let a = assessment(AssessmentStatus::Published);
        assert!(a.is_active(a.schedule.start + Duration::hours(1)));
        assert!(!a.is_active(a.schedule.start - Duration::seconds(1)));
        assert!(!a.is_active(a.schedule.end + Duration::seconds(1)));

        let draft = assessment(AssessmentStatus::Draft);
        assert!(!draft.is_active(draft.schedule.start));
    }

    #[test]
    fn test_status_transitions() {
        use AssessmentStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(Published.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Archived));
        assert!(!Archived.can_transition_to(Published));
        assert!(!Completed.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Ongoing));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = AssessmentStats::default();
        stats.record(80, true);
        stats.record(40, false);
        assert_eq!(stats.attempt_count, 2);
        assert_eq!(stats.pass_count, 1);
        assert_eq!(stats.highest_percentage, 80);
        assert_eq!(stats.lowest_percentage, 40);
        assert!((stats.average_percentage - 60.0).abs() < f64::EPSILON);
    }
}
