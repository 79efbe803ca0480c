//! Assessment-wide analytics over completed attempts

use serde::{Deserialize, Serialize};

use super::statistics::{QuestionOutcome, TrendDirection, discrimination_index, round2, trend};
use crate::config::StatisticsConfig;
use crate::types::{Assessment, AssessmentId, Attempt, QuestionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalytics {
    pub question_id: QuestionId,
    pub order: u32,
    /// Completed attempts that answered the question
    pub attempted: u32,
    pub correct: u32,
    /// Fraction of completed attempts that got it right
    pub facility: f64,
    pub discrimination_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAnalytics {
    pub assessment_id: AssessmentId,
    pub completed_attempts: usize,
    pub average_percentage: f64,
    pub highest_percentage: Option<u32>,
    pub lowest_percentage: Option<u32>,
    /// Fraction of completed attempts that passed
    pub pass_rate: f64,
    pub questions: Vec<QuestionAnalytics>,
    /// Score direction across attempts in completion order
    pub score_trend: TrendDirection,
}

impl AssessmentAnalytics {
    /// `attempts` may contain any status; only completed ones count
    pub fn build(
        assessment: &Assessment,
        attempts: &[Attempt],
        statistics: &StatisticsConfig,
    ) -> Self {
        let mut completed: Vec<&Attempt> = attempts.iter().filter(|a| a.is_completed()).collect();
        completed.sort_by_key(|a| (a.end_time, a.id));
        let n = completed.len();

        let scores: Vec<u32> = completed.iter().map(|a| a.score.percentage).collect();
        let average_percentage = if n == 0 {
            0.0
        } else {
            round2(scores.iter().map(|s| f64::from(*s)).sum::<f64>() / n as f64)
        };
        let pass_rate = if n == 0 {
            0.0
        } else {
            round2(completed.iter().filter(|a| a.is_passed).count() as f64 / n as f64)
        };

        let questions = assessment
            .questions
            .iter()
            .map(|slot| {
                let mut attempted = 0;
                let outcomes: Vec<QuestionOutcome> = completed
                    .iter()
                    .map(|a| {
                        let answer = a.answers.iter().find(|x| x.question_id == slot.question_id);
                        attempted += u32::from(answer.is_some());
                        QuestionOutcome {
                            score: a.score.percentage,
                            correct: answer.is_some_and(|x| x.is_correct),
                        }
                    })
                    .collect();
                let correct = outcomes.iter().filter(|o| o.correct).count() as u32;

                QuestionAnalytics {
                    question_id: slot.question_id.clone(),
                    order: slot.order,
                    attempted,
                    correct,
                    facility: if n == 0 {
                        0.0
                    } else {
                        round2(f64::from(correct) / n as f64)
                    },
                    discrimination_index: discrimination_index(
                        &outcomes,
                        statistics.discrimination_group_ratio,
                        statistics.discrimination_min_attempts,
                    ),
                }
            })
            .collect();

        let series: Vec<f64> = scores.iter().map(|s| f64::from(*s)).collect();

        Self {
            assessment_id: assessment.id,
            completed_attempts: n,
            average_percentage,
            highest_percentage: scores.iter().max().copied(),
            lowest_percentage: scores.iter().min().copied(),
            pass_rate,
            questions,
            score_trend: trend(
                &series,
                statistics.trend_window,
                statistics.batch_trend_threshold,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AnswerValue, AnsweredQuestion, AssessmentConfig, AssessmentKind, AssessmentQuestion,
        AssessmentStats, AssessmentStatus, AttemptStatus, CourseId, LearnerId, Schedule, Score,
    };
    use chrono::{DateTime, Duration, Utc};

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn assessment() -> Assessment {
        Assessment {
            id: AssessmentId::new(),
            course_id: CourseId::new("CS301"),
            title: "Exam".into(),
            kind: AssessmentKind::Exam,
            questions: vec![
                AssessmentQuestion {
                    question_id: QuestionId::new("q1"),
                    marks: 1,
                    order: 1,
                },
                AssessmentQuestion {
                    question_id: QuestionId::new("q2"),
                    marks: 1,
                    order: 2,
                },
            ],
            config: AssessmentConfig {
                duration_minutes: 30,
                total_marks: 2,
                passing_marks: 1,
                negative_marking: false,
                show_answers: false,
                randomize: false,
            },
            schedule: Schedule {
                start: epoch(),
                end: epoch() + Duration::days(1),
            },
            status: AssessmentStatus::Published,
            adaptive: None,
            stats: AssessmentStats::default(),
            created_at: epoch(),
        }
    }

    fn completed(a: &Assessment, i: i64, percentage: u32, q1_correct: bool) -> Attempt {
        let mut attempt = Attempt::start(LearnerId::new(format!("l{i}")), a, 1, epoch());
        attempt.status = AttemptStatus::Completed;
        attempt.end_time = Some(epoch() + Duration::minutes(i));
        attempt.score = Score {
            obtained: 0,
            total: 2,
            percentage,
        };
        attempt.is_passed = percentage >= 50;
        attempt.answers = vec![AnsweredQuestion {
            question_id: QuestionId::new("q1"),
            submitted_value: AnswerValue::Text("x".into()),
            is_correct: q1_correct,
            marks_obtained: u32::from(q1_correct),
            max_marks: 1,
            time_spent_seconds: 10,
            flagged: false,
        }];
        attempt
    }

    #[test]
    fn test_analytics_over_completed_attempts() {
        let a = assessment();
        let mut attempts: Vec<Attempt> = (0..10)
            .map(|i| completed(&a, i, 100 - 10 * i as u32, i < 2))
            .collect();
        // In-progress attempts are ignored
        attempts.push(Attempt::start(LearnerId::new("late"), &a, 1, epoch()));

        let analytics = AssessmentAnalytics::build(&a, &attempts, &StatisticsConfig::default());

        assert_eq!(analytics.completed_attempts, 10);
        assert_eq!(analytics.highest_percentage, Some(100));
        assert_eq!(analytics.lowest_percentage, Some(10));
        assert!((analytics.average_percentage - 55.0).abs() < 1e-9);
        assert!((analytics.pass_rate - 0.6).abs() < 1e-9);

        let q1 = &analytics.questions[0];
        assert_eq!(q1.attempted, 10);
        assert_eq!(q1.correct, 2);
        assert!((q1.facility - 0.2).abs() < 1e-9);
        assert!((q1.discrimination_index - 1.0).abs() < 1e-9);

        let q2 = &analytics.questions[1];
        assert_eq!(q2.attempted, 0);
        assert_eq!(q2.discrimination_index, 0.0);

        // Scores fall by 10 per attempt: well past the batch threshold
        assert_eq!(analytics.score_trend, TrendDirection::Declining);
    }

    #[test]
    fn test_analytics_without_attempts() {
        let analytics =
            AssessmentAnalytics::build(&assessment(), &[], &StatisticsConfig::default());
        assert_eq!(analytics.completed_attempts, 0);
        assert_eq!(analytics.highest_percentage, None);
        assert_eq!(analytics.pass_rate, 0.0);
        assert_eq!(analytics.score_trend, TrendDirection::Stable);
    }
}
