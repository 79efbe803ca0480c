//! Answer grading
//!
//! Submitted values are resolved against the question type here. A value
//! whose shape does not fit the type is malformed and the entry is skipped,
//! counting as unanswered.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::types::{
    AnswerSubmission, AnswerValue, AnsweredQuestion, Assessment, Question, QuestionId,
    QuestionType,
};

/// Grade one value; `None` if the value shape does not fit the question type
pub fn is_correct(question: &Question, value: &AnswerValue) -> Option<bool> {
    let canonical = question.correct_answer.as_deref();
    match (question.question_type, value) {
        (QuestionType::MultipleChoice, AnswerValue::Text(choice)) => Some(
            question
                .options
                .iter()
                .any(|o| o.is_correct && o.id.as_str() == choice.as_str()),
        ),
        (QuestionType::MultipleChoice, _) => None,

        (QuestionType::TrueFalse, AnswerValue::Boolean(b)) => {
            let submitted = if *b { "true" } else { "false" };
            Some(canonical.is_some_and(|c| same_text(c, submitted)))
        }
        (QuestionType::TrueFalse, AnswerValue::Text(s)) => {
            Some(canonical.is_some_and(|c| same_text(c, s)))
        }
        (QuestionType::TrueFalse, AnswerValue::Number(_)) => None,

        (_, AnswerValue::Boolean(_)) => None,
        (_, text_or_number) => {
            let submitted = text_or_number.to_string();
            Some(canonical.is_some_and(|c| same_text(c, &submitted)))
        }
    }
}

/// Unicode case-insensitive equality, ignoring surrounding whitespace
fn same_text(canonical: &str, submitted: &str) -> bool {
    canonical.trim().to_lowercase() == submitted.trim().to_lowercase()
}

/// Grade a submission against an assessment.
///
/// Entries for questions outside the assessment or missing from the catalog,
/// repeated entries, entries without a value and entries of the wrong shape
/// are skipped. The result keeps submission order.
pub fn grade_answers(
    assessment: &Assessment,
    questions: &HashMap<QuestionId, Question>,
    answers: &[AnswerSubmission],
) -> Vec<AnsweredQuestion> {
    let mut seen = HashSet::new();
    let mut graded = Vec::with_capacity(answers.len());

    for answer in answers {
        let id = &answer.question_id;
        let Some(max_marks) = assessment.marks_for(id) else {
            debug!(question_id = %id, "Skipping answer for question outside assessment");
            continue;
        };
        let Some(question) = questions.get(id) else {
            debug!(question_id = %id, "Skipping answer for question missing from catalog");
            continue;
        };
        if !seen.insert(id.clone()) {
            debug!(question_id = %id, "Skipping duplicate answer");
            continue;
        }
        let Some(value) = &answer.value else {
            debug!(question_id = %id, "Skipping answer without a value");
            continue;
        };
        let Some(correct) = is_correct(question, value) else {
            debug!(
                question_id = %id,
                question_type = question.question_type.as_str(),
                "Skipping answer with incompatible value"
            );
            continue;
        };

        graded.push(AnsweredQuestion {
            question_id: id.clone(),
            submitted_value: value.clone(),
            is_correct: correct,
            marks_obtained: if correct { max_marks } else { 0 },
            max_marks,
            time_spent_seconds: answer.time_spent_seconds,
            flagged: answer.flagged,
        });
    }

    graded
}
