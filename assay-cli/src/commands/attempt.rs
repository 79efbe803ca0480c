//! Attempt lifecycle commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assay_engine::{
    AnswerSubmission, AssayError, AssessmentId, AssessmentService, Attempt, AttemptId, LearnerId,
};
use clap::{Args, Subcommand};

use super::print_json;

#[derive(Args)]
pub struct AttemptArgs {
    #[command(subcommand)]
    pub command: AttemptCommands,
}

#[derive(Subcommand)]
pub enum AttemptCommands {
    /// Start an attempt and print the assessment without answer keys
    Start {
        #[arg(long)]
        learner: String,
        assessment: AssessmentId,
    },
    /// Submit answers from a JSON file and print the score
    Submit {
        #[arg(long)]
        learner: String,
        attempt: AttemptId,
        /// JSON array of {question_id, value, time_spent_seconds, flagged}
        #[arg(long)]
        answers: PathBuf,
        /// Print the scored attempt as JSON
        #[arg(long)]
        json: bool,
    },
    /// Abandon an in-progress attempt
    Abandon {
        #[arg(long)]
        learner: String,
        attempt: AttemptId,
    },
    /// Expire attempts past their time limit
    Expire { assessment: AssessmentId },
}

pub async fn run(args: AttemptArgs, service: &AssessmentService) -> Result<()> {
    match args.command {
        AttemptCommands::Start {
            learner,
            assessment,
        } => start(service, LearnerId::new(learner), assessment).await,
        AttemptCommands::Submit {
            learner,
            attempt,
            answers,
            json,
        } => {
            let answers = read_answers(&answers)?;
            let scored = service
                .submit_attempt(attempt, &LearnerId::new(learner), &answers)
                .await?;
            if json {
                print_json(&scored)
            } else {
                print_score(&scored);
                Ok(())
            }
        }
        AttemptCommands::Abandon { learner, attempt } => {
            let closed = service
                .abandon_attempt(attempt, &LearnerId::new(learner))
                .await?;
            println!("Abandoned attempt {}", closed.id);
            Ok(())
        }
        AttemptCommands::Expire { assessment } => {
            let expired = service.expire_overdue(assessment).await?;
            if expired.is_empty() {
                println!("No overdue attempts.");
            } else {
                println!("Expired {} attempt(s):", expired.len());
                for id in expired {
                    println!("  {}", id);
                }
            }
            Ok(())
        }
    }
}

async fn start(
    service: &AssessmentService,
    learner: LearnerId,
    assessment: AssessmentId,
) -> Result<()> {
    match service.start_attempt(&learner, assessment).await {
        Ok(started) => print_json(&started),
        Err(AssayError::DuplicateAttempt(existing)) => anyhow::bail!(
            "learner {} already has attempt {} in progress (started {})",
            learner,
            existing.id,
            existing.start_time.to_rfc3339()
        ),
        Err(e) => Err(e.into()),
    }
}

pub fn read_answers(path: &Path) -> Result<Vec<AnswerSubmission>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_score(attempt: &Attempt) {
    println!("Attempt {} scored", attempt.id);
    println!(
        "  Score:      {}/{} ({}%) {}",
        attempt.score.obtained,
        attempt.score.total,
        attempt.score.percentage,
        if attempt.is_passed { "PASSED" } else { "FAILED" }
    );
    println!(
        "  Answers:    {} correct, {} incorrect, {} unanswered",
        attempt.correct_answers, attempt.incorrect_answers, attempt.unanswered
    );
    println!("  Time:       {}s", attempt.time_taken_seconds);
    if !attempt.strengths.is_empty() {
        println!("  Strengths:  {}", attempt.strengths.join(", "));
    }
    if !attempt.weaknesses.is_empty() {
        println!("  Weaknesses: {}", attempt.weaknesses.join(", "));
    }
}
