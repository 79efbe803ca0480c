//! Adaptive generation command

use anyhow::Result;
use assay_engine::{
    AssessmentKind, AssessmentService, CourseId, DifficultyPreference, GenerateRequest, LearnerId,
};
use clap::Args;

use super::print_json;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Learner the assessment is built for
    #[arg(long)]
    pub learner: String,

    /// Course to draw questions from
    #[arg(long)]
    pub course: String,

    /// Number of questions requested
    #[arg(long, default_value_t = 10)]
    pub count: u32,

    /// Duration in minutes (config default when omitted)
    #[arg(long)]
    pub duration: Option<u32>,

    /// practice, quiz or exam
    #[arg(long, default_value = "practice")]
    pub kind: AssessmentKind,

    /// Restrict to these topics (repeatable)
    #[arg(long)]
    pub focus: Vec<String>,

    /// Store a difficulty preference (easy, medium, hard, adaptive) first
    #[arg(long)]
    pub prefer: Option<DifficultyPreference>,

    /// Print the plan without generating
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full assessment as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    fn request(&self) -> GenerateRequest {
        let mut request = GenerateRequest::new(
            LearnerId::new(&self.learner),
            CourseId::new(&self.course),
            self.count,
        );
        request.duration_minutes = self.duration;
        request.kind = self.kind;
        if !self.focus.is_empty() {
            request.focus_topics = Some(self.focus.clone());
        }
        request
    }
}

pub async fn run(args: GenerateArgs, service: &AssessmentService) -> Result<()> {
    if let Some(preference) = args.prefer {
        service
            .set_difficulty_preference(&LearnerId::new(&args.learner), preference)
            .await?;
    }

    let request = args.request();

    if args.dry_run {
        let plan = service.plan_assessment(&request).await?;
        println!("Course:  {} ({})", plan.course.title, plan.course.id);
        println!("Topics:  {}", plan.focus_topics.join(", "));
        println!("Pool:    {}", plan.pool.entries().join(", "));
        println!(
            "Mix:     easy {}% / medium {}% / hard {}%",
            plan.mix.easy, plan.mix.medium, plan.mix.hard
        );
        println!(
            "Buckets: easy {} / medium {} / hard {}",
            plan.counts.easy, plan.counts.medium, plan.counts.hard
        );
        return Ok(());
    }

    let assessment = service.generate_assessment(&request).await?;
    if args.json {
        return print_json(&assessment);
    }

    println!("Generated assessment {}", assessment.id);
    println!("  Title:     {}", assessment.title);
    println!(
        "  Questions: {} ({} requested)",
        assessment.question_count(),
        args.count
    );
    println!(
        "  Marks:     {} total, {} to pass",
        assessment.config.total_marks, assessment.config.passing_marks
    );
    println!("  Duration:  {} min", assessment.config.duration_minutes);
    println!(
        "  Open:      {} .. {}",
        assessment.schedule.start.to_rfc3339(),
        assessment.schedule.end.to_rfc3339()
    );
    Ok(())
}
