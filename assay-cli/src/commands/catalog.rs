//! Catalog commands
//!
//! Courses and questions are imported from a JSON file:
//!
//! ```json
//! {
//!   "courses": [{ "id": "CS301", "title": "Data Structures", "topics": ["Arrays"] }],
//!   "questions": [{ "id": "q1", "course_id": "CS301", "topic": "Arrays", ... }]
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assay_engine::{
    AssayError, AssessmentService, Course, CourseId, Difficulty, Question, QuestionFilter,
    QuestionId,
};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Deserialize;
use tracing::warn;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Import courses and questions from a JSON file
    Import {
        /// Path to the catalog file
        file: PathBuf,
    },
    /// Show a course and its topics
    Course {
        /// Course id
        id: String,
    },
    /// List active questions of a course
    Questions {
        /// Course id
        course: String,

        /// Only this topic
        #[arg(long)]
        topic: Option<String>,

        /// Only this difficulty (easy, medium, hard)
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
}

/// Contents of a catalog import file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Outcome of an import
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub courses: usize,
    pub questions: usize,
    /// Questions refused by catalog validation: (id, reason)
    pub rejected: Vec<(QuestionId, String)>,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Imported {} course(s) and {} question(s)",
            self.courses, self.questions
        )?;
        if !self.rejected.is_empty() {
            writeln!(f, "\nRejected {} question(s):", self.rejected.len())?;
            for (id, reason) in &self.rejected {
                writeln!(f, "  {}: {}", id, reason)?;
            }
        }
        Ok(())
    }
}

pub async fn run(args: CatalogArgs, service: &AssessmentService) -> Result<()> {
    match args.command {
        CatalogCommands::Import { file } => {
            let catalog = read_catalog(&file)?;
            let summary = import_catalog(service, catalog).await?;
            print!("{}", summary);
            Ok(())
        }
        CatalogCommands::Course { id } => show_course(service, CourseId::new(id)).await,
        CatalogCommands::Questions {
            course,
            topic,
            difficulty,
        } => list_questions(service, CourseId::new(course), topic, difficulty).await,
    }
}

pub fn read_catalog(path: &Path) -> Result<CatalogFile> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Store every course, then every question; invalid questions are skipped
pub async fn import_catalog(
    service: &AssessmentService,
    catalog: CatalogFile,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for course in &catalog.courses {
        service.put_course(course).await?;
        summary.courses += 1;
    }

    for question in &catalog.questions {
        match service.put_question(question).await {
            Ok(()) => summary.questions += 1,
            Err(AssayError::Validation(reason)) => {
                warn!(question_id = %question.id, %reason, "Skipping invalid question");
                summary.rejected.push((question.id.clone(), reason));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

async fn show_course(service: &AssessmentService, id: CourseId) -> Result<()> {
    let course = service.get_course(&id).await?;
    println!("Course: {} ({})", course.title, course.id);
    println!();
    println!("Topics:");
    for topic in &course.topics {
        println!("  - {}", topic);
    }
    Ok(())
}

async fn list_questions(
    service: &AssessmentService,
    course: CourseId,
    topic: Option<String>,
    difficulty: Option<Difficulty>,
) -> Result<()> {
    let mut filter = QuestionFilter::for_course(course);
    if let Some(topic) = topic {
        filter = filter.with_topics(vec![topic]);
    }
    if let Some(difficulty) = difficulty {
        filter = filter.with_difficulty(difficulty);
    }

    let questions = service.find_questions(&filter).await?;
    if questions.is_empty() {
        println!("No questions match the specified filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Topic").fg(Color::Cyan),
        Cell::new("Difficulty").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Used").fg(Color::Cyan),
        Cell::new("Avg score").fg(Color::Cyan),
    ]);
    for q in &questions {
        table.add_row(vec![
            Cell::new(q.id.as_str()),
            Cell::new(&q.topic),
            Cell::new(q.difficulty.as_str()),
            Cell::new(q.question_type.as_str()),
            Cell::new(q.usage.times_used),
            Cell::new(format!("{}%", q.usage.average_score)),
        ]);
    }

    println!("{table}");
    println!("\n{} question(s)", questions.len());
    Ok(())
}
