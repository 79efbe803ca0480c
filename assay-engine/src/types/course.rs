//! Course topic catalog

use serde::{Deserialize, Serialize};

use super::CourseId;

/// A course and the topics its questions are tagged with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    /// Topics in syllabus order
    pub topics: Vec<String>,
}

impl Course {
    pub fn new(id: impl Into<CourseId>, title: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            topics,
        }
    }
}
