//! Types for assay-engine

mod assessment;
mod attempt;
mod context;
mod course;
mod ids;
mod question;

pub use assessment::*;
pub use attempt::*;
pub use context::*;
pub use course::Course;
pub use ids::*;
pub use question::*;
