//! Identifier newtypes.
//!
//! Learners, courses and questions are owned by external systems and keep
//! their opaque string ids. Assessments and attempts are minted here as
//! UUIDv7 so they sort by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new time-ordered id using UUIDv7.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Learner identifier issued by the account system.
    LearnerId
);
string_id!(
    /// Course identifier issued by the syllabus system.
    CourseId
);
string_id!(
    /// Question identifier in the catalog.
    QuestionId
);
string_id!(
    /// Option identifier within a multiple-choice question.
    OptionId
);

uuid_id!(
    /// Generated assessment id.
    AssessmentId
);
uuid_id!(
    /// Learner attempt id.
    AttemptId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_string_id_display_and_serde() {
        let id = LearnerId::new("learner-1");
        assert_eq!(id.to_string(), "learner-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"learner-1\"");
    }

    #[test]
    fn test_uuid_ids_are_v7_and_parse() {
        let id = AttemptId::new();
        assert_eq!(id.as_uuid().get_version_num(), 7);
        let parsed = AttemptId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }
}
