use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── String Identifiers ────────────────────────────────────────────────────────
//
// Every identifier handed to us by the content provider is an opaque string.
// Wrapping each in its own type keeps a `LessonId` from being passed where a
// `SkillId` is expected.

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name).to_string(),
                    });
                }
                Ok(Self::new(trimmed))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a curriculum subject (math, reading, ...).
    SubjectId
);
string_id!(
    /// Identifier of a unit (chapter) on the path.
    UnitId
);
string_id!(
    /// Identifier of a lesson node.
    LessonId
);
string_id!(
    /// Identifier of an event node (chest, checkpoint, ...).
    EventId
);
string_id!(
    /// Identifier of a served question.
    QuestionId
);
string_id!(
    /// Identifier of a provider-side learning session.
    SessionId
);
string_id!(
    /// Identifier of a skill tracked by the mastery model.
    SkillId
);

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from an empty string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_id_display_is_raw_value() {
        let id = LessonId::new("lesson-7");
        assert_eq!(id.to_string(), "lesson-7");
        assert_eq!(format!("{id:?}"), "LessonId(lesson-7)");
    }

    #[test]
    fn from_str_trims_and_rejects_blank() {
        let id: SkillId = "  add-2-digit ".parse().unwrap();
        assert_eq!(id.as_str(), "add-2-digit");
        assert!("   ".parse::<SkillId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&UnitId::new("u1")).unwrap();
        assert_eq!(json, "\"u1\"");
        let back: UnitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UnitId::new("u1"));
    }
}
