// Record identity
// Distinguishes unsaved records from persisted ones without sentinel ids

use serde::{Deserialize, Serialize};

/// Identity of an integer-keyed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RecordId {
    /// Not yet persisted
    #[default]
    New,
    Existing(i64),
}

impl RecordId {
    pub fn is_new(&self) -> bool {
        matches!(self, RecordId::New)
    }

    pub fn get(&self) -> Option<i64> {
        match self {
            RecordId::New => None,
            RecordId::Existing(id) => Some(*id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Existing(id)
    }
}

/// Identity of a string-keyed forecaster record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LessonId {
    #[default]
    New,
    Existing(String),
}

impl LessonId {
    pub fn is_new(&self) -> bool {
        matches!(self, LessonId::New)
    }

    pub fn get(&self) -> Option<&str> {
        match self {
            LessonId::New => None,
            LessonId::Existing(id) => Some(id.as_str()),
        }
    }

    /// Fresh key for a row about to be inserted
    pub(crate) fn generate() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

impl From<String> for LessonId {
    fn from(id: String) -> Self {
        LessonId::Existing(id)
    }
}

impl From<&str> for LessonId {
    fn from(id: &str) -> Self {
        LessonId::Existing(id.to_string())
    }
}
