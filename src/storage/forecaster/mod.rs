// Forecaster assessment lessons
// lesson -> questions -> answers; attempt -> responses -> chosen answers
// Graded against per-station observed data, with missing days tracked per lesson
// Lesson-side records are keyed by generated string ids

mod answers;
mod attempts;
mod instructor_responses;
mod lessons;
mod missing_data;
mod questions;
mod responses;
mod station_data;

use serde::{Deserialize, Serialize};

pub use answers::Answer;
pub use attempts::Attempt;
pub use instructor_responses::InstructorResponse;
pub use lessons::ForecasterLesson;
pub use missing_data::MissingDataRecord;
pub use questions::{Question, QuestionTemplate};
pub use responses::Response;

pub(crate) use attempts::row_to_attempt;
pub(crate) use instructor_responses::row_to_instructor_response;
pub(crate) use lessons::row_to_forecaster_lesson;
pub(crate) use missing_data::row_to_missing_data_record;

/// Answer value recorded when a student leaves a question blank
pub const NO_ANSWER_VALUE: &str = "X";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Instructions {
    pub instructions_id: String,
    pub text: String,
}

/// How a lesson's questions are scored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointScale {
    pub point_scale_id: String,
    pub correct_points: i64,
    pub incorrect_points: i64,
    pub unanswered_points: i64,
    pub top_scores_counted: i64,
    pub require_answers: bool,
}

impl Default for PointScale {
    fn default() -> Self {
        Self {
            point_scale_id: String::new(),
            correct_points: 1,
            incorrect_points: 0,
            unanswered_points: 0,
            top_scores_counted: 1,
            require_answers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Score {
    pub score_id: String,
    pub points_earned: i64,
    pub points_possible: i64,
}
