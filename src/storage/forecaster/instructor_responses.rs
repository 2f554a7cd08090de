// The instructor's recorded answer to a question for a day and station,
// which student responses are graded against

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;
use crate::storage::procedures;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorResponse {
    pub response_id: LessonId,
    pub question_id: String,
    pub response_date: NaiveDateTime,
    pub response_value: String,
    pub station_code: String,
}

impl InstructorResponse {
    pub fn new(question_id: &str, response_date: NaiveDateTime, response_value: &str, station_code: &str) -> Self {
        Self {
            response_id: LessonId::New,
            question_id: question_id.to_string(),
            response_date,
            response_value: response_value.to_string(),
            station_code: station_code.to_string(),
        }
    }
}

pub(crate) fn row_to_instructor_response(row: &Row<'_>) -> rusqlite::Result<InstructorResponse> {
    Ok(InstructorResponse {
        response_id: LessonId::Existing(row.get("forecasterInstructorResponseId")?),
        question_id: row.get("questionId")?,
        response_date: row.get("responseDate")?,
        response_value: row.get("responseValue")?,
        station_code: row.get("stationCode")?,
    })
}

impl DatabaseManager {
    /// Store a `New` response; returns the stored row
    pub fn insert_instructor_response(&self, response: &InstructorResponse) -> StorageResult<InstructorResponse> {
        if !response.response_id.is_new() {
            return Err(StorageError::invalid("instructor response already has an id"));
        }
        self.with_connection(|conn| {
            procedures::insert_instructor_response(conn, response)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    pub fn delete_instructor_response(&self, response_id: &str) -> StorageResult<bool> {
        self.with_connection(|conn| procedures::delete_instructor_response(conn, response_id))
    }

    pub fn get_instructor_responses_by_question_and_date_and_station(
        &self,
        question_id: &str,
        date: NaiveDate,
        station_code: &str,
    ) -> StorageResult<Vec<InstructorResponse>> {
        self.with_connection(|conn| {
            procedures::get_instructor_responses_by_question_and_date_and_station(conn, question_id, date, station_code)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_lookup_matches_calendar_day() {
        let (manager, paths) = create_test_db();

        let stored = manager
            .insert_instructor_response(&InstructorResponse::new("q1", at(5, 18), "72", "KAVP"))
            .unwrap();
        manager
            .insert_instructor_response(&InstructorResponse::new("q1", at(6, 18), "65", "KAVP"))
            .unwrap();
        manager
            .insert_instructor_response(&InstructorResponse::new("q1", at(5, 18), "70", "KSEG"))
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let found = manager
            .get_instructor_responses_by_question_and_date_and_station("q1", day, "KAVP")
            .unwrap();
        assert_eq!(found, vec![stored.clone()]);

        assert!(manager.insert_instructor_response(&stored).is_err());
        assert!(manager.delete_instructor_response(stored.response_id.get().unwrap()).unwrap());
        assert!(manager
            .get_instructor_responses_by_question_and_date_and_station("q1", day, "KAVP")
            .unwrap()
            .is_empty());

        cleanup(manager, paths);
    }
}
