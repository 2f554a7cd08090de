// Days a forecaster lesson could not be graded for a station because observed
// data was missing, with whether the instructor has supplied it and whether
// the instructor was emailed

use chrono::NaiveDateTime;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;
use crate::storage::procedures;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDataRecord {
    pub record_id: LessonId,
    pub lesson_id: String,
    pub record_date: NaiveDateTime,
    pub station_code: String,
    pub has_instructor_data: bool,
    pub email_sent: bool,
}

impl MissingDataRecord {
    pub fn new(lesson_id: &str, record_date: NaiveDateTime, station_code: &str) -> Self {
        Self {
            record_id: LessonId::New,
            lesson_id: lesson_id.to_string(),
            record_date,
            station_code: station_code.to_string(),
            has_instructor_data: false,
            email_sent: false,
        }
    }
}

pub(crate) fn row_to_missing_data_record(row: &Row<'_>) -> rusqlite::Result<MissingDataRecord> {
    Ok(MissingDataRecord {
        record_id: LessonId::Existing(row.get("forecasterMissingDataRowId")?),
        lesson_id: row.get("forecasterLessonId")?,
        record_date: row.get("recordDate")?,
        station_code: row.get("stationCode")?,
        has_instructor_data: row.get("hasInstructorData")?,
        email_sent: row.get("emailSent")?,
    })
}

impl DatabaseManager {
    /// Store a `New` record; returns the stored row
    pub fn insert_missing_data_record(&self, record: &MissingDataRecord) -> StorageResult<MissingDataRecord> {
        if !record.record_id.is_new() {
            return Err(StorageError::invalid("missing data record already has an id"));
        }
        self.with_connection(|conn| {
            procedures::insert_missing_data_entry(
                conn,
                &record.lesson_id,
                record.record_date,
                &record.station_code,
                record.has_instructor_data,
                record.email_sent,
            )?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Rewrite the instructor-data and email flags
    pub fn update_missing_data_record(&self, record: &MissingDataRecord) -> StorageResult<bool> {
        let Some(record_id) = record.record_id.get() else {
            return Ok(false);
        };
        self.with_connection(|conn| {
            procedures::update_missing_data_entry(conn, record_id, record.has_instructor_data, record.email_sent)
        })
    }

    /// The stored record for the lesson, day and station, or an unsaved `New`
    /// record with both flags clear when none exists
    pub fn get_missing_data_record(
        &self,
        lesson_id: &str,
        record_date: NaiveDateTime,
        station_code: &str,
    ) -> StorageResult<MissingDataRecord> {
        let stored = self.with_connection(|conn| {
            procedures::get_missing_data_entry_by_lesson_and_date_and_station(conn, lesson_id, record_date, station_code)
        })?;
        Ok(stored.unwrap_or_else(|| MissingDataRecord::new(lesson_id, record_date, station_code)))
    }

    pub fn get_missing_data_records_for_lesson(&self, lesson_id: &str) -> StorageResult<Vec<MissingDataRecord>> {
        self.with_connection(|conn| procedures::get_missing_data_entries_for_lesson(conn, lesson_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::database::ErrorKind;
    use chrono::NaiveDate;
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_lookup_defaults_when_absent() {
        let (manager, paths) = create_test_db();

        let record = manager.get_missing_data_record("lesson-1", at(3, 12), "KAVP").unwrap();
        assert!(record.record_id.is_new());
        assert!(!record.has_instructor_data);
        assert!(!record.email_sent);
        assert!(manager.get_missing_data_records_for_lesson("lesson-1").unwrap().is_empty());
        assert!(!manager.update_missing_data_record(&record).unwrap());

        cleanup(manager, paths);
    }

    #[test]
    fn test_insert_update_and_list() {
        let (manager, paths) = create_test_db();

        let stored = manager
            .insert_missing_data_record(&MissingDataRecord::new("lesson-1", at(3, 12), "KAVP"))
            .unwrap();
        manager
            .insert_missing_data_record(&MissingDataRecord::new("lesson-1", at(2, 12), "KIPT"))
            .unwrap();
        manager
            .insert_missing_data_record(&MissingDataRecord::new("lesson-2", at(3, 12), "KAVP"))
            .unwrap();
        let err = manager.insert_missing_data_record(&stored).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // any time on the same day finds the record
        assert_eq!(manager.get_missing_data_record("lesson-1", at(3, 18), "KAVP").unwrap(), stored);

        let mut flagged = stored.clone();
        flagged.email_sent = true;
        flagged.has_instructor_data = true;
        assert!(manager.update_missing_data_record(&flagged).unwrap());
        assert_eq!(manager.get_missing_data_record("lesson-1", at(3, 12), "KAVP").unwrap(), flagged);

        let stations: Vec<String> = manager
            .get_missing_data_records_for_lesson("lesson-1")
            .unwrap()
            .into_iter()
            .map(|r| r.station_code)
            .collect();
        assert_eq!(stations, vec!["KIPT", "KAVP"]);

        cleanup(manager, paths);
    }
}
