// Multi-table operations that the legacy schema ran as stored procedures
// Each takes its arguments in the procedure's order and maps at most one result row;
// callers wrap the write paths in a transaction

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::HashMap;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::diary::{row_to_daily_entry, DailyEntry};
use super::forecaster::{
    row_to_attempt, row_to_forecaster_lesson, row_to_instructor_response, row_to_missing_data_record, Attempt,
    ForecasterLesson, InstructorResponse, MissingDataRecord,
};
use super::identity::LessonId;
use super::repository::SqlValues;
use super::stations::{row_to_station, Station};
use super::types::InstructorDataType;

// sp_deleteUser

/// Delete a user with their enrollments and every file they stored
pub(crate) fn delete_user(conn: &Connection, user_number: i64) -> rusqlite::Result<bool> {
    let enrollments = conn.execute("DELETE FROM enrollment WHERE userNumber = ?1", [user_number])?;
    let files = conn.execute("DELETE FROM stored_files WHERE instructorNumber = ?1", [user_number])?;
    let removed = conn.execute("DELETE FROM users WHERE userNumber = ?1", [user_number])? > 0;
    debug!(
        "deleted user {} ({} enrollments, {} files)",
        user_number, enrollments, files
    );
    Ok(removed)
}

// Diary

const DIARY_SELECT: &str = "SELECT d.*, cam.name AS cameraName, st.name AS stationName
     FROM diary_entries d
     LEFT JOIN resources cam ON cam.resourceNumber = d.cameraNumber
     LEFT JOIN resources st ON st.resourceNumber = d.stationNumber";

/// sp_enterNewDiaryData: insert or replace the entry for (user, day, camera)
pub(crate) fn enter_new_diary_data(
    conn: &Connection,
    user_number: i64,
    entry: &DailyEntry,
    note: &str,
) -> rusqlite::Result<bool> {
    let clouds = &entry.clouds;
    let changed = conn.execute(
        "INSERT OR REPLACE INTO diary_entries (
            userNumber, entryDate, cameraNumber, stationNumber, lastModified,
            tempMax, tempMin, tempTrend, bpStart, bpEnd, bpTrend,
            dpStart, dpEnd, dpTrend, rhMax, rhMin, rhTrend,
            cloudsMorningPrimary, cloudsMorningSecondary, cloudsAfternoonPrimary,
            cloudsAfternoonSecondary, cloudsNightPrimary, cloudsNightSecondary,
            windDirectionList, windDirectionSummary, windSpeed,
            windGust, dailyPrecip, heatIndex, windChill, upperAirWindDirection, note
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32
        )",
        params![
            user_number,
            entry.entry_date,
            entry.camera_number,
            entry.station_number,
            entry.last_modified,
            entry.max_temp,
            entry.min_temp,
            entry.temp_trend,
            entry.start_bp,
            entry.end_bp,
            entry.bp_trend,
            entry.start_dp,
            entry.end_dp,
            entry.dp_trend,
            entry.max_rh,
            entry.min_rh,
            entry.rh_trend,
            clouds.morning_primary,
            clouds.morning_secondary,
            clouds.afternoon_primary,
            clouds.afternoon_secondary,
            clouds.night_primary,
            clouds.night_secondary,
            entry.wind_direction_list(),
            entry.wind_direction_summary,
            entry.wind_speed,
            entry.max_gust_speed,
            entry.daily_precipitation,
            entry.max_heat_index,
            entry.min_wind_chill,
            entry.upper_air_wind_direction,
            note,
        ],
    )?;
    Ok(changed > 0)
}

/// sp_getDiaryEntry
pub(crate) fn get_diary_entry(
    conn: &Connection,
    user_number: i64,
    entry_date: NaiveDate,
    camera_number: i64,
) -> rusqlite::Result<Option<DailyEntry>> {
    conn.query_row(
        &format!(
            "{} WHERE d.userNumber = ?1 AND d.entryDate = ?2 AND d.cameraNumber = ?3",
            DIARY_SELECT
        ),
        params![user_number, entry_date, camera_number],
        row_to_daily_entry,
    )
    .optional()
}

/// sp_getDiaryEntriesByUser, newest day first
pub(crate) fn get_diary_entries_by_user(conn: &Connection, user_number: i64) -> rusqlite::Result<Vec<DailyEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE d.userNumber = ?1 ORDER BY d.entryDate DESC, d.cameraNumber",
        DIARY_SELECT
    ))?;
    let entries = stmt.query_map([user_number], row_to_daily_entry)?;
    entries.collect()
}

/// sp_deleteDiaryEntry
pub(crate) fn delete_diary_entry(
    conn: &Connection,
    user_number: i64,
    entry_date: NaiveDate,
    camera_number: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "DELETE FROM diary_entries WHERE userNumber = ?1 AND entryDate = ?2 AND cameraNumber = ?3",
        params![user_number, entry_date, camera_number],
    )?;
    Ok(changed > 0)
}

// Forecaster lessons

const LESSON_COLUMNS: &str = "name, startDate, dueDate, maximumTries, studentEditType, active,
    useArchiveData, archivedDataDate, stationCode, courseNumber, instructionId, instructionsText,
    scoreId, correctPoints, incorrectPoints, unansweredPoints, topScoresCounted, requireAnswers";

/// Lesson columns in `LESSON_COLUMNS` order
fn lesson_values(lesson: &ForecasterLesson) -> SqlValues {
    let scale = &lesson.point_scale;
    vec![
        Box::new(lesson.name.clone()),
        Box::new(lesson.start_date),
        Box::new(lesson.due_date),
        Box::new(lesson.maximum_tries),
        Box::new(lesson.student_edit_type.clone()),
        Box::new(lesson.active),
        Box::new(lesson.archived_data_date.is_some()),
        Box::new(lesson.archived_data_date),
        Box::new(lesson.station_code.clone()),
        Box::new(lesson.course_number),
        Box::new(lesson.instructions.instructions_id.clone()),
        Box::new(lesson.instructions.text.clone()),
        Box::new(scale.point_scale_id.clone()),
        Box::new(scale.correct_points),
        Box::new(scale.incorrect_points),
        Box::new(scale.unanswered_points),
        Box::new(scale.top_scores_counted),
        Box::new(scale.require_answers),
    ]
}

fn query_lessons(conn: &Connection, clause: &str, params: &[&dyn rusqlite::ToSql]) -> rusqlite::Result<Vec<ForecasterLesson>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM forecaster_lessons {}", clause))?;
    let lessons = stmt.query_map(params, row_to_forecaster_lesson)?;
    lessons.collect()
}

/// sp_getAllForecasterLessons
pub(crate) fn get_all_forecaster_lessons(conn: &Connection) -> rusqlite::Result<Vec<ForecasterLesson>> {
    query_lessons(conn, "ORDER BY startDate, name", &[])
}

/// sp_getForecasterLessonById
pub(crate) fn get_forecaster_lesson_by_id(conn: &Connection, lesson_id: &str) -> rusqlite::Result<Option<ForecasterLesson>> {
    conn.query_row(
        "SELECT * FROM forecaster_lessons WHERE forecasterLessonId = ?1",
        [lesson_id],
        row_to_forecaster_lesson,
    )
    .optional()
}

/// sp_getForecasterLessonsByCourseNumber
pub(crate) fn get_forecaster_lessons_by_course_number(
    conn: &Connection,
    course_number: i64,
) -> rusqlite::Result<Vec<ForecasterLesson>> {
    query_lessons(conn, "WHERE courseNumber = ?1 ORDER BY startDate, name", &[&course_number])
}

/// sp_insertForecasterLesson: store the lesson under `lesson_id` and return the stored row
pub(crate) fn insert_forecaster_lesson(
    conn: &Connection,
    lesson_id: &str,
    lesson: &ForecasterLesson,
) -> rusqlite::Result<Option<ForecasterLesson>> {
    let placeholders = vec!["?"; 19].join(", ");
    let sql = format!(
        "INSERT INTO forecaster_lessons (forecasterLessonId, {}) VALUES ({})",
        LESSON_COLUMNS, placeholders
    );
    let mut values: SqlValues = vec![Box::new(lesson_id.to_string())];
    values.extend(lesson_values(lesson));
    conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    get_forecaster_lesson_by_id(conn, lesson_id)
}

/// sp_updateForecasterLessonById
pub(crate) fn update_forecaster_lesson_by_id(
    conn: &Connection,
    lesson_id: &str,
    lesson: &ForecasterLesson,
) -> rusqlite::Result<bool> {
    let assignments: Vec<String> = LESSON_COLUMNS
        .split(',')
        .map(|c| format!("{} = ?", c.trim()))
        .collect();
    let sql = format!(
        "UPDATE forecaster_lessons SET {} WHERE forecasterLessonId = ?",
        assignments.join(", ")
    );
    let mut values = lesson_values(lesson);
    values.push(Box::new(lesson_id.to_string()));
    Ok(conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))? > 0)
}

/// sp_deleteForecasterLessonById: the lesson, its questions with their answers
/// and instructor responses, its missing-data records and every attempt made on it
pub(crate) fn delete_forecaster_lesson_by_id(conn: &Connection, lesson_id: &str) -> rusqlite::Result<bool> {
    let attempts: Vec<String> = {
        let mut stmt = conn.prepare("SELECT attemptId FROM forecaster_attempts WHERE forecasterLessonId = ?1")?;
        let ids = stmt.query_map([lesson_id], |row| row.get(0))?;
        ids.collect::<rusqlite::Result<_>>()?
    };
    for attempt_id in &attempts {
        delete_attempt(conn, attempt_id)?;
    }

    conn.execute(
        "DELETE FROM forecaster_instructor_responses WHERE questionId IN
            (SELECT questionId FROM forecaster_questions WHERE forecasterLessonId = ?1)",
        [lesson_id],
    )?;
    conn.execute(
        "DELETE FROM forecaster_answers WHERE questionId IN
            (SELECT questionId FROM forecaster_questions WHERE forecasterLessonId = ?1)",
        [lesson_id],
    )?;
    conn.execute("DELETE FROM forecaster_questions WHERE forecasterLessonId = ?1", [lesson_id])?;
    conn.execute("DELETE FROM forecaster_missing_data WHERE forecasterLessonId = ?1", [lesson_id])?;
    let removed = conn.execute("DELETE FROM forecaster_lessons WHERE forecasterLessonId = ?1", [lesson_id])? > 0;
    debug!("deleted forecaster lesson {} with {} attempts", lesson_id, attempts.len());
    Ok(removed)
}

// Forecaster attempts

fn query_attempts(conn: &Connection, clause: &str, params: &[&dyn rusqlite::ToSql]) -> rusqlite::Result<Vec<Attempt>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM forecaster_attempts {} ORDER BY attemptDate, rowid",
        clause
    ))?;
    let attempts = stmt.query_map(params, row_to_attempt)?;
    attempts.collect()
}

/// sp_insertAttempt: returns the stored attempt row, without responses
pub(crate) fn insert_attempt(
    conn: &Connection,
    lesson_id: &str,
    station_code: &str,
    user_number: i64,
    attempt_date: NaiveDate,
) -> rusqlite::Result<Option<Attempt>> {
    let attempt_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_attempts (attemptId, forecasterLessonId, stationCode, userNumber, attemptDate)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![attempt_id, lesson_id, station_code, user_number, attempt_date],
    )?;
    conn.query_row(
        "SELECT * FROM forecaster_attempts WHERE attemptId = ?1",
        [&attempt_id],
        row_to_attempt,
    )
    .optional()
}

/// sp_updateAttempt
pub(crate) fn update_attempt(
    conn: &Connection,
    attempt_id: &str,
    station_code: &str,
    user_number: i64,
    attempt_date: NaiveDate,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE forecaster_attempts SET stationCode = ?1, userNumber = ?2, attemptDate = ?3 WHERE attemptId = ?4",
        params![station_code, user_number, attempt_date, attempt_id],
    )?;
    Ok(changed > 0)
}

/// sp_deleteAttempt: the attempt with its responses and their answer links
pub(crate) fn delete_attempt(conn: &Connection, attempt_id: &str) -> rusqlite::Result<bool> {
    conn.execute(
        "DELETE FROM forecaster_response_answers WHERE responseId IN
            (SELECT responseId FROM forecaster_responses WHERE attemptId = ?1)",
        [attempt_id],
    )?;
    conn.execute("DELETE FROM forecaster_responses WHERE attemptId = ?1", [attempt_id])?;
    Ok(conn.execute("DELETE FROM forecaster_attempts WHERE attemptId = ?1", [attempt_id])? > 0)
}

/// sp_getAllAttempts
pub(crate) fn get_all_attempts(conn: &Connection) -> rusqlite::Result<Vec<Attempt>> {
    query_attempts(conn, "", &[])
}

/// sp_getAttemptsByUser
pub(crate) fn get_attempts_by_user(conn: &Connection, user_number: i64) -> rusqlite::Result<Vec<Attempt>> {
    query_attempts(conn, "WHERE userNumber = ?1", &[&user_number])
}

/// sp_getAttemptsByForecasterLesson
pub(crate) fn get_attempts_by_forecaster_lesson(conn: &Connection, lesson_id: &str) -> rusqlite::Result<Vec<Attempt>> {
    query_attempts(conn, "WHERE forecasterLessonId = ?1", &[&lesson_id])
}

/// sp_getAttemptsByLessonAndUser, user first as the procedure takes them
pub(crate) fn get_attempts_by_lesson_and_user(
    conn: &Connection,
    user_number: i64,
    lesson_id: &str,
) -> rusqlite::Result<Vec<Attempt>> {
    query_attempts(
        conn,
        "WHERE userNumber = ?1 AND forecasterLessonId = ?2",
        &[&user_number, &lesson_id],
    )
}

// Instructor responses

/// sp_insertInstructorResponse: returns the stored row
pub(crate) fn insert_instructor_response(
    conn: &Connection,
    response: &InstructorResponse,
) -> rusqlite::Result<Option<InstructorResponse>> {
    let response_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_instructor_responses
            (forecasterInstructorResponseId, questionId, responseDate, responseValue, stationCode)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            response_id,
            response.question_id,
            response.response_date,
            response.response_value,
            response.station_code
        ],
    )?;
    conn.query_row(
        "SELECT * FROM forecaster_instructor_responses WHERE forecasterInstructorResponseId = ?1",
        [&response_id],
        row_to_instructor_response,
    )
    .optional()
}

/// sp_deleteInstructorResponse
pub(crate) fn delete_instructor_response(conn: &Connection, response_id: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "DELETE FROM forecaster_instructor_responses WHERE forecasterInstructorResponseId = ?1",
        [response_id],
    )?;
    Ok(changed > 0)
}

/// sp_getInstructorResponsesByQuestionAndDateAndStation, matching on the calendar day
pub(crate) fn get_instructor_responses_by_question_and_date_and_station(
    conn: &Connection,
    question_id: &str,
    date: NaiveDate,
    station_code: &str,
) -> rusqlite::Result<Vec<InstructorResponse>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM forecaster_instructor_responses
         WHERE questionId = ?1 AND date(responseDate) = date(?2) AND stationCode = ?3
         ORDER BY responseDate",
    )?;
    let responses = stmt.query_map(params![question_id, date, station_code], row_to_instructor_response)?;
    responses.collect()
}

// Observed station data

/// sp_getStationDataByIdAndDate: the station with its observations for the day.
/// `None` for an unknown station; a known station with nothing recorded has an empty map.
pub(crate) fn get_station_data_by_id_and_date(
    conn: &Connection,
    station_code: &str,
    date: NaiveDate,
) -> rusqlite::Result<Option<(Station, HashMap<String, String>)>> {
    let mut stmt = conn.prepare(
        "SELECT s.stationCode, s.stationName, s.state, d.dataKey, d.dataValue
         FROM forecaster_stations s
         LEFT JOIN forecaster_station_data d ON d.stationCode = s.stationCode AND d.date = ?2
         WHERE s.stationCode = ?1",
    )?;
    let mut rows = stmt.query(params![station_code, date])?;

    let mut found: Option<(Station, HashMap<String, String>)> = None;
    while let Some(row) = rows.next()? {
        if found.is_none() {
            found = Some((row_to_station(row)?, HashMap::new()));
        }
        let key: Option<String> = row.get("dataKey")?;
        let value: Option<String> = row.get("dataValue")?;
        if let (Some((_, data)), Some(key)) = (found.as_mut(), key) {
            data.insert(key, value.unwrap_or_default());
        }
    }
    Ok(found)
}

/// sp_insertStationData: one key of one day; a key already recorded is overwritten
pub(crate) fn insert_station_data(
    conn: &Connection,
    station_code: &str,
    date: NaiveDate,
    data_key: &str,
    data_value: &str,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT INTO forecaster_station_data (stationCode, date, dataKey, dataValue)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(stationCode, date, dataKey) DO UPDATE SET dataValue = excluded.dataValue",
        params![station_code, date, data_key, data_value],
    )?;
    Ok(changed > 0)
}

// Missing grading data

/// sp_insertMissingDataEntry: returns the stored row
pub(crate) fn insert_missing_data_entry(
    conn: &Connection,
    lesson_id: &str,
    record_date: NaiveDateTime,
    station_code: &str,
    has_instructor_data: bool,
    email_sent: bool,
) -> rusqlite::Result<Option<MissingDataRecord>> {
    let record_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_missing_data
            (forecasterMissingDataRowId, forecasterLessonId, recordDate, stationCode, hasInstructorData, emailSent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![record_id, lesson_id, record_date, station_code, has_instructor_data, email_sent],
    )?;
    conn.query_row(
        "SELECT * FROM forecaster_missing_data WHERE forecasterMissingDataRowId = ?1",
        [&record_id],
        row_to_missing_data_record,
    )
    .optional()
}

/// sp_updateMissingDataEntry: only the two flags change
pub(crate) fn update_missing_data_entry(
    conn: &Connection,
    record_id: &str,
    has_instructor_data: bool,
    email_sent: bool,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE forecaster_missing_data SET hasInstructorData = ?1, emailSent = ?2
         WHERE forecasterMissingDataRowId = ?3",
        params![has_instructor_data, email_sent, record_id],
    )?;
    Ok(changed > 0)
}

/// sp_getMissingDataEntryByLessonAndDateAndStation, matching on the calendar day
pub(crate) fn get_missing_data_entry_by_lesson_and_date_and_station(
    conn: &Connection,
    lesson_id: &str,
    record_date: NaiveDateTime,
    station_code: &str,
) -> rusqlite::Result<Option<MissingDataRecord>> {
    conn.query_row(
        "SELECT * FROM forecaster_missing_data
         WHERE forecasterLessonId = ?1 AND date(recordDate) = date(?2) AND stationCode = ?3
         ORDER BY recordDate LIMIT 1",
        params![lesson_id, record_date, station_code],
        row_to_missing_data_record,
    )
    .optional()
}

/// sp_getMissingDataEntriesForLesson, oldest first
pub(crate) fn get_missing_data_entries_for_lesson(
    conn: &Connection,
    lesson_id: &str,
) -> rusqlite::Result<Vec<MissingDataRecord>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM forecaster_missing_data WHERE forecasterLessonId = ?1 ORDER BY recordDate, stationCode",
    )?;
    let records = stmt.query_map([lesson_id], row_to_missing_data_record)?;
    records.collect()
}

/// Files attached to a record of `data_type`
pub(crate) fn delete_attached_files(
    conn: &Connection,
    data_type: InstructorDataType,
    data_number: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM stored_files WHERE dataType = ?1 AND dataNumber = ?2",
        params![data_type, data_number],
    )
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::types::UserType;
    use crate::storage::users::User;
    use super::*;

    #[test]
    fn test_delete_user_cascades() {
        let (manager, paths) = create_test_db();

        let mut user = User::new("prof", "pw", UserType::Instructor);
        manager.add_user(&mut user).unwrap();
        let number = user.user_number.get().unwrap();

        manager
            .with_connection(|conn| {
                conn.execute("INSERT INTO enrollment (userNumber, courseNumber) VALUES (?1, 1)", [number])?;
                conn.execute(
                    "INSERT INTO stored_files (dataType, dataNumber, instructorNumber, fileName, fileContent)
                     VALUES ('Private', -1, ?1, 'a.txt', x'00')",
                    [number],
                )
            })
            .unwrap();

        let removed = manager.with_connection(|conn| delete_user(conn, number)).unwrap();
        assert!(removed);

        let leftovers: i64 = manager
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM enrollment) + (SELECT COUNT(*) FROM stored_files)",
                    [],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(leftovers, 0);
        assert!(!manager.with_connection(|conn| delete_user(conn, number)).unwrap());

        cleanup(manager, paths);
    }
}
