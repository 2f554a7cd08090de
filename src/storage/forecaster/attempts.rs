// A student's attempt at a forecaster lesson

use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use super::responses::{self, Response};
use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;
use crate::storage::procedures;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub attempt_id: LessonId,
    pub lesson_id: String,
    pub station_code: String,
    pub user_number: i64,
    pub attempt_date: NaiveDate,
    pub responses: Vec<Response>,
}

impl Attempt {
    pub fn new(lesson_id: &str, station_code: &str, user_number: i64, attempt_date: NaiveDate) -> Self {
        Self {
            attempt_id: LessonId::New,
            lesson_id: lesson_id.to_string(),
            station_code: station_code.to_string(),
            user_number,
            attempt_date,
            responses: Vec::new(),
        }
    }

    pub fn points_earned(&self) -> i64 {
        self.responses.iter().map(|r| r.score.points_earned).sum()
    }

    pub fn points_possible(&self) -> i64 {
        self.responses.iter().map(|r| r.score.points_possible).sum()
    }
}

/// Responses are loaded separately
pub(crate) fn row_to_attempt(row: &Row<'_>) -> rusqlite::Result<Attempt> {
    Ok(Attempt {
        attempt_id: LessonId::Existing(row.get("attemptId")?),
        lesson_id: row.get("forecasterLessonId")?,
        station_code: row.get("stationCode")?,
        user_number: row.get("userNumber")?,
        attempt_date: row.get("attemptDate")?,
        responses: Vec::new(),
    })
}

fn with_responses(conn: &Connection, mut attempts: Vec<Attempt>) -> rusqlite::Result<Vec<Attempt>> {
    for attempt in &mut attempts {
        if let Some(id) = attempt.attempt_id.get() {
            attempt.responses = responses::responses_for_attempt(conn, id)?;
        }
    }
    Ok(attempts)
}

impl DatabaseManager {
    /// Store a `New` attempt with all of its responses; returns the stored attempt
    pub fn insert_attempt(&self, attempt: &Attempt) -> StorageResult<Attempt> {
        if !attempt.attempt_id.is_new() {
            return Err(StorageError::invalid("attempt already has an id"));
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let stored = procedures::insert_attempt(
                &tx,
                &attempt.lesson_id,
                &attempt.station_code,
                attempt.user_number,
                attempt.attempt_date,
            )?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            let attempt_id = stored.attempt_id.get().unwrap_or_default().to_string();
            for response in &attempt.responses {
                let mut response = response.clone();
                response.response_id = LessonId::New;
                responses::insert_response(&tx, &attempt_id, &mut response)?;
            }
            let stored = with_responses(&tx, vec![stored])?;
            tx.commit()?;
            stored.into_iter().next().ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Rewrite the attempt; `New` responses are inserted, existing ones updated.
    /// A response that is no longer stored aborts the whole update.
    pub fn update_attempt(&self, attempt: &mut Attempt) -> StorageResult<bool> {
        let Some(attempt_id) = attempt.attempt_id.get().map(str::to_string) else {
            return Ok(false);
        };
        let mut staged = attempt.responses.clone();
        let updated = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = procedures::update_attempt(
                &tx,
                &attempt_id,
                &attempt.station_code,
                attempt.user_number,
                attempt.attempt_date,
            )?;
            if !updated {
                return Ok(false);
            }
            for response in &mut staged {
                let written = if response.response_id.is_new() {
                    responses::insert_response(&tx, &attempt_id, response)?
                } else {
                    responses::update_response(&tx, response)?
                };
                if !written {
                    return Ok(false);
                }
            }
            tx.commit()?;
            Ok(true)
        })?;
        if updated {
            attempt.responses = staged;
        }
        Ok(updated)
    }

    pub fn remove_attempt(&self, attempt_id: &str) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = procedures::delete_attempt(&tx, attempt_id)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn get_all_attempts(&self) -> StorageResult<Vec<Attempt>> {
        self.with_connection(|conn| with_responses(conn, procedures::get_all_attempts(conn)?))
    }

    pub fn get_attempts_by_user(&self, user_number: i64) -> StorageResult<Vec<Attempt>> {
        self.with_connection(|conn| with_responses(conn, procedures::get_attempts_by_user(conn, user_number)?))
    }

    pub fn get_attempts_by_lesson(&self, lesson_id: &str) -> StorageResult<Vec<Attempt>> {
        self.with_connection(|conn| {
            with_responses(conn, procedures::get_attempts_by_forecaster_lesson(conn, lesson_id)?)
        })
    }

    pub fn get_attempts_by_lesson_and_user(&self, lesson_id: &str, user_number: i64) -> StorageResult<Vec<Attempt>> {
        self.with_connection(|conn| {
            with_responses(
                conn,
                procedures::get_attempts_by_lesson_and_user(conn, user_number, lesson_id)?,
            )
        })
    }
}
