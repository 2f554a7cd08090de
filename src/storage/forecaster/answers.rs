// Answer choices for forecaster questions

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_id: LessonId,
    /// Empty until the answer is attached to a question
    pub question_id: String,
    pub answer_text: String,
    pub answer_value: String,
}

impl Answer {
    pub fn new(answer_text: &str, answer_value: &str) -> Self {
        Self {
            answer_id: LessonId::New,
            question_id: String::new(),
            answer_text: answer_text.to_string(),
            answer_value: answer_value.to_string(),
        }
    }
}

fn row_to_answer(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        answer_id: LessonId::Existing(row.get("answerId")?),
        question_id: row.get("questionId")?,
        answer_text: row.get("answerText")?,
        answer_value: row.get("answerValue")?,
    })
}

pub(crate) fn answers_for_question(conn: &Connection, question_id: &str) -> rusqlite::Result<Vec<Answer>> {
    let mut stmt = conn.prepare("SELECT * FROM forecaster_answers WHERE questionId = ?1 ORDER BY rowid")?;
    let answers = stmt.query_map([question_id], row_to_answer)?;
    answers.collect()
}

pub(crate) fn answers_for_response(conn: &Connection, response_id: &str) -> rusqlite::Result<Vec<Answer>> {
    let mut stmt = conn.prepare(
        "SELECT a.* FROM forecaster_answers a
         JOIN forecaster_response_answers ra ON ra.answerId = a.answerId
         WHERE ra.responseId = ?1
         ORDER BY ra.rowid",
    )?;
    let answers = stmt.query_map([response_id], row_to_answer)?;
    answers.collect()
}

/// Insert a `New` answer under `question_id`; existing answers are left alone
pub(crate) fn insert_answer(conn: &Connection, question_id: &str, answer: &mut Answer) -> rusqlite::Result<bool> {
    if !answer.answer_id.is_new() {
        return Ok(false);
    }
    let answer_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_answers (answerId, questionId, answerText, answerValue) VALUES (?1, ?2, ?3, ?4)",
        params![answer_id, question_id, answer.answer_text, answer.answer_value],
    )?;
    answer.answer_id = LessonId::Existing(answer_id);
    answer.question_id = question_id.to_string();
    Ok(true)
}

pub(crate) fn update_answer(conn: &Connection, answer: &Answer) -> rusqlite::Result<bool> {
    let Some(answer_id) = answer.answer_id.get() else {
        return Ok(false);
    };
    let changed = conn.execute(
        "UPDATE forecaster_answers SET answerText = ?1, answerValue = ?2 WHERE answerId = ?3",
        params![answer.answer_text, answer.answer_value, answer_id],
    )?;
    Ok(changed > 0)
}

impl DatabaseManager {
    pub fn add_answer_to_question(&self, question_id: &str, answer: &mut Answer) -> StorageResult<bool> {
        if !answer.answer_id.is_new() {
            return Err(StorageError::invalid("answer already has an id"));
        }
        self.with_connection(|conn| insert_answer(conn, question_id, answer))
    }

    pub fn update_answer(&self, answer: &Answer) -> StorageResult<bool> {
        self.with_connection(|conn| update_answer(conn, answer))
    }

    /// Delete an answer and unlink it from every response that chose it
    pub fn delete_answer(&self, answer_id: &str) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM forecaster_response_answers WHERE answerId = ?1", [answer_id])?;
            let deleted = tx.execute("DELETE FROM forecaster_answers WHERE answerId = ?1", [answer_id])? > 0;
            tx.commit()?;
            Ok(deleted)
        })
    }

    pub fn get_answers_for_question(&self, question_id: &str) -> StorageResult<Vec<Answer>> {
        self.with_connection(|conn| answers_for_question(conn, question_id))
    }

    pub fn get_answers_for_response(&self, response_id: &str) -> StorageResult<Vec<Answer>> {
        self.with_connection(|conn| answers_for_response(conn, response_id))
    }
}
