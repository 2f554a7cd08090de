// Scored responses within an attempt and the answers each one chose

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::answers::{self, Answer};
use super::Score;
use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub response_id: LessonId,
    pub score: Score,
    pub answers: Vec<Answer>,
}

impl Response {
    pub fn new(score: Score, answers: Vec<Answer>) -> Self {
        Self {
            response_id: LessonId::New,
            score,
            answers,
        }
    }
}

fn row_to_response(row: &Row<'_>) -> rusqlite::Result<Response> {
    Ok(Response {
        response_id: LessonId::Existing(row.get("responseId")?),
        score: Score {
            score_id: row.get("scoreId")?,
            points_earned: row.get("pointsEarned")?,
            points_possible: row.get("pointsPossible")?,
        },
        answers: Vec::new(),
    })
}

/// Link each answer to the response. A `New` answer is first added to its question.
fn link_answers(conn: &Connection, response_id: &str, chosen: &mut [Answer]) -> rusqlite::Result<()> {
    for answer in chosen.iter_mut() {
        if answer.answer_id.is_new() {
            let question_id = answer.question_id.clone();
            answers::insert_answer(conn, &question_id, answer)?;
        }
        if let Some(answer_id) = answer.answer_id.get() {
            conn.execute(
                "INSERT OR IGNORE INTO forecaster_response_answers (responseId, answerId) VALUES (?1, ?2)",
                params![response_id, answer_id],
            )?;
        }
    }
    Ok(())
}

/// Insert a `New` response with its score, then link its answers
pub(crate) fn insert_response(conn: &Connection, attempt_id: &str, response: &mut Response) -> rusqlite::Result<bool> {
    if !response.response_id.is_new() {
        return Ok(false);
    }
    let response_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_responses (responseId, attemptId, scoreId, pointsEarned, pointsPossible)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            response_id,
            attempt_id,
            response.score.score_id,
            response.score.points_earned,
            response.score.points_possible
        ],
    )?;
    link_answers(conn, &response_id, &mut response.answers)?;
    response.response_id = LessonId::Existing(response_id);
    Ok(true)
}

/// Rewrite the score and replace the chosen answers
pub(crate) fn update_response(conn: &Connection, response: &mut Response) -> rusqlite::Result<bool> {
    let Some(response_id) = response.response_id.get().map(str::to_string) else {
        return Ok(false);
    };
    conn.execute("DELETE FROM forecaster_response_answers WHERE responseId = ?1", [&response_id])?;
    let changed = conn.execute(
        "UPDATE forecaster_responses SET scoreId = ?1, pointsEarned = ?2, pointsPossible = ?3
         WHERE responseId = ?4",
        params![
            response.score.score_id,
            response.score.points_earned,
            response.score.points_possible,
            response_id
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }
    link_answers(conn, &response_id, &mut response.answers)?;
    Ok(true)
}

pub(crate) fn delete_response(conn: &Connection, response_id: &str) -> rusqlite::Result<bool> {
    conn.execute("DELETE FROM forecaster_response_answers WHERE responseId = ?1", [response_id])?;
    Ok(conn.execute("DELETE FROM forecaster_responses WHERE responseId = ?1", [response_id])? > 0)
}

/// Responses of an attempt in insertion order, each with its chosen answers
pub(crate) fn responses_for_attempt(conn: &Connection, attempt_id: &str) -> rusqlite::Result<Vec<Response>> {
    let mut stmt = conn.prepare("SELECT * FROM forecaster_responses WHERE attemptId = ?1 ORDER BY rowid")?;
    let mut responses = stmt
        .query_map([attempt_id], row_to_response)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for response in &mut responses {
        if let Some(id) = response.response_id.get() {
            response.answers = answers::answers_for_response(conn, id)?;
        }
    }
    Ok(responses)
}

fn find_response(conn: &Connection, response_id: &str) -> rusqlite::Result<Option<Response>> {
    let response = conn
        .query_row("SELECT * FROM forecaster_responses WHERE responseId = ?1", [response_id], row_to_response)
        .optional()?;
    match response {
        Some(mut response) => {
            response.answers = answers::answers_for_response(conn, response_id)?;
            Ok(Some(response))
        }
        None => Ok(None),
    }
}

impl DatabaseManager {
    pub fn insert_response(&self, attempt_id: &str, response: &mut Response) -> StorageResult<bool> {
        if !response.response_id.is_new() {
            return Err(StorageError::invalid("response already has an id"));
        }
        let mut staged = response.clone();
        let inserted = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = insert_response(&tx, attempt_id, &mut staged)?;
            tx.commit()?;
            Ok(inserted)
        })?;
        *response = staged;
        Ok(inserted)
    }

    pub fn update_response(&self, response: &mut Response) -> StorageResult<bool> {
        let mut staged = response.clone();
        let updated = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            if !update_response(&tx, &mut staged)? {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })?;
        if updated {
            *response = staged;
        }
        Ok(updated)
    }

    pub fn delete_response(&self, response_id: &str) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let deleted = delete_response(&tx, response_id)?;
            tx.commit()?;
            Ok(deleted)
        })
    }

    pub fn get_response(&self, response_id: &str) -> StorageResult<Option<Response>> {
        self.with_connection(|conn| find_response(conn, response_id))
    }

    pub fn get_responses_by_attempt(&self, attempt_id: &str) -> StorageResult<Vec<Response>> {
        self.with_connection(|conn| responses_for_attempt(conn, attempt_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    fn score(earned: i64) -> Score {
        Score {
            score_id: "s".into(),
            points_earned: earned,
            points_possible: 2,
        }
    }

    #[test]
    fn test_insert_links_new_answers() {
        let (manager, paths) = create_test_db();

        let mut existing = Answer::new("Rain", "R");
        manager.add_answer_to_question("q-1", &mut existing).unwrap();
        let mut typed = Answer::new("72", "72");
        typed.question_id = "q-2".into();

        let mut response = Response::new(score(1), vec![existing.clone(), typed]);
        assert!(manager.insert_response("attempt-1", &mut response).unwrap());
        assert!(response.answers.iter().all(|a| !a.answer_id.is_new()));

        let stored = manager.get_responses_by_attempt("attempt-1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], response);
        assert_eq!(manager.get_answers_for_question("q-2").unwrap().len(), 1);

        cleanup(manager, paths);
    }

    #[test]
    fn test_update_replaces_answers_and_score() {
        let (manager, paths) = create_test_db();

        let mut rain = Answer::new("Rain", "R");
        let mut snow = Answer::new("Snow", "S");
        manager.add_answer_to_question("q-1", &mut rain).unwrap();
        manager.add_answer_to_question("q-1", &mut snow).unwrap();

        let mut response = Response::new(score(0), vec![rain]);
        manager.insert_response("attempt-1", &mut response).unwrap();
        response.answers = vec![snow.clone()];
        response.score = score(2);
        assert!(manager.update_response(&mut response).unwrap());

        let id = response.response_id.get().unwrap().to_string();
        let stored = manager.get_response(&id).unwrap().unwrap();
        assert_eq!(stored.score.points_earned, 2);
        assert_eq!(stored.answers, vec![snow]);

        assert!(manager.delete_response(&id).unwrap());
        assert!(manager.get_response(&id).unwrap().is_none());
        assert!(manager.get_answers_for_response(&id).unwrap().is_empty());

        cleanup(manager, paths);
    }
}
