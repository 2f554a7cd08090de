// Question templates and the questions a lesson asks

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::answers::{self, Answer};
use super::NO_ANSWER_VALUE;
use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;
use crate::storage::mapper::text_or_empty;
use crate::storage::types::AnswerType;

/// A reusable question definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub template_id: String,
    pub question_text: String,
    /// Prefix of the observed-data key the question is graded against
    pub data_key_prefix: String,
    pub question_name: String,
    pub url_location: String,
    pub url_text: String,
    pub question_type: AnswerType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: LessonId,
    pub template: QuestionTemplate,
    pub question_number: i64,
    /// Forecast hour the question asks about, e.g. "18Z"
    pub question_zulu: String,
    pub answers: Vec<Answer>,
}

impl Question {
    pub fn new(template: QuestionTemplate, question_number: i64, question_zulu: &str) -> Self {
        Self {
            question_id: LessonId::New,
            template,
            question_number,
            question_zulu: question_zulu.to_string(),
            answers: Vec::new(),
        }
    }
}

const QUESTION_SELECT: &str = "SELECT q.questionId, q.forecasterLessonId, q.questionNumber, q.questionZulu,
        t.questionTemplateId, t.questionText, t.dataKeyPrefix, t.questionName,
        t.urlLocation, t.urlText, t.questionType
     FROM forecaster_questions q
     JOIN forecaster_question_templates t ON t.questionTemplateId = q.questionTemplateId";

pub(crate) fn row_to_question_template(row: &Row<'_>) -> rusqlite::Result<QuestionTemplate> {
    Ok(QuestionTemplate {
        template_id: row.get("questionTemplateId")?,
        question_text: row.get("questionText")?,
        data_key_prefix: row.get("dataKeyPrefix")?,
        question_name: row.get("questionName")?,
        url_location: text_or_empty(row, "urlLocation")?,
        url_text: text_or_empty(row, "urlText")?,
        question_type: row.get("questionType")?,
    })
}

/// Answers are loaded separately
fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        question_id: LessonId::Existing(row.get("questionId")?),
        template: row_to_question_template(row)?,
        question_number: row.get("questionNumber")?,
        question_zulu: row.get("questionZulu")?,
        answers: Vec::new(),
    })
}

fn find_question(conn: &Connection, question_id: &str) -> rusqlite::Result<Option<Question>> {
    conn.query_row(&format!("{} WHERE q.questionId = ?1", QUESTION_SELECT), [question_id], row_to_question)
        .optional()
}

/// A lesson's questions in question order, each with its real answers.
/// The blank-answer placeholder is left out.
pub(crate) fn questions_for_lesson(conn: &Connection, lesson_id: &str) -> rusqlite::Result<Vec<Question>> {
    let sql = format!("{} WHERE q.forecasterLessonId = ?1 ORDER BY q.questionNumber", QUESTION_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let mut questions = stmt
        .query_map([lesson_id], row_to_question)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for question in &mut questions {
        if let Some(id) = question.question_id.get() {
            question.answers = answers::answers_for_question(conn, id)?
                .into_iter()
                .filter(|a| a.answer_value != NO_ANSWER_VALUE)
                .collect();
        }
    }
    Ok(questions)
}

/// Insert a `New` question under `lesson_id`, then its answers
pub(crate) fn insert_question(conn: &Connection, lesson_id: &str, question: &mut Question) -> rusqlite::Result<bool> {
    if !question.question_id.is_new() {
        return Ok(false);
    }
    let question_id = LessonId::generate();
    conn.execute(
        "INSERT INTO forecaster_questions
            (questionId, forecasterLessonId, questionTemplateId, questionNumber, questionZulu)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            question_id,
            lesson_id,
            question.template.template_id,
            question.question_number,
            question.question_zulu
        ],
    )?;
    question.question_id = LessonId::Existing(question_id.clone());

    for answer in &mut question.answers {
        answers::insert_answer(conn, &question_id, answer)?;
    }
    Ok(true)
}

/// Rewrite an existing question; `New` answers are added, existing ones rewritten.
/// `false` when the question or any existing answer is missing; the caller must not commit then.
pub(crate) fn update_question(conn: &Connection, question: &mut Question) -> rusqlite::Result<bool> {
    let Some(question_id) = question.question_id.get().map(str::to_string) else {
        return Ok(false);
    };
    let changed = conn.execute(
        "UPDATE forecaster_questions
         SET questionTemplateId = ?1, questionNumber = ?2, questionZulu = ?3
         WHERE questionId = ?4",
        params![
            question.template.template_id,
            question.question_number,
            question.question_zulu,
            question_id
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }

    for answer in &mut question.answers {
        let written = if answer.answer_id.is_new() {
            answers::insert_answer(conn, &question_id, answer)?
        } else {
            answers::update_answer(conn, answer)?
        };
        if !written {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Delete a question with its answers and any instructor responses to it
pub(crate) fn delete_question(conn: &Connection, question_id: &str) -> rusqlite::Result<bool> {
    conn.execute(
        "DELETE FROM forecaster_response_answers
         WHERE answerId IN (SELECT answerId FROM forecaster_answers WHERE questionId = ?1)",
        [question_id],
    )?;
    conn.execute("DELETE FROM forecaster_answers WHERE questionId = ?1", [question_id])?;
    conn.execute("DELETE FROM forecaster_instructor_responses WHERE questionId = ?1", [question_id])?;
    Ok(conn.execute("DELETE FROM forecaster_questions WHERE questionId = ?1", [question_id])? > 0)
}

impl DatabaseManager {
    pub fn get_question_templates(&self) -> StorageResult<Vec<QuestionTemplate>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM forecaster_question_templates ORDER BY questionName")?;
            let templates = stmt.query_map([], row_to_question_template)?;
            templates.collect()
        })
    }

    /// Add or replace a question template under its own id
    pub fn save_question_template(&self, template: &QuestionTemplate) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "INSERT OR REPLACE INTO forecaster_question_templates
                    (questionTemplateId, questionText, dataKeyPrefix, questionName, urlLocation, urlText, questionType)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    template.template_id,
                    template.question_text,
                    template.data_key_prefix,
                    template.question_name,
                    template.url_location,
                    template.url_text,
                    template.question_type
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_questions(&self, lesson_id: &str) -> StorageResult<Vec<Question>> {
        self.with_connection(|conn| questions_for_lesson(conn, lesson_id))
    }

    pub fn get_question(&self, question_id: &str) -> StorageResult<Option<Question>> {
        self.with_connection(|conn| {
            let Some(mut question) = find_question(conn, question_id)? else {
                return Ok(None);
            };
            question.answers = answers::answers_for_question(conn, question_id)?;
            Ok(Some(question))
        })
    }

    /// Add a `New` question, with its answers, to an existing lesson
    pub fn insert_question(&self, lesson_id: &str, question: &mut Question) -> StorageResult<bool> {
        if !question.question_id.is_new() {
            return Err(StorageError::invalid("question already has an id"));
        }
        let mut staged = question.clone();
        let inserted = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = insert_question(&tx, lesson_id, &mut staged)?;
            tx.commit()?;
            Ok(inserted)
        })?;
        debug!("inserted question {:?} into lesson {}", staged.question_id, lesson_id);
        *question = staged;
        Ok(inserted)
    }

    /// Ids generated for `New` answers are copied back only once the update commits
    pub fn update_question(&self, question: &mut Question) -> StorageResult<bool> {
        let mut staged = question.clone();
        let updated = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            if !update_question(&tx, &mut staged)? {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })?;
        if updated {
            *question = staged;
        }
        Ok(updated)
    }

    pub fn delete_question(&self, question_id: &str) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let deleted = delete_question(&tx, question_id)?;
            tx.commit()?;
            Ok(deleted)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    pub(crate) fn template(manager: &DatabaseManager, id: &str) -> QuestionTemplate {
        let template = QuestionTemplate {
            template_id: id.to_string(),
            question_text: "What will the high temperature be?".into(),
            data_key_prefix: "TEMP_MAX".into(),
            question_name: format!("High temperature {}", id),
            url_location: String::new(),
            url_text: String::new(),
            question_type: AnswerType::RadioButton,
        };
        assert!(manager.save_question_template(&template).unwrap());
        template
    }

    #[test]
    fn test_insert_reads_back_with_answers() {
        let (manager, paths) = create_test_db();
        let t = template(&manager, "T1");

        let mut q = Question::new(t, 1, "18Z");
        q.answers.push(Answer::new("Above 80", "A"));
        q.answers.push(Answer::new("No answer", NO_ANSWER_VALUE));
        assert!(manager.insert_question("lesson-1", &mut q).unwrap());

        let questions = manager.get_questions("lesson-1").unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_zulu, "18Z");
        assert_eq!(questions[0].template.question_type, AnswerType::RadioButton);
        assert_eq!(questions[0].answers.len(), 1);
        assert_eq!(questions[0].answers[0].answer_value, "A");

        let full = manager.get_question(q.question_id.get().unwrap()).unwrap().unwrap();
        assert_eq!(full.answers.len(), 2);

        assert!(manager.insert_question("lesson-1", &mut q).is_err());

        cleanup(manager, paths);
    }

    #[test]
    fn test_update_adds_new_answers_and_delete_cascades() {
        let (manager, paths) = create_test_db();
        let t = template(&manager, "T2");

        let mut q = Question::new(t, 1, "00Z");
        q.answers.push(Answer::new("Yes", "Y"));
        manager.insert_question("lesson-2", &mut q).unwrap();

        q.question_zulu = "12Z".into();
        q.answers[0].answer_text = "Yes, rain".into();
        q.answers.push(Answer::new("No", "N"));
        assert!(manager.update_question(&mut q).unwrap());

        let id = q.question_id.get().unwrap().to_string();
        let stored = manager.get_question(&id).unwrap().unwrap();
        assert_eq!(stored.question_zulu, "12Z");
        let texts: Vec<&str> = stored.answers.iter().map(|a| a.answer_text.as_str()).collect();
        assert!(texts.contains(&"Yes, rain"));
        assert!(texts.contains(&"No"));

        assert!(manager.delete_question(&id).unwrap());
        assert!(manager.get_question(&id).unwrap().is_none());
        assert!(manager.get_answers_for_question(&id).unwrap().is_empty());

        cleanup(manager, paths);
    }
    #[test]
    fn test_update_with_missing_answer_writes_nothing() {
        let (manager, paths) = create_test_db();
        let t = template(&manager, "T3");

        let mut q = Question::new(t, 1, "06Z");
        q.answers.push(Answer::new("Fog", "F"));
        manager.insert_question("lesson-3", &mut q).unwrap();
        let id = q.question_id.get().unwrap().to_string();
        assert!(manager.delete_answer(q.answers[0].answer_id.get().unwrap()).unwrap());

        q.question_zulu = "12Z".into();
        q.answers.push(Answer::new("Haze", "H"));
        assert!(!manager.update_question(&mut q).unwrap());

        // rolled back, and the unsaved answer keeps its New id for a retry
        assert!(q.answers[1].answer_id.is_new());
        let stored = manager.get_question(&id).unwrap().unwrap();
        assert_eq!(stored.question_zulu, "06Z");
        assert!(stored.answers.is_empty());

        cleanup(manager, paths);
    }
}
