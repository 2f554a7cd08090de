// Forecaster lessons with their instructions, point scale and questions

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use super::questions::{self, Question};
use super::{Instructions, PointScale};
use crate::storage::database::{DatabaseManager, StorageError, StorageResult};
use crate::storage::identity::LessonId;
use crate::storage::mapper::text_or_empty;
use crate::storage::procedures;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecasterLesson {
    pub lesson_id: LessonId,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub maximum_tries: i64,
    pub student_edit_type: String,
    pub active: bool,
    /// Set when the lesson is graded against archived rather than live data
    pub archived_data_date: Option<NaiveDate>,
    pub station_code: Option<String>,
    pub course_number: i64,
    pub instructions: Instructions,
    pub point_scale: PointScale,
    pub questions: Vec<Question>,
}

impl ForecasterLesson {
    pub fn new(name: &str, course_number: i64, start_date: NaiveDateTime, due_date: NaiveDateTime) -> Self {
        Self {
            lesson_id: LessonId::New,
            name: name.to_string(),
            start_date,
            due_date,
            maximum_tries: 1,
            student_edit_type: String::new(),
            active: true,
            archived_data_date: None,
            station_code: None,
            course_number,
            instructions: Instructions::default(),
            point_scale: PointScale::default(),
            questions: Vec::new(),
        }
    }

    pub fn uses_archived_data(&self) -> bool {
        self.archived_data_date.is_some()
    }
}

/// Questions are loaded separately
pub(crate) fn row_to_forecaster_lesson(row: &Row<'_>) -> rusqlite::Result<ForecasterLesson> {
    let use_archive: bool = row.get("useArchiveData")?;
    let archived: Option<NaiveDate> = row.get("archivedDataDate")?;
    Ok(ForecasterLesson {
        lesson_id: LessonId::Existing(row.get("forecasterLessonId")?),
        name: row.get("name")?,
        start_date: row.get("startDate")?,
        due_date: row.get("dueDate")?,
        maximum_tries: row.get("maximumTries")?,
        student_edit_type: row.get("studentEditType")?,
        active: row.get("active")?,
        archived_data_date: archived.filter(|_| use_archive),
        station_code: row.get("stationCode")?,
        course_number: row.get("courseNumber")?,
        instructions: Instructions {
            instructions_id: row.get("instructionId")?,
            text: text_or_empty(row, "instructionsText")?,
        },
        point_scale: PointScale {
            point_scale_id: row.get("scoreId")?,
            correct_points: row.get("correctPoints")?,
            incorrect_points: row.get("incorrectPoints")?,
            unanswered_points: row.get("unansweredPoints")?,
            top_scores_counted: row.get("topScoresCounted")?,
            require_answers: row.get("requireAnswers")?,
        },
        questions: Vec::new(),
    })
}

fn with_questions(conn: &Connection, mut lessons: Vec<ForecasterLesson>) -> rusqlite::Result<Vec<ForecasterLesson>> {
    for lesson in &mut lessons {
        if let Some(id) = lesson.lesson_id.get() {
            lesson.questions = questions::questions_for_lesson(conn, id)?;
        }
    }
    Ok(lessons)
}

impl DatabaseManager {
    pub fn get_all_forecaster_lessons(&self) -> StorageResult<Vec<ForecasterLesson>> {
        self.with_connection(|conn| {
            let lessons = procedures::get_all_forecaster_lessons(conn)?;
            with_questions(conn, lessons)
        })
    }

    pub fn get_forecaster_lesson(&self, lesson_id: &str) -> StorageResult<Option<ForecasterLesson>> {
        self.with_connection(|conn| {
            let lesson = procedures::get_forecaster_lesson_by_id(conn, lesson_id)?;
            Ok(with_questions(conn, lesson.into_iter().collect())?.pop())
        })
    }

    pub fn get_forecaster_lessons_by_course(&self, course_number: i64) -> StorageResult<Vec<ForecasterLesson>> {
        self.with_connection(|conn| {
            let lessons = procedures::get_forecaster_lessons_by_course_number(conn, course_number)?;
            with_questions(conn, lessons)
        })
    }

    /// Store a `New` lesson with its questions and their answers; returns the
    /// stored lesson. A lesson that already has an id is rejected before any
    /// database access.
    pub fn insert_forecaster_lesson(&self, lesson: &ForecasterLesson) -> StorageResult<ForecasterLesson> {
        if !lesson.lesson_id.is_new() {
            return Err(StorageError::invalid(
                "a new forecaster lesson must not carry an id",
            ));
        }
        let lesson_id = LessonId::generate();
        let stored = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let mut stored = procedures::insert_forecaster_lesson(&tx, &lesson_id, lesson)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            for question in &lesson.questions {
                let mut question = question.clone();
                question.question_id = LessonId::New;
                for answer in &mut question.answers {
                    answer.answer_id = LessonId::New;
                }
                questions::insert_question(&tx, &lesson_id, &mut question)?;
                stored.questions.push(question);
            }
            tx.commit()?;
            Ok(stored)
        })?;
        info!("inserted forecaster lesson {} ({})", lesson_id, stored.name);
        Ok(stored)
    }

    /// Rewrite the lesson row and its existing questions; `New` questions are added.
    /// Nothing is written when the lesson, or any question or answer it still
    /// holds an id for, is missing. Generated ids reach `lesson` only after commit.
    pub fn update_forecaster_lesson(&self, lesson: &mut ForecasterLesson) -> StorageResult<bool> {
        let Some(lesson_id) = lesson.lesson_id.get().map(str::to_string) else {
            return Ok(false);
        };
        let mut staged = lesson.questions.clone();
        let updated = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            if !procedures::update_forecaster_lesson_by_id(&tx, &lesson_id, lesson)? {
                return Ok(false);
            }
            for question in &mut staged {
                let written = if question.question_id.is_new() {
                    questions::insert_question(&tx, &lesson_id, question)?
                } else {
                    questions::update_question(&tx, question)?
                };
                if !written {
                    warn!("forecaster lesson {} holds a question that is no longer stored", lesson_id);
                    return Ok(false);
                }
            }
            tx.commit()?;
            Ok(true)
        })?;
        if updated {
            lesson.questions = staged;
        }
        Ok(updated)
    }

    /// Remove a lesson with its questions and attempts
    pub fn remove_forecaster_lesson(&self, lesson_id: &str) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = procedures::delete_forecaster_lesson_by_id(&tx, lesson_id)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    /// Remove every lesson due before `date`; returns how many were removed
    pub fn remove_forecaster_lessons_before_date(&self, date: NaiveDateTime) -> StorageResult<usize> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let expired: Vec<String> = {
                let mut stmt = tx.prepare("SELECT forecasterLessonId FROM forecaster_lessons WHERE dueDate < ?1")?;
                let ids = stmt.query_map([date], |row| row.get(0))?;
                ids.collect::<rusqlite::Result<_>>()?
            };
            let mut removed = 0;
            for lesson_id in &expired {
                if procedures::delete_forecaster_lesson_by_id(&tx, lesson_id)? {
                    removed += 1;
                }
            }
            tx.commit()?;
            debug!("removed {} forecaster lessons due before {}", removed, date);
            Ok(removed)
        })
    }
}
