// Instructional lessons: categories hold lessons, lessons hold entries,
// and each entry opens a bookmark in a window slot

use log::debug;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::access::Viewer;
use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::procedures;
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::{AccessRights, InstructorDataType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonCategory {
    pub lesson_category_number: RecordId,
    pub name: String,
    pub instructor_number: i64,
    pub access_rights: AccessRights,
    pub display_order: i64,
}

impl LessonCategory {
    pub fn new(name: &str, instructor_number: i64, access_rights: AccessRights) -> Self {
        Self {
            lesson_category_number: RecordId::New,
            name: name.to_string(),
            instructor_number,
            access_rights,
            display_order: 0,
        }
    }
}

impl Entity for LessonCategory {
    const TABLE: &'static str = "lesson_categories";
    const KEY: &'static str = "lessonCategoryNumber";
    const COLUMNS: &'static [&'static str] = &[
        "lessonCategoryName",
        "instructorNumber",
        "accessRights",
        "displayOrder",
    ];
    const ORDER_BY: Option<&'static str> = Some("displayOrder ASC");
    const ORDER_RANK: Option<&'static str> = Some("displayOrder");

    fn record_id(&self) -> RecordId {
        self.lesson_category_number
    }

    fn assign_id(&mut self, id: i64) {
        self.lesson_category_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.display_order = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.name.clone()),
            Box::new(self.instructor_number),
            Box::new(self.access_rights),
            Box::new(self.display_order),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LessonCategory {
            lesson_category_number: RecordId::Existing(row.get("lessonCategoryNumber")?),
            name: row.get("lessonCategoryName")?,
            instructor_number: row.get("instructorNumber")?,
            access_rights: row.get("accessRights")?,
            display_order: row.get("displayOrder")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: RecordId,
    pub name: String,
    pub instructor_number: i64,
    pub lesson_category_number: i64,
    pub access_rights: AccessRights,
}

impl Lesson {
    pub fn new(name: &str, instructor_number: i64, lesson_category_number: i64, access_rights: AccessRights) -> Self {
        Self {
            lesson_number: RecordId::New,
            name: name.to_string(),
            instructor_number,
            lesson_category_number,
            access_rights,
        }
    }
}

impl Entity for Lesson {
    const TABLE: &'static str = "lessons";
    const KEY: &'static str = "lessonNumber";
    const COLUMNS: &'static [&'static str] = &[
        "instructorNumber",
        "lessonCategoryNumber",
        "accessRights",
        "lessonName",
    ];
    const ORDER_BY: Option<&'static str> = Some("lessonNumber ASC");

    fn record_id(&self) -> RecordId {
        self.lesson_number
    }

    fn assign_id(&mut self, id: i64) {
        self.lesson_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.instructor_number),
            Box::new(self.lesson_category_number),
            Box::new(self.access_rights),
            Box::new(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Lesson {
            lesson_number: RecordId::Existing(row.get("lessonNumber")?),
            name: row.get("lessonName")?,
            instructor_number: row.get("instructorNumber")?,
            lesson_category_number: row.get("lessonCategoryNumber")?,
            access_rights: row.get("accessRights")?,
        })
    }
}

/// One bookmark opened by a lesson. `window_position` picks the display pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonEntry {
    pub lesson_entry_number: RecordId,
    pub lesson_number: i64,
    pub name: String,
    pub bookmark_number: i64,
    pub bookmark_resource_identifier: i64,
    pub window_position: i64,
}

impl LessonEntry {
    pub fn new(lesson_number: i64, name: &str, bookmark_number: i64, bookmark_resource_identifier: i64) -> Self {
        Self {
            lesson_entry_number: RecordId::New,
            lesson_number,
            name: name.to_string(),
            bookmark_number,
            bookmark_resource_identifier,
            window_position: 0,
        }
    }
}

impl Entity for LessonEntry {
    const TABLE: &'static str = "lesson_entry";
    const KEY: &'static str = "lessonEntryNumber";
    const COLUMNS: &'static [&'static str] = &[
        "lessonNumber",
        "lessonEntryName",
        "bookmarkNumber",
        "bookmarkResourceIdentifier",
        "windowPosition",
    ];
    const ORDER_BY: Option<&'static str> = Some("lessonNumber ASC, windowPosition ASC");

    fn record_id(&self) -> RecordId {
        self.lesson_entry_number
    }

    fn assign_id(&mut self, id: i64) {
        self.lesson_entry_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.lesson_number),
            Box::new(self.name.clone()),
            Box::new(self.bookmark_number),
            Box::new(self.bookmark_resource_identifier),
            Box::new(self.window_position),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LessonEntry {
            lesson_entry_number: RecordId::Existing(row.get("lessonEntryNumber")?),
            lesson_number: row.get("lessonNumber")?,
            name: row.get("lessonEntryName")?,
            bookmark_number: row.get("bookmarkNumber")?,
            bookmark_resource_identifier: row.get("bookmarkResourceIdentifier")?,
            window_position: row.get("windowPosition")?,
        })
    }
}

impl DatabaseManager {
    // Lessons

    pub fn add_lesson(&self, lesson: &mut Lesson) -> StorageResult<bool> {
        self.add_record(lesson)
    }

    pub fn update_lesson(&self, lesson: &Lesson) -> StorageResult<bool> {
        self.update_record(lesson)
    }

    /// Remove a lesson with its entries and attached files
    pub fn delete_lesson(&self, lesson_number: i64) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let entries = tx.execute("DELETE FROM lesson_entry WHERE lessonNumber = ?1", [lesson_number])?;
            procedures::delete_attached_files(&tx, InstructorDataType::InstructionalLessons, lesson_number)?;
            let removed = repository::delete::<Lesson>(&tx, lesson_number)?;
            tx.commit()?;
            debug!("removed lesson {} with {} entries", lesson_number, entries);
            Ok(removed)
        })
    }

    pub fn get_lesson(&self, lesson_number: i64) -> StorageResult<Option<Lesson>> {
        self.find_record(lesson_number)
    }

    pub fn obtain_all_lessons(&self) -> StorageResult<Vec<Lesson>> {
        self.obtain_all_records()
    }

    /// Lessons an instructor wrote
    pub fn obtain_lessons_by_user(&self, instructor_number: i64) -> StorageResult<Vec<Lesson>> {
        self.find_records_where("instructorNumber = ? ORDER BY lessonNumber ASC", &[&instructor_number])
    }

    pub fn obtain_lessons_by_category(&self, lesson_category_number: i64) -> StorageResult<Vec<Lesson>> {
        self.find_records_where(
            "lessonCategoryNumber = ? ORDER BY lessonNumber ASC",
            &[&lesson_category_number],
        )
    }

    pub fn obtain_lessons_by_access_rights(&self, rights: AccessRights) -> StorageResult<Vec<Lesson>> {
        self.find_records_where("accessRights = ? ORDER BY lessonNumber ASC", &[&rights])
    }

    // Entries

    pub fn add_lesson_entry(&self, entry: &mut LessonEntry) -> StorageResult<bool> {
        self.add_record(entry)
    }

    pub fn update_lesson_entry(&self, entry: &LessonEntry) -> StorageResult<bool> {
        self.update_record(entry)
    }

    pub fn delete_lesson_entry(&self, lesson_entry_number: i64) -> StorageResult<bool> {
        self.remove_record::<LessonEntry>(lesson_entry_number)
    }

    pub fn get_lesson_entry(&self, lesson_entry_number: i64) -> StorageResult<Option<LessonEntry>> {
        self.find_record(lesson_entry_number)
    }

    pub fn obtain_all_lesson_entries(&self) -> StorageResult<Vec<LessonEntry>> {
        self.obtain_all_records()
    }

    pub fn obtain_lesson_entries_by_lesson(&self, lesson_number: i64) -> StorageResult<Vec<LessonEntry>> {
        self.find_records_where("lessonNumber = ? ORDER BY windowPosition ASC", &[&lesson_number])
    }

    // Categories

    pub fn add_lesson_category(&self, category: &mut LessonCategory) -> StorageResult<bool> {
        self.add_record(category)
    }

    pub fn update_lesson_category(&self, category: &LessonCategory) -> StorageResult<bool> {
        self.update_record(category)
    }

    /// Lessons filed under the category keep their (now dangling) category number
    pub fn delete_lesson_category(&self, lesson_category_number: i64) -> StorageResult<bool> {
        self.remove_record::<LessonCategory>(lesson_category_number)
    }

    pub fn get_lesson_category(&self, lesson_category_number: i64) -> StorageResult<Option<LessonCategory>> {
        self.find_record(lesson_category_number)
    }

    pub fn obtain_all_lesson_categories(&self) -> StorageResult<Vec<LessonCategory>> {
        self.obtain_all_records()
    }

    pub fn obtain_lesson_categories_by_user(&self, instructor_number: i64) -> StorageResult<Vec<LessonCategory>> {
        self.find_records_where("instructorNumber = ? ORDER BY displayOrder ASC", &[&instructor_number])
    }

    /// Categories `viewer` may see under the access-rights rules
    pub fn obtain_lesson_categories_viewable_by(&self, viewer: &Viewer) -> StorageResult<Vec<LessonCategory>> {
        self.with_connection(|conn| {
            repository::find_visible(
                conn,
                viewer,
                "1",
                &[],
                "instructorNumber",
                "accessRights",
                "displayOrder ASC",
            )
        })
    }
}
