// Files instructors upload, either private or attached to a note, bookmark or lesson

use log::debug;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageError, StorageResult};
use super::identity::RecordId;
use super::repository::{Entity, Repository, SqlValues};
use super::types::InstructorDataType;

/// `data_number` is the note, bookmark or lesson the file hangs off; 0 for private files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_number: RecordId,
    pub data_type: InstructorDataType,
    pub data_number: i64,
    pub instructor_number: i64,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl StoredFile {
    pub fn new(
        data_type: InstructorDataType,
        data_number: i64,
        instructor_number: i64,
        file_name: &str,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_number: RecordId::New,
            data_type,
            data_number,
            instructor_number,
            file_name: file_name.to_string(),
            content,
        }
    }
}

impl Entity for StoredFile {
    const TABLE: &'static str = "stored_files";
    const KEY: &'static str = "fileNumber";
    const COLUMNS: &'static [&'static str] = &[
        "dataType",
        "dataNumber",
        "instructorNumber",
        "fileName",
        "fileContent",
    ];
    const ORDER_BY: Option<&'static str> = Some("fileNumber ASC");

    fn record_id(&self) -> RecordId {
        self.file_number
    }

    fn assign_id(&mut self, id: i64) {
        self.file_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.data_type),
            Box::new(self.data_number),
            Box::new(self.instructor_number),
            Box::new(self.file_name.clone()),
            Box::new(self.content.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredFile {
            file_number: RecordId::Existing(row.get("fileNumber")?),
            data_type: row.get("dataType")?,
            data_number: row.get("dataNumber")?,
            instructor_number: row.get("instructorNumber")?,
            file_name: row.get("fileName")?,
            content: row.get("fileContent")?,
        })
    }
}

impl DatabaseManager {
    pub fn store_private_file(&self, instructor_number: i64, file_name: &str, content: &[u8]) -> StorageResult<bool> {
        let mut file = StoredFile::new(InstructorDataType::Private, 0, instructor_number, file_name, content.to_vec());
        self.add_record(&mut file)
    }

    pub fn get_all_private_files_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files_for_instructor(InstructorDataType::Private, instructor_number)
    }

    /// Every file an instructor owns, attached or not
    pub fn get_all_files_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.find_records_where("instructorNumber = ? ORDER BY fileNumber ASC", &[&instructor_number])
    }

    pub fn get_file(&self, file_number: i64) -> StorageResult<Option<StoredFile>> {
        self.find_record(file_number)
    }

    pub fn remove_file(&self, file_number: i64) -> StorageResult<bool> {
        self.remove_record::<StoredFile>(file_number)
    }

    pub fn get_attached_files(&self, data_type: InstructorDataType, data_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.find_records_where(
            "dataType = ? AND dataNumber = ? ORDER BY fileNumber ASC",
            &[&data_type, &data_number],
        )
    }

    pub fn get_attached_files_for_instructor(
        &self,
        data_type: InstructorDataType,
        instructor_number: i64,
    ) -> StorageResult<Vec<StoredFile>> {
        self.find_records_where(
            "dataType = ? AND instructorNumber = ? ORDER BY fileNumber ASC",
            &[&data_type, &instructor_number],
        )
    }

    /// Store a file against the object named by its data type and number
    pub fn insert_attached_file(&self, file: &mut StoredFile) -> StorageResult<bool> {
        if file.data_type == InstructorDataType::Private {
            return Err(StorageError::invalid("private files are stored with store_private_file"));
        }
        self.add_record(file)
    }

    /// Re-point or rename a file. The content is left as stored.
    pub fn update_attached_file(&self, file: &StoredFile) -> StorageResult<bool> {
        let Some(file_number) = file.file_number.get() else {
            return Ok(false);
        };
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE stored_files SET dataNumber = ?1, instructorNumber = ?2, fileName = ?3 WHERE fileNumber = ?4",
                params![file.data_number, file.instructor_number, file.file_name, file_number],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_attached_file(&self, file: &StoredFile) -> StorageResult<bool> {
        match file.file_number.get() {
            Some(number) => self.remove_file(number),
            None => Ok(false),
        }
    }

    pub fn get_all_files_for_note(&self, note_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files(InstructorDataType::Notes, note_number)
    }

    pub fn get_all_note_files_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files_for_instructor(InstructorDataType::Notes, instructor_number)
    }

    pub fn get_all_files_for_bookmark(&self, bookmark_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files(InstructorDataType::Bookmarks, bookmark_number)
    }

    pub fn get_all_bookmark_files_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files_for_instructor(InstructorDataType::Bookmarks, instructor_number)
    }

    pub fn get_all_files_for_lesson(&self, lesson_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files(InstructorDataType::InstructionalLessons, lesson_number)
    }

    pub fn get_all_lesson_files_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<StoredFile>> {
        self.get_attached_files_for_instructor(InstructorDataType::InstructionalLessons, instructor_number)
    }

    /// Display name of the note, bookmark or lesson a file belongs to.
    /// `None` for private files and for attachments whose object is gone.
    pub fn get_attached_object_name(&self, file: &StoredFile) -> StorageResult<Option<String>> {
        let name = match file.data_type {
            InstructorDataType::InstructionalLessons => self.get_lesson(file.data_number)?.map(|l| l.name),
            InstructorDataType::Bookmarks => self.search_bookmark_by_number(file.data_number)?.map(|b| b.name),
            InstructorDataType::Notes => self.get_note(file.data_number)?.map(|n| n.title),
            InstructorDataType::Private => None,
        };
        if name.is_none() && file.data_type != InstructorDataType::Private {
            debug!("file {} points at a missing {}", file.file_name, file.data_type);
        }
        Ok(name)
    }
}
