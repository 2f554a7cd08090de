// Instructor notes over a time span, optionally tied to a camera and a station
// Written to notes + note_resources, read back through notes_view

use chrono::NaiveDateTime;
use log::warn;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::access::Viewer;
use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper::{resource_number, resource_number_value, text_or_empty};
use super::procedures;
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::{AccessRights, InstructorDataType, UserType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorNote {
    pub note_number: RecordId,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub instructor_number: i64,
    pub access_rights: AccessRights,
    pub text: String,
    pub camera_number: Option<i64>,
    pub station_number: Option<i64>,
}

impl InstructorNote {
    pub fn new(
        title: &str,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        instructor_number: i64,
        access_rights: AccessRights,
    ) -> Self {
        Self {
            note_number: RecordId::New,
            title: title.to_string(),
            start_time,
            end_time,
            instructor_number,
            access_rights,
            text: String::new(),
            camera_number: None,
            station_number: None,
        }
    }
}

impl Entity for InstructorNote {
    const TABLE: &'static str = "notes";
    const KEY: &'static str = "noteNumber";
    const COLUMNS: &'static [&'static str] = &[
        "noteTitle",
        "startTime",
        "endTime",
        "instructorNumber",
        "accessRights",
        "note",
    ];
    const ORDER_BY: Option<&'static str> = Some("startTime DESC, endTime DESC");

    fn record_id(&self) -> RecordId {
        self.note_number
    }

    fn assign_id(&mut self, id: i64) {
        self.note_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.title.clone()),
            Box::new(self.start_time),
            Box::new(self.end_time),
            Box::new(self.instructor_number),
            Box::new(self.access_rights),
            Box::new(self.text.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(InstructorNote {
            note_number: RecordId::Existing(row.get("noteNumber")?),
            title: row.get("noteTitle")?,
            start_time: row.get("startTime")?,
            end_time: row.get("endTime")?,
            instructor_number: row.get("instructorNumber")?,
            access_rights: row.get("accessRights")?,
            text: text_or_empty(row, "note")?,
            camera_number: resource_number(row, "cameraNumber")?,
            station_number: resource_number(row, "stationNumber")?,
        })
    }

    fn select_sql() -> String {
        "SELECT * FROM notes_view".to_string()
    }
}

const ORDER: &str = "startTime DESC, endTime DESC";

fn save_note_resources(conn: &Connection, note: &InstructorNote, note_number: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO note_resources (noteNumber, cameraNumber, stationNumber) VALUES (?1, ?2, ?3)",
        params![
            note_number,
            resource_number_value(note.camera_number),
            resource_number_value(note.station_number)
        ],
    )?;
    Ok(())
}

impl DatabaseManager {
    pub fn insert_note(&self, note: &mut InstructorNote) -> StorageResult<bool> {
        if !note.note_number.is_new() {
            return Ok(false);
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            repository::insert(&tx, note)?;
            if let Some(number) = note.note_number.get() {
                save_note_resources(&tx, note, number)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn update_note(&self, note: &InstructorNote) -> StorageResult<bool> {
        let Some(number) = note.note_number.get() else {
            return Ok(false);
        };
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = repository::update(&tx, note)?;
            if updated {
                save_note_resources(&tx, note, number)?;
            }
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Remove a note with its resources and attached files. Only the note's
    /// author or an administrator may remove it; anyone else gets `false`.
    pub fn remove_note(&self, requester: &Viewer, note_number: i64) -> StorageResult<bool> {
        let Some(note) = self.get_note(note_number)? else {
            return Ok(false);
        };
        let permitted =
            requester.user_type == UserType::Administrator || requester.user_number == note.instructor_number;
        if !permitted {
            warn!("user {} may not remove note {}", requester.user_number, note_number);
            return Ok(false);
        }

        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM note_resources WHERE noteNumber = ?1", [note_number])?;
            procedures::delete_attached_files(&tx, InstructorDataType::Notes, note_number)?;
            let removed = repository::delete::<InstructorNote>(&tx, note_number)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn get_note(&self, note_number: i64) -> StorageResult<Option<InstructorNote>> {
        self.find_record(note_number)
    }

    pub fn get_all_notes(&self) -> StorageResult<Vec<InstructorNote>> {
        self.obtain_all_records()
    }

    /// Notes whose span contains `at`
    pub fn get_notes_for_timespan(&self, at: NaiveDateTime) -> StorageResult<Vec<InstructorNote>> {
        self.find_records_where(&format!("? BETWEEN startTime AND endTime ORDER BY {}", ORDER), &[&at])
    }

    pub fn get_notes_by_instructor(&self, instructor_number: i64) -> StorageResult<Vec<InstructorNote>> {
        self.find_records_where(&format!("instructorNumber = ? ORDER BY {}", ORDER), &[&instructor_number])
    }

    /// Notes covering `at` that `viewer` may see
    pub fn get_notes_visible_to_user(&self, viewer: &Viewer, at: NaiveDateTime) -> StorageResult<Vec<InstructorNote>> {
        self.with_connection(|conn| {
            repository::find_visible(
                conn,
                viewer,
                "? BETWEEN startTime AND endTime",
                &[&at],
                "instructorNumber",
                "accessRights",
                ORDER,
            )
        })
    }

    pub fn get_all_notes_visible_to_user(&self, viewer: &Viewer) -> StorageResult<Vec<InstructorNote>> {
        self.with_connection(|conn| {
            repository::find_visible(conn, viewer, "1", &[], "instructorNumber", "accessRights", ORDER)
        })
    }
}
