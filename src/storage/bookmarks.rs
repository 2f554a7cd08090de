// Bookmarks: a moment (start == end) or an event (start < end) captured from resources
// Visibility queries are rendered from the access decision table

use chrono::NaiveDateTime;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::access::Viewer;
use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper::{blob_or_absent, blob_value, resource_number, resource_number_value, text_or_empty};
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::{AccessRights, BookmarkRank};

/// How the data plot looked when the bookmark was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPlotSettings {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub fitted: bool,
    pub graph_selection: String,
    pub day_span_selection: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub bookmark_number: RecordId,
    pub category_number: i64,
    pub type_number: i64,
    pub name: String,
    pub created_by: i64,
    pub access_rights: AccessRights,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub ranking: BookmarkRank,
    pub camera_resource: Option<i64>,
    pub map_loop_resource: Option<i64>,
    pub station_resource: Option<i64>,
    pub camera_picture: Option<Vec<u8>>,
    pub map_picture: Option<Vec<u8>>,
    pub station_picture: Option<Vec<u8>>,
    pub notes: String,
    pub plot: DataPlotSettings,
}

impl Bookmark {
    /// A single-instant bookmark
    pub fn instant(
        category_number: i64,
        type_number: i64,
        name: &str,
        created_by: i64,
        access_rights: AccessRights,
        at: NaiveDateTime,
    ) -> Self {
        Self::event(category_number, type_number, name, created_by, access_rights, at, at)
    }

    pub fn event(
        category_number: i64,
        type_number: i64,
        name: &str,
        created_by: i64,
        access_rights: AccessRights,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            bookmark_number: RecordId::New,
            category_number,
            type_number,
            name: name.to_string(),
            created_by,
            access_rights,
            start_time,
            end_time,
            ranking: BookmarkRank::default(),
            camera_resource: None,
            map_loop_resource: None,
            station_resource: None,
            camera_picture: None,
            map_picture: None,
            station_picture: None,
            notes: String::new(),
            plot: DataPlotSettings {
                start_time,
                end_time,
                fitted: false,
                graph_selection: String::new(),
                day_span_selection: 0,
            },
        }
    }

    pub fn is_event(&self) -> bool {
        self.start_time != self.end_time
    }
}

impl Entity for Bookmark {
    const TABLE: &'static str = "bookmarks";
    const KEY: &'static str = "bookmarkNumber";
    const COLUMNS: &'static [&'static str] = &[
        "bookmarkCategoryNumber",
        "bookmarkTypeNumber",
        "name",
        "createdBy",
        "accessRights",
        "startTime",
        "endTime",
        "ranking",
        "weatherCameraResourceNumber",
        "weatherMapLoopResourceNumber",
        "weatherStationResourceNumber",
        "weatherCameraPicture",
        "weatherMapPicture",
        "weatherStationPicture",
        "notes",
        "dpStartTime",
        "dpEndTime",
        "dpFitted",
        "dpGraphSelection",
        "dpDaySpanSelection",
    ];
    const ORDER_BY: Option<&'static str> = Some("startTime ASC, bookmarkNumber ASC");

    fn record_id(&self) -> RecordId {
        self.bookmark_number
    }

    fn assign_id(&mut self, id: i64) {
        self.bookmark_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.category_number),
            Box::new(self.type_number),
            Box::new(self.name.clone()),
            Box::new(self.created_by),
            Box::new(self.access_rights),
            Box::new(self.start_time),
            Box::new(self.end_time),
            Box::new(self.ranking),
            Box::new(resource_number_value(self.camera_resource)),
            Box::new(resource_number_value(self.map_loop_resource)),
            Box::new(resource_number_value(self.station_resource)),
            Box::new(blob_value(&self.camera_picture)),
            Box::new(blob_value(&self.map_picture)),
            Box::new(blob_value(&self.station_picture)),
            Box::new(self.notes.clone()),
            Box::new(self.plot.start_time),
            Box::new(self.plot.end_time),
            Box::new(self.plot.fitted),
            Box::new(self.plot.graph_selection.clone()),
            Box::new(self.plot.day_span_selection),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Bookmark {
            bookmark_number: RecordId::Existing(row.get("bookmarkNumber")?),
            category_number: row.get("bookmarkCategoryNumber")?,
            type_number: row.get("bookmarkTypeNumber")?,
            name: row.get("name")?,
            created_by: row.get("createdBy")?,
            access_rights: row.get("accessRights")?,
            start_time: row.get("startTime")?,
            end_time: row.get("endTime")?,
            ranking: row.get("ranking")?,
            camera_resource: resource_number(row, "weatherCameraResourceNumber")?,
            map_loop_resource: resource_number(row, "weatherMapLoopResourceNumber")?,
            station_resource: resource_number(row, "weatherStationResourceNumber")?,
            camera_picture: blob_or_absent(row, "weatherCameraPicture")?,
            map_picture: blob_or_absent(row, "weatherMapPicture")?,
            station_picture: blob_or_absent(row, "weatherStationPicture")?,
            notes: text_or_empty(row, "notes")?,
            plot: DataPlotSettings {
                start_time: row.get("dpStartTime")?,
                end_time: row.get("dpEndTime")?,
                fitted: row.get("dpFitted")?,
                graph_selection: text_or_empty(row, "dpGraphSelection")?,
                day_span_selection: row.get("dpDaySpanSelection")?,
            },
        })
    }
}

const ORDER: &str = "startTime ASC, bookmarkNumber ASC";

impl DatabaseManager {
    pub fn add_bookmark(&self, bookmark: &mut Bookmark) -> StorageResult<bool> {
        self.add_record(bookmark)
    }

    pub fn update_bookmark(&self, bookmark: &Bookmark) -> StorageResult<bool> {
        self.update_record(bookmark)
    }

    pub fn remove_bookmark(&self, bookmark_number: i64) -> StorageResult<bool> {
        self.remove_record::<Bookmark>(bookmark_number)
    }

    fn remove_bookmarks_where(&self, clause: &str, value: &dyn rusqlite::ToSql) -> StorageResult<usize> {
        let sql = format!("DELETE FROM bookmarks WHERE {}", clause);
        self.with_connection(|conn| conn.execute(&sql, [value]))
    }

    pub fn remove_bookmarks_by_category(&self, category_number: i64) -> StorageResult<usize> {
        self.remove_bookmarks_where("bookmarkCategoryNumber = ?1", &category_number)
    }

    pub fn remove_bookmarks_by_type(&self, type_number: i64) -> StorageResult<usize> {
        self.remove_bookmarks_where("bookmarkTypeNumber = ?1", &type_number)
    }

    pub fn remove_bookmarks_by_user(&self, created_by: i64) -> StorageResult<usize> {
        self.remove_bookmarks_where("createdBy = ?1", &created_by)
    }

    pub fn remove_bookmarks_by_ranking(&self, ranking: BookmarkRank) -> StorageResult<usize> {
        self.remove_bookmarks_where("ranking = ?1", &ranking)
    }

    pub fn search_bookmark_by_number(&self, bookmark_number: i64) -> StorageResult<Option<Bookmark>> {
        self.find_record(bookmark_number)
    }

    pub fn search_bookmarks_by_created_by(&self, created_by: i64) -> StorageResult<Vec<Bookmark>> {
        self.find_records_where(&format!("createdBy = ? ORDER BY {}", ORDER), &[&created_by])
    }

    pub fn search_bookmarks_by_access_rights(&self, rights: AccessRights) -> StorageResult<Vec<Bookmark>> {
        self.find_records_where(&format!("accessRights = ? ORDER BY {}", ORDER), &[&rights])
    }

    pub fn search_bookmarks_by_rank(&self, ranking: BookmarkRank) -> StorageResult<Vec<Bookmark>> {
        self.find_records_where(&format!("ranking = ? ORDER BY {}", ORDER), &[&ranking])
    }

    pub fn search_bookmarks_by_category(&self, category_number: i64) -> StorageResult<Vec<Bookmark>> {
        self.find_records_where(&format!("bookmarkCategoryNumber = ? ORDER BY {}", ORDER), &[&category_number])
    }

    pub fn search_bookmarks_by_type(&self, type_number: i64) -> StorageResult<Vec<Bookmark>> {
        self.find_records_where(&format!("bookmarkTypeNumber = ? ORDER BY {}", ORDER), &[&type_number])
    }

    pub fn obtain_all_bookmarks(&self) -> StorageResult<Vec<Bookmark>> {
        self.obtain_all_records()
    }

    fn visible_bookmarks(
        &self,
        viewer: &Viewer,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<Bookmark>> {
        self.with_connection(|conn| {
            repository::find_visible(conn, viewer, filter, params, "createdBy", "accessRights", ORDER)
        })
    }

    pub fn search_all_bookmarks_viewable_by_user(&self, viewer: &Viewer) -> StorageResult<Vec<Bookmark>> {
        self.visible_bookmarks(viewer, "1", &[])
    }

    /// Visible bookmarks starting within `[start, end]`
    pub fn search_all_bookmarks_viewable_by_user_within_time_range(
        &self,
        viewer: &Viewer,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StorageResult<Vec<Bookmark>> {
        self.visible_bookmarks(viewer, "startTime >= ? AND startTime <= ?", &[&start, &end])
    }

    pub fn search_bookmarks_by_category_for_user(
        &self,
        viewer: &Viewer,
        category_number: i64,
    ) -> StorageResult<Vec<Bookmark>> {
        self.visible_bookmarks(viewer, "bookmarkCategoryNumber = ?", &[&category_number])
    }

    pub fn search_bookmarks_by_type_for_user(&self, viewer: &Viewer, type_number: i64) -> StorageResult<Vec<Bookmark>> {
        self.visible_bookmarks(viewer, "bookmarkTypeNumber = ?", &[&type_number])
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::types::UserType;
    use chrono::NaiveDate;
    use super::*;

    const PROF: i64 = 10;
    const OTHER_PROF: i64 = 11;
    const STUDENT: i64 = 20;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    /// One bookmark per (owner, rights) pair, all on day 1
    fn seed(manager: &DatabaseManager) -> Vec<Bookmark> {
        let mut all = Vec::new();
        for owner in [PROF, OTHER_PROF] {
            for rights in AccessRights::ALL {
                let mut b = Bookmark::instant(1, 1, &format!("{}-{}", owner, rights), owner, *rights, at(1));
                manager.add_bookmark(&mut b).unwrap();
                all.push(b);
            }
        }
        all
    }

    fn names(list: Vec<Bookmark>) -> Vec<String> {
        let mut names: Vec<String> = list.into_iter().map(|b| b.name).collect();
        names.sort();
        names
    }

    #[test]
    fn test_round_trip_keeps_absent_images_and_resources() {
        let (manager, paths) = create_test_db();

        let mut b = Bookmark::event(1, 1, "squall line", PROF, AccessRights::Everyone, at(1), at(2));
        b.camera_resource = Some(4);
        b.camera_picture = Some(vec![0xff, 0xd8]);
        b.ranking = BookmarkRank::Excellent;
        b.notes = "gust front visible".into();
        assert!(manager.add_bookmark(&mut b).unwrap());

        let stored = manager.search_bookmark_by_number(b.bookmark_number.get().unwrap()).unwrap().unwrap();
        assert_eq!(stored, b);
        assert!(stored.is_event());
        assert_eq!(stored.station_resource, None);
        assert_eq!(stored.map_picture, None);

        cleanup(manager, paths);
    }

    #[test]
    fn test_administrator_sees_all() {
        let (manager, paths) = create_test_db();
        let all = seed(&manager);

        let admin = Viewer::new(1, UserType::Administrator);
        assert_eq!(manager.search_all_bookmarks_viewable_by_user(&admin).unwrap().len(), all.len());

        cleanup(manager, paths);
    }

    #[test]
    fn test_guest_sees_only_everyone_rows() {
        let (manager, paths) = create_test_db();
        seed(&manager);

        let guest = Viewer::new(30, UserType::Guest);
        let visible = manager.search_all_bookmarks_viewable_by_user(&guest).unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|b| b.access_rights == AccessRights::Everyone));

        cleanup(manager, paths);
    }

    #[test]
    fn test_instructor_and_student_visibility() {
        let (manager, paths) = create_test_db();
        seed(&manager);

        let prof = Viewer::new(PROF, UserType::Instructor);
        assert_eq!(
            names(manager.search_all_bookmarks_viewable_by_user(&prof).unwrap()),
            vec![
                "10-AllStudents",
                "10-CourseStudents",
                "10-Everyone",
                "10-Instructors",
                "10-Private",
                "11-Everyone",
                "11-Instructors",
            ]
        );

        let student = Viewer::new(STUDENT, UserType::Student).with_instructors(vec![PROF]);
        assert_eq!(
            names(manager.search_all_bookmarks_viewable_by_user(&student).unwrap()),
            vec!["10-AllStudents", "10-CourseStudents", "10-Everyone", "11-AllStudents", "11-Everyone"]
        );

        cleanup(manager, paths);
    }

    #[test]
    fn test_time_range_and_filters() {
        let (manager, paths) = create_test_db();

        let mut early = Bookmark::instant(1, 1, "early", PROF, AccessRights::Everyone, at(1));
        let mut late = Bookmark::instant(2, 3, "late", PROF, AccessRights::Everyone, at(20));
        manager.add_bookmark(&mut early).unwrap();
        manager.add_bookmark(&mut late).unwrap();
        let guest = Viewer::new(30, UserType::Guest);

        let window = manager
            .search_all_bookmarks_viewable_by_user_within_time_range(&guest, at(1), at(10))
            .unwrap();
        assert_eq!(names(window), vec!["early"]);
        assert_eq!(names(manager.search_bookmarks_by_category_for_user(&guest, 2).unwrap()), vec!["late"]);
        assert_eq!(names(manager.search_bookmarks_by_type_for_user(&guest, 3).unwrap()), vec!["late"]);
        assert_eq!(manager.search_bookmarks_by_rank(BookmarkRank::NotRanked).unwrap().len(), 2);

        cleanup(manager, paths);
    }

    #[test]
    fn test_bulk_removal_counts() {
        let (manager, paths) = create_test_db();
        seed(&manager);

        assert_eq!(manager.remove_bookmarks_by_user(OTHER_PROF).unwrap(), 5);
        assert_eq!(manager.remove_bookmarks_by_ranking(BookmarkRank::Excellent).unwrap(), 0);
        assert_eq!(manager.remove_bookmarks_by_category(1).unwrap(), 5);
        assert!(manager.obtain_all_bookmarks().unwrap().is_empty());

        cleanup(manager, paths);
    }
}
