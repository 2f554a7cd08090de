// Courses
// Every read joins the owning instructor's user row

use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper;
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::SemesterType;
use super::users::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_number: RecordId,
    pub department_name: String,
    pub class_identifier: String,
    pub section: i64,
    pub class_name: String,
    pub semester: SemesterType,
    pub year: i64,
    pub instructor_number: i64,
    /// Filled from the join on reads; `None` when the instructor no longer exists
    pub instructor: Option<User>,
    pub creation_date: NaiveDateTime,
}

impl Course {
    pub fn new(
        department_name: &str,
        class_identifier: &str,
        section: i64,
        class_name: &str,
        semester: SemesterType,
        year: i64,
        instructor_number: i64,
    ) -> Self {
        Self {
            course_number: RecordId::New,
            department_name: department_name.to_string(),
            class_identifier: class_identifier.to_string(),
            section,
            class_name: class_name.to_string(),
            semester,
            year,
            instructor_number,
            instructor: None,
            creation_date: mapper::now(),
        }
    }
}

impl Entity for Course {
    const TABLE: &'static str = "courses";
    const KEY: &'static str = "courseNumber";
    const COLUMNS: &'static [&'static str] = &[
        "departmentName",
        "classIdentifier",
        "section",
        "className",
        "semesterType",
        "year",
        "instructorNumber",
        "creationDate",
    ];
    const ORDER_BY: Option<&'static str> = Some("courses.courseNumber ASC");

    fn record_id(&self) -> RecordId {
        self.course_number
    }

    fn assign_id(&mut self, id: i64) {
        self.course_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.department_name.clone()),
            Box::new(self.class_identifier.clone()),
            Box::new(self.section),
            Box::new(self.class_name.clone()),
            Box::new(self.semester),
            Box::new(self.year),
            Box::new(self.instructor_number),
            Box::new(self.creation_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let joined: Option<i64> = row.get("userNumber")?;
        let instructor = match joined {
            Some(_) => Some(User::from_row(row)?),
            None => None,
        };
        Ok(Course {
            course_number: RecordId::Existing(row.get("courseNumber")?),
            department_name: row.get("departmentName")?,
            class_identifier: row.get("classIdentifier")?,
            section: row.get("section")?,
            class_name: row.get("className")?,
            semester: row.get("semesterType")?,
            year: row.get("year")?,
            instructor_number: row.get("instructorNumber")?,
            instructor,
            creation_date: row.get("creationDate")?,
        })
    }

    fn select_sql() -> String {
        "SELECT * FROM courses LEFT JOIN users ON users.userNumber = courses.instructorNumber".to_string()
    }
}

impl DatabaseManager {
    pub fn insert_course(&self, course: &mut Course) -> StorageResult<bool> {
        self.add_record(course)
    }

    pub fn update_course(&self, course: &Course) -> StorageResult<bool> {
        self.update_record(course)
    }

    /// Remove a course and every enrollment in it
    pub fn remove_course(&self, course_number: i64) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = repository::delete::<Course>(&tx, course_number)?;
            tx.execute("DELETE FROM enrollment WHERE courseNumber = ?1", [course_number])?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn obtain_all_courses(&self) -> StorageResult<Vec<Course>> {
        self.obtain_all_records()
    }

    pub fn obtain_course(&self, course_number: i64) -> StorageResult<Option<Course>> {
        self.find_record_where("courses.courseNumber = ?", &[&course_number])
    }

    pub fn obtain_course_by_identity(
        &self,
        class_identifier: &str,
        section: i64,
        class_name: &str,
    ) -> StorageResult<Option<Course>> {
        self.find_record_where(
            "classIdentifier = ? AND section = ? AND className = ?",
            &[&class_identifier, &section, &class_name],
        )
    }

    pub fn obtain_courses_by_student(&self, user_number: i64) -> StorageResult<Vec<Course>> {
        self.find_records_where(
            "courses.courseNumber IN (SELECT courseNumber FROM enrollment WHERE userNumber = ?)
             ORDER BY courses.courseNumber ASC",
            &[&user_number],
        )
    }

    pub fn obtain_courses_taught_by(&self, instructor_number: i64) -> StorageResult<Vec<Course>> {
        self.find_records_where(
            "courses.instructorNumber = ? ORDER BY courses.courseNumber ASC",
            &[&instructor_number],
        )
    }

    /// Courses created before `before`
    pub fn obtain_inactive_courses(&self, before: NaiveDateTime) -> StorageResult<Vec<Course>> {
        self.find_records_where(
            "courses.creationDate < ? ORDER BY courses.courseNumber ASC",
            &[&before],
        )
    }

    /// Remove courses created before `before` along with their enrollments; returns the course count
    pub fn remove_courses_before_date(&self, before: NaiveDateTime) -> StorageResult<usize> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM enrollment WHERE courseNumber IN
                    (SELECT courseNumber FROM courses WHERE creationDate < ?1)",
                params![before],
            )?;
            let removed = tx.execute("DELETE FROM courses WHERE creationDate < ?1", params![before])?;
            tx.commit()?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::types::UserType;
    use super::*;

    fn instructor(manager: &DatabaseManager) -> User {
        let mut user = User::new("prof", "pw", UserType::Instructor);
        user.last_name = "Lorenz".into();
        manager.add_user(&mut user).unwrap();
        user
    }

    #[test]
    fn test_insert_reads_back_with_instructor() {
        let (manager, paths) = create_test_db();
        let prof = instructor(&manager);

        let mut course = Course::new("Geography", "GEOG", 1, "Meteorology", SemesterType::Fall, 2024, prof.user_number.get().unwrap());
        assert!(manager.insert_course(&mut course).unwrap());
        let number = course.course_number.get().unwrap();

        let stored = manager.obtain_course(number).unwrap().unwrap();
        assert_eq!(stored.class_name, "Meteorology");
        assert_eq!(stored.semester, SemesterType::Fall);
        assert_eq!(stored.instructor.unwrap().last_name, "Lorenz");

        let by_identity = manager.obtain_course_by_identity("GEOG", 1, "Meteorology").unwrap();
        assert_eq!(by_identity.unwrap().course_number, course.course_number);
        assert_eq!(manager.obtain_courses_taught_by(prof.user_number.get().unwrap()).unwrap().len(), 1);

        cleanup(manager, paths);
    }

    #[test]
    fn test_missing_instructor_reads_as_none() {
        let (manager, paths) = create_test_db();

        let mut course = Course::new("Geography", "GEOG", 2, "Climate", SemesterType::Spring, 2024, 999);
        manager.insert_course(&mut course).unwrap();
        let all = manager.obtain_all_courses().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].instructor.is_none());

        cleanup(manager, paths);
    }

    #[test]
    fn test_remove_course_clears_enrollment() {
        let (manager, paths) = create_test_db();
        let prof = instructor(&manager);

        let mut course = Course::new("Geography", "GEOG", 1, "Meteorology", SemesterType::Fall, 2024, prof.user_number.get().unwrap());
        manager.insert_course(&mut course).unwrap();
        let number = course.course_number.get().unwrap();
        let mut student = User::new("stu", "pw", UserType::Student);
        manager.add_user(&mut student).unwrap();
        manager.insert_student_into_course(student.user_number.get().unwrap(), number).unwrap();
        assert_eq!(manager.obtain_courses_by_student(student.user_number.get().unwrap()).unwrap().len(), 1);

        assert!(manager.remove_course(number).unwrap());
        assert!(manager.obtain_course(number).unwrap().is_none());
        assert!(manager.get_students_in_course(number).unwrap().is_empty());

        cleanup(manager, paths);
    }

    #[test]
    fn test_old_courses() {
        let (manager, paths) = create_test_db();

        let mut old = Course::new("Geography", "GEOG", 1, "Old", SemesterType::Fall, 1999, 1);
        old.creation_date = chrono::NaiveDate::from_ymd_opt(1999, 9, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let mut current = Course::new("Geography", "GEOG", 1, "Current", SemesterType::Fall, 2024, 1);
        manager.insert_course(&mut old).unwrap();
        manager.insert_course(&mut current).unwrap();

        let cutoff = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(manager.obtain_inactive_courses(cutoff).unwrap().len(), 1);
        assert_eq!(manager.remove_courses_before_date(cutoff).unwrap(), 1);
        assert_eq!(manager.obtain_all_courses().unwrap().len(), 1);

        cleanup(manager, paths);
    }
}
