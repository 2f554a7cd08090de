// Enrollment join table (userNumber, courseNumber)

use log::debug;
use rusqlite::params;

use super::access::Viewer;
use super::courses::Course;
use super::database::{DatabaseManager, StorageResult};
use super::repository::Repository;
use super::types::UserType;
use super::users::User;

impl DatabaseManager {
    pub fn insert_student_into_course(&self, user_number: i64, course_number: i64) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let inserted = conn.execute(
                "INSERT INTO enrollment (userNumber, courseNumber) VALUES (?1, ?2)",
                params![user_number, course_number],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_student_from_course(&self, user_number: i64, course_number: i64) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM enrollment WHERE userNumber = ?1 AND courseNumber = ?2",
                params![user_number, course_number],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn remove_all_students_from_course(&self, course_number: i64) -> StorageResult<usize> {
        self.with_connection(|conn| conn.execute("DELETE FROM enrollment WHERE courseNumber = ?1", [course_number]))
    }

    pub fn get_courses_for_student(&self, user_number: i64) -> StorageResult<Vec<Course>> {
        self.obtain_courses_by_student(user_number)
    }

    pub fn get_courses_for_instructor(&self, instructor_number: i64) -> StorageResult<Vec<Course>> {
        self.obtain_courses_taught_by(instructor_number)
    }

    /// Every enrolled user, whatever their type
    pub fn get_students_in_course(&self, course_number: i64) -> StorageResult<Vec<User>> {
        self.find_records_where(
            "userNumber IN (SELECT userNumber FROM enrollment WHERE courseNumber = ?)
             ORDER BY lastName, firstName",
            &[&course_number],
        )
    }

    /// Instructors of every course the user is enrolled in
    pub fn get_instructors_for_student(&self, user_number: i64) -> StorageResult<Vec<i64>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT c.instructorNumber FROM courses c
                 JOIN enrollment e ON e.courseNumber = c.courseNumber
                 WHERE e.userNumber = ?1
                 ORDER BY c.instructorNumber",
            )?;
            let rows = stmt.query_map([user_number], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// Visibility context for a stored user; students get their instructors filled in
    pub fn viewer_for(&self, user: &User) -> StorageResult<Viewer> {
        let number = user.user_number.get().unwrap_or_default();
        let viewer = Viewer::new(number, user.user_type);
        if user.user_type != UserType::Student || user.user_number.is_new() {
            return Ok(viewer);
        }
        Ok(viewer.with_instructors(self.get_instructors_for_student(number)?))
    }

    /// Remove student accounts that are no longer enrolled anywhere
    pub fn delete_students_enrolled_in_no_courses(&self) -> StorageResult<usize> {
        let removed = self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM users WHERE userType = 'Student'
                 AND userNumber NOT IN (SELECT userNumber FROM enrollment)",
                [],
            )
        })?;
        debug!("removed {} unenrolled students", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::types::SemesterType;
    use super::*;

    fn setup(manager: &DatabaseManager) -> (i64, i64, i64) {
        let mut prof = User::new("prof", "pw", UserType::Instructor);
        let mut stu = User::new("stu", "pw", UserType::Student);
        manager.add_user(&mut prof).unwrap();
        manager.add_user(&mut stu).unwrap();
        let prof_number = prof.user_number.get().unwrap();
        let mut course = Course::new("Geography", "GEOG", 1, "Meteorology", SemesterType::Fall, 2024, prof_number);
        manager.insert_course(&mut course).unwrap();
        (prof_number, stu.user_number.get().unwrap(), course.course_number.get().unwrap())
    }

    #[test]
    fn test_enroll_and_list() {
        let (manager, paths) = create_test_db();
        let (prof, stu, course) = setup(&manager);

        assert!(manager.insert_student_into_course(stu, course).unwrap());
        assert_eq!(manager.get_courses_for_student(stu).unwrap().len(), 1);
        assert_eq!(manager.get_courses_for_instructor(prof).unwrap().len(), 1);
        assert_eq!(manager.get_students_in_course(course).unwrap()[0].login_id, "stu");

        assert!(manager.insert_student_into_course(stu, course).is_err());

        let student = manager.obtain_user(stu).unwrap().unwrap();
        let viewer = manager.viewer_for(&student).unwrap();
        assert_eq!(viewer.instructors, vec![prof]);
        let instructor = manager.obtain_user(prof).unwrap().unwrap();
        assert!(manager.viewer_for(&instructor).unwrap().instructors.is_empty());

        cleanup(manager, paths);
    }

    #[test]
    fn test_unenroll_and_prune() {
        let (manager, paths) = create_test_db();
        let (_, stu, course) = setup(&manager);

        manager.insert_student_into_course(stu, course).unwrap();
        assert_eq!(manager.delete_students_enrolled_in_no_courses().unwrap(), 0);

        assert!(manager.remove_student_from_course(stu, course).unwrap());
        assert!(!manager.remove_student_from_course(stu, course).unwrap());
        assert_eq!(manager.remove_all_students_from_course(course).unwrap(), 0);

        assert_eq!(manager.delete_students_enrolled_in_no_courses().unwrap(), 1);
        assert!(manager.obtain_user(stu).unwrap().is_none());
        assert!(manager.obtain_user_by_login("prof").unwrap().is_some());

        cleanup(manager, paths);
    }
}
