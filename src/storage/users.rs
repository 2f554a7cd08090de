// User accounts
// Registration, login bookkeeping, lookups and removal through the delete-user procedure

use chrono::NaiveDateTime;
use log::debug;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper::{self, text_or_empty};
use super::procedures;
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::UserType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_number: RecordId,
    pub login_id: String,
    /// Stored as given; hashing happens before it reaches this layer
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub notes: String,
    pub last_login_time: Option<NaiveDateTime>,
    pub login_count: i64,
}

impl User {
    pub fn new(login_id: &str, password: &str, user_type: UserType) -> Self {
        Self {
            user_number: RecordId::New,
            login_id: login_id.to_string(),
            password: password.to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            user_type,
            notes: String::new(),
            last_login_time: None,
            login_count: 0,
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const KEY: &'static str = "userNumber";
    const COLUMNS: &'static [&'static str] = &[
        "loginID",
        "loginPassword",
        "email",
        "firstName",
        "lastName",
        "userType",
        "notes",
        "lastLoginTime",
        "loginCount",
    ];
    const ORDER_BY: Option<&'static str> = Some("userNumber ASC");

    fn record_id(&self) -> RecordId {
        self.user_number
    }

    fn assign_id(&mut self, id: i64) {
        self.user_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.login_id.clone()),
            Box::new(self.password.clone()),
            Box::new(self.email.clone()),
            Box::new(self.first_name.clone()),
            Box::new(self.last_name.clone()),
            Box::new(self.user_type),
            Box::new(self.notes.clone()),
            Box::new(self.last_login_time),
            Box::new(self.login_count),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            user_number: RecordId::Existing(row.get("userNumber")?),
            login_id: row.get("loginID")?,
            password: row.get("loginPassword")?,
            email: text_or_empty(row, "email")?,
            first_name: text_or_empty(row, "firstName")?,
            last_name: text_or_empty(row, "lastName")?,
            user_type: row.get("userType")?,
            notes: text_or_empty(row, "notes")?,
            last_login_time: row.get("lastLoginTime")?,
            login_count: row.get("loginCount")?,
        })
    }
}

impl DatabaseManager {
    /// Register a user. The login clock starts now with a count of zero.
    pub fn add_user(&self, user: &mut User) -> StorageResult<bool> {
        if !user.user_number.is_new() {
            return Ok(false);
        }
        user.last_login_time = Some(mapper::now());
        user.login_count = 0;
        self.add_record(user)
    }

    pub fn update_user(&self, user: &User) -> StorageResult<bool> {
        self.update_record(user)
    }

    pub fn update_password(&self, login_id: &str, new_password: &str) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE users SET loginPassword = ?1 WHERE loginID = ?2",
                params![new_password, login_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove a user together with their enrollments and stored files
    pub fn remove_user(&self, user_number: i64) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = procedures::delete_user(&tx, user_number)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn remove_user_by_login(&self, login_id: &str) -> StorageResult<bool> {
        match self.obtain_user_by_login(login_id)? {
            Some(user) => match user.user_number.get() {
                Some(number) => self.remove_user(number),
                None => Ok(false),
            },
            None => Ok(false),
        }
    }

    pub fn obtain_user(&self, user_number: i64) -> StorageResult<Option<User>> {
        self.find_record(user_number)
    }

    pub fn obtain_user_by_login(&self, login_id: &str) -> StorageResult<Option<User>> {
        self.find_record_where("loginID = ?", &[&login_id])
    }

    pub fn obtain_user_by_name(&self, first_name: &str, last_name: &str) -> StorageResult<Option<User>> {
        self.find_record_where("firstName = ? AND lastName = ?", &[&first_name, &last_name])
    }

    pub fn obtain_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.find_record_where("email = ?", &[&email])
    }

    pub fn obtain_all_users(&self) -> StorageResult<Vec<User>> {
        self.obtain_all_records()
    }

    fn obtain_users_of_types(&self, types: &[UserType]) -> StorageResult<Vec<User>> {
        let placeholders = vec!["?"; types.len()].join(", ");
        let clause = format!("userType IN ({}) ORDER BY userNumber ASC", placeholders);
        let params: Vec<&dyn rusqlite::ToSql> = types.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
        self.find_records_where(&clause, &params)
    }

    pub fn obtain_all_instructors(&self) -> StorageResult<Vec<User>> {
        self.obtain_users_of_types(&[UserType::Instructor])
    }

    pub fn obtain_all_administrators(&self) -> StorageResult<Vec<User>> {
        self.obtain_users_of_types(&[UserType::Administrator])
    }

    pub fn obtain_all_instructors_and_administrators(&self) -> StorageResult<Vec<User>> {
        self.obtain_users_of_types(&[UserType::Instructor, UserType::Administrator])
    }

    pub fn obtain_all_students(&self) -> StorageResult<Vec<User>> {
        self.obtain_users_of_types(&[UserType::Student])
    }

    pub fn obtain_all_guests(&self) -> StorageResult<Vec<User>> {
        self.obtain_users_of_types(&[UserType::Guest])
    }

    pub fn obtain_all_students_in_course(&self, course_number: i64) -> StorageResult<Vec<User>> {
        self.find_records_where(
            "userType = 'Student' AND userNumber IN
                (SELECT userNumber FROM enrollment WHERE courseNumber = ?)
             ORDER BY userNumber ASC",
            &[&course_number],
        )
    }

    /// Students with at least one enrollment
    pub fn obtain_all_enrolled_students(&self) -> StorageResult<Vec<User>> {
        self.find_records_where(
            "userType = 'Student' AND userNumber IN (SELECT userNumber FROM enrollment)
             ORDER BY userNumber ASC",
            &[],
        )
    }

    /// Record a login: stamp the time and bump the count, on the row and on `user`
    pub fn update_login_date_and_count(&self, user: &mut User) -> StorageResult<bool> {
        if user.user_number.is_new() {
            return Ok(false);
        }
        let now = mapper::now();
        let count = user.login_count + 1;
        let updated = self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE users SET lastLoginTime = ?1, loginCount = ?2 WHERE loginID = ?3",
                params![now, count, user.login_id],
            )?;
            Ok(changed > 0)
        })?;
        if updated {
            user.last_login_time = Some(now);
            user.login_count = count;
        }
        Ok(updated)
    }

    /// Students whose last login is before `before`
    pub fn obtain_inactive_students(&self, before: NaiveDateTime) -> StorageResult<Vec<User>> {
        self.find_records_where(
            "userType = 'Student' AND lastLoginTime < ? ORDER BY userNumber ASC",
            &[&before],
        )
    }

    /// Remove every inactive student; returns how many were removed
    pub fn remove_students_before_date(&self, before: NaiveDateTime) -> StorageResult<usize> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let students: Vec<User> = repository::find_where(
                &tx,
                "userType = 'Student' AND lastLoginTime < ?",
                &[&before],
            )?;
            let mut removed = 0;
            for number in students.iter().filter_map(|s| s.user_number.get()) {
                if procedures::delete_user(&tx, number)? {
                    removed += 1;
                }
            }
            tx.commit()?;
            debug!("removed {} inactive students", removed);
            Ok(removed)
        })
    }

    fn obtain_users_like(&self, column: &str, substring: &str) -> StorageResult<Vec<User>> {
        let pattern = format!("%{}%", substring);
        self.find_records_where(&format!("{} LIKE ? ORDER BY userNumber ASC", column), &[&pattern])
    }

    pub fn obtain_users_with_first_name_substring(&self, substring: &str) -> StorageResult<Vec<User>> {
        self.obtain_users_like("firstName", substring)
    }

    pub fn obtain_users_with_last_name_substring(&self, substring: &str) -> StorageResult<Vec<User>> {
        self.obtain_users_like("lastName", substring)
    }

    pub fn obtain_users_with_login_substring(&self, substring: &str) -> StorageResult<Vec<User>> {
        self.obtain_users_like("loginID", substring)
    }

    pub fn obtain_users_by_email(&self, substring: &str) -> StorageResult<Vec<User>> {
        self.obtain_users_like("email", substring)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    fn student(login: &str) -> User {
        let mut user = User::new(login, "secret", UserType::Student);
        user.first_name = format!("{}-first", login);
        user.last_name = "Tester".into();
        user.email = format!("{}@example.edu", login);
        user
    }

    #[test]
    fn test_add_and_obtain_by_login() {
        let (manager, paths) = create_test_db();

        let mut alice = student("alice");
        assert!(manager.add_user(&mut alice).unwrap());
        let number = alice.user_number.get().unwrap();
        assert!(number > 0);

        let found = manager.obtain_user_by_login("alice").unwrap().unwrap();
        assert_eq!(found.user_type, UserType::Student);
        assert_eq!(found.user_number, alice.user_number);
        assert_eq!(found.login_count, 0);
        assert_eq!(found, alice);

        assert!(manager.obtain_user_by_login("nobody").unwrap().is_none());

        cleanup(manager, paths);
    }

    #[test]
    fn test_add_requires_new_and_update_requires_existing() {
        let (manager, paths) = create_test_db();

        let mut saved = student("bob");
        manager.add_user(&mut saved).unwrap();
        let mut again = saved.clone();
        assert!(!manager.add_user(&mut again).unwrap());
        assert!(!manager.update_user(&student("carol")).unwrap());

        saved.first_name = "Robert".into();
        assert!(manager.update_user(&saved).unwrap());
        assert_eq!(
            manager.obtain_user(saved.user_number.get().unwrap()).unwrap().unwrap().first_name,
            "Robert"
        );

        cleanup(manager, paths);
    }

    #[test]
    fn test_password_and_login_bookkeeping() {
        let (manager, paths) = create_test_db();

        let mut user = student("dana");
        manager.add_user(&mut user).unwrap();
        assert!(manager.update_password("dana", "changed").unwrap());
        assert!(!manager.update_password("ghost", "changed").unwrap());

        assert!(manager.update_login_date_and_count(&mut user).unwrap());
        assert!(manager.update_login_date_and_count(&mut user).unwrap());
        let stored = manager.obtain_user_by_login("dana").unwrap().unwrap();
        assert_eq!(stored.login_count, 2);
        assert_eq!(stored.password, "changed");

        cleanup(manager, paths);
    }

    #[test]
    fn test_type_filters_and_substrings() {
        let (manager, paths) = create_test_db();
        assert!(manager.obtain_all_users().unwrap().is_empty());

        let mut s = student("erin");
        let mut i = User::new("prof", "pw", UserType::Instructor);
        let mut a = User::new("root", "pw", UserType::Administrator);
        manager.add_user(&mut s).unwrap();
        manager.add_user(&mut i).unwrap();
        manager.add_user(&mut a).unwrap();

        assert_eq!(manager.obtain_all_users().unwrap().len(), 3);
        assert_eq!(manager.obtain_all_instructors().unwrap().len(), 1);
        assert_eq!(manager.obtain_all_administrators().unwrap().len(), 1);
        assert_eq!(manager.obtain_all_instructors_and_administrators().unwrap().len(), 2);
        assert_eq!(manager.obtain_users_with_login_substring("ro").unwrap().len(), 2);
        assert_eq!(manager.obtain_users_with_first_name_substring("erin").unwrap().len(), 1);
        assert_eq!(manager.obtain_users_by_email("example.edu").unwrap().len(), 1);
        assert!(manager.obtain_user_by_name("erin-first", "Tester").unwrap().is_some());

        cleanup(manager, paths);
    }

    #[test]
    fn test_remove_user_cascades() {
        let (manager, paths) = create_test_db();

        let mut user = student("fay");
        manager.add_user(&mut user).unwrap();
        let number = user.user_number.get().unwrap();
        manager
            .with_connection(|conn| {
                conn.execute("INSERT INTO enrollment (userNumber, courseNumber) VALUES (?1, 5)", [number])
            })
            .unwrap();
        assert_eq!(manager.obtain_all_enrolled_students().unwrap().len(), 1);
        assert_eq!(manager.obtain_all_students_in_course(5).unwrap().len(), 1);

        assert!(manager.remove_user_by_login("fay").unwrap());
        assert!(!manager.remove_user(number).unwrap());
        assert!(manager.obtain_all_students_in_course(5).unwrap().is_empty());
        let enrollments: i64 = manager
            .with_connection(|conn| conn.query_row("SELECT COUNT(*) FROM enrollment", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(enrollments, 0);

        cleanup(manager, paths);
    }

    #[test]
    fn test_inactive_students() {
        let (manager, paths) = create_test_db();

        let mut old = student("old");
        let mut fresh = student("fresh");
        manager.add_user(&mut old).unwrap();
        manager.add_user(&mut fresh).unwrap();
        let long_ago = chrono::NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        manager
            .with_connection(|conn| {
                conn.execute("UPDATE users SET lastLoginTime = ?1 WHERE loginID = 'old'", [long_ago])
            })
            .unwrap();

        let cutoff = long_ago + chrono::Duration::days(365);
        let inactive = manager.obtain_inactive_students(cutoff).unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].login_id, "old");

        assert_eq!(manager.remove_students_before_date(cutoff).unwrap(), 1);
        assert!(manager.obtain_user_by_login("old").unwrap().is_none());
        assert!(manager.obtain_user_by_login("fresh").unwrap().is_some());

        cleanup(manager, paths);
    }
}
