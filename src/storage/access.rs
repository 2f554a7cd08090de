// Visibility of access-controlled rows
// One decision table (user type x access rights) drives both in-memory checks and SQL filters

use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use super::types::{AccessRights, UserType};

/// What a given user type needs in order to see a row with given access rights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Always,
    Never,
    /// The viewer created the row
    IfOwner,
    /// The row's owner teaches one of the viewer's courses
    IfOwnerIsInstructor,
}

pub fn rule(user_type: UserType, rights: AccessRights) -> Rule {
    use AccessRights::*;

    match user_type {
        UserType::Administrator => Rule::Always,
        UserType::Instructor => match rights {
            Everyone | Instructors => Rule::Always,
            AllStudents | CourseStudents | Private => Rule::IfOwner,
        },
        UserType::Student => match rights {
            Everyone | AllStudents => Rule::Always,
            CourseStudents => Rule::IfOwnerIsInstructor,
            Instructors | Private => Rule::Never,
        },
        UserType::Guest | UserType::Unregistered => match rights {
            Everyone => Rule::Always,
            _ => Rule::Never,
        },
    }
}

/// The caller a visibility query is evaluated for.
///
/// Students carry the user numbers of their instructors, since the queries
/// do not join through enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_number: i64,
    pub user_type: UserType,
    pub instructors: Vec<i64>,
}

impl Viewer {
    pub fn new(user_number: i64, user_type: UserType) -> Self {
        Self {
            user_number,
            user_type,
            instructors: Vec::new(),
        }
    }

    pub fn with_instructors(mut self, instructors: Vec<i64>) -> Self {
        self.instructors = instructors;
        self
    }

    pub fn can_view(&self, owner: i64, rights: AccessRights) -> bool {
        match rule(self.user_type, rights) {
            Rule::Always => true,
            Rule::Never => false,
            Rule::IfOwner => owner == self.user_number,
            Rule::IfOwnerIsInstructor => self.instructors.contains(&owner),
        }
    }

    /// Render the decision table as a WHERE fragment over the given columns.
    ///
    /// Returns the SQL and its bind values; a viewer that can see nothing
    /// gets `0`, so the fragment is always safe to AND into a larger clause.
    pub fn visibility_clause(&self, owner_column: &str, rights_column: &str) -> (String, Vec<Box<dyn ToSql>>) {
        let mut always = Vec::new();
        let mut terms = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        for rights in AccessRights::ALL {
            match rule(self.user_type, *rights) {
                Rule::Always => always.push(*rights),
                Rule::Never => {}
                Rule::IfOwner => {
                    terms.push(format!("({} = ? AND {} = ?)", rights_column, owner_column));
                    values.push(Box::new(*rights));
                    values.push(Box::new(self.user_number));
                }
                Rule::IfOwnerIsInstructor => {
                    if self.instructors.is_empty() {
                        continue;
                    }
                    let placeholders = vec!["?"; self.instructors.len()].join(", ");
                    terms.push(format!(
                        "({} = ? AND {} IN ({}))",
                        rights_column, owner_column, placeholders
                    ));
                    values.push(Box::new(*rights));
                    for instructor in &self.instructors {
                        values.push(Box::new(*instructor));
                    }
                }
            }
        }

        if !always.is_empty() {
            let placeholders = vec!["?"; always.len()].join(", ");
            let mut head: Vec<Box<dyn ToSql>> = always
                .into_iter()
                .map(|r| Box::new(r) as Box<dyn ToSql>)
                .collect();
            head.append(&mut values);
            values = head;
            terms.insert(0, format!("{} IN ({})", rights_column, placeholders));
        }

        if terms.is_empty() {
            return ("0".to_string(), values);
        }
        (format!("({})", terms.join(" OR ")), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params_from_iter, Connection};

    const INSTRUCTOR: i64 = 10;
    const OTHER_INSTRUCTOR: i64 = 11;
    const STUDENT: i64 = 20;

    fn rows_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE items (owner INTEGER, rights TEXT)").unwrap();
        for owner in [INSTRUCTOR, OTHER_INSTRUCTOR, STUDENT] {
            for rights in AccessRights::ALL {
                conn.execute("INSERT INTO items VALUES (?, ?)", rusqlite::params![owner, rights])
                    .unwrap();
            }
        }
        conn
    }

    fn visible_in_sql(conn: &Connection, viewer: &Viewer) -> Vec<(i64, AccessRights)> {
        let (clause, values) = viewer.visibility_clause("owner", "rights");
        let sql = format!("SELECT owner, rights FROM items WHERE {} ORDER BY owner, rights", clause);
        let mut stmt = conn.prepare(&sql).unwrap();
        let rows = stmt
            .query_map(params_from_iter(values.iter().map(|v| v.as_ref())), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    }

    fn visible_in_memory(viewer: &Viewer) -> Vec<(i64, AccessRights)> {
        let mut out = Vec::new();
        for owner in [INSTRUCTOR, OTHER_INSTRUCTOR, STUDENT] {
            for rights in AccessRights::ALL {
                if viewer.can_view(owner, *rights) {
                    out.push((owner, *rights));
                }
            }
        }
        out
    }

    #[test]
    fn test_sql_clause_agrees_with_table() {
        let conn = rows_db();
        let viewers = [
            Viewer::new(1, UserType::Administrator),
            Viewer::new(INSTRUCTOR, UserType::Instructor),
            Viewer::new(STUDENT, UserType::Student).with_instructors(vec![INSTRUCTOR]),
            Viewer::new(STUDENT, UserType::Student),
            Viewer::new(30, UserType::Guest),
            Viewer::new(31, UserType::Unregistered),
        ];

        for viewer in &viewers {
            let mut sql = visible_in_sql(&conn, viewer);
            let mut mem = visible_in_memory(viewer);
            sql.sort_by_key(|(o, r)| (*o, r.as_str()));
            mem.sort_by_key(|(o, r)| (*o, r.as_str()));
            assert_eq!(sql, mem, "mismatch for {:?}", viewer.user_type);
        }
    }

    #[test]
    fn test_administrator_sees_everything() {
        let viewer = Viewer::new(1, UserType::Administrator);
        for rights in AccessRights::ALL {
            assert!(viewer.can_view(999, *rights));
        }
    }

    #[test]
    fn test_guest_never_sees_restricted_rows() {
        let guest = Viewer::new(30, UserType::Guest);
        assert!(guest.can_view(INSTRUCTOR, AccessRights::Everyone));
        assert!(!guest.can_view(INSTRUCTOR, AccessRights::CourseStudents));
        assert!(!guest.can_view(INSTRUCTOR, AccessRights::Instructors));
        assert!(!guest.can_view(INSTRUCTOR, AccessRights::AllStudents));
    }

    #[test]
    fn test_student_course_rows_need_matching_instructor() {
        let student = Viewer::new(STUDENT, UserType::Student).with_instructors(vec![INSTRUCTOR]);
        assert!(student.can_view(INSTRUCTOR, AccessRights::CourseStudents));
        assert!(!student.can_view(OTHER_INSTRUCTOR, AccessRights::CourseStudents));
        assert!(student.can_view(OTHER_INSTRUCTOR, AccessRights::AllStudents));
        assert!(!student.can_view(INSTRUCTOR, AccessRights::Instructors));
    }

    #[test]
    fn test_instructor_sees_own_private_rows_only() {
        let instructor = Viewer::new(INSTRUCTOR, UserType::Instructor);
        assert!(instructor.can_view(INSTRUCTOR, AccessRights::Private));
        assert!(!instructor.can_view(OTHER_INSTRUCTOR, AccessRights::Private));
        assert!(instructor.can_view(OTHER_INSTRUCTOR, AccessRights::Instructors));
    }
}
