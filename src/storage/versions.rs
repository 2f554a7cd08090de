// Release history, kept in the shared database so every installation sees it

use chrono::NaiveDateTime;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::database::{DatabaseManager, StorageError, StorageResult};
use super::mapper::text_or_empty;

/// Versions order by (major, minor, release); notes and date do not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub major: i64,
    pub minor: i64,
    pub release: i64,
    pub notes: String,
    pub release_date: NaiveDateTime,
}

impl Version {
    pub fn new(major: i64, minor: i64, release: i64, release_date: NaiveDateTime) -> Self {
        Self {
            major,
            minor,
            release,
            notes: String::new(),
            release_date,
        }
    }

    fn key(&self) -> (i64, i64, i64) {
        (self.major, self.minor, self.release)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

/// A parsed "major.minor.release" string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionNumber(pub i64, pub i64, pub i64);

impl FromStr for VersionNumber {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        let [major, minor, release] = parts.as_slice() else {
            return Err(StorageError::invalid(format!("expected major.minor.release, got {:?}", s)));
        };
        let number = |part: &str| {
            part.parse::<i64>()
                .map_err(|_| StorageError::invalid(format!("bad version component {:?} in {:?}", part, s)))
        };
        Ok(VersionNumber(number(*major)?, number(*minor)?, number(*release)?))
    }
}

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        major: row.get("majorVersionNumber")?,
        minor: row.get("minorVersionNumber")?,
        release: row.get("minorReleaseNumber")?,
        notes: text_or_empty(row, "releaseNotes")?,
        release_date: row.get("releaseDate")?,
    })
}

const ORDER: &str = "majorVersionNumber ASC, minorVersionNumber ASC, minorReleaseNumber ASC";

fn all_versions(conn: &Connection) -> rusqlite::Result<Vec<Version>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM versions ORDER BY {}", ORDER))?;
    let rows = stmt.query_map([], row_to_version)?;
    rows.collect()
}

impl DatabaseManager {
    pub fn insert_version(&self, version: &Version) -> StorageResult<bool> {
        let inserted = self.with_shared_connection(|conn| {
            conn.execute(
                "INSERT INTO versions
                    (majorVersionNumber, minorVersionNumber, minorReleaseNumber, releaseNotes, releaseDate)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![version.major, version.minor, version.release, version.notes, version.release_date],
            )
        })?;
        info!("recorded release {}", version);
        Ok(inserted > 0)
    }

    /// Highest version by number, `None` when no release is recorded
    pub fn get_most_recent_version(&self) -> StorageResult<Option<Version>> {
        self.with_shared_connection(|conn| {
            conn.query_row(
                "SELECT * FROM versions
                 ORDER BY majorVersionNumber DESC, minorVersionNumber DESC, minorReleaseNumber DESC LIMIT 1",
                [],
                row_to_version,
            )
            .optional()
        })
    }

    /// Oldest first
    pub fn get_all_versions(&self) -> StorageResult<Vec<Version>> {
        self.with_shared_connection(all_versions)
    }

    pub fn update_version_notes(&self, version: &Version) -> StorageResult<bool> {
        self.with_shared_connection(|conn| {
            let changed = conn.execute(
                "UPDATE versions SET releaseNotes = ?1
                 WHERE majorVersionNumber = ?2 AND minorVersionNumber = ?3 AND minorReleaseNumber = ?4",
                params![version.notes, version.major, version.minor, version.release],
            )?;
            Ok(changed > 0)
        })
    }

    /// Look a release up by its "major.minor.release" text
    pub fn get_version_from_string(&self, version: &str) -> StorageResult<Option<Version>> {
        let VersionNumber(major, minor, release) = version.parse()?;
        self.with_shared_connection(|conn| {
            conn.query_row(
                "SELECT * FROM versions
                 WHERE majorVersionNumber = ?1 AND minorVersionNumber = ?2 AND minorReleaseNumber = ?3",
                params![major, minor, release],
                row_to_version,
            )
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::database::ErrorKind;
    use chrono::NaiveDate;
    use super::*;

    fn released(major: i64, minor: i64, release: i64) -> Version {
        let date = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        Version::new(major, minor, release, date)
    }

    #[test]
    fn test_parse_version_number() {
        assert_eq!("2.10.3".parse::<VersionNumber>().unwrap(), VersionNumber(2, 10, 3));
        assert_eq!(" 1.0.0 ".parse::<VersionNumber>().unwrap(), VersionNumber(1, 0, 0));
        assert!("1.0".parse::<VersionNumber>().is_err());
        assert!("1.x.0".parse::<VersionNumber>().is_err());
        assert_eq!(released(3, 1, 4).to_string(), "3.1.4");
    }

    #[test]
    fn test_versions_sorted_numerically() {
        let (manager, paths) = create_test_db();

        assert!(manager.get_most_recent_version().unwrap().is_none());
        for v in [released(1, 10, 0), released(1, 2, 0), released(1, 2, 11), released(0, 9, 9)] {
            assert!(manager.insert_version(&v).unwrap());
        }
        assert!(manager.insert_version(&released(1, 2, 0)).is_err());

        let all: Vec<String> = manager.get_all_versions().unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(all, vec!["0.9.9", "1.2.0", "1.2.11", "1.10.0"]);
        assert_eq!(manager.get_most_recent_version().unwrap().unwrap(), released(1, 10, 0));

        // the local database is untouched
        let local_has_versions = manager
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'versions'",
                    [],
                    |r| r.get::<_, i64>(0),
                )
            })
            .unwrap();
        assert_eq!(local_has_versions, 0);

        cleanup(manager, paths);
    }

    #[test]
    fn test_notes_and_lookup_by_string() {
        let (manager, paths) = create_test_db();

        let mut v = released(2, 0, 1);
        manager.insert_version(&v).unwrap();
        v.notes = "fixed movie export".into();
        assert!(manager.update_version_notes(&v).unwrap());
        assert!(!manager.update_version_notes(&released(9, 9, 9)).unwrap());

        let found = manager.get_version_from_string("2.0.1").unwrap().unwrap();
        assert_eq!(found.notes, "fixed movie export");
        assert!(manager.get_version_from_string("2.0.2").unwrap().is_none());
        let err = manager.get_version_from_string("two").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        cleanup(manager, paths);
    }
}
