// Observing stations forecaster lessons are written against, keyed by station code

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// e.g. "KAVP"
    pub station_code: String,
    pub station_name: String,
    pub state: String,
}

impl Station {
    pub fn new(station_code: &str, station_name: &str, state: &str) -> Self {
        Self {
            station_code: station_code.to_string(),
            station_name: station_name.to_string(),
            state: state.to_string(),
        }
    }
}

pub(crate) fn row_to_station(row: &Row<'_>) -> rusqlite::Result<Station> {
    Ok(Station {
        station_code: row.get("stationCode")?,
        station_name: row.get("stationName")?,
        state: row.get("state")?,
    })
}

fn stations_where(conn: &Connection, clause: &str, param: Option<&str>) -> rusqlite::Result<Vec<Station>> {
    let sql = format!("SELECT * FROM forecaster_stations {} ORDER BY stationName ASC", clause);
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = param.iter().map(|p| p as &dyn ToSql).collect();
    let rows = stmt.query_map(params.as_slice(), row_to_station)?;
    rows.collect()
}

impl DatabaseManager {
    /// A duplicate station code is a constraint error
    pub fn insert_station(&self, station: &Station) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let inserted = conn.execute(
                "INSERT INTO forecaster_stations (stationCode, stationName, state) VALUES (?1, ?2, ?3)",
                params![station.station_code, station.station_name, station.state],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn update_station(&self, station: &Station) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE forecaster_stations SET stationName = ?1, state = ?2 WHERE stationCode = ?3",
                params![station.station_name, station.state, station.station_code],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_station(&self, station_code: &str) -> StorageResult<bool> {
        self.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM forecaster_stations WHERE stationCode = ?1", [station_code])? > 0)
        })
    }

    pub fn get_all_stations(&self) -> StorageResult<Vec<Station>> {
        self.with_connection(|conn| stations_where(conn, "", None))
    }

    pub fn get_all_stations_by_state(&self, state: &str) -> StorageResult<Vec<Station>> {
        self.with_connection(|conn| stations_where(conn, "WHERE state = ?1", Some(state)))
    }

    /// Distinct states, alphabetical
    pub fn get_states(&self) -> StorageResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT state FROM forecaster_stations ORDER BY state ASC")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// Find a station by its name or its code
    pub fn obtain_station(&self, name_or_code: &str) -> StorageResult<Option<Station>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT * FROM forecaster_stations WHERE stationName = ?1 OR stationCode = ?1 LIMIT 1",
                [name_or_code],
                row_to_station,
            )
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    #[test]
    fn test_station_crud_and_lookup() {
        let (manager, paths) = create_test_db();

        assert!(manager.insert_station(&Station::new("KAVP", "Wilkes-Barre/Scranton", "PA")).unwrap());
        assert!(manager.insert_station(&Station::new("KIPT", "Williamsport", "PA")).unwrap());
        assert!(manager.insert_station(&Station::new("KBGM", "Binghamton", "NY")).unwrap());
        assert!(manager.insert_station(&Station::new("KAVP", "Duplicate", "PA")).is_err());

        assert_eq!(manager.get_all_stations().unwrap().len(), 3);
        assert_eq!(manager.get_states().unwrap(), vec!["NY", "PA"]);
        let pa: Vec<String> = manager
            .get_all_stations_by_state("PA")
            .unwrap()
            .into_iter()
            .map(|s| s.station_code)
            .collect();
        assert_eq!(pa, vec!["KAVP", "KIPT"]);

        assert_eq!(manager.obtain_station("Binghamton").unwrap().unwrap().station_code, "KBGM");
        assert_eq!(manager.obtain_station("KIPT").unwrap().unwrap().station_name, "Williamsport");
        assert!(manager.obtain_station("KXYZ").unwrap().is_none());

        assert!(manager.update_station(&Station::new("KBGM", "Greater Binghamton", "NY")).unwrap());
        assert_eq!(manager.obtain_station("KBGM").unwrap().unwrap().station_name, "Greater Binghamton");
        assert!(!manager.update_station(&Station::new("KXYZ", "Nowhere", "ZZ")).unwrap());

        assert!(manager.delete_station("KBGM").unwrap());
        assert_eq!(manager.get_states().unwrap(), vec!["PA"]);

        cleanup(manager, paths);
    }
}
