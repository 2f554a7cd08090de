// Observed data per station and day, keyed by data key (e.g. "TEMP_MAX"),
// that forecaster answers are graded against

use chrono::NaiveDate;
use log::debug;
use rusqlite::OptionalExtension;
use std::collections::HashMap;

use crate::storage::database::{DatabaseManager, StorageResult};
use crate::storage::procedures;
use crate::storage::stations::Station;

impl DatabaseManager {
    /// The station with everything recorded for it on `date`.
    /// `None` when the station code is unknown.
    pub fn get_station_data(
        &self,
        station_code: &str,
        date: NaiveDate,
    ) -> StorageResult<Option<(Station, HashMap<String, String>)>> {
        self.with_connection(|conn| procedures::get_station_data_by_id_and_date(conn, station_code, date))
    }

    /// Record every key of `data` for the day in one transaction.
    /// Nothing is written for an unknown station.
    pub fn add_station_data(
        &self,
        station_code: &str,
        date: NaiveDate,
        data: &HashMap<String, String>,
    ) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let known = tx
                .query_row(
                    "SELECT 1 FROM forecaster_stations WHERE stationCode = ?1",
                    [station_code],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .is_some();
            if !known {
                return Ok(false);
            }
            for (key, value) in data {
                procedures::insert_station_data(&tx, station_code, date, key, value)?;
            }
            tx.commit()?;
            debug!("recorded {} values for {} on {}", data.len(), station_code, date);
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn observations(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_station_without_data_has_empty_map() {
        let (manager, paths) = create_test_db();

        assert!(manager.get_station_data("KAVP", day(1)).unwrap().is_none());

        manager.insert_station(&Station::new("KAVP", "Wilkes-Barre/Scranton", "PA")).unwrap();
        let (station, data) = manager.get_station_data("KAVP", day(1)).unwrap().unwrap();
        assert_eq!(station.station_name, "Wilkes-Barre/Scranton");
        assert!(data.is_empty());

        assert!(!manager
            .add_station_data("KXYZ", day(1), &observations(&[("TEMP_MAX", "70")]))
            .unwrap());

        cleanup(manager, paths);
    }

    #[test]
    fn test_add_and_read_back_by_day() {
        let (manager, paths) = create_test_db();
        manager.insert_station(&Station::new("KIPT", "Williamsport", "PA")).unwrap();

        let first = observations(&[("TEMP_MAX", "71"), ("TEMP_MIN", "48"), ("PRECIP", "0.12")]);
        assert!(manager.add_station_data("KIPT", day(2), &first).unwrap());
        assert!(manager
            .add_station_data("KIPT", day(3), &observations(&[("TEMP_MAX", "64")]))
            .unwrap());

        let (station, data) = manager.get_station_data("KIPT", day(2)).unwrap().unwrap();
        assert_eq!(station.station_code, "KIPT");
        assert_eq!(data, first);

        // a key recorded again for the same day is replaced
        assert!(manager
            .add_station_data("KIPT", day(2), &observations(&[("TEMP_MAX", "73")]))
            .unwrap());
        let (_, data) = manager.get_station_data("KIPT", day(2)).unwrap().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data["TEMP_MAX"], "73");

        let (_, other_day) = manager.get_station_data("KIPT", day(3)).unwrap().unwrap();
        assert_eq!(other_day, observations(&[("TEMP_MAX", "64")]));

        cleanup(manager, paths);
    }
}
