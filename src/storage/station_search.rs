// Daily summaries of weather station readings, one table per station resource,
// searched by variable and date range

use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageError, StorageResult};
use super::schema::{create_station_averages_table, station_averages_table};

/// Readings summarized as min/max/median; column names are `min<Name>` etc.
const SUMMARIZED: [&str; 8] = [
    "Temp",
    "DewPoint",
    "RelativeHumidity",
    "Pressure",
    "WindSpeed",
    "SolarRadiation",
    "HourlyPrecip",
    "WindGust",
];

const DAILY_PRECIPITATION: &str = "dailyPrecip";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStationDailyAverage {
    pub resource_number: i64,
    pub date: NaiveDate,
    pub temperature: Summary,
    pub dew_point: Summary,
    pub relative_humidity: Summary,
    pub pressure: Summary,
    pub wind_speed: Summary,
    pub solar_radiation: Summary,
    pub hourly_precipitation: Summary,
    pub wind_gust: Summary,
    pub daily_precipitation: f64,
}

impl WeatherStationDailyAverage {
    pub fn new(resource_number: i64, date: NaiveDate) -> Self {
        Self {
            resource_number,
            date,
            temperature: Summary::default(),
            dew_point: Summary::default(),
            relative_humidity: Summary::default(),
            pressure: Summary::default(),
            wind_speed: Summary::default(),
            solar_radiation: Summary::default(),
            hourly_precipitation: Summary::default(),
            wind_gust: Summary::default(),
            daily_precipitation: 0.0,
        }
    }

    /// Same order as `SUMMARIZED`
    fn summaries(&self) -> [&Summary; 8] {
        [
            &self.temperature,
            &self.dew_point,
            &self.relative_humidity,
            &self.pressure,
            &self.wind_speed,
            &self.solar_radiation,
            &self.hourly_precipitation,
            &self.wind_gust,
        ]
    }
}

/// Every searchable variable key, in table column order
pub fn variable_keys() -> Vec<String> {
    let mut keys: Vec<String> = SUMMARIZED
        .iter()
        .flat_map(|name| [format!("min{}", name), format!("max{}", name), format!("median{}", name)])
        .collect();
    keys.push(DAILY_PRECIPITATION.to_string());
    keys
}

fn check_variable_key(key: &str) -> StorageResult<()> {
    if variable_keys().iter().any(|k| k == key) {
        Ok(())
    } else {
        Err(StorageError::invalid(format!("unknown weather station variable {:?}", key)))
    }
}

/// NULL readings come back as 0
fn reading(row: &Row<'_>, column: &str) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(column)?.unwrap_or_default())
}

fn summary(row: &Row<'_>, name: &str) -> rusqlite::Result<Summary> {
    Ok(Summary {
        min: reading(row, &format!("min{}", name))?,
        max: reading(row, &format!("max{}", name))?,
        median: reading(row, &format!("median{}", name))?,
    })
}

fn row_to_daily_average(row: &Row<'_>) -> rusqlite::Result<WeatherStationDailyAverage> {
    Ok(WeatherStationDailyAverage {
        resource_number: row.get("resourceNumber")?,
        date: row.get("date")?,
        temperature: summary(row, SUMMARIZED[0])?,
        dew_point: summary(row, SUMMARIZED[1])?,
        relative_humidity: summary(row, SUMMARIZED[2])?,
        pressure: summary(row, SUMMARIZED[3])?,
        wind_speed: summary(row, SUMMARIZED[4])?,
        solar_radiation: summary(row, SUMMARIZED[5])?,
        hourly_precipitation: summary(row, SUMMARIZED[6])?,
        wind_gust: summary(row, SUMMARIZED[7])?,
        daily_precipitation: reading(row, DAILY_PRECIPITATION)?,
    })
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

impl DatabaseManager {
    /// Store one day's summary, creating the station's table on first use.
    /// A second summary for the same date is a constraint error.
    pub fn insert_daily_average(&self, average: &WeatherStationDailyAverage) -> StorageResult<bool> {
        let mut columns = vec!["resourceNumber".to_string(), "date".to_string()];
        columns.extend(variable_keys());
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(average.resource_number), Box::new(average.date)];
        for s in average.summaries() {
            values.push(Box::new(s.min));
            values.push(Box::new(s.max));
            values.push(Box::new(s.median));
        }
        values.push(Box::new(average.daily_precipitation));

        let table = station_averages_table(average.resource_number);
        self.with_connection(|conn| {
            create_station_averages_table(conn, average.resource_number)?;
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            );
            let inserted = conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
            debug!("stored {} averages for {}", table, average.date);
            Ok(inserted == 1)
        })
    }

    /// One variable over an inclusive date range, oldest first. Unknown keys
    /// are rejected; a station with no table yet yields nothing.
    pub fn get_data(
        &self,
        resource_number: i64,
        variable_key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<f64>> {
        check_variable_key(variable_key)?;
        let table = station_averages_table(resource_number);
        self.with_connection(|conn| {
            if !table_exists(conn, &table)? {
                return Ok(Vec::new());
            }
            let sql = format!(
                "SELECT {} FROM {} WHERE date BETWEEN ?1 AND ?2 ORDER BY date ASC",
                variable_key, table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([start, end], |row| reading(row, variable_key))?;
            rows.collect()
        })
    }

    /// Whole daily summaries over an inclusive date range, oldest first
    pub fn get_all_values(
        &self,
        resource_number: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<WeatherStationDailyAverage>> {
        let table = station_averages_table(resource_number);
        self.with_connection(|conn| {
            if !table_exists(conn, &table)? {
                return Ok(Vec::new());
            }
            let sql = format!(
                "SELECT * FROM {} WHERE resourceNumber = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date ASC",
                table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![resource_number, start, end], row_to_daily_average)?;
            rows.collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::database::ErrorKind;
    use super::*;

    const STATION: i64 = 12;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 7, d).unwrap()
    }

    fn average(d: u32, max_temp: f64) -> WeatherStationDailyAverage {
        let mut a = WeatherStationDailyAverage::new(STATION, day(d));
        a.temperature = Summary {
            min: max_temp - 20.0,
            max: max_temp,
            median: max_temp - 10.0,
        };
        a.wind_gust.max = 31.5;
        a.daily_precipitation = 0.25;
        a
    }

    #[test]
    fn test_variable_keys_cover_table_columns() {
        let keys = variable_keys();
        assert_eq!(keys.len(), 25);
        assert_eq!(keys[0], "minTemp");
        assert_eq!(keys[2], "medianTemp");
        assert!(keys.contains(&"maxWindGust".to_string()));
        assert!(check_variable_key("dailyPrecip").is_ok());
        assert_eq!(
            check_variable_key("maxTemp; DROP TABLE users").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_insert_and_search_by_range() {
        let (manager, paths) = create_test_db();

        assert!(manager.get_data(STATION, "maxTemp", day(1), day(31)).unwrap().is_empty());

        for (d, t) in [(3, 84.0), (1, 80.0), (2, 91.5), (9, 70.0)] {
            assert!(manager.insert_daily_average(&average(d, t)).unwrap());
        }
        assert!(manager.insert_daily_average(&average(2, 60.0)).is_err());

        assert_eq!(
            manager.get_data(STATION, "maxTemp", day(1), day(3)).unwrap(),
            vec![80.0, 91.5, 84.0]
        );
        assert_eq!(
            manager.get_data(STATION, "maxWindGust", day(2), day(2)).unwrap(),
            vec![31.5]
        );
        assert!(manager.get_data(STATION, "maxTemperature", day(1), day(3)).is_err());

        let all = manager.get_all_values(STATION, day(2), day(9)).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], average(2, 91.5));
        assert_eq!(all[2].date, day(9));

        assert!(manager.get_all_values(STATION + 1, day(1), day(31)).unwrap().is_empty());

        cleanup(manager, paths);
    }
}
