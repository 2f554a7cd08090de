// Daily weather diary
// One entry per (user, day, camera); saving the same key again replaces the entry

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageError, StorageResult};
use super::mapper::{self, format_range, text_or_empty};
use super::procedures;
use super::types::{CloudType, UnknownVariant, UserType, WindDirection, WindDirectionSummary, WindSpeed};
use super::users::User;

/// Morning, afternoon and night cloud observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudObservations {
    pub morning_primary: CloudType,
    pub morning_secondary: CloudType,
    pub afternoon_primary: CloudType,
    pub afternoon_secondary: CloudType,
    pub night_primary: CloudType,
    pub night_secondary: CloudType,
}

impl Default for CloudObservations {
    fn default() -> Self {
        Self {
            morning_primary: CloudType::NotApplicable,
            morning_secondary: CloudType::NotApplicable,
            afternoon_primary: CloudType::NotApplicable,
            afternoon_secondary: CloudType::NotApplicable,
            night_primary: CloudType::NotApplicable,
            night_secondary: CloudType::NotApplicable,
        }
    }
}

/// A diary entry. Readings are kept as the text the user typed; trend
/// columns hold the display strings of the trend choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub entry_date: NaiveDate,
    pub camera_number: i64,
    /// Resolved from the resources table on read
    pub camera_name: String,
    pub station_number: i64,
    pub station_name: String,
    pub note: String,
    pub max_temp: String,
    pub min_temp: String,
    pub temp_trend: String,
    pub start_bp: String,
    pub end_bp: String,
    pub bp_trend: String,
    pub start_dp: String,
    pub end_dp: String,
    pub dp_trend: String,
    pub max_rh: String,
    pub min_rh: String,
    pub rh_trend: String,
    pub clouds: CloudObservations,
    pub surface_wind_directions: Vec<WindDirection>,
    pub wind_direction_summary: WindDirectionSummary,
    pub wind_speed: WindSpeed,
    pub max_gust_speed: String,
    pub daily_precipitation: String,
    pub max_heat_index: String,
    pub min_wind_chill: String,
    pub upper_air_wind_direction: WindDirection,
    pub last_modified: NaiveDateTime,
}

impl DailyEntry {
    pub fn new(entry_date: NaiveDate, camera_number: i64, station_number: i64) -> Self {
        Self {
            entry_date,
            camera_number,
            camera_name: String::new(),
            station_number,
            station_name: String::new(),
            note: String::new(),
            max_temp: String::new(),
            min_temp: String::new(),
            temp_trend: String::new(),
            start_bp: String::new(),
            end_bp: String::new(),
            bp_trend: String::new(),
            start_dp: String::new(),
            end_dp: String::new(),
            dp_trend: String::new(),
            max_rh: String::new(),
            min_rh: String::new(),
            rh_trend: String::new(),
            clouds: CloudObservations::default(),
            surface_wind_directions: Vec::new(),
            wind_direction_summary: WindDirectionSummary::NotApplicable,
            wind_speed: WindSpeed::NotApplicable,
            max_gust_speed: String::new(),
            daily_precipitation: String::new(),
            max_heat_index: String::new(),
            min_wind_chill: String::new(),
            upper_air_wind_direction: WindDirection::NotApplicable,
            last_modified: mapper::now(),
        }
    }

    pub fn temp_range(&self) -> String {
        format_range(&self.max_temp, &self.min_temp)
    }

    pub fn bp_range(&self) -> String {
        format_range(&self.start_bp, &self.end_bp)
    }

    pub fn dp_range(&self) -> String {
        format_range(&self.start_dp, &self.end_dp)
    }

    pub fn rh_range(&self) -> String {
        format_range(&self.max_rh, &self.min_rh)
    }

    /// Directions as stored: display strings joined with commas
    pub fn wind_direction_list(&self) -> String {
        self.surface_wind_directions
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn parse_wind_directions(list: &str) -> Result<Vec<WindDirection>, UnknownVariant> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}

/// Expects the diary columns plus `cameraName` and `stationName`
pub(crate) fn row_to_daily_entry(row: &Row<'_>) -> rusqlite::Result<DailyEntry> {
    let list = text_or_empty(row, "windDirectionList")?;
    let surface_wind_directions = parse_wind_directions(&list).map_err(|e| {
        let index = row.as_ref().column_index("windDirectionList").unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })?;

    Ok(DailyEntry {
        entry_date: row.get("entryDate")?,
        camera_number: row.get("cameraNumber")?,
        camera_name: text_or_empty(row, "cameraName")?,
        station_number: row.get("stationNumber")?,
        station_name: text_or_empty(row, "stationName")?,
        note: text_or_empty(row, "note")?,
        max_temp: text_or_empty(row, "tempMax")?,
        min_temp: text_or_empty(row, "tempMin")?,
        temp_trend: text_or_empty(row, "tempTrend")?,
        start_bp: text_or_empty(row, "bpStart")?,
        end_bp: text_or_empty(row, "bpEnd")?,
        bp_trend: text_or_empty(row, "bpTrend")?,
        start_dp: text_or_empty(row, "dpStart")?,
        end_dp: text_or_empty(row, "dpEnd")?,
        dp_trend: text_or_empty(row, "dpTrend")?,
        max_rh: text_or_empty(row, "rhMax")?,
        min_rh: text_or_empty(row, "rhMin")?,
        rh_trend: text_or_empty(row, "rhTrend")?,
        clouds: CloudObservations {
            morning_primary: row.get("cloudsMorningPrimary")?,
            morning_secondary: row.get("cloudsMorningSecondary")?,
            afternoon_primary: row.get("cloudsAfternoonPrimary")?,
            afternoon_secondary: row.get("cloudsAfternoonSecondary")?,
            night_primary: row.get("cloudsNightPrimary")?,
            night_secondary: row.get("cloudsNightSecondary")?,
        },
        surface_wind_directions,
        wind_direction_summary: row.get("windDirectionSummary")?,
        wind_speed: row.get("windSpeed")?,
        max_gust_speed: text_or_empty(row, "windGust")?,
        daily_precipitation: text_or_empty(row, "dailyPrecip")?,
        max_heat_index: text_or_empty(row, "heatIndex")?,
        min_wind_chill: text_or_empty(row, "windChill")?,
        upper_air_wind_direction: row.get("upperAirWindDirection")?,
        last_modified: row.get("lastModified")?,
    })
}

fn author_number(author: &User) -> StorageResult<i64> {
    author
        .user_number
        .get()
        .ok_or_else(|| StorageError::invalid("diary author has not been saved"))
}

impl DatabaseManager {
    /// Save or replace `author`'s entry for the entry's day and camera.
    /// The free-text note is only kept for student and guest authors.
    pub fn save_entry(&self, entry: &mut DailyEntry, author: &User) -> StorageResult<bool> {
        let user_number = author_number(author)?;
        let keeps_note = matches!(author.user_type, UserType::Student | UserType::Guest);
        entry.last_modified = mapper::now();
        let note = if keeps_note { entry.note.as_str() } else { "" };

        self.with_connection(|conn| procedures::enter_new_diary_data(conn, user_number, entry, note))
    }

    pub fn get_entry(&self, user_number: i64, entry_date: NaiveDate, camera_number: i64) -> StorageResult<Option<DailyEntry>> {
        self.with_connection(|conn| procedures::get_diary_entry(conn, user_number, entry_date, camera_number))
    }

    pub fn get_all_entries_by_user(&self, user_number: i64) -> StorageResult<Vec<DailyEntry>> {
        self.with_connection(|conn| procedures::get_diary_entries_by_user(conn, user_number))
    }

    pub fn delete_entry(&self, user_number: i64, entry_date: NaiveDate, camera_number: i64) -> StorageResult<bool> {
        self.with_connection(|conn| procedures::delete_diary_entry(conn, user_number, entry_date, camera_number))
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn author(manager: &DatabaseManager, login: &str, user_type: UserType) -> User {
        let mut user = User::new(login, "pw", user_type);
        manager.add_user(&mut user).unwrap();
        user
    }

    #[test]
    fn test_save_and_read_back() {
        let (manager, paths) = create_test_db();
        let student = author(&manager, "stu", UserType::Student);
        let number = student.user_number.get().unwrap();

        let mut entry = DailyEntry::new(day(1), 3, 4);
        entry.max_temp = "78.5".into();
        entry.min_temp = "60".into();
        entry.note = "sunny with afternoon cumulus".into();
        entry.clouds.afternoon_primary = CloudType::CumulusHumilis;
        entry.surface_wind_directions = vec![WindDirection::North, WindDirection::NorthEast];
        entry.wind_speed = WindSpeed::GentleBreeze;
        assert!(manager.save_entry(&mut entry, &student).unwrap());

        let stored = manager.get_entry(number, day(1), 3).unwrap().unwrap();
        assert_eq!(stored, entry);
        assert_eq!(stored.temp_range(), "18.5");
        assert_eq!(stored.bp_range(), "");
        assert_eq!(stored.wind_direction_list(), "N,NE");

        assert!(manager.get_entry(number, day(2), 3).unwrap().is_none());

        cleanup(manager, paths);
    }

    #[test]
    fn test_save_replaces_and_instructor_note_is_dropped() {
        let (manager, paths) = create_test_db();
        let prof = author(&manager, "prof", UserType::Instructor);
        let number = prof.user_number.get().unwrap();

        let mut entry = DailyEntry::new(day(1), 3, 4);
        entry.note = "private thoughts".into();
        manager.save_entry(&mut entry, &prof).unwrap();
        entry.max_temp = "90".into();
        manager.save_entry(&mut entry, &prof).unwrap();

        let all = manager.get_all_entries_by_user(number).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].max_temp, "90");
        assert_eq!(all[0].note, "");

        cleanup(manager, paths);
    }

    #[test]
    fn test_delete_and_unsaved_author() {
        let (manager, paths) = create_test_db();
        let guest = author(&manager, "guest", UserType::Guest);
        let number = guest.user_number.get().unwrap();

        let mut entry = DailyEntry::new(day(7), 1, 2);
        manager.save_entry(&mut entry, &guest).unwrap();
        assert!(manager.delete_entry(number, day(7), 1).unwrap());
        assert!(!manager.delete_entry(number, day(7), 1).unwrap());

        let unsaved = User::new("nobody", "pw", UserType::Student);
        assert!(manager.save_entry(&mut entry, &unsaved).is_err());

        cleanup(manager, paths);
    }

    #[test]
    fn test_unknown_wind_direction_is_an_error() {
        let (manager, paths) = create_test_db();
        let guest = author(&manager, "guest", UserType::Guest);
        let number = guest.user_number.get().unwrap();

        let mut entry = DailyEntry::new(day(9), 1, 2);
        manager.save_entry(&mut entry, &guest).unwrap();
        manager
            .with_connection(|conn| conn.execute("UPDATE diary_entries SET windDirectionList = 'N,Sideways'", []))
            .unwrap();

        assert!(manager.get_entry(number, day(9), 1).is_err());

        cleanup(manager, paths);
    }
}
