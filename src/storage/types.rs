// Enumerated column values
// Every enum here is stored as its exact legacy spelling; reading an unknown spelling is an error

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored string that matches none of an enum's spellings
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {type_name} value: {value:?}")]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

/// Declares a string-backed enum with `as_str`, `FromStr`, `Display` and
/// rusqlite conversions.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        type_name: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

string_enum! {
    /// Role of a user account
    pub enum UserType {
        Unregistered => "Unregistered",
        Student => "Student",
        Instructor => "Instructor",
        Administrator => "Administrator",
        Guest => "Guest",
    }
}

string_enum! {
    /// Visibility scope of bookmarks, notes, lessons and their categories
    pub enum AccessRights {
        Everyone => "Everyone",
        AllStudents => "AllStudents",
        CourseStudents => "CourseStudents",
        Instructors => "Instructors",
        Private => "Private",
    }
}

string_enum! {
    pub enum SemesterType {
        Fall => "Fall",
        Winter => "Winter",
        Spring => "Spring",
        Summer => "Summer",
    }
}

string_enum! {
    pub enum BookmarkRank {
        NotRanked => "Not Ranked",
        Acceptable => "Acceptable",
        Average => "Average",
        Good => "Good",
        Excellent => "Excellent",
    }
}

string_enum! {
    /// Whether a category holds single-instant bookmarks or time-span events
    pub enum BookmarkDuration {
        Instance => "instance",
        Event => "event",
    }
}

string_enum! {
    pub enum WebLinkType {
        Link => "LINK",
        Forecast => "FORECAST",
    }
}

string_enum! {
    pub enum ResourceType {
        Undefined => "undefined",
        WeatherCamera => "WeatherCamera",
        WeatherSite => "WeatherSite",
        WeatherStation => "WeatherStation",
        WeatherStationValues => "WeatherStationValues",
        TextFile => "TextFile",
        WeatherStationDailyLog => "WeatherStationDailyLog",
        WeatherStationHourlyLog => "WeatherStationHourlyLog",
        WeatherMovie => "WeatherMovie",
        WeatherImage => "WeatherImage",
        WeatherMapLoop => "WeatherMapLoop",
    }
}

string_enum! {
    pub enum RetrievalMethod {
        Url => "URL",
        FileLoad => "FileLoad",
        Manual => "Manual",
        Undefined => "undefined",
    }
}

string_enum! {
    pub enum ResourceFormat {
        Unknown => "unknown",
        CommaSeparatedValues => "comma_separated_values",
        Txt => "txt",
        Jpeg => "jpeg",
        Gif => "gif",
        Png => "png",
        Mov => "mov",
        Mjpg => "mjpg",
        Image => "image",
        SpaceSeparatedValues => "space_separated_values",
    }
}

string_enum! {
    pub enum CollectionSpan {
        DaylightHours => "DaylightHours",
        FullTime => "FullTime",
        SpecifiedTimes => "SpecifiedTimes",
    }
}

string_enum! {
    /// What a stored file is attached to
    pub enum InstructorDataType {
        Bookmarks => "Bookmarks",
        Notes => "Notes",
        InstructionalLessons => "InstructionalLessons",
        Private => "Private",
    }
}

string_enum! {
    pub enum PropertyType {
        General => "general",
        Gui => "gui",
        WeatherStation => "wunder",
        WeatherStationTwoVariable => "wunder_twovar",
        WeatherStationNoSolar => "wunder_nosolar",
    }
}

string_enum! {
    pub enum AnswerType {
        RadioButton => "RadioButton",
        TextField => "TextField",
        CheckBox => "CheckBox",
    }
}

string_enum! {
    pub enum CloudType {
        NotApplicable => "N/A",
        Stratus => "Stratus",
        Nimbostratus => "Nimbostratus",
        Stratocumulus => "Stratocumulus",
        CumulusHumilis => "Cumulus (Humilis)",
        CumulusMediocris => "Cumulus (Mediocris)",
        CumulusCongestus => "Cumulus (Congestus)",
        Cumulonimbus => "Cumulonimbus",
        Altostratus => "Altostratus",
        Altocumulus => "Altocumulus",
        Cirrus => "Cirrus",
        Cirrostratus => "Cirrostratus",
        Cirrocumulus => "Cirrocumulus",
        Clear => "Clear",
    }
}

string_enum! {
    pub enum WindDirection {
        NotApplicable => "N/A",
        NorthWest => "NW",
        North => "N",
        NorthEast => "NE",
        East => "E",
        SouthEast => "SE",
        South => "S",
        SouthWest => "SW",
        West => "W",
        Calm => "Calm",
    }
}

string_enum! {
    /// Beaufort-style speed bands
    pub enum WindSpeed {
        NotApplicable => "N/A",
        Calm => "<1 mph: Calm",
        LightAir => "01-02 mph: Light air",
        LightBreeze => "03-07 mph: Light breeze",
        GentleBreeze => "08-12 mph: Gentle breeze",
        ModerateBreeze => "13-17 mph: Moderate breeze",
        FreshBreeze => "18-24 mph: Fresh breeze",
        StrongBreeze => "25-30 mph: Strong breeze",
        HighWindModerateGale => "31-38 mph: High wind / Moderate gale",
        FreshGale => "39-46 mph: Fresh gale",
        StrongGale => "47-54 mph: Strong gale",
        WholeGaleStorm => "55-63 mph: Whole gale / Storm",
        ViolentStorm => "64-72 mph: Violent storm",
        HurricaneForce => ">72 mph: Hurricane-force",
    }
}

string_enum! {
    pub enum WindDirectionSummary {
        NotApplicable => "N/A",
        LightAndVariable => "Winds were light and variable",
        Constant => "Wind direction remained constant",
        Northerly => "Winds shifted to a northerly direction",
        // "a easterly" is the stored spelling
        Easterly => "Winds shifted to a easterly direction",
        Southerly => "Winds shifted to a southerly direction",
        Westerly => "Winds shifted to a westerly direction",
    }
}

impl Default for AccessRights {
    fn default() -> Self {
        AccessRights::Private
    }
}

impl Default for BookmarkRank {
    fn default() -> Self {
        BookmarkRank::NotRanked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for rights in AccessRights::ALL {
            assert_eq!(rights.as_str().parse::<AccessRights>().unwrap(), *rights);
        }
        for speed in WindSpeed::ALL {
            assert_eq!(speed.as_str().parse::<WindSpeed>().unwrap(), *speed);
        }
    }

    #[test]
    fn test_unknown_spelling_is_rejected() {
        let err = "instructor".parse::<UserType>().unwrap_err();
        assert_eq!(err.type_name, "UserType");
        assert_eq!(err.value, "instructor");
        assert!("Not ranked".parse::<BookmarkRank>().is_err());
    }

    #[test]
    fn test_legacy_spellings() {
        assert_eq!(BookmarkRank::NotRanked.as_str(), "Not Ranked");
        assert_eq!(RetrievalMethod::Url.as_str(), "URL");
        assert_eq!(PropertyType::WeatherStationTwoVariable.as_str(), "wunder_twovar");
        assert_eq!(CloudType::CumulusHumilis.to_string(), "Cumulus (Humilis)");
    }

    #[test]
    fn test_sql_round_trip_and_bad_value() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let rights: AccessRights = conn
            .query_row("SELECT ?", [AccessRights::CourseStudents], |row| row.get(0))
            .unwrap();
        assert_eq!(rights, AccessRights::CourseStudents);

        let bad: rusqlite::Result<AccessRights> =
            conn.query_row("SELECT 'Nobody'", [], |row| row.get(0));
        assert!(matches!(bad, Err(rusqlite::Error::FromSqlConversionFailure(..))));
    }
}
