// Relational storage for the weather system
// One module per entity manager, each an `impl DatabaseManager` block,
// over a shared connection provider, row mapper and generic repository

pub mod access;
pub mod compat;
pub mod config;
pub mod database;
pub mod identity;
pub mod mapper;
pub mod repository;
pub mod schema;
pub mod types;
mod procedures;

pub mod bookmark_categories;
pub mod bookmark_types;
pub mod bookmarks;
pub mod courses;
pub mod diary;
pub mod enrollment;
pub mod files;
pub mod forecaster;
pub mod lessons;
pub mod notes;
pub mod properties;
pub mod resources;
pub mod station_search;
pub mod stations;
pub mod users;
pub mod versions;
pub mod weblinks;

pub use access::Viewer;
pub use compat::SwallowExt;
pub use config::StorageConfig;
pub use database::{get_default_db_path, DatabaseManager, ErrorKind, StorageError, StorageResult};
pub use identity::{LessonId, RecordId};
pub use repository::{Entity, Repository};
pub use types::*;

pub use bookmark_categories::BookmarkCategory;
pub use bookmark_types::BookmarkType;
pub use bookmarks::{Bookmark, DataPlotSettings};
pub use courses::Course;
pub use diary::{CloudObservations, DailyEntry};
pub use files::StoredFile;
pub use forecaster::{
    Answer, Attempt, ForecasterLesson, InstructorResponse, Instructions, MissingDataRecord, PointScale, Question,
    QuestionTemplate, Response, Score,
};
pub use lessons::{Lesson, LessonCategory, LessonEntry};
pub use notes::InstructorNote;
pub use properties::Property;
pub use resources::{Resource, ResourceChangeListener};
pub use station_search::{Summary, WeatherStationDailyAverage};
pub use stations::Station;
pub use users::User;
pub use versions::{Version, VersionNumber};
pub use weblinks::{DailyDiaryWebLink, WebLink, WebLinkCategory};
