// Schema definitions for the institutional and shared databases
// Column names and stored enum spellings match the legacy tables exactly

use log::debug;
use rusqlite::Connection;

pub const UNCATEGORIZED: &str = "<Uncategorized>";
pub const NO_TYPE: &str = "<None>";

/// Create every institutional table, the notes view and the sentinel bookmark rows
pub fn init_local_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            userNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            loginID TEXT NOT NULL UNIQUE,
            loginPassword TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            firstName TEXT NOT NULL DEFAULT '',
            lastName TEXT NOT NULL DEFAULT '',
            userType TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            lastLoginTime TEXT,
            loginCount INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS courses (
            courseNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            departmentName TEXT NOT NULL,
            classIdentifier TEXT NOT NULL,
            section INTEGER NOT NULL,
            className TEXT NOT NULL,
            semesterType TEXT NOT NULL,
            year INTEGER NOT NULL,
            instructorNumber INTEGER NOT NULL,
            creationDate TEXT NOT NULL
        );

        -- Pure join table, no identity of its own
        CREATE TABLE IF NOT EXISTS enrollment (
            userNumber INTEGER NOT NULL,
            courseNumber INTEGER NOT NULL,
            PRIMARY KEY (userNumber, courseNumber)
        );

        CREATE TABLE IF NOT EXISTS bookmark_categories (
            bookmarkCategoryNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            createdBy INTEGER NOT NULL,
            viewRights TEXT NOT NULL,
            bookmarkAlternative TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            orderRank INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bookmark_types (
            bookmarkInstanceTypeNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            bookmarkCategoryNumber INTEGER NOT NULL,
            name TEXT NOT NULL,
            createdBy INTEGER NOT NULL,
            viewRights TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            orderRank INTEGER NOT NULL,
            UNIQUE (bookmarkCategoryNumber, name)
        );

        CREATE TABLE IF NOT EXISTS bookmarks (
            bookmarkNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            bookmarkCategoryNumber INTEGER NOT NULL,
            bookmarkTypeNumber INTEGER NOT NULL,
            name TEXT NOT NULL,
            createdBy INTEGER NOT NULL,
            accessRights TEXT NOT NULL,
            startTime TEXT NOT NULL,
            endTime TEXT NOT NULL,
            ranking TEXT NOT NULL,
            weatherCameraResourceNumber INTEGER NOT NULL DEFAULT -1,
            weatherMapLoopResourceNumber INTEGER NOT NULL DEFAULT -1,
            weatherStationResourceNumber INTEGER NOT NULL DEFAULT -1,
            weatherCameraPicture BLOB NOT NULL DEFAULT x'',
            weatherMapPicture BLOB NOT NULL DEFAULT x'',
            weatherStationPicture BLOB NOT NULL DEFAULT x'',
            notes TEXT NOT NULL DEFAULT '',
            dpStartTime TEXT NOT NULL,
            dpEndTime TEXT NOT NULL,
            dpFitted INTEGER NOT NULL DEFAULT 0,
            dpGraphSelection TEXT NOT NULL DEFAULT '',
            dpDaySpanSelection INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS static_bookmark_images (
            staticBookmarkImageNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            bookmarkNumber INTEGER NOT NULL,
            image BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notes (
            noteNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            noteTitle TEXT NOT NULL,
            startTime TEXT NOT NULL,
            endTime TEXT NOT NULL,
            instructorNumber INTEGER NOT NULL,
            accessRights TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS note_resources (
            noteNumber INTEGER PRIMARY KEY,
            cameraNumber INTEGER,
            stationNumber INTEGER
        );

        CREATE VIEW IF NOT EXISTS notes_view AS
            SELECT n.noteNumber, n.noteTitle, n.startTime, n.endTime,
                   n.instructorNumber, n.accessRights, n.note,
                   nr.cameraNumber, nr.stationNumber
            FROM notes n LEFT JOIN note_resources nr ON n.noteNumber = nr.noteNumber;

        CREATE TABLE IF NOT EXISTS diary_entries (
            userNumber INTEGER NOT NULL,
            entryDate TEXT NOT NULL,
            cameraNumber INTEGER NOT NULL,
            stationNumber INTEGER NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            tempMax TEXT NOT NULL DEFAULT '',
            tempMin TEXT NOT NULL DEFAULT '',
            tempTrend TEXT NOT NULL DEFAULT '',
            bpStart TEXT NOT NULL DEFAULT '',
            bpEnd TEXT NOT NULL DEFAULT '',
            bpTrend TEXT NOT NULL DEFAULT '',
            dpStart TEXT NOT NULL DEFAULT '',
            dpEnd TEXT NOT NULL DEFAULT '',
            dpTrend TEXT NOT NULL DEFAULT '',
            rhMax TEXT NOT NULL DEFAULT '',
            rhMin TEXT NOT NULL DEFAULT '',
            rhTrend TEXT NOT NULL DEFAULT '',
            cloudsMorningPrimary TEXT NOT NULL,
            cloudsMorningSecondary TEXT NOT NULL,
            cloudsAfternoonPrimary TEXT NOT NULL,
            cloudsAfternoonSecondary TEXT NOT NULL,
            cloudsNightPrimary TEXT NOT NULL,
            cloudsNightSecondary TEXT NOT NULL,
            windDirectionList TEXT NOT NULL DEFAULT '',
            windDirectionSummary TEXT NOT NULL,
            windSpeed TEXT NOT NULL,
            windGust TEXT NOT NULL DEFAULT '',
            dailyPrecip TEXT NOT NULL DEFAULT '',
            heatIndex TEXT NOT NULL DEFAULT '',
            windChill TEXT NOT NULL DEFAULT '',
            upperAirWindDirection TEXT NOT NULL,
            lastModified TEXT NOT NULL,
            PRIMARY KEY (userNumber, entryDate, cameraNumber)
        );

        CREATE TABLE IF NOT EXISTS resources (
            resourceNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            retrievalMethod TEXT NOT NULL,
            storageFolderName TEXT NOT NULL,
            format TEXT NOT NULL,
            urlString TEXT NOT NULL,
            timeInterval INTEGER NOT NULL,
            active INTEGER NOT NULL,
            visible INTEGER NOT NULL,
            dateInitiated TEXT NOT NULL,
            collectionSpan TEXT NOT NULL,
            startTime INTEGER NOT NULL,
            endTime INTEGER NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            updateHour INTEGER NOT NULL,
            orderRank INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS time_zone_information (
            timeZoneInformationNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            resourceNumber INTEGER NOT NULL UNIQUE,
            timeZone TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS default_pictures (
            resourceNumber INTEGER PRIMARY KEY,
            defaultNighttimeImage BLOB,
            defaultDaytimeImage BLOB
        );

        CREATE TABLE IF NOT EXISTS default_generic_no_data_picture (
            noDataImage BLOB
        );

        CREATE TABLE IF NOT EXISTS resource_relation (
            cameraNumber INTEGER PRIMARY KEY,
            stationNumber INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weblink_categories (
            linkCategoryNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            linkCategory TEXT NOT NULL UNIQUE,
            orderRank INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weblinks (
            linkNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            URL TEXT NOT NULL,
            type TEXT NOT NULL,
            linkCategoryNumber INTEGER NOT NULL,
            orderRank INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_diary_weblinks (
            linkNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            URL TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lesson_categories (
            lessonCategoryNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            lessonCategoryName TEXT NOT NULL,
            instructorNumber INTEGER NOT NULL,
            accessRights TEXT NOT NULL,
            displayOrder INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lessons (
            lessonNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            instructorNumber INTEGER NOT NULL,
            lessonCategoryNumber INTEGER NOT NULL,
            accessRights TEXT NOT NULL,
            lessonName TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lesson_entry (
            lessonEntryNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            lessonNumber INTEGER NOT NULL,
            lessonEntryName TEXT NOT NULL,
            bookmarkNumber INTEGER NOT NULL,
            bookmarkResourceIdentifier INTEGER NOT NULL,
            windowPosition INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stored_files (
            fileNumber INTEGER PRIMARY KEY AUTOINCREMENT,
            dataType TEXT NOT NULL,
            dataNumber INTEGER NOT NULL,
            instructorNumber INTEGER NOT NULL,
            fileName TEXT NOT NULL,
            fileContent BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weather_properties (
            propId INTEGER PRIMARY KEY AUTOINCREMENT,
            propType TEXT NOT NULL,
            propTypeDisplayName TEXT NOT NULL,
            propName TEXT NOT NULL,
            propDisplayName TEXT NOT NULL,
            propValue TEXT NOT NULL,
            isEditable INTEGER NOT NULL DEFAULT 1,
            notes TEXT NOT NULL DEFAULT '',
            defaultValue TEXT NOT NULL DEFAULT '',
            previousValue TEXT NOT NULL DEFAULT '',
            UNIQUE (propType, propName)
        );

        CREATE TABLE IF NOT EXISTS forecaster_stations (
            stationCode TEXT PRIMARY KEY,
            stationName TEXT NOT NULL,
            state TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_lessons (
            forecasterLessonId TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            startDate TEXT NOT NULL,
            dueDate TEXT NOT NULL,
            maximumTries INTEGER NOT NULL,
            studentEditType TEXT NOT NULL,
            active INTEGER NOT NULL,
            useArchiveData INTEGER NOT NULL,
            archivedDataDate TEXT,
            stationCode TEXT,
            courseNumber INTEGER NOT NULL,
            instructionId TEXT NOT NULL,
            instructionsText TEXT NOT NULL DEFAULT '',
            scoreId TEXT NOT NULL,
            correctPoints INTEGER NOT NULL,
            incorrectPoints INTEGER NOT NULL,
            unansweredPoints INTEGER NOT NULL,
            topScoresCounted INTEGER NOT NULL,
            requireAnswers INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_question_templates (
            questionTemplateId TEXT PRIMARY KEY,
            questionText TEXT NOT NULL,
            dataKeyPrefix TEXT NOT NULL,
            questionName TEXT NOT NULL,
            urlLocation TEXT NOT NULL DEFAULT '',
            urlText TEXT NOT NULL DEFAULT '',
            questionType TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_questions (
            questionId TEXT PRIMARY KEY,
            forecasterLessonId TEXT NOT NULL,
            questionTemplateId TEXT NOT NULL,
            questionNumber INTEGER NOT NULL,
            questionZulu TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_answers (
            answerId TEXT PRIMARY KEY,
            questionId TEXT NOT NULL,
            answerText TEXT NOT NULL,
            answerValue TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_attempts (
            attemptId TEXT PRIMARY KEY,
            forecasterLessonId TEXT NOT NULL,
            stationCode TEXT NOT NULL,
            userNumber INTEGER NOT NULL,
            attemptDate TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_responses (
            responseId TEXT PRIMARY KEY,
            attemptId TEXT NOT NULL,
            scoreId TEXT NOT NULL,
            pointsEarned INTEGER NOT NULL,
            pointsPossible INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_response_answers (
            responseId TEXT NOT NULL,
            answerId TEXT NOT NULL,
            PRIMARY KEY (responseId, answerId)
        );

        CREATE TABLE IF NOT EXISTS forecaster_instructor_responses (
            forecasterInstructorResponseId TEXT PRIMARY KEY,
            questionId TEXT NOT NULL,
            responseDate TEXT NOT NULL,
            responseValue TEXT NOT NULL,
            stationCode TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forecaster_station_data (
            stationCode TEXT NOT NULL,
            date TEXT NOT NULL,
            dataKey TEXT NOT NULL,
            dataValue TEXT NOT NULL,
            PRIMARY KEY (stationCode, date, dataKey)
        );

        CREATE TABLE IF NOT EXISTS forecaster_missing_data (
            forecasterMissingDataRowId TEXT PRIMARY KEY,
            forecasterLessonId TEXT NOT NULL,
            recordDate TEXT NOT NULL,
            stationCode TEXT NOT NULL,
            hasInstructorData INTEGER NOT NULL,
            emailSent INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_category ON bookmarks(bookmarkCategoryNumber);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_type ON bookmarks(bookmarkTypeNumber);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_created_by ON bookmarks(createdBy);
        CREATE INDEX IF NOT EXISTS idx_notes_instructor ON notes(instructorNumber);
        CREATE INDEX IF NOT EXISTS idx_stored_files_instructor ON stored_files(instructorNumber);
        CREATE INDEX IF NOT EXISTS idx_forecaster_questions_lesson ON forecaster_questions(forecasterLessonId);
        CREATE INDEX IF NOT EXISTS idx_forecaster_attempts_lesson ON forecaster_attempts(forecasterLessonId);
        CREATE INDEX IF NOT EXISTS idx_forecaster_missing_data_lesson ON forecaster_missing_data(forecasterLessonId);
        "#,
    )?;

    seed_sentinels(conn)?;
    debug!("local schema initialized");
    Ok(())
}

/// The shared database only carries release versions
pub fn init_shared_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            majorVersionNumber INTEGER NOT NULL,
            minorVersionNumber INTEGER NOT NULL,
            minorReleaseNumber INTEGER NOT NULL,
            releaseNotes TEXT NOT NULL DEFAULT '',
            releaseDate TEXT NOT NULL,
            PRIMARY KEY (majorVersionNumber, minorVersionNumber, minorReleaseNumber)
        );
        "#,
    )?;
    debug!("shared schema initialized");
    Ok(())
}

/// Bookmarks whose category or type is deleted are moved onto these rows
pub(crate) fn seed_sentinels(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO bookmark_categories
            (name, createdBy, viewRights, bookmarkAlternative, notes, orderRank)
         VALUES (?1, 0, 'Everyone', 'instance', '', 0)",
        [UNCATEGORIZED],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO bookmark_types
            (bookmarkCategoryNumber, name, createdBy, viewRights, notes, orderRank)
         SELECT bookmarkCategoryNumber, ?2, 0, 'Everyone', '', 0
         FROM bookmark_categories WHERE name = ?1",
        [UNCATEGORIZED, NO_TYPE],
    )?;
    Ok(())
}

/// Per-resource table of daily weather station averages
pub fn station_averages_table(resource_number: i64) -> String {
    format!("station_{}_averages", resource_number)
}

pub fn create_station_averages_table(conn: &Connection, resource_number: i64) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            resourceNumber INTEGER NOT NULL,
            date TEXT PRIMARY KEY,
            minTemp REAL, maxTemp REAL, medianTemp REAL,
            minDewPoint REAL, maxDewPoint REAL, medianDewPoint REAL,
            minRelativeHumidity REAL, maxRelativeHumidity REAL, medianRelativeHumidity REAL,
            minPressure REAL, maxPressure REAL, medianPressure REAL,
            minWindSpeed REAL, maxWindSpeed REAL, medianWindSpeed REAL,
            minSolarRadiation REAL, maxSolarRadiation REAL, medianSolarRadiation REAL,
            minHourlyPrecip REAL, maxHourlyPrecip REAL, medianHourlyPrecip REAL,
            minWindGust REAL, maxWindGust REAL, medianWindGust REAL,
            dailyPrecip REAL
        );
        "#,
        station_averages_table(resource_number)
    ))
}
