// Weather resources (cameras, stations, map loops...) and their side tables:
// time zone, default pictures, camera-to-station relation
// Listeners hear about every committed add/update/remove

use chrono::NaiveDate;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError};

use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper::{blob_or_absent, text_or_empty};
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::{CollectionSpan, ResourceFormat, ResourceType, RetrievalMethod};

/// In-process subscriber to resource changes.
///
/// Callbacks run synchronously after the database write has committed, in
/// registration order. Returning `false` marks the notification as failed;
/// the write itself is never rolled back.
pub trait ResourceChangeListener: Send + Sync {
    fn resource_added(&self, resource: &Resource) -> bool;
    fn resource_updated(&self, resource: &Resource) -> bool;
    fn resource_removed(&self, resource: &Resource) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_number: RecordId,
    pub resource_type: ResourceType,
    pub name: String,
    pub retrieval_method: RetrievalMethod,
    pub storage_folder_name: String,
    pub format: ResourceFormat,
    pub url: String,
    /// Seconds between retrievals
    pub frequency: i64,
    pub active: bool,
    pub visible: bool,
    pub date_initiated: NaiveDate,
    pub collection_span: CollectionSpan,
    pub start_time: i64,
    pub end_time: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Stored verbatim, e.g. "EST"
    pub time_zone: String,
    pub image_width: i64,
    pub image_height: i64,
    pub update_hour: i64,
    pub order_rank: i64,
}

impl Resource {
    pub fn new(resource_type: ResourceType, name: &str, url: &str, date_initiated: NaiveDate) -> Self {
        Self {
            resource_number: RecordId::New,
            resource_type,
            name: name.to_string(),
            retrieval_method: RetrievalMethod::Url,
            storage_folder_name: name.to_string(),
            format: ResourceFormat::Unknown,
            url: url.to_string(),
            frequency: 60,
            active: true,
            visible: true,
            date_initiated,
            collection_span: CollectionSpan::FullTime,
            start_time: 0,
            end_time: 0,
            latitude: 0.0,
            longitude: 0.0,
            time_zone: String::new(),
            image_width: 0,
            image_height: 0,
            update_hour: 0,
            order_rank: 0,
        }
    }
}

impl Entity for Resource {
    const TABLE: &'static str = "resources";
    const KEY: &'static str = "resourceNumber";
    const COLUMNS: &'static [&'static str] = &[
        "type",
        "name",
        "retrievalMethod",
        "storageFolderName",
        "format",
        "urlString",
        "timeInterval",
        "active",
        "visible",
        "dateInitiated",
        "collectionSpan",
        "startTime",
        "endTime",
        "latitude",
        "longitude",
        "width",
        "height",
        "updateHour",
        "orderRank",
    ];
    const ORDER_BY: Option<&'static str> = Some("active DESC, orderRank ASC");
    const ORDER_RANK: Option<&'static str> = Some("orderRank");

    fn record_id(&self) -> RecordId {
        self.resource_number
    }

    fn assign_id(&mut self, id: i64) {
        self.resource_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.order_rank = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.resource_type),
            Box::new(self.name.clone()),
            Box::new(self.retrieval_method),
            Box::new(self.storage_folder_name.clone()),
            Box::new(self.format),
            Box::new(self.url.clone()),
            Box::new(self.frequency),
            Box::new(self.active),
            Box::new(self.visible),
            Box::new(self.date_initiated),
            Box::new(self.collection_span),
            Box::new(self.start_time),
            Box::new(self.end_time),
            Box::new(self.latitude),
            Box::new(self.longitude),
            Box::new(self.image_width),
            Box::new(self.image_height),
            Box::new(self.update_hour),
            Box::new(self.order_rank),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Resource {
            resource_number: RecordId::Existing(row.get("resourceNumber")?),
            resource_type: row.get("type")?,
            name: row.get("name")?,
            retrieval_method: row.get("retrievalMethod")?,
            storage_folder_name: row.get("storageFolderName")?,
            format: row.get("format")?,
            url: row.get("urlString")?,
            frequency: row.get("timeInterval")?,
            active: row.get("active")?,
            visible: row.get("visible")?,
            date_initiated: row.get("dateInitiated")?,
            collection_span: row.get("collectionSpan")?,
            start_time: row.get("startTime")?,
            end_time: row.get("endTime")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            time_zone: text_or_empty(row, "timeZone")?,
            image_width: row.get("width")?,
            image_height: row.get("height")?,
            update_hour: row.get("updateHour")?,
            order_rank: row.get("orderRank")?,
        })
    }

    fn select_sql() -> String {
        "SELECT * FROM (SELECT r.*, tz.timeZone FROM resources r
            LEFT JOIN time_zone_information tz ON tz.resourceNumber = r.resourceNumber) AS resource_view"
            .to_string()
    }
}

fn save_time_zone(conn: &Connection, resource_number: i64, time_zone: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO time_zone_information (resourceNumber, timeZone) VALUES (?1, ?2)
         ON CONFLICT(resourceNumber) DO UPDATE SET timeZone = excluded.timeZone",
        params![resource_number, time_zone],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Added,
    Updated,
    Removed,
}

impl DatabaseManager {
    pub fn add_resource_change_listener(&self, listener: Arc<dyn ResourceChangeListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.push(listener);
    }

    /// Unregister a listener by identity; `false` when it was not registered
    pub fn remove_resource_change_listener(&self, listener: &Arc<dyn ResourceChangeListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    /// Tell every listener, in registration order. `false` if any refused.
    fn notify_listeners(&self, change: Change, resource: &Resource) -> bool {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        let mut accepted = true;
        for listener in &listeners {
            let ok = match change {
                Change::Added => listener.resource_added(resource),
                Change::Updated => listener.resource_updated(resource),
                Change::Removed => listener.resource_removed(resource),
            };
            if !ok {
                if accepted {
                    warn!("listener refused {:?} notification for resource {}", change, resource.name);
                }
                accepted = false;
            }
        }
        accepted
    }

    pub fn get_resource_list(&self) -> StorageResult<Vec<Resource>> {
        self.obtain_all_records()
    }

    pub fn get_resource(&self, resource_number: i64) -> StorageResult<Option<Resource>> {
        self.find_record(resource_number)
    }

    /// Insert a `New` resource (next order rank, plus its time zone row) or
    /// rewrite an existing one, then notify listeners. Returns `false` when an
    /// existing resource is missing or a listener refused; a refusal does not
    /// undo the write.
    pub fn update_weather_resource(&self, resource: &mut Resource) -> StorageResult<bool> {
        let is_new = resource.resource_number.is_new();
        let written = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let written = if is_new {
                repository::insert(&tx, resource)?
            } else {
                repository::update(&tx, &*resource)?
            };
            if written {
                if let Some(number) = resource.resource_number.get() {
                    save_time_zone(&tx, number, &resource.time_zone)?;
                }
            }
            tx.commit()?;
            Ok(written)
        })?;
        if !written {
            return Ok(false);
        }

        if is_new {
            info!("added resource {} ({:?})", resource.name, resource.resource_number);
            Ok(self.notify_listeners(Change::Added, resource))
        } else {
            debug!("updated resource {}", resource.name);
            Ok(self.notify_listeners(Change::Updated, resource))
        }
    }

    /// Remove a resource with its time zone, default pictures and relations
    pub fn remove_resource(&self, resource_number: i64) -> StorageResult<bool> {
        let removed = self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(resource) = repository::find::<Resource>(&tx, resource_number)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM time_zone_information WHERE resourceNumber = ?1", [resource_number])?;
            tx.execute("DELETE FROM default_pictures WHERE resourceNumber = ?1", [resource_number])?;
            tx.execute(
                "DELETE FROM resource_relation WHERE cameraNumber = ?1 OR stationNumber = ?1",
                [resource_number],
            )?;
            repository::delete::<Resource>(&tx, resource_number)?;
            tx.commit()?;
            Ok(Some(resource))
        })?;

        match removed {
            Some(resource) => {
                info!("removed resource {}", resource.name);
                Ok(self.notify_listeners(Change::Removed, &resource))
            }
            None => Ok(false),
        }
    }

    pub fn get_default_nighttime_picture(&self, resource_number: i64) -> StorageResult<Option<Vec<u8>>> {
        self.default_picture(resource_number, "defaultNighttimeImage")
    }

    pub fn get_default_daytime_picture(&self, resource_number: i64) -> StorageResult<Option<Vec<u8>>> {
        self.default_picture(resource_number, "defaultDaytimeImage")
    }

    pub fn set_default_nighttime_picture(&self, resource_number: i64, image: &[u8]) -> StorageResult<bool> {
        self.set_default_picture(resource_number, "defaultNighttimeImage", image)
    }

    pub fn set_default_daytime_picture(&self, resource_number: i64, image: &[u8]) -> StorageResult<bool> {
        self.set_default_picture(resource_number, "defaultDaytimeImage", image)
    }

    fn default_picture(&self, resource_number: i64, column: &str) -> StorageResult<Option<Vec<u8>>> {
        self.with_connection(|conn| {
            let image = conn
                .query_row(
                    &format!("SELECT {} FROM default_pictures WHERE resourceNumber = ?1", column),
                    [resource_number],
                    |row| blob_or_absent(row, column),
                )
                .optional()?;
            Ok(image.flatten())
        })
    }

    fn set_default_picture(&self, resource_number: i64, column: &str, image: &[u8]) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                &format!(
                    "INSERT INTO default_pictures (resourceNumber, {0}) VALUES (?1, ?2)
                     ON CONFLICT(resourceNumber) DO UPDATE SET {0} = excluded.{0}",
                    column
                ),
                params![resource_number, image],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_default_generic_no_data_image(&self) -> StorageResult<Option<Vec<u8>>> {
        self.with_connection(|conn| {
            let image = conn
                .query_row(
                    "SELECT noDataImage FROM default_generic_no_data_picture LIMIT 1",
                    [],
                    |row| blob_or_absent(row, "noDataImage"),
                )
                .optional()?;
            Ok(image.flatten())
        })
    }

    /// The table holds a single row
    pub fn set_default_generic_no_data_image(&self, image: &[u8]) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute("UPDATE default_generic_no_data_picture SET noDataImage = ?1", [image])?;
            if updated == 0 {
                tx.execute("INSERT INTO default_generic_no_data_picture (noDataImage) VALUES (?1)", [image])?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Station resource a camera is paired with
    pub fn get_related_station(&self, camera_number: i64) -> StorageResult<Option<Resource>> {
        self.find_record_where(
            "resourceNumber = (SELECT stationNumber FROM resource_relation WHERE cameraNumber = ?)",
            &[&camera_number],
        )
    }

    /// Pair a camera with a station, replacing any earlier pairing
    pub fn set_resource_relation(&self, camera_number: i64, station_number: i64) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "INSERT OR REPLACE INTO resource_relation (cameraNumber, stationNumber) VALUES (?1, ?2)",
                params![camera_number, station_number],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_resource_relation(&self, camera_number: i64) -> StorageResult<bool> {
        self.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM resource_relation WHERE cameraNumber = ?1", [camera_number])? > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        refuse: bool,
    }

    impl Recorder {
        fn record(&self, event: String) -> bool {
            self.events.lock().unwrap().push(event);
            !self.refuse
        }
    }

    impl ResourceChangeListener for Recorder {
        fn resource_added(&self, resource: &Resource) -> bool {
            self.record(format!("added {}", resource.name))
        }

        fn resource_updated(&self, resource: &Resource) -> bool {
            self.record(format!("updated {}", resource.name))
        }

        fn resource_removed(&self, resource: &Resource) -> bool {
            self.record(format!("removed {}", resource.name))
        }
    }

    fn camera(name: &str) -> Resource {
        let mut r = Resource::new(
            ResourceType::WeatherCamera,
            name,
            "http://example.org/cam.jpg",
            NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
        );
        r.time_zone = "EST".into();
        r.format = ResourceFormat::Jpeg;
        r.latitude = 41.0;
        r
    }

    #[test]
    fn test_insert_assigns_rank_and_time_zone() {
        let (manager, paths) = create_test_db();

        let mut first = camera("Roof");
        let mut second = camera("Quad");
        assert!(manager.update_weather_resource(&mut first).unwrap());
        assert!(manager.update_weather_resource(&mut second).unwrap());
        assert_eq!(second.order_rank, first.order_rank + 1);

        let stored = manager.get_resource(first.resource_number.get().unwrap()).unwrap().unwrap();
        assert_eq!(stored, first);

        second.active = false;
        second.time_zone = "CST".into();
        assert!(manager.update_weather_resource(&mut second).unwrap());
        let list = manager.get_resource_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].time_zone, "CST");

        cleanup(manager, paths);
    }

    #[test]
    fn test_listeners_notified_after_commit_in_order() {
        let (manager, paths) = create_test_db();

        let accepting = Arc::new(Recorder::default());
        let refusing = Arc::new(Recorder {
            refuse: true,
            ..Default::default()
        });
        let accepting_dyn: Arc<dyn ResourceChangeListener> = accepting.clone();
        let refusing_dyn: Arc<dyn ResourceChangeListener> = refusing.clone();
        manager.add_resource_change_listener(accepting_dyn.clone());
        manager.add_resource_change_listener(refusing_dyn.clone());

        let mut r = camera("Roof");
        assert!(!manager.update_weather_resource(&mut r).unwrap());
        // the refusal did not undo the insert
        let number = r.resource_number.get().unwrap();
        assert!(manager.get_resource(number).unwrap().is_some());
        assert_eq!(*accepting.events.lock().unwrap(), vec!["added Roof"]);
        assert_eq!(*refusing.events.lock().unwrap(), vec!["added Roof"]);

        assert!(manager.remove_resource_change_listener(&refusing_dyn));
        assert!(!manager.remove_resource_change_listener(&refusing_dyn));

        assert!(manager.remove_resource(number).unwrap());
        assert_eq!(*accepting.events.lock().unwrap(), vec!["added Roof", "removed Roof"]);
        assert_eq!(refusing.events.lock().unwrap().len(), 1);
        assert!(!manager.remove_resource(number).unwrap());

        cleanup(manager, paths);
    }

    #[test]
    fn test_pictures_and_relations() {
        let (manager, paths) = create_test_db();

        let mut cam = camera("Roof");
        let mut station = camera("Station");
        station.resource_type = ResourceType::WeatherStation;
        manager.update_weather_resource(&mut cam).unwrap();
        manager.update_weather_resource(&mut station).unwrap();
        let cam_number = cam.resource_number.get().unwrap();
        let station_number = station.resource_number.get().unwrap();

        assert_eq!(manager.get_default_daytime_picture(cam_number).unwrap(), None);
        manager.set_default_daytime_picture(cam_number, &[1, 2, 3]).unwrap();
        manager.set_default_nighttime_picture(cam_number, &[9]).unwrap();
        manager.set_default_daytime_picture(cam_number, &[4]).unwrap();
        assert_eq!(manager.get_default_daytime_picture(cam_number).unwrap(), Some(vec![4]));
        assert_eq!(manager.get_default_nighttime_picture(cam_number).unwrap(), Some(vec![9]));

        assert_eq!(manager.get_default_generic_no_data_image().unwrap(), None);
        manager.set_default_generic_no_data_image(&[7, 7]).unwrap();
        manager.set_default_generic_no_data_image(&[8]).unwrap();
        assert_eq!(manager.get_default_generic_no_data_image().unwrap(), Some(vec![8]));

        manager.set_resource_relation(cam_number, station_number).unwrap();
        assert_eq!(manager.get_related_station(cam_number).unwrap().unwrap().name, "Station");

        manager.remove_resource(cam_number).unwrap();
        assert_eq!(manager.get_default_nighttime_picture(cam_number).unwrap(), None);
        assert!(!manager.remove_resource_relation(cam_number).unwrap());

        cleanup(manager, paths);
    }
}
