// Runtime settings kept in weather_properties, grouped by property type

use log::debug;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::mapper::text_or_empty;
use super::repository::{Entity, Repository, SqlValues};
use super::types::PropertyType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_id: RecordId,
    pub property_type: PropertyType,
    pub property_type_display_name: String,
    pub name: String,
    pub display_name: String,
    pub value: String,
    pub editable: bool,
    pub notes: String,
    pub default_value: String,
    pub previous_value: String,
}

impl Property {
    pub fn new(property_type: PropertyType, name: &str, value: &str) -> Self {
        Self {
            property_id: RecordId::New,
            property_type,
            property_type_display_name: property_type.to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            value: value.to_string(),
            editable: true,
            notes: String::new(),
            default_value: value.to_string(),
            previous_value: String::new(),
        }
    }
}

impl Entity for Property {
    const TABLE: &'static str = "weather_properties";
    const KEY: &'static str = "propId";
    const COLUMNS: &'static [&'static str] = &[
        "propType",
        "propTypeDisplayName",
        "propName",
        "propDisplayName",
        "propValue",
        "isEditable",
        "notes",
        "defaultValue",
        "previousValue",
    ];
    const ORDER_BY: Option<&'static str> = Some("propType ASC, propName ASC");

    fn record_id(&self) -> RecordId {
        self.property_id
    }

    fn assign_id(&mut self, id: i64) {
        self.property_id = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.property_type),
            Box::new(self.property_type_display_name.clone()),
            Box::new(self.name.clone()),
            Box::new(self.display_name.clone()),
            Box::new(self.value.clone()),
            Box::new(self.editable),
            Box::new(self.notes.clone()),
            Box::new(self.default_value.clone()),
            Box::new(self.previous_value.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Property {
            property_id: RecordId::Existing(row.get("propId")?),
            property_type: row.get("propType")?,
            property_type_display_name: row.get("propTypeDisplayName")?,
            name: row.get("propName")?,
            display_name: row.get("propDisplayName")?,
            value: text_or_empty(row, "propValue")?,
            editable: row.get("isEditable")?,
            notes: text_or_empty(row, "notes")?,
            default_value: text_or_empty(row, "defaultValue")?,
            previous_value: text_or_empty(row, "previousValue")?,
        })
    }
}

impl DatabaseManager {
    /// Insert a `New` property. A duplicate (type, name) pair is a constraint error.
    pub fn insert_property(&self, property: &mut Property) -> StorageResult<bool> {
        self.add_record(property)
    }

    pub fn update_property(&self, property: &Property) -> StorageResult<bool> {
        self.update_record(property)
    }

    pub fn remove_property(&self, property_id: i64) -> StorageResult<bool> {
        self.remove_record::<Property>(property_id)
    }

    pub fn obtain_property(&self, property_id: i64) -> StorageResult<Option<Property>> {
        self.find_record(property_id)
    }

    pub fn obtain_all_properties(&self) -> StorageResult<Vec<Property>> {
        self.obtain_all_records()
    }

    pub fn obtain_properties_of_type(&self, property_type: PropertyType) -> StorageResult<Vec<Property>> {
        self.find_records_where("propType = ? ORDER BY propName ASC", &[&property_type])
    }

    /// Name to value for one property type
    pub fn properties_map(&self, property_type: PropertyType) -> StorageResult<BTreeMap<String, String>> {
        Ok(self
            .obtain_properties_of_type(property_type)?
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect())
    }

    /// Change one value, keeping the old one in `previousValue`.
    /// `false` when there is no such editable property.
    pub fn set_property_value(&self, property_type: PropertyType, name: &str, value: &str) -> StorageResult<bool> {
        let changed = self.with_connection(|conn| {
            conn.execute(
                "UPDATE weather_properties SET previousValue = propValue, propValue = ?1
                 WHERE propType = ?2 AND propName = ?3 AND isEditable <> 0",
                params![value, property_type, name],
            )
        })?;
        if changed > 0 {
            debug!("property {}.{} set", property_type, name);
        }
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use crate::storage::database::ErrorKind;
    use super::*;

    #[test]
    fn test_properties_by_type_and_map() {
        let (manager, paths) = create_test_db();

        let mut retries = Property::new(PropertyType::General, "retries", "3");
        let mut theme = Property::new(PropertyType::Gui, "theme", "light");
        let mut station = Property::new(PropertyType::WeatherStation, "temperature", "TemperatureF");
        for p in [&mut retries, &mut theme, &mut station] {
            assert!(manager.insert_property(p).unwrap());
        }

        let dup = manager.insert_property(&mut Property::new(PropertyType::Gui, "theme", "dark"));
        assert_eq!(dup.unwrap_err().kind(), ErrorKind::ConstraintViolation);

        assert_eq!(manager.obtain_all_properties().unwrap().len(), 3);
        assert_eq!(manager.obtain_properties_of_type(PropertyType::Gui).unwrap(), vec![theme.clone()]);
        let map = manager.properties_map(PropertyType::WeatherStation).unwrap();
        assert_eq!(map.get("temperature").map(String::as_str), Some("TemperatureF"));
        assert!(manager.properties_map(PropertyType::WeatherStationNoSolar).unwrap().is_empty());

        theme.notes = "ui colour scheme".into();
        assert!(manager.update_property(&theme).unwrap());
        let id = theme.property_id.get().unwrap();
        assert_eq!(manager.obtain_property(id).unwrap().unwrap().notes, "ui colour scheme");
        assert!(manager.remove_property(id).unwrap());
        assert!(manager.obtain_property(id).unwrap().is_none());

        cleanup(manager, paths);
    }

    #[test]
    fn test_set_value_keeps_previous() {
        let (manager, paths) = create_test_db();

        let mut retries = Property::new(PropertyType::General, "retries", "3");
        let mut locked = Property::new(PropertyType::General, "dbVersion", "7");
        locked.editable = false;
        manager.insert_property(&mut retries).unwrap();
        manager.insert_property(&mut locked).unwrap();

        assert!(manager.set_property_value(PropertyType::General, "retries", "5").unwrap());
        assert!(!manager.set_property_value(PropertyType::General, "dbVersion", "8").unwrap());
        assert!(!manager.set_property_value(PropertyType::Gui, "retries", "5").unwrap());

        let stored = manager.obtain_property(retries.property_id.get().unwrap()).unwrap().unwrap();
        assert_eq!(stored.value, "5");
        assert_eq!(stored.previous_value, "3");
        assert_eq!(stored.default_value, "3");

        cleanup(manager, paths);
    }
}
