// Web links grouped into ordered categories, plus the daily diary's reference links

use log::debug;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;
use super::repository::{self, Entity, Repository, SqlValues};
use super::types::WebLinkType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebLinkCategory {
    pub link_category_number: RecordId,
    pub link_category: String,
    pub order_rank: i64,
}

impl WebLinkCategory {
    pub fn new(link_category: &str) -> Self {
        Self {
            link_category_number: RecordId::New,
            link_category: link_category.to_string(),
            order_rank: 0,
        }
    }
}

impl Entity for WebLinkCategory {
    const TABLE: &'static str = "weblink_categories";
    const KEY: &'static str = "linkCategoryNumber";
    const COLUMNS: &'static [&'static str] = &["linkCategory", "orderRank"];
    const ORDER_BY: Option<&'static str> = Some("orderRank ASC");
    const ORDER_RANK: Option<&'static str> = Some("orderRank");

    fn record_id(&self) -> RecordId {
        self.link_category_number
    }

    fn assign_id(&mut self, id: i64) {
        self.link_category_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.order_rank = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![Box::new(self.link_category.clone()), Box::new(self.order_rank)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(WebLinkCategory {
            link_category_number: RecordId::Existing(row.get("linkCategoryNumber")?),
            link_category: row.get("linkCategory")?,
            order_rank: row.get("orderRank")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebLink {
    pub link_number: RecordId,
    pub name: String,
    pub url: String,
    pub link_type: WebLinkType,
    pub link_category_number: i64,
    pub order_rank: i64,
}

impl WebLink {
    pub fn new(name: &str, url: &str, link_type: WebLinkType, link_category_number: i64) -> Self {
        Self {
            link_number: RecordId::New,
            name: name.to_string(),
            url: url.to_string(),
            link_type,
            link_category_number,
            order_rank: 0,
        }
    }
}

impl Entity for WebLink {
    const TABLE: &'static str = "weblinks";
    const KEY: &'static str = "linkNumber";
    const COLUMNS: &'static [&'static str] = &["name", "URL", "type", "linkCategoryNumber", "orderRank"];
    const ORDER_BY: Option<&'static str> = Some("orderRank ASC");
    const ORDER_RANK: Option<&'static str> = Some("orderRank");

    fn record_id(&self) -> RecordId {
        self.link_number
    }

    fn assign_id(&mut self, id: i64) {
        self.link_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.order_rank = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.name.clone()),
            Box::new(self.url.clone()),
            Box::new(self.link_type),
            Box::new(self.link_category_number),
            Box::new(self.order_rank),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(WebLink {
            link_number: RecordId::Existing(row.get("linkNumber")?),
            name: row.get("name")?,
            url: row.get("URL")?,
            link_type: row.get("type")?,
            link_category_number: row.get("linkCategoryNumber")?,
            order_rank: row.get("orderRank")?,
        })
    }
}

/// A reference link shown beside the daily diary, keyed by its unique name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDiaryWebLink {
    pub link_number: RecordId,
    pub name: String,
    pub url: String,
}

impl Entity for DailyDiaryWebLink {
    const TABLE: &'static str = "daily_diary_weblinks";
    const KEY: &'static str = "linkNumber";
    const COLUMNS: &'static [&'static str] = &["name", "URL"];
    const ORDER_BY: Option<&'static str> = Some("linkNumber ASC");

    fn record_id(&self) -> RecordId {
        self.link_number
    }

    fn assign_id(&mut self, id: i64) {
        self.link_number = RecordId::Existing(id);
    }

    fn bind_values(&self) -> SqlValues {
        vec![Box::new(self.name.clone()), Box::new(self.url.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DailyDiaryWebLink {
            link_number: RecordId::Existing(row.get("linkNumber")?),
            name: row.get("name")?,
            url: row.get("URL")?,
        })
    }
}

impl DatabaseManager {
    pub fn get_links_for_category(&self, category_name: &str) -> StorageResult<Vec<WebLink>> {
        self.find_records_where(
            "linkCategoryNumber IN (SELECT linkCategoryNumber FROM weblink_categories WHERE linkCategory = ?)
             ORDER BY orderRank ASC",
            &[&category_name],
        )
    }

    /// Delete every link pointing at `url`
    pub fn delete_link(&self, url: &str) -> StorageResult<bool> {
        self.with_connection(|conn| Ok(conn.execute("DELETE FROM weblinks WHERE URL = ?1", [url])? > 0))
    }

    /// Add a plain link under the named category; `false` when there is no such category
    pub fn add_link_for_category(&self, name: &str, url: &str, category_name: &str) -> StorageResult<bool> {
        let Some(category) = self.find_record_where::<WebLinkCategory>("linkCategory = ?", &[&category_name])? else {
            return Ok(false);
        };
        let Some(category_number) = category.link_category_number.get() else {
            return Ok(false);
        };
        self.add_web_link(&mut WebLink::new(name, url, WebLinkType::Link, category_number))
    }

    pub fn add_web_link(&self, link: &mut WebLink) -> StorageResult<bool> {
        self.add_record(link)
    }

    pub fn update_web_link(&self, link: &WebLink) -> StorageResult<bool> {
        self.update_record(link)
    }

    pub fn add_web_link_category(&self, category: &mut WebLinkCategory) -> StorageResult<bool> {
        self.add_record(category)
    }

    pub fn update_web_link_category(&self, category: &WebLinkCategory) -> StorageResult<bool> {
        self.update_record(category)
    }

    /// Remove a category together with its links
    pub fn remove_link_category(&self, category_number: i64) -> StorageResult<bool> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let links = tx.execute("DELETE FROM weblinks WHERE linkCategoryNumber = ?1", [category_number])?;
            let removed = repository::delete::<WebLinkCategory>(&tx, category_number)?;
            tx.commit()?;
            debug!("removed link category {} with {} links", category_number, links);
            Ok(removed)
        })
    }

    pub fn obtain_all_web_link_categories(&self) -> StorageResult<Vec<WebLinkCategory>> {
        self.obtain_all_records()
    }

    pub fn obtain_all_web_links(&self) -> StorageResult<Vec<WebLink>> {
        self.obtain_all_records()
    }

    pub fn obtain_web_links_for_category(&self, category_number: i64) -> StorageResult<Vec<WebLink>> {
        self.find_records_where("linkCategoryNumber = ? ORDER BY orderRank ASC", &[&category_number])
    }

    pub fn get_diary_links(&self) -> StorageResult<Vec<DailyDiaryWebLink>> {
        self.obtain_all_records()
    }

    pub fn add_diary_link(&self, name: &str, url: &str) -> StorageResult<bool> {
        let mut link = DailyDiaryWebLink {
            link_number: RecordId::New,
            name: name.trim().to_string(),
            url: url.trim().to_string(),
        };
        self.add_record(&mut link)
    }

    /// Point the link called `link.name` at `link.url`
    pub fn update_diary_link(&self, link: &DailyDiaryWebLink) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE daily_diary_weblinks SET URL = ?1 WHERE name = ?2",
                params![link.url.trim(), link.name.trim()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_diary_link(&self, name: &str) -> StorageResult<bool> {
        self.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM daily_diary_weblinks WHERE name = ?1", [name.trim()])? > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::database::test_support::*;
    use super::*;

    #[test]
    fn test_links_by_category_name_in_rank_order() {
        let (manager, paths) = create_test_db();

        let mut radar = WebLinkCategory::new("Radar");
        let mut models = WebLinkCategory::new("Models");
        manager.add_web_link_category(&mut radar).unwrap();
        manager.add_web_link_category(&mut models).unwrap();
        assert!(radar.order_rank < models.order_rank);

        assert!(manager.add_link_for_category("NWS radar", "https://radar.weather.gov", "Radar").unwrap());
        assert!(manager.add_link_for_category("Local loop", "https://example.org/loop", "Radar").unwrap());
        assert!(manager.add_link_for_category("GFS", "https://example.org/gfs", "Models").unwrap());
        assert!(!manager.add_link_for_category("Lost", "https://example.org", "Nope").unwrap());

        let names: Vec<String> = manager
            .get_links_for_category("Radar")
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["NWS radar", "Local loop"]);
        let models_number = models.link_category_number.get().unwrap();
        assert_eq!(manager.obtain_web_links_for_category(models_number).unwrap().len(), 1);
        assert_eq!(manager.obtain_all_web_links().unwrap().len(), 3);

        cleanup(manager, paths);
    }

    #[test]
    fn test_remove_category_takes_its_links() {
        let (manager, paths) = create_test_db();

        let mut radar = WebLinkCategory::new("Radar");
        manager.add_web_link_category(&mut radar).unwrap();
        manager.add_link_for_category("NWS radar", "https://radar.weather.gov", "Radar").unwrap();

        let mut link = manager.obtain_all_web_links().unwrap().pop().unwrap();
        link.link_type = WebLinkType::Forecast;
        assert!(manager.update_web_link(&link).unwrap());
        assert_eq!(manager.obtain_all_web_links().unwrap()[0].link_type, WebLinkType::Forecast);

        radar.link_category = "Radar loops".into();
        assert!(manager.update_web_link_category(&radar).unwrap());
        assert_eq!(manager.obtain_all_web_link_categories().unwrap()[0].link_category, "Radar loops");

        assert!(manager.remove_link_category(radar.link_category_number.get().unwrap()).unwrap());
        assert!(manager.obtain_all_web_links().unwrap().is_empty());
        assert!(manager.obtain_all_web_link_categories().unwrap().is_empty());
        assert!(!manager.delete_link("https://radar.weather.gov").unwrap());

        cleanup(manager, paths);
    }

    #[test]
    fn test_diary_links() {
        let (manager, paths) = create_test_db();

        assert!(manager.add_diary_link(" Climate data ", "https://example.org/climate").unwrap());
        assert!(manager.add_diary_link("Soundings", "https://example.org/skewt").unwrap());
        assert!(manager.add_diary_link("Soundings", "https://example.org/dup").is_err());

        let link = DailyDiaryWebLink {
            link_number: RecordId::New,
            name: "Climate data".into(),
            url: "https://example.org/climate2".into(),
        };
        assert!(manager.update_diary_link(&link).unwrap());

        let links = manager.get_diary_links().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.org/climate2");

        assert!(manager.delete_diary_link("Soundings").unwrap());
        assert_eq!(manager.get_diary_links().unwrap().len(), 1);

        cleanup(manager, paths);
    }
}
