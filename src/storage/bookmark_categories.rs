// Bookmark categories, the top of category -> type -> bookmark
// Removing a category never drops bookmarks: they move to <Uncategorized>/<None>

use log::debug;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::bookmark_types::{sentinel_ids, BookmarkType};
use super::database::{DatabaseManager, StorageError, StorageResult};
use super::identity::RecordId;
use super::mapper::text_or_empty;
use super::repository::{self, Entity, Repository, SqlValues};
use super::schema::NO_TYPE;
use super::types::{AccessRights, BookmarkDuration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkCategory {
    pub bookmark_category_number: RecordId,
    pub name: String,
    pub created_by: i64,
    pub view_rights: AccessRights,
    pub alternative: BookmarkDuration,
    pub notes: String,
    pub order_rank: i64,
}

impl BookmarkCategory {
    pub fn new(name: &str, created_by: i64, view_rights: AccessRights, alternative: BookmarkDuration) -> Self {
        Self {
            bookmark_category_number: RecordId::New,
            name: name.to_string(),
            created_by,
            view_rights,
            alternative,
            notes: String::new(),
            order_rank: 0,
        }
    }
}

impl Entity for BookmarkCategory {
    const TABLE: &'static str = "bookmark_categories";
    const KEY: &'static str = "bookmarkCategoryNumber";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "createdBy",
        "viewRights",
        "bookmarkAlternative",
        "notes",
        "orderRank",
    ];
    const ORDER_BY: Option<&'static str> = Some("orderRank ASC");
    const ORDER_RANK: Option<&'static str> = Some("orderRank");

    fn record_id(&self) -> RecordId {
        self.bookmark_category_number
    }

    fn assign_id(&mut self, id: i64) {
        self.bookmark_category_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.order_rank = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.name.clone()),
            Box::new(self.created_by),
            Box::new(self.view_rights),
            Box::new(self.alternative),
            Box::new(self.notes.clone()),
            Box::new(self.order_rank),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(BookmarkCategory {
            bookmark_category_number: RecordId::Existing(row.get("bookmarkCategoryNumber")?),
            name: row.get("name")?,
            created_by: row.get("createdBy")?,
            view_rights: row.get("viewRights")?,
            alternative: row.get("bookmarkAlternative")?,
            notes: text_or_empty(row, "notes")?,
            order_rank: row.get("orderRank")?,
        })
    }
}

/// Soft cascade: bookmarks to the sentinels, the category's types deleted, then the category itself
fn remove_category(conn: &Connection, category_number: i64, sentinels: (i64, i64)) -> rusqlite::Result<bool> {
    let (uncategorized, none) = sentinels;
    let moved = conn.execute(
        "UPDATE bookmarks SET bookmarkCategoryNumber = ?1, bookmarkTypeNumber = ?2
         WHERE bookmarkCategoryNumber = ?3
            OR bookmarkTypeNumber IN
               (SELECT bookmarkInstanceTypeNumber FROM bookmark_types WHERE bookmarkCategoryNumber = ?3)",
        params![uncategorized, none, category_number],
    )?;
    conn.execute("DELETE FROM bookmark_types WHERE bookmarkCategoryNumber = ?1", [category_number])?;
    debug!("moved {} bookmarks off category {}", moved, category_number);
    repository::delete::<BookmarkCategory>(conn, category_number)
}

impl DatabaseManager {
    /// Add a category together with its own `<None>` type
    pub fn add_bookmark_category(&self, category: &mut BookmarkCategory) -> StorageResult<bool> {
        if !category.bookmark_category_number.is_new() {
            return Ok(false);
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            if !repository::insert(&tx, category)? {
                return Ok(false);
            }
            if let Some(number) = category.bookmark_category_number.get() {
                let mut none = BookmarkType::new(number, NO_TYPE, category.created_by, category.view_rights);
                repository::insert(&tx, &mut none)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn update_bookmark_category(&self, category: &BookmarkCategory) -> StorageResult<bool> {
        self.update_record(category)
    }

    /// Remove a category, moving its bookmarks to `<Uncategorized>/<None>`.
    /// `<Uncategorized>` itself cannot be removed.
    pub fn remove_bookmark_category(&self, category_number: i64) -> StorageResult<bool> {
        let sentinels = self.with_connection(sentinel_ids)?;
        if category_number == sentinels.0 {
            return Err(StorageError::invalid("<Uncategorized> cannot be removed"));
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = remove_category(&tx, category_number, sentinels)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    /// Remove every category a user created, with the same cascade; returns the count
    pub fn remove_bookmark_categories_by_user(&self, created_by: i64) -> StorageResult<usize> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let sentinels = sentinel_ids(&tx)?;
            let doomed: Vec<BookmarkCategory> = repository::find_where(
                &tx,
                "createdBy = ? AND bookmarkCategoryNumber <> ?",
                &[&created_by, &sentinels.0],
            )?;
            let mut removed = 0;
            for number in doomed.iter().filter_map(|c| c.bookmark_category_number.get()) {
                if remove_category(&tx, number, sentinels)? {
                    removed += 1;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn search_bookmark_category_by_name(&self, name: &str) -> StorageResult<Option<BookmarkCategory>> {
        self.find_record_where("name = ?", &[&name])
    }

    pub fn search_bookmark_category_by_number(&self, category_number: i64) -> StorageResult<Option<BookmarkCategory>> {
        self.find_record(category_number)
    }

    pub fn obtain_all_bookmark_categories(&self) -> StorageResult<Vec<BookmarkCategory>> {
        self.obtain_all_records()
    }

    pub fn obtain_bookmark_categories_by_view_rights(
        &self,
        rights: AccessRights,
    ) -> StorageResult<Vec<BookmarkCategory>> {
        self.find_records_where("viewRights = ? ORDER BY orderRank ASC", &[&rights])
    }

    pub fn obtain_bookmark_categories_by_duration(
        &self,
        duration: BookmarkDuration,
    ) -> StorageResult<Vec<BookmarkCategory>> {
        self.find_records_where("bookmarkAlternative = ? ORDER BY orderRank ASC", &[&duration])
    }

    pub fn obtain_bookmark_categories_by_user(&self, created_by: i64) -> StorageResult<Vec<BookmarkCategory>> {
        self.find_records_where("createdBy = ? ORDER BY orderRank ASC", &[&created_by])
    }
}
