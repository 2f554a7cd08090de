// Bookmark types, the middle level of category -> type -> bookmark
// Removing a type moves its bookmarks to the category's "<None>" type

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageError, StorageResult};
use super::identity::RecordId;
use super::mapper::text_or_empty;
use super::repository::{self, Entity, Repository, SqlValues};
use super::schema::{self, NO_TYPE, UNCATEGORIZED};
use super::types::AccessRights;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkType {
    pub instance_type_number: RecordId,
    pub category_number: i64,
    pub name: String,
    pub created_by: i64,
    pub view_rights: AccessRights,
    pub notes: String,
    pub order_rank: i64,
}

impl BookmarkType {
    pub fn new(category_number: i64, name: &str, created_by: i64, view_rights: AccessRights) -> Self {
        Self {
            instance_type_number: RecordId::New,
            category_number,
            name: name.to_string(),
            created_by,
            view_rights,
            notes: String::new(),
            order_rank: 0,
        }
    }
}

impl Entity for BookmarkType {
    const TABLE: &'static str = "bookmark_types";
    const KEY: &'static str = "bookmarkInstanceTypeNumber";
    const COLUMNS: &'static [&'static str] = &[
        "bookmarkCategoryNumber",
        "name",
        "createdBy",
        "viewRights",
        "notes",
        "orderRank",
    ];
    const ORDER_BY: Option<&'static str> = Some("orderRank ASC");
    const ORDER_RANK: Option<&'static str> = Some("orderRank");

    fn record_id(&self) -> RecordId {
        self.instance_type_number
    }

    fn assign_id(&mut self, id: i64) {
        self.instance_type_number = RecordId::Existing(id);
    }

    fn assign_order_rank(&mut self, rank: i64) {
        self.order_rank = rank;
    }

    fn bind_values(&self) -> SqlValues {
        vec![
            Box::new(self.category_number),
            Box::new(self.name.clone()),
            Box::new(self.created_by),
            Box::new(self.view_rights),
            Box::new(self.notes.clone()),
            Box::new(self.order_rank),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(BookmarkType {
            instance_type_number: RecordId::Existing(row.get("bookmarkInstanceTypeNumber")?),
            category_number: row.get("bookmarkCategoryNumber")?,
            name: row.get("name")?,
            created_by: row.get("createdBy")?,
            view_rights: row.get("viewRights")?,
            notes: text_or_empty(row, "notes")?,
            order_rank: row.get("orderRank")?,
        })
    }
}

/// Keys of the `<Uncategorized>` category and its `<None>` type, reseeding them if missing
pub(crate) fn sentinel_ids(conn: &Connection) -> rusqlite::Result<(i64, i64)> {
    schema::seed_sentinels(conn)?;
    conn.query_row(
        "SELECT c.bookmarkCategoryNumber, t.bookmarkInstanceTypeNumber
         FROM bookmark_categories c
         JOIN bookmark_types t ON t.bookmarkCategoryNumber = c.bookmarkCategoryNumber
         WHERE c.name = ?1 AND t.name = ?2",
        params![UNCATEGORIZED, NO_TYPE],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

/// The `<None>` type of a category, if it has one
pub(crate) fn none_type_of(conn: &Connection, category_number: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT bookmarkInstanceTypeNumber FROM bookmark_types
         WHERE bookmarkCategoryNumber = ?1 AND name = ?2",
        params![category_number, NO_TYPE],
        |row| row.get(0),
    )
    .optional()
}

/// Move a type's bookmarks to a surviving type, then delete the type
pub(crate) fn remove_type(conn: &Connection, type_number: i64) -> rusqlite::Result<bool> {
    let Some(doomed) = repository::find::<BookmarkType>(conn, type_number)? else {
        return Ok(false);
    };
    let (uncategorized, none) = sentinel_ids(conn)?;

    let (target_category, target_type) = match none_type_of(conn, doomed.category_number)? {
        Some(category_none) if category_none != type_number => (doomed.category_number, category_none),
        _ => (uncategorized, none),
    };

    let moved = conn.execute(
        "UPDATE bookmarks SET bookmarkCategoryNumber = ?1, bookmarkTypeNumber = ?2
         WHERE bookmarkTypeNumber = ?3",
        params![target_category, target_type, type_number],
    )?;
    debug!("moved {} bookmarks off type {}", moved, type_number);

    repository::delete::<BookmarkType>(conn, type_number)
}

impl DatabaseManager {
    pub fn add_bookmark_type(&self, bookmark_type: &mut BookmarkType) -> StorageResult<bool> {
        self.add_record(bookmark_type)
    }

    pub fn update_bookmark_type(&self, bookmark_type: &BookmarkType) -> StorageResult<bool> {
        self.update_record(bookmark_type)
    }

    /// Remove a type without losing its bookmarks. The `<Uncategorized>/<None>` type cannot be removed.
    pub fn remove_bookmark_type(&self, type_number: i64) -> StorageResult<bool> {
        let (_, none) = self.with_connection(sentinel_ids)?;
        if type_number == none {
            return Err(StorageError::invalid("the <None> type of <Uncategorized> cannot be removed"));
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = remove_type(&tx, type_number)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    /// Remove every type in a category; returns how many were removed
    pub fn remove_bookmark_types_by_category(&self, category_number: i64) -> StorageResult<usize> {
        let (uncategorized, _) = self.with_connection(sentinel_ids)?;
        if category_number == uncategorized {
            return Err(StorageError::invalid("types of <Uncategorized> cannot be removed"));
        }
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let doomed: Vec<BookmarkType> =
                repository::find_where(&tx, "bookmarkCategoryNumber = ?", &[&category_number])?;
            // The category's own <None> goes last so the others can drain into it
            let (fallbacks, regular): (Vec<_>, Vec<_>) = doomed.into_iter().partition(|t| t.name == NO_TYPE);
            let mut removed = 0;
            for t in regular.iter().chain(fallbacks.iter()) {
                if let Some(number) = t.instance_type_number.get() {
                    if remove_type(&tx, number)? {
                        removed += 1;
                    }
                }
            }
            tx.commit()?;
            Ok(removed)
        })
    }

    /// Type `type_name` within the category named `category_name`
    pub fn search_bookmark_type_by_name(
        &self,
        type_name: &str,
        category_name: &str,
    ) -> StorageResult<Option<BookmarkType>> {
        self.find_record_where(
            "name = ? AND bookmarkCategoryNumber =
                (SELECT bookmarkCategoryNumber FROM bookmark_categories WHERE name = ?)",
            &[&type_name, &category_name],
        )
    }

    pub fn search_bookmark_type_by_number(&self, type_number: i64) -> StorageResult<Option<BookmarkType>> {
        self.find_record(type_number)
    }

    pub fn obtain_all_bookmark_types(&self) -> StorageResult<Vec<BookmarkType>> {
        self.obtain_all_records()
    }

    pub fn obtain_bookmark_types_by_view_rights(&self, rights: AccessRights) -> StorageResult<Vec<BookmarkType>> {
        self.find_records_where("viewRights = ? ORDER BY orderRank ASC", &[&rights])
    }

    pub fn obtain_bookmark_types_in_category(&self, category_number: i64) -> StorageResult<Vec<BookmarkType>> {
        self.find_records_where("bookmarkCategoryNumber = ? ORDER BY orderRank ASC", &[&category_number])
    }

    pub fn obtain_bookmark_types_by_user(&self, created_by: i64) -> StorageResult<Vec<BookmarkType>> {
        self.find_records_where("createdBy = ? ORDER BY orderRank ASC", &[&created_by])
    }
}
