// Generic repository over entity tables
// Each entity describes its table once; insert/update/delete/find are implemented here for all of them

use rusqlite::{params_from_iter, Connection, OptionalExtension, Row, ToSql};

use super::access::Viewer;
use super::database::{DatabaseManager, StorageResult};
use super::identity::RecordId;

/// Owned, boxed bind values in column order
pub type SqlValues = Vec<Box<dyn ToSql>>;

/// A row type with an integer surrogate key
pub trait Entity: Sized {
    const TABLE: &'static str;
    const KEY: &'static str;
    /// Non-key columns, in the order `bind_values` yields them
    const COLUMNS: &'static [&'static str];
    /// Sort used by `obtain_all_records`
    const ORDER_BY: Option<&'static str> = None;
    /// Manual display-order column, assigned `MAX + 1` on insert
    const ORDER_RANK: Option<&'static str> = None;

    fn record_id(&self) -> RecordId;
    fn assign_id(&mut self, id: i64);
    fn assign_order_rank(&mut self, _rank: i64) {}
    fn bind_values(&self) -> SqlValues;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// SELECT prefix used by every read; joined entities override it
    fn select_sql() -> String {
        format!("SELECT * FROM {}", Self::TABLE)
    }
}

/// Next value of a monotonic display-order counter. Not gap-free.
pub(crate) fn next_order_rank(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        &format!("SELECT COALESCE(MAX({}), 0) + 1 FROM {}", column, table),
        [],
        |row| row.get(0),
    )
}

/// Insert a `New` entity and write the generated key back into it.
/// Returns `false` without touching the database when the entity already has a key.
pub(crate) fn insert<E: Entity>(conn: &Connection, entity: &mut E) -> rusqlite::Result<bool> {
    if !entity.record_id().is_new() {
        return Ok(false);
    }
    if let Some(column) = E::ORDER_RANK {
        let rank = next_order_rank(conn, E::TABLE, column)?;
        entity.assign_order_rank(rank);
    }

    let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders
    );
    let values = entity.bind_values();
    conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    entity.assign_id(conn.last_insert_rowid());
    Ok(true)
}

/// Rewrite every column of an `Existing` entity. `false` for `New` or a missing row.
pub(crate) fn update<E: Entity>(conn: &Connection, entity: &E) -> rusqlite::Result<bool> {
    let id = match entity.record_id() {
        RecordId::Existing(id) => id,
        RecordId::New => return Ok(false),
    };

    let assignments: Vec<String> = E::COLUMNS.iter().map(|c| format!("{} = ?", c)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        E::TABLE,
        assignments.join(", "),
        E::KEY
    );
    let mut values = entity.bind_values();
    values.push(Box::new(id));
    let changed = conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    Ok(changed > 0)
}

pub(crate) fn delete<E: Entity>(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", E::TABLE, E::KEY);
    Ok(conn.execute(&sql, [id])? > 0)
}

pub(crate) fn find<E: Entity>(conn: &Connection, id: i64) -> rusqlite::Result<Option<E>> {
    let sql = format!("{} WHERE {} = ?", E::select_sql(), E::KEY);
    conn.query_row(&sql, [id], E::from_row).optional()
}

/// Rows matching `clause` (everything after WHERE, may carry its own ORDER BY)
pub(crate) fn find_where<E: Entity>(
    conn: &Connection,
    clause: &str,
    params: &[&dyn ToSql],
) -> rusqlite::Result<Vec<E>> {
    let sql = format!("{} WHERE {}", E::select_sql(), clause);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, E::from_row)?;
    rows.collect()
}

pub(crate) fn find_one_where<E: Entity>(
    conn: &Connection,
    clause: &str,
    params: &[&dyn ToSql],
) -> rusqlite::Result<Option<E>> {
    let sql = format!("{} WHERE {} LIMIT 1", E::select_sql(), clause);
    conn.query_row(&sql, params, E::from_row).optional()
}

pub(crate) fn obtain_all<E: Entity>(conn: &Connection) -> rusqlite::Result<Vec<E>> {
    let sql = match E::ORDER_BY {
        Some(order) => format!("{} ORDER BY {}", E::select_sql(), order),
        None => E::select_sql(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], E::from_row)?;
    rows.collect()
}

/// Rows matching `filter` that `viewer` may see, with visibility decided by
/// the owner and access-rights columns
pub(crate) fn find_visible<E: Entity>(
    conn: &Connection,
    viewer: &Viewer,
    filter: &str,
    filter_params: &[&dyn ToSql],
    owner_column: &str,
    rights_column: &str,
    order_by: &str,
) -> rusqlite::Result<Vec<E>> {
    let (visible, values) = viewer.visibility_clause(owner_column, rights_column);
    let clause = format!("({}) AND {} ORDER BY {}", filter, visible, order_by);
    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(filter_params.len() + values.len());
    params.extend(filter_params.iter().copied());
    params.extend(values.iter().map(|v| v.as_ref()));
    find_where(conn, &clause, &params)
}

/// CRUD shared by every entity manager
pub trait Repository {
    fn add_record<E: Entity>(&self, entity: &mut E) -> StorageResult<bool>;
    fn update_record<E: Entity>(&self, entity: &E) -> StorageResult<bool>;
    fn remove_record<E: Entity>(&self, id: i64) -> StorageResult<bool>;
    fn find_record<E: Entity>(&self, id: i64) -> StorageResult<Option<E>>;
    fn find_records_where<E: Entity>(&self, clause: &str, params: &[&dyn ToSql]) -> StorageResult<Vec<E>>;
    fn find_record_where<E: Entity>(&self, clause: &str, params: &[&dyn ToSql]) -> StorageResult<Option<E>>;
    fn obtain_all_records<E: Entity>(&self) -> StorageResult<Vec<E>>;
}

impl Repository for DatabaseManager {
    fn add_record<E: Entity>(&self, entity: &mut E) -> StorageResult<bool> {
        self.with_connection(|conn| insert(conn, entity))
    }

    fn update_record<E: Entity>(&self, entity: &E) -> StorageResult<bool> {
        self.with_connection(|conn| update(conn, entity))
    }

    fn remove_record<E: Entity>(&self, id: i64) -> StorageResult<bool> {
        self.with_connection(|conn| delete::<E>(conn, id))
    }

    fn find_record<E: Entity>(&self, id: i64) -> StorageResult<Option<E>> {
        self.with_connection(|conn| find(conn, id))
    }

    fn find_records_where<E: Entity>(&self, clause: &str, params: &[&dyn ToSql]) -> StorageResult<Vec<E>> {
        self.with_connection(|conn| find_where(conn, clause, params))
    }

    fn find_record_where<E: Entity>(&self, clause: &str, params: &[&dyn ToSql]) -> StorageResult<Option<E>> {
        self.with_connection(|conn| find_one_where(conn, clause, params))
    }

    fn obtain_all_records<E: Entity>(&self) -> StorageResult<Vec<E>> {
        self.with_connection(|conn| obtain_all(conn))
    }
}
