//! Table-agnostic query driver.
//!
//! # Responsibility
//! - Build INSERT/UPDATE/DELETE/SELECT statements from a table, a column list
//!   and equality criteria.
//! - Return rows as positional value lists for record parsing.
//! - Own the table map used to check column alignment before execution.
//!
//! # Invariants
//! - Values are always bound as parameters, never spliced into SQL text.
//! - Every column name must match `IDENTIFIER_RE` and belong to the table.
//! - Insert/update must supply exactly the table's data columns.
//! - Every statement is logged at debug level before it runs.

use crate::db::{DbError, DbResult};
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Name of the generated identity column shared by every table.
pub const ID_COLUMN: &str = "id";

/// Column/value pairs in table order, as produced by records.
pub type ColumnValues = Vec<(&'static str, Value)>;

pub type DriverResult<T> = Result<T, DriverError>;

/// Tables known to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Devices,
    Tracks,
    Samples,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Users, Table::Devices, Table::Tracks, Table::Samples];

    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Devices => "devices",
            Self::Tracks => "tracks",
            Self::Samples => "samples",
        }
    }

    /// Data columns in declaration order, identity excluded.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Users => &[
                "username",
                "name",
                "surname",
                "email",
                "telephone_number",
                "city",
                "street",
                "home_number",
                "flat_number",
                "postal_code",
                "password_hash",
            ],
            Self::Devices => &[
                "user_id",
                "serial_number",
                "current_location",
                "device_name",
                "firmware_version",
            ],
            Self::Tracks => &[
                "device_id",
                "start_timestamp",
                "start_location",
                "end_timestamp",
                "end_location",
                "distance",
                "maneuver_assessment",
            ],
            Self::Samples => &[
                "track_id",
                "timestamp",
                "coordinates",
                "speed",
                "acceleration",
                "azimuth",
            ],
        }
    }

    /// Identity followed by the data columns; the positional row layout.
    pub fn row_columns(self) -> Vec<&'static str> {
        std::iter::once(ID_COLUMN)
            .chain(self.columns().iter().copied())
            .collect()
    }

    fn has_column(self, column: &str) -> bool {
        column == ID_COLUMN || self.columns().contains(&column)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Driver-level failure.
#[derive(Debug)]
pub enum DriverError {
    /// Statement preparation or execution failed.
    Db(DbError),
    /// Supplied value count differs from the table's data-column count.
    ColumnMismatch {
        table: Table,
        expected: usize,
        actual: usize,
    },
    /// Column is not declared for the table.
    UnknownColumn { table: Table, column: String },
    /// Column appears more than once in one statement.
    DuplicateColumn { table: Table, column: String },
    /// Column name is not a plain SQL identifier.
    InvalidIdentifier(String),
    /// Delete without criteria would wipe the table.
    EmptyCriteria(Table),
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ColumnMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "wrong number of values for `{table}`: expected {expected}, got {actual}"
            ),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::DuplicateColumn { table, column } => {
                write!(f, "column `{column}` supplied twice for table `{table}`")
            }
            Self::InvalidIdentifier(value) => write!(f, "invalid column identifier `{value}`"),
            Self::EmptyCriteria(table) => {
                write!(f, "refusing to delete from `{table}` without criteria")
            }
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for DriverError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Conjunction of `column = value` terms.
///
/// An empty criteria set matches every row.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    terms: Vec<(String, Value)>,
}

impl Criteria {
    /// Criteria matching every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds one `column = value` term.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((column.into(), value.into()));
        self
    }

    /// Shorthand for matching the identity column.
    pub fn by_id(id: i64) -> Self {
        Self::all().eq(ID_COLUMN, id)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        self.terms.iter().map(|(_, value)| value)
    }

    /// Renders ` WHERE a = ?{offset+1} AND ...`, or an empty string.
    fn where_clause(&self, table: Table, offset: usize) -> DriverResult<String> {
        if self.terms.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(self.terms.len());
        for (index, (column, _)) in self.terms.iter().enumerate() {
            check_identifier(table, column)?;
            parts.push(format!("{column} = ?{}", offset + index + 1));
        }
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}

/// One result row, positionally ordered like the selected fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    values: Vec<Value>,
}

impl SqlRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn integer(&self, index: usize) -> Option<i64> {
        match self.values.get(index)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, index: usize) -> Option<String> {
        match self.values.get(index)? {
            Value::Text(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// `Some(None)` for NULL, `None` when the cell is missing or mistyped.
    pub fn optional_integer(&self, index: usize) -> Option<Option<i64>> {
        match self.values.get(index)? {
            Value::Null => Some(None),
            Value::Integer(value) => Some(Some(*value)),
            _ => None,
        }
    }

    /// `Some(None)` for NULL, `None` when the cell is missing or mistyped.
    pub fn optional_text(&self, index: usize) -> Option<Option<String>> {
        match self.values.get(index)? {
            Value::Null => Some(None),
            Value::Text(value) => Some(Some(value.clone())),
            _ => None,
        }
    }
}

/// Generic statement builder over one borrowed connection.
///
/// Borrowing a `Transaction` works too, since it derefs to `Connection`.
pub struct QueryDriver<'conn> {
    conn: &'conn Connection,
}

impl<'conn> QueryDriver<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts one row and returns the identity generated by storage.
    pub fn insert(&self, table: Table, columns: &[(&'static str, Value)]) -> DriverResult<i64> {
        check_columns(table, columns)?;

        let names = columns
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({names}) VALUES ({placeholders});",
            table.name()
        );

        self.run(table, "insert", &sql, || {
            self.conn
                .execute(&sql, params_from_iter(columns.iter().map(|(_, value)| value)))?;
            Ok(self.conn.last_insert_rowid())
        })
    }

    /// Overwrites every data column of the row with identity `id`.
    ///
    /// Returns the number of affected rows (0 or 1).
    pub fn update(
        &self,
        table: Table,
        id: i64,
        columns: &[(&'static str, Value)],
    ) -> DriverResult<usize> {
        check_columns(table, columns)?;

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {ID_COLUMN} = ?{};",
            table.name(),
            columns.len() + 1
        );
        let id_value = Value::Integer(id);

        self.run(table, "update", &sql, || {
            self.conn.execute(
                &sql,
                params_from_iter(
                    columns
                        .iter()
                        .map(|(_, value)| value)
                        .chain(std::iter::once(&id_value)),
                ),
            )
        })
    }

    /// Deletes rows matching `criteria` and returns the affected row count.
    pub fn delete(&self, table: Table, criteria: &Criteria) -> DriverResult<usize> {
        if criteria.is_empty() {
            error!(
                "event=db_query module=driver status=error verb=delete table={} error_code=empty_criteria",
                table
            );
            return Err(DriverError::EmptyCriteria(table));
        }

        let sql = format!(
            "DELETE FROM {}{};",
            table.name(),
            criteria.where_clause(table, 0)?
        );

        self.run(table, "delete", &sql, || {
            self.conn.execute(&sql, params_from_iter(criteria.values()))
        })
    }

    /// Selects `fields` (all row columns when empty) from rows matching
    /// `criteria`, ordered by `order_by` ascending.
    pub fn select(
        &self,
        table: Table,
        fields: &[&str],
        criteria: &Criteria,
        order_by: &[&str],
    ) -> DriverResult<Vec<SqlRow>> {
        let field_list = if fields.is_empty() {
            table.row_columns().join(", ")
        } else {
            for field in fields {
                check_identifier(table, field)?;
            }
            fields.join(", ")
        };

        let mut sql = format!(
            "SELECT {field_list} FROM {}{}",
            table.name(),
            criteria.where_clause(table, 0)?
        );
        if !order_by.is_empty() {
            for column in order_by {
                check_identifier(table, column)?;
            }
            sql.push_str(&format!(" ORDER BY {} ASC", order_by.join(" ASC, ")));
        }
        sql.push(';');

        let rows = self.run(table, "select", &sql, || {
            let mut stmt = self.conn.prepare(&sql)?;
            let width = stmt.column_count();
            let mut rows = stmt.query(params_from_iter(criteria.values()))?;
            let mut collected = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(width);
                for index in 0..width {
                    values.push(row.get::<_, Value>(index)?);
                }
                collected.push(SqlRow::new(values));
            }
            Ok(collected)
        })?;

        debug!(
            "event=db_query module=driver status=ok verb=select table={} rows={}",
            table,
            rows.len()
        );
        Ok(rows)
    }

    fn run<T>(
        &self,
        table: Table,
        verb: &str,
        sql: &str,
        op: impl FnOnce() -> rusqlite::Result<T>,
    ) -> DriverResult<T> {
        debug!(
            "event=db_query module=driver status=start verb={} table={} sql={}",
            verb, table, sql
        );
        op().map_err(|err| {
            error!(
                "event=db_query module=driver status=error verb={} table={} error={}",
                verb, table, err
            );
            DriverError::from(err)
        })
    }
}

/// Checks that every mapped table and column exists on the connection.
pub fn verify_schema(conn: &Connection) -> DbResult<()> {
    for table in Table::ALL {
        let declared = live_columns(conn, table.name())?;
        if declared.is_empty() {
            return Err(DbError::SchemaMismatch {
                table: table.name(),
                column: None,
            });
        }
        for column in table.row_columns() {
            if !declared.contains(column) {
                return Err(DbError::SchemaMismatch {
                    table: table.name(),
                    column: Some(column),
                });
            }
        }
    }
    Ok(())
}

fn live_columns(conn: &Connection, table: &str) -> DbResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = HashSet::new();
    while let Some(row) = rows.next()? {
        columns.insert(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

fn check_identifier(table: Table, column: &str) -> DriverResult<()> {
    if !IDENTIFIER_RE.is_match(column) {
        return Err(DriverError::InvalidIdentifier(column.to_string()));
    }
    if !table.has_column(column) {
        return Err(DriverError::UnknownColumn {
            table,
            column: column.to_string(),
        });
    }
    Ok(())
}

fn check_columns(table: Table, columns: &[(&'static str, Value)]) -> DriverResult<()> {
    let expected = table.columns().len();
    if columns.len() != expected {
        error!(
            "event=db_query module=driver status=error table={} error_code=column_mismatch expected={} actual={}",
            table,
            expected,
            columns.len()
        );
        return Err(DriverError::ColumnMismatch {
            table,
            expected,
            actual: columns.len(),
        });
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for (column, _) in columns {
        check_identifier(table, column)?;
        if *column == ID_COLUMN {
            return Err(DriverError::UnknownColumn {
                table,
                column: (*column).to_string(),
            });
        }
        if !seen.insert(*column) {
            return Err(DriverError::DuplicateColumn {
                table,
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Criteria, DriverError, QueryDriver, Table};
    use crate::db::open_db_in_memory;
    use rusqlite::types::Value;

    fn device_columns(user_id: i64, name: &str) -> Vec<(&'static str, Value)> {
        vec![
            ("user_id", Value::Integer(user_id)),
            ("serial_number", Value::Integer(1001)),
            ("current_location", Value::Text("52.40,16.92".to_string())),
            ("device_name", Value::Text(name.to_string())),
            ("firmware_version", Value::Integer(3)),
        ]
    }

    #[test]
    fn insert_rejects_wrong_value_count() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);

        let mut columns = device_columns(1, "tracker");
        columns.pop();
        let err = driver.insert(Table::Devices, &columns).unwrap_err();
        assert!(matches!(
            err,
            DriverError::ColumnMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn insert_rejects_unknown_and_duplicate_columns() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);

        let mut unknown = device_columns(1, "tracker");
        unknown[4] = ("firmware", Value::Integer(3));
        assert!(matches!(
            driver.insert(Table::Devices, &unknown).unwrap_err(),
            DriverError::UnknownColumn { .. }
        ));

        let mut duplicate = device_columns(1, "tracker");
        duplicate[4] = ("device_name", Value::Text("again".to_string()));
        assert!(matches!(
            driver.insert(Table::Devices, &duplicate).unwrap_err(),
            DriverError::DuplicateColumn { .. }
        ));
    }

    #[test]
    fn values_are_bound_not_spliced() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);

        let hostile = "x'); DROP TABLE devices; --";
        let id = driver
            .insert(Table::Devices, &device_columns(7, hostile))
            .unwrap();

        let rows = driver
            .select(Table::Devices, &["device_name"], &Criteria::by_id(id), &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(0).as_deref(), Some(hostile));
    }

    #[test]
    fn select_rejects_non_identifier_criteria() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);

        let criteria = Criteria::all().eq("user_id = 1 OR 1", 1);
        let err = driver
            .select(Table::Devices, &[], &criteria, &[])
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidIdentifier(_)));
    }

    #[test]
    fn select_without_criteria_returns_whole_table_in_order() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);

        driver
            .insert(Table::Devices, &device_columns(1, "b"))
            .unwrap();
        driver
            .insert(Table::Devices, &device_columns(2, "a"))
            .unwrap();

        let rows = driver
            .select(Table::Devices, &[], &Criteria::all(), &["device_name"])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), Table::Devices.row_columns().len());
        assert_eq!(rows[0].text(4).as_deref(), Some("a"));
        assert_eq!(rows[1].text(4).as_deref(), Some("b"));
    }

    #[test]
    fn delete_requires_criteria_and_reports_affected_rows() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);
        let id = driver
            .insert(Table::Devices, &device_columns(1, "tracker"))
            .unwrap();

        assert!(matches!(
            driver.delete(Table::Devices, &Criteria::all()).unwrap_err(),
            DriverError::EmptyCriteria(Table::Devices)
        ));
        assert_eq!(
            driver
                .delete(Table::Devices, &Criteria::by_id(id + 100))
                .unwrap(),
            0
        );
        assert_eq!(driver.delete(Table::Devices, &Criteria::by_id(id)).unwrap(), 1);
    }

    #[test]
    fn update_overwrites_full_row_by_identity() {
        let conn = open_db_in_memory().unwrap();
        let driver = QueryDriver::new(&conn);
        let id = driver
            .insert(Table::Devices, &device_columns(1, "before"))
            .unwrap();

        let changed = driver
            .update(Table::Devices, id, &device_columns(1, "after"))
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(
            driver
                .update(Table::Devices, id + 1, &device_columns(1, "ghost"))
                .unwrap(),
            0
        );

        let rows = driver
            .select(Table::Devices, &["device_name"], &Criteria::by_id(id), &[])
            .unwrap();
        assert_eq!(rows[0].text(0).as_deref(), Some("after"));
    }
}
