//! Generic per-table CRUD shared by the typed repositories.

use super::{RepoError, RepoResult};
use crate::db::{Criteria, QueryDriver, SqlRow};
use crate::model::record::{Record, RecordId};
use log::error;
use rusqlite::Connection;
use std::marker::PhantomData;

pub(crate) struct RecordStore<'conn, R: Record> {
    driver: QueryDriver<'conn>,
    _record: PhantomData<R>,
}

impl<'conn, R: Record> RecordStore<'conn, R> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self {
            driver: QueryDriver::new(conn),
            _record: PhantomData,
        }
    }

    pub(crate) fn select_by_id(&self, id: RecordId) -> RepoResult<Option<R>> {
        Ok(self
            .select_where(&Criteria::by_id(id), &[])?
            .into_iter()
            .next())
    }

    pub(crate) fn select_where(&self, criteria: &Criteria, order_by: &[&str]) -> RepoResult<Vec<R>> {
        let rows = self
            .driver
            .select(R::KIND.table(), &[], criteria, order_by)?;
        Ok(rows.iter().filter_map(parse_row::<R>).collect())
    }

    /// Inserts `record` ignoring its identity; returns the generated one.
    ///
    /// A rejected insert logs the record it was given.
    pub(crate) fn insert(&self, record: &R) -> RepoResult<RecordId> {
        match self.driver.insert(R::KIND.table(), &record.to_columns()) {
            Ok(id) => Ok(id),
            Err(err) => {
                let err = RepoError::from(err);
                error!("{}", rejected_insert_line(record, &err));
                record.log_record();
                Err(err)
            }
        }
    }

    pub(crate) fn update(&self, record: &R) -> RepoResult<()> {
        let changed = self
            .driver
            .update(R::KIND.table(), record.id(), &record.to_columns())?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: R::KIND,
                id: record.id(),
            });
        }
        Ok(())
    }

    pub(crate) fn delete(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.driver.delete(R::KIND.table(), &Criteria::by_id(id))?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: R::KIND, id });
        }
        Ok(())
    }
}

fn rejected_insert_line<R: Record>(record: &R, err: &RepoError) -> String {
    format!(
        "event=record_insert module=repo status=error kind={} error={} {}",
        R::KIND,
        err,
        record.describe()
    )
}

fn parse_row<R: Record>(row: &SqlRow) -> Option<R> {
    let parsed = R::from_row(row);
    if parsed.is_none() {
        error!(
            "event=row_parse module=repo status=error kind={} width={} error_code=row_shape_mismatch",
            R::KIND,
            row.len()
        );
    }
    parsed
}
