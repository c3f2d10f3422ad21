use super::{Lease, Store};
use crate::column;
use crate::error::Result;
use crate::model::{CellInfo, CellRecord, EncodedCell};
use std::collections::VecDeque;

macro_rules! select_cells {
    ($tail:literal) => {
        concat!(
            "SELECT cells.col, cells.row, cells.type, cells.value, strings.string, formats.format \
             FROM cells \
             LEFT JOIN strings ON strings.\"index\" = cells.shared \
             LEFT JOIN styles ON styles.id = cells.style \
             LEFT JOIN formats ON formats.id = styles.number_format AND formats.id <> 0 ",
            $tail
        )
    };
}

const INSERT: &str = "INSERT INTO cells (worksheet, col, row, type, style, value, shared) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const BY_KEY: &str =
    select_cells!("WHERE cells.worksheet = ?1 AND cells.col = ?2 AND cells.row = ?3");
const BY_ROW: &str =
    select_cells!("WHERE cells.worksheet = ?1 AND cells.row = ?2 ORDER BY cells.col");
const BY_COLUMN: &str =
    select_cells!("WHERE cells.worksheet = ?1 AND cells.col = ?2 ORDER BY cells.row");
const COLUMN_PAGE: &str = select_cells!(
    "WHERE cells.worksheet = ?1 AND cells.col = ?2 AND cells.row > ?3 \
     ORDER BY cells.row LIMIT ?4"
);
const SHEET_PAGE: &str = select_cells!(
    "WHERE cells.worksheet = ?1 \
     AND (cells.row > ?2 OR (cells.row = ?2 AND cells.col > ?3)) \
     ORDER BY cells.row, cells.col LIMIT ?4"
);
const MAX_COLUMN: &str = "SELECT MAX(col) FROM cells WHERE worksheet = ?1";
const MAX_ROW: &str = "SELECT MAX(row) FROM cells WHERE worksheet = ?1";
const HAS_CELL: &str =
    "SELECT EXISTS(SELECT 1 FROM cells WHERE worksheet = ?1 AND col = ?2 AND row = ?3)";
const COUNT: &str = "SELECT COUNT(*) FROM cells WHERE worksheet = ?1";

fn encoded_cell(row: &rusqlite::Row<'_>) -> rusqlite::Result<EncodedCell> {
    Ok(EncodedCell {
        column: row.get(0)?,
        row: row.get(1)?,
        cell_type: row.get(2)?,
        value: row.get(3)?,
        shared: row.get(4)?,
        format: row.get(5)?,
    })
}

impl Store {
    /// Import a worksheet's cells in one transaction.
    pub fn import_cells<I>(&self, worksheet: u32, cells: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<CellInfo>>,
    {
        let count = self.transactional(|store| {
            let mut insert = store.acquire(INSERT)?;
            let mut count = 0usize;
            for info in cells {
                let info = info?;
                let column = column::to_index(&info.column)?;
                let record = CellRecord::from_info(worksheet, column, info);
                insert_record(&mut insert, &record)?;
                count += 1;
            }
            Ok(count)
        })?;

        log::debug!("imported {} cells into worksheet {}", count, worksheet);
        Ok(count)
    }

    /// Insert a single cell. A second cell at the same position is rejected.
    pub fn insert_cell(&self, record: &CellRecord) -> Result<()> {
        let mut insert = self.acquire(INSERT)?;
        insert_record(&mut insert, record)
    }

    /// Get a cell by position.
    pub fn cell(&self, worksheet: u32, column: u32, row: u32) -> Result<Option<EncodedCell>> {
        self.acquire(BY_KEY)?
            .query_optional(&[&worksheet, &column, &row], encoded_cell)
    }

    /// All cells of a row, by ascending column.
    pub fn row_cells(&self, worksheet: u32, row: u32) -> Result<Vec<EncodedCell>> {
        self.acquire(BY_ROW)?
            .query_all(&[&worksheet, &row], encoded_cell)
    }

    /// All cells of a column, by ascending row.
    pub fn column_cells(&self, worksheet: u32, column: u32) -> Result<Vec<EncodedCell>> {
        self.acquire(BY_COLUMN)?
            .query_all(&[&worksheet, &column], encoded_cell)
    }

    /// Stream a column by ascending row.
    pub fn column_cursor(&self, worksheet: u32, column: u32) -> Result<CellCursor<'_>> {
        Ok(CellCursor::new(
            self.acquire(COLUMN_PAGE)?,
            worksheet,
            Scope::Column(column),
            self.batch_size,
        ))
    }

    /// Stream a whole worksheet by ascending row, then column.
    pub fn sheet_cursor(&self, worksheet: u32) -> Result<CellCursor<'_>> {
        Ok(CellCursor::new(
            self.acquire(SHEET_PAGE)?,
            worksheet,
            Scope::Sheet,
            self.batch_size,
        ))
    }

    /// Highest column index holding a cell, or 0 for an empty worksheet.
    pub fn max_column(&self, worksheet: u32) -> Result<u32> {
        let max: Option<u32> = self
            .acquire(MAX_COLUMN)?
            .query_one(&[&worksheet], |row| row.get(0))?;
        Ok(max.unwrap_or(0))
    }

    /// Highest row number holding a cell, or 0 for an empty worksheet.
    pub fn max_row(&self, worksheet: u32) -> Result<u32> {
        let max: Option<u32> = self
            .acquire(MAX_ROW)?
            .query_one(&[&worksheet], |row| row.get(0))?;
        Ok(max.unwrap_or(0))
    }

    /// Check if a cell exists.
    pub fn has_cell(&self, worksheet: u32, column: u32, row: u32) -> Result<bool> {
        self.acquire(HAS_CELL)?
            .query_one(&[&worksheet, &column, &row], |row| row.get(0))
    }

    /// Check if a column lies within the worksheet's extent.
    pub fn has_column(&self, worksheet: u32, column: u32) -> Result<bool> {
        Ok(column >= 1 && column <= self.max_column(worksheet)?)
    }

    /// Check if a row lies within the worksheet's extent.
    pub fn has_row(&self, worksheet: u32, row: u32) -> Result<bool> {
        Ok(row >= 1 && row <= self.max_row(worksheet)?)
    }

    /// Number of stored cells in a worksheet.
    pub fn count_cells(&self, worksheet: u32) -> Result<usize> {
        let count: i64 = self
            .acquire(COUNT)?
            .query_one(&[&worksheet], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn insert_record(insert: &mut Lease<'_>, record: &CellRecord) -> Result<()> {
    insert.execute(&[
        &record.worksheet,
        &record.column,
        &record.row,
        &record.cell_type,
        &record.style_id,
        &record.value,
        &record.shared,
    ])?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Column(u32),
    Sheet,
}

/// A forward-only scan over stored cells.
///
/// The cursor keeps its statement checked out until it is exhausted or
/// dropped, and refills in batches keyed on the last cell it returned, so
/// abandoning it early releases the statement as well.
pub struct CellCursor<'s> {
    lease: Option<Lease<'s>>,
    worksheet: u32,
    scope: Scope,
    batch_size: usize,
    buffer: VecDeque<EncodedCell>,
    after_row: u32,
    after_column: u32,
}

impl<'s> CellCursor<'s> {
    fn new(lease: Lease<'s>, worksheet: u32, scope: Scope, batch_size: usize) -> Self {
        Self {
            lease: Some(lease),
            worksheet,
            scope,
            batch_size,
            buffer: VecDeque::new(),
            after_row: 0,
            after_column: 0,
        }
    }

    /// Whether the cursor still holds its statement.
    pub fn is_open(&self) -> bool {
        self.lease.is_some()
    }

    fn refill(&mut self) -> Result<()> {
        let Some(lease) = self.lease.as_mut() else {
            return Ok(());
        };

        let limit = self.batch_size as i64;
        let page = match self.scope {
            Scope::Column(column) => lease.query_all(
                &[&self.worksheet, &column, &self.after_row, &limit],
                encoded_cell,
            )?,
            Scope::Sheet => lease.query_all(
                &[&self.worksheet, &self.after_row, &self.after_column, &limit],
                encoded_cell,
            )?,
        };

        if page.len() < self.batch_size {
            self.lease = None;
        }
        if let Some(last) = page.last() {
            self.after_row = last.row;
            self.after_column = last.column;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for CellCursor<'_> {
    type Item = Result<EncodedCell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if let Err(e) = self.refill() {
                self.lease = None;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
