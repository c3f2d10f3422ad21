//! Worksheet queries over the staging store.

use crate::column;
use crate::decoder::{Decoder, Value};
use crate::error::{Error, Result};
use crate::model::EncodedCell;
use crate::store::{CellCursor, Store};
use serde::Serialize;

/// A row of decoded values keyed by column name, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// 1-based row number.
    pub number: u32,
    /// `(column name, value)` pairs by ascending column.
    pub values: Vec<(String, Value)>,
}

impl Row {
    /// Get the value in a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let column = column.to_ascii_uppercase();
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Column names present in this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row holds no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A materialized worksheet.
///
/// Handles are cheap; asking the workbook for the same worksheet twice
/// yields two handles over the same staged cells.
pub struct Worksheet<'wb> {
    store: &'wb Store,
    decoder: &'wb Decoder,
    index: u32,
    name: String,
}

impl<'wb> Worksheet<'wb> {
    pub(crate) fn new(store: &'wb Store, decoder: &'wb Decoder, index: u32, name: String) -> Self {
        Self {
            store,
            decoder,
            index,
            name,
        }
    }

    /// The spreadsheet-assigned sheet id.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The worksheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest column index holding a cell (0 when empty).
    pub fn count_columns(&self) -> Result<u32> {
        self.store.max_column(self.index)
    }

    /// Highest row number holding a cell (0 when empty).
    pub fn count_rows(&self) -> Result<u32> {
        self.store.max_row(self.index)
    }

    /// Get the decoded value of a cell.
    pub fn cell(&self, column: &str, row: u32) -> Result<Value> {
        let index = column::to_index(column)?;
        let cell = self
            .store
            .cell(self.index, index, row)?
            .ok_or_else(|| Error::NoSuchCell {
                worksheet: self.name.clone(),
                index: self.index,
                column: column.to_ascii_uppercase(),
                row,
            })?;
        self.decoder.decode(&cell)
    }

    /// Check if a cell exists. Invalid column names never exist.
    pub fn has_cell(&self, column: &str, row: u32) -> Result<bool> {
        match column::to_index(column) {
            Ok(index) => self.store.has_cell(self.index, index, row),
            Err(_) => Ok(false),
        }
    }

    /// Check if a column lies within the worksheet's extent.
    pub fn has_column(&self, column: &str) -> Result<bool> {
        match column::to_index(column) {
            Ok(index) => self.store.has_column(self.index, index),
            Err(_) => Ok(false),
        }
    }

    /// Check if a row lies within the worksheet's extent.
    pub fn has_row(&self, row: u32) -> Result<bool> {
        self.store.has_row(self.index, row)
    }

    /// Get every cell of a row.
    ///
    /// Fails with [`Error::NoSuchRow`] when the row holds no cells, even if
    /// it lies within the worksheet's extent.
    pub fn row(&self, row: u32) -> Result<Row> {
        let cells = self.store.row_cells(self.index, row)?;
        if cells.is_empty() {
            return Err(Error::NoSuchRow {
                worksheet: self.name.clone(),
                index: self.index,
                row,
            });
        }

        let values = cells
            .into_iter()
            .map(|cell| decode_keyed(self.decoder, &cell))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row { number: row, values })
    }

    /// Get every value of a column as `(row, value)` pairs by ascending row.
    pub fn column(&self, column: &str) -> Result<Vec<(u32, Value)>> {
        let index = column::to_index(column)?;
        let cells = self.store.column_cells(self.index, index)?;
        if cells.is_empty() {
            return Err(Error::NoSuchColumn {
                worksheet: self.name.clone(),
                index: self.index,
                column: column.to_ascii_uppercase(),
            });
        }

        cells
            .into_iter()
            .map(|cell| Ok((cell.row, self.decoder.decode(&cell)?)))
            .collect()
    }

    /// Stream a column by ascending row.
    ///
    /// Only one scan of the same kind can be open on a workbook at a time;
    /// drop the iterator to start another.
    pub fn iter_column(&self, column: &str) -> Result<ColumnIter<'wb>> {
        let index = column::to_index(column)?;
        Ok(ColumnIter {
            cursor: self.store.column_cursor(self.index, index)?,
            decoder: self.decoder,
        })
    }

    /// Stream all rows by ascending row number.
    pub fn rows(&self) -> Result<RowIter<'wb>> {
        Ok(RowIter {
            cursor: self.store.sheet_cursor(self.index)?,
            decoder: self.decoder,
            pending: None,
        })
    }
}

impl std::fmt::Debug for Worksheet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worksheet")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}

fn decode_keyed(decoder: &Decoder, cell: &EncodedCell) -> Result<(String, Value)> {
    Ok((column::to_name(cell.column), decoder.decode(cell)?))
}

/// Values of one column, produced lazily.
pub struct ColumnIter<'wb> {
    cursor: CellCursor<'wb>,
    decoder: &'wb Decoder,
}

impl Iterator for ColumnIter<'_> {
    type Item = Result<(u32, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoder = self.decoder;
        self.cursor
            .next()
            .map(|cell| cell.and_then(|cell| Ok((cell.row, decoder.decode(&cell)?))))
    }
}

/// Rows of a worksheet, produced lazily.
pub struct RowIter<'wb> {
    cursor: CellCursor<'wb>,
    decoder: &'wb Decoder,
    pending: Option<EncodedCell>,
}

impl RowIter<'_> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        let first = match self.pending.take() {
            Some(cell) => cell,
            None => match self.cursor.next().transpose()? {
                Some(cell) => cell,
                None => return Ok(None),
            },
        };

        let number = first.row;
        let mut values = vec![decode_keyed(self.decoder, &first)?];
        while let Some(cell) = self.cursor.next().transpose()? {
            if cell.row != number {
                self.pending = Some(cell);
                break;
            }
            values.push(decode_keyed(self.decoder, &cell)?);
        }

        Ok(Some(Row { number, values }))
    }
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
