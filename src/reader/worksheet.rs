//! Worksheet cell reader (`xl/worksheets/*.xml`).

use super::{impl_record_iterator, latch, parse_attribute, PartReader};
use crate::column;
use crate::error::Result;
use crate::model::CellInfo;
use crate::xml::{Element, XmlCursor};
use regex::Regex;
use std::io::BufRead;
use std::sync::OnceLock;

const ROW_PATH: &str = "/worksheet/sheetData/row";
const CELL_PATH: &str = "/worksheet/sheetData/row/c";

static CELL_REFERENCE: OnceLock<Regex> = OnceLock::new();

/// Split a cell reference such as `"C12"` into its column name and row.
///
/// Only uppercase column letters followed by a positive row number match.
pub fn parse_cell_reference(reference: &str) -> Option<(String, u32)> {
    let pattern = CELL_REFERENCE
        .get_or_init(|| Regex::new(r"^([A-Z]+)([0-9]+)$").expect("cell reference pattern"));
    let captures = pattern.captures(reference)?;
    let row = captures[2].parse::<u32>().ok().filter(|&row| row > 0)?;
    Some((captures[1].to_string(), row))
}

/// Yields one [`CellInfo`] per `c` element, in document order.
pub struct WorksheetReader<R: BufRead> {
    cursor: XmlCursor<R>,
    row: u32,
    last_column: u32,
    done: bool,
}

impl<R: BufRead> WorksheetReader<R> {
    /// Create a reader over a worksheet stream.
    pub fn new(stream: R) -> Self {
        Self {
            cursor: XmlCursor::new(stream),
            row: 0,
            last_column: 0,
            done: false,
        }
    }

    /// Discard the current cursor and start over on a fresh stream.
    pub fn reset(&mut self, stream: R) {
        *self = Self::new(stream);
    }

    fn scan(&mut self) -> Result<Option<CellInfo>> {
        while let Some(e) = self.cursor.advance_to(|e, path| {
            (e.local_name() == "row" && path == ROW_PATH)
                || (e.local_name() == "c" && path == CELL_PATH)
        })? {
            if e.local_name() == "row" {
                self.enter_row(&e);
                continue;
            }

            if let Some(cell) = self.read_cell(&e)? {
                return Ok(Some(cell));
            }
        }

        Ok(None)
    }

    fn enter_row(&mut self, row: &Element) {
        self.row = row
            .attribute("r")
            .and_then(|raw| parse_attribute::<u32>("row", "r", raw))
            .unwrap_or(self.row.saturating_add(1));
        self.last_column = 0;
    }

    fn read_cell(&mut self, cell: &Element) -> Result<Option<CellInfo>> {
        let position = match cell.attribute("r") {
            Some(reference) => {
                let parsed = parse_cell_reference(reference);
                if parsed.is_none() {
                    log::warn!("skipping cell with malformed reference {:?}", reference);
                }
                parsed
            }
            None => Some((column::to_name(self.last_column.saturating_add(1)), self.row)),
        };

        let Some((column_name, row)) = position else {
            self.cursor.skip(cell)?;
            return Ok(None);
        };
        if let Ok(index) = column::to_index(&column_name) {
            self.last_column = index;
        }

        let cell_type = cell.attribute("t").map(String::from);
        let style_id = cell
            .attribute("s")
            .and_then(|raw| parse_attribute::<u32>("c", "s", raw));

        let mut value = String::new();
        self.cursor.for_each_child(cell, |node, inner| {
            let in_value = matches!(inner.last().map(String::as_str), Some("v" | "t"));
            if let (true, Some(text)) = (in_value, node.text()) {
                value.push_str(text);
            }
        })?;

        Ok(Some(CellInfo {
            column: column_name,
            row,
            cell_type,
            style_id,
            raw_value: if value.is_empty() { None } else { Some(value) },
        }))
    }
}

impl<R: BufRead> PartReader for WorksheetReader<R> {
    type Record = CellInfo;

    fn advance(&mut self) -> Result<Option<CellInfo>> {
        if self.done {
            return Ok(None);
        }
        let result = self.scan();
        latch(&mut self.done, result)
    }
}

impl_record_iterator!(WorksheetReader);
